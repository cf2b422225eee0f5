#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line front end for the weekly patrol card generator.
//!
//! `patrol_card generate` trains the crime classifier on a CSV of historical
//! incidents, plans a week of patrol points, and writes the "cartão
//! programa" workbook plus a `GeoJSON` map. `report` writes the dashboard
//! series and `train` evaluates the classifier. Without a subcommand an
//! interactive menu asks what to do.
//!
//! Uses `indicatif-log-bridge` (via [`patrol_card_cli_utils::init_logger`])
//! so log lines and progress bars share the terminal.

mod config;
mod error;
mod interactive;
mod pipeline;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use patrol_card_cli_utils::MultiProgress;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::pipeline::GenerateOptions;

#[derive(Parser)]
#[command(name = "patrol_card", about = "Weekly patrol card generator")]
struct Cli {
    /// TOML configuration file (defaults to `PATROL_CARD_CONFIG`, then
    /// `patrol_card.toml`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the classifier, plan the week, and export the patrol card
    Generate {
        /// Incident CSV (overrides `[input] csv`)
        input: Option<PathBuf>,
        /// Workbook output path
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// `GeoJSON` map output path
        #[arg(long)]
        map: Option<PathBuf>,
        /// Skip the map
        #[arg(long, conflicts_with = "map")]
        no_map: bool,
        /// Seed for reproducible sampling
        #[arg(long)]
        seed: Option<u64>,
        /// Date used for patrol start and end times (YYYY-MM-DD)
        #[arg(long)]
        anchor_date: Option<NaiveDate>,
    },
    /// Write the crime report series as JSON
    Report {
        /// Incident CSV (overrides `[input] csv`)
        input: Option<PathBuf>,
        /// Report output path
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Train the classifier and print its held-out accuracy
    Train {
        /// Incident CSV (overrides `[input] csv`)
        input: Option<PathBuf>,
        /// Gradient descent epochs
        #[arg(long)]
        epochs: Option<u32>,
        /// Seed for the train/test split
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn require_input(arg: Option<PathBuf>, config: &AppConfig) -> Result<PathBuf, AppError> {
    arg.or_else(|| config.input.csv.clone())
        .ok_or(AppError::MissingInput)
}

async fn run(cli: Cli, multi: &MultiProgress) -> Result<(), AppError> {
    let mut config = config::load(cli.config.as_deref())?;

    let Some(command) = cli.command else {
        return interactive::run(config, multi).await;
    };

    let load = config.input.load_options()?;

    match command {
        Commands::Generate {
            input,
            output,
            map,
            no_map,
            seed,
            anchor_date,
        } => {
            let input = require_input(input, &config)?;
            if seed.is_some() {
                config.schedule.seed = seed;
            }
            if anchor_date.is_some() {
                config.schedule.anchor_date = anchor_date;
            }
            let map = if no_map {
                None
            } else {
                Some(map.unwrap_or(config.output.map))
            };

            pipeline::generate(
                GenerateOptions {
                    input,
                    load,
                    training: config.training,
                    schedule: config.schedule,
                    workbook: output.unwrap_or(config.output.workbook),
                    map,
                },
                multi,
            )
            .await?;
        }
        Commands::Report { input, output } => {
            let input = require_input(input, &config)?;
            let output = output.unwrap_or(config.output.report);
            pipeline::report(&input, load, &output).await?;
        }
        Commands::Train {
            input,
            epochs,
            seed,
        } => {
            let input = require_input(input, &config)?;
            if let Some(epochs) = epochs {
                config.training.epochs = epochs;
            }
            if seed.is_some() {
                config.training.seed = seed;
            }
            pipeline::evaluate(&input, load, config.training).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let multi = patrol_card_cli_utils::init_logger();
    let cli = Cli::parse();

    if let Err(e) = run(cli, &multi).await {
        log::error!("{e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
