//! Menu-driven front end used when no subcommand is given.

use std::path::PathBuf;

use dialoguer::{Confirm, Input, Select};
use patrol_card_cli_utils::MultiProgress;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::pipeline::{self, GenerateOptions};

/// Top-level actions of the interactive menu.
enum Action {
    Generate,
    Report,
    Train,
}

impl Action {
    const ALL: &[Self] = &[Self::Generate, Self::Report, Self::Train];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Generate => "Generate patrol card (cartão programa)",
            Self::Report => "Build crime report",
            Self::Train => "Train and evaluate classifier",
        }
    }
}

fn prompt_path(prompt: &str, default: Option<&PathBuf>) -> Result<PathBuf, AppError> {
    let mut input = Input::<String>::new().with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default.display().to_string());
    }
    Ok(PathBuf::from(input.interact_text()?))
}

fn prompt_seed(default: Option<u64>) -> Result<Option<u64>, AppError> {
    let text: String = Input::new()
        .with_prompt("Seed (empty for random)")
        .default(default.map(|seed| seed.to_string()).unwrap_or_default())
        .allow_empty(true)
        .validate_with(|value: &String| -> Result<(), &str> {
            if value.trim().is_empty() || value.trim().parse::<u64>().is_ok() {
                Ok(())
            } else {
                Err("Enter a non-negative integer")
            }
        })
        .interact_text()?;

    Ok(text.trim().parse().ok())
}

/// Prompts for an action and its settings, then runs it.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected action fails.
pub async fn run(mut config: AppConfig, multi: &MultiProgress) -> Result<(), AppError> {
    println!("Patrol Card");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();
    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    let input = prompt_path("Incident CSV", config.input.csv.as_ref())?;
    let load = config.input.load_options()?;

    match Action::ALL[idx] {
        Action::Generate => {
            let workbook = prompt_path("Workbook output", Some(&config.output.workbook))?;
            let map = Confirm::new()
                .with_prompt("Also export the patrol map?")
                .default(true)
                .interact()?
                .then(|| config.output.map.clone());
            config.schedule.seed = prompt_seed(config.schedule.seed)?;

            pipeline::generate(
                GenerateOptions {
                    input,
                    load,
                    training: config.training,
                    schedule: config.schedule,
                    workbook,
                    map,
                },
                multi,
            )
            .await?;
        }
        Action::Report => {
            let output = prompt_path("Report output", Some(&config.output.report))?;
            pipeline::report(&input, load, &output).await?;
        }
        Action::Train => {
            config.training.seed = prompt_seed(config.training.seed)?;
            pipeline::evaluate(&input, load, config.training).await?;
        }
    }

    Ok(())
}
