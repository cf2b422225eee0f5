//! TOML configuration for the patrol card CLI.
//!
//! Lookup order: `--config`, then the `PATROL_CARD_CONFIG` environment
//! variable, then `patrol_card.toml` in the working directory. With none of
//! them present every setting takes its default. Command-line flags are
//! applied on top of whatever was loaded.
//!
//! ```toml
//! [input]
//! csv = "dados/ocorrencias.csv"
//! delimiter = ";"
//!
//! [training]
//! epochs = 300
//! seed = 42
//!
//! [schedule]
//! seed = 7
//! anchor_date = "2024-03-04"
//!
//! [output]
//! workbook = "cartao_programa.xlsx"
//! map = "pontos_patrulhamento.geojson"
//! report = "relatorio.json"
//! ```

use std::path::{Path, PathBuf};

use patrol_card_ingest::LoadOptions;
use patrol_card_predict::TrainingConfig;
use patrol_card_schedule::ScheduleConfig;
use serde::Deserialize;

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "PATROL_CARD_CONFIG";

/// Configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "patrol_card.toml";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`AppConfig`].
    #[error("Invalid config {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying TOML error.
        source: toml::de::Error,
    },

    /// The CSV delimiter is not a single ASCII character.
    #[error("CSV delimiter must be a single ASCII character, got '{0}'")]
    Delimiter(char),
}

/// Where the incident CSV lives and how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct InputConfig {
    /// Incident CSV path.
    pub csv: Option<PathBuf>,
    /// Field delimiter.
    pub delimiter: char,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            csv: None,
            delimiter: ';',
        }
    }
}

impl InputConfig {
    /// Converts to [`LoadOptions`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Delimiter`] if the delimiter is not ASCII.
    pub fn load_options(&self) -> Result<LoadOptions, ConfigError> {
        let delimiter =
            u8::try_from(self.delimiter).map_err(|_| ConfigError::Delimiter(self.delimiter))?;
        if !delimiter.is_ascii() {
            return Err(ConfigError::Delimiter(self.delimiter));
        }
        Ok(LoadOptions { delimiter })
    }
}

/// Output artifact paths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct OutputConfig {
    /// Patrol card workbook.
    pub workbook: PathBuf,
    /// Patrol point `GeoJSON` map.
    pub map: PathBuf,
    /// Crime report JSON.
    pub report: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            workbook: PathBuf::from("cartao_programa.xlsx"),
            map: PathBuf::from("pontos_patrulhamento.geojson"),
            report: PathBuf::from("relatorio.json"),
        }
    }
}

/// Full CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AppConfig {
    /// Input settings.
    pub input: InputConfig,
    /// Classifier hyper-parameters.
    pub training: TrainingConfig,
    /// Schedule generation settings.
    pub schedule: ScheduleConfig,
    /// Output paths.
    pub output: OutputConfig,
}

/// Picks the configuration file to load, if any.
#[must_use]
pub fn resolve_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    default.is_file().then_some(default)
}

/// Parses configuration from TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if `text` is not a valid configuration.
pub fn parse(text: &str, path: &Path) -> Result<AppConfig, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the configuration, falling back to defaults when no file is found.
///
/// # Errors
///
/// Returns [`ConfigError`] if a chosen file cannot be read or parsed.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let Some(path) = resolve_path(explicit) else {
        log::debug!("No config file, using defaults");
        return Ok(AppConfig::default());
    };

    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let config = parse(&text, &path)?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = parse("", Path::new("empty.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.output.workbook, PathBuf::from("cartao_programa.xlsx"));
        assert_eq!(config.input.load_options().unwrap().delimiter, b';');
    }

    #[test]
    fn sections_override_defaults() {
        let text = r#"
            [input]
            csv = "dados.csv"
            delimiter = ","

            [training]
            epochs = 50
            seed = 3

            [schedule]
            seed = 7
            anchor_date = "2024-03-04"

            [output]
            map = "mapa.geojson"
        "#;
        let config = parse(text, Path::new("patrol_card.toml")).unwrap();

        assert_eq!(config.input.csv, Some(PathBuf::from("dados.csv")));
        assert_eq!(config.input.load_options().unwrap().delimiter, b',');
        assert_eq!(config.training.epochs, 50);
        assert_eq!(config.training.seed, Some(3));
        assert!((config.training.learning_rate - TrainingConfig::default().learning_rate).abs() < f64::EPSILON);
        assert_eq!(config.schedule.seed, Some(7));
        assert_eq!(config.schedule.anchor_date, NaiveDate::from_ymd_opt(2024, 3, 4));
        assert_eq!(config.output.map, PathBuf::from("mapa.geojson"));
        assert_eq!(config.output.report, PathBuf::from("relatorio.json"));
    }

    #[test]
    fn invalid_toml_names_the_file() {
        let err = parse("[training]\nepochs = \"many\"", Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        let input = InputConfig {
            csv: None,
            delimiter: 'ç',
        };
        assert!(matches!(input.load_options(), Err(ConfigError::Delimiter('ç'))));
    }

    #[test]
    fn explicit_path_wins() {
        let path = Path::new("custom.toml");
        assert_eq!(resolve_path(Some(path)), Some(path.to_path_buf()));
    }

    #[test]
    fn missing_explicit_file_is_a_read_error() {
        let path = std::env::temp_dir().join("patrol_card_missing_config.toml");
        let err = load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
