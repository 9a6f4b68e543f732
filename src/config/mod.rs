//! Configuration management for the folio application.
//!
//! This module handles loading and validating configuration settings from environment
//! variables, with sensible defaults. It covers where the document lives, where its
//! backups go, how many backups to keep, and which provider endpoints to call.
//!
//! # Environment Variables
//!
//! - `FOLIO_DATA_FILE`: Path to the document file (defaults to ~/Documents/folio/folio_data.json)
//! - `FOLIO_BACKUP_DIR`: Backup directory (defaults to `backups` next to the document)
//! - `FOLIO_MAX_BACKUPS`: Number of backups to retain (defaults to 10)
//! - `FOLIO_GOOGLE_API_URL`: Google Generative Language API base URL
//! - `FOLIO_OPENROUTER_API_URL`: OpenRouter API base URL
//! - `HOME`: Used for expanding the default document path

use crate::constants::{
    BACKUP_DIR_NAME, DEFAULT_DATA_SUBPATH, DEFAULT_GOOGLE_API_URL, DEFAULT_MAX_BACKUPS,
    DEFAULT_OPENROUTER_API_URL, ENV_VAR_FOLIO_BACKUP_DIR, ENV_VAR_FOLIO_DATA_FILE,
    ENV_VAR_FOLIO_GOOGLE_API_URL, ENV_VAR_FOLIO_MAX_BACKUPS, ENV_VAR_FOLIO_OPENROUTER_API_URL,
    ENV_VAR_HOME, REDACTED_PLACEHOLDER,
};
use crate::errors::{AppError, AppResult};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

/// Configuration for the folio application.
///
/// # Examples
///
/// Creating a configuration manually:
/// ```
/// use folio::Config;
/// use std::path::PathBuf;
///
/// let config = Config::for_data_file(PathBuf::from("/path/to/folio.json"));
/// assert_eq!(config.backup_dir, PathBuf::from("/path/to/backups"));
/// assert_eq!(config.max_backups, 10);
/// ```
#[derive(Clone)]
pub struct Config {
    /// The JSON document holding folders, pages, functions and settings.
    pub data_file: PathBuf,

    /// Directory receiving timestamped copies of the document.
    pub backup_dir: PathBuf,

    /// Number of backups kept before the oldest are pruned.
    pub max_backups: usize,

    /// Base URL of the Google Generative Language API.
    pub google_api_url: String,

    /// Base URL of the OpenRouter API.
    pub openrouter_api_url: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("data_file", &REDACTED_PLACEHOLDER)
            .field("backup_dir", &REDACTED_PLACEHOLDER)
            .field("max_backups", &self.max_backups)
            .field("google_api_url", &self.google_api_url)
            .field("openrouter_api_url", &self.openrouter_api_url)
            .finish()
    }
}

impl Config {
    /// Builds a configuration around an explicit document path, with every
    /// other setting at its default.
    pub fn for_data_file(data_file: PathBuf) -> Self {
        let backup_dir = default_backup_dir(&data_file);
        Config {
            data_file,
            backup_dir,
            max_backups: DEFAULT_MAX_BACKUPS,
            google_api_url: DEFAULT_GOOGLE_API_URL.to_string(),
            openrouter_api_url: DEFAULT_OPENROUTER_API_URL.to_string(),
        }
    }

    /// Loads configuration from environment variables with sensible defaults.
    ///
    /// Paths are expanded with `shellexpand`, so `~` and `$VAR` references work.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if:
    /// - Path expansion fails
    /// - `FOLIO_MAX_BACKUPS` is not a positive integer
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use folio::Config;
    ///
    /// match Config::load() {
    ///     Ok(config) => println!("Keeping {} backups", config.max_backups),
    ///     Err(err) => eprintln!("Failed to load config: {}", err),
    /// }
    /// ```
    pub fn load() -> AppResult<Self> {
        let data_file_str = env::var(ENV_VAR_FOLIO_DATA_FILE).unwrap_or_else(|_| {
            let home = env::var(ENV_VAR_HOME).unwrap_or_else(|_| "".to_string());
            format!("{}/{}", home, DEFAULT_DATA_SUBPATH)
        });
        let data_file = expand_path(&data_file_str)?;

        if data_file.as_os_str().is_empty() {
            return Err(AppError::Config("Data file path is empty".to_string()));
        }

        let backup_dir = match env::var(ENV_VAR_FOLIO_BACKUP_DIR) {
            Ok(dir) => expand_path(&dir)?,
            Err(_) => default_backup_dir(&data_file),
        };

        let max_backups = match env::var(ENV_VAR_FOLIO_MAX_BACKUPS) {
            Ok(raw) => parse_max_backups(&raw)?,
            Err(_) => DEFAULT_MAX_BACKUPS,
        };

        let google_api_url = env::var(ENV_VAR_FOLIO_GOOGLE_API_URL)
            .unwrap_or_else(|_| DEFAULT_GOOGLE_API_URL.to_string());
        let openrouter_api_url = env::var(ENV_VAR_FOLIO_OPENROUTER_API_URL)
            .unwrap_or_else(|_| DEFAULT_OPENROUTER_API_URL.to_string());

        Ok(Config {
            data_file,
            backup_dir,
            max_backups,
            google_api_url: google_api_url.trim_end_matches('/').to_string(),
            openrouter_api_url: openrouter_api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Points the configuration at another document, moving the backup
    /// directory along unless it was set explicitly.
    pub fn with_data_file(mut self, data_file: PathBuf) -> Self {
        if self.backup_dir == default_backup_dir(&self.data_file) {
            self.backup_dir = default_backup_dir(&data_file);
        }
        self.data_file = data_file;
        self
    }

    /// Validates that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when the data file path is empty, when it names
    /// a directory, when `max_backups` is zero, or when a provider URL is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio::Config;
    /// use std::path::PathBuf;
    ///
    /// let mut config = Config::for_data_file(PathBuf::from("/absolute/folio.json"));
    /// assert!(config.validate().is_ok());
    ///
    /// config.max_backups = 0;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> AppResult<()> {
        if self.data_file.as_os_str().is_empty() {
            return Err(AppError::Config("Data file path is empty".to_string()));
        }

        if self.data_file.is_dir() {
            return Err(AppError::Config(
                "Data file path points to a directory".to_string(),
            ));
        }

        if self.max_backups == 0 {
            return Err(AppError::Config(
                "Backup retention must keep at least one backup".to_string(),
            ));
        }

        if self.google_api_url.is_empty() || self.openrouter_api_url.is_empty() {
            return Err(AppError::Config("Provider API URL is empty".to_string()));
        }

        Ok(())
    }
}

fn expand_path(raw: &str) -> AppResult<PathBuf> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| AppError::Config(format!("Failed to expand path: {}", e)))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

fn parse_max_backups(raw: &str) -> AppResult<usize> {
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => Err(AppError::Config(format!(
            "{} must be a positive integer, got '{}'",
            ENV_VAR_FOLIO_MAX_BACKUPS, raw
        ))),
        Ok(n) => Ok(n),
    }
}

fn default_backup_dir(data_file: &Path) -> PathBuf {
    match data_file.parent() {
        Some(parent) => parent.join(BACKUP_DIR_NAME),
        None => PathBuf::from(BACKUP_DIR_NAME),
    }
}
