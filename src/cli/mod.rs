//! Command-line interface for folio.
//!
//! The binary is a headless front end over the [`Assistant`](crate::Assistant):
//! every subcommand opens the document, performs one operation and flushes
//! the document on exit.

pub mod commands;

pub use commands::execute;

use crate::constants::{APP_DESCRIPTION, APP_NAME, DEFAULT_LOG_LEVEL, LOG_FORMAT_JSON, LOG_FORMAT_TEXT};
use crate::richtext::Style;
use crate::store::{AppearanceMode, Provider};
use clap::{ArgAction, Parser, Subcommand};
use std::ops::Range;
use std::path::PathBuf;

/// A writing assistant that organizes pages into folders and transforms them with AI functions
#[derive(Parser, Debug)]
#[command(name = APP_NAME, about = APP_DESCRIPTION, version, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Document file to open (overrides FOLIO_DATA_FILE)
    #[arg(long, global = true, value_name = "PATH")]
    pub data_file: Option<PathBuf>,

    /// Log output format (overrides FOLIO_LOG_FORMAT)
    #[arg(long, global = true, value_parser = [LOG_FORMAT_TEXT, LOG_FORMAT_JSON])]
    pub log_format: Option<String>,

    /// Log level filter; RUST_LOG takes precedence
    #[arg(long, global = true, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage folders
    #[command(subcommand)]
    Folder(FolderCommand),

    /// Manage pages and their content
    #[command(subcommand)]
    Page(PageCommand),

    /// Manage a folder's functions
    #[command(subcommand)]
    Function(FunctionCommand),

    /// Manage API keys
    #[command(subcommand)]
    Key(KeyCommand),

    /// Show, select or list models
    #[command(subcommand)]
    Model(ModelCommand),

    /// Show or set the generation provider (google, openrouter)
    Provider { provider: Option<Provider> },

    /// Show or set the appearance mode (System, Light, Dark)
    Appearance { mode: Option<AppearanceMode> },

    /// Manage reference pages sent as context
    #[command(subcommand)]
    Ref(RefCommand),

    /// Run a function on a page, or on part of it
    Run {
        folder: String,
        page: String,
        function: String,

        /// Character range to run on, as START..END
        #[arg(long, value_parser = parse_range)]
        selection: Option<Range<usize>>,

        /// Seconds to wait for the provider
        #[arg(long, default_value_t = 120)]
        timeout: u64,
    },

    /// Find pages containing a term, ignoring case
    Search { term: String },

    /// Save the document under a new path
    SaveAs { path: PathBuf },

    /// Load another document and check that it opens
    Load { path: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum FolderCommand {
    /// List folders
    List,
    /// Add a folder
    Add { name: String },
    /// Delete a folder with its pages and functions
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
pub enum PageCommand {
    /// List the pages of a folder
    List { folder: String },
    /// Add an empty page
    Add { folder: String, name: String },
    /// Delete a page
    Delete { folder: String, name: String },
    /// Print a page
    Show {
        folder: String,
        page: String,
        /// Print the stored rich content instead of plain text
        #[arg(long)]
        json: bool,
    },
    /// Replace a page's text (read from stdin when TEXT is omitted)
    Write {
        folder: String,
        page: String,
        text: Option<String>,
        /// Style **bold**, *italic* and similar markup
        #[arg(long)]
        markdown: bool,
    },
    /// Style a range of a page
    Style {
        folder: String,
        page: String,
        /// bold, italic, bold_italic or underline
        #[arg(value_parser = parse_style)]
        style: Style,
        /// Character range, as START..END
        #[arg(value_parser = parse_range)]
        range: Range<usize>,
    },
    /// Show or replace a page's notes
    Notes {
        folder: String,
        page: String,
        text: Option<String>,
    },
    /// Count the words of a page
    Count { folder: String, page: String },
}

#[derive(Subcommand, Debug)]
pub enum FunctionCommand {
    /// List a folder's functions
    List { folder: String },
    /// Add or replace a function
    Set {
        folder: String,
        name: String,
        prompt: String,
    },
    /// Delete a function
    Delete { folder: String, name: String },
}

#[derive(Subcommand, Debug)]
pub enum KeyCommand {
    /// List key names, marking the selected one
    List,
    /// Add or replace a key
    Set { name: String, value: String },
    /// Delete a key
    Delete { name: String },
    /// Select the key used for requests
    Select { name: String },
}

#[derive(Subcommand, Debug)]
pub enum ModelCommand {
    /// Print the selected model
    Show,
    /// Select a model
    Set { name: String },
    /// Fetch the provider's models
    List,
    /// Show only free OpenRouter models when listing
    FreeOnly {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum RefCommand {
    /// List reference pages
    List,
    /// Add a page as a reference
    Add { folder: String, page: String },
    /// Remove a reference
    Remove { folder: String, page: String },
}

fn parse_style(raw: &str) -> Result<Style, String> {
    Style::from_tag(&raw.trim().to_lowercase()).ok_or_else(|| {
        format!(
            "unknown style '{}', expected bold, italic, bold_italic or underline",
            raw
        )
    })
}

/// Parses `START..END` into a character range.
fn parse_range(raw: &str) -> Result<Range<usize>, String> {
    let (start, end) = raw
        .split_once("..")
        .ok_or_else(|| format!("expected START..END, got '{}'", raw))?;
    let start: usize = start
        .trim()
        .parse()
        .map_err(|_| format!("invalid range start '{}'", start))?;
    let end: usize = end
        .trim()
        .parse()
        .map_err(|_| format!("invalid range end '{}'", end))?;
    if end <= start {
        return Err(format!("range '{}' is empty", raw));
    }
    Ok(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(vec![
            "folio",
            "folder",
            "list",
            "--data-file",
            "/tmp/doc.json",
            "--log-format",
            "json",
            "-v",
        ]);
        assert_eq!(args.data_file, Some(PathBuf::from("/tmp/doc.json")));
        assert_eq!(args.log_format.as_deref(), Some("json"));
        assert_eq!(args.log_level, DEFAULT_LOG_LEVEL);
        assert!(args.verbose);
        assert!(matches!(args.command, Command::Folder(FolderCommand::List)));
    }

    #[test]
    fn test_invalid_log_format_is_rejected() {
        let result = CliArgs::try_parse_from(vec!["folio", "--log-format", "xml", "search", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_with_selection() {
        let args = CliArgs::parse_from(vec![
            "folio",
            "run",
            "Story Line",
            "Intro",
            "Fix Grammar",
            "--selection",
            "3..8",
        ]);
        match args.command {
            Command::Run {
                folder,
                page,
                function,
                selection,
                timeout,
            } => {
                assert_eq!(folder, "Story Line");
                assert_eq!(page, "Intro");
                assert_eq!(function, "Fix Grammar");
                assert_eq!(selection, Some(3..8));
                assert_eq!(timeout, 120);
            }
            other => panic!("Expected run command, got {:?}", other),
        }
    }

    #[test]
    fn test_provider_and_appearance_values() {
        let args = CliArgs::parse_from(vec!["folio", "provider", "openrouter"]);
        assert!(matches!(
            args.command,
            Command::Provider {
                provider: Some(Provider::OpenRouter)
            }
        ));

        let args = CliArgs::parse_from(vec!["folio", "appearance", "Dark"]);
        assert!(matches!(
            args.command,
            Command::Appearance {
                mode: Some(AppearanceMode::Dark)
            }
        ));

        assert!(CliArgs::try_parse_from(vec!["folio", "provider", "ollama"]).is_err());
    }

    #[test]
    fn test_free_only_takes_a_boolean() {
        let args = CliArgs::parse_from(vec!["folio", "model", "free-only", "false"]);
        assert!(matches!(
            args.command,
            Command::Model(ModelCommand::FreeOnly { enabled: false })
        ));
    }

    #[test]
    fn test_style_argument() {
        let args = CliArgs::parse_from(vec!["folio", "page", "style", "F", "P", "Bold", "0..4"]);
        match args.command {
            Command::Page(PageCommand::Style { style, range, .. }) => {
                assert_eq!(style, Style::Bold);
                assert_eq!(range, 0..4);
            }
            other => panic!("Expected page style command, got {:?}", other),
        }
        assert!(CliArgs::try_parse_from(vec!["folio", "page", "style", "F", "P", "strike", "0..4"]).is_err());
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("2..10"), Ok(2..10));
        assert!(parse_range("10..2").is_err());
        assert!(parse_range("5").is_err());
        assert!(parse_range("a..b").is_err());
    }
}
