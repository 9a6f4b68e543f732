/*!
# Folio - AI Content Assistant

Folio keeps writing projects in a single JSON document: folders of styled
pages, per-folder AI functions (reusable system prompts), reference pages and
provider settings. This binary is a headless front end that performs one
operation per invocation.

## Usage

```
folio [OPTIONS] <COMMAND>

Commands:
  folder      Manage folders
  page        Manage pages and their content
  function    Manage a folder's functions
  key         Manage API keys
  model       Show, select or list models
  provider    Show or set the generation provider (google, openrouter)
  appearance  Show or set the appearance mode (System, Light, Dark)
  ref         Manage reference pages sent as context
  run         Run a function on a page, or on part of it
  search      Find pages containing a term, ignoring case
  save-as     Save the document under a new path
  load        Load another document and check that it opens

Options:
      --data-file <PATH>         Document file to open (overrides FOLIO_DATA_FILE)
      --log-format <LOG_FORMAT>  Log output format (overrides FOLIO_LOG_FORMAT)
      --log-level <LOG_LEVEL>    Log level filter; RUST_LOG takes precedence
  -v, --verbose                  Enable debug logging
```

## Configuration

- `FOLIO_DATA_FILE`: The document file (defaults to ~/Documents/folio/folio_data.json)
- `FOLIO_BACKUP_DIR`, `FOLIO_MAX_BACKUPS`: Backup location and retention
- `FOLIO_GOOGLE_API_URL`, `FOLIO_OPENROUTER_API_URL`: Provider endpoints
*/

use clap::Parser;
use folio::cli::{self, CliArgs};
use folio::config::Config;
use folio::constants::{
    ENV_VAR_FOLIO_LOG_FORMAT, LOG_FORMAT_JSON, LOG_FORMAT_TEXT, TRACING_ROOT_SPAN_NAME,
    TRACING_SERVICE_NAME,
};
use folio::errors::{AppError, AppResult};
use folio::Assistant;
use std::io;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn main() {
    let args = CliArgs::parse();

    if let Err(e) = init_tracing(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    let correlation_id = Uuid::new_v4();
    let root_span = tracing::info_span!(
        TRACING_ROOT_SPAN_NAME,
        service = TRACING_SERVICE_NAME,
        correlation_id = %correlation_id
    );
    let _guard = root_span.enter();

    if let Err(e) = run(&args) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Loads configuration, opens the document, runs the subcommand and flushes.
fn run(args: &CliArgs) -> AppResult<()> {
    info!("Starting folio");
    debug!("CLI arguments: {:?}", args);

    let mut config = Config::load()?;
    if let Some(path) = &args.data_file {
        config = config.with_data_file(path.clone());
    }
    config.validate()?;
    debug!("Configuration: {:?}", config);

    let mut assistant = Assistant::open(config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let outcome = cli::execute(args, &mut assistant, &mut out);

    // The document is flushed even when the command failed.
    let flushed = assistant.close();
    outcome?;
    flushed
}

fn init_tracing(args: &CliArgs) -> AppResult<()> {
    let format = args
        .log_format
        .clone()
        .or_else(|| std::env::var(ENV_VAR_FOLIO_LOG_FORMAT).ok())
        .unwrap_or_else(|| LOG_FORMAT_TEXT.to_string());
    let level = if args.verbose {
        "debug"
    } else {
        args.log_level.as_str()
    };

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| AppError::Config(format!("Invalid log level '{}': {}", level, e)))?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    let installed = match format.as_str() {
        LOG_FORMAT_JSON => builder.json().with_current_span(true).try_init(),
        LOG_FORMAT_TEXT => builder.try_init(),
        other => {
            return Err(AppError::Config(format!(
                "Unknown log format '{}', expected '{}' or '{}'",
                other, LOG_FORMAT_TEXT, LOG_FORMAT_JSON
            )))
        }
    };
    installed.map_err(|e| AppError::Config(format!("Failed to initialize logging: {}", e)))
}
