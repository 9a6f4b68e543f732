//! Constants used throughout the application.
//!
//! This module contains all constants used in the folio application, organized
//! into logical groups. Having constants centralized makes them easier to find,
//! modify, and reference consistently.

// Application Metadata
/// The name of the application.
pub const APP_NAME: &str = "folio";
/// Title sent to providers that want to know who is calling.
pub const APP_TITLE: &str = "Folio AI Content Assistant";
/// The description of the application used in CLI help text.
pub const APP_DESCRIPTION: &str = "A writing assistant that organizes pages into folders and transforms them with AI functions";

// CLI Arguments & Defaults
/// Log format identifier for plain text.
pub const LOG_FORMAT_TEXT: &str = "text";
/// Log format identifier for JSON.
pub const LOG_FORMAT_JSON: &str = "json";
/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

// Configuration Keys & Environment Variables
/// Environment variable for the document file path.
pub const ENV_VAR_FOLIO_DATA_FILE: &str = "FOLIO_DATA_FILE";
/// Environment variable for the backup directory.
pub const ENV_VAR_FOLIO_BACKUP_DIR: &str = "FOLIO_BACKUP_DIR";
/// Environment variable for the number of backups to retain.
pub const ENV_VAR_FOLIO_MAX_BACKUPS: &str = "FOLIO_MAX_BACKUPS";
/// Environment variable overriding the Google Generative Language API base URL.
pub const ENV_VAR_FOLIO_GOOGLE_API_URL: &str = "FOLIO_GOOGLE_API_URL";
/// Environment variable overriding the OpenRouter API base URL.
pub const ENV_VAR_FOLIO_OPENROUTER_API_URL: &str = "FOLIO_OPENROUTER_API_URL";
/// Environment variable selecting the log format.
pub const ENV_VAR_FOLIO_LOG_FORMAT: &str = "FOLIO_LOG_FORMAT";
/// Standard environment variable for the user's home directory.
pub const ENV_VAR_HOME: &str = "HOME";
/// Default location of the document file, relative to the home directory.
pub const DEFAULT_DATA_SUBPATH: &str = "Documents/folio/folio_data.json";
/// Name of the backup directory created next to the document file.
pub const BACKUP_DIR_NAME: &str = "backups";
/// Default number of document backups to keep.
pub const DEFAULT_MAX_BACKUPS: usize = 10;
/// Placeholder string for redacted information in debug output.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

// Document Defaults
/// Folder created in a fresh document.
pub const DEFAULT_FOLDER_NAME: &str = "Story Line";
/// API key entry created in a fresh document.
pub const DEFAULT_API_KEY_NAME: &str = "Default Key";
/// Model selected in a fresh document.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";
/// Functions seeded into the default folder.
pub const DEFAULT_FUNCTIONS: &[(&str, &str)] = &[
    ("Summarize", "Summarize the following text concisely:"),
    (
        "Describe Scene",
        "Expand the following scene description with more sensory details (sight, sound, smell, touch) and atmosphere:",
    ),
    (
        "Generate Dialogue",
        "Write realistic dialogue between [Character A] and [Character B] based on the following context. Ensure their voices are distinct:\nContext:",
    ),
    (
        "Improve Flow",
        "Rewrite the following text to improve the flow, transitions, and readability:",
    ),
    (
        "Show, Don't Tell",
        "Rewrite the following sentence(s) to 'show' the emotion/action rather than 'telling' it:",
    ),
    (
        "Character Reaction",
        "Describe how [Character Name] would realistically react emotionally and physically to the preceding events:",
    ),
    (
        "Suggest Twist",
        "Based on the preceding text, suggest one surprising but plausible plot twist or complication:",
    ),
    (
        "Fix Grammar",
        "Correct any grammar and spelling errors in the following text:",
    ),
];

// Backups
/// Timestamp format used in backup file names.
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
/// Extension of backup files.
pub const BACKUP_EXTENSION: &str = ".bak";

// Rich Text
/// Tag applied to the separator line above appended AI results.
pub const AI_SEPARATOR_TAG: &str = "ai_separator";

// AI Providers
/// Default base URL of the Google Generative Language API.
pub const DEFAULT_GOOGLE_API_URL: &str = "https://generativelanguage.googleapis.com";
/// Default base URL of the OpenRouter API.
pub const DEFAULT_OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";
/// Referer header value sent to OpenRouter.
pub const OPENROUTER_REFERER: &str = "localhost";
/// Generation method a Google model must support to be listed.
pub const GOOGLE_GENERATE_METHOD: &str = "generateContent";
/// Model-list placeholders that must never be used as a model name.
pub const MODEL_PLACEHOLDERS: &[&str] = &[
    "No models found",
    "API Key Required",
    "Permission Denied",
    "Error Fetching Models",
];

// Task Runner
/// Capacity of the completion channel between workers and the owning thread.
pub const TASK_CHANNEL_CAPACITY: usize = 16;

// Logging Configuration
/// Service name used in tracing spans and structured logs.
pub const TRACING_SERVICE_NAME: &str = "folio";
/// Name for the root tracing span covering an application invocation.
pub const TRACING_ROOT_SPAN_NAME: &str = "app_invocation";
