//! Error handling utilities for the folio application.
//!
//! This module provides the central error type `AppError` which represents all
//! possible error conditions that might occur in the application, as well as the
//! convenience type alias `AppResult` for functions that can return these errors.
//!
//! Each concern owns a dedicated error enum (`ValidationError`, `PersistenceError`,
//! `DecodeError`, `AIError`, `TaskError`, `AssistantError`) which converts into
//! `AppError` through `From`.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Precondition failures reported by document store mutators.
///
/// A validation error always means the operation was refused and the document
/// was left untouched.
///
/// # Examples
///
/// ```
/// use folio::errors::ValidationError;
///
/// let error = ValidationError::DuplicateFolder("Drafts".to_string());
/// assert!(format!("{}", error).contains("already exists"));
/// assert!(format!("{}", error).contains("Drafts"));
/// ```
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A folder, page, function or key name was empty after trimming.
    #[error("Name cannot be empty")]
    EmptyName,

    /// A folder with this name already exists.
    #[error("Folder '{0}' already exists")]
    DuplicateFolder(String),

    /// The named folder does not exist.
    #[error("Folder '{0}' not found")]
    FolderNotFound(String),

    /// A page with this name already exists in the folder.
    #[error("Page '{page}' already exists in folder '{folder}'")]
    DuplicatePage {
        /// Folder that already holds the page
        folder: String,
        /// The duplicated page name
        page: String,
    },

    /// The named page does not exist in the folder.
    #[error("Page '{page}' not found in folder '{folder}'")]
    PageNotFound {
        /// Folder that was searched
        folder: String,
        /// The missing page name
        page: String,
    },

    /// The named function does not exist in the folder.
    #[error("Function '{name}' not found in folder '{folder}'")]
    FunctionNotFound {
        /// Folder that was searched
        folder: String,
        /// The missing function name
        name: String,
    },

    /// Deleting this folder would leave the document without folders.
    #[error("Cannot delete folder '{0}': at least one folder must remain")]
    LastFolder(String),

    /// Deleting this key would leave the document without API keys.
    #[error("Cannot delete API key '{0}': at least one key must remain")]
    LastApiKey(String),

    /// The named API key does not exist.
    #[error("API key '{0}' not found")]
    ApiKeyNotFound(String),

    /// The page is already registered as a reference.
    #[error("Reference '{0}' already exists")]
    DuplicateReference(String),

    /// The page is not registered as a reference.
    #[error("Reference '{0}' not found")]
    ReferenceNotFound(String),
}

/// Failures while reading or writing the document file.
///
/// When a write fails the in-memory document keeps the mutation, so the next
/// successful save brings the file back in line.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Writing the document file failed.
    #[error("Failed to write document {path}: {source}. Please check disk space and file permissions.")]
    Write {
        /// The document path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Reading the document file failed.
    #[error("Failed to read document {path}: {source}")]
    Read {
        /// The document path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The document file is not a valid folio document.
    #[error("Document {path} could not be parsed: {source}")]
    Parse {
        /// The document path
        path: PathBuf,
        /// The underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory document could not be serialized.
    #[error("Failed to serialize document: {0}")]
    Serialize(#[source] serde_json::Error),

    /// Copying the document (save-as or backup) failed.
    #[error("Failed to copy document to {path}: {source}")]
    Copy {
        /// The destination path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Malformed rich-content data encountered while rebuilding a page.
///
/// # Examples
///
/// ```
/// use folio::errors::DecodeError;
///
/// let error = DecodeError::MalformedPosition {
///     key: "tagon-bold".to_string(),
///     index: "one.two".to_string(),
/// };
/// assert!(format!("{}", error).contains("one.two"));
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A position string was not of the form `<line>.<column>`.
    #[error("Malformed position '{index}' in '{key}' event")]
    MalformedPosition {
        /// The event key carrying the bad position
        key: String,
        /// The raw position string
        index: String,
    },
}

/// Broad classes of provider failures, each with its own user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    /// Invalid or unauthorized API key.
    Authentication,
    /// Bad model name, prompt or content.
    InvalidArgument,
    /// Quota or rate limit exhausted.
    QuotaExceeded,
    /// The provider could not be reached.
    Network,
    /// Anything else.
    Other,
}

impl ProviderErrorKind {
    /// Maps an HTTP status code to a kind, when the status alone is conclusive.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            401 | 403 => Some(Self::Authentication),
            400 | 404 | 422 => Some(Self::InvalidArgument),
            429 => Some(Self::QuotaExceeded),
            _ => None,
        }
    }

    /// Classifies a provider error from its message text.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio::errors::ProviderErrorKind;
    ///
    /// assert_eq!(
    ///     ProviderErrorKind::classify("403 Permission denied on resource"),
    ///     ProviderErrorKind::Authentication
    /// );
    /// assert_eq!(
    ///     ProviderErrorKind::classify("429 ResourceExhausted: quota exceeded"),
    ///     ProviderErrorKind::QuotaExceeded
    /// );
    /// assert_eq!(ProviderErrorKind::classify("teapot"), ProviderErrorKind::Other);
    /// ```
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&[
            "permission denied",
            "permission_denied",
            "unauthorized",
            "unauthenticated",
            "api key not valid",
            "invalid api key",
        ]) {
            Self::Authentication
        } else if has(&["resourceexhausted", "resource_exhausted", "quota", "rate limit"]) {
            Self::QuotaExceeded
        } else if has(&["invalid argument", "invalid_argument"]) {
            Self::InvalidArgument
        } else if has(&["network", "connection", "ssl", "timed out", "dns"]) {
            Self::Network
        } else if has(&["model", "prompt"]) {
            Self::InvalidArgument
        } else {
            Self::Other
        }
    }

    /// Short title for reporting this kind of failure.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Authentication => "API Permission Error",
            Self::InvalidArgument => "AI Argument Error",
            Self::QuotaExceeded => "API Quota Error",
            Self::Network => "Network Error",
            Self::Other => "AI Execution Error",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Authentication => "Permission denied. Check API key validity/permissions",
            Self::InvalidArgument => "Invalid argument. Check model/prompt/content",
            Self::QuotaExceeded => "Quota exceeded",
            Self::Network => "Network/connection issue. Check internet/firewall",
            Self::Other => "Provider error",
        };
        f.write_str(text)
    }
}

/// Represents specific error cases that can occur during AI operations.
///
/// # Examples
///
/// ```
/// use folio::errors::{AIError, ProviderErrorKind};
///
/// let error = AIError::Provider {
///     kind: ProviderErrorKind::QuotaExceeded,
///     message: "HTTP 429: slow down".to_string(),
/// };
/// assert!(format!("{}", error).contains("Quota exceeded"));
/// assert!(format!("{}", error).contains("slow down"));
/// ```
#[derive(Debug, Error)]
pub enum AIError {
    /// The provider rejected the request or could not be reached.
    #[error("{kind}. Details: {message}")]
    Provider {
        /// Classified failure kind
        kind: ProviderErrorKind,
        /// Raw provider message
        message: String,
    },

    /// The request succeeded but produced no usable text.
    #[error("Empty response from AI")]
    EmptyResponse,

    /// OpenRouter answered without any choices.
    #[error("No response choices from OpenRouter")]
    NoChoices,

    /// The provider answered with something that could not be parsed.
    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),
}

impl AIError {
    /// Builds a provider error, classifying it from the message text.
    pub fn provider(message: impl Into<String>) -> Self {
        let message = message.into();
        AIError::Provider {
            kind: ProviderErrorKind::classify(&message),
            message,
        }
    }

    /// Builds a provider error for a non-success HTTP status.
    pub fn http(status: u16, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status, body);
        let kind = ProviderErrorKind::from_status(status)
            .unwrap_or_else(|| ProviderErrorKind::classify(&message));
        AIError::Provider { kind, message }
    }

    /// Builds a provider error for a transport failure.
    pub fn transport(error: reqwest::Error) -> Self {
        let message = error.to_string();
        let kind = if error.is_connect() || error.is_timeout() {
            ProviderErrorKind::Network
        } else {
            ProviderErrorKind::classify(&message)
        };
        AIError::Provider { kind, message }
    }

    /// The classified kind, for provider errors.
    pub fn kind(&self) -> Option<ProviderErrorKind> {
        match self {
            AIError::Provider { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Errors raised by the background task runner.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A generation request is already in flight.
    #[error("AI is currently processing. Please wait.")]
    Busy,

    /// The worker thread panicked before producing a result.
    #[error("Background task panicked: {0}")]
    WorkerPanicked(String),

    /// The completion channel closed unexpectedly.
    #[error("Background task channel disconnected")]
    Disconnected,

    /// No completion arrived in time.
    #[error("Timed out after {0} seconds waiting for the provider")]
    TimedOut(u64),
}

/// Preconditions for running a function that are not store validations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssistantError {
    /// No page is open in the editor.
    #[error("Please select a page first.")]
    NoPageSelected,

    /// No API key is selected, or the selected key is blank.
    #[error("API key is not configured. Add or select a key first.")]
    NoApiKey,

    /// Nothing to send to the model.
    #[error("Workspace/Selection is empty. Nothing to process.")]
    EmptyContent,

    /// The selected model is missing or a placeholder.
    #[error("Invalid AI model ('{0}'). Select a valid model.")]
    InvalidModel(String),
}

/// Represents all possible errors that can occur in the folio application.
///
/// This enum is the central error type used across the application, with variants
/// for different error categories. It uses `thiserror` for deriving the `Error` trait
/// implementation and formatted error messages.
///
/// # Examples
///
/// ```
/// use folio::errors::AppError;
///
/// let error = AppError::Config("Missing data file".to_string());
/// assert_eq!(format!("{}", error), "Configuration error: Missing data file");
/// ```
///
/// Converting from an IO error:
/// ```
/// use folio::errors::AppError;
/// use std::io::{self, ErrorKind};
///
/// let io_error = io::Error::new(ErrorKind::NotFound, "file not found");
/// let app_error: AppError = io_error.into();
///
/// match app_error {
///     AppError::Io(inner) => assert_eq!(inner.kind(), ErrorKind::NotFound),
///     _ => panic!("Expected Io variant"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    /// Errors related to configuration loading or validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input/output errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A store operation was refused.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The document could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Rich content could not be rebuilt.
    #[error("Load error: {0}")]
    Decode(#[from] DecodeError),

    /// Errors related to AI operations.
    #[error("AI error: {0}")]
    AI(#[from] AIError),

    /// Errors from the background task runner.
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    /// A function run could not start.
    #[error("{0}")]
    Assistant(#[from] AssistantError),
}

impl AppError {
    /// Returns true for refused operations that left state untouched.
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

/// A type alias for `Result<T, AppError>` to simplify function signatures.
///
/// # Examples
///
/// ```
/// use folio::errors::{AppResult, AppError};
///
/// fn might_fail() -> AppResult<String> {
///     if false {
///         return Err(AppError::Config("Something went wrong".to_string()));
///     }
///     Ok("Operation succeeded".to_string())
/// }
/// assert!(might_fail().is_ok());
/// ```
pub type AppResult<T> = Result<T, AppError>;
