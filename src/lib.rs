/*!
# Folio

Folio is a writing assistant that organizes text into folders and pages,
keeps them in a single JSON document, and sends page or selection text to a
hosted language model to transform it with user-defined "functions":
reusable system prompts such as "Summarize" or "Fix Grammar".

## Architecture

- `store`: The persisted document, atomic saves and rotating backups
- `richtext`: Styled text buffer and its flat, JSON-friendly encoding
- `session`: The open page, its working buffer and save-on-navigate
- `highlight`: Markdown-style emphasis applied as style tags
- `ai`: Google and OpenRouter providers behind one client
- `tasks`: Worker threads for network calls
- `assistant`: The coordinator tying the pieces together
- `ops`: Search and word counts
- `cli`: Command-line front end

## Usage Example

```rust,no_run
use folio::{Assistant, Config};

fn main() -> folio::AppResult<()> {
    let config = Config::load()?;
    let mut assistant = Assistant::open(config)?;

    assistant.store_mut().add_page("Story Line", "Chapter 1")?;
    assistant.select_page("Story Line", "Chapter 1")?;
    assistant.session_mut().set_text("It was a dark and **stormy** night.");
    assistant.session_mut().apply_markdown();

    assistant.close()
}
```
*/

/// Google and OpenRouter generation clients
pub mod ai;
/// Coordinator owning the document, the open page and background work
pub mod assistant;
/// Command-line interface for parsing and handling user arguments
pub mod cli;
/// Configuration loading and management
pub mod config;
/// Application-wide constants
pub mod constants;
/// Error types and utilities for error handling
pub mod errors;
/// Markdown emphasis highlighting
pub mod highlight;
/// Operations over the whole document
pub mod ops;
/// Styled text and its persisted encoding
pub mod richtext;
/// The open page and its working buffer
pub mod session;
/// The persisted document
pub mod store;
/// Background work for network calls
pub mod tasks;

// Re-export important types for convenience
pub use assistant::{Assistant, AssistantEvent, Placement};
pub use cli::CliArgs;
pub use config::Config;
pub use errors::{AppError, AppResult};
pub use richtext::{RichContent, Style, TextBuffer};
pub use session::EditorSession;
pub use store::DocumentStore;
