//! Prompt assembly for function runs.
//!
//! Every system prompt is prefixed with a fixed instruction asking for plain
//! output, since replies land in a rich-text page that does its own styling.
//! Reference pages are sent ahead of the user content inside a delimited
//! preamble.

/// Prepended to every function's system prompt.
pub const NO_FORMATTING_PREFIX: &str = "No formatting. ";

const REFERENCES_HEADER: &str = "--- Reference Content (For Context) ---\n";
const REFERENCES_FOOTER: &str = "\n--- End References ---\n\n";

/// The system prompt actually sent for a function.
pub fn system_prompt(function_prompt: &str) -> String {
    format!("{}{}", NO_FORMATTING_PREFIX, function_prompt)
}

/// Page text sent as context with a function run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceText {
    /// Page name shown in the preamble
    pub page: String,
    /// Plain text of the page
    pub text: String,
}

/// Builds the user message: the reference preamble, if any, then the content.
///
/// # Examples
///
/// ```
/// use folio::ai::prompts::{user_content, ReferenceText};
///
/// let refs = vec![ReferenceText {
///     page: "Cast".to_string(),
///     text: "Ada, a pilot.".to_string(),
/// }];
/// let message = user_content(&refs, "Ada lands.");
/// assert_eq!(
///     message,
///     "--- Reference Content (For Context) ---\n\n[Cast]:\nAda, a pilot.\n\n--- End References ---\n\nAda lands."
/// );
/// assert_eq!(user_content(&[], "Ada lands."), "Ada lands.");
/// ```
pub fn user_content(references: &[ReferenceText], content: &str) -> String {
    if references.is_empty() {
        return content.to_string();
    }
    let mut message = String::from(REFERENCES_HEADER);
    for reference in references {
        message.push_str(&format!("\n[{}]:\n{}\n", reference.page, reference.text));
    }
    message.push_str(REFERENCES_FOOTER);
    message.push_str(content);
    message
}

/// Whether a Google model takes no system instruction.
pub fn is_gemma(model: &str) -> bool {
    model.to_lowercase().contains("gemma")
}

/// Folds the system prompt into the user content for models without a
/// system role.
pub fn inline_system_prompt(system: &str, content: &str) -> String {
    format!("{}\n\n{}", system, content)
}
