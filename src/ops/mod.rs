//! Read-only operations over the document.
//!
//! This module provides user-facing helpers that work across folders and
//! pages without touching the editor session.

pub mod search;

pub use search::{search_pages, SearchHit};

/// Counts whitespace-separated words.
///
/// # Examples
///
/// ```
/// use folio::ops::word_count;
///
/// assert_eq!(word_count("  one two\n\tthree "), 3);
/// assert_eq!(word_count(""), 0);
/// ```
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
