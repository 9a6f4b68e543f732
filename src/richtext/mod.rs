//! Rich text model: positions, serialized events, and the editor surface seam.
//!
//! A page's styled text is persisted as a flat [`RichContent`] list of events.
//! Each event is a `(key, value, index)` triple where `key` is `"text"`,
//! `"tagon-<tag>"` or `"tagoff-<tag>"` and `index` is a `"<line>.<column>"`
//! position. The [`codec`] module converts between that list and any
//! [`EditorSurface`]; [`TextBuffer`] is the in-memory surface used by the
//! editor session.
//!
//! # Module Structure
//!
//! - `buffer`: In-memory styled text buffer
//! - `codec`: Encode/decode between buffers and event lists

pub mod buffer;
pub mod codec;

pub use buffer::TextBuffer;
pub use codec::{decode, decode_plain, encode};

use crate::errors::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Key of plain text events.
pub const TEXT_KEY: &str = "text";
/// Prefix of tag-open event keys.
pub const TAG_ON_PREFIX: &str = "tagon-";
/// Prefix of tag-close event keys.
pub const TAG_OFF_PREFIX: &str = "tagoff-";

/// The inline styles a page can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    Bold,
    Italic,
    BoldItalic,
    Underline,
}

impl Style {
    /// All user-facing styles.
    pub const ALL: [Style; 4] = [Style::Bold, Style::Italic, Style::BoldItalic, Style::Underline];

    /// The tag name stored in rich content for this style.
    pub fn tag(&self) -> &'static str {
        match self {
            Style::Bold => "bold",
            Style::Italic => "italic",
            Style::BoldItalic => "bold_italic",
            Style::Underline => "underline",
        }
    }

    /// Looks a style up by tag name.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Style::ALL.into_iter().find(|s| s.tag() == tag)
    }
}

/// A `(line, column)` location in a text buffer.
///
/// Lines start at 1 and columns at 0, counted in characters. Positions order
/// line-first, which is the only property the codec relies on.
///
/// # Examples
///
/// ```
/// use folio::richtext::Position;
///
/// let pos: Position = "3.14".parse().unwrap();
/// assert_eq!(pos, Position::new(3, 14));
/// assert_eq!(pos.to_string(), "3.14");
/// assert!(Position::new(2, 99) < Position::new(3, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// The first position of any buffer.
    pub const START: Position = Position { line: 1, column: 0 };

    pub fn new(line: usize, column: usize) -> Self {
        Position { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.line, self.column)
    }
}

/// Error returned when a string is not a `<line>.<column>` position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePositionError;

impl fmt::Display for ParsePositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("expected <line>.<column>")
    }
}

impl std::error::Error for ParsePositionError {}

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (line, column) = s.trim().split_once('.').ok_or(ParsePositionError)?;
        let line = line.parse().map_err(|_| ParsePositionError)?;
        let column = column.parse().map_err(|_| ParsePositionError)?;
        Ok(Position { line, column })
    }
}

/// What an event represents, borrowed from its key and value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind<'a> {
    Text(&'a str),
    TagOn(&'a str),
    TagOff(&'a str),
    /// Keys written by other tools; ignored on decode.
    Unknown(&'a str),
}

type RawEvent = (String, String, String);

/// One serialized unit of rich content.
///
/// Serialized as a three-element JSON array `[key, value, index]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEvent", into = "RawEvent")]
pub struct Event {
    pub key: String,
    pub value: String,
    pub index: String,
}

impl From<RawEvent> for Event {
    fn from((key, value, index): RawEvent) -> Self {
        Event { key, value, index }
    }
}

impl From<Event> for RawEvent {
    fn from(event: Event) -> Self {
        (event.key, event.value, event.index)
    }
}

impl Event {
    /// A run of plain text starting at `at`.
    pub fn text(value: impl Into<String>, at: Position) -> Self {
        Event {
            key: TEXT_KEY.to_string(),
            value: value.into(),
            index: at.to_string(),
        }
    }

    /// The start of a tag range.
    pub fn tag_on(tag: &str, at: Position) -> Self {
        Event {
            key: format!("{}{}", TAG_ON_PREFIX, tag),
            value: String::new(),
            index: at.to_string(),
        }
    }

    /// The end of a tag range.
    pub fn tag_off(tag: &str, at: Position) -> Self {
        Event {
            key: format!("{}{}", TAG_OFF_PREFIX, tag),
            value: String::new(),
            index: at.to_string(),
        }
    }

    pub fn kind(&self) -> EventKind<'_> {
        if self.key == TEXT_KEY {
            EventKind::Text(&self.value)
        } else if let Some(tag) = self.key.strip_prefix(TAG_ON_PREFIX) {
            EventKind::TagOn(tag)
        } else if let Some(tag) = self.key.strip_prefix(TAG_OFF_PREFIX) {
            EventKind::TagOff(tag)
        } else {
            EventKind::Unknown(&self.key)
        }
    }

    /// Parses the stored index into a comparable position.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::MalformedPosition` if the index is not `<line>.<column>`.
    pub fn position(&self) -> Result<Position, DecodeError> {
        self.index
            .parse()
            .map_err(|_| DecodeError::MalformedPosition {
                key: self.key.clone(),
                index: self.index.clone(),
            })
    }
}

/// The persisted, ordered event list of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichContent(Vec<Event>);

impl RichContent {
    pub fn new() -> Self {
        RichContent(Vec::new())
    }

    /// The single empty-text event stored for blank pages.
    pub fn placeholder() -> Self {
        RichContent(vec![Event::text("", Position::START)])
    }

    pub fn events(&self) -> &[Event] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn push(&mut self, event: Event) {
        self.0.push(event);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.0.iter()
    }

    /// Concatenates the text events and drops the widget's trailing newline.
    ///
    /// # Examples
    ///
    /// ```
    /// use folio::richtext::{Event, Position, RichContent};
    ///
    /// let content = RichContent::from(vec![
    ///     Event::text("Hello ", Position::new(1, 0)),
    ///     Event::tag_on("bold", Position::new(1, 6)),
    ///     Event::text("world\n", Position::new(1, 6)),
    /// ]);
    /// assert_eq!(content.plain_text(), "Hello world");
    /// ```
    pub fn plain_text(&self) -> String {
        let mut text: String = self
            .0
            .iter()
            .filter_map(|e| match e.kind() {
                EventKind::Text(value) => Some(value),
                _ => None,
            })
            .collect();
        if text.ends_with('\n') {
            text.pop();
        }
        text
    }
}

impl From<Vec<Event>> for RichContent {
    fn from(events: Vec<Event>) -> Self {
        RichContent(events)
    }
}

impl<'a> IntoIterator for &'a RichContent {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One item of an editor surface dump, addressed by character offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text { offset: usize, text: String },
    TagOn { offset: usize, tag: String },
    TagOff { offset: usize, tag: String },
}

/// The operations the codec and session need from an editor widget.
///
/// Offsets count characters from the start of the buffer. Like a text widget,
/// a surface always ends with one implicit newline that is part of its dump
/// but never part of its editable content.
pub trait EditorSurface {
    /// Text runs and tag boundaries in position order, ending with the
    /// implicit trailing newline.
    fn dump(&self) -> Vec<Segment>;

    /// Resolves a character offset to a position.
    fn position_at(&self, offset: usize) -> Position;

    /// Resolves a position to a character offset, clamping out-of-range
    /// lines and columns the way a text widget does.
    fn offset_at(&self, position: Position) -> usize;

    /// True when the editable content is empty.
    fn is_empty(&self) -> bool;

    /// Removes all text, tags and selection.
    fn clear(&mut self);

    /// Inserts text at an offset.
    fn insert(&mut self, offset: usize, text: &str);

    /// Applies a named tag over a range.
    fn tag_add(&mut self, tag: &str, range: Range<usize>);

    /// The selected range, if any.
    fn selection(&self) -> Option<Range<usize>>;

    /// The text inside a range.
    fn text_range(&self, range: Range<usize>) -> String;

    /// Replaces a range with new text.
    fn replace(&mut self, range: Range<usize>, text: &str);
}
