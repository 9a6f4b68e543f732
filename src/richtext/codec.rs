//! Conversion between editor surfaces and persisted event lists.
//!
//! Encoding walks the surface dump, flushing the accumulated text run every
//! time a tag boundary is crossed. Decoding rebuilds the text first and then
//! replays matched `tagon`/`tagoff` pairs in position order, resolving every
//! stored position against the freshly built buffer.

use super::{EditorSurface, Event, EventKind, Position, RichContent, Segment};
use crate::errors::DecodeError;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Serializes a surface into an event list.
///
/// A blank surface encodes to the single placeholder event, without the
/// trailing newline its dump would carry.
///
/// # Examples
///
/// ```
/// use folio::richtext::{encode, EditorSurface, TextBuffer};
///
/// let mut buffer = TextBuffer::from_text("Hi there");
/// buffer.tag_add("bold", 3..8);
///
/// let content = encode(&buffer);
/// let keys: Vec<&str> = content.iter().map(|e| e.key.as_str()).collect();
/// assert_eq!(keys, ["text", "tagon-bold", "text", "tagoff-bold", "text"]);
/// assert_eq!(content.events()[2].value, "there");
/// assert_eq!(content.events()[2].index, "1.3");
/// ```
pub fn encode<S: EditorSurface + ?Sized>(surface: &S) -> RichContent {
    if surface.is_empty() {
        return RichContent::placeholder();
    }

    let mut content = RichContent::new();
    let mut run = String::new();
    let mut run_len = 0;
    // Offset just past the most recent text seen.
    let mut cursor = 0;

    for segment in surface.dump() {
        match segment {
            Segment::Text { offset, text } => {
                let len = text.chars().count();
                run.push_str(&text);
                run_len += len;
                cursor = offset + len;
            }
            Segment::TagOn { offset, tag } => {
                flush(surface, &mut content, &mut run, &mut run_len, cursor);
                content.push(Event::tag_on(&tag, surface.position_at(offset)));
                cursor = offset;
            }
            Segment::TagOff { offset, tag } => {
                flush(surface, &mut content, &mut run, &mut run_len, cursor);
                content.push(Event::tag_off(&tag, surface.position_at(offset)));
                cursor = offset;
            }
        }
    }
    flush(surface, &mut content, &mut run, &mut run_len, cursor);
    trace!("Encoded {} events", content.len());
    content
}

fn flush<S: EditorSurface + ?Sized>(
    surface: &S,
    content: &mut RichContent,
    run: &mut String,
    run_len: &mut usize,
    cursor: usize,
) {
    if run.is_empty() {
        return;
    }
    let start = surface.position_at(cursor.saturating_sub(*run_len));
    content.push(Event::text(std::mem::take(run), start));
    *run_len = 0;
}

/// Rebuilds a surface from an event list.
///
/// The surface is cleared, the concatenated text (minus one trailing newline)
/// is inserted, and each `tagon`/`tagoff` pair is applied in position order.
/// Unmatched `tagon` events are dropped; unknown keys are ignored.
///
/// # Errors
///
/// Returns `DecodeError::MalformedPosition` when any event carries a position
/// that cannot be parsed. The surface is left untouched in that case.
///
/// # Examples
///
/// ```
/// use folio::richtext::{decode, encode, TextBuffer, EditorSurface};
///
/// let mut original = TextBuffer::from_text("line one\nline two");
/// original.tag_add("italic", 5..13);
///
/// let mut rebuilt = TextBuffer::new();
/// decode(&encode(&original), &mut rebuilt).unwrap();
///
/// assert_eq!(rebuilt.text(), "line one\nline two");
/// assert_eq!(rebuilt.tag_ranges("italic"), &[5..13]);
/// ```
pub fn decode<S: EditorSurface + ?Sized>(
    content: &RichContent,
    surface: &mut S,
) -> Result<(), DecodeError> {
    let mut ordered: Vec<(Position, &Event)> = content
        .iter()
        .map(|event| event.position().map(|pos| (pos, event)))
        .collect::<Result<_, _>>()?;
    // Stable, so events sharing a position keep their stored order.
    ordered.sort_by_key(|(pos, _)| *pos);

    surface.clear();
    surface.insert(0, &content.plain_text());

    let mut pending: HashMap<&str, Position> = HashMap::new();
    for (pos, event) in ordered {
        match event.kind() {
            EventKind::TagOn(tag) => {
                pending.insert(tag, pos);
            }
            EventKind::TagOff(tag) => match pending.remove(tag) {
                Some(start) => {
                    let start = surface.offset_at(start);
                    let end = surface.offset_at(pos);
                    if start < end {
                        surface.tag_add(tag, start..end);
                    }
                }
                None => debug!("Ignoring tagoff-{} without a matching tagon", tag),
            },
            EventKind::Unknown(key) => debug!("Ignoring unknown rich content event '{}'", key),
            EventKind::Text(_) => {}
        }
    }

    if !pending.is_empty() {
        debug!("Dropping {} unmatched tagon events", pending.len());
    }
    Ok(())
}

/// Replaces the surface content with the plain text of an event list.
///
/// Used when [`decode`] fails: the text is recovered without any styling.
pub fn decode_plain<S: EditorSurface + ?Sized>(content: &RichContent, surface: &mut S) {
    surface.clear();
    surface.insert(0, &content.plain_text());
}
