//! In-memory styled text buffer.
//!
//! `TextBuffer` reproduces the parts of a text widget the rest of the crate
//! depends on: character addressing with `(line, column)` positions, named tag
//! ranges that grow when text is typed inside them, a selection, and a dump
//! that walks text runs and tag boundaries in order.

use super::{EditorSurface, Position, Segment};
use std::collections::BTreeMap;
use std::ops::Range;

/// Styled text with named tag ranges and an optional selection.
///
/// Tag ranges for one name are kept sorted, non-empty, and merged when they
/// touch, so a name never reopens before it closes.
///
/// # Examples
///
/// ```
/// use folio::richtext::{EditorSurface, TextBuffer};
///
/// let mut buffer = TextBuffer::from_text("Hello world");
/// buffer.tag_add("bold", 6..11);
/// buffer.insert(8, "!!");
///
/// assert_eq!(buffer.text(), "Hello wo!!rld");
/// assert_eq!(buffer.tag_ranges("bold"), &[6..13]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    text: String,
    tags: BTreeMap<String, Vec<Range<usize>>>,
    selection: Option<Range<usize>>,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Self {
        TextBuffer {
            text: text.to_string(),
            ..Self::default()
        }
    }

    /// The editable content, without the implicit trailing newline.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of characters of editable content.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Ranges currently carrying `tag`.
    pub fn tag_ranges(&self, tag: &str) -> &[Range<usize>] {
        self.tags.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names of every tag with at least one range.
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    /// Tags covering the character at `offset`.
    pub fn tags_at(&self, offset: usize) -> Vec<&str> {
        self.tags
            .iter()
            .filter(|(_, ranges)| ranges.iter().any(|r| r.start <= offset && offset < r.end))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Removes `tag` from a range, splitting ranges that straddle it.
    pub fn tag_remove(&mut self, tag: &str, range: Range<usize>) {
        let range = self.clamp(range);
        if range.is_empty() {
            return;
        }
        if let Some(ranges) = self.tags.get_mut(tag) {
            let mut kept = Vec::with_capacity(ranges.len() + 1);
            for r in ranges.drain(..) {
                if r.end <= range.start || r.start >= range.end {
                    kept.push(r);
                    continue;
                }
                if r.start < range.start {
                    kept.push(r.start..range.start);
                }
                if r.end > range.end {
                    kept.push(range.end..r.end);
                }
            }
            *ranges = kept;
            if ranges.is_empty() {
                self.tags.remove(tag);
            }
        }
    }

    /// Removes `tag` everywhere.
    pub fn tag_clear(&mut self, tag: &str) {
        self.tags.remove(tag);
    }

    /// Inserts text that carries the given tags, regardless of its neighbours.
    pub fn insert_tagged(&mut self, offset: usize, text: &str, tags: &[&str]) {
        let offset = offset.min(self.char_len());
        self.insert(offset, text);
        let end = offset + text.chars().count();
        for tag in tags {
            self.tag_add(tag, offset..end);
        }
    }

    /// Appends text at the end of the content.
    pub fn append(&mut self, text: &str) {
        let end = self.char_len();
        self.insert(end, text);
    }

    /// Deletes a range of characters.
    pub fn delete(&mut self, range: Range<usize>) {
        let range = self.clamp(range);
        if range.is_empty() {
            return;
        }
        let start_byte = self.byte_at(range.start);
        let end_byte = self.byte_at(range.end);
        self.text.replace_range(start_byte..end_byte, "");

        let removed = range.end - range.start;
        let shift = |x: usize| {
            if x <= range.start {
                x
            } else if x >= range.end {
                x - removed
            } else {
                range.start
            }
        };

        for ranges in self.tags.values_mut() {
            let shifted: Vec<Range<usize>> = ranges
                .iter()
                .map(|r| shift(r.start)..shift(r.end))
                .filter(|r| !r.is_empty())
                .collect();
            *ranges = merge(shifted);
        }
        self.tags.retain(|_, ranges| !ranges.is_empty());

        self.selection = self
            .selection
            .take()
            .map(|r| shift(r.start)..shift(r.end))
            .filter(|r| !r.is_empty());
    }

    /// Selects a range; an empty range clears the selection.
    pub fn set_selection(&mut self, range: Option<Range<usize>>) {
        self.selection = range.map(|r| self.clamp(r)).filter(|r| !r.is_empty());
    }

    /// The selected text, if anything is selected.
    pub fn selected_text(&self) -> Option<String> {
        self.selection.clone().map(|r| self.text_range(r))
    }

    fn clamp(&self, range: Range<usize>) -> Range<usize> {
        let len = self.char_len();
        let start = range.start.min(len);
        let end = range.end.min(len).max(start);
        start..end
    }

    fn byte_at(&self, offset: usize) -> usize {
        self.text
            .char_indices()
            .nth(offset)
            .map(|(b, _)| b)
            .unwrap_or(self.text.len())
    }
}

/// Sorts ranges and merges the ones that overlap or touch.
fn merge(mut ranges: Vec<Range<usize>>) -> Vec<Range<usize>> {
    ranges.sort_by_key(|r| r.start);
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for r in ranges {
        match merged.last_mut() {
            Some(last) if r.start <= last.end => last.end = last.end.max(r.end),
            _ => merged.push(r),
        }
    }
    merged
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum Toggle {
    Off,
    On,
}

impl EditorSurface for TextBuffer {
    fn dump(&self) -> Vec<Segment> {
        let chars: Vec<char> = self.text.chars().collect();

        let mut toggles: Vec<(usize, Toggle, &str)> = Vec::new();
        for (name, ranges) in &self.tags {
            for r in ranges {
                toggles.push((r.start, Toggle::On, name));
                toggles.push((r.end, Toggle::Off, name));
            }
        }
        toggles.sort();

        let mut segments = Vec::with_capacity(toggles.len() * 2 + 1);
        let mut cursor = 0;
        for (offset, toggle, name) in toggles {
            if offset > cursor {
                segments.push(Segment::Text {
                    offset: cursor,
                    text: chars[cursor..offset].iter().collect(),
                });
                cursor = offset;
            }
            let tag = name.to_string();
            segments.push(match toggle {
                Toggle::On => Segment::TagOn { offset, tag },
                Toggle::Off => Segment::TagOff { offset, tag },
            });
        }

        let mut tail: String = chars[cursor..].iter().collect();
        tail.push('\n');
        segments.push(Segment::Text {
            offset: cursor,
            text: tail,
        });
        segments
    }

    fn position_at(&self, offset: usize) -> Position {
        let mut line = 1;
        let mut column = 0;
        for ch in self.text.chars().chain(std::iter::once('\n')).take(offset) {
            if ch == '\n' {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        Position { line, column }
    }

    fn offset_at(&self, position: Position) -> usize {
        if position.line == 0 {
            return 0;
        }
        let mut offset = 0;
        for (index, line) in self.text.split('\n').enumerate() {
            let len = line.chars().count();
            if index + 1 == position.line {
                return offset + position.column.min(len);
            }
            offset += len + 1;
        }
        self.char_len()
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn clear(&mut self) {
        self.text.clear();
        self.tags.clear();
        self.selection = None;
    }

    fn insert(&mut self, offset: usize, text: &str) {
        if text.is_empty() {
            return;
        }
        let offset = offset.min(self.char_len());
        let byte = self.byte_at(offset);
        self.text.insert_str(byte, text);

        let added = text.chars().count();
        // Text typed strictly inside a range joins it; text at an edge does not.
        let shift = |r: &mut Range<usize>| {
            if r.start >= offset {
                r.start += added;
                r.end += added;
            } else if r.end > offset {
                r.end += added;
            }
        };
        for ranges in self.tags.values_mut() {
            ranges.iter_mut().for_each(shift);
        }
        if let Some(selection) = self.selection.as_mut() {
            shift(selection);
        }
    }

    fn tag_add(&mut self, tag: &str, range: Range<usize>) {
        let range = self.clamp(range);
        if range.is_empty() {
            return;
        }
        let ranges = self.tags.entry(tag.to_string()).or_default();
        ranges.push(range);
        *ranges = merge(std::mem::take(ranges));
    }

    fn selection(&self) -> Option<Range<usize>> {
        self.selection.clone()
    }

    fn text_range(&self, range: Range<usize>) -> String {
        let range = self.clamp(range);
        self.text
            .chars()
            .skip(range.start)
            .take(range.end - range.start)
            .collect()
    }

    fn replace(&mut self, range: Range<usize>, text: &str) {
        let range = self.clamp(range);
        self.delete(range.clone());
        self.insert(range.start, text);
    }
}
