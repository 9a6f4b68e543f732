//! Markdown emphasis highlighting.
//!
//! Scans the buffer for `***x***`, `**x**`, `__x__`, `*x*` and `_x_` and tags
//! the enclosed text. The markers stay in the text. Patterns run strongest
//! first and a later pattern never tags inside a span an earlier one matched,
//! so `***x***` is only `bold_italic`.

use crate::richtext::{EditorSurface, Style, TextBuffer};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;
use tracing::trace;

static BOLD_ITALIC_STARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*\*(.*?)\*\*\*").expect("static regex"));
static BOLD_STARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("static regex"));
static BOLD_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__(.*?)__").expect("static regex"));
static ITALIC_STAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("static regex"));
static ITALIC_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(.*?)_").expect("static regex"));

fn patterns() -> [(&'static Regex, Style); 5] {
    [
        (&*BOLD_ITALIC_STARS, Style::BoldItalic),
        (&*BOLD_STARS, Style::Bold),
        (&*BOLD_UNDERSCORES, Style::Bold),
        (&*ITALIC_STAR, Style::Italic),
        (&*ITALIC_UNDERSCORE, Style::Italic),
    ]
}

/// Re-applies markdown emphasis to the whole buffer.
///
/// Existing `bold`, `italic` and `bold_italic` ranges are cleared first;
/// `underline` and other tags are left alone. Returns the number of spans
/// tagged.
///
/// # Examples
///
/// ```
/// use folio::highlight::apply_markdown;
/// use folio::richtext::TextBuffer;
///
/// let mut buffer = TextBuffer::from_text("a **strong** and _soft_ word");
/// assert_eq!(apply_markdown(&mut buffer), 2);
/// assert_eq!(buffer.tag_ranges("bold"), &[4..10]);
/// assert_eq!(buffer.tag_ranges("italic"), &[18..22]);
/// ```
pub fn apply_markdown(buffer: &mut TextBuffer) -> usize {
    for style in [Style::Bold, Style::Italic, Style::BoldItalic] {
        buffer.tag_clear(style.tag());
    }

    let text = buffer.text().to_string();
    let offsets = CharOffsets::new(&text);
    let mut claimed: Vec<Range<usize>> = Vec::new();
    let mut spans: Vec<(Style, Range<usize>)> = Vec::new();

    for (regex, style) in patterns() {
        for caps in regex.captures_iter(&text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if claimed
                .iter()
                .any(|c| whole.start() < c.end && c.start < whole.end())
            {
                continue;
            }
            claimed.push(whole.range());
            if !inner.is_empty() {
                spans.push((style, offsets.at(inner.start())..offsets.at(inner.end())));
            }
        }
    }

    for (style, range) in &spans {
        trace!("Markdown {} over {:?}", style.tag(), range);
        buffer.tag_add(style.tag(), range.clone());
    }
    spans.len()
}

/// Byte offset to character offset lookup for one string.
struct CharOffsets(Vec<usize>);

impl CharOffsets {
    fn new(text: &str) -> Self {
        let mut map = vec![0; text.len() + 1];
        let mut chars = 0;
        for (byte, ch) in text.char_indices() {
            for slot in &mut map[byte..byte + ch.len_utf8()] {
                *slot = chars;
            }
            chars += 1;
        }
        map[text.len()] = chars;
        CharOffsets(map)
    }

    fn at(&self, byte: usize) -> usize {
        self.0[byte.min(self.0.len() - 1)]
    }
}
