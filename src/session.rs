//! The open page and its working buffer.
//!
//! `EditorSession` tracks which folder and page are open, holds the working
//! [`TextBuffer`], and writes it back through the [`DocumentStore`] whenever
//! the user navigates away. Writes are skipped when the encoded buffer equals
//! what was last persisted.

use crate::errors::{AppResult, DecodeError, ValidationError};
use crate::highlight;
use crate::ops::word_count;
use crate::richtext::{self, EditorSurface, RichContent, Style, TextBuffer};
use crate::store::DocumentStore;
use std::ops::Range;
use tracing::{debug, info, warn};

/// How a page's content came into the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLoad {
    /// Text and styling were restored.
    Loaded,
    /// The content was malformed; only its plain text is shown.
    Recovered(DecodeError),
}

/// Result of [`EditorSession::save_current_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No page is open, or the editor is locked.
    Skipped,
    /// The buffer matches what is on disk.
    Unchanged,
    /// The page was written.
    Saved,
}

#[derive(Debug, Default)]
pub struct EditorSession {
    folder: Option<String>,
    page: Option<String>,
    last_persisted: Option<RichContent>,
    editable: bool,
    buffer: TextBuffer,
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    pub fn current_page(&self) -> Option<&str> {
        self.page.as_deref()
    }

    /// The open `(folder, page)`, if any.
    pub fn open_page(&self) -> Option<(&str, &str)> {
        Some((self.folder.as_deref()?, self.page.as_deref()?))
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// Locks or unlocks the editor. A locked editor is never saved.
    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
    }

    /// True when the buffer differs from what was last written.
    pub fn has_unsaved_changes(&self) -> bool {
        self.page.is_some() && self.last_persisted.as_ref() != Some(&richtext::encode(&self.buffer))
    }

    /// Opens a folder and, if it has pages, its alphabetically first page.
    ///
    /// The open page is saved first; a failed save aborts the switch.
    pub fn select_folder(
        &mut self,
        store: &mut DocumentStore,
        folder: &str,
    ) -> AppResult<Option<PageLoad>> {
        if !store.has_folder(folder) {
            return Err(ValidationError::FolderNotFound(folder.to_string()).into());
        }
        self.save_current_page(store)?;

        self.folder = Some(folder.to_string());
        self.forget_page();
        info!("Selected folder '{}'", folder);

        let first = store.page_names(folder).into_iter().min().map(str::to_string);
        match first {
            Some(page) => self.select_page(store, folder, &page).map(Some),
            None => Ok(None),
        }
    }

    /// Opens a page, saving the previously open page first.
    ///
    /// Malformed content is shown as plain text and reported through
    /// [`PageLoad::Recovered`]. The recovered buffer is treated as persisted,
    /// so the stored data is only overwritten once the user edits the page.
    pub fn select_page(
        &mut self,
        store: &mut DocumentStore,
        folder: &str,
        page: &str,
    ) -> AppResult<PageLoad> {
        if store.page(folder, page).is_none() {
            return Err(ValidationError::PageNotFound {
                folder: folder.to_string(),
                page: page.to_string(),
            }
            .into());
        }
        // Reopening the same page must not discard its edits either.
        self.save_current_page(store)?;
        let content = store.page_content(folder, page).cloned().unwrap_or_default();

        self.folder = Some(folder.to_string());
        self.page = Some(page.to_string());
        self.editable = true;

        let outcome = match richtext::decode(&content, &mut self.buffer) {
            Ok(()) => {
                self.last_persisted = Some(content);
                PageLoad::Loaded
            }
            Err(e) => {
                warn!("Could not restore '{}/{}': {}", folder, page, e);
                richtext::decode_plain(&content, &mut self.buffer);
                self.last_persisted = Some(richtext::encode(&self.buffer));
                PageLoad::Recovered(e)
            }
        };
        info!("Selected page '{}/{}'", folder, page);
        Ok(outcome)
    }

    /// Writes the open page if it changed since the last write.
    pub fn save_current_page(&mut self, store: &mut DocumentStore) -> AppResult<SaveOutcome> {
        let (Some(folder), Some(page)) = (self.folder.clone(), self.page.clone()) else {
            return Ok(SaveOutcome::Skipped);
        };
        if !self.editable {
            return Ok(SaveOutcome::Skipped);
        }

        let content = richtext::encode(&self.buffer);
        if self.last_persisted.as_ref() == Some(&content) {
            return Ok(SaveOutcome::Unchanged);
        }
        store.update_page_content(&folder, &page, content.clone())?;
        self.last_persisted = Some(content);
        debug!("Saved page '{}/{}'", folder, page);
        Ok(SaveOutcome::Saved)
    }

    /// Saves pending edits and closes the open page and folder.
    pub fn close(&mut self, store: &mut DocumentStore) -> AppResult<()> {
        self.save_current_page(store)?;
        self.reset();
        Ok(())
    }

    /// Forgets the open folder and page without saving.
    pub fn reset(&mut self) {
        self.folder = None;
        self.forget_page();
    }

    fn forget_page(&mut self) {
        self.page = None;
        self.last_persisted = None;
        self.editable = false;
        self.buffer.clear();
    }

    /// Replaces the buffer content with plain text, dropping all styling.
    pub fn set_text(&mut self, text: &str) {
        self.buffer.clear();
        self.buffer.insert(0, text);
    }

    pub fn select(&mut self, range: Option<Range<usize>>) {
        self.buffer.set_selection(range);
    }

    /// Toggles a style over the selection.
    ///
    /// The style is removed when the first selected character already carries
    /// it and added otherwise. Returns false when nothing is selected.
    pub fn toggle_style(&mut self, style: Style) -> bool {
        if self.page.is_none() {
            return false;
        }
        let Some(range) = self.buffer.selection() else {
            return false;
        };
        if self.buffer.tags_at(range.start).contains(&style.tag()) {
            self.buffer.tag_remove(style.tag(), range);
        } else {
            self.buffer.tag_add(style.tag(), range);
        }
        true
    }

    /// Runs the markdown highlighter over the open page.
    pub fn apply_markdown(&mut self) -> usize {
        if self.page.is_none() || !self.editable {
            return 0;
        }
        highlight::apply_markdown(&mut self.buffer)
    }

    pub fn page_word_count(&self) -> usize {
        word_count(self.buffer.text())
    }

    pub fn selection_word_count(&self) -> usize {
        self.buffer
            .selected_text()
            .map_or(0, |text| word_count(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::constants::DEFAULT_FOLDER_NAME;
    use crate::richtext::{Event, Position};
    use tempfile::tempdir;

    fn setup(dir: &std::path::Path) -> (DocumentStore, EditorSession) {
        let mut store = DocumentStore::open(&Config::for_data_file(dir.join("folio.json")));
        store.add_page(DEFAULT_FOLDER_NAME, "B").unwrap();
        store.add_page(DEFAULT_FOLDER_NAME, "A").unwrap();
        (store, EditorSession::new())
    }

    #[test]
    fn test_select_folder_opens_first_page_alphabetically() {
        let dir = tempdir().unwrap();
        let (mut store, mut session) = setup(dir.path());

        let load = session.select_folder(&mut store, DEFAULT_FOLDER_NAME).unwrap();
        assert_eq!(load, Some(PageLoad::Loaded));
        assert_eq!(session.open_page(), Some((DEFAULT_FOLDER_NAME, "A")));
        assert!(session.is_editable());
    }

    #[test]
    fn test_empty_folder_has_no_open_page() {
        let dir = tempdir().unwrap();
        let (mut store, mut session) = setup(dir.path());
        store.add_folder("Empty").unwrap();

        assert_eq!(session.select_folder(&mut store, "Empty").unwrap(), None);
        assert_eq!(session.current_folder(), Some("Empty"));
        assert_eq!(session.current_page(), None);
        assert!(!session.is_editable());
    }

    #[test]
    fn test_save_skips_identical_content() {
        let dir = tempdir().unwrap();
        let (mut store, mut session) = setup(dir.path());
        session.select_page(&mut store, DEFAULT_FOLDER_NAME, "A").unwrap();
        session.set_text("hello");

        let writes = store.write_count();
        assert_eq!(session.save_current_page(&mut store).unwrap(), SaveOutcome::Saved);
        assert_eq!(session.save_current_page(&mut store).unwrap(), SaveOutcome::Unchanged);
        assert_eq!(store.write_count(), writes + 1);
    }

    #[test]
    fn test_locked_editor_is_not_saved() {
        let dir = tempdir().unwrap();
        let (mut store, mut session) = setup(dir.path());
        session.select_page(&mut store, DEFAULT_FOLDER_NAME, "A").unwrap();
        session.set_text("pending");
        session.set_editable(false);

        assert_eq!(session.save_current_page(&mut store).unwrap(), SaveOutcome::Skipped);
        assert!(session.has_unsaved_changes());
    }

    #[test]
    fn test_navigation_saves_edits() {
        let dir = tempdir().unwrap();
        let (mut store, mut session) = setup(dir.path());
        session.select_page(&mut store, DEFAULT_FOLDER_NAME, "A").unwrap();
        session.set_text("draft text");
        session.select(Some(0..5));
        assert!(session.toggle_style(Style::Bold));

        session.select_page(&mut store, DEFAULT_FOLDER_NAME, "B").unwrap();
        assert_eq!(
            store.page_plain_text(DEFAULT_FOLDER_NAME, "A").unwrap(),
            "draft text"
        );

        session.select_page(&mut store, DEFAULT_FOLDER_NAME, "A").unwrap();
        assert_eq!(session.buffer().tag_ranges("bold"), &[0..5]);
    }

    #[test]
    fn test_recovered_page_is_not_written_back() {
        let dir = tempdir().unwrap();
        let (mut store, mut session) = setup(dir.path());
        let broken = RichContent::from(vec![
            Event::text("kept text\n", Position::START),
            Event {
                key: "tagon-bold".to_string(),
                value: String::new(),
                index: "x.y".to_string(),
            },
        ]);
        store
            .update_page_content(DEFAULT_FOLDER_NAME, "A", broken.clone())
            .unwrap();

        let load = session.select_page(&mut store, DEFAULT_FOLDER_NAME, "A").unwrap();
        assert!(matches!(load, PageLoad::Recovered(_)));
        assert_eq!(session.buffer().text(), "kept text");

        let writes = store.write_count();
        session.select_page(&mut store, DEFAULT_FOLDER_NAME, "B").unwrap();
        assert_eq!(store.write_count(), writes);
        assert_eq!(store.page_content(DEFAULT_FOLDER_NAME, "A"), Some(&broken));
    }

    #[test]
    fn test_toggle_style_removes_when_present() {
        let dir = tempdir().unwrap();
        let (mut store, mut session) = setup(dir.path());
        session.select_page(&mut store, DEFAULT_FOLDER_NAME, "A").unwrap();
        session.set_text("one two three");
        session.select(Some(4..7));

        session.toggle_style(Style::Italic);
        assert_eq!(session.buffer().tag_ranges("italic"), &[4..7]);
        session.toggle_style(Style::Italic);
        assert!(session.buffer().tag_ranges("italic").is_empty());

        session.select(None);
        assert!(!session.toggle_style(Style::Italic));
    }

    #[test]
    fn test_word_counts() {
        let dir = tempdir().unwrap();
        let (mut store, mut session) = setup(dir.path());
        session.select_page(&mut store, DEFAULT_FOLDER_NAME, "A").unwrap();
        session.set_text("one two\nthree  four");
        session.select(Some(4..13));

        assert_eq!(session.page_word_count(), 4);
        assert_eq!(session.selection_word_count(), 2);
    }

    #[test]
    fn test_close_drains_edits() {
        let dir = tempdir().unwrap();
        let (mut store, mut session) = setup(dir.path());
        session.select_page(&mut store, DEFAULT_FOLDER_NAME, "B").unwrap();
        session.set_text("last words");

        session.close(&mut store).unwrap();
        assert_eq!(session.open_page(), None);
        assert_eq!(
            store.page_plain_text(DEFAULT_FOLDER_NAME, "B").unwrap(),
            "last words"
        );
    }
}
