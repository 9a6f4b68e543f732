//! The persisted document: folders, pages, functions, API keys and settings.
//!
//! [`DocumentStore`] owns one [`Document`] and the file it lives in. Every
//! mutator validates its preconditions, applies the change in memory and then
//! rewrites the whole file. A refused operation returns a [`ValidationError`]
//! and leaves the document untouched; a failed write returns a
//! [`PersistenceError`] with the in-memory change kept.
//!
//! # Module Structure
//!
//! - `backup`: Timestamped, rotating copies of the document file

pub mod backup;

pub use backup::Backups;

use crate::config::Config;
use crate::constants::{DEFAULT_API_KEY_NAME, DEFAULT_FOLDER_NAME, DEFAULT_FUNCTIONS, DEFAULT_MODEL};
use crate::errors::{AppResult, PersistenceError, ValidationError};
use crate::richtext::RichContent;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// The generation service used to run functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Google,
    OpenRouter,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Google, Provider::OpenRouter];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::OpenRouter => "openrouter",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            "openrouter" => Ok(Provider::OpenRouter),
            other => Err(format!(
                "Unknown provider '{}'. Expected 'google' or 'openrouter'",
                other
            )),
        }
    }
}

/// Preferred color scheme, persisted for the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AppearanceMode {
    #[default]
    System,
    Light,
    Dark,
}

impl fmt::Display for AppearanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppearanceMode::System => "System",
            AppearanceMode::Light => "Light",
            AppearanceMode::Dark => "Dark",
        };
        f.write_str(name)
    }
}

impl FromStr for AppearanceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "system" => Ok(AppearanceMode::System),
            "light" => Ok(AppearanceMode::Light),
            "dark" => Ok(AppearanceMode::Dark),
            other => Err(format!(
                "Unknown appearance mode '{}'. Expected System, Light or Dark",
                other
            )),
        }
    }
}

/// One page: styled content plus free-form notes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredPage")]
pub struct Page {
    pub content: RichContent,
    pub notes: String,
}

impl Page {
    /// A new page holding the empty-text placeholder.
    pub fn blank() -> Self {
        Page {
            content: RichContent::placeholder(),
            notes: String::new(),
        }
    }
}

/// Page shapes found on disk. Early documents stored the bare event list.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredPage {
    Legacy(RichContent),
    Wrapped {
        #[serde(default)]
        content: RichContent,
        #[serde(default)]
        notes: String,
    },
}

impl From<StoredPage> for Page {
    fn from(stored: StoredPage) -> Self {
        match stored {
            StoredPage::Legacy(content) => Page {
                content,
                notes: String::new(),
            },
            StoredPage::Wrapped { content, notes } => Page { content, notes },
        }
    }
}

/// A named group of pages with its own function set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Folder {
    pub pages: IndexMap<String, Page>,
    pub functions: IndexMap<String, String>,
}

impl Folder {
    /// A folder carrying the starter functions.
    pub fn seeded() -> Self {
        Folder {
            pages: IndexMap::new(),
            functions: DEFAULT_FUNCTIONS
                .iter()
                .map(|(name, prompt)| (name.to_string(), prompt.to_string()))
                .collect(),
        }
    }
}

/// A page whose text is sent as context with every function run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub folder: String,
    pub page: String,
}

impl Reference {
    /// The map key a reference is stored under.
    pub fn key(folder: &str, page: &str) -> String {
        format!("{}/{}", folder, page)
    }
}

/// The root persisted object. Missing keys take their defaults on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub api_keys: IndexMap<String, String>,
    pub selected_api_key_name: Option<String>,
    pub selected_model_name: String,
    pub appearance_mode: AppearanceMode,
    pub folders: IndexMap<String, Folder>,
    pub references: IndexMap<String, Reference>,
    pub api_provider: Provider,
    pub show_free_models_only: bool,
}

impl Default for Document {
    fn default() -> Self {
        let mut api_keys = IndexMap::new();
        api_keys.insert(DEFAULT_API_KEY_NAME.to_string(), String::new());
        let mut folders = IndexMap::new();
        folders.insert(DEFAULT_FOLDER_NAME.to_string(), Folder::seeded());

        Document {
            api_keys,
            selected_api_key_name: Some(DEFAULT_API_KEY_NAME.to_string()),
            selected_model_name: DEFAULT_MODEL.to_string(),
            appearance_mode: AppearanceMode::System,
            folders,
            references: IndexMap::new(),
            api_provider: Provider::Google,
            show_free_models_only: true,
        }
    }
}

impl Document {
    /// Restores the folder and API-key floors and a valid key selection.
    fn normalize(&mut self) {
        if self.folders.is_empty() {
            debug!("Document has no folders, seeding '{}'", DEFAULT_FOLDER_NAME);
            self.folders
                .insert(DEFAULT_FOLDER_NAME.to_string(), Folder::seeded());
        }
        if self.api_keys.is_empty() {
            self.api_keys
                .insert(DEFAULT_API_KEY_NAME.to_string(), String::new());
        }
        let selection_valid = self
            .selected_api_key_name
            .as_ref()
            .is_some_and(|name| self.api_keys.contains_key(name));
        if !selection_valid {
            self.selected_api_key_name = self.api_keys.keys().next().cloned();
        }
    }
}

/// Owns the document and keeps its file in sync.
#[derive(Debug)]
pub struct DocumentStore {
    path: PathBuf,
    backups: Backups,
    document: Document,
    backed_up: bool,
    write_count: usize,
}

impl DocumentStore {
    /// Opens the configured document leniently.
    ///
    /// A missing file yields a seeded default document. A file that cannot be
    /// read or parsed is logged and replaced in memory by defaults; the first
    /// save backs it up before overwriting it.
    pub fn open(config: &Config) -> Self {
        let document = match read_document(&config.data_file) {
            Ok(Some(document)) => document,
            Ok(None) => {
                info!(
                    "No document at {:?}, starting with defaults",
                    config.data_file
                );
                Document::default()
            }
            Err(e) => {
                warn!("{}. Starting with defaults", e);
                Document::default()
            }
        };
        Self::with_document(config, document)
    }

    /// Opens the configured document strictly.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Read` if the file is missing or unreadable and
    /// `PersistenceError::Parse` if it is not a valid document.
    pub fn load(config: &Config) -> AppResult<Self> {
        match read_document(&config.data_file)? {
            Some(document) => Ok(Self::with_document(config, document)),
            None => Err(PersistenceError::Read {
                path: config.data_file.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            }
            .into()),
        }
    }

    fn with_document(config: &Config, mut document: Document) -> Self {
        document.normalize();
        DocumentStore {
            path: config.data_file.clone(),
            backups: Backups::new(&config.backup_dir, config.max_backups),
            document,
            backed_up: false,
            write_count: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backups(&self) -> &Backups {
        &self.backups
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Number of successful file writes since the store was opened.
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    /// Writes the whole document to disk.
    ///
    /// The first save of a session backs up the existing file. The document is
    /// written to a temporary file beside the target and renamed over it.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if serialization or the write fails.
    pub fn save(&mut self) -> AppResult<()> {
        let json = self.serialized()?;
        self.write(json)
    }

    /// Saves unless the file already holds exactly this document.
    ///
    /// Returns whether a write happened. Skipped saves create no backup.
    pub fn save_if_changed(&mut self) -> AppResult<bool> {
        let json = self.serialized()?;
        if fs::read_to_string(&self.path).is_ok_and(|on_disk| on_disk == json) {
            debug!("Document at {:?} is unchanged, skipping save", self.path);
            return Ok(false);
        }
        self.write(json)?;
        Ok(true)
    }

    fn serialized(&mut self) -> AppResult<String> {
        self.document.normalize();
        let json =
            serde_json::to_string_pretty(&self.document).map_err(PersistenceError::Serialize)?;
        Ok(json)
    }

    fn write(&mut self, json: String) -> AppResult<()> {
        if !self.backed_up {
            self.backed_up = true;
            if let Err(e) = self.backups.create(&self.path) {
                warn!("Backup of {:?} failed: {}", self.path, e);
            }
        }

        write_atomic(&self.path, json.as_bytes())?;
        self.write_count += 1;
        debug!("Saved document to {:?}", self.path);
        Ok(())
    }

    /// Saves, copies the file to `target` and continues from the copy.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the save or the copy fails. The store keeps
    /// its current path in that case.
    pub fn save_as(&mut self, target: &Path) -> AppResult<()> {
        self.save()?;
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::Copy {
                path: target.to_path_buf(),
                source: e,
            })?;
        }
        fs::copy(&self.path, target).map_err(|e| PersistenceError::Copy {
            path: target.to_path_buf(),
            source: e,
        })?;
        info!("Project saved as {:?}", target);
        self.path = target.to_path_buf();
        Ok(())
    }

    // Folders

    pub fn folder_names(&self) -> Vec<&str> {
        self.document.folders.keys().map(String::as_str).collect()
    }

    pub fn has_folder(&self, folder: &str) -> bool {
        self.document.folders.contains_key(folder)
    }

    pub fn add_folder(&mut self, name: &str) -> AppResult<()> {
        let name = non_empty(name)?;
        if self.document.folders.contains_key(name) {
            return Err(ValidationError::DuplicateFolder(name.to_string()).into());
        }
        self.document
            .folders
            .insert(name.to_string(), Folder::default());
        info!("Added folder '{}'", name);
        self.save()
    }

    /// Deletes a folder with its pages and any references into it.
    pub fn delete_folder(&mut self, name: &str) -> AppResult<()> {
        if !self.document.folders.contains_key(name) {
            return Err(ValidationError::FolderNotFound(name.to_string()).into());
        }
        if self.document.folders.len() == 1 {
            return Err(ValidationError::LastFolder(name.to_string()).into());
        }
        self.document.folders.shift_remove(name);
        self.document.references.retain(|_, r| r.folder != name);
        info!("Deleted folder '{}'", name);
        self.save()
    }

    // Pages

    /// Page names of a folder in insertion order; empty for unknown folders.
    pub fn page_names(&self, folder: &str) -> Vec<&str> {
        self.document
            .folders
            .get(folder)
            .map(|f| f.pages.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn page(&self, folder: &str, page: &str) -> Option<&Page> {
        self.document.folders.get(folder)?.pages.get(page)
    }

    pub fn page_content(&self, folder: &str, page: &str) -> Option<&RichContent> {
        self.page(folder, page).map(|p| &p.content)
    }

    pub fn page_notes(&self, folder: &str, page: &str) -> Option<&str> {
        self.page(folder, page).map(|p| p.notes.as_str())
    }

    /// The page's text without styling or the widget's trailing newline.
    pub fn page_plain_text(&self, folder: &str, page: &str) -> Option<String> {
        self.page(folder, page).map(|p| p.content.plain_text())
    }

    pub fn add_page(&mut self, folder: &str, name: &str) -> AppResult<()> {
        let name = non_empty(name)?;
        let pages = &mut self.folder_mut(folder)?.pages;
        if pages.contains_key(name) {
            return Err(ValidationError::DuplicatePage {
                folder: folder.to_string(),
                page: name.to_string(),
            }
            .into());
        }
        pages.insert(name.to_string(), Page::blank());
        info!("Added page '{}' to folder '{}'", name, folder);
        self.save()
    }

    /// Deletes a page and its reference entry.
    pub fn delete_page(&mut self, folder: &str, page: &str) -> AppResult<()> {
        self.page_mut(folder, page)?;
        self.folder_mut(folder)?.pages.shift_remove(page);
        self.document
            .references
            .shift_remove(&Reference::key(folder, page));
        info!("Deleted page '{}' from folder '{}'", page, folder);
        self.save()
    }

    pub fn update_page_content(
        &mut self,
        folder: &str,
        page: &str,
        content: RichContent,
    ) -> AppResult<()> {
        self.page_mut(folder, page)?.content = content;
        debug!("Updated content of '{}/{}'", folder, page);
        self.save()
    }

    pub fn update_page_notes(&mut self, folder: &str, page: &str, notes: &str) -> AppResult<()> {
        self.page_mut(folder, page)?.notes = notes.to_string();
        debug!("Updated notes of '{}/{}'", folder, page);
        self.save()
    }

    // Functions

    pub fn functions(&self, folder: &str) -> Option<&IndexMap<String, String>> {
        self.document.folders.get(folder).map(|f| &f.functions)
    }

    pub fn function(&self, folder: &str, name: &str) -> Option<&str> {
        self.functions(folder)?.get(name).map(String::as_str)
    }

    /// Adds or replaces a function; name and prompt are trimmed.
    pub fn add_or_update_function(
        &mut self,
        folder: &str,
        name: &str,
        prompt: &str,
    ) -> AppResult<()> {
        let name = non_empty(name)?;
        self.folder_mut(folder)?
            .functions
            .insert(name.to_string(), prompt.trim().to_string());
        info!("Saved function '{}' in folder '{}'", name, folder);
        self.save()
    }

    pub fn delete_function(&mut self, folder: &str, name: &str) -> AppResult<()> {
        let functions = &mut self.folder_mut(folder)?.functions;
        if functions.shift_remove(name).is_none() {
            return Err(ValidationError::FunctionNotFound {
                folder: folder.to_string(),
                name: name.to_string(),
            }
            .into());
        }
        info!("Deleted function '{}' from folder '{}'", name, folder);
        self.save()
    }

    // API keys

    pub fn api_key_names(&self) -> Vec<&str> {
        self.document.api_keys.keys().map(String::as_str).collect()
    }

    pub fn api_key_value(&self, name: &str) -> Option<&str> {
        self.document.api_keys.get(name).map(String::as_str)
    }

    pub fn selected_api_key_name(&self) -> Option<&str> {
        self.document.selected_api_key_name.as_deref()
    }

    pub fn selected_api_key_value(&self) -> Option<&str> {
        self.selected_api_key_name()
            .and_then(|name| self.api_key_value(name))
    }

    /// Stores a key under a trimmed name.
    ///
    /// The key becomes selected when it is the only key or nothing is selected.
    pub fn add_or_update_api_key(&mut self, name: &str, value: &str) -> AppResult<()> {
        let name = non_empty(name)?;
        self.document
            .api_keys
            .insert(name.to_string(), value.trim().to_string());
        if self.document.api_keys.len() == 1 || self.document.selected_api_key_name.is_none() {
            self.document.selected_api_key_name = Some(name.to_string());
        }
        info!("Saved API key '{}'", name);
        self.save()
    }

    /// Deletes a key, moving the selection to the first remaining key.
    pub fn delete_api_key(&mut self, name: &str) -> AppResult<()> {
        if !self.document.api_keys.contains_key(name) {
            return Err(ValidationError::ApiKeyNotFound(name.to_string()).into());
        }
        if self.document.api_keys.len() == 1 {
            return Err(ValidationError::LastApiKey(name.to_string()).into());
        }
        self.document.api_keys.shift_remove(name);
        if self.document.selected_api_key_name.as_deref() == Some(name) {
            self.document.selected_api_key_name = self.document.api_keys.keys().next().cloned();
        }
        info!("Deleted API key '{}'", name);
        self.save()
    }

    pub fn set_selected_api_key_name(&mut self, name: &str) -> AppResult<()> {
        if !self.document.api_keys.contains_key(name) {
            return Err(ValidationError::ApiKeyNotFound(name.to_string()).into());
        }
        self.document.selected_api_key_name = Some(name.to_string());
        self.save()
    }

    // Settings

    pub fn selected_model(&self) -> &str {
        &self.document.selected_model_name
    }

    pub fn set_selected_model(&mut self, model: &str) -> AppResult<()> {
        let model = non_empty(model)?;
        self.document.selected_model_name = model.to_string();
        info!("Selected model '{}'", model);
        self.save()
    }

    pub fn api_provider(&self) -> Provider {
        self.document.api_provider
    }

    pub fn set_api_provider(&mut self, provider: Provider) -> AppResult<()> {
        self.document.api_provider = provider;
        info!("Selected provider '{}'", provider);
        self.save()
    }

    pub fn show_free_models_only(&self) -> bool {
        self.document.show_free_models_only
    }

    pub fn set_show_free_models_only(&mut self, value: bool) -> AppResult<()> {
        self.document.show_free_models_only = value;
        self.save()
    }

    pub fn appearance_mode(&self) -> AppearanceMode {
        self.document.appearance_mode
    }

    pub fn set_appearance_mode(&mut self, mode: AppearanceMode) -> AppResult<()> {
        self.document.appearance_mode = mode;
        self.save()
    }

    // References

    pub fn references(&self) -> &IndexMap<String, Reference> {
        &self.document.references
    }

    pub fn add_reference(&mut self, folder: &str, page: &str) -> AppResult<()> {
        self.page_mut(folder, page)?;
        let key = Reference::key(folder, page);
        if self.document.references.contains_key(&key) {
            return Err(ValidationError::DuplicateReference(key).into());
        }
        self.document.references.insert(
            key,
            Reference {
                folder: folder.to_string(),
                page: page.to_string(),
            },
        );
        info!("Added reference '{}/{}'", folder, page);
        self.save()
    }

    pub fn remove_reference(&mut self, folder: &str, page: &str) -> AppResult<()> {
        let key = Reference::key(folder, page);
        if self.document.references.shift_remove(&key).is_none() {
            return Err(ValidationError::ReferenceNotFound(key).into());
        }
        info!("Removed reference '{}/{}'", folder, page);
        self.save()
    }

    fn folder_mut(&mut self, folder: &str) -> Result<&mut Folder, ValidationError> {
        self.document
            .folders
            .get_mut(folder)
            .ok_or_else(|| ValidationError::FolderNotFound(folder.to_string()))
    }

    fn page_mut(&mut self, folder: &str, page: &str) -> Result<&mut Page, ValidationError> {
        self.folder_mut(folder)?
            .pages
            .get_mut(page)
            .ok_or_else(|| ValidationError::PageNotFound {
                folder: folder.to_string(),
                page: page.to_string(),
            })
    }
}

fn non_empty(name: &str) -> Result<&str, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyName)
    } else {
        Ok(trimmed)
    }
}

/// Reads and parses a document, or `None` if the file does not exist.
fn read_document(path: &Path) -> Result<Option<Document>, PersistenceError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| PersistenceError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let document = serde_json::from_str(&raw).map_err(|e| PersistenceError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("Loaded document from {:?}", path);
    Ok(Some(document))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let write_error = |source| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_error)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(bytes).map_err(write_error)?;
    tmp.as_file().sync_all().map_err(write_error)?;
    tmp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}
