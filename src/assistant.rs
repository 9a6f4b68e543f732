//! The coordinator that owns the document, the open page and background work.
//!
//! All document and buffer mutations happen on the thread that owns the
//! [`Assistant`]. Network calls run on worker threads through the
//! [`TaskRunner`]; their completions are applied by [`Assistant::poll`] or
//! [`Assistant::wait`].

use crate::ai::prompts::{self, ReferenceText};
use crate::ai::{GenerationClient, GenerationRequest};
use crate::config::Config;
use crate::constants::{AI_SEPARATOR_TAG, MODEL_PLACEHOLDERS};
use crate::errors::{AppError, AppResult, AssistantError, TaskError, ValidationError};
use crate::ops::{self, SearchHit};
use crate::richtext::{self, EditorSurface, TextBuffer};
use crate::session::{EditorSession, PageLoad, SaveOutcome};
use crate::store::DocumentStore;
use crate::tasks::{Completion, GenerationTarget, TaskId, TaskOutput, TaskRunner};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Where a generation result ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The selection the function ran on was replaced.
    ReplacedSelection,
    /// The result was appended below a separator in the open page.
    Appended,
    /// The page was no longer open; the result was appended to its stored
    /// content.
    AppendedToStoredPage,
}

/// Outcome of a drained background job.
#[derive(Debug)]
pub enum AssistantEvent {
    ResultApplied {
        target: GenerationTarget,
        placement: Placement,
    },
    GenerationFailed {
        function: String,
        error: AppError,
    },
    ModelsListed {
        models: Vec<String>,
        /// Model selected after the listing, if any was listed
        selected: Option<String>,
    },
    ModelsFailed {
        error: AppError,
    },
}

#[derive(Debug)]
pub struct Assistant {
    config: Config,
    store: DocumentStore,
    session: EditorSession,
    client: GenerationClient,
    tasks: TaskRunner,
    models: Vec<String>,
}

impl Assistant {
    /// Opens the configured document leniently and selects its first folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the first page cannot be opened.
    pub fn open(config: Config) -> AppResult<Self> {
        let store = DocumentStore::open(&config);
        Self::with_store(config, store)
    }

    /// Wraps an already opened store.
    pub fn with_store(config: Config, store: DocumentStore) -> AppResult<Self> {
        let client = GenerationClient::new(&config);
        let mut assistant = Assistant {
            config,
            store,
            session: EditorSession::new(),
            client,
            tasks: TaskRunner::new(),
            models: Vec::new(),
        };
        assistant.select_first_folder()?;
        Ok(assistant)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Direct access to the store, for mutations that do not touch the
    /// open page.
    pub fn store_mut(&mut self) -> &mut DocumentStore {
        &mut self.store
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut EditorSession {
        &mut self.session
    }

    pub fn is_busy(&self) -> bool {
        self.tasks.is_busy()
    }

    /// Models from the last successful listing.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    // Navigation

    pub fn select_folder(&mut self, folder: &str) -> AppResult<Option<PageLoad>> {
        self.session.select_folder(&mut self.store, folder)
    }

    pub fn select_page(&mut self, folder: &str, page: &str) -> AppResult<PageLoad> {
        self.session.select_page(&mut self.store, folder, page)
    }

    pub fn save_current_page(&mut self) -> AppResult<SaveOutcome> {
        self.session.save_current_page(&mut self.store)
    }

    fn select_first_folder(&mut self) -> AppResult<Option<PageLoad>> {
        let first = self
            .store
            .folder_names()
            .into_iter()
            .min()
            .map(str::to_string);
        match first {
            Some(folder) => self.select_folder(&folder),
            None => Ok(None),
        }
    }

    /// Deletes a folder, closing it first if it is open.
    pub fn delete_folder(&mut self, folder: &str) -> AppResult<()> {
        let was_open = self.session.current_folder() == Some(folder);
        self.store.delete_folder(folder)?;
        if was_open {
            self.session.reset();
            self.select_first_folder()?;
        }
        Ok(())
    }

    /// Deletes a page, opening the folder's first remaining page if it was
    /// open.
    pub fn delete_page(&mut self, folder: &str, page: &str) -> AppResult<()> {
        let was_open = self.session.open_page() == Some((folder, page));
        self.store.delete_page(folder, page)?;
        if was_open {
            self.session.reset();
            self.select_folder(folder)?;
        }
        Ok(())
    }

    // Functions

    /// Validates and dispatches a function run on the open page.
    ///
    /// The content is the trimmed selection when one is selected, otherwise
    /// the whole page. The editor is locked until the completion is applied.
    ///
    /// # Errors
    ///
    /// Returns an error, in this order, when no page is open, a generation
    /// is already running, no API key is usable, the function does not exist,
    /// the content is empty, or the selected model is not a real model.
    pub fn run_function(&mut self, name: &str) -> AppResult<TaskId> {
        let (folder, page) = self
            .session
            .open_page()
            .map(|(f, p)| (f.to_string(), p.to_string()))
            .ok_or(AssistantError::NoPageSelected)?;
        if self.tasks.is_busy() {
            return Err(TaskError::Busy.into());
        }
        let api_key = self
            .store
            .selected_api_key_value()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AssistantError::NoApiKey)?
            .to_string();
        let function_prompt = self
            .store
            .function(&folder, name)
            .ok_or_else(|| ValidationError::FunctionNotFound {
                folder: folder.clone(),
                name: name.to_string(),
            })?
            .to_string();

        let (content, selection) = self.function_input();
        if content.is_empty() {
            return Err(AssistantError::EmptyContent.into());
        }

        let model = self.store.selected_model().trim().to_string();
        if model.is_empty() || MODEL_PLACEHOLDERS.contains(&model.as_str()) {
            return Err(AssistantError::InvalidModel(model).into());
        }

        // References are read from the store, so the open page must be current.
        self.save_current_page()?;
        let references = self.reference_texts();
        let request = GenerationRequest::new(
            model,
            function_prompt,
            prompts::user_content(&references, &content),
        );

        let target = GenerationTarget {
            folder,
            page,
            function: name.to_string(),
            selection,
        };
        let provider = self.store.api_provider();
        let client = self.client.clone();
        let id = self.tasks.spawn_generation(target, move || {
            client.generate(provider, &api_key, &request)
        })?;

        self.session.set_editable(false);
        info!(
            "Running '{}' with {} reference(s) on {}",
            name,
            references.len(),
            provider
        );
        Ok(id)
    }

    fn function_input(&self) -> (String, Option<std::ops::Range<usize>>) {
        let buffer = self.session.buffer();
        if let Some(range) = buffer.selection() {
            let selected = buffer.text_range(range.clone());
            let selected = selected.trim();
            if !selected.is_empty() {
                debug!("Running on selection ({} chars)", selected.len());
                return (selected.to_string(), Some(range));
            }
        }
        (buffer.text().trim().to_string(), None)
    }

    fn reference_texts(&self) -> Vec<ReferenceText> {
        self.store
            .references()
            .values()
            .map(|reference| ReferenceText {
                page: reference.page.clone(),
                text: self
                    .store
                    .page_plain_text(&reference.folder, &reference.page)
                    .unwrap_or_default(),
            })
            .collect()
    }

    /// Dispatches a model listing for the selected provider.
    ///
    /// # Errors
    ///
    /// Returns `AssistantError::NoApiKey` when no usable key is selected.
    pub fn fetch_models(&mut self) -> AppResult<TaskId> {
        let api_key = self
            .store
            .selected_api_key_value()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AssistantError::NoApiKey)?
            .to_string();
        let provider = self.store.api_provider();
        let free_only = self.store.show_free_models_only();
        let client = self.client.clone();

        self.models.clear();
        info!("Fetching {} models (free only: {})", provider, free_only);
        self.tasks
            .spawn_models(move || client.list_models(provider, &api_key, free_only))
    }

    // Completions

    /// Applies every completion that is ready.
    pub fn poll(&mut self) -> Vec<AssistantEvent> {
        let mut events = Vec::new();
        while let Some(completion) = self.tasks.poll() {
            events.push(self.apply_completion(completion));
        }
        events
    }

    /// Waits up to `timeout` for one completion and applies it.
    pub fn wait(&mut self, timeout: Duration) -> AppResult<Option<AssistantEvent>> {
        Ok(self
            .tasks
            .wait(timeout)?
            .map(|completion| self.apply_completion(completion)))
    }

    /// Number of dispatched jobs not yet applied.
    pub fn pending(&self) -> usize {
        self.tasks.pending()
    }

    fn apply_completion(&mut self, completion: Completion) -> AssistantEvent {
        match completion.output {
            TaskOutput::Generation { target, result } => {
                if self.session.current_page().is_some() {
                    self.session.set_editable(true);
                }
                let applied = result.and_then(|text| self.apply_result(&target, &text));
                match applied {
                    Ok(placement) => {
                        info!("'{}' result applied ({:?})", target.function, placement);
                        AssistantEvent::ResultApplied { target, placement }
                    }
                    Err(error) => {
                        error!("'{}' failed: {}", target.function, error);
                        AssistantEvent::GenerationFailed {
                            function: target.function,
                            error,
                        }
                    }
                }
            }
            TaskOutput::Models { result } => match result {
                Ok(models) => self.apply_models(models),
                Err(error) => {
                    warn!("Error fetching models: {}", error);
                    AssistantEvent::ModelsFailed { error }
                }
            },
        }
    }

    fn apply_result(&mut self, target: &GenerationTarget, text: &str) -> AppResult<Placement> {
        let is_open =
            self.session.open_page() == Some((target.folder.as_str(), target.page.as_str()));
        if !is_open {
            self.append_to_stored_page(target, text)?;
            return Ok(Placement::AppendedToStoredPage);
        }

        let buffer = self.session.buffer_mut();
        let placement = match &target.selection {
            Some(range) if range.end <= buffer.char_len() => {
                buffer.replace(range.clone(), text);
                buffer.set_selection(None);
                Placement::ReplacedSelection
            }
            _ => {
                if target.selection.is_some() {
                    warn!("Selection lost before the result arrived, appending instead");
                }
                append_result(buffer, &target.function, text);
                Placement::Appended
            }
        };
        self.save_current_page()?;
        Ok(placement)
    }

    fn append_to_stored_page(&mut self, target: &GenerationTarget, text: &str) -> AppResult<()> {
        let content = self
            .store
            .page_content(&target.folder, &target.page)
            .cloned()
            .ok_or_else(|| ValidationError::PageNotFound {
                folder: target.folder.clone(),
                page: target.page.clone(),
            })?;

        let mut buffer = TextBuffer::new();
        if let Err(e) = richtext::decode(&content, &mut buffer) {
            warn!("Appending to '{}/{}' as plain text: {}", target.folder, target.page, e);
            richtext::decode_plain(&content, &mut buffer);
        }
        append_result(&mut buffer, &target.function, text);
        self.store
            .update_page_content(&target.folder, &target.page, richtext::encode(&buffer))
    }

    fn apply_models(&mut self, models: Vec<String>) -> AssistantEvent {
        self.models = models.clone();
        if models.is_empty() {
            warn!("No compatible models found");
            return AssistantEvent::ModelsListed {
                models,
                selected: None,
            };
        }
        let first = &models[0];

        let current = self.store.selected_model().to_string();
        let listed = models
            .iter()
            .any(|m| m == &current || m.strip_prefix("models/") == Some(current.as_str()));
        if !listed {
            info!("Model '{}' is not listed, selecting '{}'", current, first);
            if let Err(e) = self.store.set_selected_model(first) {
                warn!("Could not persist the model selection: {}", e);
            }
        }
        AssistantEvent::ModelsListed {
            selected: Some(self.store.selected_model().to_string()),
            models,
        }
    }

    // Projects

    /// Replaces the document with the one at `path`.
    ///
    /// The current page is saved to the old document first. A document that
    /// cannot be read or parsed leaves everything as it was.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Busy` while a generation is running, or the
    /// load error.
    pub fn load_project(&mut self, path: &Path) -> AppResult<()> {
        if self.tasks.is_busy() {
            return Err(TaskError::Busy.into());
        }
        let config = self.config.clone().with_data_file(path.to_path_buf());
        let store = DocumentStore::load(&config)?;

        self.session.close(&mut self.store)?;
        self.config = config;
        self.store = store;
        self.models.clear();
        info!("Project loaded from {:?}", path);
        self.select_first_folder()?;
        Ok(())
    }

    /// Saves the open page and the document, then continues from a copy at
    /// `path`.
    pub fn save_project_as(&mut self, path: &Path) -> AppResult<()> {
        self.save_current_page()?;
        self.store.save_as(path)?;
        self.config = self.config.clone().with_data_file(path.to_path_buf());
        Ok(())
    }

    /// Final flush: saves the open page, then the document if the file does
    /// not already match it.
    pub fn close(&mut self) -> AppResult<()> {
        if self.tasks.pending() > 0 {
            warn!("Closing with {} unfinished task(s)", self.tasks.pending());
        }
        self.session.close(&mut self.store)?;
        self.store.save_if_changed()?;
        Ok(())
    }

    pub fn search(&self, term: &str) -> Vec<SearchHit> {
        ops::search_pages(&self.store, term)
    }
}

/// Appends a result below an `ai_separator` heading.
fn append_result(buffer: &mut TextBuffer, function: &str, text: &str) {
    let prefix = if buffer.text().trim().is_empty() {
        ""
    } else {
        "\n\n"
    };
    let separator = format!("{}--- AI Result ({}) ---", prefix, function);
    buffer.insert_tagged(buffer.char_len(), &separator, &[AI_SEPARATOR_TAG]);
    buffer.append(&format!("\n{}", text));
}
