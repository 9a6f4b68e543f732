//! Subcommand handlers.

use super::{
    CliArgs, Command, FolderCommand, FunctionCommand, KeyCommand, ModelCommand, PageCommand,
    RefCommand,
};
use crate::assistant::{Assistant, AssistantEvent};
use crate::errors::{AppResult, PersistenceError, TaskError};
use crate::session::PageLoad;
use crate::store::Provider;
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::{debug, warn};

/// Runs one subcommand against the assistant, writing results to `out`.
///
/// The caller flushes the assistant afterwards.
pub fn execute(args: &CliArgs, assistant: &mut Assistant, out: &mut dyn Write) -> AppResult<()> {
    debug!("Executing {:?}", args.command);
    match &args.command {
        Command::Folder(command) => folder(command, assistant, out),
        Command::Page(command) => page(command, assistant, out),
        Command::Function(command) => function(command, assistant, out),
        Command::Key(command) => key(command, assistant, out),
        Command::Model(command) => model(command, assistant, out),
        Command::Provider { provider } => {
            if let Some(provider) = provider {
                assistant.store_mut().set_api_provider(*provider)?;
            }
            let current = assistant.store().api_provider();
            for provider in Provider::ALL {
                let marker = if provider == current { "*" } else { " " };
                writeln!(out, "{} {}", marker, provider)?;
            }
            Ok(())
        }
        Command::Appearance { mode } => {
            if let Some(mode) = mode {
                assistant.store_mut().set_appearance_mode(*mode)?;
            }
            writeln!(out, "{}", assistant.store().appearance_mode())?;
            Ok(())
        }
        Command::Ref(command) => reference(command, assistant, out),
        Command::Run {
            folder,
            page,
            function,
            selection,
            timeout,
        } => {
            open(assistant, folder, page)?;
            if let Some(range) = selection {
                assistant.session_mut().select(Some(range.clone()));
            }
            assistant.run_function(function)?;

            match assistant.wait(Duration::from_secs(*timeout))? {
                Some(AssistantEvent::ResultApplied { .. }) => {
                    writeln!(out, "{}", assistant.session().buffer().text())?;
                    Ok(())
                }
                Some(AssistantEvent::GenerationFailed { error, .. }) => Err(error),
                Some(other) => {
                    warn!("Unexpected completion: {:?}", other);
                    Err(TaskError::Disconnected.into())
                }
                None => Err(TaskError::TimedOut(*timeout).into()),
            }
        }
        Command::Search { term } => {
            for hit in assistant.search(term) {
                writeln!(out, "{}/{}", hit.folder, hit.page)?;
            }
            Ok(())
        }
        Command::SaveAs { path } => {
            assistant.save_project_as(path)?;
            writeln!(out, "Project saved to {}", path.display())?;
            Ok(())
        }
        Command::Load { path } => {
            assistant.load_project(path)?;
            for name in assistant.store().folder_names() {
                writeln!(out, "{}", name)?;
            }
            Ok(())
        }
    }
}

fn folder(command: &FolderCommand, assistant: &mut Assistant, out: &mut dyn Write) -> AppResult<()> {
    match command {
        FolderCommand::List => {
            for name in assistant.store().folder_names() {
                writeln!(out, "{}", name)?;
            }
        }
        FolderCommand::Add { name } => {
            assistant.store_mut().add_folder(name)?;
            writeln!(out, "Added folder '{}'", name.trim())?;
        }
        FolderCommand::Delete { name } => {
            assistant.delete_folder(name)?;
            writeln!(out, "Deleted folder '{}'", name)?;
        }
    }
    Ok(())
}

fn page(command: &PageCommand, assistant: &mut Assistant, out: &mut dyn Write) -> AppResult<()> {
    match command {
        PageCommand::List { folder } => {
            for name in assistant.store().page_names(folder) {
                writeln!(out, "{}", name)?;
            }
        }
        PageCommand::Add { folder, name } => {
            assistant.store_mut().add_page(folder, name)?;
            writeln!(out, "Added page '{}' to '{}'", name.trim(), folder)?;
        }
        PageCommand::Delete { folder, name } => {
            assistant.delete_page(folder, name)?;
            writeln!(out, "Deleted page '{}' from '{}'", name, folder)?;
        }
        PageCommand::Show { folder, page, json } => {
            open(assistant, folder, page)?;
            if *json {
                let content = assistant
                    .store()
                    .page_content(folder, page)
                    .cloned()
                    .unwrap_or_default();
                let rendered = serde_json::to_string_pretty(&content)
                    .map_err(PersistenceError::Serialize)?;
                writeln!(out, "{}", rendered)?;
            } else {
                writeln!(out, "{}", assistant.session().buffer().text())?;
            }
        }
        PageCommand::Write {
            folder,
            page,
            text,
            markdown,
        } => {
            let text = match text {
                Some(text) => text.clone(),
                None => read_stdin()?,
            };
            open(assistant, folder, page)?;
            let session = assistant.session_mut();
            session.set_text(&text);
            if *markdown {
                let styled = session.apply_markdown();
                debug!("Styled {} markdown span(s)", styled);
            }
            assistant.save_current_page()?;
            writeln!(out, "{} words", assistant.session().page_word_count())?;
        }
        PageCommand::Style {
            folder,
            page,
            style,
            range,
        } => {
            open(assistant, folder, page)?;
            let session = assistant.session_mut();
            session.select(Some(range.clone()));
            session.toggle_style(*style);
            session.select(None);
            assistant.save_current_page()?;
        }
        PageCommand::Notes { folder, page, text } => {
            if let Some(text) = text {
                assistant.store_mut().update_page_notes(folder, page, text)?;
            }
            let notes = assistant.store().page_notes(folder, page).unwrap_or_default();
            writeln!(out, "{}", notes)?;
        }
        PageCommand::Count { folder, page } => {
            open(assistant, folder, page)?;
            writeln!(out, "{}", assistant.session().page_word_count())?;
        }
    }
    Ok(())
}

fn function(
    command: &FunctionCommand,
    assistant: &mut Assistant,
    out: &mut dyn Write,
) -> AppResult<()> {
    match command {
        FunctionCommand::List { folder } => {
            if let Some(functions) = assistant.store().functions(folder) {
                for (name, prompt) in functions {
                    writeln!(out, "{}: {}", name, prompt)?;
                }
            }
        }
        FunctionCommand::Set {
            folder,
            name,
            prompt,
        } => {
            assistant
                .store_mut()
                .add_or_update_function(folder, name, prompt)?;
            writeln!(out, "Saved function '{}'", name.trim())?;
        }
        FunctionCommand::Delete { folder, name } => {
            assistant.store_mut().delete_function(folder, name)?;
            writeln!(out, "Deleted function '{}'", name)?;
        }
    }
    Ok(())
}

fn key(command: &KeyCommand, assistant: &mut Assistant, out: &mut dyn Write) -> AppResult<()> {
    match command {
        KeyCommand::List => {
            let store = assistant.store();
            let selected = store.selected_api_key_name();
            for name in store.api_key_names() {
                let marker = if Some(name) == selected { "*" } else { " " };
                writeln!(out, "{} {}", marker, name)?;
            }
        }
        KeyCommand::Set { name, value } => {
            assistant.store_mut().add_or_update_api_key(name, value)?;
            writeln!(out, "Saved API key '{}'", name.trim())?;
        }
        KeyCommand::Delete { name } => {
            assistant.store_mut().delete_api_key(name)?;
            writeln!(out, "Deleted API key '{}'", name)?;
        }
        KeyCommand::Select { name } => {
            assistant.store_mut().set_selected_api_key_name(name)?;
            writeln!(out, "Selected API key '{}'", name)?;
        }
    }
    Ok(())
}

fn model(command: &ModelCommand, assistant: &mut Assistant, out: &mut dyn Write) -> AppResult<()> {
    match command {
        ModelCommand::Show => {
            writeln!(out, "{}", assistant.store().selected_model())?;
        }
        ModelCommand::Set { name } => {
            assistant.store_mut().set_selected_model(name)?;
            writeln!(out, "{}", assistant.store().selected_model())?;
        }
        ModelCommand::List => {
            assistant.fetch_models()?;
            let timeout = Duration::from_secs(60);
            match assistant.wait(timeout)? {
                Some(AssistantEvent::ModelsListed { models, selected }) => {
                    for model in &models {
                        let marker = if Some(model) == selected.as_ref() { "*" } else { " " };
                        writeln!(out, "{} {}", marker, model)?;
                    }
                }
                Some(AssistantEvent::ModelsFailed { error }) => return Err(error),
                Some(other) => {
                    warn!("Unexpected completion: {:?}", other);
                    return Err(TaskError::Disconnected.into());
                }
                None => return Err(TaskError::TimedOut(timeout.as_secs()).into()),
            }
        }
        ModelCommand::FreeOnly { enabled } => {
            assistant.store_mut().set_show_free_models_only(*enabled)?;
            writeln!(out, "Free models only: {}", enabled)?;
        }
    }
    Ok(())
}

fn reference(command: &RefCommand, assistant: &mut Assistant, out: &mut dyn Write) -> AppResult<()> {
    match command {
        RefCommand::List => {
            for reference in assistant.store().references().values() {
                writeln!(out, "{}/{}", reference.folder, reference.page)?;
            }
        }
        RefCommand::Add { folder, page } => {
            assistant.store_mut().add_reference(folder, page)?;
            writeln!(out, "Added reference '{}/{}'", folder, page)?;
        }
        RefCommand::Remove { folder, page } => {
            assistant.store_mut().remove_reference(folder, page)?;
            writeln!(out, "Removed reference '{}/{}'", folder, page)?;
        }
    }
    Ok(())
}

/// Opens a page, warning when its styling could not be restored.
fn open(assistant: &mut Assistant, folder: &str, page: &str) -> AppResult<()> {
    if let PageLoad::Recovered(e) = assistant.select_page(folder, page)? {
        warn!("Page '{}/{}' opened as plain text: {}", folder, page, e);
    }
    Ok(())
}

fn read_stdin() -> AppResult<String> {
    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}
