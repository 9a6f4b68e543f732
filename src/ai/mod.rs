//! Text generation through hosted language models.
//!
//! This module provides two interchangeable providers behind the
//! [`GenerationProvider`] trait, and the [`GenerationClient`] that picks one
//! per request, applies the shared prompt rules and normalizes replies to
//! plain text.
//!
//! # Module Structure
//!
//! - `google`: HTTP client for the Google Generative Language API
//! - `openrouter`: HTTP client for OpenRouter chat completions
//! - `prompts`: System prompt prefix and reference preamble builders
//!
//! # Example
//!
//! ```no_run
//! use folio::ai::{GenerationClient, GenerationRequest};
//! use folio::store::Provider;
//! use folio::Config;
//!
//! let config = Config::load()?;
//! let client = GenerationClient::new(&config);
//! let request = GenerationRequest::new("gemini-1.5-flash", "Summarize:", "A long story.");
//! let text = client.generate(Provider::Google, "api-key", &request)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod google;
pub mod openrouter;
pub mod prompts;

// Re-export commonly used types
pub use google::GoogleClient;
pub use openrouter::{Message, OpenRouterClient};
pub use prompts::{ReferenceText, NO_FORMATTING_PREFIX};

use crate::config::Config;
use crate::errors::{AIError, AppResult};
use crate::store::Provider;
use reqwest::blocking::Response;
use serde::Deserialize;
use tracing::{debug, info};

/// One generation call, already resolved to a model and prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_content: String,
}

impl GenerationRequest {
    pub fn new(
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        user_content: impl Into<String>,
    ) -> Self {
        GenerationRequest {
            model: model.into(),
            system_prompt: system_prompt.into(),
            user_content: user_content.into(),
        }
    }
}

/// A hosted model service.
pub trait GenerationProvider: Send + Sync {
    /// Model ids usable for generation. `free_only` is ignored by providers
    /// without pricing data.
    fn list_models(&self, api_key: &str, free_only: bool) -> AppResult<Vec<String>>;

    /// Runs one generation and returns the raw reply text.
    fn generate(&self, api_key: &str, request: &GenerationRequest) -> AppResult<String>;
}

/// Routes requests to the selected provider.
///
/// Cloning is cheap; clones share connection pools, so a clone can be moved
/// into a worker thread.
#[derive(Debug, Clone)]
pub struct GenerationClient {
    google: GoogleClient,
    openrouter: OpenRouterClient,
}

impl GenerationClient {
    pub fn new(config: &Config) -> Self {
        GenerationClient {
            google: GoogleClient::new(&config.google_api_url),
            openrouter: OpenRouterClient::new(&config.openrouter_api_url),
        }
    }

    pub fn provider(&self, provider: Provider) -> &dyn GenerationProvider {
        match provider {
            Provider::Google => &self.google,
            Provider::OpenRouter => &self.openrouter,
        }
    }

    /// Generates text with the no-formatting prefix applied to the system
    /// prompt.
    ///
    /// # Errors
    ///
    /// Returns `AIError::EmptyResponse` for blank replies, or the provider's
    /// classified error.
    pub fn generate(
        &self,
        provider: Provider,
        api_key: &str,
        request: &GenerationRequest,
    ) -> AppResult<String> {
        let request = GenerationRequest {
            system_prompt: prompts::system_prompt(&request.system_prompt),
            ..request.clone()
        };
        info!("Generating with {} model {}", provider, request.model);

        let text = self.provider(provider).generate(api_key, &request)?;
        if text.trim().is_empty() {
            return Err(AIError::EmptyResponse.into());
        }
        debug!("Generation returned {} characters", text.len());
        Ok(text)
    }

    /// Lists the provider's usable models, sorted.
    pub fn list_models(
        &self,
        provider: Provider,
        api_key: &str,
        free_only: bool,
    ) -> AppResult<Vec<String>> {
        let mut models = self.provider(provider).list_models(api_key, free_only)?;
        models.sort();
        models.dedup();
        info!("Found {} {} models", models.len(), provider);
        Ok(models)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    status: Option<String>,
}

/// Turns a non-success status into a classified provider error.
///
/// The provider's `{"error": {"message": ...}}` body is used as the message
/// when present.
pub(crate) fn check_status(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let detail = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => match envelope.error.status {
            Some(code) => format!("{} ({})", envelope.error.message, code),
            None => envelope.error.message,
        },
        Err(_) => body,
    };
    Err(AIError::http(status.as_u16(), &detail).into())
}

pub(crate) fn parse<T: serde::de::DeserializeOwned>(response: Response, what: &str) -> AppResult<T> {
    response
        .json()
        .map_err(|e| AIError::InvalidResponse(format!("Failed to parse {}: {}", what, e)).into())
}
