//! OpenRouter HTTP client for chat completions and model listing.
//!
//! This module provides a simple client for the OpenRouter API, which exposes
//! many hosted models behind one OpenAI-style chat completion endpoint.

use super::{check_status, parse, GenerationProvider, GenerationRequest};
use crate::constants::{APP_TITLE, OPENROUTER_REFERER};
use crate::errors::{AIError, AppResult, ProviderErrorKind};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender (system, user, assistant)
    pub role: String,
    /// The content of the message
    pub content: String,
}

impl Message {
    /// Creates a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Creates a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for chat completion.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
}

/// Response from chat completion.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ChatError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    message: String,
    code: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: Option<String>,
    #[serde(default)]
    pricing: HashMap<String, Value>,
}

impl ModelEntry {
    /// True when every price the model lists is zero.
    fn is_free(&self) -> bool {
        self.pricing.values().all(is_zero_price)
    }
}

fn is_zero_price(value: &Value) -> bool {
    match value {
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(|p| p == 0.0),
        Value::Number(n) => n.as_f64().is_some_and(|p| p == 0.0),
        _ => false,
    }
}

/// Client for interacting with the OpenRouter API.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    base_url: String,
    client: Client,
}

impl OpenRouterClient {
    /// Creates a new OpenRouter client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the API (e.g., "https://openrouter.ai/api/v1")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }
}

impl GenerationProvider for OpenRouterClient {
    /// Lists model ids, optionally only those whose every price is zero.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The API is not reachable
    /// - The API returns an error response
    /// - The response cannot be parsed
    fn list_models(&self, api_key: &str, free_only: bool) -> AppResult<Vec<String>> {
        debug!("Fetching models from OpenRouter (free only: {})", free_only);

        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(api_key)
            .send()
            .map_err(AIError::transport)?;
        let listing: ModelsResponse = parse(check_status(response)?, "model list")?;

        let models: Vec<String> = listing
            .data
            .into_iter()
            .filter(|m| !free_only || m.is_free())
            .filter_map(|m| m.id)
            .collect();

        debug!("Parsed {} models", models.len());
        Ok(models)
    }

    /// Sends a chat completion request with a system and a user message.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The API is not reachable
    /// - The API returns an error status or an in-body error object
    /// - The response has no choices
    fn generate(&self, api_key: &str, request: &GenerationRequest) -> AppResult<String> {
        debug!("Sending chat request with model: {}", request.model);

        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: request.model.clone(),
            messages: vec![
                Message::system(&request.system_prompt),
                Message::user(&request.user_content),
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .header("HTTP-Referer", OPENROUTER_REFERER)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send()
            .map_err(AIError::transport)?;
        let reply: ChatResponse = parse(check_status(response)?, "chat response")?;

        if let Some(error) = reply.error {
            let kind = error
                .code
                .as_ref()
                .and_then(Value::as_u64)
                .and_then(|code| u16::try_from(code).ok())
                .and_then(ProviderErrorKind::from_status)
                .unwrap_or_else(|| ProviderErrorKind::classify(&error.message));
            return Err(AIError::Provider {
                kind,
                message: error.message,
            }
            .into());
        }

        let choice = reply.choices.into_iter().next().ok_or(AIError::NoChoices)?;
        let content = choice
            .message
            .and_then(|m| m.content)
            .unwrap_or_default();

        debug!("Received chat response");
        Ok(content.trim().to_string())
    }
}
