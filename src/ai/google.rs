//! Google Generative Language REST client.
//!
//! Talks to the `v1beta` API with the key passed in the `x-goog-api-key`
//! header. Gemma models accept no system instruction, so their system prompt
//! is folded into the user content instead.

use super::prompts::{inline_system_prompt, is_gemma};
use super::{check_status, parse, GenerationProvider, GenerationRequest};
use crate::constants::GOOGLE_GENERATE_METHOD;
use crate::errors::{AIError, AppResult};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const API_KEY_HEADER: &str = "x-goog-api-key";
const MODELS_PAGE_SIZE: &str = "1000";

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// Client for the Google Generative Language API.
#[derive(Debug, Clone)]
pub struct GoogleClient {
    base_url: String,
    client: Client,
}

impl GoogleClient {
    /// Creates a client for the given base URL
    /// (e.g. "https://generativelanguage.googleapis.com").
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }
}

/// Model ids as the API expects them, with the `models/` prefix.
///
/// # Examples
///
/// ```
/// use folio::ai::google::normalize_model;
///
/// assert_eq!(normalize_model("gemini-1.5-flash"), "models/gemini-1.5-flash");
/// assert_eq!(normalize_model("models/gemma-3-4b-it"), "models/gemma-3-4b-it");
/// ```
pub fn normalize_model(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

impl GenerationProvider for GoogleClient {
    fn list_models(&self, api_key: &str, _free_only: bool) -> AppResult<Vec<String>> {
        let url = format!("{}/v1beta/models", self.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", MODELS_PAGE_SIZE.to_string())];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }
            debug!("Listing Google models (page token: {:?})", page_token);

            let response = self
                .client
                .get(&url)
                .header(API_KEY_HEADER, api_key)
                .query(&query)
                .send()
                .map_err(AIError::transport)?;
            let page: ListModelsResponse = parse(check_status(response)?, "model list")?;

            models.extend(
                page.models
                    .into_iter()
                    .filter(|m| {
                        m.supported_generation_methods
                            .iter()
                            .any(|method| method == GOOGLE_GENERATE_METHOD)
                    })
                    .map(|m| m.name),
            );

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) if page_token.as_deref() != Some(token.as_str()) => {
                    page_token = Some(token)
                }
                _ => break,
            }
        }

        debug!("Listed {} Google models", models.len());
        Ok(models)
    }

    fn generate(&self, api_key: &str, request: &GenerationRequest) -> AppResult<String> {
        let model = normalize_model(&request.model);
        debug!("Sending generateContent request with model: {}", model);

        let (user_text, system_instruction) = if is_gemma(&model) {
            (
                inline_system_prompt(&request.system_prompt, &request.user_content),
                None,
            )
        } else {
            (
                request.user_content.clone(),
                Some(Content {
                    role: None,
                    parts: vec![Part {
                        text: request.system_prompt.clone(),
                    }],
                }),
            )
        };
        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: user_text }],
            }],
            system_instruction,
        };

        let url = format!("{}/v1beta/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .map_err(AIError::transport)?;
        let reply: GenerateResponse = parse(check_status(response)?, "generateContent response")?;

        let Some(candidate) = reply.candidates.into_iter().next() else {
            if let Some(reason) = reply.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(AIError::provider(format!("Prompt blocked: {}", reason)).into());
            }
            return Err(AIError::EmptyResponse.into());
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        debug!("Received {} characters from Google", text.len());
        Ok(text)
    }
}
