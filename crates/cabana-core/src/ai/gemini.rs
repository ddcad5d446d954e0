//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use reqwest::{Client, Request, StatusCode};
use serde::{Deserialize, Serialize};

use super::{GenerationError, GenerationErrorKind, Prompt, TextGenerator};
use crate::config::GeminiConfig;
use crate::util::body_excerpt;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const TEMPERATURE: f32 = 1.6;
const TOP_P: f32 = 0.95;
const TOP_K: u32 = 40;
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Clone)]
pub struct GeminiGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    models: Vec<String>,
}

impl GeminiGenerator {
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        if config.api_key.trim().is_empty() {
            return Err(GenerationError::not_configured());
        }
        if config.models.is_empty() {
            return Err(GenerationError::new(
                GenerationErrorKind::ModelUnavailable,
                "no Gemini models configured",
            ));
        }

        let client = Client::builder()
            .build()
            .map_err(|error| GenerationError::new(GenerationErrorKind::Other, error.to_string()))?;

        Ok(Self {
            client,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: config.api_key.trim().to_string(),
            models: config.models,
        })
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    fn build_request(&self, model: &str, prompt: &Prompt) -> reqwest::Result<Request> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: prompt.text.clone(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                top_p: TOP_P,
                top_k: TOP_K,
                max_output_tokens: prompt.max_output_tokens,
            },
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
        };

        self.client
            .post(format!("{}/models/{model}:generateContent", self.base_url))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .build()
    }

    async fn generate_with_model(
        &self,
        model: &str,
        prompt: &Prompt,
    ) -> Result<String, GenerationError> {
        let request = self
            .build_request(model, prompt)
            .map_err(|error| GenerationError::new(GenerationErrorKind::Other, error.to_string()))?;
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|error| GenerationError::new(GenerationErrorKind::Network, error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|error| GenerationError::new(GenerationErrorKind::Other, error.to_string()))?;
        let text = payload.text();
        if text.is_empty() {
            return Err(GenerationError::new(
                GenerationErrorKind::EmptyResponse,
                format!("{model} returned no text"),
            ));
        }
        Ok(text)
    }
}

impl std::fmt::Debug for GeminiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiGenerator")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("models", &self.models)
            .finish()
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    /// Try each configured model in order; the last failure is returned.
    async fn generate_text(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        let mut last_error = GenerationError::new(
            GenerationErrorKind::ModelUnavailable,
            "no Gemini models configured",
        );

        for model in &self.models {
            match self.generate_with_model(model, prompt).await {
                Ok(text) => {
                    tracing::debug!("Generated text with {model}");
                    return Ok(text);
                }
                Err(error) => {
                    tracing::warn!("Gemini model {model} failed: {error}");
                    last_error = error;
                }
            }
        }

        Err(last_error)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

/// Map an HTTP failure to a kind using the API's structured status, then
/// the HTTP status code.
fn classify_failure(status: StatusCode, body: &str) -> GenerationError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let api_status = envelope
        .as_ref()
        .and_then(|envelope| envelope.error.status.as_deref());
    let invalid_key = envelope.as_ref().is_some_and(|envelope| {
        envelope
            .error
            .details
            .iter()
            .any(|detail| detail.reason.as_deref() == Some("API_KEY_INVALID"))
    });

    let kind = match api_status {
        Some("RESOURCE_EXHAUSTED") => GenerationErrorKind::QuotaExceeded,
        Some("PERMISSION_DENIED" | "UNAUTHENTICATED") => GenerationErrorKind::Unauthorized,
        Some("NOT_FOUND") => GenerationErrorKind::ModelUnavailable,
        _ if invalid_key => GenerationErrorKind::Unauthorized,
        _ => match status {
            StatusCode::TOO_MANY_REQUESTS => GenerationErrorKind::QuotaExceeded,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationErrorKind::Unauthorized,
            StatusCode::NOT_FOUND => GenerationErrorKind::ModelUnavailable,
            _ => GenerationErrorKind::Other,
        },
    };

    let message = envelope
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| body_excerpt(body));
    GenerationError::new(kind, format!("{message} ({})", status.as_u16()))
}
