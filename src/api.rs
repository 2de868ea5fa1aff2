// API client module: a small blocking HTTP client for the Gemini
// `generateContent` endpoint plus the request/response shapes it needs.
// Only the fields the relay actually reads are modelled; everything else
// in the response is ignored by serde.

use crate::config::{GenerationConfig, GENERATION_CONFIG, MODEL_ID};
use crate::error::RelayError;
use log::{debug, trace};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Blocking client bound to one API base URL and one key.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_base: String,
    model: &'static str,
    generation_config: GenerationConfig,
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Content {
    pub fn user(text: &str) -> Self {
        Content {
            role: "user".into(),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest<'a> {
    pub contents: &'a [Content],
    pub generation_config: &'a GenerationConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

/// Google's error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl GenerateResponse {
    /// Text of the first candidate, with all of its text parts joined.
    pub fn text(&self) -> Result<String, RelayError> {
        let candidate = match self.candidates.first() {
            Some(c) => c,
            None => {
                let blocked = self
                    .prompt_feedback
                    .as_ref()
                    .and_then(|f| f.block_reason.as_deref());
                return Err(RelayError::Transport(match blocked {
                    Some(reason) => format!("prompt was blocked: {}", reason),
                    None => "response contained no candidates".into(),
                }));
            }
        };

        let texts: Vec<&str> = candidate
            .content
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect();
        if texts.is_empty() {
            let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
            return Err(RelayError::Transport(format!(
                "response contained no text (finish reason: {})",
                reason
            )));
        }
        Ok(texts.concat())
    }
}

impl GeminiClient {
    /// Create a client for `api_base` that authenticates every request
    /// with `api_key`.
    pub fn new(api_key: &str, api_base: &str) -> Result<Self, RelayError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key).map_err(|_| RelayError::InvalidApiKey)?;
        key.set_sensitive(true);
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder().default_headers(headers).build()?;
        Ok(GeminiClient {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: MODEL_ID,
            generation_config: GENERATION_CONFIG,
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    /// Begin a conversation seeded with `history`.
    pub fn start_chat(&self, history: Vec<Content>) -> ChatSession<'_> {
        ChatSession {
            client: self,
            history,
        }
    }

    /// POST the full conversation and decode the reply.
    fn generate(&self, contents: &[Content]) -> Result<GenerateResponse, RelayError> {
        let request = GenerateRequest {
            contents,
            generation_config: &self.generation_config,
        };
        if log::log_enabled!(log::Level::Trace) {
            if let Ok(body) = serde_json::to_string(&request) {
                trace!("generateContent request: {}", body);
            }
        }

        let url = self.generate_url();
        debug!("POST {} ({} turns)", url, contents.len());
        let res = self.client.post(&url).json(&request).send()?;

        let status = res.status();
        let body = res.text()?;
        debug!("generateContent returned HTTP {}", status.as_u16());
        trace!("generateContent response: {}", body);

        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(env) => format!("{} ({})", env.error.message, env.error.status),
                Err(_) => format!("HTTP {}: {}", status.as_u16(), body.trim()),
            };
            return Err(RelayError::Transport(message));
        }

        serde_json::from_str(&body)
            .map_err(|e| RelayError::Transport(format!("failed to parse response: {}", e)))
    }
}

/// A conversation with the model. The history lives only as long as the
/// session does.
pub struct ChatSession<'a> {
    client: &'a GeminiClient,
    history: Vec<Content>,
}

impl<'a> ChatSession<'a> {
    pub fn history(&self) -> &[Content] {
        &self.history
    }

    /// Send one user message. On success both the message and the model's
    /// reply are appended to the history.
    pub fn send_message(&mut self, text: &str) -> Result<GenerateResponse, RelayError> {
        let mut contents = self.history.clone();
        contents.push(Content::user(text));

        let response = self.client.generate(&contents)?;
        if let Some(reply) = response.candidates.first().and_then(|c| c.content.clone()) {
            contents.push(reply);
        }
        self.history = contents;
        Ok(response)
    }
}
