// Runtime configuration.
// The environment is read exactly once, in `main`, through a lookup
// function. Everything below the binary receives a `RelayConfig` value
// instead of touching `std::env`, so tests can hand in whatever they like.

use serde::Serialize;

/// Environment variable holding the Gemini API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Environment variable overriding the API base URL.
pub const API_BASE_VAR: &str = "GEMINI_API_BASE";

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model every request is sent to.
pub const MODEL_ID: &str = "gemini-1.5-flash";

/// Sampling and output parameters sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: &'static str,
}

pub const GENERATION_CONFIG: GenerationConfig = GenerationConfig {
    temperature: 0.1,
    top_p: 0.95,
    top_k: 64,
    max_output_tokens: 8192,
    response_mime_type: "application/json",
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub api_key: Option<String>,
    pub api_base: String,
}

impl RelayConfig {
    /// Build a config from an arbitrary variable lookup. Empty values are
    /// treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let api_base = non_empty(API_BASE_VAR)
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        RelayConfig {
            api_key: non_empty(API_KEY_VAR),
            api_base,
        }
    }

    /// Snapshot of the real process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}
