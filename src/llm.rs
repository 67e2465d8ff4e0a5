use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::config::ConfigManager;

/// Per-call generation options.
///
/// Resolution precedence: explicit field set by the caller > agent-scoped
/// configuration > global `llm_settings` defaults. Agent overrides arrive
/// for free through the merged agent config view.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmOptions {
    pub model: Option<String>,
    pub temperature: f64,
    pub max_tokens: u64,
    pub top_p: f64,
    pub top_k: u64,
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.7,
            max_tokens: 8192,
            top_p: 0.8,
            top_k: 40,
        }
    }
}

impl LlmOptions {
    /// Reads `llm_settings.*` from a configuration tree (base or
    /// agent-merged), falling back to the built-in defaults.
    pub fn from_value(config: &Value) -> Self {
        let defaults = Self::default();
        let settings = config.get("llm_settings");
        let lookup = |key: &str| settings.and_then(|s| s.get(key));
        Self {
            model: lookup("model")
                .and_then(Value::as_str)
                .map(str::to_string),
            temperature: lookup("temperature")
                .and_then(Value::as_f64)
                .unwrap_or(defaults.temperature),
            max_tokens: lookup("max_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(defaults.max_tokens),
            top_p: lookup("top_p")
                .and_then(Value::as_f64)
                .unwrap_or(defaults.top_p),
            top_k: lookup("top_k")
                .and_then(Value::as_u64)
                .unwrap_or(defaults.top_k),
        }
    }
}

/// Opaque LLM capability handed to every agent. The orchestration core
/// never calls it; agents do.
pub trait LlmClient: Send + Sync {
    fn provider_name(&self) -> &'static str;
    fn complete(&self, prompt: &str, options: &LlmOptions) -> Result<String>;
}

impl std::fmt::Debug for dyn LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("provider", &self.provider_name())
            .finish()
    }
}

/// Gemini over the `generativelanguage` REST API.
///
/// The API key is read at construction but only required at call time, so
/// a pipeline whose agents never reach the LLM runs without credentials.
pub struct GeminiClient {
    api_key: Option<String>,
    base_url: String,
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-pro";

impl GeminiClient {
    pub fn from_env() -> Self {
        Self {
            api_key: env_value("GEMINI_API_KEY"),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(api_key: Option<String>, base_url: String) -> Self {
        Self { api_key, base_url }
    }
}

impl LlmClient for GeminiClient {
    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn complete(&self, prompt: &str, options: &LlmOptions) -> Result<String> {
        anyhow::ensure!(!prompt.trim().is_empty(), "prompt cannot be empty");
        let api_key = self
            .api_key
            .as_deref()
            .context("GEMINI_API_KEY is required for the Gemini provider")?;
        let model = options.model.as_deref().unwrap_or(GEMINI_DEFAULT_MODEL);
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": options.temperature,
                "topP": options.top_p,
                "topK": options.top_k,
                "maxOutputTokens": options.max_tokens,
            },
        });

        let response: Value = ureq::post(&url)
            .set("x-goog-api-key", api_key)
            .send_json(body)
            .with_context(|| format!("Gemini request failed for model '{model}'"))?
            .into_json()
            .context("Gemini returned a non-JSON response")?;

        let text = response["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        anyhow::ensure!(
            !text.is_empty(),
            "Gemini returned no candidate text for model '{model}'"
        );
        Ok(text)
    }
}

/// OpenAI chat completions.
pub struct OpenAiClient {
    api_key: Option<String>,
    base_url: String,
}

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

impl OpenAiClient {
    pub fn from_env() -> Self {
        Self {
            api_key: env_value("OPENAI_API_KEY"),
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(api_key: Option<String>, base_url: String) -> Self {
        Self { api_key, base_url }
    }
}

impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn complete(&self, prompt: &str, options: &LlmOptions) -> Result<String> {
        anyhow::ensure!(!prompt.trim().is_empty(), "prompt cannot be empty");
        let api_key = self
            .api_key
            .as_deref()
            .context("OPENAI_API_KEY is required for the OpenAI provider")?;
        let model = options.model.as_deref().unwrap_or(OPENAI_DEFAULT_MODEL);
        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
            "top_p": options.top_p,
        });

        let response: Value = ureq::post(&format!("{}/v1/chat/completions", self.base_url))
            .set("authorization", &format!("Bearer {api_key}"))
            .send_json(body)
            .with_context(|| format!("OpenAI request failed for model '{model}'"))?
            .into_json()
            .context("OpenAI returned a non-JSON response")?;

        response["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .with_context(|| format!("OpenAI returned no message content for model '{model}'"))
    }
}

/// Local Ollama server. No credentials; host comes from `OLLAMA_HOST`.
pub struct OllamaClient {
    host: String,
}

const OLLAMA_DEFAULT_HOST: &str = "http://localhost:11434";
const OLLAMA_DEFAULT_MODEL: &str = "llama3.2";

impl OllamaClient {
    pub fn from_env() -> Self {
        Self {
            host: env_value("OLLAMA_HOST").unwrap_or_else(|| OLLAMA_DEFAULT_HOST.to_string()),
        }
    }

    pub fn with_host(host: String) -> Self {
        Self { host }
    }
}

impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &'static str {
        "ollama"
    }

    fn complete(&self, prompt: &str, options: &LlmOptions) -> Result<String> {
        anyhow::ensure!(!prompt.trim().is_empty(), "prompt cannot be empty");
        let model = options.model.as_deref().unwrap_or(OLLAMA_DEFAULT_MODEL);
        let body = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": options.temperature,
                "top_p": options.top_p,
                "top_k": options.top_k,
                "num_predict": options.max_tokens,
            },
        });

        let response: Value = ureq::post(&format!("{}/api/generate", self.host))
            .send_json(body)
            .with_context(|| format!("Ollama request failed for model '{model}'"))?
            .into_json()
            .context("Ollama returned a non-JSON response")?;

        response["response"]
            .as_str()
            .map(str::to_string)
            .with_context(|| format!("Ollama returned no response text for model '{model}'"))
    }
}

/// Builds the shared LLM handle from `llm_settings.default_provider`.
///
/// `"auto"` picks the first provider with credentials in the environment;
/// absence of any is deferred to call time by falling back to Gemini, the
/// historical default.
pub fn resolve_client(config: &ConfigManager) -> Result<Arc<dyn LlmClient>> {
    let configured = config
        .get_str("llm_settings.default_provider")
        .unwrap_or("gemini");

    let provider = match configured {
        "auto" => detect_provider().unwrap_or("gemini"),
        other => other,
    };

    match provider {
        "gemini" => Ok(Arc::new(GeminiClient::from_env())),
        "openai" => Ok(Arc::new(OpenAiClient::from_env())),
        "ollama" => Ok(Arc::new(OllamaClient::from_env())),
        other => Err(anyhow::anyhow!(
            "unsupported LLM provider '{}'. Supported values: auto, gemini, openai, ollama",
            other
        )),
    }
}

/// First provider with usable environment credentials, in preference order.
pub fn detect_provider() -> Option<&'static str> {
    if env_present("GEMINI_API_KEY") {
        return Some("gemini");
    }
    if env_present("OPENAI_API_KEY") {
        return Some("openai");
    }
    if env_present("OLLAMA_HOST") {
        return Some("ollama");
    }
    None
}

pub fn env_present(key: &str) -> bool {
    std::env::var(key)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false)
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
