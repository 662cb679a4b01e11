//! Remote model providers. Each provider is picked once at construction
//! time from `Config`; call sites only ever see the traits.

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod unsplash;

use crate::{
    config::{Config, EmbeddingProviderKind, TextProviderKind},
    error::{ConfigError, ProviderError},
};
use reqwest::blocking::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{sync::Arc, time::Duration};

const ERROR_BODY_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn absorb(&mut self, other: Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new<S: Into<String>>(prompt: S) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.into(),
            system_prompt: None,
            temperature: 0.7,
            max_tokens: 4096,
        }
    }

    pub fn with_system<S: Into<String>>(mut self, system_prompt: S) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub usage: Usage,
}

pub trait TextProvider: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError>;
}

pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

pub trait ImageProvider: Send + Sync {
    /// URL of a cover image matching `query`, if the provider found one.
    fn cover_image(&self, query: &str) -> Result<Option<String>, ProviderError>;
}

pub fn http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Sends the request and decodes a JSON body, classifying HTTP failures.
pub(crate) fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ProviderError> {
    let response = request.send()?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        let body: String = body.chars().take(ERROR_BODY_CHARS).collect();
        return Err(ProviderError::from_status(status, body));
    }
    response
        .json::<T>()
        .map_err(|e| ProviderError::Malformed(e.to_string()))
}

fn required(key: &Option<String>, var: &'static str) -> Result<String, ConfigError> {
    key.clone().ok_or(ConfigError::Missing(var))
}

fn client_for(config: &Config) -> Result<Client, ConfigError> {
    http_client(config.provider_timeout).map_err(|e| ConfigError::Invalid {
        var: "PROVIDER_TIMEOUT_SECS",
        value: e.to_string(),
    })
}

pub fn text_provider(config: &Config) -> Result<Arc<dyn TextProvider>, ConfigError> {
    let client = client_for(config)?;
    let provider: Arc<dyn TextProvider> = match config.text_provider {
        TextProviderKind::OpenAi => Arc::new(openai::OpenAi::new(
            client,
            required(&config.openai_api_key, "OPENAI_API_KEY")?,
            &config.openai_model,
            &config.openai_embedding_model,
        )),
        TextProviderKind::Anthropic => Arc::new(anthropic::Anthropic::new(
            client,
            required(&config.anthropic_api_key, "ANTHROPIC_API_KEY")?,
            &config.anthropic_model,
        )),
        TextProviderKind::Gemini => Arc::new(gemini::Gemini::new(
            client,
            required(&config.gemini_api_key, "GEMINI_API_KEY")?,
            &config.gemini_model,
            &config.gemini_embedding_model,
        )),
    };
    log::info!("Using {} for text generation", provider.name());
    Ok(provider)
}

pub fn embedding_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>, ConfigError> {
    let client = client_for(config)?;
    Ok(match config.embedding_provider {
        EmbeddingProviderKind::OpenAi => Arc::new(openai::OpenAi::new(
            client,
            required(&config.openai_api_key, "OPENAI_API_KEY")?,
            &config.openai_model,
            &config.openai_embedding_model,
        )),
        EmbeddingProviderKind::Gemini => Arc::new(gemini::Gemini::new(
            client,
            required(&config.gemini_api_key, "GEMINI_API_KEY")?,
            &config.gemini_model,
            &config.gemini_embedding_model,
        )),
    })
}

pub fn image_provider(config: &Config) -> Result<Option<Arc<dyn ImageProvider>>, ConfigError> {
    match &config.unsplash_access_key {
        None => Ok(None),
        Some(key) => Ok(Some(Arc::new(unsplash::Unsplash::new(
            client_for(config)?,
            key.clone(),
        )))),
    }
}
