use super::{send_json, EmbeddingProvider, Generation, GenerationRequest, TextProvider, Usage};
use crate::error::ProviderError;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct Gemini {
    client: Client,
    api_key: String,
    model: String,
    embedding_model: String,
    base_url: String,
}

impl Gemini {
    pub fn new(client: Client, api_key: String, model: &str, embedding_model: &str) -> Gemini {
        Gemini {
            client,
            api_key,
            model: model.to_string(),
            embedding_model: embedding_model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Content {
        Content {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    content: Content,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

fn into_generation(response: GenerateResponse) -> Result<Generation, ProviderError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    if text.is_empty() {
        return Err(ProviderError::Malformed("no candidate text".to_string()));
    }
    let usage = response
        .usage_metadata
        .map(|u| Usage {
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
        })
        .unwrap_or_default();
    Ok(Generation { text, usage })
}

impl TextProvider for Gemini {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let body = GenerateRequest {
            system_instruction: request
                .system_prompt
                .as_deref()
                .map(|s| Content::text(None, s)),
            contents: vec![Content::text(Some("user"), &request.prompt)],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };
        let response: GenerateResponse = send_json(
            self.client
                .post(&self.endpoint(&self.model, "generateContent"))
                .query(&[("key", &self.api_key)])
                .json(&body),
        )?;
        into_generation(response)
    }
}

impl EmbeddingProvider for Gemini {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = EmbedRequest {
            model: format!("models/{}", self.embedding_model),
            content: Content::text(None, text),
        };
        let response: EmbedResponse = send_json(
            self.client
                .post(&self.endpoint(&self.embedding_model, "embedContent"))
                .query(&[("key", &self.api_key)])
                .json(&body),
        )?;
        Ok(response.embedding.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_parts_decode() {
        let raw = r##"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "# A"}, {"text": "\nB"}]}}],
            "usageMetadata": {"promptTokenCount": 7, "candidatesTokenCount": 9, "totalTokenCount": 16}
        }"##;
        let generation = into_generation(serde_json::from_str(raw).unwrap()).unwrap();
        assert_eq!(generation.text, "# A\nB");
        assert_eq!(generation.usage, Usage { input_tokens: 7, output_tokens: 9 });
    }

    #[test]
    fn blocked_prompt_is_malformed() {
        let raw = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        assert!(into_generation(serde_json::from_str(raw).unwrap()).is_err());
    }

    #[test]
    fn request_uses_camel_case() {
        let body = GenerateRequest {
            system_instruction: Some(Content::text(None, "sys")),
            contents: vec![Content::text(Some("user"), "hi")],
            generation_config: GenerationConfig {
                temperature: 0.5,
                max_output_tokens: 100,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 100);
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(json["systemInstruction"].get("role").is_none());
    }

    #[test]
    fn embedding_values_decode() {
        let raw = r#"{"embedding": {"values": [0.1, 0.2]}}"#;
        let response: EmbedResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.embedding.values.len(), 2);
    }
}
