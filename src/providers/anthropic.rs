use super::{send_json, Generation, GenerationRequest, TextProvider, Usage};
use crate::error::ProviderError;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// Claude messages API. Text generation only; embeddings come from another
/// provider.
pub struct Anthropic {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl Anthropic {
    pub fn new(client: Client, api_key: String, model: &str) -> Anthropic {
        Anthropic {
            client,
            api_key,
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<MessagesUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessagesUsage {
    input_tokens: u32,
    output_tokens: u32,
}

fn into_generation(response: MessagesResponse) -> Result<Generation, ProviderError> {
    let text: String = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("");
    if text.is_empty() {
        return Err(ProviderError::Malformed("no text blocks in message".to_string()));
    }
    let usage = response
        .usage
        .map(|u| Usage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        })
        .unwrap_or_default();
    Ok(Generation { text, usage })
}

impl TextProvider for Anthropic {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<Generation, ProviderError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system_prompt.as_deref(),
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };
        let response: MessagesResponse = send_json(
            self.client
                .post(&format!("{}/messages", self.base_url))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&body),
        )?;
        into_generation(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_blocks_are_joined() {
        let raw = r##"{
            "content": [
                {"type": "text", "text": "# Title\n"},
                {"type": "tool_use", "id": "x", "name": "n", "input": {}},
                {"type": "text", "text": "Body"}
            ],
            "usage": {"input_tokens": 3, "output_tokens": 4}
        }"##;
        let generation = into_generation(serde_json::from_str(raw).unwrap()).unwrap();
        assert_eq!(generation.text, "# Title\nBody");
        assert_eq!(generation.usage.output_tokens, 4);
    }

    #[test]
    fn system_prompt_is_optional_in_body() {
        let body = MessagesRequest {
            model: "m",
            max_tokens: 10,
            temperature: 0.5,
            system: None,
            messages: vec![Message { role: "user", content: "hi" }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("system").is_none());
        assert_eq!(json["messages"][0]["content"], "hi");
    }
}
