//! HTTP client for an OpenAI-compatible chat completions endpoint

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::config::LlmConfig;
use crate::errors::CastCoachError;
use crate::errors::Result;

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Chat client built once at startup and injected into the narrator;
/// never a hidden module-level singleton.
pub struct LlmClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    /// Create a new LLM client from configuration
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| CastCoachError::Http(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.llm_endpoint.trim_end_matches('/').to_string(),
            api_key: config.llm_key.clone(),
            model: config.llm_model.clone(),
        })
    }

    /// Send one system+user exchange and return the raw completion text.
    /// Low temperature keeps structured output parseable.
    pub async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt.to_string(),
                },
            ],
            temperature: 0.3,
            max_tokens: 2048,
        };

        let url = format!("{}/v1/chat/completions", self.endpoint);
        debug!("LLM request to {} (model {})", url, self.model);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CastCoachError::Narrative(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CastCoachError::Narrative(format!(
                "LLM API error: {status} - {body}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| CastCoachError::Narrative(format!("invalid response body: {e}")))?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CastCoachError::Narrative("no completion returned".to_string()))
    }
}

/// Parse a JSON payload out of completion text, tolerating markdown fences.
/// Anything that does not deserialize into the expected shape is a
/// collaborator failure, never a crash.
pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T> {
    let mut clean = text.trim();

    if let Some(stripped) = clean.strip_prefix("```json") {
        clean = stripped;
    } else if let Some(stripped) = clean.strip_prefix("```") {
        clean = stripped;
    }
    if let Some(stripped) = clean.strip_suffix("```") {
        clean = stripped;
    }

    serde_json::from_str(clean.trim())
        .map_err(|e| CastCoachError::Narrative(format!("unparsable response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        value: u32,
    }

    #[test]
    fn test_parse_plain_json() {
        let parsed: Sample = parse_json_response(r#"{"value": 3}"#).unwrap();
        assert_eq!(parsed, Sample { value: 3 });
    }

    #[test]
    fn test_parse_fenced_json() {
        let parsed: Sample = parse_json_response("```json\n{\"value\": 7}\n```").unwrap();
        assert_eq!(parsed, Sample { value: 7 });
    }

    #[test]
    fn test_parse_bare_fence() {
        let parsed: Sample = parse_json_response("```\n{\"value\": 1}\n```").unwrap();
        assert_eq!(parsed, Sample { value: 1 });
    }

    #[test]
    fn test_malformed_json_is_narrative_error() {
        let result: Result<Sample> = parse_json_response("sorry, I cannot do that");
        assert!(matches!(result, Err(CastCoachError::Narrative(_))));
    }
}
