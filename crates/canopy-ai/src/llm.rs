//! The LLM Port: a single structured-completion operation used by Tier 3
//! of the Enrichment Engine to resolve a file's batch of unresolved call
//! targets in one request.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One unresolved call site handed to the LLM as part of a file's batch.
#[derive(Debug, Clone, Serialize)]
pub struct LlmResolutionRequest {
    pub pending_link_id: String,
    pub target_expression: String,
    pub line_of_code: String,
    pub candidates: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmResolution {
    pub pending_link_id: String,
    pub resolved_canonical_fqn: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmBatchResponse {
    pub resolutions: Vec<LlmResolution>,
}

/// Abstract boundary over whichever model backend is configured. Tier 3
/// only ever needs one shape of call: send a prompt, get back an object
/// matching the caller's expected schema.
#[async_trait]
pub trait LlmPort: Send + Sync {
    async fn structured_complete(&self, prompt: &str) -> Result<Value>;
}

/// Builds the Tier 3 batch-resolution prompt for one source file's worth
/// of unresolved links.
pub fn build_resolution_prompt(source_code: &str, requests: &[LlmResolutionRequest]) -> Result<String> {
    let references_json = serde_json::to_string_pretty(requests)?;
    Ok(format!(
        r#"You are resolving unqualified call-site references in a source file to their fully-qualified definitions.

Source code:
```
{source_code}
```

Unresolved references:
{references_json}

For each reference, choose the single best matching candidate FQN, or null if none of the candidates are a plausible match. Respond with a JSON object of this exact shape:
{{
  "resolutions": [
    {{ "pending_link_id": "<id>", "resolved_canonical_fqn": "<fqn or null>" }}
  ]
}}"#
    ))
}

pub fn parse_resolution_response(raw: &Value) -> Result<LlmBatchResponse> {
    serde_json::from_value(raw.clone()).context("LLM response did not match the expected resolution schema")
}

/// An OpenAI-compatible chat-completion backend (OpenRouter, local
/// proxies, etc.), requesting JSON-mode output and parsing the first
/// choice's message content as the structured value.
pub struct HttpLlmProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: std::time::Duration,
}

impl HttpLlmProvider {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, timeout: std::time::Duration) -> Self {
        HttpLlmProvider {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[async_trait]
impl LlmPort for HttpLlmProvider {
    async fn structured_complete(&self, prompt: &str) -> Result<Value> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: 0.0,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .context("LLM request failed")?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM backend returned an error: {body}");
        }

        let parsed: ChatResponse = response.json().await.context("malformed LLM response envelope")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .context("LLM response had no choices")?
            .message
            .content;

        serde_json::from_str(&content).context("LLM response content was not valid JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_prompt_embedding_source_and_references() {
        let requests = vec![LlmResolutionRequest {
            pending_link_id: "pending:1".into(),
            target_expression: "helper".into(),
            line_of_code: "helper();".into(),
            candidates: vec!["a::helper()".into()],
        }];
        let prompt = build_resolution_prompt("fn main() {}", &requests).unwrap();
        assert!(prompt.contains("fn main() {}"));
        assert!(prompt.contains("helper"));
    }

    #[test]
    fn parses_a_well_formed_resolution_response() {
        let raw = serde_json::json!({
            "resolutions": [
                {"pending_link_id": "pending:1", "resolved_canonical_fqn": "a::helper()"},
                {"pending_link_id": "pending:2", "resolved_canonical_fqn": null}
            ]
        });
        let parsed = parse_resolution_response(&raw).unwrap();
        assert_eq!(parsed.resolutions.len(), 2);
        assert_eq!(parsed.resolutions[0].resolved_canonical_fqn.as_deref(), Some("a::helper()"));
        assert!(parsed.resolutions[1].resolved_canonical_fqn.is_none());
    }
}
