use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::traits::{InvokeError, ModelInvoker};

/// OpenAI-compatible `/chat/completions` client.
#[derive(Clone, Debug)]
pub struct ChatCompletionsClient {
    endpoint: String,
    api_key: String,
    timeout_ms: u64,
    lenient_envelope: bool,
    client: Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

impl ChatCompletionsClient {
    pub fn new(
        base_url: &str,
        api_key: String,
        timeout_ms: u64,
        lenient_envelope: bool,
    ) -> anyhow::Result<Self> {
        // Accept either a bare base URL or the full completions path
        let endpoint = if base_url.ends_with("/chat/completions") {
            base_url.to_string()
        } else {
            format!("{}/chat/completions", base_url.trim_end_matches('/'))
        };

        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            endpoint,
            api_key,
            timeout_ms,
            lenient_envelope,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn map_send_error(&self, err: reqwest::Error) -> InvokeError {
        if err.is_timeout() {
            InvokeError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else {
            InvokeError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl ModelInvoker for ChatCompletionsClient {
    async fn invoke(
        &self,
        prompt: &str,
        model_name: &str,
        temperature: f32,
    ) -> Result<String, InvokeError> {
        debug!(
            "Calling chat completions (model={}, temperature={}, chars={})",
            model_name,
            temperature,
            prompt.len()
        );

        let body = ChatRequest {
            model: model_name,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            return Err(InvokeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Value = resp
            .json()
            .await
            .map_err(|e| InvokeError::Decode(e.to_string()))?;
        extract_completion(&envelope, self.lenient_envelope)
    }
}

/// Pull `choices[0].message.content` out of a chat completions envelope.
///
/// With `lenient` set, an envelope without that field is returned serialized
/// instead of failing.
pub fn extract_completion(envelope: &Value, lenient: bool) -> Result<String, InvokeError> {
    if let Some(content) = envelope
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
    {
        return Ok(content.trim().to_string());
    }
    if lenient {
        return Ok(envelope.to_string());
    }
    Err(InvokeError::MissingCompletion)
}
