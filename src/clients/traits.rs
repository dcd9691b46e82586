use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("model call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
    #[error("response envelope has no completion text")]
    MissingCompletion,
}

/// A remote text-completion capability.
///
/// Implementations must fail rather than return partial text; the caller
/// decides whether to fall back.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(
        &self,
        prompt: &str,
        model_name: &str,
        temperature: f32,
    ) -> Result<String, InvokeError>;
}
