//! Primary/secondary model fallback
//!
//! Each pipeline run tries the primary model, then the secondary one when the
//! primary errors or its sanitized answer is empty. Upstream errors never leave
//! this module: they are logged and folded into a [`FallbackOutcome`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clients::{ModelInvoker, PRIMARY_MODEL, SECONDARY_MODEL};
use crate::sanitize::Sanitizer;

/// Shown to the client in place of a result when no model produced text.
pub const PLACEHOLDER_ERROR: &str = "Error retrieving AI response, please try again later.";

/// Deterministic temperature for decision analysis.
pub const DECISION_TEMPERATURE: f32 = 0.0;
pub const NEXT_FRAME_TEMPERATURE: f32 = 0.8;
pub const ANALYZE_FRAMES_TEMPERATURE: f32 = 0.7;

/// One configured model: the transport plus the model name sent to it.
#[derive(Clone)]
pub struct ModelSlot {
    pub invoker: Arc<dyn ModelInvoker>,
    pub model: String,
}

impl ModelSlot {
    pub fn new(invoker: Arc<dyn ModelInvoker>, model: impl Into<String>) -> Self {
        Self {
            invoker,
            model: model.into(),
        }
    }
}

/// Record of a single invocation, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelAttempt {
    pub model: String,
    pub errored: bool,
    pub non_empty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackOutcome {
    Succeeded {
        model: String,
        text: String,
        attempts: Vec<ModelAttempt>,
    },
    Failed {
        attempts: Vec<ModelAttempt>,
    },
}

impl FallbackOutcome {
    pub fn succeeded_model(&self) -> Option<&str> {
        match self {
            FallbackOutcome::Succeeded { model, .. } => Some(model),
            FallbackOutcome::Failed { .. } => None,
        }
    }

    pub fn attempts(&self) -> &[ModelAttempt] {
        match self {
            FallbackOutcome::Succeeded { attempts, .. } | FallbackOutcome::Failed { attempts } => {
                attempts
            }
        }
    }

    pub fn used_fallback(&self) -> bool {
        self.attempts().len() > 1
    }

    /// Text surfaced to the client; the placeholder sentence when everything failed.
    pub fn into_text(self) -> String {
        match self {
            FallbackOutcome::Succeeded { text, .. } => text,
            FallbackOutcome::Failed { .. } => PLACEHOLDER_ERROR.to_string(),
        }
    }
}

pub struct FallbackCoordinator {
    primary: ModelSlot,
    secondary: ModelSlot,
    sanitizer: Sanitizer,
}

impl FallbackCoordinator {
    pub fn new(primary: ModelSlot, secondary: ModelSlot, sanitizer: Sanitizer) -> Self {
        Self {
            primary,
            secondary,
            sanitizer,
        }
    }

    /// Build with the fixed production model names.
    pub fn with_default_models(
        primary: Arc<dyn ModelInvoker>,
        secondary: Arc<dyn ModelInvoker>,
        sanitizer: Sanitizer,
    ) -> Self {
        Self::new(
            ModelSlot::new(primary, PRIMARY_MODEL),
            ModelSlot::new(secondary, SECONDARY_MODEL),
            sanitizer,
        )
    }

    pub fn primary_model(&self) -> &str {
        &self.primary.model
    }

    pub fn secondary_model(&self) -> &str {
        &self.secondary.model
    }

    /// Primary first, secondary on error or empty sanitized output.
    pub async fn run(&self, prompt: &str, temperature: f32) -> FallbackOutcome {
        let mut attempts = Vec::with_capacity(2);

        for slot in [&self.primary, &self.secondary] {
            let (attempt, text) = self.attempt(slot, prompt, temperature).await;
            attempts.push(attempt);
            if let Some(text) = text {
                if attempts.len() > 1 {
                    info!(model = %slot.model, "fallback model succeeded");
                }
                return FallbackOutcome::Succeeded {
                    model: slot.model.clone(),
                    text,
                    attempts,
                };
            }
        }

        warn!(
            primary = %self.primary.model,
            secondary = %self.secondary.model,
            "all model attempts failed, returning placeholder"
        );
        FallbackOutcome::Failed { attempts }
    }

    /// Primary model only, no fallback.
    pub async fn run_single(&self, prompt: &str, temperature: f32) -> FallbackOutcome {
        let (attempt, text) = self.attempt(&self.primary, prompt, temperature).await;
        match text {
            Some(text) => FallbackOutcome::Succeeded {
                model: self.primary.model.clone(),
                text,
                attempts: vec![attempt],
            },
            None => {
                warn!(model = %self.primary.model, "single-model attempt failed, returning placeholder");
                FallbackOutcome::Failed {
                    attempts: vec![attempt],
                }
            }
        }
    }

    async fn attempt(
        &self,
        slot: &ModelSlot,
        prompt: &str,
        temperature: f32,
    ) -> (ModelAttempt, Option<String>) {
        match slot.invoker.invoke(prompt, &slot.model, temperature).await {
            Ok(raw) => {
                let text = self.sanitizer.clean(&raw);
                let non_empty = !text.is_empty();
                if non_empty {
                    debug!(model = %slot.model, chars = text.chars().count(), "model answered");
                } else {
                    warn!(model = %slot.model, "model answer was empty after sanitizing");
                }
                (
                    ModelAttempt {
                        model: slot.model.clone(),
                        errored: false,
                        non_empty,
                    },
                    non_empty.then_some(text),
                )
            }
            Err(e) => {
                warn!(model = %slot.model, error = %e, "model invocation failed");
                (
                    ModelAttempt {
                        model: slot.model.clone(),
                        errored: true,
                        non_empty: false,
                    },
                    None,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::InvokeError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Reply(&'static str),
        Fail,
    }

    struct Stub {
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl Stub {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ModelInvoker for Stub {
        async fn invoke(
            &self,
            _prompt: &str,
            _model_name: &str,
            _temperature: f32,
        ) -> Result<String, InvokeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Reply(text) => Ok(text.to_string()),
                Behavior::Fail => Err(InvokeError::Status {
                    status: 429,
                    body: "quota".into(),
                }),
            }
        }
    }

    fn coordinator(primary: Arc<Stub>, secondary: Arc<Stub>) -> FallbackCoordinator {
        FallbackCoordinator::new(
            ModelSlot::new(primary, "primary-model"),
            ModelSlot::new(secondary, "secondary-model"),
            Sanitizer::default(),
        )
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn answer_length_is_logged_in_characters() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let c = coordinator(Stub::new(Behavior::Reply("ação é")), Stub::new(Behavior::Fail));
        let outcome = c.run("p", DECISION_TEMPERATURE).await;
        assert_eq!(outcome.into_text(), "ação é");

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("model answered"), "{output}");
        assert!(output.contains("chars=6"), "{output}");
    }

    #[tokio::test]
    async fn primary_success_skips_secondary() {
        let primary = Stub::new(Behavior::Reply("- Pros: calm"));
        let secondary = Stub::new(Behavior::Reply("unused"));
        let c = coordinator(primary.clone(), secondary.clone());

        let outcome = c.run("p", DECISION_TEMPERATURE).await;
        assert_eq!(outcome.succeeded_model(), Some("primary-model"));
        assert!(!outcome.used_fallback());
        assert_eq!(outcome.into_text(), "Pros: calm");
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn primary_error_falls_back_to_secondary() {
        let primary = Stub::new(Behavior::Fail);
        let secondary = Stub::new(Behavior::Reply("**Pros:** novelty"));
        let c = coordinator(primary, secondary);

        let outcome = c.run("p", DECISION_TEMPERATURE).await;
        assert_eq!(outcome.succeeded_model(), Some("secondary-model"));
        assert_eq!(
            outcome.attempts(),
            &[
                ModelAttempt {
                    model: "primary-model".into(),
                    errored: true,
                    non_empty: false
                },
                ModelAttempt {
                    model: "secondary-model".into(),
                    errored: false,
                    non_empty: true
                },
            ]
        );
        assert_eq!(outcome.into_text(), "Pros: novelty");
    }

    #[tokio::test]
    async fn empty_sanitized_primary_falls_back() {
        let primary = Stub::new(Behavior::Reply("In conclusion, nothing.\n- \n"));
        let secondary = Stub::new(Behavior::Reply("Cons: risk"));
        let c = coordinator(primary, secondary);

        let outcome = c.run("p", DECISION_TEMPERATURE).await;
        assert_eq!(outcome.succeeded_model(), Some("secondary-model"));
        assert!(!outcome.attempts()[0].errored);
        assert!(!outcome.attempts()[0].non_empty);
    }

    #[tokio::test]
    async fn both_failing_yields_placeholder() {
        let primary = Stub::new(Behavior::Fail);
        let secondary = Stub::new(Behavior::Fail);
        let c = coordinator(primary.clone(), secondary.clone());

        let outcome = c.run("p", DECISION_TEMPERATURE).await;
        assert_eq!(outcome.succeeded_model(), None);
        assert_eq!(outcome.into_text(), PLACEHOLDER_ERROR);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn single_path_never_touches_secondary() {
        let primary = Stub::new(Behavior::Fail);
        let secondary = Stub::new(Behavior::Reply("would have worked"));
        let c = coordinator(primary, secondary.clone());

        let outcome = c.run_single("p", NEXT_FRAME_TEMPERATURE).await;
        assert_eq!(outcome.into_text(), PLACEHOLDER_ERROR);
        assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
    }
}
