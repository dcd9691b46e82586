pub mod clients;
pub mod config;
pub mod error;
pub mod fallback;
pub mod http;
pub mod prompts;
pub mod sanitize;
pub mod schemas;

pub use fallback::{FallbackCoordinator, FallbackOutcome, ModelAttempt, PLACEHOLDER_ERROR};
pub use sanitize::sanitize;
