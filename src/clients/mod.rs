pub mod chat_completions;
pub mod traits;

pub use chat_completions::ChatCompletionsClient;
pub use traits::{InvokeError, ModelInvoker};

/// Model used first for every pipeline run.
pub const PRIMARY_MODEL: &str = "gpt-4o";

/// Model tried when the primary errors or returns nothing usable.
pub const SECONDARY_MODEL: &str = "gpt-4o-mini";
