//! LLM completion service over external APIs (OpenAI/Anthropic/Groq).
//!
//! The routing pipelines consume models through the `LanguageModel` trait;
//! `HttpLanguageModel` is the production implementation.

pub mod config;
pub mod providers;
pub mod types;

pub use config::LLMConfig;
pub use providers::{HttpLanguageModel, LanguageModel};
pub use types::*;
