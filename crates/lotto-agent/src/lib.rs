//! `lotto-agent`: text-generation backend and the number generator built
//! on top of it.
//!
//! The generator owns prompt construction, retry/backoff and validation of
//! the returned combinations; providers only move text over the wire.

pub mod error;
pub mod generator;
pub mod openai;
pub mod prompt;
pub mod provider;
pub mod validate;

pub use error::GenerationError;
pub use generator::{GeneratorConfig, NumberGenerator, MAX_BATCH};
pub use openai::OpenAiProvider;
pub use provider::{ChatRequest, ChatResponse, LlmProvider, NullProvider, ProviderError};
pub use validate::{validate, ValidationError};
