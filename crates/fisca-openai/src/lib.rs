//! # fisca-openai
//!
//! OpenAI chat-completion backend implementing the engine's `Completion`
//! contract. One question in, one French answer out.

pub mod completion;
pub mod config;

pub use completion::{OpenAiCompletion, NO_ANSWER, SYSTEM_PROMPT};
pub use config::OpenAiConfig;
