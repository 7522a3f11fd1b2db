//! Advice oracle clients, the suggestion pipeline, position commentary and
//! the async coordinator that drives a game session.

pub mod client;
pub mod commentary;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod parse;
pub mod pipeline;
pub mod prompt;

pub use client::{AdviceOracle, ChatCompletionsOracle, DisabledOracle, HttpAdviceOracle};
pub use config::AdvisorConfig;
pub use coordinator::{Trainer, TrainerEvent};
pub use error::AdviceError;
pub use pipeline::SuggestionPipeline;
