//! # glint-engine
//!
//! Candidate-generation ("acquisition") engine for LLM-guided black-box
//! hyperparameter optimization.
//!
//! Given an immutable snapshot of prior configuration/performance pairs,
//! the engine computes a performance target to chase, renders a batch of
//! diverse few-shot prompt variants, dispatches them concurrently to a
//! rate-limited text-generation backend, parses the free-text replies into
//! structured candidates, and validates/deduplicates those candidates
//! against the task's type and range constraints — retrying the whole
//! cycle until a quorum of valid candidates is reached.

mod dispatch;
mod engine;
mod format;
mod parse;
mod prompt;
mod target;
mod transport;
mod validate;
mod warp;

pub use dispatch::dispatch_all;
pub use engine::{AcquisitionEngine, GenerateOptions};
pub use format::{count_decimals, format_examples, FewShotExample, FormatOptions};
pub use parse::parse_candidate;
pub use prompt::{PromptBuilder, PromptVariant};
pub use target::{compute_target, TargetContext};
pub use transport::{
    LlmReply, OpenAiConfig, OpenAiTransport, RateLimitedTransport, RateLimiter, Transport,
};
pub use validate::filter_candidates;
pub use warp::{LogWarper, WarpingTransformer};
