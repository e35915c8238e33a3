//! # Franz Core
//!
//! The pieces a drawing turn is made of.
//!
//! ## Core Concepts
//! - **Story**: the one string a turn hands to the next; the agent's entire memory
//! - **Sampling config**: hot-reloadable knobs, snapshotted once per turn
//! - **Turn record**: the `state.json` checkpoint written after every turn
//! - **Executor**: an out-of-process worker that runs the tool calls and takes a screenshot
//! - **Provider**: trait-based access to an OpenAI-compatible vision endpoint

pub mod config;
pub mod error;
pub mod executor;
pub mod prompt;
pub mod provider;
pub mod state;
mod wire;

pub use config::{default_tools, resolve_run_dir, HotConfig, RunSettings, SamplingConfig, ToolMap};
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use executor::{ActionExecutor, ExecutionRequest, ExecutionResult, SubprocessExecutor};
pub use prompt::SYSTEM_PROMPT;
pub use provider::{
    complete_with_retry, ChatMessage, CompletionRequest, CompletionResponse, ContentPart,
    FinishReason, ImageUrl, LlmProvider, MessageContent, OpenAIProvider, ProviderConfig,
    ProviderError, RetryPolicy, Role, Usage,
};
pub use state::{FileTurnStore, MemoryTurnStore, TurnRecord, TurnStore, STATE_FILE_NAME};
