//! # Franz Agent
//!
//! The turn loop that lets a vision model draw:
//! 1. Reload the sampling config
//! 2. Hand the previous output to the executor, which runs its tool calls
//! 3. Show the model its previous output, the feedback and a screenshot
//! 4. Whatever the model writes becomes the new story, verbatim
//! 5. Checkpoint the turn, pause, repeat
//!
//! The story is the only memory. Nothing is merged or summarized.

mod agent;
mod inference;

pub use agent::{Agent, TurnOutcome, FALLBACK_FEEDBACK};
pub use inference::InferenceGateway;
