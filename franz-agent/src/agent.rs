//! Agent implementation - the perpetual turn loop

use crate::inference::InferenceGateway;
use franz_core::state::timestamp_now;
use franz_core::{
    ActionExecutor, ExecutionRequest, HotConfig, LlmProvider, Result, RunSettings, TurnRecord,
    TurnStore,
};
use std::convert::Infallible;

/// Feedback shown to the model when the executor gave none.
pub const FALLBACK_FEEDBACK: &str = "RuntimeError: executor subprocess failed. Retrying next turn.";

/// What one turn did, for logging and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub turn: u64,
    /// Length of the newly adopted story
    pub story_chars: usize,
    /// False when the fallback feedback was used
    pub executor_feedback: bool,
    /// False when the checkpoint write failed
    pub persisted: bool,
}

/// The turn orchestrator.
///
/// Owns the story and the turn counter. Exactly one turn runs at a time.
pub struct Agent<P, X, S> {
    settings: RunSettings,
    config: HotConfig,
    executor: X,
    inference: InferenceGateway<P>,
    store: S,
    story: String,
    turn: u64,
}

impl<P, X, S> Agent<P, X, S>
where
    P: LlmProvider,
    X: ActionExecutor,
    S: TurnStore,
{
    /// Fresh agent at turn 0 with an empty story. Call [`Agent::resume`] to
    /// pick up a persisted checkpoint.
    pub fn new(
        settings: RunSettings,
        config: HotConfig,
        executor: X,
        inference: InferenceGateway<P>,
        store: S,
    ) -> Self {
        Self {
            settings,
            config,
            executor,
            inference,
            store,
            story: String::new(),
            turn: 0,
        }
    }

    /// Continue from the store's latest record, if any.
    ///
    /// An unreadable checkpoint is not fatal: the run starts over.
    pub fn resume(mut self) -> Self {
        match self.store.load() {
            Ok(Some(record)) => {
                let (story, turn) = record.resume_point();
                tracing::info!(turn, story_chars = story.len(), "resuming from checkpoint");
                self.story = story;
                self.turn = turn;
            }
            Ok(None) => {
                tracing::info!("no checkpoint found, starting at turn 1");
            }
            Err(e) => {
                tracing::warn!(error = %e, "checkpoint unreadable, starting at turn 1");
            }
        }
        self
    }

    /// Current story
    pub fn story(&self) -> &str {
        &self.story
    }

    /// Last turn started
    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    pub fn inference(&self) -> &InferenceGateway<P> {
        &self.inference
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one turn.
    ///
    /// The only error that escapes is a failed inference; everything else is
    /// absorbed and logged.
    pub async fn run_turn(&mut self) -> Result<TurnOutcome> {
        self.turn += 1;
        let turn = self.turn;

        if let Err(e) = self.config.refresh() {
            tracing::warn!(turn, error = %e, "config reload failed, keeping previous snapshot");
        }
        let sampling = self.config.snapshot();

        let request = ExecutionRequest::new(&self.story, &self.settings, &sampling);
        let execution = self.executor.execute(&request).await;

        let executor_feedback = execution.feedback.is_some();
        let feedback = execution
            .feedback
            .clone()
            .unwrap_or_else(|| FALLBACK_FEEDBACK.to_string());

        let raw = self
            .inference
            .infer(&execution.screenshot_b64, &self.story, &feedback, &sampling)
            .await
            .map_err(|e| e.with_operation("agent::run_turn").with_context("turn", turn.to_string()))?;

        // Whatever the model wrote replaces the story wholesale
        let prev_story = std::mem::replace(&mut self.story, raw.clone());

        let record = TurnRecord {
            turn,
            story: self.story.clone(),
            prev_story,
            vlm_raw: raw,
            executed: execution.executed,
            malformed: execution.malformed,
            ignored: execution.ignored,
            wants_screenshot: execution.wants_screenshot,
            execute_actions: self.settings.execute_actions,
            tools: self.settings.tools.clone(),
            sampling: Some(sampling),
            timestamp: timestamp_now(),
        };

        let persisted = match self.store.save(&record) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(turn, error = %e, "checkpoint write failed, continuing");
                false
            }
        };

        tracing::info!(
            turn,
            executed = record.executed.len(),
            malformed = record.malformed.len(),
            ignored = record.ignored.len(),
            story_chars = self.story.len(),
            "turn complete"
        );

        Ok(TurnOutcome {
            turn,
            story_chars: self.story.len(),
            executor_feedback,
            persisted,
        })
    }

    /// Turn after turn until inference gives up for good.
    pub async fn run_forever(&mut self) -> Result<Infallible> {
        loop {
            self.run_turn().await?;
            tokio::time::sleep(self.settings.loop_delay).await;
        }
    }
}
