//! Per-run context handed to tools, handoff callbacks, and hooks.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::types::Usage;

/// Identifier for a run.
pub type RunId = Uuid;

/// Snapshot of run state visible to user callbacks.
///
/// Cloning is cheap; clones share the cancellation token, so a callback can
/// observe cancellation of the run it belongs to.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: RunId,
    /// Caller-supplied metadata, passed through untouched.
    pub metadata: serde_json::Value,
    /// Usage accumulated up to the point the snapshot was taken.
    pub usage: Usage,
    /// 1-based turn number.
    pub turn: usize,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new(metadata: serde_json::Value, cancel: CancellationToken) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            metadata,
            usage: Usage::default(),
            turn: 0,
            cancel,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(serde_json::Value::Null, CancellationToken::new())
    }
}
