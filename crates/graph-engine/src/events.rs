//! Event types for observing run progress
//!
//! Events are sent from the scheduler to the frontend (or any consumer)
//! to report per-node status transitions and run lifecycle changes.

use serde::{Deserialize, Serialize};

/// Trait for sending run events
///
/// This abstracts over the transport mechanism (UI channel, mpsc, etc.)
/// allowing the engine to be used in different hosts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: RunEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted during a workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RunEvent {
    /// A run started after a valid execution order was computed
    #[serde(rename_all = "camelCase")]
    RunStarted {
        workflow_id: String,
        run_id: String,
    },

    /// The run finished; individual nodes may still have failed or blocked
    #[serde(rename_all = "camelCase")]
    RunCompleted {
        workflow_id: String,
        run_id: String,
    },

    /// A node started executing
    #[serde(rename_all = "camelCase")]
    NodeStarted { node_id: String, run_id: String },

    /// A node completed successfully
    #[serde(rename_all = "camelCase")]
    NodeCompleted {
        node_id: String,
        run_id: String,
        output_count: usize,
    },

    /// A node failed; downstream dependents will be blocked
    #[serde(rename_all = "camelCase")]
    NodeFailed {
        node_id: String,
        run_id: String,
        error: String,
    },

    /// A node was skipped because an upstream producer did not complete
    #[serde(rename_all = "camelCase")]
    NodeBlocked {
        node_id: String,
        run_id: String,
        blocked_on: String,
    },

    /// A node was skipped due to cooperative cancellation
    #[serde(rename_all = "camelCase")]
    NodeCancelled { node_id: String, run_id: String },
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: RunEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: std::sync::Mutex<Vec<RunEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: RunEvent) -> Result<(), EventError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
