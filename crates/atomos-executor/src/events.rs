//! Execution events and notifiers for observability.
//!
//! Events are emitted by the scheduler as a run progresses so callers can
//! print progress, record timings, or stream results elsewhere.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionEvent {
  /// Workflow execution has started.
  WorkflowStarted {
    execution_id: String,
    workflow: String,
  },

  /// A block has been dispatched.
  BlockStarted {
    execution_id: String,
    block: String,
    level: usize,
  },

  /// A connection's stdout was stored under its label.
  OutputCaptured {
    execution_id: String,
    block: String,
    label: String,
    bytes: usize,
  },

  /// A block has completed successfully.
  BlockCompleted {
    execution_id: String,
    block: String,
  },

  /// A block has failed.
  BlockFailed {
    execution_id: String,
    block: String,
    error: String,
  },

  /// Workflow execution has completed successfully.
  WorkflowCompleted { execution_id: String },

  /// Workflow execution has failed.
  WorkflowFailed { execution_id: String, error: String },
}

/// Trait for receiving execution events.
///
/// The scheduler calls `notify` from its own loop, never from block tasks.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// A no-op notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// A notifier that sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
