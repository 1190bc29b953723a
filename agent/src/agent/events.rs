//! Agent events for real-time visibility
//!
//! Emitted by [`super::Agent`] while it runs. Consumers (the workflow
//! engine, CLI output) subscribe through an unbounded channel.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;

/// Events emitted by the agent during execution
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Tool execution is starting
    ToolStart {
        name: String,
        arguments: serde_json::Value,
    },

    /// Tool execution completed
    ToolComplete {
        name: String,
        /// Tool result (truncated for display)
        result: String,
        #[serde(serialize_with = "duration_millis::serialize")]
        duration: Duration,
        is_error: bool,
    },

    /// One round trip of the tool-calling loop
    Iteration { number: usize, tool_calls: usize },

    /// Final response ready
    ResponseComplete {
        iterations: usize,
        #[serde(serialize_with = "duration_millis::serialize")]
        total_duration: Duration,
    },
}

/// Serialize Duration as milliseconds
mod duration_millis {
    use serde::{Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_millis().serialize(serializer)
    }
}

/// Sender for agent events
pub type EventSender = mpsc::UnboundedSender<AgentEvent>;

/// Receiver for agent events
pub type EventReceiver = mpsc::UnboundedReceiver<AgentEvent>;

/// Create a new event channel
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

const MAX_RESULT_PREVIEW: usize = 200;

/// Helper struct for sending events with a consistent API
#[derive(Clone, Default)]
pub struct AgentEventSender {
    sender: Option<EventSender>,
}

impl AgentEventSender {
    /// Create with an actual sender
    pub fn new(sender: EventSender) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Create a no-op sender (events are discarded)
    pub fn none() -> Self {
        Self { sender: None }
    }

    /// Send an event (silently fails if no sender or receiver dropped)
    pub fn send(&self, event: AgentEvent) {
        if let Some(ref sender) = self.sender {
            let _ = sender.send(event);
        }
    }

    pub fn tool_start(&self, name: &str, arguments: &serde_json::Value) {
        self.send(AgentEvent::ToolStart {
            name: name.to_string(),
            arguments: arguments.clone(),
        });
    }

    pub fn tool_complete(&self, name: &str, result: &str, duration: Duration, is_error: bool) {
        self.send(AgentEvent::ToolComplete {
            name: name.to_string(),
            result: result.chars().take(MAX_RESULT_PREVIEW).collect(),
            duration,
            is_error,
        });
    }

    pub fn iteration(&self, number: usize, tool_calls: usize) {
        self.send(AgentEvent::Iteration { number, tool_calls });
    }

    pub fn response_complete(&self, iterations: usize, total_duration: Duration) {
        self.send(AgentEvent::ResponseComplete {
            iterations,
            total_duration,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_channel() {
        let (tx, mut rx) = event_channel();
        let sender = AgentEventSender::new(tx);

        sender.tool_start("list_baseline_images", &serde_json::json!({}));

        match rx.recv().await.unwrap() {
            AgentEvent::ToolStart { name, .. } => assert_eq!(name, "list_baseline_images"),
            other => panic!("Expected ToolStart event, got {:?}", other),
        }
    }

    #[test]
    fn test_noop_sender() {
        let sender = AgentEventSender::none();
        sender.iteration(1, 0);
        sender.response_complete(1, Duration::from_millis(1));
    }

    #[test]
    fn test_tool_result_is_truncated() {
        let (tx, mut rx) = event_channel();
        let sender = AgentEventSender::new(tx);
        sender.tool_complete("t", &"x".repeat(1000), Duration::from_millis(5), false);

        match rx.try_recv().unwrap() {
            AgentEvent::ToolComplete { result, .. } => assert_eq!(result.len(), MAX_RESULT_PREVIEW),
            other => panic!("Expected ToolComplete, got {:?}", other),
        }
    }

    #[test]
    fn test_event_serialization() {
        let event = AgentEvent::ToolComplete {
            name: "test".to_string(),
            result: "ok".to_string(),
            duration: Duration::from_millis(123),
            is_error: false,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"tool_complete\""));
        assert!(json.contains("\"duration\":123"));
    }
}
