//! Workflow run events
//!
//! The engine reports progress over an unbounded channel so the CLI can
//! stream each agent's output as soon as it is committed.

use serde::Serialize;
use tokio::sync::mpsc;

/// Events emitted while a workflow runs
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    WorkflowStarted { workflow: String, intent: String },

    /// A stage node (agent, parallel or sequential) is starting
    StageStarted { stage: String, kind: StageKind },

    /// An agent finished and its output is ready
    AgentCompleted {
        agent: String,
        output_key: String,
        output: String,
    },

    /// A model round trip finished, requesting `tool_calls` tool(s)
    AgentIteration {
        agent: String,
        iteration: usize,
        tool_calls: usize,
    },

    ToolStarted {
        agent: String,
        tool: String,
        arguments: serde_json::Value,
    },

    /// An agent called a tool
    ToolCalled {
        agent: String,
        tool: String,
        is_error: bool,
        duration_ms: u64,
    },

    /// The model gave its final answer (before schema validation)
    AgentResponded {
        agent: String,
        iterations: usize,
        duration_ms: u64,
    },

    StageCompleted {
        stage: String,
        kind: StageKind,
        duration_ms: u64,
    },

    WorkflowCompleted { workflow: String, duration_ms: u64 },

    WorkflowFailed { workflow: String, error: String },
}

/// Kind of stage node an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Agent,
    Parallel,
    Sequential,
}

pub type WorkflowEventSender = mpsc::UnboundedSender<WorkflowEvent>;
pub type WorkflowEventReceiver = mpsc::UnboundedReceiver<WorkflowEvent>;

/// Create a new workflow event channel
pub fn workflow_event_channel() -> (WorkflowEventSender, WorkflowEventReceiver) {
    mpsc::unbounded_channel()
}
