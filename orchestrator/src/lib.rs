//! Declarative multi-agent marketing workflows
//!
//! This crate provides:
//! - Agent specifications (instruction template, model, output key, schema, tools)
//! - Output schemas with validators for structured agent results
//! - A write-once, run-scoped blackboard shared between agents
//! - Workflow primitives (agent, parallel, sequential) with wiring checks
//! - A workflow engine and the built-in marketing workflows
//!
//! # Example
//!
//! ```rust,ignore
//! use campaign_flow::{EngineConfig, WorkflowEngine};
//!
//! let engine = WorkflowEngine::from_config(EngineConfig::default())?;
//!
//! let result = engine
//!     .run("marketing-flow", "Launch our reusable coffee cups")
//!     .await?;
//! println!("{}", result.output("campaign_brief").unwrap());
//! ```

pub mod agent_config;
pub mod blackboard;
pub mod engine;
pub mod events;
pub mod prompts;
pub mod schema;
pub mod template;
pub mod workflow;

pub use agent_config::{AgentRegistry, AgentSpec};
pub use blackboard::{Blackboard, BlackboardError, BlackboardValue, INTENT_KEY};
pub use engine::{EngineConfig, ParallelPolicy, WorkflowEngine};
pub use events::{workflow_event_channel, StageKind, WorkflowEvent};
pub use schema::{OutputSchema, SchemaCatalog, SchemaError, StructuredOutput};
pub use workflow::{Stage, StageResult, Workflow, WorkflowError, WorkflowResult, DEFAULT_INTENT};

/// Re-export commonly used types from the agent crate
pub use campaign_agent::config::FlowFileConfig;
pub use campaign_agent::llm::{Llm, OllamaClient, ScriptedLlm};
pub use campaign_agent::tools::ToolRegistry;
