//! First-party tools an agent may call mid-turn
//!
//! A [`Tool`] advertises a JSON-Schema parameter description to the model
//! and executes calls with JSON arguments. The [`ToolRegistry`] maps tool
//! names to implementations so agents can bind tools by name.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ToolsConfig;
use crate::llm::ToolSpec;

mod media;
mod params;

pub use media::{
    filter_listing, missing_dir_sentinel, GenerationRecord, ListBaselineImages, MediaKind,
    SimulatedGenerator,
};
pub use params::{GenerateFromImageParams, ListBaselineImagesParams};

/// Errors raised by tool execution
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    Unknown(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("IO error in {tool} at {path}: {source}")]
    Io {
        tool: String,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    /// Whether the error can be reported back to the model as a tool result
    /// instead of failing the agent
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ToolError::Io { .. })
    }
}

/// A function an agent can invoke during its turn
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses to call this tool
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// JSON Schema of the arguments object
    fn parameters(&self) -> serde_json::Value;

    /// Execute one call
    async fn call(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError>;

    /// Definition advertised to the model
    fn spec(&self) -> ToolSpec {
        ToolSpec::function(
            self.name(),
            self.description(),
            clean_schema(&self.parameters()),
        )
    }
}

/// Remove schema metadata that confuses smaller models
pub fn clean_schema(schema: &serde_json::Value) -> serde_json::Value {
    match schema {
        serde_json::Value::Object(obj) => {
            let mut cleaned = serde_json::Map::new();
            for (key, value) in obj {
                if key == "$schema" || key == "title" || key == "additionalProperties" {
                    continue;
                }
                cleaned.insert(key.clone(), clean_schema(value));
            }
            serde_json::Value::Object(cleaned)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(clean_schema).collect())
        }
        other => other.clone(),
    }
}

/// Parse tool arguments, treating a missing/null payload as `{}`
pub(crate) fn parse_arguments<T: serde::de::DeserializeOwned>(
    tool: &str,
    arguments: serde_json::Value,
) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        serde_json::json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// Registry of available tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the listing and simulated generation tools
    pub fn with_media_tools(config: &ToolsConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ListBaselineImages::new(
            config.baseline_dir(),
            config.baseline_suffix.clone(),
        )));
        registry.register(Arc::new(SimulatedGenerator::new(
            MediaKind::Image,
            config.image_output_dir(),
        )));
        registry.register(Arc::new(SimulatedGenerator::new(
            MediaKind::Video,
            config.video_output_dir(),
        )));
        registry
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Resolve a list of tool names, failing on the first unknown name
    pub fn resolve(&self, names: &[String]) -> Result<Vec<Arc<dyn Tool>>, ToolError> {
        names
            .iter()
            .map(|name| self.get(name).ok_or_else(|| ToolError::Unknown(name.clone())))
            .collect()
    }
}
