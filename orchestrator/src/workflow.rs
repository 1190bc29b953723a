//! Workflow definitions and primitives
//!
//! A workflow is a tree of stages:
//! - Agent stages run one leaf agent
//! - Parallel stages run their members concurrently against the same
//!   upstream blackboard
//! - Sequential stages run their members in order, each seeing the
//!   outputs of the ones before it
//!
//! Key wiring is checked before a run starts: every agent's inputs must be
//! produced upstream of it and every output key must be unique.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use campaign_agent::agent::AgentError;
use campaign_agent::tools::ToolRegistry;

use crate::agent_config::{AgentRegistry, AgentSpec};
use crate::blackboard::{Blackboard, BlackboardError, BlackboardValue, INTENT_KEY};
use crate::events::StageKind;
use crate::schema::{SchemaCatalog, SchemaError};

/// Intent used when none is given on the command line
pub const DEFAULT_INTENT: &str = "Launch a new marketing campaign for our new line of sustainable, reusable coffee cups. Our target audience is environmentally conscious millennials.";

/// A node in a workflow's stage tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Stage {
    /// Run a single agent (must exist in the registry)
    Agent { agent: String },

    /// Run members concurrently; outputs become visible together
    Parallel {
        name: String,
        stages: Vec<Stage>,
    },

    /// Run members in order
    Sequential {
        name: String,
        stages: Vec<Stage>,
    },
}

impl Stage {
    pub fn agent(name: impl Into<String>) -> Self {
        Self::Agent { agent: name.into() }
    }

    pub fn parallel(name: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self::Parallel {
            name: name.into(),
            stages,
        }
    }

    pub fn sequential(name: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self::Sequential {
            name: name.into(),
            stages,
        }
    }

    /// Stage name (the agent name for agent stages)
    pub fn name(&self) -> &str {
        match self {
            Stage::Agent { agent } => agent,
            Stage::Parallel { name, .. } | Stage::Sequential { name, .. } => name,
        }
    }

    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Agent { .. } => StageKind::Agent,
            Stage::Parallel { .. } => StageKind::Parallel,
            Stage::Sequential { .. } => StageKind::Sequential,
        }
    }

    /// Agent names in declaration order
    pub fn agent_names(&self) -> Vec<&str> {
        match self {
            Stage::Agent { agent } => vec![agent.as_str()],
            Stage::Parallel { stages, .. } | Stage::Sequential { stages, .. } => {
                stages.iter().flat_map(|s| s.agent_names()).collect()
            }
        }
    }
}

/// A complete workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique identifier for this workflow
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Top-level stages, run in order
    pub stages: Vec<Stage>,
}

impl Workflow {
    /// Create a new workflow
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            stages: Vec::new(),
        }
    }

    /// Set the description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Add a top-level stage
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Load workflow from TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self, WorkflowError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| WorkflowError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Load workflow from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, WorkflowError> {
        toml::from_str(toml_str).map_err(|e| WorkflowError::Parse(e.to_string()))
    }

    /// Agent names in declaration order
    pub fn agent_names(&self) -> Vec<&str> {
        self.stages.iter().flat_map(|s| s.agent_names()).collect()
    }

    /// Check agents, schemas, tools and key wiring before running
    ///
    /// Parallel members only see keys produced upstream of their stage,
    /// never their siblings' outputs.
    pub fn validate(
        &self,
        registry: &AgentRegistry,
        catalog: &SchemaCatalog,
        tools: &ToolRegistry,
    ) -> Result<(), WorkflowError> {
        let mut checker = WiringCheck {
            registry,
            catalog,
            tools,
            written: HashSet::from([INTENT_KEY.to_string()]),
        };
        let mut available = HashSet::from([INTENT_KEY.to_string()]);
        for stage in &self.stages {
            let produced = checker.check(stage, &available)?;
            available.extend(produced);
        }
        Ok(())
    }
}

struct WiringCheck<'a> {
    registry: &'a AgentRegistry,
    catalog: &'a SchemaCatalog,
    tools: &'a ToolRegistry,
    written: HashSet<String>,
}

impl WiringCheck<'_> {
    /// Validate one stage given the keys available to it; returns the keys it produces
    fn check(
        &mut self,
        stage: &Stage,
        available: &HashSet<String>,
    ) -> Result<Vec<String>, WorkflowError> {
        match stage {
            Stage::Agent { agent } => {
                let registry = self.registry;
                let spec = registry
                    .get(agent)
                    .ok_or_else(|| WorkflowError::AgentNotFound(agent.clone()))?;
                self.check_agent(spec, available)?;
                Ok(vec![spec.output_key.clone()])
            }
            Stage::Parallel { stages, .. } => {
                let mut produced = Vec::new();
                for member in stages {
                    produced.extend(self.check(member, available)?);
                }
                Ok(produced)
            }
            Stage::Sequential { stages, .. } => {
                let mut local = available.clone();
                let mut produced = Vec::new();
                for member in stages {
                    let keys = self.check(member, &local)?;
                    local.extend(keys.iter().cloned());
                    produced.extend(keys);
                }
                Ok(produced)
            }
        }
    }

    fn check_agent(
        &mut self,
        spec: &AgentSpec,
        available: &HashSet<String>,
    ) -> Result<(), WorkflowError> {
        if let Some(schema) = &spec.output_schema {
            if !self.catalog.contains(schema) {
                return Err(WorkflowError::UnknownSchema {
                    agent: spec.name.clone(),
                    schema: schema.clone(),
                });
            }
        }

        if let Some(tool) = spec.tools.iter().find(|t| !self.tools.contains(t)) {
            return Err(WorkflowError::UnknownTool {
                agent: spec.name.clone(),
                tool: tool.clone(),
            });
        }

        if let Some(key) = spec.input_keys().into_iter().find(|k| !available.contains(k)) {
            return Err(WorkflowError::UnsatisfiedInput {
                agent: spec.name.clone(),
                key,
            });
        }

        if !self.written.insert(spec.output_key.clone()) {
            return Err(WorkflowError::DuplicateOutputKey {
                agent: spec.name.clone(),
                key: spec.output_key.clone(),
            });
        }

        Ok(())
    }
}

/// Result of executing a top-level stage
#[derive(Debug, Clone, Serialize)]
pub struct StageResult {
    pub stage: String,
    pub kind: StageKind,
    /// Blackboard keys the stage wrote, in commit order
    pub output_keys: Vec<String>,
    pub duration_ms: u64,
}

/// Result of executing a complete workflow
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowResult {
    /// Name of the workflow that was executed
    pub workflow_name: String,

    /// Every key written during the run, including the intent
    pub blackboard: Blackboard,

    /// Results from each top-level stage
    pub stage_results: Vec<StageResult>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl WorkflowResult {
    /// Select a single output by key
    pub fn output(&self, key: &str) -> Option<&BlackboardValue> {
        self.blackboard.get(key)
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at).num_milliseconds().max(0) as u64
    }
}

/// Errors that can occur with workflows
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent {agent} declares unknown output schema '{schema}'")]
    UnknownSchema { agent: String, schema: String },

    #[error("Agent {agent} declares unknown tool '{tool}'")]
    UnknownTool { agent: String, tool: String },

    #[error("Output key '{key}' of agent {agent} is written by another agent")]
    DuplicateOutputKey { agent: String, key: String },

    #[error("Agent {agent} reads '{key}', which no upstream stage produces")]
    UnsatisfiedInput { agent: String, key: String },

    #[error("Agent {agent} is missing input '{key}' on the blackboard")]
    MissingInput { agent: String, key: String },

    #[error("Agent {agent} returned invalid output")]
    SchemaValidation {
        agent: String,
        #[source]
        source: SchemaError,
    },

    #[error("Agent {agent} failed")]
    Agent {
        agent: String,
        #[source]
        source: AgentError,
    },

    #[error(transparent)]
    Blackboard(#[from] BlackboardError),
}

/// Collection of built-in workflows
pub fn builtin_workflows() -> HashMap<String, Workflow> {
    let mut workflows = HashMap::new();

    let marketing_stages = vec![
        Stage::parallel(
            "ParallelIdeationLayer",
            vec![
                Stage::agent("TrendAgent"),
                Stage::agent("CommunityAgent"),
                Stage::agent("ContentAgent"),
                Stage::agent("BrandAgent"),
            ],
        ),
        Stage::agent("SynthesisAgent"),
        Stage::agent("BrandAssuranceAgent"),
        Stage::agent("QueueAgent"),
    ];

    // Ideation, brief, brand gate and distribution priority
    let mut marketing = Workflow::new("marketing-flow")
        .with_description("Brainstorm in parallel, synthesize a brief, validate it and queue it");
    marketing.stages = marketing_stages.clone();
    workflows.insert(marketing.name.clone(), marketing);

    // Marketing flow followed by media and social assets
    workflows.insert(
        "campaign-assets".to_string(),
        Workflow::new("campaign-assets")
            .with_description("Run the marketing flow, then generate images, video and social posts")
            .with_stage(Stage::sequential("MarketingFlowEngine", marketing_stages))
            .with_stage(Stage::parallel(
                "AssetLayer",
                vec![
                    Stage::agent("ImageAgent"),
                    Stage::agent("VideoAgent"),
                    Stage::agent("SocialPostAgent"),
                ],
            )),
    );

    workflows
}

/// A workflow file may also declare the agents it uses
#[derive(Debug, Deserialize)]
struct WorkflowFile {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    agents: Vec<AgentSpec>,
    stages: Vec<Stage>,
}

/// Workflows and agents loaded from a directory of TOML files
#[derive(Debug, Default)]
pub struct CustomDefinitions {
    pub workflows: HashMap<String, Workflow>,
    pub agents: Vec<AgentSpec>,
}

impl CustomDefinitions {
    pub fn extend(&mut self, other: CustomDefinitions) {
        self.workflows.extend(other.workflows);
        self.agents.extend(other.agents);
    }
}

/// Load custom workflows (and their `[[agents]]`) from a directory
///
/// Files that fail to parse are skipped with a warning.
pub fn load_custom_workflows(dir: &Path) -> Result<CustomDefinitions, WorkflowError> {
    let mut loaded = CustomDefinitions::default();

    if !dir.exists() {
        return Ok(loaded);
    }

    let entries = std::fs::read_dir(dir).map_err(|e| WorkflowError::Io(e.to_string()))?;

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    for path in paths {
        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| WorkflowError::Io(e.to_string()))
            .and_then(|content| {
                toml::from_str::<WorkflowFile>(&content)
                    .map_err(|e| WorkflowError::Parse(e.to_string()))
            });

        match parsed {
            Ok(file) => {
                tracing::debug!(
                    workflow = %file.name,
                    agents = file.agents.len(),
                    "Loaded custom workflow from {:?}",
                    path
                );
                loaded.agents.extend(file.agents);
                loaded.workflows.insert(
                    file.name.clone(),
                    Workflow {
                        name: file.name,
                        description: file.description,
                        stages: file.stages,
                    },
                );
            }
            Err(e) => {
                tracing::warn!("Failed to load workflow from {:?}: {}", path, e);
            }
        }
    }

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_agent::config::ToolsConfig;
    use tempfile::TempDir;

    fn fixtures() -> (AgentRegistry, SchemaCatalog, ToolRegistry) {
        (
            AgentRegistry::with_defaults("m", "m"),
            SchemaCatalog::with_defaults(),
            ToolRegistry::with_media_tools(&ToolsConfig::default()),
        )
    }

    #[test]
    fn test_workflow_builder() {
        let workflow = Workflow::new("test")
            .with_description("A test workflow")
            .with_stage(Stage::agent("TrendAgent"))
            .with_stage(Stage::parallel("Layer", vec![Stage::agent("BrandAgent")]));

        assert_eq!(workflow.name, "test");
        assert_eq!(workflow.stages.len(), 2);
        assert_eq!(workflow.agent_names(), vec!["TrendAgent", "BrandAgent"]);
        assert_eq!(workflow.stages[1].kind(), StageKind::Parallel);
    }

    #[test]
    fn test_workflow_from_toml() {
        let toml = r#"
            name = "brief-only"
            description = "Ideation and synthesis"

            [[stages]]
            type = "parallel"
            name = "Ideas"

            [[stages.stages]]
            type = "agent"
            agent = "TrendAgent"

            [[stages.stages]]
            type = "agent"
            agent = "CommunityAgent"

            [[stages]]
            type = "agent"
            agent = "SynthesisAgent"
        "#;

        let workflow = Workflow::from_toml(toml).unwrap();
        assert_eq!(workflow.name, "brief-only");
        assert_eq!(workflow.stages.len(), 2);
        assert_eq!(
            workflow.stages[0],
            Stage::parallel(
                "Ideas",
                vec![Stage::agent("TrendAgent"), Stage::agent("CommunityAgent")]
            )
        );
    }

    #[test]
    fn test_builtin_workflows() {
        let workflows = builtin_workflows();

        let marketing = &workflows["marketing-flow"];
        assert_eq!(marketing.stages.len(), 4);
        assert_eq!(marketing.stages[0].name(), "ParallelIdeationLayer");
        assert_eq!(
            marketing.agent_names(),
            vec![
                "TrendAgent",
                "CommunityAgent",
                "ContentAgent",
                "BrandAgent",
                "SynthesisAgent",
                "BrandAssuranceAgent",
                "QueueAgent"
            ]
        );

        let assets = &workflows["campaign-assets"];
        assert_eq!(assets.stages[0].kind(), StageKind::Sequential);
        assert_eq!(assets.agent_names().len(), 10);
    }

    #[test]
    fn test_builtin_workflows_validate() {
        let (registry, catalog, tools) = fixtures();
        for workflow in builtin_workflows().values() {
            workflow.validate(&registry, &catalog, &tools).unwrap();
        }
    }

    #[test]
    fn test_validate_unknown_agent() {
        let (registry, catalog, tools) = fixtures();
        let workflow = Workflow::new("w").with_stage(Stage::agent("GhostAgent"));
        assert!(matches!(
            workflow.validate(&registry, &catalog, &tools),
            Err(WorkflowError::AgentNotFound(name)) if name == "GhostAgent"
        ));
    }

    #[test]
    fn test_validate_unsatisfied_input() {
        let (registry, catalog, tools) = fixtures();
        // Synthesis needs the ideation outputs
        let workflow = Workflow::new("w").with_stage(Stage::agent("SynthesisAgent"));
        match workflow.validate(&registry, &catalog, &tools) {
            Err(WorkflowError::UnsatisfiedInput { agent, key }) => {
                assert_eq!(agent, "SynthesisAgent");
                assert_eq!(key, "trend_ideas");
            }
            other => panic!("Expected UnsatisfiedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_parallel_siblings_are_isolated() {
        let (mut registry, catalog, tools) = fixtures();
        registry.register(AgentSpec::new("Reader", "m", "Refine {trend_ideas}", "refined"));

        let workflow = Workflow::new("w").with_stage(Stage::parallel(
            "Layer",
            vec![Stage::agent("TrendAgent"), Stage::agent("Reader")],
        ));
        assert!(matches!(
            workflow.validate(&registry, &catalog, &tools),
            Err(WorkflowError::UnsatisfiedInput { key, .. }) if key == "trend_ideas"
        ));

        // The same wiring is fine once the reader runs after the layer
        let workflow = Workflow::new("w")
            .with_stage(Stage::parallel("Layer", vec![Stage::agent("TrendAgent")]))
            .with_stage(Stage::agent("Reader"));
        workflow.validate(&registry, &catalog, &tools).unwrap();
    }

    #[test]
    fn test_validate_sequential_member_sees_earlier_members() {
        let (mut registry, catalog, tools) = fixtures();
        registry.register(AgentSpec::new("Reader", "m", "Refine {trend_ideas}", "refined"));

        let workflow = Workflow::new("w").with_stage(Stage::parallel(
            "Layer",
            vec![
                Stage::sequential("Chain", vec![Stage::agent("TrendAgent"), Stage::agent("Reader")]),
                Stage::agent("BrandAgent"),
            ],
        ));
        workflow.validate(&registry, &catalog, &tools).unwrap();
    }

    #[test]
    fn test_validate_duplicate_output_key() {
        let (mut registry, catalog, tools) = fixtures();
        registry.register(AgentSpec::new("OtherTrends", "m", "More trends", "trend_ideas"));

        let workflow = Workflow::new("w").with_stage(Stage::parallel(
            "Layer",
            vec![Stage::agent("TrendAgent"), Stage::agent("OtherTrends")],
        ));
        assert!(matches!(
            workflow.validate(&registry, &catalog, &tools),
            Err(WorkflowError::DuplicateOutputKey { agent, .. }) if agent == "OtherTrends"
        ));

        registry.register(AgentSpec::new("Overwriter", "m", "x", INTENT_KEY));
        let workflow = Workflow::new("w").with_stage(Stage::agent("Overwriter"));
        assert!(matches!(
            workflow.validate(&registry, &catalog, &tools),
            Err(WorkflowError::DuplicateOutputKey { .. })
        ));
    }

    #[test]
    fn test_validate_unknown_schema_and_tool() {
        let (mut registry, catalog, tools) = fixtures();
        registry.register(
            AgentSpec::new("Scored", "m", "Score it", "score").with_output_schema("Scorecard"),
        );
        registry.register(
            AgentSpec::new("Poster", "m", "Post it", "post").with_tools(&["post_to_x"]),
        );

        let workflow = Workflow::new("w").with_stage(Stage::agent("Scored"));
        assert!(matches!(
            workflow.validate(&registry, &catalog, &tools),
            Err(WorkflowError::UnknownSchema { schema, .. }) if schema == "Scorecard"
        ));

        let workflow = Workflow::new("w").with_stage(Stage::agent("Poster"));
        assert!(matches!(
            workflow.validate(&registry, &catalog, &tools),
            Err(WorkflowError::UnknownTool { tool, .. }) if tool == "post_to_x"
        ));
    }

    #[test]
    fn test_load_custom_workflows() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("tagline.toml"),
            r#"
            name = "tagline"

            [[agents]]
            name = "TaglineAgent"
            instruction = "Write a tagline for: {intent}"
            output_key = "tagline"

            [[stages]]
            type = "agent"
            agent = "TaglineAgent"
            "#,
        )
        .unwrap();
        std::fs::write(tmp.path().join("broken.toml"), "name = ").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let loaded = load_custom_workflows(tmp.path()).unwrap();
        assert_eq!(loaded.workflows.len(), 1);
        assert_eq!(loaded.workflows["tagline"].agent_names(), vec!["TaglineAgent"]);
        assert_eq!(loaded.agents.len(), 1);
        assert_eq!(loaded.agents[0].output_key, "tagline");
    }

    #[test]
    fn test_load_custom_workflows_missing_dir() {
        let tmp = TempDir::new().unwrap();
        let loaded = load_custom_workflows(&tmp.path().join("absent")).unwrap();
        assert!(loaded.workflows.is_empty());
        assert!(loaded.agents.is_empty());
    }
}
