//! Workflow execution engine
//!
//! Executes workflows with:
//! - Sequential stages, each starting after the previous one settled
//! - Parallel stages whose members share one upstream snapshot
//! - Blackboard key passing between agents
//! - Per-agent model, tools and output schema

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;
use futures_util::future::{join_all, try_join_all, BoxFuture, FutureExt};

use campaign_agent::agent::{event_channel, Agent, AgentEvent, DEFAULT_MAX_ITERATIONS};
use campaign_agent::config::{global_config_dir, FlowFileConfig, ToolsConfig};
use campaign_agent::llm::{Llm, OllamaClient};
use campaign_agent::tools::ToolRegistry;

use crate::agent_config::AgentRegistry;
use crate::blackboard::{Blackboard, BlackboardValue};
use crate::events::{StageKind, WorkflowEvent, WorkflowEventSender};
use crate::schema::SchemaCatalog;
use crate::template;
use crate::workflow::{
    builtin_workflows, load_custom_workflows, CustomDefinitions, Stage, StageResult, Workflow,
    WorkflowError, WorkflowResult,
};

/// Outputs a stage produced, in the order they should be committed
type StageOutputs = Vec<(String, BlackboardValue)>;

/// How a parallel stage reacts to a failing member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParallelPolicy {
    /// Drop still-running members and report the first failure
    #[default]
    FailFast,
    /// Let every member finish, then report the first failure in member order
    WaitForAll,
}

impl FromStr for ParallelPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail-fast" => Ok(Self::FailFast),
            "wait-for-all" => Ok(Self::WaitForAll),
            other => Err(format!(
                "Unknown parallel policy '{}' (expected fail-fast or wait-for-all)",
                other
            )),
        }
    }
}

impl fmt::Display for ParallelPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailFast => f.write_str("fail-fast"),
            Self::WaitForAll => f.write_str("wait-for-all"),
        }
    }
}

/// Configuration for the workflow engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ollama URL
    pub ollama_url: String,

    /// Model for the fast agents
    pub default_model: String,

    /// Model for synthesis and validation agents
    pub reasoning_model: String,

    /// Extra directory for custom workflows
    pub custom_workflows_dir: Option<PathBuf>,

    pub parallel_policy: ParallelPolicy,

    /// Tool-calling iterations allowed per agent turn
    pub max_tool_iterations: usize,

    /// Per-request timeout for the model service
    pub request_timeout: Option<Duration>,

    /// Directories used by the media tools
    pub tools: ToolsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ollama_url: FlowFileConfig::default_ollama_url(),
            default_model: FlowFileConfig::default_model(),
            reasoning_model: FlowFileConfig::default_model(),
            custom_workflows_dir: None,
            parallel_policy: ParallelPolicy::default(),
            max_tool_iterations: DEFAULT_MAX_ITERATIONS,
            request_timeout: None,
            tools: ToolsConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create from the `.flow.toml` config
    pub fn from_file_config(config: &FlowFileConfig) -> Result<Self> {
        let parallel_policy = config
            .workflow
            .parallel_policy
            .parse::<ParallelPolicy>()
            .map_err(anyhow::Error::msg)?;

        Ok(Self {
            ollama_url: config.llm.url.clone(),
            default_model: config.llm.model.clone(),
            reasoning_model: config.llm.reasoning_model().to_string(),
            custom_workflows_dir: None,
            parallel_policy,
            max_tool_iterations: config.workflow.max_tool_iterations,
            request_timeout: config.llm.request_timeout_secs.map(Duration::from_secs),
            tools: config.tools.clone(),
        })
    }
}

/// Workflow execution engine
pub struct WorkflowEngine {
    /// Agent registry (built-in plus custom agents)
    registry: AgentRegistry,

    catalog: SchemaCatalog,

    tools: ToolRegistry,

    llm: Arc<dyn Llm>,

    config: EngineConfig,

    /// Built-in workflows
    builtin_workflows: HashMap<String, Workflow>,

    /// Custom workflows loaded from files
    custom_workflows: HashMap<String, Workflow>,

    events: Option<WorkflowEventSender>,
}

impl WorkflowEngine {
    /// Create a workflow engine with only the given agents and the built-in workflows
    ///
    /// No directories are scanned; see [`WorkflowEngine::with_custom_dirs`].
    pub fn new(
        registry: AgentRegistry,
        catalog: SchemaCatalog,
        tools: ToolRegistry,
        llm: Arc<dyn Llm>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            catalog,
            tools,
            llm,
            config,
            builtin_workflows: builtin_workflows(),
            custom_workflows: HashMap::new(),
            events: None,
        }
    }

    /// Create an engine backed by Ollama with the built-in agents, schemas and tools
    ///
    /// Custom workflows (and the agents they declare) are loaded from the
    /// configured directory, `<config_dir>/campaign-flow/workflows` and
    /// `./.flow/workflows`; later locations win on name clashes.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        let llm = OllamaClient::new(&config.ollama_url, config.request_timeout)?;
        let registry = AgentRegistry::with_defaults(&config.default_model, &config.reasoning_model);
        let tools = ToolRegistry::with_media_tools(&config.tools);
        let dirs = custom_workflow_dirs(&config);

        Ok(Self::new(
            registry,
            SchemaCatalog::with_defaults(),
            tools,
            Arc::new(llm),
            config,
        )
        .with_custom_dirs(&dirs))
    }

    /// Load custom workflows and agents from `dirs`, in order
    pub fn with_custom_dirs(mut self, dirs: &[PathBuf]) -> Self {
        let mut custom = CustomDefinitions::default();
        for dir in dirs {
            match load_custom_workflows(dir) {
                Ok(loaded) => custom.extend(loaded),
                Err(e) => tracing::warn!("Failed to load custom workflows from {:?}: {}", dir, e),
            }
        }

        for agent in custom.agents {
            tracing::debug!(agent = %agent.name, "Registering custom agent");
            self.registry.register(agent);
        }
        self.custom_workflows.extend(custom.workflows);
        self
    }

    /// Stream run events to `sender`
    pub fn with_event_sender(mut self, sender: WorkflowEventSender) -> Self {
        self.events = Some(sender);
        self
    }

    /// Register a workflow, replacing any custom workflow with the same name
    pub fn with_workflow(mut self, workflow: Workflow) -> Self {
        self.custom_workflows.insert(workflow.name.clone(), workflow);
        self
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get a workflow by name (checks custom first, then built-in)
    pub fn get_workflow(&self, name: &str) -> Option<&Workflow> {
        self.custom_workflows
            .get(name)
            .or_else(|| self.builtin_workflows.get(name))
    }

    /// List all available workflow names
    pub fn list_workflows(&self) -> Vec<(&str, &str, bool)> {
        let mut workflows: Vec<_> = self
            .builtin_workflows
            .iter()
            .filter(|(name, _)| !self.custom_workflows.contains_key(*name))
            .map(|(name, w)| (name.as_str(), w.description.as_str(), false))
            .collect();

        workflows.extend(
            self.custom_workflows
                .iter()
                .map(|(name, w)| (name.as_str(), w.description.as_str(), true)),
        );

        workflows.sort_by_key(|(name, _, _)| *name);
        workflows
    }

    /// Validate a workflow's wiring against this engine's agents, schemas and tools
    pub fn validate(&self, workflow: &Workflow) -> Result<(), WorkflowError> {
        workflow.validate(&self.registry, &self.catalog, &self.tools)
    }

    /// Run a workflow by name
    pub async fn run(&self, workflow_name: &str, intent: &str) -> Result<WorkflowResult, WorkflowError> {
        let workflow = self
            .get_workflow(workflow_name)
            .ok_or_else(|| WorkflowError::NotFound(workflow_name.to_string()))?;

        self.execute(workflow, intent).await
    }

    /// Execute a workflow
    ///
    /// The first failing stage aborts the run; there is no partial result.
    pub async fn execute(&self, workflow: &Workflow, intent: &str) -> Result<WorkflowResult, WorkflowError> {
        let result = self.execute_inner(workflow, intent).await;
        if let Err(ref e) = result {
            tracing::error!(workflow = %workflow.name, "Workflow failed: {}", e);
            self.emit(WorkflowEvent::WorkflowFailed {
                workflow: workflow.name.clone(),
                error: error_chain(e),
            });
        }
        result
    }

    async fn execute_inner(&self, workflow: &Workflow, intent: &str) -> Result<WorkflowResult, WorkflowError> {
        self.validate(workflow)?;

        tracing::info!(
            workflow = %workflow.name,
            stages = workflow.stages.len(),
            policy = %self.config.parallel_policy,
            "Starting workflow"
        );
        self.emit(WorkflowEvent::WorkflowStarted {
            workflow: workflow.name.clone(),
            intent: intent.to_string(),
        });

        let started_at = Utc::now();
        let run_start = Instant::now();
        let mut blackboard = Blackboard::seeded(intent);
        let mut stage_results = Vec::new();

        for stage in &workflow.stages {
            let stage_start = Instant::now();
            let outputs = self.run_stage(stage, &blackboard).await?;
            let output_keys: Vec<String> = outputs.iter().map(|(k, _)| k.clone()).collect();
            blackboard.commit(outputs)?;

            stage_results.push(StageResult {
                stage: stage.name().to_string(),
                kind: stage.kind(),
                output_keys,
                duration_ms: stage_start.elapsed().as_millis() as u64,
            });
        }

        let duration_ms = run_start.elapsed().as_millis() as u64;
        tracing::info!(workflow = %workflow.name, duration_ms, "Workflow completed");
        self.emit(WorkflowEvent::WorkflowCompleted {
            workflow: workflow.name.clone(),
            duration_ms,
        });

        Ok(WorkflowResult {
            workflow_name: workflow.name.clone(),
            blackboard,
            stage_results,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Run one stage against `blackboard` and return what it produced
    ///
    /// Nothing is written to `blackboard`; the caller commits the outputs
    /// once the stage has settled.
    fn run_stage<'a>(
        &'a self,
        stage: &'a Stage,
        blackboard: &'a Blackboard,
    ) -> BoxFuture<'a, Result<StageOutputs, WorkflowError>> {
        async move {
            let stage_start = Instant::now();
            self.emit(WorkflowEvent::StageStarted {
                stage: stage.name().to_string(),
                kind: stage.kind(),
            });

            let outputs = match stage {
                Stage::Agent { agent } => vec![self.run_agent(agent, blackboard).await?],
                Stage::Sequential { name, stages } => {
                    tracing::debug!(stage = %name, members = stages.len(), "Running sequential stage");
                    let mut local = blackboard.clone();
                    let mut produced = Vec::new();
                    for member in stages {
                        let outputs = self.run_stage(member, &local).await?;
                        local.commit(outputs.clone())?;
                        produced.extend(outputs);
                    }
                    produced
                }
                Stage::Parallel { name, stages } => {
                    tracing::debug!(stage = %name, members = stages.len(), "Running parallel stage");
                    let members = stages.iter().map(|member| self.run_stage(member, blackboard));
                    match self.config.parallel_policy {
                        ParallelPolicy::FailFast => {
                            try_join_all(members).await?.into_iter().flatten().collect()
                        }
                        ParallelPolicy::WaitForAll => {
                            let mut produced = Vec::new();
                            for result in join_all(members).await {
                                produced.extend(result?);
                            }
                            produced
                        }
                    }
                }
            };

            self.emit(WorkflowEvent::StageCompleted {
                stage: stage.name().to_string(),
                kind: stage.kind(),
                duration_ms: stage_start.elapsed().as_millis() as u64,
            });
            Ok(outputs)
        }
        .boxed()
    }

    /// Run a leaf agent and return its `(output_key, value)`
    async fn run_agent(
        &self,
        name: &str,
        blackboard: &Blackboard,
    ) -> Result<(String, BlackboardValue), WorkflowError> {
        let spec = self
            .registry
            .get(name)
            .ok_or_else(|| WorkflowError::AgentNotFound(name.to_string()))?;

        let system_prompt = template::render(&spec.instruction, |key| {
            blackboard.get(key).map(|value| value.as_prompt_text())
        })
        .map_err(|key| WorkflowError::MissingInput {
            agent: spec.name.clone(),
            key,
        })?;

        let schema = spec
            .output_schema
            .as_deref()
            .map(|schema| self.catalog.resolve(schema))
            .transpose()
            .map_err(|source| WorkflowError::SchemaValidation {
                agent: spec.name.clone(),
                source,
            })?;

        let tools = self
            .tools
            .resolve(&spec.tools)
            .map_err(|e| WorkflowError::Agent {
                agent: spec.name.clone(),
                source: e.into(),
            })?;

        let mut agent = Agent::new(&spec.name, self.llm.clone(), &spec.model)
            .with_system_prompt(system_prompt)
            .with_tools(tools)
            .with_temperature(spec.temperature)
            .with_max_iterations(self.config.max_tool_iterations);
        if let Some(schema) = schema {
            agent = agent.with_response_format(schema.json_schema().clone());
        }

        tracing::info!(agent = %spec.name, model = %spec.model, "Running agent");
        let intent = blackboard.intent();

        let raw = match self.events {
            Some(ref events) => {
                let (tx, mut rx) = event_channel();
                let agent = agent.with_event_sender(tx);
                // The agent (and its sender) is dropped when the run
                // finishes, which ends the forwarding loop
                let run = async move { agent.run(intent).await };
                let forward = async {
                    while let Some(event) = rx.recv().await {
                        let _ = events.send(workflow_event(&spec.name, event));
                    }
                };
                let (result, ()) = tokio::join!(run, forward);
                result
            }
            None => agent.run(intent).await,
        }
        .map_err(|source| WorkflowError::Agent {
            agent: spec.name.clone(),
            source,
        })?;

        let value = match schema {
            Some(schema) => BlackboardValue::Record(schema.validate(&raw).map_err(|source| {
                WorkflowError::SchemaValidation {
                    agent: spec.name.clone(),
                    source,
                }
            })?),
            None => BlackboardValue::Text(raw),
        };

        tracing::info!(agent = %spec.name, output_key = %spec.output_key, "Agent completed");
        self.emit(WorkflowEvent::AgentCompleted {
            agent: spec.name.clone(),
            output_key: spec.output_key.clone(),
            output: value.as_prompt_text(),
        });

        Ok((spec.output_key.clone(), value))
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Some(ref events) = self.events {
            let _ = events.send(event);
        }
    }
}

/// Standard custom workflow locations, lowest precedence first
fn custom_workflow_dirs(config: &EngineConfig) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(ref dir) = config.custom_workflows_dir {
        dirs.push(dir.clone());
    }
    if let Some(global) = global_config_dir() {
        dirs.push(global.join("workflows"));
    }
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.join(".flow").join("workflows"));
    }
    dirs
}

/// Attribute an agent's event to `agent`
fn workflow_event(agent: &str, event: AgentEvent) -> WorkflowEvent {
    let agent = agent.to_string();
    match event {
        AgentEvent::Iteration { number, tool_calls } => WorkflowEvent::AgentIteration {
            agent,
            iteration: number,
            tool_calls,
        },
        AgentEvent::ToolStart { name, arguments } => WorkflowEvent::ToolStarted {
            agent,
            tool: name,
            arguments,
        },
        AgentEvent::ToolComplete {
            name,
            duration,
            is_error,
            ..
        } => WorkflowEvent::ToolCalled {
            agent,
            tool: name,
            is_error,
            duration_ms: duration.as_millis() as u64,
        },
        AgentEvent::ResponseComplete {
            iterations,
            total_duration,
        } => WorkflowEvent::AgentResponded {
            agent,
            iterations,
            duration_ms: total_duration.as_millis() as u64,
        },
    }
}

/// Error message including its sources
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
