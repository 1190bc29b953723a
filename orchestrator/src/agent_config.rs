//! Agent specifications and registry
//!
//! An agent is a named instruction template plus its wiring: the model it
//! runs on, the blackboard key it writes, an optional output schema and the
//! tools it may call. Input keys are never declared; they are the
//! `{placeholder}`s of the instruction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::prompts;
use crate::template;

/// Specification of a leaf agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSpec {
    /// Unique identifier for this agent
    pub name: String,

    /// Display name for logging and output banners
    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub description: String,

    /// LLM model to use; empty means the registry's default model
    #[serde(default)]
    pub model: String,

    /// Instruction template with `{key}` placeholders
    pub instruction: String,

    /// Blackboard key the agent's result is written to
    pub output_key: String,

    /// Name of an output schema in the schema catalog
    #[serde(default)]
    pub output_schema: Option<String>,

    /// Tools this agent can call
    #[serde(default)]
    pub tools: Vec<String>,

    /// Temperature for LLM sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.7
}

impl AgentSpec {
    /// Create a new agent specification
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        instruction: impl Into<String>,
        output_key: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            description: String::new(),
            model: model.into(),
            instruction: instruction.into(),
            output_key: output_key.into(),
            output_schema: None,
            tools: Vec::new(),
            temperature: default_temperature(),
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Require the result to validate against a catalog schema
    pub fn with_output_schema(mut self, schema: impl Into<String>) -> Self {
        self.output_schema = Some(schema.into());
        self
    }

    pub fn with_tools(mut self, tools: &[&str]) -> Self {
        self.tools = tools.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Blackboard keys the instruction reads, in order of first use
    pub fn input_keys(&self) -> Vec<String> {
        template::placeholders(&self.instruction)
    }

    /// Name to show in banners, falling back to `name`
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

/// Registry of available agents
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, AgentSpec>,
    default_model: String,
}

impl AgentRegistry {
    /// Create an empty registry
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            agents: HashMap::new(),
            default_model: default_model.into(),
        }
    }

    /// Create a registry with the built-in campaign agents
    ///
    /// Synthesis and brand assurance run on `reasoning_model`; every other
    /// agent runs on `model`.
    pub fn with_defaults(model: impl Into<String>, reasoning_model: impl Into<String>) -> Self {
        let model = model.into();
        let reasoning = reasoning_model.into();
        let mut registry = Self::new(&model);

        // Ideation layer
        registry.register(
            AgentSpec::new("TrendAgent", &model, prompts::TREND_PROMPT, "trend_ideas")
                .with_display_name("Trend Agent")
                .with_description("Identifies current market trends relevant to the intent")
                .with_temperature(0.8),
        );
        registry.register(
            AgentSpec::new("CommunityAgent", &model, prompts::COMMUNITY_PROMPT, "community_ideas")
                .with_display_name("Community Agent")
                .with_description("Finds community conversations and engagement angles")
                .with_temperature(0.8),
        );
        registry.register(
            AgentSpec::new("ContentAgent", &model, prompts::CONTENT_PROMPT, "content_ideas")
                .with_display_name("Content Agent")
                .with_description("Brainstorms content formats and hooks")
                .with_temperature(0.8),
        );
        registry.register(
            AgentSpec::new("BrandAgent", &model, prompts::BRAND_PROMPT, "brand_voice")
                .with_display_name("Brand Agent")
                .with_description("Defines the brand voice for the campaign")
                .with_temperature(0.6),
        );

        // Synthesis and quality gates
        registry.register(
            AgentSpec::new("SynthesisAgent", &reasoning, prompts::SYNTHESIS_PROMPT, "campaign_brief")
                .with_display_name("Synthesis Agent")
                .with_description("Merges the ideation outputs into one campaign brief")
                .with_temperature(0.5),
        );
        registry.register(
            AgentSpec::new(
                "BrandAssuranceAgent",
                &reasoning,
                prompts::BRAND_ASSURANCE_PROMPT,
                "brand_validation_report",
            )
            .with_display_name("Brand Assurance Agent")
            .with_description("Scores the brief for brand alignment and compliance")
            .with_output_schema("BrandValidation")
            .with_temperature(0.2),
        );
        registry.register(
            AgentSpec::new("QueueAgent", &model, prompts::QUEUE_PROMPT, "campaign_priority")
                .with_display_name("Queue Agent")
                .with_description("Classifies the campaign and assigns a distribution priority")
                .with_output_schema("CampaignPriority")
                .with_temperature(0.1),
        );

        // Asset layer
        registry.register(
            AgentSpec::new("ImageAgent", &model, prompts::IMAGE_PROMPT, "image_asset")
                .with_display_name("Image Agent")
                .with_description("Generates a campaign image from a baseline image")
                .with_tools(&["list_baseline_images", "generate_image_from_prompt_and_image"]),
        );
        registry.register(
            AgentSpec::new("VideoAgent", &model, prompts::VIDEO_PROMPT, "video_asset")
                .with_display_name("Video Agent")
                .with_description("Generates a short campaign video from a baseline image")
                .with_tools(&["list_baseline_images", "generate_video_from_prompt_and_image"]),
        );
        registry.register(
            AgentSpec::new("SocialPostAgent", &model, prompts::SOCIAL_POST_PROMPT, "social_posts")
                .with_display_name("Social Post Agent")
                .with_description("Writes platform-specific social posts for the campaign"),
        );

        registry
    }

    /// Register an agent, replacing any agent with the same name
    ///
    /// An empty `model` is filled with the registry's default model.
    pub fn register(&mut self, mut spec: AgentSpec) {
        if spec.model.is_empty() {
            spec.model = self.default_model.clone();
        }
        self.agents.insert(spec.name.clone(), spec);
    }

    /// Get an agent by name
    pub fn get(&self, name: &str) -> Option<&AgentSpec> {
        self.agents.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Iterate over all agents, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AgentSpec)> {
        let mut entries: Vec<(&str, &AgentSpec)> =
            self.agents.iter().map(|(k, v)| (k.as_str(), v)).collect();
        entries.sort_by_key(|(name, _)| *name);
        entries.into_iter()
    }
}
