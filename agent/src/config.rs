//! Configuration loading
//!
//! Settings come from `.flow.toml`, found by walking up from the current
//! directory and then falling back to the global config directory.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file
pub const CONFIG_FILE: &str = ".flow.toml";

/// Directory name under the platform config dir
pub const APP_DIR: &str = "campaign-flow";

/// Find a config file by walking up the directory tree, then checking global config.
///
/// Search order:
/// 1. Current directory and parent directories (walking up to root)
/// 2. Global config at `<config_dir>/campaign-flow/`
fn find_config_file(filename: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let candidate = current.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }

    let global_path = global_config_dir()?.join(filename);
    global_path.exists().then_some(global_path)
}

/// Global configuration directory (`~/.config/campaign-flow` on Linux)
pub fn global_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

/// Expand `~` and environment variables in a configured path
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            tracing::warn!("Could not expand path '{}': {}", path, e);
            PathBuf::from(path)
        }
    }
}

/// Top-level configuration (from .flow.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowFileConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub workflow: WorkflowSectionConfig,
}

/// LLM configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    /// Model for the fast ideation/queue agents
    #[serde(default = "default_model")]
    pub model: String,
    /// Model for synthesis and validation agents (defaults to `model`)
    #[serde(default)]
    pub reasoning_model: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl LlmConfig {
    /// Model used by agents that need stronger reasoning
    pub fn reasoning_model(&self) -> &str {
        self.reasoning_model.as_deref().unwrap_or(&self.model)
    }
}

/// Tool directories section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_baseline_dir")]
    pub baseline_dir: String,
    #[serde(default = "default_baseline_suffix")]
    pub baseline_suffix: String,
    #[serde(default = "default_image_output_dir")]
    pub image_output_dir: String,
    #[serde(default = "default_video_output_dir")]
    pub video_output_dir: String,
}

impl ToolsConfig {
    pub fn baseline_dir(&self) -> PathBuf {
        expand_path(&self.baseline_dir)
    }

    pub fn image_output_dir(&self) -> PathBuf {
        expand_path(&self.image_output_dir)
    }

    pub fn video_output_dir(&self) -> PathBuf {
        expand_path(&self.video_output_dir)
    }
}

/// Workflow execution section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSectionConfig {
    /// "fail-fast" or "wait-for-all"
    #[serde(default = "default_parallel_policy")]
    pub parallel_policy: String,
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

// Default value functions
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "qwen3:14b".to_string()
}

fn default_baseline_dir() -> String {
    "images_baseline".to_string()
}

fn default_baseline_suffix() -> String {
    ".png".to_string()
}

fn default_image_output_dir() -> String {
    "generated_images".to_string()
}

fn default_video_output_dir() -> String {
    "generated_videos".to_string()
}

fn default_parallel_policy() -> String {
    "fail-fast".to_string()
}

fn default_max_tool_iterations() -> usize {
    10
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_model(),
            reasoning_model: None,
            request_timeout_secs: None,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            baseline_dir: default_baseline_dir(),
            baseline_suffix: default_baseline_suffix(),
            image_output_dir: default_image_output_dir(),
            video_output_dir: default_video_output_dir(),
        }
    }
}

impl Default for WorkflowSectionConfig {
    fn default() -> Self {
        Self {
            parallel_policy: default_parallel_policy(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

impl FlowFileConfig {
    /// Load config from .flow.toml
    ///
    /// Search order:
    /// 1. Walk up directory tree from cwd looking for .flow.toml
    /// 2. Check the global config directory
    /// 3. Fall back to defaults
    pub fn load() -> Result<Self> {
        if let Some(config_path) = find_config_file(CONFIG_FILE) {
            tracing::debug!("Loading config from: {}", config_path.display());
            return Self::load_from_path(&config_path);
        }

        tracing::debug!("No {} found, using defaults", CONFIG_FILE);
        Ok(Self::default())
    }

    /// Load from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get the default model (for use elsewhere)
    pub fn default_model() -> String {
        default_model()
    }

    /// Get the default Ollama URL (for use elsewhere)
    pub fn default_ollama_url() -> String {
        default_ollama_url()
    }
}
