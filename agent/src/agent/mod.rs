//! Agent module - LLM with tool-calling capabilities
//!
//! This implements the "tool-using agent loop" where:
//! 1. The agent sends its instruction and the user message
//! 2. The LLM receives the messages along with the bound tools
//! 3. The LLM decides whether to call tools or respond directly
//! 4. If tools are called, results are fed back to the LLM
//! 5. Loop continues until the LLM responds without tool calls
//!
//! Tool calls and their results live only in the message list of a single
//! [`Agent::run`] call.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::llm::{ChatMessage, ChatRequest, Llm, ToolCall, ToolSpec};
use crate::tools::{Tool, ToolError};

pub mod events;
pub mod parser;

pub use events::{event_channel, AgentEvent, AgentEventSender, EventReceiver, EventSender};
use parser::parse_content_tool_call;

/// Default maximum number of tool-calling iterations
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Errors that end an agent turn
#[derive(Error, Debug)]
pub enum AgentError {
    /// The model service failed; passed through unchanged
    #[error(transparent)]
    Model(#[from] anyhow::Error),

    /// A tool failed in a way the model cannot recover from
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Agent {agent} exceeded {limit} tool-calling iterations")]
    IterationLimit { agent: String, limit: usize },
}

/// A single prompt-driven unit of work
pub struct Agent {
    name: String,
    llm: Arc<dyn Llm>,
    model: String,
    system_prompt: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    response_format: Option<serde_json::Value>,
    temperature: Option<f32>,
    max_iterations: usize,
    event_sender: AgentEventSender,
}

impl Agent {
    /// Create a new agent
    pub fn new(name: impl Into<String>, llm: Arc<dyn Llm>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            llm,
            model: model.into(),
            system_prompt: None,
            tools: Vec::new(),
            response_format: None,
            temperature: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            event_sender: AgentEventSender::none(),
        }
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Bind tools the model may call
    pub fn with_tools(mut self, tools: Vec<Arc<dyn Tool>>) -> Self {
        self.tools = tools;
        self
    }

    /// Require the final answer to follow a JSON Schema
    pub fn with_response_format(mut self, schema: serde_json::Value) -> Self {
        self.response_format = Some(schema);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set event sender for real-time event visibility
    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = AgentEventSender::new(sender);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one turn: send `user_message`, resolve tool calls, return the final text
    pub async fn run(&self, user_message: &str) -> Result<String, AgentError> {
        let total_start = Instant::now();

        let mut messages = Vec::new();
        if let Some(ref system) = self.system_prompt {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(user_message));

        let tool_specs: Vec<ToolSpec> = self.tools.iter().map(|t| t.spec()).collect();

        for iteration in 1..=self.max_iterations {
            let request = ChatRequest {
                model: self.model.clone(),
                messages: messages.clone(),
                tools: tool_specs.clone(),
                format: self.response_format.clone(),
                temperature: self.temperature,
            };

            tracing::debug!(
                agent = %self.name,
                model = %self.model,
                iteration,
                messages = messages.len(),
                "Requesting completion"
            );

            let response = self.llm.chat(&request).await?;

            let tool_calls = if !response.tool_calls.is_empty() {
                response.tool_calls
            } else if !self.tools.is_empty() {
                // Content fallback only applies when tools are bound, so a
                // structured answer is never mistaken for a call
                parse_content_tool_call(&response.content)
                    .into_iter()
                    .collect()
            } else {
                Vec::new()
            };

            self.event_sender.iteration(iteration, tool_calls.len());

            if tool_calls.is_empty() {
                let total_duration = total_start.elapsed();
                tracing::info!(
                    agent = %self.name,
                    iterations = iteration,
                    elapsed_ms = total_duration.as_millis() as u64,
                    "Agent responded"
                );
                self.event_sender.response_complete(iteration, total_duration);
                return Ok(response.content);
            }

            tracing::info!(agent = %self.name, count = tool_calls.len(), "Agent making tool call(s)");

            let mut assistant = ChatMessage::assistant(response.content);
            assistant.tool_calls = Some(tool_calls.clone());
            messages.push(assistant);

            for tool_call in &tool_calls {
                let result = self.execute_tool_call(tool_call).await?;
                messages.push(ChatMessage::tool(result));
            }
        }

        tracing::warn!(
            agent = %self.name,
            limit = self.max_iterations,
            "Agent reached max iterations"
        );
        Err(AgentError::IterationLimit {
            agent: self.name.clone(),
            limit: self.max_iterations,
        })
    }

    /// Execute one tool call and return the text fed back to the model
    async fn execute_tool_call(&self, tool_call: &ToolCall) -> Result<String, AgentError> {
        let name = &tool_call.function.name;
        let args = &tool_call.function.arguments;
        self.event_sender.tool_start(name, args);

        tracing::info!(agent = %self.name, tool = %name, "Executing tool");
        let tool_start = Instant::now();

        let outcome = match self.tools.iter().find(|t| t.name() == name) {
            Some(tool) => tool.call(args.clone()).await,
            None => Err(ToolError::Unknown(name.clone())),
        };
        let elapsed = tool_start.elapsed();

        match outcome {
            Ok(value) => {
                let text = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                self.event_sender.tool_complete(name, &text, elapsed, false);
                Ok(text)
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(agent = %self.name, tool = %name, "Tool call rejected: {}", e);
                let text = format!("Error calling tool {}: {}", name, e);
                self.event_sender.tool_complete(name, &text, elapsed, true);
                Ok(text)
            }
            Err(e) => {
                self.event_sender
                    .tool_complete(name, &e.to_string(), elapsed, true);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatResponse, Role, ScriptedLlm};
    use crate::tools::{ListBaselineImages, MediaKind, SimulatedGenerator};
    use tempfile::TempDir;

    const PROMPT: &str = "You are the image agent.";

    fn list_tool(dir: &std::path::Path) -> Arc<dyn Tool> {
        Arc::new(ListBaselineImages::new(dir, ".png"))
    }

    #[tokio::test]
    async fn test_plain_text_response() {
        let llm = Arc::new(ScriptedLlm::new().on_text(PROMPT, "done"));
        let agent = Agent::new("ImageAgent", llm.clone(), "m").with_system_prompt(PROMPT);

        assert_eq!(agent.run("launch cups").await.unwrap(), "done");

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages[0].role, Role::System);
        assert_eq!(requests[0].messages[1].content, "launch cups");
        assert!(requests[0].tools.is_empty());
    }

    #[tokio::test]
    async fn test_tool_result_is_fed_back() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("hero.png"), b"x").unwrap();

        let llm = Arc::new(
            ScriptedLlm::new()
                .on(
                    PROMPT,
                    ChatResponse::tool_calls(vec![ToolCall::new(
                        "list_baseline_images",
                        serde_json::json!({}),
                    )]),
                )
                .on_text(PROMPT, "used hero.png"),
        );
        let (tx, mut rx) = event_channel();
        let agent = Agent::new("ImageAgent", llm.clone(), "m")
            .with_system_prompt(PROMPT)
            .with_tools(vec![list_tool(tmp.path())])
            .with_event_sender(tx);

        assert_eq!(agent.run("go").await.unwrap(), "used hero.png");

        let requests = llm.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.len(), 1);
        let last = requests[1].messages.last().unwrap();
        assert_eq!(last.role, Role::Tool);
        assert!(last.content.contains("hero.png"));

        let mut saw_tool_complete = false;
        while let Ok(event) = rx.try_recv() {
            if let AgentEvent::ToolComplete { is_error, .. } = event {
                assert!(!is_error);
                saw_tool_complete = true;
            }
        }
        assert!(saw_tool_complete);
    }

    #[tokio::test]
    async fn test_content_tool_call_fallback() {
        let tmp = TempDir::new().unwrap();
        let llm = Arc::new(
            ScriptedLlm::new()
                .on_text(PROMPT, r#"{"name": "list_baseline_images", "arguments": {}}"#)
                .on_text(PROMPT, "nothing to use"),
        );
        let agent = Agent::new("ImageAgent", llm.clone(), "m")
            .with_system_prompt(PROMPT)
            .with_tools(vec![list_tool(tmp.path())]);

        assert_eq!(agent.run("go").await.unwrap(), "nothing to use");
        assert_eq!(llm.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_json_answer_without_tools_is_final() {
        let answer = r#"{"name": "x", "arguments": {}}"#;
        let llm = Arc::new(ScriptedLlm::new().on_text(PROMPT, answer));
        let agent = Agent::new("QueueAgent", llm, "m").with_system_prompt(PROMPT);

        assert_eq!(agent.run("go").await.unwrap(), answer);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .on(
                    PROMPT,
                    ChatResponse::tool_calls(vec![ToolCall::new("post_to_x", serde_json::json!({}))]),
                )
                .on_text(PROMPT, "ok"),
        );
        let agent = Agent::new("ImageAgent", llm.clone(), "m").with_system_prompt(PROMPT);

        assert_eq!(agent.run("go").await.unwrap(), "ok");
        let tool_msg = llm.requests()[1].messages.last().unwrap().clone();
        assert!(tool_msg.content.contains("Unknown tool: post_to_x"));
    }

    #[tokio::test]
    async fn test_tool_io_error_aborts_agent() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, b"not a dir").unwrap();
        let generator: Arc<dyn Tool> =
            Arc::new(SimulatedGenerator::new(MediaKind::Image, blocker.join("out")));

        let llm = Arc::new(ScriptedLlm::new().on(
            PROMPT,
            ChatResponse::tool_calls(vec![ToolCall::new(
                "generate_image_from_prompt_and_image",
                serde_json::json!({"prompt": "p", "image_path": "images_baseline/a.png"}),
            )]),
        ));
        let agent = Agent::new("ImageAgent", llm, "m")
            .with_system_prompt(PROMPT)
            .with_tools(vec![generator]);

        let err = agent.run("go").await.unwrap_err();
        assert!(matches!(err, AgentError::Tool(ToolError::Io { .. })));
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let tmp = TempDir::new().unwrap();
        let call = || {
            ChatResponse::tool_calls(vec![ToolCall::new(
                "list_baseline_images",
                serde_json::json!({}),
            )])
        };
        let llm = Arc::new(ScriptedLlm::new().on(PROMPT, call()).on(PROMPT, call()));
        let agent = Agent::new("ImageAgent", llm, "m")
            .with_system_prompt(PROMPT)
            .with_tools(vec![list_tool(tmp.path())])
            .with_max_iterations(2);

        let err = agent.run("go").await.unwrap_err();
        assert!(matches!(err, AgentError::IterationLimit { limit: 2, .. }));
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let llm = Arc::new(ScriptedLlm::new().fail_on(PROMPT, "503 Service Unavailable"));
        let agent = Agent::new("TrendAgent", llm, "m").with_system_prompt(PROMPT);

        let err = agent.run("go").await.unwrap_err();
        assert!(matches!(err, AgentError::Model(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_response_format_is_sent() {
        let llm = Arc::new(ScriptedLlm::new().on_text(PROMPT, "{}"));
        let schema = serde_json::json!({"type": "object"});
        let agent = Agent::new("QueueAgent", llm.clone(), "m")
            .with_system_prompt(PROMPT)
            .with_response_format(schema.clone());

        agent.run("go").await.unwrap();
        assert_eq!(llm.requests()[0].format, Some(schema));
    }
}
