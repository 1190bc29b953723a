//! E2E test: agent turns against a live Ollama model

use std::sync::Arc;
use std::time::Duration;

use campaign_agent::agent::Agent;
use campaign_agent::llm::OllamaClient;
use campaign_agent::tools::{ListBaselineImages, Tool};
use tempfile::TempDir;

use crate::prerequisites::{ollama_model, ollama_url};

fn client() -> Arc<OllamaClient> {
    Arc::new(
        OllamaClient::new(&ollama_url(), Some(Duration::from_secs(300)))
            .expect("Failed to build Ollama client"),
    )
}

#[tokio::test]
#[ignore = "requires Ollama running"]
async fn test_plain_turn() {
    let agent = Agent::new("TrendAgent", client(), ollama_model())
        .with_system_prompt("You are a terse assistant. Answer in one short sentence.");

    let reply = agent
        .run("Name one benefit of reusable coffee cups.")
        .await
        .expect("Agent turn failed");
    assert!(!reply.trim().is_empty());
}

#[tokio::test]
#[ignore = "requires Ollama running"]
async fn test_structured_turn() {
    let schema = serde_json::json!({
        "type": "object",
        "properties": {
            "priority": {"type": "integer", "minimum": 1, "maximum": 4}
        },
        "required": ["priority"]
    });
    let agent = Agent::new("QueueAgent", client(), ollama_model())
        .with_system_prompt("Assign a product launch a priority from 1 (highest) to 4.")
        .with_response_format(schema)
        .with_temperature(0.0);

    let reply = agent.run("Launch reusable cups").await.expect("Agent turn failed");
    let value: serde_json::Value = serde_json::from_str(reply.trim()).expect("Reply is not JSON");
    assert!(value["priority"].is_i64());
}

#[tokio::test]
#[ignore = "requires Ollama running"]
async fn test_tool_calling_turn() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("mug.png"), b"x").unwrap();
    let tool: Arc<dyn Tool> = Arc::new(ListBaselineImages::new(tmp.path(), ".png"));

    let agent = Agent::new("ImageAgent", client(), ollama_model())
        .with_system_prompt(
            "Call list_baseline_images, then reply with the file name of the first image.",
        )
        .with_tools(vec![tool]);

    let reply = agent.run("Which baseline image should we use?").await.expect("Agent turn failed");
    assert!(reply.contains("mug"), "Unexpected reply: {}", reply);
}
