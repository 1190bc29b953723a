//! Verify E2E test prerequisites before running tests

use std::time::Duration;

/// Default Ollama URL
pub fn ollama_url() -> String {
    std::env::var("OLLAMA_URL").unwrap_or_else(|_| "http://localhost:11434".to_string())
}

/// Default model to use
pub fn ollama_model() -> String {
    std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "qwen3:14b".to_string())
}

/// Check if Ollama is running and accessible
pub async fn check_ollama() -> bool {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to build client");

    client
        .get(format!("{}/api/tags", ollama_url()))
        .send()
        .await
        .map(|r| r.status().is_success())
        .unwrap_or(false)
}

#[tokio::test]
#[ignore = "prerequisites check - run first"]
async fn test_prerequisites() {
    println!("\n=== E2E Prerequisites Check ===\n");

    let ollama_ok = check_ollama().await;
    println!(
        "Ollama ({}): {}",
        ollama_url(),
        if ollama_ok { "✓ Running" } else { "✗ Not accessible" }
    );
    println!("Model: {}\n", ollama_model());

    assert!(ollama_ok, "Ollama not running. Start with: ollama serve");
}
