//! Scripted LLM backend
//!
//! Replies come from canned scripts selected by a substring of the
//! request's system prompt, so concurrent agents each get their own
//! replies regardless of scheduling order. Used by tests and offline demos.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use super::{ChatRequest, ChatResponse, Llm};

type Reply = std::result::Result<ChatResponse, String>;

struct Script {
    needle: String,
    replies: VecDeque<Reply>,
    delay: Option<Duration>,
}

/// An [`Llm`] that answers from pre-recorded replies
#[derive(Default)]
pub struct ScriptedLlm {
    scripts: Mutex<Vec<Script>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(self, needle: &str, reply: Reply) -> Self {
        {
            let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
            match scripts.iter_mut().find(|s| s.needle == needle) {
                Some(script) => script.replies.push_back(reply),
                None => scripts.push(Script {
                    needle: needle.to_string(),
                    replies: VecDeque::from([reply]),
                    delay: None,
                }),
            }
        }
        self
    }

    /// Queue a reply for requests whose system prompt contains `needle`
    pub fn on(self, needle: &str, reply: ChatResponse) -> Self {
        self.push(needle, Ok(reply))
    }

    /// Queue a final text answer for requests matching `needle`
    pub fn on_text(self, needle: &str, content: impl Into<String>) -> Self {
        self.on(needle, ChatResponse::text(content))
    }

    /// Queue a service error for requests matching `needle`
    pub fn fail_on(self, needle: &str, message: impl Into<String>) -> Self {
        self.push(needle, Err(message.into()))
    }

    /// Delay every reply for `needle`
    pub fn with_delay(self, needle: &str, delay: Duration) -> Self {
        {
            let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(script) = scripts.iter_mut().find(|s| s.needle == needle) {
                script.delay = Some(delay);
            }
        }
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn next_reply(&self, system_prompt: &str) -> Option<(Reply, Option<Duration>)> {
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        scripts
            .iter_mut()
            .filter(|s| system_prompt.contains(&s.needle))
            .find_map(|s| s.replies.pop_front().map(|reply| (reply, s.delay)))
    }
}

#[async_trait]
impl Llm for ScriptedLlm {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let system_prompt = request.system_prompt().unwrap_or_default();
        let (reply, delay) = self.next_reply(system_prompt).ok_or_else(|| {
            anyhow::anyhow!(
                "No scripted reply for prompt starting with: {}",
                system_prompt.chars().take(60).collect::<String>()
            )
        })?;

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        reply.map_err(|message| anyhow::anyhow!(message))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
