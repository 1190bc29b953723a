//! Instruction templates for the built-in agents
//!
//! `{name}` placeholders are filled from the run's blackboard before the
//! instruction is sent as the system prompt. The business intent is always
//! available as `{intent}` and is also sent as the user message.

mod assets;
mod ideation;
mod queue;
mod synthesis;
mod validation;

pub use assets::{IMAGE_PROMPT, SOCIAL_POST_PROMPT, VIDEO_PROMPT};
pub use ideation::{BRAND_PROMPT, COMMUNITY_PROMPT, CONTENT_PROMPT, TREND_PROMPT};
pub use queue::QUEUE_PROMPT;
pub use synthesis::SYNTHESIS_PROMPT;
pub use validation::BRAND_ASSURANCE_PROMPT;
