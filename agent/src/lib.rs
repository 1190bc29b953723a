//! LLM-backed agents with first-party tools for campaign-flow

pub mod agent;
pub mod config;
pub mod llm;
pub mod tools;
