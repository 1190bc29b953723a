//! Run-scoped shared memory between agents
//!
//! Every agent result is written under its output key exactly once per run.
//! Entries keep their insertion order so output can be shown in the order
//! it was produced. A blackboard is created per run and passed explicitly;
//! parallel members read the same snapshot and never write to it.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Reserved key holding the business intent of the run
pub const INTENT_KEY: &str = "intent";

/// Errors from writing to a blackboard
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlackboardError {
    #[error("Blackboard key '{0}' was already written in this run")]
    AlreadyWritten(String),
}

/// A value produced by an agent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlackboardValue {
    /// Free-form model text
    Text(String),
    /// A record validated against an output schema
    Record(serde_json::Value),
}

impl BlackboardValue {
    /// Render the value for interpolation into a prompt
    pub fn as_prompt_text(&self) -> String {
        match self {
            BlackboardValue::Text(text) => text.clone(),
            BlackboardValue::Record(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }

    pub fn as_record(&self) -> Option<&serde_json::Value> {
        match self {
            BlackboardValue::Record(value) => Some(value),
            BlackboardValue::Text(_) => None,
        }
    }
}

impl std::fmt::Display for BlackboardValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_prompt_text())
    }
}

/// Write-once key/value store for a single run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blackboard {
    entries: Vec<(String, BlackboardValue)>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blackboard holding only the business intent
    pub fn seeded(intent: impl Into<String>) -> Self {
        Self {
            entries: vec![(INTENT_KEY.to_string(), BlackboardValue::Text(intent.into()))],
        }
    }

    /// Write a single key
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: BlackboardValue,
    ) -> Result<(), BlackboardError> {
        let key = key.into();
        if self.contains(&key) {
            return Err(BlackboardError::AlreadyWritten(key));
        }
        self.entries.push((key, value));
        Ok(())
    }

    /// Write a batch of keys at once
    ///
    /// Either every key is written or, if any key is taken (or repeated in
    /// the batch), none is.
    pub fn commit(&mut self, batch: Vec<(String, BlackboardValue)>) -> Result<(), BlackboardError> {
        for (i, (key, _)) in batch.iter().enumerate() {
            if self.contains(key) || batch[..i].iter().any(|(k, _)| k == key) {
                return Err(BlackboardError::AlreadyWritten(key.clone()));
            }
        }
        self.entries.extend(batch);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&BlackboardValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// The business intent the run was seeded with
    pub fn intent(&self) -> &str {
        match self.get(INTENT_KEY) {
            Some(BlackboardValue::Text(intent)) => intent,
            _ => "",
        }
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BlackboardValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Blackboard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
