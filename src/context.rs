use std::collections::HashMap;

use serde_json::Value;

/// Shared key-value store agents use to hand results to later pipeline
/// steps.
///
/// Each key carries a history of values: `set` replaces the history, `add`
/// appends to it, and `get` exposes the most recent entry. Last write wins;
/// there is no versioning or conflict detection. One store exists per
/// pipeline run and is passed into every agent execution.
#[derive(Debug, Default)]
pub struct ContextStore {
    entries: HashMap<String, Vec<Value>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).and_then(|values| values.last())
    }

    /// Most recent value for `key` as a string slice.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Replaces the entire history for `key` with a single value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), vec![value.into()]);
    }

    /// Appends a value to the history for `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.entry(key.into()).or_default().push(value.into());
    }

    /// All values recorded for `key`, oldest first.
    pub fn history(&self, key: &str) -> &[Value] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replaces the history for every key in `data`.
    pub fn update(&mut self, data: impl IntoIterator<Item = (String, Value)>) {
        for (key, value) in data {
            self.set(key, value);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
