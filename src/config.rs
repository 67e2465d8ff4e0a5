use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// Loaded base configuration with dot-path access.
///
/// The file is plain JSON (`dev-automation.config.json` by default). Keys
/// use dot notation to descend nested objects, e.g.
/// `"llm_settings.temperature"`.
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    values: Value,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            values: Value::Object(Map::new()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("configuration file not found at '{}'", path.display()))?;
        let values = serde_json::from_str::<Value>(&content)
            .with_context(|| format!("malformed JSON in configuration file '{}'", path.display()))?;
        anyhow::ensure!(
            values.is_object(),
            "configuration file '{}' must contain a JSON object",
            path.display()
        );
        Ok(Self { values })
    }

    pub fn from_value(values: Value) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup_path(&self.values, key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    /// String entries of a configured list. A missing key or a non-list
    /// value yields an empty vector.
    pub fn get_str_list(&self, key: &str) -> Vec<String> {
        str_list(self.get(key))
    }

    /// Sets `value` at the dot path `key`, creating intermediate objects.
    /// A non-object value along the path is replaced.
    pub fn set(&mut self, key: &str, value: Value) {
        set_path(&mut self.values, key, value);
    }
}

/// Agent-scoped configuration view.
///
/// The per-unit `config.json` found in the agent's directory is deep-merged
/// over the base configuration, agent values winning. An agent therefore
/// sees the whole base configuration plus its own overrides through one
/// handle.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    merged: Value,
}

impl AgentConfig {
    pub fn load(base: &ConfigManager, agent_dir: &Path) -> Result<Self> {
        let mut merged = base.values().clone();
        let overlay_path = agent_dir.join("config.json");
        if overlay_path.exists() {
            let content = std::fs::read_to_string(&overlay_path).with_context(|| {
                format!("failed to read agent config at '{}'", overlay_path.display())
            })?;
            let overlay = serde_json::from_str::<Value>(&content).with_context(|| {
                format!("malformed JSON in agent config '{}'", overlay_path.display())
            })?;
            deep_merge(&mut merged, &overlay);
        }
        Ok(Self { merged })
    }

    pub fn from_value(merged: Value) -> Self {
        Self { merged }
    }

    pub fn values(&self) -> &Value {
        &self.merged
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup_path(&self.merged, key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_str_list(&self, key: &str) -> Vec<String> {
        str_list(self.get(key))
    }
}

fn lookup_path<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    let mut cursor = root;
    for part in key.split('.') {
        cursor = cursor.as_object()?.get(part)?;
    }
    Some(cursor)
}

fn set_path(root: &mut Value, key: &str, value: Value) {
    let mut cursor = root;
    let mut parts = key.split('.').peekable();
    while let Some(part) = parts.next() {
        if !cursor.is_object() {
            *cursor = Value::Object(Map::new());
        }
        let Some(map) = cursor.as_object_mut() else {
            return;
        };
        if parts.peek().is_none() {
            map.insert(part.to_string(), value);
            return;
        }
        cursor = map
            .entry(part.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

fn str_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Merges `overlay` into `base`: objects merge key by key recursively,
/// every other value replaces.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}
