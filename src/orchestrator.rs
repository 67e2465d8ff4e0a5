//! Agent discovery, the registry, execution-order resolution, and the
//! sequential pipeline executor.
//!
//! Failure policy by phase: discovery failures are per-unit (logged,
//! skipped, scan continues; discovery never fails outward); a configured
//! execution order naming an unknown agent is fatal at startup; an error
//! from an agent's `execute` propagates and aborts the run.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::agents::{Agent, AgentConstructor, AgentInit, builtin_constructors};
use crate::config::{AgentConfig, ConfigManager};
use crate::context::ContextStore;
use crate::llm::LlmClient;

/// Config key naming the agents root directory.
pub const AGENTS_DIR_KEY: &str = "agents.directory";
/// Config key holding the ordered list of agent names to execute.
pub const EXECUTION_ORDER_KEY: &str = "agent_execution_order";
/// Agents root used when the config does not name one.
pub const DEFAULT_AGENTS_DIR: &str = "agents";

/// This agent writes its results into the shared context; its output does
/// not update the executor's recorded input.
const PROJECT_ANALYSIS_AGENT: &str = "project-analysis-agent";

/// Per-unit descriptor read from `manifest.json`.
///
/// All three fields are required; a manifest missing one invalidates the
/// unit. Extra keys are ignored. `entry_point` is retained from the
/// descriptor format but no longer drives code loading; `class_name`
/// selects a constructor from the startup registration table.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub entry_point: String,
    pub class_name: String,
}

struct RegistryEntry {
    name: String,
    agent: Box<dyn Agent>,
}

/// Name-keyed collection of live agent instances, kept in load order.
/// Built once at startup; immutable afterward.
#[derive(Default)]
pub struct AgentRegistry {
    entries: Vec<RegistryEntry>,
}

impl AgentRegistry {
    /// Registers `agent` under `name`. A colliding name silently replaces
    /// the existing entry in place; duplicate manifest names are a latent
    /// defect surface, not an error.
    pub fn insert(&mut self, name: String, agent: Box<dyn Agent>) {
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.agent = agent,
            None => self.entries.push(RegistryEntry { name, agent }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Agent> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.agent.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.name == name)
    }
}

/// Scans the immediate subdirectories of `root` and registers every unit
/// with a valid manifest and a known constructor.
///
/// Entries that are not directories or lack a `manifest.json` are silently
/// skipped; absence of a manifest means "not a plugin directory". Every
/// other per-unit failure (unreadable or invalid manifest, unknown
/// `class_name`, constructor error) is logged with the candidate directory
/// name and skipped; the scan continues. Candidates are visited in sorted
/// name order, so load order is stable across runs.
pub fn discover_agents(
    root: &Path,
    config: &ConfigManager,
    llm: &Arc<dyn LlmClient>,
) -> AgentRegistry {
    let mut registry = AgentRegistry::default();
    let constructors = builtin_constructors();

    let mut candidates = match std::fs::read_dir(root) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect::<Vec<_>>(),
        Err(err) => {
            tracing::warn!(
                dir = %root.display(),
                error = %err,
                "agents directory is not readable; no agents loaded"
            );
            return registry;
        }
    };
    candidates.sort();

    for dir in candidates {
        if !dir.is_dir() || !dir.join("manifest.json").exists() {
            continue;
        }
        let unit = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match load_unit(&dir, config, llm, &constructors) {
            Ok((name, agent)) => {
                tracing::debug!(unit = %unit, agent = %name, "registered agent");
                registry.insert(name, agent);
            }
            Err(err) => {
                let detail = format!("{err:#}");
                tracing::error!(unit = %unit, error = %detail, "skipping agent unit");
            }
        }
    }

    registry
}

fn load_unit(
    dir: &Path,
    config: &ConfigManager,
    llm: &Arc<dyn LlmClient>,
    constructors: &HashMap<&'static str, AgentConstructor>,
) -> Result<(String, Box<dyn Agent>)> {
    let manifest_path = dir.join("manifest.json");
    let content = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read manifest at '{}'", manifest_path.display()))?;
    let manifest = serde_json::from_str::<Manifest>(&content)
        .with_context(|| format!("invalid manifest at '{}'", manifest_path.display()))?;

    let constructor = constructors
        .get(manifest.class_name.as_str())
        .copied()
        .ok_or_else(|| {
            anyhow::anyhow!(
                "class '{}' is not a registered agent constructor",
                manifest.class_name
            )
        })?;

    let agent_config = AgentConfig::load(config, dir)?;
    let agent = constructor(AgentInit {
        name: manifest.name.clone(),
        dir: dir.to_path_buf(),
        config: agent_config,
        llm: Arc::clone(llm),
    })?;

    Ok((manifest.name, agent))
}

/// Owns the registry and the resolved execution order, and runs the
/// sequential pipeline.
pub struct Orchestrator {
    registry: AgentRegistry,
    sequence: Vec<usize>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("agents", &self.registry.names())
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl Orchestrator {
    /// Discovers agents from the configured directory and resolves the
    /// execution order. A configured order naming an unknown agent is a
    /// fatal startup error.
    pub fn new(config: &ConfigManager, llm: Arc<dyn LlmClient>) -> Result<Self> {
        let root = config.get_str(AGENTS_DIR_KEY).unwrap_or(DEFAULT_AGENTS_DIR);
        let registry = discover_agents(Path::new(root), config, &llm);
        let ordered_names = config.get_str_list(EXECUTION_ORDER_KEY);
        Self::from_registry(registry, &ordered_names)
    }

    /// Builds an orchestrator from an already-populated registry. Used by
    /// embedders and tests that construct agents directly.
    pub fn from_registry(registry: AgentRegistry, ordered_names: &[String]) -> Result<Self> {
        let sequence = resolve_execution_order(&registry, ordered_names)?;
        Ok(Self { registry, sequence })
    }

    /// Registered agent names, in load order.
    pub fn list_agents(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// The registered instance, or `None` for unknown names.
    pub fn get_agent(&self, name: &str) -> Option<&dyn Agent> {
        self.registry.get(name)
    }

    /// The resolved execution order as `(name, instance)` pairs.
    pub fn execution_sequence(&self) -> Vec<(&str, &dyn Agent)> {
        self.sequence
            .iter()
            .map(|&index| {
                let entry = &self.registry.entries[index];
                (entry.name.as_str(), entry.agent.as_ref())
            })
            .collect()
    }

    /// Runs the pipeline with a fresh context store scoped to this run.
    pub fn run_sequence(&self, initial_task: &str) -> Result<String> {
        let mut context = ContextStore::new();
        self.run_sequence_with_context(initial_task, &mut context)
    }

    /// Walks the resolved order and invokes each agent strictly in
    /// sequence.
    ///
    /// Every agent receives `initial_task` verbatim: outputs are recorded
    /// between steps but never fed forward. The designated
    /// `project-analysis-agent` produces a side effect in the shared
    /// context, and its output does not update the recorded input either.
    /// The return value is whatever the final agent produced (or the task
    /// itself for an empty order). An agent error propagates immediately
    /// and aborts the run: no retry, no skip, no partial result.
    pub fn run_sequence_with_context(
        &self,
        initial_task: &str,
        context: &mut ContextStore,
    ) -> Result<String> {
        let total = self.sequence.len();
        let mut recorded_input = initial_task.to_string();
        let mut final_output = initial_task.to_string();

        for (step, &index) in self.sequence.iter().enumerate() {
            let entry = &self.registry.entries[index];
            tracing::info!(step = step + 1, total, agent = %entry.name, "executing agent");

            let output = entry.agent.execute(initial_task, context)?;
            if entry.name != PROJECT_ANALYSIS_AGENT {
                recorded_input = output.clone();
            }
            final_output = output;
        }

        tracing::debug!(
            recorded_input_len = recorded_input.len(),
            "agent sequence finished"
        );
        Ok(final_output)
    }
}

/// Maps configured names to registry positions, in order. An empty or
/// absent list falls back to load order with a logged warning; a name with
/// no registry entry fails resolution immediately, producing no partial
/// order.
fn resolve_execution_order(registry: &AgentRegistry, ordered_names: &[String]) -> Result<Vec<usize>> {
    if ordered_names.is_empty() {
        tracing::warn!("no agent execution order configured; falling back to load order");
        return Ok((0..registry.len()).collect());
    }

    ordered_names
        .iter()
        .map(|name| {
            registry.position(name).ok_or_else(|| {
                anyhow::anyhow!(
                    "agent '{}' in the configured execution order is not registered",
                    name
                )
            })
        })
        .collect()
}
