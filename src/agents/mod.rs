//! Pluggable task agents.
//!
//! Every unit implements the single-operation [`Agent`] contract and is
//! constructed at discovery time from the startup registration table in
//! [`builtin_constructors`]: a manifest's `class_name` selects a
//! constructor compiled into the binary. There is no runtime code loading.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::config::AgentConfig;
use crate::context::ContextStore;
use crate::llm::LlmClient;

pub mod example;
pub mod feature_research;
pub mod issue_generator;
pub mod project_analysis;

/// The capability contract. One operation; the shared context store is
/// passed explicitly into every call and lives for one pipeline run.
pub trait Agent {
    fn execute(&self, task: &str, context: &mut ContextStore) -> Result<String>;
}

/// Collaborators injected into an agent constructor at discovery time.
pub struct AgentInit {
    /// Registry name from the unit's manifest.
    pub name: String,
    /// The unit's directory. Templates resolve relative to it.
    pub dir: PathBuf,
    /// Agent-scoped configuration view.
    pub config: AgentConfig,
    /// Shared LLM handle.
    pub llm: Arc<dyn LlmClient>,
}

pub type AgentConstructor = fn(AgentInit) -> Result<Box<dyn Agent>>;

/// Startup-time table mapping a manifest `class_name` to its constructor.
/// A manifest naming an identifier absent from this table is skipped at
/// discovery with a logged error.
pub fn builtin_constructors() -> HashMap<&'static str, AgentConstructor> {
    HashMap::from([
        ("ExampleAgent", example::construct as AgentConstructor),
        (
            "ProjectAnalysisAgent",
            project_analysis::construct as AgentConstructor,
        ),
        (
            "FeatureResearchAgent",
            feature_research::construct as AgentConstructor,
        ),
        (
            "IssueGeneratorAgent",
            issue_generator::construct as AgentConstructor,
        ),
    ])
}
