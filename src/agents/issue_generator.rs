use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;

use super::{Agent, AgentInit};
use crate::config::AgentConfig;
use crate::context::ContextStore;
use crate::llm::{LlmClient, LlmOptions};

/// Renders the project meta-prompt, asks the LLM for a full issue
/// specification, and writes it under `<project root>/generated-issues/`.
/// Returns the output file path.
///
/// Missing project configuration is reported as an error string (the run
/// continues); an LLM failure propagates and aborts the run.
pub struct IssueGeneratorAgent {
    config: AgentConfig,
    options: LlmOptions,
    llm: Arc<dyn LlmClient>,
    output_dir: PathBuf,
    meta_prompt_file: PathBuf,
}

const REQUIRED_PROJECT_KEYS: &[(&str, &str)] = &[
    ("project.context", "[PROJECT_CONTEXT_PLACEHOLDER]"),
    ("project.tech_stack", "[TECH_STACK_PLACEHOLDER]"),
    ("project.architecture", "[ARCHITECTURE_PLACEHOLDER]"),
    ("project.target_users", "[USER_BASE_PLACEHOLDER]"),
    ("project.constraints", "[CONSTRAINTS_PLACEHOLDER]"),
];

const USER_INPUT_PLACEHOLDER: &str = "[USER_INPUT_PLACEHOLDER]";
const FEATURE_MARKER: &str = "# FEATURE:";
const MAX_FILENAME_STEM: usize = 50;

pub fn construct(init: AgentInit) -> Result<Box<dyn Agent>> {
    let project_root = init
        .config
        .get_str("project.root")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    Ok(Box::new(IssueGeneratorAgent {
        options: LlmOptions::from_value(init.config.values()),
        llm: init.llm,
        output_dir: project_root.join("generated-issues"),
        meta_prompt_file: project_root.join("meta-prompt-template.md"),
        config: init.config,
    }))
}

impl Agent for IssueGeneratorAgent {
    fn execute(&self, task: &str, _context: &mut ContextStore) -> Result<String> {
        if !self.meta_prompt_file.exists() {
            return Ok(format!(
                "Error: meta-prompt template not found at {}",
                self.meta_prompt_file.display()
            ));
        }

        let mut prompt = std::fs::read_to_string(&self.meta_prompt_file).with_context(|| {
            format!(
                "failed to read meta-prompt template '{}'",
                self.meta_prompt_file.display()
            )
        })?;

        for (key, placeholder) in REQUIRED_PROJECT_KEYS {
            match self.config.get_str(key) {
                Some(value) => prompt = prompt.replace(placeholder, value),
                None => {
                    return Ok(format!(
                        "Error: missing required configuration key: '{key}'"
                    ));
                }
            }
        }
        prompt = prompt.replace(USER_INPUT_PLACEHOLDER, task);

        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "failed to create output directory '{}'",
                self.output_dir.display()
            )
        })?;

        let raw = self.llm.complete(&prompt, &self.options)?;

        // The model often prefixes chatter; keep only the specification.
        let result = match raw.find(FEATURE_MARKER) {
            Some(position) => &raw[position..],
            None => raw.as_str(),
        };

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let output_file = self
            .output_dir
            .join(format!("{timestamp}_{}.md", sanitize_stem(task)));
        std::fs::write(&output_file, result).with_context(|| {
            format!(
                "failed to write issue specification '{}'",
                output_file.display()
            )
        })?;

        tracing::info!(path = %output_file.display(), "issue specification saved");
        Ok(output_file.display().to_string())
    }
}

/// Filesystem-safe stem derived from the task description.
fn sanitize_stem(task: &str) -> String {
    task.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILENAME_STEM)
        .collect()
}
