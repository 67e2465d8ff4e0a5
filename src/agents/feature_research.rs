use std::path::PathBuf;

use anyhow::{Context, Result};

use super::{Agent, AgentInit};
use crate::context::ContextStore;

/// Expands a feature request into a research specification by populating
/// the unit's research template. The populated document is stored in the
/// shared context under `feature_research_result`.
///
/// Failures are reported through the return value and
/// `feature_research_error` rather than aborting the pipeline.
pub struct FeatureResearchAgent {
    template_path: PathBuf,
}

const USER_INPUT_PLACEHOLDER: &str = "[USER_INPUT_PLACEHOLDER]";
const DEFAULT_TEMPLATE_PATH: &str = "templates/feature_research_template.md";

pub fn construct(init: AgentInit) -> Result<Box<dyn Agent>> {
    let relative = init
        .config
        .get_str("feature_research_agent.template_path")
        .unwrap_or(DEFAULT_TEMPLATE_PATH);
    Ok(Box::new(FeatureResearchAgent {
        template_path: init.dir.join(relative),
    }))
}

impl Agent for FeatureResearchAgent {
    fn execute(&self, task: &str, context: &mut ContextStore) -> Result<String> {
        match self.load_template() {
            Ok(template) => {
                let populated = template.replace(USER_INPUT_PLACEHOLDER, task);
                context.set("feature_research_result", populated.clone());
                Ok(populated)
            }
            Err(err) => {
                let message = format!("Feature research failed: {err:#}");
                context.set("feature_research_error", message.clone());
                Ok(message)
            }
        }
    }
}

impl FeatureResearchAgent {
    fn load_template(&self) -> Result<String> {
        std::fs::read_to_string(&self.template_path).with_context(|| {
            format!(
                "research template not found at '{}'",
                self.template_path.display()
            )
        })
    }
}
