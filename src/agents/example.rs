use anyhow::Result;

use super::{Agent, AgentInit};
use crate::context::ContextStore;

/// Minimal agent that echoes the received task. Used to smoke-test
/// pipeline wiring without touching the LLM.
pub struct ExampleAgent {
    name: String,
}

pub fn construct(init: AgentInit) -> Result<Box<dyn Agent>> {
    Ok(Box::new(ExampleAgent { name: init.name }))
}

impl Agent for ExampleAgent {
    fn execute(&self, task: &str, _context: &mut ContextStore) -> Result<String> {
        Ok(format!("{} received: {}", self.name, task))
    }
}
