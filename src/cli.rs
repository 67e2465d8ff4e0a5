use clap::{Parser, Subcommand};

const CLI_EXAMPLES: &str = "Examples:\n\
  loom-cli run \"Add CSV export to the report page\"\n\
  loom-cli --config-path ./dev-automation.config.json agents list\n\
  loom-cli agents show --name project-analysis-agent\n\
  loom-cli doctor\n\
\n\
Pipeline behavior:\n\
  - Agents are discovered from the configured agents directory (one\n\
    subdirectory with a manifest.json per agent).\n\
  - agent_execution_order in the config file fixes the run order; without\n\
    it, agents run in load order.";

#[derive(Debug, Parser)]
#[command(name = "loom-cli")]
#[command(about = "Pipeline runner for directory-discovered task agents")]
#[command(after_long_help = CLI_EXAMPLES)]
pub struct Cli {
    #[arg(
        long,
        env = "LOOM_CONFIG",
        default_value = "dev-automation.config.json"
    )]
    pub config_path: String,

    /// Overrides the agents directory from the config file.
    #[arg(long, env = "LOOM_AGENTS_DIR")]
    pub agents_dir: Option<String>,

    #[arg(long, env = "RUST_LOG", default_value = "warn")]
    pub log_filter: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(
        about = "Run the agent pipeline over a feature description and print the final output"
    )]
    Run {
        #[arg(required = true)]
        feature_description: Vec<String>,
    },
    #[command(about = "Inspect discovered agents")]
    Agents {
        #[command(subcommand)]
        command: AgentCommands,
    },
    #[command(about = "Validate configuration and provider environment")]
    Doctor,
}

#[derive(Debug, Subcommand)]
pub enum AgentCommands {
    #[command(about = "List registered agents and the resolved execution order")]
    List,
    #[command(about = "Show whether an agent is registered and where it runs")]
    Show {
        #[arg(long)]
        name: String,
    },
}
