use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tracing::level_filters::LevelFilter;

use loom_cli::cli::{AgentCommands, Cli, Commands};
use loom_cli::config::ConfigManager;
use loom_cli::error::{categorize_error, format_cli_error};
use loom_cli::llm::{detect_provider, env_present, resolve_client};
use loom_cli::orchestrator::{AGENTS_DIR_KEY, DEFAULT_AGENTS_DIR, EXECUTION_ORDER_KEY, Orchestrator};

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(err) = run_cli(cli) {
        eprintln!("{}", format_cli_error(&err));
        tracing::error!(category = %categorize_error(&err).code(), error = %err, "command failed");
        std::process::exit(1);
    }

    Ok(())
}

fn run_cli(cli: Cli) -> Result<()> {
    init_tracing(&cli.log_filter)?;
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Run {
            feature_description,
        } => {
            let task = feature_description.join(" ");
            let orchestrator = build_orchestrator(&config)?;
            tracing::info!(
                agents = orchestrator.list_agents().len(),
                "executing agent sequence"
            );
            let final_output = orchestrator.run_sequence(&task)?;
            println!("{final_output}");
        }
        Commands::Agents { command } => match command {
            AgentCommands::List => run_agents_list(&config)?,
            AgentCommands::Show { name } => run_agents_show(&config, name)?,
        },
        Commands::Doctor => run_doctor(&cli, &config)?,
    }

    Ok(())
}

/// Loads the configuration file and seeds runtime keys. A missing file is
/// non-fatal (defaults apply); a malformed file is.
fn load_config(cli: &Cli) -> Result<ConfigManager> {
    let path = Path::new(&cli.config_path);
    let mut config = if path.exists() {
        ConfigManager::load(path)?
    } else {
        tracing::warn!(path = %path.display(), "configuration file not found; using defaults");
        ConfigManager::new()
    };

    let project_root = std::env::current_dir().context("failed to determine working directory")?;
    config.set(
        "project.root",
        Value::String(project_root.display().to_string()),
    );

    if let Some(dir) = cli.agents_dir.as_deref() {
        config.set(AGENTS_DIR_KEY, Value::String(dir.to_string()));
    }

    Ok(config)
}

fn build_orchestrator(config: &ConfigManager) -> Result<Orchestrator> {
    let llm = resolve_client(config)?;
    tracing::info!(provider = llm.provider_name(), "using LLM provider");
    Orchestrator::new(config, llm)
}

fn run_agents_list(config: &ConfigManager) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;

    let names = orchestrator.list_agents();
    println!("Registered agents ({}):", names.len());
    for name in &names {
        println!("- {name}");
    }

    println!("Execution order:");
    for (position, (name, _)) in orchestrator.execution_sequence().iter().enumerate() {
        println!("{}. {name}", position + 1);
    }

    Ok(())
}

fn run_agents_show(config: &ConfigManager, name: &str) -> Result<()> {
    let orchestrator = build_orchestrator(config)?;

    if orchestrator.get_agent(name).is_none() {
        let mut names = orchestrator
            .list_agents()
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<String>>();
        names.sort();
        println!("Agent '{name}' is not registered.");
        println!("Available agents: {}", names.join(", "));
        return Ok(());
    }

    println!("Agent '{name}' is registered.");
    let positions = orchestrator
        .execution_sequence()
        .iter()
        .enumerate()
        .filter(|(_, (sequence_name, _))| *sequence_name == name)
        .map(|(position, _)| (position + 1).to_string())
        .collect::<Vec<String>>();
    if positions.is_empty() {
        println!("Not part of the resolved execution order.");
    } else {
        println!("Runs at position(s): {}", positions.join(", "));
    }

    Ok(())
}

fn run_doctor(cli: &Cli, config: &ConfigManager) -> Result<()> {
    let config_exists = Path::new(&cli.config_path).exists();
    println!(
        "Config file: {} ({})",
        cli.config_path,
        if config_exists {
            "found"
        } else {
            "missing (defaults apply)"
        }
    );

    let agents_dir = config.get_str(AGENTS_DIR_KEY).unwrap_or(DEFAULT_AGENTS_DIR);
    println!(
        "Agents directory: {} ({})",
        agents_dir,
        if Path::new(agents_dir).is_dir() {
            "found"
        } else {
            "missing"
        }
    );

    let ordered = config.get_str_list(EXECUTION_ORDER_KEY);
    if ordered.is_empty() {
        println!("Execution order: not configured (load order applies)");
    } else {
        println!("Execution order: {}", ordered.join(" -> "));
    }

    let checks = [
        ("GEMINI_API_KEY", env_present("GEMINI_API_KEY")),
        ("OPENAI_API_KEY", env_present("OPENAI_API_KEY")),
        ("OLLAMA_HOST", env_present("OLLAMA_HOST")),
    ];
    println!("Provider environment check:");
    for (key, ok) in checks {
        let status = if ok { "set" } else { "missing" };
        println!("- {key}: {status}");
    }

    println!(
        "Configured provider: {}",
        config
            .get_str("llm_settings.default_provider")
            .unwrap_or("gemini (default)")
    );
    match detect_provider() {
        Some(provider) => println!("Auto provider resolution: {provider}"),
        None => {
            println!("Auto provider resolution: none");
            println!("Tip: export one provider key or run a local Ollama server");
        }
    }

    let orchestrator = build_orchestrator(config)?;
    println!("Discovered agents: {}", orchestrator.list_agents().len());

    Ok(())
}

fn init_tracing(log_filter: &str) -> Result<()> {
    let level = log_filter
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(log_filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
}
