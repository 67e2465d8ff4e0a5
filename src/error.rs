use anyhow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Provider,
    Agent,
    Input,
    Internal,
}

impl ErrorCategory {
    pub fn code(self) -> &'static str {
        match self {
            ErrorCategory::Config => "CONFIG",
            ErrorCategory::Provider => "PROVIDER",
            ErrorCategory::Agent => "AGENT",
            ErrorCategory::Input => "INPUT",
            ErrorCategory::Internal => "INTERNAL",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            ErrorCategory::Config => {
                "Check the configuration file (--config-path) for valid JSON and field values."
            }
            ErrorCategory::Provider => {
                "Set provider credentials (for example GEMINI_API_KEY) or configure \
                 llm_settings.default_provider."
            }
            ErrorCategory::Agent => {
                "Inspect the unit's manifest.json and config.json, and re-run with RUST_LOG=info \
                 for discovery logs."
            }
            ErrorCategory::Input => "Run loom-cli --help and correct command arguments.",
            ErrorCategory::Internal => {
                "Retry with RUST_LOG=debug. If it persists, capture logs and open an issue."
            }
        }
    }
}

pub fn categorize_error(err: &anyhow::Error) -> ErrorCategory {
    let msg = format!("{err:#}").to_ascii_lowercase();

    if msg.contains("api_key") || msg.contains("provider") || msg.contains("prompt cannot be empty")
    {
        return ErrorCategory::Provider;
    }

    if msg.contains("invalid value")
        || msg.contains("unknown argument")
        || msg.contains("failed to read input")
    {
        return ErrorCategory::Input;
    }

    if msg.contains("execution order")
        || msg.contains("manifest")
        || msg.contains("constructor")
        || msg.contains("template")
    {
        return ErrorCategory::Agent;
    }

    if msg.contains("config") {
        return ErrorCategory::Config;
    }

    ErrorCategory::Internal
}

pub fn format_cli_error(err: &anyhow::Error) -> String {
    let category = categorize_error(err);
    format!("[{}] {:#}\nHint: {}", category.code(), err, category.hint())
}
