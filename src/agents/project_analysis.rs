use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use super::{Agent, AgentInit};
use crate::context::ContextStore;
use crate::llm::{LlmClient, LlmOptions};

/// Walks the project tree, reads key files, and asks the LLM for a project
/// summary. Results land in the shared context (`project_analysis_summary`,
/// `project_structure`) for later agents; the agent's own return value is a
/// human-readable status.
///
/// An LLM failure is absorbed: the raw structure is still stored together
/// with `project_analysis_error`, so downstream agents keep something to
/// work with.
pub struct ProjectAnalysisAgent {
    dir: PathBuf,
    project_root: PathBuf,
    ignore_patterns: Vec<String>,
    options: LlmOptions,
    llm: Arc<dyn LlmClient>,
}

const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "__pycache__",
    ".git",
    ".gitignore",
    "node_modules",
    ".venv",
    "venv",
    ".env",
    ".pytest_cache",
    ".mypy_cache",
    "target",
    "dist",
    "build",
    "*.pyc",
    "*.pyo",
    ".DS_Store",
    "Thumbs.db",
];

const KEY_FILES: &[&str] = &[
    "README.md",
    "Cargo.toml",
    "package.json",
    "pyproject.toml",
    "requirements.txt",
    "setup.py",
];

const MAX_TREE_DEPTH: usize = 3;
const KEY_FILE_CONTENT_LIMIT: usize = 2000;
const TEMPLATE_RELATIVE_PATH: &str = "templates/project_analysis_template.md";

pub fn construct(init: AgentInit) -> Result<Box<dyn Agent>> {
    let project_root = init
        .config
        .get_str("project.root")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut ignore_patterns = DEFAULT_IGNORE_PATTERNS
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<String>>();
    for pattern in init.config.get_str_list("ignore_patterns") {
        if !ignore_patterns.contains(&pattern) {
            ignore_patterns.push(pattern);
        }
    }

    Ok(Box::new(ProjectAnalysisAgent {
        dir: init.dir,
        project_root,
        ignore_patterns,
        options: LlmOptions::from_value(init.config.values()),
        llm: init.llm,
    }))
}

impl Agent for ProjectAnalysisAgent {
    fn execute(&self, task: &str, context: &mut ContextStore) -> Result<String> {
        let mut structure = String::new();
        self.render_tree(&self.project_root, 0, &mut structure);
        let key_files = self.key_files_content();

        let prompt = self.analysis_prompt(task, &structure, &key_files);

        match self.llm.complete(&prompt, &self.options) {
            Ok(summary) => {
                context.set("project_analysis_summary", summary.clone());
                context.set("project_structure", structure);
                Ok(format!(
                    "Project analysis completed. Summary stored in shared context.\n\n{summary}"
                ))
            }
            Err(err) => {
                let message = format!("LLM analysis failed: {err:#}");
                context.set("project_structure", structure);
                context.set("project_analysis_error", message.clone());
                Ok(format!(
                    "Project structure mapped, but {message}. Directory structure stored in shared context."
                ))
            }
        }
    }
}

impl ProjectAnalysisAgent {
    fn should_ignore(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.ignore_patterns.iter().any(|pattern| {
            if let Some(suffix) = pattern.strip_prefix('*') {
                name.ends_with(suffix)
            } else {
                name == *pattern
            }
        })
    }

    /// Indented listing of the tree under `dir`, depth-limited, directories
    /// first, file sizes attached.
    fn render_tree(&self, dir: &Path, depth: usize, out: &mut String) {
        if depth >= MAX_TREE_DEPTH {
            return;
        }

        let indent = "  ".repeat(depth);
        let mut items = match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .collect::<Vec<PathBuf>>(),
            Err(err) => {
                out.push_str(&format!("{indent}[unreadable: {err}]\n"));
                return;
            }
        };
        items.sort_by_key(|path| {
            (
                path.is_file(),
                path.file_name()
                    .map(|n| n.to_string_lossy().to_lowercase())
                    .unwrap_or_default(),
            )
        });

        for path in items {
            if self.should_ignore(&path) {
                continue;
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if path.is_dir() {
                out.push_str(&format!("{indent}{name}/\n"));
                self.render_tree(&path, depth + 1, out);
            } else {
                match path.metadata() {
                    Ok(meta) if meta.len() < 1024 => {
                        out.push_str(&format!("{indent}{name} ({} bytes)\n", meta.len()));
                    }
                    Ok(meta) => {
                        out.push_str(&format!("{indent}{name} ({}KB)\n", meta.len() / 1024));
                    }
                    Err(_) => out.push_str(&format!("{indent}{name}\n")),
                }
            }
        }
    }

    /// Truncated contents of well-known project files at the root.
    fn key_files_content(&self) -> String {
        let mut sections = Vec::new();
        for filename in KEY_FILES {
            let path = self.project_root.join(filename);
            if !path.exists() || self.should_ignore(&path) {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(mut content) => {
                    if content.len() > KEY_FILE_CONTENT_LIMIT {
                        let mut cut = KEY_FILE_CONTENT_LIMIT;
                        while !content.is_char_boundary(cut) {
                            cut -= 1;
                        }
                        content.truncate(cut);
                        content.push_str("\n... [truncated]");
                    }
                    sections.push(format!("=== {filename} ===\n{content}\n"));
                }
                Err(err) => {
                    sections.push(format!("=== {filename} ===\n[error reading file: {err}]\n"));
                }
            }
        }
        sections.join("\n")
    }

    fn analysis_prompt(&self, task: &str, structure: &str, key_files: &str) -> String {
        let mut placeholders = HashMap::new();
        placeholders.insert("project_name", project_name(&self.project_root));
        placeholders.insert("project_root", self.project_root.display().to_string());
        placeholders.insert("feature_request", task.to_string());
        placeholders.insert("directory_structure", structure.to_string());
        placeholders.insert("key_files_content", key_files.to_string());

        let template_path = self.dir.join(TEMPLATE_RELATIVE_PATH);
        match load_template(&template_path) {
            Ok(template) => render_template(&template, &placeholders),
            Err(err) => {
                tracing::warn!(
                    template = %template_path.display(),
                    error = %err,
                    "analysis template unavailable; using fallback prompt"
                );
                fallback_prompt(structure, key_files)
            }
        }
    }
}

fn project_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}

fn load_template(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("template file not found at '{}'", path.display()))
}

/// Replaces `{{ name }}` placeholders from `values`. Unknown placeholders
/// are left verbatim.
pub fn render_template(template: &str, values: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                match values.get(key) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

fn fallback_prompt(structure: &str, key_files: &str) -> String {
    format!(
        "Please analyze the following project structure and provide a comprehensive summary.\n\n\
         PROJECT DIRECTORY STRUCTURE:\n{structure}\n\n\
         KEY FILES CONTENT:\n{key_files}\n\n\
         Please provide:\n\
         1. Project type and technology stack identification\n\
         2. Main components and their purposes\n\
         3. Project architecture overview\n\
         4. Key dependencies and technologies used\n\
         5. Development setup requirements\n\
         6. Any notable patterns or conventions observed\n\n\
         Keep the analysis concise but comprehensive, focusing on information that would be \
         useful for other development agents working on this project."
    )
}
