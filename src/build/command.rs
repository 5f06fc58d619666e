//! Build pipeline that runs an external command per component
//!
//! The command receives the component through the environment:
//! - `SCOPEUP_COMPONENT_ID`: full id with version
//! - `SCOPEUP_COMPONENT_VERSION`: version only
//!
//! Recognised stdout lines:
//! - `artifact: <name> [file...]` records an artifact
//! - `published: <package-ref>` records a published package

use super::{BuildOptions, BuildOutput, BuildPipeline, ComponentArtifacts, PipelineReport};
use crate::domain::{ArtifactRef, Component};
use crate::error::BuildError;
use async_trait::async_trait;
use log::{debug, warn};
use tokio::process::Command;

/// Task name used in reports
const TASK_NAME: &str = "build-command";

/// Runs one command for every seed component
#[derive(Debug, Clone)]
pub struct CommandPipeline {
    program: String,
    args: Vec<String>,
}

impl CommandPipeline {
    /// Create a pipeline from a program and its arguments
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Parse a command line
    ///
    /// Words split on whitespace; single and double quotes group words and
    /// a backslash escapes the next character outside single quotes. No
    /// other shell syntax (variables, globs, pipes) is interpreted.
    pub fn from_command_line(command_line: &str) -> Result<Self, BuildError> {
        let mut parts = split_command_line(command_line)?.into_iter();
        let program = parts.next().ok_or_else(|| BuildError::Execution {
            message: "empty build command".to_string(),
        })?;
        Ok(Self::new(program, parts.collect()))
    }

    /// Human readable command line
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn split_command_line(command_line: &str) -> Result<Vec<String>, BuildError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = command_line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"') | None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(BuildError::Execution {
            message: format!("unterminated {} quote in build command: {}", q, command_line),
        });
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Parsed stdout of one run
#[derive(Debug, Default, PartialEq)]
struct CommandOutput {
    artifacts: Vec<ArtifactRef>,
    published: Vec<String>,
}

fn parse_stdout(stdout: &str) -> CommandOutput {
    let mut output = CommandOutput::default();
    for line in stdout.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("artifact:") {
            let mut fields = rest.split_whitespace();
            if let Some(name) = fields.next() {
                output.artifacts.push(ArtifactRef {
                    task: TASK_NAME.to_string(),
                    name: name.to_string(),
                    files: fields.map(String::from).collect(),
                });
            }
        } else if let Some(rest) = line.strip_prefix("published:") {
            let package = rest.trim();
            if !package.is_empty() {
                output.published.push(package.to_string());
            }
        }
    }
    output
}

#[async_trait]
impl BuildPipeline for CommandPipeline {
    async fn run(
        &self,
        components: &[Component],
        options: &BuildOptions,
    ) -> Result<BuildOutput, BuildError> {
        let mut output = BuildOutput::default();

        for component in components {
            let version = component
                .id
                .version
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_default();
            debug!("Running `{}` for {}", self.command_line(), component.id);

            let result = Command::new(&self.program)
                .args(&self.args)
                .env("SCOPEUP_COMPONENT_ID", component.id.to_string())
                .env("SCOPEUP_COMPONENT_VERSION", version)
                .output()
                .await
                .map_err(|e| BuildError::Execution {
                    message: format!("{}: {}", self.program, e),
                })?;

            let stdout = String::from_utf8_lossy(&result.stdout);
            let parsed = parse_stdout(&stdout);
            output.artifacts.push(ComponentArtifacts {
                id: component.id.clone(),
                artifacts: parsed.artifacts,
            });
            output.published_packages.extend(parsed.published);

            if result.status.success() {
                output
                    .reports
                    .push(PipelineReport::success(TASK_NAME, component.id.clone()));
                continue;
            }

            let stderr = String::from_utf8_lossy(&result.stderr);
            let mut errors: Vec<String> = stderr
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect();
            if errors.is_empty() {
                errors.push(format!("exited with {}", result.status));
            }
            warn!("Build failed for {}", component.id);
            output.reports.push(PipelineReport::failure(
                TASK_NAME,
                component.id.clone(),
                errors,
            ));

            if options.fail_fast {
                break;
            }
        }

        Ok(output)
    }
}
