// Documentation - Generator collaborator used by `build_doc`

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::config::CoreConfig;

/// Project metadata handed to the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct DocMetadata {
    pub project_name: String,
    pub author: String,
    pub version: String,
}

impl DocMetadata {
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            project_name: config.project_name.clone(),
            author: config.docs.author.clone(),
            version: config.version.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("Documentation project not found: {0}")]
    MissingProject(PathBuf),

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    BuilderFailed { program: String, status: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait DocGenerator {
    /// Build the documentation of `project` into `output`. Runs to completion.
    fn generate(&self, project: &Path, output: &Path, metadata: &DocMetadata) -> Result<(), DocError>;
}

/// Runs an external documentation builder such as `sphinx-build`.
///
/// Invoked as `<program> <args..> -D project=.. -D author=.. -D version=.. <project> <output>`.
#[derive(Debug, Clone)]
pub struct ExternalDocBuilder {
    program: String,
    args: Vec<String>,
}

impl ExternalDocBuilder {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.docs.builder.clone(), config.docs.args.clone())
    }

    pub fn command(&self, project: &Path, output: &Path, metadata: &DocMetadata) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("-D")
            .arg(format!("project={}", metadata.project_name))
            .arg("-D")
            .arg(format!("author={}", metadata.author))
            .arg("-D")
            .arg(format!("version={}", metadata.version))
            .arg(project)
            .arg(output);
        cmd
    }
}

impl DocGenerator for ExternalDocBuilder {
    fn generate(&self, project: &Path, output: &Path, metadata: &DocMetadata) -> Result<(), DocError> {
        if !project.is_dir() {
            return Err(DocError::MissingProject(project.to_path_buf()));
        }
        std::fs::create_dir_all(output)?;

        let mut cmd = self.command(project, output, metadata);
        debug!(command = ?cmd, "running documentation builder");

        let status = cmd.status().map_err(|source| DocError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !status.success() {
            return Err(DocError::BuilderFailed {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }

        info!(output = ?output, "documentation built");
        Ok(())
    }
}
