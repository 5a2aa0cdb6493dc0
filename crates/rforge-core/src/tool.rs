//! The external packaging tool.
//!
//! Builds and uploads are delegated to `rattler-build` as a subprocess with
//! inherited stdio, so its own progress output goes straight to the log.
//! Runs are sequential and block until the tool exits.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::info;

use crate::config::DEFAULT_BUILD_TOOL;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed: {status}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
    },
}

/// Build and upload operations of a packaging tool.
pub trait BuildTool {
    /// Build `recipe` for `platform`, resolving dependencies from `channels`.
    ///
    /// # Errors
    ///
    /// Fails if the tool cannot be started or exits nonzero.
    fn build(&self, recipe: &Path, platform: &str, channels: &[String]) -> Result<(), ToolError>;

    /// Upload `artifact` to `channel`, authenticating with `api_key`.
    ///
    /// # Errors
    ///
    /// Fails if the tool cannot be started or exits nonzero.
    fn upload(&self, artifact: &Path, channel: &str, api_key: &str) -> Result<(), ToolError>;
}

/// `rattler-build`, or a compatible binary.
#[derive(Debug, Clone)]
pub struct RattlerBuild {
    program: PathBuf,
}

impl Default for RattlerBuild {
    fn default() -> Self {
        Self::new(DEFAULT_BUILD_TOOL)
    }
}

impl RattlerBuild {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for `build`.
    pub fn build_args(recipe: &Path, platform: &str, channels: &[String]) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "-r".to_string(),
            recipe.display().to_string(),
            "--target-platform".to_string(),
            platform.to_string(),
            "--test".to_string(),
            "native".to_string(),
        ];
        for channel in channels {
            args.push("-c".to_string());
            args.push(channel.clone());
        }
        args
    }

    /// Arguments for `upload`.
    pub fn upload_args(artifact: &Path, channel: &str) -> Vec<String> {
        vec![
            "upload".to_string(),
            "prefix".to_string(),
            "-c".to_string(),
            channel.to_string(),
            artifact.display().to_string(),
        ]
    }

    fn run(&self, args: &[String], env: &[(&str, &str)]) -> Result<(), ToolError> {
        let program = self.program.display().to_string();
        let command = format!("{program} {}", args.join(" "));
        info!("running {command}");

        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        for (key, value) in env {
            cmd.env(key, value);
        }
        let status = cmd.status().map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;

        if status.success() {
            Ok(())
        } else {
            Err(ToolError::Failed { command, status })
        }
    }
}

impl BuildTool for RattlerBuild {
    fn build(&self, recipe: &Path, platform: &str, channels: &[String]) -> Result<(), ToolError> {
        self.run(&Self::build_args(recipe, platform, channels), &[])
    }

    fn upload(&self, artifact: &Path, channel: &str, api_key: &str) -> Result<(), ToolError> {
        // The key goes through the environment, never the command line.
        self.run(
            &Self::upload_args(artifact, channel),
            &[("PREFIX_API_KEY", api_key)],
        )
    }
}
