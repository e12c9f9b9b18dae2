//! Thin builder around the `docker` CLI.
//!
//! Every runtime operation goes through this builder so argument
//! handling, logging and error mapping stay in one place.

use std::process::{Command, Output};

use tracing::debug;

use sinara_core::error::{Result, SinaraError};

#[derive(Debug, Clone)]
pub struct DockerCommand {
    subcommand: Vec<String>,
    args: Vec<String>,
}

impl DockerCommand {
    pub fn new<S: Into<String>>(subcommand: S) -> Self {
        Self {
            subcommand: vec![subcommand.into()],
            args: Vec::new(),
        }
    }

    /// Builder for two-word subcommands like `volume create`.
    pub fn object<S: Into<String>, A: Into<String>>(object: S, action: A) -> Self {
        Self {
            subcommand: vec![object.into(), action.into()],
            args: Vec::new(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run for effect only.
    pub fn execute(self) -> Result<()> {
        let output = self.execute_raw()?;
        if output.status.success() {
            Ok(())
        } else {
            Err(SinaraError::Runtime(format!(
                "docker command failed with status {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    /// Run and return trimmed stdout, failing on a non-zero status.
    pub fn execute_with_output(self) -> Result<String> {
        let output = self.execute_raw()?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            Err(SinaraError::Runtime(format!(
                "docker command failed with status {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }

    /// Run and hand back the raw output; the caller interprets the exit
    /// status itself.
    pub fn execute_raw(self) -> Result<Output> {
        let mut cmd = Command::new("docker");
        cmd.args(&self.subcommand);
        cmd.args(&self.args);
        debug!(?cmd, "executing docker command");
        cmd.output().map_err(|e| {
            SinaraError::Runtime(format!("Failed to execute docker command: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_args() {
        let cmd = DockerCommand::new("ps")
            .arg("-a")
            .args(["--format", "{{.Names}}"]);
        assert_eq!(cmd.subcommand, vec!["ps"]);
        assert_eq!(cmd.args, vec!["-a", "--format", "{{.Names}}"]);
    }

    #[test]
    fn test_object_builder() {
        let cmd = DockerCommand::object("volume", "create").arg("jovyan-data-test1");
        assert_eq!(cmd.subcommand, vec!["volume", "create"]);
        assert_eq!(cmd.args, vec!["jovyan-data-test1"]);
    }
}
