use anyhow::{Context, Result};
use linestream_core::CommandConfig;
use std::process::Stdio;
use tokio::process::{ChildStdout, Command};
use tracing::info;

use crate::UnixProcessHandle;

/// Starts commands in their own process group with stdout piped back
pub struct UnixSpawner;

impl UnixSpawner {
    /// Spawn `config` and hand back its handle and stdout.
    ///
    /// Stdin is closed and stderr is inherited from the caller.
    pub fn spawn(config: &CommandConfig) -> Result<(UnixProcessHandle, ChildStdout)> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);

        if let Some(dir) = &config.working_directory {
            cmd.current_dir(dir);
        }

        for (key, value) in &config.env {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        // Own group so kill reaches everything the command starts.
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn process: {}", config.command))?;

        let stdout = child
            .stdout
            .take()
            .with_context(|| format!("No stdout captured for: {}", config.command))?;

        if let Some(pid) = child.id() {
            info!(
                "Spawned Unix process: {} (PID: {}) with args: {:?}",
                config.command, pid, config.args
            );
        }

        Ok((UnixProcessHandle::group_leader(child, config.argv()), stdout))
    }

    pub fn platform_name() -> &'static str {
        "Unix"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linestream_core::ObservedProcess;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_spawn_applies_env_and_working_directory() {
        let config = CommandConfig::builder()
            .command("sh")
            .args(["-c", "echo \"$GREETING\"; pwd"])
            .env("GREETING", "hello")
            .working_directory("/")
            .build()
            .unwrap();

        let (mut handle, mut stdout) = UnixSpawner::spawn(&config).unwrap();
        assert_eq!(handle.args(), ["sh", "-c", "echo \"$GREETING\"; pwd"]);

        let mut out = String::new();
        stdout.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello\n/\n");

        handle.kill().await.unwrap();
    }

    #[tokio::test]
    async fn test_spawn_missing_program_fails() {
        let config = CommandConfig::builder()
            .command("/nonexistent/linestream-test-binary")
            .build()
            .unwrap();

        let err = UnixSpawner::spawn(&config).unwrap_err();
        assert!(err.to_string().contains("Failed to spawn process"));
    }

    #[test]
    fn test_platform_name() {
        assert_eq!(UnixSpawner::platform_name(), "Unix");
    }
}
