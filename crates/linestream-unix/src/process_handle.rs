use anyhow::Result;
use async_trait::async_trait;
use linestream_core::{ObservedProcess, ProcessId};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid as NixPid;
use tokio::process::Child;
use tracing::{debug, info, warn};

/// Unix process handle backed by a tokio child
#[derive(Debug)]
pub struct UnixProcessHandle {
    child: Child,
    args: Vec<String>,
    /// Child was started as the leader of its own process group
    group_leader: bool,
    killed: bool,
}

impl UnixProcessHandle {
    /// Wrap a child that shares its parent's process group; kill signals the child only
    pub fn new(child: Child, args: Vec<String>) -> Self {
        Self {
            child,
            args,
            group_leader: false,
            killed: false,
        }
    }

    /// Wrap a child spawned with `process_group(0)`; kill signals the whole group
    pub fn group_leader(child: Child, args: Vec<String>) -> Self {
        Self {
            child,
            args,
            group_leader: true,
            killed: false,
        }
    }

    fn signal_group(pgid: ProcessId) -> Result<()> {
        match signal::killpg(NixPid::from_raw(pgid as i32), Signal::SIGKILL) {
            Ok(()) => {
                info!("Sent SIGKILL to process group {}", pgid);
                Ok(())
            }
            Err(nix::errno::Errno::ESRCH) => {
                debug!("Process group {} already gone", pgid);
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!(
                "SIGKILL to process group {pgid} failed: {e}"
            )),
        }
    }
}

#[async_trait]
impl ObservedProcess for UnixProcessHandle {
    fn pid(&self) -> Option<ProcessId> {
        self.child.id()
    }

    fn args(&self) -> &[String] {
        &self.args
    }

    async fn kill(&mut self) -> Result<()> {
        match self.child.id() {
            Some(pid) if self.group_leader => {
                Self::signal_group(pid)?;
                self.killed = true;
                let status = self.child.wait().await?;
                debug!("Process {} exited with {}", pid, status);
                Ok(())
            }
            Some(pid) => {
                self.child
                    .kill()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to kill process {pid}: {e}"))?;
                self.killed = true;
                Ok(())
            }
            None => {
                // Already reaped.
                self.killed = true;
                Ok(())
            }
        }
    }
}

impl Drop for UnixProcessHandle {
    fn drop(&mut self) {
        if self.killed || !self.group_leader {
            return;
        }

        if let Some(pid) = self.child.id() {
            warn!("Emergency cleanup: killing process group {} during drop", pid);
            match signal::killpg(NixPid::from_raw(pid as i32), Signal::SIGKILL) {
                Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
                Err(e) => {
                    tracing::error!("Failed to kill process group {} during drop: {}", pid, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Stdio;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
    use tokio::process::Command;

    fn spawn_group(script: &str) -> (UnixProcessHandle, tokio::process::ChildStdout) {
        let mut child = Command::new("sh")
            .args(["-c", script])
            .stdout(Stdio::piped())
            .process_group(0)
            .spawn()
            .expect("sh should spawn");
        let stdout = child.stdout.take().unwrap();
        let args = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        (UnixProcessHandle::group_leader(child, args), stdout)
    }

    #[tokio::test]
    async fn test_command_line_joins_args() {
        let (mut handle, _stdout) = spawn_group("exit 0");
        assert_eq!(handle.command_line(), "sh -c exit 0");
        assert!(handle.pid().is_some());
        handle.kill().await.unwrap();
    }

    #[tokio::test]
    async fn test_kill_takes_down_the_process_group() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let (mut handle, stdout) = spawn_group("sleep 30 & echo started; wait");
        let mut stdout = BufReader::new(stdout);
        let mut line = String::new();
        stdout.read_line(&mut line).await.unwrap();
        assert_eq!(line.trim_end(), "started");

        handle.kill().await.unwrap();
        assert!(handle.pid().is_none(), "child is reaped after kill");

        // The backgrounded sleep held stdout open; EOF means it died too.
        let mut rest = Vec::new();
        let read = tokio::time::timeout(Duration::from_secs(5), stdout.read_to_end(&mut rest)).await;
        assert!(read.is_ok(), "grandchild kept stdout open");
    }

    #[tokio::test]
    async fn test_kill_after_exit_is_ok() {
        let (mut handle, mut stdout) = spawn_group("echo done");
        let mut out = String::new();
        stdout.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "done\n");

        handle.kill().await.unwrap();
        handle.kill().await.unwrap();
    }

    #[tokio::test]
    async fn test_kill_plain_child() {
        let child = Command::new("sleep")
            .arg("30")
            .spawn()
            .expect("sleep should spawn");
        let mut handle = UnixProcessHandle::new(child, vec!["sleep".into(), "30".into()]);
        handle.kill().await.unwrap();
        assert!(handle.pid().is_none());
    }
}
