use anyhow::Result;
use async_trait::async_trait;

/// Unique identifier for a process
pub type ProcessId = u32;

/// Trait representing a handle to a running process whose output is observed
#[async_trait]
pub trait ObservedProcess: Send + Sync {
    /// Get the process ID (None if process has exited)
    fn pid(&self) -> Option<ProcessId>;

    /// Program followed by its arguments
    fn args(&self) -> &[String];

    /// Force kill the process
    async fn kill(&mut self) -> Result<()>;

    /// Invocation as a single space-joined string, used in error messages
    fn command_line(&self) -> String {
        self.args().join(" ")
    }
}

#[async_trait]
impl ObservedProcess for Box<dyn ObservedProcess> {
    fn pid(&self) -> Option<ProcessId> {
        (**self).pid()
    }

    fn args(&self) -> &[String] {
        (**self).args()
    }

    async fn kill(&mut self) -> Result<()> {
        (**self).kill().await
    }

    fn command_line(&self) -> String {
        (**self).command_line()
    }
}
