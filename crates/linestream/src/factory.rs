use anyhow::{Context, Result};
use linestream_core::{CommandConfig, LineStream, LineStreamConfig};
use tracing::debug;

pub type PlatformProcess = linestream_unix::UnixProcessHandle;

pub type PlatformOutput = tokio::process::ChildStdout;

/// Line stream over a process started by [`PlatformSpawner`]
pub type ProcessLineStream = LineStream<PlatformProcess, PlatformOutput>;

/// Platform-independent spawner that selects the appropriate implementation at compile time
pub struct PlatformSpawner;

impl PlatformSpawner {
    /// Start `command` and observe its stdout
    pub fn spawn(command: &CommandConfig, config: LineStreamConfig) -> Result<ProcessLineStream> {
        config.validate().context("Invalid line stream configuration")?;

        let (process, output) = linestream_unix::UnixSpawner::spawn(command)?;
        let stream = LineStream::with_config(process, output, config);
        debug!(
            "Observing {} on {}",
            stream.command_line(),
            Self::platform_name()
        );
        Ok(stream)
    }

    pub fn platform_name() -> &'static str {
        linestream_unix::UnixSpawner::platform_name()
    }
}
