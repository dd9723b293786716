//! Read the live output of a running process a bounded number of lines at a
//! time, with a deadline, and tear the process down afterwards.
//!
//! ```rust,no_run
//! use linestream::CommandConfig;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let command = CommandConfig::builder()
//!     .command("sh")
//!     .args(["-c", "echo ready; sleep 10"])
//!     .build()?;
//!
//! let mut stream = linestream::spawn(&command)?;
//! let lines = stream.read_until(1, Duration::from_secs(2)).await?;
//! assert_eq!(lines, ["ready"]);
//! stream.stop().await;
//! # Ok(())
//! # }
//! ```

#[cfg(unix)]
mod factory;

#[cfg(unix)]
pub use factory::*;
pub use linestream_core::*;

/// Start `command` and observe its stdout with default settings
#[cfg(unix)]
pub fn spawn(command: &CommandConfig) -> anyhow::Result<ProcessLineStream> {
    PlatformSpawner::spawn(command, LineStreamConfig::default())
}

/// Start `command` and observe its stdout with `config`
#[cfg(unix)]
pub fn spawn_with_config(
    command: &CommandConfig,
    config: LineStreamConfig,
) -> anyhow::Result<ProcessLineStream> {
    PlatformSpawner::spawn(command, config)
}
