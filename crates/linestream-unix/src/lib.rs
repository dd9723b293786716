//! Unix process handles and spawning for linestream

#[cfg(unix)]
mod process_handle;
#[cfg(unix)]
mod spawner;

#[cfg(unix)]
pub use process_handle::UnixProcessHandle;
#[cfg(unix)]
pub use spawner::UnixSpawner;
