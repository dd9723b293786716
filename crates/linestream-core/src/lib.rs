//! linestream core - platform-independent line reading over live process output
//!
//! This crate provides [`LineStream`], the process-handle trait it consumes,
//! configuration, error types and the diagnostic sink used during cleanup.

mod config;
mod diagnostics;
mod error;
mod line_stream;
mod process;
mod scanner;

pub use config::*;
pub use diagnostics::*;
pub use error::*;
pub use line_stream::LineStream;
pub use process::*;
