use crate::ProcessId;
use std::fmt;

/// Something that went wrong off the caller's error path
#[derive(Debug)]
pub enum Diagnostic {
    /// The output handle could not be released
    CloseFailed { error: anyhow::Error },
    /// The process could not be killed
    KillFailed {
        pid: Option<ProcessId>,
        error: anyhow::Error,
    },
    /// The scanning task gave up on the output before end of stream
    ScanAborted { error: std::io::Error },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::CloseFailed { error } => write!(f, "Failed to close stream: {error}"),
            Diagnostic::KillFailed { pid, error } => match pid {
                Some(pid) => write!(f, "Failed to kill process {pid}: {error}"),
                None => write!(f, "Failed to kill process: {error}"),
            },
            Diagnostic::ScanAborted { error } => write!(f, "Stopped scanning output: {error}"),
        }
    }
}

/// Receives diagnostics a [`LineStream`](crate::LineStream) cannot return to its caller
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink that forwards to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::CloseFailed { error } => {
                tracing::error!(error = %error, "Failed to close stream");
            }
            Diagnostic::KillFailed { pid, error } => {
                tracing::error!(pid = ?pid, error = %error, "Failed to kill process");
            }
            Diagnostic::ScanAborted { error } => {
                tracing::warn!(error = %error, "Stopped scanning process output");
            }
        }
    }
}
