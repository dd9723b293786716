use thiserror::Error;

/// Errors surfaced by [`LineStream`](crate::LineStream) reads
#[derive(Error, Debug)]
pub enum LineStreamError {
    /// The deadline passed before the requested number of lines arrived.
    ///
    /// `lines` holds whatever was collected before expiry, in stream order.
    #[error("cmd [{command}] Timed out trying to read {line_count} lines")]
    Timeout {
        command: String,
        line_count: usize,
        lines: Vec<String>,
    },
}

impl LineStreamError {
    /// Check if this error is a read timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, LineStreamError::Timeout { .. })
    }

    /// Lines collected before the error occurred
    pub fn partial_lines(&self) -> &[String] {
        match self {
            LineStreamError::Timeout { lines, .. } => lines,
        }
    }

    /// Consume the error, keeping the lines collected before it occurred
    pub fn into_partial_lines(self) -> Vec<String> {
        match self {
            LineStreamError::Timeout { lines, .. } => lines,
        }
    }
}
