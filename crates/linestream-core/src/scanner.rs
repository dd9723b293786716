use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};

const CHUNK_SIZE: usize = 8 * 1024;

/// Splits a byte stream into newline-delimited lines.
///
/// `next_line` is cancel safe: bytes already read stay buffered in `pending`
/// and are picked up by the next call, so a scan interrupted by a stop signal
/// loses nothing.
pub(crate) struct LineScanner<R> {
    reader: R,
    chunk: Box<[u8]>,
    pending: Vec<u8>,
    max_line_bytes: usize,
    eof: bool,
}

impl<R> LineScanner<R>
where
    R: AsyncRead + Unpin,
{
    pub(crate) fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            chunk: vec![0u8; CHUNK_SIZE].into_boxed_slice(),
            pending: Vec::new(),
            max_line_bytes,
            eof: false,
        }
    }

    /// Next line without its terminator, or `None` once the stream is exhausted.
    ///
    /// A line and its `\n` must fit in `max_line_bytes`.
    pub(crate) async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                if pos >= self.max_line_bytes {
                    return Err(self.too_long());
                }
                let mut line = self.pending.drain(..=pos).collect::<Vec<u8>>();
                trim_newline(&mut line);
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            if self.pending.len() >= self.max_line_bytes {
                return Err(self.too_long());
            }

            if self.eof {
                // Unterminated tail; an empty tail is not a line.
                if self.pending.is_empty() {
                    return Ok(None);
                }
                let mut line = std::mem::take(&mut self.pending);
                trim_newline(&mut line);
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            let n = self.reader.read(&mut self.chunk).await?;
            if n == 0 {
                self.eof = true;
            } else {
                self.pending.extend_from_slice(&self.chunk[..n]);
            }
        }
    }

    fn too_long(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("line exceeds {} bytes", self.max_line_bytes),
        )
    }
}

fn trim_newline(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
}
