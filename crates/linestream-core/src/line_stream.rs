use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::LineStreamConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::LineStreamError;
use crate::process::{ObservedProcess, ProcessId};
use crate::scanner::LineScanner;

/// Output state shared between reads.
///
/// `carried` holds lines already taken off the stream but not yet delivered
/// to any read; they are forwarded before anything new is scanned.
struct OutputState<R> {
    scanner: LineScanner<R>,
    carried: VecDeque<String>,
}

type SharedOutput<R> = Arc<Mutex<Option<OutputState<R>>>>;

/// Live output of a running process, read a bounded number of lines at a time.
///
/// A `LineStream` exclusively owns the process handle and its output. Every
/// [`read_until`](Self::read_until) scans the part of the output not yet
/// consumed by earlier reads. [`stop`](Self::stop) closes the output and
/// kills the process; it consumes the stream, so nothing can be read after it.
pub struct LineStream<P, R> {
    process: P,
    output: SharedOutput<R>,
    /// Cancelled by `stop`; every scanning task's stop signal is a child of it.
    closed: CancellationToken,
    sink: Arc<dyn DiagnosticSink>,
    config: LineStreamConfig,
    command: String,
}

impl<P, R> std::fmt::Debug for LineStream<P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineStream")
            .field("command", &self.command)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<P, R> LineStream<P, R>
where
    P: ObservedProcess,
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Wrap an already started process and its output with default settings
    pub fn new(process: P, output: R) -> Self {
        Self::with_config(process, output, LineStreamConfig::default())
    }

    pub fn with_config(process: P, output: R, config: LineStreamConfig) -> Self {
        let command = process.command_line();
        Self {
            output: Arc::new(Mutex::new(Some(OutputState {
                scanner: LineScanner::new(output, config.max_line_bytes),
                carried: VecDeque::new(),
            }))),
            process,
            closed: CancellationToken::new(),
            sink: Arc::new(TracingSink),
            config,
            command,
        }
    }

    /// Route cleanup diagnostics to `sink` instead of `tracing`
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The observed process's invocation, program first
    pub fn command_line(&self) -> &str {
        &self.command
    }

    pub fn pid(&self) -> Option<ProcessId> {
        self.process.pid()
    }

    pub fn config(&self) -> &LineStreamConfig {
        &self.config
    }

    /// [`read_until`](Self::read_until) with the configured read timeout
    pub async fn read_lines(&mut self, line_count: usize) -> Result<Vec<String>, LineStreamError> {
        let timeout = self.config.read_timeout();
        self.read_until(line_count, timeout).await
    }

    /// Read output lines until `line_count` have arrived or `timeout` elapses.
    ///
    /// On timeout the returned [`LineStreamError::Timeout`] carries the lines
    /// collected so far. Reaching end of stream early does not end the call:
    /// it still waits for the deadline and reports a timeout.
    ///
    /// A line the scanning task handed off after this call decided to return
    /// is kept for the next read. Only a read whose future is dropped before
    /// completing can lose that one line.
    pub async fn read_until(
        &mut self,
        line_count: usize,
        timeout: Duration,
    ) -> Result<Vec<String>, LineStreamError> {
        if line_count == 0 {
            return Ok(Vec::new());
        }

        let deadline = Instant::now() + timeout;
        let stop = self.closed.child_token();
        // Fires if the caller drops this future before it completes.
        let _stop_on_exit = stop.clone().drop_guard();

        let (tx, mut rx) = mpsc::channel::<String>(1);
        let scan = tokio::spawn(scan_lines(
            self.output.clone(),
            tx,
            stop.clone(),
            self.sink.clone(),
        ));

        let expired = tokio::time::sleep_until(deadline);
        tokio::pin!(expired);

        let mut lines = Vec::new();
        let mut scanning = true;
        let timed_out = loop {
            tokio::select! {
                biased;
                () = &mut expired => break true,
                line = rx.recv(), if scanning => match line {
                    Some(line) => {
                        lines.push(line);
                        if lines.len() >= line_count {
                            break false;
                        }
                    }
                    None => {
                        debug!(
                            command = %self.command,
                            received = lines.len(),
                            "Process output ended, waiting for deadline"
                        );
                        scanning = false;
                    }
                },
            }
        };

        stop.cancel();
        rx.close();
        if let Err(error) = scan.await {
            warn!(command = %self.command, error = %error, "Scanning task failed");
        }
        self.carry_over(&mut rx).await;

        if timed_out {
            debug!(
                command = %self.command,
                received = lines.len(),
                requested = line_count,
                "Timed out waiting for process output"
            );
            return Err(LineStreamError::Timeout {
                command: self.command.clone(),
                line_count,
                lines,
            });
        }

        Ok(lines)
    }

    /// Put lines left in a finished read's channel back in front of the stream
    async fn carry_over(&self, rx: &mut mpsc::Receiver<String>) {
        let mut leftover = Vec::new();
        while let Ok(line) = rx.try_recv() {
            leftover.push(line);
        }
        if leftover.is_empty() {
            return;
        }

        if let Some(state) = self.output.lock().await.as_mut() {
            for line in leftover.into_iter().rev() {
                state.carried.push_front(line);
            }
        }
    }

    /// Close the output, then kill the process.
    ///
    /// Failures go to the diagnostic sink; the kill is attempted even when
    /// the close fails.
    pub async fn stop(mut self) {
        self.closed.cancel();

        match tokio::time::timeout(self.config.close_timeout(), self.output.lock()).await {
            Ok(mut output) => {
                if output.take().is_some() {
                    debug!(command = %self.command, "Closed process output");
                }
            }
            Err(_) => self.sink.report(Diagnostic::CloseFailed {
                error: anyhow::anyhow!(
                    "output still held by a scanning task after {:?}",
                    self.config.close_timeout()
                ),
            }),
        }

        let pid = self.process.pid();
        if let Err(error) = self.process.kill().await {
            self.sink.report(Diagnostic::KillFailed { pid, error });
        } else {
            debug!(command = %self.command, pid = ?pid, "Killed process");
        }
    }
}

impl<P, R> Drop for LineStream<P, R> {
    fn drop(&mut self) {
        if !self.closed.is_cancelled() {
            warn!(
                command = %self.command,
                "LineStream dropped without stop; releasing output only"
            );
            self.closed.cancel();
        }
    }
}

/// Background half of a read: forwards lines until told to stop.
///
/// A slot in the handoff channel is reserved before each line is scanned, so
/// nothing is pulled off the stream while the consumer is still busy with the
/// previous line. Carried-over lines go out before new ones.
async fn scan_lines<R>(
    output: SharedOutput<R>,
    tx: mpsc::Sender<String>,
    stop: CancellationToken,
    sink: Arc<dyn DiagnosticSink>,
) where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut output = tokio::select! {
        biased;
        _ = stop.cancelled() => return,
        output = output.lock_owned() => output,
    };
    let Some(state) = output.as_mut() else {
        return;
    };

    loop {
        let permit = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            permit = tx.reserve() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        if let Some(line) = state.carried.pop_front() {
            permit.send(line);
            continue;
        }

        let next = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            next = state.scanner.next_line() => next,
        };

        match next {
            Ok(Some(line)) => permit.send(line),
            Ok(None) => {
                debug!("Reached end of process output");
                break;
            }
            Err(error) => {
                sink.report(Diagnostic::ScanAborted { error });
                break;
            }
        }
    }
}
