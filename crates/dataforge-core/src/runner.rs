use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{LaunchError, StreamReadError};
use crate::events::{OutputEvent, OutputStream, RunEvent};
use crate::progress::ProgressSnapshot;

/// How long output readers may keep draining after the process has exited.
const READER_GRACE: Duration = Duration::from_millis(500);

/// Immutable description of one process to launch.
///
/// Output is always decoded as UTF-8; invalid sequences are replaced rather
/// than failing the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    command: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl RunRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the process in `dir` instead of the current directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn working_directory(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// The command line as a single space-joined string, for display.
    pub fn display_command(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn validate(&self) -> Result<(), LaunchError> {
        if self.command.trim().is_empty() {
            return Err(LaunchError::EmptyCommand);
        }
        if let Some(ref dir) = self.working_dir {
            match std::fs::metadata(dir) {
                Ok(meta) if meta.is_dir() => {}
                Ok(_) => return Err(LaunchError::WorkingDirNotADirectory(dir.clone())),
                Err(_) => return Err(LaunchError::WorkingDirMissing(dir.clone())),
            }
        }
        Ok(())
    }
}

/// Terminal outcome of a launched process.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub exit_code: i32,
    /// `exit_code == 0`.
    pub succeeded: bool,
    /// Every delivered line, ordered by `seq`.
    pub output: Vec<OutputEvent>,
    pub duration: Duration,
}

/// Launches a single external process per call and streams its output.
///
/// Runs share no state, so one runner may drive any number of concurrent
/// calls. There is no cancellation: dropping the returned future leaves the
/// child running, and callers that need to stop it must kill the pid
/// reported in [`RunEvent::Started`].
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run `request`, invoking `on_output` for every line and `on_progress`
    /// for every derived progress snapshot.
    ///
    /// Callbacks run sequentially on the caller's task and never after this
    /// future resolves. A nonzero exit is a normal [`RunResult`]; only a
    /// failure to launch (or an exit without a status code) is an error.
    pub async fn run<O, P>(
        &self,
        request: &RunRequest,
        mut on_output: O,
        mut on_progress: P,
    ) -> Result<RunResult, LaunchError>
    where
        O: FnMut(&OutputEvent),
        P: FnMut(&ProgressSnapshot),
    {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let execute = async move {
            let result = self.run_with_events(request, Some(&tx)).await;
            drop(tx);
            result
        };

        let deliver = async {
            while let Some(event) = rx.recv().await {
                match event {
                    RunEvent::Output(ref out) => on_output(out),
                    RunEvent::Progress(ref snapshot) => on_progress(snapshot),
                    RunEvent::Started { .. } | RunEvent::Finished { .. } => {}
                }
            }
        };

        let (result, ()) = tokio::join!(execute, deliver);
        result
    }

    /// Run `request`, emitting [`RunEvent`]s as the process progresses.
    ///
    /// When no sender is provided the run is silent and only the returned
    /// [`RunResult`] carries the output.
    pub async fn run_with_events(
        &self,
        request: &RunRequest,
        events: Option<&UnboundedSender<RunEvent>>,
    ) -> Result<RunResult, LaunchError> {
        request.validate()?;

        let tx = events.cloned();
        let mut cmd = Command::new(&request.command);
        cmd.args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref dir) = request.working_dir {
            cmd.current_dir(dir);
        }

        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            command: request.command.clone(),
            source,
        })?;

        let pid = child.id();
        info!(command = %request.display_command(), ?pid, "process started");
        emit(
            &tx,
            RunEvent::Started {
                command: request.display_command(),
                pid,
            },
        );

        let seq = Arc::new(AtomicU64::new(0));
        let (stop_tx, stop_rx) = watch::channel(false);
        let stdout_task = tokio::spawn(stream_lines(
            child.stdout.take(),
            OutputStream::Stdout,
            tx.clone(),
            seq.clone(),
            start,
            stop_rx.clone(),
        ));
        let stderr_task = tokio::spawn(stream_lines(
            child.stderr.take(),
            OutputStream::Stderr,
            tx.clone(),
            seq,
            start,
            stop_rx,
        ));

        let status = child.wait().await;

        // A descendant that inherited the pipes can keep them open after the
        // child exits. Readers get a grace period to drain, then stop.
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(READER_GRACE).await;
            let _ = stop_tx.send(true);
        });
        let mut output = join_reader(stdout_task, OutputStream::Stdout).await;
        let stderr_lines = join_reader(stderr_task, OutputStream::Stderr).await;
        stopper.abort();
        debug!(command = %request.command, "output readers finished");
        emit(&tx, RunEvent::Progress(ProgressSnapshot::finishing()));

        let status = status.map_err(|source| LaunchError::Wait {
            command: request.command.clone(),
            source,
        })?;
        let Some(exit_code) = status.code() else {
            let signal = exit_signal(&status);
            warn!(command = %request.command, ?signal, "process terminated without exit code");
            return Err(LaunchError::Abnormal {
                command: request.command.clone(),
                signal,
            });
        };

        output.extend(stderr_lines);
        output.sort_by_key(|event| event.seq);

        let duration = start.elapsed();
        let succeeded = exit_code == 0;
        info!(
            command = %request.command,
            exit_code,
            success = succeeded,
            lines = output.len(),
            "process exited"
        );

        emit(
            &tx,
            RunEvent::Finished {
                exit_code,
                success: succeeded,
                duration,
            },
        );

        Ok(RunResult {
            exit_code,
            succeeded,
            output,
            duration,
        })
    }
}

/// Read `reader` line by line until EOF, emitting an output event and a
/// progress snapshot for every non-blank line.
///
/// A read error ends the stream early; it is logged and otherwise ignored.
/// A value on `stop` ends it too, keeping the lines read so far.
async fn stream_lines<R>(
    reader: Option<R>,
    stream: OutputStream,
    tx: Option<UnboundedSender<RunEvent>>,
    seq: Arc<AtomicU64>,
    start: Instant,
    mut stop: watch::Receiver<bool>,
) -> Vec<OutputEvent>
where
    R: AsyncRead + Unpin,
{
    let mut collected = Vec::new();
    let Some(reader) = reader else {
        return collected;
    };

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            _ = stop.changed() => {
                debug!(%stream, "stream still open after process exit, detaching");
                break;
            }
            read = reader.read_until(b'\n', &mut buf) => read,
        };
        match read {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                let event = OutputEvent {
                    stream,
                    text: text.to_string(),
                    seq: seq.fetch_add(1, Ordering::Relaxed),
                    elapsed: start.elapsed(),
                };
                emit(&tx, RunEvent::Output(event.clone()));
                emit(
                    &tx,
                    RunEvent::Progress(ProgressSnapshot::from_line(&event.text)),
                );
                collected.push(event);
            }
            Err(source) => {
                let err = StreamReadError { stream, source };
                warn!(error = %err, "treating stream as closed");
                break;
            }
        }
    }
    collected
}

async fn join_reader(task: JoinHandle<Vec<OutputEvent>>, stream: OutputStream) -> Vec<OutputEvent> {
    match task.await {
        Ok(lines) => lines,
        Err(e) => {
            warn!(%stream, error = %e, "output reader task failed");
            Vec::new()
        }
    }
}

/// Send an event if the transmitter is present, ignoring send errors
/// (the receiver may have been dropped).
fn emit(tx: &Option<UnboundedSender<RunEvent>>, event: RunEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}
