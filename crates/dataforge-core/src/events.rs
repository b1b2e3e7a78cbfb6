use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::progress::ProgressSnapshot;

/// Which standard stream of the child a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => write!(f, "stdout"),
            OutputStream::Stderr => write!(f, "stderr"),
        }
    }
}

/// One non-empty, trimmed line of child output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputEvent {
    pub stream: OutputStream,
    pub text: String,
    /// Position in the run's overall delivery order. Strictly increasing
    /// within a stream; interleaving across streams follows arrival.
    pub seq: u64,
    /// Time since the process was spawned.
    pub elapsed: Duration,
}

impl OutputEvent {
    pub fn is_stderr(&self) -> bool {
        self.stream == OutputStream::Stderr
    }
}

/// Events emitted by [`ProcessRunner`](crate::runner::ProcessRunner) while a
/// run is in flight.
///
/// These decouple process execution from presentation so a terminal
/// renderer, a JSON writer or an embedding host can all consume the same
/// stream. `Finished` is always the last event of a launched run; a run
/// that fails to launch emits nothing.
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// The process has been spawned.
    Started { command: String, pid: Option<u32> },
    /// A line of output.
    Output(OutputEvent),
    /// Transient progress text derived from the latest line, or the
    /// one-shot finishing notice.
    Progress(ProgressSnapshot),
    /// The process exited normally.
    Finished {
        exit_code: i32,
        success: bool,
        duration: Duration,
    },
}
