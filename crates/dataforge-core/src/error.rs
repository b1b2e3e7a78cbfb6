use std::path::PathBuf;

use thiserror::Error;

use crate::events::OutputStream;

/// The process could not be started, or ended without an exit status.
///
/// No [`RunResult`](crate::runner::RunResult) exists for a run that fails
/// with this error.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("command must not be empty")]
    EmptyCommand,

    #[error("working directory does not exist: {}", .0.display())]
    WorkingDirMissing(PathBuf),

    #[error("working directory is not a directory: {}", .0.display())]
    WorkingDirNotADirectory(PathBuf),

    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed waiting for '{command}': {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' terminated abnormally{}", signal_suffix(.signal))]
    Abnormal { command: String, signal: Option<i32> },
}

fn signal_suffix(signal: &Option<i32>) -> String {
    match signal {
        Some(sig) => format!(" (signal {sig})"),
        None => String::new(),
    }
}

/// Reading one of the child's output streams failed after launch.
///
/// Never surfaced to callers: the stream is treated as closed and the run
/// proceeds to wait for exit.
#[derive(Debug, Error)]
#[error("failed reading {stream}: {source}")]
pub struct StreamReadError {
    pub stream: OutputStream,
    #[source]
    pub source: std::io::Error,
}

/// The tool configuration file could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: yaml_serde::Error,
    },
}
