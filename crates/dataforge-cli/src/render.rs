use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use dataforge_core::events::RunEvent;
use dataforge_core::progress::ProgressSnapshot;

use crate::cli::Verbosity;

/// Create the indeterminate spinner shown while the tool runs.
pub fn create_spinner(label: &str, file_name: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(format!("Running {label}"));
    pb.set_message(format!("Executing {label} on {file_name}..."));
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Spawn a renderer task for one run.
///
/// Returns an event sender and a join handle. Drop the sender when the run
/// is done to let the render loop finish, then await the handle.
pub fn spawn_renderer(
    label: &str,
    file_name: &str,
    verbosity: Verbosity,
) -> (mpsc::UnboundedSender<RunEvent>, JoinHandle<Result<()>>) {
    let pb = (verbosity != Verbosity::Quiet).then(|| create_spinner(label, file_name));
    let label = label.to_string();
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move { render_loop(rx, label, verbosity, pb).await });
    (tx, handle)
}

/// Text shown next to the spinner for a progress snapshot.
fn progress_message(label: &str, snapshot: &ProgressSnapshot) -> String {
    if snapshot.is_finishing() {
        format!("{label} {}", snapshot.text)
    } else {
        format!("{label}: {}", snapshot.text)
    }
}

/// Final one-line summary for a finished run.
fn summary_line(label: &str, exit_code: i32) -> String {
    if exit_code == 0 {
        format!("{label} execution completed successfully")
    } else {
        format!("{label} execution failed with exit code: {exit_code}")
    }
}

/// Print above the spinner without tearing it.
fn print_line(pb: &Option<ProgressBar>, is_stderr: bool, line: &str) {
    let write = || {
        if is_stderr {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    };
    match pb {
        Some(pb) => pb.suspend(write),
        None => write(),
    }
}

async fn render_loop(
    mut rx: mpsc::UnboundedReceiver<RunEvent>,
    label: String,
    verbosity: Verbosity,
    pb: Option<ProgressBar>,
) -> Result<()> {
    let prefix = format!("[{label}]").cyan().bold().to_string();

    while let Some(event) = rx.recv().await {
        match event {
            RunEvent::Started { ref command, pid } => {
                if verbosity == Verbosity::Verbose {
                    let pid = pid.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string());
                    print_line(
                        &pb,
                        false,
                        &format!("{} {} {}", "$".cyan(), command, format!("(pid {pid})").dimmed()),
                    );
                }
            }
            RunEvent::Output(ref out) => {
                print_line(&pb, out.is_stderr(), &format!("{prefix} {}", out.text));
            }
            RunEvent::Progress(ref snapshot) => {
                if let Some(ref pb) = pb {
                    pb.set_message(progress_message(&label, snapshot));
                }
            }
            RunEvent::Finished {
                exit_code,
                success,
                duration,
            } => {
                if let Some(ref pb) = pb {
                    pb.finish_and_clear();
                }
                if verbosity == Verbosity::Quiet {
                    continue;
                }
                let elapsed = format!("({:.1}s)", duration.as_secs_f64());
                let summary = summary_line(&label, exit_code);
                if success {
                    println!("{} {}", summary.green(), elapsed.dimmed());
                } else {
                    eprintln!("{} {}", summary.red(), elapsed.dimmed());
                }
            }
        }
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    Ok(())
}
