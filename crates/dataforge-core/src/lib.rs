//! Core library for `dataforge-run`.
//!
//! [`runner::ProcessRunner`] launches an external tool, streams its output
//! line by line and resolves to a single [`runner::RunResult`]. Frontends
//! consume either the [`events::RunEvent`] channel or plain callbacks.

pub mod config;
pub mod error;
pub mod events;
pub mod progress;
pub mod runner;
