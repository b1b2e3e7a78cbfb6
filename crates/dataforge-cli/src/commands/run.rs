use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use tracing::info;

use dataforge_core::config::ToolConfig;
use dataforge_core::runner::ProcessRunner;

use crate::cli::Verbosity;

/// Arguments for the `run` command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// File to run the tool against
    pub file: PathBuf,

    /// Project root: used as the tool's working directory and searched for .dataforge.yaml
    #[arg(long)]
    pub project_root: Option<PathBuf>,

    /// Tool executable (overrides DATAFORGE_EXECUTABLE and the config file)
    #[arg(long)]
    pub executable: Option<String>,

    /// Print the run result as JSON instead of streaming output
    #[arg(long)]
    pub json: bool,
}

/// Run the tool once against `args.file`.
///
/// Returns the tool's exit code. Only a launch failure is an error; a tool
/// that runs and fails still yields `Ok(code)`.
pub async fn run(args: RunArgs, verbosity: Verbosity) -> Result<i32> {
    let file = resolve_file(&args.file)?;
    let project_root = args.project_root.as_deref();

    info!(
        project = %project_root.map_or_else(|| ".".to_string(), |p| p.display().to_string()),
        "dataforge-run initialized for project"
    );

    let config = ToolConfig::resolve(project_root, args.executable.as_deref())
        .context("failed to load tool configuration")?;
    let request = config.request_for(&file, project_root);
    info!(
        file = %file,
        command = %request.display_command(),
        "executing tool"
    );

    let runner = ProcessRunner::new();

    if args.json {
        let result = runner.run_with_events(&request, None).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(result.exit_code);
    }

    let file_name = Path::new(&file)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.clone());

    let (tx, render_handle) = crate::render::spawn_renderer(&config.label, &file_name, verbosity);
    let result = runner.run_with_events(&request, Some(&tx)).await;
    drop(tx);
    render_handle.await??;

    Ok(result?.exit_code)
}

/// Check that `path` names an existing file (not a directory) and make it
/// absolute, since the tool may run from a different working directory.
///
/// The tool receives the path as text, so non-UTF-8 paths are rejected
/// rather than passed on altered.
fn resolve_file(path: &Path) -> Result<String> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("cannot access {}", path.display()))?;
    if meta.is_dir() {
        bail!("{} is a directory, expected a file", path.display());
    }
    let absolute =
        std::path::absolute(path).with_context(|| format!("cannot resolve {}", path.display()))?;
    absolute
        .to_str()
        .map(str::to_string)
        .with_context(|| format!("{} is not valid UTF-8", absolute.display()))
}
