use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;
use crate::runner::RunRequest;

/// Name of the optional per-project configuration file.
pub const CONFIG_FILE_NAME: &str = ".dataforge.yaml";

/// Environment variable overriding the configured executable.
pub const EXECUTABLE_ENV: &str = "DATAFORGE_EXECUTABLE";

const DEFAULT_EXECUTABLE: &str = "dataforge";
const DEFAULT_PATH_FLAG: &str = "--path";
const DEFAULT_LABEL: &str = "DataForge";

/// How the external tool is invoked for a file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolConfig {
    /// Executable name or path.
    pub executable: String,

    /// Flag placed before the file path. `None` passes the path positionally.
    pub path_flag: Option<String>,

    /// Extra arguments appended after the file path.
    pub extra_args: Vec<String>,

    /// Human-readable tool name used in console and progress text.
    pub label: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.to_string(),
            path_flag: Some(DEFAULT_PATH_FLAG.to_string()),
            extra_args: Vec::new(),
            label: DEFAULT_LABEL.to_string(),
        }
    }
}

impl ToolConfig {
    /// Parse a config from YAML text. Missing keys keep their defaults.
    pub fn from_yaml(yaml: &str, path: &Path) -> Result<Self, ConfigError> {
        // An empty document deserializes to null, which means "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        yaml_serde::from_str(yaml).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `.dataforge.yaml` from `dir`, falling back to defaults when the
    /// file does not exist.
    pub fn load_from_dir(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            debug!(dir = %dir.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_yaml(&content, &path)
    }

    /// Resolve the effective config: defaults < config file < environment
    /// < explicit override.
    pub fn resolve(
        project_root: Option<&Path>,
        executable_override: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let dir = match project_root {
            Some(root) => root.to_path_buf(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        let mut config = Self::load_from_dir(&dir)?;
        let env_executable = std::env::var(EXECUTABLE_ENV).ok();
        config.apply_executable_override(env_executable.as_deref());
        config.apply_executable_override(executable_override);
        Ok(config)
    }

    fn apply_executable_override(&mut self, executable: Option<&str>) {
        if let Some(exe) = executable.map(str::trim).filter(|s| !s.is_empty()) {
            self.executable = exe.to_string();
        }
    }

    /// Build the request that runs the tool against `file`, with the
    /// project root (if any) as working directory.
    ///
    /// `file` is passed through verbatim, so callers holding a `Path` must
    /// convert it without loss first.
    pub fn request_for(&self, file: &str, project_root: Option<&Path>) -> RunRequest {
        let mut request = RunRequest::new(self.executable.clone());
        if let Some(ref flag) = self.path_flag {
            request = request.arg(flag.clone());
        }
        request = request
            .arg(file)
            .args(self.extra_args.iter().cloned());
        if let Some(root) = project_root {
            request = request.working_dir(root);
        }
        request
    }
}
