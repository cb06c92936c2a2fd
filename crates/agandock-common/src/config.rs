//! Dashboard configuration.
//!
//! Reads `agandock.toml` from the current directory, or the path in the
//! `AGANDOCK_CONFIG` env var. A missing file yields the defaults; individual
//! values can then be overridden through `AGANDOCK_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AgandockError, Result};

/// Complete dashboard configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub results: ResultsConfig,
}

// ── Server ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory served under `/static`
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_host()       -> String  { "127.0.0.1".to_string() }
fn default_port()       -> u16     { 3001 }
fn default_static_dir() -> PathBuf { PathBuf::from("static") }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Where the external `agandock` CLI lives and where it writes experiments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_cli_path")]
    pub cli_path: PathBuf,
    /// Every experiment is a sub-directory of this root.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,
    /// Working directory for CLI invocations; defaults to `workspace_root`.
    pub working_dir: Option<PathBuf>,
}

fn default_cli_path()       -> PathBuf { PathBuf::from("agandock") }
fn default_workspace_root() -> PathBuf { PathBuf::from("/app") }

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cli_path: default_cli_path(),
            workspace_root: default_workspace_root(),
            working_dir: None,
        }
    }
}

impl PipelineConfig {
    pub fn working_dir(&self) -> &Path {
        self.working_dir.as_deref().unwrap_or(&self.workspace_root)
    }
}

// ── Results ───────────────────────────────────────────────────────────────────

/// Score column and histogram parameters shared by every result view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsConfig {
    #[serde(default = "default_score_column")]
    pub score_column: String,
    #[serde(default = "default_bin_width")]
    pub bin_width: f64,
    #[serde(default = "default_lower")]
    pub default_lower: f64,
    #[serde(default = "default_upper")]
    pub default_upper: f64,
}

pub const DEFAULT_SCORE_COLUMN: &str = "Docking score (kcal/mol)";

fn default_score_column() -> String { DEFAULT_SCORE_COLUMN.to_string() }
fn default_bin_width()    -> f64    { 2.0 }
fn default_lower()        -> f64    { -10.0 }
fn default_upper()        -> f64    { 0.0 }

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            score_column: default_score_column(),
            bin_width: default_bin_width(),
            default_lower: default_lower(),
            default_upper: default_upper(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl DashboardConfig {
    /// Load configuration from agandock.toml and apply env overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("AGANDOCK_CONFIG")
            .unwrap_or_else(|_| "agandock.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            Self::from_toml_file(&path)?
        } else {
            tracing::info!("Config file {} not found, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AgandockError::Config(e.to_string()))
    }

    /// Apply `AGANDOCK_HOST`, `AGANDOCK_PORT`, `AGANDOCK_CLI` and `AGANDOCK_WORKSPACE`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("AGANDOCK_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("AGANDOCK_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| AgandockError::Config(format!("AGANDOCK_PORT is not a port: {port}")))?;
        }
        if let Some(cli) = lookup("AGANDOCK_CLI") {
            self.pipeline.cli_path = PathBuf::from(cli);
        }
        if let Some(root) = lookup("AGANDOCK_WORKSPACE") {
            self.pipeline.workspace_root = PathBuf::from(root);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let results = &self.results;
        if !(results.bin_width.is_finite() && results.bin_width > 0.0) {
            return Err(AgandockError::Config(format!(
                "results.bin_width must be positive, got {}",
                results.bin_width
            )));
        }
        if results.default_lower > results.default_upper {
            return Err(AgandockError::Config(format!(
                "results.default_lower ({}) exceeds results.default_upper ({})",
                results.default_lower, results.default_upper
            )));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
