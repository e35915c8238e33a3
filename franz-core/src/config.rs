//! # Configuration
//!
//! Two layers:
//! - [`SamplingConfig`]: hot-reloadable knobs an operator may edit while the
//!   loop runs. [`HotConfig`] re-reads them once per turn and hands out an
//!   owned snapshot, so a turn never sees a half-applied change.
//! - [`RunSettings`]: fixed for the life of the process (surface size, run
//!   directory, tool map, execution flags).

use crate::error::{self, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tool name -> enabled
pub type ToolMap = BTreeMap<String, bool>;

/// Tools the executor understands, all enabled.
pub fn default_tools() -> ToolMap {
    [
        "left_click",
        "right_click",
        "double_left_click",
        "drag",
        "type",
        "screenshot",
        "click",
    ]
    .into_iter()
    .map(|name| (name.to_string(), true))
    .collect()
}

// ============================================================================
// Sampling config (hot)
// ============================================================================

/// Sampling parameters and execution-mode flags.
///
/// Missing keys in the TOML file fall back to these defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    /// Ask the executor to run tool calls in its restricted interpreter
    pub restricted_exec: bool,
    /// Draw the classic visual marks on the screenshot
    pub marks_classic: bool,
    /// Draw the cursor marks on the screenshot
    pub marks_cursor: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 900,
            restricted_exec: true,
            marks_classic: true,
            marks_cursor: false,
        }
    }
}

impl SamplingConfig {
    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| Error::config_invalid(e.to_string()).set_source(e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no endpoint would accept
    pub fn validate(&self) -> Result<()> {
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(Error::config_invalid(format!(
                "temperature must be a non-negative number, got {}",
                self.temperature
            ))
            .with_context("key", "temperature"));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(Error::config_invalid(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            ))
            .with_context("key", "top_p"));
        }
        if self.max_tokens == 0 {
            return Err(Error::config_invalid("max_tokens must be positive")
                .with_context("key", "max_tokens"));
        }
        Ok(())
    }
}

/// Holder for the live sampling config.
///
/// Only the turn loop touches it, once per turn, so there is no locking.
#[derive(Debug, Clone)]
pub struct HotConfig {
    path: Option<PathBuf>,
    current: SamplingConfig,
}

impl HotConfig {
    /// A config that never changes
    pub fn fixed(config: SamplingConfig) -> Self {
        Self {
            path: None,
            current: config,
        }
    }

    /// Follow a TOML file. Starts from defaults until the first refresh.
    pub fn watching(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            current: SamplingConfig::default(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Re-read the backing file.
    ///
    /// On error the previous snapshot stays in effect; the caller decides
    /// whether that matters.
    pub fn refresh(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e)
                .with_operation("config::refresh")
                .with_context("path", path.display().to_string())
        })?;
        let fresh = SamplingConfig::from_toml(&text).map_err(|e| {
            e.with_operation("config::refresh")
                .with_context("path", path.display().to_string())
        })?;

        if fresh != self.current {
            tracing::info!(path = %path.display(), ?fresh, "sampling config reloaded");
        }
        self.current = fresh;
        Ok(())
    }

    /// Owned copy for the current turn
    pub fn snapshot(&self) -> SamplingConfig {
        self.current
    }
}

// ============================================================================
// Run settings (fixed)
// ============================================================================

/// Settings that stay constant across turns so drawings accumulate.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    /// Where the executor keeps its canvas and where `state.json` lives
    pub run_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Annotate the screenshot with visual marks
    pub marks: bool,
    /// Actually run parsed actions (false = parse only)
    pub execute_actions: bool,
    /// Drive the real mouse/keyboard instead of the simulated canvas
    pub physical_execution: bool,
    pub sandbox: bool,
    pub tools: ToolMap,
    /// Pause between turns
    pub loop_delay: Duration,
}

impl RunSettings {
    pub fn new(run_dir: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
            width: 512,
            height: 288,
            marks: true,
            execute_actions: true,
            physical_execution: false,
            sandbox: true,
            tools: default_tools(),
            loop_delay: Duration::from_millis(10),
        }
    }

    pub fn with_surface(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_loop_delay(mut self, delay: Duration) -> Self {
        self.loop_delay = delay;
        self
    }

    /// Disable a tool by name. Unknown names are added as disabled.
    pub fn disable_tool(mut self, name: impl Into<String>) -> Self {
        self.tools.insert(name.into(), false);
        self
    }
}

/// Pick the run directory.
///
/// An existing `requested` directory wins. Otherwise a fresh
/// `run_YYYYMMDD_HHMMSS` directory is created under `fallback_root`.
pub fn resolve_run_dir(requested: Option<&Path>, fallback_root: &Path) -> Result<PathBuf> {
    if let Some(dir) = requested {
        if dir.is_dir() {
            return Ok(dir.to_path_buf());
        }
        tracing::warn!(
            requested = %dir.display(),
            "run directory does not exist, using a fresh fallback directory"
        );
    }

    let name = chrono::Local::now().format("run_%Y%m%d_%H%M%S").to_string();
    let dir = fallback_root.join(name);
    std::fs::create_dir_all(&dir).map_err(|e| {
        error::io_error(format!("failed to create run directory {}: {}", dir.display(), e))
            .with_operation("config::resolve_run_dir")
            .set_source(e)
    })?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tools_all_enabled() {
        let tools = default_tools();
        assert_eq!(tools.len(), 7);
        assert!(tools.values().all(|enabled| *enabled));
        assert_eq!(tools.get("drag"), Some(&true));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SamplingConfig::from_toml("temperature = 0.2\nmarks_cursor = true\n").unwrap();
        assert_eq!(config.temperature, 0.2);
        assert!(config.marks_cursor);
        assert_eq!(config.top_p, 0.9);
        assert_eq!(config.max_tokens, 900);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SamplingConfig::from_toml("top_p = 1.5").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ConfigInvalid);
        assert_eq!(err.context_value("key"), Some("top_p"));

        assert!(SamplingConfig::from_toml("max_tokens = 0").is_err());
        assert!(SamplingConfig::from_toml("temperature = -1.0").is_err());
        assert!(SamplingConfig::from_toml("temperature = \"hot\"").is_err());
    }

    #[test]
    fn test_refresh_picks_up_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sampling.toml");
        std::fs::write(&path, "temperature = 0.3\n").unwrap();

        let mut config = HotConfig::watching(&path);
        assert_eq!(config.snapshot(), SamplingConfig::default());

        config.refresh().unwrap();
        assert_eq!(config.snapshot().temperature, 0.3);

        std::fs::write(&path, "temperature = 1.1\nmax_tokens = 64\n").unwrap();
        config.refresh().unwrap();
        assert_eq!(config.snapshot().temperature, 1.1);
        assert_eq!(config.snapshot().max_tokens, 64);
    }

    #[test]
    fn test_failed_refresh_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sampling.toml");
        std::fs::write(&path, "top_p = 0.5\n").unwrap();

        let mut config = HotConfig::watching(&path);
        config.refresh().unwrap();

        std::fs::write(&path, "top_p = [").unwrap();
        assert!(config.refresh().is_err());
        assert_eq!(config.snapshot().top_p, 0.5);

        std::fs::remove_file(&path).unwrap();
        let err = config.refresh().unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::FileNotFound);
        assert_eq!(config.snapshot().top_p, 0.5);
    }

    #[test]
    fn test_fixed_config_refresh_is_noop() {
        let mut config = HotConfig::fixed(SamplingConfig {
            max_tokens: 12,
            ..SamplingConfig::default()
        });
        assert!(config.path().is_none());
        config.refresh().unwrap();
        assert_eq!(config.snapshot().max_tokens, 12);
    }

    #[test]
    fn test_run_settings_defaults() {
        let settings = RunSettings::new("/tmp/run")
            .with_surface(640, 360)
            .disable_tool("type");
        assert_eq!((settings.width, settings.height), (640, 360));
        assert_eq!(settings.tools.get("type"), Some(&false));
        assert!(settings.sandbox);
        assert!(!settings.physical_execution);
        assert_eq!(settings.loop_delay, Duration::from_millis(10));
    }

    #[test]
    fn test_resolve_existing_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_run_dir(Some(dir.path()), Path::new("/nonexistent")).unwrap();
        assert_eq!(resolved, dir.path());
    }

    #[test]
    fn test_resolve_falls_back_to_timestamped_dir() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("not-there");

        let resolved = resolve_run_dir(Some(&missing), root.path()).unwrap();
        assert!(resolved.is_dir());
        assert!(resolved.starts_with(root.path()));
        let name = resolved.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("run_"));
        assert_eq!(name.len(), "run_20240101_120000".len());

        let resolved = resolve_run_dir(None, root.path()).unwrap();
        assert!(resolved.is_dir());
    }
}
