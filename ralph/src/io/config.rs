//! Ralph configuration stored under `.ralph/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".ralph/config.toml";

/// Ralph configuration (TOML).
///
/// Edited by humans; missing fields fall back to defaults. Command-line flags
/// take precedence over every value here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RalphConfig {
    /// PRD document holding the backlog.
    pub prd_path: PathBuf,

    /// Progress log appended to between iterations.
    pub progress_log: PathBuf,

    pub selection: SelectionConfig,

    pub notes: NotesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SelectionConfig {
    /// Stories handed to the agent per iteration.
    pub batch_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotesConfig {
    /// Append agent notes to existing story notes instead of replacing them.
    pub append: bool,
    /// Prefix appended notes with a UTC timestamp line.
    pub timestamp: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { batch_size: 1 }
    }
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            append: true,
            timestamp: true,
        }
    }
}

impl Default for RalphConfig {
    fn default() -> Self {
        Self {
            prd_path: PathBuf::from("prd.json"),
            progress_log: PathBuf::from("progress.txt"),
            selection: SelectionConfig::default(),
            notes: NotesConfig::default(),
        }
    }
}

impl RalphConfig {
    pub fn validate(&self) -> Result<()> {
        if self.prd_path.as_os_str().is_empty() {
            return Err(anyhow!("prd_path must not be empty"));
        }
        if self.progress_log.as_os_str().is_empty() {
            return Err(anyhow!("progress_log must not be empty"));
        }
        if self.selection.batch_size == 0 {
            return Err(anyhow!("selection.batch_size must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RalphConfig::default()`.
pub fn load_config(path: &Path) -> Result<RalphConfig> {
    if !path.exists() {
        let cfg = RalphConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RalphConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RalphConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

/// Write the default config to `path` for `ralph init`.
///
/// An existing file is left alone unless `force` is set. Returns true if the
/// file was written.
pub fn init_config(path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    write_config(path, &RalphConfig::default())?;
    Ok(true)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, RalphConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".ralph").join("config.toml");
        let cfg = RalphConfig {
            prd_path: PathBuf::from("tasks/app.prd.json"),
            selection: SelectionConfig { batch_size: 3 },
            ..RalphConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[notes]\ntimestamp = false\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert!(cfg.notes.append);
        assert!(!cfg.notes.timestamp);
        assert_eq!(cfg.prd_path, PathBuf::from("prd.json"));
    }

    #[test]
    fn init_writes_defaults_once_unless_forced() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".ralph").join("config.toml");
        assert!(init_config(&path, false).expect("init"));
        assert_eq!(load_config(&path).expect("load"), RalphConfig::default());

        fs::write(&path, "[selection]\nbatch_size = 4\n").expect("write");
        assert!(!init_config(&path, false).expect("init"));
        assert_eq!(load_config(&path).expect("load").selection.batch_size, 4);

        assert!(init_config(&path, true).expect("init"));
        assert_eq!(load_config(&path).expect("load").selection.batch_size, 1);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[selection]\nbatch_size = 0\n").expect("write");
        let err = load_config(&path).expect_err("invalid");
        assert!(format!("{err:#}").contains("batch_size"));
    }
}
