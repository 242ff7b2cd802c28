//! Test-only helpers for building backlogs and PRD fixtures on disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::TempDir;

use crate::core::types::{BacklogEntry, PassState, Prd, Story};
use crate::io::prd_store::{load_prd, write_prd};

/// Create a story entry with an explicit priority and pass state.
pub fn story(id: &str, priority: i64, passes: PassState) -> BacklogEntry {
    Story::new(id)
        .with_priority(priority)
        .with_passes(passes)
        .into()
}

/// Create a story entry without a `priority` field.
pub fn unprioritized(id: &str, passes: PassState) -> BacklogEntry {
    Story::new(id).with_passes(passes).into()
}

/// Wrap entries in a PRD with no metadata.
pub fn prd_with(entries: Vec<BacklogEntry>) -> Prd {
    Prd::new(entries)
}

/// Write `prd` to `dir/prd.json` and return the path.
pub fn write_prd_fixture(dir: &Path, prd: &Prd) -> PathBuf {
    let path = dir.join("prd.json");
    write_prd(&path, prd).expect("write prd fixture");
    path
}

/// Reload the PRD at `path` and return the story with `id`.
pub fn load_story(path: &Path, id: &str) -> Story {
    load_prd(path)
        .expect("load prd")
        .stories()
        .iter()
        .filter_map(BacklogEntry::as_story)
        .find(|story| story.id() == Some(id))
        .cloned()
        .unwrap_or_else(|| panic!("story {id} missing"))
}

/// Temporary project directory for CLI-level tests.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp workspace")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a raw JSON document as `prd.json`.
    pub fn write_prd_json(&self, value: &Value) -> Result<PathBuf> {
        let path = self.path().join("prd.json");
        let mut buf = serde_json::to_string_pretty(value)?;
        buf.push('\n');
        fs::write(&path, buf).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    pub fn read_prd_json(&self) -> Result<Value> {
        let path = self.path().join("prd.json");
        let contents =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
    }
}
