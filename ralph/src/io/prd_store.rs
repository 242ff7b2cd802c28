//! PRD load/save helpers with schema validation.
//!
//! The document is read once and written once per command. Writes go through
//! a temp file + rename, but there is no locking: two processes updating the
//! same PRD concurrently can lose each other's changes, so callers must keep a
//! single writer per document.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use crate::core::error::CoreError;
use crate::core::types::Prd;

const PRD_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/prd.schema.json"
));

/// Load and validate a PRD from disk.
///
/// A missing file is reported as [`CoreError::NotFound`]; a document of the
/// wrong shape as [`CoreError::InvalidInput`].
pub fn load_prd(path: &Path) -> Result<Prd> {
    ensure_prd_exists(path)?;
    debug!(path = %path.display(), "loading prd");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read prd {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse prd {}", path.display()))?;
    validate_schema(&value).with_context(|| format!("validate prd {}", path.display()))?;
    let prd = Prd::from_value(value).with_context(|| format!("load prd {}", path.display()))?;
    debug!(stories = prd.stories().len(), "prd loaded");
    Ok(prd)
}

/// Fail with [`CoreError::NotFound`] unless a PRD file exists at `path`.
pub fn ensure_prd_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(CoreError::NotFound(format!("PRD file not found: {}", path.display())).into());
    }
    Ok(())
}

/// Atomically write a PRD (pretty JSON, trailing newline).
pub fn write_prd(path: &Path, prd: &Prd) -> Result<()> {
    debug!(path = %path.display(), "writing prd");
    let mut buf = serde_json::to_string_pretty(prd).context("serialize prd")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn validate_schema(prd: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(PRD_SCHEMA).context("parse prd schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if compiled.is_valid(prd) {
        return Ok(());
    }
    let messages = compiled
        .iter_errors(prd)
        .map(|err| err.to_string())
        .collect::<Vec<_>>();
    Err(CoreError::InvalidInput(format!(
        "prd schema validation failed: {}",
        messages.join("; ")
    ))
    .into())
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp prd {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace prd {}", path.display()))?;
    Ok(())
}
