//! Append-only progress log written between agent iterations.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::error::CoreError;

/// Append `entry` to the log at `path`, separated from earlier entries by a
/// blank line.
///
/// The entry is trimmed; a blank entry is rejected with [`CoreError::Empty`]
/// and the log is left untouched. Parent directories are created on demand.
pub fn append_entry(path: &Path, entry: &str) -> Result<()> {
    let entry = entry.trim();
    if entry.is_empty() {
        return Err(CoreError::Empty("empty entry text".to_string()).into());
    }
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    debug!(path = %path.display(), bytes = entry.len(), "appending progress entry");
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log {}", path.display()))?;
    write!(file, "\n{entry}\n").with_context(|| format!("append log {}", path.display()))?;
    Ok(())
}
