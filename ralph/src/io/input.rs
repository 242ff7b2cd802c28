//! Read command input text from a file or stdin.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result};

/// Read all text from `path`, or from stdin when `path` is `None`.
///
/// Invalid UTF-8 is replaced rather than rejected: agent transcripts are
/// best-effort input.
pub fn read_text(path: Option<&Path>) -> Result<String> {
    let bytes = match path {
        Some(path) => fs::read(path).with_context(|| format!("read {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf).context("read stdin")?;
            buf
        }
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
