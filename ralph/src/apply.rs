//! Merge agent output into the PRD for `ralph apply-results`.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use crate::core::results::parse_story_results;
use crate::core::story_update::{ApplySummary, NotesUpdate, apply_story_results};
use crate::core::types::StoryResult;
use crate::io::prd_store::{load_prd, write_prd};
use crate::update::{NotesOptions, utc_timestamp};

/// Inputs for [`apply_transcript`].
#[derive(Debug, Clone, Copy)]
pub struct ApplyRequest<'a> {
    pub prd_path: &'a Path,
    pub transcript: &'a str,
    /// Story credited by a legacy `<ralph_story_pass/>` marker.
    pub default_id: Option<&'a str>,
    pub notes: NotesOptions,
}

/// What `apply-results` parsed and changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyOutcome {
    pub results: Vec<StoryResult>,
    #[serde(flatten)]
    pub summary: ApplySummary,
    /// True if the PRD was rewritten.
    pub written: bool,
}

/// Parse `transcript`, merge the results, and save the PRD once.
///
/// The PRD is loaded before anything else so a malformed document aborts the
/// whole command; it is only rewritten when at least one story changed.
pub fn apply_transcript(request: &ApplyRequest<'_>) -> Result<ApplyOutcome> {
    let mut prd = load_prd(request.prd_path)?;
    let results = parse_story_results(request.transcript, request.default_id);
    if results.is_empty() {
        info!("no story results found in agent output");
    }

    let stamp = request.notes.timestamp.then(utc_timestamp);
    let update = NotesUpdate {
        append: request.notes.append,
        timestamp: stamp.as_deref(),
    };
    let summary = apply_story_results(&mut prd, &results, &update);
    if !summary.unknown_ids.is_empty() {
        warn!(ids = ?summary.unknown_ids, "results reference stories missing from the PRD");
    }

    let written = !summary.is_noop();
    if written {
        write_prd(request.prd_path, &prd)?;
    }
    info!(
        passes = ?summary.passes_updated,
        notes = ?summary.notes_updated,
        written,
        "story results applied"
    );
    Ok(ApplyOutcome {
        results,
        summary,
        written,
    })
}
