//! Selection report for `ralph select`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::core::selector::select_stories;
use crate::core::types::{Prd, Story};
use crate::io::prd_store::load_prd;

/// Everything the agent loop needs to start the next iteration.
///
/// Field names are camelCase to match the PRD's own conventions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionReport {
    pub prd_path: String,
    pub project: Option<Value>,
    pub branch_name: Option<Value>,
    pub context_file: Option<Value>,
    pub log_file: Option<Value>,
    pub description: Option<Value>,
    pub requested_count: usize,
    pub remaining_stories: usize,
    /// Single-story view: index of the first pick.
    pub selected_index: Option<usize>,
    /// Single-story view: the first pick.
    pub selected_story: Option<Story>,
    pub selected_indices: Vec<usize>,
    /// Raw `id` values of the picks (`null` when a story has none).
    pub selected_ids: Vec<Value>,
    pub selected_stories: Vec<Story>,
}

/// Build a report for an in-memory PRD.
pub fn build_report(prd: &Prd, prd_path: &Path, count: usize) -> SelectionReport {
    let selection = select_stories(prd.stories(), count);
    let first = selection.first();
    SelectionReport {
        prd_path: prd_path.display().to_string(),
        project: prd.metadata("project").cloned(),
        branch_name: prd.metadata("branchName").cloned(),
        context_file: prd.metadata("contextFile").cloned(),
        log_file: prd.metadata("logFile").cloned(),
        description: prd.metadata("description").cloned(),
        requested_count: selection.requested,
        remaining_stories: selection.remaining,
        selected_index: first.map(|pick| pick.index),
        selected_story: first.map(|pick| pick.story.clone()),
        selected_indices: selection.picks.iter().map(|pick| pick.index).collect(),
        selected_ids: selection
            .picks
            .iter()
            .map(|pick| pick.story.raw_id())
            .collect(),
        selected_stories: selection
            .picks
            .iter()
            .map(|pick| pick.story.clone())
            .collect(),
    }
}

/// Load the PRD at `prd_path` and select the next `count` stories.
pub fn select_from_path(prd_path: &Path, count: usize) -> Result<SelectionReport> {
    let resolved = std::path::absolute(prd_path).unwrap_or_else(|_| prd_path.to_path_buf());
    let prd = load_prd(&resolved).with_context(|| "load prd for selection")?;
    let report = build_report(&prd, &resolved, count);
    info!(
        remaining = report.remaining_stories,
        selected = ?report.selected_ids,
        "stories selected"
    );
    Ok(report)
}
