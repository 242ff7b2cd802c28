//! Parse per-story outcomes from agent output.
//!
//! Three markers are recognised, each scanned over the whole text:
//!
//! 1. Full result blocks with notes and an explicit pass flag:
//!    `<ralph_story_result id="US-001" passes="true">notes</ralph_story_result>`
//! 2. Pass markers naming a story: `<ralph_story_pass id="US-001"/>`
//! 3. The legacy single-story marker `<ralph_story_pass/>`, attributed to a
//!    caller-supplied default id.
//!
//! Results for the same id are collapsed to the most informative record.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use tracing::debug;

use crate::core::markup::{OpenTag, attribute, find_close_tag, find_open_tag};
use crate::core::types::{PassState, StoryResult, parse_pass_state};

pub const RESULT_TAG: &str = "ralph_story_result";
pub const PASS_TAG: &str = "ralph_story_pass";

/// Parse every recognised marker in `text` and de-duplicate by id.
pub fn parse_story_results(text: &str, default_id: Option<&str>) -> Vec<StoryResult> {
    let mut raw = scan_result_blocks(text);
    raw.extend(scan_pass_markers(text));
    raw.extend(scan_legacy_marker(text, default_id));
    dedupe_results(raw)
}

/// All `<ralph_story_result>` blocks, in text order.
///
/// Blocks without a non-empty `id` are skipped; scanning resumes after each
/// closing tag so blocks never overlap.
pub fn scan_result_blocks(text: &str) -> Vec<StoryResult> {
    let mut results = Vec::new();
    let mut pos = 0;
    while let Some(open) = find_open_tag(text, pos, RESULT_TAG, |_| true) {
        let Some(close) = find_close_tag(text, open.end, RESULT_TAG) else {
            break;
        };
        pos = close.end;

        let id = attribute(open.attrs, "id").map(str::trim).unwrap_or_default();
        if id.is_empty() {
            debug!(offset = open.start, "skipping story result block without id");
            continue;
        }
        let passes = attribute(open.attrs, "passes")
            .map(parse_pass_state)
            .unwrap_or_default();
        let notes = text[open.end..close.start].trim();
        results.push(StoryResult::new(id, passes, notes));
    }
    results
}

/// All self-closing `<ralph_story_pass id="..."/>` markers, in text order.
pub fn scan_pass_markers(text: &str) -> Vec<StoryResult> {
    let mut results = Vec::new();
    let mut pos = 0;
    while let Some(marker) = find_open_tag(text, pos, PASS_TAG, OpenTag::is_self_closing) {
        let id = attribute(marker.attr_text(), "id")
            .map(str::trim)
            .filter(|id| !id.is_empty());
        if let Some(id) = id {
            results.push(StoryResult::new(id, PassState::Passed, ""));
        }
        pos = marker.end;
    }
    results
}

/// A single pass result for `default_id` if any bare `<ralph_story_pass/>`
/// appears. Without a (non-blank) default id the marker is ignored.
pub fn scan_legacy_marker(text: &str, default_id: Option<&str>) -> Option<StoryResult> {
    let default_id = default_id.map(str::trim).filter(|id| !id.is_empty())?;
    find_open_tag(text, 0, PASS_TAG, |marker| {
        marker.is_self_closing() && marker.attr_text().trim().is_empty()
    })?;
    Some(StoryResult::new(default_id, PassState::Passed, ""))
}

/// Collapse results to one per id.
///
/// The record with the highest [`StoryResult::informativeness`] wins; on a tie
/// the earliest record is kept. Output follows the first appearance of each id.
pub fn dedupe_results(raw: Vec<StoryResult>) -> Vec<StoryResult> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, StoryResult> = HashMap::new();
    for result in raw {
        match best.entry(result.id.clone()) {
            Entry::Vacant(slot) => {
                order.push(result.id.clone());
                slot.insert(result);
            }
            Entry::Occupied(mut slot) => {
                if result.informativeness() > slot.get().informativeness() {
                    slot.insert(result);
                }
            }
        }
    }
    order
        .into_iter()
        .filter_map(|id| best.remove(&id))
        .collect()
}
