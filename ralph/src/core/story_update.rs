//! In-memory story mutations applied by callers after parsing agent output.

use serde::Serialize;
use tracing::debug;

use crate::core::error::{CoreError, CoreResult};
use crate::core::types::{Prd, Story, StoryResult};

/// How new notes are combined with a story's existing notes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotesUpdate<'a> {
    /// Append to non-empty existing notes instead of replacing them.
    pub append: bool,
    /// Line prefixed to appended notes (e.g. an ISO-8601 timestamp).
    pub timestamp: Option<&'a str>,
}

/// Ids touched by [`apply_story_results`], in result order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplySummary {
    /// Stories whose `passes` flag was written.
    pub passes_updated: Vec<String>,
    /// Stories whose notes were written.
    pub notes_updated: Vec<String>,
    /// Result ids with no matching story.
    pub unknown_ids: Vec<String>,
}

impl ApplySummary {
    pub fn is_noop(&self) -> bool {
        self.passes_updated.is_empty() && self.notes_updated.is_empty()
    }
}

/// Set `passes` on the first story with `id`.
pub fn set_story_passes(prd: &mut Prd, id: &str, passes: bool) -> CoreResult<()> {
    let story = find_story(prd, id)?;
    story.set_passes(passes);
    Ok(())
}

/// Replace or append to the notes of the first story with `id`.
///
/// Notes are trimmed first; blank notes are rejected with [`CoreError::Empty`].
pub fn update_story_notes(
    prd: &mut Prd,
    id: &str,
    notes: &str,
    update: &NotesUpdate<'_>,
) -> CoreResult<()> {
    let notes = notes.trim();
    if notes.is_empty() {
        return Err(CoreError::Empty("empty notes text".to_string()));
    }
    let story = find_story(prd, id)?;
    let merged = merge_notes(story.notes(), notes, update);
    story.set_notes(merged);
    Ok(())
}

/// Merge parsed results into the backlog.
///
/// Known pass flags overwrite the story's state and non-empty notes are
/// written via `update`. Results naming unknown stories are reported, not
/// fatal, so one stray id never blocks the rest.
pub fn apply_story_results(
    prd: &mut Prd,
    results: &[StoryResult],
    update: &NotesUpdate<'_>,
) -> ApplySummary {
    let mut summary = ApplySummary::default();
    for result in results {
        let Some(story) = prd.story_mut(&result.id) else {
            debug!(id = %result.id, "no story for parsed result");
            summary.unknown_ids.push(result.id.clone());
            continue;
        };
        if let Some(passes) = result.passes.as_bool() {
            story.set_passes(passes);
            summary.passes_updated.push(result.id.clone());
        }
        let notes = result.notes.trim();
        if !notes.is_empty() {
            let merged = merge_notes(story.notes(), notes, update);
            story.set_notes(merged);
            summary.notes_updated.push(result.id.clone());
        }
    }
    summary
}

fn find_story<'a>(prd: &'a mut Prd, id: &str) -> CoreResult<&'a mut Story> {
    prd.story_mut(id)
        .ok_or_else(|| CoreError::NotFound(format!("Story {id} not found in PRD")))
}

fn merge_notes(existing: &str, notes: &str, update: &NotesUpdate<'_>) -> String {
    let existing = existing.trim();
    if !update.append || existing.is_empty() {
        return notes.to_string();
    }
    let prefix = update
        .timestamp
        .map(|stamp| format!("{stamp}\n"))
        .unwrap_or_default();
    format!("{existing}\n\n{prefix}{notes}").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PassState;
    use crate::test_support::{prd_with, story};

    fn notes_of(prd: &Prd, index: usize) -> &str {
        prd.stories()[index].as_story().expect("story").notes()
    }

    #[test]
    fn set_passes_updates_first_matching_story() {
        let mut prd = prd_with(vec![
            story("US-1", 1, PassState::Unknown),
            story("US-1", 2, PassState::Unknown),
        ]);
        set_story_passes(&mut prd, "US-1", true).expect("set");
        assert_eq!(
            prd.stories()[0].as_story().expect("story").passes(),
            PassState::Passed
        );
        assert_eq!(
            prd.stories()[1].as_story().expect("story").passes(),
            PassState::Unknown
        );
    }

    #[test]
    fn unknown_story_is_not_found() {
        let mut prd = prd_with(vec![story("US-1", 1, PassState::Unknown)]);
        assert!(matches!(
            set_story_passes(&mut prd, "US-404", true),
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            update_story_notes(&mut prd, "US-404", "x", &NotesUpdate::default()),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn blank_notes_are_rejected_before_lookup() {
        let mut prd = prd_with(vec![story("US-1", 1, PassState::Unknown)]);
        assert!(matches!(
            update_story_notes(&mut prd, "US-404", "  \n", &NotesUpdate::default()),
            Err(CoreError::Empty(_))
        ));
    }

    #[test]
    fn replace_mode_overwrites_notes() {
        let mut prd = prd_with(vec![story("US-1", 1, PassState::Unknown)]);
        update_story_notes(&mut prd, "US-1", " first ", &NotesUpdate::default()).expect("notes");
        update_story_notes(&mut prd, "US-1", "second", &NotesUpdate::default()).expect("notes");
        assert_eq!(notes_of(&prd, 0), "second");
    }

    #[test]
    fn append_mode_joins_with_blank_line_and_timestamp() {
        let mut prd = prd_with(vec![story("US-1", 1, PassState::Unknown)]);
        let update = NotesUpdate {
            append: true,
            timestamp: Some("2026-01-02T03:04:05Z"),
        };
        update_story_notes(&mut prd, "US-1", "first", &update).expect("notes");
        assert_eq!(notes_of(&prd, 0), "first");
        update_story_notes(&mut prd, "US-1", "second", &update).expect("notes");
        assert_eq!(notes_of(&prd, 0), "first\n\n2026-01-02T03:04:05Z\nsecond");
    }

    #[test]
    fn apply_results_reports_each_change() {
        let mut prd = prd_with(vec![
            story("US-1", 1, PassState::Unknown),
            story("US-2", 2, PassState::Failed),
        ]);
        let results = vec![
            StoryResult::new("US-2", PassState::Passed, "done"),
            StoryResult::new("US-1", PassState::Unknown, "needs schema work"),
            StoryResult::new("US-9", PassState::Passed, ""),
        ];
        let summary = apply_story_results(&mut prd, &results, &NotesUpdate::default());
        assert_eq!(
            summary,
            ApplySummary {
                passes_updated: vec!["US-2".to_string()],
                notes_updated: vec!["US-2".to_string(), "US-1".to_string()],
                unknown_ids: vec!["US-9".to_string()],
            }
        );
        let first = prd.stories()[0].as_story().expect("story");
        assert_eq!(first.passes(), PassState::Unknown);
        assert_eq!(first.notes(), "needs schema work");
        let second = prd.stories()[1].as_story().expect("story");
        assert_eq!(second.passes(), PassState::Passed);
        assert_eq!(second.notes(), "done");
    }

    #[test]
    fn apply_results_with_nothing_known_is_noop() {
        let mut prd = prd_with(vec![story("US-1", 1, PassState::Unknown)]);
        let before = prd.clone();
        let summary = apply_story_results(
            &mut prd,
            &[StoryResult::new("US-1", PassState::Unknown, "")],
            &NotesUpdate::default(),
        );
        assert!(summary.is_noop());
        assert_eq!(prd, before);
    }
}
