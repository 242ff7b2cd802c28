//! Deterministic story selection over the backlog.

use crate::core::types::{BacklogEntry, Story};

/// A story picked for the next agent iteration, with its backlog index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectedStory<'a> {
    pub index: usize,
    pub story: &'a Story,
}

/// Outcome of [`select_stories`].
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a> {
    /// Number of stories the caller asked for.
    pub requested: usize,
    /// Picked stories in selection order (at most `requested`).
    pub picks: Vec<SelectedStory<'a>>,
    /// Eligible stories in the whole backlog, independent of `requested`.
    pub remaining: usize,
}

impl<'a> Selection<'a> {
    /// Ids of the picks, `None` for stories without a string id.
    pub fn ids(&self) -> Vec<Option<&'a str>> {
        self.picks.iter().map(|pick| pick.story.id()).collect()
    }

    /// Single-story view: the next story to work on.
    pub fn first(&self) -> Option<SelectedStory<'a>> {
        self.picks.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }
}

/// Stories not yet marked as passing, with their backlog indices.
fn eligible(backlog: &[BacklogEntry]) -> impl Iterator<Item = SelectedStory<'_>> {
    backlog
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| entry.as_story().map(|story| SelectedStory { index, story }))
        .filter(|pick| !pick.story.passes().is_passed())
}

/// Count of stories whose `passes` is not `true`.
pub fn eligible_count(backlog: &[BacklogEntry]) -> usize {
    eligible(backlog).count()
}

/// Pick up to `count` eligible stories ordered by `(priority, index)`.
pub fn select_stories(backlog: &[BacklogEntry], count: usize) -> Selection<'_> {
    let mut candidates: Vec<SelectedStory<'_>> = eligible(backlog).collect();
    let remaining = candidates.len();
    candidates.sort_by_key(|pick| (pick.story.priority_rank(), pick.index));
    candidates.truncate(count);
    Selection {
        requested: count,
        picks: candidates,
        remaining,
    }
}

/// The single highest-priority eligible story, if any.
pub fn next_story(backlog: &[BacklogEntry]) -> Option<SelectedStory<'_>> {
    select_stories(backlog, 1).first()
}
