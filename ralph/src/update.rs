//! Single-story updates for `ralph set-state` and `ralph set-notes`.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::core::error::CoreError;
use crate::core::story_update::{NotesUpdate, set_story_passes, update_story_notes};
use crate::io::prd_store::{load_prd, write_prd};

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`, used to stamp appended notes.
pub fn utc_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Set `passes` for story `id` in the PRD at `prd_path`.
pub fn set_state_at_path(prd_path: &Path, id: &str, passes: bool) -> Result<()> {
    let mut prd = load_prd(prd_path)?;
    set_story_passes(&mut prd, id, passes)?;
    write_prd(prd_path, &prd)?;
    info!(id, passes, path = %prd_path.display(), "story state updated");
    Ok(())
}

/// Options for [`set_notes_at_path`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotesOptions {
    pub append: bool,
    pub timestamp: bool,
}

/// Replace or append notes for story `id` in the PRD at `prd_path`.
///
/// Blank notes fail with `CoreError::Empty` before the PRD is read.
pub fn set_notes_at_path(
    prd_path: &Path,
    id: &str,
    notes: &str,
    options: NotesOptions,
) -> Result<()> {
    if notes.trim().is_empty() {
        return Err(CoreError::Empty("empty notes text".to_string()).into());
    }
    let mut prd = load_prd(prd_path)?;
    let stamp = options.timestamp.then(utc_timestamp);
    let update = NotesUpdate {
        append: options.append,
        timestamp: stamp.as_deref(),
    };
    update_story_notes(&mut prd, id, notes, &update)?;
    write_prd(prd_path, &prd)?;
    info!(id, append = options.append, path = %prd_path.display(), "story notes updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PassState;
    use crate::test_support::{load_story, prd_with, story, write_prd_fixture};

    #[test]
    fn set_state_persists_flag() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_prd_fixture(temp.path(), &prd_with(vec![story("US-1", 1, PassState::Unknown)]));
        set_state_at_path(&path, "US-1", true).expect("set");
        assert_eq!(load_story(&path, "US-1").passes(), PassState::Passed);
    }

    #[test]
    fn set_state_on_unknown_story_leaves_file_alone() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_prd_fixture(temp.path(), &prd_with(vec![story("US-1", 1, PassState::Unknown)]));
        let before = std::fs::read_to_string(&path).expect("read");
        let err = set_state_at_path(&path, "US-2", true).expect_err("unknown");
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::NotFound(_))
        ));
        assert_eq!(std::fs::read_to_string(&path).expect("read"), before);
    }

    #[test]
    fn appended_notes_get_timestamp_line() {
        let temp = tempfile::tempdir().expect("tempdir");
        let prd = prd_with(vec![story("US-1", 1, PassState::Unknown)]);
        let path = write_prd_fixture(temp.path(), &prd);
        let options = NotesOptions {
            append: true,
            timestamp: true,
        };
        set_notes_at_path(&path, "US-1", "first", options).expect("notes");
        set_notes_at_path(&path, "US-1", "second", options).expect("notes");

        let notes = load_story(&path, "US-1").notes().to_string();
        let lines: Vec<&str> = notes.lines().collect();
        assert_eq!(lines[0], "first");
        assert_eq!(lines[1], "");
        assert!(lines[2].ends_with('Z') && lines[2].contains('T'), "{notes}");
        assert_eq!(lines[3], "second");
    }

    #[test]
    fn blank_notes_fail_before_reading_prd() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = set_notes_at_path(
            &temp.path().join("missing.json"),
            "US-1",
            "   ",
            NotesOptions::default(),
        )
        .expect_err("empty");
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::Empty(_))
        ));
    }
}
