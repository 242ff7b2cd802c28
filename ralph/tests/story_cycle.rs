//! End-to-end loop iterations through the library API: select the next
//! story, feed back simulated agent output, and select again until the
//! backlog is complete.

use ralph::apply::{ApplyRequest, apply_transcript};
use ralph::core::tag::extract_tag;
use ralph::io::progress_log::append_entry;
use ralph::select::select_from_path;
use ralph::test_support::TestWorkspace;
use ralph::update::NotesOptions;
use serde_json::json;

fn agent_output(id: &str) -> String {
    format!(
        "Implemented {id}.\n\
         <ralph_progress>finished {id}</ralph_progress>\n\
         <ralph_story_result id=\"{id}\" passes=\"true\">{id} done</ralph_story_result>\n"
    )
}

#[test]
fn loop_drains_backlog_in_priority_order() {
    let workspace = TestWorkspace::new().expect("workspace");
    let prd = workspace
        .write_prd_json(&json!({
            "project": "demo",
            "branchName": "ralph/demo",
            "userStories": [
                {"id": "US-3", "priority": "3", "passes": false},
                {"id": "US-1", "priority": 1, "passes": false},
                {"id": "US-2", "priority": 2.0, "passes": false},
                "a stray comment entry"
            ]
        }))
        .expect("write prd");
    let log = workspace.path().join("progress.txt");

    let mut order = Vec::new();
    loop {
        let report = select_from_path(&prd, 1).expect("select");
        let Some(story) = report.selected_story else {
            assert_eq!(report.remaining_stories, 0);
            break;
        };
        let id = story.id().expect("string id").to_string();
        let output = agent_output(&id);

        let progress = extract_tag(&output, "ralph_progress")
            .expect("valid tag")
            .expect("progress block");
        append_entry(&log, progress).expect("append progress");

        let outcome = apply_transcript(&ApplyRequest {
            prd_path: &prd,
            transcript: &output,
            default_id: Some(&id),
            notes: NotesOptions::default(),
        })
        .expect("apply");
        assert!(outcome.written);
        order.push(id);
        assert!(order.len() <= 3, "loop did not converge: {order:?}");
    }

    assert_eq!(order, ["US-1", "US-2", "US-3"]);
    let saved = workspace.read_prd_json().expect("read prd");
    assert_eq!(saved["branchName"], json!("ralph/demo"));
    assert_eq!(saved["userStories"][3], json!("a stray comment entry"));
    assert_eq!(saved["userStories"][0]["priority"], json!("3"));
    assert_eq!(saved["userStories"][1]["notes"], json!("US-1 done"));
    assert_eq!(
        std::fs::read_to_string(&log).expect("read log"),
        "\nfinished US-1\n\nfinished US-2\n\nfinished US-3\n"
    );
}

#[test]
fn failed_story_stays_selected() {
    let workspace = TestWorkspace::new().expect("workspace");
    let prd = workspace
        .write_prd_json(&json!({
            "userStories": [
                {"id": "US-1", "priority": 1, "passes": false},
                {"id": "US-2", "priority": 2, "passes": false}
            ]
        }))
        .expect("write prd");

    let output = r#"<ralph_story_result id="US-1" passes="false">blocked on fixtures</ralph_story_result>"#;
    let outcome = apply_transcript(&ApplyRequest {
        prd_path: &prd,
        transcript: output,
        default_id: None,
        notes: NotesOptions {
            append: true,
            timestamp: false,
        },
    })
    .expect("apply");
    assert_eq!(outcome.summary.passes_updated, vec!["US-1"]);

    let report = select_from_path(&prd, 2).expect("select");
    assert_eq!(report.selected_ids, ["US-1", "US-2"]);
    assert_eq!(report.selected_stories[0].notes(), "blocked on fixtures");
}
