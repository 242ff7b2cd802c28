//! Story selection and agent-output parsing for autonomous agent loops.
//!
//! Reads the PRD (`prd.json` by default) to pick the next stories, extracts
//! tagged blocks from agent output, and folds per-story results back into the
//! PRD. Machine-readable output goes to stdout; diagnostics go to stderr.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing::warn;

use ralph::apply::{ApplyRequest, apply_transcript};
use ralph::core::error::CoreError;
use ralph::core::results::parse_story_results;
use ralph::core::tag::extract_tag;
use ralph::core::types::parse_bool_strict;
use ralph::exit_codes;
use ralph::io::config::{DEFAULT_CONFIG_PATH, RalphConfig, init_config, load_config};
use ralph::io::input::read_text;
use ralph::io::prd_store::ensure_prd_exists;
use ralph::io::progress_log::append_entry;
use ralph::logging;
use ralph::select::select_from_path;
use ralph::update::{NotesOptions, set_notes_at_path, set_state_at_path};

#[derive(Parser)]
#[command(
    name = "ralph",
    version,
    about = "Pick the next PRD stories and fold agent results back in"
)]
struct Cli {
    /// Config file (default: `.ralph/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file (`.ralph/config.toml` unless `--config`).
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the next stories to work on as JSON.
    Select {
        /// PRD file (default from config).
        #[arg(long)]
        prd: Option<PathBuf>,
        /// Number of stories to select (default from config).
        #[arg(long, allow_negative_numbers = true)]
        count: Option<i64>,
        /// Also write the report to this file.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Pretty-print JSON output.
        #[arg(long)]
        pretty: bool,
    },
    /// Print the content of the first `<TAG>...</TAG>` block on stdin.
    ExtractTag {
        /// Tag name without brackets, e.g. `ralph_progress`.
        #[arg(long)]
        tag: String,
    },
    /// Parse story results from agent output on stdin and print them as JSON.
    ParseResults {
        /// Story credited by a legacy `<ralph_story_pass/>` marker.
        #[arg(long)]
        default_id: Option<String>,
    },
    /// Parse story results from agent output and merge them into the PRD.
    ApplyResults {
        #[arg(long)]
        prd: Option<PathBuf>,
        #[arg(long)]
        default_id: Option<String>,
        /// Read agent output from this file instead of stdin.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Replace story notes instead of appending.
        #[arg(long)]
        replace_notes: bool,
        /// Do not prefix appended notes with a timestamp.
        #[arg(long)]
        no_timestamp: bool,
    },
    /// Set a story's `passes` flag.
    SetState {
        #[arg(long)]
        prd: Option<PathBuf>,
        /// Story id, e.g. `US-001`.
        #[arg(long)]
        id: String,
        /// true/false (also yes/no, 1/0, y/n).
        #[arg(long, action = ArgAction::Set, value_parser = parse_bool_strict)]
        passes: bool,
    },
    /// Replace or append a story's notes.
    SetNotes {
        #[arg(long)]
        prd: Option<PathBuf>,
        #[arg(long)]
        id: String,
        /// Notes text. Read from stdin when omitted.
        #[arg(long)]
        notes: Option<String>,
        /// Append to existing notes instead of replacing them.
        #[arg(long)]
        append: bool,
        /// Prefix appended notes with a UTC timestamp.
        #[arg(long)]
        timestamp: bool,
    },
    /// Append an entry to the progress log.
    AppendProgress {
        /// Log file (default from config).
        #[arg(long)]
        log: Option<PathBuf>,
        /// Entry text. Read from stdin when neither this nor `--text-file` is given.
        #[arg(long, conflicts_with = "text_file")]
        text: Option<String>,
        /// File containing the entry text.
        #[arg(long)]
        text_file: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    // `init` must work even when the existing config is broken.
    let cfg = if matches!(cli.command, Command::Init { .. }) {
        RalphConfig::default()
    } else {
        load_config(&config_path)?
    };
    match cli.command {
        Command::Init { force } => cmd_init(&config_path, force),
        Command::Select {
            prd,
            count,
            out,
            pretty,
        } => cmd_select(&cfg, prd, count, out.as_deref(), pretty),
        Command::ExtractTag { tag } => cmd_extract_tag(&tag),
        Command::ParseResults { default_id } => cmd_parse_results(default_id.as_deref()),
        Command::ApplyResults {
            prd,
            default_id,
            input,
            replace_notes,
            no_timestamp,
        } => {
            let prd = prd.unwrap_or_else(|| cfg.prd_path.clone());
            let transcript = read_text(input.as_deref())?;
            let outcome = apply_transcript(&ApplyRequest {
                prd_path: &prd,
                transcript: &transcript,
                default_id: normalize_id(default_id.as_deref()),
                notes: NotesOptions {
                    append: cfg.notes.append && !replace_notes,
                    timestamp: cfg.notes.timestamp && !no_timestamp,
                },
            })?;
            emit(&to_json(&outcome, false)?)?;
            Ok(exit_codes::OK)
        }
        Command::SetState { prd, id, passes } => {
            let prd = prd.unwrap_or_else(|| cfg.prd_path.clone());
            set_state_at_path(&prd, &id, passes)?;
            emit(&format!("Updated story {id} passes={passes} in {}", prd.display()))?;
            Ok(exit_codes::OK)
        }
        Command::SetNotes {
            prd,
            id,
            notes,
            append,
            timestamp,
        } => {
            let prd = prd.unwrap_or_else(|| cfg.prd_path.clone());
            ensure_prd_exists(&prd)?;
            let notes = match notes {
                Some(notes) => notes,
                None => read_text(None)?,
            };
            if notes.trim().is_empty() {
                warn!(id = %id, "empty notes; PRD left unchanged");
                return Ok(exit_codes::OK);
            }
            set_notes_at_path(&prd, &id, &notes, NotesOptions { append, timestamp })?;
            Ok(exit_codes::OK)
        }
        Command::AppendProgress {
            log,
            text,
            text_file,
        } => {
            let log = log.unwrap_or_else(|| cfg.progress_log.clone());
            let entry = match (text, text_file) {
                (_, Some(path)) => read_text(Some(&path))?,
                (Some(text), None) => text,
                (None, None) => read_text(None)?,
            };
            append_entry(&log, &entry)?;
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    if init_config(config_path, force)? {
        emit(&format!("Wrote {}", config_path.display()))?;
    } else {
        warn!(path = %config_path.display(), "config already exists; use --force to overwrite");
    }
    Ok(exit_codes::OK)
}

fn cmd_select(
    cfg: &RalphConfig,
    prd: Option<PathBuf>,
    count: Option<i64>,
    out: Option<&Path>,
    pretty: bool,
) -> Result<i32> {
    let prd = prd.unwrap_or_else(|| cfg.prd_path.clone());
    let count = count.unwrap_or_else(|| i64::from(cfg.selection.batch_size));
    let count = usize::try_from(count).unwrap_or(0);
    let report = select_from_path(&prd, count)?;
    let text = to_json(&report, pretty)?;
    if let Some(out) = out {
        write_output(out, &text)?;
    }
    emit(&text)?;
    Ok(exit_codes::OK)
}

fn cmd_extract_tag(tag: &str) -> Result<i32> {
    let text = read_text(None)?;
    match extract_tag(&text, tag)? {
        Some(content) => {
            emit(content)?;
            Ok(exit_codes::OK)
        }
        None => Ok(exit_codes::NOT_FOUND),
    }
}

fn cmd_parse_results(default_id: Option<&str>) -> Result<i32> {
    let text = read_text(None)?;
    let results = parse_story_results(&text, normalize_id(default_id));
    emit(&to_json(&results, false)?)?;
    Ok(exit_codes::OK)
}

/// Blank ids given on the command line count as absent.
fn normalize_id(id: Option<&str>) -> Option<&str> {
    id.map(str::trim).filter(|id| !id.is_empty())
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    text.context("serialize json")
}

fn write_output(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::write(path, format!("{text}\n")).with_context(|| format!("write {}", path.display()))
}

/// Print a line to stdout; a closed pipe (e.g. `| head`) is not an error.
fn emit(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    match writeln!(stdout, "{text}").and_then(|()| stdout.flush()) {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other.context("write stdout"),
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err
        .chain()
        .find_map(|cause| cause.downcast_ref::<CoreError>())
    {
        Some(CoreError::NotFound(_)) => exit_codes::NOT_FOUND,
        _ => exit_codes::INVALID,
    }
}
