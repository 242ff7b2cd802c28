//! Shared deterministic types for the ralph core.
//!
//! The PRD is kept as an ordered JSON object so that metadata and story fields
//! the core does not interpret survive a load/save cycle untouched. Typed views
//! (`Story`, `PassState`) are derived from that raw data once at load time and
//! kept in sync by the setters.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::core::error::{CoreError, CoreResult};

/// PRD key holding the backlog array.
pub const STORIES_KEY: &str = "userStories";

/// Priority assigned to stories whose `priority` is absent or non-numeric.
pub const LOWEST_PRIORITY: i64 = i64::MAX;

/// Tri-state pass flag for a story or a parsed result.
///
/// `Unknown` means "not stated" and is never conflated with `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassState {
    #[default]
    Unknown,
    Passed,
    Failed,
}

impl PassState {
    pub fn from_bool(passes: bool) -> Self {
        if passes { Self::Passed } else { Self::Failed }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Passed => Some(true),
            Self::Failed => Some(false),
        }
    }

    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }

    pub fn is_passed(self) -> bool {
        self == Self::Passed
    }

    /// Interpret a JSON value: only real booleans are known states.
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Bool(passes)) => Self::from_bool(*passes),
            _ => Self::Unknown,
        }
    }
}

impl Serialize for PassState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_bool() {
            Some(passes) => serializer.serialize_bool(passes),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for PassState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json(Some(&value)))
    }
}

/// Tolerant boolean lexicon used for agent-supplied `passes` attributes.
///
/// `true/1/yes/y` and `false/0/no/n` (case-insensitive, trimmed); anything
/// else is `Unknown`.
pub fn parse_pass_state(raw: &str) -> PassState {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => PassState::Passed,
        "false" | "0" | "no" | "n" => PassState::Failed,
        _ => PassState::Unknown,
    }
}

/// Strict variant of [`parse_pass_state`] for flags that require a value.
pub fn parse_bool_strict(raw: &str) -> CoreResult<bool> {
    parse_pass_state(raw)
        .as_bool()
        .ok_or_else(|| CoreError::InvalidInput("passes must be true/false".to_string()))
}

/// A backlog story: typed view over the raw JSON object.
///
/// Every object in the backlog is a story, even one without a string `id`:
/// it is still selectable work, it just cannot be addressed by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Story {
    id: Option<String>,
    priority: Option<i64>,
    passes: PassState,
    notes: String,
    fields: Map<String, Value>,
}

impl Story {
    /// Build a story with only an id (test fixtures, programmatic backlogs).
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let mut fields = Map::new();
        fields.insert("id".to_string(), Value::String(id.clone()));
        Self {
            id: Some(id),
            priority: None,
            passes: PassState::Unknown,
            notes: String::new(),
            fields,
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self.fields
            .insert("priority".to_string(), Value::from(priority));
        self
    }

    pub fn with_passes(mut self, passes: PassState) -> Self {
        if let Some(flag) = passes.as_bool() {
            self.set_passes(flag);
        }
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.set_notes(notes);
        self
    }

    /// Build the typed view of a story object. Only a string `id` is usable
    /// for lookups; any other value stays in the raw fields untouched.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let id = match fields.get("id") {
            Some(Value::String(id)) => Some(id.clone()),
            _ => None,
        };
        let priority = fields.get("priority").and_then(coerce_priority);
        let passes = PassState::from_json(fields.get("passes"));
        let notes = match fields.get("notes") {
            Some(Value::String(notes)) => notes.clone(),
            _ => String::new(),
        };
        Self {
            id,
            priority,
            passes,
            notes,
            fields,
        }
    }

    /// The story's id, when the document gives it as a string.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The `id` value exactly as stored (`null` when absent).
    pub fn raw_id(&self) -> Value {
        self.fields.get("id").cloned().unwrap_or(Value::Null)
    }

    /// Numeric priority, if the story carries one.
    pub fn priority(&self) -> Option<i64> {
        self.priority
    }

    /// Sort key: lower is more urgent; missing priorities sort last.
    pub fn priority_rank(&self) -> i64 {
        self.priority.unwrap_or(LOWEST_PRIORITY)
    }

    pub fn passes(&self) -> PassState {
        self.passes
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Raw JSON fields, including ones the core does not interpret.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn set_passes(&mut self, passes: bool) {
        self.passes = PassState::from_bool(passes);
        self.fields
            .insert("passes".to_string(), Value::Bool(passes));
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
        self.fields
            .insert("notes".to_string(), Value::String(self.notes.clone()));
    }
}

impl Serialize for Story {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Coerce a JSON priority the way the PRD tooling always has: integers as-is,
/// finite floats truncated, booleans as 0/1, integer strings parsed.
fn coerce_priority(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|float| float.is_finite())
                .map(|float| float.trunc() as i64)
        }),
        Value::Bool(flag) => Some(i64::from(*flag)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// One element of the backlog array.
///
/// Entries that are not JSON objects keep their slot (and therefore the
/// indices of later stories) but are never selected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BacklogEntry {
    Story(Story),
    Opaque(Value),
}

impl BacklogEntry {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(fields) => Self::Story(Story::from_fields(fields)),
            other => Self::Opaque(other),
        }
    }

    pub fn as_story(&self) -> Option<&Story> {
        match self {
            Self::Story(story) => Some(story),
            Self::Opaque(_) => None,
        }
    }

    pub fn as_story_mut(&mut self) -> Option<&mut Story> {
        match self {
            Self::Story(story) => Some(story),
            Self::Opaque(_) => None,
        }
    }
}

impl From<Story> for BacklogEntry {
    fn from(story: Story) -> Self {
        Self::Story(story)
    }
}

/// In-memory PRD document: backlog plus passthrough metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Prd {
    stories: Vec<BacklogEntry>,
    fields: Map<String, Value>,
}

impl Prd {
    /// Build a PRD holding only a backlog.
    pub fn new(stories: Vec<BacklogEntry>) -> Self {
        let mut fields = Map::new();
        fields.insert(STORIES_KEY.to_string(), Value::Array(Vec::new()));
        Self { stories, fields }
    }

    /// Interpret a parsed JSON document.
    ///
    /// The root must be an object and `userStories`, when present, an array.
    pub fn from_value(value: Value) -> CoreResult<Self> {
        let Value::Object(mut fields) = value else {
            return Err(CoreError::InvalidInput(
                "PRD root must be a JSON object".to_string(),
            ));
        };
        let stories = match fields.get_mut(STORIES_KEY) {
            None => Vec::new(),
            Some(Value::Array(items)) => std::mem::take(items)
                .into_iter()
                .map(BacklogEntry::from_value)
                .collect(),
            Some(_) => {
                return Err(CoreError::InvalidInput(format!(
                    "PRD field '{STORIES_KEY}' must be an array"
                )));
            }
        };
        Ok(Self { stories, fields })
    }

    pub fn stories(&self) -> &[BacklogEntry] {
        &self.stories
    }

    /// First story with `id`, if any. Duplicate ids are not an error.
    pub fn story_mut(&mut self, id: &str) -> Option<&mut Story> {
        self.stories
            .iter_mut()
            .filter_map(BacklogEntry::as_story_mut)
            .find(|story| story.id() == Some(id))
    }

    /// Top-level metadata value the core does not interpret.
    pub fn metadata(&self, key: &str) -> Option<&Value> {
        if key == STORIES_KEY {
            return None;
        }
        self.fields.get(key)
    }
}

impl Serialize for Prd {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, value) in &self.fields {
            if key == STORIES_KEY {
                map.serialize_entry(key, &self.stories)?;
            } else {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

/// Structured outcome for one story, parsed from agent output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryResult {
    pub id: String,
    pub passes: PassState,
    pub notes: String,
}

impl StoryResult {
    pub fn new(id: impl Into<String>, passes: PassState, notes: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            passes,
            notes: notes.into(),
        }
    }

    /// How much a record tells us: notes weigh 2, a stated pass flag 1.
    pub fn informativeness(&self) -> u8 {
        let mut score = 0;
        if !self.notes.is_empty() {
            score += 2;
        }
        if self.passes.is_known() {
            score += 1;
        }
        score
    }
}
