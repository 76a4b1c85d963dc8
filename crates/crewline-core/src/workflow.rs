// ABOUTME: Data types for sequential crew workflows: steps, step results, and run records.
// ABOUTME: Also holds the free-text hand-off context that carries earlier results to later agents.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use ulid::Ulid;

/// One unit of work in a workflow: which agent runs which task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowStep {
    pub agent: String,
    pub task: String,
}

impl WorkflowStep {
    pub fn new(agent: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            task: task.into(),
        }
    }
}

/// The outcome of one step. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    pub task: String,
    pub result: String,
    pub timestamp: DateTime<Utc>,
}

impl StepResult {
    /// Capture a result stamped with the current time.
    pub fn new(task: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            result: result.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Key under which a step's result is recorded: `step_<index>_<agent>`, 1-based.
pub fn step_key(index: usize, agent: &str) -> String {
    format!("step_{}_{}", index, agent)
}

/// Step results in execution order, addressable by step key.
///
/// Serializes as a JSON object whose keys appear in step order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowResults {
    entries: Vec<(String, StepResult)>,
}

impl WorkflowResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a result under `key`, replacing an earlier entry with the same key.
    pub fn insert(&mut self, key: String, result: StepResult) {
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = result;
        } else {
            self.entries.push((key, result));
        }
    }

    pub fn get(&self, key: &str) -> Option<&StepResult> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StepResult)> {
        self.entries.iter().map(|(k, r)| (k.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for WorkflowResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, result) in &self.entries {
            map.serialize_entry(key, result)?;
        }
        map.end()
    }
}

/// Free-text context handed from each finished step to the ones after it.
///
/// Append-only: every completed step adds one `<agent> completed: <result>`
/// line, so later agents see all earlier output in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandoffContext {
    text: String,
}

impl HandoffContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, agent: &str, result: &str) {
        self.text.push_str(&format!("\n{} completed: {}\n", agent, result));
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A finished workflow run, kept for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct WorkflowRecord {
    pub run_id: Ulid,
    pub workflow: Vec<WorkflowStep>,
    pub results: WorkflowResults,
    pub context: HandoffContext,
    pub timestamp: DateTime<Utc>,
}

impl WorkflowRecord {
    pub fn new(workflow: Vec<WorkflowStep>, results: WorkflowResults, context: HandoffContext) -> Self {
        Self {
            run_id: Ulid::new(),
            workflow,
            results,
            context,
            timestamp: Utc::now(),
        }
    }
}

/// Shorten `text` to at most `max_chars` characters for progress output,
/// appending `...` when something was cut. Splits on char boundaries.
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
