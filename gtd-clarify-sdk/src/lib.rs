//! Shared vocabulary for the GTD clarify workflow.
//!
//! This crate defines the types exchanged between the clarify engine and its
//! hosts: the captured item being triaged, the action/project drafts the user
//! fills in, the outbound payload shapes, the `ClarifyApi` persistence
//! boundary, and the structured events the engine emits while a workflow is
//! running. The engine itself lives in the `gtd-clarify` crate.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

// Re-export async trait for convenience
pub use async_trait::async_trait;

/// A captured "stuff" item awaiting triage.
///
/// Owned by the server; the engine only ever reads it. `id` is the server's
/// identifier (also used as the pagination cursor elsewhere in the client).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Presentation hint carried through `start()`; the engine does not branch
/// on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClarifyMode {
    #[default]
    Inline,
    Modal,
    Fullscreen,
}

/// Position in the clarify flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClarifyStep {
    Idle,
    ActionableDecision,
    NonActionableTarget,
    ActionCountDecision,
    CreateAction,
    CreateProject,
    DoItNow,
    Done,
}

/// Destination for an item the user decided is not actionable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NonActionableTarget {
    Reference,
    Someday,
    Trash,
}

/// How a deferred action is anchored to the calendar.
///
/// `Start` is a plain defer-until date (`start_date` on the server);
/// `Scheduled` is a calendar block (`scheduled_date`, optionally with a time
/// and duration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferType {
    Start,
    Scheduled,
}

/// Accumulated form data for a to-be-created action.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionDraft {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub defer_type: Option<DeferType>,
    pub defer_date: Option<NaiveDate>,
    pub defer_time: Option<NaiveTime>,
    pub duration_minutes: Option<u32>,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
}

/// Accumulated form data for a to-be-created project.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectDraft {
    pub title: String,
    pub outcome: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// Partial update for an [`ActionDraft`]; `Some` fields overwrite, `None`
/// fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionDraftPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub defer_type: Option<Option<DeferType>>,
    pub defer_date: Option<Option<NaiveDate>>,
    pub defer_time: Option<Option<NaiveTime>>,
    pub duration_minutes: Option<Option<u32>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub due_time: Option<Option<NaiveTime>>,
}

/// Partial update for a [`ProjectDraft`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectDraftPatch {
    pub title: Option<String>,
    pub outcome: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl ActionDraft {
    /// Shallow-merge a patch into this draft.
    pub fn apply(&mut self, patch: ActionDraftPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(defer_type) = patch.defer_type {
            self.defer_type = defer_type;
        }
        if let Some(defer_date) = patch.defer_date {
            self.defer_date = defer_date;
        }
        if let Some(defer_time) = patch.defer_time {
            self.defer_time = defer_time;
        }
        if let Some(duration_minutes) = patch.duration_minutes {
            self.duration_minutes = duration_minutes;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(due_time) = patch.due_time {
            self.due_time = due_time;
        }
    }

    /// Build the outbound payload, dropping empty fields.
    pub fn to_payload(&self) -> ActionPayload {
        ActionPayload {
            title: self.title.clone(),
            description: non_empty(&self.description),
            tags: self.tags.clone(),
            defer_type: self.defer_type,
            defer_date: self.defer_date,
            defer_time: self.defer_time,
            duration_minutes: self.duration_minutes,
            due_date: self.due_date,
            due_time: self.due_time,
        }
    }
}

impl ProjectDraft {
    /// Shallow-merge a patch into this draft.
    pub fn apply(&mut self, patch: ProjectDraftPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(outcome) = patch.outcome {
            self.outcome = outcome;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
    }

    /// Build the outbound payload, dropping empty fields.
    pub fn to_payload(&self) -> ProjectPayload {
        ProjectPayload {
            title: self.title.clone(),
            outcome: non_empty(&self.outcome),
            description: non_empty(&self.description),
            tags: self.tags.clone(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Wire shape for `create_action`.
///
/// Fields the user never filled in are omitted from the JSON entirely, never
/// sent as explicit nulls — the server treats absence and null differently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defer_type: Option<DeferType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defer_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defer_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_time: Option<NaiveTime>,
}

/// Wire shape for `create_project`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPayload {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
}

/// Server record for a created action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Server record for a created project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Human-readable description of what `confirm()` would do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmSummary {
    pub action: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Structured events emitted by the engine while a workflow is running
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClarifyEvent {
    /// A new workflow started for a captured item
    WorkflowStarted { item_id: String },
    /// The engine moved to a new step
    StepChanged {
        from: ClarifyStep,
        to: ClarifyStep,
    },
    /// A commit was dispatched to the persistence boundary
    CommitStarted { item_id: String, action: String },
    /// The commit succeeded and the workflow is done
    CommitSucceeded { item_id: String, action: String },
    /// The commit failed; the workflow state is preserved for retry
    CommitFailed { item_id: String, error: String },
    /// The workflow was cancelled before committing
    WorkflowCancelled { item_id: Option<String> },
}

impl ClarifyEvent {
    /// Emit this event to stderr as a structured line for host parsing.
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            use std::io::Write;
            eprintln!("__GTD_EVENT__:{}", json);
            let _ = std::io::stderr().flush();
        }
    }
}

/// Result type for persistence-boundary operations
pub type ApiResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Persistence boundary the clarify engine commits through.
///
/// One method per disposition; the engine invokes exactly one of them per
/// completed workflow run. HTTP/REST is the production binding, but the
/// engine only depends on this trait.
#[async_trait]
pub trait ClarifyApi: Send + Sync {
    /// File the item as reference material
    async fn file_as_reference(&self, item_id: &str) -> ApiResult<()>;

    /// Move the item to the someday/maybe bucket
    async fn move_to_someday(&self, item_id: &str) -> ApiResult<()>;

    /// Move the item to the trash
    async fn move_to_trash(&self, item_id: &str) -> ApiResult<()>;

    /// Turn the item into a single next action
    async fn create_action(
        &self,
        item_id: &str,
        payload: &ActionPayload,
    ) -> ApiResult<ActionRecord>;

    /// Turn the item into a multi-step project
    async fn create_project(
        &self,
        item_id: &str,
        payload: &ProjectPayload,
    ) -> ApiResult<ProjectRecord>;

    /// Complete the item immediately (two-minute rule)
    async fn complete_immediately(&self, item_id: &str) -> ApiResult<()>;

    /// Tell the stats collaborator that counts changed
    async fn notify_stats_changed(&self) -> ApiResult<()>;
}
