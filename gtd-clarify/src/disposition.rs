//! Planned disposition for a clarify workflow.
//!
//! `confirm()` and `getConfirmSummary()` must branch identically, so both are
//! driven by a single [`Disposition`] value computed once from the current
//! decisions. The summary renders it; the commit path dispatches it.

use gtd_clarify_sdk::{
    ActionDraft, ActionPayload, ClarifyApi, ConfirmSummary, NonActionableTarget, ProjectDraft,
    ProjectPayload,
};

/// The single external write a completed workflow run will perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    FileAsReference,
    MoveToSomeday,
    MoveToTrash,
    CreateAction(ActionPayload),
    CreateProject(ProjectPayload),
}

/// Why no disposition could be computed from the current decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispositionError {
    /// The actionable decision has not been made yet
    Undecided,
    /// The item is not actionable but no target was chosen
    NoTarget,
    /// The item is actionable but the action-count decision is missing
    NoActionCount,
    /// The draft on the chosen branch has no title
    MissingTitle(&'static str),
}

impl std::fmt::Display for DispositionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispositionError::Undecided => write!(f, "Decide whether the item is actionable"),
            DispositionError::NoTarget => write!(f, "Choose where the item should go"),
            DispositionError::NoActionCount => {
                write!(f, "Decide whether this is a single action or a project")
            }
            DispositionError::MissingTitle(kind) => write!(f, "The {} needs a title", kind),
        }
    }
}

impl std::error::Error for DispositionError {}

impl Disposition {
    /// Compute the disposition implied by the current decisions and drafts.
    pub fn plan(
        is_actionable: Option<bool>,
        target: Option<NonActionableTarget>,
        is_single_action: Option<bool>,
        action_draft: &ActionDraft,
        project_draft: &ProjectDraft,
    ) -> Result<Self, DispositionError> {
        match is_actionable {
            None => Err(DispositionError::Undecided),
            Some(false) => match target {
                None => Err(DispositionError::NoTarget),
                Some(NonActionableTarget::Reference) => Ok(Disposition::FileAsReference),
                Some(NonActionableTarget::Someday) => Ok(Disposition::MoveToSomeday),
                Some(NonActionableTarget::Trash) => Ok(Disposition::MoveToTrash),
            },
            Some(true) => match is_single_action {
                None => Err(DispositionError::NoActionCount),
                Some(true) => {
                    if action_draft.title.is_empty() {
                        return Err(DispositionError::MissingTitle("action"));
                    }
                    Ok(Disposition::CreateAction(action_draft.to_payload()))
                }
                Some(false) => {
                    if project_draft.title.is_empty() {
                        return Err(DispositionError::MissingTitle("project"));
                    }
                    Ok(Disposition::CreateProject(project_draft.to_payload()))
                }
            },
        }
    }

    /// Short verb phrase for event lines and summaries.
    pub fn action_label(&self) -> &'static str {
        match self {
            Disposition::FileAsReference => "Move to Reference",
            Disposition::MoveToSomeday => "Move to Someday",
            Disposition::MoveToTrash => "Delete",
            Disposition::CreateAction(_) => "Create Action",
            Disposition::CreateProject(_) => "Create Project",
        }
    }

    /// Render the user-facing confirmation summary for this disposition.
    pub fn summary(&self) -> ConfirmSummary {
        match self {
            Disposition::FileAsReference => ConfirmSummary {
                action: self.action_label().to_string(),
                description: "This item will be saved as reference material.".to_string(),
                details: None,
            },
            Disposition::MoveToSomeday => ConfirmSummary {
                action: self.action_label().to_string(),
                description: "This item will be saved for future consideration.".to_string(),
                details: None,
            },
            Disposition::MoveToTrash => ConfirmSummary {
                action: self.action_label().to_string(),
                description: "This item will be permanently deleted.".to_string(),
                details: None,
            },
            Disposition::CreateAction(payload) => ConfirmSummary {
                action: self.action_label().to_string(),
                description: format!("Create action: \"{}\"", payload.title),
                details: serde_json::to_value(payload).ok(),
            },
            Disposition::CreateProject(payload) => ConfirmSummary {
                action: self.action_label().to_string(),
                description: format!("Create project: \"{}\"", payload.title),
                details: serde_json::to_value(payload).ok(),
            },
        }
    }

    /// Perform the single external write this disposition stands for.
    pub async fn dispatch(
        &self,
        api: &dyn ClarifyApi,
        item_id: &str,
    ) -> gtd_clarify_sdk::ApiResult<()> {
        match self {
            Disposition::FileAsReference => api.file_as_reference(item_id).await,
            Disposition::MoveToSomeday => api.move_to_someday(item_id).await,
            Disposition::MoveToTrash => api.move_to_trash(item_id).await,
            Disposition::CreateAction(payload) => {
                api.create_action(item_id, payload).await.map(|_| ())
            }
            Disposition::CreateProject(payload) => {
                api.create_project(item_id, payload).await.map(|_| ())
            }
        }
    }
}
