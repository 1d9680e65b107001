//! The clarify workflow engine.
//!
//! One engine instance drives one captured item at a time through the GTD
//! clarify decision tree until it is committed as exactly one of: reference
//! material, a someday item, trash, a single next action, a project, or an
//! immediately-completed item (two-minute rule). The application's
//! composition root owns the single instance; only one workflow may be
//! active at a time.
//!
//! Hosts read state by pulling a [`WorkflowSnapshot`] or by subscribing to
//! the broadcast stream of [`ClarifyEvent`]s. The engine never touches the
//! captured item itself except through the [`ClarifyApi`] boundary at commit
//! time.

use std::sync::{Arc, Mutex};

use gtd_clarify_sdk::{
    ActionDraft, ActionDraftPatch, CapturedItem, ClarifyApi, ClarifyEvent, ClarifyMode,
    ClarifyStep, ConfirmSummary, NonActionableTarget, ProjectDraft, ProjectDraftPatch,
};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::disposition::Disposition;
use crate::stats::StatsNotifier;

const EVENT_CHANNEL_CAPACITY: usize = 64;
const GENERIC_COMMIT_ERROR: &str = "Failed to process item";

/// Full workflow state behind the engine's mutex.
///
/// `run` stamps each workflow run so that a commit response that arrives
/// after a `cancel()` or a new `start()` is recognized as stale and dropped
/// instead of clobbering the fresh state.
struct WorkflowState {
    run: Uuid,
    step: ClarifyStep,
    mode: ClarifyMode,
    stuff_item: Option<CapturedItem>,
    is_actionable: Option<bool>,
    non_actionable_target: Option<NonActionableTarget>,
    is_single_action: Option<bool>,
    action_draft: ActionDraft,
    project_draft: ProjectDraft,
    loading: bool,
    last_error: Option<String>,
}

impl WorkflowState {
    fn idle() -> Self {
        Self {
            run: Uuid::new_v4(),
            step: ClarifyStep::Idle,
            mode: ClarifyMode::Inline,
            stuff_item: None,
            is_actionable: None,
            non_actionable_target: None,
            is_single_action: None,
            action_draft: ActionDraft::default(),
            project_draft: ProjectDraft::default(),
            loading: false,
            last_error: None,
        }
    }

    fn plan(&self) -> Result<Disposition, crate::disposition::DispositionError> {
        Disposition::plan(
            self.is_actionable,
            self.non_actionable_target,
            self.is_single_action,
            &self.action_draft,
            &self.project_draft,
        )
    }
}

/// Point-in-time view of the workflow state, for hosts that poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowSnapshot {
    pub step: ClarifyStep,
    pub mode: ClarifyMode,
    pub stuff_item: Option<CapturedItem>,
    pub is_actionable: Option<bool>,
    pub non_actionable_target: Option<NonActionableTarget>,
    pub is_single_action: Option<bool>,
    pub action_draft: ActionDraft,
    pub project_draft: ProjectDraft,
    pub loading: bool,
    pub last_error: Option<String>,
}

/// Finite-state controller for the clarify workflow.
pub struct ClarifyEngine {
    api: Arc<dyn ClarifyApi>,
    stats: StatsNotifier,
    state: Mutex<WorkflowState>,
    events_tx: broadcast::Sender<ClarifyEvent>,
}

impl ClarifyEngine {
    pub fn new(api: Arc<dyn ClarifyApi>) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            stats: StatsNotifier::new(Arc::clone(&api)),
            api,
            state: Mutex::new(WorkflowState::idle()),
            events_tx,
        }
    }

    /// Subscribe to the engine's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ClarifyEvent> {
        self.events_tx.subscribe()
    }

    /// Current workflow state as a cloneable snapshot.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        let st = self.state.lock().unwrap();
        WorkflowSnapshot {
            step: st.step,
            mode: st.mode,
            stuff_item: st.stuff_item.clone(),
            is_actionable: st.is_actionable,
            non_actionable_target: st.non_actionable_target,
            is_single_action: st.is_single_action,
            action_draft: st.action_draft.clone(),
            project_draft: st.project_draft.clone(),
            loading: st.loading,
            last_error: st.last_error.clone(),
        }
    }

    /// Begin clarifying a captured item.
    ///
    /// Resets all workflow state (discarding any uncommitted previous run)
    /// and pre-fills both drafts from the item. Returns `false` without
    /// touching anything if a commit is currently in flight; the caller must
    /// wait for it to settle or `cancel()` first.
    pub fn start(&self, item: CapturedItem, mode: ClarifyMode) -> bool {
        let event = {
            let mut st = self.state.lock().unwrap();
            if st.loading {
                return false;
            }

            *st = WorkflowState::idle();
            st.mode = mode;
            st.step = ClarifyStep::ActionableDecision;
            st.action_draft.title = item.title.clone();
            st.action_draft.description = item.description.clone();
            st.project_draft.title = item.title.clone();
            st.project_draft.description = item.description.clone();

            let event = ClarifyEvent::WorkflowStarted {
                item_id: item.id.clone(),
            };
            st.stuff_item = Some(item);
            event
        };
        self.publish(event);
        true
    }

    /// Record whether the item requires real-world action.
    ///
    /// No-op unless the workflow is at the actionable decision.
    pub fn set_actionable(&self, actionable: bool) {
        self.transition(|st| {
            if st.step != ClarifyStep::ActionableDecision {
                return None;
            }
            st.is_actionable = Some(actionable);
            let to = if actionable {
                ClarifyStep::ActionCountDecision
            } else {
                ClarifyStep::NonActionableTarget
            };
            Some(to)
        });
    }

    /// Record where a non-actionable item should go. The step does not
    /// advance; the caller reviews the summary and calls `confirm()`.
    pub fn set_non_actionable_target(&self, target: NonActionableTarget) {
        let mut st = self.state.lock().unwrap();
        if st.step != ClarifyStep::NonActionableTarget {
            return;
        }
        st.non_actionable_target = Some(target);
    }

    /// Record whether the actionable item is one step or a project.
    pub fn set_single_action(&self, single: bool) {
        self.transition(|st| {
            if st.step != ClarifyStep::ActionCountDecision {
                return None;
            }
            st.is_single_action = Some(single);
            let to = if single {
                ClarifyStep::CreateAction
            } else {
                ClarifyStep::CreateProject
            };
            Some(to)
        });
    }

    /// Shallow-merge fields into the action draft. Validation happens at
    /// commit time, not here.
    pub fn set_action_data(&self, patch: ActionDraftPatch) {
        let mut st = self.state.lock().unwrap();
        if st.step == ClarifyStep::Idle {
            return;
        }
        st.action_draft.apply(patch);
    }

    /// Shallow-merge fields into the project draft.
    pub fn set_project_data(&self, patch: ProjectDraftPatch) {
        let mut st = self.state.lock().unwrap();
        if st.step == ClarifyStep::Idle {
            return;
        }
        st.project_draft.apply(patch);
    }

    /// Take the two-minute-rule shortcut from the action form.
    pub fn proceed_to_do_it_now(&self) {
        self.transition(|st| {
            if st.step != ClarifyStep::CreateAction {
                return None;
            }
            Some(ClarifyStep::DoItNow)
        });
    }

    /// Undo the last decision.
    ///
    /// Each backward edge clears the decision that the matching forward edge
    /// recorded, except `DoItNow -> CreateAction`, which is a pure step move.
    /// No-op from any other state.
    pub fn back(&self) {
        self.transition(|st| match st.step {
            ClarifyStep::NonActionableTarget => {
                st.non_actionable_target = None;
                Some(ClarifyStep::ActionableDecision)
            }
            ClarifyStep::ActionCountDecision => {
                st.is_actionable = None;
                Some(ClarifyStep::ActionableDecision)
            }
            ClarifyStep::CreateAction | ClarifyStep::CreateProject => {
                st.is_single_action = None;
                Some(ClarifyStep::ActionCountDecision)
            }
            ClarifyStep::DoItNow => Some(ClarifyStep::CreateAction),
            _ => None,
        });
    }

    /// Discard the current workflow and return to idle. No external call is
    /// made; a commit already in flight keeps running but its completion
    /// will be recognized as stale and dropped.
    pub fn cancel(&self) {
        let event = {
            let mut st = self.state.lock().unwrap();
            let item_id = st.stuff_item.as_ref().map(|item| item.id.clone());
            *st = WorkflowState::idle();
            ClarifyEvent::WorkflowCancelled { item_id }
        };
        self.publish(event);
    }

    /// Branch-dependent progress percentage for the progress indicator.
    ///
    /// The non-actionable path is intentionally shorter than the actionable
    /// one; UI parity tests depend on these exact values.
    pub fn progress(&self) -> u8 {
        let st = self.state.lock().unwrap();
        match (st.step, st.is_actionable) {
            (ClarifyStep::Done | ClarifyStep::DoItNow, _) => 100,
            (ClarifyStep::ActionableDecision, Some(false)) => 50,
            (ClarifyStep::NonActionableTarget, _) => 100,
            (ClarifyStep::ActionableDecision, _) => 33,
            (ClarifyStep::ActionCountDecision, _) => 66,
            (ClarifyStep::CreateAction | ClarifyStep::CreateProject, _) => 100,
            _ => 0,
        }
    }

    /// What `confirm()` would do right now, or `None` while the decisions do
    /// not yet add up to a complete disposition.
    ///
    /// Summary and commit both read the same planned [`Disposition`], so the
    /// two can never drift apart.
    pub fn confirm_summary(&self) -> Option<ConfirmSummary> {
        let st = self.state.lock().unwrap();
        st.plan().ok().map(|disposition| disposition.summary())
    }

    /// Commit the workflow: perform the single external write implied by the
    /// recorded decisions.
    ///
    /// Returns `true` and moves to `Done` on success. On any failure the
    /// step is left unchanged, `last_error` is set, and the caller may
    /// retry, `back()`, or `cancel()`. Never panics or propagates an error.
    pub async fn confirm(&self) -> bool {
        let (run, item_id, disposition) = {
            let mut st = self.state.lock().unwrap();
            if st.loading {
                st.last_error = Some("Another commit is still in flight".to_string());
                return false;
            }
            let item_id = match st.stuff_item.as_ref() {
                Some(item) => item.id.clone(),
                None => {
                    st.last_error = Some("No item is being clarified".to_string());
                    return false;
                }
            };
            let disposition = match st.plan() {
                Ok(disposition) => disposition,
                Err(err) => {
                    st.last_error = Some(err.to_string());
                    return false;
                }
            };
            st.loading = true;
            st.last_error = None;
            (st.run, item_id, disposition)
        };

        self.publish(ClarifyEvent::CommitStarted {
            item_id: item_id.clone(),
            action: disposition.action_label().to_string(),
        });

        let result = disposition.dispatch(self.api.as_ref(), &item_id).await;
        self.settle(run, &item_id, disposition.action_label(), result)
    }

    /// Complete the captured item immediately (two-minute rule), bypassing
    /// action creation. Only available from the `DoItNow` step; same
    /// success/failure contract as `confirm()`.
    pub async fn do_it_now(&self) -> bool {
        let (run, item_id) = {
            let mut st = self.state.lock().unwrap();
            if st.loading {
                st.last_error = Some("Another commit is still in flight".to_string());
                return false;
            }
            if st.step != ClarifyStep::DoItNow {
                st.last_error = Some("Nothing to complete right now".to_string());
                return false;
            }
            let item_id = match st.stuff_item.as_ref() {
                Some(item) => item.id.clone(),
                None => {
                    st.last_error = Some("No item is being clarified".to_string());
                    return false;
                }
            };
            st.loading = true;
            st.last_error = None;
            (st.run, item_id)
        };

        self.publish(ClarifyEvent::CommitStarted {
            item_id: item_id.clone(),
            action: "Complete Immediately".to_string(),
        });

        let result = self.api.complete_immediately(&item_id).await;
        self.settle(run, &item_id, "Complete Immediately", result)
    }

    /// Apply a commit outcome, unless the workflow it belongs to has been
    /// cancelled or replaced while the request was in flight.
    fn settle(
        &self,
        run: Uuid,
        item_id: &str,
        action: &str,
        result: gtd_clarify_sdk::ApiResult<()>,
    ) -> bool {
        let succeeded = result.is_ok();
        let event = {
            let mut st = self.state.lock().unwrap();
            if st.run != run {
                // Stale completion; the state already belongs to someone else.
                return succeeded;
            }
            st.loading = false;
            match result {
                Ok(()) => {
                    st.step = ClarifyStep::Done;
                    ClarifyEvent::CommitSucceeded {
                        item_id: item_id.to_string(),
                        action: action.to_string(),
                    }
                }
                Err(err) => {
                    let message = err.to_string();
                    let message = if message.is_empty() {
                        GENERIC_COMMIT_ERROR.to_string()
                    } else {
                        message
                    };
                    st.last_error = Some(message.clone());
                    ClarifyEvent::CommitFailed {
                        item_id: item_id.to_string(),
                        error: message,
                    }
                }
            }
        };
        self.publish(event);
        if succeeded {
            self.stats.notify();
        }
        succeeded
    }

    /// Run a guarded step transition and publish the step change, if any.
    fn transition<F>(&self, apply: F)
    where
        F: FnOnce(&mut WorkflowState) -> Option<ClarifyStep>,
    {
        let event = {
            let mut st = self.state.lock().unwrap();
            let from = st.step;
            match apply(&mut *st) {
                Some(to) => {
                    st.step = to;
                    Some(ClarifyEvent::StepChanged { from, to })
                }
                None => None,
            }
        };
        if let Some(event) = event {
            self.publish(event);
        }
    }

    fn publish(&self, event: ClarifyEvent) {
        event.emit();
        let _ = self.events_tx.send(event);
    }
}
