//! Commit-path tests
//!
//! Exactly one external write per completed workflow, matching the branch
//! implied by the recorded decisions; failures preserve state for retry;
//! in-flight commits are guarded against reentrancy and stale completion.

use super::common::*;
use chrono::NaiveDate;
use gtd_clarify_sdk::{
    ActionDraftPatch, ClarifyMode, ClarifyStep, NonActionableTarget, ProjectDraftPatch,
};
use std::time::Duration;

#[tokio::test]
async fn non_actionable_trash_dispatches_move_to_trash() {
    let (engine, api) = engine();
    start(&engine, sample_item("s1", "Old flyer"));
    engine.set_actionable(false);
    engine.set_non_actionable_target(NonActionableTarget::Trash);

    assert!(engine.confirm().await);
    assert_eq!(engine.snapshot().step, ClarifyStep::Done);
    assert_eq!(api.write_calls(), vec![ApiCall::MoveToTrash("s1".to_string())]);
}

#[tokio::test]
async fn each_target_maps_to_its_write() {
    for (target, expected) in [
        (
            NonActionableTarget::Reference,
            ApiCall::FileAsReference("s1".to_string()),
        ),
        (
            NonActionableTarget::Someday,
            ApiCall::MoveToSomeday("s1".to_string()),
        ),
    ] {
        let (engine, api) = engine();
        start(&engine, sample_item("s1", "Old flyer"));
        engine.set_actionable(false);
        engine.set_non_actionable_target(target);

        assert!(engine.confirm().await);
        assert_eq!(api.write_calls(), vec![expected]);
    }
}

#[tokio::test]
async fn single_action_creates_action_with_draft_fields() {
    let (engine, api) = engine();
    start(&engine, sample_item("s2", "Call mom"));
    to_action_form(&engine);
    engine.set_action_data(ActionDraftPatch {
        due_date: Some(NaiveDate::from_ymd_opt(2026, 9, 1)),
        tags: Some(vec!["phone".to_string()]),
        ..Default::default()
    });

    assert!(engine.confirm().await);
    let calls = api.write_calls();
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        ApiCall::CreateAction(item_id, payload) => {
            assert_eq!(item_id, "s2");
            assert_eq!(payload["title"], "Call mom");
            assert_eq!(payload["due_date"], "2026-09-01");
            assert_eq!(payload["tags"][0], "phone");
        }
        other => panic!("unexpected call: {:?}", other),
    }
}

#[tokio::test]
async fn action_payload_omits_unset_fields() {
    let (engine, api) = engine();
    start(
        &engine,
        gtd_clarify_sdk::CapturedItem {
            id: "s2".to_string(),
            title: "Call mom".to_string(),
            description: String::new(),
        },
    );
    to_action_form(&engine);

    assert!(engine.confirm().await);
    match &api.write_calls()[0] {
        ApiCall::CreateAction(_, payload) => {
            let obj = payload.as_object().unwrap();
            assert_eq!(obj.len(), 1);
            assert!(obj.contains_key("title"));
        }
        other => panic!("unexpected call: {:?}", other),
    }
}

#[tokio::test]
async fn project_payload_treats_empty_outcome_as_absent() {
    let (engine, api) = engine();
    start(&engine, sample_item("s3", "Plan trip"));
    to_project_form(&engine);
    engine.set_project_data(ProjectDraftPatch {
        outcome: Some(String::new()),
        ..Default::default()
    });

    assert!(engine.confirm().await);
    match &api.write_calls()[0] {
        ApiCall::CreateProject(item_id, payload) => {
            assert_eq!(item_id, "s3");
            assert_eq!(payload["title"], "Plan trip");
            assert!(payload.as_object().unwrap().get("outcome").is_none());
        }
        other => panic!("unexpected call: {:?}", other),
    }
}

#[tokio::test]
async fn two_minute_rule_completes_without_creating_action() {
    let (engine, api) = engine();
    start(&engine, sample_item("s2", "Call mom"));
    to_action_form(&engine);
    engine.proceed_to_do_it_now();

    assert!(engine.do_it_now().await);
    assert_eq!(engine.snapshot().step, ClarifyStep::Done);
    assert_eq!(
        api.write_calls(),
        vec![ApiCall::CompleteImmediately("s2".to_string())]
    );
}

#[tokio::test]
async fn do_it_now_outside_its_step_is_rejected() {
    let (engine, api) = engine();
    start(&engine, sample_item("s2", "Call mom"));
    to_action_form(&engine);

    assert!(!engine.do_it_now().await);
    assert!(engine.snapshot().last_error.is_some());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn confirm_without_decisions_is_a_validation_failure() {
    let (engine, api) = engine();
    start(&engine, sample_item("s1", "Old flyer"));

    assert!(!engine.confirm().await);
    let snap = engine.snapshot();
    assert_eq!(snap.step, ClarifyStep::ActionableDecision);
    assert_eq!(
        snap.last_error.as_deref(),
        Some("Decide whether the item is actionable")
    );
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn confirm_requires_a_title() {
    let (engine, api) = engine();
    start(&engine, sample_item("s2", "Call mom"));
    to_action_form(&engine);
    engine.set_action_data(ActionDraftPatch {
        title: Some(String::new()),
        ..Default::default()
    });

    assert!(!engine.confirm().await);
    assert_eq!(
        engine.snapshot().last_error.as_deref(),
        Some("The action needs a title")
    );
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn failure_preserves_state_and_retry_succeeds() {
    let (engine, api) = engine();
    start(&engine, sample_item("s1", "Old flyer"));
    engine.set_actionable(false);
    engine.set_non_actionable_target(NonActionableTarget::Trash);

    api.set_fail_writes(true);
    assert!(!engine.confirm().await);
    let snap = engine.snapshot();
    assert_eq!(snap.step, ClarifyStep::NonActionableTarget);
    assert_eq!(snap.last_error.as_deref(), Some("Server error (500)."));
    assert!(!snap.loading);

    api.set_fail_writes(false);
    assert!(engine.confirm().await);
    let snap = engine.snapshot();
    assert_eq!(snap.step, ClarifyStep::Done);
    assert!(snap.last_error.is_none());
    assert_eq!(api.write_calls(), vec![ApiCall::MoveToTrash("s1".to_string())]);
}

#[tokio::test]
async fn concurrent_confirm_is_rejected() {
    let (engine, api) = engine();
    start(&engine, sample_item("s1", "Old flyer"));
    engine.set_actionable(false);
    engine.set_non_actionable_target(NonActionableTarget::Trash);

    api.gate_writes();
    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.confirm().await })
    };
    tokio::task::yield_now().await;
    assert!(engine.snapshot().loading);

    assert!(!engine.confirm().await);
    assert_eq!(
        engine.snapshot().last_error.as_deref(),
        Some("Another commit is still in flight")
    );

    api.release_one();
    assert!(first.await.unwrap());
    assert_eq!(api.write_calls().len(), 1);
}

#[tokio::test]
async fn start_is_rejected_while_commit_in_flight() {
    let (engine, api) = engine();
    start(&engine, sample_item("s1", "Old flyer"));
    engine.set_actionable(false);
    engine.set_non_actionable_target(NonActionableTarget::Trash);

    api.gate_writes();
    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.confirm().await })
    };
    tokio::task::yield_now().await;

    assert!(!engine.start(sample_item("s9", "Another"), ClarifyMode::Inline));

    api.release_one();
    assert!(first.await.unwrap());
    assert_eq!(engine.snapshot().step, ClarifyStep::Done);
}

#[tokio::test]
async fn stale_completion_after_cancel_leaves_state_alone() {
    let (engine, api) = engine();
    start(&engine, sample_item("s1", "Old flyer"));
    engine.set_actionable(false);
    engine.set_non_actionable_target(NonActionableTarget::Trash);

    api.gate_writes();
    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.confirm().await })
    };
    tokio::task::yield_now().await;

    // Cancel cannot interrupt the outstanding request, only disregard it.
    engine.cancel();
    assert_eq!(engine.snapshot().step, ClarifyStep::Idle);

    api.release_one();
    assert!(first.await.unwrap());

    let snap = engine.snapshot();
    assert_eq!(snap.step, ClarifyStep::Idle);
    assert!(!snap.loading);
    assert!(snap.last_error.is_none());
    assert_eq!(api.write_calls(), vec![ApiCall::MoveToTrash("s1".to_string())]);
}

#[tokio::test(start_paused = true)]
async fn successful_commit_triggers_debounced_stats_refresh() {
    let (engine, api) = engine();
    start(&engine, sample_item("s1", "Old flyer"));
    engine.set_actionable(false);
    engine.set_non_actionable_target(NonActionableTarget::Someday);

    assert!(engine.confirm().await);
    assert!(!api.calls().contains(&ApiCall::NotifyStatsChanged));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(api.calls().contains(&ApiCall::NotifyStatsChanged));
}

#[tokio::test(start_paused = true)]
async fn failed_commit_does_not_touch_stats() {
    let (engine, api) = engine();
    start(&engine, sample_item("s1", "Old flyer"));
    engine.set_actionable(false);
    engine.set_non_actionable_target(NonActionableTarget::Someday);

    api.set_fail_writes(true);
    assert!(!engine.confirm().await);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!api.calls().contains(&ApiCall::NotifyStatsChanged));
}
