//! Dispatch-side gating: which events reach enrollment at all.

mod common;

use serde_json::json;
use test_context::test_context;

use automations_core::common::WorkspaceId;
use automations_core::domains::automations::{
    Automation, Condition, ConditionOp, ConditionSet, ConditionSubject, Run,
};
use automations_core::engine::AutomationEvent;

use common::{fixtures, TestHarness};

#[test_context(TestHarness)]
#[tokio::test]
async fn mismatched_trigger_filter_enrolls_nothing(ctx: &TestHarness) {
    let workspace_id = WorkspaceId::new();
    let (engine, deps) = ctx.engine("test-worker");

    let contact = fixtures::test_contact();
    deps.snapshots.put_contact(contact.clone());

    let automation = fixtures::tour_followup(workspace_id)
        .insert(&ctx.db_pool)
        .await
        .unwrap();

    // The automation filters on stage "toured"; this event moved the contact
    // somewhere else
    let event = fixtures::toured_event(workspace_id, contact.id)
        .with_payload(json!({"stage": "under_contract"}));
    let results = engine.handle_event(&event).await.unwrap();

    assert!(results.is_empty());
    let runs = Run::find_for_pair(automation.id, contact.id, &ctx.db_pool)
        .await
        .unwrap();
    assert!(runs.is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn denied_workspace_drops_events(ctx: &TestHarness) {
    let workspace_id = WorkspaceId::new();
    let (engine, deps) = ctx.engine("test-worker");

    let contact = fixtures::test_contact();
    deps.snapshots.put_contact(contact.clone());
    deps.entitlements.deny();

    let automation = fixtures::tour_followup(workspace_id)
        .insert(&ctx.db_pool)
        .await
        .unwrap();

    let event = fixtures::toured_event(workspace_id, contact.id);
    let results = engine.handle_event(&event).await.unwrap();

    // Dropped outright: nothing enrolled, nothing queued for later
    assert!(results.is_empty());
    let runs = Run::find_for_pair(automation.id, contact.id, &ctx.db_pool)
        .await
        .unwrap();
    assert!(runs.is_empty());
    assert_eq!(deps.sms.call_count(), 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn entry_conditions_gate_enrollment_per_contact(ctx: &TestHarness) {
    let workspace_id = WorkspaceId::new();
    let (engine, deps) = ctx.engine("test-worker");

    let zillow_lead = fixtures::test_contact();
    let mut walk_in = fixtures::test_contact();
    walk_in.fields = json!({"stage": "toured"});
    deps.snapshots.put_contact(zillow_lead.clone());
    deps.snapshots.put_contact(walk_in.clone());

    let mut automation = fixtures::tour_followup(workspace_id);
    automation.entry_conditions = Some(ConditionSet::All(vec![Condition {
        subject: ConditionSubject::Contact,
        field: "lead_source".to_string(),
        op: ConditionOp::Equals,
        value: json!("zillow"),
    }]));
    let automation = automation.insert(&ctx.db_pool).await.unwrap();

    let results = engine
        .handle_event(&fixtures::toured_event(workspace_id, zillow_lead.id))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);

    let results = engine
        .handle_event(&fixtures::toured_event(workspace_id, walk_in.id))
        .await
        .unwrap();
    assert!(results.is_empty());
    let runs = Run::find_for_pair(automation.id, walk_in.id, &ctx.db_pool)
        .await
        .unwrap();
    assert!(runs.is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn unknown_contact_never_enrolls(ctx: &TestHarness) {
    let workspace_id = WorkspaceId::new();
    let (engine, deps) = ctx.engine("test-worker");

    fixtures::tour_followup(workspace_id)
        .insert(&ctx.db_pool)
        .await
        .unwrap();

    // Contact was never put into the snapshot provider: it does not exist in
    // the CRM by the time the event is handled
    let ghost = fixtures::test_contact();
    let event = fixtures::toured_event(workspace_id, ghost.id);
    let results = engine.handle_event(&event).await.unwrap();

    assert!(results.is_empty());
    assert_eq!(deps.sms.call_count(), 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn events_stay_inside_their_workspace(ctx: &TestHarness) {
    let (engine, deps) = ctx.engine("test-worker");

    let contact = fixtures::test_contact();
    deps.snapshots.put_contact(contact.clone());

    let automation = fixtures::tour_followup(WorkspaceId::new())
        .insert(&ctx.db_pool)
        .await
        .unwrap();

    // Same trigger and stage, different workspace
    let event = fixtures::toured_event(WorkspaceId::new(), contact.id);
    let results = engine.handle_event(&event).await.unwrap();

    assert!(results.is_empty());
    let runs = Run::find_for_pair(automation.id, contact.id, &ctx.db_pool)
        .await
        .unwrap();
    assert!(runs.is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn inactive_automation_is_ignored(ctx: &TestHarness) {
    let workspace_id = WorkspaceId::new();
    let (engine, deps) = ctx.engine("test-worker");

    let contact = fixtures::test_contact();
    deps.snapshots.put_contact(contact.clone());

    let automation = fixtures::tour_followup(workspace_id)
        .insert(&ctx.db_pool)
        .await
        .unwrap();
    Automation::set_active(automation.id, false, &ctx.db_pool)
        .await
        .unwrap();

    let event = fixtures::toured_event(workspace_id, contact.id);
    let results = engine.handle_event(&event).await.unwrap();

    assert!(results.is_empty());
    assert_eq!(deps.sms.call_count(), 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn one_event_can_enroll_into_several_automations(ctx: &TestHarness) {
    let workspace_id = WorkspaceId::new();
    let (engine, deps) = ctx.engine("test-worker");

    let contact = fixtures::test_contact();
    deps.snapshots.put_contact(contact.clone());

    fixtures::tour_followup(workspace_id)
        .insert(&ctx.db_pool)
        .await
        .unwrap();
    let mut second = fixtures::tour_followup(workspace_id);
    second.name = "Agent task on tour".to_string();
    second.steps = vec![automations_core::domains::automations::Step::CreateTask {
        text: "Call about the tour".to_string(),
    }];
    second.insert(&ctx.db_pool).await.unwrap();

    let event = fixtures::toured_event(workspace_id, contact.id);
    let results = engine.handle_event(&event).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(deps.sms.call_count(), 1);
    assert_eq!(deps.tasks.call_count(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn wrong_trigger_type_is_not_dispatched(ctx: &TestHarness) {
    let workspace_id = WorkspaceId::new();
    let (engine, deps) = ctx.engine("test-worker");

    let contact = fixtures::test_contact();
    deps.snapshots.put_contact(contact.clone());

    fixtures::tour_followup(workspace_id)
        .insert(&ctx.db_pool)
        .await
        .unwrap();

    let event = AutomationEvent::new(
        workspace_id,
        automations_core::domains::automations::TriggerType::NoteLogged,
        contact.id,
    )
    .with_payload(json!({"content": "toured the lakeside condo"}));
    let results = engine.handle_event(&event).await.unwrap();

    assert!(results.is_empty());
}
