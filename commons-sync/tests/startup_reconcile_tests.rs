use std::sync::Arc;

use chrono::{TimeZone, Utc};
use commons_core::{
    AppState, ChatMessage, EngineConfig, ManualClock, MessageId, Preferences, ReferenceSource,
    StaticReference, User, UserId,
};
use commons_integrity::ConsistencyIssue;
use commons_storage::{DisabledMedium, FileMedium, KeyValueMedium, MemoryMedium};
use commons_sync::CommonsEngine;
use commons_test_utils::{sample_reference, sample_state, FailingReference};
use commons_trust::TrustAction;

fn engine_with<M: KeyValueMedium>(medium: M, reference: Arc<dyn ReferenceSource>) -> CommonsEngine<M> {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap());
    CommonsEngine::new(EngineConfig::default(), medium, reference, Arc::new(clock))
}

fn engine(medium: Arc<MemoryMedium>) -> CommonsEngine<Arc<MemoryMedium>> {
    engine_with(medium, Arc::new(StaticReference::new(sample_reference())))
}

/// Sample state with dated chat history, edited preferences, and one trust
/// action on record.
fn lived_in_state(engine: &CommonsEngine<Arc<MemoryMedium>>) -> AppState {
    let mut state = sample_state();
    state.threads[0].messages.push(ChatMessage {
        id: MessageId::new("m-1"),
        sender_id: UserId::new("u-2"),
        body: "see you saturday".to_string(),
        sent_at: Some(Utc.with_ymd_and_hms(2024, 8, 30, 17, 45, 12).unwrap()),
    });
    state.preferences = Preferences {
        notifications_enabled: false,
        preferred_causes: vec!["environment".to_string()],
        search_radius_km: 10,
        updated_at: Some(Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap()),
    };
    engine
        .trust()
        .apply(&mut state, TrustAction::AttendEvent, Some("e-2".to_string()))
        .unwrap();
    state
}

#[tokio::test]
async fn empty_store_yields_fresh_baseline() {
    let engine = engine(Arc::new(MemoryMedium::new()));
    let initialized = engine.initialize().await;

    assert!(!initialized.has_persisted_data);
    assert_eq!(initialized.state, AppState::baseline(sample_reference()));
    assert!(initialized.repairs.found.is_empty());
}

#[tokio::test]
async fn persisted_session_round_trips() {
    let medium = Arc::new(MemoryMedium::new());
    let first = engine(Arc::clone(&medium));
    let state = lived_in_state(&first);
    first.reconciler().persist(&state);

    let second = engine(medium);
    let initialized = second.initialize().await;
    assert!(initialized.has_persisted_data);
    assert_eq!(initialized.state, state);
    assert_eq!(initialized.state.user.as_ref().map(|u| u.trust_points), Some(55));
}

#[tokio::test]
async fn corrupted_score_is_clamped_and_written_back() {
    let medium = Arc::new(MemoryMedium::new());
    let engine = engine(Arc::clone(&medium));
    let mut state = sample_state();
    if let Some(user) = state.user.as_mut() {
        user.trust_points = 150;
    }
    engine.reconciler().persist(&state);

    let initialized = engine.initialize().await;
    assert_eq!(initialized.state.user.as_ref().map(|u| u.trust_points), Some(100));
    assert!(matches!(
        initialized.repairs.found.as_slice(),
        [ConsistencyIssue::ScoreOutOfBounds { found: 150, clamped: 100, .. }]
    ));

    let again = engine.initialize().await;
    assert!(again.repairs.found.is_empty(), "repair was persisted");
}

#[tokio::test]
async fn ghost_rsvp_in_fresh_data_is_removed() {
    let mut reference = sample_reference();
    reference.events[0].rsvp_list.insert(1, UserId::new("ghost-1"));
    let engine = engine_with(
        Arc::new(MemoryMedium::new()),
        Arc::new(StaticReference::new(reference)),
    );

    let initialized = engine.initialize().await;
    let ids: Vec<&str> = initialized.state.events[0]
        .rsvp_list
        .iter()
        .map(|id| id.as_str())
        .collect();
    assert_eq!(ids, vec!["u-2", "u-3"]);
    assert_eq!(initialized.repairs.applied, 1);
}

#[tokio::test]
async fn unparseable_profile_yields_fresh_baseline() {
    let medium = Arc::new(MemoryMedium::new());
    medium.set_item("commons:user", "{\"version\":1,").unwrap();

    let initialized = engine(medium).initialize().await;
    assert!(!initialized.has_persisted_data);
    assert_eq!(initialized.state.user, None);
}

#[tokio::test]
async fn corrupt_side_aggregate_yields_fresh_baseline() {
    let medium = Arc::new(MemoryMedium::new());
    let engine = engine(Arc::clone(&medium));
    engine.reconciler().persist(&sample_state());
    medium
        .set_item("commons:threads:u-active", "[[[not json")
        .unwrap();

    let initialized = engine.initialize().await;
    assert!(!initialized.has_persisted_data);
    assert_eq!(initialized.state, AppState::baseline(sample_reference()));
}

#[tokio::test]
async fn history_with_impossible_delta_yields_fresh_baseline() {
    let medium = Arc::new(MemoryMedium::new());
    let engine = engine(Arc::clone(&medium));
    let mut state = sample_state();
    let user_id = UserId::new("u-active");
    let ledger = engine.trust().ledger();
    ledger.record_history(&mut state.trust_history, &user_id, i32::MAX, "ATTEND_EVENT", None);
    ledger.record_history(&mut state.trust_history, &user_id, 5, "ATTEND_EVENT", None);
    engine.reconciler().persist(&state);

    let initialized = engine.initialize().await;
    assert!(!initialized.has_persisted_data);
    assert!(initialized.state.trust_history.is_empty());
    let summary = ledger.summary(&initialized.state.trust_history, &user_id);
    assert_eq!(summary.net(), 0);
}

#[tokio::test]
async fn duplicated_thread_is_fully_repaired_and_written_back() {
    let medium = Arc::new(MemoryMedium::new());
    let engine = engine(Arc::clone(&medium));
    let mut state = sample_state();
    state.threads[0].participants.push(UserId::new("stranger"));
    let copy = state.threads[0].clone();
    state.threads.push(copy);
    engine.reconciler().persist(&state);

    let initialized = engine.initialize().await;
    assert!(initialized.has_persisted_data);
    assert_eq!(initialized.repairs.found.len(), 1);
    assert!(initialized.repairs.is_clean(), "remaining: {:?}", initialized.repairs.remaining);
    assert!(initialized
        .state
        .threads
        .iter()
        .all(|t| !t.participants.contains(&UserId::new("stranger"))));

    let again = engine.initialize().await;
    assert!(again.repairs.found.is_empty());
}

#[tokio::test]
async fn other_users_aggregates_are_not_loaded() {
    let medium = Arc::new(MemoryMedium::new());
    let engine = engine(Arc::clone(&medium));
    let bob = UserId::new("bob");
    let alice = User::new(UserId::new("alice"), "Alice", 40);

    engine.session().save_user(&alice);
    engine.session().save_preferences(
        &bob,
        &Preferences {
            search_radius_km: 99,
            ..Preferences::default()
        },
    );

    let initialized = engine.initialize().await;
    assert!(initialized.has_persisted_data);
    assert_eq!(initialized.state.user.map(|u| u.id), Some(alice.id));
    assert_eq!(initialized.state.preferences, Preferences::default());
}

#[tokio::test]
async fn persisted_rsvp_for_retired_event_is_ignored() {
    let medium = Arc::new(MemoryMedium::new());
    let engine = engine(Arc::clone(&medium));
    engine.reconciler().persist(&sample_state());

    let mut reference = sample_reference();
    reference.events.retain(|e| e.id.as_str() != "e-2");
    let later = engine_with(medium, Arc::new(StaticReference::new(reference)));
    let initialized = later.initialize().await;

    assert!(initialized.has_persisted_data);
    assert_eq!(initialized.state.events.len(), 1);
    assert!(!initialized.state.events[0].is_attending);
}

#[tokio::test]
async fn unreachable_reference_still_restores_session() {
    let medium = Arc::new(MemoryMedium::new());
    engine(Arc::clone(&medium)).reconciler().persist(&sample_state());

    let initialized = engine_with(medium, Arc::new(FailingReference)).initialize().await;
    assert!(initialized.has_persisted_data);
    assert_eq!(initialized.state.events, Vec::new());
    assert_eq!(initialized.state.ngos, Vec::new());
    assert!(initialized.state.user.is_some());
}

#[tokio::test]
async fn disabled_storage_runs_in_memory() {
    let engine = engine_with(
        DisabledMedium::new("storage disabled by host"),
        Arc::new(StaticReference::new(sample_reference())),
    );
    assert!(!engine.session().is_available());

    engine.reconciler().persist(&sample_state());
    let initialized = engine.initialize().await;
    assert!(!initialized.has_persisted_data);
    assert_eq!(initialized.state.ngos.len(), 2);
}

#[tokio::test]
async fn file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let reference: Arc<dyn ReferenceSource> = Arc::new(StaticReference::new(sample_reference()));

    let first = engine_with(FileMedium::open(&path), Arc::clone(&reference));
    first.reconciler().persist(&sample_state());
    drop(first);

    let second = engine_with(FileMedium::open(&path), reference);
    let initialized = second.initialize().await;
    assert!(initialized.has_persisted_data);
    assert_eq!(initialized.state, sample_state());
}

#[tokio::test]
async fn reset_forgets_the_session() {
    let medium = Arc::new(MemoryMedium::new());
    let engine = engine(Arc::clone(&medium));
    engine.reconciler().persist(&sample_state());
    assert!(engine.reset() > 0);

    let initialized = engine.initialize().await;
    assert!(!initialized.has_persisted_data);
    assert!(medium.is_empty());
}
