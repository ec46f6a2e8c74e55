//! End-to-end session flows against a mock job API.

use std::collections::BTreeSet;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use porter_app::Session;
use porter_client::{ApiSettings, JobServiceHandle, PollSettings};
use porter_core::{
    DashboardEvent, Envelope, EventBus, FilterKey, JobId, JobStatus, MemoryStateStore, NoticeKind,
    PresetConfirm, SortKey, StateKey, StateStore,
};

const DEBOUNCE: Duration = Duration::from_millis(50);

fn poll() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(25),
        ceiling: Duration::from_secs(2),
    }
}

fn build_session(
    server: &MockServer,
    bus: Arc<EventBus>,
    store: Arc<MemoryStateStore>,
) -> Session {
    let service =
        JobServiceHandle::connect(ApiSettings::new(server.uri()), poll()).expect("service");
    Session::new(bus, store, service, Arc::new(PresetConfirm(true)), DEBOUNCE)
}

fn session_for(server: &MockServer) -> (Session, Arc<EventBus>, Arc<MemoryStateStore>) {
    let bus = Arc::new(EventBus::new());
    let store = Arc::new(MemoryStateStore::new());
    let session = build_session(server, bus.clone(), store.clone());
    (session, bus, store)
}

fn job_body(id: &str, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "url": format!("https://example.com/{id}"),
        "status": status,
        "progress": null,
        "result": null,
        "error": if status == "error" { json!("boom") } else { json!(null) },
        "createdAt": "2026-03-01T10:00:00Z",
        "completedAt": null,
    })
}

async fn mount_empty_list(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobs": [] })))
        .mount(server)
        .await;
}

/// Pumps the session until `done` holds, failing after three seconds.
async fn wait_until(session: &mut Session, mut done: impl FnMut(&Session) -> bool, what: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        session.pump();
        if done(session) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}; state: {:#?}",
            session.state()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn drain(rx: &Receiver<Envelope>) -> Vec<Envelope> {
    let mut events = Vec::new();
    while let Ok(envelope) = rx.try_recv() {
        events.push(envelope);
    }
    events
}

fn ids(names: &[&str]) -> BTreeSet<JobId> {
    names.iter().map(|name| JobId::from(*name)).collect()
}

#[tokio::test]
async fn submitted_job_flows_to_the_view() {
    let server = MockServer::start().await;
    mount_empty_list(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("j1", "pending")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/j1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("j1", "scraping")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/j1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("j1", "completed")))
        .mount(&server)
        .await;

    let (mut session, _bus, _store) = session_for(&server);
    session.restore(None);
    session.submit("https://example.com/j1");

    // The settled notice is the last event of the flow, so waiting on it
    // means the board snapshots have all been applied too.
    wait_until(&mut session, |s| s.state().notice.is_some(), "completion").await;

    let view = session.view();
    assert_eq!(view.counts.all, 1);
    assert_eq!(view.rows[0].id, JobId::from("j1"));
    assert_eq!(view.rows[0].status, JobStatus::Completed);
    assert_eq!(view.rows[0].progress, 100);

    let notice = session.state().notice.clone().expect("settled notice");
    assert_eq!(notice.kind, NoticeKind::Success);
    assert!(notice.message.contains("https://example.com/j1"));
}

#[tokio::test]
async fn restore_recovers_slices_and_prunes_selection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "jobs": [job_body("j2", "completed")] })),
        )
        .mount(&server)
        .await;

    let bus = Arc::new(EventBus::new());
    let store = Arc::new(MemoryStateStore::new());
    store.set(StateKey::CurrentFilter, "completed");
    store.set(StateKey::CurrentSort, "url");
    store.set(StateKey::SearchQuery, "example");
    store.set(StateKey::SelectedJobs, "gone,j2");

    let mut session = build_session(&server, bus, store.clone());
    session.restore(None);

    assert_eq!(session.state().filter, FilterKey::Completed);
    assert_eq!(session.state().sort, SortKey::Url);
    assert_eq!(session.state().search, "example");
    assert_eq!(session.state().selected, ids(&["gone", "j2"]));

    // The first refresh prunes the selection down to jobs that exist.
    wait_until(&mut session, |s| s.view().counts.all == 1, "refresh").await;
    assert_eq!(session.state().selected, ids(&["j2"]));
    assert_eq!(store.get(StateKey::SelectedJobs).as_deref(), Some("j2"));
}

#[tokio::test]
async fn query_override_wins_over_the_store() {
    let server = MockServer::start().await;
    mount_empty_list(&server).await;

    let bus = Arc::new(EventBus::new());
    let store = Arc::new(MemoryStateStore::new());
    store.set(StateKey::CurrentFilter, "completed");
    store.set(StateKey::CurrentSort, "url");

    let mut session = build_session(&server, bus, store);
    session.restore(Some("filter=error&q=boom"));

    assert_eq!(session.state().filter, FilterKey::Error);
    assert_eq!(session.state().sort, SortKey::NewestFirst);
    assert_eq!(session.state().search, "boom");
    assert_eq!(session.query_string(), "filter=error&q=boom");
}

#[tokio::test]
async fn select_all_targets_only_visible_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({ "jobs": [job_body("j1", "completed"), job_body("j2", "error")] }),
        ))
        .mount(&server)
        .await;

    let (mut session, _bus, _store) = session_for(&server);
    session.restore(None);
    wait_until(&mut session, |s| s.view().counts.all == 2, "refresh").await;

    session.select_all();
    assert_eq!(session.state().selected, ids(&["j1", "j2"]));

    session.set_filter(FilterKey::Error);
    session.select_all();
    assert_eq!(session.state().selected, ids(&["j2"]));

    // Select none empties the selection without touching the board.
    session.clear_selection();
    assert!(session.state().selected.is_empty());
    assert_eq!(session.view().counts.all, 2);
}

#[tokio::test]
async fn delete_removes_settled_and_cancels_active() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({ "jobs": [job_body("j1", "completed"), job_body("j2", "scraping")] }),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/j2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("j2", "scraping")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/j2/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("j2", "cancelled")))
        .expect(1)
        .mount(&server)
        .await;

    let (mut session, _bus, _store) = session_for(&server);
    session.restore(None);
    wait_until(&mut session, |s| s.view().counts.all == 2, "refresh").await;

    session.toggle_selection(JobId::from("j1"));
    session.toggle_selection(JobId::from("j2"));
    session.delete_selected();

    // j1 left the board at once; j2 goes through the cancel endpoint.
    wait_until(
        &mut session,
        |s| s.state().notice.is_some(),
        "cancel confirmation",
    )
    .await;

    let view = session.view();
    assert_eq!(view.counts.all, 1);
    assert_eq!(view.rows[0].status, JobStatus::Cancelled);
    assert_eq!(session.state().selected, ids(&["j2"]));
    let notice = session.state().notice.clone().expect("cancel notice");
    assert!(notice.message.contains("cancelled"));
}

#[tokio::test]
async fn retry_then_refresh_reconciles_the_board() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/jobs"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "jobs": [job_body("j1", "error")] })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({ "jobs": [job_body("j1", "completed"), job_body("j9", "completed")] }),
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/j1/retry"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("j1", "pending")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/j1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("j1", "completed")))
        .mount(&server)
        .await;

    let (mut session, _bus, _store) = session_for(&server);
    session.restore(None);
    wait_until(&mut session, |s| s.view().counts.error == 1, "failed board").await;

    session.retry_job(JobId::from("j1"));
    wait_until(&mut session, |s| s.state().notice.is_some(), "retry completion").await;
    let notice = session.state().notice.clone().expect("completion notice");
    assert_eq!(notice.kind, NoticeKind::Success);
    assert_eq!(session.view().counts.completed, 1);

    // A refresh replaces the projection with the full backend listing.
    session.refresh();
    wait_until(&mut session, |s| s.view().counts.all == 2, "refreshed list").await;
    assert_eq!(session.view().counts.completed, 2);
}

#[tokio::test]
async fn cancel_stops_an_active_job() {
    let server = MockServer::start().await;
    mount_empty_list(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("j1", "scraping")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/jobs/j1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("j1", "scraping")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/j1/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job_body("j1", "cancelled")))
        .expect(1)
        .mount(&server)
        .await;

    let (mut session, _bus, _store) = session_for(&server);
    session.restore(None);
    session.submit("https://example.com/j1");
    wait_until(&mut session, |s| s.view().counts.all == 1, "submitted row").await;

    session.cancel_job(JobId::from("j1"));
    wait_until(&mut session, |s| s.state().notice.is_some(), "cancel notice").await;
    assert_eq!(session.view().rows[0].status, JobStatus::Cancelled);
    let notice = session.state().notice.clone().expect("cancel notice");
    assert!(notice.message.contains("cancelled"));
}

#[tokio::test]
async fn search_input_debounces_into_one_broadcast() {
    let server = MockServer::start().await;
    mount_empty_list(&server).await;

    let (mut session, bus, _store) = session_for(&server);
    session.restore(None);
    let probe = bus.subscribe();

    session.search_input("w");
    session.search_input("we");
    session.search_input("week");
    session.pump();
    assert_eq!(session.state().search, "");

    tokio::time::sleep(DEBOUNCE * 3).await;
    session.pump();
    assert_eq!(session.state().search, "week");

    let searches: Vec<String> = drain(&probe)
        .into_iter()
        .filter_map(|envelope| match envelope.event {
            DashboardEvent::SearchChanged { query } => Some(query),
            _ => None,
        })
        .collect();
    assert_eq!(searches, vec!["week".to_string()]);
}

#[tokio::test]
async fn failed_requests_raise_a_dismissible_notice() {
    let server = MockServer::start().await;
    mount_empty_list(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/jobs"))
        .respond_with(ResponseTemplate::new(422).set_body_string("unsupported url"))
        .expect(1)
        .mount(&server)
        .await;

    let (mut session, _bus, _store) = session_for(&server);
    session.restore(None);
    session.submit("ftp://example.com/nope");

    wait_until(&mut session, |s| s.state().notice.is_some(), "failure notice").await;
    let notice = session.state().notice.clone().expect("notice");
    assert_eq!(notice.kind, NoticeKind::Error);
    assert!(notice.message.contains("unsupported url"));

    session.dismiss_notice();
    assert_eq!(session.state().notice, None);
}

#[tokio::test]
async fn slice_changes_land_in_store_and_query_string() {
    let server = MockServer::start().await;
    mount_empty_list(&server).await;

    let (mut session, _bus, store) = session_for(&server);
    session.restore(None);

    session.set_filter(FilterKey::Completed);
    session.set_sort(SortKey::OldestFirst);
    session.set_search("  weekly report  ");

    assert_eq!(
        session.query_string(),
        "filter=completed&sort=oldest&q=weekly+report"
    );
    assert_eq!(
        store.get(StateKey::CurrentFilter).as_deref(),
        Some("completed")
    );
    assert_eq!(store.get(StateKey::CurrentSort).as_deref(), Some("oldest"));
    assert_eq!(
        store.get(StateKey::SearchQuery).as_deref(),
        Some("weekly report")
    );
}
