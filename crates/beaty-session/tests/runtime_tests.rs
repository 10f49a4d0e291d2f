//! End-to-end runs of [`SessionRuntime`] over scripted transports, on tokio's
//! paused clock.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use beaty_core::types::{Intent, QueryRequest, SessionPhase};
use beaty_session::harness::{RecordingCamera, RecordingObserver, Script, ScriptedTransport};
use beaty_session::{SessionRuntime, SessionSettings};
use beaty_stream::{DataPayload, StreamEvent};

fn settings() -> SessionSettings {
    let mut settings = SessionSettings::default();
    settings.reveal.placeholder = String::new();
    settings.reveal.error_message = "try again".to_string();
    settings
}

fn data(intent: Intent, payload: serde_json::Value) -> StreamEvent {
    let payload: DataPayload = serde_json::from_value(payload).unwrap();
    StreamEvent::Data { intent, payload }
}

fn chunk(text: &str) -> StreamEvent {
    StreamEvent::Chunk { text: text.into() }
}

fn cafes() -> serde_json::Value {
    json!({"pois": [
        {"title": "A", "mapx": 127.00, "mapy": 37.50},
        {"title": "B", "mapx": 127.01, "mapy": 37.51}
    ]})
}

#[tokio::test(start_paused = true)]
async fn test_general_chat_end_to_end() {
    let transport = Arc::new(ScriptedTransport::new([Script::Complete(vec![
        data(Intent::GeneralChat, json!({})),
        chunk("Hello, "),
        chunk("world"),
        StreamEvent::Done,
    ])]));
    let observer = RecordingObserver::new();
    let mut runtime = SessionRuntime::new(
        transport.clone(),
        RecordingCamera::new(),
        observer.clone(),
        settings(),
    );

    let id = runtime.submit(QueryRequest::new("hi")).unwrap();
    runtime.run_until_settled().await;

    assert_eq!(observer.last_text(id).as_deref(), Some("Hello, world"));
    assert_eq!(
        observer.phases(id),
        vec![
            SessionPhase::Requesting,
            SessionPhase::Revealing,
            SessionPhase::Complete
        ]
    );
    assert_eq!(transport.requests()[0].text, "hi");
}

#[tokio::test(start_paused = true)]
async fn test_recommend_waits_for_camera() {
    let step = Duration::from_millis(10);
    let transport = Arc::new(ScriptedTransport::new([Script::Paced(vec![
        (step, data(Intent::Recommend, cafes())),
        (step, chunk("Two cafes.")),
        (step, StreamEvent::Done),
    ])]));
    let camera = RecordingCamera::auto_settling();
    let observer = RecordingObserver::new();
    let mut runtime = SessionRuntime::new(transport, camera.clone(), observer.clone(), settings());

    let id = runtime.submit(QueryRequest::new("추천")).unwrap();
    runtime.run_until_settled().await;

    assert_eq!(observer.last_text(id).as_deref(), Some("Two cafes."));
    assert_eq!(
        observer.phases(id),
        vec![
            SessionPhase::Requesting,
            SessionPhase::AwaitingCameraSettle,
            SessionPhase::Revealing,
            SessionPhase::Complete
        ]
    );
    assert_eq!(camera.on_map().len(), 2);
    assert_eq!(runtime.coordinator().markers().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_camera_times_out() {
    let transport = Arc::new(ScriptedTransport::new([Script::Complete(vec![
        data(Intent::Recommend, cafes()),
        chunk("late"),
        StreamEvent::Done,
    ])]));
    let camera = RecordingCamera::new();
    let observer = RecordingObserver::new();
    let mut runtime = SessionRuntime::new(transport, camera.clone(), observer.clone(), settings());

    let started = tokio::time::Instant::now();
    let id = runtime.submit(QueryRequest::new("추천")).unwrap();
    runtime.run_until_settled().await;

    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(observer.last_text(id).as_deref(), Some("late"));
    assert_eq!(camera.pending_signals(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_query_shows_apology() {
    let transport = Arc::new(ScriptedTransport::new([Script::Reject(503)]));
    let observer = RecordingObserver::new();
    let mut runtime =
        SessionRuntime::new(transport, RecordingCamera::new(), observer.clone(), settings());

    let id = runtime.submit(QueryRequest::new("hi")).unwrap();
    runtime.run_until_settled().await;

    assert_eq!(observer.errors(id), vec!["try again".to_string()]);
    assert_eq!(
        runtime.coordinator().current().map(|s| s.phase),
        Some(SessionPhase::Errored)
    );
}

#[tokio::test(start_paused = true)]
async fn test_truncated_stream_is_an_error() {
    let transport = Arc::new(ScriptedTransport::new([Script::Complete(vec![
        data(Intent::GeneralChat, json!({})),
        chunk("cut off mid"),
    ])]));
    let observer = RecordingObserver::new();
    let mut runtime =
        SessionRuntime::new(transport, RecordingCamera::new(), observer.clone(), settings());

    let id = runtime.submit(QueryRequest::new("hi")).unwrap();
    runtime.run_until_settled().await;

    assert_eq!(observer.phases(id).last(), Some(&SessionPhase::Errored));
    assert_eq!(observer.errors(id).len(), 1);
    assert!(runtime.coordinator().current().unwrap().text_buffer.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_resubmit_supersedes_hanging_stream() {
    let transport = Arc::new(ScriptedTransport::new([
        Script::Hang(vec![
            data(Intent::GeneralChat, json!({})),
            chunk("an answer that never finishes"),
        ]),
        Script::Paced(vec![
            (
                Duration::from_millis(100),
                data(Intent::FindPlace, cafes()),
            ),
            (Duration::from_millis(100), chunk("Found two.")),
            (Duration::from_millis(100), StreamEvent::Done),
        ]),
    ]));
    let observer = RecordingObserver::new();
    let mut runtime =
        SessionRuntime::new(transport, RecordingCamera::new(), observer.clone(), settings());

    let first = runtime.submit(QueryRequest::new("first")).unwrap();
    while observer.texts(first).len() < 3 {
        assert!(runtime.step().await);
    }
    let shown = observer.texts(first).len();

    let second = runtime.submit(QueryRequest::new("second")).unwrap();
    runtime.run_until_settled().await;

    assert_eq!(observer.phases(first).last(), Some(&SessionPhase::Superseded));
    assert_eq!(observer.texts(first).len(), shown);
    assert_eq!(observer.last_text(second).as_deref(), Some("Found two."));
    assert_eq!(runtime.coordinator().current_id(), Some(second));
}

#[tokio::test(start_paused = true)]
async fn test_bubble_dismisses_after_countdown() {
    let transport = Arc::new(ScriptedTransport::new([Script::Complete(vec![
        data(Intent::GeneralChat, json!({})),
        chunk("bye"),
        StreamEvent::Done,
    ])]));
    let observer = RecordingObserver::new();
    let mut runtime =
        SessionRuntime::new(transport, RecordingCamera::new(), observer.clone(), settings());

    let id = runtime.submit(QueryRequest::new("hi")).unwrap();
    runtime.run_until_settled().await;
    assert!(!observer.dismissed(id));

    let completed = tokio::time::Instant::now();
    while !observer.dismissed(id) {
        assert!(runtime.step().await);
    }
    assert!(completed.elapsed() >= Duration::from_secs(9));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_the_stream() {
    let transport = Arc::new(ScriptedTransport::new([Script::Hang(vec![data(
        Intent::GeneralChat,
        json!({}),
    )])]));
    let observer = RecordingObserver::new();
    let mut runtime =
        SessionRuntime::new(transport, RecordingCamera::new(), observer.clone(), settings());

    let id = runtime.submit(QueryRequest::new("hi")).unwrap();
    runtime.cancel();

    assert!(runtime.coordinator().is_idle());
    assert_eq!(observer.phases(id).last(), Some(&SessionPhase::Superseded));
}
