//! Integration tests for the room observer, driven by a scripted
//! in-memory service.
//!
//! The fake's observe responses sit behind a semaphore so each test
//! controls exactly when the poll loop gets its next answer; once the
//! script runs dry the poll blocks forever, like a real long-poll with
//! a quiet room.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parlor_api::{
    CODE_INVALID_SESSION, CODE_INVALID_TICKET, EnterResponse, MessageKind, MessageRecord,
    ObserveResponse, OccupantRecord, OwnIdentity, RoomDescriptor, RoomService, ServiceError,
};
use parlor_protocol::{IdentityResolver, Outbound};
use parlor_room::{RoomSignal, enter};
use tokio::sync::{Mutex, Semaphore, mpsc};

// =========================================================================
// Scripted service
// =========================================================================

struct ScriptedService {
    observes: Mutex<VecDeque<Result<ObserveResponse, ServiceError>>>,
    /// One permit per observe response the test wants released.
    gate: Semaphore,
    /// Cursor argument of every observe call, in order.
    observe_cursors: Mutex<Vec<u64>>,
    exits: AtomicUsize,
    enter_error: Option<ServiceError>,
}

impl ScriptedService {
    fn new(observes: Vec<Result<ObserveResponse, ServiceError>>) -> Arc<Self> {
        Arc::new(Self {
            observes: Mutex::new(observes.into()),
            gate: Semaphore::new(0),
            observe_cursors: Mutex::new(Vec::new()),
            exits: AtomicUsize::new(0),
            enter_error: None,
        })
    }

    fn failing_enter(error: ServiceError) -> Arc<Self> {
        Arc::new(Self {
            observes: Mutex::new(VecDeque::new()),
            gate: Semaphore::new(0),
            observe_cursors: Mutex::new(Vec::new()),
            exits: AtomicUsize::new(0),
            enter_error: Some(error),
        })
    }

    /// Lets the next `n` observe calls complete.
    fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    fn exit_count(&self) -> usize {
        self.exits.load(Ordering::SeqCst)
    }
}

impl RoomService for ScriptedService {
    async fn create_session(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn login(&self, _account: &str, _password: &str) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn fetch_own_identity(&self) -> Result<OwnIdentity, ServiceError> {
        Ok(own())
    }

    async fn enter_room(
        &self,
        room: &str,
        _nick: &str,
        _password: Option<&str>,
    ) -> Result<EnterResponse, ServiceError> {
        if let Some(err) = &self.enter_error {
            return Err(err.clone());
        }
        Ok(EnterResponse {
            ticket: "T1".into(),
            counter: 0,
            occupant_id: "self".into(),
            room: RoomDescriptor {
                id: room.into(),
                url: Some("https://rooms.example/lobby".into()),
                description: Some("the lobby".into()),
            },
        })
    }

    async fn observe_room(
        &self,
        _ticket: &str,
        counter: u64,
    ) -> Result<ObserveResponse, ServiceError> {
        self.observe_cursors.lock().await.push(counter);
        let permit = self.gate.acquire().await.expect("gate never closed");
        permit.forget();
        match self.observes.lock().await.pop_front() {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    async fn say(&self, _ticket: &str, _text: &str) -> Result<(), ServiceError> {
        Ok(())
    }

    async fn fetch_room_snapshot(
        &self,
        _room_id: &str,
        _password: Option<&str>,
    ) -> Result<Vec<OccupantRecord>, ServiceError> {
        Ok(Vec::new())
    }

    async fn exit_room(&self, _ticket: &str) -> Result<(), ServiceError> {
        self.exits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn own() -> OwnIdentity {
    OwnIdentity {
        user_id: "me".into(),
        nickname: "Me".into(),
    }
}

fn resolver() -> IdentityResolver {
    IdentityResolver::new("me")
}

fn user_message(seq: &str, text: &str) -> MessageRecord {
    MessageRecord {
        id: seq.into(),
        kind: MessageKind::User,
        text: text.into(),
        nickname: "Ann".into(),
        user_id: None,
        occupant_id: Some("o2".into()),
        new_nickname: None,
    }
}

fn batch(messages: Vec<MessageRecord>) -> Result<ObserveResponse, ServiceError> {
    Ok(ObserveResponse {
        counter: None,
        messages,
        occupants: None,
    })
}

async fn next_signal(rx: &mut mpsc::UnboundedReceiver<RoomSignal>) -> RoomSignal {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for signal")
        .expect("signal channel closed")
}

/// Consumes the topic / join / operator-grant triple every successful
/// enter emits, and sanity-checks it.
async fn drain_enter_preamble(rx: &mut mpsc::UnboundedReceiver<RoomSignal>) {
    match next_signal(rx).await {
        RoomSignal::Deliver(Outbound::Topic { text, .. }) => {
            assert_eq!(text, "https://rooms.example/lobby the lobby");
        }
        other => panic!("expected topic, got {other:?}"),
    }
    assert!(matches!(
        next_signal(rx).await,
        RoomSignal::Deliver(Outbound::Joined { who, .. }) if who.handle == "Me|me"
    ));
    assert!(matches!(
        next_signal(rx).await,
        RoomSignal::Deliver(Outbound::OperatorGrant { handle, .. }) if handle == "Me|me"
    ));
}

// =========================================================================
// ENTERING
// =========================================================================

#[tokio::test]
async fn test_enter_failure_reports_error_and_creates_nothing() {
    let service = ScriptedService::failing_enter(ServiceError::api(105, "password required"));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let result = enter(
        Arc::clone(&service),
        resolver(),
        &own(),
        "#lobby",
        "Me",
        None,
        tx,
    )
    .await;

    assert!(matches!(result, Err(ServiceError::Api { code: 105, .. })));
    assert!(rx.try_recv().is_err(), "no events on failed join");
}

#[tokio::test]
async fn test_enter_strips_channel_prefix_for_room_name() {
    let service = ScriptedService::new(vec![]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = enter(
        Arc::clone(&service),
        resolver(),
        &own(),
        "#lobby",
        "Me",
        None,
        tx,
    )
    .await
    .expect("join should succeed");

    drain_enter_preamble(&mut rx).await;
    assert_eq!(handle.state().lock().await.room_id, "lobby");
    handle.abort();
}

// =========================================================================
// ACTIVE: dedup, backlog, cursor, snapshots
// =========================================================================

#[tokio::test]
async fn test_first_observe_replays_backlog_as_single_notice() {
    // The end-to-end scenario: join "lobby", first poll returns one
    // user message "hi" with sequence 1.
    let service = ScriptedService::new(vec![batch(vec![user_message("1", "hi")])]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = enter(
        Arc::clone(&service),
        resolver(),
        &own(),
        "#lobby",
        "Me",
        None,
        tx,
    )
    .await
    .expect("join should succeed");
    drain_enter_preamble(&mut rx).await;

    service.release(1);

    // Exactly one room notice containing "hi" — not a message.
    match next_signal(&mut rx).await {
        RoomSignal::Deliver(Outbound::Notice { text, .. }) => assert_eq!(text, "hi"),
        other => panic!("expected notice, got {other:?}"),
    }

    let st = handle.state().lock().await;
    assert_eq!(st.high_watermark, 1);
    assert!(!st.backlog, "backlog drained after first response");
    drop(st);

    handle.abort();
}

#[tokio::test]
async fn test_observer_dedups_by_sequence_and_preserves_order() {
    let service = ScriptedService::new(vec![batch(vec![
        user_message("5", "m5-first"),
        user_message("5", "m5-again"),
        user_message("6", "m6"),
        user_message("4", "m4-stale"),
        user_message("7", "m7"),
    ])]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = enter(
        Arc::clone(&service),
        resolver(),
        &own(),
        "#lobby",
        "Me",
        None,
        tx,
    )
    .await
    .expect("join should succeed");
    drain_enter_preamble(&mut rx).await;

    // Start from watermark 4, past the backlog phase.
    {
        let mut st = handle.state().lock().await;
        st.high_watermark = 4;
        st.backlog = false;
    }
    service.release(1);

    // 5, 6, 7 exactly once each, in that order; the repeated 5 and the
    // out-of-order 4 are skipped.
    for expected in ["m5-first", "m6", "m7"] {
        match next_signal(&mut rx).await {
            RoomSignal::Deliver(Outbound::Message { text, .. }) => assert_eq!(text, expected),
            other => panic!("expected message {expected:?}, got {other:?}"),
        }
    }

    assert_eq!(handle.state().lock().await.high_watermark, 7);
    handle.abort();
}

#[tokio::test]
async fn test_observer_adopts_cursor_and_reconciles_snapshot() {
    let snapshot = vec![
        OccupantRecord {
            id: "o2".into(),
            nickname: Some("Ann".into()),
            user_id: None,
            description: None,
        },
        OccupantRecord {
            id: "o3".into(),
            nickname: None, // unnamed, never synthesized
            user_id: None,
            description: None,
        },
    ];
    let service = ScriptedService::new(vec![Ok(ObserveResponse {
        counter: Some(10),
        messages: Vec::new(),
        occupants: Some(snapshot),
    })]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = enter(
        Arc::clone(&service),
        resolver(),
        &own(),
        "#lobby",
        "Me",
        None,
        tx,
    )
    .await
    .expect("join should succeed");
    drain_enter_preamble(&mut rx).await;

    // Let the first poll answer and the second poll get issued.
    service.release(2);

    assert!(matches!(
        next_signal(&mut rx).await,
        RoomSignal::Deliver(Outbound::Joined { who, .. }) if who.handle == "Ann|_o2"
    ));
    assert!(matches!(
        next_signal(&mut rx).await,
        RoomSignal::Deliver(Outbound::OperatorGrant { handle, .. }) if handle == "Ann|_o2"
    ));

    // The follow-up poll resumes from the adopted cursor.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let cursors = service.observe_cursors.lock().await.clone();
        if cursors.len() >= 2 {
            assert_eq!(cursors, vec![0, 10]);
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "second poll never issued");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(handle.state().lock().await.cursor, 10);
    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_observer_transient_error_backs_off_and_recovers() {
    let service = ScriptedService::new(vec![
        Err(ServiceError::api(500, "hiccup")),
        batch(vec![user_message("1", "hi")]),
    ]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = enter(
        Arc::clone(&service),
        resolver(),
        &own(),
        "#lobby",
        "Me",
        None,
        tx,
    )
    .await
    .expect("join should succeed");
    drain_enter_preamble(&mut rx).await;

    service.release(2);

    // The room stays joined across the failure; the retry (after the
    // auto-advanced backoff sleep) delivers the backlog notice.
    match next_signal(&mut rx).await {
        RoomSignal::Deliver(Outbound::Notice { text, .. }) => assert_eq!(text, "hi"),
        other => panic!("expected notice after retry, got {other:?}"),
    }

    handle.abort();
}

// =========================================================================
// CLOSING and recovery
// =========================================================================

#[tokio::test]
async fn test_close_aborts_in_flight_poll_and_exits_room() {
    // No permits: the observer sits inside a blocked long-poll.
    let service = ScriptedService::new(vec![]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = enter(
        Arc::clone(&service),
        resolver(),
        &own(),
        "#lobby",
        "Me",
        None,
        tx,
    )
    .await
    .expect("join should succeed");
    drain_enter_preamble(&mut rx).await;

    handle.close();

    assert!(matches!(
        next_signal(&mut rx).await,
        RoomSignal::Deliver(Outbound::Parted { who, .. }) if who.handle == "Me|me"
    ));
    assert!(matches!(
        next_signal(&mut rx).await,
        RoomSignal::RoomClosed { channel, ticket } if channel == "#lobby" && ticket == "T1"
    ));

    handle.wait().await;
    assert_eq!(service.exit_count(), 1, "room exited best-effort");
}

#[tokio::test]
async fn test_invalid_ticket_synthesizes_part_and_closes_room() {
    let service = ScriptedService::new(vec![Err(ServiceError::api(
        CODE_INVALID_TICKET,
        "ticket not found",
    ))]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = enter(
        Arc::clone(&service),
        resolver(),
        &own(),
        "#lobby",
        "Me",
        None,
        tx,
    )
    .await
    .expect("join should succeed");
    drain_enter_preamble(&mut rx).await;

    service.release(1);

    assert!(matches!(
        next_signal(&mut rx).await,
        RoomSignal::Deliver(Outbound::Parted { .. })
    ));
    assert!(matches!(
        next_signal(&mut rx).await,
        RoomSignal::RoomClosed { .. }
    ));

    handle.wait().await;
}

#[tokio::test]
async fn test_invalid_session_abandons_room_without_part() {
    let service = ScriptedService::new(vec![Err(ServiceError::api(
        CODE_INVALID_SESSION,
        "session not found",
    ))]);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = enter(
        Arc::clone(&service),
        resolver(),
        &own(),
        "#lobby",
        "Me",
        None,
        tx,
    )
    .await
    .expect("join should succeed");
    drain_enter_preamble(&mut rx).await;

    service.release(1);

    assert_eq!(next_signal(&mut rx).await, RoomSignal::SessionInvalidated);

    handle.wait().await;
    assert_no_part_signals(&mut rx);
    assert_eq!(service.exit_count(), 0, "abandoned, not exited");
}

/// Drains whatever is left in the channel and asserts none of it is a
/// part or room-closed signal.
fn assert_no_part_signals(rx: &mut mpsc::UnboundedReceiver<RoomSignal>) {
    while let Ok(signal) = rx.try_recv() {
        assert!(
            !matches!(
                signal,
                RoomSignal::Deliver(Outbound::Parted { .. }) | RoomSignal::RoomClosed { .. }
            ),
            "abandoned room must not emit {signal:?}"
        );
    }
}
