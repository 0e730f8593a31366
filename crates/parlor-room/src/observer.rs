//! Room observer: an isolated Tokio task that owns one room's bridge.
//!
//! Each joined room runs one observer. Its life is a small state
//! machine:
//!
//! ```text
//!   ENTERING ──(enter_room ok)──→ ACTIVE ──(part / bad ticket)──→ CLOSING
//!       │                           │
//!       └─(enter_room err)─→ join   └─(bad session)─→ gateway teardown,
//!          reported failed             no closing ritual
//! ```
//!
//! ACTIVE is the long-poll loop: observe, translate, emit, repeat. The
//! poll itself paces the loop when the service is healthy; failures are
//! paced by [`Backoff`]. Shutdown is cooperative — a cancellation token
//! raced against the in-flight poll, never a mid-mutation kill.

use std::sync::Arc;
use std::time::Duration;

use parlor_api::{ObserveResponse, OwnIdentity, RoomService, ServiceError, Severity};
use parlor_protocol::{IdentityResolver, Outbound};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{Backoff, RoomState, SharedRoomState, reconcile_snapshot, translate};

/// First retry delay after a transient observe failure.
const RETRY_BASE: Duration = Duration::from_secs(1);

/// Retry delays stop growing here.
const RETRY_CAP: Duration = Duration::from_secs(30);

/// What an observer sends back to the gateway loop.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomSignal {
    /// An event for the connected client.
    Deliver(Outbound),

    /// This occupancy's observer is gone; drop its entry. Carries the
    /// ticket so a stale signal can't evict a successor room that
    /// reused the channel name.
    RoomClosed { channel: String, ticket: String },

    /// The service voided the whole authenticated session. Every
    /// room's ticket is dead with it — tear the gateway down.
    SessionInvalidated,
}

/// The gateway's grip on a running observer.
pub struct RoomHandle {
    channel: String,
    state: SharedRoomState,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RoomHandle {
    /// The local channel name this observer bridges.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The room's shared state, for dispatch-path reads (ticket,
    /// roster). Lock briefly; the observer mutates concurrently.
    pub fn state(&self) -> &SharedRoomState {
        &self.state
    }

    /// Asks the observer to close: the in-flight poll is abandoned,
    /// the room is exited best-effort, and a part is emitted. Returns
    /// immediately; the CLOSING work happens on the observer task.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Kills the observer task outright, skipping CLOSING. Only for
    /// session-invalidated teardown, where the ticket is already void
    /// and no part must be emitted.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Waits for the observer task to finish.
    pub async fn wait(self) {
        let _ = self.task.await;
    }
}

/// Joins a room and spawns its observer (the ENTERING state).
///
/// On success the room's state exists, the topic and the gateway's own
/// join have been emitted, and the ACTIVE loop is running. On failure
/// nothing was created and the error goes back to the caller — joins
/// are never retried.
pub async fn enter<S: RoomService>(
    api: Arc<S>,
    resolver: IdentityResolver,
    own: &OwnIdentity,
    channel: &str,
    nick: &str,
    password: Option<&str>,
    signals: mpsc::UnboundedSender<RoomSignal>,
) -> Result<RoomHandle, ServiceError> {
    let room_name = channel.trim_start_matches('#');
    let entered = api.enter_room(room_name, nick, password).await?;
    tracing::info!(
        channel,
        room_id = %entered.room.id,
        cursor = entered.counter,
        "entered room"
    );

    let self_identity = resolver.resolve_own(own, &entered.occupant_id);
    let topic = format!(
        "{} {}",
        entered.room.url.as_deref().unwrap_or(""),
        entered.room.description.as_deref().unwrap_or(""),
    )
    .trim()
    .to_owned();

    let _ = signals.send(RoomSignal::Deliver(Outbound::Topic {
        channel: channel.to_owned(),
        text: topic,
    }));
    let _ = signals.send(RoomSignal::Deliver(Outbound::Joined {
        channel: channel.to_owned(),
        who: self_identity.clone(),
    }));
    let _ = signals.send(RoomSignal::Deliver(Outbound::OperatorGrant {
        channel: channel.to_owned(),
        handle: self_identity.handle.clone(),
    }));

    let state: SharedRoomState = Arc::new(tokio::sync::Mutex::new(RoomState::new(
        channel,
        &entered,
        self_identity,
        password.map(str::to_owned),
    )));

    let cancel = CancellationToken::new();
    let task = tokio::spawn(observe_loop(
        Arc::clone(&api),
        resolver,
        Arc::clone(&state),
        cancel.clone(),
        signals,
        channel.to_owned(),
    ));

    Ok(RoomHandle {
        channel: channel.to_owned(),
        state,
        cancel,
        task,
    })
}

/// The ACTIVE state: poll, translate, emit, repeat.
async fn observe_loop<S: RoomService>(
    api: Arc<S>,
    resolver: IdentityResolver,
    state: SharedRoomState,
    cancel: CancellationToken,
    signals: mpsc::UnboundedSender<RoomSignal>,
    channel: String,
) {
    tracing::debug!(%channel, "observer started");
    let mut backoff = Backoff::new(RETRY_BASE, RETRY_CAP);

    loop {
        if signals.is_closed() {
            // The gateway is gone; nobody is listening.
            tracing::debug!(%channel, "gateway dropped, observer stopping");
            return;
        }

        let (ticket, cursor) = {
            let st = state.lock().await;
            (st.ticket.clone(), st.cursor)
        };

        let observed = tokio::select! {
            _ = cancel.cancelled() => break,
            result = api.observe_room(&ticket, cursor) => result,
        };

        match observed {
            Ok(batch) => {
                apply_batch(&state, &resolver, &signals, &batch).await;
                backoff.reset();
            }
            Err(err) => match err.severity() {
                Severity::FatalSession => {
                    tracing::warn!(
                        %channel,
                        error = %err,
                        "session invalidated upstream, abandoning all rooms"
                    );
                    let _ = signals.send(RoomSignal::SessionInvalidated);
                    return;
                }
                Severity::FatalRoom => {
                    tracing::warn!(
                        %channel,
                        error = %err,
                        "room ticket invalidated, synthesizing part"
                    );
                    break;
                }
                Severity::Transient => {
                    let delay = backoff.delay();
                    tracing::warn!(
                        %channel,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "observe failed, retrying"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            },
        }
    }

    close_room(&api, &state, &signals, &channel).await;
}

/// Applies one observe response: cursor, messages (deduped by the
/// watermark, translated in sequence order), occupant snapshot.
async fn apply_batch(
    state: &SharedRoomState,
    resolver: &IdentityResolver,
    signals: &mpsc::UnboundedSender<RoomSignal>,
    batch: &ObserveResponse,
) {
    let mut st = state.lock().await;

    if let Some(counter) = batch.counter {
        st.cursor = counter;
    }

    for msg in &batch.messages {
        let seq = msg.sequence();
        if seq <= st.high_watermark {
            // Long-poll re-delivery; already translated.
            continue;
        }
        for event in translate(&mut st, resolver, msg) {
            let _ = signals.send(RoomSignal::Deliver(event));
        }
        st.high_watermark = seq;
    }

    if let Some(occupants) = &batch.occupants {
        for event in reconcile_snapshot(&mut st, resolver, occupants) {
            let _ = signals.send(RoomSignal::Deliver(event));
        }
    }

    // Anything after the first processed response is live chat.
    st.backlog = false;
}

/// The CLOSING state: best-effort exit, part, drop the entry.
async fn close_room<S: RoomService>(
    api: &Arc<S>,
    state: &SharedRoomState,
    signals: &mpsc::UnboundedSender<RoomSignal>,
    channel: &str,
) {
    let (ticket, self_identity) = {
        let st = state.lock().await;
        (st.ticket.clone(), st.self_identity.clone())
    };

    if let Err(err) = api.exit_room(&ticket).await {
        tracing::debug!(channel, error = %err, "exit_room failed, leaving anyway");
    }
    tracing::info!(channel, "left room");

    let _ = signals.send(RoomSignal::Deliver(Outbound::Parted {
        channel: channel.to_owned(),
        who: self_identity,
    }));
    let _ = signals.send(RoomSignal::RoomClosed {
        channel: channel.to_owned(),
        ticket,
    });
}
