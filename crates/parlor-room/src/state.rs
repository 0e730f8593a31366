//! Per-room mutable state.

use std::collections::HashMap;
use std::sync::Arc;

use parlor_api::EnterResponse;
use parlor_protocol::Identity;
use tokio::sync::Mutex;

/// Everything the bridge tracks for one joined room.
///
/// Owned by the room's observer task. The gateway's dispatch path also
/// reads it — ticket for message sends, roster for identity queries —
/// so the record lives behind [`SharedRoomState`]; the observer keeps
/// its critical sections short and never holds the lock across the
/// long-poll await.
#[derive(Debug)]
pub struct RoomState {
    /// Local channel name (lowercased, as the client addresses it).
    pub channel: String,

    /// The service's room identifier, needed for snapshot calls.
    pub room_id: String,

    /// Opaque subscription token from the enter call; required on
    /// every observe/say/exit.
    pub ticket: String,

    /// Resume point for the next observe call. Monotonically
    /// non-decreasing.
    pub cursor: u64,

    /// Highest message sequence number already translated. The observe
    /// stream may re-deliver; anything at or below this is skipped.
    pub high_watermark: u64,

    /// Participants known to be present, keyed by handle.
    pub roster: HashMap<String, Identity>,

    /// The gateway's own occupancy in this room.
    pub self_identity: Identity,

    /// Room password, re-supplied on snapshot calls.
    pub password: Option<String>,

    /// True until the first observe response has been processed.
    /// Messages translated while set are historical replay and go out
    /// as notices instead of live chat.
    pub backlog: bool,
}

/// A room state shared between its observer task and the dispatch path.
pub type SharedRoomState = Arc<Mutex<RoomState>>;

impl RoomState {
    /// State for a freshly entered room. The roster starts with just
    /// ourselves; everyone else arrives via enter events or occupant
    /// snapshots.
    pub fn new(
        channel: impl Into<String>,
        entered: &EnterResponse,
        self_identity: Identity,
        password: Option<String>,
    ) -> Self {
        let mut roster = HashMap::new();
        roster.insert(self_identity.handle.clone(), self_identity.clone());
        Self {
            channel: channel.into(),
            room_id: entered.room.id.clone(),
            ticket: entered.ticket.clone(),
            cursor: entered.counter,
            high_watermark: 0,
            roster,
            self_identity,
            password,
            backlog: true,
        }
    }

    /// Whether a message record originates from the gateway's own
    /// occupancy. Keyed on occupant identity, never on content.
    pub fn is_self(&self, identity: &Identity) -> bool {
        identity.occupant_id == self.self_identity.occupant_id
    }
}
