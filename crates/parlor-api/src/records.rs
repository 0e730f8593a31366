//! Record types returned by the room service.
//!
//! These mirror the service's JSON responses field for field — the
//! concrete HTTP client deserializes straight into them, and the unit
//! tests below pin the shapes so a drift in serde attributes shows up
//! as a test failure rather than a silent parse error at runtime.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MessageRecord
// ---------------------------------------------------------------------------

/// The kind of a room event delivered through the observe stream.
///
/// The service encodes these as strings; system events carry a
/// `system:` prefix. Kinds added by the service after this was written
/// land in `Other` and are ignored by the translator — an unknown kind
/// must never fail a whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// An ordinary message typed by an occupant.
    User,

    /// A private message, visible only to sender and recipient.
    Private,

    /// An occupant entered the room.
    Enter,

    /// An occupant left the room.
    Leave,

    /// An occupant changed their nickname.
    NicknameChange,

    /// A service-wide announcement.
    Broadcast,

    /// Anything this client doesn't know about.
    Other,
}

impl MessageKind {
    fn from_wire(kind: &str) -> Self {
        match kind {
            "user" => Self::User,
            "private" => Self::Private,
            "system:enter" => Self::Enter,
            "system:leave" => Self::Leave,
            "system:nickname_change" => Self::NicknameChange,
            "system:broadcast" => Self::Broadcast,
            _ => Self::Other,
        }
    }

    fn as_wire(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Private => "private",
            Self::Enter => "system:enter",
            Self::Leave => "system:leave",
            Self::NicknameChange => "system:nickname_change",
            Self::Broadcast => "system:broadcast",
            Self::Other => "unknown",
        }
    }
}

impl Serialize for MessageKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for MessageKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let kind = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&kind))
    }
}

/// One event from a room's observe stream.
///
/// Field presence varies by [`kind`](Self::kind): `user`/`private`
/// messages carry `text`, `system:nickname_change` carries
/// `new_nickname`, and so on. Absent fields deserialize to their
/// defaults rather than failing the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Message sequence number, as a decimal string.
    pub id: String,

    /// Event kind.
    #[serde(rename = "type")]
    pub kind: MessageKind,

    /// Message body (empty for most system events).
    #[serde(default)]
    pub text: String,

    /// Display name of the originating occupant.
    #[serde(default)]
    pub nickname: String,

    /// Account id of the originator; absent for anonymous occupants.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Room-scoped occupant id of the originator.
    #[serde(default)]
    pub occupant_id: Option<String>,

    /// New display name, present only on `system:nickname_change`.
    #[serde(default)]
    pub new_nickname: Option<String>,
}

impl MessageRecord {
    /// The message's sequence number. A non-numeric id counts as 0,
    /// which the dedup watermark then skips.
    pub fn sequence(&self) -> u64 {
        self.id.parse().unwrap_or(0)
    }

    /// The occupant id this record speaks for, falling back to the
    /// message id when the service omits it.
    pub fn speaker_id(&self) -> &str {
        self.occupant_id.as_deref().unwrap_or(&self.id)
    }
}

// ---------------------------------------------------------------------------
// Occupants and rooms
// ---------------------------------------------------------------------------

/// One occupant in a room snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupantRecord {
    /// Room-scoped occupant id.
    pub id: String,

    /// Display name. Occupants that never chose one have none and are
    /// skipped by presence listings.
    #[serde(default)]
    pub nickname: Option<String>,

    /// Account id; absent for anonymous occupants.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Free-form profile blurb, shown in presence replies.
    #[serde(default)]
    pub description: Option<String>,
}

/// Metadata about a room, returned when entering it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomDescriptor {
    /// The room's identifier, used for snapshot calls.
    pub id: String,

    /// Public page for the room.
    #[serde(default)]
    pub url: Option<String>,

    /// Room blurb, folded into the topic line.
    #[serde(default)]
    pub description: Option<String>,
}

/// The gateway's own account, as reported by the service after login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnIdentity {
    /// Account id. Identity resolution keys self-detection on this.
    pub user_id: String,

    /// The account's preferred display name.
    #[serde(rename = "default_nickname")]
    pub nickname: String,
}

// ---------------------------------------------------------------------------
// Call responses
// ---------------------------------------------------------------------------

/// Successful response to entering a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnterResponse {
    /// Opaque token granting poll/say/exit rights for this occupancy.
    pub ticket: String,

    /// Initial observe cursor.
    pub counter: u64,

    /// The occupant id assigned to the gateway in this room.
    pub occupant_id: String,

    /// The room that was entered.
    pub room: RoomDescriptor,
}

/// One long-poll result.
///
/// Every field is optional on the wire: an empty response just means
/// the poll timed out server-side with nothing to report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObserveResponse {
    /// New resume cursor, when it advanced.
    #[serde(default)]
    pub counter: Option<u64>,

    /// New messages since the cursor, in sequence order.
    #[serde(default)]
    pub messages: Vec<MessageRecord>,

    /// Point-sample of who is in the room. Not authoritative for
    /// absence — occupants missing here may still be present.
    #[serde(default)]
    pub occupants: Option<Vec<OccupantRecord>>,
}

// =========================================================================
// Tests
// =========================================================================
