//! Outbound events, handed to the transport for framing.

use crate::Identity;

/// The fixed handle that service-wide broadcasts are attributed to.
pub const SYSTEM_SENDER: &str = "system.broadcast";

/// Who an outbound notice or message is from.
#[derive(Debug, Clone, PartialEq)]
pub enum Sender {
    /// A resolved room participant.
    Participant(Identity),

    /// The service's broadcast channel ([`SYSTEM_SENDER`]).
    System,

    /// The gateway itself (status and error notices).
    Server,
}

/// One event to deliver to the connected client.
///
/// These are the gateway's entire outbound surface. The transport owns
/// the rendering — numeric replies, prefixes, line framing — so each
/// variant carries structured data, not wire text.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Registration finished; the client's effective nick is now the
    /// derived handle.
    Registered { handle: String },

    /// A participant (possibly the gateway itself) joined a room.
    Joined { channel: String, who: Identity },

    /// A participant left a room.
    Parted { channel: String, who: Identity },

    /// A participant changed handles.
    NickChanged { from: Identity, to: String },

    /// An ordinary room message.
    Message {
        channel: String,
        from: Identity,
        text: String,
    },

    /// A room notice (backlog replay, broadcasts, gateway reports).
    Notice {
        channel: String,
        from: Sender,
        text: String,
    },

    /// The room's topic line.
    Topic { channel: String, text: String },

    /// Operator status granted to a handle. Every room participant is
    /// an operator as far as the client can tell.
    OperatorGrant { channel: String, handle: String },

    /// One line of a presence (who) listing.
    WhoReply {
        channel: String,
        who: Identity,
        description: String,
    },

    /// Presence listing finished.
    EndOfWho { channel: String },

    /// Identity (whois) answer: who the handle is and where.
    WhoisReply {
        who: Identity,
        channel: String,
        server: String,
    },

    /// Identity listing finished.
    EndOfWhois { handle: String },

    /// Error reply: the named channel isn't joined here.
    NoSuchChannel { channel: String },

    /// Error reply: no tracked participant has this handle.
    NoSuchNick { nick: String },

    /// A status notice from the gateway itself, outside any room.
    ServerNotice { text: String },
}

impl Outbound {
    /// A gateway status notice. Line breaks are collapsed so a single
    /// event always renders as a single protocol line.
    pub fn server_notice(text: impl AsRef<str>) -> Self {
        let text = text
            .as_ref()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        Self::ServerNotice { text }
    }
}
