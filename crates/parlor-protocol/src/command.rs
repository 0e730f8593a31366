//! Inbound commands, as parsed by the transport.

/// A command received from the connected client.
///
/// The transport has already done the wire-level work (framing,
/// tokenizing, registration bookkeeping); what arrives here is the
/// command's meaning. Parameters that the protocol leaves as opaque
/// text (the comma-separated channel list, message bodies) are passed
/// through untouched — splitting them is dispatch's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Registration: the client's nick, account credentials, and any
    /// client options sent alongside the account name.
    Register {
        nick: String,
        account: String,
        password: Option<String>,
        options: Vec<String>,
    },

    /// Join one or more rooms. `channels` is the raw comma-separated
    /// list; `password` applies to every room in it.
    Join {
        channels: String,
        password: Option<String>,
    },

    /// Leave a room.
    Part { channel: String },

    /// Send a message to a room.
    Privmsg { target: String, text: String },

    /// Presence query: who is in this room right now?
    Who { channel: String },

    /// Identity query: which participant is behind this handle?
    Whois { nick: String },

    /// The client is done.
    Quit,
}
