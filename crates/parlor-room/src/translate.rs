//! Event translation: one remote record in, zero or more outbound
//! events out, plus the roster change the record implies.
//!
//! Pure with respect to the outside world — no I/O, no service calls —
//! so the whole table is unit-testable without a running observer.

use parlor_api::{MessageKind, MessageRecord, OccupantRecord};
use parlor_protocol::{IdentityResolver, Outbound, Sender};

use crate::RoomState;

/// Translates one observe-stream record against the room's state.
///
/// Re-delivery is handled by the caller's watermark check; this
/// function assumes the record is new. Self-originated chat is
/// suppressed (the client already saw its own typed text), with one
/// exception: backlog replay, where everything comes back as notices.
pub fn translate(
    state: &mut RoomState,
    resolver: &IdentityResolver,
    msg: &MessageRecord,
) -> Vec<Outbound> {
    let channel = state.channel.clone();
    let who = resolver.resolve_message(msg);

    match msg.kind {
        MessageKind::User => {
            if state.backlog {
                // Historical replay: marked as a notice so the client
                // can tell it from live chat.
                vec![Outbound::Notice {
                    channel,
                    from: Sender::Participant(who),
                    text: msg.text.clone(),
                }]
            } else if state.is_self(&who) {
                Vec::new()
            } else {
                vec![Outbound::Message {
                    channel,
                    from: who,
                    text: msg.text.clone(),
                }]
            }
        }

        MessageKind::Private => {
            if state.is_self(&who) {
                Vec::new()
            } else {
                vec![Outbound::Message {
                    channel,
                    from: who,
                    text: format!("\u{1}ACTION Sent private: {}\u{1}", msg.text),
                }]
            }
        }

        MessageKind::Enter => {
            if state.is_self(&who) {
                Vec::new()
            } else {
                let handle = who.handle.clone();
                state.roster.insert(handle.clone(), who.clone());
                vec![
                    Outbound::Joined {
                        channel: channel.clone(),
                        who,
                    },
                    Outbound::OperatorGrant { channel, handle },
                ]
            }
        }

        MessageKind::Leave => {
            if state.is_self(&who) {
                Vec::new()
            } else {
                state.roster.remove(&who.handle);
                vec![Outbound::Parted { channel, who }]
            }
        }

        MessageKind::NicknameChange => {
            let Some(renamed) = resolver.resolve_renamed(msg) else {
                return Vec::new();
            };
            state.roster.remove(&who.handle);
            state
                .roster
                .insert(renamed.handle.clone(), renamed.clone());
            vec![Outbound::NickChanged {
                from: who,
                to: renamed.handle,
            }]
        }

        MessageKind::Broadcast => vec![Outbound::Notice {
            channel,
            from: Sender::System,
            text: msg.text.clone(),
        }],

        MessageKind::Other => Vec::new(),
    }
}

/// Reconciles an occupant snapshot against the roster.
///
/// Occupants we haven't seen yet get a synthesized join (join plus
/// operator grant) and a roster entry. Occupants *absent* from the
/// snapshot are left alone: a snapshot is a point sample, and removal
/// only ever happens through explicit leave or rename events.
pub fn reconcile_snapshot(
    state: &mut RoomState,
    resolver: &IdentityResolver,
    occupants: &[OccupantRecord],
) -> Vec<Outbound> {
    let mut out = Vec::new();
    for occupant in occupants {
        let Some(who) = resolver.resolve_occupant(occupant) else {
            continue;
        };
        if state.roster.contains_key(&who.handle) {
            continue;
        }
        let handle = who.handle.clone();
        state.roster.insert(handle.clone(), who.clone());
        out.push(Outbound::Joined {
            channel: state.channel.clone(),
            who,
        });
        out.push(Outbound::OperatorGrant {
            channel: state.channel.clone(),
            handle,
        });
    }
    out
}

// =========================================================================
// Tests
// =========================================================================
