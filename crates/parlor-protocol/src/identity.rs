//! Identity resolution: remote occupant records → stable local handles.
//!
//! Display names on the service are neither unique nor stable, and
//! occupant ids get reused across unrelated accounts over time. The
//! handle scheme makes collisions impossible within a room:
//!
//! ```text
//! display name, whitespace stripped
//!   + "|" + user_id        when the record is the gateway's own account
//!   + "|" + occupant_id    when it belongs to another real account
//!   + "|_" + occupant_id   when it is anonymous
//! ```
//!
//! occupant_id is unique per room per session, so two distinct occupant
//! records never share a handle; and the gateway's own handle carries
//! its user_id, which is what self-suppression keys on.

use parlor_api::{MessageRecord, OccupantRecord, OwnIdentity};

/// A resolved participant: the raw identity triple plus the derived
/// handle used as roster key and client-facing nick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Account id; `None` for anonymous occupants.
    pub user_id: Option<String>,

    /// Room-scoped occupant id.
    pub occupant_id: String,

    /// The display name as the service reported it.
    pub display_name: String,

    /// Derived local handle. Never contains whitespace.
    pub handle: String,
}

impl Identity {
    /// The username shown in presence/identity replies: the account id,
    /// or `anon` for anonymous occupants.
    pub fn username(&self) -> &str {
        self.user_id.as_deref().unwrap_or("anon")
    }
}

/// Derives [`Identity`] values for one gateway session.
///
/// The only state is the gateway's own account id, fixed at login —
/// given the same record fields, resolution always produces the same
/// handle.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    own_user_id: Option<String>,
}

impl IdentityResolver {
    /// A resolver for the session logged in as `own_user_id`.
    pub fn new(own_user_id: impl Into<String>) -> Self {
        Self {
            own_user_id: Some(own_user_id.into()),
        }
    }

    /// The core mapping. Pure and total: strips whitespace from the
    /// display name and appends the disambiguating suffix.
    pub fn resolve(
        &self,
        user_id: Option<&str>,
        occupant_id: &str,
        display_name: &str,
    ) -> Identity {
        let mut handle: String = display_name.split_whitespace().collect();
        match user_id {
            Some(uid) if self.own_user_id.as_deref() == Some(uid) => {
                handle.push('|');
                handle.push_str(uid);
            }
            Some(_) => {
                handle.push('|');
                handle.push_str(occupant_id);
            }
            None => {
                handle.push_str("|_");
                handle.push_str(occupant_id);
            }
        }
        Identity {
            user_id: user_id.map(str::to_owned),
            occupant_id: occupant_id.to_owned(),
            display_name: display_name.to_owned(),
            handle,
        }
    }

    /// Resolves the originator of an observe-stream message.
    pub fn resolve_message(&self, msg: &MessageRecord) -> Identity {
        self.resolve(msg.user_id.as_deref(), msg.speaker_id(), &msg.nickname)
    }

    /// Resolves the post-rename identity of a nickname-change event,
    /// if the record carries the new name.
    pub fn resolve_renamed(&self, msg: &MessageRecord) -> Option<Identity> {
        let new_name = msg.new_nickname.as_deref()?;
        Some(self.resolve(msg.user_id.as_deref(), msg.speaker_id(), new_name))
    }

    /// Resolves a snapshot occupant. Occupants without a display name
    /// can't be given a handle and resolve to `None`.
    pub fn resolve_occupant(&self, occupant: &OccupantRecord) -> Option<Identity> {
        let name = occupant.nickname.as_deref()?;
        Some(self.resolve(occupant.user_id.as_deref(), &occupant.id, name))
    }

    /// Resolves the gateway's own occupancy in a room.
    pub fn resolve_own(&self, own: &OwnIdentity, occupant_id: &str) -> Identity {
        self.resolve(Some(&own.user_id), occupant_id, &own.nickname)
    }
}

// =========================================================================
// Tests
// =========================================================================
