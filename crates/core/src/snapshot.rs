//! Pre-demotion role snapshot.
//!
//! Captured into the subscription's `original_roles` column at the first
//! demotion of a lapse episode and consumed by the matching restore.
//! Entries are write-once: a retried or repeated demotion pass must never
//! replace a recorded role with the floor value it has since become.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::roles::Role;
use crate::types::DbId;

/// Roles held by the owner and members before a demotion cascade.
///
/// Serialized to JSONB alongside the subscription row. Integer member ids
/// become JSON object keys (serde_json renders them as strings).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSnapshot {
    /// The owner's role before demotion, if one was recorded this episode.
    pub owner_role: Option<Role>,
    /// Member roles before demotion, keyed by user id.
    #[serde(default)]
    pub members: BTreeMap<DbId, Role>,
}

impl RoleSnapshot {
    /// True when nothing has been recorded this lapse episode.
    pub fn is_empty(&self) -> bool {
        self.owner_role.is_none() && self.members.is_empty()
    }

    /// Record the owner's pre-demotion role.
    ///
    /// Refuses floor values and never overwrites an existing entry.
    /// Returns `true` if the entry was recorded.
    pub fn record_owner(&mut self, role: Role) -> bool {
        if role.is_floor() || self.owner_role.is_some() {
            return false;
        }
        self.owner_role = Some(role);
        true
    }

    /// Record a member's pre-demotion role under the same write-once rule.
    pub fn record_member(&mut self, user_id: DbId, role: Role) -> bool {
        if role.is_floor() || self.members.contains_key(&user_id) {
            return false;
        }
        self.members.insert(user_id, role);
        true
    }

    /// The recorded role for a member, if any.
    pub fn member_role(&self, user_id: DbId) -> Option<Role> {
        self.members.get(&user_id).copied()
    }
}
