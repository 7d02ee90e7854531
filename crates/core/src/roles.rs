//! The closed role set and role arithmetic.
//!
//! Roles are stored as lowercase text in the `users.role` column (with a
//! CHECK constraint mirroring this enum) and carried verbatim in JWT
//! claims. A user's role is mutated only by the role coordinator or by
//! explicit administrative action; it is never derived on the fly.

use serde::{Deserialize, Serialize};

/// A user's role on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Unprivileged floor role. Demoted identities land here.
    Guest,
    /// Ordinary community member.
    Resident,
    /// Paying owner of a community.
    CommunityOwner,
    /// Member with security duties inside a community.
    Security,
    /// Platform administrator. Bypasses community access checks.
    Admin,
}

impl Role {
    /// The unprivileged floor role.
    pub const FLOOR: Role = Role::Guest;

    /// Roles that only make sense while a membership exists.
    ///
    /// These are reverted to [`Role::FLOOR`] when the membership is
    /// destroyed; owner and admin roles survive membership changes.
    pub fn is_community_scoped(self) -> bool {
        matches!(self, Role::Resident | Role::Security)
    }

    /// Whether this role is the floor role.
    pub fn is_floor(self) -> bool {
        self == Role::FLOOR
    }

    /// Lowercase wire/storage name of the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::Resident => "resident",
            Role::CommunityOwner => "communityowner",
            Role::Security => "security",
            Role::Admin => "admin",
        }
    }

    /// Parse a storage/wire name back into a role.
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "guest" => Some(Role::Guest),
            "resident" => Some(Role::Resident),
            "communityowner" => Some(Role::CommunityOwner),
            "security" => Some(Role::Security),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Manual sqlx plumbing: roles live in a plain TEXT column, so delegate to
// the `&str` implementations instead of declaring a custom Postgres type.

impl sqlx::Type<sqlx::Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for Role {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Role::parse(s).ok_or_else(|| format!("unknown role name: {s}").into())
    }
}
