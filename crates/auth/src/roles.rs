use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier carried by a principal.
///
/// Roles are opaque strings issued by the identity provider. Only the
/// elevated roles below carry meaning for the access policy; anything else is
/// treated as a regular customer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));
    pub const STAFF: Role = Role(Cow::Borrowed("staff"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Administrator or staff.
    pub fn is_elevated(&self) -> bool {
        matches!(self.as_str(), "admin" | "staff")
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
