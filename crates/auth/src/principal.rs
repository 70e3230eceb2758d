use serde::Serialize;

use freshfood_core::CustomerId;

use crate::Role;

/// Authenticated identity as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub customer_id: CustomerId,
    pub username: String,
    pub roles: Vec<Role>,
}

impl Identity {
    pub fn new(customer_id: CustomerId, username: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            customer_id,
            username: username.into(),
            roles,
        }
    }
}

/// The actor behind a request.
///
/// Construction is decoupled from transport: the API derives it from a bearer
/// token, tests build it directly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    #[default]
    Anonymous,
    Authenticated(Identity),
}

impl Principal {
    pub fn authenticated(customer_id: CustomerId, username: impl Into<String>, roles: Vec<Role>) -> Self {
        Self::Authenticated(Identity::new(customer_id, username, roles))
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            Self::Anonymous => None,
        }
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.identity().map(|i| i.customer_id)
    }

    pub fn roles(&self) -> &[Role] {
        self.identity().map(|i| i.roles.as_slice()).unwrap_or(&[])
    }

    /// Authenticated and carrying an administrator or staff role.
    pub fn is_elevated(&self) -> bool {
        self.roles().iter().any(Role::is_elevated)
    }
}
