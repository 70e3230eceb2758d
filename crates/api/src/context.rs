use freshfood_auth::{Principal, Role};
use freshfood_core::CustomerId;

/// Principal context for a request (anonymous or authenticated identity + roles).
///
/// Always present on routed requests; the auth middleware inserts
/// [`Principal::Anonymous`] when no bearer token was sent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.principal.customer_id()
    }

    pub fn roles(&self) -> &[Role] {
        self.principal.roles()
    }
}
