use serde::Serialize;
use thiserror::Error;

use freshfood_core::CustomerId;

use crate::{Operation, Principal, Requirement};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required for '{0}'")]
    Unauthenticated(Operation),

    #[error("forbidden: '{0}' requires an administrator or staff role")]
    Forbidden(Operation),
}

/// Decide whether `principal` may perform `operation`.
///
/// - No IO
/// - No panics
/// - No state (the same inputs always give the same answer)
pub fn is_authorized(principal: &Principal, operation: Operation) -> bool {
    authorize(principal, operation).is_ok()
}

/// Like [`is_authorized`], but says why a request was denied.
pub fn authorize(principal: &Principal, operation: Operation) -> Result<(), AuthzError> {
    match operation.requirement() {
        Requirement::Anyone => Ok(()),
        Requirement::Authenticated if principal.is_authenticated() => Ok(()),
        Requirement::Authenticated => Err(AuthzError::Unauthenticated(operation)),
        Requirement::Elevated if !principal.is_authenticated() => {
            Err(AuthzError::Unauthenticated(operation))
        }
        Requirement::Elevated if principal.is_elevated() => Ok(()),
        Requirement::Elevated => Err(AuthzError::Forbidden(operation)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
///
/// Logged alongside denials so an operator can tell why a request was
/// redirected to the login entry point.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub operation: Operation,
    pub requirement: Requirement,
    pub granted: bool,
    pub reason: String,
    pub principal: PrincipalState,
}

/// Snapshot of the principal being checked.
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub authenticated: bool,
    pub customer_id: Option<CustomerId>,
    pub roles: Vec<String>,
    pub elevated: bool,
}

pub fn explain_authorization(principal: &Principal, operation: Operation) -> AuthorizationExplanation {
    let state = PrincipalState {
        authenticated: principal.is_authenticated(),
        customer_id: principal.customer_id(),
        roles: principal.roles().iter().map(|r| r.as_str().to_string()).collect(),
        elevated: principal.is_elevated(),
    };

    let (granted, reason) = match authorize(principal, operation) {
        Ok(()) => match operation.requirement() {
            Requirement::Anyone => (true, "operation is open to everyone".to_string()),
            Requirement::Authenticated => (true, "principal is authenticated".to_string()),
            Requirement::Elevated => (
                true,
                format!("principal holds an elevated role: {:?}", state.roles),
            ),
        },
        Err(AuthzError::Unauthenticated(_)) => (false, "principal is anonymous".to_string()),
        Err(AuthzError::Forbidden(_)) => (
            false,
            format!("no administrator or staff role among {:?}", state.roles),
        ),
    };

    AuthorizationExplanation {
        operation,
        requirement: operation.requirement(),
        granted,
        reason,
        principal: state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn anonymous() -> Principal {
        Principal::Anonymous
    }

    fn customer() -> Principal {
        Principal::authenticated(CustomerId::new(10), "alice", vec![Role::new("customer")])
    }

    fn staff() -> Principal {
        Principal::authenticated(CustomerId::new(20), "sam", vec![Role::STAFF])
    }

    fn admin() -> Principal {
        Principal::authenticated(CustomerId::new(30), "root", vec![Role::new("customer"), Role::ADMIN])
    }

    #[test]
    fn catalog_listing_is_open_to_everyone() {
        for p in [anonymous(), customer(), staff(), admin()] {
            assert!(is_authorized(&p, Operation::ViewCatalog));
        }
    }

    #[test]
    fn product_detail_and_own_orders_need_any_login() {
        for op in [Operation::ViewProduct, Operation::ViewOwnOrders] {
            assert_eq!(authorize(&anonymous(), op), Err(AuthzError::Unauthenticated(op)));
            assert!(is_authorized(&customer(), op));
            assert!(is_authorized(&staff(), op));
        }
    }

    #[test]
    fn management_needs_an_elevated_role() {
        for op in [Operation::ManageCatalog, Operation::ViewAllOrders, Operation::ManageOrders] {
            assert_eq!(authorize(&anonymous(), op), Err(AuthzError::Unauthenticated(op)));
            assert_eq!(authorize(&customer(), op), Err(AuthzError::Forbidden(op)));
            assert!(is_authorized(&staff(), op));
            assert!(is_authorized(&admin(), op));
        }
    }

    #[test]
    fn authenticated_principal_without_roles_is_not_elevated() {
        let p = Principal::authenticated(CustomerId::new(1), "bob", vec![]);
        assert!(!is_authorized(&p, Operation::ManageCatalog));
        assert!(is_authorized(&p, Operation::ViewOwnOrders));
    }

    #[test]
    fn explanation_matches_decision() {
        for p in [anonymous(), customer(), staff()] {
            for op in Operation::ALL {
                let explanation = explain_authorization(&p, op);
                assert_eq!(explanation.granted, is_authorized(&p, op));
                assert_eq!(explanation.requirement, op.requirement());
            }
        }

        let denied = explain_authorization(&customer(), Operation::ManageOrders);
        assert!(!denied.granted);
        assert!(denied.reason.contains("customer"));
    }
}
