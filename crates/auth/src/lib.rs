//! `freshfood-auth` — pure authentication/authorization boundary.
//!
//! Credential storage and sessions belong to the identity provider; this crate
//! only models the resolved principal, the operations it may attempt, and the
//! stateless policy deciding between them. It is decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod operation;
pub mod principal;
pub mod roles;

pub use authorize::{authorize, explain_authorization, is_authorized, AuthorizationExplanation, AuthzError};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use operation::{Operation, Requirement};
pub use principal::{Identity, Principal};
pub use roles::Role;
