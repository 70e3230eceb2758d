//! Customer record as seen by the ordering domain.
//!
//! The identity provider owns credentials and sessions; orders only need the
//! stable id and the human-readable identifier used as a display fallback.

use serde::{Deserialize, Serialize};

use crate::{CustomerId, Entity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub username: String,
}

impl Customer {
    pub fn new(id: CustomerId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> CustomerId {
        self.id
    }
}
