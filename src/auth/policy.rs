//! Access policy for product management.
//!
//! Product operations take an [`AdminGrant`], which can only be obtained from
//! [`authorize`]. The identity extracted by the auth gate therefore has to pass
//! through the role check before any product store is reachable.
use tracing::warn;

use crate::{
    auth::claims::{Identity, Role},
    error::AppError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductOp {
    Get,
    ListByBrand,
    Create,
    Update,
    Delete,
}

/// Proof that the caller passed the admin check.
#[derive(Debug, Clone)]
pub struct AdminGrant {
    user_id: i64,
}

impl AdminGrant {
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    #[cfg(test)]
    pub(crate) fn for_tests(user_id: i64) -> Self {
        Self { user_id }
    }
}

pub fn authorize(identity: &Identity, op: ProductOp) -> Result<AdminGrant, AppError> {
    let required = match op {
        ProductOp::Get
        | ProductOp::ListByBrand
        | ProductOp::Create
        | ProductOp::Update
        | ProductOp::Delete => Role::Admin,
    };
    if identity.role != required {
        warn!(user_id = identity.user_id, ?op, "admin role required");
        return Err(AppError::Forbidden);
    }
    Ok(AdminGrant {
        user_id: identity.user_id,
    })
}
