//! The authenticated caller passed into every core operation.

use serde::{Deserialize, Serialize};

use vexo_core::UserId;

use crate::error::{AuthError, AuthResult};
use crate::roles::Role;

/// A caller whose identity and role were already resolved upstream.
///
/// The core never re-resolves identity or roles; it receives this value once
/// per request and applies capability checks (`require_admin`) at the
/// operation boundary plus ownership checks (`may_act_on`) inside operations.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy checks)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedCaller {
    pub user_id: UserId,
    pub role: Role,
}

impl AuthorizedCaller {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn customer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Customer)
    }

    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Capability gate for admin-only operations.
    pub fn require_admin(&self) -> AuthResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AuthError::forbidden("admin role required"))
        }
    }

    /// Ownership rule: a caller may act on a resource it owns; admins may act
    /// on anything.
    pub fn may_act_on(&self, owner: UserId) -> bool {
        self.is_admin() || self.user_id == owner
    }
}
