//! Current-user identity supplied by the authentication subsystem

use crate::error::{ServiceError, ServiceResult};
use parking_lot::RwLock;
use uuid::Uuid;

pub trait IdentityProvider: Send + Sync {
    /// Identifier of the signed-in viewer, if any
    fn current_user_id(&self) -> Option<Uuid>;

    fn require_user(&self) -> ServiceResult<Uuid> {
        self.current_user_id().ok_or(ServiceError::Unauthenticated)
    }
}

/// Identity held in memory; sign-in and sign-out swap the stored id
#[derive(Default)]
pub struct StaticIdentity {
    user_id: RwLock<Option<Uuid>>,
}

impl StaticIdentity {
    pub fn signed_in(user_id: Uuid) -> Self {
        Self {
            user_id: RwLock::new(Some(user_id)),
        }
    }

    pub fn sign_in(&self, user_id: Uuid) {
        *self.user_id.write() = Some(user_id);
    }

    pub fn sign_out(&self) {
        *self.user_id.write() = None;
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<Uuid> {
        *self.user_id.read()
    }
}
