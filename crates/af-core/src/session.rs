//! In-process session holder for clients that manage sign-in themselves.

use crate::models::User;
use crate::traits::SessionProvider;
use std::sync::{PoisonError, RwLock};

/// A `SessionProvider` backed by a lock-guarded slot.
#[derive(Debug, Default)]
pub struct LocalSession {
    user: RwLock<Option<User>>,
}

impl LocalSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user: User) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub fn sign_in(&self, user: User) {
        tracing::info!(user_id = %user.id, "signed in");
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    pub fn sign_out(&self) {
        tracing::info!("signed out");
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl SessionProvider for LocalSession {
    fn current_user(&self) -> Option<User> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
