//! Authorization service implementation
//!
//! Answers the engine's permission questions for administrative sign-up
//! operations. Configured administrators may act on any event; an event's
//! creator may act on their own event.

use std::collections::HashSet;
use std::sync::Arc;
use async_trait::async_trait;
use tracing::debug;
use crate::config::PermissionsConfig;
use crate::database::store::EventCatalog;
use crate::utils::errors::{Result, SignupError};

/// Administrative actions gated by the permission collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignUpAction {
    /// Withdraw another user's sign-up
    RemoveSignUp,
    /// List every sign-up record of an event
    ViewSignUps,
}

/// Permission collaborator boundary
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    async fn has_permission(&self, user_id: i64, action: SignUpAction, event_id: i64) -> Result<bool>;
}

/// Fail with `PermissionDenied` unless `user_id` may perform `action` on the event
pub async fn require_permission(
    checker: &dyn PermissionChecker,
    user_id: i64,
    action: SignUpAction,
    event_id: i64,
) -> Result<()> {
    if checker.has_permission(user_id, action, event_id).await? {
        Ok(())
    } else {
        Err(SignupError::PermissionDenied(format!(
            "User {} lacks permission {:?} on event {}",
            user_id, action, event_id
        )))
    }
}

#[derive(Clone)]
pub struct AuthService {
    catalog: Arc<dyn EventCatalog>,
    admin_ids: HashSet<i64>,
}

impl AuthService {
    pub fn new(catalog: Arc<dyn EventCatalog>, config: &PermissionsConfig) -> Self {
        Self {
            catalog,
            admin_ids: config.admin_ids.iter().copied().collect(),
        }
    }

    /// Check if user is a platform administrator
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Check if user created the event
    pub async fn is_organizer(&self, user_id: i64, event_id: i64) -> Result<bool> {
        let event = self.catalog.find_event(event_id).await?;
        Ok(event.map_or(false, |event| event.created_by == Some(user_id)))
    }
}

#[async_trait]
impl PermissionChecker for AuthService {
    async fn has_permission(&self, user_id: i64, action: SignUpAction, event_id: i64) -> Result<bool> {
        let allowed = match action {
            SignUpAction::RemoveSignUp | SignUpAction::ViewSignUps => {
                self.is_admin(user_id) || self.is_organizer(user_id, event_id).await?
            }
        };
        debug!(user_id = user_id, event_id = event_id, action = ?action, allowed = allowed, "Permission checked");
        Ok(allowed)
    }
}
