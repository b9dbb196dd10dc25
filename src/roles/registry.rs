//! Client for the backend's role registry.
//!
//! The registry owns the roles; this client keeps a read-only copy of the
//! last fetch. A failed fetch degrades to an empty roster rather than a
//! stale one, and nothing is retried automatically.

use std::sync::{Arc, PoisonError, RwLock};

use crate::api::ApiClient;
use crate::api::wire::{
    ADD_ROLE_PATH, DELETE_ROLE_PATH, DeleteRoleRequest, ROLES_PATH, RolesEnvelope,
    UPDATE_ROLE_PATH, UpdateRoleRequest,
};
use crate::error::{
    DELETE_ROLE_FAILED, FETCH_ROLES_FAILED, SAVE_ROLE_FAILED, SessionError, SessionResult,
};
use crate::roles::types::Role;

/// Role Registry client with a cached roster.
#[derive(Debug)]
pub struct RoleRegistry {
    api: Arc<ApiClient>,
    roster: RwLock<Vec<Role>>,
}

impl RoleRegistry {
    /// Create a registry client. The cached roster starts empty.
    #[must_use]
    pub const fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            roster: RwLock::new(Vec::new()),
        }
    }

    /// Roster from the most recent fetch, in backend order.
    #[must_use]
    pub fn roster(&self) -> Vec<Role> {
        self.roster
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Look up a cached role by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Role> {
        self.roster
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|role| role.name == name)
            .cloned()
    }

    /// Fetch the current roster from `GET /api/roles`.
    ///
    /// # Errors
    /// Returns [`SessionError::RoleFetch`] on transport failure, non-success
    /// status or an unreadable body. The cached roster is cleared in that case.
    pub async fn fetch_roles(&self) -> SessionResult<Vec<Role>> {
        match self.api.get_json::<RolesEnvelope>(ROLES_PATH).await {
            Ok(envelope) => {
                let roles = envelope.into_roles();
                tracing::info!(count = roles.len(), "fetched role roster");
                self.store(roles.clone());
                Ok(roles)
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to fetch roles");
                self.store(Vec::new());
                Err(SessionError::RoleFetch {
                    message: err.user_message(FETCH_ROLES_FAILED),
                })
            }
        }
    }

    /// Explicit retry of [`Self::fetch_roles`].
    ///
    /// # Errors
    /// Same as [`Self::fetch_roles`].
    pub async fn refresh_roles(&self) -> SessionResult<Vec<Role>> {
        tracing::debug!("refreshing role roster");
        self.fetch_roles().await
    }

    /// Create a role, then refresh the roster.
    ///
    /// # Errors
    /// [`SessionError::RoleMutation`] if the role is invalid or rejected;
    /// [`SessionError::RoleFetch`] if the call succeeded but the refresh failed.
    pub async fn add_role(&self, role: &Role) -> SessionResult<Vec<Role>> {
        role.validate().map_err(SessionError::mutation)?;

        self.api
            .post_discard(ADD_ROLE_PATH, role)
            .await
            .map_err(|err| {
                tracing::warn!(role = %role.name, error = %err, "failed to add role");
                SessionError::mutation(err.user_message(SAVE_ROLE_FAILED))
            })?;

        tracing::info!(role = %role.name, "role added");
        self.refresh_roles().await
    }

    /// Replace the role currently named `original_name`, then refresh the roster.
    ///
    /// # Errors
    /// [`SessionError::RoleMutation`] if the role is invalid or rejected;
    /// [`SessionError::RoleFetch`] if the call succeeded but the refresh failed.
    pub async fn update_role(&self, original_name: &str, role: &Role) -> SessionResult<Vec<Role>> {
        role.validate().map_err(SessionError::mutation)?;

        let request = UpdateRoleRequest {
            role,
            original_name,
        };
        self.api
            .post_discard(UPDATE_ROLE_PATH, &request)
            .await
            .map_err(|err| {
                tracing::warn!(role = %original_name, error = %err, "failed to update role");
                SessionError::mutation(err.user_message(SAVE_ROLE_FAILED))
            })?;

        tracing::info!(from = %original_name, to = %role.name, "role updated");
        self.refresh_roles().await
    }

    /// Delete a role by name, then refresh the roster.
    ///
    /// # Errors
    /// [`SessionError::RoleMutation`] if the call is rejected;
    /// [`SessionError::RoleFetch`] if the call succeeded but the refresh failed.
    pub async fn delete_role(&self, name: &str) -> SessionResult<Vec<Role>> {
        if name.trim().is_empty() {
            return Err(SessionError::mutation("Role name must not be empty"));
        }

        self.api
            .post_discard(DELETE_ROLE_PATH, &DeleteRoleRequest { name })
            .await
            .map_err(|err| {
                tracing::warn!(role = %name, error = %err, "failed to delete role");
                SessionError::mutation(err.user_message(DELETE_ROLE_FAILED))
            })?;

        tracing::info!(role = %name, "role deleted");
        self.refresh_roles().await
    }

    fn store(&self, roles: Vec<Role>) {
        *self.roster.write().unwrap_or_else(PoisonError::into_inner) = roles;
    }
}
