use std::collections::HashSet;
use std::sync::Arc;

use warden_core::RoleId;

use crate::actor::Actor;
use crate::store::{PolicyStore, StoreError};

/// Resolves an actor's effective role set.
///
/// Effective roles are the union of direct USER assignments and, when the
/// actor has a primary department, DEPARTMENT assignments for that
/// department. There is no transitive department hierarchy.
#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<dyn PolicyStore>,
}

impl RoleResolver {
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self { store }
    }

    /// Deduplicated role ids for the actor within its tenant.
    ///
    /// An actor the store knows nothing about resolves to the empty set:
    /// fail closed, not an error.
    pub fn effective_role_ids(&self, actor: &Actor) -> Result<HashSet<RoleId>, StoreError> {
        let mut roles: HashSet<RoleId> = self
            .store
            .user_role_ids(actor.tenant_id, actor.user_id)?
            .into_iter()
            .collect();

        if let Some(department_id) = actor.primary_department_id {
            roles.extend(self.store.department_role_ids(actor.tenant_id, department_id)?);
        }

        Ok(roles)
    }
}
