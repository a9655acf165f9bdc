use serde::{Deserialize, Serialize};

use warden_core::{DepartmentId, TenantId, UserId};

/// The authenticated subject of one request.
///
/// Supplied by the external identity layer once its token has been verified;
/// immutable for the duration of the request. The optional department is the
/// actor's *primary* organizational unit; role inheritance applies to that
/// department only, with no transitive hierarchy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub primary_department_id: Option<DepartmentId>,
}

impl Actor {
    pub fn new(tenant_id: TenantId, user_id: UserId) -> Self {
        Self {
            tenant_id,
            user_id,
            primary_department_id: None,
        }
    }

    pub fn with_department(mut self, department_id: DepartmentId) -> Self {
        self.primary_department_id = Some(department_id);
        self
    }
}
