use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use warden_core::{DepartmentId, RoleId, TenantId, UserId};

/// Symbolic role code used for RBAC (e.g. "ADMIN", "AUDITOR").
///
/// Codes are intentionally opaque strings at this layer; which code carries
/// the administrative bypass is configuration, not vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleCode(Cow<'static, str>);

impl RoleCode {
    pub fn new(code: impl Into<Cow<'static, str>>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RoleCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A role as stored by the external administration surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub tenant_id: TenantId,
    pub code: RoleCode,
    pub name: String,
}

/// Subject of a role assignment.
///
/// A `User` assignment grants the role to exactly that actor; a `Department`
/// assignment grants it to every actor whose primary department matches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "id")]
pub enum RoleSubject {
    User(UserId),
    Department(DepartmentId),
}

/// Assignment of a role to a user or department.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role_id: RoleId,
    pub subject: RoleSubject,
}

impl RoleAssignment {
    pub fn to_user(role_id: RoleId, user_id: UserId) -> Self {
        Self {
            role_id,
            subject: RoleSubject::User(user_id),
        }
    }

    pub fn to_department(role_id: RoleId, department_id: DepartmentId) -> Self {
        Self {
            role_id,
            subject: RoleSubject::Department(department_id),
        }
    }
}
