//! Endpoint-policy registry: a small routing DSL mapping HTTP method + path
//! pattern to the permissions required to invoke it.
//!
//! Deliberately an ordered list of compiled tuples per method, not a map
//! keyed on pattern identity: regex objects make poor hash keys and
//! registration order matters to callers.

use std::collections::HashMap;

use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use warden_authz::{PermissionCode, ResourceKey};

/// One (resource, permission) requirement produced by a policy match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequiredPermission {
    pub resource_key: ResourceKey,
    pub permission_code: PermissionCode,
}

/// Behavior when no registered policy matches a request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// No match ⇒ require the administrative bypass role.
    Relax,
    /// No match ⇒ always deny, without consulting the admin check.
    Strict,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid path pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

#[derive(Debug)]
struct PolicyEntry {
    pattern: Regex,
    resource_key: ResourceKey,
    permission_code: PermissionCode,
}

/// Ordered table of endpoint policies, keyed by normalized HTTP method.
///
/// Registration normally happens once at process start (see `catalog`), but
/// both the table and the fallback mode stay mutable at runtime; lookups read
/// the current mode on every call.
pub struct EndpointPolicyRegistry {
    entries: RwLock<HashMap<String, Vec<PolicyEntry>>>,
    mode: RwLock<FallbackMode>,
}

impl EndpointPolicyRegistry {
    pub fn new(mode: FallbackMode) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            mode: RwLock::new(mode),
        }
    }

    /// Register a policy. `path_pattern` is compiled fully anchored: it must
    /// match the whole request path, never a substring. Duplicates are
    /// permitted; registration order is preserved per method.
    pub fn register(
        &self,
        method: &str,
        path_pattern: &str,
        resource_key: ResourceKey,
        permission_code: PermissionCode,
    ) -> Result<(), RegistryError> {
        let anchored = format!("^(?:{path_pattern})$");
        let pattern = Regex::new(&anchored).map_err(|source| RegistryError::InvalidPattern {
            pattern: path_pattern.to_string(),
            source,
        })?;

        let mut entries = self.entries.write();
        entries
            .entry(method.to_ascii_uppercase())
            .or_default()
            .push(PolicyEntry {
                pattern,
                resource_key,
                permission_code,
            });
        Ok(())
    }

    /// Every registered requirement whose method matches and whose pattern
    /// fully matches `path`, in registration order. An empty result is a
    /// valid outcome; the enforcement gateway's fallback mode decides what
    /// it means.
    pub fn find_policies(&self, method: &str, path: &str) -> Vec<RequiredPermission> {
        let entries = self.entries.read();
        let rows = match entries.get(&method.to_ascii_uppercase()) {
            Some(rows) => rows,
            None => return Vec::new(),
        };
        rows.iter()
            .filter(|e| e.pattern.is_match(path))
            .map(|e| RequiredPermission {
                resource_key: e.resource_key.clone(),
                permission_code: e.permission_code.clone(),
            })
            .collect()
    }

    pub fn mode(&self) -> FallbackMode {
        *self.mode.read()
    }

    pub fn set_mode(&self, mode: FallbackMode) {
        *self.mode.write() = mode;
        tracing::info!(?mode, "endpoint policy fallback mode changed");
    }

    /// Total number of registered policies (all methods).
    pub fn len(&self) -> usize {
        self.entries.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
