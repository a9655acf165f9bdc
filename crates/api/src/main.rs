use std::sync::Arc;

use warden_api::app::build_app;
use warden_api::audit::TracingAuditSink;
use warden_api::catalog::register_default_policies;
use warden_api::enforce::EnforceState;
use warden_api::registry::{EndpointPolicyRegistry, FallbackMode};
use warden_authz::{
    CacheConfig, DecisionCache, Effect, EvaluatorConfig, Grant, InMemoryPolicyStore,
    PermissionCode, PermissionEvaluator, PolicyStore, ResourceKey, RoleAssignment, RoleCode,
};
use warden_core::{TenantId, UserId};

#[tokio::main]
async fn main() {
    warden_observability::init();

    let mode = match std::env::var("WARDEN_POLICY_MODE").as_deref() {
        Ok("strict") => FallbackMode::Strict,
        Ok("relax") | Err(_) => FallbackMode::Relax,
        Ok(other) => {
            tracing::warn!(%other, "unknown WARDEN_POLICY_MODE; defaulting to relax");
            FallbackMode::Relax
        }
    };

    let bypass_role_code = std::env::var("WARDEN_BYPASS_ROLE")
        .map(RoleCode::new)
        .unwrap_or_else(|_| RoleCode::new("ADMIN"));

    let registry = Arc::new(EndpointPolicyRegistry::new(mode));
    register_default_policies(&registry).expect("default endpoint policy table must compile");

    // Demo-seeded in-memory store. A real deployment implements `PolicyStore`
    // against the administration database instead.
    let store = Arc::new(InMemoryPolicyStore::new());
    let (tenant, admin, viewer) = seed_demo_data(&store, &bypass_role_code);
    tracing::info!(
        %tenant,
        %admin,
        %viewer,
        "demo tenant seeded; authenticate via x-auth-subject / x-auth-tenant headers"
    );

    let evaluator = Arc::new(PermissionEvaluator::new(
        store as Arc<dyn PolicyStore>,
        DecisionCache::new(CacheConfig::default()),
        EvaluatorConfig { bypass_role_code },
    ));

    let state = EnforceState {
        registry,
        evaluator,
        audit: Arc::new(TracingAuditSink),
    };

    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
        .await
        .expect("failed to bind 0.0.0.0:8080");

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}

/// One tenant, one administrator (bypass role, no grants needed), and one
/// viewer who may read the user directory and inspect their own permissions.
fn seed_demo_data(
    store: &InMemoryPolicyStore,
    bypass_role_code: &RoleCode,
) -> (TenantId, UserId, UserId) {
    let tenant = TenantId::new();
    let admin_user = UserId::new();
    let viewer_user = UserId::new();

    let admin_role = store.add_role(tenant, bypass_role_code.clone(), "Administrator");
    store.add_assignment(tenant, RoleAssignment::to_user(admin_role, admin_user));

    let viewer_role = store.add_role(tenant, RoleCode::new("VIEWER"), "Viewer");
    store.add_assignment(tenant, RoleAssignment::to_user(viewer_role, viewer_user));

    let view = store.add_permission(PermissionCode::VIEW);
    let use_permission = store.add_permission(PermissionCode::USE);
    store.add_permission(PermissionCode::EDIT);
    store.add_permission(PermissionCode::EXECUTE);

    let users_menu = store.add_resource(Some(tenant), ResourceKey::new("menu.admin.users"));
    store.add_grant(
        tenant,
        Grant {
            role_id: viewer_role,
            resource_id: users_menu,
            permission_id: view,
            effect: Effect::Allow,
        },
    );

    let inspect = store.add_resource(Some(tenant), ResourceKey::new("menu.authz.inspect"));
    store.add_grant(
        tenant,
        Grant {
            role_id: viewer_role,
            resource_id: inspect,
            permission_id: use_permission,
            effect: Effect::Allow,
        },
    );

    (tenant, admin_user, viewer_user)
}
