//! Black-box tests for the enforcement gateway: the same router as prod,
//! bound to an ephemeral port, driven over HTTP.

use std::sync::{Arc, Mutex};

use reqwest::StatusCode;

use warden_api::app::build_app;
use warden_api::audit::{AuditSink, DenialRecord};
use warden_api::catalog::register_default_policies;
use warden_api::context::{
    CLAIM_DEPARTMENT_HEADER, CLAIM_TENANT_HEADER, SUBJECT_HEADER, TENANT_HEADER,
};
use warden_api::enforce::EnforceState;
use warden_api::registry::{EndpointPolicyRegistry, FallbackMode};
use warden_authz::{
    Actor, CacheConfig, DecisionCache, Effect, EvaluatorConfig, Grant, InMemoryPolicyStore,
    PermissionCode, PermissionEvaluator, PolicyStore, ResourceKey, RoleAssignment, RoleCode,
    StoreError,
};
use warden_core::{DepartmentId, PermissionId, ResourceId, RoleId, TenantId, UserId};

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

/// Collects denial records for assertions.
#[derive(Debug, Default)]
struct RecordingAuditSink {
    records: Mutex<Vec<DenialRecord>>,
}

impl RecordingAuditSink {
    fn records(&self) -> Vec<DenialRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record_denial(&self, record: DenialRecord) {
        self.records.lock().unwrap().push(record);
    }
}

/// A store whose substrate is down: every read faults.
struct FailingStore;

impl PolicyStore for FailingStore {
    fn user_role_ids(&self, _: TenantId, _: UserId) -> Result<Vec<RoleId>, StoreError> {
        Err(StoreError::Unavailable("db down".to_string()))
    }

    fn department_role_ids(
        &self,
        _: TenantId,
        _: DepartmentId,
    ) -> Result<Vec<RoleId>, StoreError> {
        Err(StoreError::Unavailable("db down".to_string()))
    }

    fn resource_id(&self, _: TenantId, _: &ResourceKey) -> Result<Option<ResourceId>, StoreError> {
        Err(StoreError::Unavailable("db down".to_string()))
    }

    fn resource_key(&self, _: TenantId, _: ResourceId) -> Result<Option<ResourceKey>, StoreError> {
        Err(StoreError::Unavailable("db down".to_string()))
    }

    fn permission_id(&self, _: &PermissionCode) -> Result<Option<PermissionId>, StoreError> {
        Err(StoreError::Unavailable("db down".to_string()))
    }

    fn permission_code(&self, _: PermissionId) -> Result<Option<PermissionCode>, StoreError> {
        Err(StoreError::Unavailable("db down".to_string()))
    }

    fn grants(&self, _: TenantId, _: &[RoleId]) -> Result<Vec<Grant>, StoreError> {
        Err(StoreError::Unavailable("db down".to_string()))
    }

    fn role_id_by_code(&self, _: TenantId, _: &RoleCode) -> Result<Option<RoleId>, StoreError> {
        Err(StoreError::Unavailable("db down".to_string()))
    }
}

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(store: Arc<dyn PolicyStore>, mode: FallbackMode, audit: Arc<dyn AuditSink>) -> Self {
        let registry = Arc::new(EndpointPolicyRegistry::new(mode));
        register_default_policies(&registry).unwrap();

        let evaluator = Arc::new(PermissionEvaluator::new(
            store,
            DecisionCache::new(CacheConfig::default()),
            EvaluatorConfig::default(),
        ));

        let app = build_app(EnforceState {
            registry,
            evaluator,
            audit,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Seeded store + the identities black-box tests act as.
struct Fixture {
    store: Arc<InMemoryPolicyStore>,
    tenant: TenantId,
    admin: UserId,
    viewer: UserId,
    viewer_role: RoleId,
    view: PermissionId,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(InMemoryPolicyStore::new());
        let tenant = TenantId::new();
        let admin = UserId::new();
        let viewer = UserId::new();

        let admin_role = store.add_role(tenant, RoleCode::new("ADMIN"), "Administrator");
        store.add_assignment(tenant, RoleAssignment::to_user(admin_role, admin));

        let viewer_role = store.add_role(tenant, RoleCode::new("VIEWER"), "Viewer");
        store.add_assignment(tenant, RoleAssignment::to_user(viewer_role, viewer));

        let view = store.add_permission(PermissionCode::VIEW);
        store.add_permission(PermissionCode::USE);
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

        Self {
            store,
            tenant,
            admin,
            viewer,
            viewer_role,
            view,
        }
    }

    async fn server(&self, mode: FallbackMode) -> (TestServer, Arc<RecordingAuditSink>) {
        let audit = Arc::new(RecordingAuditSink::default());
        let server = TestServer::spawn(
            Arc::clone(&self.store) as Arc<dyn PolicyStore>,
            mode,
            Arc::clone(&audit) as Arc<dyn AuditSink>,
        )
        .await;
        (server, audit)
    }

    fn actor(&self, user: UserId) -> Actor {
        Actor::new(self.tenant, user)
    }
}

fn authed(
    req: reqwest::RequestBuilder,
    actor: &Actor,
) -> reqwest::RequestBuilder {
    let mut req = req
        .header(SUBJECT_HEADER, actor.user_id.to_string())
        .header(CLAIM_TENANT_HEADER, actor.tenant_id.to_string());
    if let Some(department) = actor.primary_department_id {
        req = req.header(CLAIM_DEPARTMENT_HEADER, department.to_string());
    }
    req
}

async fn error_code(response: reqwest::Response) -> String {
    let body: serde_json::Value = response.json().await.unwrap();
    body["error"].as_str().unwrap().to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity / tenant states
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_public() {
    let fx = Fixture::new();
    let (server, _) = fx.server(FallbackMode::Relax).await;

    let response = reqwest::get(format!("{}/health", server.base_url)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_identity_is_auth_required() {
    let fx = Fixture::new();
    let (server, audit) = fx.server(FallbackMode::Relax).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/admin/users", server.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "auth_required");
    // Authentication-layer failures are never audited.
    assert!(audit.records().is_empty());
}

#[tokio::test]
async fn missing_tenant_is_rejected() {
    let fx = Fixture::new();
    let (server, _) = fx.server(FallbackMode::Relax).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/admin/users", server.base_url))
        .header(SUBJECT_HEADER, fx.viewer.to_string())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "tenant_missing");
}

#[tokio::test]
async fn tenant_mismatch_denies_regardless_of_grants() {
    let fx = Fixture::new();
    let (server, audit) = fx.server(FallbackMode::Relax).await;
    let client = reqwest::Client::new();

    // The viewer has a VIEW grant on this endpoint's resource, but the two
    // tenant channels disagree, and that check precedes permission logic.
    let response = authed(
        client.get(format!("{}/api/admin/users", server.base_url)),
        &fx.actor(fx.viewer),
    )
    .header(TENANT_HEADER, TenantId::new().to_string())
    .send()
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(response).await, "tenant_mismatch");
    assert!(audit.records().is_empty());
}

#[tokio::test]
async fn matching_tenant_channels_pass() {
    let fx = Fixture::new();
    let (server, _) = fx.server(FallbackMode::Relax).await;
    let client = reqwest::Client::new();

    let response = authed(
        client.get(format!("{}/api/admin/users", server.base_url)),
        &fx.actor(fx.viewer),
    )
    .header(TENANT_HEADER, fx.tenant.to_string())
    .send()
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_subject_is_token_invalid() {
    let fx = Fixture::new();
    let (server, _) = fx.server(FallbackMode::Relax).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/admin/users", server.base_url))
        .header(SUBJECT_HEADER, "not-a-uuid")
        .header(CLAIM_TENANT_HEADER, fx.tenant.to_string())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(response).await, "token_invalid");
}

// ─────────────────────────────────────────────────────────────────────────────
// Policy decisions
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn granted_user_clears_a_policy_match() {
    let fx = Fixture::new();
    let (server, audit) = fx.server(FallbackMode::Relax).await;
    let client = reqwest::Client::new();

    let response = authed(
        client.get(format!("{}/api/admin/users", server.base_url)),
        &fx.actor(fx.viewer),
    )
    .send()
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    // Allow paths emit no audit records.
    assert!(audit.records().is_empty());
}

#[tokio::test]
async fn ungranted_endpoint_is_forbidden_and_audited() {
    let fx = Fixture::new();
    let (server, audit) = fx.server(FallbackMode::Relax).await;
    let client = reqwest::Client::new();

    // The viewer has no grant on the roles area.
    let response = authed(
        client.get(format!("{}/api/admin/roles", server.base_url)),
        &fx.actor(fx.viewer),
    )
    .send()
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(response).await, "forbidden");

    let records = audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].tenant_id, fx.tenant);
    assert_eq!(records[0].user_id, fx.viewer);
    assert_eq!(records[0].resource_key, ResourceKey::new("menu.admin.roles"));
    assert_eq!(records[0].permission_code, PermissionCode::VIEW);
    assert_eq!(records[0].http_method, "GET");
    assert_eq!(records[0].path, "/api/admin/roles");
}

#[tokio::test]
async fn deny_grant_overrides_allow_over_http() {
    let fx = Fixture::new();

    // A second role denies what the viewer role allows.
    let restricted = fx.store.add_role(fx.tenant, RoleCode::new("RESTRICTED"), "Restricted");
    fx.store
        .add_assignment(fx.tenant, RoleAssignment::to_user(restricted, fx.viewer));
    let users_menu = fx
        .store
        .resource_id(fx.tenant, &ResourceKey::new("menu.admin.users"))
        .unwrap()
        .unwrap();
    fx.store.add_grant(
        fx.tenant,
        Grant {
            role_id: restricted,
            resource_id: users_menu,
            permission_id: fx.view,
            effect: Effect::Deny,
        },
    );

    let (server, _) = fx.server(FallbackMode::Relax).await;
    let client = reqwest::Client::new();

    let response = authed(
        client.get(format!("{}/api/admin/users", server.base_url)),
        &fx.actor(fx.viewer),
    )
    .send()
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn administrator_bypasses_with_zero_grants() {
    let fx = Fixture::new();
    let (server, _) = fx.server(FallbackMode::Relax).await;
    let client = reqwest::Client::new();

    let response = authed(
        client.get(format!("{}/api/admin/roles", server.base_url)),
        &fx.actor(fx.admin),
    )
    .send()
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn conjunctive_policies_require_every_permission() {
    let fx = Fixture::new();

    // VIEW on the audit area, but not EXECUTE: export must fail on the
    // second of its two registered policies.
    let audit_menu = fx.store.add_resource(Some(fx.tenant), ResourceKey::new("menu.admin.audit"));
    fx.store.add_grant(
        fx.tenant,
        Grant {
            role_id: fx.viewer_role,
            resource_id: audit_menu,
            permission_id: fx.view,
            effect: Effect::Allow,
        },
    );

    let (server, audit) = fx.server(FallbackMode::Relax).await;
    let client = reqwest::Client::new();

    let response = authed(
        client.post(format!("{}/api/admin/audit-logs/export", server.base_url)),
        &fx.actor(fx.viewer),
    )
    .send()
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let records = audit.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].permission_code, PermissionCode::EXECUTE);

    // Granting EXECUTE as well clears both requirements.
    let execute = fx.store.add_permission(PermissionCode::EXECUTE);
    fx.store.add_grant(
        fx.tenant,
        Grant {
            role_id: fx.viewer_role,
            resource_id: audit_menu,
            permission_id: execute,
            effect: Effect::Allow,
        },
    );
    let (server, _) = fx.server(FallbackMode::Relax).await;

    let response = authed(
        client.post(format!("{}/api/admin/audit-logs/export", server.base_url)),
        &fx.actor(fx.viewer),
    )
    .send()
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ─────────────────────────────────────────────────────────────────────────────
// Fallback modes
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn relax_mode_requires_admin_for_unmatched_paths() {
    let fx = Fixture::new();
    let (server, audit) = fx.server(FallbackMode::Relax).await;
    let client = reqwest::Client::new();

    // Anchoring: an extra path segment falls out of the catalog entirely.
    let url = format!("{}/api/admin/users/42/extra", server.base_url);

    let denied = authed(client.get(&url), &fx.actor(fx.viewer)).send().await.unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    // Fallback denials are not policy-match denials: no audit record.
    assert!(audit.records().is_empty());

    let allowed = authed(client.get(&url), &fx.actor(fx.admin)).send().await.unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
}

#[tokio::test]
async fn strict_mode_denies_unmatched_paths_even_for_admin() {
    let fx = Fixture::new();
    let (server, _) = fx.server(FallbackMode::Strict).await;
    let client = reqwest::Client::new();

    let response = authed(
        client.get(format!("{}/api/admin/unknown", server.base_url)),
        &fx.actor(fx.admin),
    )
    .send()
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ─────────────────────────────────────────────────────────────────────────────
// Substrate failure
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn store_failure_is_internal_not_forbidden() {
    let fx = Fixture::new();
    let audit = Arc::new(RecordingAuditSink::default());
    let server = TestServer::spawn(
        Arc::new(FailingStore) as Arc<dyn PolicyStore>,
        FallbackMode::Relax,
        Arc::clone(&audit) as Arc<dyn AuditSink>,
    )
    .await;
    let client = reqwest::Client::new();

    let response = authed(
        client.get(format!("{}/api/admin/users", server.base_url)),
        &fx.actor(fx.viewer),
    )
    .send()
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(response).await, "internal");
    assert!(audit.records().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Introspection
// ─────────────────────────────────────────────────────────────────────────────

fn grant_inspect(fx: &Fixture) {
    let inspect = fx.store.add_resource(Some(fx.tenant), ResourceKey::new("menu.authz.inspect"));
    let use_permission = fx.store.add_permission(PermissionCode::USE);
    fx.store.add_grant(
        fx.tenant,
        Grant {
            role_id: fx.viewer_role,
            resource_id: inspect,
            permission_id: use_permission,
            effect: Effect::Allow,
        },
    );
}

#[tokio::test]
async fn permission_list_materializes_allows() {
    let fx = Fixture::new();
    grant_inspect(&fx);
    let (server, _) = fx.server(FallbackMode::Relax).await;
    let client = reqwest::Client::new();

    let response = authed(
        client.get(format!("{}/api/authz/permissions", server.base_url)),
        &fx.actor(fx.viewer),
    )
    .send()
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    let permissions = body["permissions"].as_array().unwrap();
    assert!(permissions.iter().any(|p| {
        p["resource_key"] == "menu.admin.users" && p["permission_code"] == "VIEW"
    }));
}

#[tokio::test]
async fn decision_explain_distinguishes_bypass_from_grant() {
    let fx = Fixture::new();
    grant_inspect(&fx);
    let (server, _) = fx.server(FallbackMode::Relax).await;
    let client = reqwest::Client::new();

    // The administrator clears the introspection policy via bypass, and the
    // explained decision records that basis.
    let response = authed(
        client.get(format!(
            "{}/api/authz/decisions?resource=menu.admin.users&permission=VIEW",
            server.base_url
        )),
        &fx.actor(fx.admin),
    )
    .send()
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["allowed"], true);
    assert_eq!(body["decision"]["outcome"], "allow_via_bypass");

    // The viewer is allowed through a plain grant.
    let response = authed(
        client.get(format!(
            "{}/api/authz/decisions?resource=menu.admin.users&permission=VIEW",
            server.base_url
        )),
        &fx.actor(fx.viewer),
    )
    .send()
    .await
    .unwrap();

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["allowed"], true);
    assert_eq!(body["decision"]["outcome"], "allow");
}
