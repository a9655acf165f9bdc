use axum::http::HeaderMap;

/// Transport header carrying the client's tenant context.
///
/// This is the *second* channel for the tenant id (the first is the identity
/// claim); the enforcement gateway cross-checks the two before any
/// permission logic runs.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Headers the stub identity layer reads claims from (the shape an
/// authenticating reverse proxy would inject after verifying a token).
pub const SUBJECT_HEADER: &str = "x-auth-subject";
pub const CLAIM_TENANT_HEADER: &str = "x-auth-tenant";
pub const CLAIM_DEPARTMENT_HEADER: &str = "x-auth-department";

/// Identity claims for one request.
///
/// Produced by the external, already-verified authentication layer; this
/// core never sees raw tokens. Values stay unparsed strings here; shaping
/// them into an [`warden_authz::Actor`] (and rejecting malformed ones) is the
/// gateway's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    /// Subject (user) identifier.
    pub subject: String,

    /// Tenant claim, when the token carried one.
    pub tenant: Option<String>,

    /// Primary department claim, when present.
    pub department: Option<String>,
}

/// Stand-in for the upstream authentication layer: lifts pre-verified claim
/// headers into an [`IdentityClaims`] extension. Requests without a subject
/// header pass through claimless and fail the gateway's AuthCheck.
pub async fn stub_identity_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    if let Some(claims) = claims_from_headers(req.headers()) {
        req.extensions_mut().insert(claims);
    }
    next.run(req).await
}

fn claims_from_headers(headers: &HeaderMap) -> Option<IdentityClaims> {
    let subject = header_value(headers, SUBJECT_HEADER)?;
    Some(IdentityClaims {
        subject,
        tenant: header_value(headers, CLAIM_TENANT_HEADER),
        department: header_value(headers, CLAIM_DEPARTMENT_HEADER),
    })
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
