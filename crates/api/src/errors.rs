use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use thiserror::Error;

/// Terminal failure of the enforcement state machine.
///
/// Every kind fails closed; there is no retry within the gateway. Only
/// `Internal` is a candidate for caller-level retry (idempotent reads).
/// Unresolvable resources/permissions never surface here: the evaluator
/// collapses them into a plain deny so callers cannot probe what exists.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnforceError {
    /// No validated identity present.
    #[error("authentication required")]
    AuthRequired,

    /// No tenant id resolvable from any input channel.
    #[error("tenant context missing")]
    TenantMissing,

    /// Two supplied tenant values disagree (cross-tenant confusion guard).
    #[error("tenant context mismatch")]
    TenantMismatch,

    /// Identity subject present but not parseable into the actor shape.
    #[error("identity claims invalid")]
    TokenInvalid,

    /// Permission evaluation denied, or the fallback mode denied.
    #[error("forbidden")]
    Forbidden,

    /// The policy store or cache substrate failed. Distinct from a denial
    /// and never collapsed into one.
    #[error("authorization backend failure")]
    Internal,
}

impl EnforceError {
    fn status(&self) -> StatusCode {
        match self {
            EnforceError::AuthRequired => StatusCode::UNAUTHORIZED,
            EnforceError::TenantMissing => StatusCode::UNAUTHORIZED,
            EnforceError::TenantMismatch => StatusCode::FORBIDDEN,
            EnforceError::TokenInvalid => StatusCode::UNAUTHORIZED,
            EnforceError::Forbidden => StatusCode::FORBIDDEN,
            EnforceError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            EnforceError::AuthRequired => "auth_required",
            EnforceError::TenantMissing => "tenant_missing",
            EnforceError::TenantMismatch => "tenant_mismatch",
            EnforceError::TokenInvalid => "token_invalid",
            EnforceError::Forbidden => "forbidden",
            EnforceError::Internal => "internal",
        }
    }
}

pub fn enforce_error_to_response(err: &EnforceError) -> axum::response::Response {
    json_error(err.status(), err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
