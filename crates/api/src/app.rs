//! HTTP application wiring (Axum router + middleware layering).

use axum::routing::get;
use axum::Router;

use crate::context::stub_identity_middleware;
use crate::enforce::{enforce_middleware, EnforceState};
use crate::routes;

/// Build the full HTTP router.
///
/// Everything except `/health` sits behind two layers, outermost first:
/// the identity layer (stand-in for the external authentication collaborator)
/// and the enforcement gateway. Paths without a dedicated handler fall
/// through to the downstream-surface stub once the gateway allows them.
pub fn build_app(state: EnforceState) -> Router {
    let protected = routes::authz_router(state.clone())
        .fallback(routes::admin_stub)
        .layer(axum::middleware::from_fn_with_state(
            state,
            enforce_middleware,
        ))
        .layer(axum::middleware::from_fn(stub_identity_middleware));

    Router::new()
        .route("/health", get(routes::health))
        .merge(protected)
}
