// crates/intel-gate-gateway/src/server.rs
// ============================================================================
// Module: Share Gateway Server
// Description: HTTP routes serving published share artifacts.
// Purpose: Enforce auth before existence and serve complete artifacts only.
// Dependencies: axum, intel-gate-export, tokio
// ============================================================================

//! ## Overview
//! The gateway serves the share tree read-only over four GET routes:
//! `/share/index.json`, `/share/public/{*path}`,
//! `/share/partners/{partner}/{*path}`, and `/share/internal/{*path}`.
//! Authorization runs before any filesystem access, so an unauthenticated
//! caller learns nothing about which partners or artifacts exist: bad or
//! missing keys always yield 401, and 404 is only reachable after auth
//! passes. Routes accept GET only; other methods get 405 from the method
//! router. State is immutable after startup and shared behind an `Arc`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::ConnectInfo;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::MethodFilter;
use axum::routing::on;
use intel_gate_export::ArtifactTree;
use intel_gate_export::MANIFEST_PATH;
use thiserror::Error;

use crate::auth::AuthContext;
use crate::auth::GatewayAuditEvent;
use crate::auth::GatewayAuditSink;
use crate::auth::ShareAuthz;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Partner key header name.
pub const PARTNER_KEY_HEADER: &str = "x-api-key";
/// Internal key header name.
pub const INTERNAL_KEY_HEADER: &str = "x-internal-key";
/// Maximum accepted length of a wildcard artifact path.
const MAX_REQUEST_PATH_LENGTH: usize = 1024;
/// Maximum accepted length of one path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gateway server errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The listen address could not be bound.
    #[error("bind failed: {0}")]
    Bind(String),
    /// The server loop terminated with an error.
    #[error("gateway server failed: {0}")]
    Serve(String),
}

// ============================================================================
// SECTION: State
// ============================================================================

/// Immutable gateway state shared across requests.
pub struct GatewayState {
    /// Read-only handle to the share tree.
    tree: ArtifactTree,
    /// Key authorizer.
    authz: ShareAuthz,
    /// Audit sink for request outcomes.
    audit: Arc<dyn GatewayAuditSink>,
}

impl GatewayState {
    /// Creates gateway state over a share tree and key registry.
    #[must_use]
    pub fn new(tree: ArtifactTree, authz: ShareAuthz, audit: Arc<dyn GatewayAuditSink>) -> Self {
        Self {
            tree,
            authz,
            audit,
        }
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the share router over the given state.
#[must_use]
pub fn share_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/share/index.json", on(MethodFilter::GET, handle_manifest))
        .route("/share/public/{*path}", on(MethodFilter::GET, handle_public))
        .route("/share/partners/{partner}/{*path}", on(MethodFilter::GET, handle_partner))
        .route("/share/internal/{*path}", on(MethodFilter::GET, handle_internal))
        .with_state(state)
}

/// Binds the listen address and serves the share router until the task is
/// cancelled or the listener fails.
///
/// # Errors
///
/// Returns [`GatewayError`] when binding or serving fails.
pub async fn serve(state: Arc<GatewayState>, bind: SocketAddr) -> Result<(), GatewayError> {
    let app = share_router(state);
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| GatewayError::Bind(err.to_string()))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|err| GatewayError::Serve(err.to_string()))
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Serves the share manifest. Public tier.
async fn handle_manifest(
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    let auth = state.authz.authorize_public();
    serve_artifact(&state, "/share/index.json", MANIFEST_PATH, peer, &auth).await
}

/// Serves public-tier artifacts. No credentials required.
async fn handle_public(
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(path): Path<String>,
) -> Response {
    let auth = state.authz.authorize_public();
    let request_path = format!("/share/public/{path}");
    let Some(relative) = artifact_relative_path("public", &path) else {
        return not_found(&state, &request_path, peer, &auth);
    };
    serve_artifact(&state, &request_path, &relative, peer, &auth).await
}

/// Serves partner-tier artifacts gated on the partner's API key.
async fn handle_partner(
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path((partner, path)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let request_path = format!("/share/partners/{partner}/{path}");
    let presented = header_value(&headers, PARTNER_KEY_HEADER);
    let auth = match state.authz.authorize_partner(&partner, presented) {
        Ok(auth) => auth,
        Err(error) => {
            return unauthorized(&state, &request_path, peer, "partner", &error.to_string());
        }
    };
    let Some(relative) = artifact_relative_path(&format!("partners/{partner}"), &path) else {
        return not_found(&state, &request_path, peer, &auth);
    };
    serve_artifact(&state, &request_path, &relative, peer, &auth).await
}

/// Serves internal-tier artifacts gated on the internal key set.
async fn handle_internal(
    State(state): State<Arc<GatewayState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    let request_path = format!("/share/internal/{path}");
    let presented = header_value(&headers, INTERNAL_KEY_HEADER);
    let auth = match state.authz.authorize_internal(presented) {
        Ok(auth) => auth,
        Err(error) => {
            return unauthorized(&state, &request_path, peer, "internal", &error.to_string());
        }
    };
    let Some(relative) = artifact_relative_path("internal", &path) else {
        return not_found(&state, &request_path, peer, &auth);
    };
    serve_artifact(&state, &request_path, &relative, peer, &auth).await
}

// ============================================================================
// SECTION: Responses
// ============================================================================

/// Reads an artifact and answers 200 or 404. Auth has already passed.
async fn serve_artifact(
    state: &GatewayState,
    request_path: &str,
    relative: &str,
    peer: SocketAddr,
    auth: &AuthContext,
) -> Response {
    let Ok(target) = state.tree.resolve(relative) else {
        return not_found(state, request_path, peer, auth);
    };
    match tokio::fs::read(&target).await {
        Ok(bytes) => {
            state.audit.record(&GatewayAuditEvent::allowed(
                request_path,
                Some(peer.ip().to_string()),
                auth,
                200,
            ));
            (StatusCode::OK, [(CONTENT_TYPE, "application/json")], bytes).into_response()
        }
        Err(_) => not_found(state, request_path, peer, auth),
    }
}

/// Answers 404 for an authorized request whose artifact is absent.
fn not_found(
    state: &GatewayState,
    request_path: &str,
    peer: SocketAddr,
    auth: &AuthContext,
) -> Response {
    state.audit.record(&GatewayAuditEvent::allowed(
        request_path,
        Some(peer.ip().to_string()),
        auth,
        404,
    ));
    StatusCode::NOT_FOUND.into_response()
}

/// Answers 401 without revealing anything about the share tree.
fn unauthorized(
    state: &GatewayState,
    request_path: &str,
    peer: SocketAddr,
    tier: &'static str,
    reason: &str,
) -> Response {
    state.audit.record(&GatewayAuditEvent::denied(
        request_path,
        Some(peer.ip().to_string()),
        tier,
        reason,
    ));
    StatusCode::UNAUTHORIZED.into_response()
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts a header value as UTF-8 when present.
fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Joins a tier prefix and a validated wildcard path into a share-relative
/// artifact path. Returns `None` for paths that could escape the tree.
fn artifact_relative_path(prefix: &str, path: &str) -> Option<String> {
    if !is_valid_wildcard_path(path) {
        return None;
    }
    Some(format!("{prefix}/{path}"))
}

/// Validates a wildcard path segment against traversal and abuse.
fn is_valid_wildcard_path(path: &str) -> bool {
    if path.is_empty() || path.len() > MAX_REQUEST_PATH_LENGTH {
        return false;
    }
    if path.starts_with('/') || path.contains('\\') || path.contains('\0') {
        return false;
    }
    path.split('/').all(|component| {
        !component.is_empty()
            && component != "."
            && component != ".."
            && component.len() <= MAX_PATH_COMPONENT_LENGTH
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
