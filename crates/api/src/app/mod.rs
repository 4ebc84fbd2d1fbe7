//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend wiring, session registry, portal workflows per request
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and query mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use anyhow::Context;
use axum::{Extension, Router, routing::get};
use secrecy::ExposeSecret;
use tower::ServiceBuilder;

use aluguetudo_auth::{Hs256JwtIssuer, Hs256JwtValidator, JwtValidator};
use aluguetudo_gateway::{Backend, HttpBackend, InMemoryBackend};

use crate::config::{ApiConfig, BackendConfig};
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(mut config: ApiConfig) -> anyhow::Result<Router> {
    let backend: Arc<dyn Backend> = match std::mem::replace(&mut config.backend, BackendConfig::InMemory) {
        BackendConfig::InMemory => Arc::new(InMemoryBackend::new()),
        BackendConfig::Http(http) => {
            tracing::info!(base_url = %http.base_url, "using HTTP backend");
            Arc::new(HttpBackend::new(http).context("failed to build backend HTTP client")?)
        }
    };
    Ok(build_app_with_backend(config, backend))
}

/// Build the router against an explicit backend.
pub fn build_app_with_backend(config: ApiConfig, backend: Arc<dyn Backend>) -> Router {
    let secret = config.jwt_secret.expose_secret().as_bytes();
    let jwt: Arc<dyn JwtValidator> = Arc::new(Hs256JwtValidator::new(secret));
    let issuer = Hs256JwtIssuer::new(secret, config.session_ttl);

    let services = Arc::new(services::AppServices::new(
        backend,
        issuer,
        config.provisioning,
        config.bootstrap,
    ));
    let auth_state = middleware::AuthState {
        jwt: jwt.clone(),
        services: services.clone(),
    };

    // Protected routes: require a bearer token with a live session.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::public_router())
        .merge(protected)
        .layer(Extension(services))
        .layer(Extension(jwt))
        .layer(ServiceBuilder::new())
}
