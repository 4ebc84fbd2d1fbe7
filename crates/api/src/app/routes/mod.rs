use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod navigation;
pub mod system;
pub mod tasks;
pub mod users;

/// Routes reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/bootstrap-admin", post(auth::bootstrap_admin))
        .route("/routes/resolve", get(navigation::resolve_route))
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/auth/logout", post(auth::logout))
        .route("/navigation", get(navigation::navigation))
        .nest("/users", users::router())
        .nest("/tasks", tasks::router())
}
