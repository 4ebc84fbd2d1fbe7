//! Personal tasks of the calling user.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use aluguetudo_core::TaskId;
use aluguetudo_tasks::TaskFields;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:id", get(get_task).patch(edit_task).delete(delete_task))
        .route("/:id/advance", post(advance_task))
}

fn parse_id(id: &str) -> Result<TaskId, axum::response::Response> {
    id.parse::<TaskId>()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid task id"))
}

pub async fn list_tasks(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::TaskListQuery>,
) -> axum::response::Response {
    let query = match query.to_query() {
        Ok(q) => q,
        Err(resp) => return resp,
    };

    services.tasks.read(principal.principal_id(), |board| {
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "items": board.list(&query),
                "summary": board.summary(),
            })),
        )
            .into_response()
    })
}

pub async fn get_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    services.tasks.read(principal.principal_id(), |board| match board.get(id) {
        Some(task) => (StatusCode::OK, Json(task)).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "task not found"),
    })
}

pub async fn create_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(fields): Json<TaskFields>,
) -> axum::response::Response {
    services.tasks.write(principal.principal_id(), |board| {
        match board.create(fields, Utc::now()) {
            Ok(task) => (StatusCode::CREATED, Json(task)).into_response(),
            Err(e) => errors::domain_error_to_response(e),
        }
    })
}

pub async fn edit_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(fields): Json<TaskFields>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    services.tasks.write(principal.principal_id(), |board| {
        match board.edit(id, fields, Utc::now()) {
            Ok(task) => (StatusCode::OK, Json(task)).into_response(),
            Err(e) => errors::domain_error_to_response(e),
        }
    })
}

/// Status only moves forward: pendente → em-andamento → concluida.
pub async fn advance_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    services.tasks.write(principal.principal_id(), |board| {
        match board.advance(id, Utc::now()) {
            Ok(task) => (StatusCode::OK, Json(task)).into_response(),
            Err(e) => errors::domain_error_to_response(e),
        }
    })
}

pub async fn delete_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    services.tasks.write(principal.principal_id(), |board| match board.delete(id) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::domain_error_to_response(e),
    })
}
