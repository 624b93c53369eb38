use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, post};
use axum::{Json, Router};
use uuid::Uuid;

use vexo_auth::AuthorizedCaller;
use vexo_infra::Store;

use crate::app::dto::CategoryRequest;
use crate::app::errors;
use crate::app::AppState;

pub fn router<S: Store>() -> Router {
    Router::new()
        .route("/", post(create::<S>).get(list::<S>))
        .route("/:id", delete(remove::<S>).patch(rename::<S>))
}

async fn create<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Json(body): Json<CategoryRequest>,
) -> Response {
    if let Err(err) = caller.require_admin() {
        return errors::auth_error_to_response(err);
    }
    match state.catalog.create_category(body.into()).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

async fn list<S: Store>(Extension(state): Extension<Arc<AppState<S>>>) -> Response {
    match state.catalog.categories().await {
        Ok(categories) => Json(categories).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

async fn rename<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Path(id): Path<Uuid>,
    Json(body): Json<CategoryRequest>,
) -> Response {
    if let Err(err) = caller.require_admin() {
        return errors::auth_error_to_response(err);
    }
    match state.catalog.rename_category(id.into(), body.into()).await {
        Ok(category) => Json(category).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

/// Products referencing the category are detached, not deleted.
async fn remove<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Path(id): Path<Uuid>,
) -> Response {
    if let Err(err) = caller.require_admin() {
        return errors::auth_error_to_response(err);
    }
    match state.catalog.delete_category(id.into()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}
