use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use vexo_auth::AuthorizedCaller;
use vexo_infra::Store;

use crate::app::dto::{AdjustStockRequest, CreateProductRequest, UpdateProductRequest};
use crate::app::errors;
use crate::app::AppState;

pub fn router<S: Store>() -> Router {
    Router::new()
        .route("/", post(create::<S>))
        .route("/:id", get(get_one::<S>).patch(update::<S>))
        .route("/:id/stock", post(adjust_stock::<S>))
}

async fn create<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Json(body): Json<CreateProductRequest>,
) -> Response {
    if let Err(err) = caller.require_admin() {
        return errors::auth_error_to_response(err);
    }
    match state.catalog.create_product(body.into()).await {
        Ok(product) => (StatusCode::CREATED, Json(product)).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

async fn get_one<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.catalog.product(id.into()).await {
        Ok(product) => Json(product).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

async fn update<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProductRequest>,
) -> Response {
    if let Err(err) = caller.require_admin() {
        return errors::auth_error_to_response(err);
    }
    match state.catalog.update_product(id.into(), body.into()).await {
        Ok(product) => Json(product).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

/// Delta-based restock/write-down; composes with concurrent reservations.
async fn adjust_stock<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Path(id): Path<Uuid>,
    Json(body): Json<AdjustStockRequest>,
) -> Response {
    if let Err(err) = caller.require_admin() {
        return errors::auth_error_to_response(err);
    }
    match state.catalog.adjust_stock(id.into(), body.delta).await {
        Ok(product) => Json(product).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}
