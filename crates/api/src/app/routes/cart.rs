use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, post};
use axum::{Json, Router};
use uuid::Uuid;

use vexo_auth::AuthorizedCaller;
use vexo_infra::Store;

use crate::app::dto::{AddCartItemRequest, SetCartQuantityRequest};
use crate::app::errors;
use crate::app::AppState;

pub fn router<S: Store>() -> Router {
    Router::new()
        .route("/", post(add::<S>).get(list::<S>))
        .route("/:item_id", delete(remove::<S>).patch(set_quantity::<S>))
}

async fn add<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Json(body): Json<AddCartItemRequest>,
) -> Response {
    match state.cart.add(&caller, body.into()).await {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

async fn list<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
) -> Response {
    match state.cart.list(&caller).await {
        Ok(entries) => Json(entries).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

async fn set_quantity<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Path(item_id): Path<Uuid>,
    Json(body): Json<SetCartQuantityRequest>,
) -> Response {
    match state
        .cart
        .set_quantity(&caller, item_id.into(), body.quantity)
        .await
    {
        Ok(item) => Json(item).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

async fn remove<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Path(item_id): Path<Uuid>,
) -> Response {
    match state.cart.remove(&caller, item_id.into()).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}
