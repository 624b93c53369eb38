use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use vexo_auth::AuthorizedCaller;
use vexo_infra::Store;

use crate::app::dto::CreateOrderRequest;
use crate::app::errors;
use crate::app::AppState;

pub fn router<S: Store>() -> Router {
    Router::new()
        .route("/", post(create::<S>).get(list::<S>))
        .route("/:id", get(get_one::<S>))
        .route("/:id/cancel", post(cancel::<S>))
}

async fn create<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Json(body): Json<CreateOrderRequest>,
) -> Response {
    let lines = body.items.into_iter().map(Into::into).collect();
    match state.orders.create(&caller, lines).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

async fn list<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
) -> Response {
    match state.orders.list(&caller).await {
        Ok(orders) => Json(orders).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

async fn get_one<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.orders.get(&caller, id.into()).await {
        Ok(details) => Json(details).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

async fn cancel<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Path(id): Path<Uuid>,
) -> Response {
    match state.orders.cancel(&caller, id.into()).await {
        Ok(order) => Json(order).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}
