use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use uuid::Uuid;

use vexo_auth::AuthorizedCaller;
use vexo_infra::Store;

use crate::app::dto::{CreateShipmentRequest, UpdateShipmentRequest};
use crate::app::errors;
use crate::app::AppState;

pub fn router<S: Store>() -> Router {
    Router::new().route("/:order_id", post(create::<S>).patch(update::<S>))
}

async fn create<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<CreateShipmentRequest>,
) -> Response {
    if let Err(err) = caller.require_admin() {
        return errors::auth_error_to_response(err);
    }
    match state.shipments.create(order_id.into(), body.into()).await {
        Ok(shipment) => (StatusCode::CREATED, Json(shipment)).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

async fn update<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<UpdateShipmentRequest>,
) -> Response {
    if let Err(err) = caller.require_admin() {
        return errors::auth_error_to_response(err);
    }
    match state.shipments.update(order_id.into(), body.into()).await {
        Ok(shipment) => Json(shipment).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}
