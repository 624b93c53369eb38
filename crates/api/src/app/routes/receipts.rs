use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use uuid::Uuid;

use vexo_auth::AuthorizedCaller;
use vexo_infra::Store;

use crate::app::dto::UpsertReceiptRequest;
use crate::app::errors;
use crate::app::AppState;

pub fn router<S: Store>() -> Router {
    Router::new().route("/:order_id", post(upsert::<S>).get(get_one::<S>))
}

async fn upsert<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Path(order_id): Path<Uuid>,
    Json(body): Json<UpsertReceiptRequest>,
) -> Response {
    if let Err(err) = caller.require_admin() {
        return errors::auth_error_to_response(err);
    }
    match state.receipts.upsert(order_id.into(), body.into()).await {
        Ok(receipt) => Json(receipt).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}

async fn get_one<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
    Path(order_id): Path<Uuid>,
) -> Response {
    match state.receipts.get(&caller, order_id.into()).await {
        Ok(receipt) => Json(receipt).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}
