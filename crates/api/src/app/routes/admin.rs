use std::sync::Arc;

use axum::extract::Extension;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use vexo_auth::AuthorizedCaller;
use vexo_infra::Store;

use crate::app::errors;
use crate::app::AppState;

pub fn router<S: Store>() -> Router {
    Router::new().route("/stats", get(stats::<S>))
}

async fn stats<S: Store>(
    Extension(state): Extension<Arc<AppState<S>>>,
    Extension(caller): Extension<AuthorizedCaller>,
) -> Response {
    if let Err(err) = caller.require_admin() {
        return errors::auth_error_to_response(err);
    }
    match state.stats.overview().await {
        Ok(overview) => Json(overview).into_response(),
        Err(err) => errors::service_error_to_response(err),
    }
}
