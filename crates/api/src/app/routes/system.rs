use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use vexo_auth::AuthorizedCaller;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Echo the caller the middleware resolved; useful for gateway debugging.
pub async fn whoami(Extension(caller): Extension<AuthorizedCaller>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": caller.user_id,
        "role": caller.role.as_str(),
    }))
}
