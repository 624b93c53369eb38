//! Error-to-response mapping.
//!
//! Handlers never build error bodies themselves; everything funnels through
//! these functions so the wire format stays uniform:
//! `{"error": <code>, "message": <text>}` plus `product_id` where the error
//! names one.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use vexo_auth::AuthError;
use vexo_core::{DomainError, ProductId};
use vexo_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store(e) if e.is_retryable() => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "store_busy",
            format!("{e}; the request may be retried"),
        ),
        ServiceError::Store(e) => {
            tracing::error!(error = %e, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::UnknownProduct(id) => product_error(
            StatusCode::BAD_REQUEST,
            "unknown_product",
            format!("unknown product: {id}"),
            id,
        ),
        DomainError::InsufficientStock(id) => product_error(
            StatusCode::CONFLICT,
            "insufficient_stock",
            format!("insufficient stock for product: {id}"),
            id,
        ),
    }
}

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    match err {
        AuthError::Unauthorized(msg) => json_error(StatusCode::UNAUTHORIZED, "unauthorized", msg),
        AuthError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Error body that names the offending product.
fn product_error(
    status: StatusCode,
    code: &'static str,
    message: String,
    product_id: ProductId,
) -> axum::response::Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message,
            "product_id": product_id,
        })),
    )
        .into_response()
}
