//! Caller extraction.
//!
//! Identity is resolved upstream; this layer only reads the trusted
//! `x-user-id` / `x-user-role` headers and makes the resulting
//! [`AuthorizedCaller`] available to every handler. It is the single place
//! where roles are parsed; handlers apply capability checks on the value.

use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use vexo_auth::{AuthError, AuthorizedCaller, Role};
use vexo_core::UserId;

use crate::app::errors::auth_error_to_response;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Reject requests without a resolvable caller, attach the caller otherwise.
pub async fn caller_middleware(mut req: Request, next: Next) -> Response {
    match caller_from_headers(req.headers()) {
        Ok(caller) => {
            req.extensions_mut().insert(caller);
            next.run(req).await
        }
        Err(err) => auth_error_to_response(err),
    }
}

fn caller_from_headers(headers: &HeaderMap) -> Result<AuthorizedCaller, AuthError> {
    let user_id = header_str(headers, USER_ID_HEADER)?
        .parse::<UserId>()
        .map_err(|_| AuthError::unauthorized(format!("{USER_ID_HEADER} must be a UUID")))?;
    let role = header_str(headers, USER_ROLE_HEADER)?.parse::<Role>()?;
    Ok(AuthorizedCaller::new(user_id, role))
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Result<&'h str, AuthError> {
    headers
        .get(name)
        .ok_or_else(|| AuthError::unauthorized(format!("missing {name} header")))?
        .to_str()
        .map_err(|_| AuthError::unauthorized(format!("{name} is not valid UTF-8")))
}
