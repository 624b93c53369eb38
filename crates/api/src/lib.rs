//! HTTP boundary of the vexo store core.
//!
//! The upstream gateway resolves each request to `{user_id, role}` and
//! forwards both in trusted headers; [`middleware`] turns them into an
//! `AuthorizedCaller` once per request. Everything else is routing, strict
//! DTO parsing, and error-to-status mapping around the services in
//! `vexo-infra`.

pub mod app;
pub mod config;
pub mod middleware;
