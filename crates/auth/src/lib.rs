//! `vexo-auth` — pure authentication/authorization boundary (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage: the transport
//! layer resolves identities into an [`AuthorizedCaller`] exactly once, and
//! everything below works with that value.

pub mod caller;
pub mod error;
pub mod roles;

pub use caller::AuthorizedCaller;
pub use error::{AuthError, AuthResult};
pub use roles::Role;
