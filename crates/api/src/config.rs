//! Process configuration from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;

/// Runtime configuration of the API server.
///
/// Read once at startup; a malformed value fails the process with context
/// instead of silently falling back.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Address to listen on (`VEXO_BIND_ADDR`, default `0.0.0.0:8080`).
    pub bind_addr: SocketAddr,
    /// Time budget for one storage transaction
    /// (`VEXO_TXN_TIMEOUT_MS`, default 5000).
    pub txn_timeout: Duration,
    /// Postgres connection string (`DATABASE_URL`). When absent the server
    /// runs on the in-memory store, which is only meant for development.
    pub database_url: Option<String>,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = std::env::var("VEXO_BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse::<SocketAddr>()
            .context("VEXO_BIND_ADDR must be a socket address like 0.0.0.0:8080")?;

        let txn_timeout_ms = match std::env::var("VEXO_TXN_TIMEOUT_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .context("VEXO_TXN_TIMEOUT_MS must be a number of milliseconds")?,
            Err(_) => 5000,
        };

        Ok(Self {
            bind_addr,
            txn_timeout: Duration::from_millis(txn_timeout_ms),
            database_url: std::env::var("DATABASE_URL").ok(),
        })
    }
}
