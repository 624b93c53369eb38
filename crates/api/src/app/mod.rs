//! Application wiring: services behind an axum router.
//!
//! - `routes/`: handlers, one file per resource
//! - `dto.rs`: strict request DTOs (unknown fields rejected)
//! - `errors.rs`: one error-to-status mapping for every handler

use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Router};

use vexo_infra::{
    CartService, CatalogService, OrderService, ReceiptService, ShipmentService, StatsService,
    Store,
};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Every service, sharing one store.
///
/// Generic over the store so the same wiring serves the in-memory backend in
/// tests and Postgres in production.
pub struct AppState<S: Store> {
    pub orders: OrderService<S>,
    pub shipments: ShipmentService<S>,
    pub receipts: ReceiptService<S>,
    pub catalog: CatalogService<S>,
    pub cart: CartService<S>,
    pub stats: StatsService<S>,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            orders: OrderService::new(store.clone()),
            shipments: ShipmentService::new(store.clone()),
            receipts: ReceiptService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            cart: CartService::new(store.clone()),
            stats: StatsService::new(store),
        }
    }
}

/// Build the full router over the given store.
///
/// `/health` is public; everything else sits behind caller extraction.
pub fn build_router<S: Store>(store: S) -> Router {
    let state = Arc::new(AppState::new(store));

    let protected = routes::router::<S>()
        .layer(Extension(state))
        .layer(axum::middleware::from_fn(middleware::caller_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}
