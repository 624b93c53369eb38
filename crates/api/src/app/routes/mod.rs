use axum::routing::get;
use axum::Router;

use vexo_infra::Store;

pub mod admin;
pub mod cart;
pub mod categories;
pub mod orders;
pub mod products;
pub mod receipts;
pub mod shipments;
pub mod system;

/// Router for everything behind caller extraction.
pub fn router<S: Store>() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/orders", orders::router::<S>())
        .nest("/shipments", shipments::router::<S>())
        .nest("/receipts", receipts::router::<S>())
        .nest("/products", products::router::<S>())
        .nest("/categories", categories::router::<S>())
        .nest("/cart", cart::router::<S>())
        .nest("/admin", admin::router::<S>())
}
