/// API routes and handlers
pub mod auth;
pub mod customers;
pub mod extract;
pub mod health;
pub mod middleware;
pub mod payments;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(customers::routes())
        .merge(payments::routes())
}
