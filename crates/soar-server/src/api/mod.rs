//! API routes for the task server.

pub mod error;
pub mod fixes;
mod routes;

use axum::Router;

pub fn routes() -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router()
}
