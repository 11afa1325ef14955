pub mod auth;
pub mod error_handling;
pub mod guards;
pub mod logging;

use axum::Router;

/// Apply default middleware layers (request logging, etc.)
pub fn with_defaults(router: Router) -> Router {
    logging::add_tracing(router)
}
