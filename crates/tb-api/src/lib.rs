//! # tb-api
//!
//! The HTTP shim in front of the thread store and reply engine. Handlers only
//! pull parameters out of the request and render what the core returns.

pub mod handlers;
pub mod middleware;

use actix_web::web;

pub use handlers::{ApiError, AppState};

/// Configures the board API routes.
///
/// # Developer Note
/// Kept as a `ServiceConfig` hook so the binary (and tests) decide which
/// middleware wraps it.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/api/threads/{board}")
            // Board listing: 10 latest bumped threads, 3 replies each
            .route(web::get().to(handlers::list_threads))
            .route(web::post().to(handlers::create_thread))
            .route(web::put().to(handlers::report_thread))
            .route(web::delete().to(handlers::delete_thread)),
    )
    .service(
        web::resource("/api/replies/{board}")
            // Whole thread with every reply
            .route(web::get().to(handlers::get_thread))
            .route(web::post().to(handlers::create_reply))
            .route(web::put().to(handlers::report_reply))
            .route(web::delete().to(handlers::delete_reply)),
    );
}
