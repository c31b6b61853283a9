use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::handler;
use crate::state::AppState;

/// Build the axum router with all inventory endpoints.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/", get(handler::index_handler))
        .route("/health", get(handler::health_handler))
        .route("/RegisterForm.html", get(handler::register_form_handler))
        .route("/SearchForm.html", get(handler::search_form_handler))
        .route("/register", post(handler::register_handler))
        .route("/search", post(handler::search_handler))
        .route("/inventory", get(handler::list_handler))
        .route(
            "/inventory/:id",
            get(handler::get_handler)
                .put(handler::update_handler)
                .delete(handler::delete_handler),
        )
        .route(
            "/inventory/:id/photo",
            get(handler::photo_handler).put(handler::replace_photo_handler),
        )
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if config.cors_permissive {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}
