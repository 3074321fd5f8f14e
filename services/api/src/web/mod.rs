pub mod chat;
pub mod history;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod stream;

use axum::{
    http::{header::{ACCEPT, CONTENT_TYPE}, HeaderName, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::require_user;
pub use rest::ApiDoc;
pub use state::AppState;

/// Builds the complete application router: the API routes plus the Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    let mut cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(middleware::USER_ID_HEADER),
            HeaderName::from_static(middleware::DISPLAY_NAME_HEADER),
        ]);
    match app_state.config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(e) => warn!("Ignoring invalid CORS_ORIGIN: {}", e),
    }

    // Public routes (no identity required)
    let public_routes = Router::new().route("/health", get(rest::health_handler));

    // Protected routes (x-user-id required)
    let protected_routes = Router::new()
        .route("/lists", get(rest::get_lists_handler))
        .route("/lists/stats", get(rest::get_stats_handler))
        .route("/lists/stream", get(stream::list_stream_handler))
        .route(
            "/lists/{list}",
            get(rest::get_list_handler).post(rest::add_to_list_handler),
        )
        .route("/lists/{list}/toggle", post(rest::toggle_handler))
        .route(
            "/lists/{list}/{media_id}",
            get(rest::membership_handler).delete(rest::remove_from_list_handler),
        )
        .route("/lists/{list}/move/{to}", post(rest::move_handler))
        .route(
            "/history",
            get(history::get_history_handler).post(history::add_history_handler),
        )
        .route("/chat", post(chat::chat_handler))
        .route("/chat/history", get(chat::chat_history_handler))
        .layer(axum_middleware::from_fn(require_user));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
