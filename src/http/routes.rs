use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Realtime session control
        .route("/connection", get(handlers::get_connection))
        .route("/connection/connect", post(handlers::connect))
        .route("/connection/disconnect", post(handlers::disconnect))
        .route("/connection/microphone", post(handlers::toggle_microphone))
        .route("/connection/camera", post(handlers::toggle_camera))
        // Glasses audio path
        .route("/glasses/integration", post(handlers::set_glasses_integration))
        .route("/glasses/routing", get(handlers::get_routing_status))
        // Startup and conversation queries
        .route("/initialization", get(handlers::get_initialization))
        .route("/messages", get(handlers::get_messages))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
