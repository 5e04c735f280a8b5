use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    let chatbot_routes = Router::new()
        .route("/api/chatbot/message", post(handlers::chatbot::message_handler))
        .route(
            "/api/chatbot/history/{session_id}",
            get(handlers::chatbot::history_handler).delete(handlers::chatbot::clear_handler),
        );

    // Bearer auth is enforced per handler by the AuthenticatedClinic extractor
    let clinic_routes = Router::new()
        .route("/api/clinic/ai/chat", post(handlers::clinic::chat_handler))
        .route(
            "/api/clinic/ai/history",
            get(handlers::clinic::history_handler).delete(handlers::clinic::clear_handler),
        );

    Router::new()
        .merge(public_routes)
        .merge(chatbot_routes)
        .merge(clinic_routes)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
}
