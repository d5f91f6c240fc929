//! Builds the axum `Router`: routes, permissive CORS, and the
//! request-logging middleware. Kept as a separate builder (rather than
//! inline in `main`) so integration tests can construct the same router
//! in-process via `tower::ServiceExt::oneshot`.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use super::handlers::{self, AppState};

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/start", post(handlers::start))
        .route("/module/:module_id", get(handlers::get_module))
        .route("/submit-answer", post(handlers::submit_answer))
        .route("/result", get(handlers::result))
        .route("/question/:question_id", get(handlers::get_question))
        .layer(axum::middleware::from_fn(super::middleware::request_logging))
        .layer(cors)
        .with_state(state)
}
