mod health;
mod recommendations;

use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::response::AppError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/users/:user_id/recommendations",
            get(recommendations::get_queue).fallback(fallback_handler),
        )
        .route(
            "/api/users/:user_id/recommendations/refresh",
            post(recommendations::refresh_queue).fallback(fallback_handler),
        )
        .nest("/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    AppError::not_found("Endpoint not found").into_response()
}
