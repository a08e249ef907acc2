use axum::{Router, extract::State, routing::get};

use crate::{services::health_service, state::SharedState};

/// Liveness probe; HEAD is answered by the same handler.
pub async fn health(State(state): State<SharedState>) -> &'static str {
    health_service::health_status(&state).await
}

/// Configure the health routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
}
