use axum::{
    Router,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    dao::media::guess_content_type,
    error::{AppError, ServiceError},
    state::SharedState,
};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Admin previews of media kept in the object store.
pub fn router() -> Router<SharedState> {
    Router::new().route("/r2/{*key}", get(proxy_object))
}

async fn proxy_object(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let store = state
        .objects()
        .ok_or_else(|| AppError::NotFound("object store is not configured".into()))?;
    let object = store.fetch(&key).await.map_err(ServiceError::from)?;
    let content_type = object
        .content_type
        .or_else(|| guess_content_type(&key))
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_owned());
    Ok(([(header::CONTENT_TYPE, content_type)], object.body).into_response())
}
