use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    response::{Html, Redirect},
    routing::{get, post},
};

use crate::{
    dto::{
        forms::SendReportQuery,
        pages::{BroadcastsPage, NewBroadcastPage, render},
        upload::BroadcastDraft,
    },
    error::AppError,
    services::broadcast_service,
    state::SharedState,
};

const LIST_PATH: &str = "/admin_web/broadcasts";

/// Broadcast pages of the admin panel.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(LIST_PATH, get(list_broadcasts))
        .route("/admin_web/broadcasts/new", get(new_broadcast))
        .route("/admin_web/broadcasts/preview", post(create_broadcast))
        .route("/admin_web/broadcasts/delete/{id}", post(delete_broadcast))
        .route("/admin_web/broadcasts/send/{id}", post(send_broadcast))
}

async fn list_broadcasts(
    State(state): State<SharedState>,
    Query(report): Query<SendReportQuery>,
) -> Result<Html<String>, AppError> {
    let items = broadcast_service::list_broadcasts(&state).await?;
    render(&BroadcastsPage {
        items,
        report: report.summary(),
    })
}

async fn new_broadcast() -> Result<Html<String>, AppError> {
    render(&NewBroadcastPage {})
}

async fn create_broadcast(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let draft = BroadcastDraft::from_multipart(multipart).await?;
    broadcast_service::create_broadcast(&state, draft).await?;
    Ok(Redirect::to(LIST_PATH))
}

async fn delete_broadcast(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    broadcast_service::delete_broadcast(&state, id).await?;
    Ok(Redirect::to(LIST_PATH))
}

async fn send_broadcast(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    let report = broadcast_service::send_broadcast(&state, id).await?;
    Ok(Redirect::to(&format!(
        "{LIST_PATH}?sent={}&failed={}",
        report.sent, report.failed
    )))
}
