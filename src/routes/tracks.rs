use axum::{
    Form, Router,
    extract::{Multipart, Path, State},
    response::{Html, Redirect},
    routing::{get, post},
};

use crate::{
    dto::{
        forms::WelcomeForm,
        pages::{EditTrackPage, TrackRow, TracksPage, render},
        upload::TrackUpload,
    },
    error::AppError,
    routes::auth::HOME_PATH,
    services::track_service,
    state::SharedState,
};

/// Playlist pages of the admin panel.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(HOME_PATH, get(list_tracks))
        .route("/admin_web/upload", post(upload_track))
        .route("/admin_web/edit/{id}", get(edit_page).post(edit_track))
        .route("/admin_web/delete/{id}", post(delete_track))
        .route("/admin_web/settings/welcome", post(set_welcome_image))
}

async fn list_tracks(State(state): State<SharedState>) -> Result<Html<String>, AppError> {
    let tracks = track_service::list_tracks(&state).await?;
    let welcome_image = track_service::welcome_image(&state).await?;
    render(&TracksPage {
        tracks: tracks.into_iter().map(TrackRow::from).collect(),
        welcome_image: welcome_image.unwrap_or_default(),
        storage: state.uploads().name(),
    })
}

async fn upload_track(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let upload = TrackUpload::from_multipart(multipart).await?;
    track_service::upload_track(&state, upload).await?;
    Ok(Redirect::to(HOME_PATH))
}

async fn edit_page(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Html<String>, AppError> {
    let track = track_service::find_track(&state, id).await?;
    render(&EditTrackPage {
        track: track.into(),
    })
}

async fn edit_track(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Redirect, AppError> {
    let upload = TrackUpload::from_multipart(multipart).await?;
    track_service::edit_track(&state, id, upload).await?;
    Ok(Redirect::to(HOME_PATH))
}

async fn delete_track(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    track_service::delete_track(&state, id).await?;
    Ok(Redirect::to(HOME_PATH))
}

async fn set_welcome_image(
    State(state): State<SharedState>,
    Form(form): Form<WelcomeForm>,
) -> Result<Redirect, AppError> {
    form.check()
        .map_err(|err| AppError::BadRequest(format!("invalid file_id: {err}")))?;
    track_service::set_welcome_image(&state, form.file_id().map(str::to_owned)).await?;
    Ok(Redirect::to(HOME_PATH))
}
