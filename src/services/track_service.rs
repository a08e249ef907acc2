use std::io::Write;

use lofty::tag::TagType;
use tracing::{debug, info, warn};

use crate::{
    dao::{media::MediaRef, models::TrackEntity, settings::WELCOME_IMAGE_FILE_ID},
    dto::upload::{TrackUpload, UploadedFile},
    error::ServiceError,
    state::SharedState,
};

/// Upload subdirectory for audio clips.
pub const AUDIO_DIR: &str = "audio";
/// Upload subdirectory for hint pictures.
pub const HINTS_DIR: &str = "hints";
const DEFAULT_HINT_EXTENSION: &str = ".jpg";

/// Stored name of the audio clip of the track with row id `id`.
pub fn audio_filename(id: i64) -> String {
    format!("Музыкальное бинго — {id:02}.mp3")
}

/// Stored name of the hint picture of the track with row id `id`, keeping the
/// upload's extension.
pub fn hint_filename(id: i64, upload: &UploadedFile) -> String {
    let ext = upload
        .extension()
        .unwrap_or_else(|| DEFAULT_HINT_EXTENSION.to_owned());
    format!("hint_{id:02}{ext}")
}

/// Title used when the admin leaves the field empty; `seq` is the playlist
/// position the track takes.
pub fn default_title(seq: i64) -> String {
    format!("Хит #{seq:02}")
}

/// Every track ordered by id.
pub async fn list_tracks(state: &SharedState) -> Result<Vec<TrackEntity>, ServiceError> {
    Ok(state.db().call(|db| db.list_tracks()).await?)
}

/// Track by id, or `NotFound`.
pub async fn find_track(state: &SharedState, id: i64) -> Result<TrackEntity, ServiceError> {
    state
        .db()
        .call(move |db| db.find_track(id))
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("track {id}")))
}

/// Insert the track, then store its files under names derived from the row id.
///
/// Row ids are never reused, so a new upload cannot overwrite the files of a
/// live track. The row is removed again when storing a file fails.
pub async fn upload_track(state: &SharedState, upload: TrackUpload) -> Result<i64, ServiceError> {
    let seq = state.db().call(|db| db.count_tracks()).await? as i64 + 1;
    let title = upload.title.unwrap_or_else(|| default_title(seq));
    let id = state
        .db()
        .call(move |db| db.create_track(&title, "", ""))
        .await?;

    let TrackUpload { audio, hint, .. } = upload;
    if let Err(err) = attach_files(state, id, audio, hint).await {
        warn!(track_id = id, error = %err, "storing upload failed; dropping track");
        if let Err(cleanup) = state.db().call(move |db| db.delete_track(id)).await {
            warn!(track_id = id, error = %cleanup, "could not drop half-created track");
        }
        return Err(err);
    }
    info!(track_id = id, seq, "track uploaded");
    Ok(id)
}

async fn attach_files(
    state: &SharedState,
    id: i64,
    audio: Option<UploadedFile>,
    hint: Option<UploadedFile>,
) -> Result<(), ServiceError> {
    if let Some(file) = hint {
        let hint_ref = store_hint(state, id, file).await?.to_string();
        state
            .db()
            .call(move |db| db.update_track_hint(id, &hint_ref))
            .await?;
    }
    if let Some(file) = audio {
        let audio_ref = store_audio(state, id, file).await?.to_string();
        state
            .db()
            .call(move |db| db.update_track_audio(id, &audio_ref))
            .await?;
    }
    Ok(())
}

/// Replace whatever the form provides; omitted fields keep their values.
///
/// Replacement files are named after the track id.
pub async fn edit_track(
    state: &SharedState,
    id: i64,
    upload: TrackUpload,
) -> Result<(), ServiceError> {
    let current = find_track(state, id).await?;

    let hint = match upload.hint {
        Some(file) => Some(store_hint(state, id, file).await?),
        None => None,
    };
    let audio = match upload.audio {
        Some(file) => Some(store_audio(state, id, file).await?),
        None => None,
    };

    if upload.title.is_some() || hint.is_some() {
        let title = upload.title.unwrap_or(current.title);
        let hint_ref = hint.unwrap_or(current.hint).to_string();
        state
            .db()
            .call(move |db| db.update_track(id, &title, &hint_ref))
            .await?;
    }
    if let Some(audio) = audio {
        let audio_ref = audio.to_string();
        state
            .db()
            .call(move |db| db.update_track_audio(id, &audio_ref))
            .await?;
    }
    info!(track_id = id, "track updated");
    Ok(())
}

/// Remove a track; its files stay in storage.
pub async fn delete_track(state: &SharedState, id: i64) -> Result<(), ServiceError> {
    let removed = state.db().call(move |db| db.delete_track(id)).await?;
    if !removed {
        return Err(ServiceError::NotFound(format!("track {id}")));
    }
    info!(track_id = id, "track deleted");
    Ok(())
}

/// Current welcome picture file id, if any.
pub async fn welcome_image(state: &SharedState) -> Result<Option<String>, ServiceError> {
    Ok(state
        .db()
        .call(|db| db.get_setting(WELCOME_IMAGE_FILE_ID))
        .await?)
}

/// Set or clear the welcome picture shown with `/start`.
pub async fn set_welcome_image(
    state: &SharedState,
    file_id: Option<String>,
) -> Result<(), ServiceError> {
    match file_id {
        Some(file_id) => {
            state
                .db()
                .call(move |db| db.set_setting(WELCOME_IMAGE_FILE_ID, &file_id))
                .await?
        }
        None => {
            state
                .db()
                .call(|db| db.delete_setting(WELCOME_IMAGE_FILE_ID))
                .await?
        }
    }
    Ok(())
}

async fn store_audio(
    state: &SharedState,
    id: i64,
    file: UploadedFile,
) -> Result<MediaRef, ServiceError> {
    let bytes = strip_audio_tags(file.bytes).await;
    Ok(state
        .uploads()
        .put(AUDIO_DIR, &audio_filename(id), bytes)
        .await?)
}

async fn store_hint(
    state: &SharedState,
    id: i64,
    file: UploadedFile,
) -> Result<MediaRef, ServiceError> {
    let filename = hint_filename(id, &file);
    Ok(state.uploads().put(HINTS_DIR, &filename, file.bytes).await?)
}

/// Drop ID3v1/ID3v2/APE tags so Telegram shows our title instead of the
/// embedded artist and song name.
///
/// Best effort: on any failure the original bytes are returned untouched.
pub async fn strip_audio_tags(bytes: Vec<u8>) -> Vec<u8> {
    let original = bytes.clone();
    match tokio::task::spawn_blocking(move || strip_tags_blocking(&bytes)).await {
        Ok(Ok(stripped)) => stripped,
        Ok(Err(err)) => {
            debug!(error = %err, "audio tags left in place");
            original
        }
        Err(err) => {
            warn!(error = %err, "tag stripping task failed");
            original
        }
    }
}

fn strip_tags_blocking(bytes: &[u8]) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
    let mut staging = tempfile::Builder::new().suffix(".mp3").tempfile()?;
    staging.write_all(bytes)?;
    staging.flush()?;

    for tag in [TagType::Id3v2, TagType::Id3v1, TagType::Ape] {
        if let Err(err) = tag.remove_from_path(staging.path()) {
            debug!(?tag, error = %err, "could not remove tag");
        }
    }

    Ok(std::fs::read(staging.path())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;

    fn file(name: &str, bytes: &[u8]) -> UploadedFile {
        UploadedFile {
            filename: name.into(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn names_follow_track_ids() {
        assert_eq!(audio_filename(3), "Музыкальное бинго — 03.mp3");
        assert_eq!(audio_filename(120), "Музыкальное бинго — 120.mp3");
        assert_eq!(hint_filename(7, &file("Cover.PNG", b"x")), "hint_07.png");
        assert_eq!(hint_filename(7, &file("cover", b"x")), "hint_07.jpg");
        assert_eq!(default_title(9), "Хит #09");
    }

    #[tokio::test]
    async fn upload_stores_files_and_defaults_title() {
        let (state, dir) = test_state(&[]);
        let id = upload_track(
            &state,
            TrackUpload {
                title: None,
                audio: Some(file("song.mp3", b"not really audio")),
                hint: Some(file("pic.png", b"png")),
            },
        )
        .await
        .unwrap();

        let track = find_track(&state, id).await.unwrap();
        assert_eq!(track.title, "Хит #01");
        assert_eq!(
            track.audio,
            MediaRef::Local("audio/Музыкальное бинго — 01.mp3".into())
        );
        assert_eq!(track.hint, MediaRef::Local("hints/hint_01.png".into()));
        assert_eq!(
            std::fs::read(dir.path().join("hints/hint_01.png")).unwrap(),
            b"png"
        );
        assert_eq!(
            std::fs::read(dir.path().join("audio/Музыкальное бинго — 01.mp3")).unwrap(),
            b"not really audio"
        );
    }

    #[tokio::test]
    async fn edit_keeps_omitted_fields() {
        let (state, _dir) = test_state(&[]);
        let id = upload_track(
            &state,
            TrackUpload {
                title: Some("Original".into()),
                audio: Some(file("a.mp3", b"a")),
                hint: Some(file("h.jpg", b"h")),
            },
        )
        .await
        .unwrap();
        let before = find_track(&state, id).await.unwrap();

        edit_track(
            &state,
            id,
            TrackUpload {
                title: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let after = find_track(&state, id).await.unwrap();
        assert_eq!(after.title, "Renamed");
        assert_eq!(after.hint, before.hint);
        assert_eq!(after.audio, before.audio);

        edit_track(
            &state,
            id,
            TrackUpload {
                hint: Some(file("new.gif", b"g")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let after = find_track(&state, id).await.unwrap();
        assert_eq!(after.title, "Renamed");
        assert_eq!(after.hint, MediaRef::Local(format!("hints/hint_{id:02}.gif")));
    }

    #[tokio::test]
    async fn upload_after_delete_keeps_other_tracks_files() {
        let (state, dir) = test_state(&[]);
        let mut ids = Vec::new();
        for n in 1..=3u8 {
            let id = upload_track(
                &state,
                TrackUpload {
                    title: None,
                    audio: Some(file("a.mp3", &[b'A', n])),
                    hint: Some(file("h.jpg", &[b'H', n])),
                },
            )
            .await
            .unwrap();
            ids.push(id);
        }
        delete_track(&state, ids[0]).await.unwrap();

        let fourth = upload_track(
            &state,
            TrackUpload {
                title: None,
                audio: Some(file("new.mp3", b"NEW")),
                hint: Some(file("new.jpg", b"NEWH")),
            },
        )
        .await
        .unwrap();

        let third = find_track(&state, ids[2]).await.unwrap();
        let read = |media: &MediaRef| {
            let MediaRef::Local(path) = media else {
                panic!("local media expected, got {media:?}");
            };
            std::fs::read(dir.path().join(path)).unwrap()
        };
        assert_eq!(read(&third.audio), vec![b'A', 3]);
        assert_eq!(read(&third.hint), vec![b'H', 3]);

        let fourth = find_track(&state, fourth).await.unwrap();
        assert_ne!(fourth.audio, third.audio);
        assert_eq!(read(&fourth.audio), b"NEW");
        assert_eq!(fourth.title, "Хит #03");
    }

    #[tokio::test]
    async fn editing_or_deleting_missing_track_is_not_found() {
        let (state, _dir) = test_state(&[]);
        assert!(matches!(
            edit_track(&state, 99, TrackUpload::default()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            delete_track(&state, 99).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn welcome_image_can_be_set_and_cleared() {
        let (state, _dir) = test_state(&[]);
        set_welcome_image(&state, Some("AgACfile".into())).await.unwrap();
        assert_eq!(welcome_image(&state).await.unwrap().as_deref(), Some("AgACfile"));
        set_welcome_image(&state, None).await.unwrap();
        assert!(welcome_image(&state).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tag_stripping_never_loses_unparseable_audio() {
        let bytes = b"plainly not an mp3".to_vec();
        assert_eq!(strip_audio_tags(bytes.clone()).await, bytes);
    }
}
