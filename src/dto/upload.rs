use axum::extract::multipart::{Field, Multipart, MultipartError};
use validator::Validate;

use crate::{dao::models::MediaKind, error::AppError};

/// File received through a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-side file name, used for its extension only.
    pub filename: String,
    /// File content.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Extension including the dot (`.png`), lowercased, if the name has one.
    pub fn extension(&self) -> Option<String> {
        let name = self.filename.rsplit(['/', '\\']).next().unwrap_or_default();
        let (stem, ext) = name.rsplit_once('.')?;
        (!stem.is_empty() && !ext.is_empty()).then(|| format!(".{}", ext.to_lowercase()))
    }
}

/// Fields of the track upload and edit forms.
#[derive(Debug, Default, Validate)]
pub struct TrackUpload {
    /// Empty titles are normalised to `None`.
    #[validate(length(max = 200))]
    pub title: Option<String>,
    /// Audio clip, if one was chosen.
    pub audio: Option<UploadedFile>,
    /// Hint picture, if one was chosen.
    pub hint: Option<UploadedFile>,
}

/// Fields of the new broadcast form.
#[derive(Debug, Default, Validate)]
pub struct BroadcastDraft {
    /// Title shown in the panel only.
    #[validate(length(max = 200))]
    pub title: String,
    /// Message text, Markdown.
    #[validate(length(max = 4096))]
    pub text: String,
    /// Attachments in form order.
    pub media: Vec<(MediaKind, UploadedFile)>,
}

impl TrackUpload {
    /// Read the form, skipping unknown fields and empty file inputs.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut upload = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let name = field.name().unwrap_or_default().to_owned();
            match name.as_str() {
                "title" => {
                    let title = field.text().await.map_err(bad_multipart)?;
                    let title = title.trim();
                    upload.title = (!title.is_empty()).then(|| title.to_owned());
                }
                "audio" => upload.audio = read_file(field).await?,
                "hint" => upload.hint = read_file(field).await?,
                _ => {}
            }
        }
        upload.validate()?;
        Ok(upload)
    }
}

impl BroadcastDraft {
    /// Read the form; attachment fields are `images[]`, `videos[]` and `files[]`.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut draft = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let name = field.name().unwrap_or_default().trim_end_matches("[]").to_owned();
            let kind = match name.as_str() {
                "title" => {
                    draft.title = field.text().await.map_err(bad_multipart)?.trim().to_owned();
                    continue;
                }
                "text" => {
                    draft.text = field.text().await.map_err(bad_multipart)?.trim().to_owned();
                    continue;
                }
                "images" => MediaKind::Image,
                "videos" => MediaKind::Video,
                "files" => MediaKind::File,
                _ => continue,
            };
            if let Some(file) = read_file(field).await? {
                draft.media.push((kind, file));
            }
        }
        draft.validate()?;
        Ok(draft)
    }
}

/// Read a file field; empty inputs (no file chosen) yield `None`.
async fn read_file(field: Field<'_>) -> Result<Option<UploadedFile>, AppError> {
    let filename = field.file_name().unwrap_or_default().trim().to_owned();
    let bytes = field.bytes().await.map_err(bad_multipart)?;
    if filename.is_empty() || bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(UploadedFile {
        filename,
        bytes: bytes.to_vec(),
    }))
}

fn bad_multipart(err: MultipartError) -> AppError {
    AppError::BadRequest(format!("invalid upload: {}", err.body_text()))
}
