//! Where uploaded audio, hint pictures and broadcast attachments live.
//!
//! Rows in the database only carry a textual [`MediaRef`]; the backends in
//! this module turn uploads into such references and back into bytes or URLs.

/// Local uploads directory backend.
pub mod local;
/// S3-compatible object store backend (Cloudflare R2 and friends).
#[cfg(feature = "s3-store")]
pub mod s3;

use std::{fmt, time::Duration};

use futures::future::BoxFuture;
use serde::Serialize;

use crate::dao::storage::StorageResult;

/// Virtual prefix under which local uploads are referenced and served.
pub const LOCAL_PREFIX: &str = "uploads/";
/// Prefix marking a reference to the object store.
pub const OBJECT_PREFIX: &str = "r2:";
/// Alternative object prefix that doubles as the admin proxy path.
const OBJECT_PATH_PREFIX: &str = "r2/";

/// Parsed form of a stored media reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MediaRef {
    /// Nothing uploaded.
    None,
    /// File below the uploads root, relative to it (e.g. `audio/01.mp3`).
    Local(String),
    /// Key inside the object store bucket.
    Object(String),
    /// Publicly reachable URL.
    Url(String),
    /// Identifier of a file already hosted by Telegram.
    TelegramFile(String),
}

impl MediaRef {
    /// Interpret a raw column value.
    ///
    /// Telegram file ids never contain a slash, so anything with one that is
    /// neither an object key nor a URL is a local path.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return MediaRef::None;
        }
        if let Some(key) = raw
            .strip_prefix(OBJECT_PREFIX)
            .or_else(|| raw.strip_prefix(OBJECT_PATH_PREFIX))
        {
            return MediaRef::Object(key.trim_start_matches('/').to_owned());
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return MediaRef::Url(raw.to_owned());
        }
        if let Some(relative) = raw.strip_prefix(LOCAL_PREFIX) {
            return MediaRef::Local(relative.to_owned());
        }
        if raw.contains('/') || raw.contains('\\') {
            return MediaRef::Local(raw.trim_start_matches('/').to_owned());
        }
        MediaRef::TelegramFile(raw.to_owned())
    }

    /// Path the admin panel can use to preview the media, when it has one.
    pub fn preview_path(&self) -> Option<String> {
        match self {
            MediaRef::Local(path) => Some(format!("/{LOCAL_PREFIX}{path}")),
            MediaRef::Object(key) => Some(format!("/{OBJECT_PATH_PREFIX}{key}")),
            MediaRef::Url(url) => Some(url.clone()),
            MediaRef::None | MediaRef::TelegramFile(_) => None,
        }
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaRef::None => Ok(()),
            MediaRef::Local(path) => write!(f, "{LOCAL_PREFIX}{path}"),
            MediaRef::Object(key) => write!(f, "{OBJECT_PREFIX}{key}"),
            MediaRef::Url(url) => f.write_str(url),
            MediaRef::TelegramFile(id) => f.write_str(id),
        }
    }
}

/// Bytes fetched back from a backend.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Object bytes.
    pub body: Vec<u8>,
    /// Content type recorded by the backend.
    pub content_type: Option<String>,
}

/// Destination for new uploads.
pub trait MediaBackend: Send + Sync {
    /// Store `body` as `<subdir>/<filename>`, overwriting any previous file,
    /// and return the reference to persist.
    fn put(
        &self,
        subdir: &str,
        filename: &str,
        body: Vec<u8>,
    ) -> BoxFuture<'static, StorageResult<MediaRef>>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Remote object store reachable through presigned URLs.
pub trait ObjectStore: MediaBackend {
    /// Presigned GET URL valid for `expires`.
    fn presign_get(
        &self,
        key: &str,
        expires: Duration,
        download_filename: Option<&str>,
    ) -> BoxFuture<'static, StorageResult<String>>;

    /// Download the whole object.
    fn fetch(&self, key: &str) -> BoxFuture<'static, StorageResult<StoredObject>>;
}

/// Keep only the last path component and neutralise separators.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => "file.bin".to_owned(),
        other => other.to_owned(),
    }
}

/// Deterministic object key `<prefix>/<subdir>/<filename>`, skipping empty parts.
pub fn build_object_key(prefix: &str, subdir: &str, filename: &str) -> String {
    let prefix = prefix.trim().trim_matches('/');
    let subdir = subdir.trim().trim_matches('/');
    let filename = sanitize_filename(filename);

    [prefix, subdir, filename.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Best guess at a MIME type from the file extension.
pub fn guess_content_type(name: &str) -> Option<String> {
    mime_guess::from_path(name).first().map(|mime| mime.to_string())
}
