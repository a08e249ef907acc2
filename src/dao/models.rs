use serde::Serialize;

use crate::dao::media::MediaRef;

/// One playlist entry as stored in the `tracks` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackEntity {
    /// Primary key, also the identifier shuffled into game orders.
    pub id: i64,
    /// Answer revealed to players (usually the film or song title).
    pub title: String,
    /// Picture sent as a hint.
    pub hint: MediaRef,
    /// Audio clip played for the round.
    pub audio: MediaRef,
}

/// Telegram user seen through `/start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserEntity {
    /// Telegram user id.
    pub user_id: i64,
    /// `@username` without the at sign.
    pub username: Option<String>,
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
}

/// Admin-authored message sent to every known user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastEntity {
    /// Primary key.
    pub id: i64,
    /// Title shown in the panel only.
    pub title: String,
    /// Message text, Markdown.
    pub text: String,
    /// SQLite `CURRENT_TIMESTAMP` text (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub created_at: String,
    /// Set once the broadcast has been fanned out.
    pub sent_at: Option<String>,
}

/// Kind of file attached to a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Sent as a photo.
    Image,
    /// Sent as a video.
    Video,
    /// Sent as a document.
    File,
}

impl MediaKind {
    /// Column value stored in `broadcast_media.kind`.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::File => "file",
        }
    }

    /// Parse the column value; unknown values are treated as plain files.
    pub fn from_column(value: &str) -> Self {
        match value {
            "image" => MediaKind::Image,
            "video" => MediaKind::Video,
            _ => MediaKind::File,
        }
    }
}

/// File attached to a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastMediaEntity {
    /// Primary key.
    pub id: i64,
    /// Owning broadcast.
    pub broadcast_id: i64,
    /// How the file is sent.
    pub kind: MediaKind,
    /// Where the file is stored.
    pub media: MediaRef,
}

/// Outcome of delivering a broadcast to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryLogEntity {
    /// Broadcast that was sent.
    pub broadcast_id: i64,
    /// Recipient.
    pub user_id: i64,
    /// Whether Telegram accepted the message.
    pub ok: bool,
    /// Telegram's error text on failure.
    pub error: Option<String>,
}
