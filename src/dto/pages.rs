//! View models rendered by the askama templates of the admin panel.

use askama::Template;
use axum::response::Html;

use crate::{
    dao::{
        media::MediaRef,
        models::{BroadcastEntity, TrackEntity},
    },
    dto::forms::SendReportQuery,
    error::AppError,
};

/// Characters of broadcast text shown in the list.
const TEXT_PREVIEW_CHARS: usize = 120;

/// Login form.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    /// Empty when there is nothing to report.
    pub error: String,
    /// Whether password login is configured.
    pub password_enabled: bool,
}

/// Playlist with upload form and welcome picture setting.
#[derive(Template)]
#[template(path = "tracks.html")]
pub struct TracksPage {
    /// Rows of the track table.
    pub tracks: Vec<TrackRow>,
    /// Current welcome picture file id, empty when unset.
    pub welcome_image: String,
    /// Name of the active upload backend.
    pub storage: &'static str,
}

/// Edit form of one track.
#[derive(Template)]
#[template(path = "edit_track.html")]
pub struct EditTrackPage {
    /// Track being edited.
    pub track: TrackRow,
}

/// Broadcast list with delivery counters.
#[derive(Template)]
#[template(path = "broadcasts_list.html")]
pub struct BroadcastsPage {
    /// Rows of the broadcast table.
    pub items: Vec<BroadcastRow>,
    /// Counters of the send that redirected here, empty otherwise.
    pub report: String,
}

/// New broadcast form.
#[derive(Template)]
#[template(path = "broadcasts_new.html")]
pub struct NewBroadcastPage {}

/// One row of the track table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRow {
    /// Track id.
    pub id: i64,
    /// Answer title.
    pub title: String,
    /// Stored reference as text, empty when missing.
    pub audio_ref: String,
    /// Preview link of the audio, empty when missing.
    pub audio_url: String,
    /// Stored hint reference as text.
    pub hint_ref: String,
    /// Preview link of the hint, empty when missing.
    pub hint_url: String,
}

impl From<TrackEntity> for TrackRow {
    fn from(track: TrackEntity) -> Self {
        Self {
            id: track.id,
            title: track.title,
            audio_ref: track.audio.to_string(),
            audio_url: preview(&track.audio),
            hint_ref: track.hint.to_string(),
            hint_url: preview(&track.hint),
        }
    }
}

/// One row of the broadcast table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastRow {
    /// Broadcast id.
    pub id: i64,
    /// Panel title.
    pub title: String,
    /// Start of the text, ellipsized.
    pub text_preview: String,
    /// Creation time as stored.
    pub created_at: String,
    /// Empty for drafts.
    pub sent_at: String,
    /// Number of attachments.
    pub media_count: usize,
    /// Successful deliveries.
    pub delivered: usize,
    /// Failed deliveries.
    pub failed: usize,
}

impl BroadcastRow {
    /// Row from a broadcast, its attachment count and `(delivered, failed)`.
    pub fn new(
        broadcast: BroadcastEntity,
        media_count: usize,
        (delivered, failed): (usize, usize),
    ) -> Self {
        let mut text_preview: String = broadcast.text.chars().take(TEXT_PREVIEW_CHARS).collect();
        if broadcast.text.chars().count() > TEXT_PREVIEW_CHARS {
            text_preview.push('…');
        }
        Self {
            id: broadcast.id,
            title: broadcast.title,
            text_preview,
            created_at: broadcast.created_at,
            sent_at: broadcast.sent_at.unwrap_or_default(),
            media_count,
            delivered,
            failed,
        }
    }
}

impl SendReportQuery {
    /// Human readable summary of the last send, empty when absent.
    pub fn summary(&self) -> String {
        match (self.sent, self.failed) {
            (None, None) => String::new(),
            (sent, failed) => format!(
                "Рассылка отправлена: доставлено {}, ошибок {}",
                sent.unwrap_or_default(),
                failed.unwrap_or_default()
            ),
        }
    }
}

fn preview(media: &MediaRef) -> String {
    media.preview_path().unwrap_or_default()
}

/// Render a template into an HTML response.
pub fn render<T: Template>(page: &T) -> Result<Html<String>, AppError> {
    page.render()
        .map(Html)
        .map_err(|err| AppError::Internal(format!("template rendering failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_row_exposes_preview_urls() {
        let row = TrackRow::from(TrackEntity {
            id: 4,
            title: "Hit".into(),
            hint: MediaRef::TelegramFile("AgAC".into()),
            audio: MediaRef::Local("audio/04.mp3".into()),
        });
        assert_eq!(row.audio_url, "/uploads/audio/04.mp3");
        assert_eq!(row.audio_ref, "uploads/audio/04.mp3");
        assert_eq!(row.hint_url, "");
        assert_eq!(row.hint_ref, "AgAC");
    }

    #[test]
    fn long_text_is_truncated() {
        let row = BroadcastRow::new(
            BroadcastEntity {
                id: 1,
                title: "t".into(),
                text: "я".repeat(200),
                created_at: "2024-01-01 00:00:00".into(),
                sent_at: None,
            },
            0,
            (0, 0),
        );
        assert_eq!(row.text_preview.chars().count(), TEXT_PREVIEW_CHARS + 1);
        assert!(row.sent_at.is_empty());
    }

    #[test]
    fn report_summary_only_after_send() {
        assert!(SendReportQuery::default().summary().is_empty());
        let query = SendReportQuery {
            sent: Some(3),
            failed: Some(1),
        };
        assert!(query.summary().contains("доставлено 3, ошибок 1"));
    }

    #[test]
    fn login_page_escapes_error() {
        let html = render(&LoginPage {
            error: "<b>bad</b>".into(),
            password_enabled: true,
        })
        .unwrap()
        .0;
        assert!(html.contains("&lt;b&gt;bad"));
        assert!(!html.contains("<b>bad"));
        assert!(html.contains("name=\"password\""));
    }
}
