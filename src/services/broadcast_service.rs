use std::{fmt::Display, future::Future};

use teloxide::types::ChatId;
use tracing::{debug, info, warn};

use crate::{
    bot::send::{self, PreparedBroadcast},
    dao::{DbError, media::sanitize_filename, models::DeliveryLogEntity},
    dto::{pages::BroadcastRow, upload::BroadcastDraft},
    error::ServiceError,
    state::SharedState,
};

/// Upload subdirectory for broadcast attachments.
pub const BROADCASTS_DIR: &str = "broadcasts";

/// Counters of one send, shown to the admin after the redirect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Users that received the broadcast.
    pub sent: usize,
    /// Users Telegram refused to deliver to.
    pub failed: usize,
}

impl DeliveryReport {
    fn from_logs(logs: &[DeliveryLogEntity]) -> Self {
        let sent = logs.iter().filter(|log| log.ok).count();
        Self {
            sent,
            failed: logs.len() - sent,
        }
    }
}

/// Store a draft and its attachments; attachments are named
/// `<broadcast id>_<original name>`.
pub async fn create_broadcast(
    state: &SharedState,
    draft: BroadcastDraft,
) -> Result<i64, ServiceError> {
    let BroadcastDraft { title, text, media } = draft;
    let id = state
        .db()
        .call(move |db| db.create_broadcast(&title, &text))
        .await?;

    for (kind, file) in media {
        let filename = format!("{id}_{}", sanitize_filename(&file.filename));
        let stored = state
            .uploads()
            .put(BROADCASTS_DIR, &filename, file.bytes)
            .await?
            .to_string();
        state
            .db()
            .call(move |db| db.add_broadcast_media(id, kind, &stored))
            .await?;
    }
    info!(broadcast_id = id, "broadcast draft created");
    Ok(id)
}

/// Every broadcast with its attachment count and delivery counters.
pub async fn list_broadcasts(state: &SharedState) -> Result<Vec<BroadcastRow>, ServiceError> {
    let rows = state
        .db()
        .call(|db| {
            db.list_broadcasts()?
                .into_iter()
                .map(|(broadcast, media_count)| {
                    let stats = db.delivery_stats(broadcast.id)?;
                    Ok(BroadcastRow::new(broadcast, media_count, stats))
                })
                .collect::<Result<Vec<_>, DbError>>()
        })
        .await?;
    Ok(rows)
}

/// Remove a broadcast with its attachments and logs.
pub async fn delete_broadcast(state: &SharedState, id: i64) -> Result<(), ServiceError> {
    let removed = state.db().call(move |db| db.delete_broadcast(id)).await?;
    if !removed {
        return Err(ServiceError::NotFound(format!("broadcast {id}")));
    }
    info!(broadcast_id = id, "broadcast deleted");
    Ok(())
}

/// Send a broadcast to every known user, log each outcome and mark it sent.
///
/// Attachments that cannot be resolved are skipped. A broadcast with neither
/// text nor usable media is refused.
pub async fn send_broadcast(state: &SharedState, id: i64) -> Result<DeliveryReport, ServiceError> {
    let broadcast = state
        .db()
        .call(move |db| db.find_broadcast(id))
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("broadcast {id}")))?;
    let media = state
        .db()
        .call(move |db| db.list_broadcast_media(id))
        .await?;

    let mut items = Vec::with_capacity(media.len().min(send::MAX_ALBUM_ITEMS));
    for entry in media.into_iter().take(send::MAX_ALBUM_ITEMS) {
        match send::input_file(state, &entry.media).await {
            Ok(Some(file)) => items.push((entry.kind, file)),
            Ok(None) => warn!(broadcast_id = id, media = %entry.media, "attachment missing; skipped"),
            Err(err) => {
                warn!(broadcast_id = id, media = %entry.media, error = %err, "attachment unavailable; skipped")
            }
        }
    }
    let prepared = PreparedBroadcast {
        text: broadcast.text,
        items,
    };
    if prepared.is_empty() {
        return Err(ServiceError::InvalidInput(
            "broadcast has no text and no media".into(),
        ));
    }

    let users = state.db().call(|db| db.list_user_ids()).await?;
    info!(broadcast_id = id, recipients = users.len(), "sending broadcast");
    let bot = state.bot();
    let logs = fan_out(id, &users, |user_id| {
        send::deliver_broadcast(bot, ChatId(user_id), &prepared)
    })
    .await;
    let report = DeliveryReport::from_logs(&logs);

    state
        .db()
        .call(move |db| {
            db.record_deliveries(&logs)?;
            db.mark_broadcast_sent(id)
        })
        .await?;
    info!(
        broadcast_id = id,
        sent = report.sent,
        failed = report.failed,
        "broadcast finished"
    );
    Ok(report)
}

/// Deliver to each user in turn; a failure only affects that user's entry.
pub async fn fan_out<F, Fut, E>(
    broadcast_id: i64,
    user_ids: &[i64],
    mut deliver: F,
) -> Vec<DeliveryLogEntity>
where
    F: FnMut(i64) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut logs = Vec::with_capacity(user_ids.len());
    for &user_id in user_ids {
        let error = match deliver(user_id).await {
            Ok(()) => None,
            Err(err) => {
                debug!(broadcast_id, user_id, error = %err, "delivery failed");
                Some(err.to_string())
            }
        };
        logs.push(DeliveryLogEntity {
            broadcast_id,
            user_id,
            ok: error.is_none(),
            error,
        });
    }
    logs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::{media::MediaRef, models::MediaKind},
        dto::upload::UploadedFile,
        state::test_support::test_state,
    };

    fn draft(text: &str, media: Vec<(MediaKind, UploadedFile)>) -> BroadcastDraft {
        BroadcastDraft {
            title: "News".into(),
            text: text.into(),
            media,
        }
    }

    #[tokio::test]
    async fn fan_out_counts_each_user_once() {
        let logs = fan_out(7, &[1, 2, 3, 4], |user_id| async move {
            if user_id % 2 == 0 {
                Err("bot was blocked by the user")
            } else {
                Ok(())
            }
        })
        .await;

        assert_eq!(logs.len(), 4);
        assert!(logs.iter().all(|log| log.broadcast_id == 7));
        assert_eq!(
            logs[1].error.as_deref(),
            Some("bot was blocked by the user")
        );
        assert_eq!(
            DeliveryReport::from_logs(&logs),
            DeliveryReport { sent: 2, failed: 2 }
        );
    }

    #[tokio::test]
    async fn draft_media_are_prefixed_with_broadcast_id() {
        let (state, dir) = test_state(&[]);
        let id = create_broadcast(
            &state,
            draft(
                "Hello",
                vec![(
                    MediaKind::Image,
                    UploadedFile {
                        filename: "poster.jpg".into(),
                        bytes: b"jpg".to_vec(),
                    },
                )],
            ),
        )
        .await
        .unwrap();

        let media = state.db().list_broadcast_media(id).unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(
            media[0].media,
            MediaRef::Local(format!("broadcasts/{id}_poster.jpg"))
        );
        assert!(dir.path().join(format!("broadcasts/{id}_poster.jpg")).is_file());

        let rows = list_broadcasts(&state).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].media_count, 1);
        assert_eq!((rows[0].delivered, rows[0].failed), (0, 0));
    }

    #[tokio::test]
    async fn sending_without_recipients_marks_sent() {
        let (state, _dir) = test_state(&[]);
        let id = create_broadcast(&state, draft("Hi all", vec![])).await.unwrap();

        let report = send_broadcast(&state, id).await.unwrap();
        assert_eq!(report, DeliveryReport::default());
        assert!(state.db().find_broadcast(id).unwrap().unwrap().sent_at.is_some());
    }

    #[tokio::test]
    async fn empty_broadcast_is_refused() {
        let (state, _dir) = test_state(&[]);
        let id = create_broadcast(&state, draft("  ", vec![])).await.unwrap();
        assert!(matches!(
            send_broadcast(&state, id).await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(state.db().find_broadcast(id).unwrap().unwrap().sent_at.is_none());
    }

    #[tokio::test]
    async fn missing_broadcasts_are_not_found() {
        let (state, _dir) = test_state(&[]);
        assert!(matches!(
            send_broadcast(&state, 5).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            delete_broadcast(&state, 5).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
