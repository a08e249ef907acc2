//! Outgoing Telegram messages: Markdown with a plain-text fallback, and
//! media references turned into uploadable files.

use std::{future::Future, time::Duration};

use reqwest::Url;
use teloxide::{
    RequestError,
    prelude::*,
    types::{
        InlineKeyboardMarkup, InputFile, InputMedia, InputMediaDocument, InputMediaPhoto,
        InputMediaVideo, ParseMode,
    },
};
use tracing::{debug, warn};

use crate::{
    dao::{
        media::MediaRef,
        models::MediaKind,
        storage::{StorageError, StorageResult},
    },
    state::SharedState,
};

/// Legacy Markdown, the dialect the message catalog is written in.
#[allow(deprecated)]
const TEXT_PARSE_MODE: ParseMode = ParseMode::Markdown;
/// Lifetime of presigned URLs handed to Telegram.
pub const PRESIGN_TTL: Duration = Duration::from_secs(60 * 60);
/// Telegram's limit on items per media group.
pub const MAX_ALBUM_ITEMS: usize = 10;

/// Title shown by Telegram clients for the audio at `position` of `total`.
///
/// The number is zero padded to the width of `total`.
pub fn audio_title(position: usize, total: usize) -> String {
    let width = total.to_string().len();
    format!("Музыкальное бинго — {position:0width$}.mp3")
}

/// Send with Markdown first, then once more as plain text when Telegram
/// rejects the request.
pub async fn with_plain_fallback<F, Fut, T>(mut send: F) -> Result<T, RequestError>
where
    F: FnMut(Option<ParseMode>) -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    match send(Some(TEXT_PARSE_MODE)).await {
        Err(RequestError::Api(err)) => {
            debug!(error = %err, "telegram rejected Markdown; resending as plain text");
            send(None).await
        }
        other => other,
    }
}

/// Text message with an optional inline keyboard.
pub async fn send_text(
    bot: &Bot,
    chat: ChatId,
    text: &str,
    markup: Option<InlineKeyboardMarkup>,
) -> Result<Message, RequestError> {
    with_plain_fallback(|mode| {
        let mut request = bot.send_message(chat, text);
        if let Some(mode) = mode {
            request = request.parse_mode(mode);
        }
        if let Some(markup) = markup.clone() {
            request = request.reply_markup(markup);
        }
        request.send()
    })
    .await
}

/// Photo with an optional caption and inline keyboard.
pub async fn send_photo(
    bot: &Bot,
    chat: ChatId,
    photo: InputFile,
    caption: Option<&str>,
    markup: Option<InlineKeyboardMarkup>,
) -> Result<Message, RequestError> {
    with_plain_fallback(|mode| {
        let mut request = bot.send_photo(chat, photo.clone());
        if let Some(caption) = caption {
            request = request.caption(caption);
            if let Some(mode) = mode {
                request = request.parse_mode(mode);
            }
        }
        if let Some(markup) = markup.clone() {
            request = request.reply_markup(markup);
        }
        request.send()
    })
    .await
}

/// Turn a stored reference into something Telegram can fetch.
///
/// Missing local files resolve to `None`; object keys become presigned URLs.
pub async fn input_file(state: &SharedState, media: &MediaRef) -> StorageResult<Option<InputFile>> {
    let file = match media {
        MediaRef::None => None,
        MediaRef::Local(relative) => match state.local_media().existing(relative) {
            Some(path) => Some(InputFile::file(path)),
            None => {
                warn!(path = %relative, "local media file is missing");
                None
            }
        },
        MediaRef::Object(key) => {
            let store = state.objects().ok_or(StorageError::NotConfigured)?;
            let filename = key.rsplit('/').next().unwrap_or(key);
            let url = store.presign_get(key, PRESIGN_TTL, Some(filename)).await?;
            Some(InputFile::url(parse_url(&url)?))
        }
        MediaRef::Url(url) => Some(InputFile::url(parse_url(url)?)),
        MediaRef::TelegramFile(id) => Some(InputFile::file_id(id.clone())),
    };
    Ok(file)
}

fn parse_url(raw: &str) -> StorageResult<Url> {
    Url::parse(raw).map_err(|source| StorageError::unavailable(format!("bad url `{raw}`"), source))
}

/// Broadcast content resolved once and reused for every recipient.
#[derive(Debug, Clone)]
pub struct PreparedBroadcast {
    /// Message text, possibly empty when media carry the broadcast.
    pub text: String,
    /// Resolved attachments in upload order.
    pub items: Vec<(MediaKind, InputFile)>,
}

impl PreparedBroadcast {
    /// Nothing to send: blank text and no attachments.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.items.is_empty()
    }
}

/// One Telegram request of a broadcast delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<'a> {
    /// Plain text message.
    Text(&'a str),
    /// One attachment sent on its own.
    Single {
        /// Index into [`PreparedBroadcast::items`].
        item: usize,
        /// Caption of the message.
        caption: Option<&'a str>,
    },
    /// Media group; the caption goes on its first item.
    Album {
        /// Indices into [`PreparedBroadcast::items`], in send order.
        items: Vec<usize>,
        /// Caption of the first item.
        caption: Option<&'a str>,
    },
}

/// Split a broadcast into the requests that deliver it.
///
/// Only the first [`MAX_ALBUM_ITEMS`] attachments are kept. Photos and videos
/// form one group and documents another, since Telegram refuses to mix them.
/// The text becomes the caption of the first request; a group of one item is
/// sent as a single message. Without attachments the text is sent alone.
pub fn plan(broadcast: &PreparedBroadcast) -> Vec<Step<'_>> {
    let text = broadcast.text.as_str();
    let mut caption = Some(text).filter(|text| !text.trim().is_empty());
    if broadcast.items.is_empty() {
        return caption.map(Step::Text).into_iter().collect();
    }

    let kept = broadcast.items.len().min(MAX_ALBUM_ITEMS);
    let (visual, documents): (Vec<usize>, Vec<usize>) =
        (0..kept).partition(|&idx| broadcast.items[idx].0 != MediaKind::File);

    [visual, documents]
        .into_iter()
        .filter(|group| !group.is_empty())
        .map(|group| {
            let caption = caption.take();
            if group.len() == 1 {
                Step::Single {
                    item: group[0],
                    caption,
                }
            } else {
                Step::Album {
                    items: group,
                    caption,
                }
            }
        })
        .collect()
}

/// Deliver a broadcast to one chat, following [`plan`].
pub async fn deliver_broadcast(
    bot: &Bot,
    chat: ChatId,
    broadcast: &PreparedBroadcast,
) -> Result<(), RequestError> {
    let items = broadcast.items.as_slice();
    for step in plan(broadcast) {
        match step {
            Step::Text(text) => {
                send_text(bot, chat, text, None).await?;
            }
            Step::Single { item, caption } => {
                if let Some((kind, file)) = items.get(item) {
                    with_plain_fallback(|mode| {
                        send_single(bot, chat, *kind, file.clone(), caption, mode)
                    })
                    .await?;
                }
            }
            Step::Album {
                items: picks,
                caption,
            } => {
                let picks = picks.as_slice();
                with_plain_fallback(|mode| send_album(bot, chat, items, picks, caption, mode))
                    .await?;
            }
        }
    }
    Ok(())
}

async fn send_album(
    bot: &Bot,
    chat: ChatId,
    items: &[(MediaKind, InputFile)],
    picks: &[usize],
    caption: Option<&str>,
    mode: Option<ParseMode>,
) -> Result<(), RequestError> {
    let album = picks
        .iter()
        .filter_map(|&idx| items.get(idx))
        .enumerate()
        .map(|(pos, (kind, file))| {
            album_item(*kind, file.clone(), caption.filter(|_| pos == 0), mode)
        });
    bot.send_media_group(chat, album).send().await?;
    Ok(())
}

async fn send_single(
    bot: &Bot,
    chat: ChatId,
    kind: MediaKind,
    file: InputFile,
    caption: Option<&str>,
    mode: Option<ParseMode>,
) -> Result<(), RequestError> {
    macro_rules! with_caption {
        ($request:expr) => {{
            let mut request = $request;
            if let Some(caption) = caption {
                request = request.caption(caption);
                if let Some(mode) = mode {
                    request = request.parse_mode(mode);
                }
            }
            request.send().await?;
        }};
    }

    match kind {
        MediaKind::Image => with_caption!(bot.send_photo(chat, file)),
        MediaKind::Video => with_caption!(bot.send_video(chat, file)),
        MediaKind::File => with_caption!(bot.send_document(chat, file)),
    }
    Ok(())
}

fn album_item(
    kind: MediaKind,
    file: InputFile,
    caption: Option<&str>,
    mode: Option<ParseMode>,
) -> InputMedia {
    macro_rules! captioned {
        ($media:expr) => {{
            let mut media = $media;
            if let Some(caption) = caption {
                media = media.caption(caption);
                if let Some(mode) = mode {
                    media = media.parse_mode(mode);
                }
            }
            media
        }};
    }

    match kind {
        MediaKind::Image => InputMedia::Photo(captioned!(InputMediaPhoto::new(file))),
        MediaKind::Video => InputMedia::Video(captioned!(InputMediaVideo::new(file))),
        MediaKind::File => InputMedia::Document(captioned!(InputMediaDocument::new(file))),
    }
}
