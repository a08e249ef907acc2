use teloxide::{
    prelude::*,
    types::{InputFile, User},
};
use tracing::{debug, info, warn};

use crate::{
    bot::{Command, callback::GameAction, keyboards, send},
    dao::models::UserEntity,
    messages::{self, Messages},
    services::{
        auth_service,
        game_service::{self, NextOutcome, StartOutcome, TrackCue},
        track_service,
    },
    state::SharedState,
};

/// Dispatch a slash command.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: SharedState,
) -> anyhow::Result<()> {
    let chat = msg.chat.id;
    let user = msg.from.as_ref();
    debug!(chat = chat.0, ?cmd, "command received");

    match cmd {
        Command::Start(_) => {
            if let Some(user) = user {
                remember_user(&state, user).await;
            }
            send_welcome(&bot, &state, chat).await?;
        }
        Command::Admin => {
            if require_admin(&bot, &state, chat, user).await?.is_some() {
                send::send_text(&bot, chat, state.messages().get(messages::ADMIN_MENU), None)
                    .await?;
            }
        }
        Command::AdminWeb => {
            if require_admin(&bot, &state, chat, user).await?.is_some() {
                let url = format!("{}/admin_web", state.config().public_base_url());
                let text = state
                    .messages()
                    .format(messages::ADMIN_WEB_LINK, &[("url", &url)]);
                send::send_text(&bot, chat, &text, None).await?;
            }
        }
        Command::AdminLink => {
            if let Some(admin) = require_admin(&bot, &state, chat, user).await? {
                let url = auth_service::create_admin_link(&state, admin).await?;
                let text = state
                    .messages()
                    .format(messages::ADMIN_ONE_TIME_LINK, &[("url", &url)]);
                send::send_text(&bot, chat, &text, None).await?;
            }
        }
    }
    Ok(())
}

/// Game buttons. The query is always answered so the client stops spinning.
pub async fn handle_callback(bot: Bot, q: CallbackQuery, state: SharedState) -> anyhow::Result<()> {
    let chat = q.message.as_ref().map(|message| message.chat().id);
    let action = q.data.as_deref().map(str::parse::<GameAction>);

    let outcome = match (chat, action) {
        (Some(chat), Some(Ok(action))) => {
            debug!(chat = chat.0, %action, "button pressed");
            run_action(&bot, &state, chat, action).await
        }
        (_, Some(Err(unknown))) => {
            debug!(data = %unknown.0, "ignoring foreign callback data");
            Ok(())
        }
        _ => Ok(()),
    };

    if let Err(err) = bot.answer_callback_query(q.id.clone()).await {
        debug!(error = %err, "failed to answer callback query");
    }
    outcome
}

async fn run_action(
    bot: &Bot,
    state: &SharedState,
    chat: ChatId,
    action: GameAction,
) -> anyhow::Result<()> {
    let texts = state.messages();
    match action {
        GameAction::Help => {
            send::send_text(bot, chat, texts.get(messages::HELP), None).await?;
        }
        GameAction::Start | GameAction::Restart => match game_service::start_game(state, chat.0).await? {
            StartOutcome::NotEnoughTracks { count, min } => {
                let text = texts.format(
                    messages::NOT_ENOUGH_TRACKS,
                    &[("count", &count), ("min", &min)],
                );
                send::send_text(bot, chat, &text, None).await?;
            }
            StartOutcome::Started(cue) => {
                let intro = match action {
                    GameAction::Restart => messages::RESTART_GAME,
                    _ => messages::START_GAME,
                };
                send::send_text(bot, chat, texts.get(intro), None).await?;
                send_track(bot, state, chat, cue).await?;
            }
        },
        GameAction::Hint => {
            if let Some(track) = game_service::hint(state, chat.0).await? {
                let keyboard = keyboards::after_hint(texts);
                let photo = match send::input_file(state, &track.hint).await {
                    Ok(photo) => photo,
                    Err(err) => {
                        warn!(track_id = track.id, error = %err, "hint unavailable");
                        None
                    }
                };
                let sent = match photo {
                    Some(photo) => send::send_photo(bot, chat, photo, None, Some(keyboard.clone()))
                        .await
                        .inspect_err(|err| warn!(track_id = track.id, error = %err, "hint photo rejected"))
                        .is_ok(),
                    None => false,
                };
                if !sent {
                    send::send_text(bot, chat, texts.get(messages::HINT_UNAVAILABLE), Some(keyboard))
                        .await?;
                }
            }
        }
        GameAction::Answer => {
            if let Some(track) = game_service::answer(state, chat.0).await? {
                let text = format!("{} {}", texts.get(messages::ANSWER_PREFIX), track.title);
                send::send_text(bot, chat, &text, Some(keyboards::after_answer(texts))).await?;
            }
        }
        GameAction::Next => match game_service::next_track(state, chat.0).await? {
            NextOutcome::Track(cue) => send_track(bot, state, chat, cue).await?,
            NextOutcome::Ended => {
                send::send_text(
                    bot,
                    chat,
                    texts.get(messages::END_GAME),
                    Some(keyboards::restart(texts)),
                )
                .await?;
            }
            NextOutcome::NoSession => debug!(chat = chat.0, "next pressed without a game"),
        },
    }
    Ok(())
}

/// Audio of the current round with its position and the round buttons.
async fn send_track(
    bot: &Bot,
    state: &SharedState,
    chat: ChatId,
    TrackCue { cue, track }: TrackCue,
) -> anyhow::Result<()> {
    let texts = state.messages();
    let Some(track) = track else {
        warn!(chat = chat.0, track_id = cue.track_id, "track vanished mid-game");
        send::send_text(bot, chat, texts.get(messages::TRACK_NOT_FOUND), None).await?;
        return Ok(());
    };

    let audio = match send::input_file(state, &track.audio).await {
        Ok(audio) => audio,
        Err(err) => {
            warn!(track_id = track.id, error = %err, "audio could not be resolved");
            None
        }
    };
    let Some(audio) = audio else {
        send::send_text(bot, chat, texts.get(messages::AUDIO_SEND_FAILED), None).await?;
        return Ok(());
    };

    let caption = track_caption(texts, cue.position, cue.total);
    let title = send::audio_title(cue.position, cue.total);
    let keyboard = keyboards::track(texts);
    let sent = send::with_plain_fallback(|mode| {
        let mut request = bot
            .send_audio(chat, audio.clone())
            .caption(caption.as_str())
            .title(title.as_str())
            .reply_markup(keyboard.clone());
        if let Some(mode) = mode {
            request = request.parse_mode(mode);
        }
        request.send()
    })
    .await;

    if let Err(err) = sent {
        warn!(track_id = track.id, error = %err, "telegram rejected the audio");
        send::send_text(bot, chat, texts.get(messages::AUDIO_SEND_FAILED), None).await?;
    }
    Ok(())
}

fn track_caption(texts: &Messages, position: usize, total: usize) -> String {
    texts.format(
        messages::TRACK_X_OF_Y,
        &[("i", &position), ("total", &total)],
    )
}

async fn send_welcome(bot: &Bot, state: &SharedState, chat: ChatId) -> anyhow::Result<()> {
    let texts = state.messages();
    let text = texts.get(messages::WELCOME);
    let keyboard = keyboards::main_menu(texts);

    let image = track_service::welcome_image(state).await.unwrap_or_else(|err| {
        warn!(error = %err, "could not read welcome image setting");
        None
    });
    if let Some(file_id) = image {
        let photo = InputFile::file_id(file_id);
        match send::send_photo(bot, chat, photo, Some(text), Some(keyboard.clone())).await {
            Ok(_) => return Ok(()),
            Err(err) => warn!(error = %err, "welcome image rejected; sending text"),
        }
    }
    send::send_text(bot, chat, text, Some(keyboard)).await?;
    Ok(())
}

/// Store the user for broadcasts; failures only cost a log line.
async fn remember_user(state: &SharedState, user: &User) {
    let entity = user_entity(user);
    let user_id = entity.user_id;
    match state.db().call(move |db| db.save_user(&entity)).await {
        Ok(()) => debug!(user_id, "user saved"),
        Err(err) => warn!(user_id, error = %err, "failed to save user"),
    }
}

fn user_entity(user: &User) -> UserEntity {
    UserEntity {
        user_id: user.id.0 as i64,
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()).filter(|name| !name.is_empty()),
        last_name: user.last_name.clone(),
    }
}

/// Admin id of the sender, or `None` after telling them off.
async fn require_admin(
    bot: &Bot,
    state: &SharedState,
    chat: ChatId,
    user: Option<&User>,
) -> anyhow::Result<Option<i64>> {
    let id = user.map(|user| user.id.0 as i64);
    match id.filter(|id| state.config().is_admin(*id)) {
        Some(admin) => {
            info!(admin, "admin command accepted");
            Ok(Some(admin))
        }
        None => {
            warn!(user_id = ?id, "admin command from non-admin");
            send::send_text(bot, chat, state.messages().get(messages::NEED_ADMIN), None).await?;
            Ok(None)
        }
    }
}
