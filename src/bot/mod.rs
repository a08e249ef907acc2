//! Telegram side of the application: commands, game buttons and the polling
//! supervisor that keeps the dispatcher alive.

/// Callback data of the inline game buttons.
pub mod callback;
/// Command and button handlers.
pub mod handlers;
/// Inline keyboards attached to bot messages.
pub mod keyboards;
/// Outgoing messages and broadcast delivery.
pub mod send;

use std::time::Duration;

use teloxide::{
    dispatching::{HandlerExt, UpdateFilterExt, UpdateHandler},
    prelude::*,
    utils::command::BotCommands,
};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::state::SharedState;

/// Delay before the first polling restart.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Upper bound of the polling restart delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Slash commands understood by the bot.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case")]
pub enum Command {
    /// Welcome message; any deep-link payload is ignored.
    #[command(description = "start")]
    Start(String),
    /// Admin menu with panel links.
    #[command(description = "admin menu")]
    Admin,
    /// Plain link to the web panel.
    #[command(description = "link to the web panel")]
    AdminWeb,
    /// One-time login link for the web panel.
    #[command(description = "one-time login link")]
    AdminLink,
}

/// Update routing: commands first, then inline button presses.
pub fn schema() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handlers::handle_command),
        )
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
}

/// Doubled delay, capped at [`MAX_BACKOFF`].
pub fn next_backoff(delay: Duration) -> Duration {
    (delay * 2).min(MAX_BACKOFF)
}

/// Run long polling until Ctrl+C, restarting with exponential backoff when
/// Telegram is unreachable or the dispatcher dies.
pub async fn run_polling_supervisor(state: SharedState) {
    let mut delay = INITIAL_BACKOFF;
    loop {
        let bot = state.bot().clone();
        match bot.get_me().await {
            Ok(me) => {
                info!(username = %me.username(), "bot authenticated; polling started");
                let deps = state.clone();
                let polling = tokio::spawn(async move {
                    Dispatcher::builder(bot, schema())
                        .dependencies(dptree::deps![deps])
                        .default_handler(|update| async move {
                            debug!(update_id = ?update.id, "unhandled update");
                        })
                        .enable_ctrlc_handler()
                        .build()
                        .dispatch()
                        .await;
                });
                match polling.await {
                    Ok(()) => {
                        info!("polling stopped");
                        return;
                    }
                    Err(err) => error!(error = %err, "polling task crashed"),
                }
            }
            Err(err) => warn!(error = %err, "telegram unreachable"),
        }

        warn!(delay_secs = delay.as_secs(), "restarting polling after delay");
        sleep(delay).await;
        delay = next_backoff(delay);
    }
}
