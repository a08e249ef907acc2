//! User-facing bot texts, loaded from a JSON catalog with built-in fallbacks.

use std::{collections::HashMap, fmt::Display, fs, io::ErrorKind, path::Path};

use tracing::{info, warn};

/// Greeting sent on `/start`.
pub const WELCOME: &str = "WELCOME";
/// Game rules.
pub const HELP: &str = "HELP";
/// Announcement of a new game.
pub const START_GAME: &str = "START_GAME";
/// Announcement of a restarted game.
pub const RESTART_GAME: &str = "RESTART_GAME";
/// Audio caption with `{i}` and `{total}`.
pub const TRACK_X_OF_Y: &str = "TRACK_X_OF_Y";
/// Text placed before a revealed title.
pub const ANSWER_PREFIX: &str = "ANSWER_PREFIX";
/// Sent once the order is exhausted.
pub const END_GAME: &str = "END_GAME";
/// Reply to admin commands from other users.
pub const NEED_ADMIN: &str = "NEED_ADMIN";
/// Admin menu text.
pub const ADMIN_MENU: &str = "ADMIN_MENU";
/// Panel link with `{url}`.
pub const ADMIN_WEB_LINK: &str = "ADMIN_WEB_LINK";
/// One-time login link with `{url}`.
pub const ADMIN_ONE_TIME_LINK: &str = "ADMIN_ONE_TIME_LINK";
/// Refusal to start with `{count}` and `{min}`.
pub const NOT_ENOUGH_TRACKS: &str = "NOT_ENOUGH_TRACKS";
/// The current track was deleted.
pub const TRACK_NOT_FOUND: &str = "TRACK_NOT_FOUND";
/// Telegram refused the audio.
pub const AUDIO_SEND_FAILED: &str = "AUDIO_SEND_FAILED";
/// The current track has no usable hint.
pub const HINT_UNAVAILABLE: &str = "HINT_UNAVAILABLE";
/// Label of the start button.
pub const BUTTON_START: &str = "BUTTON_START";
/// Label of the help button.
pub const BUTTON_HELP: &str = "BUTTON_HELP";
/// Label of the hint button.
pub const BUTTON_HINT: &str = "BUTTON_HINT";
/// Label of the answer button.
pub const BUTTON_ANSWER: &str = "BUTTON_ANSWER";
/// Label of the next button.
pub const BUTTON_NEXT: &str = "BUTTON_NEXT";
/// Label of the restart button.
pub const BUTTON_RESTART: &str = "BUTTON_RESTART";

const DEFAULTS: &[(&str, &str)] = &[
    (
        WELCOME,
        "🎶 Привет! Это *Музыкальное бинго*.\nСлушай фрагменты, угадывай хиты и отмечай их в карточке.",
    ),
    (
        HELP,
        "ℹ️ Нажми «Начать игру», слушай трек и угадывай.\n«Подсказка» покажет картинку, «Ответ» раскроет название, «Следующий» включит новый трек.",
    ),
    (START_GAME, "Игра началась! 🎵"),
    (RESTART_GAME, "Погнали ещё! 🎵"),
    (TRACK_X_OF_Y, "Трек {i} из {total}"),
    (ANSWER_PREFIX, "✅ Ответ:"),
    (END_GAME, "🏁 Плейлист закончился. Спасибо за игру!"),
    (NEED_ADMIN, "⛔ Эта команда доступна только администраторам."),
    (
        ADMIN_MENU,
        "🛠 Админ-меню:\n/admin_web: ссылка на веб-админку\n/admin_link: одноразовая ссылка для входа",
    ),
    (
        ADMIN_WEB_LINK,
        "🌐 Веб-админка: {url}\nЛучше входить через /admin_link",
    ),
    (ADMIN_ONE_TIME_LINK, "🔐 Одноразовая ссылка (10 мин):\n{url}"),
    (
        NOT_ENOUGH_TRACKS,
        "⚠️ В плейлисте {count} трек(ов). Нужно ≥ {min}. Загрузите через /admin_web.",
    ),
    (TRACK_NOT_FOUND, "❌ Трек не найден."),
    (
        AUDIO_SEND_FAILED,
        "❌ Не удалось отправить аудио. Проверь файл/file_id.",
    ),
    (HINT_UNAVAILABLE, "Подсказка недоступна."),
    (BUTTON_START, "▶️ Начать игру"),
    (BUTTON_HELP, "❓ Помощь"),
    (BUTTON_HINT, "💡 Подсказка"),
    (BUTTON_ANSWER, "✅ Ответ"),
    (BUTTON_NEXT, "⏭ Следующий"),
    (BUTTON_RESTART, "🔁 Сыграть ещё раз"),
];

/// Catalog of bot texts keyed by message name.
#[derive(Debug, Clone)]
pub struct Messages {
    entries: HashMap<String, String>,
}

impl Messages {
    /// Load the catalog at `path`; entries found there override the defaults.
    ///
    /// A missing or malformed file is logged and the built-in texts are used.
    pub fn load(path: &Path) -> Self {
        let mut messages = Self::default();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, String>>(&contents) {
                Ok(overrides) => {
                    info!(
                        path = %path.display(),
                        count = overrides.len(),
                        "loaded message catalog"
                    );
                    messages.entries.extend(overrides);
                }
                Err(err) => warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to parse message catalog; using built-in texts"
                ),
            },
            Err(err) if err.kind() == ErrorKind::NotFound => info!(
                path = %path.display(),
                "message catalog not found; using built-in texts"
            ),
            Err(err) => warn!(
                path = %path.display(),
                error = %err,
                "failed to read message catalog; using built-in texts"
            ),
        }
        messages
    }

    /// Raw text for `key`, or the key itself when it is unknown.
    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        self.entries.get(key).map(String::as_str).unwrap_or(key)
    }

    /// Text for `key` with every `{name}` placeholder replaced.
    ///
    /// Placeholders without a matching argument are left untouched.
    pub fn format(&self, key: &str, args: &[(&str, &dyn Display)]) -> String {
        let mut text = self.get(key).to_owned();
        for (name, value) in args {
            text = text.replace(&format!("{{{name}}}"), &value.to_string());
        }
        text
    }
}

impl Default for Messages {
    fn default() -> Self {
        let entries = DEFAULTS
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_key() {
        let messages = Messages::default();
        for (key, _) in DEFAULTS {
            assert_ne!(messages.get(key), *key);
        }
    }

    #[test]
    fn unknown_key_renders_as_itself() {
        let messages = Messages::default();
        assert_eq!(messages.get("NOPE"), "NOPE");
        assert_eq!(messages.format("NOPE", &[("i", &1)]), "NOPE");
    }

    #[test]
    fn format_substitutes_named_placeholders() {
        let messages = Messages::default();
        assert_eq!(
            messages.format(TRACK_X_OF_Y, &[("i", &3), ("total", &12)]),
            "Трек 3 из 12"
        );
        assert_eq!(messages.format(TRACK_X_OF_Y, &[("i", &3)]), "Трек 3 из {total}");
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.json");
        fs::write(&path, r#"{"WELCOME": "Hi!", "EXTRA": "x"}"#).unwrap();

        let messages = Messages::load(&path);
        assert_eq!(messages.get(WELCOME), "Hi!");
        assert_eq!(messages.get("EXTRA"), "x");
        assert_eq!(messages.get(END_GAME), Messages::default().get(END_GAME));
    }

    #[test]
    fn missing_or_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Messages::load(&dir.path().join("absent.json"));
        assert_eq!(missing.get(HELP), Messages::default().get(HELP));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{not json").unwrap();
        assert_eq!(Messages::load(&broken).get(HELP), Messages::default().get(HELP));
    }
}
