use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::{
    bot::callback::GameAction,
    messages::{
        BUTTON_ANSWER, BUTTON_HELP, BUTTON_HINT, BUTTON_NEXT, BUTTON_RESTART, BUTTON_START,
        Messages,
    },
};

fn button(messages: &Messages, label: &str, action: GameAction) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(messages.get(label), action.to_string())
}

/// Start / Help, shown with the welcome message.
pub fn main_menu(messages: &Messages) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[
        button(messages, BUTTON_START, GameAction::Start),
        button(messages, BUTTON_HELP, GameAction::Help),
    ]])
}

/// Hint and Answer on the first row, Next below.
pub fn track(messages: &Messages) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            button(messages, BUTTON_HINT, GameAction::Hint),
            button(messages, BUTTON_ANSWER, GameAction::Answer),
        ],
        vec![button(messages, BUTTON_NEXT, GameAction::Next)],
    ])
}

/// Answer and Next, attached to a revealed hint.
pub fn after_hint(messages: &Messages) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[
        button(messages, BUTTON_ANSWER, GameAction::Answer),
        button(messages, BUTTON_NEXT, GameAction::Next),
    ]])
}

/// Next only, attached to a revealed title.
pub fn after_answer(messages: &Messages) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[button(messages, BUTTON_NEXT, GameAction::Next)]])
}

/// Restart, attached to the end-of-game message.
pub fn restart(messages: &Messages) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[button(messages, BUTTON_RESTART, GameAction::Restart)]])
}
