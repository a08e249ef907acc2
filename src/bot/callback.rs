use std::{fmt, str::FromStr};

/// Prefix shared by every game button.
const PREFIX: &str = "game:";

/// Action carried by an inline button's callback data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameAction {
    /// Start a new game.
    Start,
    /// Show the rules.
    Help,
    /// Show the hint picture of the current track.
    Hint,
    /// Reveal the title of the current track.
    Answer,
    /// Move to the next track.
    Next,
    /// Shuffle again and start over.
    Restart,
}

impl GameAction {
    fn name(self) -> &'static str {
        match self {
            GameAction::Start => "start",
            GameAction::Help => "help",
            GameAction::Hint => "hint",
            GameAction::Answer => "answer",
            GameAction::Next => "next",
            GameAction::Restart => "restart",
        }
    }
}

impl fmt::Display for GameAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}", self.name())
    }
}

/// Callback data that is not one of ours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl FromStr for GameAction {
    type Err = UnknownAction;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let action = match data.strip_prefix(PREFIX) {
            Some("start") => GameAction::Start,
            Some("help") => GameAction::Help,
            Some("hint") => GameAction::Hint,
            Some("answer") => GameAction::Answer,
            Some("next") => GameAction::Next,
            Some("restart") => GameAction::Restart,
            _ => return Err(UnknownAction(data.to_owned())),
        };
        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_round_trips() {
        for action in [
            GameAction::Start,
            GameAction::Help,
            GameAction::Hint,
            GameAction::Answer,
            GameAction::Next,
            GameAction::Restart,
        ] {
            assert_eq!(action.to_string().parse::<GameAction>(), Ok(action));
        }
    }

    #[test]
    fn foreign_data_is_rejected() {
        assert!("game:pause".parse::<GameAction>().is_err());
        assert!("next".parse::<GameAction>().is_err());
        assert_eq!(
            "".parse::<GameAction>(),
            Err(UnknownAction(String::new()))
        );
    }
}
