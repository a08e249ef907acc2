use thiserror::Error;

/// Phases a chat's game can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// No round has been played yet.
    NotStarted,
    /// Track at this zero-based position of the shuffled order is current.
    Playing(usize),
    /// Every track has been played; only a restart leaves this phase.
    /// Reveals still refer to the last track.
    Ended,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Start (or restart) a game over `tracks` shuffled entries.
    Start {
        /// Length of the new order.
        tracks: usize,
    },
    /// Reveal the hint picture of the current track.
    Hint,
    /// Reveal the title of the current track.
    Answer,
    /// Move to the next track, or to the end of the game.
    Next,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: GamePhase,
    /// The event that cannot be applied from this phase.
    pub event: GameEvent,
}

/// Cursor over a shuffled playlist of known length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameStateMachine {
    phase: GamePhase,
    len: usize,
}

impl Default for GameStateMachine {
    fn default() -> Self {
        Self {
            phase: GamePhase::NotStarted,
            len: 0,
        }
    }
}

impl GameStateMachine {
    /// Machine in [`GamePhase::NotStarted`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Validate and apply `event`, returning the new phase.
    pub fn apply(&mut self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        if let GameEvent::Start { tracks } = event {
            self.len = tracks;
        }
        self.phase = next;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (_, GameEvent::Start { tracks }) if tracks > 0 => GamePhase::Playing(0),
            (GamePhase::Playing(idx), GameEvent::Hint | GameEvent::Answer) => {
                GamePhase::Playing(idx)
            }
            (GamePhase::Ended, GameEvent::Hint | GameEvent::Answer) => GamePhase::Ended,
            (GamePhase::Playing(idx), GameEvent::Next) if idx + 1 < self.len => {
                GamePhase::Playing(idx + 1)
            }
            (GamePhase::Playing(_) | GamePhase::Ended, GameEvent::Next) => GamePhase::Ended,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut GameStateMachine, event: GameEvent) -> GamePhase {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_not_started() {
        let sm = GameStateMachine::new();
        assert_eq!(sm.phase(), GamePhase::NotStarted);
    }

    #[test]
    fn full_happy_path_through_game() {
        let mut sm = GameStateMachine::new();

        assert_eq!(
            apply(&mut sm, GameEvent::Start { tracks: 3 }),
            GamePhase::Playing(0)
        );
        assert_eq!(apply(&mut sm, GameEvent::Hint), GamePhase::Playing(0));
        assert_eq!(apply(&mut sm, GameEvent::Answer), GamePhase::Playing(0));
        assert_eq!(apply(&mut sm, GameEvent::Next), GamePhase::Playing(1));
        assert_eq!(apply(&mut sm, GameEvent::Next), GamePhase::Playing(2));
        assert_eq!(apply(&mut sm, GameEvent::Next), GamePhase::Ended);
        assert_eq!(apply(&mut sm, GameEvent::Next), GamePhase::Ended);
    }

    #[test]
    fn single_track_game_ends_after_first_next() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::Start { tracks: 1 });
        assert_eq!(apply(&mut sm, GameEvent::Next), GamePhase::Ended);
    }

    #[test]
    fn restart_is_allowed_from_any_phase() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::Start { tracks: 2 });
        apply(&mut sm, GameEvent::Next);
        apply(&mut sm, GameEvent::Next);
        assert_eq!(sm.phase(), GamePhase::Ended);

        assert_eq!(
            apply(&mut sm, GameEvent::Start { tracks: 5 }),
            GamePhase::Playing(0)
        );
        for _ in 0..4 {
            assert!(matches!(apply(&mut sm, GameEvent::Next), GamePhase::Playing(_)));
        }
        assert_eq!(apply(&mut sm, GameEvent::Next), GamePhase::Ended);

        apply(&mut sm, GameEvent::Next);
        assert_eq!(
            apply(&mut sm, GameEvent::Start { tracks: 4 }),
            GamePhase::Playing(0)
        );
    }

    #[test]
    fn invalid_transition_returns_error() {
        let mut sm = GameStateMachine::new();
        let err = sm.apply(GameEvent::Hint).unwrap_err();
        assert_eq!(err.from, GamePhase::NotStarted);
        assert_eq!(err.event, GameEvent::Hint);

        assert!(sm.apply(GameEvent::Next).is_err());
        assert!(sm.apply(GameEvent::Start { tracks: 0 }).is_err());
        assert_eq!(sm.phase(), GamePhase::NotStarted);
    }

    #[test]
    fn reveals_keep_the_game_ended() {
        let mut sm = GameStateMachine::new();
        apply(&mut sm, GameEvent::Start { tracks: 1 });
        apply(&mut sm, GameEvent::Next);

        assert_eq!(apply(&mut sm, GameEvent::Hint), GamePhase::Ended);
        assert_eq!(apply(&mut sm, GameEvent::Answer), GamePhase::Ended);
        assert_eq!(sm.phase(), GamePhase::Ended);
    }
}
