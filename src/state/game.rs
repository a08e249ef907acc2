use dashmap::DashMap;
use rand::seq::SliceRandom;

use crate::state::state_machine::{GameEvent, GamePhase, GameStateMachine, InvalidTransition};

/// Telegram chat identifier used as the registry key.
pub type ChatKey = i64;

/// One chat's running game: a shuffled order of track ids and a cursor over it.
#[derive(Debug, Clone)]
pub struct GameSession {
    order: Vec<i64>,
    machine: GameStateMachine,
}

/// Position of the current track, 1-based for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cue {
    /// Id of the track in the database.
    pub track_id: i64,
    /// 1-based position in the order.
    pub position: usize,
    /// Length of the order.
    pub total: usize,
}

impl GameSession {
    /// Start a game over `order`, shuffled in place with the thread RNG.
    pub fn shuffled(mut order: Vec<i64>) -> Result<Self, InvalidTransition> {
        order.shuffle(&mut rand::rng());
        Self::with_order(order)
    }

    /// Start a game over `order` exactly as given.
    pub fn with_order(order: Vec<i64>) -> Result<Self, InvalidTransition> {
        let mut machine = GameStateMachine::new();
        machine.apply(GameEvent::Start {
            tracks: order.len(),
        })?;
        Ok(Self { order, machine })
    }

    /// Phase of the underlying state machine.
    pub fn phase(&self) -> GamePhase {
        self.machine.phase()
    }

    /// Shuffled track ids.
    pub fn order(&self) -> &[i64] {
        &self.order
    }

    /// Track the chat's buttons refer to: the current one while playing, the
    /// last one once the order is exhausted.
    pub fn cue(&self) -> Option<Cue> {
        let idx = match self.machine.phase() {
            GamePhase::Playing(idx) => idx,
            GamePhase::Ended => self.order.len().checked_sub(1)?,
            GamePhase::NotStarted => return None,
        };
        self.order.get(idx).map(|&track_id| Cue {
            track_id,
            position: idx + 1,
            total: self.order.len(),
        })
    }

    /// Apply a navigation event and report the resulting phase.
    pub fn apply(&mut self, event: GameEvent) -> Result<GamePhase, InvalidTransition> {
        self.machine.apply(event)
    }
}

/// Concurrent map of chat id to game session.
///
/// Closures passed to [`update`](Self::update) run while the chat's entry is
/// locked, so events from one chat are applied one at a time.
#[derive(Debug, Default)]
pub struct GameRegistry {
    sessions: DashMap<ChatKey, GameSession>,
}

impl GameRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh session for `chat`, replacing any previous one.
    pub fn insert(&self, chat: ChatKey, session: GameSession) {
        self.sessions.insert(chat, session);
    }

    /// Run `f` against the chat's session; `None` when the chat has no game.
    pub fn update<R>(&self, chat: ChatKey, f: impl FnOnce(&mut GameSession) -> R) -> Option<R> {
        self.sessions.get_mut(&chat).map(|mut entry| f(entry.value_mut()))
    }

    /// Copy of the chat's session.
    #[cfg(test)]
    pub(crate) fn snapshot(&self, chat: ChatKey) -> Option<GameSession> {
        self.sessions.get(&chat).map(|entry| entry.value().clone())
    }
}
