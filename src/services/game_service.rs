use tracing::{debug, info};

use crate::{
    dao::models::TrackEntity,
    error::ServiceError,
    state::{
        SharedState,
        game::{ChatKey, Cue, GameSession},
        state_machine::{GameEvent, GamePhase},
    },
};

/// Track to announce, with its position in the chat's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackCue {
    /// Position of the track in the chat's order.
    pub cue: Cue,
    /// `None` when the track was deleted after the game started.
    pub track: Option<TrackEntity>,
}

/// Result of a start or restart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new order was shuffled; the first track is ready to send.
    Started(TrackCue),
    /// The playlist is shorter than the configured minimum.
    NotEnoughTracks {
        /// Tracks in the playlist.
        count: usize,
        /// Tracks required.
        min: usize,
    },
}

/// Result of pressing "next".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextOutcome {
    /// The next track is ready to send.
    Track(TrackCue),
    /// The order is exhausted (repeated presses keep reporting this).
    Ended,
    /// The chat never started a game.
    NoSession,
}

/// Shuffle every track into a fresh order for `chat`.
///
/// Allowed from any phase; an existing session is replaced.
pub async fn start_game(state: &SharedState, chat: ChatKey) -> Result<StartOutcome, ServiceError> {
    let ids = state.db().call(|db| db.list_track_ids()).await?;
    let min = state.config().min_tracks.max(1);
    if ids.len() < min {
        debug!(chat, count = ids.len(), min, "not enough tracks to start");
        return Ok(StartOutcome::NotEnoughTracks {
            count: ids.len(),
            min,
        });
    }

    let session = GameSession::shuffled(ids)
        .map_err(|err| ServiceError::InvalidState(err.to_string()))?;
    let Some(cue) = session.cue() else {
        return Err(ServiceError::InvalidState("fresh game has no track".into()));
    };
    state.games().insert(chat, session);
    info!(chat, tracks = cue.total, "game started");

    Ok(StartOutcome::Started(load_cue(state, cue).await?))
}

/// Advance the chat to its next track.
pub async fn next_track(state: &SharedState, chat: ChatKey) -> Result<NextOutcome, ServiceError> {
    let step = state.games().update(chat, |session| {
        session
            .apply(GameEvent::Next)
            .ok()
            .map(|phase| (phase, session.cue()))
    });

    match step {
        None => Ok(NextOutcome::NoSession),
        Some(Some((GamePhase::Playing(_), Some(cue)))) => {
            Ok(NextOutcome::Track(load_cue(state, cue).await?))
        }
        Some(Some((GamePhase::Ended, _))) => {
            debug!(chat, "game ended");
            Ok(NextOutcome::Ended)
        }
        Some(_) => Ok(NextOutcome::NoSession),
    }
}

/// Track whose hint should be shown; after the end this is the last track.
pub async fn hint(state: &SharedState, chat: ChatKey) -> Result<Option<TrackEntity>, ServiceError> {
    reveal(state, chat, GameEvent::Hint).await
}

/// Track whose title should be revealed; after the end this is the last track.
pub async fn answer(
    state: &SharedState,
    chat: ChatKey,
) -> Result<Option<TrackEntity>, ServiceError> {
    reveal(state, chat, GameEvent::Answer).await
}

async fn reveal(
    state: &SharedState,
    chat: ChatKey,
    event: GameEvent,
) -> Result<Option<TrackEntity>, ServiceError> {
    let cue = state
        .games()
        .update(chat, |session| {
            session.apply(event).ok().and_then(|_| session.cue())
        })
        .flatten();

    let Some(cue) = cue else {
        debug!(chat, ?event, "ignoring reveal without a game");
        return Ok(None);
    };
    Ok(load_cue(state, cue).await?.track)
}

async fn load_cue(state: &SharedState, cue: Cue) -> Result<TrackCue, ServiceError> {
    let track_id = cue.track_id;
    let track = state.db().call(move |db| db.find_track(track_id)).await?;
    Ok(TrackCue { cue, track })
}
