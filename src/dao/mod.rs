/// Admin one-time login tokens.
pub mod admin_tokens;
/// Broadcast drafts, their media and delivery logs.
pub mod broadcasts;
/// SQLite connection handle shared by the repositories.
pub mod database;
/// Media backends (local uploads directory, S3-compatible object store).
pub mod media;
/// Database model definitions.
pub mod models;
/// Schema bootstrap executed when the database is opened.
pub mod schema;
/// Key/value settings.
pub mod settings;
/// Error types shared by the media backends.
pub mod storage;
/// Playlist tracks.
pub mod tracks;
/// Telegram users known to the bot.
pub mod users;

pub use database::{Database, DbError};
