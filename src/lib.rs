//! Library crate for hits-bot, the Telegram music bingo bot and its admin panel.

/// Telegram commands, game buttons and the polling supervisor.
pub mod bot;
/// Environment-driven runtime configuration.
pub mod config;
/// SQLite repositories and media backends.
pub mod dao;
/// Forms, uploads and page view models of the admin panel.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// Bot message catalog.
pub mod messages;
/// HTTP routes of the admin panel and health checks.
pub mod routes;
/// Business logic shared by the bot and the panel.
pub mod services;
/// Shared application state and per-chat games.
pub mod state;
