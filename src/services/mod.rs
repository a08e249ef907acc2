/// Admin login: one-time links, password check and session cookies.
pub mod auth_service;
/// Broadcast drafts and their delivery to every user.
pub mod broadcast_service;
/// Per-chat game flow on top of the state machine.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Periodic self ping keeping free hosting tiers awake.
pub mod keepalive;
/// Playlist management and upload storage.
pub mod track_service;
