/// Per-chat game sessions.
pub mod game;
/// Game phase transitions.
pub mod state_machine;

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use teloxide::Bot;
use tracing::{info, warn};

use crate::{
    config::AppConfig,
    dao::{
        Database,
        media::{MediaBackend, ObjectStore, local::LocalMedia},
    },
    messages::Messages,
    state::game::GameRegistry,
};

/// Handle to [`AppState`] shared by every task.
pub type SharedState = Arc<AppState>;

/// Signing key for the admin session cookie.
#[derive(Clone)]
pub struct SessionKey(Key);

impl SessionKey {
    /// Derive the key from the configured secret, or generate a random one.
    ///
    /// A random key still signs sessions created through one-time links but
    /// invalidates them on every restart.
    pub fn from_secret(secret: Option<&str>) -> Self {
        match secret {
            Some(secret) => {
                let digest = Sha512::digest(secret.as_bytes());
                Self(Key::from(digest.as_slice()))
            }
            None => Self(Key::generate()),
        }
    }
}

impl From<SessionKey> for Key {
    fn from(value: SessionKey) -> Self {
        value.0
    }
}

impl FromRef<SharedState> for SessionKey {
    fn from_ref(state: &SharedState) -> Self {
        state.session_key.clone()
    }
}

/// Central application state shared by the bot dispatcher and the web panel.
pub struct AppState {
    config: AppConfig,
    db: Database,
    messages: Messages,
    games: GameRegistry,
    bot: Bot,
    local: LocalMedia,
    uploads: Arc<dyn MediaBackend>,
    objects: Option<Arc<dyn ObjectStore>>,
    session_key: SessionKey,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// Uploads go to the object store when one is configured, otherwise below
    /// the local uploads directory.
    pub fn new(config: AppConfig, db: Database, messages: Messages, bot: Bot) -> SharedState {
        let local = LocalMedia::new(config.uploads_dir.clone());
        let (uploads, objects) = match object_store(&config) {
            Some((uploads, objects)) => (uploads, Some(objects)),
            None => (Arc::new(local.clone()) as Arc<dyn MediaBackend>, None),
        };
        info!(backend = uploads.name(), "media uploads backend selected");

        if config.session_secret.is_none() {
            warn!("SESSION_SECRET is not set; password login disabled");
        }
        let session_key = SessionKey::from_secret(config.session_secret.as_deref());

        Arc::new(Self {
            config,
            db,
            messages,
            games: GameRegistry::new(),
            bot,
            local,
            uploads,
            objects,
            session_key,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// SQLite repositories.
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Message catalog.
    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Per-chat game sessions.
    pub fn games(&self) -> &GameRegistry {
        &self.games
    }

    /// Telegram client used for outgoing messages.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Local uploads directory, used for serving and for legacy references.
    pub fn local_media(&self) -> &LocalMedia {
        &self.local
    }

    /// Backend receiving new uploads.
    pub fn uploads(&self) -> Arc<dyn MediaBackend> {
        self.uploads.clone()
    }

    /// Object store, when configured.
    pub fn objects(&self) -> Option<Arc<dyn ObjectStore>> {
        self.objects.clone()
    }
}

type Backends = (Arc<dyn MediaBackend>, Arc<dyn ObjectStore>);

#[cfg(feature = "s3-store")]
fn object_store(config: &AppConfig) -> Option<Backends> {
    config.object_store.as_ref().map(|store| {
        info!(bucket = %store.bucket, endpoint = %store.endpoint, "object store configured");
        let s3 = Arc::new(crate::dao::media::s3::S3ObjectStore::new(store));
        (s3.clone() as Arc<dyn MediaBackend>, s3 as Arc<dyn ObjectStore>)
    })
}

#[cfg(not(feature = "s3-store"))]
fn object_store(config: &AppConfig) -> Option<Backends> {
    if config.object_store.is_some() {
        warn!("R2_* variables set but the s3-store feature is disabled; using local uploads");
    }
    None
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;

    use super::*;

    /// State over an in-memory database and a temporary uploads directory.
    pub fn test_state(extra: &[(&str, &str)]) -> (SharedState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut vars: HashMap<String, String> = HashMap::from([
            ("TELEGRAM_BOT_TOKEN".into(), "123456:TEST".into()),
            (
                "HITS_BOT_UPLOADS_DIR".into(),
                dir.path().display().to_string(),
            ),
            ("SESSION_SECRET".into(), "hunter2".into()),
            ("ADMIN_IDS".into(), "100".into()),
        ]);
        for (key, value) in extra {
            vars.insert(key.to_string(), value.to_string());
        }
        let config = AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
        let db = Database::open_in_memory().unwrap();
        let bot = Bot::new(config.bot_token.clone());
        (AppState::new(config, db, Messages::default(), bot), dir)
    }
}
