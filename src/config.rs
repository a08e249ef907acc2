//! Runtime configuration read from the environment (optionally seeded by `.env`).

use std::{collections::BTreeSet, env, path::PathBuf};

use thiserror::Error;
use tracing::{info, warn};

/// Environment variables probed, in order, for the public host of the panel.
const PUBLIC_HOST_VARS: [&str; 3] = ["PUBLIC_URL", "RAILWAY_PUBLIC_DOMAIN", "REPLIT_WEB_URL"];
/// Host used in links when no public host is configured.
const FALLBACK_PUBLIC_HOST: &str = "https://example.com";
const DEFAULT_UPLOADS_DIR: &str = "uploads";
const DEFAULT_MESSAGES_PATH: &str = "config/messages.json";
const DEFAULT_PORT: u16 = 8080;

/// Error raised when a mandatory setting is missing.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A mandatory variable is unset.
    #[error("environment variable `{0}` is not set")]
    Missing(&'static str),
}

/// Credentials and location of the optional S3-compatible bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreConfig {
    /// Bucket name.
    pub bucket: String,
    /// S3 API endpoint URL.
    pub endpoint: String,
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Key prefix prepended to every object, without surrounding slashes.
    pub prefix: String,
}

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Telegram bot token.
    pub bot_token: String,
    /// Telegram users allowed to use admin commands.
    pub admin_ids: BTreeSet<i64>,
    /// Fewest tracks a game can start with.
    pub min_tracks: usize,
    /// Public base URL without trailing slash, when one is configured.
    pub public_host: Option<String>,
    /// Password for the admin panel and key material for session cookies.
    pub session_secret: Option<String>,
    /// HTTP listen port.
    pub port: u16,
    /// Root of locally stored media.
    pub uploads_dir: PathBuf,
    /// SQLite database file.
    pub database_path: PathBuf,
    /// JSON overrides of the message catalog.
    pub messages_path: PathBuf,
    /// Bucket settings when every R2 variable is set.
    pub object_store: Option<ObjectStoreConfig>,
}

impl AppConfig {
    /// Load `.env` if present, then read every setting from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => info!(path = %path.display(), "loaded .env file"),
            Err(err) if err.not_found() => {}
            Err(err) => warn!(error = %err, "failed to parse .env file; ignoring it"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let bot_token = get("TELEGRAM_BOT_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        let admin_ids = get("ADMIN_IDS")
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default();

        let min_tracks = get("MIN_TRACKS")
            .and_then(|raw| raw.parse::<usize>().ok())
            .unwrap_or(1)
            .max(1);

        let public_host = PUBLIC_HOST_VARS
            .iter()
            .find_map(|key| get(key))
            .map(|raw| normalize_host(&raw));

        let port = get("PORT")
            .or_else(|| get("SERVER_PORT"))
            .and_then(|raw| raw.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let uploads_dir = PathBuf::from(
            get("HITS_BOT_UPLOADS_DIR").unwrap_or_else(|| DEFAULT_UPLOADS_DIR.to_owned()),
        );
        let database_path = get("HITS_BOT_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| uploads_dir.join("db.sqlite3"));
        let messages_path = PathBuf::from(
            get("HITS_BOT_MESSAGES_PATH").unwrap_or_else(|| DEFAULT_MESSAGES_PATH.to_owned()),
        );

        let object_store = match (
            get("R2_BUCKET"),
            get("R2_ENDPOINT"),
            get("R2_ACCESS_KEY_ID"),
            get("R2_SECRET_ACCESS_KEY"),
        ) {
            (Some(bucket), Some(endpoint), Some(access_key_id), Some(secret_access_key)) => {
                Some(ObjectStoreConfig {
                    bucket,
                    endpoint,
                    access_key_id,
                    secret_access_key,
                    prefix: get("R2_PREFIX")
                        .map(|prefix| prefix.trim_matches('/').to_owned())
                        .unwrap_or_default(),
                })
            }
            _ => None,
        };

        Ok(Self {
            bot_token,
            admin_ids,
            min_tracks,
            public_host,
            session_secret: get("SESSION_SECRET"),
            port,
            uploads_dir,
            database_path,
            messages_path,
            object_store,
        })
    }

    /// Whether `user_id` is listed as an admin.
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Public base URL used in links sent to admins.
    pub fn public_base_url(&self) -> &str {
        self.public_host.as_deref().unwrap_or(FALLBACK_PUBLIC_HOST)
    }
}

/// Comma separated numeric ids; anything that does not parse is skipped.
fn parse_admin_ids(raw: &str) -> BTreeSet<i64> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<i64>().ok())
        .collect()
}

/// Add a scheme when missing and drop trailing slashes.
fn normalize_host(raw: &str) -> String {
    let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_owned()
    } else {
        format!("https://{raw}")
    };
    with_scheme.trim_end_matches('/').to_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn token_is_required() {
        assert!(matches!(
            load(&[]),
            Err(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))
        ));
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("TELEGRAM_BOT_TOKEN", "123:abc")]).unwrap();
        assert_eq!(config.min_tracks, 1);
        assert_eq!(config.port, 8080);
        assert!(config.admin_ids.is_empty());
        assert_eq!(config.public_base_url(), "https://example.com");
        assert_eq!(config.database_path, PathBuf::from("uploads/db.sqlite3"));
        assert!(config.object_store.is_none());
        assert!(config.session_secret.is_none());
    }

    #[test]
    fn parses_admins_hosts_and_limits() {
        let config = load(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("ADMIN_IDS", " 1, 22 ,abc,,333"),
            ("MIN_TRACKS", "0"),
            ("RAILWAY_PUBLIC_DOMAIN", "bingo.up.railway.app/"),
            ("PORT", "9000"),
        ])
        .unwrap();
        assert_eq!(config.admin_ids, BTreeSet::from([1, 22, 333]));
        assert!(config.is_admin(22));
        assert!(!config.is_admin(4));
        assert_eq!(config.min_tracks, 1);
        assert_eq!(config.public_base_url(), "https://bingo.up.railway.app");
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn public_url_wins_over_platform_domains() {
        let config = load(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("PUBLIC_URL", "http://localhost:8080/"),
            ("REPLIT_WEB_URL", "repl.example"),
        ])
        .unwrap();
        assert_eq!(config.public_base_url(), "http://localhost:8080");
    }

    #[test]
    fn object_store_requires_every_credential() {
        let partial = load(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("R2_BUCKET", "b"),
            ("R2_ENDPOINT", "https://acc.r2.cloudflarestorage.com"),
        ])
        .unwrap();
        assert!(partial.object_store.is_none());

        let full = load(&[
            ("TELEGRAM_BOT_TOKEN", "t"),
            ("R2_BUCKET", "b"),
            ("R2_ENDPOINT", "https://acc.r2.cloudflarestorage.com"),
            ("R2_ACCESS_KEY_ID", "id"),
            ("R2_SECRET_ACCESS_KEY", "secret"),
            ("R2_PREFIX", "/bingo/"),
        ])
        .unwrap();
        let store = full.object_store.unwrap();
        assert_eq!(store.bucket, "b");
        assert_eq!(store.prefix, "bingo");
    }
}
