//! URL-encoded forms and query strings of the admin panel.

use serde::Deserialize;
use validator::Validate;

use crate::dto::validation::validate_file_id;

/// Password login form.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct LoginForm {
    /// Submitted password.
    #[serde(default)]
    #[validate(length(max = 256))]
    pub password: String,
}

/// `?key=<token>` carried by one-time admin links.
#[derive(Debug, Default, Deserialize)]
pub struct KeyQuery {
    /// One-time login token.
    pub key: Option<String>,
}

impl KeyQuery {
    /// Token with surrounding whitespace removed, ignoring empty values.
    pub fn token(&self) -> Option<&str> {
        self.key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    }
}

/// Delivery counters appended to the broadcast list after a send.
#[derive(Debug, Default, Deserialize)]
pub struct SendReportQuery {
    /// Successful deliveries.
    pub sent: Option<usize>,
    /// Failed deliveries.
    pub failed: Option<usize>,
}

/// Welcome picture form; an empty value clears the setting.
#[derive(Debug, Default, Deserialize)]
pub struct WelcomeForm {
    /// Telegram file id of the picture.
    #[serde(default)]
    pub file_id: String,
}

impl WelcomeForm {
    /// Trimmed file id, or `None` when the admin cleared the field.
    pub fn file_id(&self) -> Option<&str> {
        Some(self.file_id.trim()).filter(|id| !id.is_empty())
    }

    /// Check the file id when one was provided.
    pub fn check(&self) -> Result<(), validator::ValidationError> {
        self.file_id().map_or(Ok(()), validate_file_id)
    }
}
