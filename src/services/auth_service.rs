use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use rand::{Rng, distr::Alphanumeric};
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::{error::ServiceError, state::SharedState};

/// Name of the signed admin session cookie.
pub const SESSION_COOKIE: &str = "hits_admin";
/// Lifetime of one-time admin links.
pub const ADMIN_TOKEN_TTL: Duration = Duration::minutes(10);
/// Lifetime of an admin browser session.
pub const SESSION_TTL: Duration = Duration::hours(12);
const TOKEN_LENGTH: usize = 32;

fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Random URL-safe token.
pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Mint a one-time login token for `user_id` and return the deep link.
pub async fn create_admin_link(state: &SharedState, user_id: i64) -> Result<String, ServiceError> {
    let token = generate_token();
    let issued = now();
    let expires_at = issued + ADMIN_TOKEN_TTL.whole_seconds();

    let stored = token.clone();
    state
        .db()
        .call(move |db| {
            db.purge_expired_admin_tokens(issued)?;
            db.insert_admin_token(&stored, user_id, expires_at)
        })
        .await?;
    info!(user_id, "one-time admin link issued");

    Ok(format!(
        "{}/admin_web?key={token}",
        state.config().public_base_url()
    ))
}

/// Consume a one-time token, returning the admin it was issued to.
///
/// The token is spent even when it has already expired.
pub async fn consume_token(state: &SharedState, token: &str) -> Result<i64, ServiceError> {
    let token = token.to_owned();
    let at = now();
    let owner = state
        .db()
        .call(move |db| db.consume_admin_token(&token, at))
        .await?;
    match owner {
        Some(user_id) => {
            info!(user_id, "admin logged in with one-time link");
            Ok(user_id)
        }
        None => {
            warn!("rejected unknown or expired admin token");
            Err(ServiceError::Unauthorized("invalid or expired token".into()))
        }
    }
}

/// Compare a submitted password with `SESSION_SECRET`.
///
/// Always fails when no secret is configured.
pub fn check_password(state: &SharedState, password: &str) -> Result<(), ServiceError> {
    let Some(secret) = state.config().session_secret.as_deref() else {
        return Err(ServiceError::Unauthorized("password login disabled".into()));
    };
    if password.is_empty() || !constant_time_eq(password.as_bytes(), secret.as_bytes()) {
        warn!("rejected admin password");
        return Err(ServiceError::Unauthorized("wrong password".into()));
    }
    info!("admin logged in with password");
    Ok(())
}

/// Add a fresh session cookie to the jar.
pub fn start_session<K>(jar: SignedCookieJar<K>) -> SignedCookieJar<K> {
    jar.add(session_cookie(now()))
}

/// Remove the session cookie.
pub fn end_session<K>(jar: SignedCookieJar<K>) -> SignedCookieJar<K> {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// Whether the jar carries a session issued less than [`SESSION_TTL`] ago.
pub fn has_session<K>(jar: &SignedCookieJar<K>) -> bool {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| cookie.value().parse::<i64>().ok())
        .is_some_and(|issued| session_is_fresh(issued, now()))
}

fn session_cookie(issued: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, issued.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(SESSION_TTL)
        .build()
}

fn session_is_fresh(issued: i64, now: i64) -> bool {
    let age = now - issued;
    (0..SESSION_TTL.whole_seconds()).contains(&age)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
