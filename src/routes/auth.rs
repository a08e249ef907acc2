use axum::{
    Form, Router,
    extract::{Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::cookie::SignedCookieJar;
use validator::Validate;

use crate::{
    dto::{
        forms::{KeyQuery, LoginForm},
        pages::{LoginPage, render},
    },
    error::{AppError, ServiceError},
    services::auth_service,
    state::{SessionKey, SharedState},
};

/// Landing page of the admin panel.
pub const HOME_PATH: &str = "/admin_web";
/// Login form, also the target of one-time links.
pub const LOGIN_PATH: &str = "/admin_web/login";

const INVALID_LINK: &str = "Ссылка недействительна или устарела. Запросите новую через /admin_link.";
const WRONG_PASSWORD: &str = "Неверный пароль.";

type Jar = SignedCookieJar<SessionKey>;

/// Login and logout; reachable without a session.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(LOGIN_PATH, get(login_page).post(login))
        .route("/admin_web/logout", get(logout))
}

/// Let requests with a live session through. Others go to the login page,
/// keeping a one-time `?key=` so the link still works.
pub async fn require_session(
    jar: Jar,
    Query(query): Query<KeyQuery>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if auth_service::has_session(&jar) {
        return Ok(next.run(req).await);
    }
    match query.token().filter(|token| is_token_shaped(token)) {
        Some(token) => Ok(Redirect::to(&format!("{LOGIN_PATH}?key={token}")).into_response()),
        None => Err(AppError::Unauthorized("no admin session".into())),
    }
}

async fn login_page(
    State(state): State<SharedState>,
    jar: Jar,
    Query(query): Query<KeyQuery>,
) -> Result<Response, AppError> {
    if let Some(token) = query.token() {
        return login_with_token(&state, jar, token).await;
    }
    if auth_service::has_session(&jar) {
        return Ok(Redirect::to(HOME_PATH).into_response());
    }
    login_form(&state, StatusCode::OK, "")
}

async fn login(
    State(state): State<SharedState>,
    jar: Jar,
    Query(query): Query<KeyQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if let Some(token) = query.token() {
        return login_with_token(&state, jar, token).await;
    }
    form.validate()?;
    match auth_service::check_password(&state, &form.password) {
        Ok(()) => Ok((auth_service::start_session(jar), Redirect::to(HOME_PATH)).into_response()),
        Err(_) => login_form(&state, StatusCode::UNAUTHORIZED, WRONG_PASSWORD),
    }
}

async fn logout(jar: Jar) -> impl IntoResponse {
    (auth_service::end_session(jar), Redirect::to(LOGIN_PATH))
}

async fn login_with_token(state: &SharedState, jar: Jar, token: &str) -> Result<Response, AppError> {
    match auth_service::consume_token(state, token).await {
        Ok(_) => Ok((auth_service::start_session(jar), Redirect::to(HOME_PATH)).into_response()),
        Err(ServiceError::Unauthorized(_)) => {
            login_form(state, StatusCode::UNAUTHORIZED, INVALID_LINK)
        }
        Err(err) => Err(err.into()),
    }
}

fn login_form(state: &SharedState, status: StatusCode, error: &str) -> Result<Response, AppError> {
    let page = render(&LoginPage {
        error: error.to_owned(),
        password_enabled: state.config().session_secret.is_some(),
    })?;
    Ok((status, page).into_response())
}

/// Generated tokens are alphanumeric; anything else is not worth forwarding.
fn is_token_shaped(token: &str) -> bool {
    token.len() <= 128 && token.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_alphanumeric_tokens_are_forwarded() {
        assert!(is_token_shaped(&auth_service::generate_token()));
        assert!(!is_token_shaped("abc&next=evil"));
        assert!(!is_token_shaped(&"a".repeat(200)));
    }
}
