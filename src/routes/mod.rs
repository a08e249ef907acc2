use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    response::Redirect,
    routing::get,
};
use tower_http::services::ServeDir;

use crate::{
    services::{broadcast_service::BROADCASTS_DIR, track_service},
    state::SharedState,
};

/// Login, logout and the session guard.
pub mod auth;
/// Broadcast drafts and sending.
pub mod broadcasts;
/// Liveness endpoints.
pub mod health;
/// Object store proxy.
pub mod media;
/// Playlist management.
pub mod tracks;

/// Largest accepted request body; audio uploads dominate.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Compose all route trees, wiring in shared state and the session guard.
pub fn router(state: SharedState) -> Router<()> {
    let admin = tracks::router()
        .merge(broadcasts::router())
        .merge(media::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    let mut app = Router::<SharedState>::new()
        .route("/", get(|| async { Redirect::to(auth::HOME_PATH) }))
        .merge(health::router())
        .merge(auth::router())
        .merge(admin);

    // Only media folders are public; the database may live next to them.
    let root = state.config().uploads_dir.clone();
    for dir in [track_service::AUDIO_DIR, track_service::HINTS_DIR, BROADCASTS_DIR] {
        app = app.nest_service(&format!("/uploads/{dir}"), ServeDir::new(root.join(dir)));
    }

    app.layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{
            Method, Request, StatusCode,
            header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        },
        response::Response,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        services::{auth_service, auth_service::SESSION_COOKIE},
        state::test_support::test_state,
    };

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response.headers().get(LOCATION).unwrap().to_str().unwrap()
    }

    fn session_cookie(response: &Response) -> String {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.starts_with(SESSION_COOKIE))
            .and_then(|value| value.split(';').next())
            .unwrap()
            .to_owned()
    }

    async fn password_login(app: &Router, password: &str) -> Response {
        let request = Request::post("/admin_web/login")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("password={password}")))
            .unwrap();
        send(app, request).await
    }

    #[tokio::test]
    async fn health_endpoints_return_ok() {
        let (state, _dir) = test_state(&[]);
        let app = router(state);

        for uri in ["/health", "/healthz"] {
            let response = send(&app, get_request(uri)).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_text(response).await, "ok");
        }

        let head = Request::builder()
            .method(Method::HEAD)
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, head).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn root_redirects_to_panel() {
        let (state, _dir) = test_state(&[]);
        let app = router(state);
        let response = send(&app, get_request("/")).await;
        assert!(response.status().is_redirection());
        assert_eq!(location(&response), "/admin_web");
    }

    #[tokio::test]
    async fn admin_pages_require_a_session() {
        let (state, _dir) = test_state(&[]);
        let app = router(state);

        for uri in ["/admin_web", "/admin_web/broadcasts", "/admin_web/edit/1"] {
            let response = send(&app, get_request(uri)).await;
            assert!(response.status().is_redirection(), "{uri}");
            assert_eq!(location(&response), "/admin_web/login");
        }

        let response = send(&app, get_request("/admin_web?key=abc123")).await;
        assert_eq!(location(&response), "/admin_web/login?key=abc123");
    }

    #[tokio::test]
    async fn password_login_opens_a_session() {
        let (state, _dir) = test_state(&[]);
        let app = router(state);

        let rejected = password_login(&app, "wrong").await;
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
        assert!(rejected.headers().get(SET_COOKIE).is_none());

        let accepted = password_login(&app, "hunter2").await;
        assert!(accepted.status().is_redirection());
        assert_eq!(location(&accepted), "/admin_web");
        let cookie = session_cookie(&accepted);

        let request = Request::get("/admin_web")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Плейлист"));

        let request = Request::get("/admin_web/broadcasts?sent=2&failed=1")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("доставлено 2, ошибок 1"));
    }

    #[tokio::test]
    async fn one_time_link_logs_in_once() {
        let (state, _dir) = test_state(&[("PUBLIC_URL", "https://bingo.test")]);
        let link = auth_service::create_admin_link(&state, 100).await.unwrap();
        let path = link.strip_prefix("https://bingo.test").unwrap().to_owned();
        let token = path.strip_prefix("/admin_web?key=").unwrap().to_owned();
        let app = router(state);

        let forwarded = send(&app, get_request(&path)).await;
        assert_eq!(location(&forwarded), format!("/admin_web/login?key={token}"));

        let login = format!("/admin_web/login?key={token}");
        let accepted = send(&app, get_request(&login)).await;
        assert!(accepted.status().is_redirection());
        assert_eq!(location(&accepted), "/admin_web");
        assert!(session_cookie(&accepted).starts_with(SESSION_COOKIE));

        let replayed = send(&app, get_request(&login)).await;
        assert_eq!(replayed.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn uploads_serve_media_but_not_the_database() {
        let (state, dir) = test_state(&[]);
        std::fs::create_dir_all(dir.path().join("hints")).unwrap();
        std::fs::write(dir.path().join("hints/hint_01.jpg"), b"jpg").unwrap();
        std::fs::write(dir.path().join("db.sqlite3"), b"secret").unwrap();
        let app = router(state);

        let response = send(&app, get_request("/uploads/hints/hint_01.jpg")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "jpg");

        let response = send(&app, get_request("/uploads/db.sqlite3")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
