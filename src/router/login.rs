//! Authenticate with email and password.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;

use crate::AppState;
use crate::error::Result;
use crate::router::Valid;
use crate::user::LoginRequest;

pub const COOKIE_NAME: &str = "token";

fn session_cookie(token: &str) -> String {
    format!("{COOKIE_NAME}={token}; HttpOnly; Secure")
}

/// Handler to log in user. The token is only sent back as a cookie.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<LoginRequest>,
) -> Result<impl IntoResponse> {
    let token = state.accounts.login(body).await?;

    Ok((StatusCode::OK, [(header::SET_COOKIE, session_cookie(&token))]))
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::http::{Method, StatusCode, header};
    use serde_json::json;

    use super::COOKIE_NAME;
    use crate::router::tests::state;
    use crate::*;

    const PATH: &str = "/api/v1/users/login";

    async fn signed_up(state: AppState) -> Router {
        let app = app(state);
        let body = json!({"email": "a@b.com", "password": "secret"}).to_string();
        let response = make_request(
            app.clone(),
            Method::POST,
            "/api/v1/users/signup",
            Some("application/json"),
            body,
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        app
    }

    #[tokio::test]
    async fn test_login_handler() {
        let state = state();
        let app = signed_up(state.clone()).await;

        let body = json!({"email": "a@b.com", "password": "secret"}).to_string();
        let response = make_request(app, Method::POST, PATH, Some("application/json"), body).await;
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap();
        let mut attributes = cookie.split("; ");
        let token = attributes
            .next()
            .and_then(|pair| pair.strip_prefix(&format!("{COOKIE_NAME}=")))
            .unwrap();
        assert!(!token.is_empty());
        assert_eq!(attributes.collect::<Vec<_>>(), ["HttpOnly", "Secure"]);

        let claims = state.token.decode(token).unwrap();
        assert_eq!(claims.sub, "1");
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let app = signed_up(state()).await;

        let body = json!({"email": "a@b.com", "password": "wrong"}).to_string();
        let response = make_request(app, Method::POST, PATH, Some("application/json"), body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let app = signed_up(state()).await;

        let body = json!({"email": "nobody@b.com", "password": "secret"}).to_string();
        let response = make_request(app, Method::POST, PATH, Some("application/json"), body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_login_bad_requests() {
        let app = app(state());

        let response =
            make_request(app.clone(), Method::POST, PATH, None, String::new()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json!({"email": "a@b.com", "password": "secret"}).to_string();
        let response = make_request(app.clone(), Method::POST, PATH, None, body).await;
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        for body in [
            json!({"email": "ayushgmail.com", "password": "secret"}),
            json!({"email": "", "password": "secret"}),
            json!({"email": " ", "password": "secret"}),
            json!({"email": "a@b.com", "password": ""}),
            json!({"email": "a@b.com", "password": " "}),
            json!({"email": "a@b.com", "password": null}),
            json!({"email": null, "password": null}),
        ] {
            let response = make_request(
                app.clone(),
                Method::POST,
                PATH,
                Some("application/json"),
                body.to_string(),
            )
            .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        }
    }
}
