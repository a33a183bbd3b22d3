//! Login, logout and the current user.

use crate::{
    api::{
        ApiResponse, AppState,
        error::ApiResult,
        extract::{Authenticated, JsonBody, session_token},
        ok,
    },
    core::auth::{self, AuthUser, SESSION_COOKIE},
};
use axum::{Json, Router, extract::State, routing::{get, post}};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct LoginBody {
    phone: String,
    password: String,
}

fn session_cookie(token: String, ttl_hours: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::hours(ttl_hours))
        .build()
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    JsonBody(body): JsonBody<LoginBody>,
) -> ApiResult<(CookieJar, Json<ApiResponse<AuthUser>>)> {
    let ttl = chrono::Duration::hours(state.config.session_ttl_hours);
    let outcome = auth::login(&state.db, &body.phone, &body.password, ttl).await?;

    let cookie = session_cookie(
        outcome.token,
        state.config.session_ttl_hours,
        state.config.session_cookie_secure,
    );
    Ok((jar.add(cookie), ok(outcome.user)))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    Authenticated(_): Authenticated,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<ApiResponse<&'static str>>)> {
    if let Some(token) = session_token(&jar) {
        auth::logout(&state.db, &token).await?;
    }
    let removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    Ok((jar.remove(removal), ok("Logged out")))
}

async fn me(Authenticated(user): Authenticated) -> Json<ApiResponse<AuthUser>> {
    ok(user)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc".to_string(), 24, false);
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(24)));
        assert_eq!(cookie.path(), Some("/"));
    }
}
