//! Request extractors: the authenticated user and JSON bodies with
//! crate-style rejections.

use super::{AppState, error::ApiError};
use crate::{
    core::auth::{self, AuthUser, SESSION_COOKIE},
    errors::Error,
};
use axum::{
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use std::sync::Arc;

/// The session token carried by the request, if any
pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Any logged-in user
#[derive(Debug, Clone)]
pub struct Authenticated(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = session_token(&jar).ok_or(Error::Unauthorized)?;
        let user = auth::validate_session(&state.db, &token).await?;
        Ok(Self(user))
    }
}

/// A logged-in administrator
#[derive(Debug, Clone)]
pub struct Admin(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Authenticated(user) = Authenticated::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(Error::Forbidden.into());
        }
        Ok(Self(user))
    }
}

/// JSON body whose parse failures surface as validation errors
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
