//! Request extractors for the signed-in user and the theme preference.

use crate::errors::AppError;
use crate::models::UserProfile;
use crate::session::{SESSION_TTL_SECS, SessionProvider};
use crate::state::AppState;
use crate::theme::{THEME_COOKIE, Theme};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
    response::Redirect,
};
use std::convert::Infallible;
use tracing::error;

pub const SESSION_COOKIE: &str = "health_session";

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: UserProfile,
    pub token: String,
}

/// The signed-in user, if any. Never rejects.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    /// Protected pages send signed-out visitors to the login view.
    pub fn require(self) -> Result<CurrentUser, Redirect> {
        self.0.ok_or_else(|| Redirect::to("/auth"))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ThemePref(pub Theme);

pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Bearer header first, then the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    bearer
        .or_else(|| cookie_value(headers, SESSION_COOKIE))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

pub fn session_cookie(token: &str) -> String {
    format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_TTL_SECS}")
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Ok(Self(None));
        };
        match state.sessions.current_user(&token).await {
            Ok(user) => Ok(Self(user.map(|user| CurrentUser { user, token }))),
            Err(err) => {
                error!("failed to restore session: {err}");
                Ok(Self(None))
            }
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state)
            .await
            .unwrap_or(MaybeUser(None));
        user.ok_or_else(|| AppError::unauthorized("not signed in"))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ThemePref {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let theme = cookie_value(&parts.headers, THEME_COOKIE)
            .and_then(Theme::parse)
            .unwrap_or(state.default_theme);
        Ok(Self(theme))
    }
}
