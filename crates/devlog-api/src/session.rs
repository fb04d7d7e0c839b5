//! Browser sessions.
//!
//! A session is an HS256 JWT in an HTTP-only cookie. It is resolved once per
//! request into an optional [`Identity`] that handlers receive explicitly.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use devlog_types::models::Role;

use crate::AppState;

pub const SESSION_COOKIE: &str = "devlog_session";

/// Sessions expire 24 hours after login.
const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

/// Who the current request belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn issue_token(secret: &str, identity: &Identity) -> anyhow::Result<String> {
    let claims = Claims {
        sub: identity.user_id,
        username: identity.username.clone(),
        role: identity.role,
        exp: (chrono::Utc::now() + chrono::Duration::hours(SESSION_TTL_HOURS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Bad signatures, expired tokens and missing cookies all resolve to anonymous.
pub fn resolve(jar: &CookieJar, secret: &str) -> Option<Identity> {
    let token = jar.get(SESSION_COOKIE)?.value().to_string();

    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| debug!("Ignoring session cookie: {}", e))
    .ok()?;

    Some(Identity {
        user_id: token_data.claims.sub,
        username: token_data.claims.username,
        role: token_data.claims.role,
    })
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie shape that matches [`session_cookie`] for removal.
pub fn expired_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// The current request's identity, `None` when anonymous.
#[derive(Debug, Clone)]
pub struct Session(pub Option<Identity>);

impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(Session(resolve(&jar, &state.session_secret)))
    }
}
