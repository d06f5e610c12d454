use std::sync::Arc;

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::errors::{AppError, AppResult};
use crate::models::user::User;

/// Sessions last until the user logs out.
pub const SESSION_LIFETIME_HOURS: i64 = 100 * 365 * 24;

const DEFAULT_COOKIE_NAME: &str = "token";
pub const VISITOR_COOKIE_NAME: &str = "visitor";
const DEFAULT_ISSUER: &str = "quill-gate";

/// Signs and verifies the session token carried in the session cookie.
///
/// The token is the only identity store: there is no server-side session
/// table, and logging out just replaces the cookie with an expired one.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: Arc<Vec<u8>>,
    pub cookie_name: String,
    pub issuer: String,
    pub secure: bool,
}

impl SessionConfig {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            issuer: DEFAULT_ISSUER.to_string(),
            secure: true,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let secret = std::env::var("APP_KEY").map_err(|_| AppError::configuration("APP_KEY not set"))?;
        if secret.is_empty() {
            return Err(AppError::configuration("APP_KEY must not be empty"));
        }

        let mut config = Self::new(secret.into_bytes());
        if let Ok(name) = std::env::var("APP_TOKEN_KEY") {
            config.cookie_name = name;
        }
        if let Ok(issuer) = std::env::var("APP_NAME") {
            config.issuer = issuer;
        }
        config.secure = std::env::var("COOKIE_SECURE")
            .map(|val| val.parse::<bool>())
            .unwrap_or(Ok(true))
            .map_err(|_| AppError::configuration("COOKIE_SECURE must be true or false"))?;

        Ok(config)
    }

    pub fn expiry_from_now(&self) -> DateTime<Utc> {
        Utc::now() + Duration::hours(SESSION_LIFETIME_HOURS)
    }

    /// Signs a session for `user`. Role ids are taken from the user's
    /// resolved roles, never from its `role_ids` field.
    pub fn encode(&self, user: &User, expires_at: DateTime<Utc>) -> AppResult<String> {
        let role_ids = user
            .roles
            .iter()
            .map(|role| role.id)
            .filter(|id| *id > 0)
            .collect();

        let claims = SessionClaims {
            iss: self.issuer.clone(),
            exp: expires_at.timestamp().max(0) as usize,
            user: SessionUser {
                id: user.id,
                provider: user.provider.clone(),
                username: user.username.clone(),
                email: user.email.clone(),
                display_name: user.display_name.clone(),
                role_ids,
                avatar_image_url: user.avatar().to_string(),
                active: user.active,
            },
        };

        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|err| AppError::token(err.to_string()))
    }

    /// Verifies signature and expiry. Callers treat any error as "no session".
    pub fn decode(&self, token: &str) -> AppResult<SessionClaims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        jsonwebtoken::decode::<SessionClaims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|err| AppError::token(err.to_string()))
    }

    pub fn login_cookie(&self, token: String, expires_at: DateTime<Utc>) -> Cookie<'static> {
        let expires = OffsetDateTime::from_unix_timestamp(expires_at.timestamp())
            .unwrap_or_else(|_| OffsetDateTime::now_utc());
        self.cookie(token, expires)
    }

    /// Replacement cookie that ends the session immediately.
    pub fn logout_cookie(&self) -> Cookie<'static> {
        self.cookie(String::new(), OffsetDateTime::now_utc())
    }

    /// Anonymous visitor id, issued once and kept as long as a session.
    pub fn visitor_cookie(&self, visitor_id: String) -> Cookie<'static> {
        let mut cookie = self.login_cookie(visitor_id, self.expiry_from_now());
        cookie.set_name(VISITOR_COOKIE_NAME);
        cookie
    }

    fn cookie(&self, value: String, expires: OffsetDateTime) -> Cookie<'static> {
        // readable from scripts: the UI reads the display fields
        Cookie::build((self.cookie_name.clone(), value))
            .path("/")
            .expires(expires)
            .http_only(false)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .build()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub iss: String,
    pub exp: usize,
    pub user: SessionUser,
}

/// The denormalized user copy embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    #[serde(default)]
    pub provider: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub role_ids: Vec<i64>,
    #[serde(default)]
    pub avatar_image_url: String,
    #[serde(default)]
    pub active: bool,
}

impl From<SessionUser> for User {
    fn from(session: SessionUser) -> Self {
        User {
            id: session.id,
            username: session.username,
            display_name: session.display_name,
            email: session.email,
            provider: session.provider,
            avatar_image_url: session.avatar_image_url,
            role_ids: session.role_ids,
            active: session.active,
            ..User::default()
        }
    }
}
