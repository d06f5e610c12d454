use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;

use super::cache::PermissionCache;
use super::guest_user;
use crate::app::AppState;
use crate::models::user::User;
use crate::session::SessionConfig;

/// The identity attached to the current request by [`assign_user`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Arc<User>);

impl CurrentUser {
    pub fn guest() -> Self {
        Self(Arc::new(guest_user()))
    }

    pub fn user(&self) -> &User {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .unwrap_or_else(CurrentUser::guest))
    }
}

/// Turns a session cookie value into a user.
///
/// Anything that fails to decode yields the guest identity; the failure is
/// logged once and never surfaces to the client. Role data is rebuilt from
/// the cache using only the role ids carried by the token.
pub fn resolve_user(session: &SessionConfig, cache: &PermissionCache, token: Option<&str>) -> User {
    let Some(token) = token.filter(|token| !token.is_empty()) else {
        return guest_user();
    };

    match session.decode(token) {
        Ok(claims) => {
            let user: User = claims.user.into();
            let roles = cache.roles_by_ids(&user.role_ids);
            user.with_roles(roles)
        }
        Err(err) => {
            tracing::warn!(error = %err, "invalid session cookie, continuing as guest");
            guest_user()
        }
    }
}

/// Middleware: runs before `check` and stores a [`CurrentUser`] in the
/// request extensions.
pub async fn assign_user(State(state): State<AppState>, jar: CookieJar, mut req: Request, next: Next) -> Response {
    let token = jar.get(&state.session.cookie_name).map(|cookie| cookie.value());
    let user = resolve_user(&state.session, &state.permissions, token);

    req.extensions_mut().insert(CurrentUser(Arc::new(user)));
    next.run(req).await
}
