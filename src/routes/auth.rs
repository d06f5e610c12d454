use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::app::AppState;
use crate::authz::check::found;
use crate::authz::CurrentUser;
use crate::errors::{AppError, AppResult};
use crate::models::user::LoginRequest;
use crate::utils::{safe_back_path, verify_password};

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub back: Option<String>,
}

pub async fn login_page(current: CurrentUser, Query(query): Query<LoginQuery>) -> Response {
    let back = safe_back_path(query.back.as_deref());
    if !current.user().is_anonymous() {
        return found(&back);
    }

    format!("Log in to continue to {back}").into_response()
}

#[utoipa::path(
    post,
    path = "/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 302, description = "Session cookie set, redirected to the return path"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(State(state): State<AppState>, jar: CookieJar, Json(payload): Json<LoginRequest>) -> AppResult<Response> {
    let (user, password_hash) = state
        .repos
        .users
        .credentials(&payload.username)
        .await?
        .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    // accounts created through an external provider have no local password
    if password_hash.is_empty() || !verify_password(&payload.password, &password_hash)? {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let roles = state.permissions.roles_by_ids(&user.role_ids);
    let user = user.with_roles(roles);

    let expires_at = state.session.expiry_from_now();
    let token = state.session.encode(&user, expires_at)?;
    let jar = jar.add(state.session.login_cookie(token, expires_at));

    tracing::info!(user_id = user.id, "user logged in");

    let back = safe_back_path(payload.back.as_deref());
    Ok((jar, found(&back)).into_response())
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let jar = jar.add(state.session.logout_cookie());
    (jar, found("/")).into_response()
}

pub async fn inactive() -> &'static str {
    "Your account is inactive. Contact an administrator to have it reactivated."
}
