#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use chrono::{Duration, Utc};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt;

use quill_gate::models::role::Role;
use quill_gate::models::user::User;
use quill_gate::session::SessionConfig;

pub const SECRET: &str = "test-secret";

/// A migrated database in a temp dir; keep the dir alive for the test.
pub async fn database() -> Result<(TempDir, SqlitePool)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"))
        .await?;
    migrator.run(&pool).await?;

    Ok((dir, pool))
}

pub fn session() -> SessionConfig {
    SessionConfig::new(SECRET)
}

pub async fn insert_user(pool: &SqlitePool, username: &str, role_ids: &[i64], active: bool) -> Result<i64> {
    insert_user_with_password(pool, username, role_ids, active, "").await
}

pub async fn insert_user_with_password(
    pool: &SqlitePool,
    username: &str,
    role_ids: &[i64],
    active: bool,
    password_hash: &str,
) -> Result<i64> {
    let id = sqlx::query("INSERT INTO users (username, display_name, password_hash, active) VALUES (?, ?, ?, ?)")
        .bind(username)
        .bind(username.to_uppercase())
        .bind(password_hash)
        .bind(active)
        .execute(pool)
        .await?
        .last_insert_rowid();

    for role_id in role_ids {
        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES (?, ?)")
            .bind(id)
            .bind(role_id)
            .execute(pool)
            .await?;
    }
    Ok(id)
}

pub async fn grant(pool: &SqlitePool, role_id: i64, action: &str, value: &str) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO permissions (role_id, action, value) VALUES (?, ?, ?)")
        .bind(role_id)
        .bind(action)
        .bind(value)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn insert_post(pool: &SqlitePool, user_id: i64) -> Result<i64> {
    let id = sqlx::query("INSERT INTO posts (user_id, name, content) VALUES (?, 'hello', 'world')")
        .bind(user_id)
        .execute(pool)
        .await?
        .last_insert_rowid();
    Ok(id)
}

/// A `Cookie` header value carrying a signed session for the given user.
pub fn session_cookie(user_id: i64, role_ids: &[i64], active: bool) -> Result<String> {
    let user = User {
        id: user_id,
        username: format!("user{user_id}"),
        active,
        roles: role_ids
            .iter()
            .map(|id| Role {
                id: *id,
                name: format!("role{id}"),
                description: None,
                root: false,
            })
            .collect(),
        ..User::default()
    };

    let config = session();
    let token = config.encode(&user, Utc::now() + Duration::days(1))?;
    Ok(format!("{}={}", config.cookie_name, token))
}

pub fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<serde_json::Value>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };
    Ok(req)
}

pub async fn send(app: &Router, req: Request<Body>) -> Result<Response> {
    Ok(app.clone().oneshot(req).await?)
}

pub async fn body_text(resp: Response) -> Result<String> {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

pub fn location(resp: &Response) -> Option<&str> {
    resp.headers().get(header::LOCATION).and_then(|value| value.to_str().ok())
}

/// Every `Set-Cookie` header starting with `name=`.
pub fn set_cookies<'a>(resp: &'a Response, name: &str) -> Vec<&'a str> {
    let prefix = format!("{name}=");
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter(|value| value.starts_with(&prefix))
        .collect()
}
