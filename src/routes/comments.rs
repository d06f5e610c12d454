use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::app::AppState;
use crate::authz::{CurrentUser, Prepared};
use crate::errors::{AppError, AppResult};
use crate::models::content::{Comment, CommentMutation};

fn prepared_comment(prepared: Option<Extension<Prepared>>) -> Option<Comment> {
    prepared.and_then(|Extension(prepared)| prepared.as_comment().cloned())
}

pub async fn list_comments(State(state): State<AppState>, current: CurrentUser) -> AppResult<Json<Vec<Comment>>> {
    let comments = state.repos.comments.comments_by_user(current.user().id).await?;
    Ok(Json(comments))
}

pub async fn save_comment(
    State(state): State<AppState>,
    current: CurrentUser,
    prepared: Option<Extension<Prepared>>,
    Json(payload): Json<CommentMutation>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    if payload.content.trim().is_empty() {
        return Err(AppError::bad_request("content is required"));
    }

    if let Some(comment) = prepared_comment(prepared) {
        let comment = state.repos.comments.update_comment(comment.id, &payload).await?;
        return Ok((StatusCode::OK, Json(comment)));
    }

    let user = current.user();
    if user.is_anonymous() {
        return Err(AppError::unauthorized("sign in to comment"));
    }

    // the post must exist before anything can be attached to it
    state.repos.posts.post_by_id(payload.post_id).await?;
    let comment = state.repos.comments.create_comment(user.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    prepared: Option<Extension<Prepared>>,
) -> AppResult<StatusCode> {
    let comment = prepared_comment(prepared).ok_or_else(|| AppError::not_found("comment not found"))?;
    state.repos.comments.delete_comment(comment.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
