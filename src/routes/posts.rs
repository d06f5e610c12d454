use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::app::AppState;
use crate::authz::{CurrentUser, Prepared};
use crate::errors::{AppError, AppResult};
use crate::models::content::{Post, PostMutation};

/// The post loaded by the authorization check; absent on `new` routes.
fn prepared_post(prepared: Option<Extension<Prepared>>) -> Option<Post> {
    prepared.and_then(|Extension(prepared)| prepared.as_post().cloned())
}

pub async fn list_posts(State(state): State<AppState>, current: CurrentUser) -> AppResult<Json<Vec<Post>>> {
    let posts = state.repos.posts.posts_by_user(current.user().id).await?;
    Ok(Json(posts))
}

pub async fn view_post(prepared: Option<Extension<Prepared>>) -> AppResult<Json<Post>> {
    prepared_post(prepared)
        .map(Json)
        .ok_or_else(|| AppError::not_found("post not found"))
}

/// The edit form data: the stored post, or a blank one for `new`.
pub async fn compose_post(current: CurrentUser, prepared: Option<Extension<Prepared>>) -> Json<Post> {
    Json(prepared_post(prepared).unwrap_or_else(|| Post {
        id: 0,
        user_id: current.user().id,
        name: String::new(),
        content: String::new(),
    }))
}

pub async fn save_post(
    State(state): State<AppState>,
    current: CurrentUser,
    prepared: Option<Extension<Prepared>>,
    Json(payload): Json<PostMutation>,
) -> AppResult<(StatusCode, Json<Post>)> {
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("name is required"));
    }

    match prepared_post(prepared) {
        Some(post) => {
            let post = state.repos.posts.update_post(post.id, &payload).await?;
            Ok((StatusCode::OK, Json(post)))
        }
        None => {
            let user = current.user();
            if user.is_anonymous() {
                return Err(AppError::unauthorized("sign in to create posts"));
            }
            let post = state.repos.posts.create_post(user.id, &payload).await?;
            tracing::info!(post_id = post.id, user_id = user.id, "post created");
            Ok((StatusCode::CREATED, Json(post)))
        }
    }
}

pub async fn delete_post(
    State(state): State<AppState>,
    prepared: Option<Extension<Prepared>>,
) -> AppResult<StatusCode> {
    let post = prepared_post(prepared).ok_or_else(|| AppError::not_found("post not found"))?;
    state.repos.posts.delete_post(post.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
