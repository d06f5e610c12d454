use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::app::AppState;
use crate::authz::{CurrentUser, Prepared};
use crate::errors::{AppError, AppResult};
use crate::models::content::{File, FileUpload};

pub async fn list_files(State(state): State<AppState>, current: CurrentUser) -> AppResult<Json<Vec<File>>> {
    let files = state.repos.files.files_by_user(current.user().id).await?;
    Ok(Json(files))
}

/// Records an uploaded file. Storage drivers live elsewhere; this only
/// keeps the path and content type against the uploading user.
pub async fn upload_file(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<FileUpload>,
) -> AppResult<(StatusCode, Json<File>)> {
    if payload.path.trim().is_empty() {
        return Err(AppError::bad_request("path is required"));
    }

    let user = current.user();
    if user.is_anonymous() {
        return Err(AppError::unauthorized("sign in to upload files"));
    }

    let file = state.repos.files.create_file(user.id, &payload).await?;
    Ok((StatusCode::CREATED, Json(file)))
}

pub async fn delete_file(
    State(state): State<AppState>,
    prepared: Option<Extension<Prepared>>,
) -> AppResult<StatusCode> {
    let file = prepared
        .and_then(|Extension(prepared)| prepared.as_file().cloned())
        .ok_or_else(|| AppError::not_found("file not found"))?;
    state.repos.files.delete_file(file.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
