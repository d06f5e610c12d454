use axum::extract::{Path, State};
use axum::Json;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::models::user::Profile;

pub async fn profile(State(state): State<AppState>, Path(username): Path<String>) -> AppResult<Json<Profile>> {
    let user = state.repos.users.by_username(&username).await?;
    Ok(Json(Profile::from(&user)))
}
