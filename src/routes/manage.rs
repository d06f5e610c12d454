use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::authz::{roles, ResourceTarget};
use crate::errors::{AppError, AppResult};
use crate::models::role::{ActionValue, Role, RoleComposeView, RoleMutation};

#[derive(Debug, Serialize, ToSchema)]
pub struct ManageSummary {
    pub roles: usize,
    pub actions: usize,
}

fn role_id(raw: &str) -> AppResult<Option<i64>> {
    match ResourceTarget::from_param(Some(raw)) {
        ResourceTarget::New => Ok(None),
        ResourceTarget::Id(id) => Ok(Some(id)),
        _ => Err(AppError::not_found("role not found")),
    }
}

#[utoipa::path(
    get,
    path = "/manage",
    tag = "Manage",
    responses((status = 200, description = "Administration overview", body = ManageSummary))
)]
pub async fn dashboard(State(state): State<AppState>) -> Json<ManageSummary> {
    Json(ManageSummary {
        roles: state.permissions.snapshot().roles().len(),
        actions: state.registry.configs().len(),
    })
}

#[utoipa::path(
    get,
    path = "/manage/roles",
    tag = "Manage",
    responses((status = 200, description = "All roles", body = [Role]))
)]
pub async fn list_roles(State(state): State<AppState>) -> AppResult<Json<Vec<Role>>> {
    let roles = state.repos.roles.all_roles().await?;
    Ok(Json(roles))
}

/// One entry per registered action: the stored value, or the action's
/// default when the role has none.
#[utoipa::path(
    get,
    path = "/manage/roles/{id}",
    tag = "Manage",
    params(("id" = String, Path, description = "Role id, or `new`")),
    responses(
        (status = 200, description = "Role with its permission for every action", body = RoleComposeView),
        (status = 404, description = "Role not found")
    )
)]
pub async fn compose_role(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<RoleComposeView>> {
    let Some(id) = role_id(&id)? else {
        return Ok(Json(RoleComposeView {
            role: None,
            permissions: state.registry.default_values(),
        }));
    };

    // saves rebuild the cache before answering, so the snapshot is current
    let snapshot = state.permissions.snapshot();
    let role = snapshot
        .roles()
        .iter()
        .find(|role| role.id == id)
        .cloned()
        .ok_or_else(|| AppError::not_found("role not found"))?;
    let stored: HashMap<String, _> = snapshot
        .role_permissions(id)
        .permissions
        .into_iter()
        .map(|permission| (permission.action, permission.value))
        .collect();

    let permissions = state
        .registry
        .configs()
        .iter()
        .map(|config| ActionValue {
            action: config.action.clone(),
            value: stored.get(&config.action).copied().unwrap_or(config.default_value),
        })
        .collect();

    Ok(Json(RoleComposeView {
        role: Some(role),
        permissions,
    }))
}

/// Saves the role and, for non-root roles, its permission set. The
/// permission cache is rebuilt before answering; if that fails the save is
/// reported as failed.
#[utoipa::path(
    post,
    path = "/manage/roles/{id}",
    tag = "Manage",
    params(("id" = String, Path, description = "Role id, or `new`")),
    request_body = RoleMutation,
    responses(
        (status = 200, description = "Role saved", body = Role),
        (status = 400, description = "Invalid role data"),
        (status = 404, description = "Role not found"),
        (status = 500, description = "Role saved but permissions could not be reloaded")
    )
)]
pub async fn save_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RoleMutation>,
) -> AppResult<Json<Role>> {
    let id = role_id(&id)?;
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("role name is required"));
    }

    let role = state.repos.roles.save_role(id, &payload).await?;

    if !role.root {
        // actions nothing is registered for are dropped
        let permissions: Vec<ActionValue> = payload
            .permissions
            .iter()
            .filter(|permission| state.registry.lookup(&permission.action).is_some())
            .cloned()
            .collect();
        state.repos.roles.set_permissions(role.id, &permissions).await?;
    }

    state.permissions.rebuild().await?;
    tracing::info!(role_id = role.id, root = role.root, "role saved");

    Ok(Json(role))
}

#[utoipa::path(
    delete,
    path = "/manage/roles/{id}",
    tag = "Manage",
    params(("id" = String, Path, description = "Role id")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 400, description = "Seed roles cannot be deleted"),
        (status = 409, description = "Role is still assigned to users")
    )
)]
pub async fn delete_role(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<StatusCode> {
    let id = role_id(&id)?.ok_or_else(|| AppError::not_found("role not found"))?;
    if roles::is_seed(id) {
        return Err(AppError::bad_request("seed roles cannot be deleted"));
    }

    state.repos.roles.delete_role(id).await?;
    state.permissions.rebuild().await?;
    tracing::info!(role_id = id, "role deleted");

    Ok(StatusCode::NO_CONTENT)
}
