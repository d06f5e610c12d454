//! First-run provisioning used by the `cli` binary.

use crate::authz::{roles, ActionRegistry};
use crate::errors::{AppError, AppResult};
use crate::models::user::User;
use crate::repositories::{Repositories, RoleRepository, UserRepository};
use crate::utils::hash_password;

/// Writes each registered action's default value for the User and Guest
/// roles where no permission row exists. Returns `(role_id, rows written)`.
pub async fn seed_default_permissions(
    store: &dyn RoleRepository,
    registry: &ActionRegistry,
) -> AppResult<Vec<(i64, u64)>> {
    let defaults = registry.default_values();
    let mut written = Vec::new();
    for role_id in [roles::USER_ID, roles::GUEST_ID] {
        written.push((role_id, store.seed_permissions(role_id, &defaults).await?));
    }
    Ok(written)
}

/// Creates an active local account with the Admin role.
pub async fn create_admin(users: &dyn UserRepository, username: &str, password: &str) -> AppResult<User> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::bad_request("username is required"));
    }

    let password_hash = hash_password(password)?;
    let user = users.create_local_user(username, &password_hash, &[roles::ADMIN_ID]).await?;
    tracing::info!(user_id = user.id, username = %user.username, "admin account created");
    Ok(user)
}

/// Seeds default permissions, then creates the first admin.
pub async fn run(repos: &Repositories, registry: &ActionRegistry, username: &str, password: &str) -> AppResult<User> {
    for (role_id, written) in seed_default_permissions(repos.roles.as_ref(), registry).await? {
        tracing::info!(role_id, written, "default permissions seeded");
    }
    create_admin(repos.users.as_ref(), username, password).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::memory::MemoryRepository;
    use crate::routes;
    use crate::utils::verify_password;

    #[tokio::test]
    async fn run_seeds_defaults_and_creates_admin() {
        let memory = MemoryRepository::new();
        let registry = routes::table().unwrap().into_registry();

        let admin = run(&memory.repositories(), &registry, "root", "password123").await.unwrap();
        assert_eq!(admin.role_ids, vec![roles::ADMIN_ID]);
        assert!(admin.active);

        let (_, hash) = memory.credentials("root").await.unwrap().unwrap();
        assert!(verify_password("password123", &hash).unwrap());

        // a second pass writes nothing new and refuses the same username
        let again = seed_default_permissions(&*memory, &registry).await.unwrap();
        assert!(again.iter().all(|(_, written)| *written == 0));
        assert!(matches!(
            create_admin(&*memory, "root", "password123").await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn blank_username_and_short_password_are_rejected() {
        let memory = MemoryRepository::new();
        assert!(matches!(create_admin(&*memory, "  ", "password123").await, Err(AppError::BadRequest(_))));
        assert!(matches!(create_admin(&*memory, "root", "short").await, Err(AppError::BadRequest(_))));
    }
}
