use axum::extract::{MatchedPath, RawPathParams, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use super::cache::PermissionSnapshot;
use super::identity::CurrentUser;
use super::prepare::{AuthRequest, ResourceTarget};
use super::registry::AuthConfig;
use crate::app::AppState;
use crate::errors::AppResult;
use crate::models::role::PermissionValue;
use crate::repositories::Repositories;

pub const FORBIDDEN_MESSAGE: &str = "Insufficient permission";
pub const NOT_FOUND_MESSAGE: &str = "Not found";
pub const INACTIVE_PATH: &str = "/inactive";

/// Outcome of authorizing one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    NotFound,
    /// Signed-in account that has been deactivated.
    Inactive,
    /// Anonymous and denied.
    Login,
    Forbidden,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::NotFound => "not_found",
            Decision::Inactive => "inactive",
            Decision::Login => "login",
            Decision::Forbidden => "forbidden",
        }
    }
}

/// Decides one request. The order of the steps matters:
///
/// 1. no config: the action is public
/// 2. Prepare; a missing resource is a 404 for everyone, root included
/// 3. root roles pass
/// 4. signed-in but inactive users are stopped before any role is consulted
/// 5. roles are tried in order, first `all` or passing `own` wins; `none`
///    and failed ownership checks fall through to the next role
/// 6. nobody granted: anonymous users are sent to log in, others get 403
///
/// Prepare errors other than not-found are returned as-is.
pub async fn authorize(
    config: Option<&AuthConfig>,
    request: &mut AuthRequest,
    snapshot: &PermissionSnapshot,
    repos: &Repositories,
) -> AppResult<Decision> {
    let Some(config) = config else {
        return Ok(Decision::Allow);
    };

    if let Some(preparer) = &config.prepare {
        if let Err(err) = preparer.prepare(request, repos).await {
            if err.is_not_found() {
                return Ok(Decision::NotFound);
            }
            tracing::error!(action = %config.action, preparer = preparer.name(), error = %err, "prepare failed");
            return Err(err);
        }
    }

    let user = &request.user;
    if user.is_root() {
        return Ok(Decision::Allow);
    }

    if !user.is_anonymous() && !user.active {
        return Ok(Decision::Inactive);
    }

    for role in &user.roles {
        match snapshot.permission_for(role.id, &config.action) {
            PermissionValue::All => return Ok(Decision::Allow),
            PermissionValue::Own => {
                if let Some(own_check) = &config.own_check {
                    if own_check.is_owner(request) {
                        return Ok(Decision::Allow);
                    }
                }
            }
            PermissionValue::None => {}
        }
    }

    if user.is_anonymous() {
        Ok(Decision::Login)
    } else {
        Ok(Decision::Forbidden)
    }
}

/// Middleware: authorizes the matched route against its bound action.
pub async fn check(
    State(state): State<AppState>,
    matched: Option<MatchedPath>,
    params: Option<RawPathParams>,
    current: CurrentUser,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let action = matched
        .as_ref()
        .and_then(|path| state.registry.action_for(req.method(), path.as_str()));
    let config = action.and_then(|action| state.registry.lookup(action));

    let Some(config) = config else {
        return next.run(req).await;
    };

    let id_param = params
        .as_ref()
        .and_then(|params| params.iter().find(|(key, _)| *key == "id").map(|(_, value)| value));
    let mut request = AuthRequest::new(current.0.clone(), ResourceTarget::from_param(id_param));

    // a single snapshot per request, so every role sees the same generation
    let snapshot = state.permissions.snapshot();
    let decision = match authorize(Some(config), &mut request, &snapshot, &state.repos).await {
        Ok(decision) => decision,
        Err(err) => return err.into_response(),
    };

    tracing::debug!(
        user_id = request.user.id,
        action = %config.action,
        decision = decision.as_str(),
        "authorization decision"
    );

    match decision {
        Decision::Allow => {
            if let Some(resource) = request.resource {
                req.extensions_mut().insert(resource);
            }
            next.run(req).await
        }
        Decision::NotFound => (StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE).into_response(),
        Decision::Inactive => {
            let jar = jar.add(state.session.logout_cookie());
            (jar, found(INACTIVE_PATH)).into_response()
        }
        Decision::Login => {
            let back = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or_else(|| req.uri().path());
            found(&login_location(back)).into_response()
        }
        Decision::Forbidden => (StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE).into_response(),
    }
}

pub fn login_location(back: &str) -> String {
    format!("/login?back={}", urlencoding::encode(back))
}

/// A plain 302 redirect.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::authz::cache::PermissionCache;
    use crate::authz::ownership::{AllowLoggedInUser, PostOwnerCheck};
    use crate::authz::prepare::PostPreparer;
    use crate::authz::{guest_user, roles};
    use crate::models::role::Role;
    use crate::models::user::User;
    use crate::repositories::memory::MemoryRepository;

    struct Fixture {
        memory: Arc<MemoryRepository>,
        cache: PermissionCache,
    }

    impl Fixture {
        async fn new() -> Self {
            let memory = MemoryRepository::new();
            memory.add_role(roles::ADMIN_ID, "Admin", true);
            memory.add_role(roles::USER_ID, "User", false);
            memory.add_role(roles::GUEST_ID, "Guest", false);
            memory.add_role(4, "Editor", false);
            memory.add_post(1, 10);

            let cache = PermissionCache::new(memory.clone());
            cache.rebuild().await.unwrap();
            Self { memory, cache }
        }

        async fn grant(&self, role_id: i64, action: &str, value: PermissionValue) {
            self.memory.set_permission(role_id, action, value);
            self.cache.rebuild().await.unwrap();
        }

        fn user(&self, id: i64, role_ids: &[i64], active: bool) -> Arc<User> {
            let user = User {
                id,
                username: format!("user{id}"),
                role_ids: role_ids.to_vec(),
                active,
                ..User::default()
            };
            let roles: Vec<Role> = role_ids
                .iter()
                .flat_map(|id| self.cache.roles_by_ids(&[*id]))
                .collect();
            Arc::new(user.with_roles(roles))
        }

        async fn decide(&self, config: &AuthConfig, user: Arc<User>, target: ResourceTarget) -> AppResult<Decision> {
            let mut request = AuthRequest::new(user, target);
            let snapshot = self.cache.snapshot();
            authorize(Some(config), &mut request, &snapshot, &self.memory.repositories()).await
        }
    }

    fn post_save() -> AuthConfig {
        AuthConfig::new("post.save", PermissionValue::Own)
            .with_prepare(PostPreparer)
            .with_own_check(PostOwnerCheck)
    }

    #[tokio::test]
    async fn unregistered_action_is_public() {
        let fx = Fixture::new().await;
        let mut request = AuthRequest::new(Arc::new(guest_user()), ResourceTarget::None);
        let decision = authorize(None, &mut request, &fx.cache.snapshot(), &fx.memory.repositories())
            .await
            .unwrap();
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn missing_resource_is_not_found_even_for_root() {
        let fx = Fixture::new().await;
        let admin = fx.user(1, &[roles::ADMIN_ID], true);
        let decision = fx.decide(&post_save(), admin, ResourceTarget::Id(99)).await.unwrap();
        assert_eq!(decision, Decision::NotFound);
    }

    #[tokio::test]
    async fn root_bypasses_permissions() {
        let fx = Fixture::new().await;
        let admin = fx.user(1, &[roles::ADMIN_ID], true);
        let config = AuthConfig::new("manage", PermissionValue::None);
        assert_eq!(fx.decide(&config, admin.clone(), ResourceTarget::None).await.unwrap(), Decision::Allow);

        // root wins over the inactive flag too
        let inactive_admin = fx.user(2, &[roles::ADMIN_ID], false);
        assert_eq!(fx.decide(&config, inactive_admin, ResourceTarget::None).await.unwrap(), Decision::Allow);
    }

    #[tokio::test]
    async fn inactive_user_is_intercepted() {
        let fx = Fixture::new().await;
        fx.grant(roles::USER_ID, "post.save", PermissionValue::All).await;
        let user = fx.user(10, &[roles::USER_ID], false);

        let decision = fx.decide(&post_save(), user, ResourceTarget::Id(1)).await.unwrap();
        assert_eq!(decision, Decision::Inactive);
    }

    #[tokio::test]
    async fn none_does_not_short_circuit_later_roles() {
        let fx = Fixture::new().await;
        fx.grant(roles::USER_ID, "post.list", PermissionValue::None).await;
        fx.grant(4, "post.list", PermissionValue::All).await;
        let config = AuthConfig::new("post.list", PermissionValue::None);

        let user = fx.user(11, &[roles::USER_ID, 4], true);
        assert_eq!(fx.decide(&config, user, ResourceTarget::None).await.unwrap(), Decision::Allow);
    }

    #[tokio::test]
    async fn own_requires_ownership_check() {
        let fx = Fixture::new().await;
        fx.grant(roles::USER_ID, "post.save", PermissionValue::Own).await;

        let owner = fx.user(10, &[roles::USER_ID], true);
        let other = fx.user(12, &[roles::USER_ID], true);
        assert_eq!(fx.decide(&post_save(), owner.clone(), ResourceTarget::Id(1)).await.unwrap(), Decision::Allow);
        assert_eq!(fx.decide(&post_save(), other, ResourceTarget::Id(1)).await.unwrap(), Decision::Forbidden);

        // own with no check configured never grants
        let unchecked = AuthConfig::new("post.save", PermissionValue::Own).with_prepare(PostPreparer);
        assert_eq!(fx.decide(&unchecked, owner, ResourceTarget::Id(1)).await.unwrap(), Decision::Forbidden);
    }

    #[tokio::test]
    async fn failed_ownership_falls_through_to_next_role() {
        let fx = Fixture::new().await;
        fx.grant(roles::USER_ID, "post.save", PermissionValue::Own).await;
        fx.grant(4, "post.save", PermissionValue::All).await;

        let editor = fx.user(12, &[roles::USER_ID, 4], true);
        assert_eq!(fx.decide(&post_save(), editor, ResourceTarget::Id(1)).await.unwrap(), Decision::Allow);
    }

    #[tokio::test]
    async fn new_resource_is_gated_by_value_only() {
        let fx = Fixture::new().await;
        fx.grant(roles::USER_ID, "post.save", PermissionValue::Own).await;
        let user = fx.user(12, &[roles::USER_ID], true);
        assert_eq!(fx.decide(&post_save(), user, ResourceTarget::New).await.unwrap(), Decision::Allow);
    }

    #[tokio::test]
    async fn anonymous_denial_asks_for_login() {
        let fx = Fixture::new().await;
        fx.grant(roles::GUEST_ID, "comment.save", PermissionValue::Own).await;
        let config = AuthConfig::new("comment.save", PermissionValue::Own).with_own_check(AllowLoggedInUser);

        let guest = Arc::new(guest_user());
        assert_eq!(fx.decide(&config, guest, ResourceTarget::None).await.unwrap(), Decision::Login);
    }

    #[tokio::test]
    async fn user_without_roles_is_forbidden() {
        let fx = Fixture::new().await;
        let config = AuthConfig::new("post.list", PermissionValue::All);
        let user = fx.user(20, &[77], true);
        assert_eq!(fx.decide(&config, user, ResourceTarget::None).await.unwrap(), Decision::Forbidden);
    }

    #[tokio::test]
    async fn storage_errors_in_prepare_propagate() {
        let fx = Fixture::new().await;
        #[derive(Debug)]
        struct Broken;

        #[async_trait::async_trait]
        impl crate::authz::prepare::ResourcePreparer for Broken {
            fn name(&self) -> &'static str {
                "broken"
            }

            async fn prepare(&self, _request: &mut AuthRequest, _repos: &Repositories) -> AppResult<()> {
                Err(crate::errors::AppError::internal("disk on fire"))
            }
        }

        let config = AuthConfig::new("post.view", PermissionValue::All).with_prepare(Broken);
        let admin = fx.user(1, &[roles::ADMIN_ID], true);
        assert!(fx.decide(&config, admin, ResourceTarget::Id(1)).await.is_err());
    }

    #[test]
    fn login_location_encodes_the_path() {
        assert_eq!(login_location("/posts/1"), "/login?back=%2Fposts%2F1");
        assert_eq!(login_location("/posts?page=2"), "/login?back=%2Fposts%3Fpage%3D2");
    }
}
