use std::sync::Arc;

use axum::extract::{Request, State};
use axum::handler::Handler;
use axum::http::Method;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;
use axum_extra::extract::cookie::CookieJar;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{assign_user, check, ActionRegistry, ActionRegistryBuilder, AuthConfig, PermissionCache};
use crate::docs;
use crate::errors::{AppError, AppResult};
use crate::repositories::Repositories;
use crate::session::{SessionConfig, VISITOR_COOKIE_NAME};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub repos: Repositories,
    pub session: Arc<SessionConfig>,
    pub permissions: Arc<PermissionCache>,
    pub registry: Arc<ActionRegistry>,
}

/// Routes together with the actions that guard them.
///
/// Registration happens on one thread while the application is built; the
/// action registry is sealed before the first request is served.
pub struct RouteTable {
    router: Router<AppState>,
    registry: ActionRegistryBuilder,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            registry: ActionRegistryBuilder::new(),
        }
    }

    /// Adds a route that no action guards.
    pub fn public(mut self, path: &str, handler: MethodRouter<AppState>) -> Self {
        self.router = self.router.route(path, handler);
        self
    }

    /// Registers `config` and binds `method path` to its action. Fails if the
    /// action was already registered.
    pub fn guarded<H, T>(mut self, method: Method, path: &str, handler: H, config: AuthConfig) -> AppResult<Self>
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        let filter = MethodFilter::try_from(method.clone())
            .map_err(|_| AppError::configuration(format!("unsupported method {method} for {path}")))?;

        let config = self.registry.register(config)?;
        self.registry.bind_route(method, path, &config.action)?;
        self.router = self.router.route(path, on(filter, handler));
        Ok(self)
    }

    /// Seals the registry without building a router.
    pub fn into_registry(self) -> ActionRegistry {
        self.registry.build()
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the application from a route table (normally `routes::table()`).
/// The permission cache is loaded before the router is returned.
pub async fn create_app_with(pool: SqlitePool, session: SessionConfig, table: RouteTable) -> Result<Router, AppError> {
    let repos = Repositories::sqlite(pool.clone());
    let permissions = Arc::new(PermissionCache::new(Arc::clone(&repos.roles)));
    permissions.rebuild().await?;

    let state = AppState {
        pool,
        repos,
        session: Arc::new(session),
        permissions,
        registry: Arc::new(table.registry.build()),
    };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    // route layers run outermost-last: identity first, then the check
    let router = table
        .router
        .route_layer(middleware::from_fn_with_state(state.clone(), check))
        .route_layer(middleware::from_fn_with_state(state.clone(), assign_user))
        .layer(middleware::from_fn_with_state(state.clone(), ensure_visitor))
        .with_state(state)
        .merge(docs::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}

/// Issues a random visitor id cookie to browsers that have none.
async fn ensure_visitor(State(state): State<AppState>, jar: CookieJar, req: Request, next: Next) -> Response {
    if jar.get(VISITOR_COOKIE_NAME).is_some() {
        return next.run(req).await;
    }

    let response = next.run(req).await;
    let jar = jar.add(state.session.visitor_cookie(uuid::Uuid::new_v4().to_string()));
    (jar, response).into_response()
}
