use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;

use super::ownership::OwnershipCheck;
use super::prepare::ResourcePreparer;
use crate::errors::{AppError, AppResult};
use crate::models::role::{ActionValue, PermissionValue};

/// Authorization settings for one action.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub action: String,
    /// Value offered for the action when an administrator composes a role,
    /// and written by `cli seed-permissions`.
    pub default_value: PermissionValue,
    pub prepare: Option<Arc<dyn ResourcePreparer>>,
    pub own_check: Option<Arc<dyn OwnershipCheck>>,
}

impl AuthConfig {
    pub fn new(action: impl Into<String>, default_value: PermissionValue) -> Self {
        Self {
            action: action.into(),
            default_value,
            prepare: None,
            own_check: None,
        }
    }

    pub fn with_prepare(mut self, preparer: impl ResourcePreparer + 'static) -> Self {
        self.prepare = Some(Arc::new(preparer));
        self
    }

    pub fn with_own_check(mut self, check: impl OwnershipCheck + 'static) -> Self {
        self.own_check = Some(Arc::new(check));
        self
    }

    pub fn default_action_value(&self) -> ActionValue {
        ActionValue {
            action: self.action.clone(),
            value: self.default_value,
        }
    }
}

type RouteKey = (Method, String);

/// Write phase of the registry. Lives only while routes are being
/// registered, on the thread building the application.
#[derive(Debug, Default)]
pub struct ActionRegistryBuilder {
    configs: Vec<Arc<AuthConfig>>,
    by_action: HashMap<String, Arc<AuthConfig>>,
    routes: HashMap<RouteKey, String>,
}

impl ActionRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a config. A second config for the same action is a
    /// programming error; the caller must abort startup on it.
    pub fn register(&mut self, config: AuthConfig) -> AppResult<Arc<AuthConfig>> {
        if self.by_action.contains_key(&config.action) {
            return Err(AppError::configuration(format!(
                "duplicate action config: {}",
                config.action
            )));
        }

        let config = Arc::new(config);
        self.by_action.insert(config.action.clone(), Arc::clone(&config));
        self.configs.push(Arc::clone(&config));
        Ok(config)
    }

    /// Binds a route (method + matched path pattern) to a registered action.
    pub fn bind_route(&mut self, method: Method, path: &str, action: &str) -> AppResult<()> {
        if !self.by_action.contains_key(action) {
            return Err(AppError::configuration(format!(
                "route {method} {path} bound to unregistered action {action}"
            )));
        }

        let key = (method, path.to_string());
        if let Some(existing) = self.routes.get(&key) {
            return Err(AppError::configuration(format!(
                "route {} {} already bound to {}",
                key.0, key.1, existing
            )));
        }

        self.routes.insert(key, action.to_string());
        Ok(())
    }

    pub fn build(self) -> ActionRegistry {
        tracing::debug!(actions = self.configs.len(), routes = self.routes.len(), "action registry sealed");
        ActionRegistry {
            configs: self.configs,
            by_action: self.by_action,
            routes: self.routes,
        }
    }
}

/// Read-only action table shared by every request.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    configs: Vec<Arc<AuthConfig>>,
    by_action: HashMap<String, Arc<AuthConfig>>,
    routes: HashMap<RouteKey, String>,
}

impl ActionRegistry {
    /// `None` means the action is public.
    pub fn lookup(&self, action: &str) -> Option<&Arc<AuthConfig>> {
        self.by_action.get(action)
    }

    pub fn action_for(&self, method: &Method, path: &str) -> Option<&str> {
        self.routes
            .get(&(method.clone(), path.to_string()))
            .map(String::as_str)
    }

    /// All configs in registration order.
    pub fn configs(&self) -> &[Arc<AuthConfig>] {
        &self.configs
    }

    pub fn default_values(&self) -> Vec<ActionValue> {
        self.configs.iter().map(|config| config.default_action_value()).collect()
    }
}
