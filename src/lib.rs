pub mod app;
pub mod authz;
pub mod config;
pub mod db;
pub mod docs;
pub mod errors;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod session;
pub mod setup;
pub mod utils;

// Re-export commonly used items for tests
pub use app::{create_app_with, AppState, RouteTable};
