use crate::errors::AppError;
use crate::session::SessionConfig;

pub const DEFAULT_PORT: u16 = 8000;

/// Process configuration read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let port = match std::env::var("APP_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|_| AppError::configuration(format!("APP_PORT is not a port number: {value}")))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            session: SessionConfig::from_env()?,
        })
    }
}

/// Loads `.env` from the working directory, falling back to the crate root.
pub fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}
