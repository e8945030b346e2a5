use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

// Export modules
pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;

pub use api::auth::{AuthApi, AuthResponse};
pub use auth::guards::{
    check_route, require_auth, require_guest, AccessPolicy, GuardOutcome, Route,
};
pub use auth::session::{SessionEvent, SessionSnapshot, SessionState, User};
pub use auth::storage::SessionStorage;
pub use auth::store::SessionStore;
pub use config::{Config, ConfigManager};
pub use error::{AuthError, ErrorCode};

use api::http::ReqwestHttpClient;

/// Fully wired client application state.
///
/// Owns the one session store for the process and hands it out by `Arc`;
/// components receive it explicitly instead of reaching for a global.
pub struct App {
    /// Loaded configuration
    pub config: Config,
    /// The session store shared with every consumer
    pub session: Arc<SessionStore>,
}

impl App {
    /// Construct the session layer from configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.request_timeout_seconds))
            .build()?;
        let http = Arc::new(ReqwestHttpClient::with_client(client));
        let api = Arc::new(AuthApi::with_http_client(config.api.base_url.as_str(), http));
        let storage = Arc::new(SessionStorage::new(&config.storage.data_dir));
        let session = Arc::new(SessionStore::new(api, storage));

        Ok(Self { config, session })
    }
}
