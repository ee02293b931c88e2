use role_vault::RoleVault;
use std::sync::Arc;

use crate::models::config::ServerConfig;
use crate::services::session_manager::SessionManager;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    /// Reference confidential-value backend; also the recipient key registry.
    pub vault: RoleVault,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let vault = RoleVault::new();
        let sessions = SessionManager::new(
            Arc::new(vault.clone()),
            config.round_timeout(),
            config.event_channel_capacity,
        );
        AppState {
            sessions: Arc::new(sessions),
            vault,
            config: Arc::new(config),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
