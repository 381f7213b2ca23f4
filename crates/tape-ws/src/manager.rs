//! Per-account connection registry.
//!
//! One socket per trading account, keyed by account id. Connect is
//! idempotent; disconnect cancels the task and clears every trace of
//! the account's bookkeeping.

use crate::connection::{
    spawn_connection, AccountConnection, ConnectionConfig, ConnectionInfo, ConnectionStatus,
};
use crate::error::{WsError, WsResult};
use crate::events::EventHub;
use dashmap::DashMap;
use tape_core::AccountId;
use tokio::sync::watch;
use tracing::{debug, info};

pub struct SocketManager {
    config: ConnectionConfig,
    hub: EventHub,
    connections: DashMap<AccountId, AccountConnection>,
}

impl SocketManager {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            hub: EventHub::new(),
            connections: DashMap::new(),
        }
    }

    /// Event streams shared by every connection.
    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    /// Open a connection for an account.
    ///
    /// Idempotent: a live connection (including one mid-reconnect) is
    /// left alone. A dead entry (disconnected or terminal error) is
    /// replaced with a fresh task.
    pub fn connect(&self, account_id: AccountId, token: String) {
        if let Some(existing) = self.connections.get(&account_id) {
            if existing.is_live() {
                debug!(account = %account_id, "already connected");
                return;
            }
        }

        info!(account = %account_id, "spawning connection");
        let connection = spawn_connection(
            account_id.clone(),
            token,
            self.config.clone(),
            self.hub.clone(),
        );
        self.connections.insert(account_id, connection);
    }

    /// Cancel an account's task and drop all its bookkeeping.
    pub fn disconnect(&self, account_id: &AccountId) {
        if let Some((_, connection)) = self.connections.remove(account_id) {
            info!(account = %account_id, "disconnecting");
            connection.cancel.cancel();
        }
    }

    /// Cancel every account's task.
    pub fn disconnect_all(&self) {
        for entry in self.connections.iter() {
            entry.value().cancel.cancel();
        }
        self.connections.clear();
    }

    pub fn status(&self, account_id: &AccountId) -> Option<ConnectionStatus> {
        self.connections.get(account_id).map(|c| c.status())
    }

    /// Bookkeeping watch for one account's connection.
    pub fn info(&self, account_id: &AccountId) -> WsResult<watch::Receiver<ConnectionInfo>> {
        self.connections
            .get(account_id)
            .map(|c| c.info_rx.clone())
            .ok_or_else(|| WsError::NotConnected(account_id.to_string()))
    }

    pub fn connected_accounts(&self) -> Vec<AccountId> {
        self.connections
            .iter()
            .filter(|entry| entry.value().status() == ConnectionStatus::Connected)
            .map(|entry| entry.key().clone())
            .collect()
    }
}
