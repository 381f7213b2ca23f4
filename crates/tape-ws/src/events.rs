//! Typed republication of inbound frames.
//!
//! One broadcast channel per recognized message type plus a catch-all
//! for unknowns. Every republished event is stamped with the receipt
//! time so consumers can judge freshness themselves.

use crate::message::Inbound;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tape_core::AccountId;
use tokio::sync::broadcast;
use tracing::debug;

const CHANNEL_CAPACITY: usize = 256;

/// A payload frame with its origin and receipt time.
#[derive(Debug, Clone)]
pub struct SocketEvent {
    pub account_id: AccountId,
    pub received_at: DateTime<Utc>,
    pub payload: Value,
}

/// An unrecognized frame, preserved verbatim.
#[derive(Debug, Clone)]
pub struct UnknownEvent {
    pub account_id: AccountId,
    pub received_at: DateTime<Utc>,
    pub msg_type: String,
    pub raw: Value,
}

/// Fan-out hub shared by all account connections.
#[derive(Debug, Clone)]
pub struct EventHub {
    account_updates: broadcast::Sender<SocketEvent>,
    market_data: broadcast::Sender<SocketEvent>,
    position_updates: broadcast::Sender<SocketEvent>,
    unknown: broadcast::Sender<UnknownEvent>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            account_updates: broadcast::channel(CHANNEL_CAPACITY).0,
            market_data: broadcast::channel(CHANNEL_CAPACITY).0,
            position_updates: broadcast::channel(CHANNEL_CAPACITY).0,
            unknown: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    pub fn account_updates(&self) -> broadcast::Receiver<SocketEvent> {
        self.account_updates.subscribe()
    }

    pub fn market_data(&self) -> broadcast::Receiver<SocketEvent> {
        self.market_data.subscribe()
    }

    pub fn position_updates(&self) -> broadcast::Receiver<SocketEvent> {
        self.position_updates.subscribe()
    }

    pub fn unknown(&self) -> broadcast::Receiver<UnknownEvent> {
        self.unknown.subscribe()
    }

    /// Route a parsed frame to its stream. Heartbeats are transport
    /// concerns and never reach the hub; send errors just mean no
    /// subscriber is listening.
    pub fn publish(&self, account_id: &AccountId, inbound: Inbound, received_at: DateTime<Utc>) {
        let event = |payload| SocketEvent {
            account_id: account_id.clone(),
            received_at,
            payload,
        };
        match inbound {
            Inbound::Heartbeat { .. } => {}
            Inbound::AccountUpdate(payload) => {
                let _ = self.account_updates.send(event(payload));
            }
            Inbound::MarketData(payload) => {
                let _ = self.market_data.send(event(payload));
            }
            Inbound::PositionUpdate(payload) => {
                let _ = self.position_updates.send(event(payload));
            }
            Inbound::Unknown { msg_type, raw } => {
                debug!(%account_id, msg_type, "republishing unknown frame");
                let _ = self.unknown.send(UnknownEvent {
                    account_id: account_id.clone(),
                    received_at,
                    msg_type,
                    raw,
                });
            }
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
