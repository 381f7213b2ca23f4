//! One account's connection lifecycle.
//!
//! Each account runs its own task: open, authenticate, read until the
//! transport drops, then reconnect on a bounded exponential schedule.
//! Heartbeat acks are sent inside the same handling turn as the probe
//! since the proxy measures liveness on that round trip.

use crate::error::{WsError, WsResult};
use crate::events::EventHub;
use crate::message::{parse_inbound, Authenticate, HeartbeatAck, Inbound};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tape_core::{AccountId, RetrySchedule};
use tokio::sync::watch;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Connection tunables.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Proxy base, e.g. `wss://proxy.example.com`.
    pub base_url: String,
    /// Broker path segment, e.g. `tradovate`.
    pub broker: String,
    pub max_reconnect_attempts: u32,
    pub reconnect_base_delay: Duration,
    pub reconnect_max_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            broker: "tradovate".to_string(),
            max_reconnect_attempts: 5,
            reconnect_base_delay: Duration::from_millis(1000),
            reconnect_max_delay: Duration::from_secs(30),
        }
    }
}

impl ConnectionConfig {
    pub fn reconnect_schedule(&self) -> RetrySchedule {
        RetrySchedule::exponential(
            self.max_reconnect_attempts,
            self.reconnect_base_delay,
            self.reconnect_max_delay,
        )
    }

    fn account_url(&self, account_id: &AccountId, token: &str) -> String {
        format!(
            "{}/ws/{}/{}/?token={}",
            self.base_url.trim_end_matches('/'),
            self.broker,
            account_id,
            token
        )
    }
}

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
    /// Reconnection budget spent; no further retries.
    Error,
}

/// Bookkeeping published by the connection task.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionInfo {
    pub status: ConnectionStatus,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
    pub reconnect_attempt: u32,
}

impl ConnectionInfo {
    fn initial() -> Self {
        Self {
            status: ConnectionStatus::Connecting,
            last_heartbeat_at: None,
            reconnect_attempt: 0,
        }
    }
}

/// Handle owned by the registry.
pub struct AccountConnection {
    pub info_rx: watch::Receiver<ConnectionInfo>,
    pub cancel: CancellationToken,
}

impl AccountConnection {
    pub fn status(&self) -> ConnectionStatus {
        self.info_rx.borrow().status
    }

    /// Whether the task is still trying (or managing) a transport.
    pub fn is_live(&self) -> bool {
        !matches!(
            self.status(),
            ConnectionStatus::Disconnected | ConnectionStatus::Error
        )
    }
}

/// Spawn the connection task for one account.
pub fn spawn_connection(
    account_id: AccountId,
    token: String,
    config: ConnectionConfig,
    hub: EventHub,
) -> AccountConnection {
    let (info_tx, info_rx) = watch::channel(ConnectionInfo::initial());
    let cancel = CancellationToken::new();
    let url = config.account_url(&account_id, &token);

    let worker = ConnectionWorker {
        account_id,
        url,
        schedule: config.reconnect_schedule(),
        hub,
        info_tx,
        cancel: cancel.clone(),
    };
    tokio::spawn(worker.run());

    AccountConnection { info_rx, cancel }
}

struct ConnectionWorker {
    account_id: AccountId,
    url: String,
    schedule: RetrySchedule,
    hub: EventHub,
    info_tx: watch::Sender<ConnectionInfo>,
    cancel: CancellationToken,
}

impl ConnectionWorker {
    async fn run(mut self) {
        let mut attempt = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                self.set_status(ConnectionStatus::Disconnected);
                return;
            }

            match self.run_session(&mut attempt).await {
                Ok(()) => {
                    info!(account = %self.account_id, "connection closed");
                    self.set_status(ConnectionStatus::Disconnected);
                    return;
                }
                Err(e) => {
                    error!(account = %self.account_id, %e, "connection error");
                }
            }

            if self.cancel.is_cancelled() {
                self.set_status(ConnectionStatus::Disconnected);
                return;
            }

            attempt += 1;
            self.update(|info| info.reconnect_attempt = attempt);

            if self.schedule.is_exhausted(attempt) {
                let terminal = WsError::ReconnectExhausted { attempts: attempt };
                error!(account = %self.account_id, %terminal, "giving up");
                self.set_status(ConnectionStatus::Error);
                return;
            }

            self.set_status(ConnectionStatus::Reconnecting);
            let delay = self.schedule.delay_for(attempt);
            warn!(
                account = %self.account_id,
                attempt,
                delay_ms = delay.as_millis(),
                "reconnecting"
            );

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.cancel.cancelled() => {
                    self.set_status(ConnectionStatus::Disconnected);
                    return;
                }
            }
        }
    }

    /// One transport session: open, authenticate, read.
    ///
    /// Returns Ok only on a cancel-requested close; every unplanned
    /// end is an error so the retry loop engages.
    async fn run_session(&mut self, attempt: &mut u32) -> WsResult<()> {
        self.set_status(ConnectionStatus::Connecting);
        debug!(account = %self.account_id, "opening socket");

        let (ws_stream, _response) = connect_async(&self.url).await?;
        let (mut write, mut read) = ws_stream.split();

        // Authenticate before anything else flows
        let auth = serde_json::to_string(&Authenticate::new(&self.account_id))?;
        write.send(Message::Text(auth)).await?;

        self.set_status(ConnectionStatus::Connected);
        // Counter resets only once a session is actually established
        *attempt = 0;
        self.update(|info| info.reconnect_attempt = 0);
        info!(account = %self.account_id, "connected");

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        // Close-time errors are tolerated; we are leaving anyway
                        debug!(account = %self.account_id, %e, "close frame failed");
                    }
                    return Ok(());
                }

                frame = read.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(ack) = self.handle_text(&text) {
                                // Ack in the same turn; the proxy
                                // measures liveness on this round trip
                                let payload = serde_json::to_string(&ack)?;
                                write.send(Message::Text(payload)).await?;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, String::new()));
                            warn!(account = %self.account_id, code, %reason, "closed by server");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Err(e)) => {
                            return Err(e.into());
                        }
                        None => {
                            return Err(WsError::ConnectionClosed {
                                code: 1006,
                                reason: "stream ended".to_string(),
                            });
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    /// Parse and dispatch one text frame. Returns the ack to send when
    /// the frame was a heartbeat.
    fn handle_text(&self, text: &str) -> Option<HeartbeatAck> {
        let now = Utc::now();
        match parse_inbound(text) {
            Ok(Inbound::Heartbeat {
                sequence,
                timestamp,
            }) => {
                self.update(|info| info.last_heartbeat_at = Some(now));
                Some(HeartbeatAck::new(
                    sequence,
                    timestamp,
                    self.account_id.clone(),
                    now,
                ))
            }
            Ok(inbound) => {
                self.hub.publish(&self.account_id, inbound, now);
                None
            }
            Err(e) => {
                warn!(account = %self.account_id, %e, "unparseable frame dropped");
                None
            }
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.update(|info| info.status = status);
    }

    fn update(&self, mutate: impl FnOnce(&mut ConnectionInfo)) {
        self.info_tx.send_modify(mutate);
    }
}
