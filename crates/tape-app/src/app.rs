//! Application wiring.
//!
//! Owns the shared broker state (positions, orders, live prices),
//! bridges socket events into it, and republishes the rebuilt overlay
//! on a watch channel whenever anything changes.

use crate::config::AppConfig;
use crate::error::AppResult;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::Arc;
use tape_chart::{ChartSurface, FrameTracker, TrackerConfig};
use tape_core::{ActiveAccount, Price, SymbolTable};
use tape_exec::{ActionDispatcher, BracketPlacement, DynOrderRouter, HttpOrderRouter};
use tape_overlay::{
    build_overlay, LivePrices, OrderRecord, OverlayLines, PositionRecord, PriceSample,
};
use tape_ws::{SocketEvent, SocketManager};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct PositionUpdatePayload {
    #[serde(default)]
    positions: Vec<PositionRecord>,
}

#[derive(Debug, Deserialize)]
struct AccountUpdatePayload {
    #[serde(default)]
    orders: Vec<OrderRecord>,
}

#[derive(Debug, Deserialize)]
struct MarketDataPayload {
    symbol: String,
    last: Price,
}

/// Mutable broker state shared between the event bridge and the
/// overlay rebuild.
#[derive(Default)]
struct BrokerState {
    positions: Vec<PositionRecord>,
    orders: Vec<OrderRecord>,
    prices: LivePrices,
}

pub struct Application {
    config: AppConfig,
    symbols: SymbolTable,
    router: DynOrderRouter,
    sockets: Arc<SocketManager>,
    dispatcher: Arc<ActionDispatcher>,
    state: Arc<RwLock<BrokerState>>,
    overlay_tx: watch::Sender<OverlayLines>,
    overlay_rx: watch::Receiver<OverlayLines>,
    shutdown: CancellationToken,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let symbols = config.symbol_table();
        let router: DynOrderRouter = Arc::new(HttpOrderRouter::new(&config.broker_api_url)?);
        let sockets = Arc::new(SocketManager::new(config.connection_config()));
        let dispatcher = Arc::new(ActionDispatcher::new(router.clone()));
        let (overlay_tx, overlay_rx) = watch::channel(OverlayLines::default());

        Ok(Self {
            config,
            symbols,
            router,
            sockets,
            dispatcher,
            state: Arc::new(RwLock::new(BrokerState::default())),
            overlay_tx,
            overlay_rx,
            shutdown: CancellationToken::new(),
        })
    }

    /// Confirmation gate for overlay-initiated actions.
    pub fn dispatcher(&self) -> Arc<ActionDispatcher> {
        self.dispatcher.clone()
    }

    /// Current overlay, recomputed on every state change.
    pub fn overlay(&self) -> watch::Receiver<OverlayLines> {
        self.overlay_rx.clone()
    }

    /// Accounts currently selected for trading.
    pub fn active_accounts(&self) -> Vec<ActiveAccount> {
        self.config.active_accounts()
    }

    /// A fresh bracket placement machine for the chart symbol.
    pub fn bracket_placement(&self) -> BracketPlacement {
        let profile = self.symbols.profile(&self.config.chart_symbol);
        BracketPlacement::new(profile, self.router.clone())
    }

    /// Start frame tracking against a chart surface. The tracker's
    /// last-close samples feed the overlay's price fallback chain.
    pub fn attach_surface(&self, surface: Arc<dyn ChartSurface>) -> FrameTracker {
        let tracker = FrameTracker::spawn(
            surface,
            TrackerConfig::default(),
            self.shutdown.child_token(),
        );

        let mut closes = tracker.last_closes();
        let state = self.state.clone();
        let rebuild = self.rebuild_fn();
        let cancel = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => return,
                    changed = closes.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        let close = *closes.borrow();
                        state.write().prices.chart_close = close.map(Price::from_f64);
                        rebuild();
                    }
                }
            }
        });

        tracker
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Connect active accounts and bridge socket events until
    /// shutdown.
    pub async fn run(&self) -> AppResult<()> {
        for account in &self.config.accounts {
            if account.active {
                self.sockets
                    .connect(account.id.clone().into(), account.token.clone());
            }
        }
        info!(
            accounts = self.config.active_accounts().len(),
            chart_symbol = %self.config.chart_symbol,
            "terminal running"
        );

        let mut positions = self.sockets.hub().position_updates();
        let mut account_updates = self.sockets.hub().account_updates();
        let mut market_data = self.sockets.hub().market_data();
        let mut unknown = self.sockets.hub().unknown();

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,

                event = positions.recv() => {
                    if let Ok(event) = event {
                        self.on_position_update(event);
                    }
                }

                event = account_updates.recv() => {
                    if let Ok(event) = event {
                        self.on_account_update(event);
                    }
                }

                event = market_data.recv() => {
                    if let Ok(event) = event {
                        self.on_market_data(event);
                    }
                }

                event = unknown.recv() => {
                    if let Ok(event) = event {
                        debug!(
                            account = %event.account_id,
                            msg_type = %event.msg_type,
                            "unhandled frame"
                        );
                    }
                }
            }
        }

        self.sockets.disconnect_all();
        info!("terminal stopped");
        Ok(())
    }

    fn on_position_update(&self, event: SocketEvent) {
        match serde_json::from_value::<PositionUpdatePayload>(event.payload) {
            Ok(payload) => {
                let account_id = event.account_id;
                let mut state = self.state.write();
                // Replace this account's slice of the position set
                state.positions.retain(|p| p.account_id != account_id);
                state.positions.extend(payload.positions);
                drop(state);
                self.rebuild();
            }
            Err(e) => warn!(%e, "malformed position update"),
        }
    }

    fn on_account_update(&self, event: SocketEvent) {
        match serde_json::from_value::<AccountUpdatePayload>(event.payload) {
            Ok(payload) => {
                let account_id = event.account_id;
                let mut state = self.state.write();
                state.orders.retain(|o| o.account_id != account_id);
                state.orders.extend(payload.orders);
                drop(state);
                self.rebuild();
            }
            Err(e) => warn!(%e, "malformed account update"),
        }
    }

    fn on_market_data(&self, event: SocketEvent) {
        match serde_json::from_value::<MarketDataPayload>(event.payload) {
            Ok(payload) => {
                if !tape_core::matches_chart(&payload.symbol, &self.config.chart_symbol) {
                    return;
                }
                self.state.write().prices.transport = Some(PriceSample {
                    price: payload.last,
                    received_at: event.received_at,
                });
                self.rebuild();
            }
            Err(e) => warn!(%e, "malformed market data"),
        }
    }

    fn rebuild(&self) {
        rebuild_overlay(
            &self.state,
            &self.overlay_tx,
            &self.config.chart_symbol,
            &self.symbols,
            Utc::now(),
        );
    }

    fn rebuild_fn(&self) -> impl Fn() + Send + 'static {
        let state = self.state.clone();
        let overlay_tx = self.overlay_tx.clone();
        let chart_symbol = self.config.chart_symbol.clone();
        let symbols = self.symbols.clone();
        move || rebuild_overlay(&state, &overlay_tx, &chart_symbol, &symbols, Utc::now())
    }
}

fn rebuild_overlay(
    state: &RwLock<BrokerState>,
    overlay_tx: &watch::Sender<OverlayLines>,
    chart_symbol: &str,
    symbols: &SymbolTable,
    now: DateTime<Utc>,
) {
    let state = state.read();
    let overlay = build_overlay(
        &state.positions,
        &state.orders,
        chart_symbol,
        &state.prices,
        symbols,
        now,
    );
    drop(state);
    if *overlay_tx.borrow() != overlay {
        let _ = overlay_tx.send(overlay);
    }
}
