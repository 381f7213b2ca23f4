//! Confirmation gate between overlay clicks and the broker.
//!
//! Holds at most one unconfirmed intent. A new request replaces the
//! old one; confirming takes the slot and executes exactly one broker
//! action. Execution errors are logged here and not re-thrown since
//! the initiating layer already reports the outcome once.

use crate::error::ExecResult;
use crate::intent::TradeIntent;
use crate::router::{BracketRequest, DynOrderRouter, ModifyRequest, OrderRequest};
use parking_lot::Mutex;
use tape_core::{OrderType, Price, Side, TimeInForce};
use tracing::{info, warn};
use uuid::Uuid;

/// The result the caller sees after a confirm.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    /// Intent executed and accepted by the broker.
    Executed,
    /// Intent executed and rejected; detail from the broker, verbatim.
    Failed(String),
    /// Nothing was pending.
    NothingPending,
}

pub struct ActionDispatcher {
    slot: Mutex<Option<TradeIntent>>,
    router: DynOrderRouter,
}

impl ActionDispatcher {
    pub fn new(router: DynOrderRouter) -> Self {
        Self {
            slot: Mutex::new(None),
            router,
        }
    }

    /// Stage an intent for confirmation. Last request wins; any prior
    /// unconfirmed intent is dropped.
    pub fn request_confirmation(&self, intent: TradeIntent) {
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.replace(intent) {
            info!(kind = previous.kind(), "replaced unconfirmed intent");
        }
    }

    /// Currently staged intent, if any.
    pub fn pending(&self) -> Option<TradeIntent> {
        self.slot.lock().clone()
    }

    /// Drop the staged intent without side effects.
    pub fn cancel(&self) {
        if self.slot.lock().take().is_some() {
            info!("pending intent cancelled");
        }
    }

    /// Execute the staged intent. The slot is cleared before the
    /// broker call so a failure never leaves a re-confirmable intent.
    pub async fn confirm(&self) -> ConfirmOutcome {
        let Some(intent) = self.slot.lock().take() else {
            return ConfirmOutcome::NothingPending;
        };

        let kind = intent.kind();
        let account = intent.account_id().clone();
        match self.execute(intent).await {
            Ok(()) => {
                info!(kind, %account, "trade action executed");
                ConfirmOutcome::Executed
            }
            Err(e) => {
                let detail = e.detail();
                warn!(kind, %account, %detail, "trade action failed");
                ConfirmOutcome::Failed(detail)
            }
        }
    }

    async fn execute(&self, intent: TradeIntent) -> ExecResult<()> {
        match intent {
            TradeIntent::ClosePosition {
                account_id,
                position_id,
                ..
            } => self.router.close_position(&account_id, &position_id).await,

            TradeIntent::ReversePosition {
                account_id,
                position_id,
                ..
            } => {
                self.router
                    .reverse_position(&account_id, &position_id)
                    .await
            }

            TradeIntent::CancelOrder {
                account_id,
                order_id,
            } => self.router.cancel_order(&account_id, &order_id).await,

            TradeIntent::ModifyOrder {
                account_id,
                order_id,
                order_type_raw,
                quantity,
                new_price,
            } => {
                let request = build_modify(account_id, order_id, &order_type_raw, quantity, new_price);
                self.router.modify_order(request).await
            }

            TradeIntent::Bracket {
                account_id,
                symbol,
                side,
                tp_price,
                sl_price,
                quantity,
            } => {
                // Protective legs close against the position, placed
                // independently. One leg failing never rolls back the
                // other; the first error is what the user sees.
                let exit_side = side.opposite();
                let mut first_error = None;

                if let Some(tp) = tp_price {
                    let request = OrderRequest {
                        account_id: account_id.clone(),
                        symbol: symbol.clone(),
                        side: exit_side,
                        order_type: OrderType::Limit,
                        quantity,
                        limit_price: Some(tp),
                        stop_price: None,
                        time_in_force: TimeInForce::GoodTilCancelled,
                        client_id: Uuid::new_v4(),
                    };
                    if let Err(e) = self.router.place_order(request).await {
                        warn!(%account_id, detail = %e.detail(), "take-profit leg failed");
                        first_error = Some(e);
                    }
                }

                if let Some(sl) = sl_price {
                    let request = OrderRequest {
                        account_id: account_id.clone(),
                        symbol,
                        side: exit_side,
                        order_type: OrderType::Stop,
                        quantity,
                        limit_price: None,
                        stop_price: Some(sl),
                        time_in_force: TimeInForce::GoodTilCancelled,
                        client_id: Uuid::new_v4(),
                    };
                    if let Err(e) = self.router.place_order(request).await {
                        warn!(%account_id, detail = %e.detail(), "stop-loss leg failed");
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }

                match first_error {
                    Some(e) => Err(e),
                    None => Ok(()),
                }
            }
        }
    }
}

/// Normalize a raw broker type label into a modify request.
///
/// The price lands in the slot the canonical type reads from: stop
/// price for stops, limit price for limits, both for stop-limits, and
/// the generic price field otherwise. Quantity and canonical type are
/// always resent; the broker rejects modifications without them.
fn build_modify(
    account_id: tape_core::AccountId,
    order_id: String,
    order_type_raw: &str,
    quantity: tape_core::Qty,
    new_price: Price,
) -> ModifyRequest {
    let order_type = OrderType::parse(order_type_raw);
    let mut request = ModifyRequest {
        account_id,
        order_id,
        order_type,
        quantity,
        limit_price: None,
        stop_price: None,
        price: None,
    };

    if order_type.has_stop_price() {
        request.stop_price = Some(new_price);
    }
    if order_type.has_limit_price() {
        request.limit_price = Some(new_price);
    }
    if !order_type.has_stop_price() && !order_type.has_limit_price() {
        request.price = Some(new_price);
    }
    request
}

/// Re-exported for the bracket placement machine.
pub(crate) fn bracket_request(
    account_id: tape_core::AccountId,
    symbol: String,
    side: Side,
    entry_price: Price,
    tp_price: Price,
    sl_price: Price,
    quantity: tape_core::Qty,
    time_in_force: TimeInForce,
) -> BracketRequest {
    BracketRequest {
        account_id,
        symbol,
        side,
        entry_price,
        tp_price,
        sl_price,
        quantity,
        time_in_force,
        client_id: Uuid::new_v4(),
    }
}
