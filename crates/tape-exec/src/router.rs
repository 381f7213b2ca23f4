//! Order routing trait.
//!
//! Abstracts the broker's order API behind a dyn-compatible trait so
//! the dispatcher and placement machine can be tested without a
//! network. The HTTP implementation lives in `http_router`.

use crate::error::ExecResult;
use std::pin::Pin;
use std::sync::Arc;
use tape_core::{AccountId, OrderType, Price, Qty, Side, TimeInForce};
use uuid::Uuid;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// A plain order submission.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub account_id: AccountId,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Qty,
    pub limit_price: Option<Price>,
    pub stop_price: Option<Price>,
    pub time_in_force: TimeInForce,
    /// Client-generated id for correlation.
    pub client_id: Uuid,
}

/// A modification of a working order.
///
/// Quantity and canonical type are always present; the broker
/// requires both on every modification regardless of what changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyRequest {
    pub account_id: AccountId,
    pub order_id: String,
    pub order_type: OrderType,
    pub quantity: Qty,
    pub limit_price: Option<Price>,
    pub stop_price: Option<Price>,
    /// Generic price for types without a dedicated slot.
    pub price: Option<Price>,
}

/// Entry plus protective exits, submitted as one server-side group.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketRequest {
    pub account_id: AccountId,
    pub symbol: String,
    pub side: Side,
    pub entry_price: Price,
    pub tp_price: Price,
    pub sl_price: Price,
    pub quantity: Qty,
    pub time_in_force: TimeInForce,
    pub client_id: Uuid,
}

/// Broker order API.
///
/// Each call maps to one broker request; `Ok(())` means accepted.
/// Failures carry the broker's detail string for user display.
pub trait OrderRouter: Send + Sync {
    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, ExecResult<()>>;

    fn modify_order(&self, request: ModifyRequest) -> BoxFuture<'_, ExecResult<()>>;

    fn cancel_order<'a>(
        &'a self,
        account_id: &'a AccountId,
        order_id: &'a str,
    ) -> BoxFuture<'a, ExecResult<()>>;

    fn close_position<'a>(
        &'a self,
        account_id: &'a AccountId,
        position_id: &'a str,
    ) -> BoxFuture<'a, ExecResult<()>>;

    fn reverse_position<'a>(
        &'a self,
        account_id: &'a AccountId,
        position_id: &'a str,
    ) -> BoxFuture<'a, ExecResult<()>>;

    fn place_bracket(&self, request: BracketRequest) -> BoxFuture<'_, ExecResult<()>>;
}

/// Arc wrapper for router trait objects.
pub type DynOrderRouter = Arc<dyn OrderRouter>;

/// A recorded router call, for test verification.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterCall {
    Place(OrderRequest),
    Modify(ModifyRequest),
    Cancel { account_id: AccountId, order_id: String },
    Close { account_id: AccountId, position_id: String },
    Reverse { account_id: AccountId, position_id: String },
    Bracket(BracketRequest),
}

/// Mock router for testing.
///
/// Records every call; accounts registered via `fail_account` get a
/// broker rejection instead of success.
#[derive(Debug, Default)]
pub struct MockOrderRouter {
    calls: parking_lot::Mutex<Vec<RouterCall>>,
    failing: parking_lot::Mutex<Vec<AccountId>>,
}

impl MockOrderRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call for this account fail with a broker rejection.
    pub fn fail_account(&self, account_id: impl Into<AccountId>) {
        self.failing.lock().push(account_id.into());
    }

    pub fn calls(&self) -> Vec<RouterCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn respond(&self, account_id: &AccountId) -> ExecResult<()> {
        if self.failing.lock().contains(account_id) {
            Err(crate::error::ExecError::Broker {
                status: 422,
                detail: format!("order rejected for {account_id}"),
            })
        } else {
            Ok(())
        }
    }
}

impl OrderRouter for MockOrderRouter {
    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, ExecResult<()>> {
        Box::pin(async move {
            let account = request.account_id.clone();
            self.calls.lock().push(RouterCall::Place(request));
            self.respond(&account)
        })
    }

    fn modify_order(&self, request: ModifyRequest) -> BoxFuture<'_, ExecResult<()>> {
        Box::pin(async move {
            let account = request.account_id.clone();
            self.calls.lock().push(RouterCall::Modify(request));
            self.respond(&account)
        })
    }

    fn cancel_order<'a>(
        &'a self,
        account_id: &'a AccountId,
        order_id: &'a str,
    ) -> BoxFuture<'a, ExecResult<()>> {
        Box::pin(async move {
            self.calls.lock().push(RouterCall::Cancel {
                account_id: account_id.clone(),
                order_id: order_id.to_string(),
            });
            self.respond(account_id)
        })
    }

    fn close_position<'a>(
        &'a self,
        account_id: &'a AccountId,
        position_id: &'a str,
    ) -> BoxFuture<'a, ExecResult<()>> {
        Box::pin(async move {
            self.calls.lock().push(RouterCall::Close {
                account_id: account_id.clone(),
                position_id: position_id.to_string(),
            });
            self.respond(account_id)
        })
    }

    fn reverse_position<'a>(
        &'a self,
        account_id: &'a AccountId,
        position_id: &'a str,
    ) -> BoxFuture<'a, ExecResult<()>> {
        Box::pin(async move {
            self.calls.lock().push(RouterCall::Reverse {
                account_id: account_id.clone(),
                position_id: position_id.to_string(),
            });
            self.respond(account_id)
        })
    }

    fn place_bracket(&self, request: BracketRequest) -> BoxFuture<'_, ExecResult<()>> {
        Box::pin(async move {
            let account = request.account_id.clone();
            self.calls.lock().push(RouterCall::Bracket(request));
            self.respond(&account)
        })
    }
}
