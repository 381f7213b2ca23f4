//! Raw position and order records as the upstream state store holds
//! them. Field shapes follow the broker feed: sides may be missing,
//! order types and statuses arrive as uninterpreted strings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tape_core::{AccountId, PositionSide, Price, Qty, Side};

/// Server-computed P&L pushed over the transport, with the price it
/// was computed against and when we received it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlUpdate {
    pub value: Decimal,
    pub price: Option<Price>,
    pub received_at: DateTime<Utc>,
}

/// An open position as reported by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub position_id: String,
    pub account_id: AccountId,
    pub account_label: String,
    pub symbol: String,
    /// Explicit side when the feed provides one; otherwise derived
    /// from the sign of `net_qty`.
    pub side: Option<PositionSide>,
    /// Signed net contracts (positive long, negative short).
    pub net_qty: Decimal,
    /// Unsigned contract count.
    pub quantity: Qty,
    pub avg_price: Price,
    /// Last traded price carried on the record itself.
    pub last_price: Option<Price>,
    /// P&L the record arrived with.
    pub unrealized_pnl: Option<Decimal>,
    /// Most recent transport P&L push for this position.
    pub pnl_update: Option<PnlUpdate>,
}

impl PositionRecord {
    /// Effective side: explicit field wins, else sign of net quantity.
    pub fn effective_side(&self) -> PositionSide {
        self.side.unwrap_or(if self.net_qty < Decimal::ZERO {
            PositionSide::Short
        } else {
            PositionSide::Long
        })
    }

    pub fn is_open(&self) -> bool {
        !self.quantity.is_zero() || self.net_qty != Decimal::ZERO
    }
}

/// An order as reported by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub account_id: AccountId,
    pub symbol: String,
    pub side: Side,
    /// Raw broker type label ("Limit", "STP LMT", ...).
    pub order_type: String,
    /// Raw broker status ("Working", "6", "Filled", ...).
    pub status: String,
    pub limit_price: Option<Price>,
    pub stop_price: Option<Price>,
    pub quantity: Qty,
}

impl OrderRecord {
    /// Display price: limit first, else stop, else zero.
    pub fn display_price(&self) -> Price {
        self.limit_price.or(self.stop_price).unwrap_or(Price::ZERO)
    }
}
