//! Closed set of user-initiated trade actions.
//!
//! Overlay interactions produce one of these; nothing else reaches
//! the broker through the confirmation path. Adding an action means
//! adding a variant, and the dispatcher match stops compiling until
//! it is handled.

use tape_core::{AccountId, Price, Qty, Side};

#[derive(Debug, Clone, PartialEq)]
pub enum TradeIntent {
    ClosePosition {
        account_id: AccountId,
        position_id: String,
        symbol: String,
    },
    ReversePosition {
        account_id: AccountId,
        position_id: String,
        symbol: String,
    },
    CancelOrder {
        account_id: AccountId,
        order_id: String,
    },
    ModifyOrder {
        account_id: AccountId,
        order_id: String,
        /// Broker's raw type label, normalized at execution time.
        order_type_raw: String,
        quantity: Qty,
        new_price: Price,
    },
    Bracket {
        account_id: AccountId,
        symbol: String,
        /// Side of the position being protected.
        side: Side,
        tp_price: Option<Price>,
        sl_price: Option<Price>,
        quantity: Qty,
    },
}

impl TradeIntent {
    pub fn account_id(&self) -> &AccountId {
        match self {
            Self::ClosePosition { account_id, .. }
            | Self::ReversePosition { account_id, .. }
            | Self::CancelOrder { account_id, .. }
            | Self::ModifyOrder { account_id, .. }
            | Self::Bracket { account_id, .. } => account_id,
        }
    }

    /// Short label for confirmation prompts and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClosePosition { .. } => "close_position",
            Self::ReversePosition { .. } => "reverse_position",
            Self::CancelOrder { .. } => "cancel_order",
            Self::ModifyOrder { .. } => "modify_order",
            Self::Bracket { .. } => "bracket",
        }
    }
}
