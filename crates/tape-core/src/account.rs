//! Trading account identity and per-account order defaults.

use crate::decimal::Qty;
use crate::order::TimeInForce;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque broker account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// An account selected for trading, with its per-account defaults.
///
/// Multi-account submission fans one intent out across a set of these;
/// each account carries its own quantity and time-in-force.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveAccount {
    pub account_id: AccountId,
    /// Human-facing label for logs and the overlay.
    pub label: String,
    /// Default contract quantity for orders on this account.
    pub quantity: Qty,
    #[serde(default)]
    pub time_in_force: TimeInForce,
}

impl ActiveAccount {
    pub fn new(account_id: impl Into<AccountId>, label: impl Into<String>, quantity: Qty) -> Self {
        Self {
            account_id: account_id.into(),
            label: label.into(),
            quantity,
            time_in_force: TimeInForce::default(),
        }
    }
}
