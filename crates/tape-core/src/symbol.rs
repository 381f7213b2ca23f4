//! Symbol normalization and instrument profiles.
//!
//! Broker feeds carry full contract symbols ("NQH6", "ESZ25"); the
//! chart works in base tickers ("NQ", "ES"). This module resolves a
//! raw symbol to its canonical display form and looks up tick size
//! and point value from an explicit, constructor-injected table
//! rather than module-level mutable state.

use crate::decimal::Price;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Futures month codes: F G H J K M N Q U V X Z.
const MONTH_CODES: [char; 12] = ['F', 'G', 'H', 'J', 'K', 'M', 'N', 'Q', 'U', 'V', 'X', 'Z'];

/// Strip a trailing month/year contract code from a raw symbol.
///
/// `NQH6 -> NQ`, `ESZ25 -> ES`, `GCM26 -> GC`. A symbol without a
/// recognizable contract suffix is returned uppercased as-is.
pub fn normalize_symbol(raw: &str) -> String {
    let upper = raw.trim().to_ascii_uppercase();
    let chars: Vec<char> = upper.chars().collect();

    // Suffix = one month letter followed by 1-2 digits, with at least
    // one leading character remaining for the base ticker.
    for digits in (1..=2usize).rev() {
        if chars.len() < digits + 2 {
            continue;
        }
        let tail_start = chars.len() - digits;
        if !chars[tail_start..].iter().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let month = chars[tail_start - 1];
        if MONTH_CODES.contains(&month) {
            return chars[..tail_start - 1].iter().collect();
        }
    }

    upper
}

/// Check whether a record's symbol belongs on the active chart.
///
/// Matches when either the normalized base ticker or the verbatim
/// symbol equals the chart symbol, case-insensitively.
pub fn matches_chart(record_symbol: &str, chart_symbol: &str) -> bool {
    if record_symbol.is_empty() || chart_symbol.is_empty() {
        return false;
    }
    normalize_symbol(record_symbol).eq_ignore_ascii_case(chart_symbol)
        || record_symbol.eq_ignore_ascii_case(chart_symbol)
}

/// Instrument profile: canonical symbol, tick size, point value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolProfile {
    /// Canonical display symbol (e.g., "NQ").
    pub canonical_symbol: String,
    /// Minimum price increment.
    pub tick_size: Price,
    /// Monetary value of one full point per contract.
    pub point_value: Decimal,
}

impl SymbolProfile {
    pub fn new(symbol: impl Into<String>, tick_size: Decimal, point_value: Decimal) -> Self {
        Self {
            canonical_symbol: symbol.into(),
            tick_size: Price::new(tick_size),
            point_value,
        }
    }

    /// Snap a price to this instrument's nearest tick.
    pub fn round_to_tick(&self, price: Price) -> Price {
        price.round_to_tick(self.tick_size)
    }

    /// Price distance covered by `n` ticks.
    pub fn tick_offset(&self, n: u32) -> Price {
        self.tick_size * Decimal::from(n)
    }
}

/// Explicit instrument lookup table.
///
/// Injected into every component that needs tick or point-value data;
/// unknown symbols fall back to a conservative 0.01-tick profile so
/// lookup is total.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    profiles: HashMap<String, SymbolProfile>,
}

impl SymbolTable {
    pub fn new(profiles: Vec<SymbolProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.canonical_symbol.clone(), p))
                .collect(),
        }
    }

    /// Add or replace a profile (config overrides).
    pub fn insert(&mut self, profile: SymbolProfile) {
        self.profiles
            .insert(profile.canonical_symbol.clone(), profile);
    }

    /// Resolve a raw symbol to its profile.
    ///
    /// Pure per-call: normalizes then looks up. Unknown symbols get a
    /// 0.01 tick / 1.0 point fallback profile under their normalized
    /// name.
    pub fn profile(&self, raw_symbol: &str) -> SymbolProfile {
        let canonical = normalize_symbol(raw_symbol);
        self.profiles
            .get(&canonical)
            .cloned()
            .unwrap_or_else(|| SymbolProfile::new(canonical, dec!(0.01), dec!(1)))
    }

    pub fn tick_size(&self, raw_symbol: &str) -> Price {
        self.profile(raw_symbol).tick_size
    }

    pub fn point_value(&self, raw_symbol: &str) -> Decimal {
        self.profile(raw_symbol).point_value
    }
}

impl Default for SymbolTable {
    /// CME futures the terminal serves out of the box.
    fn default() -> Self {
        Self::new(vec![
            SymbolProfile::new("ES", dec!(0.25), dec!(50)),
            SymbolProfile::new("MES", dec!(0.25), dec!(5)),
            SymbolProfile::new("NQ", dec!(0.25), dec!(20)),
            SymbolProfile::new("MNQ", dec!(0.25), dec!(2)),
            SymbolProfile::new("YM", dec!(1), dec!(5)),
            SymbolProfile::new("MYM", dec!(1), dec!(0.5)),
            SymbolProfile::new("RTY", dec!(0.1), dec!(50)),
            SymbolProfile::new("M2K", dec!(0.1), dec!(5)),
            SymbolProfile::new("CL", dec!(0.01), dec!(1000)),
            SymbolProfile::new("MCL", dec!(0.01), dec!(100)),
            SymbolProfile::new("GC", dec!(0.1), dec!(100)),
            SymbolProfile::new("MGC", dec!(0.1), dec!(10)),
            SymbolProfile::new("SI", dec!(0.005), dec!(5000)),
            SymbolProfile::new("ZB", dec!(0.03125), dec!(1000)),
            SymbolProfile::new("ZN", dec!(0.015625), dec!(1000)),
            SymbolProfile::new("6E", dec!(0.00005), dec!(125000)),
        ])
    }
}
