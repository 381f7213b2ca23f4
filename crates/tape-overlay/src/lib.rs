//! Overlay line building.
//!
//! Turns the broker's position and order state into the set of lines
//! drawn over the chart for one symbol. The transform is pure; the
//! application re-runs it whenever positions, orders, prices, or the
//! chart symbol change.

pub mod builder;
pub mod records;

pub use builder::{
    build_overlay, LivePrices, OrderLine, OverlayLines, PositionLine, PriceSample,
    PNL_FRESHNESS, PROTECT_TICK_OFFSET,
};
pub use records::{OrderRecord, PnlUpdate, PositionRecord};
