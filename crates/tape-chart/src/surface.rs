//! Abstraction over the embedded charting provider.
//!
//! The tracker never talks to a concrete chart engine; it reads the
//! pane through this trait. Production wires an adapter over the real
//! surface, tests use the generated mock.

use crate::frame::PriceRange;
use tokio::sync::broadcast;

/// Vertical scale mode reported by the provider (mode 0 = linear,
/// mode 1 = logarithmic).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleMode {
    Linear,
    Logarithmic,
}

impl ScaleMode {
    pub fn from_provider_mode(mode: i32) -> Self {
        if mode == 1 {
            Self::Logarithmic
        } else {
            Self::Linear
        }
    }

    pub fn is_logarithmic(&self) -> bool {
        matches!(self, Self::Logarithmic)
    }
}

/// Notifications the surface pushes between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// The visible price or time range moved (zoom, scroll, resize).
    VisibleRangeChanged,
    /// A new series finished loading; pane references may be stale.
    DataLoaded,
}

/// Read-only view of the charting provider's active pane.
///
/// Every accessor returns `None` when the underlying handle is not
/// ready yet (chart still booting, pane swapped out). The tracker
/// treats `None` as "not yet usable" and keeps polling.
#[mockall::automock]
pub trait ChartSurface: Send + Sync {
    /// Currently visible price interval, if the price scale exists.
    fn visible_price_range(&self) -> Option<PriceRange>;

    /// Height of the main pane in pixels.
    fn pane_height(&self) -> Option<f64>;

    /// Width of the chart area in pixels.
    fn chart_width(&self) -> Option<f64>;

    /// Active vertical scale mode.
    fn scale_mode(&self) -> ScaleMode;

    /// Vertical offset of the pane below the toolbar.
    fn toolbar_offset(&self) -> f64;

    /// Close of the most recent bar. Providers without series access
    /// return `None`; the tracker degrades silently.
    fn last_bar_close(&self) -> Option<f64>;

    /// Subscribe to surface notifications.
    fn events(&self) -> broadcast::Receiver<SurfaceEvent>;
}
