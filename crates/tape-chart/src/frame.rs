//! Price-to-pixel coordinate mapping.
//!
//! A `CoordinateFrame` is an immutable snapshot of the chart's
//! vertical mapping: visible price range, pane height, and scale mode.
//! All conversions are pure and total; degenerate frames produce the
//! offscreen sentinel instead of panicking so a mid-resize snapshot
//! can never take the render path down.

/// Sentinel Y for prices that cannot be mapped. Far above any real
/// pane so the consumer simply does not draw the line.
pub const OFFSCREEN_Y: f64 = -9999.0;

/// Visible price interval on the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub from: f64,
    pub to: f64,
}

impl PriceRange {
    pub fn new(from: f64, to: f64) -> Self {
        Self { from, to }
    }

    /// A range maps prices only when it spans something and both ends
    /// are finite.
    pub fn is_usable(&self) -> bool {
        self.from.is_finite() && self.to.is_finite() && self.from < self.to
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.from && price <= self.to
    }
}

/// Snapshot of the chart pane's coordinate system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateFrame {
    pub visible_range: PriceRange,
    pub pane_height_px: f64,
    pub chart_width_px: f64,
    pub is_logarithmic: bool,
    /// Vertical offset of the pane below the chart toolbar.
    pub toolbar_offset_px: f64,
}

impl CoordinateFrame {
    pub fn new(
        visible_range: PriceRange,
        pane_height_px: f64,
        chart_width_px: f64,
        is_logarithmic: bool,
        toolbar_offset_px: f64,
    ) -> Self {
        Self {
            visible_range,
            pane_height_px,
            chart_width_px,
            is_logarithmic,
            toolbar_offset_px,
        }
    }

    /// True when the frame can actually map prices to pixels.
    pub fn is_usable(&self) -> bool {
        self.visible_range.is_usable() && self.pane_height_px > 0.0
    }

    /// Map a price to a pane-local Y pixel.
    ///
    /// Linear: `h * (1 - (p - from) / (to - from))`. Logarithmic maps
    /// in ln-space when from, to, and the price are all positive;
    /// otherwise the linear formula applies. Non-finite input or an
    /// unusable frame yields [`OFFSCREEN_Y`].
    pub fn price_to_y(&self, price: f64) -> f64 {
        if !self.is_usable() || !price.is_finite() {
            return OFFSCREEN_Y;
        }
        let PriceRange { from, to } = self.visible_range;
        let h = self.pane_height_px;

        if self.is_logarithmic && from > 0.0 && to > 0.0 && price > 0.0 {
            let span = to.ln() - from.ln();
            if span == 0.0 {
                return OFFSCREEN_Y;
            }
            h * (1.0 - (price.ln() - from.ln()) / span)
        } else {
            h * (1.0 - (price - from) / (to - from))
        }
    }

    /// Inverse of [`price_to_y`](Self::price_to_y). Degenerate frames
    /// yield 0.0.
    pub fn y_to_price(&self, y: f64) -> f64 {
        if !self.is_usable() || !y.is_finite() {
            return 0.0;
        }
        let PriceRange { from, to } = self.visible_range;
        let h = self.pane_height_px;
        let fraction = 1.0 - y / h;

        if self.is_logarithmic && from > 0.0 && to > 0.0 {
            let span = to.ln() - from.ln();
            (from.ln() + fraction * span).exp()
        } else {
            from + fraction * (to - from)
        }
    }

    /// Whether a price sits inside the visible range (inclusive).
    pub fn is_price_visible(&self, price: f64) -> bool {
        self.is_usable() && self.visible_range.contains(price)
    }
}
