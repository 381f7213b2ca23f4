//! Chart coordinate tracking.
//!
//! Maps broker price space onto the embedded chart's pixel space and
//! keeps that mapping fresh while the user zooms, scrolls, and swaps
//! series. Downstream consumers read the latest `CoordinateFrame`
//! from a watch channel and convert with pure frame math.

pub mod error;
pub mod frame;
pub mod surface;
pub mod tracker;

pub use error::{ChartError, ChartResult};
pub use frame::{CoordinateFrame, PriceRange, OFFSCREEN_Y};
pub use surface::{ChartSurface, MockChartSurface, ScaleMode, SurfaceEvent};
pub use tracker::{FrameTracker, TrackerConfig, TrackerStatus};
