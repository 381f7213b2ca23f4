//! Error types for chart frame tracking.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    /// The surface never produced a usable pane within the acquisition
    /// window. Terminal for this surface handle.
    #[error("chart surface not ready after {attempts} acquisition attempts")]
    AcquisitionTimedOut { attempts: u32 },

    /// The tracker task is gone and its channels are closed.
    #[error("frame tracker stopped")]
    TrackerStopped,
}

pub type ChartResult<T> = Result<T, ChartError>;
