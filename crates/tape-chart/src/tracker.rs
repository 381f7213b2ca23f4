//! Coordinate frame tracker.
//!
//! Owns the polling loop that keeps an up-to-date `CoordinateFrame`
//! published on a watch channel. Two phases: a bounded acquisition
//! phase that waits for the surface to produce a usable pane, then a
//! steady-state loop that samples the pane at frame rate and publishes
//! only when something actually changed.

use crate::error::{ChartError, ChartResult};
use crate::frame::CoordinateFrame;
use crate::surface::{ChartSurface, SurfaceEvent};
use std::sync::Arc;
use std::time::Duration;
use tape_core::RetrySchedule;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Tracker timing knobs.
#[derive(Debug, Clone, Copy)]
pub struct TrackerConfig {
    /// Acquisition retry schedule for a fresh surface handle.
    pub acquisition: RetrySchedule,
    /// Steady-state poll cadence.
    pub poll_interval: Duration,
    /// Cadence for sampling the last bar close.
    pub price_sample_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            // ~15s window before the surface is declared unusable
            acquisition: RetrySchedule::fixed(75, Duration::from_millis(200)),
            // one poll per display frame
            poll_interval: Duration::from_millis(16),
            price_sample_interval: Duration::from_secs(1),
        }
    }
}

/// Lifecycle of the tracker for the current surface handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerStatus {
    /// Waiting for the surface to produce a usable pane.
    Acquiring,
    /// Publishing frames.
    Tracking,
    /// Acquisition window exhausted. Terminal for this handle.
    TimedOut,
}

/// Handle to a spawned tracker task.
pub struct FrameTracker {
    frame_rx: watch::Receiver<Option<CoordinateFrame>>,
    status_rx: watch::Receiver<TrackerStatus>,
    last_close_rx: watch::Receiver<Option<f64>>,
    cancel: CancellationToken,
}

impl FrameTracker {
    /// Spawn the tracker against a surface. The task runs until the
    /// token is cancelled or acquisition times out.
    pub fn spawn(
        surface: Arc<dyn ChartSurface>,
        config: TrackerConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (frame_tx, frame_rx) = watch::channel(None);
        let (status_tx, status_rx) = watch::channel(TrackerStatus::Acquiring);
        let (close_tx, last_close_rx) = watch::channel(None);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut worker = TrackerWorker {
                surface,
                config,
                frame_tx,
                status_tx,
                close_tx,
                cancel: task_cancel,
            };
            worker.run().await;
        });

        Self {
            frame_rx,
            status_rx,
            last_close_rx,
            cancel,
        }
    }

    /// Latest published frame, if tracking.
    pub fn current_frame(&self) -> Option<CoordinateFrame> {
        *self.frame_rx.borrow()
    }

    pub fn status(&self) -> TrackerStatus {
        *self.status_rx.borrow()
    }

    /// Most recent last-bar close sample.
    pub fn last_close(&self) -> Option<f64> {
        *self.last_close_rx.borrow()
    }

    /// Subscribe to frame updates.
    pub fn frames(&self) -> watch::Receiver<Option<CoordinateFrame>> {
        self.frame_rx.clone()
    }

    pub fn statuses(&self) -> watch::Receiver<TrackerStatus> {
        self.status_rx.clone()
    }

    pub fn last_closes(&self) -> watch::Receiver<Option<f64>> {
        self.last_close_rx.clone()
    }

    /// Stop the tracker task.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

struct TrackerWorker {
    surface: Arc<dyn ChartSurface>,
    config: TrackerConfig,
    frame_tx: watch::Sender<Option<CoordinateFrame>>,
    status_tx: watch::Sender<TrackerStatus>,
    close_tx: watch::Sender<Option<f64>>,
    cancel: CancellationToken,
}

impl TrackerWorker {
    async fn run(&mut self) {
        match self.acquire().await {
            Ok(frame) => {
                let _ = self.status_tx.send(TrackerStatus::Tracking);
                let _ = self.frame_tx.send(Some(frame));
                info!(?frame, "chart frame acquired");
            }
            Err(ChartError::AcquisitionTimedOut { attempts }) => {
                warn!(attempts, "chart surface never became ready");
                let _ = self.status_tx.send(TrackerStatus::TimedOut);
                return;
            }
            Err(_) => return,
        }

        self.track().await;
        debug!("frame tracker stopped");
    }

    /// Poll for a usable pane on the acquisition schedule.
    async fn acquire(&self) -> ChartResult<CoordinateFrame> {
        let schedule = self.config.acquisition;
        let mut attempt = 0u32;

        loop {
            if let Some(frame) = read_frame(self.surface.as_ref()) {
                return Ok(frame);
            }

            attempt += 1;
            if schedule.is_exhausted(attempt) {
                return Err(ChartError::AcquisitionTimedOut { attempts: attempt });
            }

            tokio::select! {
                () = tokio::time::sleep(schedule.delay_for(attempt)) => {}
                () = self.cancel.cancelled() => {
                    return Err(ChartError::TrackerStopped);
                }
            }
        }
    }

    /// Steady-state loop: frame-rate poll with change detection, a
    /// surface-event backstop, and slow last-close sampling.
    async fn track(&mut self) {
        let mut poll = tokio::time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut price_sample = tokio::time::interval(self.config.price_sample_interval);
        price_sample.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut events = self.surface.events();

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => return,

                _ = poll.tick() => {
                    self.publish_if_changed();
                }

                event = events.recv() => {
                    match event {
                        Ok(SurfaceEvent::VisibleRangeChanged) => {
                            self.publish_if_changed();
                        }
                        Ok(SurfaceEvent::DataLoaded) => {
                            // Pane references may be stale after a
                            // series swap; re-acquire if the frame
                            // went away.
                            if !self.reacquire_if_lost().await {
                                return;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "surface event stream lagged");
                            self.publish_if_changed();
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            // Surface gone; keep polling, reads will
                            // return None and the frame clears.
                        }
                    }
                }

                _ = price_sample.tick() => {
                    let close = self.surface.last_bar_close();
                    if *self.close_tx.borrow() != close {
                        let _ = self.close_tx.send(close);
                    }
                }
            }
        }
    }

    fn publish_if_changed(&self) {
        let frame = read_frame(self.surface.as_ref());
        if *self.frame_tx.borrow() != frame {
            let _ = self.frame_tx.send(frame);
        }
    }

    /// After a data reload, run acquisition again if the pane is gone.
    /// Returns false when the tracker should stop (timed out).
    async fn reacquire_if_lost(&self) -> bool {
        if read_frame(self.surface.as_ref()).is_some() {
            self.publish_if_changed();
            return true;
        }

        let _ = self.status_tx.send(TrackerStatus::Acquiring);
        let _ = self.frame_tx.send(None);

        match self.acquire().await {
            Ok(frame) => {
                let _ = self.status_tx.send(TrackerStatus::Tracking);
                let _ = self.frame_tx.send(Some(frame));
                info!("chart frame re-acquired after data reload");
                true
            }
            Err(ChartError::AcquisitionTimedOut { attempts }) => {
                warn!(attempts, "surface lost and never came back");
                let _ = self.status_tx.send(TrackerStatus::TimedOut);
                false
            }
            Err(_) => false,
        }
    }
}

/// Assemble a frame from the surface, or None while any piece is
/// missing or degenerate.
fn read_frame(surface: &dyn ChartSurface) -> Option<CoordinateFrame> {
    let range = surface.visible_price_range()?;
    let height = surface.pane_height()?;
    let width = surface.chart_width().unwrap_or(0.0);

    let frame = CoordinateFrame::new(
        range,
        height,
        width,
        surface.scale_mode().is_logarithmic(),
        surface.toolbar_offset(),
    );
    frame.is_usable().then_some(frame)
}
