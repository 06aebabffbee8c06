//! Periodic render tick driver.
//!
//! Runs [`OverlayEngine::tick`] on a `tokio` interval and hands each frame
//! to a [`FrameSink`]. Configuration reloads happen between ticks only, and
//! the file work of each tick runs on the blocking pool.
//! Dropping or stopping the handle cancels the loop, after which the bounds
//! cache is flushed one last time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::diagnostics::DiagnosticKind;
use crate::engine::OverlayEngine;
use crate::geometry::{Size, SurfaceSpace};
use crate::layout::FrameOutput;

/// Reports the current drawable size of the game window.
pub trait SurfaceProvider: Send + Sync + 'static {
    /// `None` while no surface is available (window minimized, not yet found).
    fn surface_size(&self) -> Option<Size<SurfaceSpace>>;
}

/// Receives every computed frame.
pub trait FrameSink: Send + Sync + 'static {
    fn present(&self, frame: &FrameOutput);
}

/// Summary sent when the loop exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderLoopReport {
    pub frames: u64,
    pub skipped: u64,
}

/// Handle to a running render loop.
pub struct RenderLoop {
    stop: Option<DropGuard>,
    /// Receiver for the final report when the loop stops.
    pub rx: oneshot::Receiver<RenderLoopReport>,
}

impl RenderLoop {
    /// Stop the loop. The final bounds flush happens on the loop task.
    pub fn stop(&mut self) {
        drop(self.stop.take());
    }

    /// Stop and wait for the final report.
    pub async fn shutdown(mut self) -> Option<RenderLoopReport> {
        self.stop();
        self.rx.await.ok()
    }
}

/// Interval whose first tick fires one `period` from now.
fn tick_interval(period: Duration) -> Interval {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Spawn the render loop on the current tokio runtime.
///
/// The tick period follows `tick_interval_ms` and is re-read after every tick.
pub fn spawn_render_loop<P, S>(engine: Arc<OverlayEngine>, surface: P, sink: S) -> RenderLoop
where
    P: SurfaceProvider,
    S: FrameSink,
{
    let stop_token = CancellationToken::new();
    let stop_token_child = stop_token.child_token();
    let (tx, rx) = oneshot::channel();

    let mut period = Duration::from_millis(engine.settings().tick_interval_ms);

    tokio::spawn(async move {
        let mut interval = tick_interval(period);
        let mut report = RenderLoopReport {
            frames: 0,
            skipped: 0,
        };

        log::info!("[RENDER_LOOP] Started ({} ms period)", period.as_millis());

        loop {
            tokio::select! {
                _ = stop_token_child.cancelled() => break,
                _ = interval.tick() => {}
            }

            // Config polling and the bounds cache flush touch the filesystem
            let size = surface.surface_size();
            let tick_engine = Arc::clone(&engine);
            let result = tokio::task::spawn_blocking(move || {
                tick_engine.reload_config();
                size.map(|size| tick_engine.tick(Instant::now(), size))
            })
            .await;

            match result {
                Ok(Some(Ok(frame))) => {
                    sink.present(&frame);
                    report.frames += 1;
                }
                Ok(Some(Err(e))) => {
                    log::debug!("[RENDER_LOOP] Tick skipped: {}", e);
                    report.skipped += 1;
                }
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    log::error!("[RENDER_LOOP] spawn_blocking failed: {:?}", e);
                    report.skipped += 1;
                }
            }

            let current = Duration::from_millis(engine.settings().tick_interval_ms);
            if current != period {
                log::debug!(
                    "[RENDER_LOOP] Period changed {} -> {} ms",
                    period.as_millis(),
                    current.as_millis()
                );
                period = current;
                interval = tick_interval(period);
            }
        }

        let flush_engine = Arc::clone(&engine);
        match tokio::task::spawn_blocking(move || flush_engine.flush_bounds()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => engine.diagnostics().report(
                DiagnosticKind::Runtime,
                format!("final bounds cache write failed: {}", e),
            ),
            Err(e) => log::error!("[RENDER_LOOP] Final flush task failed: {:?}", e),
        }
        log::info!(
            "[RENDER_LOOP] Stopped after {} frames ({} skipped)",
            report.frames,
            report.skipped
        );
        let _ = tx.send(report);
    });

    RenderLoop {
        stop: Some(stop_token.drop_guard()),
        rx,
    }
}
