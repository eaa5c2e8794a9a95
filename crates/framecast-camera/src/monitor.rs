//! Periodic camera status logging.
//!
//! Long-running deployments want a heartbeat in the logs showing what
//! the camera is configured to do, independent of client traffic. The
//! monitor is a detached task that logs a one-line status snapshot at
//! a fixed interval until stopped.

use crate::facade::Camera;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Handle to a running camera status monitor.
///
/// Dropping the handle without calling [`CameraMonitor::stop`] leaves
/// the task running for the lifetime of the runtime.
#[derive(Debug)]
pub struct CameraMonitor {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CameraMonitor {
    /// Spawn a monitor logging `camera`'s status every `interval`.
    pub fn start(camera: Camera, interval: Duration) -> Self {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately and gives a startup
            // status line.
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let status = camera.status_summary().await;
                        info!(status = %status, "camera status");
                    }
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });
        CameraMonitor { stop_tx, task }
    }

    /// Stop the monitor and wait for the task to exit.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_monitor_starts_and_stops() {
        let camera = Camera::virtual_camera();
        let monitor = CameraMonitor::start(camera, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(30)).await;
        monitor.stop().await;
    }
}
