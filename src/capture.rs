use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::constants::{subtitle, CAPTURE_INTERVAL_SECS, CAPTURE_POLL};
use crate::notify::Notifier;
use crate::screen::ScreenGrabber;
use crate::state::AgentState;
use crate::store::{stamp, ImageStore};

// Shared by the capture loop and manual checks. Clones share one lock, so
// only one grab-and-write runs at a time.
#[derive(Clone)]
pub struct Camera {
    grabber: Arc<dyn ScreenGrabber>,
    store: ImageStore,
    lock: Arc<Mutex<()>>,
}

impl Camera {
    pub fn new(grabber: Arc<dyn ScreenGrabber>, store: ImageStore) -> Self {
        Self {
            grabber,
            store,
            lock: Arc::new(Mutex::new(())),
        }
    }

    // Grabs the screen and writes it into today's session folder
    pub async fn capture_once(&self) -> Result<PathBuf> {
        let _guard = self.lock.lock().await;

        let grabber = self.grabber.clone();
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || -> Result<PathBuf> {
            let image = grabber.grab()?;
            let (date, timestamp) = stamp(&Local::now());
            let path = store.write_screenshot(&image, &date, &timestamp)?;
            Ok(path)
        })
        .await
        .context("screenshot worker join failed")?
    }
}

// Captures a screenshot every `CAPTURE_INTERVAL_SECS` while capturing is
// enabled. The wait is split into one-second slices so a stop lands within
// a second. A failed capture ends the session: capturing is switched off
// and `session` is cancelled, taking the distraction timers down with it.
pub async fn capture_loop(
    state: Arc<AgentState>,
    camera: Camera,
    notifier: Arc<dyn Notifier>,
    session: CancellationToken,
) {
    info!("Capture loop started");

    while state.is_capturing() && !session.is_cancelled() {
        match camera.capture_once().await {
            Ok(path) => debug!("Captured {}", path.display()),
            Err(e) => {
                notifier.error(
                    subtitle::CAPTURE_ERROR,
                    &format!("Failed to capture screenshot: {e:#}"),
                );
                state.set_capturing(false);
                session.cancel();
                break;
            }
        }

        for _ in 0..CAPTURE_INTERVAL_SECS {
            if !state.is_capturing() {
                break;
            }
            tokio::select! {
                _ = session.cancelled() => break,
                _ = time::sleep(CAPTURE_POLL) => {}
            }
        }
    }

    info!("Capture loop stopped");
}
