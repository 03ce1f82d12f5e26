use log::{debug, info};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::capture::{capture_loop, Camera};
use crate::classifier::Classifier;
use crate::constants::{subtitle, CAPTURE_INTERVAL_SECS};
use crate::monitor::DistractionMonitor;
use crate::notify::Notifier;
use crate::screen::ScreenGrabber;
use crate::state::AgentState;
use crate::store::ImageStore;
use crate::timelapse::{Encoder, TimelapseBuilder, TimelapseOutcome};
use crate::types::Verdict;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub capturing: bool,
    pub distracted: bool,
    pub escalating: bool,
}

// The four user commands. Each returns immediately; the work runs on
// spawned tasks and reports back through the notifier.
pub struct Sentinel {
    state: Arc<AgentState>,
    camera: Camera,
    notifier: Arc<dyn Notifier>,
    monitor: Arc<DistractionMonitor>,
    timelapses: TimelapseBuilder,
    session: Mutex<Option<CancellationToken>>,
}

impl Sentinel {
    pub fn new(
        store: ImageStore,
        grabber: Arc<dyn ScreenGrabber>,
        classifier: Arc<dyn Classifier>,
        encoder: Arc<dyn Encoder>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let state = Arc::new(AgentState::new());
        let monitor = DistractionMonitor::new(
            state.clone(),
            store.clone(),
            classifier,
            notifier.clone(),
        );
        let timelapses = TimelapseBuilder::new(store.clone(), encoder, notifier.clone());

        Self {
            state,
            camera: Camera::new(grabber, store),
            notifier,
            monitor: Arc::new(monitor),
            timelapses,
            session: Mutex::new(None),
        }
    }

    pub fn status(&self) -> Status {
        Status {
            capturing: self.state.is_capturing(),
            distracted: self.monitor.is_distracted(),
            escalating: self.monitor.is_escalating(),
        }
    }

    pub fn start(&self) {
        if self.state.set_capturing(true) {
            debug!("Capture already running");
            return;
        }

        let session = CancellationToken::new();
        if let Some(previous) = self.session_slot().replace(session.clone()) {
            previous.cancel();
        }

        self.monitor.start(&session);
        tokio::spawn(capture_loop(
            self.state.clone(),
            self.camera.clone(),
            self.notifier.clone(),
            session,
        ));

        info!("Capture session started");
        self.notifier.info(
            subtitle::CAPTURE,
            &format!("Started capturing screenshots every {CAPTURE_INTERVAL_SECS} seconds"),
        );
    }

    pub fn stop(&self) {
        if !self.state.set_capturing(false) {
            debug!("Capture not running");
            return;
        }

        if let Some(session) = self.session_slot().take() {
            session.cancel();
        }
        self.monitor.stop();

        info!("Capture session stopped");
        self.notifier
            .info(subtitle::CAPTURE, "Stopped capturing screenshots");
    }

    pub fn build_timelapses(&self) -> Vec<JoinHandle<TimelapseOutcome>> {
        self.timelapses.build_all()
    }

    // Takes a fresh screenshot and runs a one-off distraction check on it.
    // A failed capture ends the session the same way it does in the loop.
    pub fn check_now(&self) -> Option<JoinHandle<Option<Verdict>>> {
        if !self.state.is_capturing() {
            self.notifier.info(
                subtitle::FOCUS_CHECK,
                "Start capturing before checking for distractions.",
            );
            return None;
        }

        let camera = self.camera.clone();
        let state = self.state.clone();
        let notifier = self.notifier.clone();
        let monitor = self.monitor.clone();
        let session = self.session_slot().as_ref().cloned();

        Some(tokio::spawn(async move {
            match camera.capture_once().await {
                Ok(path) => monitor.manual_check(&path).await,
                Err(e) => {
                    notifier.error(
                        subtitle::CAPTURE_ERROR,
                        &format!("Failed to capture screenshot: {e:#}"),
                    );
                    // a session stopped in the meantime is left alone
                    if let Some(session) = session.filter(|s| !s.is_cancelled()) {
                        state.set_capturing(false);
                        session.cancel();
                    }
                    None
                }
            }
        }))
    }

    fn session_slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
