use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio_util::sync::CancellationToken;

use crate::classifier::Classifier;
use crate::constants::{subtitle, BASELINE_CHECK_INTERVAL, ESCALATION_CHECK_INTERVAL};
use crate::notify::Notifier;
use crate::state::AgentState;
use crate::store::{today, ImageStore};
use crate::timer::{RepeatingTask, Tick};
use crate::types::Verdict;

// Owns the FOCUSED/DISTRACTED flag and the two check cycles.
//
// The baseline cycle runs for the whole capture session. The escalation
// cycle only exists while DISTRACTED and is the only way back to FOCUSED.
// Both timers hang off the session token, so cancelling the session (or
// calling `stop`) takes them down before any further check can start.
pub struct DistractionMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    state: Arc<AgentState>,
    store: ImageStore,
    classifier: Arc<dyn Classifier>,
    notifier: Arc<dyn Notifier>,
    session: Mutex<Option<CancellationToken>>,
    baseline: Mutex<Option<RepeatingTask>>,
    escalation: Mutex<Option<RepeatingTask>>,
}

impl DistractionMonitor {
    pub fn new(
        state: Arc<AgentState>,
        store: ImageStore,
        classifier: Arc<dyn Classifier>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state,
                store,
                classifier,
                notifier,
                session: Mutex::new(None),
                baseline: Mutex::new(None),
                escalation: Mutex::new(None),
            }),
        }
    }

    // Begins a monitoring session in FOCUSED with the baseline cycle armed.
    pub fn start(&self, session: &CancellationToken) {
        self.stop();
        self.inner.state.reset_focus();
        *lock(&self.inner.session) = Some(session.clone());

        let weak = Arc::downgrade(&self.inner);
        let task = RepeatingTask::spawn("baseline", BASELINE_CHECK_INTERVAL, session, move |token| {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => inner.baseline_tick(token).await,
                    None => Tick::Stop,
                }
            }
        });
        *lock(&self.inner.baseline) = Some(task);
        info!("Distraction monitor started");
    }

    // Cancels both cycles. Returns once no further check can be scheduled.
    pub fn stop(&self) {
        let session = lock(&self.inner.session).take();
        let baseline = lock(&self.inner.baseline).take();
        let escalation = lock(&self.inner.escalation).take();

        for task in baseline.iter().chain(escalation.iter()) {
            task.cancel();
        }
        if session.is_some() {
            info!("Distraction monitor stopped");
        }
    }

    // One-shot check of a fresh screenshot. Can start a distraction
    // episode but never ends one.
    pub async fn manual_check(&self, image: &Path) -> Option<Verdict> {
        self.inner.manual_check(image).await
    }

    pub fn is_distracted(&self) -> bool {
        self.inner.state.is_distracted()
    }

    pub fn is_escalating(&self) -> bool {
        lock(&self.inner.escalation)
            .as_ref()
            .is_some_and(|task| !task.is_cancelled() && !task.is_finished())
    }
}

impl Drop for DistractionMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Inner {
    fn active(&self, token: &CancellationToken) -> bool {
        !token.is_cancelled() && self.state.is_capturing()
    }

    fn latest_screenshot(&self) -> Option<PathBuf> {
        let date = today();
        match self.store.latest_screenshot(&date) {
            Ok(Some(path)) => Some(path),
            Ok(None) => {
                debug!("No screenshot yet for {}, skipping check", date);
                None
            }
            Err(e) => {
                warn!("Could not look up latest screenshot: {:#}", e);
                None
            }
        }
    }

    // Reschedules after every tick while the session is live, including
    // ticks that found nothing to classify.
    async fn baseline_tick(self: Arc<Self>, token: CancellationToken) -> Tick {
        if !self.active(&token) {
            return Tick::Stop;
        }

        if let Some(image) = self.latest_screenshot() {
            let verdict = self.classifier.classify(&image).await;
            if !self.active(&token) {
                debug!("Discarding baseline verdict {} after stop", verdict);
                return Tick::Stop;
            }
            self.apply_baseline(verdict);
        }

        Tick::Continue
    }

    async fn escalation_tick(self: Arc<Self>, token: CancellationToken) -> Tick {
        if !self.active(&token) {
            return Tick::Stop;
        }

        let Some(image) = self.latest_screenshot() else {
            return Tick::Continue;
        };

        let verdict = self.classifier.classify(&image).await;
        if !self.active(&token) {
            debug!("Discarding escalation verdict {} after stop", verdict);
            return Tick::Stop;
        }

        match verdict {
            Verdict::Distracted => {
                self.notifier.warning(
                    subtitle::STILL_DISTRACTED,
                    "Still distracted. Let's get back to work!",
                );
                Tick::Continue
            }
            Verdict::Focused => {
                if self.state.mark_focused() {
                    info!("Back on track");
                    self.notifier
                        .info(subtitle::BACK_ON_TRACK, "Great, you're back on track!");
                }
                Tick::Stop
            }
        }
    }

    // FOCUSED-state rule shared by baseline and manual checks
    fn apply_baseline(self: &Arc<Self>, verdict: Verdict) {
        match verdict {
            Verdict::Focused => debug!("Baseline check: focused"),
            Verdict::Distracted => {
                if self.state.mark_distracted() {
                    info!("Distraction detected");
                    self.notifier.warning(
                        subtitle::DISTRACTED,
                        "You seem to be distracted. Time to refocus!",
                    );
                    self.start_escalation();
                } else {
                    debug!("Already distracted; escalation cycle owns re-evaluation");
                }
            }
        }
    }

    fn start_escalation(self: &Arc<Self>) {
        let Some(session) = lock(&self.session).clone() else {
            return;
        };

        let weak: Weak<Inner> = Arc::downgrade(self);
        let task = RepeatingTask::spawn(
            "escalation",
            ESCALATION_CHECK_INTERVAL,
            &session,
            move |token| {
                let weak = weak.clone();
                async move {
                    match weak.upgrade() {
                        Some(inner) => inner.escalation_tick(token).await,
                        None => Tick::Stop,
                    }
                }
            },
        );

        if let Some(previous) = lock(&self.escalation).replace(task) {
            previous.cancel();
        }
    }

    async fn manual_check(self: &Arc<Self>, image: &Path) -> Option<Verdict> {
        let session = lock(&self.session).clone()?;
        if !self.active(&session) {
            return None;
        }

        let verdict = self.classifier.classify(image).await;
        if !self.active(&session) {
            debug!("Discarding manual verdict {} after stop", verdict);
            return None;
        }

        let was_distracted = self.state.is_distracted();
        self.apply_baseline(verdict);

        match (verdict, was_distracted) {
            (Verdict::Focused, false) => self
                .notifier
                .info(subtitle::FOCUS_CHECK, "Looking focused. Keep it up!"),
            (Verdict::Focused, true) => self.notifier.info(
                subtitle::FOCUS_CHECK,
                "Looking focused; the ongoing distraction check will confirm it.",
            ),
            (Verdict::Distracted, true) => self
                .notifier
                .warning(subtitle::FOCUS_CHECK, "Still looking distracted."),
            (Verdict::Distracted, false) => {}
        }

        Some(verdict)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
