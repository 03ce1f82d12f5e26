use std::sync::atomic::{AtomicBool, Ordering};

// Process-wide flags shared by the capture loop, the distraction monitor
// and the command surface. Nothing here survives a restart.
//
// `capturing` is written by the start/stop commands (and cleared by the
// capture loop when a capture fails). `distracted` is written only by the
// distraction monitor.
#[derive(Debug, Default)]
pub struct AgentState {
    capturing: AtomicBool,
    distracted: AtomicBool,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    // Returns the previous value.
    pub fn set_capturing(&self, capturing: bool) -> bool {
        self.capturing.swap(capturing, Ordering::SeqCst)
    }

    pub fn is_distracted(&self) -> bool {
        self.distracted.load(Ordering::SeqCst)
    }

    // FOCUSED -> DISTRACTED. False if already distracted.
    pub(crate) fn mark_distracted(&self) -> bool {
        self.distracted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    // DISTRACTED -> FOCUSED. False if already focused.
    pub(crate) fn mark_focused(&self) -> bool {
        self.distracted
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn reset_focus(&self) {
        self.distracted.store(false, Ordering::SeqCst);
    }
}
