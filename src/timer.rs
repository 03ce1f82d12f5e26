use log::debug;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

// What a tick wants to happen next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Stop,
}

// A self-rescheduling timer: waits `period`, runs the tick, and repeats
// until the tick returns `Tick::Stop` or the timer is cancelled.
//
// The period is measured from the end of one tick to the start of the
// next. Cancelling never interrupts a tick that is already running; the
// tick receives the timer's token and must check it before acting.
pub struct RepeatingTask {
    name: &'static str,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl RepeatingTask {
    pub fn spawn<F, Fut>(
        name: &'static str,
        period: Duration,
        parent: &CancellationToken,
        mut tick: F,
    ) -> Self
    where
        F: FnMut(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Tick> + Send + 'static,
    {
        let token = parent.child_token();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = time::sleep(period) => {}
                }

                if tick(task_token.clone()).await == Tick::Stop {
                    break;
                }
            }
            debug!("{} timer finished", name);
        });

        debug!("{} timer scheduled every {:?}", name, period);
        Self {
            name,
            token,
            handle,
        }
    }

    // Takes effect immediately: no further tick will start.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!("{} timer cancelled", self.name);
            self.token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
