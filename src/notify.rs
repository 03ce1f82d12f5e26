// User-facing notifications. Background work never raises errors to the
// command surface; it reports through a Notifier instead.

use log::{error, info, warn};
use std::process::{Command, Stdio};

use crate::types::{Level, Notification};

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn info(&self, subtitle: &str, message: &str) {
        self.notify(Notification::new(Level::Info, subtitle, message));
    }

    fn warning(&self, subtitle: &str, message: &str) {
        self.notify(Notification::new(Level::Warning, subtitle, message));
    }

    fn error(&self, subtitle: &str, message: &str) {
        self.notify(Notification::new(Level::Error, subtitle, message));
    }
}

// Logs every notification and mirrors it to the desktop notification daemon
pub struct DesktopNotifier {
    desktop: bool,
}

impl DesktopNotifier {
    pub fn new(desktop: bool) -> Self {
        Self { desktop }
    }

    fn post(&self, notification: &Notification) {
        let mut cmd = desktop_command(notification);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        // Reaped on a short-lived thread so callers never wait on the daemon
        std::thread::spawn(move || {
            if let Err(e) = cmd.status() {
                warn!("Failed to post desktop notification: {}", e);
            }
        });
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Info => info!("[{}] {}", notification.subtitle, notification.message),
            Level::Warning => warn!("[{}] {}", notification.subtitle, notification.message),
            Level::Error => error!("[{}] {}", notification.subtitle, notification.message),
        }

        if self.desktop {
            self.post(&notification);
        }
    }
}

#[cfg(target_os = "macos")]
fn desktop_command(notification: &Notification) -> Command {
    let script = format!(
        "display notification {} with title {} subtitle {}",
        applescript_string(&notification.message),
        applescript_string(&notification.title),
        applescript_string(&notification.subtitle),
    );
    let mut cmd = Command::new(crate::constants::OSASCRIPT_CMD);
    cmd.arg("-e").arg(script);
    cmd
}

#[cfg(not(target_os = "macos"))]
fn desktop_command(notification: &Notification) -> Command {
    let urgency = match notification.level {
        Level::Info => "normal",
        Level::Warning | Level::Error => "critical",
    };
    let mut cmd = Command::new(crate::constants::NOTIFY_SEND_CMD);
    cmd.arg("--app-name")
        .arg(&notification.title)
        .arg("--urgency")
        .arg(urgency)
        .arg(&notification.subtitle)
        .arg(&notification.message);
    cmd
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn applescript_string(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}
