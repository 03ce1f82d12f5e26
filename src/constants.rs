// Constants shared across multiple modules

use std::time::Duration;

// Capture cadence
pub const CAPTURE_INTERVAL_SECS: u64 = 20;
pub const CAPTURE_POLL: Duration = Duration::from_secs(1);

// Distraction checks
pub const BASELINE_CHECK_INTERVAL: Duration = Duration::from_secs(180);
pub const ESCALATION_CHECK_INTERVAL: Duration = Duration::from_secs(20);

// Filesystem layout
pub const SENTINEL_DIR: &str = "alfred_sentinel";
pub const SESSION_DIR: &str = "current_session";
pub const ARCHIVE_DIR: &str = "timelapses_archive";
pub const SCREENSHOT_PREFIX: &str = "screenshot_";
pub const SCREENSHOT_EXT: &str = ".png";
pub const DATE_FORMAT: &str = "%Y%m%d";
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// Encoder
pub const FFMPEG_CMD: &str = "ffmpeg";
pub const TIMELAPSE_FRAMERATE: &str = "1";
pub const FRAME_SECONDS: &str = "1";
pub const FRAME_LIST: &str = "frames.ffconcat";

// Classification service
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const API_TIMEOUT: Duration = Duration::from_secs(30);
pub const MAX_VERDICT_TOKENS: u32 = 10;
pub const DISTRACTED_TOKEN: &str = "DISTRACTED";

pub const CLASSIFY_PROMPT: &str = "You are monitoring a user's screen to keep \
them on task. Look at this screenshot and decide whether the user is focused \
on work or distracted (social media, video streaming, news, games, shopping). \
Respond with exactly one word: FOCUSED or DISTRACTED.";

// Notifications
pub const APP_NAME: &str = "Alfred";
pub const NOTIFY_SEND_CMD: &str = "notify-send";
pub const OSASCRIPT_CMD: &str = "osascript";

pub mod subtitle {
    pub const CAPTURE: &str = "Screenshot Capture";
    pub const CAPTURE_ERROR: &str = "Capture Error";
    pub const DISTRACTED: &str = "Distraction Detected";
    pub const STILL_DISTRACTED: &str = "Still Distracted";
    pub const BACK_ON_TRACK: &str = "Back On Track";
    pub const FOCUS_CHECK: &str = "Focus Check";
    pub const CONFIG_ERROR: &str = "Configuration Error";
    pub const VIDEO: &str = "Video Creation";
    pub const NO_SCREENSHOTS: &str = "No screenshots";
    pub const WARNING: &str = "Warning";
    pub const ERROR: &str = "Error";
}
