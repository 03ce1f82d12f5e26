// Fakes for the external collaborators, shared by the unit tests

use anyhow::{bail, Result};
use async_trait::async_trait;
use image::RgbaImage;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::classifier::Classifier;
use crate::notify::Notifier;
use crate::screen::ScreenGrabber;
use crate::timelapse::{EncodeJob, EncodeStatus, Encoder};
use crate::types::{Notification, Verdict};

#[derive(Default)]
pub struct RecordingNotifier {
    notes: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn all(&self) -> Vec<Notification> {
        self.notes.lock().unwrap().clone()
    }

    pub fn with_subtitle(&self, subtitle: &str) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|n| n.subtitle == subtitle)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.notes.lock().unwrap().push(notification);
    }
}

#[derive(Default)]
pub struct CountingGrabber {
    calls: AtomicUsize,
}

impl CountingGrabber {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ScreenGrabber for CountingGrabber {
    fn grab(&self) -> Result<RgbaImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255])))
    }
}

pub struct FailingGrabber;

impl ScreenGrabber for FailingGrabber {
    fn grab(&self) -> Result<RgbaImage> {
        bail!("no display available")
    }
}

pub struct SlowGrabber(pub Duration);

impl ScreenGrabber for SlowGrabber {
    fn grab(&self) -> Result<RgbaImage> {
        std::thread::sleep(self.0);
        Ok(RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255])))
    }
}

// Works for the first `ok` grabs, then loses the display
pub struct FlakyGrabber {
    ok: usize,
    calls: AtomicUsize,
}

impl FlakyGrabber {
    pub fn new(ok: usize) -> Self {
        Self {
            ok,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ScreenGrabber for FlakyGrabber {
    fn grab(&self) -> Result<RgbaImage> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.ok {
            Ok(RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 255])))
        } else {
            bail!("display connection lost")
        }
    }
}

// Answers with queued verdicts, then FOCUSED once the queue runs dry
#[derive(Default)]
pub struct ScriptedClassifier {
    verdicts: Mutex<VecDeque<Verdict>>,
    seen: Mutex<Vec<PathBuf>>,
}

impl ScriptedClassifier {
    pub fn new(verdicts: impl IntoIterator<Item = Verdict>) -> Self {
        Self {
            verdicts: Mutex::new(verdicts.into_iter().collect()),
            seen: Mutex::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<PathBuf> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, image: &Path) -> Verdict {
        self.seen.lock().unwrap().push(image.to_path_buf());
        self.verdicts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Verdict::Focused)
    }
}

#[derive(Clone, Copy)]
pub enum EncoderBehavior {
    Writes(usize),
    WritesNothing,
    Exits,
}

pub struct FakeEncoder {
    behavior: EncoderBehavior,
    jobs: Mutex<Vec<EncodeJob>>,
}

impl FakeEncoder {
    pub fn new(behavior: EncoderBehavior) -> Self {
        Self {
            behavior,
            jobs: Mutex::default(),
        }
    }

    pub fn jobs(&self) -> Vec<EncodeJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn encode(&self, job: &EncodeJob) -> Result<EncodeStatus> {
        self.jobs.lock().unwrap().push(job.clone());
        match self.behavior {
            EncoderBehavior::Writes(len) => {
                fs::write(&job.output, vec![0u8; len])?;
                Ok(EncodeStatus::Success)
            }
            EncoderBehavior::WritesNothing => Ok(EncodeStatus::Success),
            EncoderBehavior::Exits => Ok(EncodeStatus::Failed {
                stderr: "Invalid data found when processing input".to_string(),
            }),
        }
    }
}

pub fn touch_screenshot(dir: &Path, timestamp: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(crate::store::screenshot_file_name(timestamp));
    fs::write(&path, b"png").unwrap();
    path
}

// Holds every classification until released, then answers DISTRACTED
#[derive(Default)]
pub struct GatedClassifier {
    gate: tokio::sync::Notify,
    calls: AtomicUsize,
}

impl GatedClassifier {
    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for GatedClassifier {
    async fn classify(&self, _image: &Path) -> Verdict {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        Verdict::Distracted
    }
}
