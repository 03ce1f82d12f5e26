use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::constants::{subtitle, FFMPEG_CMD, FRAME_LIST, FRAME_SECONDS, TIMELAPSE_FRAMERATE};
use crate::notify::Notifier;
use crate::store::{screenshot_time, ImageStore};

// One session folder's worth of frames and where the video goes
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub date: String,
    pub source_dir: PathBuf,
    pub frames: Vec<PathBuf>,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeStatus {
    Success,
    Failed { stderr: String },
}

// Turns `job.frames`, in order, into a video at one frame per screenshot.
// `Err` means the encoder could not be run at all.
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(&self, job: &EncodeJob) -> Result<EncodeStatus>;
}

pub struct FfmpegEncoder;

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(&self, job: &EncodeJob) -> Result<EncodeStatus> {
        let list = job.source_dir.join(FRAME_LIST);
        tokio::fs::write(&list, concat_script(&job.frames))
            .await
            .with_context(|| format!("Failed to write {}", list.display()))?;

        let output = Command::new(FFMPEG_CMD)
            .args(["-y", "-f", "concat", "-safe", "0", "-i"])
            .arg(&list)
            // libx264 with yuv420p needs even dimensions
            .arg("-vf")
            .arg(format!("fps={TIMELAPSE_FRAMERATE},pad=ceil(iw/2)*2:ceil(ih/2)*2"))
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
            .arg(&job.output)
            .stdin(Stdio::null())
            .output()
            .await;

        if let Err(e) = tokio::fs::remove_file(&list).await {
            warn!("Could not remove {}: {}", list.display(), e);
        }
        let output =
            output.with_context(|| format!("Failed to run {}. Is it installed?", FFMPEG_CMD))?;

        if output.status.success() {
            Ok(EncodeStatus::Success)
        } else {
            Ok(EncodeStatus::Failed {
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

// ffconcat script that shows each frame for FRAME_SECONDS. Entries are bare
// file names, resolved next to the script in the session folder. The last
// frame is listed twice since the demuxer drops the final duration.
fn concat_script(frames: &[PathBuf]) -> String {
    let names: Vec<String> = frames
        .iter()
        .filter_map(|frame| frame.file_name())
        .map(|name| name.to_string_lossy().replace('\'', "'\\''"))
        .collect();

    let mut script = String::from("ffconcat version 1.0\n");
    for name in &names {
        script.push_str(&format!("file '{name}'\nduration {FRAME_SECONDS}\n"));
    }
    if let Some(last) = names.last() {
        script.push_str(&format!("file '{last}'\n"));
    }
    script
}

// `timelapse_<date>_<first HHMMSS>_to_<last HHMMSS>.mp4` from a sorted frame list
pub fn timelapse_name(date: &str, frames: &[String]) -> Option<String> {
    let first = screenshot_time(frames.first()?)?;
    let last = screenshot_time(frames.last()?)?;
    Some(format!("timelapse_{date}_{first}_to_{last}.mp4"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelapseOutcome {
    // video verified and its frames deleted
    Created(PathBuf),
    // encoder claimed success but the file is missing or empty
    Unverified(PathBuf),
    Failed(String),
}

pub struct TimelapseBuilder {
    store: ImageStore,
    encoder: Arc<dyn Encoder>,
    notifier: Arc<dyn Notifier>,
}

impl TimelapseBuilder {
    pub fn new(store: ImageStore, encoder: Arc<dyn Encoder>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            encoder,
            notifier,
        }
    }

    // Launches one independent encode per non-empty session folder and
    // returns without waiting for any of them.
    pub fn build_all(&self) -> Vec<JoinHandle<TimelapseOutcome>> {
        let dates = match self.store.session_dates() {
            Ok(dates) => dates,
            Err(e) => {
                self.notifier
                    .error(subtitle::ERROR, &format!("Failed to create video: {e:#}"));
                return Vec::new();
            }
        };

        if dates.is_empty() {
            self.notifier.info(
                subtitle::NO_SCREENSHOTS,
                "No screenshots found to create a video.",
            );
            return Vec::new();
        }

        let mut jobs = Vec::new();
        for date in dates {
            let frames = match self.store.list_screenshots(&date) {
                Ok(frames) => frames,
                Err(e) => {
                    self.notifier
                        .error(subtitle::ERROR, &format!("Failed to create video: {e:#}"));
                    continue;
                }
            };

            let Some(name) = timelapse_name(&date, &frames) else {
                debug!("No screenshots in {}, skipping", date);
                continue;
            };

            let source_dir = self.store.session_dir(&date);
            let job = EncodeJob {
                frames: frames.iter().map(|f| source_dir.join(f)).collect(),
                output: self.store.timelapse_path(&name),
                source_dir,
                date: date.clone(),
            };

            info!("Encoding {} frames into {}", job.frames.len(), job.output.display());
            jobs.push(tokio::spawn(run_job(
                self.store.clone(),
                self.encoder.clone(),
                self.notifier.clone(),
                job,
            )));

            self.notifier.info(
                subtitle::VIDEO,
                &format!("Started creating video from screenshots for {date}"),
            );
        }
        jobs
    }
}

async fn run_job(
    store: ImageStore,
    encoder: Arc<dyn Encoder>,
    notifier: Arc<dyn Notifier>,
    job: EncodeJob,
) -> TimelapseOutcome {
    let stderr = match encoder.encode(&job).await {
        Ok(EncodeStatus::Success) => return verify_and_clean(store, notifier, job).await,
        Ok(EncodeStatus::Failed { stderr }) => stderr,
        Err(e) => format!("{e:#}"),
    };

    notifier.error(subtitle::ERROR, &format!("Failed to create video: {stderr}"));
    TimelapseOutcome::Failed(stderr)
}

async fn verify_and_clean(
    store: ImageStore,
    notifier: Arc<dyn Notifier>,
    job: EncodeJob,
) -> TimelapseOutcome {
    let non_empty = tokio::fs::metadata(&job.output)
        .await
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false);

    if !non_empty {
        notifier.warning(
            subtitle::WARNING,
            "Video may not have been created properly. Screenshots were not deleted.",
        );
        return TimelapseOutcome::Unverified(job.output);
    }

    let date = job.date.clone();
    let frames = job.frames.clone();
    let removed = tokio::task::spawn_blocking(move || store.remove_session(&date, &frames))
        .await
        .context("cleanup worker join failed")
        .and_then(|res| res.map_err(anyhow::Error::from));

    match removed {
        Ok(true) => notifier.info(
            subtitle::VIDEO,
            &format!(
                "Video created successfully at {}\nScreenshots have been deleted.",
                job.output.display()
            ),
        ),
        Ok(false) => notifier.info(
            subtitle::VIDEO,
            &format!(
                "Video created successfully at {}\nScreenshots taken since it started were kept.",
                job.output.display()
            ),
        ),
        Err(e) => notifier.warning(
            subtitle::WARNING,
            &format!(
                "Video created at {} but screenshots could not be deleted: {e:#}",
                job.output.display()
            ),
        ),
    }

    TimelapseOutcome::Created(job.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{touch_screenshot, EncoderBehavior, FakeEncoder, RecordingNotifier};
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        store: ImageStore,
        notifier: Arc<RecordingNotifier>,
        encoder: Arc<FakeEncoder>,
    }

    impl Fixture {
        fn new(behavior: EncoderBehavior) -> Self {
            let tmp = TempDir::new().unwrap();
            let store = ImageStore::new(tmp.path().join("session"), tmp.path().join("archive"));
            store.ensure_roots().unwrap();
            Self {
                _tmp: tmp,
                store,
                notifier: Arc::new(RecordingNotifier::default()),
                encoder: Arc::new(FakeEncoder::new(behavior)),
            }
        }

        fn builder(&self) -> TimelapseBuilder {
            TimelapseBuilder::new(self.store.clone(), self.encoder.clone(), self.notifier.clone())
        }

        fn session(&self, date: &str, times: &[&str]) {
            for time in times {
                touch_screenshot(&self.store.session_dir(date), &format!("{date}_{time}"));
            }
        }

        async fn build(&self) -> Vec<TimelapseOutcome> {
            let mut outcomes = Vec::new();
            for handle in self.builder().build_all() {
                outcomes.push(handle.await.unwrap());
            }
            outcomes
        }
    }

    #[test]
    fn name_spans_first_and_last_screenshot() {
        let frames = vec![
            "screenshot_20240101_090000.png".to_string(),
            "screenshot_20240101_093000.png".to_string(),
        ];
        assert_eq!(
            timelapse_name("20240101", &frames).as_deref(),
            Some("timelapse_20240101_090000_to_093000.mp4")
        );
        assert_eq!(timelapse_name("20240101", &[]), None);
    }

    #[test]
    fn concat_script_lists_frames_in_order() {
        let dir = PathBuf::from("/shots/20240101");
        let frames = vec![
            dir.join("screenshot_20240101_090000.png"),
            dir.join("screenshot_20240101_090000_01.png"),
        ];

        assert_eq!(
            concat_script(&frames),
            "ffconcat version 1.0\n\
             file 'screenshot_20240101_090000.png'\nduration 1\n\
             file 'screenshot_20240101_090000_01.png'\nduration 1\n\
             file 'screenshot_20240101_090000_01.png'\n"
        );
    }

    #[tokio::test]
    async fn empty_root_reports_once_and_encodes_nothing() {
        let fx = Fixture::new(EncoderBehavior::Writes(64));

        assert!(fx.build().await.is_empty());

        assert_eq!(fx.notifier.all().len(), 1);
        assert_eq!(fx.notifier.with_subtitle(subtitle::NO_SCREENSHOTS).len(), 1);
        assert!(fx.encoder.jobs().is_empty());
    }

    #[tokio::test]
    async fn verified_video_replaces_the_session_folder() {
        let fx = Fixture::new(EncoderBehavior::Writes(64));
        fx.session("20240101", &["093000", "090000"]);

        let outcomes = fx.build().await;

        let expected = fx
            .store
            .archive_root()
            .join("timelapse_20240101_090000_to_093000.mp4");
        assert_eq!(outcomes, vec![TimelapseOutcome::Created(expected.clone())]);
        assert!(expected.is_file());
        assert!(!fx.store.session_dir("20240101").exists());

        let jobs = fx.encoder.jobs();
        let dir = fx.store.session_dir("20240101");
        assert_eq!(
            jobs[0].frames,
            vec![
                dir.join("screenshot_20240101_090000.png"),
                dir.join("screenshot_20240101_093000.png"),
            ]
        );
        let video = fx.notifier.with_subtitle(subtitle::VIDEO);
        assert_eq!(video.len(), 2);
        assert!(video[1].message.contains("created successfully"));
    }

    #[tokio::test]
    async fn screenshots_taken_while_encoding_are_kept() {
        let fx = Fixture::new(EncoderBehavior::Writes(64));
        fx.session("20240101", &["090000", "090020"]);

        let handles = fx.builder().build_all();
        // the spawned job has not run yet on this runtime
        fx.session("20240101", &["090040"]);
        for handle in handles {
            assert!(matches!(handle.await.unwrap(), TimelapseOutcome::Created(_)));
        }

        assert_eq!(
            fx.store.list_screenshots("20240101").unwrap(),
            vec!["screenshot_20240101_090040.png"]
        );
        assert_eq!(fx.encoder.jobs()[0].frames.len(), 2);
        let video = fx.notifier.with_subtitle(subtitle::VIDEO);
        assert!(video[1].message.contains("were kept"));
    }

    #[tokio::test]
    async fn missing_output_keeps_the_screenshots() {
        let fx = Fixture::new(EncoderBehavior::WritesNothing);
        fx.session("20240101", &["090000"]);

        let outcomes = fx.build().await;

        assert!(matches!(outcomes[..], [TimelapseOutcome::Unverified(_)]));
        assert!(fx.store.session_dir("20240101").is_dir());
        assert_eq!(fx.notifier.with_subtitle(subtitle::WARNING).len(), 1);
    }

    #[tokio::test]
    async fn empty_output_keeps_the_screenshots() {
        let fx = Fixture::new(EncoderBehavior::Writes(0));
        fx.session("20240101", &["090000", "090020"]);

        let outcomes = fx.build().await;

        assert!(matches!(outcomes[..], [TimelapseOutcome::Unverified(_)]));
        assert_eq!(fx.store.list_screenshots("20240101").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn encoder_error_is_reported_and_screenshots_kept() {
        let fx = Fixture::new(EncoderBehavior::Exits);
        fx.session("20240101", &["090000"]);

        let outcomes = fx.build().await;

        assert!(matches!(outcomes[..], [TimelapseOutcome::Failed(_)]));
        assert!(fx.store.session_dir("20240101").is_dir());
        let errors = fx.notifier.with_subtitle(subtitle::ERROR);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Invalid data found"));
    }

    #[tokio::test]
    async fn folders_build_independently() {
        let fx = Fixture::new(EncoderBehavior::Writes(8));
        fx.session("20240101", &["090000", "170000"]);
        fx.session("20240102", &["080000"]);
        std::fs::create_dir_all(fx.store.session_dir("20240103")).unwrap();

        let outcomes = fx.build().await;

        let archive = fx.store.archive_root();
        assert_eq!(
            outcomes,
            vec![
                TimelapseOutcome::Created(archive.join("timelapse_20240101_090000_to_170000.mp4")),
                TimelapseOutcome::Created(archive.join("timelapse_20240102_080000_to_080000.mp4")),
            ]
        );
        assert_eq!(fx.encoder.jobs().len(), 2);
        assert_eq!(fx.store.session_dates().unwrap(), vec!["20240103"]);
        assert!(fx.notifier.with_subtitle(subtitle::NO_SCREENSHOTS).is_empty());
    }
}
