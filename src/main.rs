use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::sync::Arc;
use tokio::io::BufReader;

mod capture;
mod classifier;
mod config;
mod constants;
mod monitor;
mod notify;
mod screen;
mod sentinel;
mod shell;
mod state;
mod store;
mod timelapse;
mod timer;
mod types;

#[cfg(test)]
mod testing;

use classifier::VisionClassifier;
use config::{Args, Config};
use notify::{DesktopNotifier, Notifier};
use screen::X11Grabber;
use sentinel::Sentinel;
use store::ImageStore;
use timelapse::FfmpegEncoder;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_args(Args::parse())?;

    let store = ImageStore::new(config.session_root.clone(), config.archive_root.clone());
    store
        .ensure_roots()
        .context("Failed to create sentinel directories")?;
    info!(
        "Screenshots in {}, timelapses in {}",
        store.session_root().display(),
        store.archive_root().display()
    );

    if config.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; every distraction check will report focused");
    }

    let notifier: Arc<dyn Notifier> = Arc::new(DesktopNotifier::new(config.desktop_notifications));
    let classifier = VisionClassifier::new(
        config.api_url,
        config.api_key,
        config.model,
        notifier.clone(),
    )?;

    let sentinel = Sentinel::new(
        store,
        Arc::new(X11Grabber),
        Arc::new(classifier),
        Arc::new(FfmpegEncoder),
        notifier,
    );

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        res = shell::run(&sentinel, stdin) => res?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            sentinel.stop();
        }
    }

    Ok(())
}
