use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::constants::{ARCHIVE_DIR, DEFAULT_API_URL, DEFAULT_MODEL, SENTINEL_DIR, SESSION_DIR};

#[derive(Debug, Parser)]
#[command(
    name = "sentinel",
    version,
    about = "Periodic screen capture with distraction checks and timelapse archiving"
)]
pub struct Args {
    #[arg(long, value_name = "DIR", help = "Where the day folders of screenshots are kept")]
    pub session_root: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Where finished timelapse videos are written")]
    pub archive_root: Option<PathBuf>,

    #[arg(
        long,
        env = "OPENAI_API_KEY",
        hide_env_values = true,
        help = "Key for the vision classification service"
    )]
    pub api_key: Option<String>,

    #[arg(
        long,
        value_name = "URL",
        default_value = DEFAULT_API_URL,
        help = "Chat completions endpoint used for classification"
    )]
    pub api_url: String,

    #[arg(long, default_value = DEFAULT_MODEL, help = "Vision-capable model name")]
    pub model: String,

    #[arg(long, help = "Only log notifications instead of posting them to the desktop")]
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub session_root: PathBuf,
    pub archive_root: PathBuf,
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub desktop_notifications: bool,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        let base = || -> Result<PathBuf> {
            Ok(dirs::home_dir()
                .context("Could not determine the home directory")?
                .join(SENTINEL_DIR))
        };

        let session_root = match args.session_root {
            Some(dir) => dir,
            None => base()?.join(SESSION_DIR),
        };
        let archive_root = match args.archive_root {
            Some(dir) => dir,
            None => base()?.join(ARCHIVE_DIR),
        };

        Ok(Self {
            session_root,
            archive_root,
            api_key: args.api_key.filter(|key| !key.trim().is_empty()),
            api_url: args.api_url,
            model: args.model,
            desktop_notifications: !args.quiet,
        })
    }
}
