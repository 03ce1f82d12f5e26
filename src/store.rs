// Date-partitioned screenshot storage:
// <session_root>/<YYYYMMDD>/screenshot_<YYYYMMDD_HHMMSS>.png
// A second screenshot within the same second becomes
// screenshot_<YYYYMMDD_HHMMSS>_01.png, which sorts after the first.

use chrono::{DateTime, Local};
use image::{ImageFormat, RgbaImage};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::constants::{DATE_FORMAT, SCREENSHOT_EXT, SCREENSHOT_PREFIX, TIMESTAMP_FORMAT};

const MAX_SAME_SECOND: u32 = 99;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create screenshot file {}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write screenshot {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to read directory {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove {}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// Date folder name and screenshot timestamp taken from one clock reading
pub fn stamp(now: &DateTime<Local>) -> (String, String) {
    (
        now.format(DATE_FORMAT).to_string(),
        now.format(TIMESTAMP_FORMAT).to_string(),
    )
}

pub fn today() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

pub fn screenshot_file_name(timestamp: &str) -> String {
    format!("{SCREENSHOT_PREFIX}{timestamp}{SCREENSHOT_EXT}")
}

// `YYYYMMDD_HHMMSS` (plus any same-second suffix) from a screenshot file name
pub fn screenshot_timestamp(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(SCREENSHOT_PREFIX)?
        .strip_suffix(SCREENSHOT_EXT)
}

// Just the `HHMMSS` part of a screenshot file name
pub fn screenshot_time(file_name: &str) -> Option<&str> {
    screenshot_timestamp(file_name)?.split('_').nth(1)
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    session_root: PathBuf,
    archive_root: PathBuf,
}

impl ImageStore {
    pub fn new(session_root: PathBuf, archive_root: PathBuf) -> Self {
        Self {
            session_root,
            archive_root,
        }
    }

    pub fn session_root(&self) -> &Path {
        &self.session_root
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    pub fn ensure_roots(&self) -> Result<(), StoreError> {
        for root in [&self.session_root, &self.archive_root] {
            create_dir(root)?;
        }
        Ok(())
    }

    pub fn session_dir(&self, date: &str) -> PathBuf {
        self.session_root.join(date)
    }

    pub fn ensure_session_dir(&self, date: &str) -> Result<PathBuf, StoreError> {
        let dir = self.session_dir(date);
        create_dir(&dir)?;
        Ok(dir)
    }

    pub fn write_screenshot(
        &self,
        image: &RgbaImage,
        date: &str,
        timestamp: &str,
    ) -> Result<PathBuf, StoreError> {
        let dir = self.ensure_session_dir(date)?;
        let (path, file) = reserve_screenshot(&dir, timestamp)?;
        let write_err = |source| StoreError::Write {
            path: path.clone(),
            source,
        };

        let mut writer = BufWriter::new(file);
        image
            .write_to(&mut writer, ImageFormat::Png)
            .map_err(write_err)?;
        writer
            .flush()
            .map_err(|e| write_err(image::ImageError::IoError(e)))?;

        Ok(path)
    }

    // Screenshot file names for `date`, oldest first. A missing folder is empty.
    pub fn list_screenshots(&self, date: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.session_dir(date);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = read_dir(&dir)?
            .into_iter()
            .filter(|(_, is_dir)| !is_dir)
            .map(|(name, _)| name)
            .filter(|name| screenshot_timestamp(name).is_some())
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn latest_screenshot(&self, date: &str) -> Result<Option<PathBuf>, StoreError> {
        Ok(self
            .list_screenshots(date)?
            .pop()
            .map(|name| self.session_dir(date).join(name)))
    }

    // Names of all session folders under the session root, sorted.
    pub fn session_dates(&self) -> Result<Vec<String>, StoreError> {
        if !self.session_root.is_dir() {
            return Ok(Vec::new());
        }

        let mut dates: Vec<String> = read_dir(&self.session_root)?
            .into_iter()
            .filter(|(_, is_dir)| *is_dir)
            .map(|(name, _)| name)
            .collect();
        dates.sort();
        Ok(dates)
    }

    pub fn timelapse_path(&self, file_name: &str) -> PathBuf {
        self.archive_root.join(file_name)
    }

    // Deletes `frames`, then the whole folder once no screenshot is left in
    // it. Screenshots written after `frames` was listed survive. Returns
    // whether the folder went away.
    pub fn remove_session(&self, date: &str, frames: &[PathBuf]) -> Result<bool, StoreError> {
        for frame in frames {
            match fs::remove_file(frame) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(StoreError::Remove {
                        path: frame.clone(),
                        source,
                    })
                }
            }
        }

        if !self.list_screenshots(date)?.is_empty() {
            return Ok(false);
        }

        let dir = self.session_dir(date);
        fs::remove_dir_all(&dir).map_err(|source| StoreError::Remove { path: dir, source })?;
        Ok(true)
    }
}

// Claims a fresh file name so a screenshot never replaces another one
fn reserve_screenshot(dir: &Path, timestamp: &str) -> Result<(PathBuf, fs::File), StoreError> {
    let mut suffix = 0u32;
    loop {
        let stem = match suffix {
            0 => timestamp.to_string(),
            n => format!("{timestamp}_{n:02}"),
        };
        let path = dir.join(screenshot_file_name(&stem));

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && suffix < MAX_SAME_SECOND => {
                suffix += 1
            }
            Err(source) => return Err(StoreError::Create { path, source }),
        }
    }
}

fn create_dir(path: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(path).map_err(|source| StoreError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

// (file name, is directory) for every entry with a UTF-8 name
fn read_dir(dir: &Path) -> Result<Vec<(String, bool)>, StoreError> {
    let read_err = |source| StoreError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let is_dir = entry.file_type().map_err(read_err)?.is_dir();
        if let Ok(name) = entry.file_name().into_string() {
            entries.push((name, is_dir));
        }
    }
    Ok(entries)
}
