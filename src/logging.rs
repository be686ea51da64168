//! Logging setup for DeskPeek.
//!
//! Either a persistent file logger (one file per day, size-based rotation,
//! old files cleaned up) or `env_logger` when no log directory is given.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

use crate::error::{DeskPeekError, DeskPeekResult};

/// Maximum log file size before rotation (5MB)
const MAX_LOG_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum number of log files to keep
const MAX_LOG_FILES: usize = 5;

const LOG_PREFIX: &str = "deskpeek_";

/// Install the process-wide logger.
///
/// With `log_dir`, log lines go to `deskpeek_YYYY-MM-DD.log` in that
/// directory (and to stderr in debug builds). Without it, `env_logger` is
/// used. The level comes from `RUST_LOG` in both cases.
///
/// Calling this a second time returns an error.
pub fn init_logging(log_dir: Option<&Path>) -> DeskPeekResult<()> {
    let Some(dir) = log_dir else {
        return env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(default_level().as_str()),
        )
        .try_init()
        .map_err(|e| DeskPeekError::Logging(e.to_string()));
    };

    let level = level_from_env().unwrap_or_else(default_level);
    let logger = FileLogger::open(dir, level)?;
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(level);

    log::info!("[LOGGING] Logging system initialized");
    log::info!("[LOGGING] Log directory: {:?}", dir);
    Ok(())
}

fn level_from_env() -> Option<LevelFilter> {
    std::env::var("RUST_LOG").ok()?.parse().ok()
}

fn default_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

struct OpenLog {
    path: PathBuf,
    file: File,
}

/// `log` backend writing to a rotating file.
pub struct FileLogger {
    dir: PathBuf,
    level: LevelFilter,
    max_size: u64,
    current: Mutex<Option<OpenLog>>,
}

impl FileLogger {
    /// Create `dir` if needed, open today's file and drop surplus old files.
    pub fn open(dir: &Path, level: LevelFilter) -> DeskPeekResult<Self> {
        fs::create_dir_all(dir)?;
        let path = current_log_path(dir);
        let file = open_append(&path)?;
        cleanup_old_logs(dir);

        Ok(Self {
            dir: dir.to_path_buf(),
            level,
            max_size: MAX_LOG_SIZE,
            current: Mutex::new(Some(OpenLog { path, file })),
        })
    }

    #[cfg(test)]
    fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    fn write_line(&self, line: &str) {
        let mut current = self.current.lock();

        // New day, new file.
        let today = current_log_path(&self.dir);
        if current.as_ref().map(|c| c.path != today).unwrap_or(true) {
            *current = open_append(&today).ok().map(|file| OpenLog { path: today, file });
        }

        let Some(open) = current.as_mut() else {
            return;
        };
        let _ = open.file.write_all(line.as_bytes());
        let _ = open.file.flush();

        let size = open.file.metadata().map(|m| m.len()).unwrap_or(0);
        if size > self.max_size {
            let path = open.path.clone();
            // Windows refuses to rename a file that is still open.
            *current = None;
            *current = self.rotate(&path);
        }
    }

    /// Move the full file aside under a timestamped name and start over.
    fn rotate(&self, path: &Path) -> Option<OpenLog> {
        let timestamp = Local::now().format("%Y-%m-%d_%H%M%S%.3f");
        let rotated = self.dir.join(format!("{}{}.log", LOG_PREFIX, timestamp));
        let _ = fs::rename(path, &rotated);

        let file = open_append(path).ok()?;
        cleanup_old_logs(&self.dir);
        Some(OpenLog {
            path: path.to_path_buf(),
            file,
        })
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(record);
        self.write_line(&line);

        #[cfg(debug_assertions)]
        eprint!("{}", line);
    }

    fn flush(&self) {
        if let Some(open) = self.current.lock().as_mut() {
            let _ = open.file.flush();
        }
    }
}

fn format_line(record: &Record) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    format!(
        "[{}] [{}] [{}] {}\n",
        timestamp,
        record.level(),
        record.target(),
        record.args()
    )
}

/// Get the path for the current log file (one per day)
fn current_log_path(log_dir: &Path) -> PathBuf {
    let date = Local::now().format("%Y-%m-%d");
    log_dir.join(format!("{}{}.log", LOG_PREFIX, date))
}

fn open_append(path: &Path) -> DeskPeekResult<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Keep only the most recent MAX_LOG_FILES of our log files.
fn cleanup_old_logs(log_dir: &Path) {
    let Ok(entries) = fs::read_dir(log_dir) else {
        return;
    };

    let mut log_files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.starts_with(LOG_PREFIX) && name.ends_with(".log")
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| {
        let a_time = a.metadata().and_then(|m| m.modified()).ok();
        let b_time = b.metadata().and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time).then_with(|| b.file_name().cmp(&a.file_name()))
    });

    for file in log_files.into_iter().skip(MAX_LOG_FILES) {
        let _ = fs::remove_file(file.path());
    }
}
