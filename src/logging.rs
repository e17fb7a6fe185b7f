// src/logging.rs

use color_eyre::eyre::Result;
use directories::ProjectDirs;
use lazy_static::lazy_static;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use time::macros::format_description;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    self, fmt::time::LocalTime, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", PROJECT_NAME.clone());
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "linkwatch", env!("CARGO_PKG_NAME"))
}

pub fn get_data_dir() -> PathBuf {
    if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn get_log_path() -> PathBuf {
    get_data_dir().join(LOG_FILE.clone())
}

/// Initializes file-based logging using the tracing subscriber.
///
/// The terminal belongs to the UI, so every event goes to the log file only.
pub fn initialize_logging() -> Result<()> {
    let directory = get_data_dir();
    std::fs::create_dir_all(&directory)?;
    let log_file = std::fs::File::create(get_log_path())?;

    let file_log_level = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV.clone()))
        .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")));

    let timer = LocalTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ));

    let file_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_timer(timer)
        .with_target(false)
        .with_ansi(false)
        .with_filter(EnvFilter::new(file_log_level));

    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .init();

    Ok(())
}

/// Keeps the last lines of a log file in memory and only reads what was
/// appended since the previous refresh.
#[derive(Debug)]
pub struct LogTail {
    path: PathBuf,
    max_lines: usize,
    offset: u64,
    partial: String,
    lines: VecDeque<String>,
}

impl LogTail {
    pub fn new(path: impl Into<PathBuf>, max_lines: usize) -> Self {
        Self {
            path: path.into(),
            max_lines,
            offset: 0,
            partial: String::new(),
            lines: VecDeque::with_capacity(max_lines),
        }
    }

    /// Tail of this application's own log file.
    pub fn for_log_file(max_lines: usize) -> Self {
        Self::new(get_log_path(), max_lines)
    }

    /// Lines currently held, oldest first.
    pub fn lines(&self) -> &VecDeque<String> {
        &self.lines
    }

    /// Reads whatever was appended since the last call.
    ///
    /// # Returns
    /// `true` when the held lines changed. A missing file leaves them as they
    /// are; a file that shrank (rotated or recreated) is read from the start.
    pub fn refresh(&mut self) -> bool {
        let Ok(mut file) = File::open(&self.path) else {
            return false;
        };
        let Ok(len) = file.metadata().map(|m| m.len()) else {
            return false;
        };

        if len < self.offset {
            self.offset = 0;
            self.partial.clear();
            self.lines.clear();
        }
        if len == self.offset {
            return false;
        }

        let mut appended = Vec::new();
        if file.seek(SeekFrom::Start(self.offset)).is_err()
            || file.take(len - self.offset).read_to_end(&mut appended).is_err()
        {
            return false;
        }
        self.offset += appended.len() as u64;
        self.partial.push_str(&String::from_utf8_lossy(&appended));

        // Only complete lines are published; a trailing fragment waits for the rest.
        let mut changed = false;
        while let Some(end) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=end).collect();
            self.push(line.trim_end_matches(['\r', '\n']).to_string());
            changed = true;
        }
        changed
    }

    fn push(&mut self, line: String) {
        if self.max_lines == 0 {
            return;
        }
        if self.lines.len() == self.max_lines {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_log() -> PathBuf {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        std::env::temp_dir().join(format!("linkwatch-tail-{}-{nanos}.log", std::process::id()))
    }

    fn append(path: &PathBuf, text: &str) {
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn only_appended_lines_are_read_and_capacity_holds() {
        let path = scratch_log();
        let mut tail = LogTail::new(&path, 2);
        assert!(!tail.refresh());

        append(&path, "one\ntwo\n");
        assert!(tail.refresh());
        assert!(!tail.refresh());

        append(&path, "three\nfou");
        assert!(tail.refresh());
        assert_eq!(tail.lines(), &VecDeque::from(["two".to_string(), "three".to_string()]));

        append(&path, "r\n");
        assert!(tail.refresh());
        assert_eq!(tail.lines().back().map(String::as_str), Some("four"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn recreated_file_is_read_from_the_start() {
        let path = scratch_log();
        let mut tail = LogTail::new(&path, 10);
        append(&path, "old line that is rather long\n");
        tail.refresh();

        std::fs::write(&path, "new\n").unwrap();
        assert!(tail.refresh());
        assert_eq!(tail.lines(), &VecDeque::from(["new".to_string()]));

        std::fs::remove_file(path).ok();
    }
}
