//! Log File Sink
//!
//! Opens the timestamped file the server mirrors its tracing output into
//! when `LOG_DIR` is set.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// File name for a server started at `started`, e.g. `server_log_20240131_235959.txt`.
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("server_log_{}.txt", started.format("%Y%m%d_%H%M%S"))
}

/// Creates `dir` if needed and opens a fresh log file in it for appending.
pub fn open_log_file(dir: impl AsRef<Path>) -> io::Result<(PathBuf, File)> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let path = dir.join(log_file_name(Local::now()));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_log_file_name_format() {
        let started = Local.with_ymd_and_hms(2024, 1, 31, 23, 59, 58).unwrap();
        assert_eq!(log_file_name(started), "server_log_20240131_235958.txt");
    }

    #[test]
    fn test_open_log_file_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("logs").join("server");

        let (path, mut file) = open_log_file(&nested).unwrap();
        assert!(path.starts_with(&nested));
        writeln!(file, "first line").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "first line\n");
    }
}
