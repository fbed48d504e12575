//! Optional per-prediction log

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// Append-only log of `"<example id> <predicted label>"` lines
///
/// Shared by completion callbacks through an `Arc`. Write failures are
/// logged and do not affect the run. Buffered lines are flushed by
/// [`PredictionLog::flush`] and again when the log is dropped.
pub struct PredictionLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl PredictionLog {
    /// Open `path` for appending, creating it if needed
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one prediction
    pub fn record(&self, example_id: &str, predicted: usize) {
        let mut writer = self.writer.lock();
        if let Err(e) = writeln!(writer, "{} {}", example_id, predicted) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to write prediction");
        }
    }

    /// Flush buffered lines to disk
    pub fn flush(&self) -> std::io::Result<()> {
        self.writer.lock().flush()
    }
}

impl Drop for PredictionLog {
    fn drop(&mut self) {
        if let Err(e) = self.writer.get_mut().flush() {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to flush prediction log");
        }
    }
}

impl std::fmt::Debug for PredictionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionLog")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_prediction_log_appends_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("predictions.txt");

        let log = PredictionLog::open(&path).unwrap();
        log.record("a.JPEG", 3);
        log.record("b.JPEG", 10);
        log.flush().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "a.JPEG 3\nb.JPEG 10\n");
    }

    #[test]
    fn test_prediction_log_flushes_on_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("predictions.txt");

        {
            let log = PredictionLog::open(&path).unwrap();
            log.record("only.JPEG", 1);
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "only.JPEG 1\n");
    }

    #[test]
    fn test_prediction_log_appends_across_runs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("predictions.txt");

        PredictionLog::open(&path).unwrap().record("first", 1);
        PredictionLog::open(&path).unwrap().record("second", 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first 1\nsecond 2\n");
    }

    #[test]
    fn test_prediction_log_concurrent_writers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("predictions.txt");
        let log = Arc::new(PredictionLog::open(&path).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        log.record(&format!("t{}-{}", t, i), i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        drop(log);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 100);
    }
}
