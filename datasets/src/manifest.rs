//! Validation manifest reader
//!
//! The manifest lists one `"<file_name> <label>"` pair per line. Images live
//! under `<data_dir>/val/<file_name>`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{DatasetError, DatasetResult};

/// Manifest file name inside the data directory
pub const MANIFEST_FILE: &str = "validation_label.txt";

/// Image subdirectory inside the data directory
pub const IMAGE_DIR: &str = "val";

/// One manifest line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Image file name relative to the image directory
    pub file_name: String,
    /// Ground-truth class index
    pub label: usize,
}

impl ManifestEntry {
    /// Full image path under `data_dir`
    pub fn image_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(IMAGE_DIR).join(&self.file_name)
    }
}

/// Parse one manifest line
fn parse_line(line_no: usize, line: &str) -> DatasetResult<ManifestEntry> {
    let mut fields = line.split_whitespace();

    let file_name = fields.next().ok_or_else(|| DatasetError::Manifest {
        line: line_no,
        reason: "missing file name".into(),
    })?;
    let label = fields.next().ok_or_else(|| DatasetError::Manifest {
        line: line_no,
        reason: "missing label".into(),
    })?;
    let label = label.parse().map_err(|_| DatasetError::Manifest {
        line: line_no,
        reason: format!("invalid label {:?}", label),
    })?;

    Ok(ManifestEntry {
        file_name: file_name.to_string(),
        label,
    })
}

/// Read at most `limit` entries from the manifest at `path`
///
/// Blank lines are skipped. Lines past `limit` are never parsed.
pub fn read_manifest(path: &Path, limit: usize) -> DatasetResult<Vec<ManifestEntry>> {
    let reader = BufReader::new(File::open(path)?);

    let mut entries = Vec::with_capacity(limit.min(1024));
    for (i, line) in reader.lines().enumerate() {
        if entries.len() == limit {
            break;
        }
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(parse_line(i + 1, &line)?);
    }

    if entries.is_empty() {
        return Err(DatasetError::EmptyManifest(path.to_path_buf()));
    }

    tracing::debug!(path = %path.display(), entries = entries.len(), "Read manifest");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn manifest(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_all_entries() {
        let file = manifest("ILSVRC2012_val_00000001.JPEG 65\nILSVRC2012_val_00000002.JPEG 970\n");
        let entries = read_manifest(file.path(), 100).unwrap();

        assert_eq!(
            entries,
            vec![
                ManifestEntry {
                    file_name: "ILSVRC2012_val_00000001.JPEG".into(),
                    label: 65,
                },
                ManifestEntry {
                    file_name: "ILSVRC2012_val_00000002.JPEG".into(),
                    label: 970,
                },
            ]
        );
    }

    #[test]
    fn test_limit_stops_before_bad_lines() {
        let file = manifest("a.JPEG 1\nb.JPEG 2\nthis line is garbage\n");
        let entries = read_manifest(file.path(), 2).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let file = manifest("a.JPEG 1\r\n\r\nb.JPEG 2\r\n");
        let entries = read_manifest(file.path(), 10).unwrap();
        assert_eq!(entries[1].label, 2);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_invalid_label() {
        let file = manifest("a.JPEG 1\nb.JPEG cat\n");
        match read_manifest(file.path(), 10) {
            Err(DatasetError::Manifest { line, reason }) => {
                assert_eq!(line, 2);
                assert!(reason.contains("cat"));
            }
            other => panic!("expected manifest error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_label() {
        let file = manifest("a.JPEG\n");
        assert!(matches!(
            read_manifest(file.path(), 10),
            Err(DatasetError::Manifest { line: 1, .. })
        ));
    }

    #[test]
    fn test_empty_manifest() {
        let file = manifest("\n\n");
        assert!(matches!(
            read_manifest(file.path(), 10),
            Err(DatasetError::EmptyManifest(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = read_manifest(Path::new("/nonexistent/validation_label.txt"), 10);
        assert!(matches!(result, Err(DatasetError::Io(_))));
    }

    #[test]
    fn test_image_path() {
        let entry = ManifestEntry {
            file_name: "x.JPEG".into(),
            label: 0,
        };
        assert_eq!(
            entry.image_path(Path::new("/data")),
            PathBuf::from("/data/val/x.JPEG")
        );
    }
}
