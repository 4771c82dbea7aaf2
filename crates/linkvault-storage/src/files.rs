//! Record file naming and atomic filesystem primitives.

use std::path::{Path, PathBuf};

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use linkvault_core::config::store::StoreConfig;
use linkvault_core::error::{AppError, ErrorKind};

/// Suffix appended to a record path while it is being written.
const TEMP_SUFFIX: &str = "tmp";

/// Bytes escaped in record file stems. `%` is included so the encoding stays
/// reversible, `.` so a stem never collides with an extension or `..`.
const STEM_ESCAPES: &AsciiSet = &CONTROLS
    .add(b'%')
    .add(b'.')
    .add(b'/')
    .add(b'\\')
    .add(b':')
    .add(b'*')
    .add(b'?')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'|');

/// The two artifact forms a category record can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordForm {
    /// Plaintext JSON.
    Plain,
    /// Encrypted envelope.
    Encrypted,
}

impl RecordForm {
    /// The other form.
    pub fn alternate(self) -> Self {
        match self {
            Self::Plain => Self::Encrypted,
            Self::Encrypted => Self::Plain,
        }
    }
}

/// Maps category names to record paths within the data directory.
#[derive(Debug, Clone)]
pub struct RecordFiles {
    root: PathBuf,
    plain_ext: String,
    encrypted_ext: String,
}

/// A record file discovered while scanning the data directory.
#[derive(Debug, Clone)]
pub struct DiscoveredRecord {
    /// File stem (encoded category name).
    pub stem: String,
    /// Form implied by the extension.
    pub form: RecordForm,
    /// Full path.
    pub path: PathBuf,
}

impl RecordFiles {
    /// Build the naming scheme from configuration.
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            root: PathBuf::from(&config.data_dir),
            plain_ext: config.plain_extension.trim_start_matches('.').to_string(),
            encrypted_ext: config.encrypted_extension.trim_start_matches('.').to_string(),
        }
    }

    /// Data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the record for `name` in the given form.
    pub fn path_for(&self, name: &str, form: RecordForm) -> PathBuf {
        let ext = match form {
            RecordForm::Plain => &self.plain_ext,
            RecordForm::Encrypted => &self.encrypted_ext,
        };
        self.root.join(format!("{}.{ext}", encode_file_stem(name)))
    }

    /// Classify a directory entry as a record file.
    pub fn classify(&self, path: &Path) -> Option<DiscoveredRecord> {
        let ext = path.extension()?.to_str()?;
        let form = if ext == self.plain_ext {
            RecordForm::Plain
        } else if ext == self.encrypted_ext {
            RecordForm::Encrypted
        } else {
            return None;
        };
        let stem = path.file_stem()?.to_str()?.to_string();
        Some(DiscoveredRecord {
            stem,
            form,
            path: path.to_path_buf(),
        })
    }

    /// Create the data directory if needed.
    pub async fn ensure_root(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create data directory: {}", self.root.display()),
                e,
            )
        })
    }
}

/// Whether a path is a leftover temporary file from an interrupted write.
pub fn is_temp_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(TEMP_SUFFIX)
}

/// Encode a category name as a file stem.
///
/// Distinct names always give distinct stems; [`decode_file_stem`] reverses
/// the mapping.
pub fn encode_file_stem(name: &str) -> String {
    utf8_percent_encode(name, STEM_ESCAPES).to_string()
}

/// Recover the category name from a file stem.
pub fn decode_file_stem(stem: &str) -> String {
    percent_decode_str(stem).decode_utf8_lossy().into_owned()
}

/// Write `data` to `path` via a temp file and rename, so a crash never
/// leaves a half-written record in place.
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create parent directory: {}", parent.display()),
                e,
            )
        })?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(format!(".{TEMP_SUFFIX}"));
    let tmp_path = PathBuf::from(tmp_name);

    let mut file = fs::File::create(&tmp_path).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to create temp file: {}", tmp_path.display()),
            e,
        )
    })?;
    file.write_all(data).await.map_err(|e| {
        AppError::with_source(ErrorKind::Storage, "Failed to write record", e)
    })?;
    file.sync_all()
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to flush record", e))?;
    drop(file);

    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to replace record: {}", path.display()),
            e,
        ));
    }

    debug!(path = %path.display(), bytes = data.len(), "Wrote record");
    Ok(())
}

/// Remove a file; absence is not an error. Returns whether a file was removed.
pub async fn remove_if_exists(path: &Path) -> Result<bool, AppError> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Removed record");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to delete record: {}", path.display()),
            e,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(root: &Path) -> RecordFiles {
        RecordFiles::new(&StoreConfig {
            data_dir: root.to_string_lossy().to_string(),
            ..StoreConfig::default()
        })
    }

    #[test]
    fn test_file_stem_encoding_is_one_to_one() {
        assert_eq!(encode_file_stem("Reading List"), "Reading List");
        assert_eq!(encode_file_stem("Work/Home"), "Work%2FHome");
        assert_eq!(encode_file_stem("Work_Home"), "Work_Home");
        assert_eq!(encode_file_stem(".."), "%2E%2E");
        assert_ne!(encode_file_stem("a%2Fb"), encode_file_stem("a/b"));

        for name in ["Work/Home", "a%2Fb", "Café: notes?", "x.json"] {
            assert_eq!(decode_file_stem(&encode_file_stem(name)), name);
        }
    }

    #[test]
    fn test_path_and_classify() {
        let dir = tempfile::tempdir().unwrap();
        let files = files(dir.path());
        let plain = files.path_for("Work", RecordForm::Plain);
        let enc = files.path_for("Work", RecordForm::Encrypted);
        assert!(plain.ends_with("Work.json"));
        assert!(enc.ends_with("Work.enc"));

        let found = files.classify(&enc).unwrap();
        assert_eq!(found.stem, "Work");
        assert_eq!(found.form, RecordForm::Encrypted);
        assert!(files.classify(&dir.path().join("notes.txt")).is_none());
    }

    #[tokio::test]
    async fn test_write_atomic_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/Work.json");
        write_atomic(&path, b"{}").await.unwrap();
        write_atomic(&path, b"{\"name\":\"x\"}").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"{\"name\":\"x\"}");
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| is_temp_file(&e.path()))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_remove_if_exists_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.json");
        std::fs::write(&path, b"{}").unwrap();
        assert!(remove_if_exists(&path).await.unwrap());
        assert!(!remove_if_exists(&path).await.unwrap());
    }
}
