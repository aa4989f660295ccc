use crate::validator::UploadPolicy;
use bytes::Bytes;
use ignore::Walk;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A file selected for upload, held in memory with its declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    name: String,
    mime_type: Option<String>,
    contents: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            contents: contents.into(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Reads a file from disk, declaring the MIME type the policy associates
    /// with its extension (if any).
    pub fn from_path(path: &Path, policy: &UploadPolicy) -> io::Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Invalid filename"))?
            .to_string();

        let contents = fs::read(path)?;
        let file = Self::new(name, contents);
        let mime = file
            .extension()
            .and_then(|ext| policy.mime_for_extension(&ext).map(str::to_string));

        Ok(match mime {
            Some(mime) => file.with_mime_type(mime),
            None => file,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn size_bytes(&self) -> u64 {
        self.contents.len() as u64
    }

    pub fn contents(&self) -> &Bytes {
        &self.contents
    }

    /// Lowercased extension without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_lowercase())
    }
}

/// Walks a folder (honoring `.gitignore` and hidden-file rules) and returns the
/// files whose extension the policy allows, in a stable order.
pub fn collect_folder(root: &Path, policy: &UploadPolicy) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in Walk::new(root) {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let allowed = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| policy.allows_extension(e))
                    .unwrap_or(false);
                if allowed {
                    files.push(path.to_path_buf());
                } else {
                    debug!(path = %path.display(), "Skipping file with unsupported extension");
                }
            }
            Err(e) => warn!(error = %e, "Failed to read folder entry"),
        }
    }

    files.sort();
    files
}

/// Loads every path, splitting successes from read failures.
pub fn load_files(paths: &[PathBuf], policy: &UploadPolicy) -> (Vec<UploadFile>, Vec<String>) {
    let mut loaded = Vec::new();
    let mut failures = Vec::new();

    for path in paths {
        match UploadFile::from_path(path, policy) {
            Ok(file) => loaded.push(file),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read file");
                failures.push(format!("Failed to read {}: {}", path.display(), e));
            }
        }
    }

    (loaded, failures)
}
