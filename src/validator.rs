//! Client-side acceptance checks run before anything touches the network.

use crate::upload::UploadFile;
use crate::utils::FileSizeUtils;
use std::collections::BTreeMap;
use std::fmt;

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS_MIME: &str = "application/vnd.ms-excel";
pub const CSV_MIME: &str = "text/csv";

/// What a single selection is allowed to contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// MIME type -> extensions accepted for it, each with a leading dot (`.xlsx`).
    pub allowed_types: BTreeMap<String, Vec<String>>,
    pub max_file_size_bytes: u64,
    pub max_files_per_batch: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        let mut allowed_types = BTreeMap::new();
        allowed_types.insert(XLSX_MIME.to_string(), vec![".xlsx".to_string()]);
        allowed_types.insert(XLS_MIME.to_string(), vec![".xls".to_string()]);
        allowed_types.insert(CSV_MIME.to_string(), vec![".csv".to_string()]);

        Self {
            allowed_types,
            max_file_size_bytes: 10 * 1024 * 1024,
            max_files_per_batch: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    UnsupportedType { extension: Option<String> },
    TooLarge { size_bytes: u64, max_bytes: u64 },
    TooManyFiles { max: usize },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::UnsupportedType { .. } => write!(f, "unsupported type"),
            RejectReason::TooLarge {
                size_bytes,
                max_bytes,
            } => write!(
                f,
                "file is too large ({}, limit {})",
                FileSizeUtils::format_size(*size_bytes),
                FileSizeUtils::format_size(*max_bytes)
            ),
            RejectReason::TooManyFiles { max } => {
                write!(f, "too many files (at most {} per upload)", max)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub file: UploadFile,
    pub reasons: Vec<RejectReason>,
}

impl Rejection {
    pub fn message(&self) -> String {
        let reasons: Vec<String> = self.reasons.iter().map(|r| r.to_string()).collect();
        format!("{}: {}", self.file.name(), reasons.join(", "))
    }
}

/// Partition of one selection. Both lists keep selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub accepted: Vec<UploadFile>,
    pub rejected: Vec<Rejection>,
}

fn normalize_extension(ext: &str) -> String {
    format!(".{}", ext.trim_start_matches('.').to_lowercase())
}

impl UploadPolicy {
    pub fn allows_extension(&self, ext: &str) -> bool {
        let ext = normalize_extension(ext);
        self.allowed_types
            .values()
            .flatten()
            .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
    }

    pub fn mime_for_extension(&self, ext: &str) -> Option<&str> {
        let ext = normalize_extension(ext);
        self.allowed_types
            .iter()
            .find(|(_, exts)| exts.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
            .map(|(mime, _)| mime.as_str())
    }

    /// Allowed extensions without the leading dot, for file dialog filters.
    pub fn extensions(&self) -> Vec<String> {
        let mut exts: Vec<String> = self
            .allowed_types
            .values()
            .flatten()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect();
        exts.sort();
        exts.dedup();
        exts
    }

    /// The extension must be on the allow-list. A declared MIME type that the
    /// policy knows must also list that extension; unknown or generic MIME
    /// types (`application/octet-stream`, empty) defer to the extension.
    pub fn accepts_type(&self, file: &UploadFile) -> bool {
        let Some(ext) = file.extension() else {
            return false;
        };
        if !self.allows_extension(&ext) {
            return false;
        }

        match file.mime_type().filter(|m| !m.is_empty()) {
            Some(mime) => match self.allowed_types.get(mime) {
                Some(exts) => {
                    let ext = normalize_extension(&ext);
                    exts.iter().any(|e| e.eq_ignore_ascii_case(&ext))
                }
                None => true,
            },
            None => true,
        }
    }

    /// Splits a selection into accepted and rejected files. Pure: the same input
    /// always yields the same partition. Batch slots go to the earliest files
    /// that pass the per-file checks.
    pub fn validate(&self, files: &[UploadFile]) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();

        for file in files {
            let mut reasons = Vec::new();

            if !self.accepts_type(file) {
                reasons.push(RejectReason::UnsupportedType {
                    extension: file.extension(),
                });
            }
            if file.size_bytes() > self.max_file_size_bytes {
                reasons.push(RejectReason::TooLarge {
                    size_bytes: file.size_bytes(),
                    max_bytes: self.max_file_size_bytes,
                });
            }
            if reasons.is_empty() && outcome.accepted.len() >= self.max_files_per_batch {
                reasons.push(RejectReason::TooManyFiles {
                    max: self.max_files_per_batch,
                });
            }

            if reasons.is_empty() {
                outcome.accepted.push(file.clone());
            } else {
                outcome.rejected.push(Rejection {
                    file: file.clone(),
                    reasons,
                });
            }
        }

        outcome
    }
}
