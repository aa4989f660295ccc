use crate::error::{CoordinatorError, TransportError};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(Uuid);

impl TaskId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(Uuid);

impl BatchId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Http { status: u16 },
    Decode,
    InvalidRequest,
    /// The server acknowledged the upload but refused it (`success: false`).
    Rejected,
    /// The server reported that processing the payload failed.
    Processing,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TaskFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<TransportError> for TaskFailure {
    fn from(err: TransportError) -> Self {
        let kind = match &err {
            TransportError::Network(_) => FailureKind::Network,
            TransportError::Http { status, .. } => FailureKind::Http { status: *status },
            TransportError::Decode(_) => FailureKind::Decode,
            TransportError::InvalidRequest(_) => FailureKind::InvalidRequest,
        };
        let message = match &err {
            TransportError::Http { message, .. } if !message.is_empty() => {
                format!("Upload failed: {} ({})", err, message)
            }
            _ => format!("Upload failed: {}", err),
        };
        Self { kind, message }
    }
}

/// Where a task is in its journey. Moves forward only:
/// `Pending -> Uploading -> Processing -> Completed`, with `Error` reachable
/// from any non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Uploading,
    Processing,
    Completed,
    Error(TaskFailure),
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Uploading => "uploading",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Error(_) => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Error(_))
    }

    /// Network work is in flight; the task can be neither removed nor abandoned.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Uploading | TaskStatus::Processing)
    }

    fn can_advance_to(&self, next: &TaskStatus) -> bool {
        match (self, next) {
            (TaskStatus::Pending, TaskStatus::Uploading) => true,
            (TaskStatus::Uploading, TaskStatus::Processing) => true,
            (TaskStatus::Processing, TaskStatus::Completed) => true,
            (current, TaskStatus::Error(_)) => !current.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of one file's journey through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    id: TaskId,
    batch_id: BatchId,
    file_name: String,
    size_bytes: u64,
    status: TaskStatus,
    progress: u8,
    upload_id: Option<String>,
    processed_records: Option<u64>,
}

impl UploadTask {
    pub(crate) fn new(batch_id: BatchId, file_name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            id: TaskId::new(),
            batch_id,
            file_name: file_name.into(),
            size_bytes,
            status: TaskStatus::Pending,
            progress: 0,
            upload_id: None,
            processed_records: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn status(&self) -> &TaskStatus {
        &self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Server-side id assigned when the upload was acknowledged.
    pub fn upload_id(&self) -> Option<&str> {
        self.upload_id.as_deref()
    }

    pub fn processed_records(&self) -> Option<u64> {
        self.processed_records
    }

    pub fn error(&self) -> Option<&TaskFailure> {
        match &self.status {
            TaskStatus::Error(failure) => Some(failure),
            _ => None,
        }
    }

    pub(crate) fn transition(&mut self, next: TaskStatus) -> Result<(), CoordinatorError> {
        if !self.status.can_advance_to(&next) {
            return Err(CoordinatorError::InvalidTransition {
                id: self.id.to_string(),
                from: self.status.label(),
                to: next.label(),
            });
        }
        if matches!(next, TaskStatus::Processing | TaskStatus::Completed) {
            self.progress = 100;
        }
        self.status = next;
        Ok(())
    }

    /// Records byte progress while uploading. Returns whether anything changed.
    pub(crate) fn record_progress(&mut self, percent: u8) -> bool {
        if self.status != TaskStatus::Uploading {
            return false;
        }
        let percent = percent.min(100);
        if percent <= self.progress {
            return false;
        }
        self.progress = percent;
        true
    }

    /// The server accepted the bytes: moves to `Processing` and records the
    /// server-side id. A refused transition leaves the task untouched.
    pub(crate) fn acknowledge(&mut self, upload_id: String) -> Result<(), CoordinatorError> {
        self.transition(TaskStatus::Processing)?;
        self.upload_id = Some(upload_id);
        Ok(())
    }

    pub(crate) fn set_processed_records(&mut self, records: Option<u64>) {
        if !self.status.is_terminal() && records.is_some() {
            self.processed_records = records;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub batch_id: BatchId,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

/// What subscribers of the coordinator observe, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    TaskUpdated(UploadTask),
    TaskRemoved(TaskId),
    /// Every task of the batch is terminal. Sent exactly once per batch.
    BatchComplete(BatchSummary),
    /// The upload surface was closed and all batch state discarded.
    Closed,
}
