mod coordinator;
pub mod source;
mod types;

pub use coordinator::{ServerRejection, Submission, UploadCoordinator};
pub use source::{collect_folder, load_files, UploadFile};
pub use types::{
    BatchId, BatchSummary, FailureKind, TaskFailure, TaskId, TaskStatus, UploadEvent, UploadTask,
};
