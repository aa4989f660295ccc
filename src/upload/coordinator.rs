use crate::api::{DeliveryApi, RemoteUploadState, UploadStatusReport, ValidationResult};
use crate::config::UploadSettings;
use crate::error::{CoordinatorError, TransportError};
use crate::transport::MultipartUpload;
use crate::upload::source::UploadFile;
use crate::upload::types::{
    BatchId, BatchSummary, FailureKind, TaskFailure, TaskId, TaskStatus, UploadEvent, UploadTask,
};
use crate::validator::{Rejection, UploadPolicy};
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A file the server's structural pre-check refused. No task is created for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRejection {
    pub file_name: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Result of handing one selection to the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    /// `None` when nothing in the selection was accepted.
    pub batch_id: Option<BatchId>,
    pub task_ids: Vec<TaskId>,
    pub rejected: Vec<Rejection>,
    pub server_rejected: Vec<ServerRejection>,
}

struct Batch {
    id: BatchId,
    task_ids: Vec<TaskId>,
    signalled: bool,
}

struct Entry {
    task: UploadTask,
    file: UploadFile,
    token: CancellationToken,
}

struct CoordinatorState {
    entries: Vec<Entry>,
    batches: Vec<Batch>,
    root: CancellationToken,
    /// Bumped by every close; a submission started before it must not enqueue.
    session: u64,
    subscribers: Vec<mpsc::UnboundedSender<UploadEvent>>,
}

impl CoordinatorState {
    fn emit(&mut self, event: UploadEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    fn position(&self, id: TaskId) -> Option<usize> {
        self.entries.iter().position(|e| e.task.id() == id)
    }

    /// Signals `BatchComplete` once, the moment every remaining task of the
    /// batch is terminal.
    fn check_batch(&mut self, batch_id: BatchId) {
        let summary = {
            let Some(batch) = self.batches.iter().find(|b| b.id == batch_id) else {
                return;
            };
            if batch.signalled || batch.task_ids.is_empty() {
                return;
            }

            let mut summary = BatchSummary {
                batch_id,
                total: batch.task_ids.len(),
                completed: 0,
                failed: 0,
            };
            for id in &batch.task_ids {
                let status = self
                    .entries
                    .iter()
                    .find(|e| e.task.id() == *id)
                    .map(|e| e.task.status());
                match status {
                    Some(TaskStatus::Completed) => summary.completed += 1,
                    Some(TaskStatus::Error(_)) => summary.failed += 1,
                    _ => return,
                }
            }
            summary
        };

        if let Some(batch) = self.batches.iter_mut().find(|b| b.id == batch_id) {
            batch.signalled = true;
        }
        info!(
            batch_id = %batch_id,
            total = summary.total,
            completed = summary.completed,
            failed = summary.failed,
            "Upload batch complete"
        );
        self.emit(UploadEvent::BatchComplete(summary));
    }
}

struct Shared {
    api: DeliveryApi,
    policy: UploadPolicy,
    settings: UploadSettings,
    runtime: Handle,
    slots: Arc<Semaphore>,
    state: Mutex<CoordinatorState>,
}

impl Shared {
    /// Applies `f` to one task under the state lock. Every mutation of a task
    /// goes through here, so transitions for the same task never interleave
    /// and subscribers see them in the order they were applied.
    fn apply<F>(&self, id: TaskId, f: F) -> Result<(), CoordinatorError>
    where
        F: FnOnce(&mut UploadTask) -> Result<bool, CoordinatorError>,
    {
        let mut state = self.state.lock();
        let entry = state
            .entries
            .iter_mut()
            .find(|e| e.task.id() == id)
            .ok_or_else(|| CoordinatorError::UnknownTask(id.to_string()))?;

        if !f(&mut entry.task)? {
            return Ok(());
        }

        let snapshot = entry.task.clone();
        let batch_id = snapshot.batch_id();
        let terminal = snapshot.status().is_terminal();
        state.emit(UploadEvent::TaskUpdated(snapshot));
        if terminal {
            state.check_batch(batch_id);
        }
        Ok(())
    }

    fn advance(&self, id: TaskId, next: TaskStatus) -> Result<(), CoordinatorError> {
        self.apply(id, |task| task.transition(next).map(|_| true))
    }

    fn record_progress(&self, id: TaskId, percent: u8) {
        let _ = self.apply(id, |task| Ok(task.record_progress(percent)));
    }

    fn fail(&self, id: TaskId, failure: TaskFailure) {
        warn!(task_id = %id, kind = ?failure.kind, error = %failure.message, "Upload task failed");
        if let Err(e) = self.advance(id, TaskStatus::Error(failure)) {
            debug!(task_id = %id, error = %e, "Failure arrived for a task that can no longer fail");
        }
    }

    /// Starts the batch's tasks in selection order, each once a worker slot
    /// is free. Tasks waiting for a slot stay `pending`.
    async fn dispatch(self: Arc<Self>, jobs: Vec<(TaskId, UploadFile, CancellationToken)>) {
        for (id, file, token) in jobs {
            let permit = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                permit = Arc::clone(&self.slots).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                debug!(task_id = %id, "Pending upload dropped before it started");
                continue;
            };
            if token.is_cancelled() {
                continue;
            }
            if let Err(e) = self.advance(id, TaskStatus::Uploading) {
                debug!(task_id = %id, error = %e, "Upload no longer wanted");
                continue;
            }

            let shared = Arc::clone(&self);
            self.runtime.spawn(async move {
                shared.drive(id, file).await;
                drop(permit);
            });
        }
    }

    async fn drive(&self, id: TaskId, file: UploadFile) {
        let file_name = file.name().to_string();
        debug!(task_id = %id, file = %file_name, "Uploading");

        let MultipartUpload {
            mut progress,
            mut outcome,
        } = self.api.upload_schedule(file);

        let result = loop {
            tokio::select! {
                biased;
                Some(percent) = progress.recv() => self.record_progress(id, percent),
                result = &mut outcome => break result,
            }
        };
        while let Ok(percent) = progress.try_recv() {
            self.record_progress(id, percent);
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => return self.fail(id, TaskFailure::from(e)),
        };

        if !response.success {
            let mut message = if response.message.is_empty() {
                "Upload rejected by server".to_string()
            } else {
                response.message.clone()
            };
            if let Some(errors) = response.errors.as_ref().filter(|e| !e.is_empty()) {
                message = format!("{}: {}", message, errors.join("; "));
            }
            return self.fail(id, TaskFailure::new(FailureKind::Rejected, message));
        }

        let upload_id = response.upload_id.clone();
        let acknowledged = {
            let upload_id = upload_id.clone();
            self.apply(id, move |task| task.acknowledge(upload_id).map(|_| true))
        };
        if acknowledged.is_err() {
            return;
        }
        info!(task_id = %id, upload_id = %upload_id, file = %file_name, "Upload acknowledged, processing");

        let processed_records = if self.settings.status_polling {
            let wait = tokio::time::timeout(
                self.settings.processing_timeout,
                self.await_processed(&upload_id),
            );
            match wait.await {
                Ok(Ok(report)) => report.processed_records.or(response.processed_records),
                Ok(Err(failure)) => return self.fail(id, failure),
                Err(_) => {
                    let message = format!(
                        "Processing did not finish within {}s",
                        self.settings.processing_timeout.as_secs()
                    );
                    return self.fail(id, TaskFailure::new(FailureKind::Timeout, message));
                }
            }
        } else {
            response.processed_records
        };

        let completed = self.apply(id, move |task| {
            task.set_processed_records(processed_records);
            task.transition(TaskStatus::Completed).map(|_| true)
        });
        if completed.is_ok() {
            info!(task_id = %id, file = %file_name, records = ?processed_records, "Upload completed");
        }
    }

    async fn await_processed(&self, upload_id: &str) -> Result<UploadStatusReport, TaskFailure> {
        loop {
            let report = self.api.upload_status(upload_id).await.map_err(|e| {
                let kind = TaskFailure::from(e.clone()).kind;
                TaskFailure::new(kind, format!("Status check failed: {}", e))
            })?;

            match report.status {
                RemoteUploadState::Completed => return Ok(report),
                RemoteUploadState::Error => {
                    let message = report
                        .errors
                        .filter(|errors| !errors.is_empty())
                        .map(|errors| errors.join("; "))
                        .unwrap_or_else(|| "Server failed to process the file".to_string());
                    return Err(TaskFailure::new(FailureKind::Processing, message));
                }
                RemoteUploadState::Pending
                | RemoteUploadState::Uploading
                | RemoteUploadState::Processing => {
                    debug!(upload_id, state = ?report.status, "Still processing");
                    tokio::time::sleep(self.settings.poll_interval).await;
                }
            }
        }
    }
}

/// Owns upload tasks and batches and drives each task through
/// `pending -> uploading -> processing -> completed | error`.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct UploadCoordinator {
    shared: Arc<Shared>,
}

impl UploadCoordinator {
    pub fn new(
        api: DeliveryApi,
        policy: UploadPolicy,
        settings: UploadSettings,
        runtime: Handle,
    ) -> Self {
        let slots = Arc::new(Semaphore::new(settings.concurrency.max(1)));
        Self {
            shared: Arc::new(Shared {
                api,
                policy,
                settings,
                runtime,
                slots,
                state: Mutex::new(CoordinatorState {
                    entries: Vec::new(),
                    batches: Vec::new(),
                    root: CancellationToken::new(),
                    session: 0,
                    subscribers: Vec::new(),
                }),
            }),
        }
    }

    pub fn policy(&self) -> &UploadPolicy {
        &self.shared.policy
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.shared.settings
    }

    /// Every event from now on, in the order transitions were applied.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<UploadEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.shared.state.lock().subscribers.push(sender);
        receiver
    }

    /// Validates a selection and starts uploading whatever passes.
    pub fn submit(&self, files: &[UploadFile]) -> Submission {
        let session = self.session();
        let outcome = self.shared.policy.validate(files);
        log_rejections(&outcome.rejected);

        let mut submission = Submission {
            rejected: outcome.rejected,
            ..Submission::default()
        };
        if let Some((batch_id, task_ids)) = self.enqueue(outcome.accepted, session) {
            submission.batch_id = Some(batch_id);
            submission.task_ids = task_ids;
        }
        submission
    }

    /// Like [`submit`](Self::submit), but every locally accepted file is first
    /// checked by the server. Files it finds structurally invalid are reported
    /// and never become tasks.
    ///
    /// If the upload surface is closed while the pre-check is running, the
    /// files are dropped instead of being uploaded.
    pub async fn submit_verified(&self, files: &[UploadFile]) -> Submission {
        let session = self.session();
        let outcome = self.shared.policy.validate(files);
        log_rejections(&outcome.rejected);

        let checks = join_all(outcome.accepted.into_iter().map(|file| {
            let api = self.shared.api.clone();
            async move {
                let result = api.validate_file(file.clone()).await;
                (file, result)
            }
        }))
        .await;

        let mut passed = Vec::new();
        let mut server_rejected = Vec::new();
        for (file, result) in checks {
            match result {
                Ok(ValidationResult {
                    valid: true,
                    warnings,
                    ..
                }) => {
                    for warning in &warnings {
                        info!(file = file.name(), warning = %warning, "Server pre-check warning");
                    }
                    passed.push(file);
                }
                Ok(ValidationResult {
                    errors, warnings, ..
                }) => {
                    warn!(file = file.name(), errors = ?errors, "Server pre-check rejected file");
                    server_rejected.push(ServerRejection {
                        file_name: file.name().to_string(),
                        errors,
                        warnings,
                    });
                }
                Err(e) => {
                    warn!(file = file.name(), error = %e, "Server pre-check failed");
                    server_rejected.push(ServerRejection {
                        file_name: file.name().to_string(),
                        errors: vec![e.to_string()],
                        warnings: Vec::new(),
                    });
                }
            }
        }

        let mut submission = Submission {
            rejected: outcome.rejected,
            server_rejected,
            ..Submission::default()
        };
        if let Some((batch_id, task_ids)) = self.enqueue(passed, session) {
            submission.batch_id = Some(batch_id);
            submission.task_ids = task_ids;
        }
        submission
    }

    /// Submits through the server pre-check when it is enabled in settings.
    pub async fn submit_selection(&self, files: &[UploadFile]) -> Submission {
        if self.shared.settings.server_precheck {
            self.submit_verified(files).await
        } else {
            self.submit(files)
        }
    }

    /// Asks the server whether a file is structurally acceptable, without
    /// creating a task.
    pub async fn precheck(&self, file: UploadFile) -> Result<ValidationResult, TransportError> {
        self.shared.api.validate_file(file).await
    }

    fn session(&self) -> u64 {
        self.shared.state.lock().session
    }

    /// Creates a batch for `files` unless the surface was closed since
    /// `session` was read.
    fn enqueue(&self, files: Vec<UploadFile>, session: u64) -> Option<(BatchId, Vec<TaskId>)> {
        if files.is_empty() {
            return None;
        }
        let batch_id = BatchId::new();
        let mut jobs = Vec::with_capacity(files.len());
        let mut task_ids = Vec::with_capacity(files.len());

        {
            let mut state = self.shared.state.lock();
            if state.session != session {
                info!(files = files.len(), "Upload surface closed during submission, dropping files");
                return None;
            }
            for file in files {
                let task = UploadTask::new(batch_id, file.name(), file.size_bytes());
                let token = state.root.child_token();
                task_ids.push(task.id());
                jobs.push((task.id(), file.clone(), token.clone()));
                state.emit(UploadEvent::TaskUpdated(task.clone()));
                state.entries.push(Entry { task, file, token });
            }
            state.batches.push(Batch {
                id: batch_id,
                task_ids: task_ids.clone(),
                signalled: false,
            });
        }

        info!(batch_id = %batch_id, tasks = task_ids.len(), "Upload batch queued");
        self.shared
            .runtime
            .spawn(Arc::clone(&self.shared).dispatch(jobs));
        Some((batch_id, task_ids))
    }

    /// All tasks in selection order, across batches.
    pub fn tasks(&self) -> Vec<UploadTask> {
        let state = self.shared.state.lock();
        state.entries.iter().map(|e| e.task.clone()).collect()
    }

    pub fn task(&self, id: TaskId) -> Option<UploadTask> {
        let state = self.shared.state.lock();
        state.position(id).map(|i| state.entries[i].task.clone())
    }

    pub fn batch_tasks(&self, batch_id: BatchId) -> Vec<UploadTask> {
        let state = self.shared.state.lock();
        state
            .entries
            .iter()
            .filter(|e| e.task.batch_id() == batch_id)
            .map(|e| e.task.clone())
            .collect()
    }

    /// `None` for a batch the coordinator does not (or no longer) know.
    pub fn is_batch_complete(&self, batch_id: BatchId) -> Option<bool> {
        let state = self.shared.state.lock();
        let batch = state.batches.iter().find(|b| b.id == batch_id)?;
        Some(batch.task_ids.iter().all(|id| {
            state
                .position(*id)
                .map(|i| state.entries[i].task.status().is_terminal())
                .unwrap_or(true)
        }))
    }

    pub fn has_active(&self) -> bool {
        self.active_count() > 0
    }

    pub fn active_count(&self) -> usize {
        let state = self.shared.state.lock();
        state
            .entries
            .iter()
            .filter(|e| e.task.status().is_active())
            .count()
    }

    /// Discards a task that is `pending`, `completed` or `error`. A pending
    /// task's upload is cancelled before it is sent.
    pub fn remove(&self, id: TaskId) -> Result<UploadTask, CoordinatorError> {
        let mut state = self.shared.state.lock();
        let index = state
            .position(id)
            .ok_or_else(|| CoordinatorError::UnknownTask(id.to_string()))?;

        let status = state.entries[index].task.status();
        if status.is_active() {
            return Err(CoordinatorError::TaskActive {
                id: id.to_string(),
                status: status.label(),
            });
        }

        let entry = state.entries.remove(index);
        entry.token.cancel();
        let batch_id = entry.task.batch_id();
        if let Some(batch) = state.batches.iter_mut().find(|b| b.id == batch_id) {
            batch.task_ids.retain(|t| *t != id);
        }
        state.batches.retain(|b| !b.task_ids.is_empty());

        debug!(task_id = %id, file = entry.task.file_name(), "Upload task removed");
        state.emit(UploadEvent::TaskRemoved(id));
        state.check_batch(batch_id);
        Ok(entry.task)
    }

    /// Submits a failed task's file again as a new single-task batch. The
    /// failed task stays as it is.
    pub fn resubmit(&self, id: TaskId) -> Result<Submission, CoordinatorError> {
        let (file, session) = {
            let state = self.shared.state.lock();
            let index = state
                .position(id)
                .ok_or_else(|| CoordinatorError::UnknownTask(id.to_string()))?;
            let entry = &state.entries[index];
            if !matches!(entry.task.status(), TaskStatus::Error(_)) {
                return Err(CoordinatorError::NotFailed {
                    id: id.to_string(),
                    status: entry.task.status().label(),
                });
            }
            (entry.file.clone(), state.session)
        };

        info!(task_id = %id, file = file.name(), "Resubmitting failed upload");
        let (batch_id, task_ids) = self
            .enqueue(vec![file], session)
            .ok_or_else(|| CoordinatorError::UnknownTask(id.to_string()))?;
        Ok(Submission {
            batch_id: Some(batch_id),
            task_ids,
            ..Submission::default()
        })
    }

    /// Discards every batch. Refused while any upload is in flight; pending
    /// uploads that have not been sent yet are cancelled, as are submissions
    /// still waiting on the server pre-check.
    pub fn close(&self) -> Result<(), CoordinatorError> {
        let mut state = self.shared.state.lock();
        let active = state
            .entries
            .iter()
            .filter(|e| e.task.status().is_active())
            .count();
        if active > 0 {
            warn!(active, "Refusing to close the upload surface with uploads in flight");
            return Err(CoordinatorError::UploadsInFlight { active });
        }

        state.root.cancel();
        state.root = CancellationToken::new();
        state.session += 1;
        let discarded = state.entries.len();
        state.entries.clear();
        state.batches.clear();
        state.emit(UploadEvent::Closed);
        info!(discarded, "Upload surface closed");
        Ok(())
    }
}

fn log_rejections(rejected: &[Rejection]) {
    for rejection in rejected {
        warn!(file = rejection.file.name(), reasons = %rejection.message(), "File rejected before upload");
    }
}
