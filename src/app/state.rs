use crate::upload::{BatchSummary, Submission, TaskId, TaskStatus, UploadEvent, UploadTask};

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ActionProgress {
    #[default]
    NotStarted,
    Uploading {
        total: usize,
        completed: usize,
        failed: usize,
    },
    Completed {
        total: usize,
        completed: usize,
        failed: usize,
    },
}

/// What the upload window shows, rebuilt from coordinator events.
#[derive(Default)]
pub struct UploadState {
    pub tasks: Vec<UploadTask>,
    pub rejections: Vec<String>,
    pub notices: Vec<String>,
    pub error_message: Option<String>,
    pub show_details: bool,
}

impl UploadState {
    pub fn clear(&mut self) {
        *self = UploadState::default();
    }

    /// Folds one coordinator event into the view. Returns the batch summary
    /// when a batch just finished so the caller can refresh dependent data.
    pub fn apply(&mut self, event: UploadEvent) -> Option<BatchSummary> {
        match event {
            UploadEvent::TaskUpdated(task) => {
                match self.tasks.iter_mut().find(|t| t.id() == task.id()) {
                    Some(existing) => *existing = task,
                    None => self.tasks.push(task),
                }
                None
            }
            UploadEvent::TaskRemoved(id) => {
                self.tasks.retain(|t| t.id() != id);
                None
            }
            UploadEvent::BatchComplete(summary) => {
                let notice = if summary.failed == 0 {
                    format!("Successfully processed {} file(s)", summary.completed)
                } else {
                    format!(
                        "Processed {} of {} file(s), {} failed",
                        summary.completed, summary.total, summary.failed
                    )
                };
                self.notices.push(notice);
                Some(summary)
            }
            UploadEvent::Closed => {
                self.clear();
                None
            }
        }
    }

    pub fn record_submission(&mut self, submission: &Submission) {
        for rejection in &submission.rejected {
            self.rejections.push(rejection.message());
        }
        for rejection in &submission.server_rejected {
            self.rejections.push(format!(
                "{}: {}",
                rejection.file_name,
                rejection.errors.join(", ")
            ));
        }
        if !submission.rejected.is_empty() || !submission.server_rejected.is_empty() {
            self.show_details = true;
        }
    }

    pub fn task(&self, id: TaskId) -> Option<&UploadTask> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    pub fn is_busy(&self) -> bool {
        self.tasks.iter().any(|t| t.status().is_active())
    }

    pub fn progress(&self) -> ActionProgress {
        if self.tasks.is_empty() {
            return ActionProgress::NotStarted;
        }

        let total = self.tasks.len();
        let completed = self
            .tasks
            .iter()
            .filter(|t| *t.status() == TaskStatus::Completed)
            .count();
        let failed = self
            .tasks
            .iter()
            .filter(|t| matches!(t.status(), TaskStatus::Error(_)))
            .count();

        if completed + failed == total {
            ActionProgress::Completed {
                total,
                completed,
                failed,
            }
        } else {
            ActionProgress::Uploading {
                total,
                completed,
                failed,
            }
        }
    }

    pub fn get_progress_percentage(&self) -> f32 {
        if self.tasks.is_empty() {
            return 0.0;
        }
        let sum: u32 = self
            .tasks
            .iter()
            .map(|t| {
                if t.status().is_terminal() {
                    100
                } else {
                    u32::from(t.progress())
                }
            })
            .sum();
        sum as f32 / (self.tasks.len() as f32 * 100.0)
    }

    pub fn get_status_text(&self) -> String {
        match self.progress() {
            ActionProgress::NotStarted => String::new(),
            ActionProgress::Uploading {
                total, completed, ..
            }
            | ActionProgress::Completed {
                total, completed, ..
            } => format!("{} of {} completed", completed, total),
        }
    }
}
