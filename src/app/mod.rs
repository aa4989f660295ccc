mod state;
mod ui;

use crate::api::{DeliveryApi, OperationsSummary, StatsCard, TemplateKind, UploadHistoryItem};
use crate::config::AppConfig;
use crate::resource::{catalog, RemoteResource};
use crate::upload::{collect_folder, load_files, Submission, TaskId, UploadCoordinator, UploadEvent, UploadFile};
use eframe::{egui, App};
pub use state::{ActionProgress, UploadState};
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Results of background work started from the UI thread.
enum UiMessage {
    Submitted(Submission),
    TemplateSaved(PathBuf),
    TemplateFailed(String),
}

/// Things the user asked for during a frame, performed after rendering.
pub(crate) enum UiAction {
    OpenUpload,
    SelectFiles,
    SelectFolder,
    DownloadTemplate,
    Remove(TaskId),
    Retry(TaskId),
    ToggleDetails,
    Close,
    Refresh,
}

pub struct DeliveryDashboard {
    config: AppConfig,
    api: DeliveryApi,
    coordinator: UploadCoordinator,
    runtime: Handle,
    events: mpsc::UnboundedReceiver<UploadEvent>,
    messages: mpsc::UnboundedReceiver<UiMessage>,
    message_sender: mpsc::UnboundedSender<UiMessage>,
    stats: RemoteResource<Vec<StatsCard>>,
    summary: RemoteResource<OperationsSummary>,
    history: RemoteResource<Vec<UploadHistoryItem>>,
    show_upload: bool,
    state: UploadState,
}

impl DeliveryDashboard {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        api: DeliveryApi,
        coordinator: UploadCoordinator,
        runtime: Handle,
    ) -> Self {
        info!(base_url = %config.api.base_url, "Initializing delivery dashboard");
        let events = coordinator.subscribe();
        let (message_sender, messages) = mpsc::unbounded_channel();

        Self {
            stats: catalog::dashboard_stats(&api, &runtime),
            summary: catalog::operations_summary(&api, &runtime),
            history: catalog::upload_history(&api, &runtime),
            config,
            api,
            coordinator,
            runtime,
            events,
            messages,
            message_sender,
            show_upload: false,
            state: UploadState::default(),
        }
    }

    fn perform(&mut self, action: UiAction) {
        match action {
            UiAction::OpenUpload => self.show_upload = true,
            UiAction::SelectFiles => self.select_files(),
            UiAction::SelectFolder => self.select_folder(),
            UiAction::DownloadTemplate => self.download_template(TemplateKind::default()),
            UiAction::Remove(id) => {
                if let Err(e) = self.coordinator.remove(id) {
                    self.state.error_message = Some(e.to_string());
                }
            }
            UiAction::Retry(id) => match self.coordinator.resubmit(id) {
                Ok(submission) => self.state.record_submission(&submission),
                Err(e) => self.state.error_message = Some(e.to_string()),
            },
            UiAction::ToggleDetails => self.state.show_details = !self.state.show_details,
            UiAction::Close => self.close_upload(),
            UiAction::Refresh => {
                self.stats.refetch();
                self.summary.refetch();
                self.history.refetch();
            }
        }
    }

    fn select_files(&mut self) {
        let extensions = self.config.policy.extensions();
        let Some(paths) = rfd::FileDialog::new()
            .add_filter("Excel or CSV", extensions.as_slice())
            .pick_files()
        else {
            return;
        };
        self.load_and_submit(&paths);
    }

    fn select_folder(&mut self) {
        let Some(folder) = rfd::FileDialog::new().pick_folder() else {
            return;
        };
        let paths = collect_folder(&folder, &self.config.policy);
        info!(folder = %folder.display(), files = paths.len(), "Scanned folder for schedule files");
        if paths.is_empty() {
            self.state.error_message = Some(format!(
                "No .{} files found in {}",
                self.config.policy.extensions().join(", ."),
                folder.display()
            ));
            return;
        }
        self.load_and_submit(&paths);
    }

    fn load_and_submit(&mut self, paths: &[PathBuf]) {
        let (files, failures) = load_files(paths, &self.config.policy);
        self.state.rejections.extend(failures);
        self.start_upload(files);
    }

    fn start_upload(&mut self, files: Vec<UploadFile>) {
        if files.is_empty() {
            return;
        }
        self.state.error_message = None;
        let coordinator = self.coordinator.clone();
        let sender = self.message_sender.clone();
        self.runtime.spawn(async move {
            let submission = coordinator.submit_selection(&files).await;
            let _ = sender.send(UiMessage::Submitted(submission));
        });
    }

    fn download_template(&mut self, kind: TemplateKind) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name(kind.file_name())
            .save_file()
        else {
            return;
        };

        let api = self.api.clone();
        let sender = self.message_sender.clone();
        self.runtime.spawn(async move {
            let message = match api.download_template(kind).await {
                Ok(bytes) => match tokio::fs::write(&path, &bytes).await {
                    Ok(()) => UiMessage::TemplateSaved(path),
                    Err(e) => UiMessage::TemplateFailed(format!("Failed to save template: {}", e)),
                },
                Err(e) => UiMessage::TemplateFailed(format!("Template download failed: {}", e)),
            };
            let _ = sender.send(message);
        });
    }

    fn close_upload(&mut self) {
        match self.coordinator.close() {
            Ok(()) => {
                self.state.clear();
                self.show_upload = false;
            }
            Err(e) => self.state.error_message = Some(e.to_string()),
        }
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        let mut had_updates = false;

        while let Ok(event) = self.events.try_recv() {
            had_updates = true;
            if self.state.apply(event).is_some() {
                self.history.refetch();
                self.summary.refetch();
            }
        }

        while let Ok(message) = self.messages.try_recv() {
            had_updates = true;
            match message {
                UiMessage::Submitted(submission) => self.state.record_submission(&submission),
                UiMessage::TemplateSaved(path) => {
                    info!(path = %path.display(), "Template saved");
                    self.state
                        .notices
                        .push(format!("Template saved to {}", path.display()));
                    if let Err(e) = open::that(&path) {
                        warn!(error = %e, "Failed to open template");
                    }
                }
                UiMessage::TemplateFailed(error) => self.state.error_message = Some(error),
            }
        }

        if had_updates {
            ctx.request_repaint();
        }
        if self.state.is_busy()
            || self.stats.state().loading()
            || self.summary.state().loading()
            || self.history.state().loading()
        {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

impl App for DeliveryDashboard {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        for action in self.render(ctx) {
            self.perform(action);
        }
    }
}
