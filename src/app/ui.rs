use super::{ActionProgress, DeliveryDashboard, UiAction};
use crate::api::{ChangeType, HistoryStatus};
use crate::resource::ResourceState;
use crate::upload::{TaskStatus, UploadTask};
use crate::utils::FileSizeUtils;
use eframe::egui::{self, Align, Color32, RichText};

const ACCENT: Color32 = Color32::from_rgb(161, 89, 225);
const SUCCESS: Color32 = Color32::from_rgb(0, 180, 0);
const FAILURE: Color32 = Color32::from_rgb(220, 50, 50);
const MUTED: Color32 = Color32::from_rgb(150, 150, 150);

fn resource_status<T>(ui: &mut egui::Ui, state: &ResourceState<T>) -> bool {
    if let Some(error) = state.error() {
        ui.colored_label(FAILURE, error);
    }
    if state.loading() {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label(RichText::new("Loading...").color(MUTED));
        });
    }
    state.data().is_some()
}

impl DeliveryDashboard {
    pub(crate) fn render(&mut self, ctx: &egui::Context) -> Vec<UiAction> {
        let mut actions = Vec::new();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.heading("Delivery Operations");
                ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                    if ui.button("📤 Upload Schedule Files").clicked() {
                        actions.push(UiAction::OpenUpload);
                    }
                    if ui.button("🔄 Refresh").clicked() {
                        actions.push(UiAction::Refresh);
                    }
                });
            });
            ui.add_space(8.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.render_stats(ui);
                ui.add_space(20.0);
                self.render_summary(ui);
                ui.add_space(20.0);
                self.render_history(ui);
            });
        });

        if self.show_upload {
            egui::Window::new("Upload Schedule Files")
                .collapsible(false)
                .resizable(true)
                .default_width(520.0)
                .show(ctx, |ui| self.render_upload(ui, &mut actions));
        }

        actions
    }

    fn render_stats(&self, ui: &mut egui::Ui) {
        let state = self.stats.state();
        if !resource_status(ui, &state) {
            return;
        }
        let Some(cards) = state.data() else {
            return;
        };

        ui.horizontal_wrapped(|ui| {
            for card in cards {
                ui.group(|ui| {
                    ui.set_min_width(150.0);
                    ui.vertical(|ui| {
                        ui.label(RichText::new(&card.title).color(MUTED));
                        ui.label(RichText::new(&card.value).size(22.0).strong());
                        let color = match card.change_type {
                            ChangeType::Positive => SUCCESS,
                            ChangeType::Negative => FAILURE,
                        };
                        ui.horizontal(|ui| {
                            ui.colored_label(color, &card.change);
                            ui.label(RichText::new(&card.description).color(MUTED));
                        });
                    });
                });
            }
        });
    }

    fn render_summary(&self, ui: &mut egui::Ui) {
        ui.label(RichText::new("Operations Summary").strong());
        let state = self.summary.state();
        if !resource_status(ui, &state) {
            return;
        }
        let Some(summary) = state.data() else {
            return;
        };

        egui::Grid::new("operations-summary")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                ui.label("Total deliveries");
                ui.label(summary.total_deliveries.to_string());
                ui.end_row();
                ui.label("Total cases");
                ui.label(summary.total_cases.to_string());
                ui.end_row();
                ui.label("Total hours");
                ui.label(format!("{:.1}", summary.total_hours));
                ui.end_row();
                ui.label("Recent deliveries");
                ui.label(summary.recent_deliveries.to_string());
                ui.end_row();
                ui.label("Avg cases / delivery");
                ui.label(format!("{:.1}", summary.average_cases_per_delivery));
                ui.end_row();
                ui.label("Avg hours / employee");
                ui.label(format!("{:.1}", summary.average_hours_per_employee));
                ui.end_row();
            });
    }

    fn render_history(&self, ui: &mut egui::Ui) {
        ui.label(RichText::new("Upload History").strong());
        let state = self.history.state();
        if !resource_status(ui, &state) {
            return;
        }
        let Some(items) = state.data() else {
            return;
        };
        if items.is_empty() {
            ui.label(RichText::new("No uploads yet").color(MUTED));
            return;
        }

        egui::Grid::new("upload-history")
            .num_columns(4)
            .striped(true)
            .show(ui, |ui| {
                for item in items {
                    let (icon, color) = match item.status {
                        HistoryStatus::Completed => ("✅", SUCCESS),
                        HistoryStatus::Failed => ("❌", FAILURE),
                        HistoryStatus::Processing => ("⏳", MUTED),
                    };
                    ui.label(icon);
                    ui.colored_label(color, &item.file_name);
                    ui.label(FileSizeUtils::format_size(item.file_size));
                    ui.label(format!("{} records · {}", item.processed_records, item.upload_date));
                    ui.end_row();
                }
            });
    }

    fn render_upload(&self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let busy = self.state.is_busy();
        let policy = &self.config.policy;

        ui.label(
            RichText::new("Upload Excel or CSV files containing delivery schedules and employee data.")
                .color(ui.visuals().text_color().gamma_multiply(0.7)),
        );
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            ui.label(format!(
                "Supports .{} files up to {}",
                policy.extensions().join(", ."),
                FileSizeUtils::format_size(policy.max_file_size_bytes)
            ));
            ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                if ui.button("⬇ Download Template").clicked() {
                    actions.push(UiAction::DownloadTemplate);
                }
            });
        });

        ui.add_space(10.0);
        ui.group(|ui| {
            ui.add_enabled_ui(!busy, |ui| {
                ui.horizontal(|ui| {
                    if ui.button("📄 Select Files").clicked() {
                        actions.push(UiAction::SelectFiles);
                    }
                    if ui.button("📁 Select Folder").clicked() {
                        actions.push(UiAction::SelectFolder);
                    }
                });
            });
            ui.label(
                RichText::new(format!(
                    "Up to {} files per upload. Files listed in .gitignore are skipped when scanning a folder.",
                    policy.max_files_per_batch
                ))
                .color(MUTED),
            );
        });

        if !matches!(self.state.progress(), ActionProgress::NotStarted) {
            ui.add_space(10.0);
            ui.group(|ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Upload Progress").strong());
                    ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                        ui.label(RichText::new(self.state.get_status_text()).color(MUTED));
                    });
                });
                ui.add(
                    egui::ProgressBar::new(self.state.get_progress_percentage())
                        .show_percentage()
                        .animate(busy)
                        .fill(ACCENT),
                );
                ui.add_space(6.0);

                egui::ScrollArea::vertical()
                    .max_height(260.0)
                    .show(ui, |ui| {
                        for task in &self.state.tasks {
                            Self::render_task(ui, task, actions);
                            ui.add_space(4.0);
                        }
                    });
            });
        }

        if !self.state.rejections.is_empty() {
            ui.add_space(10.0);
            self.render_details(ui, actions);
        }

        for notice in &self.state.notices {
            ui.colored_label(SUCCESS, notice);
        }

        ui.add_space(10.0);
        ui.horizontal(|ui| {
            let label = if busy { "Uploading..." } else { "Close" };
            if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
                actions.push(UiAction::Close);
            }
        });

        if let Some(error) = &self.state.error_message {
            ui.add_space(5.0);
            ui.colored_label(FAILURE, error);
        }
    }

    fn render_task(ui: &mut egui::Ui, task: &UploadTask, actions: &mut Vec<UiAction>) {
        let (icon, text) = match task.status() {
            TaskStatus::Pending => ("⏳", "Waiting..."),
            TaskStatus::Uploading => ("📤", "Uploading..."),
            TaskStatus::Processing => ("⚙", "Processing..."),
            TaskStatus::Completed => ("✅", "Completed"),
            TaskStatus::Error(_) => ("❌", "Failed"),
        };

        ui.horizontal(|ui| {
            ui.label(icon);
            ui.label(RichText::new(task.file_name()).strong());
            ui.label(
                RichText::new(format!("({})", FileSizeUtils::format_size(task.size_bytes())))
                    .color(MUTED),
            );
            ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                if !task.status().is_active() && ui.small_button("Remove").clicked() {
                    actions.push(UiAction::Remove(task.id()));
                }
                if matches!(task.status(), TaskStatus::Error(_)) && ui.small_button("Retry").clicked() {
                    actions.push(UiAction::Retry(task.id()));
                }
                ui.label(RichText::new(text).color(MUTED));
            });
        });

        if task.status().is_active() {
            ui.add(
                egui::ProgressBar::new(f32::from(task.progress()) / 100.0).fill(ACCENT),
            );
        }
        if let Some(failure) = task.error() {
            ui.colored_label(FAILURE, &failure.message);
        }
    }

    fn render_details(&self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        ui.horizontal(|ui| {
            ui.label(
                RichText::new(format!("{} file(s) were not uploaded", self.state.rejections.len()))
                    .color(FAILURE),
            );
            let label = if self.state.show_details {
                "Hide Details"
            } else {
                "Show Details"
            };
            if ui.button(label).clicked() {
                actions.push(UiAction::ToggleDetails);
            }
        });
        if self.state.show_details {
            egui::ScrollArea::vertical()
                .id_source("rejections")
                .max_height(120.0)
                .show(ui, |ui| {
                    egui::Frame::none()
                        .fill(ui.style().visuals.extreme_bg_color)
                        .show(ui, |ui| {
                            for rejection in &self.state.rejections {
                                ui.horizontal(|ui| {
                                    ui.label("⏩");
                                    ui.colored_label(MUTED, rejection);
                                });
                            }
                        });
                });
        }
    }
}
