use super::{MergeApp, StatusKind};
use crate::utils::file_size::format_megabytes;
use eframe::egui::{self, Color32, RichText};
use rfd::FileDialog;

const ACCENT: Color32 = Color32::from_rgb(33, 115, 70);
const ERROR: Color32 = Color32::from_rgb(220, 50, 50);
const SUCCESS: Color32 = Color32::from_rgb(0, 160, 0);

impl MergeApp {
    pub fn render(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(20.0);
                ui.vertical_centered(|ui| {
                    ui.heading("📊 Merge Multiple Excel Files");
                    ui.add_space(5.0);
                    ui.label(
                        RichText::new("Upload ZIP files (each contains one Excel)")
                            .color(ui.visuals().text_color().gamma_multiply(0.7)),
                    );
                });

                ui.add_space(20.0);
                self.render_selection(ui);
                ui.add_space(20.0);
                self.render_actions(ui, ctx);
                ui.add_space(20.0);
                self.render_progress(ui);
                self.render_status(ui);
            });
        });
    }

    fn render_selection(&mut self, ui: &mut egui::Ui) {
        let loading = self.orchestrator.is_loading();

        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.add_enabled_ui(!loading, |ui| {
                    if ui.button("📦 Select ZIP files").clicked() {
                        let picked = FileDialog::new()
                            .add_filter("ZIP archives", self.selector.dialog_filter().as_slice())
                            .pick_files();
                        if let Some(paths) = picked {
                            self.pick_files(paths);
                        }
                    }
                    if ui.button("📁 Add folder").clicked() {
                        if let Some(folder) = FileDialog::new().pick_folder() {
                            self.pick_folder(&folder);
                        }
                    }
                    if self.state.has_selection() && ui.button("🗑 Clear").clicked() {
                        self.clear_selection();
                    }
                });
            });

            if let Some(selection) = &self.state.selection {
                ui.add_space(8.0);
                egui::ScrollArea::vertical()
                    .id_source("selection")
                    .max_height(160.0)
                    .show(ui, |ui| {
                        for file in selection.files() {
                            ui.label(format!(
                                "{} — {}",
                                file.name,
                                format_megabytes(file.size_bytes)
                            ));
                        }
                    });
            }
        });
    }

    fn render_actions(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        ui.vertical_centered(|ui| {
            let label = if self.orchestrator.is_loading() {
                "⏳ Merging..."
            } else {
                "📤 Upload & Merge"
            };
            let button = egui::Button::new(label).min_size(egui::vec2(200.0, 40.0));
            if ui.add_enabled(self.can_merge(), button).clicked() {
                self.start_merge(ctx);
            }
        });
    }

    fn render_progress(&self, ui: &mut egui::Ui) {
        if let Some(progress) = &self.state.progress {
            ui.group(|ui| {
                let bar = egui::ProgressBar::new(progress.fraction)
                    .show_percentage()
                    .animate(true)
                    .fill(ACCENT);
                ui.add(bar);
                ui.label(&progress.label);
            });
            ui.add_space(10.0);
        }
    }

    fn render_status(&self, ui: &mut egui::Ui) {
        let Some(status) = &self.state.status else {
            return;
        };
        let color = match status.kind {
            StatusKind::Info => ui.visuals().text_color(),
            StatusKind::Success => SUCCESS,
            StatusKind::Error => ERROR,
        };
        ui.vertical_centered(|ui| {
            ui.colored_label(color, &status.text);

            if let Some(saved) = &self.state.last_saved {
                ui.label(
                    RichText::new(saved.path.display().to_string())
                        .small()
                        .color(ui.visuals().text_color().gamma_multiply(0.7)),
                );
                ui.horizontal(|ui| {
                    if ui.link("Open file").clicked() {
                        if let Err(e) = saved.open() {
                            tracing::warn!(error = %e, "failed to open merged file");
                        }
                    }
                    if ui.link("Show in folder").clicked() {
                        if let Err(e) = saved.reveal() {
                            tracing::warn!(error = %e, "failed to open folder");
                        }
                    }
                });
            }
        });
    }
}
