// src/app.rs
use crate::ui::{self, FrameView, Theme};
use crate::video::VideoFileReader;

use eframe::egui;
use std::path::PathBuf;
use swim_curator::{Notifier, ReviewConfig, Reviewer, Severity};
use tracing::warn;

/// Alerts shown as native message boxes.
pub struct DialogNotifier;

impl Notifier for DialogNotifier {
    fn notify(&mut self, severity: Severity, title: &str, message: &str) {
        let level = match severity {
            Severity::Info => rfd::MessageLevel::Info,
            Severity::Warning => rfd::MessageLevel::Warning,
            Severity::Error => rfd::MessageLevel::Error,
        };
        rfd::MessageDialog::new()
            .set_level(level)
            .set_title(title)
            .set_description(message)
            .set_buttons(rfd::MessageButtons::Ok)
            .show();
    }
}

pub struct SwimCuratorApp {
    reviewer: Reviewer<DialogNotifier>,
    reader: Option<VideoFileReader>,
    reader_for: Option<PathBuf>,
    frames: FrameView,
    theme: Theme,

    combine_text: String,
    delete_text: String,
    find_text: String,
}

impl SwimCuratorApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            reviewer: Reviewer::new(ReviewConfig::load(), DialogNotifier),
            reader: None,
            reader_for: None,
            frames: FrameView::default(),
            theme: Theme::default(),
            combine_text: String::new(),
            delete_text: String::new(),
            find_text: String::new(),
        }
    }

    /// Keep the frame reader on the video the reviewer has loaded.
    fn sync_video(&mut self) {
        let wanted = self.reviewer.current().map(|v| v.paths.video.clone());
        if wanted == self.reader_for {
            return;
        }

        self.reader = None;
        self.frames.reset();
        self.reader_for = wanted.clone();
        if let Some(path) = wanted {
            match VideoFileReader::open(&path) {
                Ok(reader) => self.reader = Some(reader),
                Err(e) => {
                    warn!("Cannot open video {}: {:#}", path.display(), e);
                    self.reviewer
                        .notifier_mut()
                        .notify(Severity::Warning, "Video Error", &format!("{:#}", e));
                }
            }
        }
    }

    fn refresh_frame(&mut self, ctx: &egui::Context) {
        let (Some(reader), Some(index)) = (self.reader.as_mut(), self.frames.pending_frame()) else {
            return;
        };
        match reader.frame(index) {
            Ok(image) => self.frames.upload(ctx, index, image),
            Err(e) => {
                warn!("Cannot show frame {}: {:#}", index, e);
                self.frames.skip(index);
            }
        }
    }

    fn render_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.heading("Swim Curator");
                ui.separator();

                if ui.button("📁 Select Folder").clicked() {
                    if let Some(folder) = rfd::FileDialog::new()
                        .set_title("Select video folder")
                        .pick_folder()
                    {
                        self.reviewer.open_folder(&folder);
                    }
                }
                ui.label(self.reviewer.status());

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("📊 Aggregate Experiment").clicked() {
                        if let Some(root) = rfd::FileDialog::new()
                            .set_title("Select experiment folder")
                            .pick_folder()
                        {
                            self.reviewer.aggregate(&root);
                        }
                    }
                });
            });
            ui.add_space(6.0);
        });
    }

    fn render_track_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("tracks")
            .resizable(true)
            .default_width(460.0)
            .show(ctx, |ui| {
                ui.heading("Tracks");
                if let Some(video) = self.reviewer.current() {
                    ui.label(
                        egui::RichText::new(&video.paths.base_name).color(self.theme.text_secondary),
                    );
                }
                ui.separator();

                let mut picked = None;
                egui::ScrollArea::vertical()
                    .max_height(ui.available_height() - 220.0)
                    .show(ui, |ui| match self.reviewer.table() {
                        Some(table) => {
                            picked = ui::track_table(ui, table, &self.reviewer.config().display_columns);
                        }
                        None => {
                            ui.label("No track data loaded.");
                        }
                    });
                if let Some(track) = picked {
                    self.find_text = track.to_string();
                    self.reviewer.find_track(&self.find_text, &mut self.frames);
                }

                ui.separator();
                self.render_edit_controls(ui);
            });
    }

    fn render_edit_controls(&mut self, ui: &mut egui::Ui) {
        egui::Grid::new("edits").num_columns(2).spacing([8.0, 6.0]).show(ui, |ui| {
            ui.add(egui::TextEdit::singleline(&mut self.combine_text).hint_text("e.g. 3, 7"));
            if ui.button("Combine Tracks").clicked() && self.reviewer.combine(&self.combine_text) {
                self.combine_text.clear();
            }
            ui.end_row();

            ui.add(egui::TextEdit::singleline(&mut self.delete_text).hint_text("e.g. 12"));
            if ui.button("Delete Tracks").clicked() && self.reviewer.delete(&self.delete_text) {
                self.delete_text.clear();
            }
            ui.end_row();

            ui.add(egui::TextEdit::singleline(&mut self.find_text).hint_text("track number"));
            if ui.button("Find Track").clicked() {
                self.reviewer.find_track(&self.find_text, &mut self.frames);
            }
            ui.end_row();
        });

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui.button("↶ Undo").clicked() {
                self.reviewer.undo();
            }
            if ui
                .add(egui::Button::new("Save & Next").fill(self.theme.success))
                .clicked()
            {
                self.reviewer.save_and_proceed();
            }
            if ui
                .add(egui::Button::new("Save & Exit").fill(self.theme.warning))
                .clicked()
                && self.reviewer.save()
            {
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });
    }

    fn render_video(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let total = self.reader.as_ref().map_or(1, VideoFileReader::total_frames);
            self.frames.controls(ui, total);
            if let Some(info) = self.reader.as_ref().map(VideoFileReader::info) {
                ui.label(
                    egui::RichText::new(format!(
                        "{}x{} · {:.2} fps · {} frames",
                        info.width, info.height, info.fps, info.total_frames
                    ))
                    .color(self.theme.text_secondary),
                );
            }
            ui.separator();
            self.frames.show(ui, &self.theme);
        });
    }
}

impl eframe::App for SwimCuratorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.render_header(ctx);
        self.render_track_panel(ctx);
        self.sync_video();
        self.refresh_frame(ctx);
        self.render_video(ctx);
    }
}
