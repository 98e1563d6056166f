// src/ui.rs - Frame viewer and track table widgets
use eframe::egui::{self, Color32, Pos2, Rect, Stroke, Vec2};
use egui_extras::{Column, TableBuilder};
use image::DynamicImage;
use swim_curator::tracks::{format_cell, TrackTable, TRACK_COLUMN};
use swim_curator::FrameSurface;

pub const MIN_ZOOM: f32 = 0.33;
pub const MAX_ZOOM: f32 = 2.0;
const HIGHLIGHT_RADIUS: f32 = 20.0;

#[derive(Debug, Clone)]
pub struct Theme {
    pub surface: Color32,
    pub highlight: Color32,
    pub warning: Color32,
    pub success: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            surface: Color32::from_rgb(30, 30, 35),
            highlight: Color32::from_rgb(244, 67, 54),
            warning: Color32::from_rgb(255, 152, 0),
            success: Color32::from_rgb(76, 175, 80),
            text_secondary: Color32::from_rgb(200, 200, 200),
        }
    }
}

pub fn create_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();

    visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(30, 30, 35);
    visuals.widgets.inactive.bg_fill = Color32::from_rgb(45, 45, 52);
    visuals.widgets.hovered.bg_fill = Color32::from_rgb(55, 55, 65);
    visuals.widgets.active.bg_fill = Color32::from_rgb(70, 130, 240);

    visuals.widgets.noninteractive.rounding = egui::Rounding::same(6.0);
    visuals.widgets.inactive.rounding = egui::Rounding::same(6.0);
    visuals.widgets.hovered.rounding = egui::Rounding::same(6.0);
    visuals.widgets.active.rounding = egui::Rounding::same(6.0);
    visuals.window_rounding = egui::Rounding::same(10.0);

    visuals
}

/// Displayed frame, zoom and the optional track marker.
pub struct FrameView {
    pub frame: usize,
    pub zoom: f32,
    pub highlight: Option<(i64, i64)>,
    pub jump_text: String,
    texture: Option<egui::TextureHandle>,
    uploaded: Option<usize>,
}

impl Default for FrameView {
    fn default() -> Self {
        Self {
            frame: 0,
            zoom: MIN_ZOOM,
            highlight: None,
            jump_text: String::new(),
            texture: None,
            uploaded: None,
        }
    }
}

impl FrameSurface for FrameView {
    fn show_frame(&mut self, frame: i64, highlight: Option<(i64, i64)>) {
        self.frame = frame.max(0) as usize;
        self.highlight = highlight;
    }
}

impl FrameView {
    pub fn reset(&mut self) {
        let zoom = self.zoom;
        *self = Self {
            zoom,
            ..Self::default()
        };
    }

    /// Frame that still has to be decoded and uploaded, if any.
    pub fn pending_frame(&self) -> Option<usize> {
        (self.uploaded != Some(self.frame)).then_some(self.frame)
    }

    pub fn upload(&mut self, ctx: &egui::Context, index: usize, frame: &DynamicImage) {
        let size = [frame.width() as usize, frame.height() as usize];
        let rgba = frame.to_rgba8();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_flat_samples().as_slice());

        match self.texture.as_mut() {
            Some(texture) => texture.set(color_image, Default::default()),
            None => self.texture = Some(ctx.load_texture("video_frame", color_image, Default::default())),
        }
        self.uploaded = Some(index);
    }

    /// Mark the frame as handled even though nothing could be shown.
    pub fn skip(&mut self, index: usize) {
        self.uploaded = Some(index);
    }

    /// Frame slider, jump entry and zoom slider.
    pub fn controls(&mut self, ui: &mut egui::Ui, total_frames: usize) {
        ui.horizontal(|ui| {
            let last = total_frames.saturating_sub(1);
            let mut frame = self.frame.min(last);
            if ui
                .add(egui::Slider::new(&mut frame, 0..=last).text("Frame"))
                .changed()
            {
                self.frame = frame;
                self.highlight = None;
            }

            ui.separator();
            ui.add(egui::TextEdit::singleline(&mut self.jump_text).desired_width(60.0));
            if ui.button("Jump").clicked() {
                if let Ok(target) = self.jump_text.trim().parse::<usize>() {
                    self.frame = target.min(last);
                    self.highlight = None;
                }
            }

            ui.separator();
            ui.add(egui::Slider::new(&mut self.zoom, MIN_ZOOM..=MAX_ZOOM).step_by(0.1).text("Zoom"));
        });
    }

    pub fn show(&self, ui: &mut egui::Ui, theme: &Theme) {
        let Some(texture) = self.texture.as_ref() else {
            let (rect, _) = ui.allocate_exact_size(Vec2::new(640.0, 480.0), egui::Sense::hover());
            ui.painter().rect_filled(rect, egui::Rounding::same(4.0), theme.surface);
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No video loaded",
                egui::FontId::proportional(16.0),
                theme.text_secondary,
            );
            return;
        };

        egui::ScrollArea::both().show(ui, |ui| {
            let size = texture.size_vec2() * self.zoom;
            let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
            let painter = ui.painter_at(rect);
            painter.image(
                texture.id(),
                rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );

            if let Some((x, y)) = self.highlight {
                let center = rect.min + Vec2::new(x as f32, y as f32) * self.zoom;
                painter.circle_stroke(
                    center,
                    HIGHLIGHT_RADIUS * self.zoom,
                    Stroke::new(2.0, theme.highlight),
                );
            }
        });
    }
}

/// Track table; returns the track whose row was double-clicked.
pub fn track_table(ui: &mut egui::Ui, table: &TrackTable, columns: &[String]) -> Option<i64> {
    let shown: Vec<(&str, Option<usize>)> = columns
        .iter()
        .map(|c| (c.as_str(), table.column_index(c)))
        .collect();
    let mut picked = None;

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto().at_least(50.0))
        .columns(Column::auto().at_least(60.0), shown.len())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong(TRACK_COLUMN);
            });
            for (name, _) in &shown {
                header.col(|ui| {
                    ui.strong(*name);
                });
            }
        })
        .body(|mut body| {
            for (id, row) in table.rows() {
                body.row(18.0, |mut table_row| {
                    table_row.col(|ui| {
                        let label = egui::Label::new(id.to_string()).sense(egui::Sense::click());
                        if ui.add(label).double_clicked() {
                            picked = Some(id);
                        }
                    });
                    for (_, index) in &shown {
                        table_row.col(|ui| {
                            let text = index.map(|i| format_cell(row[i])).unwrap_or_default();
                            ui.label(text);
                        });
                    }
                });
            }
        });

    picked
}
