//! Image size dialog, used when inserting and when re-sizing

use eframe::egui;

use crate::document::resize::{ImageSize, ResizeForm};
use crate::document::BlockId;

/// What the chosen size is applied to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTarget {
    /// A new image placed after the given block
    Insert { src: String, after: Option<BlockId> },
    /// An image block already in the document
    Resize(BlockId),
}

#[derive(Debug)]
pub enum ImageDialogResult {
    Apply(ImageTarget, ImageSize),
    Cancel,
}

#[derive(Debug)]
pub struct ImageDialog {
    target: ImageTarget,
    form: ResizeForm,
}

impl ImageDialog {
    pub fn new(target: ImageTarget, form: ResizeForm) -> Self {
        Self { target, form }
    }

    /// Show the dialog. `None` while it stays open.
    pub fn show(&mut self, ctx: &egui::Context) -> Option<ImageDialogResult> {
        let mut result = None;
        let title = match self.target {
            ImageTarget::Insert { .. } => "Insert Image",
            ImageTarget::Resize(_) => "Resize Image",
        };

        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(format!(
                    "Original size: {} × {}",
                    self.form.original.width, self.form.original.height
                ));

                egui::Grid::new("image_size").num_columns(2).show(ui, |ui| {
                    ui.label("Width:");
                    let mut width = self.form.width;
                    if ui
                        .add(egui::DragValue::new(&mut width).range(1..=20_000).suffix(" px"))
                        .changed()
                    {
                        self.form.set_width(width);
                    }
                    ui.end_row();

                    ui.label("Height:");
                    let mut height = self.form.height;
                    if ui
                        .add(egui::DragValue::new(&mut height).range(1..=20_000).suffix(" px"))
                        .changed()
                    {
                        self.form.set_height(height);
                    }
                    ui.end_row();
                });

                ui.checkbox(&mut self.form.keep_ratio, "Keep aspect ratio");
                ui.separator();

                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() {
                        if let Some(size) = self.form.result() {
                            result = Some(ImageDialogResult::Apply(self.target.clone(), size));
                        }
                    }
                    if ui.button("Cancel").clicked() {
                        result = Some(ImageDialogResult::Cancel);
                    }
                });
            });

        result
    }
}
