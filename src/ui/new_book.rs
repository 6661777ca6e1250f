//! "New book" dialog

use eframe::egui;

use crate::core::book::{create_book, NewBookForm};
use crate::core::error::BookError;
use crate::core::recents::{RecentBook, RecentsRepository};

/// Result of one frame of the dialog
#[derive(Debug)]
pub enum NewBookOutcome {
    Created(RecentBook),
    Failed(BookError),
    Cancelled,
}

#[derive(Debug, Default)]
pub struct NewBookDialog {
    form: NewBookForm,
}

impl NewBookDialog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show the dialog. `None` while it stays open.
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        recents: &mut dyn RecentsRepository,
    ) -> Option<NewBookOutcome> {
        let mut outcome = None;

        egui::Window::new("New Book")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                egui::Grid::new("new_book_form")
                    .num_columns(2)
                    .spacing([8.0, 6.0])
                    .show(ui, |ui| {
                        ui.label("Name:");
                        ui.text_edit_singleline(&mut self.form.name);
                        ui.end_row();

                        ui.label("Location:");
                        ui.horizontal(|ui| {
                            ui.label(path_label(self.form.folder.as_deref()));
                            if ui.button("Choose...").clicked() {
                                if let Some(folder) = rfd::FileDialog::new().pick_folder() {
                                    self.form.folder = Some(folder);
                                }
                            }
                        });
                        ui.end_row();

                        ui.label("Cover:");
                        ui.horizontal(|ui| {
                            ui.label(path_label(self.form.cover.as_deref()));
                            if ui.button("Choose...").clicked() {
                                if let Some(cover) = rfd::FileDialog::new()
                                    .add_filter("Images", &["png", "jpg", "jpeg", "bmp", "gif"])
                                    .pick_file()
                                {
                                    self.form.cover = Some(cover);
                                }
                            }
                            if self.form.cover.is_some() && ui.small_button("✖").clicked() {
                                self.form.cover = None;
                            }
                        });
                        ui.end_row();
                    });

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("Create").clicked() {
                        outcome = Some(match create_book(&self.form, recents) {
                            Ok(book) => NewBookOutcome::Created(book),
                            Err(e) => NewBookOutcome::Failed(e),
                        });
                    }
                    if ui.button("Cancel").clicked() {
                        outcome = Some(NewBookOutcome::Cancelled);
                    }
                });
            });

        outcome
    }
}

fn path_label(path: Option<&std::path::Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "(none)".to_string())
}
