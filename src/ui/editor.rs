//! Rich-text editor screen: toolbar, page and dialogs

use std::path::{Path, PathBuf};

use eframe::egui;

use super::image_dialog::{ImageDialog, ImageDialogResult, ImageTarget};
use super::notice::Notice;
use super::surface::{Surface, SurfaceRequest};
use crate::core::history::EditKind;
use crate::core::recents::RecentsRepository;
use crate::core::session::{EditorSession, LeaveAction};
use crate::document::format::{
    style_under_cursor, FormatCommand, HeadingPreset, FONT_FAMILIES, FONT_SIZES,
};
use crate::document::resize::{ImageSize, ResizeForm};
use crate::document::{
    relative_src, resolve_src, Alignment, Block, BlockId, BlockKind, ImageBlock, ListKind,
};

/// Width of the editable page
const PAGE_WIDTH: f32 = 620.0;

/// Image types offered by the picker
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

/// What the editor asks the app to do
#[derive(Debug)]
pub enum EditorAction {
    Leave(LeaveAction),
    Notice(Notice),
}

#[derive(Debug, Default)]
pub struct EditorView {
    surface: Surface,
    image_dialog: Option<ImageDialog>,
}

impl EditorView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget selection and dialogs, e.g. when another document is loaded
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn show(
        &mut self,
        ctx: &egui::Context,
        session: &mut EditorSession,
        recents: &mut dyn RecentsRepository,
        interactive: bool,
    ) -> Option<EditorAction> {
        let mut action = None;

        if let Some(dialog) = &mut self.image_dialog {
            match dialog.show(ctx) {
                Some(ImageDialogResult::Apply(target, size)) => {
                    self.image_dialog = None;
                    self.apply_image(session, target, size);
                }
                Some(ImageDialogResult::Cancel) => self.image_dialog = None,
                None => {}
            }
        }

        let interactive = interactive && self.image_dialog.is_none();
        if interactive {
            action = self.handle_shortcuts(ctx, session, recents);
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.add_enabled_ui(interactive, |ui| {
                if let Some(a) = self.toolbar(ui, session, recents) {
                    action = Some(a);
                }
            });
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let location = session
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "Not saved yet".to_string());
                ui.label(location);
                if session.is_dirty() {
                    ui.label(egui::RichText::new("modified").weak().italics());
                }
            });
        });

        let base_dir = session.path().and_then(Path::parent).map(Path::to_path_buf);
        let mut request = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .id_salt("document_scroll")
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.add_enabled_ui(interactive, |ui| {
                        let width = PAGE_WIDTH.min(ui.available_width());
                        let margin = ((ui.available_width() - width) / 2.0).max(0.0);
                        ui.horizontal_top(|ui| {
                            ui.add_space(margin);
                            egui::Frame::new()
                                .fill(ui.visuals().extreme_bg_color)
                                .inner_margin(24.0)
                                .show(ui, |ui| {
                                    ui.set_width(width);
                                    ui.vertical(|ui| {
                                        request =
                                            self.surface.show(ui, session, base_dir.as_deref());
                                    });
                                });
                        });
                    });
                });
        });

        if let Some(SurfaceRequest::ResizeImage(id)) = request {
            if let Some(a) = self.begin_resize(session, id) {
                action = Some(a);
            }
        }

        action
    }

    fn handle_shortcuts(
        &mut self,
        ctx: &egui::Context,
        session: &mut EditorSession,
        recents: &mut dyn RecentsRepository,
    ) -> Option<EditorAction> {
        use egui::{Key, Modifiers};

        // Consumed before the text fields run so their built-in undo stays out of the way
        let (save, redo, undo, bold, italic, underline) = ctx.input_mut(|i| {
            (
                i.consume_key(Modifiers::COMMAND, Key::S),
                i.consume_key(Modifiers::COMMAND | Modifiers::SHIFT, Key::Z)
                    || i.consume_key(Modifiers::COMMAND, Key::Y),
                i.consume_key(Modifiers::COMMAND, Key::Z),
                i.consume_key(Modifiers::COMMAND, Key::B),
                i.consume_key(Modifiers::COMMAND, Key::I),
                i.consume_key(Modifiers::COMMAND, Key::U),
            )
        });

        if undo {
            session.undo();
        }
        if redo {
            session.redo();
        }
        if bold {
            self.run_format(session, FormatCommand::ToggleBold);
        }
        if italic {
            self.run_format(session, FormatCommand::ToggleItalic);
        }
        if underline {
            self.run_format(session, FormatCommand::ToggleUnderline);
        }
        if save {
            return save_document(session, recents, false);
        }
        None
    }

    fn toolbar(
        &mut self,
        ui: &mut egui::Ui,
        session: &mut EditorSession,
        recents: &mut dyn RecentsRepository,
    ) -> Option<EditorAction> {
        let mut action = None;
        let mut command = None;

        ui.horizontal(|ui| {
            if ui.button("⌂ Home").clicked() {
                action = Some(EditorAction::Leave(LeaveAction::Home));
            }
            if ui.button("New").clicked() {
                action = Some(EditorAction::Leave(LeaveAction::NewDocument));
            }
            if ui.button("Open...").clicked() {
                action = Some(EditorAction::Leave(LeaveAction::OpenDocument));
            }
            if ui.button("Save").clicked() {
                action = save_document(session, recents, false);
            }
            if ui.button("Save As...").clicked() {
                action = save_document(session, recents, true);
            }

            ui.separator();
            if ui
                .add_enabled(session.can_undo(), egui::Button::new("↶ Undo"))
                .clicked()
            {
                session.undo();
            }
            if ui
                .add_enabled(session.can_redo(), egui::Button::new("↷ Redo"))
                .clicked()
            {
                session.redo();
            }

            ui.separator();
            if ui.button("Insert image...").clicked() {
                if let Some(a) = self.begin_insert_image(session) {
                    action = Some(a);
                }
            }
        });

        let current = self
            .surface
            .selection()
            .map(|sel| style_under_cursor(&session.document, sel, self.surface.insertion()))
            .unwrap_or_else(|| session.default_style().clone());
        let (align, kind) = self
            .surface
            .selection()
            .and_then(|sel| session.document.index_of(sel.block))
            .map(|idx| match &session.document.blocks[idx] {
                Block::Text(t) => (t.align, Some(t.kind)),
                Block::Image(i) => (i.align, None),
            })
            .unwrap_or((Alignment::Left, None));

        ui.horizontal(|ui| {
            let family = current
                .family
                .clone()
                .or_else(|| session.default_style().family.clone())
                .unwrap_or_default();
            egui::ComboBox::from_id_salt("font_family")
                .selected_text(&family)
                .width(150.0)
                .show_ui(ui, |ui| {
                    for name in FONT_FAMILIES {
                        if ui.selectable_label(family == name, name).clicked() {
                            command = Some(FormatCommand::FontFamily(name.to_string()));
                        }
                    }
                });

            let size = current
                .size
                .or(session.default_style().size)
                .unwrap_or(12.0);
            egui::ComboBox::from_id_salt("font_size")
                .selected_text(format!("{}", size))
                .width(50.0)
                .show_ui(ui, |ui| {
                    for s in FONT_SIZES {
                        if ui.selectable_label(size == s, format!("{}", s)).clicked() {
                            command = Some(FormatCommand::FontSize(s));
                        }
                    }
                });

            ui.separator();
            if ui
                .selectable_label(current.bold, egui::RichText::new("B").strong())
                .on_hover_text("Bold (Ctrl+B)")
                .clicked()
            {
                command = Some(FormatCommand::ToggleBold);
            }
            if ui
                .selectable_label(current.italic, egui::RichText::new("I").italics())
                .on_hover_text("Italic (Ctrl+I)")
                .clicked()
            {
                command = Some(FormatCommand::ToggleItalic);
            }
            if ui
                .selectable_label(current.underline, egui::RichText::new("U").underline())
                .on_hover_text("Underline (Ctrl+U)")
                .clicked()
            {
                command = Some(FormatCommand::ToggleUnderline);
            }

            ui.separator();
            for a in Alignment::ALL {
                if ui.selectable_label(align == a, a.label()).clicked() {
                    command = Some(FormatCommand::Align(a));
                }
            }

            ui.separator();
            let bullets = kind == Some(BlockKind::ListItem(ListKind::Bullet));
            if ui.selectable_label(bullets, "• List").clicked() {
                command = Some(FormatCommand::ToggleList(ListKind::Bullet));
            }
            let numbered = kind == Some(BlockKind::ListItem(ListKind::Ordered));
            if ui.selectable_label(numbered, "1. List").clicked() {
                command = Some(FormatCommand::ToggleList(ListKind::Ordered));
            }

            ui.separator();
            for preset in [HeadingPreset::Title, HeadingPreset::Subtitle, HeadingPreset::Body] {
                if ui.button(preset.label()).clicked() {
                    command = Some(FormatCommand::Preset(preset));
                }
            }
        });

        if let Some(command) = command {
            self.run_format(session, command);
        }
        action
    }

    fn run_format(&mut self, session: &mut EditorSession, command: FormatCommand) {
        let Some(selection) = self.surface.selection().cloned() else {
            return;
        };
        tracing::debug!("Format {:?} on {:?}", command, selection);
        let insertion = self.surface.insertion_mut();
        session.edit(EditKind::Structure, |doc| command.apply(doc, &selection, insertion));
        self.surface.refocus();
    }

    fn begin_insert_image(&mut self, session: &EditorSession) -> Option<EditorAction> {
        let path = rfd::FileDialog::new()
            .add_filter("Images", &IMAGE_EXTENSIONS)
            .pick_file()?;

        let size = match ImageSize::read(&path) {
            Ok(size) => size,
            Err(e) => {
                tracing::warn!("Could not read image {}: {}", path.display(), e);
                return Some(EditorAction::Notice(Notice::error(format!(
                    "Could not read image {}: {}",
                    path.display(),
                    e
                ))));
            }
        };

        let base_dir = session.path().and_then(Path::parent);
        let target = ImageTarget::Insert {
            src: relative_src(&path, base_dir),
            after: self.surface.selection().map(|s| s.block),
        };
        self.image_dialog = Some(ImageDialog::new(target, ResizeForm::new(size)));
        None
    }

    fn begin_resize(&mut self, session: &EditorSession, id: BlockId) -> Option<EditorAction> {
        let image = session.document.blocks.iter().find_map(|b| match b {
            Block::Image(img) if img.id == id => Some(img),
            _ => None,
        })?;

        let base_dir = session.path().and_then(Path::parent);
        let natural = ImageSize::read(&resolve_src(&image.src, base_dir)).ok();
        let current = image.width.zip(image.height).map(|(w, h)| ImageSize::new(w, h));

        let Some(original) = natural.or(current) else {
            return Some(EditorAction::Notice(Notice::error(format!(
                "Could not read the size of {}",
                image.src
            ))));
        };
        let form = match current {
            Some(size) => ResizeForm::with_current(original, size.width, size.height),
            None => ResizeForm::new(original),
        };
        self.image_dialog = Some(ImageDialog::new(ImageTarget::Resize(id), form));
        None
    }

    fn apply_image(&mut self, session: &mut EditorSession, target: ImageTarget, size: ImageSize) {
        match target {
            ImageTarget::Insert { src, after } => {
                let mut inserted = None;
                session.edit(EditKind::Structure, |doc| {
                    let block = ImageBlock::new(src, Some(size.width), Some(size.height));
                    inserted = Some(doc.insert_after(after, Block::Image(block)));
                    true
                });
                if let Some(id) = inserted {
                    self.surface.select_block(id);
                }
            }
            ImageTarget::Resize(id) => {
                session.edit(EditKind::Structure, |doc| match doc.block_mut(id) {
                    Some(Block::Image(img)) => {
                        let changed =
                            img.width != Some(size.width) || img.height != Some(size.height);
                        img.width = Some(size.width);
                        img.height = Some(size.height);
                        changed
                    }
                    _ => false,
                });
            }
        }
    }
}

/// Save the session, asking for a file when it has none (or for "Save As")
pub fn save_document(
    session: &mut EditorSession,
    recents: &mut dyn RecentsRepository,
    save_as: bool,
) -> Option<EditorAction> {
    let result = if save_as || session.path().is_none() {
        let path = pick_save_path(session)?;
        session.save_to(&path, recents)
    } else {
        session.save(recents).map(|_| ())
    };

    match result {
        Ok(()) => None,
        Err(e) => {
            tracing::error!("Failed to save document: {}", e);
            Some(EditorAction::Notice(Notice::error(e.to_string())))
        }
    }
}

/// Ask where to save the document
pub fn pick_save_path(session: &EditorSession) -> Option<PathBuf> {
    let mut dialog = rfd::FileDialog::new().add_filter("HTML", &["html", "htm"]);
    if let Some(dir) = session.path().and_then(Path::parent) {
        dialog = dialog.set_directory(dir);
    }
    dialog
        .set_file_name(format!("{}.html", session.display_name().trim_end_matches(".html")))
        .save_file()
        .map(with_html_extension)
}

/// Append `.html` unless the name already ends in `.html`/`.htm`
pub fn with_html_extension(path: PathBuf) -> PathBuf {
    let is_html = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));
    if is_html {
        return path;
    }
    let mut name = path.into_os_string();
    name.push(".html");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_extension_is_appended_when_missing() {
        assert_eq!(
            with_html_extension(PathBuf::from("/books/draft")),
            PathBuf::from("/books/draft.html")
        );
        assert_eq!(
            with_html_extension(PathBuf::from("/books/v1.0")),
            PathBuf::from("/books/v1.0.html")
        );
    }

    #[test]
    fn test_html_extension_is_kept() {
        assert_eq!(
            with_html_extension(PathBuf::from("/books/a.HTML")),
            PathBuf::from("/books/a.HTML")
        );
        assert_eq!(
            with_html_extension(PathBuf::from("/books/a.htm")),
            PathBuf::from("/books/a.htm")
        );
    }
}
