//! Rich-text editing surface
//!
//! Every text block is edited through its own `TextEdit` whose layouter
//! paints the block's runs. Changes to the plain text are diffed back into
//! the runs; a typed line break splits the block and Backspace at the start
//! of a block joins it to the previous one.

use std::ops::Range;
use std::path::Path;

use eframe::egui;
use egui::text::{CCursor, CCursorRange, LayoutJob, TextFormat};

use crate::core::history::EditKind;
use crate::core::session::EditorSession;
use crate::document::format::{InsertionStyle, Selection};
use crate::document::{
    resolve_src, Alignment, Block, BlockId, BlockKind, CharStyle, ListKind, RichDocument,
    TextBlock,
};

/// Points to egui pixels
const PT_TO_PX: f32 = 4.0 / 3.0;

/// Something the surface needs the editor to handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceRequest {
    ResizeImage(BlockId),
}

#[derive(Debug, Default)]
pub struct Surface {
    selection: Option<Selection>,
    insertion: InsertionStyle,
    /// Block to focus next frame, with the caret position (`None` keeps the
    /// caret where it was)
    pending_focus: Option<(BlockId, Option<usize>)>,
}

impl Surface {
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn insertion(&self) -> &InsertionStyle {
        &self.insertion
    }

    pub fn insertion_mut(&mut self) -> &mut InsertionStyle {
        &mut self.insertion
    }

    /// Select a whole block without a text caret (images)
    pub fn select_block(&mut self, id: BlockId) {
        self.selection = Some(Selection::caret(id, 0));
        self.insertion = None;
    }

    /// Give keyboard focus back to the selected block, e.g. after a toolbar click
    pub fn refocus(&mut self) {
        if let Some(sel) = &self.selection {
            self.pending_focus = Some((sel.block, None));
        }
    }

    /// Drop the selection if its block is gone (after undo, load, ...)
    fn validate(&mut self, doc: &RichDocument) {
        if let Some(sel) = &self.selection {
            if doc.index_of(sel.block).is_none() {
                self.selection = None;
                self.insertion = None;
            }
        }
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        session: &mut EditorSession,
        base_dir: Option<&Path>,
    ) -> Option<SurfaceRequest> {
        self.validate(&session.document);

        let ids: Vec<BlockId> = session.document.blocks.iter().map(Block::id).collect();
        let mut request = None;
        let mut number = 0;

        for id in ids {
            let Some(idx) = session.document.index_of(id) else {
                continue;
            };
            let text_block = match &session.document.blocks[idx] {
                Block::Text(block) => Some(block.clone()),
                Block::Image(_) => None,
            };
            let structure_changed = match text_block {
                Some(block) => {
                    let prefix = match block.kind {
                        BlockKind::ListItem(ListKind::Ordered) => {
                            number += 1;
                            Some(format!("{}.", number))
                        }
                        BlockKind::ListItem(ListKind::Bullet) => {
                            number = 0;
                            Some("•".to_string())
                        }
                        _ => {
                            number = 0;
                            None
                        }
                    };
                    self.show_text_block(ui, session, block, prefix)
                }
                None => {
                    number = 0;
                    match self.show_image_block(ui, session, id, base_dir) {
                        ImageEvent::None => false,
                        ImageEvent::Removed => true,
                        ImageEvent::Resize => {
                            request = Some(SurfaceRequest::ResizeImage(id));
                            false
                        }
                    }
                }
            };

            if structure_changed {
                ui.ctx().request_repaint();
                break;
            }
        }

        request
    }

    /// Returns whether blocks were added or removed
    fn show_text_block(
        &mut self,
        ui: &mut egui::Ui,
        session: &mut EditorSession,
        block: TextBlock,
        prefix: Option<String>,
    ) -> bool {
        let id = block.id;
        let edit_id = egui::Id::new(("bookwright_block", id));

        if let Some((_, caret)) = self.pending_focus.filter(|(f, _)| *f == id) {
            if let Some(pos) = caret {
                let mut state = egui::text_edit::TextEditState::load(ui.ctx(), edit_id)
                    .unwrap_or_default();
                state
                    .cursor
                    .set_char_range(Some(CCursorRange::one(CCursor::new(pos))));
                state.store(ui.ctx(), edit_id);
            }
            ui.memory_mut(|m| m.request_focus(edit_id));
            self.pending_focus = None;
        }

        let original = block.text();
        let mut text = original.clone();
        let default_style = session.default_style().clone();
        let halign = match block.align {
            Alignment::Center => egui::Align::Center,
            Alignment::Right => egui::Align::Max,
            Alignment::Left | Alignment::Justify => egui::Align::Min,
        };

        let mut layouter = |ui: &egui::Ui, buf: &dyn egui::TextBuffer, wrap_width: f32| {
            let mut job = layout_job(&block, buf.as_str(), &default_style, ui.visuals());
            job.wrap.max_width = wrap_width;
            ui.fonts(|f| f.layout_job(job))
        };

        let output = ui
            .horizontal_top(|ui| {
                if let Some(prefix) = &prefix {
                    ui.add_sized([24.0, 0.0], egui::Label::new(prefix));
                }
                egui::TextEdit::multiline(&mut text)
                    .id(edit_id)
                    .frame(false)
                    .desired_rows(1)
                    .desired_width(f32::INFINITY)
                    .horizontal_align(halign)
                    .layouter(&mut layouter)
                    .show(ui)
            })
            .inner;

        let focused = output.response.has_focus();
        let cursor = output.state.cursor.char_range().map(|r| {
            let (a, b) = (r.primary.index, r.secondary.index);
            a.min(b)..a.max(b)
        });

        if text != original {
            let (range, inserted) = diff_chars(&original, &text);
            let typing =
                inserted.chars().count() <= 1 && range.len() <= 1 && !inserted.contains('\n');
            let kind = if typing {
                EditKind::Typing
            } else {
                EditKind::Structure
            };
            let style = self
                .insertion
                .take()
                .unwrap_or_else(|| block.style_at(range.start));

            let mut caret = None;
            session.edit(kind, |doc| {
                caret = apply_text_change(doc, id, range, &inserted, style);
                caret.is_some()
            });

            if let Some((caret_block, pos)) = caret {
                self.selection = Some(Selection::caret(caret_block, pos));
                if caret_block != id {
                    self.pending_focus = Some((caret_block, Some(pos)));
                    return true;
                }
            }
            return false;
        }

        let backspace = focused && ui.input(|i| i.key_pressed(egui::Key::Backspace));
        let at_start = cursor.as_ref().is_some_and(|r| r.is_empty() && r.start == 0);
        if backspace && at_start && session.document.index_of(id).is_some_and(|i| i > 0) {
            let mut target = None;
            session.edit(EditKind::Structure, |doc| {
                target = doc.merge_with_previous(id);
                target.is_some()
            });
            if let Some((block, pos)) = target {
                self.selection = Some(Selection::caret(block, pos));
                self.pending_focus = Some((block, Some(pos)));
                return true;
            }
        }

        if focused {
            if let Some(range) = cursor {
                let selection = Selection { block: id, range };
                if self.selection.as_ref() != Some(&selection) {
                    self.selection = Some(selection);
                    self.insertion = None;
                }
            }
        }

        false
    }

    fn show_image_block(
        &mut self,
        ui: &mut egui::Ui,
        session: &mut EditorSession,
        id: BlockId,
        base_dir: Option<&Path>,
    ) -> ImageEvent {
        let Some(Block::Image(image)) = session.document.blocks.iter().find(|b| b.id() == id)
        else {
            return ImageEvent::None;
        };
        let image = image.clone();
        let selected = self.selection.as_ref().is_some_and(|s| s.block == id);
        let layout = match image.align {
            Alignment::Center => egui::Layout::top_down(egui::Align::Center),
            Alignment::Right => egui::Layout::top_down(egui::Align::Max),
            Alignment::Left | Alignment::Justify => egui::Layout::top_down(egui::Align::Min),
        };

        let mut event = ImageEvent::None;
        ui.with_layout(layout, |ui| {
            let mut widget = egui::Image::from_uri(image_uri(&image.src, base_dir))
                .sense(egui::Sense::click());
            widget = match (image.width, image.height) {
                (Some(w), Some(h)) => widget.fit_to_exact_size(egui::vec2(w as f32, h as f32)),
                (Some(w), None) => widget.max_width(w as f32),
                _ => widget.max_width(ui.available_width()),
            };

            let response = ui.add(widget);
            if response.clicked() {
                self.select_block(id);
            }
            if selected {
                ui.painter().rect_stroke(
                    response.rect,
                    0.0,
                    ui.visuals().selection.stroke,
                    egui::StrokeKind::Outside,
                );
                ui.horizontal(|ui| {
                    if ui.small_button("Resize...").clicked() {
                        event = ImageEvent::Resize;
                    }
                    if ui.small_button("Remove").clicked() {
                        event = ImageEvent::Removed;
                    }
                });
            }
        });

        if event == ImageEvent::Removed {
            let style = session.default_style().clone();
            session.edit(EditKind::Structure, |doc| {
                doc.remove_block(id, &style);
                true
            });
            self.selection = None;
        }
        event
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageEvent {
    None,
    Resize,
    Removed,
}

/// Smallest char range of `old` to replace, and its replacement, turning
/// `old` into `new`
pub fn diff_chars(old: &str, new: &str) -> (Range<usize>, String) {
    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();

    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    (
        prefix..old.len() - suffix,
        new[prefix..new.len() - suffix].iter().collect(),
    )
}

/// Replace `range` of block `id` with `inserted`, turning each line break
/// into a block split. Returns the block and position of the caret
/// afterwards.
pub fn apply_text_change(
    doc: &mut RichDocument,
    id: BlockId,
    range: Range<usize>,
    inserted: &str,
    style: CharStyle,
) -> Option<(BlockId, usize)> {
    let inserted = inserted.replace('\r', "");
    doc.text_block_mut(id)?
        .replace_range(range.clone(), &inserted, style.clone());

    let mut current = id;
    // Where the current block's share of `inserted` starts, in `inserted` and in the block
    let mut segment_start = 0;
    let mut at = range.start;
    for (k, c) in inserted.chars().enumerate() {
        if c != '\n' {
            continue;
        }
        let pos = at + (k - segment_start);
        doc.text_block_mut(current)?
            .replace_range(pos..pos + 1, "", style.clone());
        current = doc.split_block(current, pos)?;
        segment_start = k + 1;
        at = 0;
    }

    Some((current, at + (inserted.chars().count() - segment_start)))
}

/// Image source as a URI egui's loaders understand
pub fn image_uri(src: &str, base_dir: Option<&Path>) -> String {
    if src.contains("://") {
        return src.to_string();
    }
    format!("file://{}", resolve_src(src, base_dir).display())
}

fn layout_job(
    block: &TextBlock,
    text: &str,
    default: &CharStyle,
    visuals: &egui::Visuals,
) -> LayoutJob {
    let mut job = LayoutJob::default();
    let mut rest = text;

    for run in &block.runs {
        if rest.is_empty() {
            break;
        }
        let n = run.text.chars().count();
        let split = rest.char_indices().nth(n).map(|(i, _)| i).unwrap_or(rest.len());
        let (head, tail) = rest.split_at(split);
        job.append(head, 0.0, text_format(&run.style, block.kind, default, visuals));
        rest = tail;
    }

    if !rest.is_empty() || job.sections.is_empty() {
        let style = block.runs.last().map(|r| r.style.clone()).unwrap_or_default();
        job.append(rest, 0.0, text_format(&style, block.kind, default, visuals));
    }

    match block.align {
        Alignment::Left => {}
        Alignment::Center => job.halign = egui::Align::Center,
        Alignment::Right => job.halign = egui::Align::Max,
        Alignment::Justify => job.justify = true,
    }
    job
}

fn heading_size(kind: BlockKind) -> Option<f32> {
    match kind {
        BlockKind::Heading(1) => Some(24.0),
        BlockKind::Heading(2) => Some(18.0),
        BlockKind::Heading(3) => Some(14.0),
        _ => None,
    }
}

fn font_family(name: &str) -> egui::FontFamily {
    let name = name.to_ascii_lowercase();
    if name.contains("mono") || name.contains("courier") {
        egui::FontFamily::Monospace
    } else {
        egui::FontFamily::Proportional
    }
}

fn text_format(
    style: &CharStyle,
    kind: BlockKind,
    default: &CharStyle,
    visuals: &egui::Visuals,
) -> TextFormat {
    let size = style
        .size
        .or_else(|| heading_size(kind))
        .or(default.size)
        .unwrap_or(12.0);
    let family = style
        .family
        .as_deref()
        .or(default.family.as_deref())
        .map(font_family)
        .unwrap_or(egui::FontFamily::Proportional);

    // No bold faces in the bundled fonts; bold text is drawn in the strong colour
    let color = if style.bold || matches!(kind, BlockKind::Heading(_)) {
        visuals.strong_text_color()
    } else {
        visuals.text_color()
    };

    TextFormat {
        font_id: egui::FontId::new(size * PT_TO_PX, family),
        color,
        italics: style.italic,
        underline: if style.underline {
            egui::Stroke::new(1.0, color)
        } else {
            egui::Stroke::NONE
        },
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> CharStyle {
        CharStyle {
            bold: true,
            ..Default::default()
        }
    }

    fn doc_with(text: &str) -> (RichDocument, BlockId) {
        let block = TextBlock::paragraph(text, CharStyle::default());
        let id = block.id;
        (
            RichDocument {
                title: String::new(),
                blocks: vec![Block::Text(block)],
            },
            id,
        )
    }

    #[test]
    fn test_diff_single_insert() {
        assert_eq!(diff_chars("helo", "hello"), (3..3, "l".to_string()));
        assert_eq!(diff_chars("", "a"), (0..0, "a".to_string()));
    }

    #[test]
    fn test_diff_replacement_and_delete() {
        assert_eq!(diff_chars("hello world", "hello there"), (6..11, "there".to_string()));
        assert_eq!(diff_chars("abc", "ac"), (1..2, String::new()));
        assert_eq!(diff_chars("olá", "oá"), (1..2, String::new()));
    }

    #[test]
    fn test_typing_uses_given_style() {
        let (mut doc, id) = doc_with("ab");
        let caret = apply_text_change(&mut doc, id, 1..1, "X", bold());

        assert_eq!(caret, Some((id, 2)));
        let block = doc.text_block(id).unwrap();
        assert_eq!(block.text(), "aXb");
        assert_eq!(block.runs[1].style, bold());
    }

    #[test]
    fn test_line_break_splits_block() {
        let (mut doc, id) = doc_with("firstsecond");
        let (caret_block, pos) =
            apply_text_change(&mut doc, id, 5..5, "\n", CharStyle::default()).unwrap();

        assert_ne!(caret_block, id);
        assert_eq!(pos, 0);
        assert_eq!(doc.plain_text(), "first\nsecond");
        assert_eq!(doc.blocks.len(), 2);
    }

    #[test]
    fn test_pasted_lines_become_blocks() {
        let (mut doc, id) = doc_with("[]");
        let (caret_block, pos) =
            apply_text_change(&mut doc, id, 1..1, "one\r\ntwo\nthree", CharStyle::default())
                .unwrap();

        assert_eq!(doc.plain_text(), "[one\ntwo\nthree]");
        assert_eq!(doc.blocks.len(), 3);
        assert_eq!(doc.index_of(caret_block), Some(2));
        assert_eq!(pos, 5);
    }

    #[test]
    fn test_unknown_block_is_ignored() {
        let (mut doc, _) = doc_with("x");
        let other = BlockId::next();
        assert_eq!(
            apply_text_change(&mut doc, other, 0..0, "y", CharStyle::default()),
            None
        );
        assert_eq!(doc.plain_text(), "x");
    }

    #[test]
    fn test_image_uri() {
        let base = Path::new("/books/Novel");
        assert_eq!(image_uri("img/cover.png", Some(base)), "file:///books/Novel/img/cover.png");
        assert_eq!(image_uri("https://x.org/a.png", Some(base)), "https://x.org/a.png");
    }
}
