//! Formatting commands applied to the active selection

use std::ops::Range;

use super::{Alignment, Block, BlockId, BlockKind, CharStyle, ListKind, RichDocument};

/// Family used by the heading presets
pub const PRESET_FAMILY: &str = "Times New Roman";

/// Sizes offered by the size picker
pub const FONT_SIZES: [f32; 19] = [
    8.0, 9.0, 10.0, 11.0, 12.0, 14.0, 16.0, 18.0, 20.0, 22.0, 24.0, 26.0, 28.0, 32.0, 36.0, 42.0,
    48.0, 56.0, 72.0,
];

/// Families offered by the font picker
pub const FONT_FAMILIES: [&str; 8] = [
    "Times New Roman",
    "Georgia",
    "Garamond",
    "Arial",
    "Helvetica",
    "Verdana",
    "Courier New",
    "Monospace",
];

/// One-click paragraph styles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingPreset {
    Title,
    Subtitle,
    Body,
}

impl HeadingPreset {
    pub fn label(self) -> &'static str {
        match self {
            HeadingPreset::Title => "Title",
            HeadingPreset::Subtitle => "Subtitle",
            HeadingPreset::Body => "Body text",
        }
    }

    fn kind(self) -> BlockKind {
        match self {
            HeadingPreset::Title => BlockKind::Heading(1),
            HeadingPreset::Subtitle => BlockKind::Heading(2),
            HeadingPreset::Body => BlockKind::Paragraph,
        }
    }

    fn merge_into(self, style: &mut CharStyle) {
        style.family = Some(PRESET_FAMILY.to_string());
        match self {
            HeadingPreset::Title => {
                style.size = Some(24.0);
                style.bold = true;
            }
            HeadingPreset::Subtitle => {
                style.size = Some(18.0);
                style.bold = true;
            }
            HeadingPreset::Body => {
                style.size = Some(12.0);
                style.bold = false;
                style.italic = false;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormatCommand {
    ToggleBold,
    ToggleItalic,
    ToggleUnderline,
    FontFamily(String),
    FontSize(f32),
    Align(Alignment),
    ToggleList(ListKind),
    Preset(HeadingPreset),
}

/// Cursor or selection inside one block, in characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub block: BlockId,
    pub range: Range<usize>,
}

impl Selection {
    pub fn caret(block: BlockId, pos: usize) -> Self {
        Self {
            block,
            range: pos..pos,
        }
    }

    pub fn is_caret(&self) -> bool {
        self.range.is_empty()
    }
}

/// Style applied to the next typed text when the cursor has no selection
pub type InsertionStyle = Option<CharStyle>;

impl FormatCommand {
    /// Apply to `doc`. With a bare caret, character formatting goes to
    /// `insertion` instead of the document. Returns whether the document
    /// itself changed.
    pub fn apply(
        &self,
        doc: &mut RichDocument,
        selection: &Selection,
        insertion: &mut InsertionStyle,
    ) -> bool {
        match self {
            FormatCommand::Align(align) => {
                let Some(block) = doc.block_mut(selection.block) else {
                    return false;
                };
                let changed = block.align() != *align;
                block.set_align(*align);
                changed
            }
            FormatCommand::ToggleList(list) => {
                let Some(block) = doc.text_block_mut(selection.block) else {
                    return false;
                };
                block.kind = match block.kind {
                    BlockKind::ListItem(current) if current == *list => BlockKind::Paragraph,
                    _ => BlockKind::ListItem(*list),
                };
                true
            }
            FormatCommand::Preset(preset) => {
                let Some(block) = doc.text_block_mut(selection.block) else {
                    return false;
                };
                block.kind = preset.kind();
                let range = if selection.is_caret() {
                    0..block.char_len()
                } else {
                    selection.range.clone()
                };
                if range.is_empty() {
                    for run in &mut block.runs {
                        preset.merge_into(&mut run.style);
                    }
                } else {
                    block.apply_style(range, |s| preset.merge_into(s));
                }
                *insertion = None;
                true
            }
            _ => self.apply_char_format(doc, selection, insertion),
        }
    }

    fn apply_char_format(
        &self,
        doc: &mut RichDocument,
        selection: &Selection,
        insertion: &mut InsertionStyle,
    ) -> bool {
        let Some(block) = doc.text_block_mut(selection.block) else {
            return false;
        };

        if selection.is_caret() {
            let mut style = insertion
                .take()
                .unwrap_or_else(|| block.style_at(selection.range.start));
            match self {
                FormatCommand::ToggleBold => style.bold = !style.bold,
                FormatCommand::ToggleItalic => style.italic = !style.italic,
                FormatCommand::ToggleUnderline => style.underline = !style.underline,
                FormatCommand::FontFamily(family) => style.family = Some(family.clone()),
                FormatCommand::FontSize(size) => style.size = Some(*size),
                _ => {}
            }
            *insertion = Some(style);
            return false;
        }

        let range = selection.range.clone();
        match self {
            FormatCommand::ToggleBold => {
                let on = !block.all_in_range(range.clone(), |s| s.bold);
                block.apply_style(range, |s| s.bold = on);
            }
            FormatCommand::ToggleItalic => {
                let on = !block.all_in_range(range.clone(), |s| s.italic);
                block.apply_style(range, |s| s.italic = on);
            }
            FormatCommand::ToggleUnderline => {
                let on = !block.all_in_range(range.clone(), |s| s.underline);
                block.apply_style(range, |s| s.underline = on);
            }
            FormatCommand::FontFamily(family) => {
                block.apply_style(range, |s| s.family = Some(family.clone()));
            }
            FormatCommand::FontSize(size) => {
                block.apply_style(range, |s| s.size = Some(*size));
            }
            _ => return false,
        }
        true
    }
}

/// Style shown by the toolbar for the current cursor
pub fn style_under_cursor(
    doc: &RichDocument,
    selection: &Selection,
    insertion: &InsertionStyle,
) -> CharStyle {
    if let Some(style) = insertion {
        return style.clone();
    }
    doc.blocks
        .iter()
        .find_map(|b| match b {
            Block::Text(t) if t.id == selection.block => {
                let pos = if selection.is_caret() {
                    selection.range.start
                } else {
                    selection.range.start + 1
                };
                Some(t.style_at(pos))
            }
            _ => None,
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Run, TextBlock};

    fn doc_with(text: &str) -> (RichDocument, BlockId) {
        let block = TextBlock::paragraph(text, CharStyle::default());
        let id = block.id;
        let doc = RichDocument {
            title: String::new(),
            blocks: vec![Block::Text(block)],
        };
        (doc, id)
    }

    #[test]
    fn test_toggle_bold_on_selection() {
        let (mut doc, id) = doc_with("hello world");
        let sel = Selection {
            block: id,
            range: 0..5,
        };
        let mut insertion = None;

        assert!(FormatCommand::ToggleBold.apply(&mut doc, &sel, &mut insertion));
        let block = doc.text_block(id).unwrap();
        assert!(block.runs[0].style.bold);
        assert_eq!(block.runs[0].text, "hello");

        FormatCommand::ToggleBold.apply(&mut doc, &sel, &mut insertion);
        assert_eq!(doc.text_block(id).unwrap().runs.len(), 1);
    }

    #[test]
    fn test_toggle_on_caret_sets_insertion_style() {
        let (mut doc, id) = doc_with("hello");
        let before = doc.clone();
        let mut insertion = None;

        let changed =
            FormatCommand::ToggleItalic.apply(&mut doc, &Selection::caret(id, 2), &mut insertion);

        assert!(!changed);
        assert_eq!(doc, before);
        assert!(insertion.as_ref().is_some_and(|s| s.italic));

        FormatCommand::FontSize(18.0).apply(&mut doc, &Selection::caret(id, 2), &mut insertion);
        let style = insertion.unwrap();
        assert!(style.italic);
        assert_eq!(style.size, Some(18.0));
    }

    #[test]
    fn test_title_preset_on_caret_formats_whole_block() {
        let (mut doc, id) = doc_with("Chapter one");
        let mut insertion = Some(CharStyle::default());

        FormatCommand::Preset(HeadingPreset::Title).apply(
            &mut doc,
            &Selection::caret(id, 3),
            &mut insertion,
        );

        let block = doc.text_block(id).unwrap();
        assert_eq!(block.kind, BlockKind::Heading(1));
        assert_eq!(block.runs.len(), 1);
        assert_eq!(block.runs[0].style.size, Some(24.0));
        assert!(block.runs[0].style.bold);
        assert!(insertion.is_none());
    }

    #[test]
    fn test_body_preset_clears_bold_and_italic() {
        let mut block = TextBlock::new(BlockKind::Heading(2), Alignment::Left);
        block.runs.push(Run::new(
            "x",
            CharStyle {
                bold: true,
                italic: true,
                ..Default::default()
            },
        ));
        let id = block.id;
        let mut doc = RichDocument {
            title: String::new(),
            blocks: vec![Block::Text(block)],
        };

        FormatCommand::Preset(HeadingPreset::Body).apply(
            &mut doc,
            &Selection::caret(id, 0),
            &mut None,
        );

        let block = doc.text_block(id).unwrap();
        assert_eq!(block.kind, BlockKind::Paragraph);
        assert!(!block.runs[0].style.bold);
        assert!(!block.runs[0].style.italic);
        assert_eq!(block.runs[0].style.size, Some(12.0));
    }

    #[test]
    fn test_toggle_list_twice_restores_paragraph() {
        let (mut doc, id) = doc_with("item");
        let sel = Selection::caret(id, 0);
        let cmd = FormatCommand::ToggleList(ListKind::Ordered);

        cmd.apply(&mut doc, &sel, &mut None);
        assert_eq!(
            doc.text_block(id).unwrap().kind,
            BlockKind::ListItem(ListKind::Ordered)
        );

        FormatCommand::ToggleList(ListKind::Bullet).apply(&mut doc, &sel, &mut None);
        assert_eq!(
            doc.text_block(id).unwrap().kind,
            BlockKind::ListItem(ListKind::Bullet)
        );

        FormatCommand::ToggleList(ListKind::Bullet).apply(&mut doc, &sel, &mut None);
        assert_eq!(doc.text_block(id).unwrap().kind, BlockKind::Paragraph);
    }

    #[test]
    fn test_align_reports_change() {
        let (mut doc, id) = doc_with("x");
        let sel = Selection::caret(id, 0);
        assert!(FormatCommand::Align(Alignment::Center).apply(&mut doc, &sel, &mut None));
        assert!(!FormatCommand::Align(Alignment::Center).apply(&mut doc, &sel, &mut None));
        assert_eq!(doc.blocks[0].align(), Alignment::Center);
    }
}
