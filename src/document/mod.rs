//! Rich-text document model
//!
//! A document is a flat list of blocks. Text blocks hold styled runs and are
//! addressed by character index (the same unit egui's text cursors use);
//! image blocks hold a source path and an optional display size.

pub mod format;
pub mod html;
pub mod resize;

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique block identity, used to keep widget state attached to a
/// block while blocks around it are inserted or removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(u64);

impl BlockId {
    pub fn next() -> Self {
        Self(NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Character formatting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CharStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Font family name, `None` inherits the editor default
    pub family: Option<String>,
    /// Point size, `None` inherits the block default
    pub size: Option<f32>,
}

/// A stretch of text sharing one style
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub style: CharStyle,
}

impl Run {
    pub fn new(text: impl Into<String>, style: CharStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Paragraph alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub const ALL: [Alignment; 4] = [
        Alignment::Left,
        Alignment::Center,
        Alignment::Right,
        Alignment::Justify,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Alignment::Left => "Left",
            Alignment::Center => "Center",
            Alignment::Right => "Right",
            Alignment::Justify => "Justify",
        }
    }
}

/// List style of a list item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Ordered,
    Bullet,
}

/// Role of a text block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockKind {
    #[default]
    Paragraph,
    /// Heading level 1-6
    Heading(u8),
    ListItem(ListKind),
}

/// A paragraph, heading or list item
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub id: BlockId,
    pub kind: BlockKind,
    pub align: Alignment,
    pub runs: Vec<Run>,
}

impl PartialEq for TextBlock {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.align == other.align && self.runs == other.runs
    }
}

/// An embedded image
#[derive(Debug, Clone)]
pub struct ImageBlock {
    pub id: BlockId,
    /// Path or URL as written in the document
    pub src: String,
    /// Display width in pixels, `None` for the natural width
    pub width: Option<u32>,
    /// Display height in pixels, `None` for the natural height
    pub height: Option<u32>,
    pub align: Alignment,
}

impl PartialEq for ImageBlock {
    fn eq(&self, other: &Self) -> bool {
        self.src == other.src
            && self.width == other.width
            && self.height == other.height
            && self.align == other.align
    }
}

impl ImageBlock {
    pub fn new(src: impl Into<String>, width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            id: BlockId::next(),
            src: src.into(),
            width,
            height,
            align: Alignment::Left,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text(TextBlock),
    Image(ImageBlock),
}

impl Block {
    pub fn id(&self) -> BlockId {
        match self {
            Block::Text(b) => b.id,
            Block::Image(b) => b.id,
        }
    }

    pub fn align(&self) -> Alignment {
        match self {
            Block::Text(b) => b.align,
            Block::Image(b) => b.align,
        }
    }

    pub fn set_align(&mut self, align: Alignment) {
        match self {
            Block::Text(b) => b.align = align,
            Block::Image(b) => b.align = align,
        }
    }
}

/// Byte offset of the `char_idx`-th character (or the end of the string)
fn byte_index(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

impl TextBlock {
    pub fn new(kind: BlockKind, align: Alignment) -> Self {
        Self {
            id: BlockId::next(),
            kind,
            align,
            runs: Vec::new(),
        }
    }

    /// A paragraph holding one run
    pub fn paragraph(text: impl Into<String>, style: CharStyle) -> Self {
        let mut block = Self::new(BlockKind::Paragraph, Alignment::Left);
        block.runs.push(Run::new(text, style));
        block
    }

    /// Plain text of the block
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn char_len(&self) -> usize {
        self.runs.iter().map(Run::char_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.is_empty())
    }

    /// Style new text typed at `pos` picks up: the character before the
    /// cursor, or the first character at the start of the block
    pub fn style_at(&self, pos: usize) -> CharStyle {
        let idx = pos.saturating_sub(1);
        let mut offset = 0;
        for run in &self.runs {
            let len = run.char_len();
            if idx < offset + len {
                return run.style.clone();
            }
            offset += len;
        }
        self.runs
            .last()
            .map(|r| r.style.clone())
            .unwrap_or_default()
    }

    /// Append text to the end of the block
    pub fn push_text(&mut self, text: &str, style: &CharStyle) {
        if text.is_empty() {
            return;
        }
        match self.runs.last_mut() {
            Some(last) if last.style == *style || last.text.is_empty() => {
                last.text.push_str(text);
                last.style = style.clone();
            }
            _ => self.runs.push(Run::new(text, style.clone())),
        }
    }

    /// Make sure a run starts at `pos`, returning that run's index
    fn split_run_at(&mut self, pos: usize) -> usize {
        let mut offset = 0;
        for i in 0..self.runs.len() {
            if pos == offset {
                return i;
            }
            let len = self.runs[i].char_len();
            if pos < offset + len {
                let at = byte_index(&self.runs[i].text, pos - offset);
                let tail = self.runs[i].text.split_off(at);
                let style = self.runs[i].style.clone();
                self.runs.insert(i + 1, Run::new(tail, style));
                return i + 1;
            }
            offset += len;
        }
        self.runs.len()
    }

    /// Merge neighbouring runs with equal style and drop empty ones, keeping
    /// a single empty run so an emptied block remembers its style
    fn normalize(&mut self) {
        let mut merged: Vec<Run> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            match merged.last_mut() {
                Some(last) if last.style == run.style => last.text.push_str(&run.text),
                _ => merged.push(run),
            }
        }

        if merged.iter().any(|r| !r.text.is_empty()) {
            merged.retain(|r| !r.text.is_empty());
        } else {
            merged.truncate(1);
        }
        self.runs = merged;
    }

    fn clamp(&self, range: Range<usize>) -> Range<usize> {
        let len = self.char_len();
        let start = range.start.min(len);
        let end = range.end.clamp(start, len);
        start..end
    }

    /// Replace the characters in `range` with `text` in the given style
    pub fn replace_range(&mut self, range: Range<usize>, text: &str, style: CharStyle) {
        let range = self.clamp(range);
        let start = self.split_run_at(range.start);
        let end = self.split_run_at(range.end);
        self.runs.splice(start..end, [Run::new(text, style)]);
        self.normalize();
    }

    /// Change the style of the characters in `range`
    pub fn apply_style(&mut self, range: Range<usize>, f: impl Fn(&mut CharStyle)) {
        let range = self.clamp(range);
        if range.is_empty() {
            return;
        }
        let start = self.split_run_at(range.start);
        let end = self.split_run_at(range.end);
        for run in &mut self.runs[start..end] {
            f(&mut run.style);
        }
        self.normalize();
    }

    /// Whether every character in `range` satisfies `pred`
    pub fn all_in_range(&self, range: Range<usize>, pred: impl Fn(&CharStyle) -> bool) -> bool {
        let range = self.clamp(range);
        let mut offset = 0;
        for run in &self.runs {
            let len = run.char_len();
            let overlaps = offset < range.end && range.start < offset + len;
            if overlaps && !pred(&run.style) {
                return false;
            }
            offset += len;
        }
        true
    }

    /// Split the block at `pos`; the returned block holds the tail.
    ///
    /// A heading continues as a paragraph, list items continue the list.
    pub fn split_off(&mut self, pos: usize) -> TextBlock {
        let pos = pos.min(self.char_len());
        let tail_style = self.style_at(pos);
        let at = self.split_run_at(pos);
        let mut tail = TextBlock::new(self.kind, self.align);
        if let BlockKind::Heading(_) = tail.kind {
            tail.kind = BlockKind::Paragraph;
        }
        tail.runs = self.runs.split_off(at);
        if tail.runs.is_empty() {
            tail.runs.push(Run::new("", tail_style.clone()));
        }
        if self.runs.is_empty() {
            self.runs.push(Run::new("", tail_style));
        }
        self.normalize();
        tail.normalize();
        tail
    }

    /// Append another block's runs
    pub fn append(&mut self, other: TextBlock) {
        if self.is_empty() {
            self.runs = other.runs;
        } else {
            self.runs.extend(other.runs);
        }
        self.normalize();
    }

    /// Drop trailing ASCII whitespace
    pub fn trim_end(&mut self) {
        while let Some(last) = self.runs.last_mut() {
            let trimmed = last.text.trim_end_matches(|c: char| c.is_ascii_whitespace()).len();
            last.text.truncate(trimmed);
            if last.text.is_empty() && self.runs.len() > 1 {
                self.runs.pop();
            } else {
                break;
            }
        }
    }

    /// Whether the text ends with an ASCII space (or is empty)
    pub fn ends_with_space(&self) -> bool {
        self.runs
            .iter()
            .rev()
            .find(|r| !r.text.is_empty())
            .map(|r| r.text.ends_with(' '))
            .unwrap_or(true)
    }
}

/// A whole rich-text document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RichDocument {
    /// Document title, written to `<title>`
    pub title: String,
    pub blocks: Vec<Block>,
}

impl RichDocument {
    /// Empty document with one blank paragraph in the default style
    pub fn blank(title: impl Into<String>, style: CharStyle) -> Self {
        Self {
            title: title.into(),
            blocks: vec![Block::Text(TextBlock::paragraph("", style))],
        }
    }

    /// Make sure there is a text block to type into
    pub fn ensure_editable(&mut self, style: &CharStyle) {
        if !self.blocks.iter().any(|b| matches!(b, Block::Text(_))) {
            self.blocks
                .push(Block::Text(TextBlock::paragraph("", style.clone())));
        }
    }

    pub fn index_of(&self, id: BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| b.id() == id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id() == id)
    }

    pub fn text_block(&self, id: BlockId) -> Option<&TextBlock> {
        self.blocks.iter().find_map(|b| match b {
            Block::Text(t) if t.id == id => Some(t),
            _ => None,
        })
    }

    pub fn text_block_mut(&mut self, id: BlockId) -> Option<&mut TextBlock> {
        self.blocks.iter_mut().find_map(|b| match b {
            Block::Text(t) if t.id == id => Some(t),
            _ => None,
        })
    }

    /// Insert a block after `after` (or at the end), returning its id
    pub fn insert_after(&mut self, after: Option<BlockId>, block: Block) -> BlockId {
        let id = block.id();
        let idx = after
            .and_then(|a| self.index_of(a))
            .map(|i| i + 1)
            .unwrap_or(self.blocks.len());
        self.blocks.insert(idx, block);
        id
    }

    /// Split the text block `id` at `pos`, returning the new block's id
    pub fn split_block(&mut self, id: BlockId, pos: usize) -> Option<BlockId> {
        let idx = self.index_of(id)?;
        let Block::Text(block) = &mut self.blocks[idx] else {
            return None;
        };
        let tail = block.split_off(pos);
        let tail_id = tail.id;
        self.blocks.insert(idx + 1, Block::Text(tail));
        Some(tail_id)
    }

    /// Merge the text block `id` into the text block before it. Returns the
    /// previous block's id and the character offset where the join happened.
    /// An image right before the block is removed instead.
    pub fn merge_with_previous(&mut self, id: BlockId) -> Option<(BlockId, usize)> {
        let idx = self.index_of(id)?;
        if idx == 0 {
            return None;
        }
        if let Block::Image(_) = self.blocks[idx - 1] {
            self.blocks.remove(idx - 1);
            return Some((id, 0));
        }
        let Block::Text(current) = self.blocks.remove(idx) else {
            return None;
        };
        match &mut self.blocks[idx - 1] {
            Block::Text(prev) => {
                let join = prev.char_len();
                let prev_id = prev.id;
                prev.append(current);
                Some((prev_id, join))
            }
            Block::Image(_) => None,
        }
    }

    /// Remove a block, keeping at least one text block around
    pub fn remove_block(&mut self, id: BlockId, style: &CharStyle) {
        if let Some(idx) = self.index_of(id) {
            self.blocks.remove(idx);
        }
        self.ensure_editable(style);
    }

    /// Text of all text blocks joined by newlines
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Text(t) => Some(t.text()),
                Block::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Rewrite relative image sources written against the folder `from` so
    /// they still point at the same files from `to`. Returns whether any
    /// source changed.
    pub fn rebase_images(&mut self, from: &Path, to: &Path) -> bool {
        if from == to {
            return false;
        }
        let mut changed = false;
        for block in &mut self.blocks {
            let Block::Image(image) = block else {
                continue;
            };
            if image.src.contains("://") || Path::new(&image.src).is_absolute() {
                continue;
            }
            let src = relative_src(&from.join(&image.src), Some(to));
            if src != image.src {
                image.src = src;
                changed = true;
            }
        }
        changed
    }
}

/// Local file an image source points at
pub fn resolve_src(src: &str, base_dir: Option<&Path>) -> PathBuf {
    let path = Path::new(src);
    match base_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

/// Source to store for an image file: relative when it lives under the
/// document's folder
pub fn relative_src(image: &Path, base_dir: Option<&Path>) -> String {
    base_dir
        .and_then(|dir| image.strip_prefix(dir).ok())
        .unwrap_or(image)
        .to_string_lossy()
        .replace('\\', "/")
}
