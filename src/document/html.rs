//! HTML import and export
//!
//! Import is forgiving: HTML void elements, unquoted attributes, stray end
//! tags and named entities are all accepted. Only the structure the editor
//! can represent survives (headings, paragraphs, list items, images and
//! character styles); everything else collapses into plain paragraphs.

use std::borrow::Cow;

use quick_xml::encoding::Decoder;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{
    Alignment, Block, BlockKind, CharStyle, ImageBlock, ListKind, RichDocument, Run, TextBlock,
};
use crate::core::error::HtmlError;

/// Elements that never have content or an end tag
const VOID_ELEMENTS: [&str; 9] = [
    "area", "base", "br", "col", "hr", "img", "input", "link", "meta",
];

/// Elements whose text is not document content
const SKIPPED_ELEMENTS: [&str; 5] = ["head", "style", "script", "noscript", "template"];

/// `<font size=N>` to points
const FONT_TAG_SIZES: [f32; 7] = [8.0, 10.0, 12.0, 14.0, 18.0, 24.0, 36.0];

/// Block elements written with `white-space: pre-wrap` so typed spacing
/// survives a reload
pub const PRE_WRAP_STYLE: &str = "p, li, h1, h2, h3, h4, h5, h6 { white-space: pre-wrap; }";

/// One open element during import
#[derive(Debug, Clone, Default)]
struct Frame {
    tag: String,
    style: CharStyle,
    /// Block role established by this element or an ancestor
    kind: Option<BlockKind>,
    align: Option<Alignment>,
    list: Option<ListKind>,
    skip: bool,
    /// Whitespace is kept as written (`pre`, `white-space: pre-wrap`)
    pre: bool,
    /// Whether closing this element ends the current block
    block: bool,
}

/// The block being filled; `explicit` blocks come from an element such as
/// `<p>` and survive even when empty
struct OpenBlock {
    block: TextBlock,
    explicit: bool,
    pre: bool,
}

struct Importer {
    doc: RichDocument,
    stack: Vec<Frame>,
    current: Option<OpenBlock>,
    in_title: bool,
    /// Tags a `<style>` sheet gives `white-space: pre` or `pre-wrap`
    pre_tags: Vec<String>,
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase()
}

/// Attribute lookup tolerant of HTML attribute syntax
fn attr(e: &BytesStart<'_>, name: &str, decoder: Decoder) -> Option<String> {
    e.html_attributes().flatten().find_map(|a| {
        let key = String::from_utf8_lossy(a.key.as_ref()).to_ascii_lowercase();
        if key != name {
            return None;
        }
        match a.decode_and_unescape_value(decoder) {
            Ok(v) => Some(v.into_owned()),
            Err(_) => Some(String::from_utf8_lossy(&a.value).into_owned()),
        }
    })
}

/// `prop: value` pairs of an inline style attribute
fn css_declarations(style: &str) -> impl Iterator<Item = (String, &str)> {
    style.split(';').filter_map(|decl| {
        let (prop, value) = decl.split_once(':')?;
        Some((prop.trim().to_ascii_lowercase(), value.trim()))
    })
}

/// Length in CSS points, `px` converted at 96 dpi. Absolute size keywords
/// use the usual browser table with `medium` at 12pt.
fn css_points(value: &str) -> Option<f32> {
    let value = value.trim().to_ascii_lowercase();
    let keyword = match value.as_str() {
        "xx-small" => Some(6.75),
        "x-small" => Some(7.5),
        "small" => Some(9.75),
        "medium" => Some(12.0),
        "large" => Some(13.5),
        "x-large" => Some(18.0),
        "xx-large" => Some(24.0),
        "xxx-large" => Some(36.0),
        _ => None,
    };
    if keyword.is_some() {
        return keyword;
    }
    let (number, scale) = if let Some(n) = value.strip_suffix("pt") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix("px") {
        (n, 0.75)
    } else {
        return None;
    };
    number.trim().parse::<f32>().ok().map(|n| n * scale)
}

/// Pixel length from an attribute or CSS value
fn pixels(value: &str) -> Option<u32> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number.parse::<f32>().ok().filter(|n| *n > 0.0).map(|n| n.round() as u32)
}

/// Whether a `white-space` value keeps runs of spaces
fn keeps_spaces(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "pre" | "pre-wrap" | "break-spaces" => Some(true),
        "normal" | "nowrap" | "pre-line" => Some(false),
        _ => None,
    }
}

/// Tags selected by `white-space: pre*` rules of a style sheet
fn pre_wrap_tags(sheet: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for rule in sheet.split('}') {
        let Some((selectors, body)) = rule.split_once('{') else {
            continue;
        };
        let keeps = css_declarations(body)
            .any(|(prop, value)| prop == "white-space" && keeps_spaces(value) == Some(true));
        if !keeps {
            continue;
        }
        for selector in selectors.split(',') {
            let tag: String = selector
                .trim()
                .chars()
                .take_while(char::is_ascii_alphanumeric)
                .collect::<String>()
                .to_ascii_lowercase();
            if !tag.is_empty() {
                tags.push(tag);
            }
        }
    }
    tags
}

fn parse_alignment(value: &str) -> Option<Alignment> {
    match value.trim().to_ascii_lowercase().as_str() {
        "left" | "start" => Some(Alignment::Left),
        "center" | "middle" => Some(Alignment::Center),
        "right" | "end" => Some(Alignment::Right),
        "justify" => Some(Alignment::Justify),
        _ => None,
    }
}

/// Fold the CSS of `style` into `frame`
fn apply_css(frame: &mut Frame, style: &str) {
    for (prop, value) in css_declarations(style) {
        let lower = value.to_ascii_lowercase();
        match prop.as_str() {
            "font-family" => {
                let family = value
                    .split(',')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .trim_matches(|c| c == '\'' || c == '"');
                if !family.is_empty() {
                    frame.style.family = Some(family.to_string());
                }
            }
            "font-size" => {
                if let Some(pt) = css_points(value) {
                    frame.style.size = Some(pt);
                }
            }
            "font-weight" => {
                frame.style.bold = match lower.as_str() {
                    "bold" | "bolder" => true,
                    "normal" | "lighter" => false,
                    n => n.parse::<u32>().map(|w| w >= 600).unwrap_or(frame.style.bold),
                };
            }
            "font-style" => frame.style.italic = lower == "italic" || lower == "oblique",
            "text-decoration" | "text-decoration-line" => {
                frame.style.underline = lower.contains("underline");
            }
            "text-align" => {
                if let Some(align) = parse_alignment(value) {
                    frame.align = Some(align);
                }
            }
            "white-space" => {
                if let Some(pre) = keeps_spaces(value) {
                    frame.pre = pre;
                }
            }
            _ => {}
        }
    }
}

fn named_entity(name: &str) -> Option<&'static str> {
    Some(match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "hellip" => "\u{2026}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "deg" => "\u{b0}",
        "middot" => "\u{b7}",
        "bull" => "\u{2022}",
        "euro" => "\u{20ac}",
        _ => return None,
    })
}

impl Importer {
    fn new() -> Self {
        Self {
            doc: RichDocument::default(),
            stack: Vec::new(),
            current: None,
            in_title: false,
            pre_tags: Vec::new(),
        }
    }

    fn top(&self) -> Frame {
        self.stack.last().cloned().unwrap_or_default()
    }

    fn context_kind(&self) -> BlockKind {
        self.stack
            .iter()
            .rev()
            .find_map(|f| f.kind)
            .unwrap_or(BlockKind::Paragraph)
    }

    fn context_align(&self) -> Alignment {
        self.stack
            .iter()
            .rev()
            .find_map(|f| f.align)
            .unwrap_or_default()
    }

    /// Close the current block, keeping it if it has text or was explicit
    fn finish_block(&mut self) {
        if let Some(mut open) = self.current.take() {
            if !open.pre {
                open.block.trim_end();
            }
            if open.explicit || !open.block.is_empty() {
                if open.block.runs.is_empty() {
                    open.block.runs.push(Run::new("", self.top().style));
                }
                self.doc.blocks.push(Block::Text(open.block));
            }
        }
    }

    fn open_block(&mut self, explicit: bool) {
        self.finish_block();
        let block = TextBlock::new(self.context_kind(), self.context_align());
        let pre = self.top().pre;
        self.current = Some(OpenBlock {
            block,
            explicit,
            pre,
        });
    }

    fn text(&mut self, raw: &str) {
        let frame = self.top();
        if self.in_title {
            self.doc.title.push_str(raw);
            return;
        }
        if frame.skip {
            if frame.tag == "style" {
                self.pre_tags.extend(pre_wrap_tags(raw));
            }
            return;
        }

        if self.current.is_none() {
            if raw.chars().all(|c| c.is_ascii_whitespace()) {
                return;
            }
            self.open_block(false);
        }
        if frame.pre {
            for (i, line) in raw.split('\n').enumerate() {
                if i > 0 {
                    self.line_break();
                }
                if let Some(open) = self.current.as_mut() {
                    open.block.push_text(line.trim_end_matches('\r'), &frame.style);
                }
            }
            return;
        }
        let Some(open) = self.current.as_mut() else {
            return;
        };

        let mut collapsed = String::with_capacity(raw.len());
        let mut space = open.block.ends_with_space();
        for c in raw.chars() {
            if c.is_ascii_whitespace() {
                if !space {
                    collapsed.push(' ');
                    space = true;
                }
            } else {
                collapsed.push(c);
                space = false;
            }
        }
        open.block.push_text(&collapsed, &frame.style);
    }

    fn image(&mut self, e: &BytesStart<'_>, decoder: Decoder) {
        if self.top().skip {
            return;
        }
        let Some(src) = attr(e, "src", decoder) else {
            return;
        };

        let mut width = attr(e, "width", decoder).as_deref().and_then(pixels);
        let mut height = attr(e, "height", decoder).as_deref().and_then(pixels);
        if let Some(style) = attr(e, "style", decoder) {
            for (prop, value) in css_declarations(&style) {
                match prop.as_str() {
                    "width" => width = pixels(value).or(width),
                    "height" => height = pixels(value).or(height),
                    _ => {}
                }
            }
        }

        let kind = self.current.as_ref().map(|o| o.block.kind);
        let had_text = self.current.as_ref().is_some_and(|o| !o.block.is_empty());
        if let Some(open) = self.current.as_mut() {
            // The image replaces an otherwise empty wrapper paragraph.
            open.explicit &= had_text;
        }
        self.finish_block();

        let mut image = ImageBlock::new(src, width, height);
        image.align = self.context_align();
        self.doc.blocks.push(Block::Image(image));

        if let Some(kind) = kind {
            let block = TextBlock::new(kind, self.context_align());
            self.current = Some(OpenBlock {
                block,
                explicit: false,
                pre: self.top().pre,
            });
        }
    }

    fn line_break(&mut self) {
        if self.top().skip {
            return;
        }
        let (kind, align, pre) = match &self.current {
            Some(open) => (open.block.kind, open.block.align, open.pre),
            None => (self.context_kind(), self.context_align(), self.top().pre),
        };
        if self.current.is_none() {
            self.current = Some(OpenBlock {
                block: TextBlock::new(kind, align),
                explicit: true,
                pre,
            });
        } else if let Some(open) = self.current.as_mut() {
            open.explicit = true;
        }
        self.finish_block();
        self.current = Some(OpenBlock {
            block: TextBlock::new(kind, align),
            explicit: false,
            pre,
        });
    }

    fn start(&mut self, e: &BytesStart<'_>, decoder: Decoder) {
        let tag = tag_name(e);
        match tag.as_str() {
            "br" => return self.line_break(),
            "img" => return self.image(e, decoder),
            _ if VOID_ELEMENTS.contains(&tag.as_str()) => return,
            _ => {}
        }

        let mut frame = self.top();
        frame.tag = tag.clone();
        frame.block = false;
        frame.align = None;
        frame.kind = None;

        if tag == "pre" || self.pre_tags.contains(&tag) {
            frame.pre = true;
        }

        match tag.as_str() {
            _ if SKIPPED_ELEMENTS.contains(&tag.as_str()) => frame.skip = true,
            "title" => self.in_title = true,
            "b" | "strong" => frame.style.bold = true,
            "i" | "em" | "cite" | "var" => frame.style.italic = true,
            "u" | "ins" => frame.style.underline = true,
            "font" => {
                if let Some(face) = attr(e, "face", decoder) {
                    let face = face.split(',').next().unwrap_or_default().trim();
                    if !face.is_empty() {
                        frame.style.family = Some(face.to_string());
                    }
                }
                let size = attr(e, "size", decoder).and_then(|s| s.trim().parse::<usize>().ok());
                if let Some(size) = size {
                    let idx = size.clamp(1, FONT_TAG_SIZES.len()) - 1;
                    frame.style.size = Some(FONT_TAG_SIZES[idx]);
                }
            }
            "ul" => frame.list = Some(ListKind::Bullet),
            "ol" => frame.list = Some(ListKind::Ordered),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse::<u8>().unwrap_or(1);
                frame.kind = Some(BlockKind::Heading(level));
                frame.block = true;
            }
            "li" => {
                let list = self
                    .stack
                    .iter()
                    .rev()
                    .find_map(|f| f.list)
                    .unwrap_or(ListKind::Bullet);
                frame.kind = Some(BlockKind::ListItem(list));
                frame.block = true;
            }
            "p" | "div" | "blockquote" | "pre" | "center" | "section" | "article" | "body" => {
                frame.block = true;
                if tag == "center" {
                    frame.align = Some(Alignment::Center);
                }
            }
            _ => {}
        }

        if frame.block {
            if let Some(align) = attr(e, "align", decoder).as_deref().and_then(parse_alignment) {
                frame.align = Some(align);
            }
        }
        if let Some(style) = attr(e, "style", decoder) {
            apply_css(&mut frame, &style);
        }

        let explicit = matches!(tag.as_str(), "p" | "li")
            || matches!(frame.kind, Some(BlockKind::Heading(_)));
        let is_block = frame.block;
        self.stack.push(frame);

        if is_block && tag != "body" {
            if explicit {
                self.open_block(true);
            } else {
                self.finish_block();
            }
        }
    }

    fn end(&mut self, tag: &str) {
        if tag == "title" {
            self.in_title = false;
        }
        let Some(pos) = self.stack.iter().rposition(|f| f.tag == tag) else {
            return;
        };
        let closes_block = self.stack[pos..].iter().any(|f| f.block);
        if closes_block {
            self.finish_block();
        }
        self.stack.truncate(pos);
    }

    fn finish(mut self) -> RichDocument {
        self.finish_block();
        self.doc.title = self.doc.title.trim().to_string();
        self.doc
    }
}

/// Escape every `<` that cannot start markup, so text such as `a < b`
/// reads as text instead of a broken tag
fn escape_stray_lt(html: &str) -> Cow<'_, str> {
    let stray = |i: usize| {
        let opens_markup = |c: char| c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?');
        !html[i + 1..].starts_with(opens_markup)
    };
    if !html.match_indices('<').any(|(i, _)| stray(i)) {
        return Cow::Borrowed(html);
    }

    let mut out = String::with_capacity(html.len() + 16);
    let mut last = 0;
    for (i, _) in html.match_indices('<') {
        if stray(i) {
            out.push_str(&html[last..i]);
            out.push_str("&lt;");
            last = i + 1;
        }
    }
    out.push_str(&html[last..]);
    Cow::Owned(out)
}

/// Parse an HTML document
pub fn from_html(html: &str) -> Result<RichDocument, HtmlError> {
    let html = escape_stray_lt(html);
    let mut reader = Reader::from_str(&html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;
    config.check_comments = false;

    let mut importer = Importer::new();

    loop {
        let event = reader.read_event().map_err(|e| HtmlError {
            position: reader.error_position(),
            message: e.to_string(),
        })?;

        match event {
            Event::Start(e) => importer.start(&e, reader.decoder()),
            Event::Empty(e) => {
                let tag = tag_name(&e);
                importer.start(&e, reader.decoder());
                if !VOID_ELEMENTS.contains(&tag.as_str()) {
                    importer.end(&tag);
                }
            }
            Event::End(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                importer.end(&tag);
            }
            Event::Text(t) => {
                let text = t
                    .decode()
                    .unwrap_or_else(|_| Cow::Owned(String::from_utf8_lossy(&t).into_owned()));
                importer.text(&text);
            }
            Event::CData(t) => importer.text(&String::from_utf8_lossy(&t)),
            Event::GeneralRef(r) => {
                let resolved = match r.resolve_char_ref() {
                    Ok(Some(c)) => c.to_string(),
                    _ => {
                        let name = String::from_utf8_lossy(&r).into_owned();
                        named_entity(&name)
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("&{};", name))
                    }
                };
                importer.text(&resolved);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(importer.finish())
}

fn align_style(align: Alignment) -> &'static str {
    match align {
        Alignment::Left => "",
        Alignment::Center => " style=\"text-align:center\"",
        Alignment::Right => " style=\"text-align:right\"",
        Alignment::Justify => " style=\"text-align:justify\"",
    }
}

fn write_run(out: &mut String, run: &Run) {
    let style = &run.style;
    let mut css = Vec::new();
    if let Some(family) = &style.family {
        css.push(format!("font-family:'{}'", family));
    }
    if let Some(size) = style.size {
        css.push(format!("font-size:{}pt", size));
    }

    let mut close = Vec::new();
    if !css.is_empty() {
        out.push_str(&format!("<span style=\"{}\">", escape(&css.join("; "))));
        close.push("</span>");
    }
    if style.bold {
        out.push_str("<strong>");
        close.push("</strong>");
    }
    if style.italic {
        out.push_str("<em>");
        close.push("</em>");
    }
    if style.underline {
        out.push_str("<u>");
        close.push("</u>");
    }
    out.push_str(&escape(&run.text));
    for tag in close.iter().rev() {
        out.push_str(tag);
    }
}

fn write_runs(out: &mut String, block: &TextBlock) {
    for run in block.runs.iter().filter(|r| !r.text.is_empty()) {
        write_run(out, run);
    }
}

/// Serialize a document as a standalone HTML file
pub fn to_html(doc: &RichDocument) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n");
    out.push_str(&format!("<title>{}</title>\n", escape(&doc.title)));
    out.push_str(&format!("<style>\n{}\n</style>\n", PRE_WRAP_STYLE));
    out.push_str("</head>\n<body>\n");

    let mut open_list: Option<ListKind> = None;
    for block in &doc.blocks {
        let list = match block {
            Block::Text(TextBlock {
                kind: BlockKind::ListItem(kind),
                ..
            }) => Some(*kind),
            _ => None,
        };
        if open_list != list {
            match open_list {
                Some(ListKind::Ordered) => out.push_str("</ol>\n"),
                Some(ListKind::Bullet) => out.push_str("</ul>\n"),
                None => {}
            }
            match list {
                Some(ListKind::Ordered) => out.push_str("<ol>\n"),
                Some(ListKind::Bullet) => out.push_str("<ul>\n"),
                None => {}
            }
            open_list = list;
        }

        match block {
            Block::Text(text) => {
                let tag = match text.kind {
                    BlockKind::Paragraph => Cow::Borrowed("p"),
                    BlockKind::Heading(level) => Cow::Owned(format!("h{}", level.clamp(1, 6))),
                    BlockKind::ListItem(_) => Cow::Borrowed("li"),
                };
                out.push_str(&format!("<{}{}>", tag, align_style(text.align)));
                write_runs(&mut out, text);
                out.push_str(&format!("</{}>\n", tag));
            }
            Block::Image(image) => {
                out.push_str(&format!("<p{}>", align_style(image.align)));
                out.push_str(&format!("<img src=\"{}\"", escape(&image.src)));
                if let Some(w) = image.width {
                    out.push_str(&format!(" width=\"{}\"", w));
                }
                if let Some(h) = image.height {
                    out.push_str(&format!(" height=\"{}\"", h));
                }
                out.push_str("></p>\n");
            }
        }
    }
    match open_list {
        Some(ListKind::Ordered) => out.push_str("</ol>\n"),
        Some(ListKind::Bullet) => out.push_str("</ul>\n"),
        None => {}
    }

    out.push_str("</body>\n</html>\n");
    out
}
