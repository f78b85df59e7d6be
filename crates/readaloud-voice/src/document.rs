//! Block-structured documents and the loaders that build them.
//!
//! A [`Document`] is a tree of [`Block`]s. Paragraphs, headings, list items
//! and quotes are *counted* containers: each one becomes a single unit of
//! text for the segmenter, including anything nested inside it. Plain
//! [`BlockKind::Container`] blocks (lists, sections) only group children.

use once_cell::sync::Lazy;
use regex::Regex;

/// Kind of a document block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading,
    ListItem,
    Quote,
    /// Grouping block that is descended into.
    Container,
}

impl BlockKind {
    /// Whether the block is read as one unit (its descendants are not visited again).
    #[must_use]
    pub const fn is_counted(self) -> bool {
        !matches!(self, Self::Container)
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
    pub children: Vec<Block>,
}

impl Block {
    #[must_use]
    pub fn new(kind: BlockKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Paragraph, text)
    }

    #[must_use]
    pub fn heading(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Heading, text)
    }

    #[must_use]
    pub fn list_item(text: impl Into<String>) -> Self {
        Self::new(BlockKind::ListItem, text)
    }

    #[must_use]
    pub fn quote(text: impl Into<String>) -> Self {
        Self::new(BlockKind::Quote, text)
    }

    #[must_use]
    pub fn container(children: Vec<Self>) -> Self {
        Self {
            kind: BlockKind::Container,
            text: String::new(),
            children,
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<Self>) -> Self {
        self.children = children;
        self
    }

    /// Own text followed by every descendant's text, whitespace collapsed.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut parts = vec![self.text.clone()];
        parts.extend(self.children.iter().map(Self::text_content));
        collapse_whitespace(&parts.join(" "))
    }

    fn collect_containers(&self, out: &mut Vec<String>) {
        if self.kind.is_counted() {
            let text = self.text_content();
            if !text.is_empty() {
                out.push(text);
            }
            return;
        }

        // Loose text directly inside a grouping block reads as its own unit.
        let own = collapse_whitespace(&self.text);
        if !own.is_empty() {
            out.push(own);
        }
        for child in &self.children {
            child.collect_containers(out);
        }
    }
}

/// An ordered tree of blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    #[must_use]
    pub const fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Paragraphs separated by blank lines.
    #[must_use]
    pub fn from_plain_text(text: &str) -> Self {
        let mut blocks = Vec::new();
        let mut current: Vec<&str> = Vec::new();

        for line in text.lines() {
            if line.trim().is_empty() {
                push_paragraph(&mut blocks, &current);
                current.clear();
            } else {
                current.push(line);
            }
        }
        push_paragraph(&mut blocks, &current);

        Self { blocks }
    }

    /// Parse the block structure of a markdown text and strip its inline markup.
    ///
    /// Fenced code is dropped. Consecutive list items are grouped under one
    /// container; consecutive quote lines form one quote.
    #[must_use]
    pub fn from_markdown(text: &str) -> Self {
        let mut builder = MarkdownBuilder::default();
        for line in text.lines() {
            builder.line(line);
        }
        builder.finish()
    }

    /// Text of every counted container in document order.
    #[must_use]
    pub fn containers(&self) -> Vec<String> {
        let mut out = Vec::new();
        for block in &self.blocks {
            block.collect_containers(&mut out);
        }
        out
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers().is_empty()
    }
}

/// Markdown to plain text: block markers, code fences, emphasis, links,
/// images and HTML tags removed.
#[must_use]
pub fn strip_markdown(text: &str) -> String {
    Document::from_markdown(text).containers().join(" ")
}

fn push_paragraph(blocks: &mut Vec<Block>, lines: &[&str]) {
    let text = collapse_whitespace(&lines.join(" "));
    if !text.is_empty() {
        blocks.push(Block::paragraph(text));
    }
}

// ── Markdown block parsing ─────────────────────────────────────────

#[derive(Default)]
struct MarkdownBuilder {
    blocks: Vec<Block>,
    paragraph: Vec<String>,
    list: Vec<Block>,
    quote: Vec<String>,
    in_fence: bool,
}

impl MarkdownBuilder {
    fn line(&mut self, line: &str) {
        let trimmed = line.trim();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            self.flush_all();
            self.in_fence = !self.in_fence;
            return;
        }
        if self.in_fence {
            return;
        }

        if trimmed.is_empty() || is_horizontal_rule(trimmed) {
            self.flush_all();
            return;
        }

        if let Some(rest) = trimmed.strip_prefix('>') {
            self.flush_paragraph();
            self.flush_list();
            let content = rest.trim_start_matches(|c: char| c == '>' || c.is_whitespace());
            if !content.is_empty() {
                self.quote.push(content.to_string());
            }
            return;
        }

        if let Some(caps) = HEADING.captures(trimmed) {
            self.flush_all();
            let text = strip_inline(caps[1].trim_end_matches('#'));
            if !text.is_empty() {
                self.blocks.push(Block::heading(text));
            }
            return;
        }

        if let Some(m) = LIST_MARKER.find(trimmed) {
            self.flush_paragraph();
            self.flush_quote();
            self.list
                .push(Block::list_item(strip_inline(&trimmed[m.end()..])));
            return;
        }

        let indented = line.starts_with(char::is_whitespace);
        if indented && !self.list.is_empty() {
            if let Some(item) = self.list.last_mut() {
                item.text.push(' ');
                item.text.push_str(&strip_inline(trimmed));
            }
        } else if !self.quote.is_empty() {
            self.quote.push(trimmed.to_string());
        } else {
            self.flush_list();
            self.paragraph.push(trimmed.to_string());
        }
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = strip_inline(&self.paragraph.join(" "));
        self.paragraph.clear();
        if !text.is_empty() {
            self.blocks.push(Block::paragraph(text));
        }
    }

    fn flush_list(&mut self) {
        if self.list.is_empty() {
            return;
        }
        let items: Vec<Block> = std::mem::take(&mut self.list)
            .into_iter()
            .filter(|item| !item.text.trim().is_empty())
            .collect();
        if !items.is_empty() {
            self.blocks.push(Block::container(items));
        }
    }

    fn flush_quote(&mut self) {
        if self.quote.is_empty() {
            return;
        }
        let text = strip_inline(&self.quote.join(" "));
        self.quote.clear();
        if !text.is_empty() {
            self.blocks.push(Block::quote(text));
        }
    }

    fn flush_all(&mut self) {
        self.flush_paragraph();
        self.flush_list();
        self.flush_quote();
    }

    fn finish(mut self) -> Document {
        self.flush_all();
        Document::new(self.blocks)
    }
}

// ── Inline markup ──────────────────────────────────────────────────

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#{1,6}\s+(.*)$").unwrap());
static LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[-*+]|\d{1,9}[.)])\s+").unwrap());
static IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]*\)").unwrap());
static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").unwrap());
static FOOTNOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\^[^\]]*\]").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[A-Za-z][^>]*>").unwrap());
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]*)`").unwrap());
static STRONG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*|__|~~").unwrap());
static STAR_EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*\s][^*]*)\*").unwrap());
static UNDERSCORE_EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b_([^_\s][^_]*)_\b").unwrap());

/// Remove inline markdown and HTML from one block's text.
fn strip_inline(text: &str) -> String {
    let s = IMAGE.replace_all(text, "$1");
    let s = LINK.replace_all(&s, "$1");
    let s = FOOTNOTE.replace_all(&s, "");
    let s = HTML_TAG.replace_all(&s, "");
    let s = INLINE_CODE.replace_all(&s, "$1");
    let s = STRONG.replace_all(&s, "");
    let s = STAR_EMPHASIS.replace_all(&s, "$1");
    let s = UNDERSCORE_EMPHASIS.replace_all(&s, "$1");
    collapse_whitespace(&s)
}

fn is_horizontal_rule(line: &str) -> bool {
    let mut chars = line.chars().filter(|c| !c.is_whitespace());
    let Some(first) = chars.next() else {
        return false;
    };
    if !matches!(first, '-' | '*' | '_') {
        return false;
    }
    let mut count = 1;
    for c in chars {
        if c != first {
            return false;
        }
        count += 1;
    }
    count >= 3
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
