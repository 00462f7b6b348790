//! Markdown parsing: normalised text → block/inline document tree.
//!
//! pulldown-cmark does the tokenising (tables, strikethrough, task lists and
//! GFM alerts enabled); this module folds its event stream into an owned
//! [`Block`] tree. The tree — rather than a straight event-to-HTML pass —
//! exists so the image inliner can walk and rewrite references at any
//! nesting depth, and so blockquotes carry their callout kind as data
//! instead of as text.
//!
//! Construction uses explicit container/inline stacks, not recursion, so
//! nesting depth is bounded only by input size. Parsing never fails:
//! structural irregularities (short table rows) are repaired and recorded as
//! diagnostics, and an unterminated fence simply runs to end of input.

use pulldown_cmark::{
    Alignment, BlockQuoteKind, CodeBlockKind, Event, Options, Parser, Tag, TagEnd,
};
use serde::{Deserialize, Serialize};

// ── Tree types ───────────────────────────────────────────────────────────

/// Recognised callout kinds, carried on blockquote nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalloutKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl CalloutKind {
    /// CSS class used by the assembler and the default stylesheet.
    pub fn css_class(&self) -> &'static str {
        match self {
            CalloutKind::Note => "note",
            CalloutKind::Tip => "tip",
            CalloutKind::Important => "important",
            CalloutKind::Warning => "warning",
            CalloutKind::Caution => "caution",
        }
    }

    /// Human-readable title rendered at the top of the callout.
    pub fn label(&self) -> &'static str {
        match self {
            CalloutKind::Note => "Note",
            CalloutKind::Tip => "Tip",
            CalloutKind::Important => "Important",
            CalloutKind::Warning => "Warning",
            CalloutKind::Caution => "Caution",
        }
    }
}

impl From<BlockQuoteKind> for CalloutKind {
    fn from(kind: BlockQuoteKind) -> Self {
        match kind {
            BlockQuoteKind::Note => CalloutKind::Note,
            BlockQuoteKind::Tip => CalloutKind::Tip,
            BlockQuoteKind::Important => CalloutKind::Important,
            BlockQuoteKind::Warning => CalloutKind::Warning,
            BlockQuoteKind::Caution => CalloutKind::Caution,
        }
    }
}

/// Column alignment for table rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnAlignment {
    None,
    Left,
    Center,
    Right,
}

impl From<Alignment> for ColumnAlignment {
    fn from(a: Alignment) -> Self {
        match a {
            Alignment::None => ColumnAlignment::None,
            Alignment::Left => ColumnAlignment::Left,
            Alignment::Center => ColumnAlignment::Center,
            Alignment::Right => ColumnAlignment::Right,
        }
    }
}

/// Inline-level node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inline {
    Text(String),
    Code(String),
    /// Raw inline HTML, preserved verbatim so the inliner can rewrite
    /// `<img src>` attributes inside it.
    Html(String),
    SoftBreak,
    HardBreak,
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link {
        url: String,
        title: String,
        children: Vec<Inline>,
    },
    Image {
        url: String,
        title: String,
        alt: String,
    },
    TaskMarker(bool),
}

/// Block-level node. Container variants own their children exclusively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading {
        level: u8,
        content: Vec<Inline>,
    },
    CodeBlock {
        language: Option<String>,
        code: String,
    },
    BlockQuote {
        callout: Option<CalloutKind>,
        children: Vec<Block>,
    },
    List {
        /// `Some(n)` for an ordered list starting at `n`, `None` for bullets.
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    Table {
        alignments: Vec<ColumnAlignment>,
        header: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    /// Raw HTML block, preserved verbatim (img sources inside are still
    /// rewritten by the inliner).
    HtmlBlock(String),
    Rule,
}

/// A best-effort parse: always a valid tree, plus non-fatal diagnostics.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub blocks: Vec<Block>,
    pub diagnostics: Vec<String>,
}

// ── Parsing ──────────────────────────────────────────────────────────────

/// Parser options: the documented extension set.
///
/// `ENABLE_GFM` turns `> [!NOTE]` openings (the callout normaliser's
/// canonical form) into typed blockquote kinds.
fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_GFM);
    options
}

/// Parse normalised Markdown into a [`ParsedDocument`]. Never fails.
///
/// Events come with source offsets: pulldown-cmark pads and truncates table
/// rows to the header width before they reach the event stream, so detecting
/// a ragged row means looking at the raw row text.
pub fn parse_document(text: &str) -> ParsedDocument {
    let mut builder = TreeBuilder::new(text);
    for (event, range) in Parser::new_ext(text, parser_options()).into_offset_iter() {
        builder.handle(event, range);
    }
    builder.finish()
}

// Under-construction inline span.
struct InlineFrame {
    kind: FrameKind,
    inlines: Vec<Inline>,
}

enum FrameKind {
    Paragraph { implicit: bool },
    Heading(u8),
    Cell,
    Emphasis,
    Strong,
    Strikethrough,
    Link { url: String, title: String },
}

// Open block container awaiting its End event.
enum Ctx {
    Quote(Option<CalloutKind>),
    List {
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    Item,
}

struct TableCtx {
    alignments: Vec<ColumnAlignment>,
    header: Vec<Vec<Inline>>,
    rows: Vec<Vec<Vec<Inline>>>,
    current_row: Vec<Vec<Inline>>,
    /// Cells actually delimited in each body row's source text, before the
    /// event stream normalised them to the header width.
    raw_cell_counts: Vec<usize>,
}

struct ImageCtx {
    url: String,
    title: String,
    alt: String,
}

struct TreeBuilder<'a> {
    source: &'a str,
    /// One block buffer per open container; index 0 is the document.
    blocks_stack: Vec<Vec<Block>>,
    ctx_stack: Vec<Ctx>,
    inline_stack: Vec<InlineFrame>,
    table: Option<TableCtx>,
    code: Option<(Option<String>, String)>,
    html_block: Option<String>,
    /// Images being collected (alt text accumulates from inner events).
    images: Vec<ImageCtx>,
    diagnostics: Vec<String>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            blocks_stack: vec![Vec::new()],
            ctx_stack: Vec::new(),
            inline_stack: Vec::new(),
            table: None,
            code: None,
            html_block: None,
            images: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn handle(&mut self, event: Event<'_>, range: std::ops::Range<usize>) {
        match event {
            Event::Start(tag) => self.start(tag, range),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some(img) = self.images.last_mut() {
                    img.alt.push_str(&text);
                } else if let Some((_, buf)) = self.code.as_mut() {
                    buf.push_str(&text);
                } else {
                    self.push_inline(Inline::Text(text.into_string()));
                }
            }
            Event::Code(text) => {
                if let Some(img) = self.images.last_mut() {
                    img.alt.push_str(&text);
                } else {
                    self.push_inline(Inline::Code(text.into_string()));
                }
            }
            Event::Html(html) => match self.html_block.as_mut() {
                Some(buf) => buf.push_str(&html),
                None => self.push_block(Block::HtmlBlock(html.into_string())),
            },
            Event::InlineHtml(html) => self.push_inline(Inline::Html(html.into_string())),
            Event::SoftBreak => {
                if let Some(img) = self.images.last_mut() {
                    img.alt.push(' ');
                } else {
                    self.push_inline(Inline::SoftBreak);
                }
            }
            Event::HardBreak => self.push_inline(Inline::HardBreak),
            Event::Rule => {
                self.flush_implicit_paragraph();
                self.push_block(Block::Rule);
            }
            Event::TaskListMarker(checked) => self.push_inline(Inline::TaskMarker(checked)),
            // Footnotes and math are not in the documented extension set.
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>, range: std::ops::Range<usize>) {
        match tag {
            Tag::Paragraph => self.inline_stack.push(InlineFrame {
                kind: FrameKind::Paragraph { implicit: false },
                inlines: Vec::new(),
            }),
            Tag::Heading { level, .. } => self.inline_stack.push(InlineFrame {
                kind: FrameKind::Heading(level as u8),
                inlines: Vec::new(),
            }),
            Tag::BlockQuote(kind) => {
                self.flush_implicit_paragraph();
                self.blocks_stack.push(Vec::new());
                self.ctx_stack.push(Ctx::Quote(kind.map(CalloutKind::from)));
            }
            Tag::List(start) => {
                self.flush_implicit_paragraph();
                self.ctx_stack.push(Ctx::List {
                    start,
                    items: Vec::new(),
                });
            }
            Tag::Item => {
                self.blocks_stack.push(Vec::new());
                self.ctx_stack.push(Ctx::Item);
            }
            Tag::CodeBlock(kind) => {
                self.flush_implicit_paragraph();
                let language = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.into_string()),
                    _ => None,
                };
                self.code = Some((language, String::new()));
            }
            Tag::HtmlBlock => {
                self.flush_implicit_paragraph();
                self.html_block = Some(String::new());
            }
            Tag::Table(alignments) => {
                self.flush_implicit_paragraph();
                self.table = Some(TableCtx {
                    alignments: alignments.into_iter().map(ColumnAlignment::from).collect(),
                    header: Vec::new(),
                    rows: Vec::new(),
                    current_row: Vec::new(),
                    raw_cell_counts: Vec::new(),
                });
            }
            Tag::TableHead => {
                if let Some(t) = self.table.as_mut() {
                    t.current_row.clear();
                }
            }
            Tag::TableRow => {
                let raw = count_row_cells(self.row_source(&range));
                if let Some(t) = self.table.as_mut() {
                    t.current_row.clear();
                    t.raw_cell_counts.push(raw);
                }
            }
            Tag::TableCell => self.inline_stack.push(InlineFrame {
                kind: FrameKind::Cell,
                inlines: Vec::new(),
            }),
            Tag::Emphasis => self.push_span(FrameKind::Emphasis),
            Tag::Strong => self.push_span(FrameKind::Strong),
            Tag::Strikethrough => self.push_span(FrameKind::Strikethrough),
            Tag::Link {
                dest_url, title, ..
            } => self.push_span(FrameKind::Link {
                url: dest_url.into_string(),
                title: title.into_string(),
            }),
            Tag::Image {
                dest_url, title, ..
            } => self.images.push(ImageCtx {
                url: dest_url.into_string(),
                title: title.into_string(),
                alt: String::new(),
            }),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) => {
                if let Some(frame) = self.inline_stack.pop() {
                    let block = match frame.kind {
                        FrameKind::Heading(level) => Block::Heading {
                            level,
                            content: frame.inlines,
                        },
                        _ => Block::Paragraph(frame.inlines),
                    };
                    self.push_block(block);
                }
            }
            TagEnd::BlockQuote(_) => {
                self.flush_implicit_paragraph();
                let children = self.blocks_stack.pop().unwrap_or_default();
                let callout = match self.ctx_stack.pop() {
                    Some(Ctx::Quote(kind)) => kind,
                    _ => None,
                };
                self.push_block(Block::BlockQuote { callout, children });
            }
            TagEnd::List(_) => {
                if let Some(Ctx::List { start, items }) = self.ctx_stack.pop() {
                    self.push_block(Block::List { start, items });
                }
            }
            TagEnd::Item => {
                self.flush_implicit_paragraph();
                let blocks = self.blocks_stack.pop().unwrap_or_default();
                self.ctx_stack.pop();
                match self.ctx_stack.last_mut() {
                    Some(Ctx::List { items, .. }) => items.push(blocks),
                    _ => blocks.into_iter().for_each(|b| self.push_block(b)),
                }
            }
            TagEnd::CodeBlock => {
                if let Some((language, code)) = self.code.take() {
                    self.push_block(Block::CodeBlock { language, code });
                }
            }
            TagEnd::HtmlBlock => {
                if let Some(html) = self.html_block.take() {
                    self.push_block(Block::HtmlBlock(html));
                }
            }
            TagEnd::TableCell => {
                if let Some(frame) = self.inline_stack.pop() {
                    if let Some(t) = self.table.as_mut() {
                        t.current_row.push(frame.inlines);
                    }
                }
            }
            TagEnd::TableHead => {
                if let Some(t) = self.table.as_mut() {
                    t.header = std::mem::take(&mut t.current_row);
                }
            }
            TagEnd::TableRow => {
                if let Some(t) = self.table.as_mut() {
                    let row = std::mem::take(&mut t.current_row);
                    t.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.finish_table(table);
                }
            }
            TagEnd::Emphasis => self.pop_span(|inner| Inline::Emphasis(inner)),
            TagEnd::Strong => self.pop_span(|inner| Inline::Strong(inner)),
            TagEnd::Strikethrough => self.pop_span(|inner| Inline::Strikethrough(inner)),
            TagEnd::Link => {
                if let Some(frame) = self.inline_stack.pop() {
                    if let FrameKind::Link { url, title } = frame.kind {
                        self.push_inline(Inline::Link {
                            url,
                            title,
                            children: frame.inlines,
                        });
                    }
                }
            }
            TagEnd::Image => {
                if let Some(img) = self.images.pop() {
                    self.push_inline(Inline::Image {
                        url: img.url,
                        title: img.title,
                        alt: img.alt,
                    });
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> ParsedDocument {
        self.flush_implicit_paragraph();
        // pulldown-cmark balances its events, so a single buffer remains.
        let blocks = self.blocks_stack.drain(..).next().unwrap_or_default();
        ParsedDocument {
            blocks,
            diagnostics: self.diagnostics,
        }
    }

    /// Repair ragged rows and record a diagnostic for each, so a short or
    /// overlong row never fails the conversion and never goes unnoticed.
    /// pulldown-cmark normalises the *event stream* to the header width
    /// itself, so raggedness is judged from the raw cell counts.
    fn finish_table(&mut self, table: TableCtx) {
        let columns = table.header.len().max(1);
        let mut rows = table.rows;
        for (i, row) in rows.iter_mut().enumerate() {
            let raw = table.raw_cell_counts.get(i).copied().unwrap_or(row.len());
            if raw < columns {
                self.diagnostics.push(format!(
                    "table row {} padded from {raw} to {columns} columns",
                    i + 1
                ));
            } else if raw > columns {
                self.diagnostics.push(format!(
                    "table row {} truncated from {raw} to {columns} columns",
                    i + 1
                ));
            }
            if row.len() < columns {
                row.resize_with(columns, Vec::new);
            } else {
                row.truncate(columns);
            }
        }
        self.push_block(Block::Table {
            alignments: table.alignments,
            header: table.header,
            rows,
        });
    }

    /// First line of the source text a table-row event spans.
    fn row_source(&self, range: &std::ops::Range<usize>) -> &str {
        self.source
            .get(range.clone())
            .unwrap_or("")
            .lines()
            .next()
            .unwrap_or("")
    }

    /// Tight list items emit inline events with no enclosing paragraph;
    /// open an implicit one so those inlines have a home.
    fn ensure_inline_frame(&mut self) {
        if self.inline_stack.is_empty() {
            self.inline_stack.push(InlineFrame {
                kind: FrameKind::Paragraph { implicit: true },
                inlines: Vec::new(),
            });
        }
    }

    /// Close an implicit paragraph before a sibling block opens or the
    /// containing item/quote ends.
    fn flush_implicit_paragraph(&mut self) {
        let is_base_implicit = self.inline_stack.len() == 1
            && matches!(
                self.inline_stack.last(),
                Some(InlineFrame {
                    kind: FrameKind::Paragraph { implicit: true },
                    ..
                })
            );
        if is_base_implicit {
            if let Some(frame) = self.inline_stack.pop() {
                if !frame.inlines.is_empty() {
                    self.push_block(Block::Paragraph(frame.inlines));
                }
            }
        }
    }

    fn push_span(&mut self, kind: FrameKind) {
        self.ensure_inline_frame();
        self.inline_stack.push(InlineFrame {
            kind,
            inlines: Vec::new(),
        });
    }

    fn pop_span(&mut self, wrap: impl FnOnce(Vec<Inline>) -> Inline) {
        if let Some(frame) = self.inline_stack.pop() {
            self.push_inline(wrap(frame.inlines));
        }
    }

    fn push_inline(&mut self, inline: Inline) {
        self.ensure_inline_frame();
        if let Some(frame) = self.inline_stack.last_mut() {
            frame.inlines.push(inline);
        }
    }

    fn push_block(&mut self, block: Block) {
        if let Some(buffer) = self.blocks_stack.last_mut() {
            buffer.push(block);
        }
    }
}

/// Number of cells delimited in a raw table-row line. Handles optional
/// leading/trailing pipes, escaped `\|`, and rows nested in blockquotes.
fn count_row_cells(row: &str) -> usize {
    let mut row = row.trim();
    while let Some(rest) = row.strip_prefix('>') {
        row = rest.trim_start();
    }

    let mut pipes = 0usize;
    let mut escaped = false;
    let mut trailing_pipe = false;
    for ch in row.chars() {
        if escaped {
            escaped = false;
            trailing_pipe = false;
            continue;
        }
        match ch {
            '\\' => {
                escaped = true;
                trailing_pipe = false;
            }
            '|' => {
                pipes += 1;
                trailing_pipe = true;
            }
            c if c.is_whitespace() => {}
            _ => trailing_pipe = false,
        }
    }

    if pipes == 0 {
        return 1;
    }
    let mut cells = pipes + 1;
    if row.starts_with('|') {
        cells -= 1;
    }
    if trailing_pipe {
        cells -= 1;
    }
    cells.max(1)
}
