// src/extractors/html.rs
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{node::Node, ElementRef, Html};

// Anything that looks like a tag we care about means "parse as HTML".
static MARKUP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*(?:!doctype|html|body|div|p|span|font|table|br|h[1-6]|ix:)[\s>/]")
        .expect("Failed to compile MARKUP_RE")
});

// Subtrees that never carry filing prose.
const SKIPPED_TAGS: &[&str] = &["script", "style", "head", "title", "noscript", "template"];

// Elements rendered as their own paragraph.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "table", "section",
    "article", "blockquote", "center", "pre", "dl", "dt", "dd", "hr", "body",
];

/// What the walker should do with an element it is about to enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Enter,
    Skip,
    Stop,
}

/// A filing document: the parsed DOM (when the input is markup) and its flattened text.
pub struct FilingDocument {
    html: Option<Html>,
    text: String,
}

impl FilingDocument {
    pub fn parse(raw: &str) -> Self {
        if MARKUP_RE.is_match(raw) {
            let html = Html::parse_document(raw);
            let text = flatten(&html);
            tracing::debug!("Flattened {} bytes of markup into {} chars of text", raw.len(), text.len());
            Self { html: Some(html), text }
        } else {
            tracing::debug!("Document has no markup, using {} bytes as plain text", raw.len());
            Self {
                html: None,
                text: normalize_plain_text(raw),
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn html(&self) -> Option<&Html> {
        self.html.as_ref()
    }
}

/// Accumulates flattened text. Blocks become blank-line separated paragraphs and
/// whitespace inside text runs collapses to a single space.
#[derive(Debug, Default)]
pub struct TextWriter {
    buf: String,
    disabled: bool,
    pending_space: bool,
}

impl TextWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer that ignores input until `enable` is called.
    pub fn disabled() -> Self {
        Self {
            disabled: true,
            ..Self::default()
        }
    }

    pub fn enable(&mut self) {
        self.disabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled
    }

    pub fn push_text(&mut self, text: &str) {
        if self.disabled || text.is_empty() {
            return;
        }
        let mut words = text.split_whitespace().peekable();
        if words.peek().is_none() {
            self.pending_space = true;
            return;
        }
        if (self.pending_space || text.starts_with(char::is_whitespace)) && self.needs_space() {
            self.buf.push(' ');
        }
        let mut first = true;
        for word in words {
            if !first {
                self.buf.push(' ');
            }
            self.buf.push_str(word);
            first = false;
        }
        self.pending_space = text.ends_with(char::is_whitespace);
    }

    /// Separates adjacent table cells.
    pub fn push_space(&mut self) {
        if !self.disabled {
            self.pending_space = true;
        }
    }

    pub fn break_line(&mut self) {
        if self.disabled {
            return;
        }
        self.trim_trailing_spaces();
        if !self.buf.is_empty() && !self.buf.ends_with('\n') {
            self.buf.push('\n');
        }
    }

    pub fn break_block(&mut self) {
        if self.disabled {
            return;
        }
        self.trim_trailing_spaces();
        if self.buf.is_empty() {
            return;
        }
        while !self.buf.ends_with("\n\n") {
            self.buf.push('\n');
        }
    }

    pub fn finish(self) -> String {
        self.buf.trim().to_string()
    }

    fn needs_space(&self) -> bool {
        !self.buf.is_empty() && !self.buf.ends_with(char::is_whitespace)
    }

    fn trim_trailing_spaces(&mut self) {
        self.pending_space = false;
        let trimmed = self.buf.trim_end_matches([' ', '\t']).len();
        self.buf.truncate(trimmed);
    }
}

/// Flattens a whole parsed document to text.
pub fn flatten(html: &Html) -> String {
    let mut out = TextWriter::new();
    walk(html.root_element(), &mut out, &mut |_, _| Visit::Enter);
    out.finish()
}

/// Flattens the subtree below one element.
pub fn flatten_element(element: ElementRef<'_>) -> String {
    let mut out = TextWriter::new();
    walk(element, &mut out, &mut |_, _| Visit::Enter);
    out.finish()
}

/// Depth-first walk over the children of `element` in document order, writing text into
/// `out`. `visit` is consulted before each element is entered. Returns false once a
/// visitor asked to stop.
pub fn walk<'a, F>(element: ElementRef<'a>, out: &mut TextWriter, visit: &mut F) -> bool
where
    F: FnMut(ElementRef<'a>, &mut TextWriter) -> Visit,
{
    for child in element.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            if is_skipped(child_el) {
                continue;
            }
            match visit(child_el, out) {
                Visit::Stop => return false,
                Visit::Skip => continue,
                Visit::Enter => {}
            }

            let name = child_el.value().name();
            let block = BLOCK_TAGS.contains(&name);
            if block {
                out.break_block();
            } else if name == "br" || name == "tr" {
                out.break_line();
            }

            if !walk(child_el, out, visit) {
                return false;
            }

            if block {
                out.break_block();
            } else if name == "tr" {
                out.break_line();
            } else if name == "td" || name == "th" {
                out.push_space();
            }
        } else if let Node::Text(text) = child.value() {
            out.push_text(text);
        }
    }
    true
}

/// Text content of an element with whitespace collapsed, for header matching.
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn is_skipped(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if SKIPPED_TAGS.contains(&value.name()) {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase()
            .contains("display:none")
    })
}

fn normalize_plain_text(raw: &str) -> String {
    raw.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\u{a0}', " ")
}
