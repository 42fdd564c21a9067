// src/extractors/dom.rs
use crate::extractors::html::{self, element_text, FilingDocument, TextWriter, Visit};
use crate::extractors::section::{ExtractionStrategy, RiskSection, StrategyKind};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

// Headers are short; anything longer is a paragraph that merely mentions an item.
const MAX_HEADER_CHARS: usize = 200;

// --- CSS Selectors (Lazy Static) ---
// Selectors for potential section headers
static POTENTIAL_HEADER_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, p > b, p > strong, div > b, div > strong, font, div, span, a")
        .expect("Failed to compile POTENTIAL_HEADER_SELECTOR")
});

// Selectors for potential ToC containers
static TOC_CONTAINER_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div[class*='toc'], nav[class*='toc'], div[id*='toc'], nav[id*='toc']")
        .expect("Failed to compile TOC_CONTAINER_SELECTOR")
});

// --- Regex Patterns for Header Text ---
static ITEM_1A_HEADER_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Whole header: "Item 1A.", "ITEM 1A — RISK FACTORS", "Item 1A. Risk Factors."
        r"(?i)^\s*item\s*1a\b[\s.:\-\u{2013}\u{2014}]*(?:risk\s+factors)?\.?\s*$",
        // Header with trailing words, e.g. "Item 1A. Risk Factors (continued)"
        r"(?i)^\s*item\s*1a[\s.:\-\u{2013}\u{2014}]+risk\s+factors\b",
    ]
    .iter()
    .filter_map(|pat| Regex::new(pat).ok())
    .collect()
});

static ITEM_1A_END_HEADER_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^\s*item\s*1b\b",
        r"(?i)^\s*item\s*1c\b",
        r"(?i)^\s*item\s*2\b",
        r"(?i)^\s*unresolved\s+staff\s+comments\b",
    ]
    .iter()
    .filter_map(|pat| Regex::new(pat).ok())
    .collect()
});

static SIMPLE_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*Item\s+\d+[A-Z]?\.?\s*$").expect("Failed to compile SIMPLE_ITEM_RE"));

static PAGE_NUMBER_TAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,3}\s*$").expect("Failed to compile PAGE_NUMBER_TAIL_RE"));

static RISK_ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)item\s*1a|risk\s+factors").expect("Failed to compile RISK_ANCHOR_RE")
});

/// Short text of a header-like element, `None` for anything that is not a header.
fn header_text(element: ElementRef<'_>) -> Option<String> {
    if !POTENTIAL_HEADER_SELECTOR.matches(&element) {
        return None;
    }
    let text = element_text(element);
    if text.is_empty() || text.chars().count() > MAX_HEADER_CHARS {
        return None;
    }
    Some(text)
}

/// Checks if an element is likely within a Table of Contents using DOM structure.
pub(crate) fn is_in_toc(element: ElementRef<'_>) -> bool {
    // Check 1: the element itself is a link or a ToC container
    if element.value().name() == "a" && element.value().attr("href").is_some() {
        tracing::trace!("Element itself is <a> tag with href, likely ToC link.");
        return true;
    }
    if TOC_CONTAINER_SELECTOR.matches(&element) {
        return true;
    }

    // Check 2: ancestors
    let mut row: Option<ElementRef> = None;
    let mut in_table = false;
    for ancestor in element.ancestors().filter_map(ElementRef::wrap) {
        let name = ancestor.value().name();

        if TOC_CONTAINER_SELECTOR.matches(&ancestor) {
            tracing::trace!("Element has ancestor <{}> matching ToC container selector.", name);
            return true;
        }
        if name == "a" && ancestor.value().attr("href").is_some() {
            tracing::trace!("Element is inside an <a href> link, likely ToC.");
            return true;
        }
        if ["td", "tr", "table"].contains(&name) {
            in_table = true;
            if name == "tr" && row.is_none() {
                row = Some(ancestor);
            }
        }
        if name == "body" {
            break;
        }
    }

    // Check 3: inside a table, a bare "Item X." cell or a row ending in a page number
    if in_table {
        if SIMPLE_ITEM_RE.is_match(&element_text(element)) {
            tracing::trace!("Element in table matches simple 'Item X.' pattern, likely ToC.");
            return true;
        }
        if let Some(row) = row {
            if PAGE_NUMBER_TAIL_RE.is_match(&element_text(row)) {
                tracing::trace!("Element's table row ends in a page number, likely ToC.");
                return true;
            }
        }
    }

    false
}

/// Header-like elements in document order that announce Item 1A outside any ToC.
fn item_1a_headers(document: &Html) -> Vec<ElementRef<'_>> {
    document
        .select(&POTENTIAL_HEADER_SELECTOR)
        .filter(|element| {
            header_text(*element).is_some_and(|text| {
                ITEM_1A_HEADER_RE.iter().any(|re| re.is_match(&text))
            })
        })
        .filter(|element| {
            let in_toc = is_in_toc(*element);
            if in_toc {
                tracing::debug!("Skipping Item 1A header candidate inside ToC: '{}'", element_text(*element));
            }
            !in_toc
        })
        .collect()
}

/// Flattens everything after `start` in document order, up to the next header that
/// opens Item 1B / 1C / 2. Returns the text and the end header, if any.
pub(crate) fn collect_after(document: &Html, start: ElementRef<'_>) -> (String, Option<String>) {
    let start_id = start.id();
    let mut out = TextWriter::disabled();
    let mut end_marker: Option<String> = None;

    html::walk(document.root_element(), &mut out, &mut |element, out| {
        if !out.is_enabled() {
            if element.id() == start_id {
                out.enable();
                return Visit::Skip;
            }
            return Visit::Enter;
        }
        if let Some(text) = header_text(element) {
            if ITEM_1A_END_HEADER_RE.iter().any(|re| re.is_match(&text)) && !is_in_toc(element) {
                end_marker = Some(text);
                return Visit::Stop;
            }
        }
        Visit::Enter
    });

    (out.finish(), end_marker)
}

/// Finds the Item 1A heading in the DOM, skipping table-of-contents entries, and reads
/// forward until the next item heading.
pub struct DomStructureStrategy {
    min_section_chars: usize,
}

impl DomStructureStrategy {
    pub fn new(min_section_chars: usize) -> Self {
        Self { min_section_chars }
    }
}

impl ExtractionStrategy for DomStructureStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DomStructure
    }

    fn attempt(&self, document: &FilingDocument) -> Option<RiskSection> {
        let dom = document.html()?;
        let mut best: Option<RiskSection> = None;

        // Later candidates only matter when an earlier one produced a stub
        // (an undetected ToC entry or a running page header).
        for header in item_1a_headers(dom) {
            let start_marker = element_text(header);
            let (text, end_marker) = collect_after(dom, header);
            let chars = text.chars().count();
            tracing::debug!(
                "DOM candidate <{}> '{}' yields {} chars (end {:?})",
                header.value().name(),
                start_marker,
                chars,
                end_marker
            );

            let candidate = RiskSection {
                text,
                strategy: self.kind(),
                start_marker,
                end_marker,
            };
            if chars >= self.min_section_chars {
                return Some(candidate);
            }
            if best.as_ref().map_or(true, |b| chars > b.text.chars().count()) {
                best = Some(candidate);
            }
        }

        best
    }
}

/// Inline XBRL: `ix:nonNumeric` facts whose concept name mentions risk. A long fact is
/// the section itself; a short one that names Item 1A / Risk Factors anchors a
/// forward read like the DOM strategy.
pub struct InlineXbrlStrategy {
    min_section_chars: usize,
}

impl InlineXbrlStrategy {
    pub fn new(min_section_chars: usize) -> Self {
        Self { min_section_chars }
    }
}

impl ExtractionStrategy for InlineXbrlStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::InlineXbrl
    }

    fn attempt(&self, document: &FilingDocument) -> Option<RiskSection> {
        let dom = document.html()?;

        let facts = dom
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "ix:nonnumeric")
            .filter(|el| {
                el.value()
                    .attr("name")
                    .is_some_and(|name| name.to_ascii_lowercase().contains("risk"))
            })
            .filter(|el| !el.ancestors().filter_map(ElementRef::wrap).any(html::is_skipped));

        for fact in facts {
            let concept = fact.value().attr("name").unwrap_or_default();
            let text = html::flatten_element(fact);
            tracing::debug!("Inline XBRL fact {} holds {} chars", concept, text.len());

            if text.chars().count() >= self.min_section_chars {
                return Some(RiskSection {
                    text,
                    strategy: self.kind(),
                    start_marker: concept.to_string(),
                    end_marker: None,
                });
            }

            if RISK_ANCHOR_RE.is_match(&text) {
                let (body, end_marker) = collect_after(dom, fact);
                if body.chars().count() >= self.min_section_chars {
                    return Some(RiskSection {
                        text: body,
                        strategy: self.kind(),
                        start_marker: concept.to_string(),
                        end_marker,
                    });
                }
            }
        }

        None
    }
}
