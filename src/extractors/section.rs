// src/extractors/section.rs

// --- Imports ---
use crate::extractors::dom::{DomStructureStrategy, InlineXbrlStrategy};
use crate::extractors::html::FilingDocument;
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Regex Patterns for Text Matching (Lazy Static) ---
// Exact "Item 1A. Risk Factors" headings, separator variants included.
static EXACT_START_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        "Item 1A. Risk Factors",
        "ITEM 1A. RISK FACTORS",
        "Item 1A\u{2014}Risk Factors",
        "ITEM 1A\u{2014}RISK FACTORS",
        "Item 1A: Risk Factors",
        "ITEM 1A: RISK FACTORS",
        "Item 1A - Risk Factors",
        "ITEM 1A - RISK FACTORS",
    ]
    .iter()
    .map(|phrase| regex::escape(phrase).replace(' ', r"[ \t]+"))
    .filter_map(|pat| Regex::new(&pat).ok())
    .collect()
});

// Looser: a line that starts like an Item 1A heading.
static LOOSE_START_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)^[ \t]*item[^\n]{0,10}?1a\b[^\n]*?risk\s+factors",
        r"(?im)^[ \t]*item[ \t]*1a\b",
    ]
    .iter()
    .filter_map(|pat| Regex::new(pat).ok())
    .collect()
});

// Where Item 1A ends: Item 1B, Item 1C (newer filings), Item 2, or the 1B title.
pub(crate) static END_RE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?im)^[ \t]*item[ \t]*1b\b",
        r"(?im)^[ \t]*item[ \t]*1c\b",
        r"(?im)^[ \t]*item[ \t]*2\b",
        r"(?im)^[ \t]*unresolved[ \t]+staff[ \t]+comments\b",
    ]
    .iter()
    .filter_map(|pat| Regex::new(pat).ok())
    .collect()
});

// --- Data Structures ---

/// Which extraction strategy produced a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    ExactMarker,
    LoosePrefix,
    DomStructure,
    InlineXbrl,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::ExactMarker => "exact_marker",
            StrategyKind::LoosePrefix => "loose_prefix",
            StrategyKind::DomStructure => "dom_structure",
            StrategyKind::InlineXbrl => "inline_xbrl",
        };
        f.write_str(name)
    }
}

/// The Item 1A body of one filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSection {
    pub text: String,
    pub strategy: StrategyKind,
    pub start_marker: String,
    /// `None` when the section ran to the end of the document.
    pub end_marker: Option<String>,
}

/// Byte offsets of a section body within a text, markers excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionBounds {
    pub start: usize,
    pub end: usize,
    pub start_marker: String,
    pub end_marker: Option<String>,
}

/// Finds the earliest match of any start pattern (ties go to the earlier pattern),
/// then the nearest end-pattern match after it. The body lies strictly between the
/// two markers and runs to the end of `text` when no end marker follows.
pub fn locate_section(
    text: &str,
    start_patterns: &[Regex],
    end_patterns: &[Regex],
) -> Option<SectionBounds> {
    let start = start_patterns
        .iter()
        .filter_map(|re| re.find(text))
        .min_by_key(|m| m.start())?;

    let body_start = start.end();
    let end = end_patterns
        .iter()
        .filter_map(|re| re.find_at(text, body_start))
        .min_by_key(|m| m.start());

    Some(SectionBounds {
        start: body_start,
        end: end.map_or(text.len(), |m| m.start()),
        start_marker: start.as_str().trim().to_string(),
        end_marker: end.map(|m| m.as_str().trim().to_string()),
    })
}

// --- Strategies ---

/// One way of finding the risk section. Strategies are tried in priority order
/// until one yields a usable section.
pub trait ExtractionStrategy {
    fn kind(&self) -> StrategyKind;
    fn attempt(&self, document: &FilingDocument) -> Option<RiskSection>;
}

fn attempt_with_markers(
    document: &FilingDocument,
    kind: StrategyKind,
    start_patterns: &[Regex],
) -> Option<RiskSection> {
    let text = document.text();
    let bounds = locate_section(text, start_patterns, &END_RE)?;
    tracing::debug!(
        "{}: start '{}' at {}, end {:?} at {}",
        kind,
        bounds.start_marker,
        bounds.start,
        bounds.end_marker,
        bounds.end
    );
    Some(RiskSection {
        text: text[bounds.start..bounds.end].trim().to_string(),
        strategy: kind,
        start_marker: bounds.start_marker,
        end_marker: bounds.end_marker,
    })
}

/// Exact "Item 1A. Risk Factors" phrase in the flattened text.
pub struct ExactMarkerStrategy;

impl ExtractionStrategy for ExactMarkerStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ExactMarker
    }

    fn attempt(&self, document: &FilingDocument) -> Option<RiskSection> {
        attempt_with_markers(document, self.kind(), &EXACT_START_RE)
    }
}

/// Any line beginning like an Item 1A heading.
pub struct LoosePrefixStrategy;

impl ExtractionStrategy for LoosePrefixStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LoosePrefix
    }

    fn attempt(&self, document: &FilingDocument) -> Option<RiskSection> {
        attempt_with_markers(document, self.kind(), &LOOSE_START_RE)
    }
}

// --- Main Extractor Structure ---
pub struct SectionExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    min_section_chars: usize,
}

impl SectionExtractor {
    /// Exact phrase, then line prefix, then DOM structure, then inline XBRL.
    pub fn new(min_section_chars: usize) -> Self {
        Self::with_strategies(
            vec![
                Box::new(ExactMarkerStrategy),
                Box::new(LoosePrefixStrategy),
                Box::new(DomStructureStrategy::new(min_section_chars)),
                Box::new(InlineXbrlStrategy::new(min_section_chars)),
            ],
            min_section_chars,
        )
    }

    pub fn with_strategies(
        strategies: Vec<Box<dyn ExtractionStrategy>>,
        min_section_chars: usize,
    ) -> Self {
        Self {
            strategies,
            min_section_chars,
        }
    }

    /// Returns the first candidate, in strategy order, that meets the minimum size.
    pub fn extract(&self, document: &FilingDocument) -> Result<RiskSection, ExtractError> {
        let mut largest_rejected: Option<(StrategyKind, usize)> = None;

        for strategy in &self.strategies {
            let Some(section) = strategy.attempt(document) else {
                tracing::debug!("Strategy {} found no candidate", strategy.kind());
                continue;
            };

            let chars = section.text.chars().count();
            if chars < self.min_section_chars {
                tracing::debug!(
                    "Strategy {} candidate too small ({} chars, required {}), likely a table of contents entry",
                    strategy.kind(),
                    chars,
                    self.min_section_chars
                );
                if largest_rejected.map_or(true, |(_, size)| chars > size) {
                    largest_rejected = Some((strategy.kind(), chars));
                }
                continue;
            }

            tracing::info!(
                "Extracted risk section via {} ({} chars, ends at {:?})",
                strategy.kind(),
                chars,
                section.end_marker
            );
            return Ok(section);
        }

        match largest_rejected {
            Some((kind, chars)) => Err(ExtractError::SectionTooSmall {
                strategy: kind.to_string(),
                chars,
                min: self.min_section_chars,
            }),
            None => Err(ExtractError::SectionNotFound(
                "no Item 1A start marker matched".to_string(),
            )),
        }
    }
}
