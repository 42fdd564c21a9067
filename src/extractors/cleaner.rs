// src/extractors/cleaner.rs
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashSet;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]+>").expect("Failed to compile TAG_RE"));

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:#(\d{1,6})|#[xX]([0-9a-fA-F]{1,6})|([a-zA-Z]{2,8}));")
        .expect("Failed to compile ENTITY_RE")
});

// Navigation leftovers repeated on every page of the filing.
static BOILERPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:table\s+of\s+contents|back\s+to\s+contents|click\s+here\s+to\s+view[^.\n]*\.?)")
        .expect("Failed to compile BOILERPLATE_RE")
});

// "12", "Page 12", "F-3", "A-12"
static PAGE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:page\s+)?(?:[a-z]{1,2}-)?\d{1,4}\s*$").expect("Failed to compile PAGE_NUMBER_RE")
});

// "Acme Corp | 2023 Form 10-K | 14"
static RUNNING_FOOTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[^|]{0,100}\|\s*(?:fiscal\s+)?\d{4}\s+form\s+10-k\s*\|\s*\d{1,4}$")
        .expect("Failed to compile RUNNING_FOOTER_RE")
});

static BLANK_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t\u{a0}]*\n").expect("Failed to compile BLANK_LINE_RE"));

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Failed to compile WHITESPACE_RE"));

/// Cleans a raw risk section into blank-line separated paragraphs: residual markup,
/// entities, navigation boilerplate, page numbers and running footers are removed and
/// each paragraph is collapsed to a single line. `clean(clean(x)) == clean(x)`.
pub fn clean(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");

    let mut seen = HashSet::new();
    let mut kept: Vec<String> = Vec::new();
    let mut dropped = 0usize;

    for block in BLANK_LINE_RE.split(&normalized) {
        let paragraph = clean_paragraph(block);
        if is_noise(&paragraph) {
            if !paragraph.is_empty() {
                dropped += 1;
            }
            continue;
        }
        if seen.insert(paragraph.clone()) {
            kept.push(paragraph);
        } else {
            dropped += 1;
        }
    }

    tracing::debug!("Cleaner kept {} paragraphs, dropped {} as noise or duplicates", kept.len(), dropped);
    kept.join("\n\n")
}

/// Paragraphs of cleaned text.
pub fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    BLANK_LINE_RE
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
}

fn clean_paragraph(block: &str) -> String {
    let without_page_lines = block
        .lines()
        .filter(|line| !PAGE_NUMBER_RE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n");

    // Each pass only shrinks the text or normalizes whitespace, so this settles.
    let mut current = without_page_lines;
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_once(text: &str) -> String {
    let text = TAG_RE.replace_all(text, " ");
    let text = ENTITY_RE.replace_all(&text, decode_entity);
    let text = BOILERPLATE_RE.replace_all(&text, " ");
    WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
}

fn decode_entity(caps: &Captures<'_>) -> String {
    let decoded = if let Some(dec) = caps.get(1) {
        dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
    } else if let Some(hex) = caps.get(2) {
        u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
    } else {
        caps.get(3).and_then(|name| named_entity(name.as_str()))
    };

    match decoded {
        Some('\u{a0}') => " ".to_string(),
        Some(c) => c.to_string(),
        None => caps[0].to_string(),
    }
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "nbsp" | "ensp" | "emsp" | "thinsp" => ' ',
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "rsquo" | "lsquo" => '\'',
        "ldquo" | "rdquo" => '"',
        "mdash" => '\u{2014}',
        "ndash" => '\u{2013}',
        "bull" | "middot" => '\u{2022}',
        "sect" => '\u{a7}',
        "reg" => '\u{ae}',
        "trade" => '\u{2122}',
        _ => return None,
    };
    Some(c)
}

fn is_noise(paragraph: &str) -> bool {
    paragraph.is_empty()
        || PAGE_NUMBER_RE.is_match(paragraph)
        || RUNNING_FOOTER_RE.is_match(paragraph)
        || !paragraph.chars().any(char::is_alphabetic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markup_and_entities() {
        assert_eq!(
            clean("<p>Supply&nbsp;chain <b>risk</b> &amp; currency&#160;risk</p>"),
            "Supply chain risk & currency risk"
        );
    }

    #[test]
    fn test_drops_page_numbers_and_footers() {
        let raw = "First paragraph of risk.\n\n12\n\nPage 13\n\nF-3\n\nAcme Corp | 2023 Form 10-K | 14\n\nSecond paragraph.";
        assert_eq!(clean(raw), "First paragraph of risk.\n\nSecond paragraph.");
    }

    #[test]
    fn test_page_number_line_inside_paragraph() {
        let raw = "Demand for our products\n27\nmay decline.";
        assert_eq!(clean(raw), "Demand for our products may decline.");
    }

    #[test]
    fn test_removes_navigation_boilerplate() {
        let raw = "Table of Contents\n\nCompetition is intense. Back to contents\n\nClick here to view the chart.";
        assert_eq!(clean(raw), "Competition is intense.");
    }

    #[test]
    fn test_duplicate_paragraphs_kept_once() {
        let raw = "Repeated block.\n\nUnique block.\n\nRepeated   block.";
        assert_eq!(clean(raw), "Repeated block.\n\nUnique block.");
    }

    #[test]
    fn test_empty_and_numeric_only_input() {
        assert_eq!(clean(""), "");
        assert_eq!(clean("\n\n 4 \n\n 2023 \n\n"), "");
    }

    #[test]
    fn test_cleaning_is_idempotent() {
        let raw = "  Table of Contents\r\n\r\n<div>The Company&rsquo;s   results</div>\n\n&amp;lt;b&amp;gt;may vary.\n\n\n 7 \n\nThe   Company depends on key personnel.\n\nThe Company depends on key personnel.";
        let once = clean(raw);
        assert_eq!(clean(&once), once);
        assert!(once.starts_with("The Company's results"));
        assert_eq!(once.matches("key personnel").count(), 1);
    }

    #[test]
    fn test_paragraph_iteration() {
        let paras: Vec<_> = paragraphs("One.\n\nTwo.\n \nThree.").collect();
        assert_eq!(paras, vec!["One.", "Two.", "Three."]);
    }
}
