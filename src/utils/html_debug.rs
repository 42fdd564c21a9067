// src/utils/html_debug.rs
use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Item1A,
    Item1B,
    Toc,
}

impl MarkerKind {
    fn css_class(self) -> &'static str {
        match self {
            MarkerKind::Item1A => "highlight-item1a",
            MarkerKind::Item1B => "highlight-item1b",
            MarkerKind::Toc => "highlight-toc",
        }
    }
}

// Patterns located in the raw document for the annotated debug copy.
static DEBUG_PATTERNS: Lazy<Vec<(Regex, MarkerKind)>> = Lazy::new(|| {
    [
        (r"(?i)item(?:\s|&nbsp;|&#160;)*1a[\.\s:\-\u{2014}]*(?:risk\s+factors)?", MarkerKind::Item1A),
        (r"(?i)risk\s+factors", MarkerKind::Item1A),
        (r"(?i)item(?:\s|&nbsp;|&#160;)*1b[\.\s:\-\u{2014}]*(?:unresolved\s+staff\s+comments)?", MarkerKind::Item1B),
        (r"(?i)unresolved\s+staff\s+comments", MarkerKind::Item1B),
        (r"(?i)item(?:\s|&nbsp;|&#160;)*2\.?\s*properties", MarkerKind::Item1B),
        (r"(?i)table\s+of\s+contents", MarkerKind::Toc),
        (r#"(?i)<div[^>]*(?:class|id)=['"]?[^'">]*toc[^>]*>"#, MarkerKind::Toc),
        (r##"(?i)<a[^>]*href=['"]#[^'"]*['"][^>]*>"##, MarkerKind::Toc),
    ]
    .into_iter()
    .filter_map(|(pat, kind)| Regex::new(pat).ok().map(|re| (re, kind)))
    .collect()
});

/// Byte range of a marker in the raw document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub start: usize,
    pub end: usize,
    pub kind: MarkerKind,
}

/// Every Item 1A / Item 1B / ToC marker match in `html`, sorted by position.
pub fn find_markers(html: &str) -> Vec<Highlight> {
    let mut highlights: Vec<Highlight> = DEBUG_PATTERNS
        .iter()
        .flat_map(|(re, kind)| {
            re.find_iter(html).map(move |m| Highlight {
                start: m.start(),
                end: m.end(),
                kind: *kind,
            })
        })
        .collect();
    // Longest first at equal starts so nested matches lose to the enclosing one.
    highlights.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    highlights
}

/// Wraps the raw filing in a page that highlights every marker match. Overlapping
/// matches keep the first (outermost) one.
pub fn annotate_markers(html: &str) -> String {
    let highlights = find_markers(html);

    // Add debug styling in head
    let mut debug_html = String::with_capacity(html.len() + highlights.len() * 96 + 512);
    debug_html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<style>\n");
    debug_html.push_str(".highlight-item1a { background-color: #90EE90; }\n");
    debug_html.push_str(".highlight-item1b { background-color: #ADD8E6; }\n");
    debug_html.push_str(".highlight-toc { background-color: #FFC0CB; }\n");
    debug_html.push_str("</style>\n</head>\n<body>\n");

    let mut last_pos = 0;
    let mut written = 0;
    for highlight in highlights {
        if highlight.start < last_pos {
            continue;
        }
        debug_html.push_str(&html[last_pos..highlight.start]);
        debug_html.push_str(&format!(
            "<span class=\"{}\" title=\"Position: {}-{}, Type: {:?}\">",
            highlight.kind.css_class(),
            highlight.start,
            highlight.end,
            highlight.kind
        ));
        debug_html.push_str(&html[highlight.start..highlight.end]);
        debug_html.push_str("</span>");
        last_pos = highlight.end;
        written += 1;
    }
    debug_html.push_str(&html[last_pos..]);
    debug_html.push_str("\n</body>\n</html>");

    tracing::debug!("Annotated {} marker matches in debug HTML", written);
    debug_html
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_found_in_order() {
        let html = "<p>Table of Contents</p><p>Item 1A. Risk Factors</p><p>Item 1B. Unresolved Staff Comments</p>";
        let kinds: Vec<_> = find_markers(html).iter().map(|h| h.kind).collect();
        assert_eq!(kinds.first(), Some(&MarkerKind::Toc));
        assert!(kinds.contains(&MarkerKind::Item1A));
        assert!(kinds.contains(&MarkerKind::Item1B));
    }

    #[test]
    fn test_overlapping_matches_do_not_nest() {
        let html = "<b>Item 1A. Risk Factors</b> body";
        let annotated = annotate_markers(html);
        assert_eq!(annotated.matches("<span").count(), 1);
        assert!(annotated.contains(">Item 1A. Risk Factors</span></b> body"));
    }

    #[test]
    fn test_no_markers_keeps_document() {
        let annotated = annotate_markers("<p>plain</p>");
        assert!(annotated.contains("<body>\n<p>plain</p>\n</body>"));
    }
}
