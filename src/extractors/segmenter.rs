// src/extractors/segmenter.rs
use crate::config::ExtractionSettings;
use crate::extractors::cleaner;
use crate::extractors::section::StrategyKind;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// Terminal punctuation, optional closing quotes/brackets, then whitespace.
static SENTENCE_END_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[.!?]["'\u{201d}\u{2019})\]]*\s+"#).expect("Failed to compile SENTENCE_END_RE")
});

/// Sentence openers that usually introduce a new risk factor.
pub const DEFAULT_LEAD_INS: &[&str] = &[
    "The Company",
    "The Company's",
    "The Company has",
    "The business",
    "Global",
    "Future",
    "If the",
    "If",
    "Changes",
    "Failure",
    "There can",
];

#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    pub lead_ins: Vec<String>,
    pub max_chars: usize,
    pub min_words: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            lead_ins: DEFAULT_LEAD_INS.iter().map(|s| s.to_string()).collect(),
            max_chars: 1000,
            min_words: 50,
        }
    }
}

impl From<&ExtractionSettings> for SegmenterConfig {
    fn from(settings: &ExtractionSettings) -> Self {
        Self {
            max_chars: settings.max_chars,
            min_words: settings.min_words,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskFactorEntry {
    pub text: String,
    pub word_count: usize,
    pub char_count: usize,
    pub summary: String,
}

impl RiskFactorEntry {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let summary = split_sentences(&text)
            .first()
            .map(|s| s.to_string())
            .unwrap_or_default();
        Self {
            word_count: text.split_whitespace().count(),
            char_count: text.chars().count(),
            summary,
            text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskSetMetadata {
    pub total_risks: usize,
    pub total_words: usize,
    pub total_chars: usize,
    pub extraction_timestamp: DateTime<Utc>,
}

/// All risk factors of one filing, in document order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskFactorSet {
    pub section_title: String,
    pub strategy: StrategyKind,
    pub risk_factors: Vec<RiskFactorEntry>,
    pub metadata: RiskSetMetadata,
}

impl RiskFactorSet {
    pub fn new(section_title: impl Into<String>, strategy: StrategyKind, risk_factors: Vec<RiskFactorEntry>) -> Self {
        let metadata = RiskSetMetadata {
            total_risks: risk_factors.len(),
            total_words: risk_factors.iter().map(|r| r.word_count).sum(),
            total_chars: risk_factors.iter().map(|r| r.char_count).sum(),
            extraction_timestamp: Utc::now(),
        };
        Self {
            section_title: section_title.into(),
            strategy,
            risk_factors,
            metadata,
        }
    }

    /// All entry texts joined with blank lines.
    pub fn combined_text(&self) -> String {
        self.risk_factors
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Splits cleaned section text into risk factor entries.
pub struct RiskSegmenter {
    config: SegmenterConfig,
    lead_in_re: Option<Regex>,
}

impl RiskSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        let lead_in_re = if config.lead_ins.is_empty() {
            None
        } else {
            let alternatives = config
                .lead_ins
                .iter()
                .map(|lead| regex::escape(lead.trim()))
                .collect::<Vec<_>>()
                .join("|");
            match Regex::new(&format!(r"^(?:{})\b", alternatives)) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("Ignoring lead-in phrases, pattern failed to compile: {}", e);
                    None
                }
            }
        };
        Self { config, lead_in_re }
    }

    fn starts_new_risk(&self, sentence: &str) -> bool {
        self.lead_in_re
            .as_ref()
            .is_some_and(|re| re.is_match(sentence))
    }

    /// Groups sentences into entries. A lead-in sentence opens a new entry; an entry
    /// that grows past `max_chars` is closed after the sentence that crossed it.
    /// Entries shorter than `min_words` are discarded.
    pub fn segment(&self, cleaned: &str) -> Vec<RiskFactorEntry> {
        let mut entries = Vec::new();
        let mut current = String::new();

        for paragraph in cleaner::paragraphs(cleaned) {
            for sentence in split_sentences(paragraph) {
                if !current.is_empty() && self.starts_new_risk(sentence) {
                    self.flush(&mut current, &mut entries);
                }
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(sentence);

                if current.chars().count() > self.config.max_chars {
                    self.flush(&mut current, &mut entries);
                }
            }
        }
        self.flush(&mut current, &mut entries);

        tracing::debug!("Segmented {} risk factors", entries.len());
        entries
    }

    fn flush(&self, current: &mut String, entries: &mut Vec<RiskFactorEntry>) {
        let text = current.trim();
        if !text.is_empty() {
            let entry = RiskFactorEntry::new(text);
            if entry.word_count >= self.config.min_words {
                entries.push(entry);
            } else {
                tracing::trace!("Dropping {}-word fragment: {}", entry.word_count, entry.summary);
            }
        }
        current.clear();
    }
}

/// Sentences of one paragraph. A sentence ends at `.`, `!` or `?` (plus any closing
/// quotes) followed by whitespace and an upper-case letter, digit or opening quote.
pub fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END_RE.find_iter(paragraph) {
        let next = paragraph[m.end()..].chars().next();
        let opens_sentence = next.is_some_and(|c| {
            c.is_uppercase() || c.is_ascii_digit() || matches!(c, '"' | '\'' | '\u{201c}' | '\u{2018}')
        });
        if !opens_sentence {
            continue;
        }
        let sentence = paragraph[start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = m.end();
    }

    let rest = paragraph[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest);
    }
    sentences
}
