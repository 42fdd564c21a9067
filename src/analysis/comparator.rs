// src/analysis/comparator.rs
use crate::extractors::segmenter::{RiskFactorEntry, RiskFactorSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
    Unchanged,
}

/// One row of the comparison. Exactly one of `current`/`previous` is missing for
/// added and removed risks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPair {
    pub kind: ChangeKind,
    pub similarity: f64,
    pub current: Option<RiskFactorEntry>,
    pub previous: Option<RiskFactorEntry>,
    pub word_count_change: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub total_changes: usize,
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub unchanged: usize,
}

impl ChangeSummary {
    fn from_pairs(pairs: &[RiskPair]) -> Self {
        let mut summary = ChangeSummary {
            total_changes: pairs.len(),
            ..Default::default()
        };
        for pair in pairs {
            match pair.kind {
                ChangeKind::Added => summary.added += 1,
                ChangeKind::Removed => summary.removed += 1,
                ChangeKind::Modified => summary.modified += 1,
                ChangeKind::Unchanged => summary.unchanged += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearStatistics {
    pub total_risks: usize,
    pub total_words: usize,
    pub avg_words_per_risk: f64,
}

impl YearStatistics {
    fn of(set: &RiskFactorSet) -> Self {
        let total_risks = set.risk_factors.len();
        let total_words: usize = set.risk_factors.iter().map(|r| r.word_count).sum();
        let avg_words_per_risk = if total_risks == 0 {
            0.0
        } else {
            total_words as f64 / total_risks as f64
        };
        Self {
            total_risks,
            total_words,
            avg_words_per_risk,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonStatistics {
    pub current_year: YearStatistics,
    pub previous_year: YearStatistics,
    pub total_risks_change: i64,
    pub word_count_change: i64,
    /// Jaccard similarity of the two sections taken as a whole.
    pub overall_similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentComparison {
    pub statistics: ComparisonStatistics,
    pub pairs: Vec<RiskPair>,
    pub summary: ChangeSummary,
}

/// Jaccard similarity of the lower-cased whitespace-separated word sets.
/// Two empty texts have similarity 0.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    set_similarity(&word_set(a), &word_set(b))
}

fn word_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

fn set_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Greedy pairing of risk factors between two filings.
#[derive(Debug, Clone)]
pub struct Comparator {
    threshold: f64,
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl Comparator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// For each current entry in order, the most similar unused previous entry is taken
    /// if it scores strictly above the threshold; ties go to the earlier previous entry.
    /// Leftover current entries are added, leftover previous entries removed. The
    /// matching is greedy, not globally optimal.
    pub fn compare(&self, current: &RiskFactorSet, previous: &RiskFactorSet) -> ContentComparison {
        let prev_sets: Vec<HashSet<String>> = previous
            .risk_factors
            .iter()
            .map(|r| word_set(&r.text))
            .collect();
        let mut used = vec![false; previous.risk_factors.len()];
        let mut pairs = Vec::with_capacity(current.risk_factors.len() + previous.risk_factors.len());

        for curr in &current.risk_factors {
            let curr_set = word_set(&curr.text);
            let mut best: Option<(usize, f64)> = None;

            for (idx, prev_set) in prev_sets.iter().enumerate() {
                if used[idx] {
                    continue;
                }
                let score = set_similarity(&curr_set, prev_set);
                if score > self.threshold && best.map_or(true, |(_, best_score)| score > best_score) {
                    best = Some((idx, score));
                }
            }

            match best {
                Some((idx, similarity)) => {
                    used[idx] = true;
                    let prev = &previous.risk_factors[idx];
                    let kind = if curr.text == prev.text {
                        ChangeKind::Unchanged
                    } else {
                        ChangeKind::Modified
                    };
                    pairs.push(RiskPair {
                        kind,
                        similarity,
                        current: Some(curr.clone()),
                        previous: Some(prev.clone()),
                        word_count_change: curr.word_count as i64 - prev.word_count as i64,
                    });
                }
                None => pairs.push(RiskPair {
                    kind: ChangeKind::Added,
                    similarity: 0.0,
                    current: Some(curr.clone()),
                    previous: None,
                    word_count_change: curr.word_count as i64,
                }),
            }
        }

        for (prev, _) in previous.risk_factors.iter().zip(&used).filter(|(_, used)| !**used) {
            pairs.push(RiskPair {
                kind: ChangeKind::Removed,
                similarity: 0.0,
                current: None,
                previous: Some(prev.clone()),
                word_count_change: -(prev.word_count as i64),
            });
        }

        let summary = ChangeSummary::from_pairs(&pairs);
        tracing::info!(
            "Compared {} current vs {} previous risks: {} added, {} removed, {} modified, {} unchanged",
            current.risk_factors.len(),
            previous.risk_factors.len(),
            summary.added,
            summary.removed,
            summary.modified,
            summary.unchanged
        );

        ContentComparison {
            statistics: statistics(current, previous),
            pairs,
            summary,
        }
    }
}

fn statistics(current: &RiskFactorSet, previous: &RiskFactorSet) -> ComparisonStatistics {
    let current_year = YearStatistics::of(current);
    let previous_year = YearStatistics::of(previous);
    ComparisonStatistics {
        total_risks_change: current_year.total_risks as i64 - previous_year.total_risks as i64,
        word_count_change: current_year.total_words as i64 - previous_year.total_words as i64,
        overall_similarity: jaccard_similarity(&current.combined_text(), &previous.combined_text()),
        current_year,
        previous_year,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::section::StrategyKind;

    fn set(texts: &[String]) -> RiskFactorSet {
        RiskFactorSet::new(
            "Item 1A. Risk Factors",
            StrategyKind::ExactMarker,
            texts.iter().map(|t| RiskFactorEntry::new(t.clone())).collect(),
        )
    }

    // Vocabulary unique to (tag, index).
    fn disjoint(tag: &str, i: usize) -> String {
        (0..60).map(|k| format!("{}{}w{}", tag, i, k)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_jaccard_basics() {
        assert_eq!(jaccard_similarity("a b c", "A B C"), 1.0);
        assert_eq!(jaccard_similarity("a b", "c d"), 0.0);
        assert_eq!(jaccard_similarity("a b c d", "a b"), 0.5);
        assert_eq!(jaccard_similarity("", "   "), 0.0);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // 7 shared words out of a 10-word union: exactly 0.70.
        let current = set(&["a b c d e f g h i j".to_string()]);
        let previous = set(&["a b c d e f g".to_string()]);
        assert_eq!(jaccard_similarity("a b c d e f g h i j", "a b c d e f g"), 0.7);

        let result = Comparator::default().compare(&current, &previous);
        assert_eq!(result.summary.added, 1);
        assert_eq!(result.summary.removed, 1);
        assert_eq!(result.summary.modified, 0);

        // 8 of 10 clears it.
        let previous = set(&["a b c d e f g h".to_string()]);
        let result = Comparator::default().compare(&current, &previous);
        assert_eq!(result.summary.modified, 1);
        assert_eq!(result.pairs[0].similarity, 0.8);
        assert_eq!(result.pairs[0].word_count_change, 2);
    }

    #[test]
    fn test_identical_texts() {
        let text = "Interest rate changes may reduce our net interest margin".to_string();
        let result = Comparator::default().compare(&set(&[text.clone()]), &set(&[text.clone()]));
        assert_eq!(result.pairs.len(), 1);
        assert_eq!(result.pairs[0].kind, ChangeKind::Unchanged);
        assert_eq!(result.pairs[0].similarity, 1.0);

        let recased = set(&[text.to_uppercase()]);
        let result = Comparator::default().compare(&recased, &set(&[text]));
        assert_eq!(result.pairs[0].kind, ChangeKind::Modified);
        assert_eq!(result.pairs[0].similarity, 1.0);
    }

    #[test]
    fn test_every_entry_in_exactly_one_pair() {
        let shared = disjoint("shared", 0);
        let current = set(&[disjoint("cur", 1), shared.clone(), disjoint("cur", 2)]);
        let previous = set(&[disjoint("prev", 1), disjoint("prev", 2), shared, disjoint("prev", 3)]);
        let result = Comparator::default().compare(&current, &previous);

        for entry in &current.risk_factors {
            let hits = result.pairs.iter().filter(|p| p.current.as_ref() == Some(entry)).count();
            assert_eq!(hits, 1);
        }
        for entry in &previous.risk_factors {
            let hits = result.pairs.iter().filter(|p| p.previous.as_ref() == Some(entry)).count();
            assert_eq!(hits, 1);
        }
        assert!(result.pairs.iter().all(|p| (0.0..=1.0).contains(&p.similarity)));

        // Current entries first, in document order, then the removed ones.
        let kinds: Vec<_> = result.pairs.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChangeKind::Added,
                ChangeKind::Unchanged,
                ChangeKind::Added,
                ChangeKind::Removed,
                ChangeKind::Removed,
                ChangeKind::Removed,
            ]
        );
    }

    #[test]
    fn test_ties_go_to_first_previous_entry() {
        let text = "cyber incidents could disrupt operations and harm reputation".to_string();
        let current = set(&[text.clone()]);
        let previous = set(&[text.replace("cyber", "Cyber"), text.replace("harm", "Harm")]);
        let result = Comparator::default().compare(&current, &previous);
        assert_eq!(result.pairs[0].previous.as_ref().unwrap().text, previous.risk_factors[0].text);
        assert_eq!(result.pairs[1].kind, ChangeKind::Removed);
        assert_eq!(result.pairs[1].previous.as_ref().unwrap().text, previous.risk_factors[1].text);
    }

    #[test]
    fn test_five_against_five_with_one_shared_risk() {
        let shared = disjoint("supply", 0);
        // Same words, different spacing: word-for-word identical but not byte-identical.
        let shared_reflowed = shared.replacen(' ', "  ", 3);

        let mut current_texts: Vec<String> = (1..5).map(|i| disjoint("new", i)).collect();
        current_texts.insert(2, shared_reflowed);
        let mut previous_texts: Vec<String> = (1..5).map(|i| disjoint("old", i)).collect();
        previous_texts.insert(0, shared);

        let result = Comparator::default().compare(&set(&current_texts), &set(&previous_texts));
        assert_eq!(result.summary.modified, 1);
        assert_eq!(result.summary.added, 4);
        assert_eq!(result.summary.removed, 4);
        assert_eq!(result.summary.unchanged, 0);
        assert_eq!(result.summary.total_changes, 9);

        let modified = result.pairs.iter().find(|p| p.kind == ChangeKind::Modified).unwrap();
        assert_eq!(modified.similarity, 1.0);
        assert_eq!(modified.word_count_change, 0);
    }

    #[test]
    fn test_statistics() {
        let current = set(&["one two three four".to_string(), "five six".to_string()]);
        let previous = set(&["one two three four".to_string()]);
        let stats = Comparator::default().compare(&current, &previous).statistics;
        assert_eq!(stats.current_year.total_risks, 2);
        assert_eq!(stats.current_year.total_words, 6);
        assert_eq!(stats.current_year.avg_words_per_risk, 3.0);
        assert_eq!(stats.total_risks_change, 1);
        assert_eq!(stats.word_count_change, 2);
        assert!((stats.overall_similarity - 4.0 / 6.0).abs() < 1e-12);

        let empty = set(&[]);
        let stats = Comparator::default().compare(&empty, &empty).statistics;
        assert_eq!(stats.current_year.avg_words_per_risk, 0.0);
        assert_eq!(stats.overall_similarity, 0.0);
    }
}
