// src/analysis/mod.rs
pub mod comparator;
pub mod narrative;
pub mod openai;

use crate::edgar::FilingMetadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use comparator::ContentComparison;
pub use narrative::{NarrativeOutcome, Summarizer};
pub use openai::OpenAiService;

/// Year-over-year comparison of two filings, as persisted in `risk_comparison.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub ticker: String,
    pub current_filing: FilingMetadata,
    pub previous_filing: FilingMetadata,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub content: ContentComparison,
    pub narrative: NarrativeOutcome,
}
