// src/analysis/narrative.rs
use crate::utils::error::SummaryError;
use serde::{Deserialize, Serialize};
use std::future::Future;

pub const SYSTEM_PROMPT: &str =
    "You are an expert financial analyst specializing in SEC risk factor analysis.";

const RESPONSE_SCHEMA: &str = r#"{
    "risk_changes": [
        {
            "risk_area": "Name of risk area",
            "change_type": "new|removed|modified|unchanged",
            "severity_change": "increased|decreased|unchanged",
            "description": "Detailed description of the change",
            "significance": "high|medium|low",
            "implications": "Business implications of this change"
        }
    ],
    "key_findings": {
        "major_changes": ["List of most significant changes"],
        "emerging_risks": ["New risks that have emerged"],
        "reduced_risks": ["Risks that have decreased in severity"],
        "persistent_concerns": ["Ongoing significant risks"]
    },
    "overall_assessment": {
        "risk_trend": "increasing|decreasing|stable",
        "confidence": "high|medium|low",
        "summary": "Brief summary of overall risk profile changes"
    }
}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeChangeType {
    New,
    Removed,
    Modified,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityChange {
    Increased,
    Decreased,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTrend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeRiskChange {
    pub risk_area: String,
    pub change_type: NarrativeChangeType,
    pub severity_change: SeverityChange,
    pub description: String,
    pub significance: Level,
    pub implications: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFindings {
    pub major_changes: Vec<String>,
    pub emerging_risks: Vec<String>,
    pub reduced_risks: Vec<String>,
    pub persistent_concerns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallAssessment {
    pub risk_trend: RiskTrend,
    pub confidence: Level,
    pub summary: String,
}

/// The summarization service's answer, validated against the schema in the prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeAnalysis {
    pub risk_changes: Vec<NarrativeRiskChange>,
    pub key_findings: KeyFindings,
    pub overall_assessment: OverallAssessment,
}

/// Result of the summarization step. A failure is recorded, never propagated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum NarrativeOutcome {
    Completed(NarrativeAnalysis),
    Failed { reason: String },
}

impl NarrativeOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        NarrativeOutcome::Failed {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativePrompt {
    pub system: String,
    pub user: String,
}

/// What is being compared.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeRequest<'a> {
    pub ticker: &'a str,
    pub current_date: &'a str,
    pub previous_date: &'a str,
    pub current_text: &'a str,
    pub previous_text: &'a str,
}

/// A chat-style language model endpoint: takes a prompt, returns the raw reply text.
pub trait NarrativeService {
    fn complete(&self, prompt: &NarrativePrompt) -> impl Future<Output = Result<String, SummaryError>>;
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn build_prompt(request: &NarrativeRequest<'_>, max_input_chars: usize) -> NarrativePrompt {
    let current = truncate_chars(request.current_text, max_input_chars);
    let previous = truncate_chars(request.previous_text, max_input_chars);
    if current.len() < request.current_text.len() || previous.len() < request.previous_text.len() {
        tracing::warn!(
            "Risk text truncated to {} chars per year for the summarization prompt",
            max_input_chars
        );
    }

    let user = format!(
        "Task: Analyze the changes in risk factor disclosures between two 10-K filings of {ticker}.\n\n\
         Current Year Risk Factors (filed {current_date}):\n{current}\n\n\
         Previous Year Risk Factors (filed {previous_date}):\n{previous}\n\n\
         Provide a detailed analysis in the following JSON format:\n{schema}\n\n\
         Focus on material changes that could significantly impact the business. Identify shifts in \
         strategic, operational, financial, regulatory, market, technology and competitive risks.",
        ticker = request.ticker,
        current_date = request.current_date,
        previous_date = request.previous_date,
        current = current,
        previous = previous,
        schema = RESPONSE_SCHEMA,
    );

    NarrativePrompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Parses the service reply, tolerating a Markdown code fence around the JSON.
pub fn parse_narrative(raw: &str) -> Result<NarrativeAnalysis, SummaryError> {
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return Err(SummaryError::EmptyResponse);
    }
    serde_json::from_str(body).map_err(|e| SummaryError::MalformedResponse(e.to_string()))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

pub struct Summarizer<S> {
    service: S,
    max_input_chars: usize,
}

impl<S: NarrativeService> Summarizer<S> {
    pub fn new(service: S, max_input_chars: usize) -> Self {
        Self {
            service,
            max_input_chars,
        }
    }

    pub async fn summarize(&self, request: &NarrativeRequest<'_>) -> NarrativeOutcome {
        let prompt = build_prompt(request, self.max_input_chars);
        tracing::info!(
            "Requesting narrative analysis for {} ({} vs {})",
            request.ticker,
            request.current_date,
            request.previous_date
        );

        let result = match self.service.complete(&prompt).await {
            Ok(raw) => parse_narrative(&raw),
            Err(e) => Err(e),
        };

        match result {
            Ok(analysis) => {
                tracing::info!(
                    "Narrative analysis completed: {} risk changes, trend {:?}",
                    analysis.risk_changes.len(),
                    analysis.overall_assessment.risk_trend
                );
                NarrativeOutcome::Completed(analysis)
            }
            Err(e) => {
                tracing::warn!("Narrative analysis unavailable: {}", e);
                NarrativeOutcome::failed(e.to_string())
            }
        }
    }
}
