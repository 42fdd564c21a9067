// src/pipeline.rs
use crate::analysis::comparator::Comparator;
use crate::analysis::narrative::{NarrativeRequest, NarrativeService};
use crate::analysis::{ComparisonReport, NarrativeOutcome, Summarizer};
use crate::config::{ExtractionSettings, Settings};
use crate::edgar::{EdgarClient, FilingMetadata};
use crate::extractors::{
    cleaner, FilingDocument, RiskFactorSet, RiskSection, RiskSegmenter, SectionExtractor, SegmenterConfig,
};
use crate::storage::StorageManager;
use crate::utils::error::{AppError, ExtractError};
use crate::utils::html_debug;

/// Output of extract -> clean -> segment for one filing.
#[derive(Debug, Clone)]
pub struct ProcessedFiling {
    pub section: RiskSection,
    pub clean_text: String,
    pub risks: RiskFactorSet,
}

/// The offline part of the pipeline: raw document in, risk factors out.
pub struct DocumentProcessor {
    extractor: SectionExtractor,
    segmenter: RiskSegmenter,
}

impl DocumentProcessor {
    pub fn new(settings: &ExtractionSettings) -> Self {
        Self {
            extractor: SectionExtractor::new(settings.min_section_chars),
            segmenter: RiskSegmenter::new(SegmenterConfig::from(settings)),
        }
    }

    pub fn process(&self, raw: &str) -> Result<ProcessedFiling, ExtractError> {
        let document = FilingDocument::parse(raw);
        let section = self.extractor.extract(&document)?;

        let clean_text = cleaner::clean(&section.text);
        let entries = self.segmenter.segment(&clean_text);
        if entries.is_empty() {
            return Err(ExtractError::NoRiskFactors(clean_text.split_whitespace().count()));
        }

        let risks = RiskFactorSet::new(section.start_marker.clone(), section.strategy, entries);
        tracing::info!(
            "Extracted {} risk factors ({} words) via {}",
            risks.metadata.total_risks,
            risks.metadata.total_words,
            section.strategy
        );
        Ok(ProcessedFiling {
            section,
            clean_text,
            risks,
        })
    }
}

/// Orders two filings as (current, previous) by filing date.
pub fn order_by_recency<'a>(a: &'a FilingMetadata, b: &'a FilingMetadata) -> (&'a FilingMetadata, &'a FilingMetadata) {
    if a.filing_date >= b.filing_date {
        (a, b)
    } else {
        (b, a)
    }
}

/// Fetch, extract, compare and summarize, persisting every stage.
pub struct Pipeline<S> {
    client: EdgarClient,
    storage: StorageManager,
    processor: DocumentProcessor,
    comparator: Comparator,
    summarizer: Option<Summarizer<S>>,
    max_filings: usize,
    debug: bool,
}

impl<S: NarrativeService> Pipeline<S> {
    pub fn new(
        settings: &Settings,
        client: EdgarClient,
        storage: StorageManager,
        summarizer: Option<Summarizer<S>>,
    ) -> Self {
        Self {
            client,
            storage,
            processor: DocumentProcessor::new(&settings.extraction),
            comparator: Comparator::new(settings.extraction.similarity_threshold),
            summarizer,
            max_filings: settings.max_filings,
            debug: settings.debug,
        }
    }

    /// The most recent 10-K filings of `ticker`; fewer than two is an error.
    pub async fn discover_filings(&self, ticker: &str) -> Result<Vec<FilingMetadata>, AppError> {
        let mut filings = self.client.find_10k_filings(ticker).await?;
        filings.truncate(self.max_filings);
        if filings.len() < 2 {
            return Err(AppError::InsufficientData(format!(
                "{} has {} 10-K filing(s); two are needed for a comparison",
                ticker,
                filings.len()
            )));
        }
        Ok(filings)
    }

    /// The filing document, from the local cache when present.
    pub async fn fetch_document(&self, filing: &FilingMetadata) -> Result<String, AppError> {
        if let Some(cached) = self.storage.load_raw_document(filing)? {
            match self.storage.load_filing_record(filing) {
                Ok(Some(record)) => tracing::info!(
                    "Using cached {} filing from {} (downloaded {})",
                    filing.ticker,
                    filing.filing_date,
                    record.downloaded_at.to_rfc3339()
                ),
                _ => tracing::info!("Using cached {} filing from {}", filing.ticker, filing.filing_date),
            }
            return Ok(cached);
        }

        let url = filing.primary_doc_url();
        let content = self.client.download_filing_doc(&url).await?;
        self.storage.save_raw_document(filing, &content)?;
        Ok(content)
    }

    /// Extracts, cleans and segments one filing and persists each stage.
    pub async fn analyze_filing(&self, filing: &FilingMetadata) -> Result<ProcessedFiling, AppError> {
        let raw = self.fetch_document(filing).await?;
        tracing::info!("Analyzing {} 10-K filed {}", filing.ticker, filing.filing_date);

        if self.debug {
            if let Err(e) = self
                .storage
                .save_debug_file(filing, "filing_annotated.html", &html_debug::annotate_markers(&raw))
            {
                tracing::warn!("Failed to create debug HTML: {}", e);
            }
        }

        let processed = match self.processor.process(&raw) {
            Ok(processed) => processed,
            Err(e) => {
                tracing::error!("Failed to extract risk factors from {} {}: {}", filing.ticker, filing.filing_date, e);
                if self.debug {
                    let info = format!(
                        "Failed to extract Item 1A for {} {} ({}): {}\n",
                        filing.ticker,
                        filing.filing_date,
                        filing.primary_doc_url(),
                        e
                    );
                    if let Err(save_err) = self.storage.save_debug_file(filing, "extraction_failure.txt", &info) {
                        tracing::error!("Failed to save failure info: {}", save_err);
                    }
                }
                return Err(e.into());
            }
        };

        self.storage.save_raw_section(filing, &processed.section.text)?;
        self.storage.save_clean_section(filing, &processed.clean_text)?;
        self.storage.save_risk_factors(filing, &processed.risks)?;
        Ok(processed)
    }

    /// Compares two filings; the more recent one is treated as current.
    pub async fn compare(&self, a: &FilingMetadata, b: &FilingMetadata) -> Result<ComparisonReport, AppError> {
        let (current_filing, previous_filing) = order_by_recency(a, b);

        let current = self.analyze_filing(current_filing).await?;
        let previous = self.analyze_filing(previous_filing).await?;

        let content = self.comparator.compare(&current.risks, &previous.risks);

        let narrative = match &self.summarizer {
            Some(summarizer) => {
                let request = NarrativeRequest {
                    ticker: &current_filing.ticker,
                    current_date: &current_filing.filing_date,
                    previous_date: &previous_filing.filing_date,
                    current_text: &current.clean_text,
                    previous_text: &previous.clean_text,
                };
                summarizer.summarize(&request).await
            }
            None => NarrativeOutcome::failed("summarization service not configured (set OPENAI_API_KEY)"),
        };

        let report = ComparisonReport {
            ticker: current_filing.ticker.clone(),
            current_filing: current_filing.clone(),
            previous_filing: previous_filing.clone(),
            generated_at: chrono::Utc::now(),
            content,
            narrative,
        };

        // The report is still printed when it cannot be saved.
        if let Err(e) = self.storage.save_comparison(&report) {
            tracing::error!("Failed to save comparison: {}", e);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::comparator::ChangeKind;
    use crate::analysis::narrative::NarrativePrompt;
    use crate::config::CliOverrides;
    use crate::extractors::section::StrategyKind;
    use crate::storage::COMPARISON_FILE;
    use crate::utils::error::SummaryError;
    use std::path::PathBuf;

    /// Answers in prose instead of the requested JSON.
    struct ProseService;

    impl NarrativeService for ProseService {
        async fn complete(&self, _prompt: &NarrativePrompt) -> Result<String, SummaryError> {
            Ok("Risk disclosures look broadly stable year over year.".to_string())
        }
    }

    fn risk_paragraph(lead: &str, topic: &str) -> String {
        let filler: Vec<String> = (0..60).map(|i| format!("{}{}", topic, i)).collect();
        format!("{} {} which could adversely affect results.", lead, filler.join(" "))
    }

    fn synthetic_filing() -> String {
        format!(
            "Cover page\n\nItem 1A. Risk Factors\n\n{}\n\n{}\n\n{}\n\nItem 1B. Unresolved Staff Comments\n\nNone.",
            risk_paragraph("The Company faces competition from", "rival"),
            risk_paragraph("The Company depends on suppliers including", "vendor"),
            risk_paragraph("The Company is subject to regulation by", "agency"),
        )
    }

    fn previous_filing_text() -> String {
        format!(
            "Item 1A. Risk Factors\n\n{}\n\n{}\n\n{}\n\nItem 1B. Unresolved Staff Comments\n\nNone.",
            risk_paragraph("The Company faces competition from", "rival"),
            risk_paragraph("The Company relies on licenses from", "patent"),
            risk_paragraph("Global demand shifts across", "market"),
        )
    }

    fn cached_pipeline(name: &str) -> (Pipeline<ProseService>, PathBuf) {
        let dir = std::env::temp_dir().join(format!("sec_risk_pipeline_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let overrides = CliOverrides {
            data_dir: Some(dir.clone()),
            ..CliOverrides::default()
        };
        let settings = Settings::from_lookup(overrides, |_| None).unwrap();
        let storage = StorageManager::new(&settings.data_dir).unwrap();
        let client = EdgarClient::new(&settings.edgar).unwrap();
        let summarizer = Summarizer::new(ProseService, settings.openai.max_input_chars);
        (Pipeline::new(&settings, client, storage, Some(summarizer)), dir)
    }

    fn filing(date: &str) -> FilingMetadata {
        FilingMetadata {
            ticker: "ACME".to_string(),
            cik: "0000000001".to_string(),
            company_name: "Acme".to_string(),
            filing_date: date.to_string(),
            accession_number: "0000000001-24-000001".to_string(),
            primary_doc: "acme.htm".to_string(),
            form_type: "10-K".to_string(),
        }
    }

    #[test]
    fn test_three_company_paragraphs_end_to_end() {
        let processor = DocumentProcessor::new(&ExtractionSettings::default());
        let processed = processor.process(&synthetic_filing()).unwrap();

        assert_eq!(processed.section.strategy, StrategyKind::ExactMarker);
        assert_eq!(processed.section.end_marker.as_deref(), Some("Item 1B"));
        let risks = &processed.risks.risk_factors;
        assert_eq!(risks.len(), 3);
        assert!(risks[0].text.starts_with("The Company faces competition"));
        assert!(risks[1].text.starts_with("The Company depends on suppliers"));
        assert!(risks[2].text.starts_with("The Company is subject to regulation"));
        assert!(risks.iter().all(|r| r.word_count >= 50));
        assert!(!processed.clean_text.contains("None."));
        assert_eq!(processed.risks.section_title, "Item 1A. Risk Factors");
    }

    #[test]
    fn test_html_filing_end_to_end() {
        let body: String = [
            risk_paragraph("The Company faces competition from", "rival"),
            risk_paragraph("Failure to retain staff including", "engineer"),
        ]
        .iter()
        .map(|p| format!("<p>{}</p><p style=\"text-align:center\">12</p>", p))
        .collect();
        let html = format!(
            "<html><body><div><b>ITEM 1A. RISK FACTORS</b></div>{}<div><b>ITEM 2. PROPERTIES</b></div><p>We lease offices.</p></body></html>",
            body
        );

        let processed = DocumentProcessor::new(&ExtractionSettings::default()).process(&html).unwrap();
        assert_eq!(processed.risks.risk_factors.len(), 2);
        assert!(processed.risks.risk_factors[1].text.starts_with("Failure to retain staff"));
        assert!(!processed.clean_text.contains("12\n"));
        assert!(!processed.clean_text.contains("lease offices"));
    }

    #[test]
    fn test_missing_section_reported() {
        let processor = DocumentProcessor::new(&ExtractionSettings::default());
        let err = processor.process("<html><body><p>Exhibits only.</p></body></html>").unwrap_err();
        assert!(matches!(err, ExtractError::SectionNotFound(_)));
    }

    #[test]
    fn test_no_entries_survive() {
        let settings = ExtractionSettings {
            min_section_chars: 10,
            ..ExtractionSettings::default()
        };
        let raw = "Item 1A. Risk Factors\n\nThe Company has few risks.\n\nItem 1B. None.";
        let err = DocumentProcessor::new(&settings).process(raw).unwrap_err();
        assert!(matches!(err, ExtractError::NoRiskFactors(5)));
    }

    #[test]
    fn test_compare_survives_malformed_narrative() {
        let (pipeline, dir) = cached_pipeline("malformed");
        let newer = filing("2024-02-02");
        let older = filing("2023-02-03");
        pipeline.storage.save_raw_document(&newer, &synthetic_filing()).unwrap();
        pipeline.storage.save_raw_document(&older, &previous_filing_text()).unwrap();

        // Both documents come from the cache, so no request leaves the process.
        let report = tokio_test::block_on(pipeline.compare(&older, &newer)).unwrap();

        assert!(matches!(report.narrative, NarrativeOutcome::Failed { .. }));
        assert_eq!(report.current_filing.filing_date, "2024-02-02");
        assert_eq!(report.content.summary.unchanged, 1);
        assert_eq!(report.content.summary.added, 2);
        assert_eq!(report.content.summary.removed, 2);
        assert_eq!(report.content.summary.modified, 0);
        assert_eq!(report.content.summary.total_changes, 5);
        assert_eq!(report.content.pairs[0].kind, ChangeKind::Unchanged);

        let saved_path = dir.join("ACME").join("2024-02-02").join(COMPARISON_FILE);
        let saved: ComparisonReport =
            serde_json::from_str(&std::fs::read_to_string(&saved_path).unwrap()).unwrap();
        assert_eq!(saved.content.summary, report.content.summary);
        assert!(matches!(saved.narrative, NarrativeOutcome::Failed { .. }));
        assert!(!dir.join("ACME").join("2023-02-03").join(COMPARISON_FILE).exists());
        assert!(dir.join("ACME").join("2023-02-03").join("risk_factors.json").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_fetch_document_prefers_cache() {
        let (pipeline, dir) = cached_pipeline("cache");
        let filing = filing("2024-02-02");
        pipeline.storage.save_raw_document(&filing, "<html>cached</html>").unwrap();

        let content = tokio_test::block_on(pipeline.fetch_document(&filing)).unwrap();
        assert_eq!(content, "<html>cached</html>");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_order_by_recency() {
        let older = filing("2023-02-03");
        let newer = filing("2024-02-02");
        let (current, previous) = order_by_recency(&older, &newer);
        assert_eq!(current.filing_date, "2024-02-02");
        assert_eq!(previous.filing_date, "2023-02-03");
        let (current, _) = order_by_recency(&newer, &older);
        assert_eq!(current.filing_date, "2024-02-02");
    }
}
