// src/edgar/models.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of https://www.sec.gov/files/company_tickers.json
/// (the file is a map of "0", "1", ... to these rows).
#[derive(Debug, Clone, Deserialize)]
pub struct TickerEntry {
    pub cik_str: u64,
    pub ticker: String,
}

pub type CompanyTickers = HashMap<String, TickerEntry>;

/// Finds the zero-padded CIK for `ticker` (case-insensitive).
pub fn find_cik(tickers: &CompanyTickers, ticker: &str) -> Option<String> {
    tickers
        .values()
        .find(|entry| entry.ticker.eq_ignore_ascii_case(ticker))
        .map(|entry| format!("{:010}", entry.cik_str))
}

/// Subset of the EDGAR company submission index we rely on.
/// Example: https://data.sec.gov/submissions/CIK0000320193.json
#[derive(Debug, Deserialize)]
pub struct CompanySubmission {
    pub name: String,
    pub filings: Filings,
}

#[derive(Debug, Deserialize)]
pub struct Filings {
    pub recent: FilingsList,
}

/// Column-oriented list: index `i` across the vectors describes one filing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingsList {
    pub accession_number: Vec<String>,
    pub filing_date: Vec<String>,
    pub form: Vec<String>,
    pub primary_document: Vec<String>,
}

/// A single 10-K filing. Keyed by (ticker, filing date).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingMetadata {
    pub ticker: String,
    pub cik: String,
    pub company_name: String,
    pub filing_date: String,
    pub accession_number: String,
    pub primary_doc: String,
    pub form_type: String,
}

impl FilingMetadata {
    /// Constructs the URL to access the primary document of this filing
    pub fn primary_doc_url(&self) -> String {
        let acc_no_dashes = self.accession_number.replace('-', "");
        let cik = self.cik.trim_start_matches('0');
        format!(
            "https://www.sec.gov/Archives/edgar/data/{}/{}/{}",
            if cik.is_empty() { "0" } else { cik },
            acc_no_dashes,
            self.primary_doc
        )
    }

    pub fn year(&self) -> Option<u32> {
        self.filing_date.get(0..4)?.parse().ok()
    }
}

/// Collects the 10-K filings of a submission index, newest first,
/// one per (ticker, filing date).
pub fn ten_k_filings(
    ticker: &str,
    cik: &str,
    submission: &CompanySubmission,
) -> Vec<FilingMetadata> {
    let recent = &submission.filings.recent;
    let ticker = ticker.to_uppercase();

    let mut filings: Vec<FilingMetadata> = recent
        .form
        .iter()
        .enumerate()
        .filter(|(_, form)| form.as_str() == "10-K")
        .filter_map(|(i, form)| {
            // Columns should be equally long; skip rows where they are not.
            let (Some(date), Some(accession), Some(doc)) = (
                recent.filing_date.get(i),
                recent.accession_number.get(i),
                recent.primary_document.get(i),
            ) else {
                tracing::warn!("Submission index row {} is incomplete, skipping", i);
                return None;
            };
            Some(FilingMetadata {
                ticker: ticker.clone(),
                cik: cik.to_string(),
                company_name: submission.name.clone(),
                filing_date: date.clone(),
                accession_number: accession.clone(),
                primary_doc: doc.clone(),
                form_type: form.clone(),
            })
        })
        .collect();

    filings.sort_by(|a, b| b.filing_date.cmp(&a.filing_date));
    filings.dedup_by(|a, b| a.filing_date == b.filing_date);
    filings
}

/// Reads `company-info/cik` from the EDGAR company-search Atom feed.
pub fn parse_company_search_atom(xml: &str) -> Option<String> {
    // EDGAR declares ISO-8859-1; roxmltree only reads UTF-8, and the body is ASCII anyway.
    let body = xml.trim_start();
    let body = match body.strip_prefix("<?xml") {
        Some(rest) => &rest[rest.find("?>")? + 2..],
        None => body,
    };
    let doc = roxmltree::Document::parse(body).ok()?;
    let company_info = doc
        .descendants()
        .find(|node| node.tag_name().name() == "company-info")?;
    let cik = company_info
        .descendants()
        .find(|node| node.tag_name().name() == "cik")?
        .text()?
        .trim();
    let cik: u64 = cik.parse().ok()?;
    Some(format!("{:010}", cik))
}
