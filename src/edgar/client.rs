// src/edgar/client.rs
use crate::config::EdgarSettings;
use crate::edgar::models::{self, CompanySubmission, CompanyTickers, FilingMetadata};
use crate::edgar::rate_limit::{self, EdgarRateLimiter};
use crate::utils::error::EdgarError;
use crate::utils::retry::RetryPolicy;
use rand::Rng;
use reqwest::header;
use std::time::Duration;

const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";
const COMPANY_SEARCH_URL: &str = "https://www.sec.gov/cgi-bin/browse-edgar";
const SUBMISSIONS_URL: &str = "https://data.sec.gov/submissions";

/// EDGAR client: contact User-Agent on every request, quota throttling
/// with jitter, and bounded retry for transient failures.
pub struct EdgarClient {
    http: reqwest::Client,
    limiter: EdgarRateLimiter,
    jitter_ms: (u64, u64),
    retry: RetryPolicy,
}

impl EdgarClient {
    pub fn new(settings: &EdgarSettings) -> Result<Self, EdgarError> {
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone()) // Set the required User-Agent
            .timeout(Duration::from_secs(60))
            .build()?;
        tracing::debug!("Using User-Agent: {}", settings.user_agent);

        Ok(Self {
            http,
            limiter: rate_limit::limiter(settings.max_requests_per_window, settings.window),
            jitter_ms: settings.jitter_ms,
            retry: settings.retry,
        })
    }

    async fn throttle(&self) {
        self.limiter.until_ready().await;
        let (lo, hi) = self.jitter_ms;
        let jitter = if hi > lo {
            rand::thread_rng().gen_range(lo..=hi)
        } else {
            lo
        };
        tokio::time::sleep(Duration::from_millis(jitter)).await;
    }

    /// One throttled GET, mapping non-2xx statuses onto EdgarError.
    async fn get_once(&self, url: &str, accept: &str) -> Result<reqwest::Response, EdgarError> {
        self.throttle().await;

        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, accept)
            .send()
            .await?; // Propagates reqwest::Error as EdgarError::Network

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        tracing::error!("HTTP error status: {} for URL: {}", status, url);
        match status {
            reqwest::StatusCode::FORBIDDEN | reqwest::StatusCode::TOO_MANY_REQUESTS => {
                tracing::warn!("Received {} - check User-Agent and rate limits.", status);
                Err(EdgarError::RateLimited)
            }
            reqwest::StatusCode::NOT_FOUND => Err(EdgarError::FilingDocNotFound(url.to_string())),
            _ => Err(EdgarError::Http(status)),
        }
    }

    async fn get_text(&self, url: &str, accept: &str) -> Result<String, EdgarError> {
        self.retry
            .run(&format!("GET {}", url), EdgarError::is_transient, || async move {
                let response = self.get_once(url, accept).await?;
                Ok::<_, EdgarError>(response.text().await?)
            })
            .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, EdgarError> {
        let body = self.get_text(url, "application/json").await?;
        serde_json::from_str(&body)
            .map_err(|e| EdgarError::Parse(format!("{} from {}", e, url)))
    }

    /// Downloads a specific filing document from its URL.
    pub async fn download_filing_doc(&self, url: &str) -> Result<String, EdgarError> {
        tracing::info!("Downloading document from: {}", url);
        let body = self
            .get_text(url, "application/xml,text/html,text/plain,*/*")
            .await?;
        tracing::debug!("Successfully downloaded {} bytes from {}", body.len(), url);
        Ok(body)
    }

    /// Gets the CIK (Central Index Key) for a ticker symbol, zero-padded to 10 digits.
    /// Falls back to the EDGAR company search when the bulk ticker file has no match.
    pub async fn get_cik_from_ticker(&self, ticker: &str) -> Result<String, EdgarError> {
        let ticker = ticker.trim().to_uppercase();

        let tickers: CompanyTickers = self.get_json(COMPANY_TICKERS_URL).await?;
        if let Some(cik) = models::find_cik(&tickers, &ticker) {
            tracing::info!("Found CIK {} for {}", cik, ticker);
            return Ok(cik);
        }

        let search_url = format!(
            "{}?CIK={}&owner=exclude&action=getcompany&output=atom",
            COMPANY_SEARCH_URL, ticker
        );
        tracing::info!("Ticker {} not in bulk file, trying company search", ticker);
        match self.get_text(&search_url, "application/atom+xml,*/*").await {
            Ok(feed) => {
                if let Some(cik) = models::parse_company_search_atom(&feed) {
                    tracing::info!("Found CIK {} for {} using company search", cik, ticker);
                    return Ok(cik);
                }
            }
            Err(e) => tracing::warn!("Company search failed for {}: {}", ticker, e),
        }

        Err(EdgarError::TickerNotFound(ticker))
    }

    /// Fetches the company submission data for a given CIK
    pub async fn get_company_submissions(&self, cik: &str) -> Result<CompanySubmission, EdgarError> {
        let url = format!("{}/CIK{}.json", SUBMISSIONS_URL, cik);
        tracing::debug!("Fetching filing metadata from {}", url);
        self.get_json(&url).await
    }

    /// Resolves ticker -> CIK -> 10-K filings, newest first.
    pub async fn find_10k_filings(&self, ticker: &str) -> Result<Vec<FilingMetadata>, EdgarError> {
        let cik = self.get_cik_from_ticker(ticker).await?;
        let submissions = self.get_company_submissions(&cik).await?;
        let filings = models::ten_k_filings(ticker, &cik, &submissions);
        tracing::info!(
            "Found {} 10-K filings for {} ({})",
            filings.len(),
            ticker.to_uppercase(),
            submissions.name
        );
        Ok(filings)
    }
}
