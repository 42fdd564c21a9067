// src/storage/mod.rs
use crate::analysis::ComparisonReport;
use crate::edgar::models::FilingMetadata;
use crate::extractors::segmenter::RiskFactorSet;
use crate::utils::error::StorageError;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const METADATA_FILE: &str = "metadata.json";
pub const RAW_SECTION_FILE: &str = "raw_section.txt";
pub const CLEAN_SECTION_FILE: &str = "clean_section.txt";
pub const RISK_FACTORS_FILE: &str = "risk_factors.json";
pub const COMPARISON_FILE: &str = "risk_comparison.json";
pub const DEBUG_DIR: &str = "debug";

/// Contents of `metadata.json` next to a downloaded filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingRecord {
    #[serde(flatten)]
    pub filing: FilingMetadata,
    pub downloaded_at: DateTime<Utc>,
    pub size_bytes: usize,
}

/// On-disk layout: `<base>/<TICKER>/<filing date>/...`
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn filing_dir(&self, filing: &FilingMetadata) -> PathBuf {
        self.base_dir
            .join(filing.ticker.to_uppercase())
            .join(&filing.filing_date)
    }

    pub fn raw_document_path(&self, filing: &FilingMetadata) -> PathBuf {
        self.filing_dir(filing).join(format!(
            "{}-{}.htm",
            filing.ticker.to_lowercase(),
            filing.filing_date
        ))
    }

    /// The cached filing document, if it was downloaded before.
    pub fn load_raw_document(&self, filing: &FilingMetadata) -> Result<Option<String>, StorageError> {
        read_optional(&self.raw_document_path(filing))
    }

    /// Saves the downloaded document together with its `metadata.json`.
    pub fn save_raw_document(&self, filing: &FilingMetadata, content: &str) -> Result<PathBuf, StorageError> {
        let path = self.raw_document_path(filing);
        write_file(&path, content)?;

        let record = FilingRecord {
            filing: filing.clone(),
            downloaded_at: Utc::now(),
            size_bytes: content.len(),
        };
        write_json(&self.filing_dir(filing).join(METADATA_FILE), &record)?;

        tracing::info!("Saved filing document to {}", path.display());
        Ok(path)
    }

    pub fn load_filing_record(&self, filing: &FilingMetadata) -> Result<Option<FilingRecord>, StorageError> {
        read_json(&self.filing_dir(filing).join(METADATA_FILE))
    }

    pub fn save_raw_section(&self, filing: &FilingMetadata, text: &str) -> Result<PathBuf, StorageError> {
        let path = self.filing_dir(filing).join(RAW_SECTION_FILE);
        write_file(&path, text)?;
        tracing::debug!("Saved raw risk section to {}", path.display());
        Ok(path)
    }

    pub fn save_clean_section(&self, filing: &FilingMetadata, text: &str) -> Result<PathBuf, StorageError> {
        let path = self.filing_dir(filing).join(CLEAN_SECTION_FILE);
        write_file(&path, text)?;
        tracing::debug!("Saved cleaned risk section to {}", path.display());
        Ok(path)
    }

    pub fn save_risk_factors(&self, filing: &FilingMetadata, risks: &RiskFactorSet) -> Result<PathBuf, StorageError> {
        let path = self.filing_dir(filing).join(RISK_FACTORS_FILE);
        write_json(&path, risks)?;
        tracing::info!(
            "Saved {} risk factors to {}",
            risks.metadata.total_risks,
            path.display()
        );
        Ok(path)
    }

    /// Written under the more recent filing's directory.
    pub fn save_comparison(&self, report: &ComparisonReport) -> Result<PathBuf, StorageError> {
        let path = self.filing_dir(&report.current_filing).join(COMPARISON_FILE);
        write_json(&path, report)?;
        tracing::info!("Saved risk comparison to {}", path.display());
        Ok(path)
    }

    /// Writes a debug artifact under `<filing dir>/debug/`.
    pub fn save_debug_file(&self, filing: &FilingMetadata, name: &str, content: &str) -> Result<PathBuf, StorageError> {
        let path = self.filing_dir(filing).join(DEBUG_DIR).join(name);
        write_file(&path, content)?;
        tracing::info!("Saved debug file to {}", path.display());
        Ok(path)
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(value)?;
    write_file(path, &json)
}

fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::IoError(e)),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    match read_optional(path)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}
