// src/extractors/mod.rs
pub mod cleaner;
pub mod dom;
pub mod html;
pub mod section;
pub mod segmenter;

// Re-export key extraction types for convenience
pub use html::FilingDocument;
pub use section::{RiskSection, SectionExtractor};
pub use segmenter::{RiskFactorSet, RiskSegmenter, SegmenterConfig};
