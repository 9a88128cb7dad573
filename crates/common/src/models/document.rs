//! Intermediate documents produced while generating

use serde::{Deserialize, Serialize};

/// Sanitized HTML for one outline section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionContent {
    pub heading: String,
    pub html: String,
    pub char_count: usize,
}

/// All sections joined and normalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedDocument {
    pub html: String,
    pub char_count: usize,
}
