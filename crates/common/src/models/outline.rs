//! Heading plan produced by the outline step

use serde::{Deserialize, Serialize};

/// Preferred number of H2 sections
pub const SECTION_RANGE: std::ops::RangeInclusive<usize> = 6..=9;

/// Preferred number of H3 sub-headings per section
pub const SUBHEADING_RANGE: std::ops::RangeInclusive<usize> = 2..=3;

/// One H2 group with its H3 sub-headings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineSection {
    #[serde(rename = "h2", default)]
    pub heading: String,

    #[serde(rename = "h3", default)]
    pub subheadings: Vec<String>,
}

/// Article outline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub sections: Vec<OutlineSection>,
}

impl Outline {
    /// Drop sections without a usable H2 heading
    pub fn without_blank_sections(mut self) -> Self {
        self.sections.retain(|s| !s.heading.trim().is_empty());
        self
    }

    /// Whether section and sub-heading counts match the preferred shape.
    ///
    /// This is a policy, not an invariant: callers log deviations and carry on.
    pub fn within_policy(&self) -> bool {
        SECTION_RANGE.contains(&self.sections.len())
            && self
                .sections
                .iter()
                .all(|s| SUBHEADING_RANGE.contains(&s.subheadings.len()))
    }
}
