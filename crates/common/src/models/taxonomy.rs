//! Category and tag records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::AppError;

/// Taxonomy kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyKind {
    Category,
    Tag,
}

impl TaxonomyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyKind::Category => "category",
            TaxonomyKind::Tag => "tag",
        }
    }

    /// WordPress REST collection name
    pub fn collection(&self) -> &'static str {
        match self {
            TaxonomyKind::Category => "categories",
            TaxonomyKind::Tag => "tags",
        }
    }
}

impl fmt::Display for TaxonomyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxonomyKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "category" | "categories" => Ok(TaxonomyKind::Category),
            "tag" | "tags" => Ok(TaxonomyKind::Tag),
            other => Err(AppError::Validation {
                message: format!("Unknown taxonomy kind: {}", other),
                field: Some("kind".to_string()),
            }),
        }
    }
}

/// Term as returned by the CMS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

/// Term to be created in the CMS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTerm {
    pub name: String,
    pub slug: String,
    pub description: String,
}

/// Locally cached category or tag.
///
/// Unique per (kind, name) and (kind, slug); `external_id` is unique per
/// kind when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub kind: TaxonomyKind,
    pub name: String,
    pub slug: String,
    pub external_id: Option<u64>,
    #[serde(default)]
    pub description: String,
    pub updated_at: DateTime<Utc>,
}

impl TaxonomyEntry {
    /// Build a cache entry from a CMS term
    pub fn from_term(kind: TaxonomyKind, term: &Term) -> Self {
        Self {
            kind,
            name: term.name.clone(),
            slug: term.slug.clone(),
            external_id: Some(term.id),
            description: term.description.clone(),
            updated_at: Utc::now(),
        }
    }

    /// Whether name, slug or description differ from `other`
    pub fn differs_from(&self, other: &TaxonomyEntry) -> bool {
        self.name != other.name
            || self.slug != other.slug
            || self.description != other.description
            || self.external_id != other.external_id
    }
}
