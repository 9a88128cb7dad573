//! Data records passed between pipeline stages
//!
//! Typed counterparts of every payload the pipeline produces or consumes:
//! - Generation input and outline
//! - Section and merged documents, length verdicts
//! - Final article, taxonomy entries, article jobs

mod article;
mod document;
mod input;
mod job;
mod outline;
mod taxonomy;
mod verdict;

pub use article::{is_valid_slug, ArticleMetadata, Faq, FinalArticle};
pub use document::{MergedDocument, SectionContent};
pub use input::{GenerationInput, InternalLink, Tone};
pub use job::{ArticleJob, ArticleStatus};
pub use outline::{Outline, OutlineSection, SECTION_RANGE, SUBHEADING_RANGE};
pub use taxonomy::{NewTerm, TaxonomyEntry, TaxonomyKind, Term};
pub use verdict::{LengthStatus, LengthVerdict};
