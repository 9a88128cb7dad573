//! HTML sanitization and measurement
//!
//! Leaf utilities shared by every pipeline stage:
//! - Allow-list sanitizer for generated HTML
//! - Semantic character counting and length verdicts
//! - Heading extraction, excerpts and structure analysis

mod analyzer;
mod sanitizer;

pub use analyzer::{
    analyze_structure, count_chars, decode_entities, extract_headings, extract_text,
    generate_excerpt, strip_tags, validate_length, ContentStructure, Heading, HeadingLevel,
};
pub use sanitizer::{sanitize_html, ALLOWED_PROTOCOLS, ALLOWED_TAGS};
