//! Source probing and content extraction.
//!
//! This crate provides:
//! - [`extractor`]: bounded paragraph/image extraction from a source's content container
//! - [`resolver`]: the ordered source list and one fetch-and-extract attempt per source

pub mod extractor;
pub mod resolver;

pub use extractor::{ExtractedContent, MAX_IMAGES, MAX_PARAGRAPHS, SourceRules, extract};
pub use resolver::{FetchOutcome, SourceResolver, keyword_join, source_url};
