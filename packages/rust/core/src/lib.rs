//! Retrieval, summarization, and the request-level surface for Nobestudy.
//!
//! This crate ties the source resolver and the exporter together:
//! - [`orchestrator`]: prioritized source first, then the fallback walk
//! - [`summarizer`]: query-type-specific reduction of the paragraph list
//! - [`pipeline`]: the validated `search`/`export` service

pub mod orchestrator;
pub mod pipeline;
pub mod summarizer;

pub use orchestrator::{
    Accumulator, FallbackState, MAX_RELATED_KEYWORDS, ProbeVerdict, ProgressReporter,
    SilentProgress,
};
pub use pipeline::{ExportForm, ExportOutcome, Nobestudy, build_client};
pub use summarizer::summarize;
