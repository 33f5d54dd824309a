//! Reduce an ordered paragraph list to one string for a query type.

use nobestudy_shared::{CONTENT_NOT_FOUND, INVALID_QUERY_TYPE, QueryType};

const ESSAY_PARAGRAPHS: usize = 300;
const ANALYSIS_PARAGRAPHS: usize = 25;
const DESCRIPTION_PARAGRAPHS: usize = 10;

/// Summarize `paragraphs` according to `query_type`.
///
/// An empty list yields the not-found sentinel and an unrecognized query
/// type yields the invalid-type sentinel; neither is an error.
pub fn summarize(paragraphs: &[String], query_type: &QueryType) -> String {
    let Some(first) = paragraphs.first() else {
        return CONTENT_NOT_FOUND.to_string();
    };

    match query_type {
        QueryType::Definition => first.clone(),
        QueryType::Essay => join_first(paragraphs, ESSAY_PARAGRAPHS),
        QueryType::Analysis => join_first(paragraphs, ANALYSIS_PARAGRAPHS),
        QueryType::Description => join_first(paragraphs, DESCRIPTION_PARAGRAPHS),
        QueryType::Unrecognized(_) => INVALID_QUERY_TYPE.to_string(),
    }
}

fn join_first(paragraphs: &[String], limit: usize) -> String {
    paragraphs[..paragraphs.len().min(limit)].join(" ")
}
