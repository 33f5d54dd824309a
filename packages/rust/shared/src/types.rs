//! Core domain types shared by retrieval, summarization, and export.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::NobestudyError;

/// Content returned when no source yielded a single paragraph.
pub const CONTENT_NOT_FOUND: &str = "Content not found.";

/// Content returned when the requested query type is not one of the known kinds.
pub const INVALID_QUERY_TYPE: &str = "Invalid query type.";

// ---------------------------------------------------------------------------
// QueryType
// ---------------------------------------------------------------------------

/// The kind of summary a caller asked for.
///
/// Unknown strings are kept verbatim in [`QueryType::Unrecognized`] instead of
/// being rejected; summarizing them yields [`INVALID_QUERY_TYPE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QueryType {
    Definition,
    Essay,
    Analysis,
    Description,
    Unrecognized(String),
}

impl QueryType {
    /// Parse a query type; matching is exact and case-sensitive.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "definition" => Self::Definition,
            "essay" => Self::Essay,
            "analysis" => Self::Analysis,
            "description" => Self::Description,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// The wire form of this query type.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Definition => "definition",
            Self::Essay => "essay",
            Self::Analysis => "analysis",
            Self::Description => "description",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// First character upper-cased, the rest lower-cased (`"essay"` → `"Essay"`).
    pub fn label(&self) -> String {
        capitalize(self.as_str())
    }
}

impl From<String> for QueryType {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<&str> for QueryType {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<QueryType> for String {
    fn from(qt: QueryType) -> Self {
        qt.as_str().to_string()
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// A web endpoint plus the selector rules that locate its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Short name used in logs and progress output.
    pub name: String,
    /// URL with a literal `{query}` placeholder.
    pub url_template: String,
    /// CSS selector for the content container (`#id`, `.class`, ...).
    pub container: String,
    /// CSS selector for paragraphs inside the container.
    #[serde(default = "default_paragraphs")]
    pub paragraphs: String,
    /// CSS selector for images inside the container.
    #[serde(default = "default_images")]
    pub images: String,
    /// Attribute holding the image reference.
    #[serde(default = "default_image_attr")]
    pub image_attr: String,
    /// Separator used to join query words before substitution.
    #[serde(default = "default_word_separator")]
    pub word_separator: String,
}

impl Source {
    /// A source with the default paragraph/image rules.
    pub fn new(
        name: impl Into<String>,
        url_template: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            container: container.into(),
            paragraphs: default_paragraphs(),
            images: default_images(),
            image_attr: default_image_attr(),
            word_separator: default_word_separator(),
        }
    }

    /// Override the word separator (e.g. `-` for slug-style URLs).
    pub fn with_word_separator(mut self, separator: impl Into<String>) -> Self {
        self.word_separator = separator.into();
        self
    }
}

fn default_paragraphs() -> String {
    "p".into()
}
fn default_images() -> String {
    "img".into()
}
fn default_image_attr() -> String {
    "src".into()
}
fn default_word_separator() -> String {
    "_".into()
}

// ---------------------------------------------------------------------------
// ScrapeResult / ExportRequest
// ---------------------------------------------------------------------------

/// The unit returned to callers of a search and handed to exporters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeResult {
    /// Summary text, or one of the sentinel strings.
    pub content: String,
    /// Absolute image URLs in discovery order.
    pub images: Vec<String>,
    /// Up to three tokens from the titles of empty fallback pages.
    pub related_keywords: Vec<String>,
}

impl ScrapeResult {
    /// Whether retrieval found nothing at all.
    pub fn is_not_found(&self) -> bool {
        self.content == CONTENT_NOT_FOUND
    }
}

/// Input shared by every document renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub query: String,
    pub query_type: QueryType,
    pub content: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl ExportRequest {
    /// `"<QueryType capitalized> of <query>"`.
    pub fn title_line(&self) -> String {
        format!("{} of {}", self.query_type.label(), self.query)
    }
}

// ---------------------------------------------------------------------------
// FileType
// ---------------------------------------------------------------------------

/// Export format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Ppt,
    Docx,
}

impl FileType {
    /// Fixed artifact file name for this format.
    pub fn artifact_name(self) -> &'static str {
        match self {
            Self::Pdf => "output.pdf",
            Self::Ppt => "Nobestudy.pptx",
            Self::Docx => "Nobestudy.docx",
        }
    }

    /// MIME type used when the file is delivered as an attachment.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Ppt => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Ppt => "ppt",
            Self::Docx => "docx",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = NobestudyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "ppt" | "pptx" => Ok(Self::Ppt),
            "docx" => Ok(Self::Docx),
            other => Err(NobestudyError::validation(format!(
                "unsupported file type '{other}': expected pdf, ppt, or docx"
            ))),
        }
    }
}
