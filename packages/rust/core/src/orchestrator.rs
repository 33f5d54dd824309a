//! Fallback-driven retrieval across the configured sources.
//!
//! The prioritized source is probed first and short-circuits the request when
//! it yields paragraphs. Otherwise the fallback sources are walked in order by
//! a small state machine ([`FallbackState`]) that appends every found
//! container's paragraphs and images to one [`Accumulator`] and stops as soon
//! as the accumulator holds at least one paragraph.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument};

use nobestudy_shared::{QueryType, ScrapeResult};
use nobestudy_sources::{ExtractedContent, FetchOutcome, SourceResolver};

use crate::summarizer;

/// Related keywords kept in the final result.
pub const MAX_RELATED_KEYWORDS: usize = 3;

// ---------------------------------------------------------------------------
// Accumulated state
// ---------------------------------------------------------------------------

/// Request-wide state. Append-only; never reset once a source contributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Accumulator {
    paragraphs: Vec<String>,
    images: Vec<String>,
    keywords: Vec<String>,
}

impl Accumulator {
    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    /// Every keyword captured so far, uncapped.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn has_content(&self) -> bool {
        !self.paragraphs.is_empty()
    }

    fn append(&mut self, content: ExtractedContent) {
        self.paragraphs.extend(content.paragraphs);
        self.images.extend(content.images);
    }

    /// Add the `\w+` tokens of `title`, skipping ones already present.
    fn capture_keywords(&mut self, title: &str) {
        for token in title_tokens(title) {
            if !self.keywords.iter().any(|k| k == token) {
                self.keywords.push(token.to_string());
            }
        }
    }

    /// Summarize and build the final result, capping related keywords.
    pub fn finish(self, query_type: &QueryType) -> ScrapeResult {
        let content = summarizer::summarize(&self.paragraphs, query_type);
        let mut related_keywords = self.keywords;
        related_keywords.truncate(MAX_RELATED_KEYWORDS);
        ScrapeResult {
            content,
            images: self.images,
            related_keywords,
        }
    }
}

fn title_tokens(title: &str) -> impl Iterator<Item = &str> {
    static WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\w+").expect("valid regex"));
    WORD_RE.find_iter(title).map(|m| m.as_str())
}

// ---------------------------------------------------------------------------
// Per-source verdicts
// ---------------------------------------------------------------------------

/// How one probe turned out, from the pipeline's point of view.
///
/// None of these are errors: each is recovered locally by moving on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// Non-success status or transport failure.
    Unavailable { status: Option<u16> },
    /// The container selector matched nothing.
    ContainerNotFound,
    /// The container exists but held no usable paragraph.
    ContainerEmpty,
    /// The container yielded at least one paragraph.
    Yielded { paragraphs: usize, images: usize },
}

impl ProbeVerdict {
    pub fn classify(outcome: &FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Unavailable { status } => Self::Unavailable { status: *status },
            FetchOutcome::Extracted(c) if !c.container_found => Self::ContainerNotFound,
            FetchOutcome::Extracted(c) if c.paragraphs.is_empty() => Self::ContainerEmpty,
            FetchOutcome::Extracted(c) => Self::Yielded {
                paragraphs: c.paragraphs.len(),
                images: c.images.len(),
            },
        }
    }

    /// Short human-readable label.
    pub fn describe(&self) -> String {
        match self {
            Self::Unavailable { status: Some(code) } => format!("unavailable (HTTP {code})"),
            Self::Unavailable { status: None } => "unavailable".into(),
            Self::ContainerNotFound => "no content container".into(),
            Self::ContainerEmpty => "container empty".into(),
            Self::Yielded { paragraphs, images } => {
                format!("{paragraphs} paragraph(s), {images} image(s)")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fallback state machine
// ---------------------------------------------------------------------------

/// Position in the fallback walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackState {
    /// About to probe the fallback at this index.
    Probing(usize),
    /// The accumulator became non-empty; stop.
    Found,
    /// Every fallback was visited without content.
    Exhausted,
}

impl FallbackState {
    /// Starting state for `source_count` fallbacks.
    pub fn start(source_count: usize) -> Self {
        if source_count == 0 {
            Self::Exhausted
        } else {
            Self::Probing(0)
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Probing(_))
    }

    /// Apply the outcome of probing the current fallback.
    ///
    /// A found container always contributes its paragraphs and images. If the
    /// accumulator is still empty afterwards, the page title's tokens are
    /// captured as related keywords. Terminal states ignore further outcomes.
    pub fn step(self, acc: &mut Accumulator, outcome: FetchOutcome, source_count: usize) -> Self {
        let Self::Probing(index) = self else {
            return self;
        };

        match outcome {
            FetchOutcome::Extracted(content) if content.container_found => {
                let title = content.page_title.clone();
                acc.append(content);
                if acc.has_content() {
                    return Self::Found;
                }
                if let Some(title) = title {
                    acc.capture_keywords(&title);
                }
            }
            _ => {}
        }

        if index + 1 < source_count {
            Self::Probing(index + 1)
        } else {
            Self::Exhausted
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting per-source status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a source is fetched.
    fn source_started(&self, name: &str);
    /// Called once the source's verdict is known.
    fn source_finished(&self, name: &str, verdict: &ProbeVerdict);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn source_started(&self, _name: &str) {}
    fn source_finished(&self, _name: &str, _verdict: &ProbeVerdict) {}
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Retrieve and summarize content for `query`.
///
/// Sources are probed one at a time; nothing is fetched concurrently.
#[instrument(skip_all, fields(query = %query, query_type = %query_type.as_str()))]
pub async fn run(
    resolver: &SourceResolver,
    query: &str,
    query_type: &QueryType,
    progress: &dyn ProgressReporter,
) -> ScrapeResult {
    let mut acc = Accumulator::default();

    // --- Prioritized source ---
    let prioritized = resolver.prioritized();
    progress.source_started(prioritized.name());
    let outcome = resolver.probe(prioritized, query).await;
    let verdict = ProbeVerdict::classify(&outcome);
    progress.source_finished(prioritized.name(), &verdict);
    debug!(source = prioritized.name(), ?verdict, "prioritized source probed");

    if let FetchOutcome::Extracted(content) = outcome {
        if content.paragraphs.is_empty() {
            // An empty prioritized container contributes nothing, not even
            // keywords.
            debug!(source = prioritized.name(), "prioritized source empty, falling back");
        } else {
            acc.append(content);
            info!(
                source = prioritized.name(),
                paragraphs = acc.paragraphs().len(),
                "prioritized source answered"
            );
            return acc.finish(query_type);
        }
    }

    // --- Fallback sources ---
    let fallbacks = resolver.fallbacks();
    let mut state = FallbackState::start(fallbacks.len());
    while let FallbackState::Probing(index) = state {
        let rules = &fallbacks[index];
        progress.source_started(rules.name());
        let outcome = resolver.probe(rules, query).await;
        let verdict = ProbeVerdict::classify(&outcome);
        progress.source_finished(rules.name(), &verdict);
        debug!(source = rules.name(), ?verdict, "fallback source probed");

        state = state.step(&mut acc, outcome, fallbacks.len());
    }

    info!(
        ?state,
        paragraphs = acc.paragraphs().len(),
        images = acc.images().len(),
        keywords = acc.keywords().len(),
        "fallback walk finished"
    );

    acc.finish(query_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nobestudy_shared::{CONTENT_NOT_FOUND, Source, SourcesConfig};
    use reqwest::Client;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extracted(paragraphs: &[&str], images: &[&str], title: Option<&str>) -> FetchOutcome {
        FetchOutcome::Extracted(ExtractedContent {
            paragraphs: paragraphs.iter().map(|s| s.to_string()).collect(),
            images: images.iter().map(|s| s.to_string()).collect(),
            container_found: true,
            page_title: title.map(str::to_string),
        })
    }

    fn no_container(title: &str) -> FetchOutcome {
        FetchOutcome::Extracted(ExtractedContent {
            paragraphs: vec![],
            images: vec![],
            container_found: false,
            page_title: Some(title.into()),
        })
    }

    // --- state machine ---

    #[test]
    fn start_with_no_fallbacks_is_exhausted() {
        assert_eq!(FallbackState::start(0), FallbackState::Exhausted);
        assert_eq!(FallbackState::start(4), FallbackState::Probing(0));
    }

    #[test]
    fn unavailable_advances_without_touching_state() {
        let mut acc = Accumulator::default();
        let next = FallbackState::Probing(0).step(
            &mut acc,
            FetchOutcome::Unavailable { status: Some(503) },
            3,
        );
        assert_eq!(next, FallbackState::Probing(1));
        assert_eq!(acc, Accumulator::default());
    }

    #[test]
    fn missing_container_never_captures_keywords() {
        let mut acc = Accumulator::default();
        let next = FallbackState::Probing(1).step(&mut acc, no_container("Some Title"), 3);
        assert_eq!(next, FallbackState::Probing(2));
        assert!(acc.keywords().is_empty());
    }

    #[test]
    fn empty_container_keeps_images_and_captures_title() {
        let mut acc = Accumulator::default();
        let next = FallbackState::Probing(0).step(
            &mut acc,
            extracted(&[], &["https://img/a.png"], Some("Test Page")),
            2,
        );
        assert_eq!(next, FallbackState::Probing(1));
        assert_eq!(acc.images(), ["https://img/a.png"]);
        assert_eq!(acc.keywords(), ["Test", "Page"]);
    }

    #[test]
    fn first_paragraph_stops_the_walk() {
        let mut acc = Accumulator::default();
        let next = FallbackState::Probing(0).step(
            &mut acc,
            extracted(&["one", "two"], &[], Some("Ignored Title")),
            4,
        );
        assert_eq!(next, FallbackState::Found);
        assert_eq!(acc.paragraphs(), ["one", "two"]);
        assert!(acc.keywords().is_empty());
    }

    #[test]
    fn last_source_without_content_exhausts() {
        let mut acc = Accumulator::default();
        let next = FallbackState::Probing(2).step(&mut acc, extracted(&[], &[], None), 3);
        assert_eq!(next, FallbackState::Exhausted);
    }

    #[test]
    fn terminal_states_ignore_outcomes() {
        let mut acc = Accumulator::default();
        assert!(!FallbackState::Probing(0).is_terminal());
        for state in [FallbackState::Found, FallbackState::Exhausted] {
            assert!(state.is_terminal());
            assert_eq!(state.step(&mut acc, extracted(&["x"], &[], None), 3), state);
        }
        assert!(!acc.has_content());
    }

    #[test]
    fn keywords_dedupe_across_sources_and_cap_at_finish() {
        let mut acc = Accumulator::default();
        let mut state = FallbackState::start(3);
        for title in ["Black hole - Wiki", "Black hole physics"] {
            state = state.step(&mut acc, extracted(&[], &[], Some(title)), 3);
        }
        assert_eq!(state, FallbackState::Probing(2));
        assert_eq!(acc.keywords(), ["Black", "hole", "Wiki", "physics"]);

        let result = acc.finish(&QueryType::Description);
        assert_eq!(result.content, CONTENT_NOT_FOUND);
        assert_eq!(result.related_keywords, ["Black", "hole", "Wiki"]);
    }

    #[test]
    fn verdicts_classify_outcomes() {
        assert_eq!(
            ProbeVerdict::classify(&FetchOutcome::Unavailable { status: None }),
            ProbeVerdict::Unavailable { status: None }
        );
        assert_eq!(
            ProbeVerdict::classify(&no_container("t")),
            ProbeVerdict::ContainerNotFound
        );
        assert_eq!(
            ProbeVerdict::classify(&extracted(&[], &["i"], None)),
            ProbeVerdict::ContainerEmpty
        );
        assert_eq!(
            ProbeVerdict::classify(&extracted(&["a"], &["i"], None)),
            ProbeVerdict::Yielded {
                paragraphs: 1,
                images: 1
            }
        );
    }

    // --- end-to-end against mock sources ---

    fn fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {path}: {e}"))
    }

    fn mock_sources(server: &MockServer) -> SourcesConfig {
        let src = |name: &str, prefix: &str| {
            Source::new(
                name,
                format!("{}/{prefix}/{{query}}", server.uri()),
                "#mw-content-text",
            )
        };
        SourcesConfig {
            prioritized: src("primary", "primary"),
            fallbacks: vec![
                src("alt-1", "alt1"),
                src("alt-2", "alt2"),
                src("alt-3", "alt3"),
                src("alt-4", "alt4"),
            ],
        }
    }

    async fn page(server: &MockServer, at: &str, status: u16, body: String, hits: u64) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(hits)
            .mount(server)
            .await;
    }

    #[derive(Default)]
    struct RecordingProgress {
        seen: Mutex<Vec<(String, ProbeVerdict)>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn source_started(&self, _name: &str) {}
        fn source_finished(&self, name: &str, verdict: &ProbeVerdict) {
            self.seen.lock().unwrap().push((name.to_string(), *verdict));
        }
    }

    #[tokio::test]
    async fn prioritized_success_short_circuits() {
        let server = MockServer::start().await;
        page(&server, "/primary/Photosynthesis", 200, fixture("wiki_article.html"), 1).await;
        for alt in ["alt1", "alt2", "alt3", "alt4"] {
            page(&server, &format!("/{alt}/Photosynthesis"), 200, String::new(), 0).await;
        }

        let resolver = SourceResolver::new(Client::new(), &mock_sources(&server)).unwrap();
        let result = run(&resolver, "Photosynthesis", &QueryType::Description, &SilentProgress).await;

        assert!(result.content.starts_with("Photosynthesis is a process"));
        assert!(result.content.ends_with("release oxygen."));
        assert_eq!(result.content.matches(". ").count(), 2);
        assert_eq!(
            result.images,
            ["https://upload.wikimedia.org/wikipedia/commons/leaf.png"]
        );
        assert!(result.related_keywords.is_empty());
    }

    #[tokio::test]
    async fn fallback_walk_accumulates_then_breaks() {
        let server = MockServer::start().await;
        let alt3 = r#"<html><head><title>Alt</title></head><body>
            <div id="mw-content-text"><p>First found.</p><p>Second found.</p></div>
            </body></html>"#;

        page(&server, "/primary/test_page", 404, String::new(), 1).await;
        page(&server, "/alt1/test_page", 200, "<html><body><p>stray</p></body></html>".into(), 1).await;
        page(&server, "/alt2/test_page", 200, fixture("empty_article.html"), 1).await;
        page(&server, "/alt3/test_page", 200, alt3.into(), 1).await;
        page(&server, "/alt4/test_page", 200, String::new(), 0).await;

        let resolver = SourceResolver::new(Client::new(), &mock_sources(&server)).unwrap();
        let progress = RecordingProgress::default();
        let result = run(&resolver, "test page", &QueryType::Description, &progress).await;

        assert_eq!(result.content, "First found. Second found.");
        assert_eq!(result.related_keywords, ["Test", "Page"]);
        assert_eq!(result.images, ["https://upload.example.org/placeholder.png"]);

        let seen = progress.seen.into_inner().unwrap();
        let verdicts: Vec<_> = seen.iter().map(|(_, v)| *v).collect();
        assert_eq!(
            verdicts,
            [
                ProbeVerdict::Unavailable { status: Some(404) },
                ProbeVerdict::ContainerNotFound,
                ProbeVerdict::ContainerEmpty,
                ProbeVerdict::Yielded {
                    paragraphs: 2,
                    images: 0
                },
            ]
        );
    }

    #[tokio::test]
    async fn prioritized_empty_container_falls_through_without_keywords() {
        let server = MockServer::start().await;
        page(&server, "/primary/q", 200, fixture("empty_article.html"), 1).await;
        for alt in ["alt1", "alt2", "alt3", "alt4"] {
            page(&server, &format!("/{alt}/q"), 404, String::new(), 1).await;
        }

        let resolver = SourceResolver::new(Client::new(), &mock_sources(&server)).unwrap();
        let result = run(&resolver, "q", &QueryType::Essay, &SilentProgress).await;

        assert_eq!(result.content, CONTENT_NOT_FOUND);
        assert!(result.related_keywords.is_empty());
        assert!(result.images.is_empty());
    }

    #[tokio::test]
    async fn invalid_type_still_retrieves() {
        let server = MockServer::start().await;
        page(&server, "/primary/Photosynthesis", 200, fixture("wiki_article.html"), 1).await;

        let resolver = SourceResolver::new(Client::new(), &mock_sources(&server)).unwrap();
        let result = run(
            &resolver,
            "Photosynthesis",
            &QueryType::parse("limerick"),
            &SilentProgress,
        )
        .await;

        assert_eq!(result.content, nobestudy_shared::INVALID_QUERY_TYPE);
        assert_eq!(result.images.len(), 1);
    }
}
