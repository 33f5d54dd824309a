//! Source list ownership and the single fetch-and-extract attempt per source.

use nobestudy_shared::{NobestudyError, Result, Source, SourcesConfig};
use reqwest::Client;
use scraper::Html;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::extractor::{self, ExtractedContent, SourceRules};

/// Result of probing one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Non-success status, or the transport gave up. `status` is `None` when
    /// no response arrived at all.
    Unavailable { status: Option<u16> },
    /// The page was fetched and handed to the extractor.
    Extracted(ExtractedContent),
}

/// Holds the ordered source list: one prioritized source, then fallbacks.
pub struct SourceResolver {
    client: Client,
    prioritized: SourceRules,
    fallbacks: Vec<SourceRules>,
}

impl SourceResolver {
    /// Compile the configured sources. Fails on the first invalid selector.
    pub fn new(client: Client, sources: &SourcesConfig) -> Result<Self> {
        let prioritized = SourceRules::compile(sources.prioritized.clone())?;
        let fallbacks = sources
            .fallbacks
            .iter()
            .cloned()
            .map(SourceRules::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            client,
            prioritized,
            fallbacks,
        })
    }

    pub fn prioritized(&self) -> &SourceRules {
        &self.prioritized
    }

    /// Fallback sources in declared visiting order.
    pub fn fallbacks(&self) -> &[SourceRules] {
        &self.fallbacks
    }

    /// Fetch `source` for `query` once and extract its content.
    ///
    /// There is no retry here; transport timeouts belong to the client.
    #[instrument(skip_all, fields(source = %rules.name()))]
    pub async fn probe(&self, rules: &SourceRules, query: &str) -> FetchOutcome {
        let url = match source_url(rules.source(), query) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "could not build source URL");
                return FetchOutcome::Unavailable { status: None };
            }
        };

        debug!(%url, "probing source");

        let response = match self.client.get(url.as_str()).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(%url, error = %e, "request failed");
                return FetchOutcome::Unavailable { status: None };
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!(%url, %status, "source unavailable");
            return FetchOutcome::Unavailable {
                status: Some(status.as_u16()),
            };
        }

        // Relative image references resolve against where we actually landed.
        let final_url = response.url().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(%url, error = %e, "body read failed");
                return FetchOutcome::Unavailable {
                    status: Some(status.as_u16()),
                };
            }
        };

        let doc = Html::parse_document(&body);
        let content = extractor::extract(&doc, rules, Some(&final_url));

        debug!(
            container_found = content.container_found,
            paragraphs = content.paragraphs.len(),
            images = content.images.len(),
            "source extracted"
        );

        FetchOutcome::Extracted(content)
    }
}

/// Split the query on whitespace and re-join it with `separator`.
pub fn keyword_join(query: &str, separator: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(separator)
}

/// Substitute the keyword-joined query into the source's URL template.
pub fn source_url(source: &Source, query: &str) -> Result<Url> {
    let joined = keyword_join(query, &source.word_separator);
    let raw = source.url_template.replace("{query}", &joined);
    Url::parse(&raw).map_err(|e| {
        NobestudyError::parse(format!("source '{}': invalid URL '{raw}': {e}", source.name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sources_for(server: &MockServer) -> SourcesConfig {
        SourcesConfig {
            prioritized: Source::new(
                "primary",
                format!("{}/wiki/{{query}}", server.uri()),
                "#mw-content-text",
            ),
            fallbacks: vec![
                Source::new(
                    "alt",
                    format!("{}/topic/{{query}}", server.uri()),
                    ".topic-content",
                )
                .with_word_separator("-"),
            ],
        }
    }

    #[test]
    fn keyword_join_collapses_whitespace() {
        assert_eq!(keyword_join("  black   hole ", "_"), "black_hole");
        assert_eq!(keyword_join("rust", "-"), "rust");
        assert_eq!(keyword_join("", "_"), "");
    }

    #[test]
    fn source_url_substitutes_query() {
        let source = Source::new(
            "wiki",
            "https://en.wikipedia.org/wiki/{query}",
            "#mw-content-text",
        );
        let url = source_url(&source, "black hole").unwrap();
        assert_eq!(url.as_str(), "https://en.wikipedia.org/wiki/black_hole");

        let slug = source.clone().with_word_separator("-");
        let url = source_url(&slug, "black hole").unwrap();
        assert_eq!(url.as_str(), "https://en.wikipedia.org/wiki/black-hole");
    }

    #[test]
    fn source_url_rejects_broken_template() {
        let source = Source::new("broken", "not a url {query}", "#x");
        assert!(source_url(&source, "q").is_err());
    }

    #[test]
    fn resolver_keeps_declared_order() {
        let mut sources = SourcesConfig::default();
        sources.prioritized.name = "first".into();
        let resolver = SourceResolver::new(Client::new(), &sources).unwrap();
        assert_eq!(resolver.prioritized().name(), "first");
        let names: Vec<_> = resolver.fallbacks().iter().map(|r| r.name()).collect();
        assert_eq!(names[0], "simple-wikipedia");
        assert_eq!(names.len(), 4);
    }

    #[tokio::test]
    async fn probe_non_success_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/missing_page"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let resolver = SourceResolver::new(Client::new(), &sources_for(&server)).unwrap();
        let outcome = resolver
            .probe(resolver.prioritized(), "missing page")
            .await;
        assert_eq!(outcome, FetchOutcome::Unavailable { status: Some(404) });
    }

    #[tokio::test]
    async fn probe_success_extracts_page() {
        let server = MockServer::start().await;
        let page = r#"<html><head><title>Rust</title></head><body>
            <div class="topic-content">
                <p>Rust is a language.</p>
                <img src="/media/crab.png">
            </div></body></html>"#;
        Mock::given(method("GET"))
            .and(path("/topic/rust-lang"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = SourceResolver::new(Client::new(), &sources_for(&server)).unwrap();
        let outcome = resolver.probe(&resolver.fallbacks()[0], "rust lang").await;

        let FetchOutcome::Extracted(content) = outcome else {
            panic!("expected extracted content, got {outcome:?}");
        };
        assert!(content.container_found);
        assert_eq!(content.paragraphs, ["Rust is a language."]);
        assert_eq!(content.images, [format!("{}/media/crab.png", server.uri())]);
    }

    #[tokio::test]
    async fn probe_unreachable_host_is_unavailable() {
        let sources = SourcesConfig {
            prioritized: Source::new("dead", "http://127.0.0.1:1/{query}", "#c"),
            fallbacks: vec![],
        };
        let resolver = SourceResolver::new(Client::new(), &sources).unwrap();
        let outcome = resolver.probe(resolver.prioritized(), "x").await;
        assert_eq!(outcome, FetchOutcome::Unavailable { status: None });
    }
}
