//! Paragraph and image extraction from a parsed source page.

use nobestudy_shared::{NobestudyError, Result, Source};
use scraper::{Html, Selector};
use url::Url;

/// Paragraph elements considered per page.
pub const MAX_PARAGRAPHS: usize = 25;

/// Image elements considered per page.
pub const MAX_IMAGES: usize = 5;

/// A [`Source`] with its selectors compiled.
#[derive(Debug)]
pub struct SourceRules {
    source: Source,
    container: Selector,
    paragraphs: Selector,
    images: Selector,
}

impl SourceRules {
    /// Compile the selector rules of `source`.
    ///
    /// An invalid selector is a configuration problem and is reported here,
    /// never per request.
    pub fn compile(source: Source) -> Result<Self> {
        let container = compile_selector(&source, &source.container)?;
        let paragraphs = compile_selector(&source, &source.paragraphs)?;
        let images = compile_selector(&source, &source.images)?;
        Ok(Self {
            source,
            container,
            paragraphs,
            images,
        })
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.source.name
    }
}

fn compile_selector(source: &Source, rule: &str) -> Result<Selector> {
    Selector::parse(rule).map_err(|e| {
        NobestudyError::config(format!(
            "source '{}': invalid selector '{rule}': {e}",
            source.name
        ))
    })
}

/// What one page yielded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Trimmed, non-empty paragraph texts in document order.
    pub paragraphs: Vec<String>,
    /// Absolute image URLs in document order.
    pub images: Vec<String>,
    /// Whether the container selector matched anything.
    pub container_found: bool,
    /// Trimmed `<title>` text, if any.
    pub page_title: Option<String>,
}

/// Extract paragraphs and images from the source's content container.
///
/// At most [`MAX_PARAGRAPHS`] paragraph elements and [`MAX_IMAGES`] image
/// elements are looked at; blank paragraphs and images without a reference
/// are dropped after that cap, so a page can yield fewer than the cap.
pub fn extract(doc: &Html, rules: &SourceRules, page_url: Option<&Url>) -> ExtractedContent {
    let page_title = extract_title(doc);

    let Some(container) = doc.select(&rules.container).next() else {
        return ExtractedContent {
            page_title,
            ..ExtractedContent::default()
        };
    };

    let paragraphs = container
        .select(&rules.paragraphs)
        .take(MAX_PARAGRAPHS)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();

    let attr = rules.source.image_attr.as_str();
    let images = container
        .select(&rules.images)
        .take(MAX_IMAGES)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| normalize_image_ref(raw, page_url))
        .collect();

    ExtractedContent {
        paragraphs,
        images,
        container_found: true,
        page_title,
    }
}

/// Turn an image reference into an absolute URL.
///
/// Protocol-relative references get an `https:` prefix; references that are
/// already absolute are returned unchanged; anything else is resolved
/// against the page URL when one is known.
pub fn normalize_image_ref(raw: &str, page_url: Option<&Url>) -> String {
    if raw.starts_with("//") {
        return format!("https:{raw}");
    }
    if Url::parse(raw).is_ok() {
        return raw.to_string();
    }
    page_url
        .and_then(|base| base.join(raw).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn extract_title(doc: &Html) -> Option<String> {
    let title_sel = Selector::parse("title").ok()?;
    doc.select(&title_sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(container: &str) -> SourceRules {
        SourceRules::compile(Source::new(
            "test",
            "https://example.com/{query}",
            container,
        ))
        .unwrap()
    }

    fn load_fixture(name: &str) -> Html {
        let path = format!("../../../fixtures/html/{name}");
        let content = std::fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("missing fixture: {path}"));
        Html::parse_document(&content)
    }

    #[test]
    fn missing_container_yields_nothing() {
        let doc = Html::parse_document(
            "<html><head><title>Empty</title></head><body><p>outside</p></body></html>",
        );
        let out = extract(&doc, &rules("#content"), None);
        assert!(!out.container_found);
        assert!(out.paragraphs.is_empty());
        assert!(out.images.is_empty());
        assert_eq!(out.page_title.as_deref(), Some("Empty"));
    }

    #[test]
    fn container_by_class_and_id() {
        let html = r#"<div class="body"><p>class</p></div><div id="main"><p>id</p></div>"#;
        let doc = Html::parse_document(html);
        assert_eq!(extract(&doc, &rules(".body"), None).paragraphs, ["class"]);
        assert_eq!(extract(&doc, &rules("#main"), None).paragraphs, ["id"]);
    }

    #[test]
    fn blank_paragraphs_are_dropped_and_text_trimmed() {
        let html = r#"<div id="c"><p>  first  </p><p>   </p><p><b>second</b> part</p></div>"#;
        let doc = Html::parse_document(html);
        let out = extract(&doc, &rules("#c"), None);
        assert!(out.container_found);
        assert_eq!(out.paragraphs, ["first", "second part"]);
    }

    #[test]
    fn paragraph_cap_applies_before_filtering() {
        let mut html = String::from(r#"<div id="c">"#);
        html.push_str("<p> </p>");
        for i in 0..40 {
            html.push_str(&format!("<p>para {i}</p>"));
        }
        html.push_str("</div>");
        let doc = Html::parse_document(&html);
        let out = extract(&doc, &rules("#c"), None);
        // 25 elements considered, the first of which is blank
        assert_eq!(out.paragraphs.len(), MAX_PARAGRAPHS - 1);
        assert_eq!(out.paragraphs[0], "para 0");
        assert_eq!(out.paragraphs.last().unwrap(), "para 23");
    }

    #[test]
    fn image_cap_and_missing_references() {
        let html = r#"<div id="c">
            <img src="//upload.example.org/a.png">
            <img alt="no src">
            <img src="https://cdn.example.org/b.jpg">
            <img src="">
            <img src="http://plain.example.org/c.gif">
            <img src="//upload.example.org/never.png">
        </div>"#;
        let doc = Html::parse_document(html);
        let out = extract(&doc, &rules("#c"), None);
        assert_eq!(
            out.images,
            [
                "https://upload.example.org/a.png",
                "https://cdn.example.org/b.jpg",
                "http://plain.example.org/c.gif",
            ]
        );
    }

    #[test]
    fn container_found_but_empty() {
        let doc = Html::parse_document(
            r#"<title>Test Page</title><div id="c"><img src="//x.org/i.png"></div>"#,
        );
        let out = extract(&doc, &rules("#c"), None);
        assert!(out.container_found);
        assert!(out.paragraphs.is_empty());
        assert_eq!(out.images, ["https://x.org/i.png"]);
        assert_eq!(out.page_title.as_deref(), Some("Test Page"));
    }

    #[test]
    fn normalize_refs() {
        let base = Url::parse("http://wiki.example.org/wiki/Rust").unwrap();
        assert_eq!(
            normalize_image_ref("//img.example.org/a.png", Some(&base)),
            "https://img.example.org/a.png"
        );
        assert_eq!(
            normalize_image_ref("https://img.example.org/a.png", Some(&base)),
            "https://img.example.org/a.png"
        );
        assert_eq!(
            normalize_image_ref("/static/logo.png", Some(&base)),
            "http://wiki.example.org/static/logo.png"
        );
        assert_eq!(normalize_image_ref("logo.png", None), "logo.png");
    }

    #[test]
    fn invalid_selector_is_a_config_error() {
        let err = SourceRules::compile(Source::new("bad", "https://x/{query}", "div[["))
            .unwrap_err();
        assert!(err.to_string().contains("config error"));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn wiki_fixture_extracts_article() {
        let doc = load_fixture("wiki_article.html");
        let out = extract(&doc, &rules("#mw-content-text"), None);
        assert!(out.container_found);
        assert_eq!(out.paragraphs.len(), 3);
        assert!(out.paragraphs[0].starts_with("Photosynthesis is"));
        assert_eq!(
            out.images,
            ["https://upload.wikimedia.org/wikipedia/commons/leaf.png"]
        );
        assert_eq!(out.page_title.as_deref(), Some("Photosynthesis - Wikipedia"));
    }
}
