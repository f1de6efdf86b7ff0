//! Page-level extraction: text, headings, media, links, metadata.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use arrs_shared::{Heading, Image, PageMetadata, SEMANTIC_TAGS};

/// Elements whose text never counts as page content.
const NON_CONTENT_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static META_DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[name="description"]"#).expect("valid selector"));
static HEADINGS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").expect("valid selector"));
static IMAGES: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("valid selector"));
static LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static OPEN_GRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property^="og:"]"#).expect("valid selector"));
static TWITTER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[name^="twitter:"]"#).expect("valid selector"));
static CANONICAL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"link[rel~="canonical"][href]"#).expect("valid selector"));

pub(crate) fn title(doc: &Html) -> Option<String> {
    doc.select(&TITLE)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

pub(crate) fn meta_description(doc: &Html) -> Option<String> {
    doc.select(&META_DESCRIPTION)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// All h1-h6 elements in document order.
pub(crate) fn headings(doc: &Html) -> Vec<Heading> {
    doc.select(&HEADINGS)
        .filter_map(|el| {
            let level = el.value().name().strip_prefix('h')?.parse::<u8>().ok()?;
            Some(Heading {
                level,
                text: element_text(el),
            })
        })
        .collect()
}

pub(crate) fn images(doc: &Html, base: &Url) -> Vec<Image> {
    doc.select(&IMAGES)
        .map(|el| {
            let attr = |name: &str| el.value().attr(name).map(str::to_string);
            Image {
                src: resolve(base, el.value().attr("src").unwrap_or_default()),
                alt: attr("alt"),
                title: attr("title"),
                width: attr("width"),
                height: attr("height"),
            }
        })
        .collect()
}

pub(crate) fn links(doc: &Html, base: &Url) -> Vec<String> {
    doc.select(&LINKS)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(|url| url.to_string())
        .collect()
}

/// Visible text with whitespace collapsed to single spaces.
pub(crate) fn text_content(doc: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| NON_CONTENT_TAGS.contains(&e.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    normalize_whitespace(&parts.join(" "))
}

pub(crate) fn semantic_elements(doc: &Html) -> BTreeMap<String, usize> {
    SEMANTIC_TAGS
        .iter()
        .map(|tag| {
            let count = Selector::parse(tag)
                .map(|sel| doc.select(&sel).count())
                .unwrap_or(0);
            (tag.to_string(), count)
        })
        .collect()
}

pub(crate) fn page_metadata(doc: &Html) -> PageMetadata {
    let prefixed = |selector: &Selector, attr: &str, prefix: &str| -> BTreeMap<String, String> {
        doc.select(selector)
            .filter_map(|el| {
                let key = el.value().attr(attr)?.strip_prefix(prefix)?;
                let content = el.value().attr("content").unwrap_or_default();
                Some((key.to_string(), content.trim().to_string()))
            })
            .collect()
    };

    PageMetadata {
        open_graph: prefixed(&*OPEN_GRAPH, "property", "og:"),
        twitter: prefixed(&*TWITTER, "name", "twitter:"),
        canonical_url: doc
            .select(&CANONICAL)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty()),
    }
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<String>())
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn resolve(base: &Url, href: &str) -> String {
    base.join(href.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://shop.example.com/products/widget").unwrap()
    }

    #[test]
    fn headings_keep_document_order() {
        let doc = Html::parse_document(
            "<h2>Specs</h2><h1>Widget</h1><h3>Size</h3><h2>Reviews</h2>",
        );
        let levels: Vec<u8> = headings(&doc).iter().map(|h| h.level).collect();
        assert_eq!(levels, vec![2, 1, 3, 2]);
    }

    #[test]
    fn text_skips_scripts_and_styles() {
        let doc = Html::parse_document(
            "<html><head><style>body{}</style></head><body><p>Buy   the\nwidget</p>\
             <script>var tracking = 1;</script><noscript>enable js</noscript></body></html>",
        );
        assert_eq!(text_content(&doc), "Buy the widget");
    }

    #[test]
    fn images_resolve_against_base() {
        let doc = Html::parse_document(r#"<img src="/img/a.jpg" alt="Front view"><img src="b.png">"#);
        let imgs = images(&doc, &base());
        assert_eq!(imgs[0].src, "https://shop.example.com/img/a.jpg");
        assert!(imgs[0].has_alt());
        assert_eq!(imgs[1].src, "https://shop.example.com/products/b.png");
        assert!(!imgs[1].has_alt());
    }

    #[test]
    fn metadata_strips_prefixes() {
        let doc = Html::parse_document(
            r#"<head>
              <meta property="og:title" content="Widget">
              <meta property="og:type" content="product">
              <meta name="twitter:card" content="summary">
              <link rel="canonical" href="https://shop.example.com/widget">
            </head>"#,
        );
        let meta = page_metadata(&doc);
        assert_eq!(meta.open_graph.get("title").map(String::as_str), Some("Widget"));
        assert_eq!(meta.open_graph.len(), 2);
        assert_eq!(meta.twitter.get("card").map(String::as_str), Some("summary"));
        assert_eq!(meta.canonical_url.as_deref(), Some("https://shop.example.com/widget"));
    }

    #[test]
    fn semantic_counts_include_zeroes() {
        let doc = Html::parse_document("<main><article></article><article></article></main>");
        let counts = semantic_elements(&doc);
        assert_eq!(counts["article"], 2);
        assert_eq!(counts["main"], 1);
        assert_eq!(counts["aside"], 0);
        assert_eq!(counts.len(), SEMANTIC_TAGS.len());
    }
}
