use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

static A_TAG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static META_DESCRIPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).unwrap());

const INVISIBLE_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// An anchor element as seen on a rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    /// Absolute when it could be resolved against the page url.
    pub href: String,
    pub text: String,
    /// Class attribute of the anchor's parent element.
    pub parent_class: String,
}

/// Final DOM state of a page after navigation and lazy loading.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub url: String,
    pub html: String,
    pub title: String,
    pub anchors: Vec<Anchor>,
}

impl RenderedPage {
    pub fn from_html(url: &str, html: String) -> Self {
        let document = Html::parse_document(&html);
        let title = document
            .select(&TITLE_SELECTOR)
            .next()
            .map(|t| collapse_whitespace(&t.text().collect::<String>()))
            .unwrap_or_default();
        let anchors = extract_anchors(&document, url);

        RenderedPage {
            url: url.to_string(),
            html,
            title,
            anchors,
        }
    }

    pub fn description(&self) -> String {
        let document = Html::parse_document(&self.html);
        document
            .select(&META_DESCRIPTION_SELECTOR)
            .next()
            .and_then(|meta| meta.value().attr("content"))
            .map(|content| content.trim().to_string())
            .unwrap_or_default()
    }

    pub fn visible_text(&self) -> String {
        visible_text(&Html::parse_document(&self.html))
    }
}

fn extract_anchors(document: &Html, page_url: &str) -> Vec<Anchor> {
    let base = Url::parse(page_url).ok();

    document
        .select(&A_TAG_SELECTOR)
        .filter_map(|a_tag| {
            let raw_href = a_tag.value().attr("href")?.trim();
            if raw_href.is_empty() {
                return None;
            }
            let href = resolve_href(base.as_ref(), raw_href);
            let parent_class = a_tag
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|parent| parent.value().attr("class"))
                .unwrap_or_default()
                .to_string();

            Some(Anchor {
                href,
                text: collapse_whitespace(&a_tag.text().collect::<String>()),
                parent_class,
            })
        })
        .collect()
}

/// Resolves `href` against `base`, keeping the raw value when that is not possible.
pub fn resolve_href(base: Option<&Url>, href: &str) -> String {
    match base.and_then(|b| b.join(href).ok()) {
        Some(url) => url.to_string(),
        None => href.to_string(),
    }
}

/// Text nodes of the document outside of script-like elements, joined by single spaces.
pub fn visible_text(document: &Html) -> String {
    let pieces: Vec<&str> = document
        .root_element()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(|p| p.value().as_element().map(|e| e.name()))
                    .map(|name| INVISIBLE_TAGS.contains(&name))
                    .unwrap_or(false);
                match hidden {
                    true => None,
                    false => Some(&**text),
                }
            }
            _ => None,
        })
        .collect();

    collapse_whitespace(&pieces.join(" "))
}

pub fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
