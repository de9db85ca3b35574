use std::collections::BTreeSet;

use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use crate::domain::{
    company::CompanyCandidate,
    link::{has_allowed_tld, infer_company_name, is_excluded_link, parse_web_url, same_site},
    webpage::{resolve_href, RenderedPage},
};

const PORTFOLIO_LINK_SELECTORS: [&str; 10] = [
    "a[href*='/portfolio/']",
    "a[href*='/companies/']",
    "div.portfolio-company a",
    "div[class*='portfolio'] a",
    "div[class*='company'] a",
    "article a",
    "div.grid a",
    "div[class*='card'] a",
    "li[class*='company'] a",
    "div[class*='item'] a",
];

static PORTFOLIO_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    PORTFOLIO_LINK_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});

const CONTAINER_KEYWORDS: [&str; 4] = ["portfolio", "company", "card", "item"];
const TEAM_PAGE_KEYWORDS: [&str; 5] = ["about", "team", "founders", "leadership", "people"];
const MIN_LINK_TEXT_LEN: usize = 4;

/// External link worth visiting from a listing page, normalized.
fn external_link(listing: &Url, href: &str) -> Option<String> {
    let url = parse_web_url(href)?;
    if same_site(listing, &url) || is_excluded_link(url.as_str()) {
        return None;
    }
    Some(url.to_string())
}

fn selector_pass(listing: &Url, html: &str, found: &mut BTreeSet<String>) {
    let document = Html::parse_document(html);

    for selector in PORTFOLIO_SELECTORS.iter() {
        for a_tag in document.select(selector) {
            let Some(raw_href) = a_tag.value().attr("href") else {
                continue;
            };
            let href = resolve_href(Some(listing), raw_href.trim());
            if let Some(link) = external_link(listing, &href) {
                found.insert(link);
            }
        }
    }
}

fn heuristic_pass(listing: &Url, page: &RenderedPage, found: &mut BTreeSet<String>) {
    for anchor in page.anchors.iter() {
        if anchor.text.chars().count() < MIN_LINK_TEXT_LEN {
            continue;
        }
        let parent_class = anchor.parent_class.to_lowercase();
        if !CONTAINER_KEYWORDS.iter().any(|kw| parent_class.contains(kw)) {
            continue;
        }
        let Some(url) = parse_web_url(&anchor.href) else {
            continue;
        };
        if !has_allowed_tld(&url) {
            continue;
        }
        if let Some(link) = external_link(listing, url.as_str()) {
            found.insert(link);
        }
    }
}

/// Company sites linked from a portfolio listing page, each with a name
/// inferred from its domain. Best effort: order and count need not match
/// what the listing displays.
pub fn discover_company_links(page: &RenderedPage) -> Vec<CompanyCandidate> {
    let Some(listing) = parse_web_url(&page.url) else {
        log::error!("Listing url is not an absolute web url: {}", page.url);
        return vec![];
    };

    let mut found = BTreeSet::new();
    selector_pass(&listing, &page.html, &mut found);
    let from_selectors = found.len();
    heuristic_pass(&listing, page, &mut found);

    log::info!(
        "Found {} company links on {} ({} from selectors, {} from anchors)",
        found.len(),
        page.url,
        from_selectors,
        found.len() - from_selectors
    );

    found
        .into_iter()
        .filter_map(|link| {
            let url = parse_web_url(&link)?;
            Some(CompanyCandidate {
                inferred_name: infer_company_name(&url),
                url: link,
            })
        })
        .collect()
}

/// Same-site "about"/"team" pages linked from a company homepage.
pub fn find_team_page_links(page: &RenderedPage, limit: usize) -> Vec<String> {
    let Some(home) = parse_web_url(&page.url) else {
        return vec![];
    };

    page.anchors
        .iter()
        .filter(|anchor| {
            let href = anchor.href.to_lowercase();
            let text = anchor.text.to_lowercase();
            TEAM_PAGE_KEYWORDS
                .iter()
                .any(|kw| href.contains(kw) || text.contains(kw))
        })
        .filter_map(|anchor| {
            let mut url = parse_web_url(&anchor.href)?;
            url.set_fragment(None);
            match same_site(&home, &url) && url.path() != home.path() {
                true => Some(url.to_string()),
                false => None,
            }
        })
        .unique()
        .take(limit)
        .collect()
}
