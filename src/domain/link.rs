use url::Url;

pub const SOCIAL_DOMAINS: [&str; 8] = [
    "linkedin.com",
    "twitter.com",
    "x.com",
    "facebook.com",
    "youtube.com",
    "instagram.com",
    "medium.com",
    "github.com",
];

pub const ALLOWED_TLDS: [&str; 5] = [".com", ".io", ".co", ".ai", ".xyz"];

// Second-level labels that sit under a country code, as in `acme.co.uk`.
const SECOND_LEVEL_SUFFIXES: [&str; 7] = ["co", "com", "org", "net", "ac", "gov", "edu"];

/// Absolute `http(s)` url, or `None`.
pub fn parse_web_url(href: &str) -> Option<Url> {
    match Url::parse(href) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
            Some(url)
        }
        _ => None,
    }
}

/// Lowercased host with any leading `www.` removed.
pub fn bare_host(url: &Url) -> Option<String> {
    url.host_str().map(|host| {
        let host = host.to_lowercase();
        match host.strip_prefix("www.") {
            Some(h) => h.to_string(),
            None => host,
        }
    })
}

pub fn domain_of(href: &str) -> Option<String> {
    parse_web_url(href).and_then(|url| bare_host(&url))
}

pub fn same_site(a: &Url, b: &Url) -> bool {
    match (bare_host(a), bare_host(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Social profiles, mail links and in-page anchors are never company sites.
pub fn is_excluded_link(href: &str) -> bool {
    let lower = href.to_lowercase();
    if lower.starts_with("mailto:") || lower.starts_with("tel:") || lower.contains('#') {
        return true;
    }

    match domain_of(&lower) {
        Some(host) => SOCIAL_DOMAINS.iter().any(|d| host_matches(&host, d)),
        None => false,
    }
}

pub fn has_allowed_tld(url: &Url) -> bool {
    match bare_host(url) {
        Some(host) => ALLOWED_TLDS.iter().any(|tld| host.ends_with(tld)),
        None => false,
    }
}

/// Label of the registrable domain: `https://www.app.acme.co.uk` gives `acme`.
pub fn registrable_label(url: &Url) -> Option<String> {
    let host = bare_host(url)?;
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();

    let label = match labels.as_slice() {
        [] => return None,
        [only] => *only,
        [.., second_level, sld, tld]
            if tld.len() == 2 && SECOND_LEVEL_SUFFIXES.contains(sld) =>
        {
            *second_level
        }
        [.., label, _tld] => *label,
    };

    Some(label.to_string())
}

/// Uppercases the first letter of every alphabetic run: `my-co` becomes `My-Co`.
pub fn title_case(word: &str) -> String {
    let mut result = String::with_capacity(word.len());
    let mut at_word_start = true;

    for c in word.chars() {
        match c.is_alphabetic() {
            true if at_word_start => result.extend(c.to_uppercase()),
            true => result.extend(c.to_lowercase()),
            false => result.push(c),
        }
        at_word_start = !c.is_alphabetic();
    }

    result
}

pub fn infer_company_name(url: &Url) -> String {
    registrable_label(url)
        .map(|label| title_case(&label))
        .unwrap_or_default()
}
