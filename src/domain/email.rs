use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::founder::{EmailSource, Founder};

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

/// Placeholder and tracking domains that never belong to a real contact.
pub const BLACK_LIST_EMAIL_PATTERNS: [&str; 5] = ["example.", "test.", "demo.", "sentry.", "wix."];

const ASSET_EXTENSIONS: [&str; 7] = [".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".avif"];

/// Every email-shaped string in the raw markup, lowercased and filtered.
pub fn harvest_emails(markup: &str) -> BTreeSet<String> {
    EMAIL_REGEX
        .find_iter(markup)
        .map(|m| m.as_str().to_lowercase())
        .filter(|email| {
            !BLACK_LIST_EMAIL_PATTERNS
                .iter()
                .any(|pattern| email.contains(pattern))
        })
        .filter(|email| !ASSET_EXTENSIONS.iter().any(|ext| email.ends_with(ext)))
        .collect()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AttributionSummary {
    pub harvested: usize,
    pub synthesized: usize,
}

/// Gives every founder without an email one from `emails` whose local part
/// contains a token of their name, or a `first@domain` guess otherwise.
pub fn attribute_emails(
    founders: &mut [Founder],
    emails: &BTreeSet<String>,
    company_domain: &str,
) -> AttributionSummary {
    let mut summary = AttributionSummary::default();

    for founder in founders.iter_mut().filter(|f| !f.has_email()) {
        let name_tokens: Vec<String> = founder
            .name()
            .split_whitespace()
            .map(|token| token.to_lowercase())
            .collect();

        let matched = emails.iter().find(|email| {
            let local_part = email.split('@').next().unwrap_or_default();
            name_tokens.iter().any(|token| local_part.contains(token.as_str()))
        });

        match matched {
            Some(email) => {
                founder.set_email(email, EmailSource::Harvested);
                summary.harvested += 1;
            }
            None => {
                if let Some(email) = synthesize_email(&name_tokens, company_domain) {
                    log::debug!("Guessing {} for {}", email, founder.name());
                    founder.set_email(&email, EmailSource::Synthesized);
                    summary.synthesized += 1;
                }
            }
        }
    }

    summary
}

fn synthesize_email(name_tokens: &[String], company_domain: &str) -> Option<String> {
    let first_name = name_tokens.first()?;
    match company_domain.is_empty() {
        true => None,
        false => Some(format!("{}@{}", first_name, company_domain)),
    }
}
