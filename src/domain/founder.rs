use std::collections::HashSet;

use serde::Serialize;

use crate::{domain::webpage::collapse_whitespace, error::ScrapeError};

pub const DEFAULT_ROLE: &str = "Team Member";

/// Checked in order; the first one found in a card's text becomes the role.
pub const ROLE_KEYWORDS: [&str; 10] = [
    "CEO",
    "CTO",
    "CFO",
    "Founder",
    "Co-founder",
    "Chief",
    "President",
    "Director",
    "VP",
    "Head",
];

const MIN_NAME_LEN: usize = 4;
const MAX_NAME_LEN: usize = 49;

/// Where a founder's email came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmailSource {
    #[default]
    None,
    /// Supplied together with the candidate itself.
    Page,
    /// Matched against an address found in the page markup.
    Harvested,
    /// Guessed from the first name and the company domain. Unverified.
    Synthesized,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Founder {
    name: String,
    pub role: String,
    pub email: String,
    pub email_source: EmailSource,
    pub linkedin: String,
    pub twitter: String,
}

impl Founder {
    /// Builds a founder, rejecting names that do not look like "First Last".
    pub fn new(name: &str, role: &str) -> Result<Self, ScrapeError> {
        let name = collapse_whitespace(name);
        let len = name.chars().count();

        if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
            return Err(ScrapeError::Validation(format!(
                "name {:?} has {} characters",
                name, len
            )));
        }
        if !name.contains(' ') {
            return Err(ScrapeError::Validation(format!(
                "name {:?} is a single word",
                name
            )));
        }

        let role = collapse_whitespace(role);
        Ok(Founder {
            name,
            role: match role.is_empty() {
                true => DEFAULT_ROLE.to_string(),
                false => role,
            },
            email: String::new(),
            email_source: EmailSource::None,
            linkedin: String::new(),
            twitter: String::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity used for deduplication.
    pub fn key(&self) -> String {
        name_key(&self.name)
    }

    pub fn has_email(&self) -> bool {
        !self.email.is_empty()
    }

    pub fn set_email(&mut self, email: &str, source: EmailSource) {
        self.email = email.trim().to_lowercase();
        self.email_source = match self.email.is_empty() {
            true => EmailSource::None,
            false => source,
        };
    }
}

pub fn name_key(name: &str) -> String {
    collapse_whitespace(name).to_lowercase()
}

/// First role keyword contained in `text`.
pub fn find_role_keyword(text: &str) -> Option<&'static str> {
    ROLE_KEYWORDS.iter().copied().find(|kw| text.contains(kw))
}

/// Ordered founder list without duplicate names. The first record seen for a
/// name is kept as is.
#[derive(Debug, Default, Clone)]
pub struct FounderRoster {
    founders: Vec<Founder>,
    seen: HashSet<String>,
}

impl FounderRoster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(&name_key(name))
    }

    /// Returns `false` when the name was already known.
    pub fn insert(&mut self, founder: Founder) -> bool {
        match self.seen.insert(founder.key()) {
            true => {
                self.founders.push(founder);
                true
            }
            false => false,
        }
    }

    /// Adds every founder whose name is not known yet, returning how many were added.
    pub fn merge(&mut self, founders: impl IntoIterator<Item = Founder>) -> usize {
        founders
            .into_iter()
            .map(|f| self.insert(f))
            .filter(|added| *added)
            .count()
    }

    pub fn len(&self) -> usize {
        self.founders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.founders.is_empty()
    }

    pub fn as_slice(&self) -> &[Founder] {
        &self.founders
    }

    pub fn into_vec(self) -> Vec<Founder> {
        self.founders
    }
}

/// Merges founder lists from a homepage and its supplementary pages.
pub fn merge_founder_lists(base: Vec<Founder>, supplementary: Vec<Vec<Founder>>) -> Vec<Founder> {
    let mut roster = FounderRoster::new();
    roster.merge(base);
    for founders in supplementary {
        roster.merge(founders);
    }
    roster.into_vec()
}

#[cfg(test)]
mod tests {
    use super::{find_role_keyword, merge_founder_lists, Founder, FounderRoster, DEFAULT_ROLE};

    #[test]
    fn founder_names_must_have_two_words_and_sane_length() {
        assert!(Founder::new("Jane Doe", "CEO").is_ok());
        assert!(Founder::new("A B", "CEO").is_err());
        assert!(Founder::new("Madonna", "CEO").is_err());
        assert!(Founder::new(&"Very Long Name ".repeat(4), "CEO").is_err());
        assert!(Founder::new("Al B", "CEO").is_ok());
    }

    #[test]
    fn names_are_whitespace_collapsed_before_validation() {
        let founder = Founder::new("  Jane \n   Doe ", "").unwrap();

        assert_eq!(founder.name(), "Jane Doe");
        assert_eq!(founder.role, DEFAULT_ROLE);
    }

    #[test]
    fn role_keywords_are_checked_in_order() {
        assert_eq!(find_role_keyword("CTO at Acme"), Some("CTO"));
        assert_eq!(find_role_keyword("Founder & CEO"), Some("CEO"));
        assert_eq!(find_role_keyword("Engineer"), None);
    }

    #[test]
    fn merge_keeps_first_seen_record_for_same_name_in_other_casing() {
        let mut first = Founder::new("Jane Doe", "CEO").unwrap();
        first.linkedin = "https://linkedin.com/in/janedoe".to_string();
        let second = Founder::new("JANE DOE", "Team Member").unwrap();
        let other = Founder::new("John Roe", "CTO").unwrap();

        let merged = merge_founder_lists(vec![first.clone()], vec![vec![second, other]]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], first);
        assert_eq!(merged[1].name(), "John Roe");
    }

    #[test]
    fn roster_reports_duplicates() {
        let mut roster = FounderRoster::new();

        assert!(roster.insert(Founder::new("Jane Doe", "CEO").unwrap()));
        assert!(!roster.insert(Founder::new("jane doe", "CTO").unwrap()));
        assert!(roster.contains("JANE  DOE"));
        assert_eq!(roster.len(), 1);
    }
}
