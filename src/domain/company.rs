use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::founder::Founder;

/// A company url found on a listing page, not visited yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CompanyCandidate {
    pub url: String,
    pub inferred_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyRecord {
    pub company_name: String,
    pub company_url: String,
    pub description: String,
    pub founders: Vec<Founder>,
    pub all_emails: BTreeSet<String>,
    pub tech_stack: Vec<String>,
    pub scraped_at: DateTime<Utc>,
}

/// Degradations and progress of one run. Nothing counted here stops the run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub companies_attempted: usize,
    pub companies_recorded: usize,
    pub fetch_failures: usize,
    pub supplementary_page_failures: usize,
    pub strategy_failures: usize,
    pub ai_skipped: usize,
    pub validation_rejections: usize,
    pub snapshot_failures: usize,
    pub synthesized_emails: usize,
}

/// Companies recorded by one pipeline run, in visit order.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioResult {
    pub run_id: Uuid,
    pub listing_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    companies: Vec<CompanyRecord>,
    pub stats: RunStats,
}

impl PortfolioResult {
    pub fn new(listing_url: &str) -> Self {
        PortfolioResult {
            run_id: Uuid::new_v4(),
            listing_url: listing_url.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            companies: vec![],
            stats: RunStats::default(),
        }
    }

    pub fn push(&mut self, record: CompanyRecord) {
        self.companies.push(record);
    }

    pub fn companies(&self) -> &[CompanyRecord] {
        &self.companies
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    pub fn founder_count(&self) -> usize {
        self.companies.iter().map(|c| c.founders.len()).sum()
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}
