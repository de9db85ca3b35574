use std::time::Duration;

use chrono::Utc;

use crate::{
    configuration::ScraperSettings,
    domain::{
        company::{CompanyCandidate, CompanyRecord, PortfolioResult, RunStats},
        email::{attribute_emails, harvest_emails},
        founder::{merge_founder_lists, Founder},
        link::{bare_host, infer_company_name, parse_web_url},
        tech_stack::detect_tech_stack,
        webpage::RenderedPage,
    },
    error::{ScrapeError, ScrapeResult},
    services::{
        discover_company_links, find_team_page_links, FounderExtractor, PageFetcher, SnapshotSink,
    },
};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub page_timeout: Duration,
    pub visit_delay: Duration,
    pub max_supplementary_pages: usize,
}

impl From<&ScraperSettings> for PipelineSettings {
    fn from(settings: &ScraperSettings) -> Self {
        // The fetch budget also covers the settle wait and scrolling.
        let scrolling = settings.scroll_pause() * u32::from(settings.scroll_rounds);
        PipelineSettings {
            page_timeout: settings.page_timeout() + settings.settle() + scrolling,
            visit_delay: settings.visit_delay(),
            max_supplementary_pages: settings.max_supplementary_pages,
        }
    }
}

/// Company name from a page title like "Acme - Rockets for everyone".
fn name_from_title(title: &str) -> Option<String> {
    let name = title.split(" - ").next()?.split(" | ").next()?.trim();
    match name.is_empty() {
        true => None,
        false => Some(name.to_string()),
    }
}

/// Discovers the companies of a portfolio and visits them one at a time.
pub struct PortfolioPipeline<'a> {
    fetcher: &'a dyn PageFetcher,
    sink: &'a dyn SnapshotSink,
    extractor: FounderExtractor,
    settings: PipelineSettings,
    stats: RunStats,
}

impl<'a> PortfolioPipeline<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        sink: &'a dyn SnapshotSink,
        extractor: FounderExtractor,
        settings: PipelineSettings,
    ) -> Self {
        PortfolioPipeline {
            fetcher,
            sink,
            extractor,
            settings,
            stats: RunStats::default(),
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    async fn fetch(&self, url: &str) -> ScrapeResult<RenderedPage> {
        match tokio::time::timeout(self.settings.page_timeout, self.fetcher.fetch_rendered(url))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ScrapeError::Timeout {
                url: url.to_string(),
                after: self.settings.page_timeout,
            }),
        }
    }

    /// Company candidates on a listing page. Empty when the page cannot be
    /// loaded or lists nothing.
    pub async fn discover_companies(&mut self, listing_url: &str) -> Vec<CompanyCandidate> {
        log::info!("Finding companies on: {}", listing_url);

        match self.fetch(listing_url).await {
            Ok(page) => discover_company_links(&page),
            Err(e) => {
                log::error!("Could not load listing page: {}", e);
                self.stats.fetch_failures += 1;
                vec![]
            }
        }
    }

    async fn extract_founders(&mut self, page: &RenderedPage) -> Vec<Founder> {
        let report = self.extractor.extract(page).await;

        self.stats.validation_rejections += report.rejected;
        self.stats.strategy_failures += report.failed_strategies;
        self.stats.ai_skipped += report.skipped_strategies;

        report.founders
    }

    /// Visits a company homepage and up to a few of its team pages. Returns
    /// `None` when the homepage cannot be loaded.
    pub async fn extract_company(&mut self, url: &str, name: Option<&str>) -> Option<CompanyRecord> {
        self.stats.companies_attempted += 1;

        let Some(company_url) = parse_web_url(url) else {
            log::error!("Skipping {}: not an absolute web url", url);
            self.stats.fetch_failures += 1;
            return None;
        };

        let homepage = match self.fetch(url).await {
            Ok(page) => page,
            Err(e) => {
                log::error!("Skipping {}: {}", url, e);
                self.stats.fetch_failures += 1;
                return None;
            }
        };

        let company_name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(String::from)
            .or_else(|| name_from_title(&homepage.title))
            .unwrap_or_else(|| infer_company_name(&company_url));
        log::info!("Scraping: {} ({})", company_name, url);

        let homepage_founders = self.extract_founders(&homepage).await;
        let mut team_founders = vec![];
        let mut all_emails = harvest_emails(&homepage.html);

        for team_url in find_team_page_links(&homepage, self.settings.max_supplementary_pages) {
            log::info!("Checking {}", team_url);
            match self.fetch(&team_url).await {
                Ok(team_page) => {
                    team_founders.push(self.extract_founders(&team_page).await);
                    all_emails.extend(harvest_emails(&team_page.html));
                }
                Err(e) => {
                    log::warn!("Skipping team page {}: {}", team_url, e);
                    self.stats.supplementary_page_failures += 1;
                }
            }
        }

        let mut founders = merge_founder_lists(homepage_founders, team_founders);
        let domain = bare_host(&company_url).unwrap_or_default();
        let summary = attribute_emails(&mut founders, &all_emails, &domain);
        self.stats.synthesized_emails += summary.synthesized;

        log::info!(
            "Found {} founders and {} emails for {}",
            founders.len(),
            all_emails.len(),
            company_name
        );

        Some(CompanyRecord {
            company_name,
            company_url: url.to_string(),
            description: homepage.description(),
            founders,
            all_emails,
            tech_stack: detect_tech_stack(&homepage.html),
            scraped_at: Utc::now(),
        })
    }

    async fn snapshot(&mut self, result: &mut PortfolioResult) {
        result.stats = self.stats.clone();
        if let Err(e) = self.sink.persist_snapshot(result).await {
            log::error!("Failed to persist snapshot: {:?}", e);
            self.stats.snapshot_failures += 1;
            result.stats.snapshot_failures = self.stats.snapshot_failures;
        }
    }

    /// Discovers every company on the listing page and records the ones that
    /// could be visited. A listing without companies yields an empty result.
    pub async fn run_portfolio(&mut self, listing_url: &str) -> PortfolioResult {
        self.stats = RunStats::default();
        let mut result = PortfolioResult::new(listing_url);

        let candidates = self.discover_companies(listing_url).await;
        if candidates.is_empty() {
            log::warn!("No companies found on portfolio page {}", listing_url);
            result.stats = self.stats.clone();
            result.finish();
            return result;
        }

        let total = candidates.len();
        for (i, candidate) in candidates.iter().enumerate() {
            log::info!("[{}/{}] Processing {}", i + 1, total, candidate.inferred_name);

            if let Some(record) = self
                .extract_company(&candidate.url, Some(&candidate.inferred_name))
                .await
            {
                self.stats.companies_recorded += 1;
                result.push(record);
                self.snapshot(&mut result).await;
            }

            if i + 1 < total && !self.settings.visit_delay.is_zero() {
                tokio::time::sleep(self.settings.visit_delay).await;
            }
        }

        result.stats = self.stats.clone();
        result.finish();
        self.snapshot(&mut result).await;

        log::info!(
            "Portfolio {} done: {} companies, {} founders, stats {:?}",
            listing_url,
            result.len(),
            result.founder_count(),
            result.stats
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::Mutex,
        time::Duration,
    };

    use async_trait::async_trait;

    use super::{name_from_title, PipelineSettings, PortfolioPipeline};
    use crate::{
        configuration::ExtractionSettings,
        domain::{company::PortfolioResult, founder::EmailSource, webpage::RenderedPage},
        error::{ScrapeError, ScrapeResult},
        services::{FounderExtractor, PageFetcher, SnapshotSink},
    };

    #[derive(Default)]
    struct StaticSite {
        pages: HashMap<String, String>,
        visits: Mutex<Vec<String>>,
    }

    impl StaticSite {
        fn page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }
    }

    #[async_trait]
    impl PageFetcher for StaticSite {
        async fn fetch_rendered(&self, url: &str) -> ScrapeResult<RenderedPage> {
            self.visits.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(html) => Ok(RenderedPage::from_html(url, html.clone())),
                None => Err(ScrapeError::fetch(url, "navigation failed")),
            }
        }
    }

    #[derive(Default)]
    struct MemorySink {
        snapshots: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl SnapshotSink for MemorySink {
        async fn persist_snapshot(&self, result: &PortfolioResult) -> anyhow::Result<()> {
            self.snapshots.lock().unwrap().push(result.len());
            Ok(())
        }
    }

    fn extractor() -> FounderExtractor {
        FounderExtractor::with_default_strategies(
            None,
            &ExtractionSettings {
                ai_fallback_threshold: 2,
                ai_text_limit: 3000,
                openai_model: "gpt-4o-mini".to_string(),
                max_tokens: 500,
                temperature: 0.1,
            },
        )
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            page_timeout: Duration::from_secs(5),
            visit_delay: Duration::ZERO,
            max_supplementary_pages: 2,
        }
    }

    const LISTING: &str = r#"
        <div class="portfolio-card">
          <a href="https://a.io">Alpha</a>
          <a href="https://b.ai">Beta</a>
          <a href="https://www.linkedin.com/company/fund">LinkedIn</a>
        </div>
    "#;

    const ALPHA_HOME: &str = r#"
        <html>
          <head>
            <title>Alpha - Payments for robots</title>
            <meta name="description" content="Payments for robots.">
          </head>
          <body>
            <a href="/team">Team</a>
            <a href="/about">About</a>
            <section class="team">
              <div class="member-card"><h3>John Smith</h3><p>CTO at Alpha</p></div>
            </section>
            <p>Built with React on AWS. Write to hello@a.io or jsmith@a.io</p>
          </body>
        </html>
    "#;

    const ALPHA_TEAM: &str = r#"
        <section class="founders">
          <div class="profile"><h3>JOHN SMITH</h3><p class="role">Chairman</p></div>
          <div class="profile"><h3>Jane Doe</h3><p class="role">CEO</p></div>
        </section>
    "#;

    fn site() -> StaticSite {
        StaticSite::default()
            .page("https://fund.vc/portfolio", LISTING)
            .page("https://a.io/", ALPHA_HOME)
            .page("https://a.io/team", ALPHA_TEAM)
    }

    #[test]
    fn title_names_stop_at_separators() {
        assert_eq!(name_from_title("Alpha - Payments | Home").as_deref(), Some("Alpha"));
        assert_eq!(name_from_title("Beta | Home").as_deref(), Some("Beta"));
        assert_eq!(name_from_title("  "), None);
    }

    #[tokio::test]
    async fn company_record_merges_team_pages_and_attributes_emails() {
        let site = site();
        let sink = MemorySink::default();
        let mut pipeline = PortfolioPipeline::new(&site, &sink, extractor(), settings());

        let record = pipeline.extract_company("https://a.io/", None).await.unwrap();

        assert_eq!(record.company_name, "Alpha");
        assert_eq!(record.description, "Payments for robots.");
        assert_eq!(record.tech_stack, vec!["React", "AWS"]);

        let names: Vec<&str> = record.founders.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["John Smith", "Jane Doe"]);
        assert_eq!(record.founders[0].role, "CTO");
        assert_eq!(record.founders[0].email, "jsmith@a.io");
        assert_eq!(record.founders[0].email_source, EmailSource::Harvested);
        assert_eq!(record.founders[1].email, "jane@a.io");
        assert_eq!(record.founders[1].email_source, EmailSource::Synthesized);

        // the about page does not exist
        assert_eq!(pipeline.stats().supplementary_page_failures, 1);
        assert_eq!(pipeline.stats().synthesized_emails, 1);
    }

    #[tokio::test]
    async fn extracting_twice_gives_same_founders_and_emails() {
        let site = site();
        let sink = MemorySink::default();
        let mut pipeline = PortfolioPipeline::new(&site, &sink, extractor(), settings());

        let first = pipeline.extract_company("https://a.io/", None).await.unwrap();
        let second = pipeline.extract_company("https://a.io/", None).await.unwrap();

        assert_eq!(first.founders, second.founders);
        assert_eq!(first.all_emails, second.all_emails);
    }

    #[tokio::test]
    async fn run_skips_unreachable_companies_and_snapshots_each_record() {
        let site = site();
        let sink = MemorySink::default();
        let mut pipeline = PortfolioPipeline::new(&site, &sink, extractor(), settings());

        let result = pipeline.run_portfolio("https://fund.vc/portfolio").await;

        assert_eq!(result.len(), 1);
        assert_eq!(result.companies()[0].company_name, "A");
        assert_eq!(result.stats.companies_attempted, 2);
        assert_eq!(result.stats.companies_recorded, 1);
        assert_eq!(result.stats.fetch_failures, 1);
        assert!(result.finished_at.is_some());
        assert_eq!(*sink.snapshots.lock().unwrap(), vec![1, 1]);

        let visits = site.visits.lock().unwrap();
        assert!(!visits.iter().any(|v| v.contains("linkedin")));
    }

    #[tokio::test]
    async fn empty_listing_is_nothing_to_do() {
        let site = StaticSite::default().page("https://fund.vc/portfolio", "<p>Coming soon</p>");
        let sink = MemorySink::default();
        let mut pipeline = PortfolioPipeline::new(&site, &sink, extractor(), settings());

        let result = pipeline.run_portfolio("https://fund.vc/portfolio").await;

        assert!(result.is_empty());
        assert!(sink.snapshots.lock().unwrap().is_empty());
    }

    struct SlowSite;

    #[async_trait]
    impl PageFetcher for SlowSite {
        async fn fetch_rendered(&self, url: &str) -> ScrapeResult<RenderedPage> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(RenderedPage::from_html(url, String::new()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_pages_time_out_as_fetch_failures() {
        let sink = MemorySink::default();
        let mut pipeline = PortfolioPipeline::new(&SlowSite, &sink, extractor(), settings());

        let record = pipeline.extract_company("https://slow.io/", None).await;

        assert!(record.is_none());
        assert_eq!(pipeline.stats().fetch_failures, 1);
    }
}
