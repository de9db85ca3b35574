use std::sync::Arc;

use anyhow::bail;

use crate::{
    configuration::Settings,
    domain::company::PortfolioResult,
    services::{
        Droid, FounderExtractor, JsonSnapshotWriter, OpenaiClient, PageFetcher, PipelineSettings,
        PortfolioPipeline, SnapshotSink, TextCompleter,
    },
};

/// What a single invocation should do.
#[derive(Debug, Clone)]
pub enum Job {
    /// Scrape every listing page, one after the other.
    Portfolio(Vec<String>),
    /// Only list the companies on a listing page.
    Discover(String),
    /// Scrape one company site.
    Company { url: String, name: Option<String> },
}

/// Snapshot sink for jobs that are not tied to a listing page.
struct NoSnapshot;

#[async_trait::async_trait]
impl SnapshotSink for NoSnapshot {
    async fn persist_snapshot(&self, _result: &PortfolioResult) -> anyhow::Result<()> {
        Ok(())
    }
}

fn build_extractor(settings: &Settings) -> FounderExtractor {
    let completer = match settings.api_keys.openai_key() {
        Some(key) => {
            let client = OpenaiClient::new(key, &settings.extraction);
            Some(Arc::new(client) as Arc<dyn TextCompleter>)
        }
        None => {
            log::warn!("No openai api key configured, AI founder extraction is disabled");
            None
        }
    };

    FounderExtractor::with_default_strategies(completer, &settings.extraction)
}

async fn run_job(settings: &Settings, fetcher: &dyn PageFetcher, job: Job) -> anyhow::Result<()> {
    let pipeline_settings = PipelineSettings::from(&settings.scraper);

    match job {
        Job::Portfolio(listing_urls) => {
            let total = listing_urls.len();
            for (i, listing_url) in listing_urls.iter().enumerate() {
                log::info!("Portfolio {}/{}: {}", i + 1, total, listing_url);

                let writer = JsonSnapshotWriter::for_listing(&settings.snapshot.path, listing_url);
                let mut pipeline = PortfolioPipeline::new(
                    fetcher,
                    &writer,
                    build_extractor(settings),
                    pipeline_settings.clone(),
                );
                let result = pipeline.run_portfolio(listing_url).await;

                log::info!(
                    "Saved {} companies from {} to {}",
                    result.len(),
                    listing_url,
                    writer.path().display()
                );
            }
        }
        Job::Discover(listing_url) => {
            let mut pipeline = PortfolioPipeline::new(
                fetcher,
                &NoSnapshot,
                build_extractor(settings),
                pipeline_settings,
            );
            let candidates = pipeline.discover_companies(&listing_url).await;
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        }
        Job::Company { url, name } => {
            let mut pipeline = PortfolioPipeline::new(
                fetcher,
                &NoSnapshot,
                build_extractor(settings),
                pipeline_settings,
            );
            match pipeline.extract_company(&url, name.as_deref()).await {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => bail!("Could not scrape {}", url),
            }
        }
    }

    Ok(())
}

/// Starts a browser session, runs the job and always closes the session,
/// also when interrupted with Ctrl-C.
pub async fn run(settings: Settings, job: Job) -> anyhow::Result<()> {
    let droid = Droid::new(&settings.scraper).await?;

    let outcome = tokio::select! {
        outcome = run_job(&settings, &droid, job) => outcome,
        _ = tokio::signal::ctrl_c() => {
            log::warn!("Interrupted, shutting down");
            Ok(())
        }
    };

    droid.quit().await;
    outcome
}
