use std::time::Duration;

use async_trait::async_trait;
use thirtyfour::{error::WebDriverResult, ChromiumLikeCapabilities, DesiredCapabilities, WebDriver};

use crate::{
    configuration::ScraperSettings,
    domain::webpage::RenderedPage,
    error::{ScrapeError, ScrapeResult},
};

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Source of fully rendered pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Navigates to `url`, lets dynamic content load and returns the final DOM.
    async fn fetch_rendered(&self, url: &str) -> ScrapeResult<RenderedPage>;
}

/// One browser session, driven serially.
pub struct Droid {
    pub driver: WebDriver,
    settle: Duration,
    scroll_rounds: u8,
    scroll_pause: Duration,
}

impl Droid {
    pub async fn new(settings: &ScraperSettings) -> anyhow::Result<Self> {
        let mut caps = DesiredCapabilities::chrome();
        if settings.headless {
            caps.set_headless()?;
        }
        caps.add_arg("--no-sandbox")?;
        caps.add_arg("--disable-dev-shm-usage")?;
        caps.add_arg("--window-size=1920,1080")?;
        caps.add_arg("--disable-blink-features=AutomationControlled")?;
        caps.add_arg(&format!("--user-agent={}", USER_AGENT))?;

        let driver = WebDriver::new(settings.webdriver_url.as_str(), caps).await?;
        driver.set_page_load_timeout(settings.page_timeout()).await?;

        log::info!("Browser session started on {}", settings.webdriver_url);

        Ok(Droid {
            driver,
            settle: settings.settle(),
            scroll_rounds: settings.scroll_rounds,
            scroll_pause: settings.scroll_pause(),
        })
    }

    pub async fn quit(self) {
        match self.driver.quit().await {
            Ok(_) => log::info!("Browser session closed"),
            Err(e) => log::error!("Failed to close browser session: {:?}", e),
        }
    }

    async fn page_height(&self) -> WebDriverResult<i64> {
        self.driver
            .execute("return document.body.scrollHeight", Vec::new())
            .await?
            .convert::<i64>()
    }

    /// Scrolls to the bottom until the page stops growing, to trigger lazy loading.
    async fn auto_scroll(&self) -> WebDriverResult<()> {
        let mut last_height = self.page_height().await?;

        for _ in 0..self.scroll_rounds {
            self.driver
                .execute("window.scrollTo(0, document.body.scrollHeight);", Vec::new())
                .await?;
            tokio::time::sleep(self.scroll_pause).await;

            let new_height = self.page_height().await?;
            if new_height == last_height {
                break;
            }
            last_height = new_height;
        }

        Ok(())
    }

    async fn load(&self, url: &str) -> WebDriverResult<String> {
        self.driver.goto(url).await?;
        tokio::time::sleep(self.settle).await;
        self.auto_scroll().await?;
        self.driver.source().await
    }
}

#[async_trait]
impl PageFetcher for Droid {
    async fn fetch_rendered(&self, url: &str) -> ScrapeResult<RenderedPage> {
        log::debug!("Loading {}", url);

        match self.load(url).await {
            Ok(html) => Ok(RenderedPage::from_html(url, html)),
            Err(e) => Err(ScrapeError::fetch(url, e)),
        }
    }
}
