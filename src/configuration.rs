use std::time::Duration;

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub scraper: ScraperSettings,
    pub extraction: ExtractionSettings,
    pub api_keys: ApiKeys,
    pub snapshot: SnapshotSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    #[serde(default)]
    pub portfolio_urls: Vec<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ScraperSettings {
    pub webdriver_url: String,
    pub headless: bool,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub page_timeout_secs: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub settle_millis: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub scroll_rounds: u8,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub scroll_pause_millis: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub visit_delay_millis: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_supplementary_pages: usize,
}

impl ScraperSettings {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_millis)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_millis)
    }

    pub fn visit_delay(&self) -> Duration {
        Duration::from_millis(self.visit_delay_millis)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct ExtractionSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub ai_fallback_threshold: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub ai_text_limit: usize,
    pub openai_model: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_tokens: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub temperature: f32,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApiKeys {
    pub openai: Option<String>,
}

impl ApiKeys {
    /// Configured key, or `OPENAI_API_KEY` from the environment.
    pub fn openai_key(&self) -> Option<String> {
        self.openai
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct SnapshotSettings {
    pub path: String,
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path =
        std::env::current_dir().map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(
            config::File::from(configuration_directory.join(environment_filename)).required(false),
        )
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
