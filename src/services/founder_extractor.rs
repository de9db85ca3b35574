use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

use crate::{
    configuration::ExtractionSettings,
    domain::{
        founder::{find_role_keyword, EmailSource, Founder, FounderRoster, DEFAULT_ROLE},
        webpage::{element_text, RenderedPage},
    },
    error::{ScrapeError, ScrapeResult},
    services::TextCompleter,
};

static TEAM_SECTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("section, div").unwrap());
static PERSON_CARD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div, article, li").unwrap());
static NAME_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h2, h3, h4, h5, p").unwrap());
static HEADING_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h2, h3, h4, h5").unwrap());
static ROLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p, span, div").unwrap());
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

static TEAM_SECTION_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)team|founder|leadership|people|about").unwrap());
static PERSON_CARD_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)person|member|profile|card|founder").unwrap());
static NAME_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)name|title").unwrap());
static ROLE_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)role|title|position").unwrap());
static LINKEDIN_HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)linkedin\.com/in/").unwrap());
static TWITTER_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|[/.])(?:twitter|x)\.com/").unwrap());

static NAME_THEN_ROLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<name>[A-Z][a-z]+ [A-Z][a-z]+)[\s,-]+(?P<role>CEO|CTO|CFO|Founder|Co-founder)")
        .unwrap()
});
static ROLE_THEN_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<role>CEO|CTO|CFO|Founder|Co-founder)[\s:-]+(?P<name>[A-Z][a-z]+ [A-Z][a-z]+)")
        .unwrap()
});

const MAX_ROLE_LEN: usize = 100;
const MIN_PATTERN_NAME_LEN: usize = 6;

pub const AI_INSTRUCTIONS: &str =
    "Extract founder/CEO/team member names and roles. Return JSON array.";

/// What a strategy sees: the page, its visible text and everything found so far.
pub struct StrategyInput<'a> {
    pub page: &'a RenderedPage,
    pub text: &'a str,
    pub found: &'a FounderRoster,
}

#[derive(Debug, Default)]
pub struct StrategyOutput {
    pub founders: Vec<Founder>,
    /// Candidates dropped for failing the name rules.
    pub rejected: usize,
    /// The strategy chose not to run.
    pub skipped: bool,
}

/// One way of finding founders on a page.
#[async_trait]
pub trait FounderStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn extract(&self, input: &StrategyInput<'_>) -> ScrapeResult<StrategyOutput>;
}

/// Team sections containing person cards with a heading and a role.
pub struct StructuredDomStrategy;

fn class_matches(element: &ElementRef, pattern: &Regex) -> bool {
    element
        .value()
        .attr("class")
        .map(|class| pattern.is_match(class))
        .unwrap_or(false)
}

fn first_href_matching(card: &ElementRef, pattern: &Regex) -> String {
    card.select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| pattern.is_match(href))
        .unwrap_or_default()
        .to_string()
}

fn read_person_card(card: ElementRef) -> Option<ScrapeResult<Founder>> {
    let name_element = card
        .select(&NAME_SELECTOR)
        .find(|el| el.id() != card.id() && class_matches(el, &NAME_CLASS))
        .or_else(|| card.select(&HEADING_SELECTOR).next())?;
    let name = element_text(&name_element);
    if name.is_empty() {
        return None;
    }

    let role = card
        .select(&ROLE_SELECTOR)
        .filter(|el| el.id() != card.id() && el.id() != name_element.id())
        .find(|el| class_matches(el, &ROLE_CLASS))
        .map(|el| element_text(&el))
        .filter(|role| !role.is_empty() && role.chars().count() < MAX_ROLE_LEN)
        .or_else(|| find_role_keyword(&element_text(&card)).map(String::from))
        .unwrap_or_else(|| DEFAULT_ROLE.to_string());

    Some(Founder::new(&name, &role).map(|mut founder| {
        founder.linkedin = first_href_matching(&card, &LINKEDIN_HREF);
        founder.twitter = first_href_matching(&card, &TWITTER_HREF);
        founder
    }))
}

impl StructuredDomStrategy {
    pub fn extract_from_html(html: &str) -> StrategyOutput {
        let document = Html::parse_document(html);
        let mut roster = FounderRoster::new();
        let mut rejected_names = HashSet::new();

        let sections = document
            .select(&TEAM_SECTION_SELECTOR)
            .filter(|section| class_matches(section, &TEAM_SECTION_CLASS));

        for section in sections {
            let cards = section
                .select(&PERSON_CARD_SELECTOR)
                .filter(|card| card.id() != section.id() && class_matches(card, &PERSON_CARD_CLASS));

            for card in cards {
                match read_person_card(card) {
                    Some(Ok(founder)) => {
                        roster.insert(founder);
                    }
                    Some(Err(e)) => {
                        if rejected_names.insert(e.to_string()) {
                            log::debug!("{}", e);
                        }
                    }
                    None => {}
                }
            }
        }

        StrategyOutput {
            founders: roster.into_vec(),
            rejected: rejected_names.len(),
            skipped: false,
        }
    }
}

#[async_trait]
impl FounderStrategy for StructuredDomStrategy {
    fn name(&self) -> &'static str {
        "structured-dom"
    }

    async fn extract(&self, input: &StrategyInput<'_>) -> ScrapeResult<StrategyOutput> {
        Ok(Self::extract_from_html(&input.page.html))
    }
}

/// "Jane Doe, CEO" and "CEO: Jane Doe" in the page text.
pub struct TextPatternStrategy;

impl TextPatternStrategy {
    pub fn extract_from_text(text: &str, found: &FounderRoster) -> StrategyOutput {
        let mut roster = FounderRoster::new();
        let mut rejected = 0;

        for pattern in [&*NAME_THEN_ROLE, &*ROLE_THEN_NAME] {
            for captures in pattern.captures_iter(text) {
                let (Some(name), Some(role)) = (captures.name("name"), captures.name("role")) else {
                    continue;
                };
                let name = name.as_str();
                if found.contains(name)
                    || roster.contains(name)
                    || name.chars().count() < MIN_PATTERN_NAME_LEN
                {
                    continue;
                }

                match Founder::new(name, role.as_str()) {
                    Ok(founder) => {
                        roster.insert(founder);
                    }
                    Err(_) => rejected += 1,
                }
            }
        }

        StrategyOutput {
            founders: roster.into_vec(),
            rejected,
            skipped: false,
        }
    }
}

#[async_trait]
impl FounderStrategy for TextPatternStrategy {
    fn name(&self) -> &'static str {
        "text-pattern"
    }

    async fn extract(&self, input: &StrategyInput<'_>) -> ScrapeResult<StrategyOutput> {
        Ok(Self::extract_from_text(input.text, input.found))
    }
}

#[derive(Deserialize)]
struct AiFounder {
    name: Option<String>,
    role: Option<String>,
    email: Option<String>,
}

/// Founders from a completion response. Entries that are not objects with a
/// non-empty `name`, or that fail the name rules, are dropped and counted.
pub fn parse_ai_founders(response: &str) -> ScrapeResult<(Vec<Founder>, usize)> {
    let (start, end) = match (response.find('['), response.rfind(']')) {
        (Some(start), Some(end)) if start < end => (start, end),
        _ => {
            return Err(ScrapeError::Parse(
                "completion response has no JSON array".to_string(),
            ))
        }
    };

    let entries: Vec<serde_json::Value> = serde_json::from_str(&response[start..=end])
        .map_err(|e| ScrapeError::Parse(format!("completion response is not JSON: {}", e)))?;

    let mut founders = vec![];
    let mut rejected = 0;

    for entry in entries {
        let candidate = serde_json::from_value::<AiFounder>(entry)
            .ok()
            .and_then(|ai| {
                let name = ai.name.filter(|n| !n.trim().is_empty())?;
                let role = ai.role.unwrap_or_else(|| DEFAULT_ROLE.to_string());
                let mut founder = Founder::new(&name, &role).ok()?;
                if let Some(email) = ai.email.filter(|e| e.contains('@')) {
                    founder.set_email(&email, EmailSource::Page);
                }
                Some(founder)
            });

        match candidate {
            Some(founder) => founders.push(founder),
            None => rejected += 1,
        }
    }

    Ok((founders, rejected))
}

/// Asks a completion service when the other strategies found too few people.
pub struct AiFallbackStrategy {
    completer: Option<Arc<dyn TextCompleter>>,
    threshold: usize,
    text_limit: usize,
}

impl AiFallbackStrategy {
    pub fn new(
        completer: Option<Arc<dyn TextCompleter>>,
        threshold: usize,
        text_limit: usize,
    ) -> Self {
        AiFallbackStrategy {
            completer,
            threshold,
            text_limit,
        }
    }
}

#[async_trait]
impl FounderStrategy for AiFallbackStrategy {
    fn name(&self) -> &'static str {
        "ai-fallback"
    }

    async fn extract(&self, input: &StrategyInput<'_>) -> ScrapeResult<StrategyOutput> {
        if input.found.len() >= self.threshold {
            return Ok(StrategyOutput::default());
        }
        let Some(completer) = &self.completer else {
            return Ok(StrategyOutput {
                skipped: true,
                ..Default::default()
            });
        };

        let text: String = input.text.chars().take(self.text_limit).collect();
        if text.is_empty() {
            return Ok(StrategyOutput::default());
        }

        let response = completer
            .complete_text(AI_INSTRUCTIONS, &format!("Find founders in this text:\n{}", text))
            .await
            .map_err(|e| ScrapeError::ExternalService(e.to_string()))?;

        let (founders, rejected) = parse_ai_founders(&response)?;
        Ok(StrategyOutput {
            founders,
            rejected,
            skipped: false,
        })
    }
}

#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub founders: Vec<Founder>,
    pub rejected: usize,
    pub failed_strategies: usize,
    pub skipped_strategies: usize,
}

/// Runs every strategy in order and unions their founders by name.
pub struct FounderExtractor {
    strategies: Vec<Box<dyn FounderStrategy>>,
}

impl FounderExtractor {
    pub fn new(strategies: Vec<Box<dyn FounderStrategy>>) -> Self {
        FounderExtractor { strategies }
    }

    pub fn with_default_strategies(
        completer: Option<Arc<dyn TextCompleter>>,
        settings: &ExtractionSettings,
    ) -> Self {
        FounderExtractor::new(vec![
            Box::new(StructuredDomStrategy),
            Box::new(TextPatternStrategy),
            Box::new(AiFallbackStrategy::new(
                completer,
                settings.ai_fallback_threshold,
                settings.ai_text_limit,
            )),
        ])
    }

    pub async fn extract(&self, page: &RenderedPage) -> ExtractionReport {
        let text = page.visible_text();
        let mut roster = FounderRoster::new();
        let mut report = ExtractionReport::default();

        for strategy in self.strategies.iter() {
            let input = StrategyInput {
                page,
                text: &text,
                found: &roster,
            };

            let result = strategy.extract(&input).await;
            match result {
                Ok(output) => {
                    if output.skipped {
                        log::debug!("Strategy {} skipped on {}", strategy.name(), page.url);
                        report.skipped_strategies += 1;
                    }
                    report.rejected += output.rejected;
                    let added = roster.merge(output.founders);
                    log::debug!(
                        "Strategy {} added {} founders on {}",
                        strategy.name(),
                        added,
                        page.url
                    );
                }
                Err(e) => {
                    log::warn!("Strategy {} failed on {}: {}", strategy.name(), page.url, e);
                    report.failed_strategies += 1;
                }
            }
        }

        report.founders = roster.into_vec();
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use async_trait::async_trait;

    use super::{parse_ai_founders, FounderExtractor, StructuredDomStrategy, TextPatternStrategy};
    use crate::{
        configuration::ExtractionSettings,
        domain::{
            founder::{EmailSource, FounderRoster},
            webpage::RenderedPage,
        },
        services::TextCompleter,
    };

    struct CannedCompleter {
        response: anyhow::Result<String>,
        calls: AtomicUsize,
    }

    impl CannedCompleter {
        fn new(response: anyhow::Result<String>) -> Arc<Self> {
            Arc::new(CannedCompleter {
                response,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TextCompleter for CannedCompleter {
        async fn complete_text(&self, _instructions: &str, input: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(input.starts_with("Find founders in this text:\n"));
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(anyhow::anyhow!(e.to_string())),
            }
        }
    }

    fn settings() -> ExtractionSettings {
        ExtractionSettings {
            ai_fallback_threshold: 2,
            ai_text_limit: 3000,
            openai_model: "gpt-4o-mini".to_string(),
            max_tokens: 500,
            temperature: 0.1,
        }
    }

    fn page(html: &str) -> RenderedPage {
        RenderedPage::from_html("https://acme.com/", html.to_string())
    }

    const TEAM_PAGE: &str = r#"
        <section class="team">
          <div class="member-card">
            <h3>John Smith</h3>
            <p>CTO at Acme</p>
            <a href="https://www.linkedin.com/in/johnsmith">in</a>
            <a href="https://twitter.com/jsmith">tw</a>
          </div>
        </section>
    "#;

    #[test]
    fn structured_card_yields_name_role_and_profiles() {
        let output = StructuredDomStrategy::extract_from_html(TEAM_PAGE);

        assert_eq!(output.founders.len(), 1);
        let founder = &output.founders[0];
        assert_eq!(founder.name(), "John Smith");
        assert_eq!(founder.role, "CTO");
        assert_eq!(founder.linkedin, "https://www.linkedin.com/in/johnsmith");
        assert_eq!(founder.twitter, "https://twitter.com/jsmith");
    }

    #[test]
    fn structured_prefers_classed_name_and_role_elements() {
        let html = r#"
            <div class="leadership">
              <article class="profile">
                <h2>Leadership</h2>
                <h4 class="person-name">Ada Lovelace</h4>
                <span class="position">Chief Scientist</span>
              </article>
              <li class="team-card"><h3>Prince</h3><p>Founder</p></li>
            </div>
        "#;

        let output = StructuredDomStrategy::extract_from_html(html);

        assert_eq!(output.founders.len(), 1);
        assert_eq!(output.founders[0].name(), "Ada Lovelace");
        assert_eq!(output.founders[0].role, "Chief Scientist");
        assert_eq!(output.rejected, 1);
    }

    #[test]
    fn text_patterns_capture_both_orders() {
        let text = "Meet Jane Doe, CEO and our CTO: Alan Turing. Founder Bo Li";

        let output = TextPatternStrategy::extract_from_text(text, &FounderRoster::new());
        let names: Vec<&str> = output.founders.iter().map(|f| f.name()).collect();

        assert_eq!(names, vec!["Jane Doe", "Alan Turing"]);
        assert_eq!(output.founders[0].role, "CEO");
        assert_eq!(output.founders[1].role, "CTO");
    }

    #[test]
    fn ai_response_parsing_drops_bad_entries() {
        let response = r#"```json
            [
              {"name": "Grace Hopper", "role": "CEO", "email": "grace@acme.com"},
              {"name": "", "role": "CTO"},
              {"role": "CFO"},
              "Linus",
              {"name": "Cher"},
              {"name": "Ken Thompson"}
            ]
        ```"#;

        let (founders, rejected) = parse_ai_founders(response).unwrap();

        assert_eq!(founders.len(), 2);
        assert_eq!(founders[0].email, "grace@acme.com");
        assert_eq!(founders[0].email_source, EmailSource::Page);
        assert_eq!(founders[1].role, "Team Member");
        assert_eq!(rejected, 4);
    }

    #[test]
    fn ai_response_without_json_is_a_parse_failure() {
        assert!(parse_ai_founders("Sorry, I could not find anyone.").is_err());
    }

    #[tokio::test]
    async fn extractor_returns_single_founder_for_team_card() {
        let extractor = FounderExtractor::with_default_strategies(None, &settings());

        let report = extractor.extract(&page(TEAM_PAGE)).await;

        assert_eq!(report.founders.len(), 1);
        assert_eq!(report.founders[0].name(), "John Smith");
        assert_eq!(report.founders[0].role, "CTO");
        assert_eq!(report.skipped_strategies, 1);
    }

    #[tokio::test]
    async fn ai_fallback_runs_only_below_threshold() {
        let completer = CannedCompleter::new(Ok(
            r#"[{"name": "John Smith", "role": "CTO"}, {"name": "Mary Major", "role": "CEO"}]"#
                .to_string(),
        ));
        let extractor = FounderExtractor::with_default_strategies(
            Some(completer.clone() as Arc<dyn TextCompleter>),
            &settings(),
        );

        let report = extractor.extract(&page(TEAM_PAGE)).await;

        assert_eq!(completer.calls.load(Ordering::SeqCst), 1);
        let names: Vec<&str> = report.founders.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["John Smith", "Mary Major"]);

        let busy_page = page(
            r#"<p>Jane Doe, CEO</p><p>Alan Turing - CTO</p><p>Grace Hopper, CFO</p>"#,
        );
        let report = extractor.extract(&busy_page).await;

        assert_eq!(completer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.founders.len(), 3);
    }

    #[tokio::test]
    async fn failing_completion_degrades_to_no_extra_founders() {
        let completer = CannedCompleter::new(Err(anyhow::anyhow!("rate limited")));
        let extractor = FounderExtractor::with_default_strategies(
            Some(completer as Arc<dyn TextCompleter>),
            &settings(),
        );

        let report = extractor.extract(&page(TEAM_PAGE)).await;

        assert_eq!(report.founders.len(), 1);
        assert_eq!(report.failed_strategies, 1);
    }

    #[tokio::test]
    async fn malformed_completion_degrades_to_no_extra_founders() {
        let completer = CannedCompleter::new(Ok("[{not json".to_string()));
        let extractor = FounderExtractor::with_default_strategies(
            Some(completer as Arc<dyn TextCompleter>),
            &settings(),
        );

        let report = extractor.extract(&page(TEAM_PAGE)).await;

        assert_eq!(report.founders.len(), 1);
        assert_eq!(report.failed_strategies, 1);
    }
}
