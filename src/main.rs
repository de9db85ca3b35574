use anyhow::bail;
use clap::{Parser, Subcommand};
use env_logger::Env;
use portfolio_scout::{
    configuration::get_configuration,
    startup::{run, Job},
};

#[derive(Parser)]
#[command(version, about = "Collects founders of venture portfolio companies")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape every company on one or more portfolio pages
    Run {
        /// Portfolio listing pages, defaults to the configured ones
        listing_urls: Vec<String>,
    },
    /// Print the company links found on a portfolio page
    Discover { listing_url: String },
    /// Scrape a single company site and print the record
    Company {
        url: String,
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let configuration = get_configuration()?;

    let job = match cli.command {
        Command::Run { listing_urls } => {
            let listing_urls = match listing_urls.is_empty() {
                true => configuration.application.portfolio_urls.clone(),
                false => listing_urls,
            };
            if listing_urls.is_empty() {
                bail!("No portfolio urls given or configured");
            }
            Job::Portfolio(listing_urls)
        }
        Command::Discover { listing_url } => Job::Discover(listing_url),
        Command::Company { url, name } => Job::Company { url, name },
    };

    run(configuration, job).await
}
