use anyhow::bail;
use clap::Parser;
use kindle_scraper::{scrape_notebook, Credentials, RunOutcome, ScraperConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "kindle-scraper",
    about = "Extract Kindle notebook highlights with a human-paced browser"
)]
struct Args {
    /// Amazon account email
    #[arg(long)]
    email: String,

    /// Amazon account password
    #[arg(long)]
    password: String,

    /// Run with a visible browser window
    #[arg(long)]
    headed: bool,

    /// Skip challenge detection and leave time for a human to solve one
    #[arg(long)]
    manual_challenge: bool,

    /// Override the notebook URL
    #[arg(long)]
    url: Option<Url>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = ScraperConfig::default();
    config.browser.headless = !args.headed;
    config.manual_challenge = args.manual_challenge;
    if let Some(url) = args.url {
        config.notebook_url = url.to_string();
    }

    let credentials = Credentials {
        email: args.email,
        password: args.password,
    };

    match scrape_notebook(&credentials, config).await {
        RunOutcome::Success(results) => {
            info!(books = results.len(), "scrape succeeded");
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        RunOutcome::Blocked(signal) => {
            bail!("blocked by a verification challenge ({signal}); try again later")
        }
        RunOutcome::Failure(err) => Err(err.into()),
    }
}
