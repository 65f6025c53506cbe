use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tumbledash::config::Config;
use tumbledash::dashboard;
use tumbledash::paginate::MAX_POST_COUNT;
use tumbledash::tumblr::{TumblrClient, REQUEST_TIMEOUT};

/// Get the default config file path (~/.config/tumbledash/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("tumbledash")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(name = "tumbledash", about = "Generate an RSS feed from your Tumblr dashboard")]
struct Args {
    /// Path to the configuration file (default: ~/.config/tumbledash/config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,

    /// Dump the raw JSON received from the API, for debugging
    #[arg(long, value_name = "FILE", num_args = 0..=1)]
    dump: Option<Option<PathBuf>>,

    /// Where to write the RSS feed
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Number of posts to retrieve
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(0..=MAX_POST_COUNT as i64))]
    count: Option<u32>,

    /// Dashboard position to start from
    #[arg(long)]
    offset: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_directive = if args.verbose { "tumbledash=debug" } else { "tumbledash=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    if let Some(count) = args.count {
        config.post_count = count;
    }
    if let Some(offset) = args.offset {
        config.starting_offset = offset;
    }
    if let Some(output) = args.output {
        config.output_path = output;
    }
    if config.post_count > MAX_POST_COUNT {
        anyhow::bail!(
            "post_count {} exceeds the dashboard limit of {}",
            config.post_count,
            MAX_POST_COUNT
        );
    }
    let dump_path = args
        .dump
        .map(|path| path.unwrap_or_else(|| config.dump_path.clone()));

    let credentials = config.credentials()?;
    let http = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("tumbledash/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;
    let client = TumblrClient::new(http, &config.api_base_url, credentials)
        .context("Failed to create Tumblr client")?;

    let summary = dashboard::run(&client, &config, dump_path.as_deref()).await?;
    println!(
        "Wrote {} items to {}",
        summary.items,
        summary.output_path.display()
    );
    Ok(())
}
