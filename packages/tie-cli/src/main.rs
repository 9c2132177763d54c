//! `tie` - query the TIE IOC API from the command line.
//!
//! ```text
//! tie iocs -q google -t domainname -f json
//! tie feed -p daily -t ipv4 --severity 3-5
//! tie pingback -t domainname -v evil.example
//! ```

mod config;
mod filters;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tie_client::{FeedRequest, Format, IocRequest, RequestDescriptor, TieClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::TokenFile;
use crate::filters::FilterArgs;

#[derive(Parser, Debug)]
#[command(name = "tie")]
#[command(about = "Query the TIE threat intelligence API")]
struct Cli {
    /// Configuration file with the API tokens [default: ~/.tie.toml or ~/.gotie]
    #[arg(short = 'c', long = "conf")]
    conf: Option<PathBuf>,

    /// Print debug messages
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search IOCs
    Iocs(IocsArgs),

    /// Export a periodic feed
    Feed(FeedArgs),

    /// Report an observed IOC value
    Pingback(PingbackArgs),
}

#[derive(clap::Args, Debug)]
struct IocsArgs {
    /// Query string (case insensitive)
    #[arg(short, long, default_value = "")]
    query: String,

    /// Output format (bloom|csv|json|stix)
    #[arg(short, long, default_value = "csv")]
    format: String,

    /// False positive rate of bloom output
    #[arg(long = "bloom-p", default_value_t = 0.001)]
    bloom_p: f64,

    /// IOC data type to search exclusively
    #[arg(short = 't', long = "type", default_value = "")]
    data_type: String,

    /// IOCs requested per page
    #[arg(long, default_value_t = 1000)]
    limit: usize,

    #[command(flatten)]
    filters: FilterArgs,
}

#[derive(clap::Args, Debug)]
struct FeedArgs {
    /// Feed period (hourly|daily|weekly|monthly)
    #[arg(short, long)]
    period: String,

    /// IOC data type
    #[arg(short = 't', long = "type")]
    data_type: String,

    /// Output format (bloom|csv|json|stix)
    #[arg(short, long, default_value = "csv")]
    format: String,

    /// IOCs requested per page
    #[arg(long, default_value_t = 1000)]
    limit: usize,

    #[command(flatten)]
    filters: FilterArgs,
}

#[derive(clap::Args, Debug)]
struct PingbackArgs {
    /// IOC data type
    #[arg(short = 't', long = "type")]
    data_type: String,

    /// Observed IOC value
    #[arg(short, long)]
    value: String,
}

/// First-seen lower bound applied to `iocs` when none is given.
const DEFAULT_FIRST_SEEN_SINCE: &str = "2015-01-01";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let conf_path = cli.conf.clone().unwrap_or_else(config::default_path);
    let tokens = TokenFile::load(&conf_path)?;

    match cli.command {
        Commands::Iocs(args) => iocs(&tokens, args).await,
        Commands::Feed(args) => feed(&tokens, args).await,
        Commands::Pingback(args) => pingback(&tokens, args).await,
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "info".into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Debug logging enabled");
}

async fn iocs(tokens: &TokenFile, mut args: IocsArgs) -> Result<()> {
    if args.filters.first_seen_since.is_none() {
        args.filters.first_seen_since = Some(DEFAULT_FIRST_SEEN_SINCE.to_string());
    }

    let format: Format = args.format.parse()?;
    let extra_args = args.filters.to_query()?;
    tracing::debug!(extra_args = %extra_args, "Built filter arguments");

    let config = tokens
        .client_config()?
        .with_page_limit(args.limit)
        .with_bloom_fp_rate(args.bloom_p);
    let client = TieClient::new(config)?;

    let request = IocRequest::new(args.query, args.data_type, format).extra_args(extra_args);
    write_to_stdout(&client, &request).await
}

async fn feed(tokens: &TokenFile, args: FeedArgs) -> Result<()> {
    let format: Format = args.format.parse()?;
    let extra_args = args.filters.to_query()?;
    tracing::debug!(extra_args = %extra_args, "Built filter arguments");

    let config = tokens.client_config()?.with_page_limit(args.limit);
    let client = TieClient::new(config)?;

    let request = FeedRequest::new(args.period, args.data_type, format).extra_args(extra_args);
    write_to_stdout(&client, &request).await
}

async fn pingback(tokens: &TokenFile, args: PingbackArgs) -> Result<()> {
    let config = tokens.client_config()?;
    if config.pingback_token.is_none() {
        bail!("Please set a valid pingback_token in your config file");
    }

    let client = TieClient::new(config)?;
    let receipt = client
        .pingback(&args.data_type, &args.value)
        .await
        .context("Pingback failed")?;

    println!("{} {}", receipt.status, receipt.body);
    Ok(())
}

async fn write_to_stdout(client: &TieClient, request: &dyn RequestDescriptor) -> Result<()> {
    let mut out = std::io::stdout();
    let pages = client
        .write(request, &mut out)
        .await
        .context("Query failed")?;
    out.flush()?;

    tracing::debug!(pages, "Output written");
    Ok(())
}
