use altbasket::cli::export::ExportFormat;
use altbasket::core::config::ProviderKind;
use altbasket::core::log::init_logging;
use altbasket::{AllocOptions, AppCommand, FetchOverrides};
use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone)]
struct FetchArgs {
    /// Market data source
    #[arg(long, value_enum)]
    provider: Option<ProviderKind>,

    /// Number of pages to fetch (250 coins each on CoinGecko)
    #[arg(long)]
    pages: Option<u32>,
}

impl From<FetchArgs> for FetchOverrides {
    fn from(args: FetchArgs) -> Self {
        FetchOverrides {
            provider: args.provider,
            pages: args.pages,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Calculate BTC and altcoin basket target allocations
    Alloc {
        #[command(flatten)]
        fetch: FetchArgs,

        /// Total portfolio value in USD
        #[arg(long)]
        portfolio_usd: Option<f64>,

        /// BTC target weight in percent of the portfolio
        #[arg(long)]
        btc_weight: Option<f64>,

        /// Altcoin basket target weight in percent of the portfolio
        #[arg(long)]
        basket_weight: Option<f64>,

        /// Number of top altcoins in the basket
        #[arg(long)]
        top_n: Option<usize>,

        /// Comma-separated symbols to leave out of the basket
        #[arg(long)]
        exclude: Option<String>,
    },
    /// Save the cleaned market snapshot to the data directory
    Export {
        #[command(flatten)]
        fetch: FetchArgs,

        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
    },
    /// Write top-50 CoinPaprika tickers for the last four Mondays to CSV
    History,
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Alloc {
                fetch,
                portfolio_usd,
                btc_weight,
                basket_weight,
                top_n,
                exclude,
            } => AppCommand::Alloc(AllocOptions {
                fetch: fetch.into(),
                portfolio_usd,
                btc_weight_pct: btc_weight,
                basket_weight_pct: basket_weight,
                top_n,
                exclude,
            }),
            Commands::Export { fetch, format } => AppCommand::Export {
                fetch: fetch.into(),
                format,
            },
            Commands::History => AppCommand::History,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => altbasket::cli::setup::setup().map(|path| {
            println!("Created default configuration at {}", path.display());
        }),
        Some(cmd) => altbasket::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
