use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use mydash::api::receipts::Page;
use mydash::api::tickers::TickerFilters;
use mydash::cli::TickerRef;
use mydash::core::currency::Currency;
use mydash::core::log::init_logging;
use mydash::core::timeframe::{DateRange, Timeframe};
use mydash::{AppCommand, ReceiptsCommand, UserCommand, WindowArgs};

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

#[derive(Args)]
struct WindowOpts {
    /// Timeframe: w, m, q, y, all, r1w, r1m, r3m, r1y or custom
    #[arg(short, long, default_value = "m")]
    timeframe: Timeframe,

    /// Reference date (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Start of a custom window
    #[arg(long, requires = "to")]
    from: Option<NaiveDate>,

    /// End of a custom window
    #[arg(long, requires = "from")]
    to: Option<NaiveDate>,
}

impl From<WindowOpts> for WindowArgs {
    fn from(opts: WindowOpts) -> WindowArgs {
        let custom = opts.from.zip(opts.to).map(|(from, to)| DateRange::new(from, to));
        WindowArgs {
            timeframe: if custom.is_some() {
                Timeframe::Custom
            } else {
                opts.timeframe
            },
            date: opts.date,
            custom,
        }
    }
}

#[derive(Subcommand)]
enum ReceiptsCommands {
    /// List receipts in a window
    List {
        #[command(flatten)]
        window: WindowOpts,

        /// Only items in this spending category (name or id)
        #[arg(long)]
        category: Option<String>,

        #[arg(long, default_value_t = 10)]
        limit: usize,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },
    /// Show one receipt with its items
    Show { id: String },
    /// Delete a receipt
    Delete { id: String },
    /// File an item under a spending category
    Categorize {
        item_id: String,

        /// Category name or id; omit to clear
        category: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Show the configured user's profile
    Show,
    /// Change the preferred currency
    Currency { currency: Currency },
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display current holdings
    Holdings,
    /// List trades, optionally for one ticker
    Trades {
        /// EXCHANGE:SYMBOL
        #[arg(long)]
        ticker: Option<TickerRef>,
    },
    /// Display a fund's holdings, sectors and asset classes
    Funds {
        /// EXCHANGE:SYMBOL
        ticker: TickerRef,
    },
    /// Display historical prices
    Prices {
        /// EXCHANGE:SYMBOL
        ticker: TickerRef,

        /// 1W, 1M, 3M, YTD, 1Y or ALL
        #[arg(short, long, default_value = "1M")]
        timeframe: Timeframe,
    },
    /// Display the portfolio summary
    Metrics {
        /// 1W, 1M, 3M, YTD, 1Y or ALL
        #[arg(short, long, default_value = "1M")]
        timeframe: Timeframe,

        /// Number of daily rows to show
        #[arg(long, default_value_t = 7)]
        days: usize,
    },
    /// Upcoming earnings and dividend events for holdings or one ticker
    Events {
        /// EXCHANGE:SYMBOL
        #[arg(long)]
        ticker: Option<TickerRef>,

        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Display sectors, or one sector's industries
    Sectors {
        key: Option<String>,

        /// Also list the sector's tradeable tickers
        #[arg(long, requires = "key")]
        tickers: bool,
    },
    /// Search tickers
    Tickers {
        /// Matches symbol or name
        search: Option<String>,

        #[arg(long)]
        quote_type: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,

        #[arg(long)]
        offset: Option<usize>,
    },
    /// Display latest exchange rates, or one pair's history
    Forex {
        /// Quote currency of the history
        #[arg(long, default_value = "USD")]
        base: Currency,

        /// Show this pair's history instead of the latest rates
        target: Option<Currency>,

        /// Days of history
        #[arg(long, default_value_t = 30)]
        days: u64,
    },
    /// Display spending for a window
    Spending(WindowOpts),
    /// Manage receipts
    #[command(subcommand)]
    Receipts(ReceiptsCommands),
    /// Show or update the user profile
    #[command(subcommand)]
    User(UserCommands),
    /// Drop every cached query result
    ClearCache,
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Holdings => AppCommand::Holdings,
            Commands::Trades { ticker } => AppCommand::Trades { ticker },
            Commands::Funds { ticker } => AppCommand::Funds { ticker },
            Commands::Prices { ticker, timeframe } => AppCommand::Prices { ticker, timeframe },
            Commands::Metrics { timeframe, days } => AppCommand::Metrics { timeframe, days },
            Commands::Events { ticker, limit } => AppCommand::Events { ticker, limit },
            Commands::Sectors { key, tickers } => AppCommand::Sectors { key, tickers },
            Commands::Forex { base, target, days } => AppCommand::Forex { base, target, days },
            Commands::Tickers {
                search,
                quote_type,
                limit,
                offset,
            } => AppCommand::Tickers(TickerFilters {
                search,
                quote_type,
                limit: Some(limit),
                offset,
                ..Default::default()
            }),
            Commands::Spending(window) => AppCommand::Spending(window.into()),
            Commands::Receipts(receipts) => AppCommand::Receipts(match receipts {
                ReceiptsCommands::List {
                    window,
                    category,
                    limit,
                    offset,
                } => ReceiptsCommand::List {
                    window: window.into(),
                    page: Page { limit, offset },
                    category,
                },
                ReceiptsCommands::Show { id } => ReceiptsCommand::Show { id },
                ReceiptsCommands::Delete { id } => ReceiptsCommand::Delete { id },
                ReceiptsCommands::Categorize { item_id, category } => {
                    ReceiptsCommand::Categorize { item_id, category }
                }
            }),
            Commands::User(UserCommands::Show) => AppCommand::User(UserCommand::Show),
            Commands::User(UserCommands::Currency { currency }) => {
                AppCommand::User(UserCommand::Currency(currency))
            }
            Commands::ClearCache => AppCommand::ClearCache,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => mydash::cli::setup::setup_at_path(path),
            None => mydash::cli::setup::setup(),
        },
        Some(cmd) => mydash::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
