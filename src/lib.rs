pub mod api;
pub mod backend;
pub mod cli;
pub mod core;
pub mod queries;
pub mod store;

use crate::api::Api;
use crate::api::receipts::Page;
use crate::api::tickers::TickerFilters;
use crate::backend::RestClient;
use crate::cli::{Session, TickerRef};
use crate::core::config::AppConfig;
use crate::core::currency::Currency;
use crate::core::timeframe::{DateRange, Timeframe};
use crate::queries::QueryClient;
use crate::queries::spending::Window;
use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, info};

/// Date window for spending views. `date` defaults to today; `custom`
/// applies to the `custom` timeframe.
#[derive(Debug, Clone, Copy)]
pub struct WindowArgs {
    pub timeframe: Timeframe,
    pub date: Option<NaiveDate>,
    pub custom: Option<DateRange>,
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

impl WindowArgs {
    fn resolve(&self) -> Window {
        let date = self.date.unwrap_or_else(today);
        Window {
            custom: self.custom,
            ..Window::new(date, self.timeframe)
        }
    }
}

pub enum ReceiptsCommand {
    List {
        window: WindowArgs,
        page: Page,
        category: Option<String>,
    },
    Show {
        id: String,
    },
    Delete {
        id: String,
    },
    Categorize {
        item_id: String,
        category: Option<String>,
    },
}

pub enum UserCommand {
    Show,
    Currency(Currency),
}

pub enum AppCommand {
    Holdings,
    Trades { ticker: Option<TickerRef> },
    Funds { ticker: TickerRef },
    Prices { ticker: TickerRef, timeframe: Timeframe },
    Metrics { timeframe: Timeframe, days: usize },
    Events { ticker: Option<TickerRef>, limit: usize },
    Sectors { key: Option<String>, tickers: bool },
    Tickers(TickerFilters),
    Forex { base: Currency, target: Option<Currency>, days: u64 },
    Spending(WindowArgs),
    Receipts(ReceiptsCommand),
    User(UserCommand),
    ClearCache,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("mydash starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config for backend {}", config.backend.url);

    let client = RestClient::new(&config.backend)?;
    let cache = store::open_cache(&config);
    let queries = QueryClient::new(Api::new(client), cache, &config.query);
    let session = Session {
        queries: &queries,
        config: &config,
    };

    match command {
        AppCommand::Holdings => cli::investing::holdings(&session).await,
        AppCommand::Trades { ticker } => cli::investing::trades(&session, ticker.as_ref()).await,
        AppCommand::Funds { ticker } => cli::market::funds(&session, &ticker).await,
        AppCommand::Prices { ticker, timeframe } => {
            cli::market::prices(&session, &ticker, timeframe).await
        }
        AppCommand::Metrics { timeframe, days } => {
            cli::investing::metrics(&session, timeframe, days).await
        }
        AppCommand::Events { ticker, limit } => {
            cli::investing::events(&session, ticker.as_ref(), limit, today()).await
        }
        AppCommand::Sectors { key, tickers } => {
            cli::market::sectors(&session, key.as_deref(), tickers).await
        }
        AppCommand::Tickers(filters) => cli::market::tickers(&session, &filters).await,
        AppCommand::Forex { base, target, days } => {
            cli::market::forex(&session, base, target, days, today()).await
        }
        AppCommand::Spending(window) => cli::spending::overview(&session, window.resolve()).await,
        AppCommand::Receipts(command) => match command {
            ReceiptsCommand::List {
                window,
                category: Some(category),
                ..
            } => cli::spending::category_receipts(&session, &category, window.resolve()).await,
            ReceiptsCommand::List {
                window,
                page,
                category: None,
            } => cli::spending::list_receipts(&session, window.resolve(), page).await,
            ReceiptsCommand::Show { id } => cli::spending::show_receipt(&session, &id).await,
            ReceiptsCommand::Delete { id } => cli::spending::delete_receipt(&session, &id).await,
            ReceiptsCommand::Categorize { item_id, category } => {
                cli::spending::categorize(&session, &item_id, category.as_deref()).await
            }
        },
        AppCommand::User(UserCommand::Show) => cli::user::show(&session).await,
        AppCommand::User(UserCommand::Currency(currency)) => {
            cli::user::set_currency(&session, currency).await
        }
        AppCommand::ClearCache => {
            queries.clear_cache().await?;
            println!("Cache cleared.");
            Ok(())
        }
    }
}
