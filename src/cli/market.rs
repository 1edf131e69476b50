use super::ui::{self, StyleType};
use super::{Session, TickerRef};
use crate::api::forex::{ForexRate, RateFilters};
use crate::api::market_indices::MarketIndex;
use crate::api::prices::HistoricalPrice;
use crate::api::sectors::SectorWithIndustries;
use crate::api::tickers::{Ticker, TickerFilters};
use crate::core::analytics::roi;
use crate::core::currency::Currency;
use crate::core::format::{format_category_name, format_large_number, format_percent};
use crate::core::routes::Route;
use crate::core::timeframe::Timeframe;
use crate::queries::FundsData;
use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use comfy_table::{Cell, Table};

async fn resolve_ticker(session: &Session<'_>, ticker: &TickerRef) -> Result<Ticker> {
    session
        .queries
        .ticker(&ticker.exchange, &ticker.symbol)
        .await?
        .with_context(|| format!("Ticker {ticker} not found"))
}

fn weight_table(title: &str, rows: impl IntoIterator<Item = (String, f64)>) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell(title), ui::header_cell("Weight")]);
    for (name, weight) in rows {
        table.add_row(vec![
            Cell::new(name),
            ui::format_optional_cell(Some(weight), |w| format!("{w:.2}%")),
        ]);
    }
    table
}

pub fn funds_tables(data: &FundsData) -> Vec<(&'static str, Table)> {
    let mut tables = Vec::new();
    if !data.top_holdings.is_empty() {
        tables.push((
            "Top Holdings",
            weight_table(
                "Holding",
                data.top_holdings
                    .iter()
                    .map(|h| (format!("{} ({})", h.holding_name, h.holding_symbol), h.weight)),
            ),
        ));
    }
    if !data.sector_weightings.is_empty() {
        tables.push((
            "Sector Weightings",
            weight_table(
                "Sector",
                data.sector_weightings
                    .iter()
                    .map(|s| (format_category_name(Some(&s.sector_name), None), s.weight)),
            ),
        ));
    }
    if !data.asset_classes.is_empty() {
        tables.push((
            "Asset Classes",
            weight_table(
                "Asset Class",
                data.asset_classes
                    .iter()
                    .map(|a| (format_category_name(Some(&a.asset_class), None), a.weight)),
            ),
        ));
    }
    tables
}

pub async fn funds(session: &Session<'_>, ticker: &TickerRef) -> Result<()> {
    let pb = ui::new_spinner("Fetching fund composition...");
    let result = async {
        let found = resolve_ticker(session, ticker).await?;
        let data = session.queries.funds_data(Some(&found.id)).await?;
        anyhow::Ok((found, data.unwrap_or_default()))
    }
    .await;
    pb.finish_and_clear();
    let (found, data) = result?;

    println!(
        "{}\n",
        ui::style_text(
            found.name.as_deref().unwrap_or(&found.symbol),
            StyleType::Title
        )
    );
    let tables = funds_tables(&data);
    if tables.is_empty() {
        println!("No fund data for {ticker}.");
    }
    for (title, table) in tables {
        println!("{}", ui::style_text(title, StyleType::TotalLabel));
        println!("{table}\n");
    }
    ui::print_link(
        session.app_url(),
        &Route::ticker(&ticker.exchange, &ticker.symbol),
    );
    Ok(())
}

pub fn prices_table(prices: &[HistoricalPrice]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Open"),
        ui::header_cell("High"),
        ui::header_cell("Low"),
        ui::header_cell("Close"),
        ui::header_cell("Volume"),
    ]);
    let price = |p: f64| format!("{p:.2}");
    for row in prices {
        table.add_row(vec![
            Cell::new(&row.date),
            ui::format_optional_cell(row.open_price, price),
            ui::format_optional_cell(row.high_price, price),
            ui::format_optional_cell(row.low_price, price),
            ui::format_optional_cell(row.close_price, price),
            ui::format_optional_cell(row.volume, |v| format!("{v:.0}")),
        ]);
    }
    table
}

/// Percentage change between the first and last close in the window.
pub fn price_change(prices: &[HistoricalPrice]) -> Option<f64> {
    let first = prices.iter().find_map(|p| p.close_price)?;
    let last = prices.iter().rev().find_map(|p| p.close_price)?;
    (first != 0.0).then(|| roi(first, last))
}

pub async fn prices(session: &Session<'_>, ticker: &TickerRef, timeframe: Timeframe) -> Result<()> {
    let pb = ui::new_spinner("Fetching prices...");
    let result = async {
        let found = resolve_ticker(session, ticker).await?;
        let prices = session
            .queries
            .historical_prices(Some(&found.id), timeframe)
            .await?;
        anyhow::Ok(prices.unwrap_or_default())
    }
    .await;
    pb.finish_and_clear();
    let prices = result?;

    println!(
        "{}\n",
        ui::style_text(
            &format!("{ticker} ({})", timeframe.label()),
            StyleType::Title
        )
    );
    if prices.is_empty() {
        println!("No prices in this window.");
        return Ok(());
    }
    println!("{}", prices_table(&prices));
    if let Some(change) = price_change(&prices) {
        println!(
            "\nChange: {}",
            ui::change_cell(Some(change)).content()
        );
    }
    ui::print_link(
        session.app_url(),
        &Route::ticker(&ticker.exchange, &ticker.symbol),
    );
    Ok(())
}

pub fn sectors_table(sectors: &[SectorWithIndustries]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Sector"),
        ui::header_cell("Market Cap"),
        ui::header_cell("Weight"),
        ui::header_cell("Companies"),
        ui::header_cell("Industries"),
    ]);
    for entry in sectors {
        let sector = &entry.sector;
        table.add_row(vec![
            Cell::new(&sector.name),
            Cell::new(format_large_number(sector.market_cap)),
            Cell::new(format_percent(sector.market_weight)),
            ui::format_optional_cell(sector.companies_count, |c| c.to_string()),
            Cell::new(entry.industries.len()),
        ]);
    }
    table
}

fn industries_table(entry: &SectorWithIndustries) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Industry"),
        ui::header_cell("Market Cap"),
        ui::header_cell("Weight"),
        ui::header_cell("Companies"),
    ]);
    for industry in &entry.industries {
        table.add_row(vec![
            Cell::new(&industry.name),
            Cell::new(format_large_number(industry.market_cap)),
            Cell::new(format_percent(industry.market_weight)),
            ui::format_optional_cell(industry.companies_count, |c| c.to_string()),
        ]);
    }
    table
}

fn benchmark_line(index: &MarketIndex) -> Option<String> {
    let symbol = index.symbol.as_deref()?;
    let listed = match index.exchange.as_deref() {
        Some(exchange) => format!("{exchange}:{symbol}"),
        None => symbol.to_string(),
    };
    Some(match index.name.as_deref() {
        Some(name) => format!("Benchmark: {listed} ({name})"),
        None => format!("Benchmark: {listed}"),
    })
}

/// Every sector, or one sector's industries when `key` is given. With
/// `list_tickers` the sector's tradeable tickers follow.
pub async fn sectors(session: &Session<'_>, key: Option<&str>, list_tickers: bool) -> Result<()> {
    let Some(key) = key else {
        let pb = ui::new_spinner("Fetching sectors...");
        let sectors = session.queries.sectors_with_industries().await;
        pb.finish_and_clear();
        println!("{}\n", ui::style_text("Sectors", StyleType::Title));
        println!("{}", sectors_table(&sectors?));
        ui::print_link(session.app_url(), &Route::Research);
        return Ok(());
    };

    let pb = ui::new_spinner("Fetching sector...");
    let result = tokio::try_join!(
        session.queries.sector_with_industries(key),
        session.queries.sector_index(key),
        async {
            if list_tickers {
                session.queries.sector_tickers(key).await
            } else {
                Ok(Vec::new())
            }
        },
    );
    pb.finish_and_clear();
    let (entry, index, tickers) = result?;
    let entry = entry.with_context(|| format!("Sector '{key}' not found"))?;

    println!("{}", ui::style_text(&entry.sector.name, StyleType::Title));
    if let Some(description) = &entry.sector.description {
        println!("{}", ui::style_text(description, StyleType::Subtle));
    }
    if let Some(line) = index.as_ref().and_then(benchmark_line) {
        println!("{line}");
    }
    println!("\n{}", industries_table(&entry));
    if list_tickers {
        if tickers.is_empty() {
            println!("\nNo tradeable tickers in this sector.");
        } else {
            println!("\n{}", tickers_table(&tickers));
        }
    }
    ui::print_link(session.app_url(), &Route::Sector(key.to_string()));
    Ok(())
}

pub fn tickers_table(tickers: &[Ticker]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Exchange"),
        ui::header_cell("Name"),
        ui::header_cell("Type"),
    ]);
    for ticker in tickers {
        table.add_row(vec![
            Cell::new(&ticker.symbol),
            Cell::new(ticker.exchange.as_deref().unwrap_or("-")),
            Cell::new(ticker.name.as_deref().unwrap_or("-")),
            Cell::new(&ticker.quote_type),
        ]);
    }
    table
}

pub async fn tickers(session: &Session<'_>, filters: &TickerFilters) -> Result<()> {
    let pb = ui::new_spinner("Searching tickers...");
    let tickers = session.queries.tickers(filters).await;
    pb.finish_and_clear();
    let tickers = tickers?;

    if tickers.is_empty() {
        println!("No tickers match.");
    } else {
        println!("{}", tickers_table(&tickers));
    }
    Ok(())
}

pub fn rates_table(rates: &[ForexRate]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Pair"),
        ui::header_cell("Rate"),
        ui::header_cell("Source"),
    ]);
    for rate in rates {
        table.add_row(vec![
            Cell::new(&rate.date),
            Cell::new(format!(
                "{}/{}",
                rate.base_currency.code(),
                rate.target_currency.code()
            )),
            ui::format_optional_cell(Some(rate.rate), |r| format!("{r:.4}")),
            Cell::new(rate.source.as_deref().unwrap_or("-")),
        ]);
    }
    table
}

/// Latest rates, or the history of one pair over the last `days` days.
pub async fn forex(
    session: &Session<'_>,
    base: Currency,
    target: Option<Currency>,
    days: u64,
    today: NaiveDate,
) -> Result<()> {
    let pb = ui::new_spinner("Fetching exchange rates...");
    let (title, rates) = match target {
        Some(target) => {
            let filters = RateFilters {
                base: Some(base),
                target: Some(target),
                start: today.checked_sub_days(Days::new(days)),
                end: Some(today),
            };
            let rates = session.queries.rate_history(&filters).await;
            (format!("{}/{}", base.code(), target.code()), rates)
        }
        None => (
            "Latest exchange rates".to_string(),
            session.queries.latest_rates().await,
        ),
    };
    pb.finish_and_clear();
    let rates = rates?;

    println!("{}\n", ui::style_text(&title, StyleType::Title));
    if rates.is_empty() {
        println!("No rates found.");
    } else {
        println!("{}", rates_table(&rates));
    }
    Ok(())
}
