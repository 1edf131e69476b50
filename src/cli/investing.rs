use super::ui::{self, StyleType};
use super::{Session, TickerRef};
use crate::api::calendar_events::CalendarEvent;
use crate::api::daily_metrics::PortfolioDailyMetric;
use crate::api::holdings::Holding;
use crate::api::trades::TradeView;
use crate::core::analytics::{PortfolioSummary, RiskMetrics};
use crate::core::currency::Currency;
use crate::core::format::{format_category_name, format_large_number};
use crate::core::routes::Route;
use crate::core::timeframe::Timeframe;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{Cell, Table};

pub fn holdings_table(holdings: &[Holding], currency: Currency) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Name"),
        ui::header_cell("Shares"),
        ui::header_cell("Price"),
        ui::header_cell("Value"),
        ui::header_cell("Gain/Loss"),
        ui::header_cell("1D"),
    ]);

    for holding in holdings {
        table.add_row(vec![
            Cell::new(holding.symbol.as_deref().unwrap_or("-")),
            Cell::new(holding.name.as_deref().unwrap_or("-")),
            ui::format_optional_cell(holding.shares, |s| format!("{s:.4}")),
            ui::money_cell(holding.current_price, currency),
            ui::money_cell(holding.current_market_value, currency),
            ui::change_cell(holding.total_gain_loss_percent),
            ui::change_cell(holding.price_change_1d_percent),
        ]);
    }
    table
}

pub async fn holdings(session: &Session<'_>) -> Result<()> {
    let currency = session.config.currency;
    let pb = ui::new_spinner("Fetching holdings...");
    let holdings = session.queries.holdings().await;
    pb.finish_and_clear();
    let holdings = holdings?;

    if holdings.is_empty() {
        println!("No holdings yet.");
        return Ok(());
    }

    let total: f64 = holdings
        .iter()
        .filter_map(|h| h.current_market_value)
        .sum();
    println!("{}\n", ui::style_text("Holdings", StyleType::Title));
    println!("{}", holdings_table(&holdings, currency));
    println!(
        "\nTotal Value ({}): {}",
        ui::style_text(currency.code(), StyleType::TotalLabel),
        ui::style_text(&ui::money(total, currency), StyleType::TotalValue)
    );
    ui::print_link(session.app_url(), &Route::Holdings);
    Ok(())
}

pub fn trades_table(trades: &[TradeView], currency: Currency) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Type"),
        ui::header_cell("Ticker"),
        ui::header_cell("Shares"),
        ui::header_cell("Price"),
        ui::header_cell("Amount"),
        ui::header_cell("Fee"),
    ]);

    for trade in trades {
        let ticker = match (&trade.exchange, &trade.symbol) {
            (Some(exchange), Some(symbol)) => format!("{exchange}:{symbol}"),
            (None, Some(symbol)) => symbol.clone(),
            _ => "-".to_string(),
        };
        let kind = trade
            .transaction_type
            .map(|t| format_category_name(Some(t.as_str()), None))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(trade.transaction_date.as_deref().unwrap_or("-")),
            Cell::new(kind),
            Cell::new(ticker),
            ui::format_optional_cell(trade.shares, |s| format!("{s:.4}")),
            ui::money_cell(trade.price_per_share, currency),
            ui::money_cell(trade.gross_transaction_amount, currency),
            ui::money_cell(trade.transaction_fee, currency),
        ]);
    }
    table
}

pub async fn trades(session: &Session<'_>, ticker: Option<&TickerRef>) -> Result<()> {
    let pb = ui::new_spinner("Fetching trades...");
    let trades = match ticker {
        Some(t) => session.queries.ticker_trades(&t.exchange, &t.symbol).await,
        None => session.queries.trades().await,
    };
    pb.finish_and_clear();
    let trades = trades?;

    let title = match ticker {
        Some(t) => format!("Trades for {t}"),
        None => "Trades".to_string(),
    };
    println!("{}\n", ui::style_text(&title, StyleType::Title));
    if trades.is_empty() {
        println!("No trades recorded.");
    } else {
        println!("{}", trades_table(&trades, session.config.currency));
    }

    let route = match ticker {
        Some(t) => Route::ticker(&t.exchange, &t.symbol),
        None => Route::Transactions,
    };
    ui::print_link(session.app_url(), &route);
    Ok(())
}

pub fn summary_lines(
    summary: &PortfolioSummary,
    timeframe: Timeframe,
    currency: Currency,
) -> String {
    let rows = [
        ("Total Value", ui::money(summary.total_value, currency)),
        ("Investments", ui::money(summary.investment_value, currency)),
        (
            "Cash",
            format!(
                "{} ({:.2}%)",
                ui::money(summary.cash_balance, currency),
                summary.cash_percentage
            ),
        ),
        (
            "Period Change",
            ui::styled_change(summary.period_change, summary.period_change_percent, currency),
        ),
        (
            "Total Return",
            ui::styled_change(summary.total_return, summary.total_return_percent, currency),
        ),
    ];

    let mut output = format!(
        "{}\n\n",
        ui::style_text(
            &format!("Portfolio ({})", timeframe.label()),
            StyleType::Title
        )
    );
    for (label, value) in rows {
        output.push_str(&format!(
            "{:<14} {}\n",
            ui::style_text(label, StyleType::TotalLabel),
            value
        ));
    }
    output
}

pub fn risk_lines(risk: &RiskMetrics) -> String {
    let rows = [
        ("Volatility", format!("{:.2}%", risk.volatility)),
        ("Sharpe", format!("{:.2}", risk.sharpe_ratio)),
        ("Sortino", format!("{:.2}", risk.sortino_ratio)),
        ("Max Drawdown", format!("{:.2}%", risk.max_drawdown)),
    ];
    let mut output = String::new();
    for (label, value) in rows {
        output.push_str(&format!(
            "{:<14} {}\n",
            ui::style_text(label, StyleType::TotalLabel),
            value
        ));
    }
    output
}

fn metrics_table(metrics: &[PortfolioDailyMetric], currency: Currency) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Total"),
        ui::header_cell("Invested"),
        ui::header_cell("Cash"),
        ui::header_cell("TWRR"),
    ]);
    for metric in metrics {
        table.add_row(vec![
            Cell::new(&metric.current_date),
            ui::money_cell(metric.total_portfolio_value, currency),
            ui::money_cell(metric.portfolio_value, currency),
            ui::money_cell(metric.cash_balance, currency),
            ui::change_cell(metric.daily_investment_twrr_percent),
        ]);
    }
    table
}

/// Portfolio summary for the window plus the most recent daily rows.
pub async fn metrics(session: &Session<'_>, timeframe: Timeframe, days: usize) -> Result<()> {
    let currency = session.config.currency;
    let pb = ui::new_spinner("Fetching portfolio metrics...");
    let metrics = session.queries.daily_metrics(timeframe).await;
    pb.finish_and_clear();
    let metrics = metrics?;
    let summary = PortfolioSummary::from_daily_metrics(&metrics);

    print!("{}", summary_lines(&summary, timeframe, currency));
    if metrics.len() > 1 {
        let risk = RiskMetrics::from_daily_metrics(&metrics, session.config.risk_free_rate);
        println!("\n{}", ui::style_text("Risk (daily)", StyleType::Subtle));
        print!("{}", risk_lines(&risk));
    }
    if metrics.is_empty() {
        println!("\nNo daily metrics for this window.");
    } else if days > 0 {
        ui::print_separator();
        let recent = &metrics[metrics.len().saturating_sub(days)..];
        println!("{}", metrics_table(recent, currency));
    }
    ui::print_link(session.app_url(), &Route::InvestingDashboard);
    Ok(())
}

pub fn events_table(events: &[CalendarEvent]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Ticker"),
        ui::header_cell("Event"),
        ui::header_cell("EPS Est."),
        ui::header_cell("Revenue Est."),
    ]);
    for event in events {
        let ticker = match (&event.ticker_exchange, &event.ticker_symbol) {
            (Some(exchange), Some(symbol)) => format!("{exchange}:{symbol}"),
            (None, Some(symbol)) => symbol.clone(),
            _ => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(event.date.as_deref().unwrap_or("-")),
            Cell::new(ticker),
            Cell::new(format_category_name(event.event_type.as_deref(), None)),
            ui::format_optional_cell(event.earnings_average, |e| format!("{e:.2}")),
            Cell::new(format_large_number(event.revenue_average)),
        ]);
    }
    table
}

/// Upcoming events for one ticker, or for every holding.
pub async fn events(
    session: &Session<'_>,
    ticker: Option<&TickerRef>,
    limit: usize,
    today: NaiveDate,
) -> Result<()> {
    let pb = ui::new_spinner("Fetching upcoming events...");
    let result = async {
        match ticker {
            Some(t) => {
                let found = session
                    .queries
                    .ticker(&t.exchange, &t.symbol)
                    .await?
                    .with_context(|| format!("Ticker {t} not found"))?;
                let events = session
                    .queries
                    .upcoming_events(today, limit, Some(&found.id))
                    .await?;
                anyhow::Ok(events)
            }
            None => anyhow::Ok(session.queries.holdings_events(today, limit).await?),
        }
    }
    .await;
    pb.finish_and_clear();
    let events: Vec<CalendarEvent> = result?;

    let title = match ticker {
        Some(t) => format!("Upcoming events for {t}"),
        None => "Upcoming events".to_string(),
    };
    println!("{}\n", ui::style_text(&title, StyleType::Title));
    if events.is_empty() {
        println!("Nothing scheduled.");
    } else {
        println!("{}", events_table(&events));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::trades::TransactionType;

    #[test]
    fn test_holdings_table_shows_missing_values_as_na() {
        let holding = Holding {
            symbol: Some("VOO".to_string()),
            name: Some("Vanguard S&P 500 ETF".to_string()),
            shares: Some(3.0),
            current_market_value: Some(1350.0),
            ..Default::default()
        };
        let rendered = holdings_table(&[holding], Currency::Usd).to_string();
        assert!(rendered.contains("VOO"));
        assert!(rendered.contains("$1,350.00"));
        assert!(rendered.contains("N/A"));
    }

    #[test]
    fn test_trades_table_formats_type_and_ticker() {
        let trade = TradeView {
            symbol: Some("AAPL".to_string()),
            exchange: Some("NASDAQ".to_string()),
            transaction_type: Some(TransactionType::Buy),
            transaction_date: Some("2024-06-03".to_string()),
            shares: Some(2.0),
            price_per_share: Some(190.5),
            ..Default::default()
        };
        let rendered = trades_table(&[trade], Currency::Usd).to_string();
        assert!(rendered.contains("NASDAQ:AAPL"));
        assert!(rendered.contains("Buy"));
        assert!(rendered.contains("$190.50"));
    }

    #[test]
    fn test_summary_lines() {
        let summary = PortfolioSummary {
            total_value: 1100.0,
            investment_value: 880.0,
            cash_balance: 220.0,
            period_change: 100.0,
            period_change_percent: 10.0,
            total_return: 80.0,
            total_return_percent: 10.0,
            cash_percentage: 20.0,
        };
        let output = summary_lines(&summary, Timeframe::OneMonth, Currency::Eur);
        assert!(output.contains("€1,100.00"));
        assert!(output.contains("(20.00%)"));
        assert!(output.contains("+€100.00"));
    }

    #[test]
    fn test_risk_lines() {
        let risk = RiskMetrics {
            volatility: 1.25,
            sharpe_ratio: 0.4,
            sortino_ratio: 0.61,
            max_drawdown: 12.0,
        };
        let output = risk_lines(&risk);
        assert!(output.contains("1.25%"));
        assert!(output.contains("0.61"));
        assert!(output.contains("12.00%"));
    }

    #[test]
    fn test_events_table() {
        let event = CalendarEvent {
            ticker_symbol: Some("AAPL".to_string()),
            ticker_exchange: Some("NASDAQ".to_string()),
            event_type: Some("earnings".to_string()),
            date: Some("2024-08-01".to_string()),
            earnings_average: Some(1.5),
            ..Default::default()
        };
        let rendered = events_table(&[event]).to_string();
        assert!(rendered.contains("NASDAQ:AAPL"));
        assert!(rendered.contains("Earnings"));
        assert!(rendered.contains("1.50"));
    }
}
