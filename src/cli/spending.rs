use super::Session;
use super::ui::{self, StyleType};
use crate::api::receipts::{CategoryReceipt, Page, Receipt, ReceiptWithItems};
use crate::api::spending::{
    CategoryData, CurrencyBreakdown, SpendingCategory, SpendingSummary, TimeSeriesPoint,
};
use crate::core::format::format_category_name;
use crate::core::routes::Route;
use crate::queries::spending::Window;
use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

/// "€12.00 + $3.50", or a dash when nothing was spent.
pub fn amounts_text(amounts: &[CurrencyBreakdown]) -> String {
    if amounts.is_empty() {
        return "-".to_string();
    }
    amounts
        .iter()
        .map(|a| ui::money(a.amount, a.currency))
        .collect::<Vec<_>>()
        .join(" + ")
}

fn summary_text(summary: &SpendingSummary) -> String {
    format!(
        "{} {}\n{} {}",
        ui::style_text("Spent:", StyleType::TotalLabel),
        ui::style_text(
            &amounts_text(&summary.currency_breakdown),
            StyleType::TotalValue
        ),
        ui::style_text("Receipts:", StyleType::TotalLabel),
        summary.receipt_count
    )
}

pub fn time_series_table(points: &[TimeSeriesPoint]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Period"), ui::header_cell("Spent")]);
    for point in points {
        table.add_row(vec![
            Cell::new(&point.period),
            Cell::new(amounts_text(&point.amounts)),
        ]);
    }
    table
}

pub fn categories_table(categories: &[CategoryData]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Category"), ui::header_cell("Spent")]);
    for category in categories {
        table.add_row(vec![
            Cell::new(format_category_name(Some(&category.name), Some("Uncategorized"))),
            Cell::new(amounts_text(&category.amounts)),
        ]);
    }
    table
}

fn recent_table(receipts: &[Receipt]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Store"),
        ui::header_cell("Total"),
        ui::header_cell("Id"),
    ]);
    for receipt in receipts {
        table.add_row(vec![
            Cell::new(&receipt.purchase_date),
            Cell::new(receipt.store_name.as_deref().unwrap_or("-")),
            ui::money_cell(Some(receipt.total_amount), receipt.currency_code),
            Cell::new(ui::style_text(&receipt.id, StyleType::Subtle)),
        ]);
    }
    table
}

/// Summary, time series, categories and the latest receipts for a window.
pub async fn overview(session: &Session<'_>, window: Window) -> Result<()> {
    let queries = session.queries;
    let pb = ui::new_spinner("Fetching spending...");
    let result = tokio::try_join!(
        queries.spending_summary(window),
        queries.spending_time_series(window),
        queries.categories_detail(window),
        queries.recent_receipts(window),
    );
    pb.finish_and_clear();
    let (summary, series, categories, recent) = result?;

    let range = window.range();
    println!(
        "{}",
        ui::style_text(
            &format!(
                "Spending: {} ({} to {})",
                window.timeframe.period_name(window.date),
                range.start,
                range.end
            ),
            StyleType::Title
        )
    );
    println!("\n{}", summary_text(&summary));

    if summary.receipt_count == 0 {
        ui::print_link(session.app_url(), &Route::SpendingDashboard);
        return Ok(());
    }

    let series: Vec<TimeSeriesPoint> = series
        .into_iter()
        .filter(|p| !p.amounts.is_empty())
        .collect();
    ui::print_separator();
    println!("{}", time_series_table(&series));
    if !categories.is_empty() {
        println!("\n{}", categories_table(&categories));
    }
    if !recent.is_empty() {
        println!("\n{}", ui::style_text("Recent receipts", StyleType::TotalLabel));
        println!("{}", recent_table(&recent));
    }
    ui::print_link(session.app_url(), &Route::SpendingDashboard);
    Ok(())
}

pub fn receipts_table(receipts: &[ReceiptWithItems]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Store"),
        ui::header_cell("Items"),
        ui::header_cell("Total"),
        ui::header_cell("Id"),
    ]);
    for receipt in receipts {
        table.add_row(vec![
            Cell::new(&receipt.purchase_date),
            Cell::new(receipt.store_name.as_deref().unwrap_or("-")),
            Cell::new(receipt.items.len()),
            ui::money_cell(Some(receipt.total_amount), receipt.currency_code),
            Cell::new(ui::style_text(&receipt.id, StyleType::Subtle)),
        ]);
    }
    table
}

pub async fn list_receipts(session: &Session<'_>, window: Window, page: Page) -> Result<()> {
    let pb = ui::new_spinner("Fetching receipts...");
    let receipts = session.queries.receipts(window, page).await;
    pb.finish_and_clear();
    let receipts = receipts?;

    if receipts.is_empty() {
        println!("No receipts in this window.");
    } else {
        println!("{}", receipts_table(&receipts));
        if receipts.len() == page.limit {
            println!(
                "{}",
                ui::style_text(
                    &format!("More may follow; use --offset {}", page.offset + page.limit),
                    StyleType::Subtle
                )
            );
        }
    }
    ui::print_link(session.app_url(), &Route::Receipts);
    Ok(())
}

fn category_receipts_table(receipts: &[CategoryReceipt]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Store"),
        ui::header_cell("Item"),
        ui::header_cell("Qty"),
        ui::header_cell("Total"),
    ]);
    for receipt in receipts {
        for item in &receipt.items {
            table.add_row(vec![
                Cell::new(&receipt.purchase_date),
                Cell::new(receipt.store_name.as_deref().unwrap_or("-")),
                Cell::new(&item.readable_name),
                Cell::new(item.quantity),
                ui::money_cell(item.total_price, receipt.currency_code),
            ]);
        }
    }
    table
}

fn find_category<'a>(
    categories: &'a [SpendingCategory],
    name_or_id: &str,
) -> Option<&'a SpendingCategory> {
    categories
        .iter()
        .find(|c| c.id == name_or_id || c.name.eq_ignore_ascii_case(name_or_id))
}

async fn lookup_category(session: &Session<'_>, name_or_id: &str) -> Result<SpendingCategory> {
    let categories = session.queries.spending_categories().await?;
    find_category(&categories, name_or_id)
        .cloned()
        .with_context(|| format!("Unknown spending category '{name_or_id}'"))
}

/// Items bought in one category during the window.
pub async fn category_receipts(
    session: &Session<'_>,
    category: &str,
    window: Window,
) -> Result<()> {
    let pb = ui::new_spinner("Fetching category items...");
    let result = async {
        let category = lookup_category(session, category).await?;
        let receipts = session.queries.category_receipts(&category.id, window).await?;
        anyhow::Ok((category, receipts))
    }
    .await;
    pb.finish_and_clear();
    let (category, receipts) = result?;

    println!(
        "{}\n",
        ui::style_text(
            &format_category_name(Some(&category.name), None),
            StyleType::Title
        )
    );
    if receipts.is_empty() {
        println!("Nothing bought in this category.");
    } else {
        println!("{}", category_receipts_table(&receipts));
    }
    Ok(())
}

pub fn receipt_detail(receipt: &ReceiptWithItems) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Item"),
        ui::header_cell("Qty"),
        ui::header_cell("Unit"),
        ui::header_cell("Total"),
        ui::header_cell("Category"),
        ui::header_cell("Id"),
    ]);
    let currency = receipt.currency_code;
    for item in &receipt.items {
        let unit = if item.is_discounted {
            format!(
                "{} (was {})",
                ui::money(item.unit_price, currency),
                ui::money(item.original_unit_price, currency)
            )
        } else {
            ui::money(item.unit_price, currency)
        };
        table.add_row(vec![
            Cell::new(&item.readable_name),
            Cell::new(item.quantity),
            Cell::new(unit),
            ui::money_cell(item.total_price, currency),
            Cell::new(format_category_name(
                item.category_name.as_deref(),
                Some("Uncategorized"),
            )),
            Cell::new(ui::style_text(&item.id, StyleType::Subtle)),
        ]);
    }

    let mut output = format!(
        "{} {}\n\n",
        ui::style_text(
            receipt.store_name.as_deref().unwrap_or("Receipt"),
            StyleType::Title
        ),
        receipt.purchase_date
    );
    output.push_str(&table.to_string());
    if receipt.total_discount > 0.0 {
        output.push_str(&format!(
            "\n\nDiscount: {}",
            ui::money(receipt.total_discount, currency)
        ));
    }
    if let Some(tax) = receipt.tax_amount {
        output.push_str(&format!("\nTax: {}", ui::money(tax, currency)));
    }
    output.push_str(&format!(
        "\n{} {}",
        ui::style_text("Total:", StyleType::TotalLabel),
        ui::style_text(&ui::money(receipt.total_amount, currency), StyleType::TotalValue)
    ));
    if let Some(url) = &receipt.image_url {
        output.push_str(&format!("\nImage: {url}"));
    }
    output
}

pub async fn show_receipt(session: &Session<'_>, receipt_id: &str) -> Result<()> {
    let pb = ui::new_spinner("Fetching receipt...");
    let receipt = session.queries.receipt(Some(receipt_id)).await;
    pb.finish_and_clear();
    let receipt = receipt?
        .ready()
        .flatten()
        .with_context(|| format!("Receipt {receipt_id} not found"))?;

    println!("{}", receipt_detail(&receipt));
    ui::print_link(session.app_url(), &Route::receipt(receipt_id));
    Ok(())
}

pub async fn delete_receipt(session: &Session<'_>, receipt_id: &str) -> Result<()> {
    session.queries.delete_receipt(receipt_id).await?;
    println!("Deleted receipt {receipt_id}");
    Ok(())
}

/// Assigns `category` (a name or id) to an item, or clears it with `None`.
pub async fn categorize(
    session: &Session<'_>,
    item_id: &str,
    category: Option<&str>,
) -> Result<()> {
    let category = match category {
        Some(name_or_id) => Some(lookup_category(session, name_or_id).await?),
        None => None,
    };
    session
        .queries
        .set_item_category(item_id, category.as_ref().map(|c| c.id.as_str()))
        .await?;

    match category {
        Some(c) => println!(
            "Item {item_id} filed under {}",
            format_category_name(Some(&c.name), None)
        ),
        None => println!("Item {item_id} is now uncategorized"),
    }
    Ok(())
}
