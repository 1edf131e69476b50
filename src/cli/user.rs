use super::Session;
use super::ui::{self, StyleType};
use crate::api::portfolios::Portfolio;
use crate::api::users::{UpdateUser, User};
use crate::core::currency::Currency;
use crate::core::routes::Route;
use anyhow::{Context, Result};

pub fn profile_text(user: &User, portfolio: Option<&Portfolio>) -> String {
    let portfolio = portfolio
        .map(|p| p.name.clone().unwrap_or_else(|| p.id.clone()))
        .unwrap_or_else(|| "-".to_string());
    let rows = [
        ("Name", user.display_name()),
        ("Email", user.email.clone()),
        (
            "Currency",
            format!(
                "{} ({})",
                user.preferred_currency,
                user.preferred_currency.label()
            ),
        ),
        ("Portfolio", portfolio),
    ];

    let mut output = format!("{}\n\n", ui::style_text("Profile", StyleType::Title));
    for (label, value) in rows {
        output.push_str(&format!(
            "{:<10} {}\n",
            ui::style_text(label, StyleType::TotalLabel),
            value
        ));
    }
    output
}

pub async fn show(session: &Session<'_>) -> Result<()> {
    let user_id = session.user_id()?;
    let pb = ui::new_spinner("Fetching profile...");
    let result = tokio::try_join!(
        session.queries.user(Some(user_id)),
        session.queries.user_portfolio(Some(user_id)),
    );
    pb.finish_and_clear();
    let (user, portfolio) = result?;

    let user = user
        .ready()
        .flatten()
        .with_context(|| format!("User {user_id} not found"))?;
    let portfolio = portfolio.ready().flatten();

    print!("{}", profile_text(&user, portfolio.as_ref()));
    ui::print_link(session.app_url(), &Route::Settings);
    Ok(())
}

pub async fn set_currency(session: &Session<'_>, currency: Currency) -> Result<()> {
    let user_id = session.user_id()?;
    let update = UpdateUser {
        id: Some(user_id.to_string()),
        preferred_currency: Some(currency),
        ..Default::default()
    };
    let user = session
        .queries
        .update_user(&update)
        .await?
        .with_context(|| format!("User {user_id} not found"))?;

    println!(
        "Preferred currency set to {} ({})",
        user.preferred_currency,
        user.preferred_currency.label()
    );
    Ok(())
}
