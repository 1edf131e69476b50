//! Application route paths shared by every front end.

use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    InvestingDashboard,
    InvestingManage,
    Holdings,
    Transactions,
    Research,
    Industry(String),
    Sector(String),
    Ticker { exchange: String, symbol: String },
    Alerts,
    SpendingDashboard,
    Receipts,
    Receipt(String),
    Settings,
}

impl Route {
    pub fn ticker(exchange: &str, symbol: &str) -> Self {
        Route::Ticker {
            exchange: exchange.to_string(),
            symbol: symbol.to_string(),
        }
    }

    pub fn receipt(id: &str) -> Self {
        Route::Receipt(id.to_string())
    }

    /// Absolute link for a front end served at `base_url`.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self)
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Home => f.write_str("/"),
            Route::Login => f.write_str("/login"),
            Route::InvestingDashboard => f.write_str("/investing"),
            Route::InvestingManage => f.write_str("/investing/manage"),
            Route::Holdings => f.write_str("/investing/holdings"),
            Route::Transactions => f.write_str("/investing/transactions"),
            Route::Research => f.write_str("/investing/research"),
            Route::Industry(slug) => write!(f, "/investing/industry/{slug}"),
            Route::Sector(slug) => write!(f, "/investing/sector/{slug}"),
            Route::Ticker { exchange, symbol } => {
                write!(f, "/investing/ticker/{exchange}/{symbol}")
            }
            Route::Alerts => f.write_str("/investing/alerts"),
            Route::SpendingDashboard => f.write_str("/spending"),
            Route::Receipts => f.write_str("/spending/receipts"),
            Route::Receipt(id) => write!(f, "/spending/receipts/{id}"),
            Route::Settings => f.write_str("/settings"),
        }
    }
}

impl FromStr for Route {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s
            .trim()
            .trim_end_matches('/')
            .split('/')
            .filter(|seg| !seg.is_empty())
            .collect();

        let route = match segments.as_slice() {
            [] => Route::Home,
            ["login"] => Route::Login,
            ["settings"] => Route::Settings,
            ["investing"] => Route::InvestingDashboard,
            ["investing", "manage"] => Route::InvestingManage,
            ["investing", "holdings"] => Route::Holdings,
            ["investing", "transactions"] => Route::Transactions,
            ["investing", "research"] => Route::Research,
            ["investing", "alerts"] => Route::Alerts,
            ["investing", "industry", slug] => Route::Industry(slug.to_string()),
            ["investing", "sector", slug] => Route::Sector(slug.to_string()),
            ["investing", "ticker", exchange, symbol] => Route::ticker(exchange, symbol),
            ["spending"] => Route::SpendingDashboard,
            ["spending", "receipts"] => Route::Receipts,
            ["spending", "receipts", id] => Route::receipt(id),
            _ => anyhow::bail!("Unknown route: {}", s),
        };
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Home.to_string(), "/");
        assert_eq!(
            Route::ticker("NASDAQ", "AAPL").to_string(),
            "/investing/ticker/NASDAQ/AAPL"
        );
        assert_eq!(Route::receipt("r-1").to_string(), "/spending/receipts/r-1");
        assert_eq!(
            Route::Sector("technology".into()).url("https://dash.example.com/"),
            "https://dash.example.com/investing/sector/technology"
        );
    }

    #[test]
    fn test_route_parsing() {
        assert_eq!(
            "/investing/ticker/NYSE/KO".parse::<Route>().unwrap(),
            Route::ticker("NYSE", "KO")
        );
        assert_eq!("/spending/receipts/".parse::<Route>().unwrap(), Route::Receipts);
        assert_eq!("/".parse::<Route>().unwrap(), Route::Home);
        assert!("/investing/ticker/NYSE".parse::<Route>().is_err());
    }
}
