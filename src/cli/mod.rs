//! Terminal views over the query layer.

pub mod investing;
pub mod market;
pub mod setup;
pub mod spending;
pub mod ui;
pub mod user;

use crate::core::config::AppConfig;
use crate::queries::QueryClient;
use anyhow::Context;
use std::fmt::Display;
use std::str::FromStr;

/// What every view needs: the cached queries and the loaded configuration.
pub struct Session<'a> {
    pub queries: &'a QueryClient,
    pub config: &'a AppConfig,
}

impl Session<'_> {
    pub fn app_url(&self) -> Option<&str> {
        self.config.app_url.as_deref()
    }

    pub fn user_id(&self) -> anyhow::Result<&str> {
        self.config
            .user_id
            .as_deref()
            .context("No user_id configured; add one to the configuration file")
    }
}

/// A listing written as `EXCHANGE:SYMBOL`, e.g. `NASDAQ:AAPL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerRef {
    pub exchange: String,
    pub symbol: String,
}

impl FromStr for TickerRef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((exchange, symbol)) if !exchange.is_empty() && !symbol.is_empty() => {
                Ok(TickerRef {
                    exchange: exchange.to_uppercase(),
                    symbol: symbol.to_uppercase(),
                })
            }
            _ => anyhow::bail!("Expected EXCHANGE:SYMBOL, got '{s}'"),
        }
    }
}

impl Display for TickerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.exchange, self.symbol)
    }
}
