//! Portfolio arithmetic over daily metric rows.
use crate::api::daily_metrics::PortfolioDailyMetric;
use serde::Serialize;
use tracing::debug;

/// Headline numbers for a window of daily metrics, first row vs last row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub total_value: f64,
    pub investment_value: f64,
    pub cash_balance: f64,
    pub period_change: f64,
    pub period_change_percent: f64,
    pub total_return: f64,
    pub total_return_percent: f64,
    pub cash_percentage: f64,
}

impl PortfolioSummary {
    /// Expects rows ordered by date ascending. An empty slice gives all zeros.
    pub fn from_daily_metrics(metrics: &[PortfolioDailyMetric]) -> Self {
        let (Some(first), Some(last)) = (metrics.first(), metrics.last()) else {
            return Self::default();
        };

        let investment_value = last.portfolio_value.unwrap_or(0.0);
        let cash_balance = last.cash_balance.unwrap_or(0.0);
        let total_value = last.total_portfolio_value.unwrap_or(0.0);
        let cost_basis = last.cost_basis.unwrap_or(0.0);

        // A missing or zero opening value means no change over the window.
        let previous_total = first
            .total_portfolio_value
            .filter(|v| *v != 0.0)
            .unwrap_or(total_value);

        let period_change = total_value - previous_total;
        let total_return = investment_value - cost_basis;

        let summary = PortfolioSummary {
            total_value,
            investment_value,
            cash_balance,
            period_change,
            period_change_percent: percent_of(period_change, previous_total),
            total_return,
            total_return_percent: percent_of(total_return, cost_basis),
            cash_percentage: percent_of(cash_balance, total_value),
        };
        debug!(rows = metrics.len(), ?summary, "Computed portfolio summary");
        summary
    }
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

/// Simple return in percent. Zero when there was no initial value.
pub fn roi(initial_value: f64, current_value: f64) -> f64 {
    if initial_value == 0.0 {
        return 0.0;
    }
    (current_value - initial_value) / initial_value * 100.0
}

/// Annualizes a percentage return earned over `years`.
pub fn annualized_roi(roi_percent: f64, years: f64) -> f64 {
    if years <= 0.0 {
        return 0.0;
    }
    ((1.0 + roi_percent / 100.0).powf(1.0 / years) - 1.0) * 100.0
}

/// One sub-period for [`time_weighted_return`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Period {
    pub start_value: f64,
    pub end_value: f64,
    /// Net external flow during the period (deposits positive).
    pub cash_flow: f64,
}

/// Chains sub-period returns, removing the effect of cash flows.
/// Periods that start at zero are skipped.
pub fn time_weighted_return(periods: &[Period]) -> f64 {
    let growth = periods
        .iter()
        .filter(|p| p.start_value != 0.0)
        .fold(1.0, |acc, p| {
            acc * (1.0 + (p.end_value - p.start_value - p.cash_flow) / p.start_value)
        });
    (growth - 1.0) * 100.0
}

/// Excess return per unit of volatility. Zero when there is no volatility.
pub fn sharpe_ratio(portfolio_return: f64, risk_free_rate: f64, std_dev: f64) -> f64 {
    if std_dev == 0.0 {
        return 0.0;
    }
    (portfolio_return - risk_free_rate) / std_dev
}

/// Like [`sharpe_ratio`] but only downside volatility counts.
pub fn sortino_ratio(portfolio_return: f64, risk_free_rate: f64, downside_dev: f64) -> f64 {
    if downside_dev == 0.0 {
        return 0.0;
    }
    (portfolio_return - risk_free_rate) / downside_dev
}

/// Largest peak-to-trough decline in percent. Non-positive peaks are ignored.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &value in values {
        peak = peak.max(value);
        if peak > 0.0 {
            worst = worst.max((peak - value) / peak);
        }
    }
    worst * 100.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Root mean square of the shortfalls below `target`, over all observations.
pub fn downside_deviation(values: &[f64], target: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let shortfall = values
        .iter()
        .map(|v| (v - target).min(0.0).powi(2))
        .sum::<f64>();
    (shortfall / values.len() as f64).sqrt()
}

/// Risk figures over the daily returns of a window, in daily terms.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskMetrics {
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
}

impl RiskMetrics {
    /// `risk_free_rate` is a daily rate in percent, like the returns.
    pub fn from_daily_metrics(metrics: &[PortfolioDailyMetric], risk_free_rate: f64) -> Self {
        let returns: Vec<f64> = metrics
            .iter()
            .filter_map(|m| m.daily_investment_twrr_percent)
            .collect();
        let values: Vec<f64> = metrics
            .iter()
            .filter_map(|m| m.total_portfolio_value)
            .collect();

        let average = mean(&returns);
        let volatility = std_dev(&returns);
        RiskMetrics {
            volatility,
            sharpe_ratio: sharpe_ratio(average, risk_free_rate, volatility),
            sortino_ratio: sortino_ratio(
                average,
                risk_free_rate,
                downside_deviation(&returns, risk_free_rate),
            ),
            max_drawdown: max_drawdown(&values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(
        date: &str,
        total: f64,
        invested: f64,
        cash: f64,
        cost: f64,
    ) -> PortfolioDailyMetric {
        PortfolioDailyMetric {
            current_date: date.to_string(),
            total_portfolio_value: Some(total),
            portfolio_value: Some(invested),
            cash_balance: Some(cash),
            cost_basis: Some(cost),
            ..Default::default()
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_summary_empty() {
        assert_eq!(
            PortfolioSummary::from_daily_metrics(&[]),
            PortfolioSummary::default()
        );
    }

    #[test]
    fn test_summary_first_vs_last() {
        let rows = vec![
            metric("2024-05-01", 10_000.0, 9_000.0, 1_000.0, 8_000.0),
            metric("2024-05-15", 10_500.0, 9_400.0, 1_100.0, 8_000.0),
            metric("2024-05-31", 11_000.0, 9_900.0, 1_100.0, 8_800.0),
        ];
        let summary = PortfolioSummary::from_daily_metrics(&rows);

        assert_eq!(summary.total_value, 11_000.0);
        assert_eq!(summary.investment_value, 9_900.0);
        assert_eq!(summary.period_change, 1_000.0);
        assert!(close(summary.period_change_percent, 10.0));
        assert!(close(summary.total_return, 1_100.0));
        assert!(close(summary.total_return_percent, 12.5));
        assert!(close(summary.cash_percentage, 10.0));
    }

    #[test]
    fn test_summary_zero_opening_value_means_no_change() {
        let rows = vec![
            metric("2024-05-01", 0.0, 0.0, 0.0, 0.0),
            metric("2024-05-31", 500.0, 0.0, 500.0, 0.0),
        ];
        let summary = PortfolioSummary::from_daily_metrics(&rows);
        assert_eq!(summary.period_change, 0.0);
        assert_eq!(summary.period_change_percent, 0.0);
        assert_eq!(summary.total_return_percent, 0.0);
        assert!(close(summary.cash_percentage, 100.0));
    }

    #[test]
    fn test_roi() {
        assert!(close(roi(100.0, 150.0), 50.0));
        assert!(close(roi(200.0, 150.0), -25.0));
        assert_eq!(roi(0.0, 150.0), 0.0);
    }

    #[test]
    fn test_annualized_roi() {
        // 21% over two years is 10% a year.
        assert!(close(annualized_roi(21.0, 2.0), 10.0));
        assert!(close(annualized_roi(10.0, 1.0), 10.0));
        assert_eq!(annualized_roi(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_time_weighted_return_ignores_cash_flows() {
        let periods = [
            Period {
                start_value: 1_000.0,
                end_value: 1_100.0,
                cash_flow: 0.0,
            },
            // 500 deposited, 10% growth on 1_100
            Period {
                start_value: 1_100.0,
                end_value: 1_710.0,
                cash_flow: 500.0,
            },
            Period {
                start_value: 0.0,
                end_value: 0.0,
                cash_flow: 0.0,
            },
        ];
        assert!(close(time_weighted_return(&periods), 21.0));
        assert_eq!(time_weighted_return(&[]), 0.0);
    }

    #[test]
    fn test_sharpe_and_sortino() {
        assert!(close(sharpe_ratio(12.0, 2.0, 5.0), 2.0));
        assert_eq!(sharpe_ratio(12.0, 2.0, 0.0), 0.0);
        assert!(close(sortino_ratio(12.0, 2.0, 4.0), 2.5));
        assert_eq!(sortino_ratio(12.0, 2.0, 0.0), 0.0);
    }

    #[test]
    fn test_max_drawdown() {
        // peak 120, trough 90
        assert!(close(max_drawdown(&[100.0, 120.0, 90.0, 110.0, 130.0]), 25.0));
        assert_eq!(max_drawdown(&[100.0, 110.0, 120.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
        assert_eq!(max_drawdown(&[0.0, 0.0, 50.0]), 0.0);
    }

    #[test]
    fn test_deviations() {
        assert!(close(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0));
        assert_eq!(std_dev(&[3.0]), 0.0);
        // shortfalls 1 and 3 over four observations
        assert!(close(downside_deviation(&[1.0, -1.0, 2.0, -3.0], 0.0), 2.5_f64.sqrt()));
    }

    #[test]
    fn test_risk_metrics_from_daily_rows() {
        let mut rows = vec![
            metric("2024-05-01", 1_000.0, 1_000.0, 0.0, 1_000.0),
            metric("2024-05-02", 1_100.0, 1_100.0, 0.0, 1_000.0),
            metric("2024-05-03", 990.0, 990.0, 0.0, 1_000.0),
        ];
        rows[1].daily_investment_twrr_percent = Some(10.0);
        rows[2].daily_investment_twrr_percent = Some(-10.0);

        let risk = RiskMetrics::from_daily_metrics(&rows, 0.0);
        assert!(close(risk.volatility, 10.0));
        assert_eq!(risk.sharpe_ratio, 0.0);
        assert!(close(risk.max_drawdown, 10.0));
        assert_eq!(RiskMetrics::from_daily_metrics(&[], 0.0), RiskMetrics::default());
    }
}
