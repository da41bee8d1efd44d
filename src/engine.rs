//! Fixed-allocation valuation
//!
//! The budget of every holding is converted into a locked quantity on the
//! allocation date and never rebalanced. From there each trading date gets the
//! aggregate portfolio value and its day-over-day change.
//!
//! The value on the allocation date is pinned to the nominal total budget: the
//! rounded quantities rarely buy back exactly the budget, and the ledger should
//! start from the round number rather than from `499999.97`.
//!
//! Usage:
//! ```
//! use dual_ledger::config::DashboardConfig;
//! use dual_ledger::engine::compute;
//! # fn run(prices: &dual_ledger::prices::PriceSeries) -> Result<(), dual_ledger::errors::LedgerError> {
//! let config = DashboardConfig::default();
//! let timeline = compute(prices, &config.portfolios[0])?;
//! println!("{:?}", timeline.rows.last());
//! # Ok(())
//! # }
//! ```

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::PortfolioConfig;
use crate::errors::LedgerError;
use crate::prices::PriceSeries;

/// Allocation prices at or below zero are lifted to this before dividing
pub const MIN_ALLOCATION_PRICE: f64 = 0.01;

/// Rounds half to even at `precision` decimals
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round_ties_even() / factor
}

/// Locked quantity of one holding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub symbol: String,
    /// Price used for the division, after clamping
    pub price: f64,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationPlan {
    pub allocation_date: NaiveDate,
    pub allocations: Vec<Allocation>,
}

impl AllocationPlan {
    pub fn quantity(&self, symbol: &str) -> Option<f64> {
        self.allocations
            .iter()
            .find(|a| a.symbol == symbol)
            .map(|a| a.quantity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineRow {
    pub date: NaiveDate,
    pub total_value: f64,
    pub daily_gl_dollars: f64,
    pub daily_gl_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioTimeline {
    pub plan: AllocationPlan,
    pub rows: Vec<TimelineRow>,
}

impl PortfolioTimeline {
    pub fn row(&self, date: NaiveDate) -> Option<&TimelineRow> {
        self.rows.iter().find(|r| r.date == date)
    }
}

/// Headline numbers for the metric cards
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub as_of: NaiveDate,
    pub current_value: f64,
    pub total_gl_dollars: f64,
    pub total_gl_pct: f64,
    pub daily_gl_dollars: f64,
    pub daily_gl_pct: f64,
}

fn locked_quantities(
    prices: &PriceSeries,
    portfolio: &PortfolioConfig,
    index: usize,
) -> Result<Vec<Allocation>, LedgerError> {
    let multiplier = portfolio.multiplier();
    let date = prices.dates()[index];
    portfolio
        .holdings
        .iter()
        .map(|holding| -> Result<Allocation, LedgerError> {
            let quoted = prices
                .price(index, &holding.symbol)
                .ok_or_else(|| LedgerError::MissingData {
                    symbol: holding.symbol.clone(),
                    date,
                })?;
            let price = if quoted.is_finite() && quoted > 0.0 {
                quoted
            } else {
                tracing::warn!(
                    symbol = %holding.symbol,
                    %date,
                    quoted,
                    "allocation price is not positive, clamping to {MIN_ALLOCATION_PRICE}"
                );
                MIN_ALLOCATION_PRICE
            };
            Ok(Allocation {
                symbol: holding.symbol.clone(),
                price,
                quantity: round_to(
                    portfolio.budget_per_symbol / (price * multiplier),
                    portfolio.precision,
                ),
            })
        })
        .collect()
}

/// Values a buy-and-hold portfolio over every date of `prices`.
///
/// Errors with `Configuration` when the allocation date is outside the series
/// and with `MissingData` when a holding has no column in it.
pub fn compute(
    prices: &PriceSeries,
    portfolio: &PortfolioConfig,
) -> Result<PortfolioTimeline, LedgerError> {
    let allocation_index = prices.resolve_allocation_index(portfolio.allocation_date)?;
    let allocations = locked_quantities(prices, portfolio, allocation_index)?;
    let multiplier = portfolio.multiplier();
    let precision = portfolio.precision;

    let mut columns = Vec::with_capacity(allocations.len());
    for allocation in &allocations {
        let column = prices
            .column(&allocation.symbol)
            .ok_or_else(|| LedgerError::MissingData {
                symbol: allocation.symbol.clone(),
                date: prices.dates()[allocation_index],
            })?;
        columns.push((allocation.quantity, column));
    }

    let mut values: Vec<f64> = (0..prices.len())
        .map(|i| {
            let raw = columns
                .iter()
                .fold(0.0, |acc, (quantity, column)| {
                    acc + quantity * column[i] * multiplier
                });
            round_to(raw, precision)
        })
        .collect();
    values[allocation_index] = portfolio.total_budget;

    let rows = prices
        .dates()
        .iter()
        .enumerate()
        .map(|(i, date)| {
            let (daily_gl_dollars, daily_gl_pct) = match i.checked_sub(1).map(|p| values[p]) {
                None => (0.0, 0.0),
                Some(previous) => {
                    let pct = if previous == 0.0 {
                        0.0
                    } else {
                        round_to((values[i] / previous - 1.0) * 100.0, precision)
                    };
                    (round_to(values[i] - previous, precision), pct)
                }
            };
            TimelineRow {
                date: *date,
                total_value: values[i],
                daily_gl_dollars,
                daily_gl_pct,
            }
        })
        .collect();

    tracing::debug!(
        portfolio = %portfolio.id,
        allocation_date = %prices.dates()[allocation_index],
        rows = prices.len(),
        "computed timeline"
    );

    Ok(PortfolioTimeline {
        plan: AllocationPlan {
            allocation_date: prices.dates()[allocation_index],
            allocations,
        },
        rows,
    })
}

/// Summary as of the last row, `None` for an empty timeline
pub fn summarize(timeline: &PortfolioTimeline, portfolio: &PortfolioConfig) -> Option<PortfolioSummary> {
    let last = timeline.rows.last()?;
    let precision = portfolio.precision;
    Some(PortfolioSummary {
        as_of: last.date,
        current_value: last.total_value,
        total_gl_dollars: round_to(last.total_value - portfolio.total_budget, precision),
        total_gl_pct: round_to(
            (last.total_value / portfolio.total_budget - 1.0) * 100.0,
            precision,
        ),
        daily_gl_dollars: last.daily_gl_dollars,
        daily_gl_pct: last.daily_gl_pct,
    })
}
