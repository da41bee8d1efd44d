//! Per-date performance ledger
//!
//! The table shown on screen and written to CSV. Columns carry a two-level
//! label: the holding (`"QQQ"`) and the attribute (`"Price"`, `"Shares"`), with
//! the aggregate columns grouped under `"Portfolio Metrics"`. Every numeric cell
//! is rendered through [`Ledger::format_value`] so the HTML table and the CSV
//! file agree digit for digit.

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::PortfolioConfig;
use crate::engine::{round_to, PortfolioTimeline};
use crate::errors::LedgerError;
use crate::prices::PriceSeries;

pub const METRICS_GROUP: &str = "Portfolio Metrics";
pub const TOTAL_VALUE: &str = "Total Value ($)";
pub const DAILY_GL_DOLLARS: &str = "Daily G/L ($)";
pub const DAILY_GL_PCT: &str = "Daily G/L (%)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub group: String,
    pub attribute: String,
}

impl Column {
    fn new(group: &str, attribute: &str) -> Self {
        Column {
            group: group.to_string(),
            attribute: attribute.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRow {
    pub date: NaiveDate,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ledger {
    pub precision: u32,
    pub columns: Vec<Column>,
    pub rows: Vec<LedgerRow>,
}

impl Ledger {
    pub fn build(
        portfolio: &PortfolioConfig,
        prices: &PriceSeries,
        timeline: &PortfolioTimeline,
    ) -> Result<Self, LedgerError> {
        let precision = portfolio.precision;
        let quantity_label = portfolio.kind.quantity_label();

        let mut columns = Vec::with_capacity(portfolio.holdings.len() * 2 + 3);
        let mut holdings = Vec::with_capacity(portfolio.holdings.len());
        for holding in &portfolio.holdings {
            let quantity = timeline.plan.quantity(&holding.symbol);
            let column = prices.column(&holding.symbol);
            let (Some(quantity), Some(column)) = (quantity, column) else {
                return Err(LedgerError::MissingData {
                    symbol: holding.symbol.clone(),
                    date: timeline.plan.allocation_date,
                });
            };
            columns.push(Column::new(holding.label(), "Price"));
            columns.push(Column::new(holding.label(), quantity_label));
            holdings.push((quantity, column));
        }
        columns.push(Column::new(METRICS_GROUP, TOTAL_VALUE));
        columns.push(Column::new(METRICS_GROUP, DAILY_GL_DOLLARS));
        columns.push(Column::new(METRICS_GROUP, DAILY_GL_PCT));

        if timeline.rows.len() != prices.len() {
            return Err(LedgerError::config(format!(
                "timeline has {} rows but the price series has {}",
                timeline.rows.len(),
                prices.len()
            )));
        }

        let rows = timeline
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut values = Vec::with_capacity(columns.len());
                for (quantity, column) in &holdings {
                    values.push(round_to(column[i], precision));
                    values.push(*quantity);
                }
                values.push(row.total_value);
                values.push(row.daily_gl_dollars);
                values.push(row.daily_gl_pct);
                LedgerRow {
                    date: row.date,
                    values,
                }
            })
            .collect();

        Ok(Ledger {
            precision,
            columns,
            rows,
        })
    }

    /// Fixed-point text with exactly `precision` decimals
    pub fn format_value(&self, value: f64) -> String {
        // no "-0.00"
        let value = round_to(value, self.precision);
        let value = if value == 0.0 { 0.0 } else { value };
        format!("{:.*}", self.precision as usize, value)
    }

    pub fn formatted_rows(&self) -> impl Iterator<Item = (NaiveDate, Vec<String>)> + '_ {
        self.rows.iter().map(|row| {
            (
                row.date,
                row.values.iter().map(|v| self.format_value(*v)).collect(),
            )
        })
    }

    /// Distinct column groups in order, with how many columns each spans
    pub fn groups(&self) -> Vec<(&str, usize)> {
        let mut groups: Vec<(&str, usize)> = Vec::new();
        for column in &self.columns {
            if let Some((group, span)) = groups.last_mut() {
                if *group == column.group {
                    *span += 1;
                    continue;
                }
            }
            groups.push((&column.group, 1));
        }
        groups
    }
}
