//! Price history
//!
//! [`PriceTable`] is what the provider hands back: closing prices keyed by
//! trading date and symbol, with holes wherever a symbol did not trade (option
//! contracts are often thin). [`PriceSeries`] is the dense form the valuation
//! engine works on: one column per symbol, a value on every date.
//!
//! Filling is forward first (carry the last known close over a gap) and then
//! backward (dates before a symbol's first trade take its first close).

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::errors::LedgerError;

/// Raw closes as fetched, possibly sparse
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceTable {
    // a BTreeMap because the rows must come out in date order
    rows: BTreeMap<NaiveDate, BTreeMap<String, f64>>,
    symbols: BTreeSet<String>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a symbol even if it ends up with no observations
    pub fn add_symbol(&mut self, symbol: &str) {
        self.symbols.insert(symbol.to_string());
    }

    /// Records a close; non-finite values count as missing
    pub fn insert(&mut self, symbol: &str, date: NaiveDate, close: f64) {
        self.add_symbol(symbol);
        if close.is_finite() {
            self.rows
                .entry(date)
                .or_default()
                .insert(symbol.to_string(), close);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.rows.keys()
    }

    pub fn get(&self, date: NaiveDate, symbol: &str) -> Option<f64> {
        self.rows.get(&date).and_then(|row| row.get(symbol)).copied()
    }

    /// Builds the dense series for `symbols` over every date in the table.
    ///
    /// A symbol that never traded in the window cannot be filled and is
    /// reported as missing on the first date.
    pub fn fill(&self, symbols: &[String]) -> Result<PriceSeries, LedgerError> {
        let dates: Vec<NaiveDate> = self.rows.keys().copied().collect();
        let mut columns = BTreeMap::new();
        for symbol in symbols {
            let mut column: Vec<Option<f64>> = dates
                .iter()
                .map(|date| self.get(*date, symbol))
                .collect();
            forward_fill(&mut column);
            backward_fill(&mut column);
            let mut filled = Vec::with_capacity(column.len());
            for (i, value) in column.into_iter().enumerate() {
                match value {
                    Some(v) => filled.push(v),
                    None => {
                        return Err(LedgerError::MissingData {
                            symbol: symbol.clone(),
                            date: dates[i],
                        })
                    }
                }
            }
            columns.insert(symbol.clone(), filled);
        }
        PriceSeries::new(dates, columns)
    }
}

fn forward_fill(column: &mut [Option<f64>]) {
    let mut last = None;
    for value in column.iter_mut() {
        match value {
            Some(v) => last = Some(*v),
            None => *value = last,
        }
    }
}

fn backward_fill(column: &mut [Option<f64>]) {
    let mut next = None;
    for value in column.iter_mut().rev() {
        match value {
            Some(v) => next = Some(*v),
            None => *value = next,
        }
    }
}

/// Dense closes: every symbol has a finite price on every date
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl PriceSeries {
    /// Checks that dates ascend strictly and every column is complete
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self, LedgerError> {
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(LedgerError::config("price dates must be strictly ascending"));
        }
        for (symbol, column) in &columns {
            if column.len() != dates.len() {
                return Err(LedgerError::MissingData {
                    symbol: symbol.clone(),
                    date: dates.get(column.len()).copied().unwrap_or_default(),
                });
            }
            if let Some(i) = column.iter().position(|v| !v.is_finite()) {
                return Err(LedgerError::MissingData {
                    symbol: symbol.clone(),
                    date: dates[i],
                });
            }
        }
        Ok(PriceSeries { dates, columns })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, symbol: &str) -> Option<&[f64]> {
        self.columns.get(symbol).map(Vec::as_slice)
    }

    pub fn price(&self, index: usize, symbol: &str) -> Option<f64> {
        self.columns.get(symbol).and_then(|c| c.get(index)).copied()
    }

    /// Index of the first trading date at or after `date`.
    ///
    /// A date before the first row or after the last row is a configuration
    /// problem: the window fetched does not cover the allocation.
    pub fn resolve_allocation_index(&self, date: NaiveDate) -> Result<usize, LedgerError> {
        let (first, last) = match (self.dates.first(), self.dates.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(LedgerError::config("price series is empty")),
        };
        if date < first || date > last {
            return Err(LedgerError::config(format!(
                "allocation date {date} lies outside the fetched range {first}..={last}"
            )));
        }
        Ok(self.dates.partition_point(|d| *d < date))
    }
}
