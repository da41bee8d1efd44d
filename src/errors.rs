use std::sync::Arc;

use chrono::NaiveDate;
use dual_ledger_derive::Kind;
use thiserror::Error;

use crate::yahoo_finance::ProviderError;

/// Every way a render can fail.
///
/// `kind()` is generated by the `Kind` derive and gives a stable tag
/// (`missing_data`, `configuration`, ...) so callers and tests can match on
/// the failure without parsing messages.
#[derive(Error, Debug, Kind)]
pub enum LedgerError {
    #[error("no price for {symbol} on {date}")]
    MissingData { symbol: String, date: NaiveDate },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("market data provider failed: {0}")]
    Provider(#[from] Arc<ProviderError>),
    #[error("writing csv failed: {0}")]
    Export(#[from] csv::Error),
    #[error("unknown portfolio: {0}")]
    UnknownPortfolio(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn config(message: impl Into<String>) -> Self {
        LedgerError::Configuration(message.into())
    }
}
