//! Dashboard configuration
//!
//! Everything a render needs (symbols, budgets, window, precision) lives in an
//! immutable [`DashboardConfig`] that is built once at startup and passed down
//! explicitly, so several independent dashboards can run in the same process.
//!
//! The configuration is read from the TOML file named by `LEDGER_CONFIG` when
//! that variable is set, otherwise the built-in defaults are used. A `.env` file
//! is honoured. `LEDGER_LISTEN_ADDR` and `LEDGER_CACHE_TTL_SECS` override the
//! corresponding file values.
//!
//! Dates must be quoted strings in the TOML file (`"2026-01-12"`).

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

pub const DEFAULT_PRECISION: u32 = 2;
pub const MAX_PRECISION: u32 = 8;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 86_400;
pub const OPTION_CONTRACT_MULTIPLIER: f64 = 100.0;

/// Shares or option contracts
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Equity,
    Option,
}

impl InstrumentKind {
    pub fn default_multiplier(self) -> f64 {
        match self {
            InstrumentKind::Equity => 1.0,
            InstrumentKind::Option => OPTION_CONTRACT_MULTIPLIER,
        }
    }

    /// Column label for the locked quantity
    pub fn quantity_label(self) -> &'static str {
        match self {
            InstrumentKind::Equity => "Shares",
            InstrumentKind::Option => "Contracts",
        }
    }
}

/// One position of a portfolio.
///
/// `symbol` is what gets fetched from the provider (an equity ticker or an
/// option contract identifier), `label` is what the ledger shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Holding {
    pub symbol: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl Holding {
    pub fn equity(symbol: &str) -> Self {
        Holding {
            symbol: symbol.to_string(),
            label: None,
        }
    }

    pub fn option(underlying: &str, contract: &str) -> Self {
        Holding {
            symbol: contract.to_string(),
            label: Some(underlying.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.symbol)
    }
}

/// A fixed-allocation buy-and-hold portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortfolioConfig {
    /// Used in URLs and export file names
    pub id: String,
    pub title: String,
    pub kind: InstrumentKind,
    pub holdings: Vec<Holding>,
    pub budget_per_symbol: f64,
    pub total_budget: f64,
    pub allocation_date: NaiveDate,
    #[serde(default = "default_precision")]
    pub precision: u32,
    /// Overrides the kind's default multiplier (1 for equities, 100 for options)
    #[serde(default)]
    pub contract_multiplier: Option<f64>,
}

impl PortfolioConfig {
    pub fn multiplier(&self) -> f64 {
        self.contract_multiplier
            .unwrap_or_else(|| self.kind.default_multiplier())
    }

    pub fn symbols(&self) -> Vec<String> {
        self.holdings.iter().map(|h| h.symbol.clone()).collect()
    }
}

fn default_precision() -> u32 {
    DEFAULT_PRECISION
}

fn is_positive(value: f64) -> bool {
    !value.is_nan() && value > 0.0
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    pub title: String,
    /// First date fetched from the provider
    pub window_start: NaiveDate,
    /// Last date fetched; fetching also stops at today's date
    pub window_end: NaiveDate,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    pub portfolios: Vec<PortfolioConfig>,
}

const TICKERS: [(&str, &str); 5] = [
    ("SCHX", "SCHX260515C00027000"),
    ("XLRE", "XLRE260515C00041000"),
    ("XLF", "XLF260515C00054000"),
    ("QQQ", "QQQ260515C00620000"),
    ("MSFT", "MSFT260515C00450000"),
];

impl Default for DashboardConfig {
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2026, 1, 12).unwrap_or_default();
        let end = NaiveDate::from_ymd_opt(2026, 4, 10).unwrap_or_default();
        let stocks = PortfolioConfig {
            id: "stocks".into(),
            title: "Stock Portfolio".into(),
            kind: InstrumentKind::Equity,
            holdings: TICKERS.iter().map(|(t, _)| Holding::equity(t)).collect(),
            budget_per_symbol: 100_000.0,
            total_budget: 500_000.0,
            allocation_date: start,
            precision: DEFAULT_PRECISION,
            contract_multiplier: None,
        };
        let options = PortfolioConfig {
            id: "options".into(),
            title: "Options Portfolio".into(),
            kind: InstrumentKind::Option,
            holdings: TICKERS
                .iter()
                .map(|(t, c)| Holding::option(t, c))
                .collect(),
            ..stocks.clone()
        };
        DashboardConfig {
            title: "Dual Portfolio Ledger".into(),
            window_start: start,
            window_end: end,
            listen_addr: default_listen_addr(),
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            portfolios: vec![stocks, options],
        }
    }
}

impl DashboardConfig {
    /// Loads `.env`, then the file at `LEDGER_CONFIG` (or the defaults), then
    /// applies environment overrides and validates the result.
    pub fn load() -> Result<Self, LedgerError> {
        dotenvy::dotenv().ok();
        let mut config = match std::env::var("LEDGER_CONFIG") {
            Ok(path) => Self::from_path(path)?,
            Err(_) => Self::default(),
        };
        if let Ok(addr) = std::env::var("LEDGER_LISTEN_ADDR") {
            config.listen_addr = addr
                .parse()
                .map_err(|_| LedgerError::config(format!("invalid LEDGER_LISTEN_ADDR {addr}")))?;
        }
        if let Ok(ttl) = std::env::var("LEDGER_CACHE_TTL_SECS") {
            config.cache_ttl_secs = ttl
                .parse()
                .map_err(|_| LedgerError::config(format!("invalid LEDGER_CACHE_TTL_SECS {ttl}")))?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, LedgerError> {
        let config: DashboardConfig =
            toml::from_str(text).map_err(|e| LedgerError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn portfolio(&self, id: &str) -> Option<&PortfolioConfig> {
        self.portfolios.iter().find(|p| p.id == id)
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.window_start > self.window_end {
            return Err(LedgerError::config(format!(
                "window start {} is after window end {}",
                self.window_start, self.window_end
            )));
        }
        if self.portfolios.is_empty() {
            return Err(LedgerError::config("no portfolios configured"));
        }
        let mut ids = HashSet::new();
        for p in &self.portfolios {
            if p.id.is_empty()
                || !p
                    .id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(LedgerError::config(format!(
                    "portfolio id {:?} must be non-empty and use only letters, digits, '-' or '_'",
                    p.id
                )));
            }
            if !ids.insert(p.id.as_str()) {
                return Err(LedgerError::config(format!("duplicate portfolio id {}", p.id)));
            }
            p.validate(self.window_start, self.window_end)?;
        }
        Ok(())
    }
}

impl PortfolioConfig {
    fn validate(&self, start: NaiveDate, end: NaiveDate) -> Result<(), LedgerError> {
        if self.holdings.is_empty() {
            return Err(LedgerError::config(format!("{} has no holdings", self.id)));
        }
        let mut seen = HashSet::new();
        for h in &self.holdings {
            if !seen.insert(h.symbol.as_str()) {
                return Err(LedgerError::config(format!(
                    "{} lists {} twice",
                    self.id, h.symbol
                )));
            }
        }
        if !is_positive(self.budget_per_symbol) || !is_positive(self.total_budget) {
            return Err(LedgerError::config(format!(
                "{} budgets must be positive",
                self.id
            )));
        }
        if !is_positive(self.multiplier()) {
            return Err(LedgerError::config(format!(
                "{} contract multiplier must be positive",
                self.id
            )));
        }
        if self.precision > MAX_PRECISION {
            return Err(LedgerError::config(format!(
                "{} precision {} exceeds {}",
                self.id, self.precision, MAX_PRECISION
            )));
        }
        if self.allocation_date < start || self.allocation_date > end {
            return Err(LedgerError::config(format!(
                "{} allocation date {} lies outside the window {start}..={end}",
                self.id, self.allocation_date
            )));
        }
        let allocated = self.budget_per_symbol * self.holdings.len() as f64;
        if (allocated - self.total_budget).abs() > f64::EPSILON * self.total_budget {
            tracing::warn!(
                portfolio = %self.id,
                allocated,
                total_budget = self.total_budget,
                "per-symbol budgets do not add up to the nominal total budget"
            );
        }
        Ok(())
    }
}
