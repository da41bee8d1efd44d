#![allow(dead_code)]
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use dual_ledger::config::{DashboardConfig, Holding, InstrumentKind, PortfolioConfig};
use dual_ledger::prices::PriceTable;
use dual_ledger::yahoo_finance::{MarketDataProvider, ProviderError};

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
}

pub enum Mode {
    Prices,
    Empty,
    Failing,
}

/// Serves closes from a fixed table and counts requests
pub struct StubProvider {
    pub closes: BTreeMap<String, Vec<(NaiveDate, f64)>>,
    pub calls: AtomicUsize,
    pub mode: Mode,
}

impl StubProvider {
    pub fn new(mode: Mode) -> Self {
        let mut closes = BTreeMap::new();
        closes.insert("QQQ".to_string(), vec![(day(12), 500.0), (day(13), 505.0), (day(14), 510.0)]);
        closes.insert("MSFT".to_string(), vec![(day(12), 400.0), (day(13), 396.0), (day(14), 404.0)]);
        closes.insert(
            "QQQ260515C00620000".to_string(),
            vec![(day(12), 10.0), (day(13), 11.0), (day(14), 12.0)],
        );
        // no trade on the 13th
        closes.insert(
            "MSFT260515C00450000".to_string(),
            vec![(day(12), 5.0), (day(14), 6.0)],
        );
        StubProvider {
            closes,
            calls: AtomicUsize::new(0),
            mode,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for StubProvider {
    async fn history(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut table = PriceTable::new();
        match self.mode {
            Mode::Failing => return Err(ProviderError::RateLimited),
            Mode::Empty => {
                for symbol in symbols {
                    table.add_symbol(symbol);
                }
            }
            Mode::Prices => {
                for symbol in symbols {
                    table.add_symbol(symbol);
                    for (date, close) in self.closes.get(symbol).into_iter().flatten() {
                        if *date >= start && *date <= end {
                            table.insert(symbol, *date, *close);
                        }
                    }
                }
            }
        }
        Ok(table)
    }
}

pub fn config() -> DashboardConfig {
    let stocks = PortfolioConfig {
        id: "stocks".into(),
        title: "Stock Portfolio".into(),
        kind: InstrumentKind::Equity,
        holdings: vec![Holding::equity("QQQ"), Holding::equity("MSFT")],
        budget_per_symbol: 100_000.0,
        total_budget: 200_000.0,
        allocation_date: day(12),
        precision: 2,
        contract_multiplier: None,
    };
    let options = PortfolioConfig {
        id: "options".into(),
        title: "Options Portfolio".into(),
        kind: InstrumentKind::Option,
        holdings: vec![
            Holding::option("QQQ", "QQQ260515C00620000"),
            Holding::option("MSFT", "MSFT260515C00450000"),
        ],
        ..stocks.clone()
    };
    DashboardConfig {
        title: "Test Ledger".into(),
        window_start: day(12),
        window_end: NaiveDate::from_ymd_opt(2026, 4, 10).unwrap(),
        cache_ttl_secs: 3600,
        portfolios: vec![stocks, options],
        ..DashboardConfig::default()
    }
}

pub fn shared(provider: StubProvider) -> Arc<StubProvider> {
    Arc::new(provider)
}
