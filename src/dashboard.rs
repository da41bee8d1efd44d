//! One render of the dashboard
//!
//! Fetch (through the cache) -> fill -> value -> tabulate, for every configured
//! portfolio. Nothing is kept between renders except the cached price tables.
//!
//! A window that has not started yet, a provider that has nothing for it, or
//! an allocation date the provider has not posted yet is reported as
//! [`Outcome::AwaitingData`] rather than as an error.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::cache::PriceCache;
use crate::chart::ChartData;
use crate::config::{DashboardConfig, PortfolioConfig};
use crate::engine::{compute, summarize, AllocationPlan, PortfolioSummary, PortfolioTimeline};
use crate::errors::LedgerError;
use crate::ledger::Ledger;
use crate::yahoo_finance::MarketDataProvider;

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioReport {
    pub portfolio: PortfolioConfig,
    pub summary: PortfolioSummary,
    pub plan: AllocationPlan,
    pub ledger: Ledger,
    #[serde(skip)]
    pub timeline: PortfolioTimeline,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub title: String,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    /// Last date requested from the provider
    pub fetched_through: NaiveDate,
    pub portfolios: Vec<PortfolioReport>,
    pub chart: ChartData,
}

impl DashboardView {
    pub fn portfolio(&self, id: &str) -> Option<&PortfolioReport> {
        self.portfolios.iter().find(|p| p.portfolio.id == id)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Ready(DashboardView),
    AwaitingData { start: NaiveDate },
}

enum Report {
    Ready(PortfolioReport),
    Awaiting(NaiveDate),
}

pub struct Dashboard {
    config: Arc<DashboardConfig>,
    provider: Arc<dyn MarketDataProvider>,
    cache: PriceCache,
}

impl Dashboard {
    pub fn new(config: Arc<DashboardConfig>, provider: Arc<dyn MarketDataProvider>) -> Self {
        let cache = PriceCache::new(config.cache_ttl());
        Dashboard {
            config,
            provider,
            cache,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Dates to fetch as of `today`: the window, cut off at today.
    /// `None` while the window has not started.
    pub fn fetch_window(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        if today < self.config.window_start {
            return None;
        }
        Some((self.config.window_start, today.min(self.config.window_end)))
    }

    async fn report(
        &self,
        portfolio: &PortfolioConfig,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Report, LedgerError> {
        if portfolio.allocation_date > end {
            return Ok(Report::Awaiting(portfolio.allocation_date));
        }
        let symbols = portfolio.symbols();
        let table = self
            .cache
            .get_or_fetch(self.provider.as_ref(), &symbols, start, end)
            .await?;
        if table.is_empty() {
            tracing::info!(portfolio = %portfolio.id, %start, %end, "no prices yet");
            return Ok(Report::Awaiting(start));
        }
        let prices = table.fill(&symbols)?;
        let (Some(&first), Some(&last)) = (prices.dates().first(), prices.dates().last()) else {
            return Ok(Report::Awaiting(start));
        };
        if portfolio.allocation_date > last {
            tracing::info!(
                portfolio = %portfolio.id,
                allocation_date = %portfolio.allocation_date,
                %last,
                "allocation date not traded yet"
            );
            return Ok(Report::Awaiting(portfolio.allocation_date));
        }
        // nothing traded between the window start and the first fetched row
        // (weekend, holiday, thin option basket): allocate at that first row
        let timeline = if portfolio.allocation_date >= start && portfolio.allocation_date < first {
            tracing::info!(
                portfolio = %portfolio.id,
                allocation_date = %portfolio.allocation_date,
                %first,
                "allocating at the first trading date"
            );
            let shifted = PortfolioConfig {
                allocation_date: first,
                ..portfolio.clone()
            };
            compute(&prices, &shifted)?
        } else {
            compute(&prices, portfolio)?
        };
        let ledger = Ledger::build(portfolio, &prices, &timeline)?;
        let summary = summarize(&timeline, portfolio)
            .ok_or_else(|| LedgerError::config(format!("{} has no rows", portfolio.id)))?;
        Ok(Report::Ready(PortfolioReport {
            portfolio: portfolio.clone(),
            summary,
            plan: timeline.plan.clone(),
            ledger,
            timeline,
        }))
    }

    /// Runs the whole pipeline for every portfolio
    pub async fn render_view(&self, today: NaiveDate) -> Result<Outcome, LedgerError> {
        let Some((start, end)) = self.fetch_window(today) else {
            return Ok(Outcome::AwaitingData {
                start: self.config.window_start,
            });
        };
        let mut portfolios = Vec::with_capacity(self.config.portfolios.len());
        for portfolio in &self.config.portfolios {
            match self.report(portfolio, start, end).await? {
                Report::Ready(report) => portfolios.push(report),
                Report::Awaiting(start) => return Ok(Outcome::AwaitingData { start }),
            }
        }
        let chart = ChartData::align(
            &portfolios
                .iter()
                .map(|p| (p.portfolio.title.as_str(), &p.timeline))
                .collect::<Vec<_>>(),
        );
        tracing::info!(portfolios = portfolios.len(), %end, "rendered dashboard");
        Ok(Outcome::Ready(DashboardView {
            title: self.config.title.clone(),
            window_start: self.config.window_start,
            window_end: self.config.window_end,
            fetched_through: end,
            portfolios,
            chart,
        }))
    }

    /// Ledger for a single portfolio, `None` while awaiting data
    pub async fn portfolio_report(
        &self,
        id: &str,
        today: NaiveDate,
    ) -> Result<Option<PortfolioReport>, LedgerError> {
        let portfolio = self
            .config
            .portfolio(id)
            .ok_or_else(|| LedgerError::UnknownPortfolio(id.to_string()))?;
        let Some((start, end)) = self.fetch_window(today) else {
            return Ok(None);
        };
        match self.report(portfolio, start, end).await? {
            Report::Ready(report) => Ok(Some(report)),
            Report::Awaiting(_) => Ok(None),
        }
    }
}
