use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use time::error::ComponentRange;
use time::macros::time;
use time::{Date, Month, OffsetDateTime};

use crate::prices::PriceTable;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("connection to yahoo! finance server failed: {0}")]
    ConnectionFailed(#[from] reqwest::Error),
    #[error("deserializing response from yahoo! finance failed: {0}")]
    DeserializeFailed(#[from] serde_json::Error),
    #[error("yahoo! finance answered {0}")]
    Status(StatusCode),
    #[error("yahoo! finance is rate limiting us")]
    RateLimited,
    #[error("yahoo! finance reported an error: {0}")]
    Api(String),
    #[error("yahoo! finance returned an empty data set")]
    EmptyDataSet,
    #[error("yahoo! finance returned inconsistent data")]
    DataInconsistency,
    #[error("date outside the supported calendar: {0}")]
    InvalidRange(#[from] ComponentRange),
}

/// Source of daily closing prices
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Closes for `symbols` from `start` through `end`, both inclusive.
    ///
    /// Symbols without data in the range are registered in the table with no
    /// observations rather than failing the whole request.
    async fn history(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, ProviderError>;
}

#[derive(Deserialize, Debug)]
pub struct YResponse {
    pub chart: YChart,
}

impl YResponse {
    fn check_consistency(&self) -> Result<(), ProviderError> {
        for stock in self.chart.result.iter().flatten() {
            let n = stock.timestamp.len();
            let Some(quote) = stock.indicators.quote.first() else {
                if n == 0 {
                    continue;
                }
                return Err(ProviderError::DataInconsistency);
            };
            if quote.close.len() != n {
                return Err(ProviderError::DataInconsistency);
            }
            if let Some(adjclose) = stock.indicators.adjclose.as_ref().and_then(|a| a.first()) {
                if adjclose.adjclose.len() != n {
                    return Err(ProviderError::DataInconsistency);
                }
            }
        }
        Ok(())
    }

    pub fn from_json(json: serde_json::Value) -> Result<YResponse, ProviderError> {
        Ok(serde_json::from_value(json)?)
    }

    /// Quotes with a close; an empty vector when the range has no data
    pub fn quotes(&self) -> Result<Vec<Quote>, ProviderError> {
        if let Some(error) = &self.chart.error {
            // a symbol that has not traded in the range comes back as "Not Found"
            if error.code.eq_ignore_ascii_case("Not Found") {
                return Ok(Vec::new());
            }
            return Err(ProviderError::Api(format!("{}: {}", error.code, error.description)));
        }
        self.check_consistency()?;
        let Some(stock) = self.chart.result.as_ref().and_then(|r| r.first()) else {
            return Ok(Vec::new());
        };
        Ok(stock
            .timestamp
            .iter()
            .enumerate()
            .filter_map(|(i, timestamp)| stock.indicators.get_ith_quote(*timestamp, i))
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Quote {
    pub timestamp: i64,
    pub close: f64,
    pub adjclose: Option<f64>,
}

impl Quote {
    pub fn date(&self) -> Option<NaiveDate> {
        DateTime::from_timestamp(self.timestamp, 0).map(|t| t.date_naive())
    }

    /// Adjusted close where the provider has one; option contracts don't
    pub fn closing_price(&self) -> f64 {
        self.adjclose.unwrap_or(self.close)
    }
}

#[derive(Deserialize, Debug)]
pub struct YChart {
    pub result: Option<Vec<YQuoteBlock>>,
    pub error: Option<YChartError>,
}

#[derive(Deserialize, Debug)]
pub struct YChartError {
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize, Debug)]
pub struct YQuoteBlock {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: QuoteBlock,
}

#[derive(Deserialize, Debug)]
pub struct QuoteBlock {
    #[serde(default)]
    quote: Vec<QuoteList>,
    #[serde(default)]
    adjclose: Option<Vec<AdjClose>>,
}

impl QuoteBlock {
    fn get_ith_quote(&self, timestamp: i64, i: usize) -> Option<Quote> {
        let adjclose = self
            .adjclose
            .as_ref()
            .and_then(|a| a.first())
            .and_then(|a| a.adjclose.get(i).copied().flatten());
        // skip the row if close is not set
        let close = self.quote.first()?.close.get(i).copied().flatten()?;
        Some(Quote {
            timestamp,
            close,
            adjclose,
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

#[derive(Deserialize, Debug)]
pub struct QuoteList {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
}

fn to_offset(date: NaiveDate, end_of_day: bool) -> Result<OffsetDateTime, ComponentRange> {
    let month = Month::try_from(date.month() as u8)?;
    let day = Date::from_calendar_date(date.year(), month, date.day() as u8)?;
    Ok(OffsetDateTime::new_utc(
        day,
        if end_of_day { time!(23:59:59) } else { time!(0:00:00) },
    ))
}

/// Daily closes from the Yahoo! Finance chart API
#[derive(Debug, Clone)]
pub struct YahooProvider {
    client: Client,
    base_url: String,
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl YahooProvider {
    pub fn new() -> Self {
        Self::with_base_url(CHART_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        YahooProvider {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn request_chart(
        &self,
        ticker: &str,
        start: &OffsetDateTime,
        end: &OffsetDateTime,
    ) -> Result<YResponse, ProviderError> {
        let start = start.unix_timestamp();
        let end = end.unix_timestamp();
        // a fairly common user agent is necessary because otherwise we get rate limited
        let response = self
            .client
            .get(format!("{}/{ticker}", self.base_url))
            .query(&[
                ("period1", start.to_string()),
                ("period2", end.to_string()),
                ("interval", "1d".to_string()),
            ])
            .header("USER-AGENT", "curl/7.68.0")
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited);
        }
        let text = response.text().await?;
        // error bodies are JSON too and carry a better message than the status
        match serde_json::from_str(&text) {
            Ok(json) => YResponse::from_json(json),
            Err(_) if !status.is_success() => Err(ProviderError::Status(status)),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    async fn history(
        &self,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceTable, ProviderError> {
        let from = to_offset(start, false)?;
        let to = to_offset(end, true)?;
        let mut table = PriceTable::new();
        for symbol in symbols {
            table.add_symbol(symbol);
            let quotes = self.request_chart(symbol, &from, &to).await?.quotes()?;
            tracing::debug!(%symbol, quotes = quotes.len(), "fetched daily closes");
            for quote in quotes {
                if let Some(date) = quote.date() {
                    if date >= start && date <= end {
                        table.insert(symbol, date, quote.closing_price());
                    }
                }
            }
        }
        Ok(table)
    }
}
