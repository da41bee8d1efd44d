//! In-memory price cache with TTL using moka
//!
//! Renders inside the TTL reuse the table fetched by the first one. Entries are
//! replaced on expiry, never patched. Empty tables are not stored so that an
//! "awaiting data" answer is re-checked on the next render.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use moka::future::Cache;

use crate::prices::PriceTable;
use crate::yahoo_finance::{MarketDataProvider, ProviderError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    symbols: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
}

impl CacheKey {
    fn new(symbols: &[String], start: NaiveDate, end: NaiveDate) -> Self {
        let mut symbols = symbols.to_vec();
        symbols.sort();
        symbols.dedup();
        CacheKey { symbols, start, end }
    }
}

pub struct PriceCache {
    entries: Cache<CacheKey, Arc<PriceTable>>,
}

impl PriceCache {
    pub fn new(ttl: Duration) -> Self {
        PriceCache {
            entries: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(64)
                .build(),
        }
    }

    /// Cached table for the request, fetching from `provider` on a miss.
    ///
    /// Concurrent misses on the same key share one provider call. An empty
    /// answer is returned to every waiter but not stored.
    pub async fn get_or_fetch(
        &self,
        provider: &dyn MarketDataProvider,
        symbols: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Arc<PriceTable>, Arc<ProviderError>> {
        let key = CacheKey::new(symbols, start, end);
        let fetched = self
            .entries
            .try_get_with(key.clone(), async {
                tracing::info!(symbols = ?key.symbols, %start, %end, "fetching prices");
                let table = provider.history(&key.symbols, start, end).await?;
                if table.is_empty() {
                    return Err(ProviderError::EmptyDataSet);
                }
                Ok(Arc::new(table))
            })
            .await;
        match fetched {
            Err(e) if matches!(*e, ProviderError::EmptyDataSet) => {
                tracing::info!(symbols = ?key.symbols, %start, %end, "provider has no prices yet");
                let mut table = PriceTable::new();
                for symbol in &key.symbols {
                    table.add_symbol(symbol);
                }
                Ok(Arc::new(table))
            }
            other => other,
        }
    }

    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct CountingProvider {
        calls: AtomicUsize,
        empty: bool,
    }

    #[async_trait]
    impl MarketDataProvider for CountingProvider {
        async fn history(
            &self,
            symbols: &[String],
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<PriceTable, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut table = PriceTable::new();
            for symbol in symbols {
                if self.empty {
                    table.add_symbol(symbol);
                } else {
                    table.insert(symbol, start, 100.0);
                }
            }
            Ok(table)
        }
    }

    fn window() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(),
            NaiveDate::from_ymd_opt(2026, 4, 10).unwrap(),
        )
    }

    #[actix_web::test]
    async fn second_request_is_served_from_cache() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
            empty: false,
        };
        let cache = PriceCache::new(Duration::from_secs(3600));
        let (start, end) = window();

        let symbols = vec!["QQQ".to_string(), "MSFT".to_string()];
        let first = cache.get_or_fetch(&provider, &symbols, start, end).await.unwrap();
        // same symbols in another order hit the same entry
        let reordered = vec!["MSFT".to_string(), "QQQ".to_string()];
        let second = cache.get_or_fetch(&provider, &reordered, start, end).await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));

        cache.invalidate_all();
        cache.get_or_fetch(&provider, &symbols, start, end).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[actix_web::test]
    async fn empty_tables_are_not_cached() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
            empty: true,
        };
        let cache = PriceCache::new(Duration::from_secs(3600));
        let (start, end) = window();
        let symbols = vec!["XLF".to_string()];

        assert!(cache.get_or_fetch(&provider, &symbols, start, end).await.unwrap().is_empty());
        cache.get_or_fetch(&provider, &symbols, start, end).await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    struct SlowProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MarketDataProvider for SlowProvider {
        async fn history(
            &self,
            symbols: &[String],
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<PriceTable, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            actix_web::rt::time::sleep(Duration::from_millis(100)).await;
            let mut table = PriceTable::new();
            for symbol in symbols {
                table.insert(symbol, start, 100.0);
            }
            Ok(table)
        }
    }

    #[actix_web::test]
    async fn concurrent_misses_share_one_fetch() {
        let provider = Arc::new(SlowProvider {
            calls: AtomicUsize::new(0),
        });
        let cache = Arc::new(PriceCache::new(Duration::from_secs(3600)));
        let (start, end) = window();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let provider = provider.clone();
                let cache = cache.clone();
                actix_web::rt::spawn(async move {
                    let symbols = vec!["QQQ".to_string()];
                    cache
                        .get_or_fetch(provider.as_ref(), &symbols, start, end)
                        .await
                        .unwrap()
                })
            })
            .collect();
        let mut tables = Vec::new();
        for handle in handles {
            tables.push(handle.await.unwrap());
        }

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&tables[0], &tables[1]));
    }

    #[actix_web::test]
    async fn provider_errors_are_not_cached() {
        struct FailingProvider(AtomicUsize);

        #[async_trait]
        impl MarketDataProvider for FailingProvider {
            async fn history(
                &self,
                _symbols: &[String],
                _start: NaiveDate,
                _end: NaiveDate,
            ) -> Result<PriceTable, ProviderError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::RateLimited)
            }
        }

        let provider = FailingProvider(AtomicUsize::new(0));
        let cache = PriceCache::new(Duration::from_secs(3600));
        let (start, end) = window();
        let symbols = vec!["QQQ".to_string()];

        let err = cache.get_or_fetch(&provider, &symbols, start, end).await.unwrap_err();
        assert!(matches!(*err, ProviderError::RateLimited));
        cache.get_or_fetch(&provider, &symbols, start, end).await.unwrap_err();
        assert_eq!(provider.0.load(Ordering::SeqCst), 2);
    }

    #[actix_web::test]
    async fn different_windows_are_separate_entries() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
            empty: false,
        };
        let cache = PriceCache::new(Duration::from_secs(3600));
        let (start, end) = window();
        let symbols = vec!["XLF".to_string()];

        cache.get_or_fetch(&provider, &symbols, start, end).await.unwrap();
        cache
            .get_or_fetch(&provider, &symbols, start, end.pred_opt().unwrap())
            .await
            .unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
