//! Run-scoped benchmark resolution: cache, single-flight, per-100
//! normalization, and USD cross-rate fallback.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use futures_util::future::BoxFuture;
use tokio::sync::{Mutex, OnceCell};

use crate::source::RateSource;

/// Currencies the benchmark source quotes per 100 units rather than per 1.
/// Raw quotes with one of these as base are divided by 100 exactly once, at
/// ingestion from the source, before caching.
pub const PER_100_UNIT_CURRENCIES: &[&str] =
    &["JPY", "KRW", "HUF", "ISK", "CLP", "IDR", "CHF"];

fn is_per_100_unit(ccy: &str) -> bool {
    PER_100_UNIT_CURRENCIES.contains(&ccy)
}

/// Cache key: upper-cased currency pair plus the value date. Rates are never
/// served across dates.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RateKey {
    pub base: String,
    pub quote: String,
    pub on: NaiveDate,
}

impl std::fmt::Display for RateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} {}", self.base, self.quote, self.on)
    }
}

/// Benchmark rate resolver for one reconciliation run.
///
/// Owns a run-scoped cache: build a fresh resolver per run so no rate (or
/// cached failure) leaks into the next run. Concurrent lookups for one key
/// share a single in-flight fetch; the cached value for a key,
/// including the explicit unavailable sentinel `None`, is final for the run.
pub struct BenchmarkResolver {
    source: Arc<dyn RateSource>,
    cells: Mutex<HashMap<RateKey, Arc<OnceCell<Option<f64>>>>>,
}

impl BenchmarkResolver {
    pub fn new(source: Arc<dyn RateSource>) -> Self {
        Self {
            source,
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the benchmark rate for `base`/`quote` on `on`.
    ///
    /// Returns `None` when no market evidence could be obtained; callers
    /// must treat that as "unknown", never as zero. Never raises.
    pub async fn resolve(&self, base: &str, quote: &str, on: NaiveDate) -> Option<f64> {
        let base = base.trim().to_ascii_uppercase();
        let quote = quote.trim().to_ascii_uppercase();
        if base == quote {
            return Some(1.0);
        }
        self.resolve_key(RateKey { base, quote, on }).await
    }

    /// Single-flight lookup: every caller for one key awaits the same
    /// `OnceCell` initialization, so the underlying fetch (and any cross-rate
    /// derivation) runs at most once per key per run.
    fn resolve_key(&self, key: RateKey) -> BoxFuture<'_, Option<f64>> {
        Box::pin(async move {
            let cell = {
                let mut cells = self.cells.lock().await;
                cells.entry(key.clone()).or_default().clone()
            };
            *cell
                .get_or_init(|| async { self.fetch_with_fallback(&key).await })
                .await
        })
    }

    async fn fetch_with_fallback(&self, key: &RateKey) -> Option<f64> {
        match self.source.fetch_spot(&key.base, &key.quote, key.on).await {
            Ok(raw) => {
                let rate = if is_per_100_unit(&key.base) {
                    tracing::debug!(key = %key, raw, "normalized per-100 quote");
                    raw / 100.0
                } else {
                    raw
                };
                tracing::debug!(key = %key, rate, source = self.source.source_name(), "benchmark rate fetched");
                Some(rate)
            }
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "benchmark fetch failed");
                // Cross-rate fallback via USD. Only when neither currency is
                // USD: a USD leg's fallback would be the key itself.
                if key.base != "USD" && key.quote != "USD" {
                    self.cross_via_usd(key).await
                } else {
                    None
                }
            }
        }
    }

    /// Derive `base/quote` as `(USD->quote) / (base->USD)`, both legs
    /// resolved through the normal cached path. The derived value is cached
    /// under the original key by the calling `OnceCell`.
    async fn cross_via_usd(&self, key: &RateKey) -> Option<f64> {
        // Both legs resolve independently so each lands in the cache even
        // when the other fails.
        let base_usd = self
            .resolve_key(RateKey {
                base: key.base.clone(),
                quote: "USD".to_string(),
                on: key.on,
            })
            .await;
        let usd_quote = self
            .resolve_key(RateKey {
                base: "USD".to_string(),
                quote: key.quote.clone(),
                on: key.on,
            })
            .await;
        let (Some(base_usd), Some(usd_quote)) = (base_usd, usd_quote) else {
            return None;
        };
        if base_usd == 0.0 {
            return None;
        }
        let derived = usd_quote / base_usd;
        tracing::debug!(key = %key, derived, "cross-rate derived via USD");
        Some(derived)
    }
}
