//! Sequential, retried pagination over a market data provider.

use super::util::with_retry;
use crate::core::config::{FetchConfig, PartialPagePolicy};
use crate::core::error::FetchError;
use crate::core::market::{MarketDataProvider, RawRecord};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    pub pages: u32,
    pub retries: usize,
    pub retry_delay: Duration,
    /// Courtesy pause between successful page fetches.
    pub throttle: Duration,
    pub on_page_failure: PartialPagePolicy,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for FetchSettings {
    fn from(config: &FetchConfig) -> Self {
        Self {
            pages: config.pages,
            retries: config.retries,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
            throttle: Duration::from_millis(config.throttle_ms),
            on_page_failure: config.on_page_failure,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageFetch {
    pub records: Vec<RawRecord>,
    pub pages_fetched: u32,
    /// Set when a later page failed and partial results were kept.
    pub failure: Option<String>,
}

/// Fetches pages `1..=pages` one after another, retrying each page.
///
/// An empty page ends pagination without error. When a page exhausts its
/// retries the outcome depends on `on_page_failure`; a failing first page is
/// always an error.
pub async fn fetch_pages(
    provider: &dyn MarketDataProvider,
    settings: &FetchSettings,
) -> Result<PageFetch, FetchError> {
    let mut fetched = PageFetch {
        records: Vec::new(),
        pages_fetched: 0,
        failure: None,
    };

    for page in 1..=settings.pages {
        if page > 1 && !settings.throttle.is_zero() {
            tokio::time::sleep(settings.throttle).await;
        }

        let result = with_retry(
            || provider.get_page(page),
            settings.retries,
            settings.retry_delay,
        )
        .await;

        match result {
            Ok(data) if data.is_empty() => {
                debug!(
                    provider = provider.name(),
                    page, "Received empty page, stopping fetch"
                );
                break;
            }
            Ok(data) => {
                debug!(provider = provider.name(), page, count = data.len(), "Fetched page");
                fetched.records.extend(data);
                fetched.pages_fetched = page;
            }
            Err(source) => {
                let cause = source.to_string();
                let err = FetchError::AttemptsExhausted {
                    page,
                    attempts: settings.retries.max(1),
                    source: Box::new(source),
                };
                if settings.on_page_failure == PartialPagePolicy::ReturnPartial
                    && fetched.pages_fetched > 0
                {
                    warn!(
                        provider = provider.name(),
                        kept_pages = fetched.pages_fetched,
                        "Keeping partial results: {}: {}",
                        err,
                        cause
                    );
                    fetched.failure = Some(format!("{err}: {cause}"));
                    break;
                }
                return Err(err);
            }
        }
    }

    Ok(fetched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coin::FieldMapping;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves scripted responses per page and records every call.
    struct ScriptedProvider {
        mapping: FieldMapping,
        script: Mutex<HashMap<u32, Vec<Option<Vec<RawRecord>>>>>,
        calls: Mutex<Vec<u32>>,
    }

    impl ScriptedProvider {
        /// `None` entries fail, `Some` entries succeed; the last entry repeats.
        fn new(script: Vec<(u32, Vec<Option<Vec<RawRecord>>>)>) -> Self {
            Self {
                mapping: FieldMapping::coingecko(),
                script: Mutex::new(script.into_iter().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<u32> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MarketDataProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn field_mapping(&self) -> &FieldMapping {
            &self.mapping
        }

        async fn get_page(&self, page: u32) -> Result<Vec<RawRecord>, FetchError> {
            self.calls.lock().unwrap().push(page);
            let mut script = self.script.lock().unwrap();
            let steps = script.get_mut(&page).expect("unscripted page");
            let step = if steps.len() > 1 {
                steps.remove(0)
            } else {
                steps[0].clone()
            };
            step.ok_or_else(|| FetchError::Status {
                url: format!("mock://page/{page}"),
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            })
        }
    }

    fn coins(ids: &[&str]) -> Vec<RawRecord> {
        ids.iter().map(|id| json!({ "id": id })).collect()
    }

    fn settings(pages: u32, retries: usize, policy: PartialPagePolicy) -> FetchSettings {
        FetchSettings {
            pages,
            retries,
            retry_delay: Duration::ZERO,
            throttle: Duration::ZERO,
            on_page_failure: policy,
        }
    }

    #[tokio::test]
    async fn test_recovers_after_retries_minus_one_failures() {
        let provider = ScriptedProvider::new(vec![(1, vec![None, None, Some(coins(&["a"]))])]);
        let fetched = fetch_pages(&provider, &settings(1, 3, PartialPagePolicy::Abort))
            .await
            .unwrap();
        assert_eq!(fetched.records, coins(&["a"]));
        assert_eq!(provider.calls(), vec![1, 1, 1]);
    }

    #[tokio::test]
    async fn test_always_failing_stops_after_exact_retries() {
        let provider = ScriptedProvider::new(vec![(1, vec![None])]);
        let err = fetch_pages(&provider, &settings(2, 3, PartialPagePolicy::Abort))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::AttemptsExhausted {
                page: 1,
                attempts: 3,
                ..
            }
        ));
        assert_eq!(provider.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_page_stops_pagination() {
        let provider = ScriptedProvider::new(vec![
            (1, vec![Some(coins(&["a", "b"]))]),
            (2, vec![Some(Vec::new())]),
            (3, vec![Some(coins(&["never"]))]),
        ]);
        let fetched = fetch_pages(&provider, &settings(3, 3, PartialPagePolicy::Abort))
            .await
            .unwrap();
        assert_eq!(fetched.records, coins(&["a", "b"]));
        assert_eq!(fetched.pages_fetched, 1);
        assert!(fetched.failure.is_none());
        assert_eq!(provider.calls(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_abort_discards_earlier_pages() {
        let provider = ScriptedProvider::new(vec![
            (1, vec![Some(coins(&["a"]))]),
            (2, vec![None]),
        ]);
        let err = fetch_pages(&provider, &settings(3, 2, PartialPagePolicy::Abort))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::AttemptsExhausted { page: 2, .. }));
    }

    #[tokio::test]
    async fn test_return_partial_keeps_earlier_pages() {
        let provider = ScriptedProvider::new(vec![
            (1, vec![Some(coins(&["a"]))]),
            (2, vec![None]),
        ]);
        let fetched = fetch_pages(&provider, &settings(3, 2, PartialPagePolicy::ReturnPartial))
            .await
            .unwrap();
        assert_eq!(fetched.records, coins(&["a"]));
        assert_eq!(fetched.pages_fetched, 1);
        assert_eq!(
            fetched.failure.as_deref(),
            Some("page 2 failed after 2 attempts: HTTP error: 503 Service Unavailable for mock://page/2")
        );
        assert_eq!(provider.calls(), vec![1, 2, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_runs_between_pages_only() {
        let provider = ScriptedProvider::new(vec![
            (1, vec![Some(coins(&["a"]))]),
            (2, vec![Some(coins(&["b"]))]),
        ]);
        let throttled = FetchSettings {
            throttle: Duration::from_millis(500),
            ..settings(2, 3, PartialPagePolicy::Abort)
        };
        let start = tokio::time::Instant::now();
        let fetched = fetch_pages(&provider, &throttled).await.unwrap();
        assert_eq!(fetched.pages_fetched, 2);
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delay_applies_per_failed_attempt() {
        let provider = ScriptedProvider::new(vec![(1, vec![None, None, Some(coins(&["a"]))])]);
        let delayed = FetchSettings {
            retry_delay: Duration::from_secs(5),
            throttle: Duration::from_millis(500),
            ..settings(1, 3, PartialPagePolicy::Abort)
        };
        let start = tokio::time::Instant::now();
        fetch_pages(&provider, &delayed).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_return_partial_still_fails_on_first_page() {
        let provider = ScriptedProvider::new(vec![(1, vec![None])]);
        let result =
            fetch_pages(&provider, &settings(2, 1, PartialPagePolicy::ReturnPartial)).await;
        assert!(result.is_err());
    }
}
