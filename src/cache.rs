//! External fetch cache (C9): URL → summary with a TTL, backed by an
//! atomically-persisted JSON file.
//!
//! Grounded on a Python `web_scraper` module's `fetch_url_content` /
//! `load_cache` / `save_cache` / `get_cache_stats` functions for the
//! cache-hit/miss/expiry flow and the stats shape, and on
//! `cache/manager.rs`'s `CacheManager` for the persistence mechanics: an
//! `Arc<RwLock<_>>` in-memory map mirrored to a metadata file, loaded on
//! construction and saved through a temp-file-then-rename so a crash mid-write
//! never corrupts the cache (§4.9 / §7). Summarization is delegated to
//! an external `Summarizer` the caller supplies — this crate has no LLM of
//! its own — with the same "fallback to truncated raw text" degraded path
//! `summarize_content`'s `except` clause takes when the summarizer errors.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;
use scraper::{Html, Selector};
use tokio::fs;

use crate::config::CacheConfig;
use crate::error::{MemoryError, Result};
use crate::models::CacheRecord;

/// External summarizer collaborator. Production callers back this with an
/// LLM call; this crate only defines the contract and the fallback path.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str, max_words: usize) -> Result<String>;
}

/// Outcome of a `fetch` call, tagging whether the summary came from cache or
/// a live fetch (§4.9's `[CACHED SUMMARY]` / `[LIVE FETCH]` distinction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOrigin {
    Cached,
    Live,
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub summary: String,
    pub origin: FetchOrigin,
    /// `false` when this result is a `"Error fetching URL: ..."` degraded
    /// summary rather than real fetched content (§4.9 failure taxonomy,
    /// §7 "user-visible" contract). Timeouts, network errors, and a failed
    /// client build are never fatal to the caller.
    pub ok: bool,
}

/// Aggregate cache statistics (mirrors `get_cache_stats`).
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub total_urls: usize,
    pub expired_urls: usize,
    pub total_original_bytes: usize,
    pub total_summary_bytes: usize,
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn truncate_fallback(text: &str, limit: usize) -> String {
    let truncated: String = text.chars().take(limit).collect();
    format!("[SUMMARY UNAVAILABLE] Raw text fragment: {truncated}...")
}

/// Strip script/style/nav/footer/header nodes and return the remaining
/// visible text, whitespace-collapsed.
fn clean_html(raw_html: &str) -> String {
    let document = Html::parse_document(raw_html);
    #[allow(clippy::unwrap_used)]
    let strip_selector = Selector::parse("script, style, noscript, nav, footer, header").unwrap();
    let strip_nodes: std::collections::HashSet<_> = document
        .select(&strip_selector)
        .flat_map(|el| el.descendants().map(|n| n.id()))
        .collect();

    let mut text_parts = Vec::new();
    for node in document.tree.nodes() {
        if strip_nodes.contains(&node.id()) {
            continue;
        }
        if let Some(text_node) = node.value().as_text() {
            let trimmed = text_node.trim();
            if !trimmed.is_empty() {
                text_parts.push(trimmed.to_string());
            }
        }
    }
    text_parts.join(" ")
}

/// URL-keyed TTL cache of fetched-and-summarized external content.
pub struct ExternalFetchCache {
    entries: DashMap<String, CacheRecord>,
    config: CacheConfig,
    persist_path: Option<PathBuf>,
    http: reqwest::Client,
}

impl ExternalFetchCache {
    /// Create a cache with no on-disk persistence (in-memory only).
    pub fn new(config: CacheConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(std::time::Duration::from_secs(config.http_timeout_seconds))
            .build()
            .map_err(|e| MemoryError::NetworkError(e.to_string()))?;
        Ok(Self {
            entries: DashMap::new(),
            config,
            persist_path: None,
            http,
        })
    }

    /// Create a cache persisted to `path`, loading any existing contents.
    pub async fn with_persistence(config: CacheConfig, path: impl AsRef<Path>) -> Result<Self> {
        let mut cache = Self::new(config)?;
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            let content = fs::read_to_string(&path).await?;
            let loaded: std::collections::HashMap<String, CacheRecord> =
                serde_json::from_str(&content).unwrap_or_default();
            for (url, record) in loaded {
                cache.entries.insert(url, record);
            }
        }
        cache.persist_path = Some(path);
        Ok(cache)
    }

    fn is_expired(&self, record: &CacheRecord) -> bool {
        now_unix() - record.timestamp > self.config.ttl_seconds as i64
    }

    /// Directly seed a cache entry for `url` without fetching it, stamped
    /// with the current time. Useful when content is already known (e.g.
    /// imported from another source) as well as in tests.
    pub fn seed(&self, url: &str, summary: &str) {
        self.entries.insert(
            url.to_string(),
            CacheRecord {
                summary: summary.to_string(),
                timestamp: now_unix(),
                original_length: summary.len(),
                summary_length: summary.len(),
            },
        );
    }

    /// Atomic write-temp-then-rename so a crash mid-write never corrupts the
    /// cache file.
    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        let snapshot: std::collections::HashMap<String, CacheRecord> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let json = serde_json::to_string_pretty(&snapshot)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    /// Fetch `url`, returning a cached summary if present and unexpired, or
    /// fetching live, cleaning the HTML, and summarizing (§4.9). Timeout and
    /// network failures are never fatal to the caller: they come back as
    /// `Ok(FetchResult { ok: false, summary: "Error fetching URL: ..." })`
    /// per §7's user-visible contract. A summarizer failure falls back to a
    /// truncated raw-text summary instead. `Err` is reserved for cache
    /// persistence failures.
    pub async fn fetch(
        &self,
        url: &str,
        summarizer: Option<&dyn Summarizer>,
        force_refresh: bool,
    ) -> Result<FetchResult> {
        if !force_refresh {
            if let Some(record) = self.entries.get(url) {
                if !self.is_expired(&record) {
                    return Ok(FetchResult {
                        summary: record.summary.clone(),
                        origin: FetchOrigin::Cached,
                        ok: true,
                    });
                }
            }
        }

        let fetch_error = |e: &MemoryError| {
            tracing::warn!("fetch failed for {url}: {e}");
            FetchResult {
                summary: format!("Error fetching URL: {e}"),
                origin: FetchOrigin::Live,
                ok: false,
            }
        };

        let response = match self.http.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                let err = if e.is_timeout() {
                    MemoryError::Timeout(std::time::Duration::from_secs(self.config.http_timeout_seconds))
                } else {
                    MemoryError::NetworkError(e.to_string())
                };
                return Ok(fetch_error(&err));
            }
        };
        let response = match response.error_for_status() {
            Ok(r) => r,
            Err(e) => return Ok(fetch_error(&MemoryError::NetworkError(e.to_string()))),
        };

        let raw_html = match response.text().await {
            Ok(t) => t,
            Err(e) => return Ok(fetch_error(&MemoryError::NetworkError(e.to_string()))),
        };

        let cleaned = clean_html(&raw_html);

        let summary = match summarizer {
            Some(s) => {
                let input: String = cleaned.chars().take(self.config.max_summary_input).collect();
                match s.summarize(&input, self.config.summary_max_words).await {
                    Ok(summary) => summary,
                    Err(e) => {
                        tracing::warn!("summarizer unavailable, falling back to truncation: {e}");
                        truncate_fallback(&cleaned, 500)
                    }
                }
            }
            None => truncate_fallback(&cleaned, 500),
        };

        self.entries.insert(
            url.to_string(),
            CacheRecord {
                summary: summary.clone(),
                timestamp: now_unix(),
                original_length: cleaned.len(),
                summary_length: summary.len(),
            },
        );
        self.persist().await?;

        Ok(FetchResult {
            summary,
            origin: FetchOrigin::Live,
            ok: true,
        })
    }

    /// Remove a single URL from the cache. Returns whether it was present.
    pub async fn evict(&self, url: &str) -> Result<bool> {
        let removed = self.entries.remove(url).is_some();
        if removed {
            self.persist().await?;
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> Result<()> {
        self.entries.clear();
        self.persist().await
    }

    pub fn stats(&self) -> CacheStats {
        let mut total_original = 0;
        let mut total_summary = 0;
        let mut expired = 0;
        for entry in self.entries.iter() {
            total_original += entry.original_length;
            total_summary += entry.summary_length;
            if self.is_expired(&entry) {
                expired += 1;
            }
        }
        CacheStats {
            total_urls: self.entries.len(),
            expired_urls: expired,
            total_original_bytes: total_original,
            total_summary_bytes: total_summary,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct UppercaseSummarizer;

    #[async_trait]
    impl Summarizer for UppercaseSummarizer {
        async fn summarize(&self, text: &str, _max_words: usize) -> Result<String> {
            Ok(text.to_uppercase())
        }
    }

    struct FailingSummarizer;

    #[async_trait]
    impl Summarizer for FailingSummarizer {
        async fn summarize(&self, _text: &str, _max_words: usize) -> Result<String> {
            Err(MemoryError::SummarizerUnavailable("offline".to_string()))
        }
    }

    #[test]
    fn clean_html_drops_script_and_style() {
        let html = "<html><body><script>evil()</script><style>.a{}</style><p>Hello world</p></body></html>";
        let cleaned = clean_html(html);
        assert!(cleaned.contains("Hello world"));
        assert!(!cleaned.contains("evil"));
    }

    #[test]
    fn failing_summarizer_falls_back_to_truncation() {
        let fallback = truncate_fallback("some raw content here", 500);
        assert!(fallback.starts_with("[SUMMARY UNAVAILABLE]"));
        assert!(fallback.contains("some raw content here"));
    }

    #[tokio::test]
    async fn cache_round_trips_through_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = ExternalFetchCache::with_persistence(CacheConfig::default(), &path).await.unwrap();
        assert_eq!(cache.stats().total_urls, 0);

        cache.entries.insert(
            "https://example.com".to_string(),
            CacheRecord {
                summary: "a summary".to_string(),
                timestamp: now_unix(),
                original_length: 100,
                summary_length: 20,
            },
        );
        cache.persist().await.unwrap();

        let reloaded = ExternalFetchCache::with_persistence(CacheConfig::default(), &path).await.unwrap();
        assert_eq!(reloaded.stats().total_urls, 1);
    }

    #[tokio::test]
    async fn expired_entries_are_counted_in_stats() {
        let cache = ExternalFetchCache::new(CacheConfig {
            ttl_seconds: 1,
            ..CacheConfig::default()
        })
        .unwrap();
        cache.entries.insert(
            "https://old.example.com".to_string(),
            CacheRecord {
                summary: "stale".to_string(),
                timestamp: now_unix() - 100,
                original_length: 10,
                summary_length: 5,
            },
        );
        assert_eq!(cache.stats().expired_urls, 1);
    }

    #[tokio::test]
    async fn evict_removes_single_entry() {
        let cache = ExternalFetchCache::new(CacheConfig::default()).unwrap();
        cache.entries.insert(
            "https://a.example.com".to_string(),
            CacheRecord {
                summary: "s".to_string(),
                timestamp: now_unix(),
                original_length: 1,
                summary_length: 1,
            },
        );
        assert!(cache.evict("https://a.example.com").await.unwrap());
        assert_eq!(cache.stats().total_urls, 0);
    }

    #[tokio::test]
    async fn uppercase_summarizer_is_used_when_provided() {
        let cache = ExternalFetchCache::new(CacheConfig::default()).unwrap();
        let summarizer = UppercaseSummarizer;
        let cleaned = "hello".to_string();
        let result = summarizer.summarize(&cleaned, 10).await.unwrap();
        assert_eq!(result, "HELLO");
        let _ = cache;
    }

    #[tokio::test]
    async fn failing_summarizer_is_handled_without_panicking() {
        let summarizer = FailingSummarizer;
        assert!(summarizer.summarize("x", 10).await.is_err());
    }

    #[tokio::test]
    async fn network_failure_degrades_to_error_summary_instead_of_erroring() {
        let cache = ExternalFetchCache::new(CacheConfig {
            http_timeout_seconds: 1,
            ..CacheConfig::default()
        })
        .unwrap();
        // Port 0 is never listening; the connection attempt fails fast.
        let result = cache.fetch("http://127.0.0.1:0/", None, false).await.unwrap();
        assert!(!result.ok);
        assert!(result.summary.starts_with("Error fetching URL:"));
        assert_eq!(result.origin, FetchOrigin::Live);
    }
}
