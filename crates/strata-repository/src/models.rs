//! Data models for the repository layer

use std::time::{Duration, Instant};

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries in cache
    pub size: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// A cached payload validated by watermark and TTL
///
/// An entry is served only while it is younger than its TTL *and* the
/// watermark it was stored under still equals the store's current one.
#[derive(Debug, Clone)]
pub(crate) struct CachedEntry<T> {
    /// The cached payload
    pub data: T,
    /// Last-modified watermark of the underlying content at cache time
    pub watermark: i64,
    /// When this entry was cached
    pub cached_at: Instant,
    /// Time-to-live duration
    pub ttl: Duration,
}

impl<T> CachedEntry<T> {
    /// Create a new cache entry
    pub fn new(data: T, watermark: i64, ttl: Duration) -> Self {
        Self {
            data,
            watermark,
            cached_at: Instant::now(),
            ttl,
        }
    }

    /// Check if this entry has outlived its TTL
    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }

    /// Check if this entry may be served against the given watermark
    pub fn is_fresh(&self, current_watermark: i64) -> bool {
        !self.is_expired() && self.watermark == current_watermark
    }
}

/// A cached content-type definition, validated by TTL only
///
/// Definitions change rarely; their cache is independent of record caching
/// and must not be assumed consistent with it.
#[derive(Debug, Clone)]
pub(crate) struct CachedDefinition<T> {
    pub data: T,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl<T> CachedDefinition<T> {
    pub fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            cached_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching is enabled
    pub enabled: bool,
    /// Default time-to-live for cache entries
    pub default_ttl: Duration,
    /// Maximum number of entries to keep in cache
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: Duration::from_secs(300),
            max_entries: Some(1000),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable caching
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Set the default TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the maximum number of entries
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    /// Remove the entry limit
    pub fn unlimited_entries(mut self) -> Self {
        self.max_entries = None;
        self
    }
}

/// Query options for record listing
///
/// Strata does not ship a filter DSL; listings support an exact property
/// match, ordering by one property (falling back to id order) and paging.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    /// Exact property match: (property name, required value)
    pub filter: Option<(String, String)>,
    /// Property to order by; id order when `None`
    pub order_by: Option<String>,
    /// Reverse the ordering
    pub descending: bool,
    /// 1-based page number; `None` returns everything
    pub page: Option<usize>,
    /// Page size; only meaningful together with `page`
    pub page_size: Option<usize>,
}

impl RecordQuery {
    /// Query matching all records in id order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Keep only records whose `property` equals `value` exactly.
    pub fn filter(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter = Some((property.into(), value.into()));
        self
    }

    /// Order by a property value (ascending).
    pub fn order_by(mut self, property: impl Into<String>) -> Self {
        self.order_by = Some(property.into());
        self
    }

    /// Reverse the ordering.
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    /// Select one page (1-based) of the given size.
    pub fn page(mut self, page: usize, page_size: usize) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    /// A stable string form for use in cache keys.
    pub(crate) fn cache_selector(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.filter
                .as_ref()
                .map(|(p, v)| format!("{p}={v}"))
                .unwrap_or_default(),
            self.order_by.as_deref().unwrap_or(""),
            self.descending,
            self.page.map(|p| p.to_string()).unwrap_or_default(),
            self.page_size.map(|p| p.to_string()).unwrap_or_default(),
        )
    }
}
