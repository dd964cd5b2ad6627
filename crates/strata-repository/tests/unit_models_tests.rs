//! Unit tests for repository models (CacheStats, CacheConfig, RecordQuery)

use std::time::Duration;
use strata_repository::{CacheConfig, CacheStats, RecordQuery};

#[test]
fn test_cache_stats_default() {
    let stats = CacheStats::default();

    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.size, 0);
    assert_eq!(stats.hit_rate(), 0.0);
}

#[test]
fn test_cache_stats_hit_rate_all_hits() {
    let stats = CacheStats {
        hits: 100,
        misses: 0,
        size: 50,
    };

    assert_eq!(stats.hit_rate(), 1.0);
}

#[test]
fn test_cache_stats_hit_rate_all_misses() {
    let stats = CacheStats {
        hits: 0,
        misses: 100,
        size: 50,
    };

    assert_eq!(stats.hit_rate(), 0.0);
}

#[test]
fn test_cache_stats_hit_rate_mixed() {
    let stats = CacheStats {
        hits: 75,
        misses: 25,
        size: 50,
    };

    assert_eq!(stats.hit_rate(), 0.75);
}

#[test]
fn test_cache_stats_hit_rate_precision() {
    let stats = CacheStats {
        hits: 2,
        misses: 3,
        size: 2,
    };

    // 2/5 = 0.4
    assert!((stats.hit_rate() - 0.4).abs() < 0.0001);
}

#[test]
fn test_cache_config_default() {
    let config = CacheConfig::default();

    assert!(config.enabled);
    assert_eq!(config.default_ttl, Duration::from_secs(300));
    assert_eq!(config.max_entries, Some(1000));
}

#[test]
fn test_cache_config_disabled() {
    let config = CacheConfig::disabled();

    assert!(!config.enabled);
}

#[test]
fn test_cache_config_with_ttl() {
    let config = CacheConfig::new().with_ttl(Duration::from_secs(60));

    assert_eq!(config.default_ttl, Duration::from_secs(60));
    assert!(config.enabled);
}

#[test]
fn test_cache_config_with_max_entries() {
    let config = CacheConfig::new().with_max_entries(500);

    assert_eq!(config.max_entries, Some(500));
}

#[test]
fn test_cache_config_unlimited_entries() {
    let config = CacheConfig::new().unlimited_entries();

    assert_eq!(config.max_entries, None);
}

#[test]
fn test_cache_config_builder_chaining() {
    let config = CacheConfig::new()
        .with_ttl(Duration::from_secs(120))
        .with_max_entries(250)
        .unlimited_entries();

    assert!(config.enabled);
    assert_eq!(config.default_ttl, Duration::from_secs(120));
    assert_eq!(config.max_entries, None);
}

#[test]
fn test_record_query_default_matches_everything() {
    let query = RecordQuery::all();

    assert!(query.filter.is_none());
    assert!(query.order_by.is_none());
    assert!(!query.descending);
    assert!(query.page.is_none());
    assert!(query.page_size.is_none());
}

#[test]
fn test_record_query_builder() {
    let query = RecordQuery::all()
        .filter("status", "1")
        .order_by("name")
        .descending()
        .page(2, 25);

    assert_eq!(
        query.filter,
        Some(("status".to_string(), "1".to_string()))
    );
    assert_eq!(query.order_by.as_deref(), Some("name"));
    assert!(query.descending);
    assert_eq!(query.page, Some(2));
    assert_eq!(query.page_size, Some(25));
}
