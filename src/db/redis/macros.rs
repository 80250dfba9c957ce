/// Read-through caching against Redis.
///
/// Returns the cached value when present. Otherwise awaits `$block`, hands the
/// result to the background writer with the given TTL and returns it.
///
/// # Arguments
/// * `$cache`: anything with `get_from_cache` and `set_in_background`.
/// * `$key`: the `CacheKey` to read and write.
/// * `$ttl`: time-to-live of a freshly computed value, in seconds.
/// * `$block`: future producing an `AppResult` when the cache misses.
///
/// # Example
/// ```rust,ignore
/// async fn counts(&self) -> AppResult<Counts> {
///     cached!(self.cache, key, 60, async { self.count_uncached().await })
/// }
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await? {
            tracing::debug!(key = %key, "Cache hit");
            Ok(cached)
        } else {
            tracing::debug!(key = %key, "Cache miss");
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
