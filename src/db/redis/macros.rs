/// Get-or-compute against a [`Cache`](crate::db::Cache).
///
/// Evaluates to `AppResult<T>`: the cached value on a hit, otherwise the
/// awaited result of `$compute`, which is queued for storage with `$ttl`
/// seconds to live. Must be used inside a function returning `AppResult`.
///
/// ```rust,ignore
/// let summary: Summary = cached!(cache, CacheKey::Summary(subject), AI_CACHE_TTL_SECS, ai.summarize(&lesson))?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $compute:expr) => {{
        let key = $key;
        match $cache.get_from_cache(&key).await? {
            Some(hit) => Ok(hit),
            None => {
                let value = $compute.await?;
                $cache.set_in_background(&key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
