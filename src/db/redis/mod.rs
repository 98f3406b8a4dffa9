pub mod cache;

mod macros;

pub use cache::{
    create_redis_client, AiSubject, Cache, CacheKey, CacheWriterHandle, AI_CACHE_TTL_SECS,
};
