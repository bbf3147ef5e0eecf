//! 通用码使用次数缓存
//!
//! 计数按版本号分键存放。账本写入提交后自增版本号；读侧先取版本号，
//! 再查账本，把结果写到该版本的键上。查询与兑换提交交错时，
//! 迟到的写入只会落在已经过期的版本键上，之后的读取看不到它。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use referral_shared::cache::{Cache, CacheKey};

use crate::error::Result;

/// 使用次数缓存接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageCountCache: Send + Sync {
    /// 当前版本号，从未自增过时为 0
    async fn current_version(&self, code_id: Uuid) -> Result<i64>;

    async fn get_count(&self, code_id: Uuid, version: i64) -> Result<Option<i64>>;

    async fn put_count(&self, code_id: Uuid, version: i64, count: i64) -> Result<()>;

    /// 使该码所有已缓存的计数失效，返回新版本号
    async fn bump_version(&self, code_id: Uuid) -> Result<i64>;
}

/// 基于 Redis 的使用次数缓存
pub struct RedisUsageCache {
    cache: Arc<Cache>,
    ttl: Duration,
}

impl RedisUsageCache {
    pub fn new(cache: Arc<Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }
}

#[async_trait]
impl UsageCountCache for RedisUsageCache {
    async fn current_version(&self, code_id: Uuid) -> Result<i64> {
        let key = CacheKey::general_code_usage_version(&code_id);
        Ok(self.cache.get::<i64>(&key).await?.unwrap_or(0))
    }

    async fn get_count(&self, code_id: Uuid, version: i64) -> Result<Option<i64>> {
        let key = CacheKey::general_code_usage(&code_id, version);
        Ok(self.cache.get::<i64>(&key).await?)
    }

    async fn put_count(&self, code_id: Uuid, version: i64, count: i64) -> Result<()> {
        let key = CacheKey::general_code_usage(&code_id, version);
        self.cache.set(&key, &count, self.ttl).await?;
        Ok(())
    }

    async fn bump_version(&self, code_id: Uuid) -> Result<i64> {
        let key = CacheKey::general_code_usage_version(&code_id);
        Ok(self.cache.incr(&key).await?)
    }
}
