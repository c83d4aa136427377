//! 进程内缓存
//!
//! 基于 DashMap。读取时清理命中的过期条目；写入时若最早的过期时间已到，
//! 按间隔整体清理一次，避免负缓存随请求名称无限增长。

use super::{CacheBackend, CacheError};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// 两次写入触发的清理之间的最小间隔
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
struct CacheSlot {
    value: String,
    expires_at: Instant,
}

#[derive(Debug)]
struct SweepState {
    /// 已知条目中最早的过期时间
    next_expiry: Option<Instant>,
    last_sweep: Instant,
}

/// 内存缓存
#[derive(Debug)]
pub struct MemoryCache {
    entries: DashMap<String, CacheSlot>,
    sweep: Mutex<SweepState>,
    sweep_interval: Duration,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            sweep: Mutex::new(SweepState {
                next_expiry: None,
                last_sweep: Instant::now(),
            }),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置写入触发清理的最小间隔
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// 未过期的条目是否存在
    pub fn contains_key(&self, key: &str) -> bool {
        self.read(key).is_some()
    }

    /// 当前条目数（包含尚未清理的过期条目）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 清理所有过期条目，返回清理数量
    pub fn purge_expired(&self) -> usize {
        let mut state = self.sweep.lock();
        self.sweep_locked(&mut state, Instant::now())
    }

    /// 写入后调用：最早的过期时间已到且距上次清理超过间隔时整体清理
    fn after_insert(&self, now: Instant, expires_at: Instant) {
        let mut state = self.sweep.lock();
        state.next_expiry = Some(
            state
                .next_expiry
                .map_or(expires_at, |next| next.min(expires_at)),
        );

        let expired = state.next_expiry.is_some_and(|next| next <= now);
        if expired && now.duration_since(state.last_sweep) >= self.sweep_interval {
            let removed = self.sweep_locked(&mut state, now);
            tracing::debug!(removed, "[MemoryCache] 清理过期条目");
        }
    }

    fn sweep_locked(&self, state: &mut SweepState, now: Instant) -> usize {
        let mut removed = 0;
        let mut next_expiry: Option<Instant> = None;
        self.entries.retain(|_, slot| {
            if slot.expires_at > now {
                let expires_at = slot.expires_at;
                next_expiry = Some(next_expiry.map_or(expires_at, |t| t.min(expires_at)));
                true
            } else {
                removed += 1;
                false
            }
        });
        state.next_expiry = next_expiry;
        state.last_sweep = now;
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn read(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        // 先释放读引用，再删除，避免同一分片上的死锁
        let hit = self
            .entries
            .get(key)
            .map(|slot| (slot.value.clone(), slot.expires_at));

        match hit {
            Some((value, expires_at)) if expires_at > now => Some(value),
            Some(_) => {
                self.entries
                    .remove_if(key, |_, slot| slot.expires_at <= Instant::now());
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.read(key))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now + ttl;
        self.entries
            .insert(key.to_string(), CacheSlot { value, expires_at });
        self.after_insert(now, expires_at);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let cache = MemoryCache::new();
        cache
            .set("model:id:m1", "{}".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get("model:id:m1").await.unwrap(), Some("{}".to_string()));
        assert!(cache.contains_key("model:id:m1"));

        cache.delete("model:id:m1").await.unwrap();
        assert_eq!(cache.get("model:id:m1").await.unwrap(), None);

        // 删除不存在的 key 不报错
        cache.delete("model:id:missing").await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let cache = MemoryCache::new();
        cache
            .set("k", "v".to_string(), Duration::from_millis(10))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = MemoryCache::new();
        cache
            .set("short", "v".to_string(), Duration::from_millis(5))
            .await
            .unwrap();
        cache
            .set("long", "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key("long"));
        assert_eq!(cache.purge_expired(), 0);
    }

    #[tokio::test]
    async fn test_expired_entries_reclaimed_on_write() {
        let cache = MemoryCache::new().with_sweep_interval(Duration::ZERO);
        for i in 0..500 {
            let key = format!("resolve:unknown-{i}");
            cache
                .set(&key, "NOT_FOUND".to_string(), Duration::from_millis(10))
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 500);

        tokio::time::sleep(Duration::from_millis(30)).await;

        for i in 0..10 {
            let key = format!("resolve:fresh-{i}");
            cache
                .set(&key, "NOT_FOUND".to_string(), Duration::from_secs(60))
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), 10);
        assert!(cache.contains_key("resolve:fresh-0"));
    }

    #[tokio::test]
    async fn test_write_sweep_respects_interval() {
        let cache = MemoryCache::new().with_sweep_interval(Duration::from_secs(60));
        cache
            .set("short", "v".to_string(), Duration::from_millis(5))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;

        // 间隔未到，不整体清理
        cache
            .set("other", "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.len(), 2);
    }
}
