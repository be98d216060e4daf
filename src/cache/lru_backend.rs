use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Context;

use super::{CacheBackend, CacheStatus, CacheValue};
use crate::portfolio::PortfolioResponse;

pub struct LruBackend {
    data: Mutex<LruCache<String, CacheValue>>,
    ttl: Duration,
}

impl LruBackend {
    pub fn new(cap: usize, ttl: Duration) -> anyhow::Result<Self> {
        let cap = NonZeroUsize::new(cap).context("lru cache capacity must be non-zero")?;

        Ok(Self {
            data: Mutex::new(LruCache::new(cap)),
            ttl,
        })
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheValue>> {
        // entries are replaced whole, so a poisoned guard still holds a consistent map
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn purge_expired(lru_cache: &mut LruCache<String, CacheValue>) {
    let expired: Vec<String> = lru_cache
        .iter()
        .filter(|(_, value)| value.is_expired())
        .map(|(key, _)| key.clone())
        .collect();

    for key in expired {
        lru_cache.pop(&key);
    }
}

impl CacheBackend for LruBackend {
    fn read(&self, key: &str) -> CacheStatus {
        let key = key.to_string();
        let mut lru_cache = self.lock();

        let expired = match lru_cache.get(&key) {
            Some(value) if !value.is_expired() => {
                return CacheStatus::Cached {
                    value: value.data.clone(),
                    key,
                }
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            lru_cache.pop(&key);
            CacheStatus::Expired { key }
        } else {
            CacheStatus::Missed { key }
        }
    }

    fn write(&self, key: &str, value: PortfolioResponse) {
        let mut lru_cache = self.lock();

        if lru_cache.len() >= lru_cache.cap().get() && !lru_cache.contains(key) {
            purge_expired(&mut lru_cache);
        }

        // put evicts the least recently used entry when still at capacity
        lru_cache.put(key.to_string(), CacheValue::new(value, self.ttl));
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    fn portfolio(total_value: f64) -> PortfolioResponse {
        PortfolioResponse {
            token_balances: vec![],
            staking_balances: vec![],
            nft_balances: 0,
            total_value,
        }
    }

    fn cached_total(status: CacheStatus) -> Option<f64> {
        match status {
            CacheStatus::Cached { value, .. } => Some(value.total_value),
            _ => None,
        }
    }

    #[test]
    fn test_zero_capacity() {
        assert!(LruBackend::new(0, Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_read_write() {
        let cache = LruBackend::new(4, Duration::from_secs(20)).unwrap();

        assert!(matches!(cache.read("addr"), CacheStatus::Missed { key } if key == "addr"));

        cache.write("addr", portfolio(1.0));
        assert_eq!(cached_total(cache.read("addr")), Some(1.0));

        cache.write("addr", portfolio(2.0));
        assert_eq!(cached_total(cache.read("addr")), Some(2.0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let cache = LruBackend::new(4, Duration::from_millis(30)).unwrap();
        cache.write("addr", portfolio(1.0));

        thread::sleep(Duration::from_millis(60));

        assert!(matches!(cache.read("addr"), CacheStatus::Expired { .. }));
        assert!(matches!(cache.read("addr"), CacheStatus::Missed { .. }));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = LruBackend::new(2, Duration::from_secs(20)).unwrap();
        cache.write("a", portfolio(1.0));
        cache.write("b", portfolio(2.0));

        // touch "a" so "b" becomes the eviction candidate
        assert!(cached_total(cache.read("a")).is_some());
        cache.write("c", portfolio(3.0));

        assert_eq!(cache.len(), 2);
        assert!(cached_total(cache.read("a")).is_some());
        assert!(matches!(cache.read("b"), CacheStatus::Missed { .. }));
        assert!(cached_total(cache.read("c")).is_some());
    }

    #[test]
    fn test_evicts_expired_before_live() {
        let cache = LruBackend::new(3, Duration::from_millis(200)).unwrap();
        cache.write("a", portfolio(1.0));
        cache.write("b", portfolio(2.0));
        thread::sleep(Duration::from_millis(250));
        cache.write("c", portfolio(3.0));

        // both expired entries go, not just the least recently used one
        cache.write("d", portfolio(4.0));

        assert_eq!(cache.len(), 2);
        assert!(cached_total(cache.read("c")).is_some());
        assert!(cached_total(cache.read("d")).is_some());
    }

    #[test]
    fn test_bounded_under_many_addresses() {
        let cache = LruBackend::new(512, Duration::from_secs(20)).unwrap();

        for i in 0..2000 {
            cache.write(&format!("address-{i}"), portfolio(i as f64));
        }

        assert_eq!(cache.len(), 512);
        assert_eq!(cached_total(cache.read("address-1999")), Some(1999.0));
        assert!(matches!(cache.read("address-0"), CacheStatus::Missed { .. }));
    }
}
