use std::time::Duration;

use dashmap::DashMap;

use super::{CacheBackend, CacheStatus, CacheValue};
use crate::portfolio::PortfolioResponse;

/// Sharded map backend. Capacity is enforced per write, so concurrent writers can
/// overshoot it by at most the number of writes in flight.
pub struct MemoryBackend {
    data: DashMap<String, CacheValue>,
    max_items: usize,
    ttl: Duration,
}

impl MemoryBackend {
    pub fn new(max_items: usize, ttl: Duration) -> Self {
        Self {
            data: DashMap::with_capacity(max_items),
            max_items,
            ttl,
        }
    }

    fn make_room(&self) {
        self.data.retain(|_, value| !value.is_expired());

        while self.data.len() >= self.max_items {
            let oldest = self
                .data
                .iter()
                .min_by_key(|entry| entry.value().expires_at)
                .map(|entry| entry.key().clone());

            match oldest {
                Some(key) => {
                    self.data.remove(&key);
                }
                None => break,
            }
        }
    }
}

impl CacheBackend for MemoryBackend {
    fn read(&self, key: &str) -> CacheStatus {
        let expired = match self.data.get(key) {
            Some(value) if !value.is_expired() => {
                return CacheStatus::Cached {
                    key: key.to_string(),
                    value: value.data.clone(),
                }
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.data.remove_if(key, |_, value| value.is_expired());
            CacheStatus::Expired {
                key: key.to_string(),
            }
        } else {
            CacheStatus::Missed {
                key: key.to_string(),
            }
        }
    }

    fn write(&self, key: &str, value: PortfolioResponse) {
        if self.data.len() >= self.max_items && !self.data.contains_key(key) {
            self.make_room();
        }

        let _ = self
            .data
            .insert(key.to_string(), CacheValue::new(value, self.ttl));
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
