pub mod lru_backend;
pub mod memory_backend;

use std::time::{Duration, Instant};

use crate::portfolio::PortfolioResponse;

pub enum CacheStatus {
    Cached { key: String, value: PortfolioResponse },
    Expired { key: String },
    Missed { key: String },
}

pub trait CacheBackend: Send + Sync {
    fn read(&self, key: &str) -> CacheStatus;
    fn write(&self, key: &str, value: PortfolioResponse);
    fn len(&self) -> usize;
}

#[derive(Debug, Clone)]
pub struct CacheValue {
    pub data: PortfolioResponse,
    pub expires_at: Instant,
}

impl CacheValue {
    pub fn new(data: PortfolioResponse, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at <= Instant::now()
    }
}
