use std::sync::Arc;

use crate::cache::{CacheBackend, CacheStatus};
use crate::error::ApiError;
use crate::metrics::Metrics;
use crate::portfolio::{upstream_error_message, PortfolioResponse};
use crate::upstream::{BalanceUpstream, UpstreamError};

pub const MIN_ADDRESS_LEN: usize = 3;

/// Validates the raw query value and returns the trimmed cache key.
pub fn validate_address(raw: &str) -> Result<&str, ApiError> {
    if raw.chars().count() < MIN_ADDRESS_LEN {
        return Err(ApiError::InvalidInput(format!(
            "address must be at least {MIN_ADDRESS_LEN} characters"
        )));
    }

    let address = raw.trim();
    if address.is_empty() {
        return Err(ApiError::InvalidInput("address is required".to_string()));
    }

    Ok(address)
}

pub struct BalanceHandler {
    upstream: Arc<dyn BalanceUpstream>,
    cache: Arc<dyn CacheBackend>,
    metrics: Arc<Metrics>,
}

impl BalanceHandler {
    pub fn new(
        upstream: Arc<dyn BalanceUpstream>,
        cache: Arc<dyn CacheBackend>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            upstream,
            cache,
            metrics,
        }
    }

    pub async fn total_balance(&self, raw_address: &str) -> Result<PortfolioResponse, ApiError> {
        let result = self.resolve(raw_address).await;

        if let Err(err) = &result {
            self.metrics
                .error_counter
                .with_label_values(&[err.kind()])
                .inc();
        }

        result
    }

    async fn resolve(&self, raw_address: &str) -> Result<PortfolioResponse, ApiError> {
        let address = validate_address(raw_address)?;

        match self.cache.read(address) {
            CacheStatus::Cached { key, value } => {
                tracing::info!("cache hit for key {}", key);
                self.metrics.cache_hit_counter.inc();
                return Ok(value);
            }
            CacheStatus::Expired { key } => {
                tracing::info!("cache expired for key {}", key);
                self.metrics.cache_miss_counter.inc();
                self.metrics.cache_expired_miss_counter.inc();
            }
            CacheStatus::Missed { key } => {
                tracing::info!("cache missed for key {}", key);
                self.metrics.cache_miss_counter.inc();
            }
        }

        self.metrics.upstream_request_counter.inc();
        let log_unreachable = |err: UpstreamError| {
            tracing::error!(
                address,
                kind = err.kind(),
                "fail to make upstream request because: {err}"
            );
            ApiError::UpstreamUnreachable(err)
        };

        let response = self
            .upstream
            .fetch_balance(address)
            .await
            .map_err(log_unreachable)?;

        if response.status == 400 {
            let message = match response.json() {
                Ok(body) => upstream_error_message(&body),
                Err(_) => "Bad request".to_string(),
            };
            tracing::warn!(address, "upstream rejected request: {message}");
            return Err(ApiError::InvalidUpstreamRequest(message));
        }

        if response.status >= 500 {
            tracing::warn!(address, status = response.status, "upstream server error");
            return Err(ApiError::UpstreamServerError(response.status));
        }

        let body = response.json().map_err(log_unreachable)?;
        let portfolio = PortfolioResponse::from_upstream(body).map_err(|err| {
            tracing::error!(
                address,
                status = response.status,
                "fail to normalize upstream response: {err}"
            );
            ApiError::NormalizationFailure(err)
        })?;

        self.cache.write(address, portfolio.clone());

        Ok(portfolio)
    }
}
