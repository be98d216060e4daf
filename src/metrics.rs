use actix_web::{web, Error, HttpResponse};
use prometheus::{Counter, Encoder, IntCounterVec, Registry, TextEncoder};

use crate::app_state::AppState;

pub const METRICS_PREFIX: &str = "portfolio_proxy";

pub struct Metrics {
    pub registry: Registry,
    pub cache_hit_counter: Counter,
    pub cache_miss_counter: Counter,
    pub cache_expired_miss_counter: Counter,
    pub upstream_request_counter: Counter,
    pub error_counter: IntCounterVec,
}

fn add_prefix(prefix: &str, name: &str) -> String {
    format!("{}_{}", prefix, name)
}

fn register_counter_with_prefix(
    registry: &Registry,
    prefix: &str,
    name: &str,
    description: &str,
) -> prometheus::Result<Counter> {
    let opts = prometheus::Opts::new(add_prefix(prefix, name), description);
    let counter = Counter::with_opts(opts)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

fn register_int_counter_vec_with_prefix(
    registry: &Registry,
    prefix: &str,
    name: &str,
    description: &str,
    labels: &[&str],
) -> prometheus::Result<IntCounterVec> {
    let opts = prometheus::Opts::new(add_prefix(prefix, name), description);
    let counter_vec = IntCounterVec::new(opts, labels)?;
    registry.register(Box::new(counter_vec.clone()))?;
    Ok(counter_vec)
}

impl Metrics {
    pub fn new(prefix: &str) -> prometheus::Result<Self> {
        let registry = Registry::new();

        let cache_hit_counter = register_counter_with_prefix(
            &registry,
            prefix,
            "cache_hit_total",
            "Total number of cache hits.",
        )?;
        let cache_miss_counter = register_counter_with_prefix(
            &registry,
            prefix,
            "cache_miss_total",
            "Total number of cache misses, expired entries included.",
        )?;
        let cache_expired_miss_counter = register_counter_with_prefix(
            &registry,
            prefix,
            "cache_expired_miss_total",
            "Total number of misses caused by an expired entry.",
        )?;
        let upstream_request_counter = register_counter_with_prefix(
            &registry,
            prefix,
            "upstream_request_total",
            "Total number of requests sent to the balance upstream.",
        )?;
        let error_counter = register_int_counter_vec_with_prefix(
            &registry,
            prefix,
            "error_total",
            "Total number of failed balance requests per error kind.",
            &["kind"],
        )?;

        Ok(Self {
            registry,
            cache_hit_counter,
            cache_miss_counter,
            cache_expired_miss_counter,
            upstream_request_counter,
            error_counter,
        })
    }
}

#[actix_web::get("/metrics")]
pub async fn metrics(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let encoder = TextEncoder::new();
    let metric_families = data.metrics.registry.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(actix_web::error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(buffer))
}
