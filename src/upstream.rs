use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Url;
use serde_json::Value;

pub const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);
const TOTAL_BALANCE_PATH: &str = "/user/total_balance";

#[derive(thiserror::Error, Debug)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout,

    #[error("fail to connect to upstream: {0}")]
    Connect(String),

    #[error("upstream body is not valid json: {0}")]
    MalformedBody(String),

    #[error("upstream transport error: {0}")]
    Transport(String),
}

impl UpstreamError {
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Timeout => "timeout",
            UpstreamError::Connect(_) => "connect",
            UpstreamError::MalformedBody(_) => "malformed_body",
            UpstreamError::Transport(_) => "transport",
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout
        } else if err.is_connect() {
            UpstreamError::Connect(err.to_string())
        } else if err.is_decode() {
            UpstreamError::MalformedBody(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

/// Raw upstream reply. The body is only decoded once the status says it should be.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn json(&self) -> Result<Value, UpstreamError> {
        serde_json::from_slice(&self.body).map_err(|err| UpstreamError::MalformedBody(err.to_string()))
    }
}

#[async_trait]
pub trait BalanceUpstream: Send + Sync {
    async fn fetch_balance(&self, address: &str) -> Result<UpstreamResponse, UpstreamError>;
}

/// RapidAPI gateway client. One instance is shared by every request so the
/// connection pool is reused.
pub struct RapidApiClient {
    http_client: reqwest::Client,
    endpoint: Url,
}

impl RapidApiClient {
    pub fn new(base_url: Url, api_key: &str, api_host: &str) -> anyhow::Result<Self> {
        Self::with_timeout(base_url, api_key, api_host, UPSTREAM_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: Url,
        api_key: &str,
        api_host: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut key = HeaderValue::from_str(api_key).context("api key is not a valid header value")?;
        key.set_sensitive(true);
        let host = HeaderValue::from_str(api_host).context("api host is not a valid header value")?;

        let mut headers = HeaderMap::new();
        headers.insert("x-rapidapi-key", key);
        headers.insert("x-rapidapi-host", host);

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("fail to build upstream http client")?;

        let endpoint = base_url
            .join(TOTAL_BALANCE_PATH)
            .context("fail to build upstream endpoint url")?;

        Ok(Self {
            http_client,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl BalanceUpstream for RapidApiClient {
    async fn fetch_balance(&self, address: &str) -> Result<UpstreamResponse, UpstreamError> {
        let response = self
            .http_client
            .get(self.endpoint.clone())
            .query(&[("address", address)])
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(UpstreamResponse { status, body })
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
    use serde_json::json;
    use std::collections::HashMap;
    use std::net::TcpListener;

    async fn fake_total_balance(
        req: HttpRequest,
        query: web::Query<HashMap<String, String>>,
    ) -> HttpResponse {
        let key = req.headers().get("x-rapidapi-key").and_then(|v| v.to_str().ok());
        let host = req.headers().get("x-rapidapi-host").and_then(|v| v.to_str().ok());

        match query.get("address").map(String::as_str) {
            Some("slow") => {
                actix_web::rt::time::sleep(Duration::from_millis(500)).await;
                HttpResponse::Ok().json(json!({"totalValue": 0.0}))
            }
            Some("garbage") => HttpResponse::Ok().body("<html>oops</html>"),
            Some("broken") => HttpResponse::ServiceUnavailable().json(json!({"error": "down"})),
            Some("gateway-down") => HttpResponse::ServiceUnavailable().body("Service Unavailable"),
            Some("html-reject") => HttpResponse::BadRequest().body("<html>bad request</html>"),
            Some(address) => HttpResponse::Ok().json(json!({
                "address": address,
                "key": key,
                "host": host,
                "totalValue": 1.0,
            })),
            None => HttpResponse::BadRequest().json(json!({"error": "address missing"})),
        }
    }

    pub(crate) fn spawn_fake_upstream() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = HttpServer::new(|| {
            App::new().route("/user/total_balance", web::get().to(fake_total_balance))
        })
        .listen(listener)
        .unwrap()
        .workers(1)
        .run();
        actix_web::rt::spawn(server);

        Url::parse(&format!("http://127.0.0.1:{port}")).unwrap()
    }

    pub(crate) fn client(base_url: Url, timeout: Duration) -> RapidApiClient {
        RapidApiClient::with_timeout(base_url, "secret-key", "balance.example.com", timeout).unwrap()
    }

    #[test]
    fn test_endpoint() {
        let client = RapidApiClient::new(
            Url::parse("https://balance.example.com").unwrap(),
            "k",
            "balance.example.com",
        )
        .unwrap();

        assert_eq!(
            client.endpoint().as_str(),
            "https://balance.example.com/user/total_balance"
        );
    }

    #[test]
    fn test_invalid_header_value() {
        let result = RapidApiClient::new(
            Url::parse("https://balance.example.com").unwrap(),
            "bad\nkey",
            "balance.example.com",
        );
        assert!(result.is_err());
    }

    #[actix_web::test]
    async fn test_sends_address_and_headers() {
        let client = client(spawn_fake_upstream(), UPSTREAM_TIMEOUT);
        let response = client.fetch_balance("So1 address").await.unwrap();

        let body = response.json().unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(body["address"], "So1 address");
        assert_eq!(body["key"], "secret-key");
        assert_eq!(body["host"], "balance.example.com");
    }

    #[actix_web::test]
    async fn test_passes_through_error_status() {
        let client = client(spawn_fake_upstream(), UPSTREAM_TIMEOUT);
        let response = client.fetch_balance("broken").await.unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(response.json().unwrap()["error"], "down");
    }

    #[actix_web::test]
    async fn test_non_json_error_body_keeps_status() {
        let client = client(spawn_fake_upstream(), UPSTREAM_TIMEOUT);
        let response = client.fetch_balance("gateway-down").await.unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(response.body, b"Service Unavailable");
    }

    #[actix_web::test]
    async fn test_timeout() {
        let client = client(spawn_fake_upstream(), Duration::from_millis(100));
        let err = client.fetch_balance("slow").await.unwrap_err();

        assert!(matches!(err, UpstreamError::Timeout), "got {err:?}");
    }

    #[actix_web::test]
    async fn test_malformed_body() {
        let client = client(spawn_fake_upstream(), UPSTREAM_TIMEOUT);
        let response = client.fetch_balance("garbage").await.unwrap();
        let err = response.json().unwrap_err();

        assert!(matches!(err, UpstreamError::MalformedBody(_)), "got {err:?}");
    }

    #[actix_web::test]
    async fn test_connection_refused() {
        // bind then drop to get a port nothing listens on
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let client = client(
            Url::parse(&format!("http://127.0.0.1:{port}")).unwrap(),
            UPSTREAM_TIMEOUT,
        );

        let err = client.fetch_balance("addr").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Connect(_)), "got {err:?}");
    }
}
