use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    pub token_name: String,
    pub token_symbol: String,
    pub amount: f64,
    pub usd_value: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StakingBalance {
    pub staking_account: String,
    pub amount: f64,
    pub usd_value: f64,
}

/// Canonical shape returned to every caller, whatever extra fields the upstream sends.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioResponse {
    #[serde(default)]
    pub token_balances: Vec<TokenBalance>,
    #[serde(default)]
    pub staking_balances: Vec<StakingBalance>,
    #[serde(default)]
    pub nft_balances: i64,
    pub total_value: f64,
}

#[derive(thiserror::Error, Debug)]
#[error("upstream body does not match the portfolio shape: {0}")]
pub struct NormalizationError(#[from] serde_json::Error);

impl PortfolioResponse {
    /// Parses an upstream body. `totalValue` is required, the rest fall back to empty/zero.
    pub fn from_upstream(body: Value) -> Result<Self, NormalizationError> {
        Ok(serde_json::from_value(body)?)
    }
}

/// Message to forward when the upstream rejects the request with a 400.
pub fn upstream_error_message(body: &Value) -> String {
    match body.get("error") {
        Some(Value::String(message)) => message.clone(),
        Some(Value::Null) | None => "Bad request".to_string(),
        Some(other) => other.to_string(),
    }
}
