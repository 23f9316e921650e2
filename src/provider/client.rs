// =============================================================================
// Market Data Provider — REST client for history, search and broker login
// =============================================================================
//
// Thin boundary around the upstream market-data service. Everything here is
// pass-through plumbing: history bars come back chronological as sent, symbol
// search results are relayed unranked, and login simply forwards the broker
// credentials. Failures are returned to the API layer, which degrades the
// response (empty series + failure indicator) instead of faulting — the
// indicator engine only ever runs on an already-available series.
// =============================================================================

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::types::{Bar, IntervalTag};

/// A symbol lookup hit from the provider's instrument master.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMatch {
    #[serde(rename = "tradingsymbol")]
    pub trading_symbol: String,
    #[serde(rename = "symboltoken")]
    pub symbol_token: String,
    #[serde(default)]
    pub exchange: String,
}

/// Broker credentials forwarded verbatim from the dashboard login form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "apiKey", default)]
    pub api_key: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub password: String,
    pub totp: String,
}

/// REST client for the upstream market-data service.
#[derive(Clone)]
pub struct ProviderClient {
    base_url: String,
    client: reqwest::Client,
}

impl ProviderClient {
    /// Create a new `ProviderClient` with the given request timeout.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let base_url = base_url.into();
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build provider HTTP client")?;

        debug!(base_url = %base_url, "ProviderClient initialised");
        Ok(Self { base_url, client })
    }

    /// Fetch the historical OHLC series for one symbol.
    ///
    /// Bars come back in chronological order; an empty body is a valid
    /// (empty) series, not an error.
    #[instrument(skip(self), name = "provider::fetch_history")]
    pub async fn fetch_history(
        &self,
        symbol: &str,
        interval: IntervalTag,
        days: u32,
    ) -> Result<Vec<Bar>> {
        let url = format!(
            "{}/stock-history/{symbol}?interval={interval}&days={days}",
            self.base_url
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("history request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("history request returned {status}: {body}");
        }

        let bars: Vec<Bar> = resp
            .json()
            .await
            .context("failed to decode history payload")?;

        debug!(symbol = %symbol, bars = bars.len(), "history fetched");
        Ok(bars)
    }

    /// Look up symbols matching a free-text query. Plain pass-through — no
    /// fuzzy ranking on this side.
    #[instrument(skip(self), name = "provider::search_symbols")]
    pub async fn search_symbols(&self, query: &str) -> Result<Vec<SymbolMatch>> {
        let url = format!("{}/search", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[("query", query)])
            .send()
            .await
            .context("search request failed")?;

        let status = resp.status();
        if !status.is_success() {
            bail!("search request returned {status}");
        }

        let matches: Vec<SymbolMatch> = resp
            .json()
            .await
            .context("failed to decode search payload")?;

        Ok(matches)
    }

    /// Forward a broker login. Success here gates session-token issuance in
    /// the API layer; the broker session itself lives upstream.
    #[instrument(skip(self, request), name = "provider::login")]
    pub async fn login(&self, request: &LoginRequest) -> Result<()> {
        let url = format!("{}/login", self.base_url);

        let resp = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .context("login request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("login rejected upstream ({status}): {body}");
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_match_uses_provider_field_names() {
        let json = r#"{ "tradingsymbol": "RELIANCE", "symboltoken": "2885", "exchange": "BSE" }"#;
        let hit: SymbolMatch = serde_json::from_str(json).unwrap();
        assert_eq!(hit.trading_symbol, "RELIANCE");
        assert_eq!(hit.symbol_token, "2885");
        assert_eq!(hit.exchange, "BSE");

        let back = serde_json::to_value(&hit).unwrap();
        assert_eq!(back["tradingsymbol"], serde_json::json!("RELIANCE"));
        assert_eq!(back["symboltoken"], serde_json::json!("2885"));
    }

    #[test]
    fn login_request_round_trips_form_field_names() {
        let json = r#"{ "apiKey": "k", "clientId": "C123", "password": "p", "totp": "000000" }"#;
        let req: LoginRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.client_id, "C123");

        let back = serde_json::to_value(&req).unwrap();
        assert_eq!(back["clientId"], serde_json::json!("C123"));
        assert_eq!(back["apiKey"], serde_json::json!("k"));
    }

    #[test]
    fn login_request_api_key_is_optional() {
        // The dashboard leaves apiKey blank when it is configured server-side.
        let json = r#"{ "clientId": "C123", "password": "p", "totp": "000000" }"#;
        let req: LoginRequest = serde_json::from_str(json).unwrap();
        assert!(req.api_key.is_empty());
    }
}
