use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::Config;
use crate::errors::{NetworkError, ParseError, PriceError};
use crate::jupiter::{PriceFeed, RouteQuoter};
use crate::models::SwapQuoteRoute;

/// Aggregator error codes that just mean "nothing to trade through"
const NO_ROUTE_CODES: &[&str] = &["COULD_NOT_FIND_ANY_ROUTE", "NO_ROUTES_FOUND", "TOKEN_NOT_TRADABLE"];

/// Quote envelopes: the older API returns a ranked list, v6 the best route only
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuoteEnvelope {
    Ranked { data: Vec<serde_json::Value> },
    Single(serde_json::Value),
}

/// Amounts come back as strings from v6 and as numbers from older versions
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(u64),
    Text(String),
}

impl RawAmount {
    fn value(&self) -> Result<u64, ParseError> {
        match self {
            RawAmount::Number(n) => Ok(*n),
            RawAmount::Text(s) => s.parse().map_err(|_| ParseError::InvalidAmount(s.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RouteAmounts {
    in_amount: RawAmount,
    out_amount: RawAmount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiError {
    #[serde(default)]
    error: String,
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwapResponse {
    swap_transaction: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct PriceEntry {
    price: RawPrice,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    data: HashMap<String, Option<PriceEntry>>,
}

/// Client for the Jupiter quote, swap and price APIs
pub struct JupiterClient {
    http: Client,
    quote_api: String,
    price_api: String,
    slippage_bps: u16,
    vs_token: Pubkey,
}

impl JupiterClient {
    pub fn new(quote_api: &str, price_api: &str, slippage_bps: u16, vs_token: Pubkey) -> Result<Self, NetworkError> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            http,
            quote_api: quote_api.trim_end_matches('/').to_string(),
            price_api: price_api.to_string(),
            slippage_bps,
            vs_token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, NetworkError> {
        Self::new(
            &config.jupiter_quote_api,
            &config.jupiter_price_api,
            config.slippage_bps,
            config.quote_mint,
        )
    }

    /// Ask the aggregator to build an unsigned transaction for `route`
    pub async fn swap_transaction(
        &self,
        route: SwapQuoteRoute,
        user: &Pubkey,
    ) -> Result<VersionedTransaction, NetworkError> {
        let body = serde_json::json!({
            "quoteResponse": route.route_descriptor,
            "userPublicKey": user.to_string(),
            "wrapAndUnwrapSol": true,
            "dynamicComputeUnitLimit": true,
        });

        let response = self
            .http
            .post(format!("{}/swap", self.quote_api))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(NetworkError::Status { status: status.as_u16(), body: text });
        }

        let response: SwapResponse = serde_json::from_str(&text).map_err(ParseError::from)?;
        Ok(decode_transaction(&response.swap_transaction)?)
    }
}

#[async_trait]
impl RouteQuoter for JupiterClient {
    async fn quote(
        &self,
        input_mint: &Pubkey,
        output_mint: &Pubkey,
        amount: u64,
    ) -> Result<Option<SwapQuoteRoute>, NetworkError> {
        debug!("Quoting {} {} -> {}", amount, input_mint, output_mint);
        let response = self
            .http
            .get(format!("{}/quote", self.quote_api))
            .query(&[
                ("inputMint", input_mint.to_string()),
                ("outputMint", output_mint.to_string()),
                ("amount", amount.to_string()),
                ("slippageBps", self.slippage_bps.to_string()),
            ])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            if is_no_route_error(&text) {
                return Ok(None);
            }
            return Err(NetworkError::Status { status: status.as_u16(), body: text });
        }

        let body: serde_json::Value = serde_json::from_str(&text).map_err(ParseError::from)?;
        Ok(parse_quote_response(body, input_mint, output_mint)?)
    }
}

#[async_trait]
impl PriceFeed for JupiterClient {
    async fn price(&self, mint: &Pubkey) -> Result<f64, PriceError> {
        let response = self
            .http
            .get(&self.price_api)
            .query(&[("ids", mint.to_string()), ("vsToken", self.vs_token.to_string())])
            .send()
            .await
            .map_err(NetworkError::from)?;
        let status = response.status();
        let text = response.text().await.map_err(NetworkError::from)?;
        if !status.is_success() {
            return Err(NetworkError::Status { status: status.as_u16(), body: text }.into());
        }

        let body: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| NetworkError::from(ParseError::from(e)))?;
        parse_price_response(body, mint)
    }
}

fn is_no_route_error(body: &str) -> bool {
    match serde_json::from_str::<ApiError>(body) {
        Ok(err) => match err.error_code.as_deref() {
            Some(code) => NO_ROUTE_CODES.contains(&code),
            None => err.error.to_lowercase().contains("no route")
                || err.error.to_lowercase().contains("could not find any route"),
        },
        Err(_) => false,
    }
}

/// Pick the best route out of a quote response, `None` when there is none
fn parse_quote_response(
    body: serde_json::Value,
    input_mint: &Pubkey,
    output_mint: &Pubkey,
) -> Result<Option<SwapQuoteRoute>, ParseError> {
    let route = match serde_json::from_value::<QuoteEnvelope>(body)? {
        QuoteEnvelope::Ranked { data } => match data.into_iter().next() {
            Some(route) => route,
            None => return Ok(None),
        },
        QuoteEnvelope::Single(route) => route,
    };

    let amounts: RouteAmounts = serde_json::from_value(route.clone())?;
    Ok(Some(SwapQuoteRoute {
        input_mint: *input_mint,
        output_mint: *output_mint,
        input_amount: amounts.in_amount.value()?,
        expected_output_amount: amounts.out_amount.value()?,
        route_descriptor: route,
    }))
}

fn parse_price_response(body: serde_json::Value, mint: &Pubkey) -> Result<f64, PriceError> {
    let response: PriceResponse = serde_json::from_value(body)
        .map_err(|e| NetworkError::from(ParseError::from(e)))?;
    let key = mint.to_string();

    let entry = match response.data.get(&key) {
        Some(Some(entry)) => entry,
        _ => return Err(PriceError::Missing(key)),
    };
    let price = match &entry.price {
        RawPrice::Number(n) => *n,
        RawPrice::Text(s) => s
            .parse::<f64>()
            .map_err(|_| NetworkError::from(ParseError::InvalidAmount(s.clone())))?,
    };

    if !price.is_finite() || price <= 0.0 {
        return Err(PriceError::Missing(key));
    }
    Ok(price)
}

fn decode_transaction(encoded: &str) -> Result<VersionedTransaction, ParseError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| ParseError::Transaction(e.to_string()))?;
    bincode::deserialize(&bytes).map_err(|e| ParseError::Transaction(e.to_string()))
}
