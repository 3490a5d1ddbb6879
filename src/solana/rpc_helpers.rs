use log::debug;
use serde::Deserialize;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_request::RpcRequest;

use crate::errors::{NetworkError, ParseError};
use crate::models::MintMetadata;

/// Make a direct raw JSON RPC request to the Solana node
pub async fn make_raw_rpc_request(
    rpc_client: &RpcClient,
    request: RpcRequest,
    params: serde_json::Value,
) -> Result<serde_json::Value, NetworkError> {
    debug!("RPC {} {}", request, params);
    let response = rpc_client.send(request, params).await?;
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct AccountInfoResponse {
    value: Option<AccountInfo>,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ParsedAccountData {
    program: String,
    parsed: ParsedAccount,
}

#[derive(Debug, Deserialize)]
struct ParsedAccount {
    #[serde(rename = "type")]
    kind: String,
    info: ParsedMintInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParsedMintInfo {
    mint_authority: Option<String>,
    freeze_authority: Option<String>,
    supply: String,
    decimals: u8,
}

/// Decode a `getAccountInfo` (jsonParsed) response for an SPL mint.
///
/// A missing account is `Ok(None)`; anything that is not a parsed mint is an
/// error rather than a silent default.
pub fn parse_mint_account(response: serde_json::Value) -> Result<Option<MintMetadata>, ParseError> {
    let response: AccountInfoResponse = serde_json::from_value(response)?;
    let Some(account) = response.value else {
        return Ok(None);
    };

    let data: ParsedAccountData = serde_json::from_value(account.data)
        .map_err(|e| ParseError::UnexpectedAccount(e.to_string()))?;
    if !data.program.starts_with("spl-token") || data.parsed.kind != "mint" {
        return Err(ParseError::UnexpectedAccount(format!(
            "{} account owned by {}",
            data.parsed.kind, data.program
        )));
    }

    let info = data.parsed.info;
    let supply = info
        .supply
        .parse::<u64>()
        .map_err(|_| ParseError::InvalidAmount(info.supply.clone()))?;

    Ok(Some(MintMetadata {
        mint_authority: info.mint_authority,
        freeze_authority: info.freeze_authority,
        supply,
        decimals: info.decimals,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mint_response(mint_authority: serde_json::Value, supply: &str) -> serde_json::Value {
        json!({
            "context": { "slot": 250_000_000u64 },
            "value": {
                "data": {
                    "parsed": {
                        "info": {
                            "decimals": 6,
                            "freezeAuthority": null,
                            "isInitialized": true,
                            "mintAuthority": mint_authority,
                            "supply": supply
                        },
                        "type": "mint"
                    },
                    "program": "spl-token",
                    "space": 82
                },
                "executable": false,
                "lamports": 1461600,
                "owner": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
                "rentEpoch": 0
            }
        })
    }

    #[test]
    fn parses_a_renounced_mint() {
        let metadata = parse_mint_account(mint_response(json!(null), "1000000000"))
            .unwrap()
            .unwrap();
        assert_eq!(metadata.mint_authority, None);
        assert_eq!(metadata.freeze_authority, None);
        assert_eq!(metadata.supply, 1_000_000_000);
        assert_eq!(metadata.decimals, 6);
    }

    #[test]
    fn keeps_a_live_mint_authority() {
        let authority = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
        let metadata = parse_mint_account(mint_response(json!(authority), "5"))
            .unwrap()
            .unwrap();
        assert_eq!(metadata.mint_authority.as_deref(), Some(authority));
    }

    #[test]
    fn missing_account_is_not_an_error() {
        let response = json!({ "context": { "slot": 1 }, "value": null });
        assert!(parse_mint_account(response).unwrap().is_none());
    }

    #[test]
    fn binary_account_data_is_rejected() {
        let response = json!({
            "context": { "slot": 1 },
            "value": { "data": ["AAAA", "base64"], "owner": "11111111111111111111111111111111" }
        });
        assert!(matches!(
            parse_mint_account(response),
            Err(ParseError::UnexpectedAccount(_))
        ));
    }

    #[test]
    fn non_numeric_supply_is_rejected() {
        assert!(matches!(
            parse_mint_account(mint_response(json!(null), "lots")),
            Err(ParseError::InvalidAmount(_))
        ));
    }
}
