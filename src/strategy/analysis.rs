use async_trait::async_trait;
use log::{debug, info, warn};
use solana_sdk::pubkey::Pubkey;

use crate::errors::NetworkError;
use crate::models::{MintMetadata, RiskReason, RiskVerdict};
use crate::solana::SolanaClient;
use crate::utils::format_pubkey;

/// Where mint metadata comes from
#[async_trait]
pub trait MintMetadataSource: Send + Sync {
    async fn fetch_mint(&self, mint: &Pubkey) -> Result<Option<MintMetadata>, NetworkError>;
}

#[async_trait]
impl MintMetadataSource for SolanaClient {
    async fn fetch_mint(&self, mint: &Pubkey) -> Result<Option<MintMetadata>, NetworkError> {
        self.get_mint_metadata(mint).await
    }
}

/// Screens freshly listed tokens for the classic rug-pull setups.
///
/// Fails closed: a mint we cannot read is never traded.
pub struct RiskFilter<S> {
    source: S,
    liquidity_threshold: u64,
}

impl<S: MintMetadataSource> RiskFilter<S> {
    pub fn new(source: S, liquidity_threshold: u64) -> Self {
        Self {
            source,
            liquidity_threshold,
        }
    }

    /// Classify already fetched metadata
    pub fn evaluate(&self, metadata: &MintMetadata) -> RiskVerdict {
        if metadata.mint_authority.is_some() {
            return RiskVerdict::reject(RiskReason::MintAuthorityPresent);
        }
        if metadata.freeze_authority.is_some() {
            return RiskVerdict::reject(RiskReason::FreezeAuthorityPresent);
        }
        if metadata.supply < self.liquidity_threshold {
            return RiskVerdict::reject(RiskReason::SupplyBelowThreshold);
        }
        RiskVerdict::accept(metadata.decimals)
    }

    /// Fetch and classify a candidate token
    pub async fn screen(&self, mint: &Pubkey) -> RiskVerdict {
        debug!("Screening token {}", mint);

        let verdict = match self.source.fetch_mint(mint).await {
            Ok(Some(metadata)) => self.evaluate(&metadata),
            Ok(None) => RiskVerdict::reject(RiskReason::AccountMissing),
            Err(e) => {
                warn!("Risk check for {} failed: {}", format_pubkey(mint), e);
                RiskVerdict::reject(RiskReason::FetchFailed)
            }
        };

        if verdict.accepted {
            info!("Token {} passed risk checks", format_pubkey(mint));
        } else {
            info!("Token {} rejected: {}", format_pubkey(mint), verdict.reason);
        }
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ParseError;
    use std::collections::HashMap;

    const AUTHORITY: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    /// In-memory mint registry; unknown mints fail like a broken RPC would
    #[derive(Default)]
    struct StaticMints {
        mints: HashMap<Pubkey, Option<MintMetadata>>,
    }

    #[async_trait]
    impl MintMetadataSource for StaticMints {
        async fn fetch_mint(&self, mint: &Pubkey) -> Result<Option<MintMetadata>, NetworkError> {
            match self.mints.get(mint) {
                Some(metadata) => Ok(metadata.clone()),
                None => Err(ParseError::UnexpectedAccount("not a mint".to_string()).into()),
            }
        }
    }

    fn metadata(mint_authority: Option<&str>, freeze_authority: Option<&str>, supply: u64) -> MintMetadata {
        MintMetadata {
            mint_authority: mint_authority.map(str::to_string),
            freeze_authority: freeze_authority.map(str::to_string),
            supply,
            decimals: 6,
        }
    }

    fn filter_with(entries: Vec<(Pubkey, Option<MintMetadata>)>) -> RiskFilter<StaticMints> {
        RiskFilter::new(
            StaticMints {
                mints: entries.into_iter().collect(),
            },
            1000,
        )
    }

    #[tokio::test]
    async fn renounced_mint_with_supply_is_accepted() {
        let mint = Pubkey::new_unique();
        let filter = filter_with(vec![(mint, Some(metadata(None, None, 1_000_000)))]);

        let verdict = filter.screen(&mint).await;
        assert!(verdict.accepted);
        assert_eq!(verdict.reason, RiskReason::Passed);
        assert_eq!(verdict.decimals, Some(6));
    }

    #[tokio::test]
    async fn any_live_authority_is_rejected() {
        let filter = filter_with(vec![]);
        for (mint_auth, freeze_auth) in [
            (Some(AUTHORITY), None),
            (None, Some(AUTHORITY)),
            (Some(AUTHORITY), Some(AUTHORITY)),
        ] {
            let verdict = filter.evaluate(&metadata(mint_auth, freeze_auth, u64::MAX));
            assert!(!verdict.accepted, "{:?}/{:?} should be rejected", mint_auth, freeze_auth);
        }

        let verdict = filter.evaluate(&metadata(None, Some(AUTHORITY), 5000));
        assert_eq!(verdict.reason, RiskReason::FreezeAuthorityPresent);
    }

    #[tokio::test]
    async fn thin_supply_is_rejected_even_when_renounced() {
        let filter = filter_with(vec![]);
        assert_eq!(
            filter.evaluate(&metadata(None, None, 999)).reason,
            RiskReason::SupplyBelowThreshold
        );
        assert!(filter.evaluate(&metadata(None, None, 1000)).accepted);
    }

    #[tokio::test]
    async fn unreadable_mints_fail_closed() {
        let missing = Pubkey::new_unique();
        let filter = filter_with(vec![(missing, None)]);

        let verdict = filter.screen(&missing).await;
        assert_eq!(verdict, RiskVerdict::reject(RiskReason::AccountMissing));

        let verdict = filter.screen(&Pubkey::new_unique()).await;
        assert_eq!(verdict, RiskVerdict::reject(RiskReason::FetchFailed));
    }
}
