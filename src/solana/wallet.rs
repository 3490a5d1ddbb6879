use anyhow::{anyhow, Context, Result};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::keypair::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::VersionedTransaction;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Holds the trading keypair and signs swap transactions
pub struct Wallet {
    keypair: Keypair,
}

impl Wallet {
    /// Load a wallet from a keypair file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(&path)
            .with_context(|| format!("Failed to open keypair file at {:?}", path.as_ref()))?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read keypair file at {:?}", path.as_ref()))?;

        Self::from_secret(&String::from_utf8_lossy(&bytes))
            .with_context(|| format!("Failed to parse keypair file at {:?}", path.as_ref()))
    }

    /// Parse a secret key given either as a JSON byte array or as base58
    pub fn from_secret(secret: &str) -> Result<Self> {
        let secret = secret.trim();

        // Try to deserialize as a JSON string containing byte array
        if let Ok(keypair_bytes) = serde_json::from_str::<Vec<u8>>(secret) {
            return Self::from_keypair_bytes(&keypair_bytes);
        }

        // Try to deserialize as a base58 encoded keypair
        match bs58::decode(secret).into_vec() {
            Ok(keypair_bytes) => Self::from_keypair_bytes(&keypair_bytes),
            Err(_) => Err(anyhow!("Secret key is neither a JSON byte array nor base58")),
        }
    }

    fn from_keypair_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 64 {
            return Err(anyhow!("Expected 64 secret key bytes, got {}", bytes.len()));
        }
        let keypair = Keypair::from_bytes(bytes).map_err(|e| anyhow!("Invalid keypair: {}", e))?;
        Ok(Self { keypair })
    }

    /// Get the public key of the wallet
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Re-sign an aggregator-built transaction with our keypair
    pub fn sign_versioned_transaction(&self, unsigned: VersionedTransaction) -> Result<VersionedTransaction> {
        VersionedTransaction::try_new(unsigned.message, &[&self.keypair])
            .map_err(|e| anyhow!("Failed to sign transaction: {}", e))
    }
}
