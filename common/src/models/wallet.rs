// common/src/models/wallet.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::EncryptedKey;

/// A stored wallet. Persisted as an element of the `wallet-collection` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub id: String,
    pub name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
    pub encrypted_private_key: EncryptedKey,
}

/// Wallet as shown to clients, without key material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    pub id: String,
    pub name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

impl From<&WalletRecord> for WalletSummary {
    fn from(wallet: &WalletRecord) -> Self {
        Self {
            id: wallet.id.clone(),
            name: wallet.name.clone(),
            address: wallet.address.clone(),
            created_at: wallet.created_at,
        }
    }
}

/// Stored under `wallet-{id}-recovery`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryRecord {
    pub wallet_id: String,
    /// SHA-256 of the normalized phrase
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

/// Auxiliary labels stored under `wallet-{id}-metadata`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletMetadata {
    pub network: String,
    pub organization: Option<String>,
    pub labels: Vec<String>,
}

/// Which wallet is connected in this context (`current-wallet-pointer`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWalletPointer {
    pub id: String,
    pub name: String,
    pub address: String,
    pub connected_at: DateTime<Utc>,
}
