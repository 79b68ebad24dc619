// common/src/wallet.rs
//! Wallet Manager: creation, connection and phrase-based recovery.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{Config, KdfConfig};
use crate::crypto::{decrypt_key, encrypt_key, RecoveryPhrase, WalletKeypair};
use crate::error::{Result, VanguardError};
use crate::models::{CurrentWalletPointer, RecoveryRecord, WalletMetadata, WalletRecord};
use crate::store::{keys, load_json, ContextScope, LockTable, SharedStore, WriteOp};
use crate::utils::short_address;

/// A freshly created wallet together with the phrase that can restore it.
/// The phrase is only ever available here; show it to the user once.
#[derive(Debug)]
pub struct NewWallet {
    pub wallet: WalletRecord,
    pub recovery_phrase: RecoveryPhrase,
}

/// Proof that a wallet's password was checked in this context.
///
/// Only [`WalletManager::connect_wallet`] can produce one, and session
/// login requires it, so a session can never be issued for an unchecked
/// wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedWallet {
    id: String,
    name: String,
    address: String,
}

impl ConnectedWallet {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[derive(Clone)]
pub struct WalletManager {
    store: SharedStore,
    locks: Arc<LockTable>,
    scope: ContextScope,
    min_password_len: usize,
    kdf: KdfConfig,
    default_network: String,
}

impl WalletManager {
    pub fn new(store: SharedStore, locks: Arc<LockTable>, scope: ContextScope, config: &Config) -> Self {
        Self {
            store,
            locks,
            scope,
            min_password_len: config.security.min_password_len,
            kdf: config.security.kdf,
            default_network: config.wallet.default_network.clone(),
        }
    }

    pub fn validate_password(&self, password: &str) -> Result<()> {
        if password.chars().count() < self.min_password_len {
            return Err(VanguardError::validation(format!(
                "Password must be at least {} characters",
                self.min_password_len
            )));
        }
        Ok(())
    }

    pub fn generate_recovery_phrase(&self) -> Result<RecoveryPhrase> {
        RecoveryPhrase::generate()
    }

    pub fn create_wallet(&self, name: &str, password: &str) -> Result<NewWallet> {
        self.create_wallet_with(name, password, |_| Ok(Vec::new()))
    }

    /// Create a wallet and write `extra` ops in the same batch, so callers
    /// can attach records (e.g. a registration profile) atomically.
    pub(crate) fn create_wallet_with<F>(&self, name: &str, password: &str, extra: F) -> Result<NewWallet>
    where
        F: FnOnce(&WalletRecord) -> Result<Vec<WriteOp>>,
    {
        let name = name.trim();
        if name.is_empty() {
            return Err(VanguardError::validation("Wallet name is required"));
        }
        self.validate_password(password)?;

        let recovery_phrase = RecoveryPhrase::generate()?;
        let keypair = recovery_phrase.derive_keypair()?;
        let address = keypair.address();
        let encrypted_private_key = encrypt_key(&keypair.secret_bytes(), password, address.as_bytes(), &self.kdf)?;

        let now = Utc::now();
        let wallet = WalletRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            address,
            created_at: now,
            encrypted_private_key,
        };

        let recovery = RecoveryRecord {
            wallet_id: wallet.id.clone(),
            fingerprint: recovery_phrase.fingerprint(),
            created_at: now,
        };

        let metadata = WalletMetadata {
            network: self.default_network.clone(),
            ..WalletMetadata::default()
        };

        let mut ops = vec![
            WriteOp::put_json(keys::wallet_recovery(&wallet.id), &recovery)?,
            WriteOp::put_json(keys::wallet_metadata(&wallet.id), &metadata)?,
        ];
        ops.extend(extra(&wallet)?);

        self.locks.with_lock(keys::WALLET_COLLECTION, || {
            let mut wallets = self.get_all_wallets()?;
            wallets.push(wallet.clone());
            ops.push(WriteOp::put_json(keys::WALLET_COLLECTION, &wallets)?);
            self.store.write_batch(ops)
        })?;

        tracing::info!("Created wallet {} ({})", wallet.id, short_address(&wallet.address));

        Ok(NewWallet { wallet, recovery_phrase })
    }

    /// Check the password and mark the wallet current in this context
    pub fn connect_wallet(&self, wallet_id: &str, password: &str) -> Result<ConnectedWallet> {
        let wallet = self
            .find_wallet(wallet_id)?
            .ok_or_else(|| VanguardError::WalletNotFound(wallet_id.to_string()))?;

        if let Err(e) = unlock(&wallet, password) {
            if matches!(e, VanguardError::InvalidCredentials) {
                tracing::warn!("Rejected password for wallet {}", wallet.id);
            }
            return Err(e);
        }

        let pointer = CurrentWalletPointer {
            id: wallet.id.clone(),
            name: wallet.name.clone(),
            address: wallet.address.clone(),
            connected_at: Utc::now(),
        };
        self.store
            .write_batch(vec![WriteOp::put_json(self.scope.current_wallet_key(), &pointer)?])?;

        tracing::info!("Connected wallet {} ({})", wallet.id, short_address(&wallet.address));

        Ok(ConnectedWallet {
            id: wallet.id,
            name: wallet.name,
            address: wallet.address,
        })
    }

    /// Reset a wallet's password using the phrase issued at creation
    pub fn recover_wallet(&self, phrase: &str, new_password: &str) -> Result<WalletRecord> {
        let phrase = RecoveryPhrase::parse(phrase)?;
        self.validate_password(new_password)?;
        let fingerprint = phrase.fingerprint();

        let updated = self.locks.with_lock(keys::WALLET_COLLECTION, || {
            let mut wallets = self.get_all_wallets()?;

            let mut position = None;
            for (idx, wallet) in wallets.iter().enumerate() {
                let record: Option<RecoveryRecord> = load_json(&*self.store, &keys::wallet_recovery(&wallet.id))?;
                if record.map_or(false, |r| r.fingerprint == fingerprint) {
                    position = Some(idx);
                    break;
                }
            }
            let idx = position.ok_or(VanguardError::PhraseMismatch)?;

            let keypair = phrase.derive_keypair().map_err(|_| VanguardError::PhraseMismatch)?;
            let wallet = &mut wallets[idx];
            if keypair.address() != wallet.address {
                return Err(VanguardError::Crypto(format!(
                    "recovery phrase does not derive the address of wallet {}",
                    wallet.id
                )));
            }

            wallet.encrypted_private_key =
                encrypt_key(&keypair.secret_bytes(), new_password, wallet.address.as_bytes(), &self.kdf)?;
            let updated = wallet.clone();

            self.store
                .write_batch(vec![WriteOp::put_json(keys::WALLET_COLLECTION, &wallets)?])?;
            Ok(updated)
        })?;

        tracing::info!("Recovered wallet {} with a new password", updated.id);
        Ok(updated)
    }

    /// All wallets in insertion order
    pub fn get_all_wallets(&self) -> Result<Vec<WalletRecord>> {
        Ok(load_json(&*self.store, keys::WALLET_COLLECTION)?.unwrap_or_default())
    }

    pub fn find_wallet(&self, wallet_id: &str) -> Result<Option<WalletRecord>> {
        Ok(self.get_all_wallets()?.into_iter().find(|w| w.id == wallet_id))
    }

    pub fn current_wallet(&self) -> Result<Option<CurrentWalletPointer>> {
        load_json(&*self.store, &self.scope.current_wallet_key())
    }

    pub fn disconnect_wallet(&self) -> Result<()> {
        self.store.remove(&self.scope.current_wallet_key())?;
        tracing::debug!("Disconnected wallet in {:?}", self.scope);
        Ok(())
    }

    pub fn wallet_metadata(&self, wallet_id: &str) -> Result<WalletMetadata> {
        self.require_wallet(wallet_id)?;
        let metadata = load_json(&*self.store, &keys::wallet_metadata(wallet_id))?;
        Ok(metadata.unwrap_or_else(|| WalletMetadata {
            network: self.default_network.clone(),
            ..WalletMetadata::default()
        }))
    }

    pub fn update_wallet_metadata(&self, wallet_id: &str, metadata: WalletMetadata) -> Result<WalletMetadata> {
        self.require_wallet(wallet_id)?;
        let mut metadata = metadata;
        if metadata.network.trim().is_empty() {
            metadata.network = self.default_network.clone();
        }
        self.store
            .write_batch(vec![WriteOp::put_json(keys::wallet_metadata(wallet_id), &metadata)?])?;
        Ok(metadata)
    }

    fn require_wallet(&self, wallet_id: &str) -> Result<WalletRecord> {
        self.find_wallet(wallet_id)?
            .ok_or_else(|| VanguardError::WalletNotFound(wallet_id.to_string()))
    }
}

/// Decrypt the wallet key and make sure it still belongs to the address
fn unlock(wallet: &WalletRecord, password: &str) -> Result<()> {
    let secret = decrypt_key(&wallet.encrypted_private_key, password, wallet.address.as_bytes())?;
    if WalletKeypair::from_secret(&secret).address() != wallet.address {
        return Err(VanguardError::Crypto(format!("key mismatch for wallet {}", wallet.id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_kdf;
    use crate::store::{KeyValueStore, MemoryStore};

    fn manager() -> (WalletManager, SharedStore) {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let mut config = Config::default();
        config.security.kdf = test_kdf();
        let manager = WalletManager::new(store.clone(), Arc::new(LockTable::new()), ContextScope::Local, &config);
        (manager, store)
    }

    #[test]
    fn test_create_wallet_is_listed() {
        let (manager, _) = manager();
        let created = manager.create_wallet("Main", "longenough").unwrap();

        assert!(!created.wallet.id.is_empty());
        assert!(created.wallet.address.starts_with("0x"));
        assert_eq!(created.recovery_phrase.words().len(), 12);

        let all = manager.get_all_wallets().unwrap();
        assert_eq!(all, vec![created.wallet]);
    }

    #[test]
    fn test_wallets_keep_insertion_order() {
        let (manager, _) = manager();
        let names = ["first", "second", "third"];
        for name in names {
            manager.create_wallet(name, "longenough").unwrap();
        }
        let listed: Vec<String> = manager.get_all_wallets().unwrap().into_iter().map(|w| w.name).collect();
        assert_eq!(listed, names);
    }

    #[test]
    fn test_create_rejects_empty_name_without_writing() {
        let (manager, store) = manager();
        let err = manager.create_wallet("   ", "longenoughpassword").unwrap_err();
        assert!(matches!(err, VanguardError::Validation(_)));
        assert!(manager.get_all_wallets().unwrap().is_empty());
        assert!(store.keys_with_prefix("").unwrap().is_empty());
    }

    #[test]
    fn test_create_rejects_short_password() {
        let (manager, _) = manager();
        let err = manager.create_wallet("Main", "short").unwrap_err();
        assert!(matches!(err, VanguardError::Validation(_)));
    }

    #[test]
    fn test_recovery_record_never_holds_the_phrase() {
        let (manager, store) = manager();
        let created = manager.create_wallet("Main", "longenough").unwrap();
        let raw = store.get(&keys::wallet_recovery(&created.wallet.id)).unwrap().unwrap();
        assert!(raw.contains(&created.recovery_phrase.fingerprint()));
        assert!(!raw.contains(created.recovery_phrase.as_str()));
    }

    #[test]
    fn test_connect_checks_password_and_sets_pointer() {
        let (manager, _) = manager();
        let created = manager.create_wallet("Main", "longenough").unwrap();

        let err = manager.connect_wallet(&created.wallet.id, "wrongpassword").unwrap_err();
        assert!(matches!(err, VanguardError::InvalidCredentials));
        assert!(manager.current_wallet().unwrap().is_none());

        let connected = manager.connect_wallet(&created.wallet.id, "longenough").unwrap();
        assert_eq!(connected.address(), created.wallet.address);
        let pointer = manager.current_wallet().unwrap().unwrap();
        assert_eq!(pointer.id, created.wallet.id);
    }

    #[test]
    fn test_connect_unknown_wallet() {
        let (manager, _) = manager();
        let err = manager.connect_wallet("missing", "longenough").unwrap_err();
        assert!(matches!(err, VanguardError::WalletNotFound(_)));
    }

    #[test]
    fn test_recover_round_trip() {
        let (manager, _) = manager();
        let created = manager.create_wallet("W1", "secretpw1").unwrap();

        let recovered = manager
            .recover_wallet(created.recovery_phrase.as_str(), "newpw12345")
            .unwrap();
        assert_eq!(recovered.id, created.wallet.id);
        assert_eq!(recovered.address, created.wallet.address);

        assert!(manager.connect_wallet(&created.wallet.id, "newpw12345").is_ok());
        assert!(manager.connect_wallet(&created.wallet.id, "secretpw1").is_err());
    }

    #[test]
    fn test_recover_rejects_bad_format() {
        let (manager, _) = manager();
        let err = manager.recover_wallet("only three words", "newpw12345").unwrap_err();
        assert!(matches!(err, VanguardError::InvalidPhraseFormat { .. }));
    }

    #[test]
    fn test_recover_rejects_unknown_phrase() {
        let (manager, _) = manager();
        manager.create_wallet("W1", "secretpw1").unwrap();
        let other = RecoveryPhrase::generate().unwrap();
        let err = manager.recover_wallet(other.as_str(), "newpw12345").unwrap_err();
        assert!(matches!(err, VanguardError::PhraseMismatch));
    }

    #[test]
    fn test_recover_rejects_short_new_password() {
        let (manager, _) = manager();
        let created = manager.create_wallet("W1", "secretpw1").unwrap();
        let err = manager.recover_wallet(created.recovery_phrase.as_str(), "short").unwrap_err();
        assert!(matches!(err, VanguardError::Validation(_)));
        assert!(manager.connect_wallet(&created.wallet.id, "secretpw1").is_ok());
    }

    #[test]
    fn test_metadata_defaults_and_updates() {
        let (manager, _) = manager();
        let created = manager.create_wallet("W1", "secretpw1").unwrap();

        let metadata = manager.wallet_metadata(&created.wallet.id).unwrap();
        assert_eq!(metadata.network, Config::default().wallet.default_network);

        let updated = manager
            .update_wallet_metadata(
                &created.wallet.id,
                WalletMetadata {
                    network: String::new(),
                    organization: Some("Acme Textiles".into()),
                    labels: vec!["primary".into()],
                },
            )
            .unwrap();
        assert_eq!(updated.network, metadata.network);
        assert_eq!(manager.wallet_metadata(&created.wallet.id).unwrap(), updated);

        assert!(matches!(
            manager.wallet_metadata("missing").unwrap_err(),
            VanguardError::WalletNotFound(_)
        ));
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (manager, _) = manager();
        manager.disconnect_wallet().unwrap();
        let created = manager.create_wallet("W1", "secretpw1").unwrap();
        manager.connect_wallet(&created.wallet.id, "secretpw1").unwrap();
        manager.disconnect_wallet().unwrap();
        manager.disconnect_wallet().unwrap();
        assert!(manager.current_wallet().unwrap().is_none());
    }
}
