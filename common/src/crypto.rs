// common/src/crypto.rs
//! Wallet key material.
//!
//! A wallet's Ed25519 private key is derived from its 12-word BIP-39
//! recovery phrase, so the phrase alone can regenerate the key. At rest the
//! key is wrapped with XChaCha20-Poly1305 under an Argon2id key derived
//! from the wallet password; a failed tag check is how a wrong password
//! shows up.

use argon2::{Algorithm, Argon2, Params, Version};
use bip39::{Language, Mnemonic};
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::config::KdfConfig;
use crate::error::{Result, VanguardError};

/// Number of words in a recovery phrase
pub const PHRASE_WORDS: usize = 12;

const PHRASE_ENTROPY_BYTES: usize = 16;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 24;

/// A 12-word recovery phrase. Wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RecoveryPhrase(String);

impl RecoveryPhrase {
    /// Fresh phrase from 128 bits of OS entropy
    pub fn generate() -> Result<Self> {
        let mut entropy = Zeroizing::new([0u8; PHRASE_ENTROPY_BYTES]);
        OsRng.fill_bytes(&mut entropy[..]);

        let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy[..])
            .map_err(|e| VanguardError::Crypto(format!("mnemonic generation failed: {e}")))?;

        Ok(Self(mnemonic.to_string()))
    }

    /// Accepts any input with exactly twelve whitespace-separated tokens,
    /// normalizing the separators to single spaces. Word validity is not
    /// checked here.
    pub fn parse(input: &str) -> Result<Self> {
        let words: Vec<&str> = input.split_whitespace().collect();
        if words.len() != PHRASE_WORDS {
            return Err(VanguardError::InvalidPhraseFormat {
                expected: PHRASE_WORDS,
                actual: words.len(),
            });
        }
        Ok(Self(words.join(" ")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn words(&self) -> Vec<&str> {
        self.0.split(' ').collect()
    }

    /// SHA-256 of the normalized phrase, hex encoded. This is what gets
    /// stored; the phrase itself never touches the store.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }

    /// Derive the wallet keypair. Fails if the words are not a valid
    /// BIP-39 English mnemonic.
    pub fn derive_keypair(&self) -> Result<WalletKeypair> {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, &self.0)
            .map_err(|e| VanguardError::Crypto(format!("not a valid mnemonic: {e}")))?;

        let seed = Zeroizing::new(mnemonic.to_seed_normalized(""));
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&seed[..32]);

        Ok(WalletKeypair::from_secret(&secret))
    }
}

impl fmt::Debug for RecoveryPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RecoveryPhrase(<redacted>)")
    }
}

/// Ed25519 keypair backing a wallet
pub struct WalletKeypair {
    signing: SigningKey,
}

impl WalletKeypair {
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(secret),
        }
    }

    /// `0x` + first 20 bytes of SHA-256(public key), lowercase hex
    pub fn address(&self) -> String {
        let digest = Sha256::digest(self.signing.verifying_key().to_bytes());
        format!("0x{}", hex::encode(&digest[..20]))
    }

    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.signing.to_bytes())
    }
}

/// Password-wrapped private key as persisted inside a wallet record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedKey {
    pub kdf: KdfConfig,
    pub salt: String,
    pub nonce: String,
    pub ciphertext: String,
}

fn derive_wrapping_key(password: &str, salt: &[u8], kdf: &KdfConfig) -> Result<Zeroizing<[u8; 32]>> {
    let params = Params::new(kdf.m_cost, kdf.t_cost, kdf.p_cost, Some(32))
        .map_err(|e| VanguardError::Crypto(format!("invalid Argon2 parameters: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key[..])
        .map_err(|e| VanguardError::Crypto(format!("Argon2id derivation failed: {e}")))?;
    Ok(key)
}

/// Wrap `secret` under `password`. `aad` binds the blob to its owner
/// (the wallet address) so blobs cannot be swapped between records.
pub fn encrypt_key(secret: &[u8; 32], password: &str, aad: &[u8], kdf: &KdfConfig) -> Result<EncryptedKey> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce);

    let key = derive_wrapping_key(password, &salt, kdf)?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), Payload { msg: &secret[..], aad })
        .map_err(|e| VanguardError::Crypto(format!("key encryption failed: {e}")))?;

    Ok(EncryptedKey {
        kdf: *kdf,
        salt: hex::encode(salt),
        nonce: hex::encode(nonce),
        ciphertext: hex::encode(ciphertext),
    })
}

/// Unwrap a private key. A wrong password surfaces as `InvalidCredentials`.
pub fn decrypt_key(blob: &EncryptedKey, password: &str, aad: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let salt = decode_field("salt", &blob.salt)?;
    let nonce = decode_field("nonce", &blob.nonce)?;
    let ciphertext = decode_field("ciphertext", &blob.ciphertext)?;
    if nonce.len() != NONCE_LEN {
        return Err(VanguardError::Crypto(format!("nonce must be {NONCE_LEN} bytes")));
    }

    let key = derive_wrapping_key(password, &salt, &blob.kdf)?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(XNonce::from_slice(&nonce), Payload { msg: &ciphertext[..], aad })
            .map_err(|_| VanguardError::InvalidCredentials)?,
    );

    if plaintext.len() != 32 {
        return Err(VanguardError::Crypto("unexpected private key length".to_string()));
    }
    let mut secret = Zeroizing::new([0u8; 32]);
    secret.copy_from_slice(&plaintext);
    Ok(secret)
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    hex::decode(value).map_err(|e| VanguardError::Crypto(format!("malformed {name}: {e}")))
}

#[cfg(test)]
pub(crate) fn test_kdf() -> KdfConfig {
    KdfConfig { m_cost: 256, t_cost: 1, p_cost: 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_phrase_has_twelve_words() {
        let phrase = RecoveryPhrase::generate().unwrap();
        let words = phrase.words();
        assert_eq!(words.len(), PHRASE_WORDS);
        assert!(words.iter().all(|w| !w.is_empty()));
    }

    #[test]
    fn test_phrases_differ() {
        let a = RecoveryPhrase::generate().unwrap();
        let b = RecoveryPhrase::generate().unwrap();
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn test_parse_rejects_wrong_word_count() {
        let err = RecoveryPhrase::parse("one two three").unwrap_err();
        assert!(matches!(
            err,
            VanguardError::InvalidPhraseFormat { expected: 12, actual: 3 }
        ));
    }

    #[test]
    fn test_parse_normalizes_whitespace() {
        let phrase = RecoveryPhrase::generate().unwrap();
        let messy = format!("  {}\n", phrase.as_str().replace(' ', "   "));
        let parsed = RecoveryPhrase::parse(&messy).unwrap();
        assert_eq!(parsed.fingerprint(), phrase.fingerprint());
    }

    #[test]
    fn test_keypair_is_deterministic() {
        let phrase = RecoveryPhrase::generate().unwrap();
        let a = phrase.derive_keypair().unwrap();
        let b = phrase.derive_keypair().unwrap();
        assert_eq!(a.address(), b.address());
        assert_eq!(a.address().len(), 42);
        assert!(a.address().starts_with("0x"));
    }

    #[test]
    fn test_invalid_words_do_not_derive() {
        let phrase = RecoveryPhrase::parse("a b c d e f g h i j k l").unwrap();
        assert!(phrase.derive_keypair().is_err());
    }

    #[test]
    fn test_key_wrap_round_trip() {
        let secret = [7u8; 32];
        let blob = encrypt_key(&secret, "correct horse", b"0xaddr", &test_kdf()).unwrap();
        let unwrapped = decrypt_key(&blob, "correct horse", b"0xaddr").unwrap();
        assert_eq!(*unwrapped, secret);
    }

    #[test]
    fn test_wrong_password_is_invalid_credentials() {
        let blob = encrypt_key(&[1u8; 32], "right-password", b"0xaddr", &test_kdf()).unwrap();
        let err = decrypt_key(&blob, "wrong-password", b"0xaddr").unwrap_err();
        assert!(matches!(err, VanguardError::InvalidCredentials));
    }

    #[test]
    fn test_blob_is_bound_to_owner() {
        let blob = encrypt_key(&[1u8; 32], "right-password", b"0xaaa", &test_kdf()).unwrap();
        assert!(decrypt_key(&blob, "right-password", b"0xbbb").is_err());
    }
}
