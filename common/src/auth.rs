// common/src/auth.rs
//! Auth Session Manager.
//!
//! Owns the current [`UserSession`] of one context. Role and profile edits
//! are written twice: to the session and to the wallet's durable profile,
//! so the next login for that wallet restores them.

use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Result, VanguardError};
use crate::models::{CurrentWalletPointer, ProfileExtension, ProfileUpdate, Role, UserSession};
use crate::store::{keys, load_json, ContextScope, LockTable, SharedStore, WriteOp};
use crate::utils::short_address;
use crate::wallet::ConnectedWallet;

#[derive(Clone)]
pub struct SessionManager {
    store: SharedStore,
    locks: Arc<LockTable>,
    scope: ContextScope,
}

impl SessionManager {
    pub fn new(store: SharedStore, locks: Arc<LockTable>, scope: ContextScope) -> Self {
        Self { store, locks, scope }
    }

    /// Rehydrate the persisted session. Corrupt data is discarded and reads
    /// as no session.
    pub fn current_session(&self) -> Result<Option<UserSession>> {
        load_json(&*self.store, &self.scope.current_session_key())
    }

    /// Issue a session for a connected wallet.
    ///
    /// Fails with `AuthenticationFailed` when the context's current-wallet
    /// pointer no longer names this wallet, i.e. it was disconnected or
    /// replaced after the password check.
    pub fn login(&self, wallet: &ConnectedWallet) -> Result<UserSession> {
        let pointer: Option<CurrentWalletPointer> = load_json(&*self.store, &self.scope.current_wallet_key())?;
        let pointer = match pointer {
            Some(p) if p.id == wallet.id() && p.address == wallet.address() => p,
            _ => {
                tracing::warn!("Login refused: wallet {} is not connected in {:?}", wallet.id(), self.scope);
                return Err(VanguardError::AuthenticationFailed);
            }
        };

        let profile = self.profile_for(&pointer.address)?;
        let session = UserSession::open(
            Uuid::new_v4().to_string(),
            pointer.address,
            pointer.name,
            profile,
        );

        self.store
            .write_batch(vec![WriteOp::put_json(self.scope.current_session_key(), &session)?])?;

        tracing::info!(
            "Session {} opened for {} (role: {})",
            session.id,
            short_address(&session.wallet_address),
            session.role.map_or("none", |r| r.as_str())
        );

        Ok(session)
    }

    /// Drop the session and the current-wallet pointer. Safe to repeat.
    pub fn logout(&self) -> Result<()> {
        let existing = self.store.get(&self.scope.current_session_key())?;
        self.store.write_batch(vec![
            WriteOp::delete(self.scope.current_session_key()),
            WriteOp::delete(self.scope.current_wallet_key()),
        ])?;

        if existing.is_some() {
            tracing::info!("Logged out in {:?}", self.scope);
        }
        Ok(())
    }

    /// Assign a role. `Ok(None)` when nobody is logged in.
    pub fn set_user_role(&self, role: Role) -> Result<Option<UserSession>> {
        let updated = self.update_both(|session, profile| {
            session.role = Some(role);
            profile.role = Some(role);
            Ok(())
        })?;

        if let Some(session) = &updated {
            tracing::info!("Role {} assigned to {}", role, short_address(&session.wallet_address));
        }
        Ok(updated)
    }

    /// Merge profile fields. `Ok(None)` when nobody is logged in.
    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<Option<UserSession>> {
        self.update_both(|session, profile| {
            update.validate()?;
            session.apply(update);
            profile.apply(update);
            Ok(())
        })
    }

    /// Stored profile for a wallet address, empty if none
    pub fn profile_for(&self, wallet_address: &str) -> Result<ProfileExtension> {
        Ok(load_json(&*self.store, &keys::profile(wallet_address))?.unwrap_or_default())
    }

    /// Apply `edit` to the current session and the wallet's stored profile
    /// and write both in one batch. Another context logged into the same
    /// wallet may have changed the profile since this session was opened,
    /// so the stored profile is re-read under its lock rather than
    /// overwritten with the session's copy.
    fn update_both<F>(&self, edit: F) -> Result<Option<UserSession>>
    where
        F: FnOnce(&mut UserSession, &mut ProfileExtension) -> Result<()>,
    {
        let mut session = match self.current_session()? {
            Some(session) if session.is_authenticated => session,
            _ => {
                tracing::debug!("No active session in {:?}; ignoring profile change", self.scope);
                return Ok(None);
            }
        };

        let profile_key = keys::profile(&session.wallet_address);
        self.locks.with_lock(&profile_key, || {
            let mut profile = self.profile_for(&session.wallet_address)?;
            edit(&mut session, &mut profile)?;
            self.store.write_batch(vec![
                WriteOp::put_json(self.scope.current_session_key(), &session)?,
                WriteOp::put_json(profile_key.clone(), &profile)?,
            ])
        })?;

        Ok(Some(session))
    }
}
