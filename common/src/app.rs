// common/src/app.rs
//! `Vanguard`: the managers for one browser context, composed explicitly.
//!
//! The web server builds one per request from the shared store and the
//! client's scope; the library default is [`ContextScope::Local`].

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::crypto::RecoveryPhrase;
use crate::error::{Result, VanguardError};
use crate::models::{ProfileExtension, Role, UserSession, WalletRecord, WalletSummary};
use crate::router::{AuthState, Route};
use crate::shell::{DashboardGate, GateDecision, SessionLoad};
use crate::store::{keys, ContextScope, LockTable, SharedStore, WriteOp};
use crate::auth::SessionManager;
use crate::wallet::WalletManager;

/// Everything the register form collects
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationForm {
    pub wallet_name: String,
    pub name: String,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password: String,
    pub confirm_password: String,
    pub accepted_terms: bool,
    pub company_name: Option<String>,
    pub business_address: Option<String>,
    pub business_type: Option<String>,
}

impl RegistrationForm {
    fn validate(&self, min_password_len: usize) -> Result<()> {
        if self.wallet_name.trim().is_empty() {
            return Err(VanguardError::validation("Wallet name is required"));
        }
        if self.name.trim().is_empty() {
            return Err(VanguardError::validation("Your name is required"));
        }
        if self.password.chars().count() < min_password_len {
            return Err(VanguardError::validation(format!(
                "Password must be at least {} characters",
                min_password_len
            )));
        }
        if self.password != self.confirm_password {
            return Err(VanguardError::validation("Passwords do not match"));
        }
        if !self.accepted_terms {
            return Err(VanguardError::validation("Please accept the terms and conditions"));
        }
        if let Some(email) = self.email.as_deref().map(str::trim) {
            if !email.is_empty() && !email.contains('@') {
                return Err(VanguardError::validation("Please enter a valid email"));
            }
        }
        Ok(())
    }

    fn profile(&self) -> ProfileExtension {
        let clean = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let business = self.role.map_or(false, |r| r.is_business());

        ProfileExtension {
            role: self.role,
            name: Some(self.name.trim().to_string()),
            email: clean(&self.email),
            company_name: if business { clean(&self.company_name) } else { None },
            business_address: if business { clean(&self.business_address) } else { None },
            business_type: if business { clean(&self.business_type) } else { None },
        }
    }
}

/// A wallet created by registration, waiting for the user to confirm they
/// backed up the phrase
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRegistration {
    pub wallet: WalletSummary,
    #[serde(serialize_with = "serialize_phrase")]
    pub recovery_phrase: RecoveryPhrase,
}

fn serialize_phrase<S: serde::Serializer>(phrase: &RecoveryPhrase, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(phrase.as_str())
}

#[derive(Clone)]
pub struct Vanguard {
    scope: ContextScope,
    min_password_len: usize,
    wallets: WalletManager,
    sessions: SessionManager,
}

impl Vanguard {
    pub fn new(store: SharedStore, locks: Arc<LockTable>, config: &Config, scope: ContextScope) -> Self {
        Self {
            wallets: WalletManager::new(store.clone(), locks.clone(), scope, config),
            sessions: SessionManager::new(store, locks, scope),
            min_password_len: config.security.min_password_len,
            scope,
        }
    }

    pub fn scope(&self) -> ContextScope {
        self.scope
    }

    pub fn wallets(&self) -> &WalletManager {
        &self.wallets
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Connect and log in as one step; login only ever sees a wallet that
    /// just passed its password check.
    pub fn authenticate(&self, wallet_id: &str, password: &str) -> Result<UserSession> {
        let connected = self.wallets.connect_wallet(wallet_id, password)?;
        self.sessions.login(&connected)
    }

    /// First half of registration: validate the form, create the wallet and
    /// store the registration profile for its address.
    pub fn begin_registration(&self, form: &RegistrationForm) -> Result<PendingRegistration> {
        form.validate(self.min_password_len)?;

        let profile = form.profile();
        let created = self.wallets.create_wallet_with(&form.wallet_name, &form.password, |wallet| {
            Ok(vec![WriteOp::put_json(keys::profile(&wallet.address), &profile)?])
        })?;

        tracing::info!(
            "Registration started for wallet {} (role: {})",
            created.wallet.id,
            form.role.map_or("none", |r| r.as_str())
        );

        Ok(PendingRegistration {
            wallet: WalletSummary::from(&created.wallet),
            recovery_phrase: created.recovery_phrase,
        })
    }

    /// Second half: once the phrase backup is confirmed, log the new wallet in
    pub fn complete_registration(&self, wallet_id: &str, password: &str, backup_confirmed: bool) -> Result<UserSession> {
        if !backup_confirmed {
            return Err(VanguardError::validation(
                "Please confirm you have backed up your recovery phrase",
            ));
        }
        self.authenticate(wallet_id, password)
    }

    pub fn recover(&self, phrase: &str, new_password: &str, confirm_password: &str) -> Result<WalletRecord> {
        if new_password != confirm_password {
            return Err(VanguardError::validation("Passwords do not match"));
        }
        self.wallets.recover_wallet(phrase, new_password)
    }

    pub fn auth_state(&self) -> Result<AuthState> {
        Ok(AuthState::from_session(self.sessions.current_session()?.as_ref()))
    }

    /// Where this context should go right now
    pub fn route(&self) -> Result<Route> {
        Ok(self.auth_state()?.target())
    }

    pub fn gate(&self, requested_path: &str) -> Result<GateDecision> {
        let load = SessionLoad::Resolved(self.sessions.current_session()?);
        Ok(DashboardGate::evaluate(&load, requested_path))
    }

    pub fn logout(&self) -> Result<()> {
        self.sessions.logout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_kdf;
    use crate::store::{KeyValueStore, MemoryStore};

    fn vanguard() -> (SharedStore, Vanguard) {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let mut config = Config::default();
        config.security.kdf = test_kdf();
        let app = Vanguard::new(store.clone(), Arc::new(LockTable::new()), &config, ContextScope::Local);
        (store, app)
    }

    fn form() -> RegistrationForm {
        RegistrationForm {
            wallet_name: "Farm Wallet".into(),
            name: "Grace Hopper".into(),
            email: Some("grace@example.com".into()),
            role: Some(Role::Supplier),
            password: "correct horse".into(),
            confirm_password: "correct horse".into(),
            accepted_terms: true,
            company_name: Some("Hopper Farms".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_registration_flow() {
        let (_, app) = vanguard();
        let pending = app.begin_registration(&form()).unwrap();
        assert_eq!(pending.recovery_phrase.words().len(), 12);
        assert_eq!(app.route().unwrap(), Route::Login);

        let err = app.complete_registration(&pending.wallet.id, "correct horse", false).unwrap_err();
        assert!(matches!(err, VanguardError::Validation(_)));

        let session = app.complete_registration(&pending.wallet.id, "correct horse", true).unwrap();
        assert_eq!(session.role, Some(Role::Supplier));
        assert_eq!(session.name.as_deref(), Some("Grace Hopper"));
        assert_eq!(session.company_name.as_deref(), Some("Hopper Farms"));
        assert_eq!(app.route().unwrap().path(), "/supplier");
    }

    #[test]
    fn test_invalid_registration_writes_nothing() {
        let (store, app) = vanguard();
        let cases = [
            RegistrationForm { wallet_name: " ".into(), ..form() },
            RegistrationForm { name: "".into(), ..form() },
            RegistrationForm { password: "short".into(), confirm_password: "short".into(), ..form() },
            RegistrationForm { confirm_password: "something else".into(), ..form() },
            RegistrationForm { accepted_terms: false, ..form() },
            RegistrationForm { email: Some("grace.example.com".into()), ..form() },
        ];

        for case in cases {
            let err = app.begin_registration(&case).unwrap_err();
            assert!(matches!(err, VanguardError::Validation(_)), "{:?}", err);
        }
        assert!(store.keys_with_prefix("").unwrap().is_empty());
    }

    #[test]
    fn test_customer_registration_drops_business_fields() {
        let (_, app) = vanguard();
        let pending = app
            .begin_registration(&RegistrationForm { role: Some(Role::Customer), ..form() })
            .unwrap();
        let session = app.complete_registration(&pending.wallet.id, "correct horse", true).unwrap();
        assert_eq!(session.company_name, None);
    }

    #[test]
    fn test_registration_without_role_goes_to_selection() {
        let (_, app) = vanguard();
        let pending = app.begin_registration(&RegistrationForm { role: None, ..form() }).unwrap();
        app.complete_registration(&pending.wallet.id, "correct horse", true).unwrap();
        assert_eq!(app.route().unwrap(), Route::RoleSelection);
        assert_eq!(app.gate("/customer").unwrap(), GateDecision::Redirect(Route::RoleSelection));
    }

    #[test]
    fn test_authenticate_wrong_password() {
        let (_, app) = vanguard();
        let pending = app.begin_registration(&form()).unwrap();
        let err = app.authenticate(&pending.wallet.id, "wrong password").unwrap_err();
        assert!(matches!(err, VanguardError::InvalidCredentials));
        assert!(app.sessions().current_session().unwrap().is_none());
    }

    #[test]
    fn test_recover_checks_confirmation() {
        let (_, app) = vanguard();
        let pending = app.begin_registration(&form()).unwrap();
        let phrase = pending.recovery_phrase.as_str().to_string();

        let err = app.recover(&phrase, "new password", "new passw0rd").unwrap_err();
        assert!(matches!(err, VanguardError::Validation(_)));

        let wallet = app.recover(&phrase, "new password", "new password").unwrap();
        assert_eq!(wallet.id, pending.wallet.id);
        app.authenticate(&wallet.id, "new password").unwrap();
    }

    #[test]
    fn test_logout_returns_to_login() {
        let (_, app) = vanguard();
        let pending = app.begin_registration(&form()).unwrap();
        app.complete_registration(&pending.wallet.id, "correct horse", true).unwrap();

        app.logout().unwrap();
        assert_eq!(app.route().unwrap(), Route::Login);
        assert!(app.wallets().current_wallet().unwrap().is_none());
    }

    #[test]
    fn test_pending_registration_serializes_phrase() {
        let (_, app) = vanguard();
        let pending = app.begin_registration(&form()).unwrap();
        let json = serde_json::to_value(&pending).unwrap();
        assert_eq!(json["recoveryPhrase"], pending.recovery_phrase.as_str());
        assert!(json["wallet"].get("encryptedPrivateKey").is_none());
    }
}
