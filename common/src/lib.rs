pub mod app;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod router;
pub mod shell;
pub mod store;
pub mod utils;
pub mod wallet;

pub use app::{PendingRegistration, RegistrationForm, Vanguard};
pub use auth::SessionManager;
pub use crate::config::*;
pub use error::{Result, VanguardError};
pub use router::{AuthEvent, AuthState, Route};
pub use shell::{DashboardGate, GateDecision, SessionLoad, ShellView};
pub use store::{open_store, ContextScope, KeyValueStore, LockTable, SharedStore};
pub use utils::*;
pub use wallet::{ConnectedWallet, NewWallet, WalletManager};
