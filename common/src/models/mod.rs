pub mod client;
pub mod role;
pub mod session;
pub mod wallet;

pub use role::{NavItem, Role};
pub use session::{ProfileExtension, ProfileUpdate, UserSession};
pub use wallet::{CurrentWalletPointer, RecoveryRecord, WalletMetadata, WalletRecord, WalletSummary};
