//! PostgreSQL implementations of the clearance engine ports

pub mod account;
pub mod notifier;
pub mod permission;
pub mod wallet;

pub use account::PgAccountDirectory;
pub use notifier::PgNotifier;
pub use permission::PgPermissionStore;
pub use wallet::PgWalletLedger;
