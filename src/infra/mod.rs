//! Infrastructure layer — concrete implementations of the application port
//! traits, plus the HTTP transport, token cache, and configuration they use.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.

pub mod config;
pub mod inventory;
pub mod mdm;
pub mod token;
pub mod transport;

pub use config::Settings;
pub use inventory::InventoryClient;
pub use mdm::LegacyMdmClient;
pub use token::TokenCache;
pub use transport::{RetryPolicy, RetryingClient};
