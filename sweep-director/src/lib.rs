//! # Sweep Director
//!
//! HTTP adapters for the systems a bulk operation run talks to: the BOSH
//! director, the broker's last-operation endpoint and the service-instances
//! management API.

pub mod broker;
pub mod director;
mod http;
pub mod inventory;

// Re-export commonly used types
pub use broker::BrokerClient;
pub use director::DirectorClient;
pub use inventory::InventoryClient;

/// Result type for adapter construction
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for adapter construction
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
