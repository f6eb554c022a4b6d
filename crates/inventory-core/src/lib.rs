//! ============================================================================
//! INVENTORY-CORE: Spartan inventory fetching
//! ============================================================================
//! Pulls a player's inventory (and optionally armory catalogs, equipment and
//! highlight picks) from the Spartan backend for a UI to render:
//! - InventoryFetcher: single-flight, cache-once fetch with status tracking
//! - Response decoding into typed armory structures
//! - Environment-driven configuration and a reqwest transport
//! ============================================================================

pub mod config;
pub mod fetcher;
pub mod response;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use types::*;
pub use config::{InventoryConfig, DEFAULT_API_URL};
pub use fetcher::InventoryFetcher;
pub use response::{decode_response, DecodedArmory, DecodedResponse};
pub use transport::{HttpTransport, InventoryTransport, TransportResponse};
