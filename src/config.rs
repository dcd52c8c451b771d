//! Configuration for Almoner
//!
//! CLI arguments and environment variable handling using clap. The embedding
//! host parses [`Args`] and hands the derived settings to the engine; there is
//! no binary in this crate.

use clap::Parser;
use std::time::Duration;

/// Almoner - campaign state reconciliation engine
#[derive(Parser, Debug, Clone)]
#[command(name = "almoner")]
#[command(about = "Reconciles fundraising campaign state across chain, metadata, and fallback sources")]
pub struct Args {
    /// Base URL of the registry mirror (campaign records and donation totals)
    #[arg(long, env = "REGISTRY_URL", default_value = "http://localhost:8551")]
    pub registry_url: String,

    /// Gateway used to dereference content-addressed metadata documents
    #[arg(long, env = "IPFS_GATEWAY_URL", default_value = "https://ipfs.io")]
    pub ipfs_gateway_url: String,

    /// MongoDB connection URI for the off-chain document store (optional;
    /// without it the fallback store runs local-only)
    #[arg(long, env = "MONGODB_URI")]
    pub mongodb_uri: Option<String>,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "almoner")]
    pub mongodb_db: String,

    /// TTL for device-local fallback records, in seconds
    #[arg(long, env = "FALLBACK_TTL_SECS", default_value = "300")]
    pub fallback_ttl_secs: u64,

    /// How long terminal donation states stay visible before reverting to idle
    #[arg(long, env = "DISPLAY_WINDOW_SECS", default_value = "5")]
    pub display_window_secs: u64,

    /// Request timeout in milliseconds for outbound source reads
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn fallback_ttl(&self) -> Duration {
        Duration::from_secs(self.fallback_ttl_secs)
    }

    pub fn display_window(&self) -> Duration {
        Duration::from_secs(self.display_window_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.registry_url.starts_with("http://") && !self.registry_url.starts_with("https://") {
            return Err("REGISTRY_URL must be an http(s) URL".to_string());
        }

        if !self.ipfs_gateway_url.starts_with("http://")
            && !self.ipfs_gateway_url.starts_with("https://")
        {
            return Err("IPFS_GATEWAY_URL must be an http(s) URL".to_string());
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        if self.display_window_secs == 0 {
            return Err("DISPLAY_WINDOW_SECS must be greater than zero".to_string());
        }

        Ok(())
    }
}
