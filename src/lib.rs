//! Almoner - campaign state reconciliation engine
//!
//! Fundraising campaigns live across three disjoint sources: an on-chain
//! registry (ownership, goal, active flag), content-addressed metadata
//! documents, and an aggregate log of donation events. A device-local cache
//! and an off-chain document store hold best-effort records for campaigns the
//! chain does not yet know. Almoner merges all of them into one deterministic
//! view and drives the donation submission lifecycle as an explicit state
//! machine.
//!
//! ## Components
//!
//! - **Sources**: read-only capabilities over the external sources, each with
//!   a uniform "value or absent" contract
//! - **Fallback**: device-local cache + off-chain document store, merged with
//!   document-store precedence
//! - **Reconcile**: pure merge with per-field precedence rules
//! - **Donation**: per-campaign state machine with a broadcast status stream
//! - **Ownership**: actor-vs-owner resolution for gating mutations
//! - **Engine**: façade wiring the above behind `load`/`donate`/`is_owner`

pub mod config;
pub mod db;
pub mod donation;
pub mod engine;
pub mod fallback;
pub mod logging;
pub mod ownership;
pub mod reconcile;
pub mod sources;
pub mod types;

pub use config::Args;
pub use donation::{DonationCoordinator, DonationStatus, FailureReason};
pub use engine::{CampaignEngine, EngineConfig};
pub use fallback::{FallbackStore, LocalCampaignCache};
pub use ownership::is_owner;
pub use reconcile::{apply_aggregate, reconcile};
pub use types::{
    AggregateRecord, AlmonerError, Campaign, CampaignKey, ChainRecord, FallbackRecord, IdValue,
    MetadataRecord, Result,
};
