//! Source adapters
//!
//! Each external source is wrapped behind a read-only capability with a
//! uniform "value or absent" contract: implementations catch their own
//! failures, log them, and fold error and absence into one outcome. Nothing
//! here throws into the reconciler.
//!
//! The value-transfer and ownership-mutation capabilities are the exception:
//! they are user-initiated writes, so their failures surface as typed errors
//! carrying the adapter's message unchanged.

pub mod metadata;
pub mod registry;

pub use metadata::GatewayMetadataFetcher;
pub use registry::RegistryHttpReader;

use async_trait::async_trait;

use crate::types::{AggregateRecord, ChainRecord, MetadataRecord, Result, TransferError};

/// Opaque handle for a submitted value transfer, pending finality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTicket(pub String);

/// Confirmed transaction reference.
pub type TxReference = String;

/// Read-only view of the on-chain campaign registry.
#[async_trait]
pub trait ChainCampaignReader: Send + Sync {
    /// Registry entry for one identifier; absent when the chain does not know
    /// the identifier or the source is unreachable.
    async fn get(&self, id: u64) -> Option<ChainRecord>;

    /// All currently active registry entries, keyed by identifier. Source
    /// failure folds to an empty list.
    async fn list_active(&self) -> Vec<(u64, ChainRecord)>;

    /// Content address of the campaign's published metadata document, if any.
    async fn metadata_address(&self, id: u64) -> Option<String>;

    /// Activation flag for one identifier; unknown identifiers read inactive.
    async fn active(&self, id: u64) -> bool {
        self.get(id).await.map(|r| r.active).unwrap_or(false)
    }
}

/// Fetches a content-addressed metadata document.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Dereference a content address. Absence is normal: not every campaign
    /// publishes metadata, and fetch or parse failure degrades to absent.
    async fn fetch(&self, address: &str) -> Option<MetadataRecord>;
}

/// Aggregates donation events for one identifier.
#[async_trait]
pub trait DonationAggregateReader: Send + Sync {
    /// Sum of donation events. Absent means the source was unreachable, not
    /// that the total is zero; callers keep the previously known value.
    async fn totals_for(&self, id: u64) -> Option<AggregateRecord>;
}

/// Submits a value transfer and awaits its confirmation.
///
/// Submission and finality are separate awaits so callers can observe the two
/// phases distinctly; an adapter whose wallet only supports fire-and-confirm
/// may resolve `await_finality` immediately.
#[async_trait]
pub trait ValueTransferSubmitter: Send + Sync {
    /// Construct and send the transfer instruction. Rejection (wallet denial,
    /// insufficient funds, network failure) carries the adapter's message.
    async fn submit(&self, id: u64, amount: f64) -> std::result::Result<TransferTicket, TransferError>;

    /// Block until the submitted transfer is confirmed irreversible, returning
    /// the transaction reference.
    async fn await_finality(
        &self,
        ticket: TransferTicket,
    ) -> std::result::Result<TxReference, TransferError>;
}

/// Owner-gated registry mutations.
#[async_trait]
pub trait OwnershipMutator: Send + Sync {
    async fn update_record(
        &self,
        id: u64,
        title: &str,
        description: &str,
        image_ref: &str,
    ) -> Result<()>;

    async fn deactivate(&self, id: u64) -> Result<()>;
}
