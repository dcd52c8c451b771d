//! Donation submission lifecycle
//!
//! One state machine per in-flight attempt, driving
//! `Idle → Validating → Submitting → AwaitingFinality → Reaggregating →
//! Succeeded | Failed`. Terminal states stay visible for a display window and
//! then auto-revert to `Idle`.
//!
//! At most one attempt per campaign identifier is in flight: the slot map
//! holds an entry while an attempt runs (and through its display window), and
//! a second donate action in that span subscribes to the running attempt's
//! event stream without starting anything. Distinct identifiers proceed
//! independently. Status transitions are broadcast in order, and no success or
//! failure signal is emitted before the corresponding external step resolved.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::sources::{DonationAggregateReader, ValueTransferSubmitter};
use crate::types::{AggregateRecord, Campaign, CampaignKey, TransferError};

/// How long terminal states stay visible before reverting to idle.
pub const DEFAULT_DISPLAY_WINDOW: Duration = Duration::from_secs(5);

/// Which step of an attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
    /// Malformed input amount; no external call was made.
    Validation,
    /// Wallet or ledger declined the transfer.
    TransferRejected,
    /// Confirmation never arrived; the transfer's outcome is unknown and a
    /// reconciliation re-check is the safe follow-up, not a blind retry.
    FinalityTimeout,
}

/// Observable state of one donation attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DonationStatus {
    Idle,
    Validating,
    Submitting,
    AwaitingFinality,
    Reaggregating,
    Succeeded {
        tx_reference: String,
        /// Refreshed view when the post-transfer aggregate read succeeded;
        /// otherwise the display keeps its pre-donation values.
        campaign: Option<Campaign>,
    },
    Failed {
        reason: FailureReason,
        /// The failing adapter's message, unchanged.
        message: String,
    },
}

impl DonationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DonationStatus::Succeeded { .. } | DonationStatus::Failed { .. })
    }
}

/// One submission, created when the user confirms an amount.
#[derive(Debug, Clone)]
pub struct DonationAttempt {
    pub attempt_id: Uuid,
    pub campaign: CampaignKey,
    pub amount_requested: f64,
}

/// Recomputes and publishes the campaign view after a confirmed transfer.
#[async_trait]
pub trait CampaignRefresher: Send + Sync {
    async fn refresh(
        &self,
        key: &CampaignKey,
        aggregate: Option<AggregateRecord>,
    ) -> Option<Campaign>;
}

/// Internal state for an in-flight attempt
struct AttemptSlot {
    events: broadcast::Sender<DonationStatus>,
    started_at: Instant,
}

/// Drives donation attempts, one per campaign identifier at a time.
pub struct DonationCoordinator {
    submitter: Arc<dyn ValueTransferSubmitter>,
    aggregates: Arc<dyn DonationAggregateReader>,
    /// In-flight attempts (canonical campaign key -> slot)
    in_flight: Arc<DashMap<String, AttemptSlot>>,
    display_window: Duration,
}

impl DonationCoordinator {
    pub fn new(
        submitter: Arc<dyn ValueTransferSubmitter>,
        aggregates: Arc<dyn DonationAggregateReader>,
        display_window: Duration,
    ) -> Self {
        Self {
            submitter,
            aggregates,
            in_flight: Arc::new(DashMap::new()),
            display_window,
        }
    }

    /// Begin a donation attempt, or observe the one already in flight.
    ///
    /// The returned receiver yields every subsequent status transition;
    /// exactly one terminal event is emitted per attempt, followed by `Idle`
    /// after the display window.
    pub fn donate(
        &self,
        key: CampaignKey,
        amount_input: &str,
        refresher: Arc<dyn CampaignRefresher>,
    ) -> broadcast::Receiver<DonationStatus> {
        let canonical = key.canonical();

        let (events, receiver) = broadcast::channel(16);
        match self.in_flight.entry(canonical.clone()) {
            Entry::Occupied(slot) => {
                // Attempt already running for this campaign: observe it, start
                // nothing.
                debug!(
                    campaign = %canonical,
                    elapsed_ms = slot.get().started_at.elapsed().as_millis() as u64,
                    "donation already in flight, ignoring duplicate action"
                );
                return slot.get().events.subscribe();
            }
            Entry::Vacant(vacant) => {
                vacant.insert(AttemptSlot {
                    events: events.clone(),
                    started_at: Instant::now(),
                });
            }
        }

        // Snapshot of the resting state, so observers see the full
        // Idle -> Validating -> ... progression.
        let _ = events.send(DonationStatus::Idle);

        let submitter = Arc::clone(&self.submitter);
        let aggregates = Arc::clone(&self.aggregates);
        let in_flight = Arc::clone(&self.in_flight);
        let display_window = self.display_window;
        let amount_input = amount_input.trim().to_string();

        tokio::spawn(async move {
            drive_attempt(
                key,
                amount_input,
                submitter,
                aggregates,
                refresher,
                events,
                in_flight,
                display_window,
            )
            .await;
        });

        receiver
    }

    /// Whether an attempt is currently in flight for this campaign.
    pub fn is_in_flight(&self, key: &CampaignKey) -> bool {
        self.in_flight.contains_key(&key.canonical())
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

/// Parse a user-entered amount into a positive native-unit value.
fn parse_amount(input: &str) -> Result<f64, String> {
    match input.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => Err("Please enter a valid amount".to_string()),
    }
}

#[allow(clippy::too_many_arguments)]
async fn drive_attempt(
    key: CampaignKey,
    amount_input: String,
    submitter: Arc<dyn ValueTransferSubmitter>,
    aggregates: Arc<dyn DonationAggregateReader>,
    refresher: Arc<dyn CampaignRefresher>,
    events: broadcast::Sender<DonationStatus>,
    in_flight: Arc<DashMap<String, AttemptSlot>>,
    display_window: Duration,
) {
    // Send errors only mean every observer dropped; the attempt still runs to
    // completion so the transfer outcome is never ambiguous.
    let emit = |status: DonationStatus| {
        let _ = events.send(status);
    };

    let fail = |reason: FailureReason, message: String| {
        warn!(campaign = %key, ?reason, message = %message, "donation attempt failed");
        emit(DonationStatus::Failed { reason, message });
    };

    let _: Result<(), ()> = async {
        emit(DonationStatus::Validating);
        let amount = match parse_amount(&amount_input) {
            Ok(amount) => amount,
            Err(message) => {
                fail(FailureReason::Validation, message);
                return Err(());
            }
        };

        let attempt = DonationAttempt {
            attempt_id: Uuid::new_v4(),
            campaign: key.clone(),
            amount_requested: amount,
        };
        debug!(
            attempt = %attempt.attempt_id,
            campaign = %attempt.campaign,
            amount = attempt.amount_requested,
            "donation attempt started"
        );

        emit(DonationStatus::Submitting);
        let numeric_id = match key.numeric() {
            Some(id) => id,
            None => {
                fail(
                    FailureReason::TransferRejected,
                    "campaign has no on-chain identifier".to_string(),
                );
                return Err(());
            }
        };
        let ticket = match submitter.submit(numeric_id, amount).await {
            Ok(ticket) => ticket,
            Err(e) => {
                fail(FailureReason::TransferRejected, e.to_string());
                return Err(());
            }
        };

        emit(DonationStatus::AwaitingFinality);
        let tx_reference = match submitter.await_finality(ticket).await {
            Ok(reference) => reference,
            Err(e) => {
                let reason = match e {
                    TransferError::FinalityTimeout(_) => FailureReason::FinalityTimeout,
                    TransferError::Rejected(_) => FailureReason::TransferRejected,
                };
                fail(reason, e.to_string());
                return Err(());
            }
        };

        emit(DonationStatus::Reaggregating);
        // The transfer is final regardless of whether this read-back works; a
        // missing aggregate leaves the display at its pre-donation values.
        let aggregate = aggregates.totals_for(numeric_id).await;
        let campaign = refresher.refresh(&key, aggregate).await;

        info!(
            attempt = %attempt.attempt_id,
            campaign = %key,
            tx_reference = %tx_reference,
            "donation confirmed"
        );
        emit(DonationStatus::Succeeded {
            tx_reference,
            campaign,
        });
        Ok(())
    }
    .await;

    // Hold the terminal state through the display window, then reset. The slot
    // is removed first so a fresh attempt never coalesces into this one.
    tokio::time::sleep(display_window).await;
    in_flight.remove(&key.canonical());
    let _ = events.send(DonationStatus::Idle);
}
