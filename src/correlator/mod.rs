// Request/response correlation.
//
// Four time-bounded tables tie the protocol together:
//   * outstanding requests, keyed by sequence number (short TTL; expiry is
//     reported to the application through the send_error hook);
//   * the delivery map from SMSC message ids to submits, consulted when a
//     delivery receipt arrives, possibly days later (long TTL, persisted);
//   * per-reference status of outbound concatenated messages;
//   * assembly buffers for inbound concatenated messages.

mod store;

pub use store::FileStore;

use crate::client::{EsmeError, EsmeResult};
use crate::datatypes::{CommandId, CommandStatus, DeliverSm, SubmitSm};
use crate::frame::Pdu;
use crate::hook::Hook;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Sentinel segment states, ordered so that `max()` over a reference's
/// segments collapses to a terminal state only when nothing is pending:
/// SENDING > FAILED > EXPIRED > SENT > numeric error codes (receipts).
pub const STATUS_SENT: u32 = 0x0000_1000;
pub const STATUS_EXPIRED: u32 = 0x0000_2000;
pub const STATUS_FAILED: u32 = 0x0000_4000;
pub const STATUS_SENDING: u32 = 0x0000_8000;

pub const DEFAULT_TTL_RESPONSE: Duration = Duration::from_secs(15);
pub const DEFAULT_TTL_DELIVERY: Duration = Duration::from_secs(72 * 3600);

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// An outstanding request awaiting its response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingRequest {
    pub stored_at_ms: u64,
    pub request: Pdu,
}

/// A submit acknowledged by the SMSC, awaiting its delivery receipt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingDelivery {
    pub stored_at_ms: u64,
    pub submit: SubmitSm,
}

/// Aggregated state of one outbound concatenated message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmentStatus {
    pub stored_at_ms: u64,
    pub total: u8,
    /// Segment sequence -> sentinel status or receipt error code.
    pub per_segment: BTreeMap<u8, u32>,
    /// The first segment seen, standing in for the whole submission when
    /// the application is notified of the aggregate outcome.
    pub submit: SubmitSm,
    pub last_response: Option<Pdu>,
    pub last_receipt: Option<DeliverSm>,
}

impl SegmentStatus {
    /// The cumulated status of the reference: `max` over the per-segment
    /// values, or SENDING while segments are missing entirely.
    pub fn cumulated(&self) -> u32 {
        if self.per_segment.len() < self.total as usize {
            return STATUS_SENDING;
        }
        self.per_segment.values().copied().max().unwrap_or(STATUS_SENDING)
    }
}

/// Assembly buffer for one inbound concatenated message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmentAssembly {
    pub stored_at_ms: u64,
    pub total: u8,
    pub parts: BTreeMap<u8, String>,
    /// The most recent part, used as the template for the synthesized
    /// complete message.
    pub template: DeliverSm,
}

/// What the aggregation of a concatenated submission looks like after a
/// response or receipt has been recorded.
#[derive(Clone, Debug)]
pub struct SegmentOutcome {
    pub cumulated: u32,
    /// True once every segment has left the pending state for this phase.
    pub finished: bool,
    pub submit: SubmitSm,
}

/// Correlation between requests and responses, submits and receipts, and
/// the segments of concatenated messages. The session engine injects the
/// active hook and client id at startup.
#[async_trait]
pub trait Correlator: Send + Sync {
    fn attach(&self, hook: Arc<dyn Hook>, client_id: String);

    /// Stores an outstanding request under its sequence number; registers
    /// segment bookkeeping when the request is part of a concatenated
    /// submit. Expired entries are swept first.
    async fn put(&self, request: &Pdu) -> EsmeResult<()>;

    /// Removes and returns the request a response answers. `command` is the
    /// response's command id; generic_nack matches any request type.
    async fn get(&self, command: CommandId, sequence_number: u32) -> EsmeResult<Option<Pdu>>;

    /// Durably stores the submit behind an SMSC-issued message id.
    async fn put_delivery(&self, smsc_message_id: &str, submit: &SubmitSm) -> EsmeResult<()>;

    /// Removes and returns the submit a delivery receipt refers to.
    async fn get_delivery(&self, smsc_message_id: &str) -> EsmeResult<Option<SubmitSm>>;

    /// Records the submit_sm_resp outcome of one segment.
    async fn record_segment_response(
        &self,
        submit: &SubmitSm,
        status: CommandStatus,
        response: &Pdu,
    ) -> EsmeResult<Option<SegmentOutcome>>;

    /// Records the delivery-receipt outcome of one segment. The reference is
    /// discarded once every segment has its receipt.
    async fn record_segment_receipt(
        &self,
        submit: &SubmitSm,
        error_code: u32,
        receipt: &DeliverSm,
    ) -> EsmeResult<Option<SegmentOutcome>>;

    /// Adds one part of an inbound concatenated message. Returns the
    /// synthesized complete message once the final part has arrived.
    async fn assemble_inbound(&self, part: &DeliverSm) -> EsmeResult<Option<DeliverSm>>;
}

#[derive(Default, Serialize, Deserialize)]
struct Tables {
    requests: HashMap<u32, PendingRequest>,
    deliveries: HashMap<String, PendingDelivery>,
    segment_status: HashMap<u16, SegmentStatus>,
    assemblies: HashMap<u16, SegmentAssembly>,
}

/// The default correlator: in-memory tables with optional file-per-table
/// JSON persistence (write-through, atomic rename).
pub struct SimpleCorrelator {
    max_ttl_response: Duration,
    max_ttl_delivery: Duration,
    tables: Mutex<Tables>,
    store: Option<FileStore>,
    hook: std::sync::Mutex<Option<(Arc<dyn Hook>, String)>>,
}

impl SimpleCorrelator {
    pub fn in_memory() -> Self {
        Self::with_ttls(DEFAULT_TTL_RESPONSE, DEFAULT_TTL_DELIVERY)
    }

    pub fn with_ttls(max_ttl_response: Duration, max_ttl_delivery: Duration) -> Self {
        SimpleCorrelator {
            max_ttl_response,
            max_ttl_delivery,
            tables: Mutex::new(Tables::default()),
            store: None,
            hook: std::sync::Mutex::new(None),
        }
    }

    /// Opens (or creates) a persistent correlator in `dir`, restoring any
    /// tables a previous process left behind.
    pub async fn persistent(dir: impl AsRef<std::path::Path>) -> EsmeResult<Self> {
        let store = FileStore::open(dir).await?;
        let tables = Tables {
            requests: store.load("requests").await?,
            deliveries: store.load("deliveries").await?,
            segment_status: store.load("segments").await?,
            assemblies: store.load("assemblies").await?,
        };
        Ok(SimpleCorrelator {
            max_ttl_response: DEFAULT_TTL_RESPONSE,
            max_ttl_delivery: DEFAULT_TTL_DELIVERY,
            tables: Mutex::new(tables),
            store: Some(store),
            hook: std::sync::Mutex::new(None),
        })
    }

    pub fn ttls(mut self, max_ttl_response: Duration, max_ttl_delivery: Duration) -> Self {
        self.max_ttl_response = max_ttl_response;
        self.max_ttl_delivery = max_ttl_delivery;
        self
    }

    fn hook(&self) -> Option<(Arc<dyn Hook>, String)> {
        self.hook.lock().unwrap().clone()
    }

    async fn persist<T: Serialize>(&self, table: &str, value: &T) -> EsmeResult<()> {
        match &self.store {
            Some(store) => store.save(table, value).await,
            None => Ok(()),
        }
    }

    /// Drops request entries older than max_ttl_response. Expired plain
    /// submits are reported through send_error; expired segments are marked
    /// EXPIRED and reported once per reference when it settles.
    async fn sweep_requests(&self, tables: &mut Tables) -> EsmeResult<bool> {
        let now = now_ms();
        let ttl = self.max_ttl_response.as_millis() as u64;
        let expired: Vec<u32> = tables
            .requests
            .iter()
            .filter(|(_, entry)| now.saturating_sub(entry.stored_at_ms) > ttl)
            .map(|(&sequence, _)| sequence)
            .collect();
        if expired.is_empty() {
            return Ok(false);
        }

        let mut settled_refs: Vec<SubmitSm> = Vec::new();
        let mut plain_expired: Vec<SubmitSm> = Vec::new();
        for sequence in expired {
            let Some(entry) = tables.requests.remove(&sequence) else {
                continue;
            };
            debug!(sequence, "request expired without a response");
            let Pdu::SubmitSm(submit) = entry.request else {
                continue;
            };
            match submit.concat {
                None => plain_expired.push(*submit),
                Some(concat) => {
                    if let Some(status) = tables.segment_status.get_mut(&concat.ref_num) {
                        status.per_segment.insert(concat.seq, STATUS_EXPIRED);
                        let cumulated = status.cumulated();
                        if cumulated != STATUS_SENDING
                            && matches!(cumulated, STATUS_EXPIRED | STATUS_FAILED)
                        {
                            settled_refs.push(status.submit.clone());
                            tables.segment_status.remove(&concat.ref_num);
                        }
                    }
                }
            }
        }

        if let Some((hook, client_id)) = self.hook() {
            let timeout = EsmeError::ResponseTimeout(self.max_ttl_response);
            for submit in plain_expired.iter().chain(settled_refs.iter()) {
                hook.send_error(submit, &timeout, &client_id).await;
            }
        }
        Ok(true)
    }

    fn sweep_deliveries(&self, tables: &mut Tables) -> bool {
        let now = now_ms();
        let ttl = self.max_ttl_delivery.as_millis() as u64;
        let before = tables.deliveries.len() + tables.assemblies.len() + tables.segment_status.len();
        tables
            .deliveries
            .retain(|_, entry| now.saturating_sub(entry.stored_at_ms) <= ttl);
        tables
            .assemblies
            .retain(|_, entry| now.saturating_sub(entry.stored_at_ms) <= ttl);
        tables
            .segment_status
            .retain(|_, entry| now.saturating_sub(entry.stored_at_ms) <= ttl);
        before != tables.deliveries.len() + tables.assemblies.len() + tables.segment_status.len()
    }
}

#[async_trait]
impl Correlator for SimpleCorrelator {
    fn attach(&self, hook: Arc<dyn Hook>, client_id: String) {
        *self.hook.lock().unwrap() = Some((hook, client_id));
    }

    async fn put(&self, request: &Pdu) -> EsmeResult<()> {
        let mut tables = self.tables.lock().await;
        self.sweep_requests(&mut tables).await?;

        let sequence = request.sequence_number();
        tables.requests.insert(
            sequence,
            PendingRequest {
                stored_at_ms: now_ms(),
                request: request.clone(),
            },
        );

        // One segment of a concatenated submit also feeds the per-reference
        // status map.
        if let Pdu::SubmitSm(submit) = request
            && let Some(concat) = submit.concat
        {
            let status = tables
                .segment_status
                .entry(concat.ref_num)
                .or_insert_with(|| SegmentStatus {
                    stored_at_ms: now_ms(),
                    total: concat.total,
                    per_segment: BTreeMap::new(),
                    submit: (**submit).clone(),
                    last_response: None,
                    last_receipt: None,
                });
            status.per_segment.insert(concat.seq, STATUS_SENDING);
            self.persist("segments", &tables.segment_status).await?;
        }

        self.persist("requests", &tables.requests).await
    }

    async fn get(&self, command: CommandId, sequence_number: u32) -> EsmeResult<Option<Pdu>> {
        let mut tables = self.tables.lock().await;
        let entry = tables.requests.remove(&sequence_number);
        let swept = self.sweep_requests(&mut tables).await?;
        if entry.is_some() || swept {
            self.persist("requests", &tables.requests).await?;
        }
        drop(tables);

        let Some(entry) = entry else {
            error!(
                sequence = sequence_number,
                response = ?command,
                "could not correlate response"
            );
            return Ok(None);
        };

        // generic_nack correlates by sequence alone; typed responses must
        // answer a request of the matching type.
        if command != CommandId::GenericNack
            && command.request_id() != Some(entry.request.command_id())
        {
            error!(
                sequence = sequence_number,
                response = ?command,
                request = ?entry.request.command_id(),
                "response correlated to an unrelated request"
            );
            return Ok(None);
        }
        Ok(Some(entry.request))
    }

    async fn put_delivery(&self, smsc_message_id: &str, submit: &SubmitSm) -> EsmeResult<()> {
        let mut tables = self.tables.lock().await;
        self.sweep_deliveries(&mut tables);
        tables.deliveries.insert(
            smsc_message_id.to_owned(),
            PendingDelivery {
                stored_at_ms: now_ms(),
                submit: submit.clone(),
            },
        );
        self.persist("deliveries", &tables.deliveries).await
    }

    async fn get_delivery(&self, smsc_message_id: &str) -> EsmeResult<Option<SubmitSm>> {
        let mut tables = self.tables.lock().await;
        let entry = tables.deliveries.remove(smsc_message_id);
        let swept = self.sweep_deliveries(&mut tables);
        if entry.is_some() || swept {
            self.persist("deliveries", &tables.deliveries).await?;
        }
        Ok(entry.map(|entry| entry.submit))
    }

    async fn record_segment_response(
        &self,
        submit: &SubmitSm,
        status: CommandStatus,
        response: &Pdu,
    ) -> EsmeResult<Option<SegmentOutcome>> {
        let Some(concat) = submit.concat else {
            return Ok(None);
        };
        let mut tables = self.tables.lock().await;
        let Some(segment_status) = tables.segment_status.get_mut(&concat.ref_num) else {
            warn!(ref_num = concat.ref_num, "segment response for unknown reference");
            return Ok(None);
        };
        let value = if status.is_ok() {
            STATUS_SENT
        } else {
            STATUS_FAILED
        };
        segment_status.per_segment.insert(concat.seq, value);
        segment_status.last_response = Some(response.clone());
        let cumulated = segment_status.cumulated();
        let outcome = SegmentOutcome {
            cumulated,
            finished: cumulated != STATUS_SENDING,
            submit: segment_status.submit.clone(),
        };
        self.persist("segments", &tables.segment_status).await?;
        Ok(Some(outcome))
    }

    async fn record_segment_receipt(
        &self,
        submit: &SubmitSm,
        error_code: u32,
        receipt: &DeliverSm,
    ) -> EsmeResult<Option<SegmentOutcome>> {
        let Some(concat) = submit.concat else {
            return Ok(None);
        };
        let mut tables = self.tables.lock().await;
        let Some(segment_status) = tables.segment_status.get_mut(&concat.ref_num) else {
            return Ok(None);
        };
        segment_status.per_segment.insert(concat.seq, error_code);
        segment_status.last_receipt = Some(receipt.clone());
        let cumulated = segment_status.cumulated();
        // All receipts in: only numeric error codes remain, so the reference
        // is complete and can be dropped.
        let finished = cumulated < STATUS_SENT;
        let outcome = SegmentOutcome {
            cumulated,
            finished,
            submit: segment_status.submit.clone(),
        };
        if finished {
            tables.segment_status.remove(&concat.ref_num);
        }
        self.persist("segments", &tables.segment_status).await?;
        Ok(Some(outcome))
    }

    async fn assemble_inbound(&self, part: &DeliverSm) -> EsmeResult<Option<DeliverSm>> {
        let Some(concat) = part.concat else {
            return Ok(None);
        };
        let mut tables = self.tables.lock().await;
        self.sweep_deliveries(&mut tables);

        let assembly = tables
            .assemblies
            .entry(concat.ref_num)
            .or_insert_with(|| SegmentAssembly {
                stored_at_ms: now_ms(),
                total: concat.total,
                parts: BTreeMap::new(),
                template: part.clone(),
            });
        assembly
            .parts
            .insert(concat.seq, part.short_message.clone());
        assembly.template = part.clone();

        let complete = assembly.parts.len() >= assembly.total as usize;
        let result = if complete {
            let assembly = tables.assemblies.remove(&concat.ref_num).unwrap_or_else(|| {
                unreachable!("assembly entry was just inserted")
            });
            let mut full = assembly.template;
            full.short_message = assembly.parts.into_values().collect();
            full.concat = None;
            full.esm_class &= !crate::datatypes::ESM_UDHI;
            Some(full)
        } else {
            None
        };
        self.persist("assemblies", &tables.assemblies).await?;
        Ok(result)
    }
}
