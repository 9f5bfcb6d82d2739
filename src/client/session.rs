// The session engine: connection lifecycle, the three bound-state tasks
// (receiver, sender, keeper), task supervision and graceful shutdown.
//
// One session owns one TCP connection. The supervisor loop connects and
// binds, runs the task trio until the first of them ends, tears the rest
// down with a bounded grace period, and reconnects after the retry timer's
// delay. A clean stop() exits the loop instead.

use crate::broker::Broker;
use crate::client::config::EsmeConfig;
use crate::client::error::{EsmeError, EsmeResult};
use crate::connection::{self, Reader};
use crate::correlator::{Correlator, STATUS_SENT};
use crate::datatypes::{
    BindMode, BindRequest, CommandStatus, DeliverSm, DeliverSmResp, EnquireLink, EnquireLinkResp,
    GenericNack, SubmitSm, Unbind, UnbindResp,
};
use crate::encoding::{
    ConcatInfo, EncodingConfig, SegmentAlphabet, fits_single, is_gsm_text, new_reference,
    split_text,
};
use crate::frame::Pdu;
use crate::hook::Hook;
use crate::ratelimit::RateLimiter;
use crate::retry::RetryTimer;
use crate::sequence::SequenceGenerator;
use crate::throttle::ThrottleHandler;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Grace period a task gets to end on its own before it is aborted.
const TASK_GRACE: Duration = Duration::from_millis(500);

/// SMPP session states (specification section 2.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No TCP connection.
    Closed,
    /// TCP up, not yet bound.
    Open,
    BoundTx,
    BoundRx,
    BoundTrx,
}

impl SessionState {
    pub fn is_bound(self) -> bool {
        matches!(
            self,
            SessionState::BoundTx | SessionState::BoundRx | SessionState::BoundTrx
        )
    }
}

/// The state a successful bind in `mode` lands in.
pub(crate) fn bound_state(mode: BindMode) -> SessionState {
    match mode {
        BindMode::Transmitter => SessionState::BoundTx,
        BindMode::Receiver => SessionState::BoundRx,
        BindMode::Transceiver => SessionState::BoundTrx,
    }
}

/// A reconnecting SMPP client session. Cheap to clone; all clones drive the
/// same session.
#[derive(Clone)]
pub struct Esme {
    inner: Arc<EsmeInner>,
}

pub(crate) struct EsmeInner {
    pub(crate) config: EsmeConfig,
    pub(crate) encoding: EncodingConfig,
    pub(crate) hook: Arc<dyn Hook>,
    pub(crate) broker: Arc<dyn Broker>,
    pub(crate) rate_limiter: Option<Arc<dyn RateLimiter>>,
    pub(crate) throttle: Arc<dyn ThrottleHandler>,
    pub(crate) correlator: Arc<dyn Correlator>,
    pub(crate) sequence: Arc<dyn SequenceGenerator>,
    pub(crate) retry_timer: Arc<dyn RetryTimer>,

    state: std::sync::Mutex<SessionState>,
    writer: Mutex<Option<connection::Writer>>,
    data_received: Notify,
    shutting_down: AtomicBool,
    shutdown_started: Notify,
    started: AtomicBool,
    shut_down: watch::Sender<bool>,
}

impl Esme {
    pub(crate) fn from_inner(inner: EsmeInner) -> Esme {
        Esme {
            inner: Arc::new(inner),
        }
    }

    /// Runs the session until `stop` is called: connect, bind, serve, and
    /// reconnect with backoff on any failure.
    pub async fn start(&self) {
        self.inner.run().await;
    }

    /// Cleanly shuts the session down: unbind, drain, half-close, and wait
    /// for the supervisor to exit. No reconnect follows.
    pub async fn stop(&self) {
        let inner = &self.inner;
        info!(client_id = %inner.config.client_id, "shutting down ESME");
        inner.shutting_down.store(true, Ordering::SeqCst);
        if !inner.started.load(Ordering::SeqCst) {
            return;
        }
        // Unbind and half-close first, then wake tasks parked on the socket.
        inner.disconnect().await;
        inner.shutdown_started.notify_one();

        let mut shut_down = inner.shut_down.subscribe();
        while !*shut_down.borrow_and_update() {
            if shut_down.changed().await.is_err() {
                break;
            }
        }
        info!(client_id = %inner.config.client_id, "ESME is shut down");
    }

    pub fn session_state(&self) -> SessionState {
        self.inner.state()
    }

    pub fn client_id(&self) -> &str {
        &self.inner.config.client_id
    }

    /// Queues a message for submission through the configured broker.
    pub async fn enqueue(&self, message: SubmitSm) {
        self.inner.broker.enqueue(message).await;
    }
}

impl EsmeInner {
    pub(crate) fn new(
        config: EsmeConfig,
        encoding: EncodingConfig,
        hook: Arc<dyn Hook>,
        broker: Arc<dyn Broker>,
        rate_limiter: Option<Arc<dyn RateLimiter>>,
        throttle: Arc<dyn ThrottleHandler>,
        correlator: Arc<dyn Correlator>,
        sequence: Arc<dyn SequenceGenerator>,
        retry_timer: Arc<dyn RetryTimer>,
    ) -> EsmeInner {
        EsmeInner {
            config,
            encoding,
            hook,
            broker,
            rate_limiter,
            throttle,
            correlator,
            sequence,
            retry_timer,
            state: std::sync::Mutex::new(SessionState::Closed),
            writer: Mutex::new(None),
            data_received: Notify::new(),
            shutting_down: AtomicBool::new(false),
            shutdown_started: Notify::new(),
            started: AtomicBool::new(false),
            shut_down: watch::Sender::new(false),
        }
    }

    fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock().unwrap() = state;
    }

    fn should_stop(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
            || self.state() != bound_state(self.config.bind_mode)
    }

    // ---- supervisor ----------------------------------------------------

    async fn run(self: &Arc<Self>) {
        info!(client_id = %self.config.client_id, "starting ESME");
        self.started.store(true, Ordering::SeqCst);

        while !self.shutting_down.load(Ordering::SeqCst) {
            match self.connect_and_bind().await {
                Ok(reader) => {
                    self.retry_timer.reset();
                    self.serve_session(reader).await;
                }
                Err(err) => {
                    self.set_state(SessionState::Closed);
                    error!(client_id = %self.config.client_id, %err, "connection attempt failed");
                }
            }

            if let Some(mut writer) = self.writer.lock().await.take() {
                let _ = writer.shutdown().await;
            }
            if self.shutting_down.load(Ordering::SeqCst) {
                break;
            }
            let delay = self.retry_timer.next_delay();
            if delay > Duration::ZERO {
                info!(?delay, "delaying next connect attempt");
            }
            tokio::select! {
                _ = self.retry_timer.wait() => {}
                _ = self.shutdown_started.notified() => break,
            }
        }

        debug!("supervisor ended");
        let _ = self.shut_down.send(true);
    }

    /// Spawns the receiver/sender/keeper trio and waits for the first one to
    /// finish; the others are then ended within the grace period.
    async fn serve_session(self: &Arc<Self>, reader: Reader) {
        let mut receiver_task = {
            let inner = Arc::clone(self);
            tokio::spawn(async move { inner.receiver_loop(reader).await })
        };
        let mut sender_task = {
            let inner = Arc::clone(self);
            tokio::spawn(async move { inner.sender_loop().await })
        };
        let mut keeper_task = {
            let inner = Arc::clone(self);
            tokio::spawn(async move { inner.keeper_loop().await })
        };

        tokio::select! {
            result = &mut receiver_task => log_task_exit("receiver", result),
            result = &mut sender_task => log_task_exit("sender", result),
            result = &mut keeper_task => log_task_exit("keeper", result),
        }
        self.set_state(SessionState::Closed);

        for (name, task) in [
            ("receiver", receiver_task),
            ("sender", sender_task),
            ("keeper", keeper_task),
        ] {
            end_task(name, task).await;
        }
    }

    async fn connect_and_bind(&self) -> EsmeResult<Reader> {
        info!(
            host = %self.config.smsc_host,
            port = self.config.smsc_port,
            "initiating connection to SMSC"
        );
        let (mut reader, writer) = connection::connect(
            &self.config.smsc_host,
            self.config.smsc_port,
            self.config.socket_timeout,
        )
        .await?;
        *self.writer.lock().await = Some(writer);
        self.set_state(SessionState::Open);
        info!(
            mode = self.config.bind_mode.description(),
            "connected to SMSC, binding"
        );

        let mode = self.config.bind_mode;
        let mut bind = Pdu::BindRequest(BindRequest {
            sequence_number: 0,
            mode,
            system_id: self.config.system_id.clone(),
            password: self.config.password.clone(),
            system_type: self.config.system_type.clone(),
            addr_ton: self.config.addr_ton,
            addr_npi: self.config.addr_npi,
            address_range: self.config.address_range.clone(),
            ..BindRequest::default()
        });
        self.send_pdu(&mut bind).await?;

        let (bytes, _raw) =
            tokio::time::timeout(self.config.socket_timeout, reader.read_pdu())
                .await
                .map_err(|_| EsmeError::Timeout)??;
        let pdu = Pdu::parse(&bytes, &self.encoding)?;
        // Clear the outstanding bind entry; the response is consumed here
        // rather than by the receiver task.
        let _ = self
            .correlator
            .get(mode.response_id(), pdu.sequence_number())
            .await?;

        let Pdu::BindResponse(response) = &pdu else {
            return Err(EsmeError::Protocol {
                command: pdu.command_id(),
                status: pdu.command_status(),
            });
        };
        self.hook
            .received(Some(&pdu), &bytes, &self.config.client_id)
            .await;
        if response.command != mode.response_id()
            || !matches!(
                response.command_status,
                CommandStatus::Ok | CommandStatus::AlreadyBound
            )
        {
            self.set_state(SessionState::Closed);
            return Err(EsmeError::Protocol {
                command: response.command,
                status: response.command_status,
            });
        }

        self.set_state(bound_state(mode));
        info!(mode = mode.description(), "bound to SMSC");
        Ok(reader)
    }

    /// Sends unbind (when bound), drains the write buffer and half-closes
    /// the socket. The receiver task then sees EOF and the supervisor winds
    /// the session down.
    async fn disconnect(&self) {
        if self.state() == bound_state(self.config.bind_mode) {
            let mut unbind = Pdu::Unbind(Unbind::new(0));
            if let Err(err) = self.send_pdu(&mut unbind).await {
                debug!(%err, "unbind failed during shutdown");
            }
        }
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
    }

    // ---- outbound path -------------------------------------------------

    /// Encodes and transmits one PDU. Requests get a fresh sequence number
    /// and their correlation entry is committed before this call returns,
    /// so the next PDU on the submission path cannot overtake the entry.
    async fn send_pdu(&self, pdu: &mut Pdu) -> EsmeResult<()> {
        let is_request = pdu.command_id().response_id().is_some();
        if is_request {
            pdu.set_sequence_number(self.sequence.next_sequence());
        }
        let bytes = pdu.to_bytes(&self.encoding)?;
        self.hook
            .sending(pdu, &bytes, &self.config.client_id)
            .await;

        {
            let mut writer = self.writer.lock().await;
            let writer = writer.as_mut().ok_or(EsmeError::ConnectionClosed)?;
            tokio::time::timeout(self.config.socket_timeout, writer.write_pdu(&bytes))
                .await
                .map_err(|_| EsmeError::Timeout)??;
        }
        debug!(
            command = ?pdu.command_id(),
            sequence = pdu.sequence_number(),
            "sent PDU"
        );

        if is_request {
            self.correlator.put(pdu).await?;
        }
        Ok(())
    }

    /// Dequeues from the broker and submits, under admission control.
    async fn sender_loop(&self) -> EsmeResult<()> {
        loop {
            if self.should_stop() {
                info!("exiting dequeue loop");
                return Ok(());
            }

            if !self.throttle.allow_request().await {
                let delay = self.throttle.throttle_delay().await;
                debug!(?delay, "sleeping after throttle denial");
                tokio::time::sleep(delay).await;
                continue;
            }
            if let Some(limiter) = &self.rate_limiter {
                limiter.limit().await;
            }

            let message = self.broker.dequeue().await;
            if self.config.bind_mode == BindMode::Receiver {
                warn!(log_id = %message.log_id, "session bound as receiver, message discarded");
                continue;
            }

            if let Err(err) = self.send_submit(message.clone()).await {
                warn!(log_id = %message.log_id, %err, "message could not be sent");
                self.hook
                    .send_error(&message, &err, &self.config.client_id)
                    .await;
                if err.is_fatal() {
                    return Err(err);
                }
            }
        }
    }

    /// Submits one application message, splitting it into concatenated
    /// parts when it exceeds a single SMS and the automatic message_payload
    /// spill is disabled.
    async fn send_submit(&self, mut message: SubmitSm) -> EsmeResult<()> {
        message.validate()?;

        let alphabet = self.segment_alphabet(&message);
        let needs_split = !message.short_message.is_empty()
            && !message.auto_message_payload
            && message.concat.is_none()
            && !fits_single(&message.short_message, alphabet);

        if !needs_split {
            let mut pdu = Pdu::SubmitSm(Box::new(message));
            return self.send_pdu(&mut pdu).await;
        }

        let parts = split_text(&message.short_message, alphabet, false);
        if parts.len() > u8::MAX as usize {
            return Err(EsmeError::Validation(format!(
                "message splits into {} parts, maximum is 255",
                parts.len()
            )));
        }
        let ref_num = new_reference(false);
        let total = parts.len() as u8;
        debug!(ref_num, total, "splitting long message");
        for (index, text) in parts.into_iter().enumerate() {
            let mut part = message.clone();
            part.short_message = text;
            part.concat = Some(ConcatInfo {
                ref_num,
                total,
                seq: index as u8 + 1,
                wide_ref: false,
            });
            let mut pdu = Pdu::SubmitSm(Box::new(part));
            self.send_pdu(&mut pdu).await?;
        }
        Ok(())
    }

    /// The alphabet segmentation capacity is computed in, from the message's
    /// pinned encoding or the session default.
    fn segment_alphabet(&self, message: &SubmitSm) -> SegmentAlphabet {
        let encoding = message
            .encoding
            .as_deref()
            .unwrap_or(&self.config.default_encoding);
        match encoding {
            "ucs2" => SegmentAlphabet::Ucs2,
            name if name.starts_with("gsm0338") => {
                if is_gsm_text(&message.short_message) {
                    SegmentAlphabet::Gsm
                } else {
                    // The per-part encode will fall back to UCS-2.
                    SegmentAlphabet::Ucs2
                }
            }
            _ => SegmentAlphabet::Gsm,
        }
    }

    // ---- inbound path --------------------------------------------------

    /// Reads PDUs one at a time, dispatches them, and answers inbound
    /// requests. Exits cleanly on an inbound unbind.
    async fn receiver_loop(&self, mut reader: Reader) -> EsmeResult<()> {
        loop {
            if self.should_stop() {
                info!("exiting receive loop");
                return Ok(());
            }

            let (bytes, raw) = tokio::select! {
                result = reader.read_pdu() => result?,
                _ = self.shutdown_started.notified() => {
                    info!("exiting receive loop for shutdown");
                    return Ok(());
                }
            };
            self.data_received.notify_waiters();

            let pdu = match Pdu::parse(&bytes, &self.encoding) {
                Ok(pdu) => pdu,
                Err(err) => {
                    warn!(%err, sequence = raw.sequence_number, "unparseable inbound PDU");
                    self.hook
                        .received(None, &bytes, &self.config.client_id)
                        .await;
                    if !raw.is_response() {
                        let mut nack = Pdu::GenericNack(GenericNack::error(
                            raw.sequence_number,
                            err.to_command_status(),
                        ));
                        self.send_pdu(&mut nack).await?;
                    }
                    continue;
                }
            };

            if pdu.is_response() {
                let handled = self.handle_response(pdu).await?;
                if let Some(handled) = handled {
                    self.hook
                        .received(Some(&handled), &bytes, &self.config.client_id)
                        .await;
                }
                continue;
            }

            match pdu {
                Pdu::DeliverSm(deliver) => {
                    let sequence_number = deliver.sequence_number;
                    let report = self.handle_deliver(*deliver).await?;
                    if let Some(report) = report {
                        self.hook
                            .received(Some(&report), &bytes, &self.config.client_id)
                            .await;
                    }
                    let mut response =
                        Pdu::DeliverSmResp(DeliverSmResp::new(sequence_number, ""));
                    self.send_pdu(&mut response).await?;
                }
                Pdu::EnquireLink(ping) => {
                    self.hook
                        .received(Some(&Pdu::EnquireLink(ping)), &bytes, &self.config.client_id)
                        .await;
                    let mut response =
                        Pdu::EnquireLinkResp(EnquireLinkResp::new(ping.sequence_number));
                    self.send_pdu(&mut response).await?;
                }
                Pdu::Unbind(unbind) => {
                    self.hook
                        .received(Some(&Pdu::Unbind(unbind)), &bytes, &self.config.client_id)
                        .await;
                    let mut response = Pdu::UnbindResp(UnbindResp::new(unbind.sequence_number));
                    self.send_pdu(&mut response).await?;
                    info!("got unbind request from SMSC, reconnecting");
                    return Ok(());
                }
                other => {
                    // bind_* or submit_sm towards a client make no sense.
                    warn!(command = ?other.command_id(), "unexpected inbound request");
                    self.hook
                        .received(Some(&other), &bytes, &self.config.client_id)
                        .await;
                    let mut nack = Pdu::GenericNack(GenericNack::error(
                        other.sequence_number(),
                        CommandStatus::InvalidCommandId,
                    ));
                    self.send_pdu(&mut nack).await?;
                }
            }
        }
    }

    /// Correlates a response to its request; submit responses additionally
    /// feed the throttle handler, the delivery map and segment bookkeeping.
    async fn handle_response(&self, mut pdu: Pdu) -> EsmeResult<Option<Pdu>> {
        let command = pdu.command_id();
        let sequence_number = pdu.sequence_number();
        let original = self.correlator.get(command, sequence_number).await?;
        let Some(original) = original else {
            // Correlation misses are logged by the correlator; the response
            // is still shown to the application.
            return Ok(Some(pdu));
        };

        if let Pdu::SubmitSm(submit) = &original {
            let status = pdu.command_status();
            if status.is_throttling() {
                self.throttle.throttled().await;
            } else {
                self.throttle.not_throttled().await;
            }

            if let Pdu::SubmitSmResp(response) = &mut pdu {
                response.log_id = submit.log_id.clone();
                response.extra_data = submit.extra_data.clone();
            }

            if status.is_ok()
                && let Pdu::SubmitSmResp(response) = &pdu
                && !response.message_id.is_empty()
            {
                debug!(
                    message_id = %response.message_id,
                    log_id = %submit.log_id,
                    "saving delivery correlation"
                );
                self.correlator
                    .put_delivery(&response.message_id, submit)
                    .await?;
            }

            if submit.concat.is_some()
                && let Some(outcome) = self
                    .correlator
                    .record_segment_response(submit, status, &pdu)
                    .await?
                && outcome.finished
                && outcome.cumulated > STATUS_SENT
            {
                // At least one segment failed or expired; report the
                // aggregated outcome exactly once.
                let aggregate = EsmeError::Protocol { command, status };
                self.hook
                    .send_error(&outcome.submit, &aggregate, &self.config.client_id)
                    .await;
            }
        }

        Ok(Some(pdu))
    }

    /// Handles an inbound deliver_sm: resolves receipts against the
    /// delivery map, assembles concatenated parts, passes everything else
    /// through. Returns the message to surface to the application, if any.
    async fn handle_deliver(&self, mut deliver: DeliverSm) -> EsmeResult<Option<Pdu>> {
        if let Some(receipt) = deliver.receipt() {
            match receipt.message_id.as_deref() {
                Some(message_id) => match self.correlator.get_delivery(message_id).await? {
                    Some(original) => {
                        deliver.log_id = original.log_id.clone();
                        deliver.extra_data = original.extra_data.clone();
                        debug!(
                            message_id,
                            log_id = %original.log_id,
                            "correlated delivery receipt"
                        );
                        if original.concat.is_some() {
                            let error_code = receipt
                                .err
                                .as_deref()
                                .and_then(|code| code.parse::<u32>().ok())
                                .unwrap_or(0);
                            if let Some(outcome) = self
                                .correlator
                                .record_segment_receipt(&original, error_code, &deliver)
                                .await?
                                && outcome.finished
                            {
                                debug!(
                                    cumulated = outcome.cumulated,
                                    "concatenated message fully receipted"
                                );
                            }
                        }
                    }
                    None => {
                        warn!(message_id, "could not correlate delivery receipt");
                    }
                },
                None => {
                    warn!("delivery receipt carries no message id");
                }
            }
            return Ok(Some(Pdu::DeliverSm(Box::new(deliver))));
        }

        if deliver.is_segment() {
            return Ok(self
                .correlator
                .assemble_inbound(&deliver)
                .await?
                .map(|full| Pdu::DeliverSm(Box::new(full))));
        }

        Ok(Some(Pdu::DeliverSm(Box::new(deliver))))
    }

    // ---- keep-alive ----------------------------------------------------

    /// Sends enquire_link after `enquire_link_interval` of inbound silence;
    /// no data within socket_timeout of the ping means the link is dead.
    async fn keeper_loop(&self) -> EsmeResult<()> {
        loop {
            if self.should_stop() {
                info!("exiting keep-alive loop");
                return Ok(());
            }

            let activity = self.data_received.notified();
            tokio::select! {
                _ = tokio::time::sleep(self.config.enquire_link_interval) => {
                    let response_wait = self.data_received.notified();
                    let mut ping = Pdu::EnquireLink(EnquireLink::new(0));
                    self.send_pdu(&mut ping).await?;
                    if tokio::time::timeout(self.config.socket_timeout, response_wait)
                        .await
                        .is_err()
                    {
                        error!("timed out waiting for enquire_link response");
                        return Err(EsmeError::Timeout);
                    }
                }
                _ = activity => {}
            }
        }
    }
}

fn log_task_exit(name: &str, result: Result<EsmeResult<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => debug!(task = name, "task ended"),
        Ok(Err(err)) => error!(task = name, %err, "task failed"),
        Err(join_error) => error!(task = name, %join_error, "task aborted abnormally"),
    }
}

/// Gives a task the grace period to finish on its own, then aborts it.
async fn end_task(name: &str, mut task: JoinHandle<EsmeResult<()>>) {
    if task.is_finished() {
        return;
    }
    debug!(task = name, "ending task");
    if tokio::time::timeout(TASK_GRACE, &mut task).await.is_err() {
        task.abort();
        let _ = task.await;
    }
    debug!(task = name, "ended task");
}
