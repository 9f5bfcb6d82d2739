// End-to-end tests against an in-process mock SMSC.

use crate::broker::MemoryBroker;
use crate::client::{Esme, EsmeConfig, EsmeError, SessionState};
use crate::datatypes::{
    BindMode, CommandStatus, DeliverSm, PhoneNumber, SubmitSm, SubmitSmResp, Ton,
};
use crate::datatypes::{BindResponse, SMPP_VERSION_3_4};
use crate::encoding::EncodingConfig;
use crate::frame::Pdu;
use crate::hook::Hook;
use crate::retry::ExponentialBackoff;
use crate::throttle::{ThrottleHandler, WindowedThrottle};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn wire_cfg() -> EncodingConfig {
    EncodingConfig::default()
}

// ---- mock SMSC plumbing -----------------------------------------------

async fn read_wire_pdu(stream: &mut TcpStream) -> Vec<u8> {
    let mut header = [0u8; 16];
    stream.read_exact(&mut header).await.expect("read header");
    let length = u32::from_be_bytes(header[0..4].try_into().unwrap()) as usize;
    let mut pdu = header.to_vec();
    pdu.resize(length, 0);
    stream
        .read_exact(&mut pdu[16..])
        .await
        .expect("read body");
    pdu
}

async fn read_parsed_pdu(stream: &mut TcpStream) -> Pdu {
    let bytes = read_wire_pdu(stream).await;
    Pdu::parse(&bytes, &wire_cfg()).expect("parse inbound PDU")
}

async fn write_wire_pdu(stream: &mut TcpStream, pdu: &mut Pdu) {
    let bytes = pdu.to_bytes(&wire_cfg()).expect("encode PDU");
    stream.write_all(&bytes).await.expect("write PDU");
}

/// Accepts one connection and answers the bind request.
async fn accept_and_bind(listener: &TcpListener, mode: BindMode) -> (TcpStream, Pdu) {
    let (mut stream, _addr) = listener.accept().await.expect("accept");
    let bind = read_parsed_pdu(&mut stream).await;
    let Pdu::BindRequest(ref request) = bind else {
        panic!("expected bind request, got {bind}");
    };
    let mut response = Pdu::BindResponse(BindResponse::new(mode, request.sequence_number, "smsc"));
    write_wire_pdu(&mut stream, &mut response).await;
    (stream, bind)
}

// ---- hook capture ------------------------------------------------------

#[derive(Debug)]
enum HookEvent {
    Received(Option<Pdu>),
    SendError { log_id: String, error: String },
}

struct ChannelHook {
    events: mpsc::UnboundedSender<HookEvent>,
}

impl ChannelHook {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<HookEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Arc::new(ChannelHook { events }), receiver)
    }
}

#[async_trait]
impl Hook for ChannelHook {
    async fn sending(&self, _pdu: &Pdu, _wire: &[u8], _client_id: &str) {}

    async fn received(&self, pdu: Option<&Pdu>, _wire: &[u8], _client_id: &str) {
        let _ = self.events.send(HookEvent::Received(pdu.cloned()));
    }

    async fn send_error(&self, message: &SubmitSm, error: &EsmeError, _client_id: &str) {
        let _ = self.events.send(HookEvent::SendError {
            log_id: message.log_id.clone(),
            error: error.to_string(),
        });
    }
}

/// Waits for a hook event satisfying `matcher`, skipping the others.
async fn await_event<F, T>(receiver: &mut mpsc::UnboundedReceiver<HookEvent>, mut matcher: F) -> T
where
    F: FnMut(HookEvent) -> Option<T>,
{
    timeout(Duration::from_secs(5), async {
        loop {
            let event = receiver.recv().await.expect("hook channel closed");
            if let Some(found) = matcher(event) {
                return found;
            }
        }
    })
    .await
    .expect("timed out waiting for hook event")
}

async fn wait_for_state(esme: &Esme, state: SessionState) {
    timeout(Duration::from_secs(2), async {
        while esme.session_state() != state {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session state not reached");
}

fn test_config(port: u16) -> EsmeConfig {
    EsmeConfig::new("127.0.0.1", port, "testuser", "password")
        .enquire_link_interval(Duration::from_secs(60))
        .socket_timeout(Duration::from_secs(2))
}

fn test_submit(text: &str) -> SubmitSm {
    let mut message = SubmitSm::new(
        text,
        PhoneNumber::alphanumeric("INFO").unwrap(),
        PhoneNumber::new("+123135654618", Default::default(), Default::default()).unwrap(),
    );
    message.log_id = "msg-1".into();
    message.extra_data = "order-442".into();
    message
}

// ---- scenarios ---------------------------------------------------------

#[tokio::test]
async fn bind_enquire_exchange_and_clean_unbind() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let config = test_config(port).enquire_link_interval(Duration::from_millis(150));
    let esme = Esme::new(config).unwrap();
    let runner = {
        let esme = esme.clone();
        tokio::spawn(async move { esme.start().await })
    };

    let (mut stream, bind) = accept_and_bind(&listener, BindMode::Transceiver).await;
    let Pdu::BindRequest(request) = bind else {
        unreachable!()
    };
    assert_eq!(request.mode, BindMode::Transceiver);
    assert_eq!(request.system_id, "testuser");
    assert_eq!(request.password, "password");
    assert_eq!(request.interface_version, SMPP_VERSION_3_4);

    // After the configured interval the client keeps the link alive.
    let ping = read_parsed_pdu(&mut stream).await;
    let Pdu::EnquireLink(ping) = ping else {
        panic!("expected enquire_link, got {ping}");
    };
    let mut pong = Pdu::EnquireLinkResp(crate::datatypes::EnquireLinkResp::new(
        ping.sequence_number,
    ));
    write_wire_pdu(&mut stream, &mut pong).await;

    assert_eq!(esme.session_state(), SessionState::BoundTrx);

    // Clean shutdown: unbind, unbind_resp, socket closed, no reconnect.
    let stopper = {
        let esme = esme.clone();
        tokio::spawn(async move { esme.stop().await })
    };
    let unbind = read_parsed_pdu(&mut stream).await;
    let Pdu::Unbind(unbind) = unbind else {
        panic!("expected unbind, got {unbind}");
    };
    let mut response = Pdu::UnbindResp(crate::datatypes::UnbindResp::new(unbind.sequence_number));
    write_wire_pdu(&mut stream, &mut response).await;
    assert_eq!(stream.read_u8().await.unwrap_err().kind(), std::io::ErrorKind::UnexpectedEof);
    drop(stream);

    stopper.await.unwrap();
    runner.await.unwrap();
    assert_eq!(esme.session_state(), SessionState::Closed);

    // The supervisor exited: nothing redials.
    assert!(
        timeout(Duration::from_millis(300), listener.accept())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn submit_wire_image_and_receipt_correlation() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (hook, mut events) = ChannelHook::new();
    let esme = Esme::builder(test_config(port)).hook(hook).build().unwrap();
    let runner = {
        let esme = esme.clone();
        tokio::spawn(async move { esme.start().await })
    };
    let (mut stream, _bind) = accept_and_bind(&listener, BindMode::Transceiver).await;

    esme.enqueue(test_submit("Test message")).await;

    // Byte-exact check of the submit_sm body.
    let wire = read_wire_pdu(&mut stream).await;
    assert_eq!(&wire[4..8], &0x0000_0004u32.to_be_bytes());
    assert_eq!(&wire[8..12], &0u32.to_be_bytes());
    let sequence = u32::from_be_bytes(wire[12..16].try_into().unwrap());

    let mut body = vec![0x00]; // service_type ""
    body.extend([0x05, 0x00]); // alphanumeric / unknown
    body.extend(b"INFO\0");
    body.extend([0x00, 0x00]); // unknown / unknown
    body.extend(b"+123135654618\0");
    body.extend([0x00, 0x00, 0x00]); // esm_class, protocol_id, priority_flag
    body.extend([0x00, 0x00]); // schedule, validity: immediate
    body.extend([0x01, 0x00]); // registered_delivery, replace_if_present
    body.extend([0x00, 0x00]); // data_coding SMSC default, sm_default_msg_id
    body.push(12);
    body.extend(b"Test message");
    assert_eq!(&wire[16..], &body[..]);

    // The response resolves to the application with tracking metadata, and
    // the message id is remembered for the receipt.
    let mut response = Pdu::SubmitSmResp(SubmitSmResp::new(sequence, "FE456A00"));
    write_wire_pdu(&mut stream, &mut response).await;
    let resp = await_event(&mut events, |event| match event {
        HookEvent::Received(Some(Pdu::SubmitSmResp(resp))) => Some(resp),
        _ => None,
    })
    .await;
    assert_eq!(resp.message_id, "FE456A00");
    assert_eq!(resp.log_id, "msg-1");
    assert_eq!(resp.extra_data, "order-442");

    // Delivery receipt for that message id arrives later.
    let mut receipt = Pdu::DeliverSm(Box::new(DeliverSm {
        sequence_number: 77,
        esm_class: 0b0000_0100,
        short_message: "id:FE456A00 sub:001 dlvrd:001 submit date:2410111456 \
                        done date:2410111456 stat:DELIVRD err:000 Text:Test message        "
            .into(),
        source: PhoneNumber::new("+123135654618", Ton::International, Default::default()).unwrap(),
        destination: PhoneNumber::alphanumeric("INFO").unwrap(),
        ..DeliverSm::default()
    }));
    write_wire_pdu(&mut stream, &mut receipt).await;

    let delivered = await_event(&mut events, |event| match event {
        HookEvent::Received(Some(Pdu::DeliverSm(deliver))) => Some(deliver),
        _ => None,
    })
    .await;
    assert!(delivered.is_receipt());
    assert_eq!(delivered.log_id, "msg-1");
    assert_eq!(delivered.extra_data, "order-442");
    let parsed_receipt = delivered.receipt().unwrap();
    assert_eq!(parsed_receipt.message_id.as_deref(), Some("FE456A00"));
    assert!(parsed_receipt.is_delivered());

    // The client acknowledged the receipt with the same sequence number.
    let ack = read_parsed_pdu(&mut stream).await;
    let Pdu::DeliverSmResp(ack) = ack else {
        panic!("expected deliver_sm_resp, got {ack}");
    };
    assert_eq!(ack.sequence_number, 77);
    assert_eq!(ack.command_status, CommandStatus::Ok);

    esme.stop().await;
    runner.await.unwrap();
}

#[tokio::test]
async fn long_gsm_text_goes_out_as_two_segments() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let esme = Esme::new(test_config(port)).unwrap();
    let runner = {
        let esme = esme.clone();
        tokio::spawn(async move { esme.start().await })
    };
    let (mut stream, _bind) = accept_and_bind(&listener, BindMode::Transceiver).await;

    let mut message = test_submit(&"a".repeat(300));
    message.auto_message_payload = false;
    esme.enqueue(message).await;

    let mut reference = None;
    for (index, expected_text_len) in [(1u8, 153usize), (2, 147)] {
        let wire = read_wire_pdu(&mut stream).await;
        // sm_length covers the 6-byte UDH plus the text.
        let sm_length_index = wire.len() - expected_text_len - 6 - 1;
        assert_eq!(wire[sm_length_index] as usize, expected_text_len + 6);
        // UDH: 05 00 03 <ref> <total> <seq>
        let udh = &wire[sm_length_index + 1..sm_length_index + 7];
        assert_eq!(&udh[0..3], &[0x05, 0x00, 0x03]);
        assert_eq!(udh[4], 2);
        assert_eq!(udh[5], index);
        match reference {
            None => reference = Some(udh[3]),
            Some(reference) => assert_eq!(udh[3], reference, "segments share the reference"),
        }

        let parsed = Pdu::parse(&wire, &wire_cfg()).unwrap();
        let Pdu::SubmitSm(part) = parsed else {
            panic!("expected submit_sm");
        };
        assert_eq!(part.short_message.len(), expected_text_len);
        let concat = part.concat.unwrap();
        assert_eq!(concat.total, 2);
        assert_eq!(concat.seq, index);

        let mut response = Pdu::SubmitSmResp(SubmitSmResp::new(
            part.sequence_number,
            format!("SEG{index}"),
        ));
        write_wire_pdu(&mut stream, &mut response).await;
    }

    esme.stop().await;
    runner.await.unwrap();
}

#[tokio::test]
async fn inbound_segments_are_assembled_before_the_hook_fires() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (hook, mut events) = ChannelHook::new();
    let esme = Esme::builder(test_config(port)).hook(hook).build().unwrap();
    let runner = {
        let esme = esme.clone();
        tokio::spawn(async move { esme.start().await })
    };
    let (mut stream, _bind) = accept_and_bind(&listener, BindMode::Transceiver).await;

    for (seq, text) in [(1u8, "jako "), (2, "duga "), (3, "poruka")] {
        let mut part = Pdu::DeliverSm(Box::new(DeliverSm {
            sequence_number: 40 + seq as u32,
            short_message: text.into(),
            concat: Some(crate::encoding::ConcatInfo {
                ref_num: 0x35,
                total: 3,
                seq,
                wide_ref: false,
            }),
            source: PhoneNumber::new("+385991234567", Default::default(), Default::default())
                .unwrap(),
            destination: PhoneNumber::alphanumeric("INFO").unwrap(),
            ..DeliverSm::default()
        }));
        write_wire_pdu(&mut stream, &mut part).await;
        // Every part is acknowledged individually.
        let ack = read_parsed_pdu(&mut stream).await;
        assert!(matches!(ack, Pdu::DeliverSmResp(_)));
    }

    let assembled = await_event(&mut events, |event| match event {
        HookEvent::Received(Some(Pdu::DeliverSm(deliver))) => Some(deliver),
        _ => None,
    })
    .await;
    assert_eq!(assembled.short_message, "jako duga poruka");
    assert!(assembled.concat.is_none());

    esme.stop().await;
    runner.await.unwrap();
}

/// Records every admission decision so throttle behaviour can be asserted
/// without racing the sender loop.
struct SpyThrottle {
    inner: WindowedThrottle,
    decisions: std::sync::Mutex<Vec<(Instant, bool)>>,
}

#[async_trait]
impl ThrottleHandler for SpyThrottle {
    async fn throttled(&self) {
        self.inner.throttled().await;
    }

    async fn not_throttled(&self) {
        self.inner.not_throttled().await;
    }

    async fn allow_request(&self) -> bool {
        let allowed = self.inner.allow_request().await;
        self.decisions
            .lock()
            .unwrap()
            .push((Instant::now(), allowed));
        allowed
    }

    async fn throttle_delay(&self) -> Duration {
        self.inner.throttle_delay().await
    }
}

#[tokio::test]
async fn sustained_throttling_responses_pause_the_sender() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let throttle_wait = Duration::from_millis(200);
    let throttle = Arc::new(SpyThrottle {
        inner: WindowedThrottle::new(Duration::from_secs(180), 2, 1.0, throttle_wait),
        decisions: std::sync::Mutex::new(Vec::new()),
    });
    let (hook, mut events) = ChannelHook::new();
    let esme = Esme::builder(test_config(port))
        .hook(hook)
        .throttle_handler(Arc::clone(&throttle) as Arc<dyn ThrottleHandler>)
        .build()
        .unwrap();
    let runner = {
        let esme = esme.clone();
        tokio::spawn(async move { esme.start().await })
    };
    let (mut stream, _bind) = accept_and_bind(&listener, BindMode::Transceiver).await;

    // Two submissions, both answered ESME_RTHROTTLED: the sample is full and
    // 100% throttled.
    for _ in 0..2 {
        esme.enqueue(test_submit("Test message")).await;
        let submit = read_parsed_pdu(&mut stream).await;
        let mut response = Pdu::SubmitSmResp(SubmitSmResp::error(
            submit.sequence_number(),
            CommandStatus::Throttled,
        ));
        write_wire_pdu(&mut stream, &mut response).await;
        await_event(&mut events, |event| match event {
            HookEvent::Received(Some(Pdu::SubmitSmResp(resp))) => Some(resp),
            _ => None,
        })
        .await;
    }

    // The sender already passed admission before parking on the queue, so
    // one more message slips out; after it the handler denies.
    esme.enqueue(test_submit("slips through")).await;
    let submit = read_parsed_pdu(&mut stream).await;
    let mut response = Pdu::SubmitSmResp(SubmitSmResp::error(
        submit.sequence_number(),
        CommandStatus::Throttled,
    ));
    write_wire_pdu(&mut stream, &mut response).await;

    esme.enqueue(test_submit("held back")).await;
    // The held-back message must not reach the wire while denied.
    let mut probe = [0u8; 1];
    let arrived = timeout(Duration::from_millis(500), stream.read_exact(&mut probe)).await;
    assert!(arrived.is_err(), "throttled sender still transmitted");

    // The sender re-asks on the throttle_wait cadence.
    let decisions = throttle.decisions.lock().unwrap().clone();
    let denials: Vec<&(Instant, bool)> =
        decisions.iter().filter(|(_, allowed)| !allowed).collect();
    assert!(denials.len() >= 2, "expected repeated denials");
    let gap = denials[1].0.duration_since(denials[0].0);
    assert!(
        gap >= throttle_wait - Duration::from_millis(20),
        "re-ask gap {gap:?} shorter than throttle_wait"
    );

    esme.stop().await;
    runner.await.unwrap();
}

#[tokio::test]
async fn dead_link_triggers_backoff_and_reconnect() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let config = test_config(port)
        .enquire_link_interval(Duration::from_millis(100))
        .socket_timeout(Duration::from_millis(300));
    let esme = Esme::builder(config)
        .retry_timer(Arc::new(ExponentialBackoff::new(
            Duration::from_millis(100),
            5,
        )))
        .build()
        .unwrap();
    let runner = {
        let esme = esme.clone();
        tokio::spawn(async move { esme.start().await })
    };

    // Connection 1 binds, then goes silent: the keeper's enquire_link runs
    // into socket_timeout and the session is torn down.
    let (mut stream, _bind) = accept_and_bind(&listener, BindMode::Transceiver).await;
    let ping = read_parsed_pdu(&mut stream).await;
    assert!(matches!(ping, Pdu::EnquireLink(_)));
    // no response on purpose

    // Reconnect attempts 2 and 3 are refused at bind; the delays between
    // successive attempts double.
    let mut attempt_times = Vec::new();
    for _ in 0..2 {
        let (mut stream, _addr) = listener.accept().await.expect("reconnect");
        attempt_times.push(Instant::now());
        let bind = read_parsed_pdu(&mut stream).await;
        let mut refusal = Pdu::BindResponse(BindResponse {
            command: BindMode::Transceiver.response_id(),
            command_status: CommandStatus::BindFailed,
            sequence_number: bind.sequence_number(),
            system_id: String::new(),
            sc_interface_version: None,
        });
        write_wire_pdu(&mut stream, &mut refusal).await;
    }

    // Attempt 4 lands after a doubled delay and binds successfully.
    let (stream, _bind) = accept_and_bind(&listener, BindMode::Transceiver).await;
    attempt_times.push(Instant::now());

    let first_gap = attempt_times[1].duration_since(attempt_times[0]);
    let second_gap = attempt_times[2].duration_since(attempt_times[1]);
    assert!(
        first_gap >= Duration::from_millis(90),
        "first backoff gap {first_gap:?} too short"
    );
    assert!(
        second_gap >= Duration::from_millis(190),
        "second backoff gap {second_gap:?} too short"
    );

    wait_for_state(&esme, SessionState::BoundTrx).await;
    drop(stream);
    esme.stop().await;
    runner.await.unwrap();
}

#[tokio::test]
async fn smsc_initiated_unbind_forces_a_reconnect() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let esme = Esme::builder(test_config(port))
        .retry_timer(Arc::new(ExponentialBackoff::new(
            Duration::from_millis(50),
            2,
        )))
        .build()
        .unwrap();
    let runner = {
        let esme = esme.clone();
        tokio::spawn(async move { esme.start().await })
    };

    let (mut stream, _bind) = accept_and_bind(&listener, BindMode::Transceiver).await;
    let mut unbind = Pdu::Unbind(crate::datatypes::Unbind::new(91));
    write_wire_pdu(&mut stream, &mut unbind).await;
    let ack = read_parsed_pdu(&mut stream).await;
    let Pdu::UnbindResp(ack) = ack else {
        panic!("expected unbind_resp, got {ack}");
    };
    assert_eq!(ack.sequence_number, 91);
    drop(stream);

    // The session re-binds on a fresh connection.
    let (mut stream2, bind2) = accept_and_bind(&listener, BindMode::Transceiver).await;
    assert!(matches!(bind2, Pdu::BindRequest(_)));
    wait_for_state(&esme, SessionState::BoundTrx).await;

    let stopper = {
        let esme = esme.clone();
        tokio::spawn(async move { esme.stop().await })
    };
    let unbind2 = read_parsed_pdu(&mut stream2).await;
    assert!(matches!(unbind2, Pdu::Unbind(_)));
    drop(stream2);

    stopper.await.unwrap();
    runner.await.unwrap();
}

#[tokio::test]
async fn receiver_mode_discards_queued_messages() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let broker = Arc::new(MemoryBroker::default());
    let config = test_config(port).bind_mode(BindMode::Receiver);
    let esme = Esme::builder(config)
        .broker(Arc::clone(&broker) as Arc<dyn crate::broker::Broker>)
        .build()
        .unwrap();
    let runner = {
        let esme = esme.clone();
        tokio::spawn(async move { esme.start().await })
    };

    let (mut stream, bind) = accept_and_bind(&listener, BindMode::Receiver).await;
    let Pdu::BindRequest(request) = bind else {
        unreachable!()
    };
    assert_eq!(request.mode, BindMode::Receiver);
    wait_for_state(&esme, SessionState::BoundRx).await;

    esme.enqueue(test_submit("should be discarded")).await;
    let mut probe = [0u8; 1];
    assert!(
        timeout(Duration::from_millis(300), stream.read_exact(&mut probe))
            .await
            .is_err(),
        "receiver-mode session transmitted a submit"
    );

    esme.stop().await;
    runner.await.unwrap();
}

#[tokio::test]
async fn unparseable_request_gets_a_generic_nack() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let esme = Esme::new(test_config(port)).unwrap();
    let runner = {
        let esme = esme.clone();
        tokio::spawn(async move { esme.start().await })
    };
    let (mut stream, _bind) = accept_and_bind(&listener, BindMode::Transceiver).await;

    // query_sm is outside the supported command set.
    let mut bogus = Vec::new();
    bogus.extend(16u32.to_be_bytes());
    bogus.extend(0x0000_0003u32.to_be_bytes());
    bogus.extend(0u32.to_be_bytes());
    bogus.extend(55u32.to_be_bytes());
    stream.write_all(&bogus).await.unwrap();

    let nack = read_parsed_pdu(&mut stream).await;
    let Pdu::GenericNack(nack) = nack else {
        panic!("expected generic_nack, got {nack}");
    };
    assert_eq!(nack.sequence_number, 55);
    assert_eq!(nack.command_status, CommandStatus::InvalidCommandId);

    // The session survives the bad PDU.
    assert_eq!(esme.session_state(), SessionState::BoundTrx);

    esme.stop().await;
    runner.await.unwrap();
}

#[tokio::test]
async fn validation_failure_reaches_send_error_and_loop_continues() {
    init_logging();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (hook, mut events) = ChannelHook::new();
    let esme = Esme::builder(test_config(port)).hook(hook).build().unwrap();
    let runner = {
        let esme = esme.clone();
        tokio::spawn(async move { esme.start().await })
    };
    let (mut stream, _bind) = accept_and_bind(&listener, BindMode::Transceiver).await;

    // short_message and message_payload are mutually exclusive; setting
    // both must fail validation before anything reaches the wire.
    let mut broken = test_submit("short text");
    broken.log_id = "broken".into();
    broken.message_payload = "also set".into();
    esme.enqueue(broken).await;

    let failure = await_event(&mut events, |event| match event {
        HookEvent::SendError { log_id, error } => Some((log_id, error)),
        _ => None,
    })
    .await;
    assert_eq!(failure.0, "broken");

    // The sender keeps going: a well-formed message still goes out.
    esme.enqueue(test_submit("still alive")).await;
    let submit = read_parsed_pdu(&mut stream).await;
    let Pdu::SubmitSm(submit) = submit else {
        panic!("expected submit_sm");
    };
    assert_eq!(submit.short_message, "still alive");

    esme.stop().await;
    runner.await.unwrap();
}
