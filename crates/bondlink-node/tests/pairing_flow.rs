// ============================================
// File: crates/bondlink-node/tests/pairing_flow.rs
// ============================================
//! End-to-end tests: two connections over an in-memory link.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use bondlink_common::DeviceId;
use bondlink_core::protocol::FrameCodec;
use bondlink_core::{FailureKind, Footer, MessageType, OperatingMode, TransactionStatus};
use bondlink_node::{
    ChannelEventHandler, Connection, InboundMessage, LinkEvent, NodeConfig, NodeError,
    TicketEvent,
};
use bondlink_transport::{LinkTransport, MockLink};

const CLIENT_ID: u64 = 0x1;
const SERVER_ID: u64 = 0x2;
const WAIT: Duration = Duration::from_secs(2);

struct Node {
    conn: Connection,
    link: Arc<MockLink>,
    events: UnboundedReceiver<LinkEvent>,
    tickets: UnboundedReceiver<TicketEvent>,
}

fn client_config() -> NodeConfig {
    let mut config = NodeConfig::default();
    config.node.mode = OperatingMode::Client;
    config.node.device_id = CLIENT_ID;
    config.node.peer_device_id = Some(SERVER_ID);
    config.pipeline.receive_timeout_ms = 20;
    config
}

fn server_config() -> NodeConfig {
    client_config().mirrored()
}

fn start(config: &NodeConfig, link: MockLink) -> Node {
    let link = Arc::new(link);
    let (handler, events, tickets) = ChannelEventHandler::new();
    let transport = Arc::clone(&link) as Arc<dyn LinkTransport>;
    let conn = Connection::start(config, transport, Arc::new(handler)).unwrap();
    Node {
        conn,
        link,
        events,
        tickets,
    }
}

async fn paired_nodes(client: NodeConfig, server: NodeConfig) -> (Node, Node) {
    let (client_link, server_link) = MockLink::pair(
        "02:00:00:00:00:01".parse().unwrap(),
        "02:00:00:00:00:02".parse().unwrap(),
    );
    let a = start(&client, client_link);
    let b = start(&server, server_link);

    a.conn.pair().await.unwrap();
    a.conn.wait_paired(WAIT).await.unwrap();
    b.conn.wait_paired(WAIT).await.unwrap();
    (a, b)
}

/// Waits for the first event matching `pred`, skipping others.
async fn expect_event<F>(events: &mut UnboundedReceiver<LinkEvent>, pred: F) -> LinkEvent
where
    F: Fn(&LinkEvent) -> bool,
{
    tokio::time::timeout(WAIT, async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("expected event did not arrive")
}

async fn expect_message(
    events: &mut UnboundedReceiver<LinkEvent>,
    message_type: MessageType,
) -> InboundMessage {
    match expect_event(events, |e| {
        matches!(e, LinkEvent::Message(m) if m.message_type == message_type)
    })
    .await
    {
        LinkEvent::Message(m) => m,
        _ => unreachable!(),
    }
}

async fn expect_failure(events: &mut UnboundedReceiver<LinkEvent>, kind: FailureKind) -> String {
    match expect_event(events, |e| matches!(e, LinkEvent::Failure { kind: k, .. } if *k == kind))
        .await
    {
        LinkEvent::Failure { detail, .. } => detail,
        _ => unreachable!(),
    }
}

async fn wait_unpaired(conn: &Connection) {
    for _ in 0..200 {
        if !conn.pairing_status().await.is_mutual() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("pairing was not dropped");
}

#[tokio::test]
async fn test_pair_send_and_replay() {
    let (a, mut b) = paired_nodes(client_config(), server_config()).await;
    assert_eq!(a.conn.remote_device().await, Some(DeviceId::from(SERVER_ID)));
    assert_eq!(b.conn.remote_device().await, Some(DeviceId::from(CLIENT_ID)));
    expect_event(&mut b.events, |e| matches!(e, LinkEvent::Paired { .. })).await;

    let seq = a.conn.send_data(b"hello").await.unwrap();
    assert_eq!(seq, 1);

    let message = expect_message(&mut b.events, MessageType::Data).await;
    assert_eq!(message.sequence, 1);
    assert_eq!(message.payload, b"hello");
    assert_eq!(message.device_id, DeviceId::from(CLIENT_ID));
    assert_eq!(message.address, Some(a.link.local_address()));

    let data = a.link.take_sent().pop().unwrap();
    assert_eq!(data[8], 0x10);
    b.link.inject(data, a.link.local_address()).unwrap();

    expect_failure(&mut b.events, FailureKind::SequenceError).await;
    assert_eq!(b.conn.stats().failure_count(FailureKind::SequenceError), 1);
    assert!(b.conn.pairing_status().await.is_mutual());

    a.conn.shutdown().await.unwrap();
    b.conn.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_transaction_flow() {
    let (mut a, mut b) = paired_nodes(client_config(), server_config()).await;

    a.conn.start_transaction(b"begin").await.unwrap();
    a.conn
        .send_transaction_data(b"chunk", &Footer::last(0, 5))
        .await
        .unwrap();
    a.conn.stop_transaction().await.unwrap();

    expect_message(&mut b.events, MessageType::TransactionStart).await;
    let chunk = expect_message(&mut b.events, MessageType::TransactionData).await;
    assert_eq!(chunk.payload, b"chunk");
    assert_eq!(chunk.footer, Some(Footer::last(0, 5)));
    expect_message(&mut b.events, MessageType::TransactionStop).await;
    expect_message(&mut a.events, MessageType::TransactionStopAck).await;

    assert_eq!(a.conn.transaction_status().await, TransactionStatus::Stopped);
    assert_eq!(b.conn.transaction_status().await, TransactionStatus::Stopped);
}

#[tokio::test]
async fn test_ticket_delivery() {
    let (mut a, b) = paired_nodes(client_config(), server_config()).await;

    b.conn.send_ticket(b"tkt-123").await.unwrap();

    let ticket = tokio::time::timeout(WAIT, a.tickets.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ticket.message_type, MessageType::Ticket);
    assert_eq!(ticket.ticket, b"tkt-123");
    assert_eq!(ticket.device_id, DeviceId::from(SERVER_ID));
    assert_eq!(a.conn.ticket().await, Some(b"tkt-123".to_vec()));
}

#[tokio::test]
async fn test_status_check_round_trip() {
    let mut client = client_config();
    client.pipeline.enqueue.push("status_check_response".into());
    let (mut a, _b) = paired_nodes(client, server_config()).await;

    a.conn.status_check().await.unwrap();
    let response = expect_message(&mut a.events, MessageType::StatusCheckResponse).await;
    assert_eq!(response.payload.len(), 32);
    assert_eq!(a.conn.stats().failure_count(FailureKind::StatusCheckError), 0);
}

#[tokio::test]
async fn test_status_check_without_answer() {
    let mut client = client_config();
    client.timeouts.status_check_ms = 100;
    let mut server = server_config();
    server.node.status_check = false;
    let (mut a, mut b) = paired_nodes(client, server).await;

    a.conn.status_check().await.unwrap();

    expect_failure(&mut b.events, FailureKind::StatusCheckError).await;
    let detail = expect_failure(&mut a.events, FailureKind::StatusCheckError).await;
    assert!(detail.contains("no response"));

    // The refusing side cannot start one either.
    let err = b.conn.status_check().await.unwrap_err();
    assert!(matches!(err, NodeError::Core(_)));
}

#[tokio::test]
async fn test_transaction_timeout_reported_once() {
    let mut client = client_config();
    client.timeouts.transaction_ms = 100;
    let (mut a, _b) = paired_nodes(client, server_config()).await;

    a.conn.start_transaction(b"begin").await.unwrap();
    expect_failure(&mut a.events, FailureKind::TimeoutError).await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(a.conn.stats().failure_count(FailureKind::TimeoutError), 1);
    assert_eq!(a.conn.transaction_status().await, TransactionStatus::Stopped);
}

#[tokio::test]
async fn test_tampered_frame_forces_re_pairing() {
    let (mut a, mut b) = paired_nodes(client_config(), server_config()).await;

    a.conn.send_data(b"one").await.unwrap();
    expect_message(&mut b.events, MessageType::Data).await;

    // Raise the sequence number by one bit: ordering passes, the tag does not.
    let mut forged = a.link.take_sent().pop().unwrap().to_vec();
    forged[14] ^= 0x01;
    b.link.inject(forged, a.link.local_address()).unwrap();
    expect_failure(&mut b.events, FailureKind::AuthenticationError).await;
    wait_unpaired(&b.conn).await;

    // The reverted side can only complain with plain reports, which the
    // peer counts until the pairing error threshold.
    for body in ["two", "three", "four"] {
        assert!(a.conn.pairing_status().await.is_mutual());
        a.conn.send_data(body.as_bytes()).await.unwrap();
        expect_failure(&mut b.events, FailureKind::PairingError).await;
        expect_failure(&mut a.events, FailureKind::PairingError).await;
    }
    wait_unpaired(&a.conn).await;
    assert!(a.conn.send_data(b"refused").await.unwrap_err().requires_pairing());

    a.conn.pair().await.unwrap();
    a.conn.wait_paired(WAIT).await.unwrap();
    b.conn.wait_paired(WAIT).await.unwrap();

    let seq = a.conn.send_data(b"five").await.unwrap();
    let message = expect_message(&mut b.events, MessageType::Data).await;
    assert_eq!(message.payload, b"five");
    assert_eq!(message.sequence, seq);
    assert!(seq > 4);
}

#[tokio::test]
async fn test_reported_error_drops_peer_pairing() {
    let (a, b) = paired_nodes(client_config(), server_config()).await;

    a.conn.report_error(FailureKind::HandlingError).await.unwrap();
    wait_unpaired(&b.conn).await;

    // The reporter keeps its own key until told otherwise.
    assert!(a.conn.pairing_status().await.is_mutual());
    let frame = a.link.take_sent().pop().unwrap();
    assert_eq!(frame[8], 0x7F);
    assert_eq!(&frame[11..15], &[0, 0, 0, 0]);
}

#[tokio::test]
async fn test_forged_error_report_keeps_pairing() {
    let (a, mut b) = paired_nodes(client_config(), server_config()).await;

    let forged = FrameCodec::encode(
        DeviceId::from(CLIENT_ID),
        MessageType::Error,
        0,
        &[FailureKind::HandlingError.code()],
        None,
        None,
    )
    .unwrap();
    b.link.inject(forged, a.link.local_address()).unwrap();
    expect_failure(&mut b.events, FailureKind::PairingError).await;
    assert!(b.conn.pairing_status().await.is_mutual());

    a.conn.send_data(b"after").await.unwrap();
    assert_eq!(expect_message(&mut b.events, MessageType::Data).await.payload, b"after");
}

#[tokio::test]
async fn test_truncated_frame_resynchronizes() {
    let (a, mut b) = paired_nodes(client_config(), server_config()).await;

    a.conn.send_data(b"hello").await.unwrap();
    expect_message(&mut b.events, MessageType::Data).await;
    let frame = a.link.take_sent().pop().unwrap();

    // Both halves are queued before the receiver runs again.
    let (head, tail) = frame.split_at(20);
    b.link.inject(head.to_vec(), a.link.local_address()).unwrap();
    b.link.inject(tail.to_vec(), a.link.local_address()).unwrap();

    expect_failure(&mut b.events, FailureKind::LengthError).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(b.link.skipped_bytes(), tail.len());
    assert_eq!(b.conn.stats().failure_count(FailureKind::LengthError), 1);
    assert_eq!(b.conn.stats().total_failures(), 1);
}

#[tokio::test]
async fn test_shutdown_zeroes_state() {
    let (a, b) = paired_nodes(client_config(), server_config()).await;

    a.conn.shutdown().await.unwrap();
    assert!(!a.conn.pairing_status().await.is_mutual());
    assert!(matches!(
        a.conn.send_data(b"late").await,
        Err(NodeError::ShutDown)
    ));
    a.conn.shutdown().await.unwrap();

    let stats = a.conn.stats();
    assert!(stats.frames_tx >= 2);
    assert!(stats.frames_rx >= 2);
    b.conn.shutdown().await.unwrap();
}
