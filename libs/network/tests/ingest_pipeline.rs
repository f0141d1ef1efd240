//! # TCP Ingest Pipeline Tests
//!
//! Real loopback sockets against an in-memory gateway:
//! - Reference frame produces the exact ack bytes and both records
//! - Short and out-of-range frames are audited but never acked
//! - Concurrent connections each receive only their own acks
//! - Persistence failures do not stall or close a connection
//! - Connection cap and bind failures

use futures::future::join_all;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracker_codec::{acked_packet_id, AckFrame, FramingMode, ACK_FRAME_LEN};
use tracker_config::ListenerConfig;
use tracker_network::{
    FrameProcessor, HandlerConfig, IngestMetrics, NetworkError, NetworkResult, TcpIngestListener,
};
use tracker_storage::test_utils::MemoryGateway;

const WAIT: Duration = Duration::from_secs(2);

struct TestServer {
    address: SocketAddr,
    gateway: Arc<MemoryGateway>,
    metrics: Arc<IngestMetrics>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<NetworkResult<()>>,
}

impl TestServer {
    async fn start(config: HandlerConfig, max_connections: Option<usize>) -> Self {
        let gateway = Arc::new(MemoryGateway::new());
        let metrics = Arc::new(IngestMetrics::new());
        let processor = FrameProcessor::new(gateway.clone(), metrics.clone());

        let listener = TcpIngestListener::bind(
            "127.0.0.1:0".parse().unwrap(),
            processor,
            config,
            max_connections,
        )
        .await
        .unwrap();
        let address = listener.local_addr().unwrap();

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(listener.run_until(async {
            let _ = rx.await;
        }));

        Self {
            address,
            gateway,
            metrics,
            shutdown: Some(tx),
            task,
        }
    }

    async fn default() -> Self {
        Self::start(HandlerConfig::default(), None).await
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task.await.unwrap().unwrap();
    }
}

fn telemetry_frame(packet_id: u16, lat: i32, lon: i32) -> Vec<u8> {
    let mut frame = vec![0x01, 0x00, 0x14, 0x00];
    frame.extend_from_slice(&packet_id.to_le_bytes());
    frame.extend_from_slice(&lat.to_le_bytes());
    frame.extend_from_slice(&lon.to_le_bytes());
    frame.extend_from_slice(&60u16.to_le_bytes());
    frame.extend_from_slice(&180u16.to_le_bytes());
    frame.extend_from_slice(&150u16.to_le_bytes());
    frame
}

async fn read_ack(stream: &mut TcpStream) -> AckFrame {
    let mut ack = [0u8; ACK_FRAME_LEN];
    tokio::time::timeout(WAIT, stream.read_exact(&mut ack))
        .await
        .expect("ack not received in time")
        .unwrap();
    ack
}

/// Asserts nothing arrives before the peer closes its side
async fn assert_no_ack(stream: &mut TcpStream) {
    let mut buf = [0u8; 1];
    let read = tokio::time::timeout(Duration::from_millis(150), stream.read(&mut buf)).await;
    assert!(read.is_err(), "unexpected data from server");
}

#[tokio::test]
async fn test_reference_frame_is_acked_and_persisted() {
    let server = TestServer::default().await;
    let mut stream = TcpStream::connect(server.address).await.unwrap();

    let mut frame = [0u8; 20];
    frame[4] = 0x2A;
    frame[6..10].copy_from_slice(&[0x40, 0x54, 0x87, 0x00]);
    stream.write_all(&frame).await.unwrap();

    let ack = read_ack(&mut stream).await;
    assert_eq!(ack, [0x01, 0x00, 0x0B, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    assert!(server.gateway.wait_for_raw(1, WAIT).await);

    let telemetry = server.gateway.telemetry_records();
    assert_eq!(telemetry.len(), 1);
    assert_eq!(telemetry[0].packet_id, 42);
    assert!((telemetry[0].latitude - 8.868928).abs() < 1e-9);
    assert_eq!(telemetry[0].longitude, 0.0);

    let raw = server.gateway.raw_records();
    assert_eq!(raw[0].raw_hex, "00000000".to_string() + "2a00" + "40548700" + &"0".repeat(20));
    assert_eq!(raw[0].raw_text, "123");

    server.stop().await;
}

#[tokio::test]
async fn test_short_frame_gets_raw_row_and_no_ack() {
    let server = TestServer::default().await;
    let mut stream = TcpStream::connect(server.address).await.unwrap();

    stream
        .write_all(&[0x01, 0x00, 0x0A, 0x00, 0x10, 0x27, 0x00, 0x00, 0x00, 0x00])
        .await
        .unwrap();

    assert_no_ack(&mut stream).await;
    assert!(server.gateway.wait_for_raw(1, WAIT).await);

    let raw = server.gateway.raw_records();
    assert_eq!(raw[0].raw_hex, "01000a00102700000000");
    assert_eq!(raw[0].packet_id, 10_000);
    assert_eq!(server.gateway.telemetry_count(), 0);

    // Connection survives the rejected frame
    stream.write_all(&telemetry_frame(11, 0, 0)).await.unwrap();
    assert_eq!(acked_packet_id(&read_ack(&mut stream).await), 11);

    server.stop().await;
}

#[tokio::test]
async fn test_out_of_range_frame_is_audited_only() {
    let server = TestServer::default().await;
    let mut stream = TcpStream::connect(server.address).await.unwrap();

    stream
        .write_all(&telemetry_frame(500, 91_000_000, 10_000_000))
        .await
        .unwrap();

    assert_no_ack(&mut stream).await;
    assert!(server.gateway.wait_for_raw(1, WAIT).await);
    assert_eq!(server.gateway.telemetry_count(), 0);
    assert_eq!(server.metrics.snapshot().decode_failures, 1);

    server.stop().await;
}

#[tokio::test]
async fn test_concurrent_connections_receive_their_own_acks() {
    let server = TestServer::default().await;
    let address = server.address;

    let clients = (0..8u16).map(|client| async move {
        let mut stream = TcpStream::connect(address).await.unwrap();
        let mut acked = Vec::new();
        for seq in 0..5u16 {
            let packet_id = client * 100 + seq;
            stream
                .write_all(&telemetry_frame(packet_id, 55_000_000, 37_000_000))
                .await
                .unwrap();
            acked.push(acked_packet_id(&read_ack(&mut stream).await));
        }
        (client, acked)
    });

    for (client, acked) in join_all(clients).await {
        let expected: Vec<u16> = (0..5).map(|seq| client * 100 + seq).collect();
        assert_eq!(acked, expected);
    }

    assert!(server.gateway.wait_for_raw(40, WAIT).await);
    assert_eq!(server.gateway.telemetry_count(), 40);
    assert_eq!(server.metrics.snapshot().connections_accepted, 8);

    server.stop().await;
}

#[tokio::test]
async fn test_telemetry_failure_still_acks_and_next_frame_is_processed() {
    let server = TestServer::default().await;
    server.gateway.fail_next_telemetry();
    let mut stream = TcpStream::connect(server.address).await.unwrap();

    stream.write_all(&telemetry_frame(1, 0, 0)).await.unwrap();
    assert_eq!(acked_packet_id(&read_ack(&mut stream).await), 1);

    stream.write_all(&telemetry_frame(2, 0, 0)).await.unwrap();
    assert_eq!(acked_packet_id(&read_ack(&mut stream).await), 2);

    assert!(server.gateway.wait_for_raw(2, WAIT).await);
    let stored: Vec<u16> = server
        .gateway
        .telemetry_records()
        .iter()
        .map(|r| r.packet_id)
        .collect();
    assert_eq!(stored, vec![2]);
    assert_eq!(server.metrics.snapshot().telemetry_write_failures, 1);

    server.stop().await;
}

#[tokio::test]
async fn test_raw_write_failure_still_acks_and_stores_telemetry() {
    let server = TestServer::default().await;
    server.gateway.fail_raw_writes(true);
    let mut stream = TcpStream::connect(server.address).await.unwrap();

    stream.write_all(&telemetry_frame(31, 59_934_280, 30_335_099)).await.unwrap();
    assert_eq!(acked_packet_id(&read_ack(&mut stream).await), 31);

    stream.write_all(&telemetry_frame(32, 59_934_281, 30_335_100)).await.unwrap();
    assert_eq!(acked_packet_id(&read_ack(&mut stream).await), 32);

    let stored: Vec<u16> = server
        .gateway
        .telemetry_records()
        .iter()
        .map(|r| r.packet_id)
        .collect();
    assert_eq!(stored, vec![31, 32]);
    assert_eq!(server.gateway.raw_count(), 0);
    assert_eq!(server.metrics.snapshot().raw_write_failures, 2);
    assert_eq!(server.metrics.snapshot().telemetry_write_failures, 0);

    server.stop().await;
}

#[tokio::test]
async fn test_length_prefixed_stream_split_across_writes() {
    let config = HandlerConfig {
        framing: FramingMode::LengthPrefixed,
        ..HandlerConfig::default()
    };
    let server = TestServer::start(config, None).await;
    let mut stream = TcpStream::connect(server.address).await.unwrap();
    stream.set_nodelay(true).unwrap();

    let mut bytes = telemetry_frame(7, 0, 0);
    bytes.extend_from_slice(&telemetry_frame(8, 0, 0));

    stream.write_all(&bytes[..13]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    stream.write_all(&bytes[13..]).await.unwrap();

    assert_eq!(acked_packet_id(&read_ack(&mut stream).await), 7);
    assert_eq!(acked_packet_id(&read_ack(&mut stream).await), 8);

    server.stop().await;
}

#[tokio::test]
async fn test_connection_limit_rejects_extra_peers() {
    let server = TestServer::start(HandlerConfig::default(), Some(1)).await;

    let mut first = TcpStream::connect(server.address).await.unwrap();
    first.write_all(&telemetry_frame(1, 0, 0)).await.unwrap();
    read_ack(&mut first).await;

    let mut second = TcpStream::connect(server.address).await.unwrap();
    let mut buf = [0u8; 1];
    let closed = tokio::time::timeout(WAIT, second.read(&mut buf))
        .await
        .expect("rejected connection was not closed");
    assert!(matches!(closed, Ok(0) | Err(_)));
    assert_eq!(server.metrics.snapshot().connections_rejected, 1);

    server.stop().await;
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let config = HandlerConfig {
        idle_timeout: Some(Duration::from_millis(50)),
        ..HandlerConfig::default()
    };
    let server = TestServer::start(config, None).await;
    let mut stream = TcpStream::connect(server.address).await.unwrap();

    let mut buf = [0u8; 1];
    let read = tokio::time::timeout(WAIT, stream.read(&mut buf))
        .await
        .expect("idle connection was not closed");
    assert_eq!(read.unwrap(), 0);
    assert_eq!(server.metrics.snapshot().idle_timeouts, 1);

    server.stop().await;
}

#[tokio::test]
async fn test_bind_conflict_reports_bind_failed() {
    let server = TestServer::default().await;

    let processor = FrameProcessor::new(
        Arc::new(MemoryGateway::new()),
        Arc::new(IngestMetrics::new()),
    );
    let result =
        TcpIngestListener::bind(server.address, processor, HandlerConfig::default(), None).await;

    match result {
        Err(NetworkError::BindFailed { address, .. }) => assert_eq!(address, server.address),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("second bind on the same port succeeded"),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_from_config_rejects_bad_bind_address() {
    let config = ListenerConfig {
        bind_address: "not-an-ip".to_string(),
        ..ListenerConfig::default()
    };
    let processor = FrameProcessor::new(
        Arc::new(MemoryGateway::new()),
        Arc::new(IngestMetrics::new()),
    );

    let result = TcpIngestListener::from_config(&config, processor).await;
    assert!(matches!(result, Err(NetworkError::Configuration(_))));
}
