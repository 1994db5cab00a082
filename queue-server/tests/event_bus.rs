//! 事件总线端到端测试
//!
//! Drives the real TCP listener: handshake, join/leave, queue-scoped
//! delivery, and the staff-tier rejection path.

use std::sync::Arc;
use std::time::Duration;

use queue_server::auth::{JwtConfig, JwtService};
use queue_server::message::{EventHub, HubConfig};
use shared::message::{BusMessage, EventType, HandshakePayload, codec};
use shared::models::{Account, Ticket, TicketStatus};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

fn sample_ticket(queue_id: i64, number: i64) -> Ticket {
    Ticket {
        id: number,
        queue_id,
        number,
        status: TicketStatus::Pending,
        holder_name: "Holder".into(),
        holder_code: format!("SV{number:03}"),
        created_at: 0,
        called_at: None,
        service_start_at: None,
        finished_at: None,
        cancel_reason: None,
        served_by: None,
    }
}

fn test_jwt() -> Arc<JwtService> {
    Arc::new(JwtService::new(JwtConfig {
        secret: "0123456789abcdef0123456789abcdef".into(),
        expiration_minutes: 60,
        issuer: "queue-server".into(),
        audience: "queue-clients".into(),
    }))
}

/// Start a hub on a random port and return it with the port
async fn start_hub(jwt: Arc<JwtService>) -> (EventHub, u16) {
    let port = 20000 + (rand::random::<u16>() % 20000);
    let hub = EventHub::from_config(HubConfig {
        tcp_listen_addr: format!("127.0.0.1:{port}"),
        channel_capacity: 64,
    });

    let server_hub = hub.clone();
    tokio::spawn(async move {
        let _ = server_hub.start_tcp_server(jwt).await;
    });

    (hub, port)
}

async fn connect(port: u16) -> TcpStream {
    for _ in 0..50 {
        if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)).await {
            return stream;
        }
        sleep(Duration::from_millis(20)).await;
    }
    panic!("could not connect to event bus on port {port}");
}

#[tokio::test]
async fn join_receives_only_that_queues_events() {
    let (hub, port) = start_hub(test_jwt()).await;
    let mut stream = connect(port).await;

    codec::write_frame(&mut stream, &BusMessage::handshake(&HandshakePayload::public()))
        .await
        .unwrap();
    codec::write_frame(&mut stream, &BusMessage::join_queue(7))
        .await
        .unwrap();

    // Let the server process the control frames
    sleep(Duration::from_millis(100)).await;
    assert_eq!(hub.registry().connection_count(), 1);

    // Event for another queue is filtered out; queue 7 arrives
    hub.publish(BusMessage::ticket_created(&sample_ticket(8, 1)));
    hub.publish(BusMessage::ticket_created(&sample_ticket(7, 1)));

    let msg = timeout(Duration::from_secs(2), codec::read_frame(&mut stream))
        .await
        .expect("frame within timeout")
        .expect("valid frame");
    assert_eq!(msg.event_type, EventType::TicketCreated);
    assert_eq!(msg.queue_id, 7);
    assert_eq!(msg.ticket().unwrap().number, 1);

    hub.shutdown();
}

#[tokio::test]
async fn leave_stops_delivery_immediately() {
    let (hub, port) = start_hub(test_jwt()).await;
    let mut stream = connect(port).await;

    codec::write_frame(&mut stream, &BusMessage::join_queue(3))
        .await
        .unwrap();
    sleep(Duration::from_millis(100)).await;

    hub.publish(BusMessage::queue_reset(3));
    let msg = timeout(Duration::from_secs(2), codec::read_frame(&mut stream))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(msg.event_type, EventType::QueueReset);

    codec::write_frame(&mut stream, &BusMessage::leave_queue(3))
        .await
        .unwrap();
    sleep(Duration::from_millis(100)).await;

    hub.publish(BusMessage::queue_reset(3));
    // Nothing may arrive after the withdrawal was processed
    let result = timeout(Duration::from_millis(300), codec::read_frame(&mut stream)).await;
    assert!(result.is_err(), "received an event after leave-queue");

    hub.shutdown();
}

#[tokio::test]
async fn disconnect_cleans_up_registry() {
    let (hub, port) = start_hub(test_jwt()).await;
    let mut stream = connect(port).await;

    codec::write_frame(&mut stream, &BusMessage::join_queue(1))
        .await
        .unwrap();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(hub.registry().subscriber_count(1), 1);

    drop(stream);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(hub.registry().connection_count(), 0);
    assert_eq!(hub.registry().subscriber_count(1), 0);

    hub.shutdown();
}

#[tokio::test]
async fn invalid_staff_handshake_closes_connection() {
    let (hub, port) = start_hub(test_jwt()).await;
    let mut stream = connect(port).await;

    codec::write_frame(
        &mut stream,
        &BusMessage::handshake(&HandshakePayload::staff("not-a-jwt")),
    )
    .await
    .unwrap();

    // Server drops the connection; the next read hits EOF
    let result = timeout(Duration::from_secs(2), codec::read_frame(&mut stream)).await;
    match result {
        Ok(Err(_)) => {}
        Ok(Ok(msg)) => panic!("expected close, got frame {:?}", msg.event_type),
        Err(_) => panic!("connection not closed after bad staff handshake"),
    }

    hub.shutdown();
}

#[tokio::test]
async fn valid_staff_handshake_keeps_receiving_events() {
    let jwt = test_jwt();
    let (hub, port) = start_hub(jwt.clone()).await;
    let mut stream = connect(port).await;

    let account = Account {
        id: 1,
        username: "desk1".into(),
        password_hash: String::new(),
        display_name: "Front Desk".into(),
        is_active: true,
        created_at: 0,
    };
    let token = jwt.generate_token(&account).unwrap();

    codec::write_frame(
        &mut stream,
        &BusMessage::handshake(&HandshakePayload::staff(token)),
    )
    .await
    .unwrap();
    codec::write_frame(&mut stream, &BusMessage::join_queue(2))
        .await
        .unwrap();
    sleep(Duration::from_millis(100)).await;

    hub.publish(BusMessage::queue_token_rotated(2));
    let msg = timeout(Duration::from_secs(2), codec::read_frame(&mut stream))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(msg.event_type, EventType::QueueTokenRotated);
    // Token is never part of the broadcast
    assert!(msg.payload.is_empty());

    hub.shutdown();
}
