// tests/integration/pubsub_test.rs

//! Integration tests for SUBSCRIBE, UNSUBSCRIBE and SEND fan-out

use super::test_helpers::{TestContext, send_frame};
use stomphub::connection::SessionPhase;
use stomphub::core::StompError;
use stomphub::core::protocol::Command;

#[test]
fn test_send_fans_out_with_per_subscriber_ids() {
    let ctx = TestContext::new();
    let mut c1 = ctx.connected_client("alice", "pw");
    let mut c2 = ctx.connected_client("bob", "pw");
    c1.subscribe("/topic/a", "1");
    c2.subscribe("/topic/a", "5");
    assert!(c1.frames().is_empty());
    assert!(c2.frames().is_empty());

    c1.send(&send_frame("/topic/a", "hello", Some("9")));

    let c1_frames = c1.frames();
    assert_eq!(c1_frames.len(), 2);
    assert_eq!(c1_frames[0].command(), Command::Message);
    assert_eq!(c1_frames[0].header("subscription"), Some("1"));
    assert_eq!(c1_frames[0].header("destination"), Some("/topic/a"));
    assert_eq!(c1_frames[0].body(), "hello");
    assert_eq!(c1_frames[1].command(), Command::Receipt);
    assert_eq!(c1_frames[1].header("receipt-id"), Some("9"));

    let c2_frames = c2.frames();
    assert_eq!(c2_frames.len(), 1);
    assert_eq!(c2_frames[0].command(), Command::Message);
    assert_eq!(c2_frames[0].header("subscription"), Some("5"));
    assert_eq!(c2_frames[0].body(), "hello");

    // Every copy of one publish shares the same message id.
    assert!(c1_frames[0].header("message-id").is_some());
    assert_eq!(
        c1_frames[0].header("message-id"),
        c2_frames[0].header("message-id")
    );
    assert_eq!(ctx.state.stats.get_messages_delivered(), 2);
}

#[test]
fn test_each_publish_gets_a_fresh_message_id() {
    let ctx = TestContext::new();
    let mut client = ctx.connected_client("alice", "pw");
    client.subscribe("/topic/ids", "1");

    client.send(&send_frame("/topic/ids", "one", None));
    client.send(&send_frame("/topic/ids", "two", None));

    let frames = client.frames();
    assert_eq!(frames.len(), 2);
    assert_ne!(frames[0].header("message-id"), frames[1].header("message-id"));
    assert_eq!(frames[0].body(), "one");
    assert_eq!(frames[1].body(), "two");
}

#[test]
fn test_n_subscribers_receive_exactly_n_messages() {
    let ctx = TestContext::new();
    let mut clients: Vec<_> = (0..10)
        .map(|i| ctx.connected_client(&format!("user{i}"), "pw"))
        .collect();
    for (i, client) in clients.iter_mut().enumerate() {
        client.subscribe("/topic/crowd", &format!("sub-{i}"));
    }
    let mut outsider = ctx.connected_client("outsider", "pw");
    outsider.subscribe("/topic/elsewhere", "1");

    clients[0].send(&send_frame("/topic/crowd", "to everyone", None));

    for (i, client) in clients.iter_mut().enumerate() {
        let frames = client.frames();
        assert_eq!(frames.len(), 1, "client {i} should get exactly one message");
        assert_eq!(frames[0].header("subscription"), Some(format!("sub-{i}").as_str()));
    }
    assert!(outsider.frames().is_empty());
    assert_eq!(ctx.state.stats.get_messages_delivered(), 10);
}

#[test]
fn test_send_without_subscription_is_an_error() {
    let ctx = TestContext::new();
    let mut sender = ctx.connected_client("alice", "pw");
    let mut listener = ctx.connected_client("bob", "pw");
    listener.subscribe("/topic/private", "1");

    sender.send(&send_frame("/topic/private", "sneaky", Some("4")));

    let frames = sender.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].command(), Command::Error);
    assert_eq!(frames[0].header("receipt-id"), Some("4"));
    assert_eq!(
        frames[0].header("message"),
        Some("Client not subscribed to topic /topic/private")
    );
    assert!(sender.is_closed());
    assert!(listener.frames().is_empty());
    assert!(!ctx.state.directory.is_user_active("alice"));
}

#[test]
fn test_send_requires_destination() {
    let ctx = TestContext::new();
    let mut client = ctx.connected_client("alice", "pw");
    client.send("SEND\n\nno destination\n");

    let frames = client.frames();
    assert_eq!(frames[0].command(), Command::Error);
    assert_eq!(frames[0].header("message"), Some("Missing destination header"));
}

#[test]
fn test_subscribe_with_receipt_is_acknowledged() {
    let ctx = TestContext::new();
    let mut client = ctx.connected_client("alice", "pw");
    client.send("SUBSCRIBE\ndestination:/topic/a\nid:3\nreceipt:12\n\n");

    let frames = client.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].command(), Command::Receipt);
    assert_eq!(frames[0].header("receipt-id"), Some("12"));
    assert!(ctx.state.broker.is_subscribed("/topic/a", client.connection_id));
    assert_eq!(
        ctx.state
            .broker
            .subscription_id_for(client.connection_id, "/topic/a")
            .as_deref(),
        Some("3")
    );
}

#[test]
fn test_subscribe_reusing_id_moves_it_to_new_topic() {
    let ctx = TestContext::new();
    let mut client = ctx.connected_client("alice", "pw");
    let mut sender = ctx.connected_client("bob", "pw");
    sender.subscribe("/topic/a", "1");
    sender.subscribe("/topic/b", "1");
    client.subscribe("/topic/a", "1");
    client.send("SUBSCRIBE\ndestination:/topic/b\nid:1\nreceipt:r\n\n");

    let frames = client.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].command(), Command::Receipt);
    assert_eq!(client.phase(), SessionPhase::Connected);
    assert!(!ctx.state.broker.is_subscribed("/topic/a", client.connection_id));
    assert!(ctx.state.broker.is_subscribed("/topic/b", client.connection_id));
    assert_eq!(
        ctx.state.broker.topic_for(client.connection_id, "1").as_deref(),
        Some("/topic/b")
    );
    assert_eq!(ctx.state.broker.get_subscription_count(client.connection_id), 1);

    sender.send(&send_frame("/topic/a", "old", None));
    sender.send(&send_frame("/topic/b", "new", None));
    let delivered = client.frames();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].body(), "new");

    // Unsubscribing the moved id leaves the new topic.
    client.send("UNSUBSCRIBE\nid:1\n\n");
    assert!(!ctx.state.broker.is_subscribed("/topic/b", client.connection_id));
}

#[test]
fn test_subscription_ids_are_scoped_per_connection() {
    let ctx = TestContext::new();
    let mut c1 = ctx.connected_client("alice", "pw");
    let mut c2 = ctx.connected_client("bob", "pw");
    c1.subscribe("/topic/a", "1");
    c2.subscribe("/topic/b", "1");

    // Unsubscribing c2's id "1" must not touch c1's subscription.
    c2.send("UNSUBSCRIBE\nid:1\nreceipt:2\n\n");
    let frames = c2.frames();
    assert_eq!(frames[0].command(), Command::Receipt);
    assert!(!ctx.state.broker.is_subscribed("/topic/b", c2.connection_id));
    assert!(ctx.state.broker.is_subscribed("/topic/a", c1.connection_id));
    assert!(c1.frames().is_empty());
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let ctx = TestContext::new();
    let mut sender = ctx.connected_client("alice", "pw");
    let mut listener = ctx.connected_client("bob", "pw");
    sender.subscribe("/topic/news", "1");
    listener.subscribe("/topic/news", "2");

    listener.send("UNSUBSCRIBE\nid:2\n\n");
    assert!(listener.frames().is_empty());
    assert_eq!(listener.phase(), SessionPhase::Connected);

    sender.send(&send_frame("/topic/news", "late news", None));
    assert_eq!(sender.frames().len(), 1);
    assert!(listener.frames().is_empty());
    assert_eq!(ctx.state.broker.get_subscriber_count("/topic/news"), 1);
}

#[test]
fn test_unsubscribe_unknown_id_is_an_error() {
    let ctx = TestContext::new();
    let mut client = ctx.connected_client("alice", "pw");
    client.send("UNSUBSCRIBE\nid:404\n\n");

    let frames = client.frames();
    assert_eq!(frames[0].command(), Command::Error);
    assert_eq!(
        frames[0].header("message"),
        Some("Invalid subscription ID or topic not found: 404")
    );
    assert!(client.is_closed());
}

#[test]
fn test_unsubscribe_twice_is_an_error() {
    let ctx = TestContext::new();
    let mut client = ctx.connected_client("alice", "pw");
    client.subscribe("/topic/a", "1");
    client.send("UNSUBSCRIBE\nid:1\n\n");
    assert_eq!(client.phase(), SessionPhase::Connected);

    client.send("UNSUBSCRIBE\nid:1\n\n");
    let frames = client.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].command(), Command::Error);
    assert_eq!(client.phase(), SessionPhase::Terminated);
}

#[test]
fn test_frames_before_connect_are_rejected() {
    let ctx = TestContext::new();
    let mut client = ctx.client();
    client.subscribe("/topic/a", "1");

    let frames = client.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].command(), Command::Error);
    assert_eq!(
        frames[0].header("message"),
        Some("Client must CONNECT before sending SUBSCRIBE")
    );
    assert!(client.is_closed());
    assert_eq!(ctx.state.broker.get_subscription_count(client.connection_id), 0);
}

#[test]
fn test_unknown_command_echoes_the_frame() {
    let ctx = TestContext::new();
    let mut client = ctx.connected_client("alice", "pw");
    client.send("BEGIN\ntransaction:tx1\n\n");

    let frames = client.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].command(), Command::Error);
    assert_eq!(frames[0].header("message"), Some("Unsupported command"));
    assert_eq!(
        frames[0].body(),
        "The message:\n-------\nBEGIN\ntransaction:tx1\n\n-------\n"
    );
    assert!(client.is_closed());
    assert_eq!(ctx.state.stats.get_protocol_errors(), 1);
}

#[test]
fn test_server_side_commands_from_client_are_rejected() {
    let ctx = TestContext::new();
    let mut client = ctx.connected_client("alice", "pw");
    client.send("MESSAGE\ndestination:/topic/a\n\nspoofed\n");

    let frames = client.frames();
    assert_eq!(frames[0].command(), Command::Error);
    assert_eq!(frames[0].header("message"), Some("Unsupported command"));
}

#[test]
fn test_heartbeat_only_input_is_ignored() {
    let ctx = TestContext::new();
    let mut client = ctx.connected_client("alice", "pw");
    client.send("\n");
    client.send("\r\n\n");

    assert!(client.frames().is_empty());
    assert_eq!(client.phase(), SessionPhase::Connected);
}

#[test]
fn test_undecodable_frame_is_answered_with_error() {
    let ctx = TestContext::new();
    let mut client = ctx.connected_client("alice", "pw");
    client.subscribe("/topic/a", "1");
    client.engine.reject(StompError::InvalidUtf8);

    let frames = client.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].command(), Command::Error);
    assert_eq!(frames[0].header("message"), Some("Frame is not valid UTF-8"));
    assert!(client.is_closed());
    assert!(!ctx.state.directory.is_user_active("alice"));
    assert!(!ctx.state.broker.is_subscribed("/topic/a", client.connection_id));
    assert_eq!(ctx.state.stats.get_protocol_errors(), 1);

    // Nothing more is sent once the session is over.
    client.engine.reject(StompError::FrameTooLarge(16));
    assert!(client.frames().is_empty());
}
