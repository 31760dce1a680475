// tests/property/fanout_test.rs

//! Property-based tests for message fan-out
//! Tests that every subscriber sees every publish exactly once, tagged with
//! its own subscription id

use crate::test_helpers::{TestContext, send_frame};
use proptest::prelude::*;
use std::collections::HashSet;
use stomphub::core::protocol::Command;

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 50,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_every_subscriber_gets_every_message_once(
        subscribers in 1usize..8,
        bodies in prop::collection::vec("[a-zA-Z0-9 ]{1,32}", 1..6),
    ) {
        let ctx = TestContext::new();
        let mut clients: Vec<_> = (0..subscribers)
            .map(|i| ctx.connected_client(&format!("user{i}"), "pw"))
            .collect();
        for (i, client) in clients.iter_mut().enumerate() {
            client.subscribe("/topic/p", &format!("s{i}"));
        }

        for body in &bodies {
            clients[0].send(&send_frame("/topic/p", body, None));
        }

        let mut message_ids: Option<Vec<String>> = None;
        for (i, client) in clients.iter_mut().enumerate() {
            let frames = client.frames();
            prop_assert_eq!(frames.len(), bodies.len());
            let expected_id = format!("s{}", i);
            for (frame, body) in frames.iter().zip(&bodies) {
                prop_assert_eq!(frame.command(), Command::Message);
                prop_assert_eq!(frame.header("subscription"), Some(expected_id.as_str()));
                prop_assert_eq!(frame.body(), body.trim());
            }
            let ids: Vec<String> = frames
                .iter()
                .map(|f| f.header("message-id").unwrap_or_default().to_string())
                .collect();
            let unique: HashSet<_> = ids.iter().collect();
            prop_assert_eq!(unique.len(), ids.len());
            // Every subscriber sees the same ids, in publish order.
            if let Some(first) = &message_ids {
                prop_assert_eq!(first, &ids);
            } else {
                message_ids = Some(ids);
            }
        }
    }
}
