// src/core/handler/actions/pubsub.rs

use super::{reply, require_connected};
use crate::connection::SessionState;
use crate::core::StompError;
use crate::core::protocol::frame::{DESTINATION, ID, MESSAGE_ID, RECEIPT, SUBSCRIPTION};
use crate::core::protocol::{Command, Frame};
use crate::core::state::ServerState;
use tracing::{debug, warn};

/// Handles SEND: publishes the body to every subscriber of the destination.
///
/// The sender must itself be subscribed to the destination. Each subscriber
/// gets its own MESSAGE carrying the subscription id it chose, and all of them
/// share one freshly allocated message id.
pub fn handle_send(
    frame: &Frame,
    session: &mut SessionState,
    state: &ServerState,
) -> Result<(), StompError> {
    require_connected(session, Command::Send)?;
    let destination = frame.required_header(DESTINATION)?;
    let body = frame.body().trim();

    let delivered = {
        let _gate = state.fanout_guard();
        if !state
            .broker
            .is_subscribed(destination, session.connection_id)
        {
            return Err(StompError::NotSubscribed(destination.to_string()));
        }

        let message_id = state.directory.next_message_id();
        let mut delivered = 0u64;
        for subscriber in state.broker.subscribers(destination) {
            let Some(subscription_id) = state.broker.subscription_id_for(subscriber, destination)
            else {
                warn!(
                    "No subscription id for connection {} on '{}', skipping.",
                    subscriber, destination
                );
                continue;
            };
            let message = Frame::new(Command::Message)
                .with_header(SUBSCRIPTION, subscription_id)
                .with_header(MESSAGE_ID, message_id.as_str())
                .with_header(DESTINATION, destination)
                .with_body(body);
            if state
                .connections
                .send_to(subscriber, message.encode_to_bytes())
            {
                delivered += 1;
            }
        }
        delivered
    };

    state.stats.add_messages_delivered(delivered);
    debug!(
        "Connection {} published to '{}', delivered to {} subscriber(s).",
        session.connection_id, destination, delivered
    );

    send_receipt(frame, session, state);
    Ok(())
}

/// Handles SUBSCRIBE: binds the client's id to the destination and joins the topic.
pub fn handle_subscribe(
    frame: &Frame,
    session: &mut SessionState,
    state: &ServerState,
) -> Result<(), StompError> {
    require_connected(session, Command::Subscribe)?;
    let destination = frame.required_header(DESTINATION)?;
    let id = frame.required_header(ID)?;

    // Reusing an id moves it: the topic it named before is left first.
    if let Some(previous) = state.broker.topic_for(session.connection_id, id)
        && previous != destination
    {
        state.broker.unsubscribe(&previous, session.connection_id);
        state.broker.unbind(session.connection_id, id);
        debug!(
            "Connection {} moved id '{}' from '{}' to '{}'.",
            session.connection_id, id, previous, destination
        );
    }

    // Bind before joining so fan-out never sees a subscriber without an id.
    state.broker.bind(session.connection_id, destination, id);
    state.broker.subscribe(destination, session.connection_id);

    let sequence = state.directory.next_subscription_sequence();
    debug!(
        "Connection {} subscribed to '{}' with id '{}' (subscription #{}).",
        session.connection_id, destination, id, sequence
    );

    send_receipt(frame, session, state);
    Ok(())
}

/// Handles UNSUBSCRIBE: resolves the id to its topic and leaves it.
///
/// The lookup is scoped to the issuing connection, since ids are only unique
/// within the connection that chose them.
pub fn handle_unsubscribe(
    frame: &Frame,
    session: &mut SessionState,
    state: &ServerState,
) -> Result<(), StompError> {
    require_connected(session, Command::Unsubscribe)?;
    let id = frame.required_header(ID)?;

    let topic = state
        .broker
        .topic_for(session.connection_id, id)
        .ok_or_else(|| StompError::UnknownSubscription(id.to_string()))?;
    // Leave the topic before dropping the id, mirroring the order in SUBSCRIBE.
    state.broker.unsubscribe(&topic, session.connection_id);
    state.broker.unbind(session.connection_id, id);
    debug!(
        "Connection {} unsubscribed id '{}' from '{}'.",
        session.connection_id, id, topic
    );

    send_receipt(frame, session, state);
    Ok(())
}

fn send_receipt(frame: &Frame, session: &SessionState, state: &ServerState) {
    if let Some(receipt) = frame.header(RECEIPT).filter(|r| !r.is_empty()) {
        reply(state, session, &Frame::receipt(Some(receipt)));
    }
}
