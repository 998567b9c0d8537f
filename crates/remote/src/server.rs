// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server implementation.
//!
//! Handles client connections, request routing, and snapshot fanout. Each
//! connection owns its live queries; when a write lands on a collection,
//! every connection re-evaluates its queries on that collection and pushes
//! fresh snapshots.

use std::collections::HashMap;
use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use fleet_core::protocol::{ClientMessage, ServerMessage};
use fleet_core::Query;

use crate::state::ServerState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Live queries of one connection, by subscription id.
pub(crate) type Subscriptions = HashMap<u64, (String, Query)>;

/// Run the WebSocket server on the given address.
pub async fn run(addr: SocketAddr, state: ServerState) -> Result<(), BoxError> {
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on: {}", listener.local_addr()?);
    serve(listener, state).await
}

/// Accepts connections on `listener` until it fails.
pub(crate) async fn serve(listener: TcpListener, state: ServerState) -> Result<(), BoxError> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: ServerState,
) -> Result<(), BoxError> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    info!("New WebSocket connection from: {}", peer_addr);

    let (mut ws_sink, mut ws_stream) = ws_stream.split();
    let mut changes = state.subscribe();
    let mut subscriptions = Subscriptions::new();

    loop {
        tokio::select! {
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        for reply in handle_client_message(&text, &state, &mut subscriptions).await {
                            ws_sink.send(Message::Text(reply.to_json()?.into())).await?;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} disconnected", peer_addr);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        ws_sink.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(_)) => {
                        // Ignore other message types (Binary, Pong, Frame)
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", peer_addr, e);
                        break;
                    }
                    None => {
                        info!("Client {} stream ended", peer_addr);
                        break;
                    }
                }
            }

            change = changes.recv() => {
                let changed = match change {
                    Ok(collection) => Some(collection),
                    Err(RecvError::Lagged(n)) => {
                        // Unknown which collections changed; refresh everything.
                        warn!("Client {} lagged by {} changes", peer_addr, n);
                        None
                    }
                    Err(RecvError::Closed) => break,
                };
                for reply in refresh_snapshots(&state, &subscriptions, changed.as_deref()).await {
                    if let Err(e) = ws_sink.send(Message::Text(reply.to_json()?.into())).await {
                        warn!("Failed to send snapshot to {}: {}", peer_addr, e);
                        return Ok(());
                    }
                }
            }
        }
    }

    info!("Connection closed: {}", peer_addr);
    Ok(())
}

/// Process a client message and return the replies to send.
pub(crate) async fn handle_client_message(
    text: &str,
    state: &ServerState,
    subscriptions: &mut Subscriptions,
) -> Vec<ServerMessage> {
    let msg = match ClientMessage::from_json(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Unparsable message: {}", e);
            return vec![ServerMessage::error(format!("invalid message: {e}"))];
        }
    };
    debug!("Received message: {:?}", msg);

    match msg {
        ClientMessage::Create {
            request_id,
            collection,
            data,
        } => match state.create(&collection, data).await {
            Ok(id) => vec![ServerMessage::created(request_id, id)],
            Err(e) => vec![ServerMessage::rejected(request_id, e.to_string())],
        },

        ClientMessage::Set {
            request_id,
            collection,
            id,
            data,
            merge,
        } => match state.set(&collection, &id, data, merge).await {
            Ok(()) => vec![ServerMessage::ack(request_id)],
            Err(e) => vec![ServerMessage::rejected(request_id, e.to_string())],
        },

        ClientMessage::Delete {
            request_id,
            collection,
            id,
        } => match state.delete(&collection, &id).await {
            Ok(()) => vec![ServerMessage::ack(request_id)],
            Err(e) => vec![ServerMessage::rejected(request_id, e.to_string())],
        },

        ClientMessage::Subscribe {
            subscription_id,
            collection,
            query,
        } => match state.query(&collection, &query).await {
            Ok(records) => {
                debug!(
                    "Subscription {} on {}: {} records",
                    subscription_id,
                    collection,
                    records.len()
                );
                subscriptions.insert(subscription_id, (collection, query));
                vec![ServerMessage::snapshot(subscription_id, records)]
            }
            Err(e) => vec![ServerMessage::subscription_error(
                subscription_id,
                e.to_string(),
            )],
        },

        ClientMessage::Unsubscribe { subscription_id } => {
            subscriptions.remove(&subscription_id);
            Vec::new()
        }

        ClientMessage::Ping { id } => {
            debug!("Ping received: {}", id);
            vec![ServerMessage::pong(id)]
        }
    }
}

/// Snapshots for the subscriptions on `changed`, or on every collection
/// when `changed` is `None`.
pub(crate) async fn refresh_snapshots(
    state: &ServerState,
    subscriptions: &Subscriptions,
    changed: Option<&str>,
) -> Vec<ServerMessage> {
    let mut replies = Vec::new();
    let mut subs: Vec<_> = subscriptions.iter().collect();
    subs.sort_by_key(|(id, _)| **id);
    for (id, (collection, query)) in subs {
        if changed.is_some_and(|c| c != collection) {
            continue;
        }
        match state.query(collection, query).await {
            Ok(records) => replies.push(ServerMessage::snapshot(*id, records)),
            Err(e) => warn!("Subscription {} no longer valid: {}", id, e),
        }
    }
    replies
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
