use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use uuid::Uuid;

use devlog_db::Database;
use devlog_types::events::RealtimeCommand;

use crate::comments::submit_comment;
use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Serve one realtime connection until either side goes away.
///
/// The socket is anonymous: anyone connected receives every event and may
/// submit comments under any handle.
pub async fn handle_connection(socket: WebSocket, dispatcher: Dispatcher, db: Arc<Database>) {
    let conn_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading so the sender sees its own comments echoed back
    let mut broadcast_rx = dispatcher.subscribe();
    info!(
        "Client {} connected to live updates ({} open)",
        conn_id,
        dispatcher.connection_count()
    );

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward broadcasts -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = broadcast_rx.recv() => {
                    let event = match result {
                        Ok(event) => event,
                        Err(RecvError::Lagged(n)) => {
                            warn!("Client {} lagged, skipped {} events", conn_id, n);
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };

                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            error!("Failed to encode {} event: {}", event.kind(), e);
                            continue;
                        }
                    };

                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Client {} missed {} pongs, dropping connection", conn_id, missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let recv_dispatcher = dispatcher.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    match serde_json::from_str::<RealtimeCommand>(text.as_str()) {
                        Ok(cmd) => handle_command(&db, &recv_dispatcher, conn_id, cmd).await,
                        Err(e) => {
                            warn!(
                                "Client {} bad command: {} -- raw: {}",
                                conn_id,
                                e,
                                truncate(text.as_str(), 200)
                            );
                        }
                    }
                }
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("Client {} disconnected from live updates", conn_id);
}

async fn handle_command(db: &Arc<Database>, dispatcher: &Dispatcher, conn_id: Uuid, cmd: RealtimeCommand) {
    match cmd {
        RealtimeCommand::SendComment(comment) => {
            let db = db.clone();
            let dispatcher = dispatcher.clone();
            let result =
                tokio::task::spawn_blocking(move || submit_comment(&db, &dispatcher, comment)).await;

            match result {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("Client {} comment not stored: {}", conn_id, e),
                Err(e) => error!("spawn_blocking join error: {}", e),
            }
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 200), "short");
    }
}
