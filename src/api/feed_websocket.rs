use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::error::Result;
use crate::registry::{SessionRecord, SessionRegistry, SnapshotCallback, SubscriptionId};

/// Messages a feed client may send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedRequest {
    Subscribe,
    Unsubscribe,
}

/// Messages the server pushes to feed clients.
///
/// After `Subscribe` the client immediately receives a `Sessions` event with
/// the current list, then one more for every registry mutation. Clients
/// replace their view with each list, never merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedEvent {
    Sessions { sessions: Vec<SessionRecord> },
    Unsubscribed,
    Error { message: String },
}

pub async fn handle_feed_websocket(websocket: WebSocket, registry: Arc<SessionRegistry>) {
    tracing::info!("New feed WebSocket connection established");

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let mut connection = FeedConnection {
        registry,
        tx,
        subscription: None,
    };

    // Spawn task to send messages to client
    let sender_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_sender.send(message).await {
                tracing::error!(error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(message) => {
                if let Ok(text) = message.to_str() {
                    if let Err(e) = connection.handle_text(text).await {
                        tracing::error!(error = %e, "Failed to handle feed message");
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "WebSocket error");
                break;
            }
        }
    }

    connection.detach().await;
    sender_task.abort();
    tracing::info!("Feed WebSocket connection closed");
}

/// Per-connection state: the outbound channel plus the registry
/// subscription backing it, if any.
struct FeedConnection {
    registry: Arc<SessionRegistry>,
    tx: mpsc::UnboundedSender<Message>,
    subscription: Option<SubscriptionId>,
}

impl FeedConnection {
    async fn handle_text(&mut self, text: &str) -> Result<()> {
        tracing::debug!("Received feed message: {}", text);

        match serde_json::from_str::<FeedRequest>(text) {
            Ok(FeedRequest::Subscribe) => self.handle_subscribe().await,
            Ok(FeedRequest::Unsubscribe) => self.handle_unsubscribe().await,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    raw_message = %text,
                    "Failed to parse feed message"
                );
                self.send_event(&FeedEvent::Error {
                    message: format!("Unrecognized message: {}", e),
                })
            }
        }
    }

    async fn handle_subscribe(&mut self) -> Result<()> {
        if self.subscription.is_some() {
            return self.send_event(&FeedEvent::Error {
                message: "Already subscribed".to_string(),
            });
        }

        let tx = self.tx.clone();
        let callback: SnapshotCallback = Box::new(move |sessions| {
            let event = FeedEvent::Sessions {
                sessions: sessions.to_vec(),
            };
            match serde_json::to_string(&event) {
                Ok(json) => {
                    let _ = tx.send(Message::text(json));
                }
                Err(e) => tracing::error!(error = %e, "Failed to serialize feed event"),
            }
        });

        let id = self.registry.subscribe_with_initial(callback).await;
        self.subscription = Some(id);
        Ok(())
    }

    async fn handle_unsubscribe(&mut self) -> Result<()> {
        if self.subscription.is_none() {
            return self.send_event(&FeedEvent::Error {
                message: "Not subscribed".to_string(),
            });
        }
        self.detach().await;
        self.send_event(&FeedEvent::Unsubscribed)
    }

    /// Drop the registry subscription without emitting protocol events.
    /// Also runs on disconnect.
    async fn detach(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.registry.unsubscribe(id).await;
        }
    }

    fn send_event(&self, event: &FeedEvent) -> Result<()> {
        let json = serde_json::to_string(event)?;
        let _ = self.tx.send(Message::text(json));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::session_routes::feed_route;
    use crate::registry::{Participant, ParticipantRole, SessionDraft, SessionStatus};
    use chrono::Utc;
    use std::time::Duration;

    fn draft(title: &str) -> SessionDraft {
        SessionDraft {
            title: title.to_string(),
            description: "A practice discussion for the feed tests".to_string(),
            status: SessionStatus::Upcoming,
            scheduled_at: Utc::now(),
            duration_minutes: 30,
            participants: vec![Participant::new(
                "user-1",
                "Alex Johnson",
                "alex@example.com",
                ParticipantRole::Moderator,
            )],
            moderator_id: "user-1".to_string(),
            evaluator_ids: vec![],
        }
    }

    async fn recv_event(client: &mut warp::test::WsClient) -> FeedEvent {
        let message = client.recv().await.expect("feed message");
        serde_json::from_str(message.to_str().expect("text frame")).expect("feed event")
    }

    #[tokio::test]
    async fn test_subscribe_delivers_initial_then_mutations() {
        let registry = SessionRegistry::new();
        let route = feed_route(registry.clone());

        let mut client = warp::test::ws()
            .path("/api/feed")
            .handshake(route)
            .await
            .expect("handshake");

        client.send_text(r#"{"type":"Subscribe"}"#).await;
        match recv_event(&mut client).await {
            FeedEvent::Sessions { sessions } => assert!(sessions.is_empty()),
            other => panic!("expected initial Sessions event, got {:?}", other),
        }

        let created = registry.create(draft("Feed Demo")).await;
        match recv_event(&mut client).await {
            FeedEvent::Sessions { sessions } => {
                assert_eq!(sessions.len(), 1);
                assert_eq!(sessions[0].id, created.id);
            }
            other => panic!("expected Sessions event, got {:?}", other),
        }

        registry.remove(&created.id).await;
        match recv_event(&mut client).await {
            FeedEvent::Sessions { sessions } => assert!(sessions.is_empty()),
            other => panic!("expected Sessions event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_the_feed() {
        let registry = SessionRegistry::new();
        let route = feed_route(registry.clone());

        let mut client = warp::test::ws()
            .path("/api/feed")
            .handshake(route)
            .await
            .expect("handshake");

        client.send_text(r#"{"type":"Subscribe"}"#).await;
        recv_event(&mut client).await;

        client.send_text(r#"{"type":"Unsubscribe"}"#).await;
        match recv_event(&mut client).await {
            FeedEvent::Unsubscribed => {}
            other => panic!("expected Unsubscribed ack, got {:?}", other),
        }

        registry.create(draft("After Unsubscribe")).await;
        let silent = tokio::time::timeout(Duration::from_millis(200), client.recv()).await;
        assert!(silent.is_err(), "feed should be silent after unsubscribe");
    }

    #[tokio::test]
    async fn test_double_subscribe_is_rejected() {
        let registry = SessionRegistry::new();
        let route = feed_route(registry);

        let mut client = warp::test::ws()
            .path("/api/feed")
            .handshake(route)
            .await
            .expect("handshake");

        client.send_text(r#"{"type":"Subscribe"}"#).await;
        recv_event(&mut client).await;

        client.send_text(r#"{"type":"Subscribe"}"#).await;
        match recv_event(&mut client).await {
            FeedEvent::Error { message } => assert_eq!(message, "Already subscribed"),
            other => panic!("expected Error event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_message_reports_error() {
        let registry = SessionRegistry::new();
        let route = feed_route(registry);

        let mut client = warp::test::ws()
            .path("/api/feed")
            .handshake(route)
            .await
            .expect("handshake");

        client.send_text("not json at all").await;
        match recv_event(&mut client).await {
            FeedEvent::Error { message } => {
                assert!(message.starts_with("Unrecognized message"))
            }
            other => panic!("expected Error event, got {:?}", other),
        }
    }
}
