use std::collections::HashMap;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

use crate::messages::{ClientMessage, ServerMessage};
use crate::registry::RoomRegistry;
use crate::room::{Command, Room, RoomEvent, TimerSettings};
use crate::sink::{self, StudyLog, StudyLogSink};

type Outbound = mpsc::UnboundedSender<String>;

/// One live connection: its outbound queue and the room it currently sits in.
struct Session {
    outbound: Outbound,
    room: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub rooms: usize,
    pub connections: usize,
}

pub struct Server {
    registry: RoomRegistry,
    sessions: RwLock<HashMap<String, Session>>,
    persistence: mpsc::UnboundedSender<Vec<StudyLog>>,
}

impl Server {
    /// Must be called inside a tokio runtime; the study log writer is spawned here.
    pub fn new(settings: TimerSettings, sink: Arc<dyn StudyLogSink>) -> Self {
        Server {
            registry: RoomRegistry::new(settings),
            sessions: RwLock::new(HashMap::new()),
            persistence: sink::spawn_writer(sink),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub async fn stats(&self) -> Stats {
        Stats {
            rooms: self.registry.len().await,
            connections: self.sessions.read().await.len(),
        }
    }

    pub async fn handle_connection(&self, ws: WebSocket) {
        let (mut ws_tx, mut ws_rx) = ws.split();
        let (connection_id, mut rx) = self.connect().await;

        tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                if let Err(e) = ws_tx.send(Message::text(text)).await {
                    debug!("Failed to send WebSocket message: {}", e);
                    break;
                }
            }
            let _ = ws_tx.close().await;
        });

        while let Some(result) = ws_rx.next().await {
            match result {
                Ok(msg) if msg.is_close() => break,
                Ok(msg) => {
                    let Ok(text) = msg.to_str() else {
                        if msg.is_binary() {
                            warn!("Ignoring binary frame from {}", connection_id);
                        }
                        continue;
                    };
                    match serde_json::from_str::<ClientMessage>(text) {
                        Ok(client_msg) => self.handle_message(&connection_id, client_msg).await,
                        Err(e) => warn!("Ignoring malformed message from {}: {}", connection_id, e),
                    }
                }
                Err(e) => {
                    warn!("WebSocket error on {}: {}", connection_id, e);
                    break;
                }
            }
        }

        self.disconnect(&connection_id).await;
    }

    /// Registers a new connection and greets it with its identifier.
    ///
    /// Everything addressed to the connection arrives on the returned receiver
    /// as serialized JSON.
    pub async fn connect(&self) -> (String, mpsc::UnboundedReceiver<String>) {
        let connection_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();

        if let Some(text) = encode(&ServerMessage::Connected {
            connection_id: connection_id.clone(),
        }) {
            let _ = tx.send(text);
        }
        self.sessions.write().await.insert(
            connection_id.clone(),
            Session {
                outbound: tx,
                room: None,
            },
        );
        info!("Connection {} opened", connection_id);
        (connection_id, rx)
    }

    pub async fn handle_message(&self, connection_id: &str, message: ClientMessage) {
        let current = {
            let sessions = self.sessions.read().await;
            match sessions.get(connection_id) {
                Some(session) => session.room.clone(),
                None => return,
            }
        };

        let Some((room_id, command)) = message.into_command() else {
            if let Some(room_id) = current {
                self.set_session_room(connection_id, None).await;
                self.leave(&room_id, connection_id).await;
            }
            return;
        };

        match command {
            Command::Join { .. } => {
                if let Some(previous) = current.filter(|r| *r != room_id) {
                    self.leave(&previous, connection_id).await;
                }
                let mut room = self.registry.get_or_create(&room_id, connection_id).await;
                let events = room.apply(connection_id, command);
                self.dispatch(&room, events).await;
                drop(room);
                // A disconnect that ran mid-join saw the old room; undo the join here.
                if !self.set_session_room(connection_id, Some(room_id.clone())).await {
                    self.leave(&room_id, connection_id).await;
                }
            }
            command => {
                let Some(mut room) = self.registry.get(&room_id).await else {
                    return;
                };
                let events = room.apply(connection_id, command);
                self.dispatch(&room, events).await;
            }
        }
    }

    /// Tears down a connection. Only the first call for an id has any effect.
    pub async fn disconnect(&self, connection_id: &str) {
        let Some(session) = self.sessions.write().await.remove(connection_id) else {
            return;
        };
        info!("Connection {} closed", connection_id);
        if let Some(room_id) = session.room {
            self.leave(&room_id, connection_id).await;
        }
    }

    /// Runs one scheduler step: advance every room, then sync every timer.
    pub async fn tick(&self) {
        let rooms = self.registry.handles().await;

        for handle in &rooms {
            let mut room = handle.lock().await;
            let events = room.tick();
            if !events.is_empty() {
                info!("Room {} switched to {:?}", room.id, room.phase);
                self.dispatch(&room, events).await;
            }
        }

        for handle in &rooms {
            let room = handle.lock().await;
            // Rooms emptied since the handles were taken are already deleted.
            if room.is_empty() {
                continue;
            }
            self.broadcast(&room, &ServerMessage::TimerSync { timer: room.timer })
                .await;
        }
    }

    async fn leave(&self, room_id: &str, connection_id: &str) {
        if let Some((room, events)) = self.registry.leave(room_id, connection_id).await {
            self.dispatch(&room, events).await;
        }
    }

    /// Returns false when the connection is already gone.
    async fn set_session_room(&self, connection_id: &str, room_id: Option<String>) -> bool {
        match self.sessions.write().await.get_mut(connection_id) {
            Some(session) => {
                session.room = room_id;
                true
            }
            None => false,
        }
    }

    async fn dispatch(&self, room: &Room, events: Vec<RoomEvent>) {
        for event in events {
            match event {
                RoomEvent::Changed => {
                    self.broadcast(room, &ServerMessage::UpdateRoom { room: room.clone() })
                        .await;
                }
                RoomEvent::WorkCompleted(batch) => {
                    if let Err(e) = self.persistence.send(batch) {
                        error!("Study log writer is gone, dropping batch for {}: {}", room.id, e);
                    }
                }
            }
        }
    }

    async fn broadcast(&self, room: &Room, message: &ServerMessage) {
        let Some(text) = encode(message) else {
            return;
        };
        let sessions = self.sessions.read().await;
        for user in &room.users {
            if let Some(session) = sessions.get(&user.id) {
                let _ = session.outbound.send(text.clone());
            }
        }
    }
}

fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(text) => Some(text),
        Err(e) => {
            error!("Failed to encode server message: {}", e);
            None
        }
    }
}
