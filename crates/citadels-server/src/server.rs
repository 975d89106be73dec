//! WebSocket server and connection handling.
//!
//! Each connection gets a player id and a message channel. Rooms live in a
//! shared map; after every successful mutation the room's members each get
//! a fresh snapshot filtered for them, and any transitions the engine
//! scheduled are armed as timers that re-enter the engine when they fire.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::GameRoom;
use citadels_core::Observer;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Engine observer that reports "this room changed" to the notification
/// loop. Sending is non-blocking, so the engine never waits on a client.
struct SnapshotNotifier {
    room_id: Uuid,
    tx: mpsc::UnboundedSender<Uuid>,
}

impl Observer for SnapshotNotifier {
    fn update(&self) {
        let _ = self.tx.send(self.room_id);
    }
}

/// Server state shared across all connections.
pub struct ServerState {
    /// All active rooms
    pub rooms: DashMap<Uuid, GameRoom>,
    /// Mapping from player ID to their room ID
    pub player_rooms: DashMap<Uuid, Uuid>,
    /// Mapping from player ID to their message sender
    pub player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
    /// Rooms whose state changed and want snapshots pushed
    notifications: mpsc::UnboundedSender<Uuid>,
}

impl ServerState {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Uuid>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(Self {
            rooms: DashMap::new(),
            player_rooms: DashMap::new(),
            player_senders: DashMap::new(),
            notifications: tx,
        });
        (state, rx)
    }

    /// Send a message to a specific player.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    /// Broadcast a message to all members of a room.
    pub fn broadcast_to_room(&self, room_id: Uuid, msg: ServerMessage) {
        let members: Vec<Uuid> = match self.rooms.get(&room_id) {
            Some(room) => room.game.participants.iter().map(|p| p.id).collect(),
            None => return,
        };
        for player_id in members {
            self.send_to_player(player_id, msg.clone());
        }
    }

    /// Get list of rooms still in their lobby.
    pub fn get_open_rooms(&self) -> Vec<crate::protocol::RoomInfo> {
        self.rooms
            .iter()
            .map(|r| r.to_info())
            .filter(|info| !info.in_game)
            .collect()
    }
}

/// Run the notification loop: whenever the engine reports a change, push
/// fresh snapshots to the room's members.
pub async fn run_notifications(state: Arc<ServerState>, mut rx: mpsc::UnboundedReceiver<Uuid>) {
    while let Some(room_id) = rx.recv().await {
        push_snapshots(&state, room_id);
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Citadels server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Assign a player ID
    let player_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.player_senders.insert(player_id, tx);

    // Send welcome message
    let welcome = ServerMessage::Welcome { player_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text.into())).await?;

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) {
                    handle_message(player_id, client_msg, &state);
                } else {
                    warn!("Invalid message from {}: {}", player_id, text);
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", player_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to_player(player_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", player_id, e);
                break;
            }
            _ => {}
        }
    }

    // Clean up on disconnect
    handle_disconnect(player_id, &state);
    state.player_senders.remove(&player_id);
    send_task.abort();

    info!("Connection closed for {}", player_id);
    Ok(())
}

/// Handle a client message.
fn handle_message(player_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateRoom { username } => {
            let room_id = Uuid::new_v4();
            let mut room = GameRoom::new(room_id, player_id, username);
            room.game.attach(Box::new(SnapshotNotifier {
                room_id,
                tx: state.notifications.clone(),
            }));
            let room_info = room.to_info();

            state.rooms.insert(room_id, room);
            state.player_rooms.insert(player_id, room_id);

            state.send_to_player(player_id, ServerMessage::RoomCreated { room_id });
            state.send_to_player(player_id, ServerMessage::JoinedRoom { room: room_info });
        }

        ClientMessage::JoinRoom { room_id, username } => {
            let room_info = match state.rooms.get_mut(&room_id) {
                Some(mut room) => {
                    room.add_member(player_id, username);
                    Some(room.to_info())
                }
                None => None,
            };

            match room_info {
                Some(room_info) => {
                    state.player_rooms.insert(player_id, room_id);
                    state.send_to_player(
                        player_id,
                        ServerMessage::JoinedRoom {
                            room: room_info.clone(),
                        },
                    );
                    state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info });
                    push_snapshots(state, room_id);
                }
                None => {
                    state.send_to_player(
                        player_id,
                        ServerMessage::Error {
                            message: "Room not found".to_string(),
                        },
                    );
                }
            }
        }

        ClientMessage::LeaveRoom => {
            if let Some((_, room_id)) = state.player_rooms.remove(&player_id) {
                let (removed, room_info) = {
                    match state.rooms.get_mut(&room_id) {
                        Some(mut room) => (room.remove_member(player_id), Some(room.to_info())),
                        None => (false, None),
                    }
                };

                if removed {
                    state.rooms.remove(&room_id);
                } else if let Some(room_info) = room_info {
                    state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info });
                }

                state.send_to_player(player_id, ServerMessage::LeftRoom);
            }
        }

        ClientMessage::SetupGame { setup } => {
            if let Some(&room_id) = state.player_rooms.get(&player_id).as_deref() {
                let result = match state.rooms.get_mut(&room_id) {
                    Some(mut room) => room.setup(player_id, setup),
                    None => return,
                };

                match result {
                    Ok(()) => {
                        push_snapshots(state, room_id);
                        drain_tasks(state, room_id);
                    }
                    Err(e) => {
                        state.send_to_player(
                            player_id,
                            ServerMessage::Error {
                                message: e.to_string(),
                            },
                        );
                    }
                }
            }
        }

        ClientMessage::GameMove { mv } => {
            if let Some(&room_id) = state.player_rooms.get(&player_id).as_deref() {
                let result = match state.rooms.get_mut(&room_id) {
                    Some(mut room) => room.handle_move(player_id, mv),
                    None => return,
                };

                match result {
                    Ok(()) => {
                        push_snapshots(state, room_id);
                        drain_tasks(state, room_id);
                    }
                    Err(e) => {
                        // Rejections go to the offending client only.
                        state.send_to_player(
                            player_id,
                            ServerMessage::MoveRejected {
                                reason: e.to_string(),
                            },
                        );
                    }
                }
            }
        }

        ClientMessage::ListRooms => {
            let rooms = state.get_open_rooms();
            state.send_to_player(player_id, ServerMessage::RoomList { rooms });
        }

        ClientMessage::Ping => {
            state.send_to_player(player_id, ServerMessage::Pong);
        }
    }
}

/// Push a per-viewer snapshot to every member of a room.
fn push_snapshots(state: &Arc<ServerState>, room_id: Uuid) {
    let snapshots = match state.rooms.get(&room_id) {
        Some(room) => room.snapshots(),
        None => return,
    };
    for (member_id, snapshot) in snapshots {
        state.send_to_player(member_id, ServerMessage::Snapshot { state: snapshot });
    }
}

/// Arm timers for the transitions the engine just scheduled. When a timer
/// fires, the task re-enters the engine, which re-checks that its phase
/// still holds; stale timers die quietly.
fn drain_tasks(state: &Arc<ServerState>, room_id: Uuid) {
    let tasks = match state.rooms.get_mut(&room_id) {
        Some(mut room) => room.game.take_scheduled_tasks(),
        None => return,
    };

    for (delay, task) in tasks {
        let state = Arc::clone(state);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let ran = match state.rooms.get_mut(&room_id) {
                Some(mut room) => room.game.run_task(task),
                None => return,
            };
            if ran {
                push_snapshots(&state, room_id);
            }
            // A task may queue the next one (deal pause, then draft reveal).
            drain_tasks(&state, room_id);
        });
    }
}

/// Handle player disconnect.
fn handle_disconnect(player_id: Uuid, state: &Arc<ServerState>) {
    if let Some((_, room_id)) = state.player_rooms.remove(&player_id) {
        let (in_game, removed, room_info) = {
            match state.rooms.get_mut(&room_id) {
                Some(mut room) => {
                    if room.to_info().in_game {
                        // Keep the seat during a game, just mark it offline.
                        room.set_member_online(player_id, false);
                        (true, false, Some(room.to_info()))
                    } else {
                        (false, room.remove_member(player_id), Some(room.to_info()))
                    }
                }
                None => return,
            }
        };

        if !in_game && removed {
            state.rooms.remove(&room_id);
        } else if let Some(room_info) = room_info {
            state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info });
        }
    }
}
