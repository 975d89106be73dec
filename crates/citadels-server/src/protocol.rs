//! WebSocket protocol messages.

use citadels_core::{GameSetup, GameSnapshot, Move, PlayerId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Create a new game room
    CreateRoom { username: String },

    /// Join an existing room
    JoinRoom { room_id: Uuid, username: String },

    /// Leave current room
    LeaveRoom,

    /// Start a game for the named subset (room manager only)
    SetupGame { setup: GameSetup },

    /// Submit a game move
    GameMove { mv: Move },

    /// Request room list
    ListRooms,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned player ID
    Welcome { player_id: PlayerId },

    /// Room created successfully
    RoomCreated { room_id: Uuid },

    /// Joined room successfully
    JoinedRoom { room: RoomInfo },

    /// Left room successfully
    LeftRoom,

    /// Room roster changed (player joined/left/disconnected)
    RoomUpdated { room: RoomInfo },

    /// Fresh per-viewer snapshot of the game
    Snapshot { state: GameSnapshot },

    /// A move was rejected; sent only to the offending client
    MoveRejected { reason: String },

    /// List of available rooms
    RoomList { rooms: Vec<RoomInfo> },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,
}

/// Room information for clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: Uuid,
    pub name: String,
    pub members: Vec<RoomMemberInfo>,
    pub manager_id: PlayerId,
    pub in_game: bool,
}

/// Room member information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomMemberInfo {
    pub id: PlayerId,
    pub username: String,
    pub manager: bool,
    pub online: bool,
}
