//! Per-viewer projections of game state.
//!
//! Everything a client ever sees is one of these types, produced by the
//! export methods on [`crate::roles::RoleAssignment`], [`crate::board::BoardState`]
//! and [`crate::game::GameState`]. Exports are copies filtered for one
//! viewer; handing one to a client can never leak hidden state or let the
//! client mutate the engine.

use crate::board::{GamePhase, PlayerId};
use crate::district::DistrictId;
use crate::draft::{DraftState, Seat};
use crate::game::{GameProgress, ParticipantRole};
use crate::player::ScoreBreakdown;
use crate::roles::Role;
use serde::{Deserialize, Serialize};

/// One role owned by a seat, masked to `None` when the viewer may not see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleView {
    pub role: Option<Role>,
    pub killed: bool,
    pub robbed: bool,
}

/// One entry of the draft-board role list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableRoleView {
    /// Masked to `None` for viewers who may not see the pool.
    pub role: Option<Role>,
    /// Whether this viewer may pick the entry right now.
    pub selectable: bool,
    pub killed: bool,
    pub robbed: bool,
}

/// A role set aside during drafting; face-down cards are masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsideRoleView {
    pub role: Option<Role>,
}

/// State-dependent projection of the role pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftBoardView {
    pub state: DraftState,
    /// Role currently being resolved, if resolution has started.
    pub current: Option<Role>,
    pub callable: Vec<CallableRoleView>,
    pub aside: Vec<AsideRoleView>,
}

/// One player's board as a given viewer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerBoardView {
    pub stash: u32,
    /// Hidden hands keep their length but every entry is `None`.
    pub hand: Vec<Option<DistrictId>>,
    pub tmp_hand: Vec<Option<DistrictId>>,
    pub city: Vec<DistrictId>,
    pub score: ScoreBreakdown,
    pub roles: Vec<RoleView>,
    pub is_rat: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardView {
    pub players: Vec<(PlayerId, PlayerBoardView)>,
    pub phase: GamePhase,
    pub player_order: Vec<PlayerId>,
    pub current_seat: Option<Seat>,
    pub roles: DraftBoardView,
    pub graveyard: Option<DistrictId>,
    /// Masked unless revealed or the viewer holds the Rat.
    pub rat_player_id: Option<PlayerId>,
    pub resolution_log: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub username: String,
    pub manager: bool,
    pub online: bool,
    pub role: ParticipantRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    pub complete_city_size: usize,
}

/// The full snapshot pushed to one viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub progress: GameProgress,
    pub players: Vec<RosterEntry>,
    pub self_id: PlayerId,
    pub board: Option<BoardView>,
    pub settings: GameSettings,
}
