//! Aggregate board state for one game.
//!
//! Owns the player order (which doubles as the seat ↔ player-id mapping),
//! every player's board, the role assignment, the shared deck, the Rat, and
//! the per-round plan submissions and narration log.

use crate::district::{DistrictId, DistrictsDeck};
use crate::draft::Seat;
use crate::plan::PlanSubmission;
use crate::player::PlayerBoardState;
use crate::roles::{RoleAssignment, Viewer};
use crate::view::{BoardView, PlayerBoardView};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type PlayerId = Uuid;

/// Gold dealt to each player at setup.
const STARTING_STASH: u32 = 2;

/// Cards dealt to each player at setup.
const STARTING_HAND: usize = 4;

/// Phase within a running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Initial,
    ChooseCharacters,
    Planning,
    Resolution,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardState {
    pub players: HashMap<PlayerId, PlayerBoardState>,
    /// Turn order; position in this list is the seat index roles point at.
    pub player_order: Vec<PlayerId>,
    pub roles: RoleAssignment,
    pub phase: GamePhase,
    pub deck: DistrictsDeck,
    /// The last destroyed district, at most one.
    pub graveyard: Option<DistrictId>,
    pub plan_submissions: HashMap<PlayerId, PlanSubmission>,
    pub rat_player_id: Option<PlayerId>,
    /// Sticky once true, until the Rat is reassigned.
    pub rat_revealed: bool,
    pub resolution_log: Vec<String>,
}

impl BoardState {
    /// Deal a fresh board: shuffled deck, starting stash and hand for every
    /// player, a fresh role assignment and a randomly chosen Rat.
    pub fn new<R: Rng>(players: &[PlayerId], rng: &mut R) -> Self {
        let mut deck = DistrictsDeck::new(rng);
        let boards = players
            .iter()
            .map(|&id| {
                (
                    id,
                    PlayerBoardState::new(STARTING_STASH, deck.draw_cards(STARTING_HAND)),
                )
            })
            .collect();

        let mut board = Self {
            players: boards,
            player_order: players.to_vec(),
            roles: RoleAssignment::new(players.len()),
            phase: GamePhase::Initial,
            deck,
            graveyard: None,
            plan_submissions: HashMap::new(),
            rat_player_id: None,
            rat_revealed: false,
            resolution_log: Vec::new(),
        };
        board.assign_rat(rng);
        board
    }

    /// Pick a new Rat uniformly at random and clear the reveal flag.
    pub fn assign_rat<R: Rng>(&mut self, rng: &mut R) {
        let index = rng.gen_range(0..self.player_order.len());
        self.rat_player_id = Some(self.player_order[index]);
        self.rat_revealed = false;
    }

    pub fn seat_of(&self, player_id: PlayerId) -> Option<Seat> {
        self.player_order.iter().position(|&id| id == player_id)
    }

    pub fn player_at(&self, seat: Seat) -> Option<PlayerId> {
        self.player_order.get(seat).copied()
    }

    /// How a player id looks at exports: seated players see their own seat,
    /// everyone else is an all-seeing spectator.
    pub fn viewer_for(&self, player_id: PlayerId) -> Viewer {
        match self.seat_of(player_id) {
            Some(seat) => Viewer::Seat(seat),
            None => Viewer::Spectator,
        }
    }

    /// The seat expected to act right now: the drafter during drafting, the
    /// seat of the resolving role during resolution.
    pub fn current_seat(&self) -> Option<Seat> {
        match self.phase {
            GamePhase::ChooseCharacters => self.roles.draft.state().actor,
            GamePhase::Resolution => self.roles.current_seat(),
            _ => None,
        }
    }

    /// Rotate the player order left so `seat` becomes seat zero, re-basing
    /// every stored role position. The single point where the order changes.
    pub fn rotate_order_to(&mut self, seat: Seat) {
        if seat == 0 || seat >= self.player_order.len() {
            return;
        }
        self.player_order.rotate_left(seat);
        self.roles.shift_player_positions(seat);
    }

    /// Full snapshot of the board as one viewer sees it.
    pub fn export_for_player(&self, viewer_id: PlayerId) -> BoardView {
        let viewer = self.viewer_for(viewer_id);
        let viewer_is_rat = self.rat_player_id == Some(viewer_id);

        let players = self
            .player_order
            .iter()
            .filter_map(|&id| {
                let board = self.players.get(&id)?;
                let seat = self.seat_of(id)?;
                let can_see_hand = viewer.sees_seat(seat);
                Some((
                    id,
                    PlayerBoardView {
                        stash: board.stash,
                        hand: mask_cards(&board.hand, can_see_hand),
                        tmp_hand: mask_cards(&board.tmp_hand, can_see_hand),
                        city: board.city.clone(),
                        score: board.score,
                        roles: self.roles.export_player_roles(seat, viewer),
                        is_rat: (self.rat_revealed || (viewer_is_rat && id == viewer_id))
                            && self.rat_player_id == Some(id),
                    },
                ))
            })
            .collect();

        BoardView {
            players,
            phase: self.phase,
            player_order: self.player_order.clone(),
            current_seat: self.current_seat(),
            roles: self.roles.export_roles_list(viewer),
            graveyard: self.graveyard.clone(),
            rat_player_id: if self.rat_revealed || viewer_is_rat {
                self.rat_player_id
            } else {
                None
            },
            resolution_log: self.resolution_log.clone(),
        }
    }
}

/// Copy a hand, keeping length but hiding every card from outsiders.
fn mask_cards(cards: &[DistrictId], visible: bool) -> Vec<Option<DistrictId>> {
    cards
        .iter()
        .map(|id| visible.then(|| id.clone()))
        .collect()
}
