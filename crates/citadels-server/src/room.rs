//! Game room management.
//!
//! One room owns one engine instance. The room authenticates inbound moves
//! (stamping plan submissions with the sender's id), enforces the manager
//! privilege for game setup, and sends the follow-up automatic move the
//! engine expects once a draft completes.

use citadels_core::{
    GamePhase, GameProgress, GameSetup, GameSnapshot, GameState, Move, PlayerId, SetupError,
};
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::{RoomInfo, RoomMemberInfo};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Player not in room")]
    PlayerNotInRoom,

    #[error("Not the room manager")]
    NotManager,

    #[error("Invalid setup: {0}")]
    SetupRejected(#[from] SetupError),

    #[error("Illegal move for the current game state")]
    IllegalMove,
}

/// A game room holding one engine instance and its roster.
pub struct GameRoom {
    pub id: Uuid,
    pub name: String,
    pub manager_id: PlayerId,
    pub game: GameState,
}

impl GameRoom {
    pub fn new(id: Uuid, manager_id: PlayerId, manager_name: String) -> Self {
        let mut game = GameState::new();
        game.add_player(manager_id, manager_name.clone(), true);

        Self {
            id,
            name: format!("{}'s table", manager_name),
            manager_id,
            game,
        }
    }

    pub fn member_count(&self) -> usize {
        self.game.participants.len()
    }

    pub fn add_member(&mut self, player_id: PlayerId, username: String) {
        self.game.add_player(player_id, username, false);
    }

    /// Remove a member; returns true when the room is now empty.
    pub fn remove_member(&mut self, player_id: PlayerId) -> bool {
        self.game.remove_player(player_id);

        // If the manager left, promote the oldest remaining member.
        if player_id == self.manager_id {
            if let Some(next) = self.game.participants.first() {
                self.manager_id = next.id;
            }
            if let Some(p) = self
                .game
                .participants
                .iter_mut()
                .find(|p| p.id == self.manager_id)
            {
                p.manager = true;
            }
        }

        self.game.participants.is_empty()
    }

    pub fn set_member_online(&mut self, player_id: PlayerId, online: bool) {
        self.game.set_online(player_id, online);
    }

    /// Set up a game for the named subset; manager only. On success the
    /// engine's deal pause is queued straight away.
    pub fn setup(&mut self, requester_id: PlayerId, setup: GameSetup) -> Result<(), RoomError> {
        if !self.game.contains_player(requester_id) {
            return Err(RoomError::PlayerNotInRoom);
        }
        if requester_id != self.manager_id {
            return Err(RoomError::NotManager);
        }

        self.game.setup_game(setup)?;
        self.game.step(Move::Auto);
        Ok(())
    }

    /// Apply one inbound move on behalf of an authenticated player.
    pub fn handle_move(&mut self, player_id: PlayerId, mv: Move) -> Result<(), RoomError> {
        if !self.game.contains_player(player_id) {
            return Err(RoomError::PlayerNotInRoom);
        }

        // Plans count for the sender, whatever id the client wrote.
        let mv = match mv {
            Move::SubmitPlan { submission, .. } => Move::SubmitPlan {
                player_id,
                submission,
            },
            other => other,
        };

        if !self.game.step(mv) {
            return Err(RoomError::IllegalMove);
        }

        // A finished draft waits for a follow-up automatic move.
        let draft_done = self.game.board.as_ref().map_or(false, |board| {
            board.phase == GamePhase::ChooseCharacters && board.roles.draft.is_done()
        });
        if draft_done {
            self.game.step(Move::Auto);
        }

        Ok(())
    }

    /// One snapshot per roster member, each filtered for its viewer.
    pub fn snapshots(&self) -> Vec<(PlayerId, GameSnapshot)> {
        self.game
            .participants
            .iter()
            .filter_map(|p| Some((p.id, self.game.snapshot_for(p.id)?)))
            .collect()
    }

    pub fn to_info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            name: self.name.clone(),
            members: self
                .game
                .participants
                .iter()
                .map(|p| RoomMemberInfo {
                    id: p.id,
                    username: p.username.clone(),
                    manager: p.manager,
                    online: p.online,
                })
                .collect(),
            manager_id: self.manager_id,
            in_game: self.game.progress != GameProgress::InLobby,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citadels_core::PlanSubmission;

    fn room_with_members(count: usize) -> (GameRoom, Vec<PlayerId>) {
        let manager = Uuid::new_v4();
        let mut room = GameRoom::new(Uuid::new_v4(), manager, "Host".to_string());

        let mut ids = vec![manager];
        for i in 1..count {
            let id = Uuid::new_v4();
            room.add_member(id, format!("player-{i}"));
            ids.push(id);
        }
        (room, ids)
    }

    #[test]
    fn create_room_seats_the_manager() {
        let (room, ids) = room_with_members(1);
        assert_eq!(room.member_count(), 1);
        assert_eq!(room.manager_id, ids[0]);
        assert!(!room.to_info().in_game);
    }

    #[test]
    fn only_the_manager_may_set_up() {
        let (mut room, ids) = room_with_members(2);
        let setup = GameSetup {
            players: ids.clone(),
            complete_city_size: 8,
        };

        assert!(matches!(
            room.setup(ids[1], setup.clone()),
            Err(RoomError::NotManager)
        ));
        assert!(room.setup(ids[0], setup).is_ok());
        assert!(room.to_info().in_game);
        // Setup queued the deal pause.
        assert!(!room.game.take_scheduled_tasks().is_empty());
    }

    #[test]
    fn removing_the_manager_promotes_a_member() {
        let (mut room, ids) = room_with_members(3);

        assert!(!room.remove_member(ids[0]));
        assert_ne!(room.manager_id, ids[0]);
        assert!(room
            .game
            .get_player(room.manager_id)
            .is_some_and(|p| p.manager));

        room.remove_member(ids[1]);
        assert!(room.remove_member(ids[2]));
    }

    #[test]
    fn plan_submissions_are_stamped_with_the_sender() {
        let (mut room, ids) = room_with_members(2);
        room.setup(
            ids[0],
            GameSetup {
                players: ids.clone(),
                complete_city_size: 8,
            },
        )
        .unwrap();
        room.game.board.as_mut().unwrap().phase = GamePhase::Planning;

        // The client claims to submit for the other player; the room
        // overrides the id with the authenticated sender.
        room.handle_move(
            ids[1],
            Move::SubmitPlan {
                player_id: ids[0],
                submission: PlanSubmission::take_gold(),
            },
        )
        .unwrap();

        let board = room.game.board.as_ref().unwrap();
        assert!(board.plan_submissions.contains_key(&ids[1]));
        assert!(!board.plan_submissions.contains_key(&ids[0]));
    }

    #[test]
    fn illegal_moves_surface_as_errors() {
        let (mut room, ids) = room_with_members(2);
        room.setup(
            ids[0],
            GameSetup {
                players: ids.clone(),
                complete_city_size: 8,
            },
        )
        .unwrap();

        // Still in the initial deal pause: no picks yet.
        assert!(matches!(
            room.handle_move(ids[0], Move::ChooseCharacter { index: 0 }),
            Err(RoomError::IllegalMove)
        ));
        assert!(matches!(
            room.handle_move(Uuid::new_v4(), Move::Auto),
            Err(RoomError::PlayerNotInRoom)
        ));
    }
}
