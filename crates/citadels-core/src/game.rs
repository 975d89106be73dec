//! Top-level game orchestration.
//!
//! [`GameState`] owns the room roster and the board, drives the
//! lobby → setup → draft → planning → resolution → (next round | finished)
//! loop, and runs the round-resolution pass. External callers reach it only
//! through `setup_game`, `step`, `run_task` and the snapshot exports; after
//! every externally-visible change the attached observers are notified so
//! the transport layer can push fresh per-viewer snapshots.
//!
//! The engine never sleeps on its own. Transitions that want a delay are
//! pushed onto an internal task queue with their due time; the caller drains
//! the queue, waits, and calls [`GameState::run_task`], which re-checks that
//! the expected phase still holds before mutating (there is no cancellation,
//! so a task may fire after the world has moved on).

use crate::board::{BoardState, GamePhase, PlayerId};
use crate::district::{DistrictCard, DistrictType};
use crate::draft::DraftStep;
use crate::plan::{AbilityAction, GatherAction, Move, PlanSubmission};
use crate::roles::Role;
use crate::view::{GameSettings, GameSnapshot, RosterEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Pause before the dealt roles are revealed for drafting.
const DEAL_DELAY: Duration = Duration::from_secs(3);

/// Pause on the draft's initial step, simulating the dealer.
const DRAFT_REVEAL_DELAY: Duration = Duration::from_secs(3);

/// Pause between the last plan arriving and resolution.
const RESOLVE_DELAY: Duration = Duration::from_secs(1);

/// Gold the Rat gains for calling a raid.
const RAT_RAID_REWARD: u32 = 3;

/// Gold lost on a Rat accusation (by the Rat if correct, the accuser if not).
const ACCUSATION_PENALTY: u32 = 3;

/// Default win threshold.
const DEFAULT_COMPLETE_CITY_SIZE: usize = 8;

/// Gold gathered per turn; the Merchant takes one more.
const GATHER_GOLD: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameProgress {
    InLobby,
    InGame,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipantRole {
    Spectator,
    Player,
}

/// One room member as the engine knows them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: PlayerId,
    pub username: String,
    pub manager: bool,
    pub online: bool,
    pub role: ParticipantRole,
}

/// Setup payload naming the playing subset and the win threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSetup {
    pub players: Vec<PlayerId>,
    pub complete_city_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("player {0} is not in the room")]
    UnknownPlayer(PlayerId),

    #[error("player count {0} is out of range (1-8)")]
    PlayerCountOutOfRange(usize),
}

/// Deferred transition, re-validated when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTask {
    /// Initial deal pause is over: open the draft.
    BeginDraft,
    /// Draft reveal pause is over: leave the draft's initial step.
    OpenDraft,
    /// Planning is closed: run the resolution pass.
    Resolve,
}

/// Synchronous push notification target. Handlers are called in attach
/// order; a panicking handler is contained and the rest still run.
/// `Send + Sync` so an engine instance can live behind a shared map.
pub trait Observer: Send + Sync {
    fn update(&self);
}

pub struct GameState {
    pub progress: GameProgress,
    pub participants: Vec<Participant>,
    /// Created at setup, replaced by the next setup.
    pub board: Option<BoardState>,
    pub complete_city_size: usize,
    observers: Vec<(u64, Box<dyn Observer>)>,
    next_observer: u64,
    scheduled: Vec<(Duration, ScheduledTask)>,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            progress: GameProgress::InLobby,
            participants: Vec::new(),
            board: None,
            complete_city_size: DEFAULT_COMPLETE_CITY_SIZE,
            observers: Vec::new(),
            next_observer: 0,
            scheduled: Vec::new(),
        }
    }

    // ==================== Roster ====================

    /// Add a room member, replacing any previous entry with the same id.
    pub fn add_player(&mut self, id: PlayerId, username: impl Into<String>, manager: bool) {
        let participant = Participant {
            id,
            username: username.into(),
            manager,
            online: true,
            role: ParticipantRole::Player,
        };
        match self.participants.iter_mut().find(|p| p.id == id) {
            Some(existing) => *existing = participant,
            None => self.participants.push(participant),
        }
    }

    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p.id != id);
        self.participants.len() != before
    }

    pub fn contains_player(&self, id: PlayerId) -> bool {
        self.participants.iter().any(|p| p.id == id)
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn set_online(&mut self, id: PlayerId, online: bool) {
        if let Some(p) = self.participants.iter_mut().find(|p| p.id == id) {
            p.online = online;
        }
    }

    fn roster_names(&self) -> HashMap<PlayerId, String> {
        self.participants
            .iter()
            .map(|p| (p.id, p.username.clone()))
            .collect()
    }

    /// Seated in the current game with the playing role.
    fn is_active_player(&self, id: PlayerId) -> bool {
        let seated = self
            .board
            .as_ref()
            .map_or(false, |board| board.seat_of(id).is_some());
        seated
            && self
                .participants
                .iter()
                .any(|p| p.id == id && p.role == ParticipantRole::Player)
    }

    // ==================== Setup ====================

    pub fn validate_setup(&self, setup: &GameSetup) -> Result<(), SetupError> {
        for &id in &setup.players {
            if !self.contains_player(id) {
                return Err(SetupError::UnknownPlayer(id));
            }
        }
        if setup.players.is_empty() || setup.players.len() > 8 {
            return Err(SetupError::PlayerCountOutOfRange(setup.players.len()));
        }
        Ok(())
    }

    /// Start a game for the named subset. Everyone else becomes a
    /// spectator. Rejected before any board is created if validation fails.
    pub fn setup_game(&mut self, setup: GameSetup) -> Result<(), SetupError> {
        self.validate_setup(&setup)?;

        self.complete_city_size = setup.complete_city_size;
        for participant in &mut self.participants {
            participant.role = if setup.players.contains(&participant.id) {
                ParticipantRole::Player
            } else {
                ParticipantRole::Spectator
            };
        }
        self.board = Some(BoardState::new(&setup.players, &mut rand::thread_rng()));
        self.progress = GameProgress::InGame;
        debug!(players = setup.players.len(), "game set up");
        Ok(())
    }

    // ==================== Moves ====================

    /// Apply one inbound move. `false` means the move was illegal for the
    /// current state and nothing changed; the caller surfaces that to the
    /// offending client only.
    pub fn step(&mut self, mv: Move) -> bool {
        debug!(?mv, progress = ?self.progress, "step");
        if self.progress != GameProgress::InGame {
            return false;
        }
        let Some(phase) = self.board.as_ref().map(|board| board.phase) else {
            return false;
        };

        match phase {
            GamePhase::Initial => {
                if let Move::Auto = mv {
                    self.schedule(DEAL_DELAY, ScheduledTask::BeginDraft);
                    true
                } else {
                    false
                }
            }
            GamePhase::ChooseCharacters => self.handle_draft_move(mv),
            GamePhase::Planning => self.handle_planning_move(mv),
            GamePhase::Resolution => {
                if let Move::Auto = mv {
                    self.resolve_round();
                    true
                } else {
                    false
                }
            }
        }
    }

    fn handle_draft_move(&mut self, mv: Move) -> bool {
        let Some(state) = self.board.as_ref().map(|b| b.roles.draft.state()) else {
            return false;
        };
        let mut rng = rand::thread_rng();

        match state.step {
            DraftStep::Initial => {
                if let Move::Auto = mv {
                    self.schedule(DRAFT_REVEAL_DELAY, ScheduledTask::OpenDraft);
                    true
                } else {
                    false
                }
            }
            DraftStep::PutAsideFaceUp => {
                matches!(mv, Move::ChooseCharacter { .. })
                    && self
                        .board
                        .as_mut()
                        .unwrap()
                        .roles
                        .choose_random_character(true, &mut rng)
            }
            DraftStep::PutAsideFaceDown => {
                matches!(mv, Move::ChooseCharacter { .. })
                    && self
                        .board
                        .as_mut()
                        .unwrap()
                        .roles
                        .choose_random_character(false, &mut rng)
            }
            DraftStep::ChooseCharacter | DraftStep::PutAsideFaceDownUp => {
                if let Move::ChooseCharacter { index } = mv {
                    self.board
                        .as_mut()
                        .unwrap()
                        .roles
                        .choose_character(index, &mut rng)
                } else {
                    false
                }
            }
            DraftStep::Done => {
                if let Move::Auto = mv {
                    self.board.as_mut().unwrap().phase = GamePhase::Planning;
                    self.notify();
                    true
                } else {
                    false
                }
            }
            DraftStep::GetAsideFaceDown => false,
        }
    }

    fn handle_planning_move(&mut self, mv: Move) -> bool {
        let Move::SubmitPlan {
            player_id,
            submission,
        } = mv
        else {
            return false;
        };
        if !self.is_active_player(player_id) {
            return false;
        }

        let board = self.board.as_mut().unwrap();
        board.plan_submissions.insert(player_id, submission);

        let all_submitted = board
            .player_order
            .iter()
            .all(|id| board.plan_submissions.contains_key(id));
        if all_submitted {
            board.phase = GamePhase::Resolution;
            self.notify();
            self.schedule(RESOLVE_DELAY, ScheduledTask::Resolve);
        }

        self.notify();
        true
    }

    // ==================== Scheduled tasks ====================

    fn schedule(&mut self, delay: Duration, task: ScheduledTask) {
        self.scheduled.push((delay, task));
    }

    /// Drain the tasks queued since the last drain. The caller owns the
    /// waiting; each task comes back through [`GameState::run_task`].
    pub fn take_scheduled_tasks(&mut self) -> Vec<(Duration, ScheduledTask)> {
        std::mem::take(&mut self.scheduled)
    }

    /// Run a fired task. Returns `false` without mutating when the phase the
    /// task was scheduled for no longer holds (stale timer).
    pub fn run_task(&mut self, task: ScheduledTask) -> bool {
        let phase = self.board.as_ref().map(|board| board.phase);
        let in_game = self.progress == GameProgress::InGame;

        match task {
            ScheduledTask::BeginDraft => {
                if in_game && phase == Some(GamePhase::Initial) {
                    self.board.as_mut().unwrap().phase = GamePhase::ChooseCharacters;
                    self.step(Move::Auto);
                    self.notify();
                    true
                } else {
                    debug!(?task, "stale task ignored");
                    false
                }
            }
            ScheduledTask::OpenDraft => {
                let at_initial = self.board.as_ref().map_or(false, |board| {
                    board.roles.draft.state().step == DraftStep::Initial
                });
                if in_game && phase == Some(GamePhase::ChooseCharacters) && at_initial {
                    self.board.as_mut().unwrap().roles.draft.advance();
                    self.notify();
                    true
                } else {
                    debug!(?task, "stale task ignored");
                    false
                }
            }
            ScheduledTask::Resolve => {
                if in_game && phase == Some(GamePhase::Resolution) {
                    let resolved = self.step(Move::Auto);
                    self.notify();
                    resolved
                } else {
                    debug!(?task, "stale task ignored");
                    false
                }
            }
        }
    }

    // ==================== Round resolution ====================

    fn resolve_round(&mut self) {
        debug!("resolving round");

        let rat_active = self.board.as_ref().is_some_and(|board| {
            board.rat_player_id.is_some_and(|rat| {
                board
                    .plan_submissions
                    .get(&rat)
                    .is_some_and(|plan| plan.activate_rat)
            })
        });
        if rat_active {
            self.execute_rat_raid();
        }

        for role in Role::ALL {
            let Some((owner_id, plan)) = self.begin_role_turn(role) else {
                continue;
            };
            self.execute_role_turn(owner_id, role, &plan);
        }

        self.finish_round();
    }

    /// Mark `role` as the one resolving and fetch its actor and plan.
    /// `None` skips the role: unassigned, no submission, or assassinated.
    fn begin_role_turn(&mut self, role: Role) -> Option<(PlayerId, PlanSubmission)> {
        let board = self.board.as_mut()?;
        board.roles.current_role = Some(role);

        let seat = board.roles.owner(role)?;
        let owner_id = match board.player_at(seat) {
            Some(id) => id,
            None => {
                // Seat out of range: should not happen, but the round must
                // always run to completion.
                board
                    .resolution_log
                    .push(format!("{} has no seat and skips the round.", role.name()));
                return None;
            }
        };

        let plan = board.plan_submissions.get(&owner_id)?.clone();

        if board.roles.killed_role == Some(role) {
            board
                .resolution_log
                .push(format!("{} was assassinated and skips the round.", role.name()));
            return None;
        }

        Some((owner_id, plan))
    }

    fn execute_role_turn(&mut self, player_id: PlayerId, role: Role, plan: &PlanSubmission) {
        debug!(role = role.name(), "executing role turn");
        self.apply_ability(player_id, role, plan);
        self.apply_gather(player_id, role, plan);
        self.apply_rob_payout(player_id, role);
        self.apply_builds(player_id, role, plan);
        self.apply_role_income(player_id, role);
    }

    /// Role abilities run before gather and build. A payload that does not
    /// match the acting role, or targets outside valid range, is ignored
    /// without voiding the rest of the plan.
    fn apply_ability(&mut self, player_id: PlayerId, role: Role, plan: &PlanSubmission) {
        let Some(ability) = plan.ability.clone() else {
            return;
        };

        match (role, ability) {
            (Role::Assassin, AbilityAction::Kill { rank }) => {
                if let Some(target) = Role::from_rank(rank) {
                    if target != Role::Assassin {
                        self.board.as_mut().unwrap().roles.killed_role = Some(target);
                    }
                }
            }
            (Role::Thief, AbilityAction::Rob { rank }) => {
                if let Some(target) = Role::from_rank(rank) {
                    if !matches!(target, Role::Thief | Role::Assassin | Role::King) {
                        self.board.as_mut().unwrap().roles.robbed_role = Some(target);
                    }
                }
            }
            (Role::Magician, AbilityAction::SwapHand { seat }) => {
                self.swap_hands(player_id, seat);
            }
            (Role::Magician, AbilityAction::DiscardHand) => {
                self.redraw_hand(player_id);
            }
            (Role::Warlord, AbilityAction::AccuseRat { seat }) => {
                self.accuse_rat(player_id, seat);
            }
            (Role::Warlord, AbilityAction::DestroyDistrict { seat, district_id }) => {
                self.destroy_in_city(player_id, seat, &district_id);
            }
            (role, ability) => {
                debug!(role = role.name(), ?ability, "ability does not match role; ignored");
            }
        }
    }

    fn swap_hands(&mut self, player_id: PlayerId, seat: usize) {
        let board = self.board.as_mut().unwrap();
        let Some(target_id) = board.player_at(seat) else {
            return;
        };
        if target_id == player_id || !board.players.contains_key(&target_id) {
            return;
        }

        let mine = match board.players.get_mut(&player_id) {
            Some(player) => std::mem::take(&mut player.hand),
            None => return,
        };
        let theirs = std::mem::replace(&mut board.players.get_mut(&target_id).unwrap().hand, mine);
        board.players.get_mut(&player_id).unwrap().hand = theirs;
    }

    fn redraw_hand(&mut self, player_id: PlayerId) {
        let board = self.board.as_mut().unwrap();
        let old_hand = match board.players.get_mut(&player_id) {
            Some(player) => std::mem::take(&mut player.hand),
            None => return,
        };
        board.deck.discard_cards(&old_hand);
        let drawn = board.deck.draw_cards(old_hand.len());
        if let Some(player) = board.players.get_mut(&player_id) {
            player.add_cards_to_hand(drawn);
        }
    }

    fn accuse_rat(&mut self, player_id: PlayerId, seat: usize) {
        let board = self.board.as_mut().unwrap();
        let Some(accused_id) = board.player_at(seat) else {
            return;
        };

        if board.rat_player_id == Some(accused_id) {
            if let Some(rat) = board.players.get_mut(&accused_id) {
                rat.stash = rat.stash.saturating_sub(ACCUSATION_PENALTY);
            }
            board.rat_revealed = true;
        } else if let Some(accuser) = board.players.get_mut(&player_id) {
            accuser.stash = accuser.stash.saturating_sub(ACCUSATION_PENALTY);
        }
    }

    fn destroy_in_city(&mut self, player_id: PlayerId, seat: usize, district_id: &str) {
        let names = self.roster_names();
        let board = self.board.as_mut().unwrap();
        let Some(target_id) = board.player_at(seat) else {
            return;
        };
        let Some(card) = DistrictCard::get(district_id) else {
            return;
        };

        // Religious districts are protected while the Bishop is in play.
        if card.district_type == DistrictType::Religious
            && board.roles.owner(Role::Bishop).is_some()
            && board.roles.killed_role != Some(Role::Bishop)
        {
            board.resolution_log.push(format!(
                "Destruction of {district_id} failed: protected by the Bishop."
            ));
            return;
        }

        let Some(cost) = board
            .players
            .get(&target_id)
            .and_then(|target| target.destroy_cost(district_id))
        else {
            return;
        };
        let affordable = board
            .players
            .get(&player_id)
            .map_or(false, |player| player.stash >= cost);
        if !affordable {
            return;
        }

        board.players.get_mut(&player_id).unwrap().stash -= cost;
        board
            .players
            .get_mut(&target_id)
            .unwrap()
            .destroy_district(district_id);
        board.graveyard = Some(district_id.to_string());
        let target_name = names.get(&target_id).cloned().unwrap_or_default();
        board.resolution_log.push(format!(
            "The Warlord razed {district_id} in {target_name}'s city."
        ));
    }

    fn apply_gather(&mut self, player_id: PlayerId, role: Role, plan: &PlanSubmission) {
        let board = self.board.as_mut().unwrap();
        let Some(player) = board.players.get_mut(&player_id) else {
            return;
        };

        match plan.gather {
            GatherAction::TakeGold => {
                player.stash += if role == Role::Merchant {
                    GATHER_GOLD + 1
                } else {
                    GATHER_GOLD
                };
            }
            GatherAction::DrawCards => {
                let (draw, keep) = if role == Role::Architect { (4, 2) } else { (2, 1) };
                let draw = draw + player.draw_bonus();
                player.gather_cards(&mut board.deck, draw, keep);
            }
        }
    }

    /// Evaluated right after the victim's gather, so the stolen stash
    /// includes this turn's income.
    fn apply_rob_payout(&mut self, player_id: PlayerId, role: Role) {
        let board = self.board.as_mut().unwrap();
        if board.roles.robbed_role != Some(role) {
            return;
        }
        let Some(thief_id) = board.roles.owner(Role::Thief).and_then(|s| board.player_at(s)) else {
            return;
        };

        let stolen = match board.players.get_mut(&player_id) {
            Some(victim) => std::mem::take(&mut victim.stash),
            None => return,
        };
        if let Some(thief) = board.players.get_mut(&thief_id) {
            thief.stash += stolen;
        }
    }

    fn apply_builds(&mut self, player_id: PlayerId, role: Role, plan: &PlanSubmission) {
        let board = self.board.as_mut().unwrap();
        let Some(player) = board.players.get_mut(&player_id) else {
            return;
        };

        let mut built = 0;
        for request in &plan.builds {
            if built >= role.build_limit() {
                break;
            }
            if player.build_district(&request.district_id) {
                built += 1;
            }
        }
    }

    fn apply_role_income(&mut self, player_id: PlayerId, role: Role) {
        let Some(district_type) = role.income_type() else {
            return;
        };
        let board = self.board.as_mut().unwrap();
        if let Some(player) = board.players.get_mut(&player_id) {
            let earnings = player.earnings_for(district_type);
            player.stash += earnings;
        }
    }

    fn execute_rat_raid(&mut self) {
        let names = self.roster_names();
        let Some(board) = self.board.as_mut() else {
            return;
        };
        let Some(rat_id) = board.rat_player_id else {
            return;
        };

        board
            .resolution_log
            .push("The Rat tipped off the authorities: a raid hits the richest stash!".to_string());

        let richest_stash = board
            .player_order
            .iter()
            .filter_map(|id| board.players.get(id))
            .map(|player| player.stash)
            .max()
            .unwrap_or(0);
        let richest: Vec<PlayerId> = board
            .player_order
            .iter()
            .copied()
            .filter(|id| {
                board
                    .players
                    .get(id)
                    .map_or(false, |player| player.stash == richest_stash)
            })
            .collect();

        for id in richest {
            let Some(player) = board.players.get_mut(&id) else {
                continue;
            };
            let loss = player.stash / 2;
            player.stash -= loss;
            let name = names.get(&id).cloned().unwrap_or_default();
            board
                .resolution_log
                .push(format!("{name} lost {loss} gold in the raid."));
        }

        if let Some(rat) = board.players.get_mut(&rat_id) {
            rat.stash += RAT_RAID_REWARD;
        }
    }

    /// End-of-round bookkeeping: finish the game, or roll into a new round
    /// with a fresh draft, a new Rat, and the crown holder seated first.
    fn finish_round(&mut self) {
        let complete_city_size = self.complete_city_size;
        let Some(board) = self.board.as_mut() else {
            return;
        };

        let game_over = board
            .players
            .values()
            .any(|player| player.city_size() >= complete_city_size);

        if game_over {
            for player in board.players.values_mut() {
                player.compute_score(complete_city_size);
            }
            self.progress = GameProgress::Finished;
            debug!("game finished");
        } else {
            let crown_seat = board.roles.owner(Role::King);
            board.phase = GamePhase::ChooseCharacters;
            board.roles.reset();
            board.plan_submissions.clear();
            board.resolution_log.clear();
            board.assign_rat(&mut rand::thread_rng());
            if let Some(seat) = crown_seat {
                board.rotate_order_to(seat);
            }
            self.notify();
        }
    }

    // ==================== Exports ====================

    /// Snapshot for one room member. `None` for ids outside the room.
    pub fn snapshot_for(&self, viewer_id: PlayerId) -> Option<GameSnapshot> {
        if !self.contains_player(viewer_id) {
            return None;
        }
        Some(GameSnapshot {
            progress: self.progress,
            players: self
                .participants
                .iter()
                .map(|p| RosterEntry {
                    id: p.id,
                    username: p.username.clone(),
                    manager: p.manager,
                    online: p.online,
                    role: p.role,
                })
                .collect(),
            self_id: viewer_id,
            board: self
                .board
                .as_ref()
                .map(|board| board.export_for_player(viewer_id)),
            settings: GameSettings {
                complete_city_size: self.complete_city_size,
            },
        })
    }

    // ==================== Observers ====================

    /// Attach a handler; the returned handle detaches it.
    pub fn attach(&mut self, observer: Box<dyn Observer>) -> u64 {
        let handle = self.next_observer;
        self.next_observer += 1;
        self.observers.push((handle, observer));
        handle
    }

    pub fn detach(&mut self, handle: u64) {
        self.observers.retain(|(id, _)| *id != handle);
    }

    /// Notify every observer in attach order. A panicking observer is
    /// contained so the rest still get the notification.
    pub fn notify(&self) {
        for (handle, observer) in &self.observers {
            if catch_unwind(AssertUnwindSafe(|| observer.update())).is_err() {
                warn!(observer = *handle, "observer panicked during notify");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    fn roster(game: &mut GameState, count: usize) -> Vec<PlayerId> {
        let ids: Vec<PlayerId> = (0..count).map(|_| Uuid::new_v4()).collect();
        for (i, &id) in ids.iter().enumerate() {
            game.add_player(id, format!("player-{i}"), i == 0);
        }
        ids
    }

    #[test]
    fn setup_rejects_unknown_players() {
        let mut game = GameState::new();
        let ids = roster(&mut game, 2);

        let stranger = Uuid::new_v4();
        let result = game.setup_game(GameSetup {
            players: vec![ids[0], stranger],
            complete_city_size: 8,
        });
        assert_eq!(result, Err(SetupError::UnknownPlayer(stranger)));
        assert!(game.board.is_none());
        assert_eq!(game.progress, GameProgress::InLobby);
    }

    #[test]
    fn setup_rejects_empty_player_list() {
        let mut game = GameState::new();
        roster(&mut game, 2);

        let result = game.setup_game(GameSetup {
            players: vec![],
            complete_city_size: 8,
        });
        assert_eq!(result, Err(SetupError::PlayerCountOutOfRange(0)));
        assert!(game.board.is_none());
    }

    #[test]
    fn setup_marks_non_playing_members_as_spectators() {
        let mut game = GameState::new();
        let ids = roster(&mut game, 3);

        game.setup_game(GameSetup {
            players: vec![ids[0], ids[1]],
            complete_city_size: 8,
        })
        .unwrap();

        assert_eq!(game.progress, GameProgress::InGame);
        assert_eq!(game.get_player(ids[0]).unwrap().role, ParticipantRole::Player);
        assert_eq!(
            game.get_player(ids[2]).unwrap().role,
            ParticipantRole::Spectator
        );
        assert_eq!(game.board.as_ref().unwrap().player_order.len(), 2);
    }

    #[test]
    fn initial_phase_schedules_the_deal() {
        let mut game = GameState::new();
        let ids = roster(&mut game, 2);
        game.setup_game(GameSetup {
            players: ids.clone(),
            complete_city_size: 8,
        })
        .unwrap();

        assert!(game.step(Move::Auto));
        let tasks = game.take_scheduled_tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].1, ScheduledTask::BeginDraft);
        assert!(game.take_scheduled_tasks().is_empty());

        assert!(game.run_task(ScheduledTask::BeginDraft));
        assert_eq!(
            game.board.as_ref().unwrap().phase,
            GamePhase::ChooseCharacters
        );
        // The draft reveal pause is queued in turn.
        let tasks = game.take_scheduled_tasks();
        assert_eq!(tasks[0].1, ScheduledTask::OpenDraft);
    }

    #[test]
    fn stale_task_is_ignored() {
        let mut game = GameState::new();
        let ids = roster(&mut game, 2);
        game.setup_game(GameSetup {
            players: ids.clone(),
            complete_city_size: 8,
        })
        .unwrap();

        game.step(Move::Auto);
        game.run_task(ScheduledTask::BeginDraft);

        // A duplicate of an already-run task finds the phase gone.
        let before_phase = game.board.as_ref().unwrap().phase;
        assert!(!game.run_task(ScheduledTask::BeginDraft));
        assert_eq!(game.board.as_ref().unwrap().phase, before_phase);

        assert!(!game.run_task(ScheduledTask::Resolve));
    }

    #[test]
    fn spectators_cannot_submit_plans() {
        let mut game = GameState::new();
        let ids = roster(&mut game, 3);
        game.setup_game(GameSetup {
            players: vec![ids[0], ids[1]],
            complete_city_size: 8,
        })
        .unwrap();
        game.board.as_mut().unwrap().phase = GamePhase::Planning;

        let rejected = game.step(Move::SubmitPlan {
            player_id: ids[2],
            submission: PlanSubmission::take_gold(),
        });
        assert!(!rejected);
        assert!(game
            .board
            .as_ref()
            .unwrap()
            .plan_submissions
            .is_empty());
    }

    #[test]
    fn resolution_triggers_once_all_plans_arrive() {
        let mut game = GameState::new();
        let ids = roster(&mut game, 2);
        game.setup_game(GameSetup {
            players: ids.clone(),
            complete_city_size: 8,
        })
        .unwrap();
        game.board.as_mut().unwrap().phase = GamePhase::Planning;

        assert!(game.step(Move::SubmitPlan {
            player_id: ids[0],
            submission: PlanSubmission::take_gold(),
        }));
        assert_eq!(game.board.as_ref().unwrap().phase, GamePhase::Planning);
        assert!(game.take_scheduled_tasks().is_empty());

        // Resubmission overwrites, still waiting for the other player.
        assert!(game.step(Move::SubmitPlan {
            player_id: ids[0],
            submission: PlanSubmission::take_gold(),
        }));

        assert!(game.step(Move::SubmitPlan {
            player_id: ids[1],
            submission: PlanSubmission::take_gold(),
        }));
        assert_eq!(game.board.as_ref().unwrap().phase, GamePhase::Resolution);
        let tasks = game.take_scheduled_tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].1, ScheduledTask::Resolve);
    }

    struct CountingObserver(Arc<AtomicUsize>);
    impl Observer for CountingObserver {
        fn update(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct PanickingObserver;
    impl Observer for PanickingObserver {
        fn update(&self) {
            panic!("observer failure");
        }
    }

    #[test]
    fn panicking_observer_does_not_block_the_rest() {
        let mut game = GameState::new();
        let count = Arc::new(AtomicUsize::new(0));

        game.attach(Box::new(PanickingObserver));
        game.attach(Box::new(CountingObserver(Arc::clone(&count))));

        game.notify();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn detached_observer_stops_receiving() {
        let mut game = GameState::new();
        let count = Arc::new(AtomicUsize::new(0));

        let handle = game.attach(Box::new(CountingObserver(Arc::clone(&count))));
        game.notify();
        game.detach(handle);
        game.notify();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn legacy_moves_are_rejected_in_every_phase() {
        let mut game = GameState::new();
        let ids = roster(&mut game, 2);
        game.setup_game(GameSetup {
            players: ids.clone(),
            complete_city_size: 8,
        })
        .unwrap();

        for phase in [
            GamePhase::Initial,
            GamePhase::ChooseCharacters,
            GamePhase::Planning,
            GamePhase::Resolution,
        ] {
            game.board.as_mut().unwrap().phase = phase;
            assert!(!game.step(Move::TakeGold), "{phase:?}");
            assert!(!game.step(Move::FinishTurn), "{phase:?}");
            assert!(
                !game.step(Move::BuildDistrict {
                    district_id: "temple".to_string()
                }),
                "{phase:?}"
            );
        }
    }
}
