//! Role identities and per-round role assignment.
//!
//! [`RoleAssignment`] owns the total mapping from each of the eight roles to
//! its position on the board (unassigned, aside, or a seat), drives the
//! drafting automaton, and computes the visibility-filtered projections of
//! role ownership. A role's true identity is visible to its owner, to
//! spectators, and to everyone once the role has begun acting in the current
//! resolution pass.

use crate::district::DistrictType;
use crate::draft::{CharacterDraft, DraftStep, Seat};
use crate::view::{AsideRoleView, CallableRoleView, DraftBoardView, RoleView};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const ROLE_COUNT: usize = 8;

// The positions array is a total mapping over the role enumeration.
const _: () = assert!(Role::ALL.len() == ROLE_COUNT);

/// The eight character roles, in rank (resolution) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Assassin,
    Thief,
    Magician,
    King,
    Bishop,
    Merchant,
    Architect,
    Warlord,
}

impl Role {
    pub const ALL: [Role; ROLE_COUNT] = [
        Role::Assassin,
        Role::Thief,
        Role::Magician,
        Role::King,
        Role::Bishop,
        Role::Merchant,
        Role::Architect,
        Role::Warlord,
    ];

    /// Resolution rank, 1 through 8.
    pub fn rank(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_rank(rank: u8) -> Option<Role> {
        let index = rank.checked_sub(1)? as usize;
        Role::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Assassin => "Assassin",
            Role::Thief => "Thief",
            Role::Magician => "Magician",
            Role::King => "King",
            Role::Bishop => "Bishop",
            Role::Merchant => "Merchant",
            Role::Architect => "Architect",
            Role::Warlord => "Warlord",
        }
    }

    /// Color whose built districts pay this role income, for the three
    /// income roles.
    pub fn income_type(self) -> Option<DistrictType> {
        match self {
            Role::King => Some(DistrictType::Noble),
            Role::Bishop => Some(DistrictType::Religious),
            Role::Merchant => Some(DistrictType::Trade),
            _ => None,
        }
    }

    /// Districts this role may build in one round.
    pub fn build_limit(self) -> usize {
        match self {
            Role::Architect => 3,
            _ => 1,
        }
    }
}

/// Where a role sits this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RolePosition {
    NotChosen,
    AsideFaceUp,
    AsideFaceDown,
    Seat(Seat),
}

/// Re-base a position after the player order rotates left by `amount`.
/// Pure so the rotation arithmetic is testable on its own.
pub fn rebase_position(pos: RolePosition, amount: usize, player_count: usize) -> RolePosition {
    match pos {
        RolePosition::Seat(seat) if player_count > 0 => {
            RolePosition::Seat((seat + player_count - amount % player_count) % player_count)
        }
        other => other,
    }
}

/// Who is looking at an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    /// All-seeing: sees every hand and every assigned role.
    Spectator,
    Seat(Seat),
}

impl Viewer {
    pub fn sees_seat(self, seat: Seat) -> bool {
        match self {
            Viewer::Spectator => true,
            Viewer::Seat(own) => own == seat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub player_count: usize,
    /// Total mapping, indexed by role rank.
    pub positions: [RolePosition; ROLE_COUNT],
    pub draft: CharacterDraft,
    pub killed_role: Option<Role>,
    pub robbed_role: Option<Role>,
    /// Role currently being resolved; `None` outside resolution.
    pub current_role: Option<Role>,
}

impl RoleAssignment {
    pub fn new(player_count: usize) -> Self {
        Self {
            player_count,
            positions: [RolePosition::NotChosen; ROLE_COUNT],
            draft: CharacterDraft::new(player_count),
            killed_role: None,
            robbed_role: None,
            current_role: None,
        }
    }

    /// Clear everything for a new draft.
    pub fn reset(&mut self) {
        self.positions = [RolePosition::NotChosen; ROLE_COUNT];
        self.draft.reset();
        self.killed_role = None;
        self.robbed_role = None;
        self.current_role = None;
    }

    pub fn position(&self, role: Role) -> RolePosition {
        self.positions[role as usize]
    }

    fn set_position(&mut self, role: Role, pos: RolePosition) {
        self.positions[role as usize] = pos;
    }

    /// Roles at a given position, in rank order. The order of the
    /// unassigned list is what `choose_character` indexes into and what the
    /// draft projections show, so it must stay deterministic.
    pub fn roles_at(&self, pos: RolePosition) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|&role| self.position(role) == pos)
            .collect()
    }

    pub fn unassigned(&self) -> Vec<Role> {
        self.roles_at(RolePosition::NotChosen)
    }

    /// Seat holding a role, if any.
    pub fn owner(&self, role: Role) -> Option<Seat> {
        match self.position(role) {
            RolePosition::Seat(seat) => Some(seat),
            _ => None,
        }
    }

    /// Seat of the role currently being resolved.
    pub fn current_seat(&self) -> Option<Seat> {
        self.owner(self.current_role?)
    }

    fn is_revealed(&self, role: Role) -> bool {
        self.current_role
            .map_or(false, |current| current.rank() >= role.rank())
    }

    /// Apply the acting party's pick: `index` into the unassigned list.
    /// Fails without mutation when the index is out of range, no one may act,
    /// or the automaton is not at a choosing step. On success the automaton
    /// advances and drains every automatic step that follows.
    pub fn choose_character<R: Rng>(&mut self, index: usize, rng: &mut R) -> bool {
        let pool = self.unassigned();
        if index >= pool.len() {
            return false;
        }

        let state = self.draft.state();
        let Some(actor) = state.actor else {
            return false;
        };

        match state.step {
            DraftStep::PutAsideFaceUp => {
                self.set_position(pool[index], RolePosition::AsideFaceUp);
            }
            DraftStep::PutAsideFaceDown | DraftStep::PutAsideFaceDownUp => {
                self.set_position(pool[index], RolePosition::AsideFaceDown);
            }
            DraftStep::ChooseCharacter => {
                self.set_position(pool[index], RolePosition::Seat(actor));
            }
            _ => return false,
        }

        self.draft.advance();
        self.drain_automatic_steps(rng);
        true
    }

    /// Pick uniformly at random for an aside step, keeping the crown role in
    /// the pool when `avoid_crown` is set and an alternative remains.
    pub fn choose_random_character<R: Rng>(&mut self, avoid_crown: bool, rng: &mut R) -> bool {
        let pool = self.unassigned();
        if pool.is_empty() {
            return false;
        }

        let mut index = rng.gen_range(0..pool.len());
        while avoid_crown && pool.len() > 1 && pool[index] == Role::King {
            index = rng.gen_range(0..pool.len());
        }

        self.choose_character(index, rng)
    }

    /// Run every automaton step that needs no human input.
    fn drain_automatic_steps<R: Rng>(&mut self, rng: &mut R) {
        while self.draft.state().actor.is_none() {
            match self.draft.state().step {
                DraftStep::GetAsideFaceDown => {
                    if let Some(role) = self.roles_at(RolePosition::AsideFaceDown).first().copied()
                    {
                        self.set_position(role, RolePosition::NotChosen);
                    }
                }
                DraftStep::PutAsideFaceDown => {
                    let pool = self.unassigned();
                    if !pool.is_empty() {
                        let role = pool[rng.gen_range(0..pool.len())];
                        self.set_position(role, RolePosition::AsideFaceDown);
                    }
                }
                DraftStep::Done | DraftStep::Initial => return,
                _ => {}
            }
            self.draft.advance();
        }
    }

    /// Re-base every seat position after the player order rotates left by
    /// `amount`.
    pub fn shift_player_positions(&mut self, amount: usize) {
        for pos in self.positions.iter_mut() {
            *pos = rebase_position(*pos, amount, self.player_count);
        }
    }

    /// The roles a seat holds, as seen by `viewer`. Unrevealed roles of
    /// other seats are masked; killed/robbed flags are set only on visible
    /// entries.
    pub fn export_player_roles(&self, owner_seat: Seat, viewer: Viewer) -> Vec<RoleView> {
        self.roles_at(RolePosition::Seat(owner_seat))
            .into_iter()
            .map(|role| {
                let visible = viewer.sees_seat(owner_seat) || self.is_revealed(role);
                RoleView {
                    role: visible.then_some(role),
                    killed: visible && self.killed_role == Some(role),
                    robbed: visible && self.robbed_role == Some(role),
                }
            })
            .collect()
    }

    /// State-dependent projection of the role pool for one viewer.
    pub fn export_roles_list(&self, viewer: Viewer) -> DraftBoardView {
        match self.draft.state().step {
            DraftStep::Initial => self.export_list_initial(),
            DraftStep::PutAsideFaceUp
            | DraftStep::PutAsideFaceDown
            | DraftStep::GetAsideFaceDown => self.export_list_choosing(viewer, false),
            DraftStep::PutAsideFaceDownUp | DraftStep::ChooseCharacter => {
                self.export_list_choosing(viewer, true)
            }
            DraftStep::Done => self.export_list_done(),
        }
    }

    fn export_list_initial(&self) -> DraftBoardView {
        DraftBoardView {
            state: self.draft.state(),
            current: None,
            callable: Role::ALL
                .into_iter()
                .map(|role| CallableRoleView {
                    role: Some(role),
                    selectable: false,
                    killed: false,
                    robbed: false,
                })
                .collect(),
            aside: Vec::new(),
        }
    }

    fn export_list_choosing(&self, viewer: Viewer, can_see: bool) -> DraftBoardView {
        let state = self.draft.state();
        let viewer_is_actor = matches!((state.actor, viewer), (Some(a), Viewer::Seat(s)) if a == s);
        let can_see_list = can_see && (viewer_is_actor || viewer == Viewer::Spectator);

        DraftBoardView {
            state,
            current: self.current_role,
            callable: self
                .unassigned()
                .into_iter()
                .map(|role| CallableRoleView {
                    role: can_see_list.then_some(role),
                    selectable: viewer_is_actor,
                    killed: false,
                    robbed: false,
                })
                .collect(),
            aside: self.export_aside(),
        }
    }

    fn export_list_done(&self) -> DraftBoardView {
        DraftBoardView {
            state: self.draft.state(),
            current: self.current_role,
            // Every role that might still act: the full set minus the
            // publicly known face-up discards.
            callable: Role::ALL
                .into_iter()
                .filter(|&role| self.position(role) != RolePosition::AsideFaceUp)
                .map(|role| CallableRoleView {
                    role: Some(role),
                    selectable: false,
                    killed: self.killed_role == Some(role),
                    robbed: self.robbed_role == Some(role),
                })
                .collect(),
            aside: self.export_aside(),
        }
    }

    /// Aside cards: face-down ones masked, face-up ones shown to everyone.
    fn export_aside(&self) -> Vec<AsideRoleView> {
        let mut aside: Vec<AsideRoleView> = self
            .roles_at(RolePosition::AsideFaceDown)
            .into_iter()
            .map(|_| AsideRoleView { role: None })
            .collect();
        aside.extend(
            self.roles_at(RolePosition::AsideFaceUp)
                .into_iter()
                .map(|role| AsideRoleView { role: Some(role) }),
        );
        aside
    }
}
