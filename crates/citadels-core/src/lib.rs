//! Citadels - rules engine for a role-drafting strategy card game.
//!
//! This crate is the authoritative rules engine for a Citadels-family game
//! for 2-7 players with house-ruled roles and a hidden "Rat" bluffing
//! mechanic. It owns all game-legal state; every participant's view is a
//! filtered projection and no client-side computation is trusted.
//!
//! A round runs in three phases: roles are drafted through a small state
//! machine, every player submits one hidden plan simultaneously, and a
//! deterministic resolution pass applies the eight role turns in rank order
//! with their abilities, income and destruction/theft/assassination
//! interactions.
//!
//! # Modules
//!
//! - [`district`]: the static card catalog and the shared draw deck
//! - [`player`]: one player's stash, hand, city and score
//! - [`draft`]: the character-drafting state machine
//! - [`roles`]: role assignment and visibility projections
//! - [`plan`]: inbound moves and per-round plan submissions
//! - [`board`]: the aggregate board for one game
//! - [`view`]: per-viewer snapshot types
//! - [`game`]: the top-level orchestrator and resolution pass

pub mod board;
pub mod district;
pub mod draft;
pub mod game;
pub mod plan;
pub mod player;
pub mod roles;
pub mod view;

// Re-export commonly used types
pub use board::{BoardState, GamePhase, PlayerId};
pub use district::{catalog, DistrictCard, DistrictId, DistrictType, DistrictsDeck};
pub use draft::{CharacterDraft, DraftState, DraftStep, Seat};
pub use game::{
    GameProgress, GameSetup, GameState, Observer, Participant, ParticipantRole, ScheduledTask,
    SetupError,
};
pub use plan::{AbilityAction, BuildRequest, GatherAction, Move, PlanSubmission};
pub use player::{PlayerBoardState, ScoreBreakdown};
pub use roles::{rebase_position, Role, RoleAssignment, RolePosition, Viewer, ROLE_COUNT};
pub use view::{BoardView, GameSnapshot, PlayerBoardView, RosterEntry};
