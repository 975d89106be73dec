//! Moves and plan submissions.
//!
//! A move is the single inbound value per player action, shaped
//! `{ type, data }` on the wire. Plans are submitted once per player per
//! round and resolved together; ability payloads are closed tagged variants
//! so a payload that does not fit the acting role is rejected as a whole.

use crate::board::PlayerId;
use crate::district::DistrictId;
use crate::draft::Seat;
use serde::{Deserialize, Serialize};

/// The gather choice every plan makes: take gold or draw cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatherAction {
    TakeGold,
    DrawCards,
}

/// One requested build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub district_id: DistrictId,
}

/// Role-ability payloads. Target ranks and seats are range-checked at
/// resolution; out-of-range values silently void the ability and nothing
/// else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbilityAction {
    /// Assassin: the target role skips its turn this round.
    Kill { rank: u8 },
    /// Thief: the target role's stash is stolen when its turn begins.
    Rob { rank: u8 },
    /// Magician: swap hands with a seat.
    SwapHand { seat: Seat },
    /// Magician: discard the whole hand and redraw as many cards.
    DiscardHand,
    /// Warlord: accuse a seat of being the Rat.
    AccuseRat { seat: Seat },
    /// Warlord: pay to remove a district from a seat's city.
    DestroyDistrict { seat: Seat, district_id: DistrictId },
}

/// One player's plan for a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSubmission {
    pub gather: GatherAction,
    #[serde(default)]
    pub builds: Vec<BuildRequest>,
    #[serde(default)]
    pub ability: Option<AbilityAction>,
    /// Only meaningful when submitted by the Rat holder.
    #[serde(default)]
    pub activate_rat: bool,
}

impl PlanSubmission {
    /// A minimal legal plan: gather gold, build nothing.
    pub fn take_gold() -> Self {
        Self {
            gather: GatherAction::TakeGold,
            builds: Vec::new(),
            ability: None,
            activate_rat: false,
        }
    }
}

/// Every inbound move. The per-action variants after `SubmitPlan` are kept
/// for older turn-based clients; the simultaneous-planning engine rejects
/// them in every phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Move {
    /// Engine-driven transition with no acting player.
    Auto,
    /// Pick the `index`-th entry of the unassigned role list.
    ChooseCharacter { index: usize },
    SubmitPlan {
        player_id: PlayerId,
        submission: PlanSubmission,
    },

    TakeGold,
    DrawCards,
    Assassinate { rank: u8 },
    Rob { rank: u8 },
    ExchangeHand { seat: Seat },
    DiscardCards,
    DestroyDistrict { seat: Seat, district_id: DistrictId },
    BuildDistrict { district_id: DistrictId },
    Decline,
    FinishTurn,
}
