//! Per-player board state: stash, hand, city and scoring.

use crate::district::{DistrictCard, DistrictId, DistrictType, DistrictsDeck};
use serde::{Deserialize, Serialize};

/// Score components, filled in once at game end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Sum of build costs of the city.
    pub base: u32,
    /// Bonus points printed on built districts.
    pub card_bonus: u32,
    /// All five district types represented in the city.
    pub variety_bonus: u32,
    /// City at or above the configured threshold.
    pub completion_bonus: u32,
    /// One point per three gold left in the stash.
    pub stash_bonus: u32,
    pub total: u32,
}

/// Points for having every district type in the city.
const VARIETY_BONUS: u32 = 3;

/// Points for a complete city.
const COMPLETION_BONUS: u32 = 4;

/// One player's private resources. Mutated only through its own operations;
/// every mutating operation enforces its legality checks and reports failure
/// by leaving the state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerBoardState {
    /// Gold on hand. Never negative.
    pub stash: u32,
    /// District cards held.
    pub hand: Vec<DistrictId>,
    /// Staging area for draw-and-keep gathers.
    pub tmp_hand: Vec<DistrictId>,
    /// Built districts. Uniqueness enforced by `build_district`.
    pub city: Vec<DistrictId>,
    pub score: ScoreBreakdown,
}

impl PlayerBoardState {
    pub fn new(stash: u32, hand: Vec<DistrictId>) -> Self {
        Self {
            stash,
            hand,
            tmp_hand: Vec::new(),
            city: Vec::new(),
            score: ScoreBreakdown::default(),
        }
    }

    pub fn add_cards_to_hand(&mut self, cards: Vec<DistrictId>) {
        self.hand.extend(cards);
    }

    /// Draw `draw` cards through the staging hand, keep the first `keep`,
    /// discard the rest.
    pub fn gather_cards(&mut self, deck: &mut DistrictsDeck, draw: usize, keep: usize) {
        self.tmp_hand = deck.draw_cards(draw);
        let kept: Vec<DistrictId> = self
            .tmp_hand
            .drain(..keep.min(self.tmp_hand.len()))
            .collect();
        deck.discard_cards(&self.tmp_hand);
        self.tmp_hand.clear();
        self.add_cards_to_hand(kept);
    }

    /// Move a district from hand to city, paying its cost. Fails without
    /// mutation if the card is not in hand, already built, or unaffordable.
    pub fn build_district(&mut self, id: &str) -> bool {
        let Some(card) = DistrictCard::get(id) else {
            return false;
        };
        let Some(hand_index) = self.hand.iter().position(|held| held == id) else {
            return false;
        };
        if self.has_district(id) || self.stash < card.cost {
            return false;
        }

        self.stash -= card.cost;
        let built = self.hand.remove(hand_index);
        self.city.push(built);
        true
    }

    /// Remove a built district from the city.
    pub fn destroy_district(&mut self, id: &str) -> bool {
        match self.city.iter().position(|built| built == id) {
            Some(index) => {
                self.city.remove(index);
                true
            }
            None => false,
        }
    }

    /// Gold required to destroy a built district: its cost minus one.
    /// `None` when the district is not in this city.
    pub fn destroy_cost(&self, id: &str) -> Option<u32> {
        if !self.has_district(id) {
            return None;
        }
        DistrictCard::get(id).map(|card| card.cost.saturating_sub(1))
    }

    pub fn has_district(&self, id: &str) -> bool {
        self.city.iter().any(|built| built == id)
    }

    pub fn city_size(&self) -> usize {
        self.city.len()
    }

    /// Income for a color role: one gold per matching district, wild
    /// districts matching every color.
    pub fn earnings_for(&self, district_type: DistrictType) -> u32 {
        self.city
            .iter()
            .filter_map(|id| DistrictCard::get(id))
            .filter(|card| card.wild || card.district_type == district_type)
            .count() as u32
    }

    /// Extra cards drawn when gathering, from built draw-bonus districts.
    pub fn draw_bonus(&self) -> usize {
        self.city
            .iter()
            .filter_map(|id| DistrictCard::get(id))
            .filter(|card| card.draw_bonus)
            .count()
    }

    /// Fill in the final score breakdown.
    pub fn compute_score(&mut self, complete_city_size: usize) {
        let cards: Vec<&DistrictCard> = self
            .city
            .iter()
            .filter_map(|id| DistrictCard::get(id))
            .collect();

        let base: u32 = cards.iter().map(|card| card.cost).sum();
        let card_bonus: u32 = cards.iter().map(|card| card.bonus_points).sum();

        let mut types: Vec<DistrictType> = cards
            .iter()
            .filter(|card| !card.wild)
            .map(|card| card.district_type)
            .collect();
        types.sort_by_key(|t| *t as u8);
        types.dedup();
        let wild_count = cards.iter().filter(|card| card.wild).count();
        let variety_bonus = if types.len() + wild_count >= DistrictType::ALL.len() {
            VARIETY_BONUS
        } else {
            0
        };

        let completion_bonus = if self.city.len() >= complete_city_size {
            COMPLETION_BONUS
        } else {
            0
        };
        let stash_bonus = self.stash / 3;

        self.score = ScoreBreakdown {
            base,
            card_bonus,
            variety_bonus,
            completion_bonus,
            stash_bonus,
            total: base + card_bonus + variety_bonus + completion_bonus + stash_bonus,
        };
    }
}
