//! District cards: the static catalog and the draw deck.
//!
//! Cards are defined once in a static catalog mapping id to card data plus
//! the number of copies shuffled into a fresh deck. The catalog is never
//! mutated; all per-game card movement happens in [`DistrictsDeck`] and the
//! players' hands and cities.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Identifier of a district card, as it travels over the wire.
pub type DistrictId = String;

/// The five district categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistrictType {
    Noble,
    Religious,
    Trade,
    Military,
    Unique,
}

impl DistrictType {
    pub const ALL: [DistrictType; 5] = [
        DistrictType::Noble,
        DistrictType::Religious,
        DistrictType::Trade,
        DistrictType::Military,
        DistrictType::Unique,
    ];
}

/// Immutable card data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistrictCard {
    pub id: &'static str,
    pub district_type: DistrictType,
    /// Gold required to build (the destroy cost is one less).
    pub cost: u32,
    /// Extra score points granted at game end.
    pub bonus_points: u32,
    /// Counts as every district type for income and scoring variety.
    pub wild: bool,
    /// Adds one to the draw count when gathering cards.
    pub draw_bonus: bool,
}

impl DistrictCard {
    /// Look up a card by id.
    pub fn get(id: &str) -> Option<&'static DistrictCard> {
        catalog().get(id).map(|(card, _)| card)
    }

    /// Number of copies of a card in a fresh deck.
    pub fn copies(id: &str) -> u8 {
        catalog().get(id).map_or(0, |&(_, count)| count)
    }
}

/// The full id → (card, copies) catalog.
pub fn catalog() -> &'static HashMap<&'static str, (DistrictCard, u8)> {
    static CATALOG: OnceLock<HashMap<&'static str, (DistrictCard, u8)>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        catalog_entries()
            .into_iter()
            .map(|(card, count)| (card.id, (card, count)))
            .collect()
    })
}

fn catalog_entries() -> Vec<(DistrictCard, u8)> {
    use DistrictType::*;

    let plain = |id, district_type, cost, copies| {
        (
            DistrictCard {
                id,
                district_type,
                cost,
                bonus_points: 0,
                wild: false,
                draw_bonus: false,
            },
            copies,
        )
    };

    let mut entries = vec![
        // Noble
        plain("manor", Noble, 3, 5),
        plain("castle", Noble, 4, 4),
        plain("palace", Noble, 5, 3),
        // Religious
        plain("temple", Religious, 1, 3),
        plain("church", Religious, 2, 3),
        plain("monastery", Religious, 3, 3),
        plain("cathedral", Religious, 5, 2),
        // Trade
        plain("tavern", Trade, 1, 5),
        plain("market", Trade, 2, 4),
        plain("trading_post", Trade, 2, 3),
        plain("docks", Trade, 3, 3),
        plain("harbor", Trade, 4, 3),
        plain("town_hall", Trade, 5, 2),
        // Military
        plain("watchtower", Military, 1, 3),
        plain("prison", Military, 2, 3),
        plain("battlefield", Military, 3, 3),
        plain("fortress", Military, 5, 2),
        // Unique
        plain("keep", Unique, 3, 2),
        plain("laboratory", Unique, 5, 1),
        plain("smithy", Unique, 5, 1),
        plain("graveyard", Unique, 5, 1),
        plain("great_wall", Unique, 6, 1),
        plain("library", Unique, 6, 1),
    ];

    entries.push((
        DistrictCard {
            id: "haunted_quarter",
            district_type: Unique,
            cost: 2,
            bonus_points: 0,
            wild: true,
            draw_bonus: false,
        },
        1,
    ));
    entries.push((
        DistrictCard {
            id: "school_of_magic",
            district_type: Unique,
            cost: 6,
            bonus_points: 0,
            wild: true,
            draw_bonus: false,
        },
        1,
    ));
    entries.push((
        DistrictCard {
            id: "observatory",
            district_type: Unique,
            cost: 5,
            bonus_points: 0,
            wild: false,
            draw_bonus: true,
        },
        1,
    ));
    entries.push((
        DistrictCard {
            id: "university",
            district_type: Unique,
            cost: 6,
            bonus_points: 2,
            wild: false,
            draw_bonus: false,
        },
        1,
    ));
    entries.push((
        DistrictCard {
            id: "dragon_gate",
            district_type: Unique,
            cost: 6,
            bonus_points: 2,
            wild: false,
            draw_bonus: false,
        },
        1,
    ));

    entries
}

/// The shared district deck: a shuffled draw pile plus a discard pile that
/// replenishes the draw pile when it runs dry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictsDeck {
    draw_pile: Vec<DistrictId>,
    discard_pile: Vec<DistrictId>,
}

impl DistrictsDeck {
    /// Build a full deck from the catalog and shuffle it.
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        let mut draw_pile: Vec<DistrictId> = Vec::new();
        for (card, copies) in catalog().values() {
            for _ in 0..*copies {
                draw_pile.push(card.id.to_string());
            }
        }
        draw_pile.shuffle(rng);

        Self {
            draw_pile,
            discard_pile: Vec::new(),
        }
    }

    /// Build a deck with an explicit draw order (tests and replays).
    pub fn from_cards(draw_pile: Vec<DistrictId>) -> Self {
        Self {
            draw_pile,
            discard_pile: Vec::new(),
        }
    }

    /// Draw up to `count` cards. When the draw pile empties, the discard
    /// pile is reshuffled into it; if both are empty fewer cards come back.
    pub fn draw_cards(&mut self, count: usize) -> Vec<DistrictId> {
        let mut drawn = Vec::with_capacity(count);
        for _ in 0..count {
            if self.draw_pile.is_empty() && !self.discard_pile.is_empty() {
                self.draw_pile.append(&mut self.discard_pile);
                self.draw_pile.shuffle(&mut rand::thread_rng());
            }
            match self.draw_pile.pop() {
                Some(card) => drawn.push(card),
                None => break,
            }
        }
        drawn
    }

    /// Return cards to the bottom of the discard pile.
    pub fn discard_cards(&mut self, cards: &[DistrictId]) {
        self.discard_pile.extend(cards.iter().cloned());
    }

    /// Cards left in the draw pile.
    pub fn remaining(&self) -> usize {
        self.draw_pile.len()
    }

    /// Cards in the discard pile.
    pub fn discarded(&self) -> usize {
        self.discard_pile.len()
    }
}
