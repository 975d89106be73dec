//! The character-drafting automaton.
//!
//! Drafting is a fixed sequence of steps computed from the player count:
//! some roles are put aside (face-up, then one face-down), each seat picks a
//! role in turn order, and whatever remains is put aside face-down. Steps
//! with no actor are advanced by the engine itself; steps with an actor wait
//! for a move. The seven-player game has its own tail: the face-down card
//! returns to the pool and the last seat discards one of the final two
//! before picking the other.

use serde::{Deserialize, Serialize};

/// Index into the round's player order.
pub type Seat = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftStep {
    Initial,
    PutAsideFaceUp,
    PutAsideFaceDown,
    /// Combined step: the acting seat puts one role aside face-down, then
    /// picks up the other (the pick is the following `ChooseCharacter`).
    PutAsideFaceDownUp,
    ChooseCharacter,
    /// Automatic: return the face-down aside role to the pool.
    GetAsideFaceDown,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftState {
    pub step: DraftStep,
    /// Seat expected to act, or `None` when the engine advances on its own.
    pub actor: Option<Seat>,
}

impl DraftState {
    const fn automatic(step: DraftStep) -> Self {
        Self { step, actor: None }
    }

    const fn acted_by(step: DraftStep, seat: Seat) -> Self {
        Self {
            step,
            actor: Some(seat),
        }
    }
}

/// Face-up aside cards dealt before the picks, by player count.
pub fn face_up_aside_count(player_count: usize) -> usize {
    match player_count {
        0..=4 => 2,
        5 => 1,
        _ => 0,
    }
}

/// The drafting state machine. Deterministic given the player count; which
/// role leaves the pool at each step is decided by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterDraft {
    player_count: usize,
    states: Vec<DraftState>,
    cursor: usize,
}

impl CharacterDraft {
    pub fn new(player_count: usize) -> Self {
        Self {
            player_count,
            states: build_states(player_count),
            cursor: 0,
        }
    }

    pub fn player_count(&self) -> usize {
        self.player_count
    }

    pub fn state(&self) -> DraftState {
        self.states[self.cursor]
    }

    pub fn is_done(&self) -> bool {
        self.state().step == DraftStep::Done
    }

    /// Move to the next step. `Done` is terminal.
    pub fn advance(&mut self) {
        if self.cursor + 1 < self.states.len() {
            self.cursor += 1;
        }
    }

    /// Back to the start of the sequence for a new round.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

const ROLE_POOL_SIZE: usize = 8;

fn build_states(player_count: usize) -> Vec<DraftState> {
    use DraftStep::*;

    let mut states = vec![DraftState::automatic(Initial)];

    let face_up = face_up_aside_count(player_count);
    for _ in 0..face_up {
        states.push(DraftState::acted_by(PutAsideFaceUp, 0));
    }
    states.push(DraftState::acted_by(PutAsideFaceDown, 0));

    let leftover;
    if player_count == 7 {
        for seat in 0..6 {
            states.push(DraftState::acted_by(ChooseCharacter, seat));
        }
        // The face-down card rejoins the pool and the last seat discards one
        // of the two remaining roles before picking the other.
        states.push(DraftState::automatic(GetAsideFaceDown));
        states.push(DraftState::acted_by(PutAsideFaceDownUp, 6));
        states.push(DraftState::acted_by(ChooseCharacter, 6));
        leftover = 0;
    } else {
        for seat in 0..player_count {
            states.push(DraftState::acted_by(ChooseCharacter, seat));
        }
        leftover = ROLE_POOL_SIZE.saturating_sub(face_up + 1 + player_count);
    }

    for _ in 0..leftover {
        states.push(DraftState::automatic(PutAsideFaceDown));
    }
    states.push(DraftState::automatic(Done));

    states
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn steps(player_count: usize) -> Vec<(DraftStep, Option<Seat>)> {
        build_states(player_count)
            .into_iter()
            .map(|s| (s.step, s.actor))
            .collect()
    }

    #[test]
    fn four_player_sequence() {
        use DraftStep::*;
        assert_eq!(
            steps(4),
            vec![
                (Initial, None),
                (PutAsideFaceUp, Some(0)),
                (PutAsideFaceUp, Some(0)),
                (PutAsideFaceDown, Some(0)),
                (ChooseCharacter, Some(0)),
                (ChooseCharacter, Some(1)),
                (ChooseCharacter, Some(2)),
                (ChooseCharacter, Some(3)),
                (PutAsideFaceDown, None),
                (Done, None),
            ]
        );
    }

    #[test]
    fn seven_player_sequence_has_facedown_up_tail() {
        use DraftStep::*;
        assert_eq!(
            steps(7),
            vec![
                (Initial, None),
                (PutAsideFaceDown, Some(0)),
                (ChooseCharacter, Some(0)),
                (ChooseCharacter, Some(1)),
                (ChooseCharacter, Some(2)),
                (ChooseCharacter, Some(3)),
                (ChooseCharacter, Some(4)),
                (ChooseCharacter, Some(5)),
                (GetAsideFaceDown, None),
                (PutAsideFaceDownUp, Some(6)),
                (ChooseCharacter, Some(6)),
                (Done, None),
            ]
        );
    }

    #[test]
    fn every_player_count_consumes_the_whole_pool() {
        for player_count in 2..=7 {
            let sequence = steps(player_count);
            let removals = sequence
                .iter()
                .filter(|(step, _)| {
                    matches!(
                        step,
                        DraftStep::PutAsideFaceUp
                            | DraftStep::PutAsideFaceDown
                            | DraftStep::PutAsideFaceDownUp
                            | DraftStep::ChooseCharacter
                    )
                })
                .count();
            let returns = sequence
                .iter()
                .filter(|(step, _)| matches!(step, DraftStep::GetAsideFaceDown))
                .count();
            assert_eq!(
                removals - returns,
                ROLE_POOL_SIZE,
                "player count {player_count}"
            );

            let picks = sequence
                .iter()
                .filter(|(step, actor)| {
                    matches!(step, DraftStep::ChooseCharacter) && actor.is_some()
                })
                .count();
            assert_eq!(picks, player_count, "player count {player_count}");
        }
    }

    #[test]
    fn advance_stops_at_done() {
        let mut draft = CharacterDraft::new(2);
        for _ in 0..32 {
            draft.advance();
        }
        assert!(draft.is_done());
        draft.advance();
        assert!(draft.is_done());
    }

    #[test]
    fn reset_restarts_the_sequence() {
        let mut draft = CharacterDraft::new(3);
        draft.advance();
        draft.advance();
        draft.reset();
        assert_eq!(draft.state().step, DraftStep::Initial);
    }
}
