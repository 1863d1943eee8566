//! Player input: what the engine asks for and how answers are checked.
//!
//! A [`SelectRequest`] is surfaced by [`crate::duel::Duel::run`] whenever a
//! request frame reaches the top of the process stack. The caller answers
//! with a [`Response`]; [`SelectRequest::apply`] validates it and writes it
//! into the returns channel for the frame that resumes next.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::flags::Position;
use crate::ids::{CardId, PlayerId};
use crate::returns::{ReturnCards, Returns};
use crate::zone::Location;

// ============================================================================
// Requests
// ============================================================================

/// Something a player must decide before the engine can continue.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectRequest {
    /// Pick between `min` and `max` of `cards`.
    Cards {
        player: PlayerId,
        hint: u64,
        cancelable: bool,
        min: u32,
        max: u32,
        cards: Vec<CardId>,
    },
    /// Toggle one card in or out of a running selection. Cancelling means
    /// "finish" when `finishable`, otherwise "abort".
    UnselectCard {
        player: PlayerId,
        hint: u64,
        finishable: bool,
        cancelable: bool,
        min: u32,
        max: u32,
        selectable: Vec<CardId>,
        selected: Vec<CardId>,
    },
    YesNo {
        player: PlayerId,
        description: u64,
    },
    /// Yes/no about using a specific card's effect.
    EffectYesNo {
        player: PlayerId,
        card: CardId,
        description: u64,
    },
    Option {
        player: PlayerId,
        options: Vec<u64>,
    },
    /// Pick a zone. `zones` has a bit set for every selectable slot: own
    /// monster zones 0..7, own spell/trap zones 8..16, opponent's monster
    /// zones 16..23, opponent's spell/trap zones 24..32.
    Place {
        player: PlayerId,
        zones: u32,
        count: u8,
    },
    Position {
        player: PlayerId,
        card: CardId,
        code: u32,
        positions: Position,
    },
    /// Distribute `count` counter removals over `cards`.
    Counter {
        player: PlayerId,
        counter_type: u16,
        count: u16,
        cards: Vec<(CardId, u16)>,
    },
    /// Tribute selection; each card carries how many tributes it is worth.
    Tribute {
        player: PlayerId,
        cancelable: bool,
        min: u32,
        max: u32,
        cards: Vec<(CardId, u32)>,
    },
}

impl SelectRequest {
    pub fn player(&self) -> PlayerId {
        match self {
            SelectRequest::Cards { player, .. }
            | SelectRequest::UnselectCard { player, .. }
            | SelectRequest::YesNo { player, .. }
            | SelectRequest::EffectYesNo { player, .. }
            | SelectRequest::Option { player, .. }
            | SelectRequest::Place { player, .. }
            | SelectRequest::Position { player, .. }
            | SelectRequest::Counter { player, .. }
            | SelectRequest::Tribute { player, .. } => *player,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SelectRequest::Cards { .. } => "select_card",
            SelectRequest::UnselectCard { .. } => "select_unselect_card",
            SelectRequest::YesNo { .. } => "select_yes_no",
            SelectRequest::EffectYesNo { .. } => "select_effect_yes_no",
            SelectRequest::Option { .. } => "select_option",
            SelectRequest::Place { .. } => "select_place",
            SelectRequest::Position { .. } => "select_position",
            SelectRequest::Counter { .. } => "select_counter",
            SelectRequest::Tribute { .. } => "select_tribute",
        }
    }

    /// Validate `response` and write it into the returns channel.
    /// Nothing is written when validation fails.
    pub fn apply(
        &self,
        response: &Response,
        returns: &mut Returns,
        return_cards: &mut ReturnCards,
    ) -> Result<(), ResponseError> {
        match (self, response) {
            (SelectRequest::Cards { cancelable, .. }, Response::Cancel)
            | (SelectRequest::Tribute { cancelable, .. }, Response::Cancel) => {
                if !cancelable {
                    return Err(ResponseError::NotCancelable);
                }
                return_cards.cancel();
                Ok(())
            }
            (
                SelectRequest::Cards {
                    min, max, cards, ..
                },
                Response::Cards(chosen),
            ) => {
                check_subset(chosen, cards.iter().copied())?;
                let n = chosen.len() as u32;
                if n < *min || n > *max {
                    return Err(ResponseError::CountOutOfRange {
                        got: n,
                        min: *min,
                        max: *max,
                    });
                }
                return_cards.set(chosen.clone());
                Ok(())
            }
            (
                SelectRequest::Tribute {
                    min, max, cards, ..
                },
                Response::Cards(chosen),
            ) => {
                check_subset(chosen, cards.iter().map(|(c, _)| *c))?;
                let worth: u32 = chosen
                    .iter()
                    .filter_map(|c| cards.iter().find(|(id, _)| id == c))
                    .map(|(_, w)| *w)
                    .sum();
                let n = chosen.len() as u32;
                if worth < *min || n > *max {
                    return Err(ResponseError::CountOutOfRange {
                        got: worth,
                        min: *min,
                        max: *max,
                    });
                }
                return_cards.set(chosen.clone());
                Ok(())
            }
            (
                SelectRequest::UnselectCard {
                    finishable,
                    cancelable,
                    ..
                },
                Response::Cancel,
            ) => {
                if !finishable && !cancelable {
                    return Err(ResponseError::NotCancelable);
                }
                return_cards.cancel();
                Ok(())
            }
            (
                SelectRequest::UnselectCard {
                    selectable,
                    selected,
                    ..
                },
                Response::Cards(chosen),
            ) => {
                let [card] = chosen.as_slice() else {
                    return Err(ResponseError::CountOutOfRange {
                        got: chosen.len() as u32,
                        min: 1,
                        max: 1,
                    });
                };
                if !selectable.contains(card) && !selected.contains(card) {
                    return Err(ResponseError::UnknownCard(*card));
                }
                return_cards.set(vec![*card]);
                Ok(())
            }
            (SelectRequest::YesNo { .. }, Response::YesNo(yes))
            | (SelectRequest::EffectYesNo { .. }, Response::YesNo(yes)) => {
                returns.set_bool(0, *yes);
                Ok(())
            }
            (SelectRequest::Option { options, .. }, Response::Option(index)) => {
                if *index >= options.len() {
                    return Err(ResponseError::IndexOutOfRange {
                        index: *index,
                        len: options.len(),
                    });
                }
                returns.set(0, *index as i64);
                Ok(())
            }
            (
                SelectRequest::Place { player, zones, .. },
                Response::Place {
                    player: chosen_player,
                    location,
                    sequence,
                },
            ) => {
                let bit = place_bit(*player, *chosen_player, *location, *sequence)
                    .ok_or(ResponseError::InvalidPlace)?;
                if zones & bit == 0 {
                    return Err(ResponseError::InvalidPlace);
                }
                returns.set(0, i64::from(chosen_player.0));
                returns.set(1, i64::from(location.bits()));
                returns.set(2, i64::from(*sequence));
                Ok(())
            }
            (SelectRequest::Position { positions, .. }, Response::Position(position)) => {
                if position.bits().count_ones() != 1 || !positions.contains(*position) {
                    return Err(ResponseError::InvalidPosition);
                }
                returns.set(0, i64::from(position.bits()));
                Ok(())
            }
            (SelectRequest::Counter { count, cards, .. }, Response::Counters(counts)) => {
                if counts.len() != cards.len() {
                    return Err(ResponseError::IndexOutOfRange {
                        index: counts.len(),
                        len: cards.len(),
                    });
                }
                let total: u32 = counts.iter().map(|c| u32::from(*c)).sum();
                let over = counts.iter().zip(cards).any(|(c, (_, have))| c > have);
                if total != u32::from(*count) || over {
                    return Err(ResponseError::CountOutOfRange {
                        got: total,
                        min: u32::from(*count),
                        max: u32::from(*count),
                    });
                }
                return_cards.list = cards.iter().map(|(c, _)| *c).collect();
                return_cards.counts = counts.clone();
                return_cards.canceled = false;
                Ok(())
            }
            _ => Err(ResponseError::WrongResponseKind {
                expected: self.kind(),
            }),
        }
    }
}

/// Bit of a [`SelectRequest::Place`] mask for a slot, seen from `asker`.
pub fn place_bit(asker: PlayerId, player: PlayerId, location: Location, sequence: u32) -> Option<u32> {
    if player.is_none() || sequence >= 8 {
        return None;
    }
    let side = if player == asker { 0 } else { 16 };
    let base = if location == Location::MZONE {
        0
    } else if location == Location::SZONE {
        8
    } else {
        return None;
    };
    Some(1 << (side + base + sequence))
}

fn check_subset(chosen: &[CardId], pool: impl Iterator<Item = CardId>) -> Result<(), ResponseError> {
    let pool: BTreeSet<CardId> = pool.collect();
    let mut seen = BTreeSet::new();
    for card in chosen {
        if !pool.contains(card) || !seen.insert(*card) {
            return Err(ResponseError::UnknownCard(*card));
        }
    }
    Ok(())
}

// ============================================================================
// Responses
// ============================================================================

/// A player's answer to the pending [`SelectRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum Response {
    Cards(Vec<CardId>),
    Cancel,
    YesNo(bool),
    Option(usize),
    Place {
        player: PlayerId,
        location: Location,
        sequence: u32,
    },
    Position(Position),
    Counters(Vec<u16>),
}

/// Where a run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// The process stack is empty.
    Idle,
    /// A player must answer before anything else happens.
    NeedsInput(SelectRequest),
}

/// Rejected answers. The request stays pending.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    #[error("no request is pending")]
    NoRequestPending,
    #[error("response does not answer a {expected} request")]
    WrongResponseKind { expected: &'static str },
    #[error("index {index} out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("selected {got}, expected between {min} and {max}")]
    CountOutOfRange { got: u32, min: u32, max: u32 },
    #[error("request cannot be cancelled")]
    NotCancelable,
    #[error("card {0:?} is not selectable")]
    UnknownCard(CardId),
    #[error("zone is not selectable")]
    InvalidPlace,
    #[error("position is not allowed")]
    InvalidPosition,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card_request(cancelable: bool) -> SelectRequest {
        SelectRequest::Cards {
            player: PlayerId::ZERO,
            hint: 0,
            cancelable,
            min: 1,
            max: 2,
            cards: vec![CardId(1), CardId(2), CardId(3)],
        }
    }

    #[test]
    fn test_card_selection_bounds() {
        let mut returns = Returns::default();
        let mut cards = ReturnCards::default();
        let req = card_request(false);
        assert!(matches!(
            req.apply(&Response::Cards(vec![]), &mut returns, &mut cards),
            Err(ResponseError::CountOutOfRange { .. })
        ));
        assert_eq!(
            req.apply(&Response::Cards(vec![CardId(9)]), &mut returns, &mut cards),
            Err(ResponseError::UnknownCard(CardId(9)))
        );
        assert_eq!(
            req.apply(&Response::Cards(vec![CardId(1), CardId(1)]), &mut returns, &mut cards),
            Err(ResponseError::UnknownCard(CardId(1)))
        );
        req.apply(&Response::Cards(vec![CardId(3)]), &mut returns, &mut cards)
            .unwrap();
        assert_eq!(cards.list, vec![CardId(3)]);
    }

    #[test]
    fn test_cancel_requires_cancelable() {
        let mut returns = Returns::default();
        let mut cards = ReturnCards::default();
        assert_eq!(
            card_request(false).apply(&Response::Cancel, &mut returns, &mut cards),
            Err(ResponseError::NotCancelable)
        );
        card_request(true)
            .apply(&Response::Cancel, &mut returns, &mut cards)
            .unwrap();
        assert!(cards.canceled);
    }

    #[test]
    fn test_place_answer_slots() {
        let mut returns = Returns::default();
        let mut cards = ReturnCards::default();
        let req = SelectRequest::Place {
            player: PlayerId::ONE,
            zones: 0b100,
            count: 1,
        };
        let bad = Response::Place {
            player: PlayerId::ONE,
            location: Location::MZONE,
            sequence: 1,
        };
        assert_eq!(
            req.apply(&bad, &mut returns, &mut cards),
            Err(ResponseError::InvalidPlace)
        );
        let good = Response::Place {
            player: PlayerId::ONE,
            location: Location::MZONE,
            sequence: 2,
        };
        req.apply(&good, &mut returns, &mut cards).unwrap();
        assert_eq!(returns.get(0), 1);
        assert_eq!(returns.get(1), i64::from(Location::MZONE.bits()));
        assert_eq!(returns.get(2), 2);
    }

    #[test]
    fn test_place_bit_sides() {
        assert_eq!(place_bit(PlayerId::ZERO, PlayerId::ZERO, Location::SZONE, 1), Some(1 << 9));
        assert_eq!(place_bit(PlayerId::ZERO, PlayerId::ONE, Location::MZONE, 0), Some(1 << 16));
        assert_eq!(place_bit(PlayerId::ZERO, PlayerId::ZERO, Location::GRAVE, 0), None);
    }

    #[test]
    fn test_position_must_be_single_allowed_bit() {
        let mut returns = Returns::default();
        let mut cards = ReturnCards::default();
        let req = SelectRequest::Position {
            player: PlayerId::ZERO,
            card: CardId(0),
            code: 1,
            positions: Position::FACEUP_ATTACK | Position::FACEDOWN_DEFENSE,
        };
        assert_eq!(
            req.apply(&Response::Position(Position::FACEUP), &mut returns, &mut cards),
            Err(ResponseError::InvalidPosition)
        );
        req.apply(&Response::Position(Position::FACEDOWN_DEFENSE), &mut returns, &mut cards)
            .unwrap();
        assert_eq!(returns.get(0), 0x8);
    }

    #[test]
    fn test_wrong_kind() {
        let mut returns = Returns::default();
        let mut cards = ReturnCards::default();
        let req = SelectRequest::YesNo {
            player: PlayerId::ZERO,
            description: 0,
        };
        assert_eq!(
            req.apply(&Response::Option(0), &mut returns, &mut cards),
            Err(ResponseError::WrongResponseKind {
                expected: "select_yes_no"
            })
        );
    }
}
