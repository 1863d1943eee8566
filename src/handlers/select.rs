//! Request frames.
//!
//! A handler that needs a decision pushes one of these and reads the answer
//! from the returns channel at its next step. The request frame itself only
//! surfaces the question (see [`crate::process::Process::step`]).

use crate::decision::{SelectRequest, place_bit};
use crate::flags::Position;
use crate::ids::{CardId, PlayerId};
use crate::process::Process;
use crate::query::Ctx;
use crate::zone::Location;

impl Ctx<'_> {
    fn request(&mut self, request: SelectRequest) {
        self.push(Process::Request(request));
    }

    pub fn select_card(&mut self, player: PlayerId, hint: u64, cancelable: bool, min: u32, max: u32, cards: Vec<CardId>) {
        self.request(SelectRequest::Cards {
            player,
            hint,
            cancelable,
            min,
            max,
            cards,
        });
    }

    #[allow(clippy::too_many_arguments)]
    pub fn select_unselect_card(
        &mut self,
        player: PlayerId,
        hint: u64,
        finishable: bool,
        cancelable: bool,
        min: u32,
        max: u32,
        selectable: Vec<CardId>,
        selected: Vec<CardId>,
    ) {
        self.request(SelectRequest::UnselectCard {
            player,
            hint,
            finishable,
            cancelable,
            min,
            max,
            selectable,
            selected,
        });
    }

    pub fn select_yes_no(&mut self, player: PlayerId, description: u64) {
        self.request(SelectRequest::YesNo { player, description });
    }

    pub fn select_effect_yes_no(&mut self, player: PlayerId, card: CardId, description: u64) {
        self.request(SelectRequest::EffectYesNo {
            player,
            card,
            description,
        });
    }

    pub fn select_option(&mut self, player: PlayerId, options: Vec<u64>) {
        self.request(SelectRequest::Option { player, options });
    }

    /// Ask `player` for a slot among `free` sequence bits of `owner`'s row.
    pub fn select_place(&mut self, player: PlayerId, owner: PlayerId, location: Location, free: u32, count: u8) {
        let zones = place_mask(player, owner, location, free);
        self.request(SelectRequest::Place {
            player,
            zones,
            count,
        });
    }

    pub fn select_position(&mut self, player: PlayerId, card: CardId, positions: Position) {
        let code = self.state.card(card).code();
        self.request(SelectRequest::Position {
            player,
            card,
            code,
            positions,
        });
    }

    pub fn select_counter(&mut self, player: PlayerId, counter_type: u16, count: u16, cards: Vec<(CardId, u16)>) {
        self.request(SelectRequest::Counter {
            player,
            counter_type,
            count,
            cards,
        });
    }

    pub fn select_tribute_p(&mut self, player: PlayerId, cancelable: bool, min: u32, max: u32, cards: Vec<(CardId, u32)>) {
        self.request(SelectRequest::Tribute {
            player,
            cancelable,
            min,
            max,
            cards,
        });
    }

    /// Answer of the last place request as (player, location, sequence).
    pub fn selected_place(&self) -> (PlayerId, Location, u32) {
        let returns = &self.state.returns;
        (
            PlayerId(returns.get(0) as u8),
            Location::from_bits_truncate(returns.get(1) as u32),
            returns.get(2) as u32,
        )
    }
}

/// Request mask for `free` slots of `owner`'s row as seen by `asker`.
pub fn place_mask(asker: PlayerId, owner: PlayerId, location: Location, free: u32) -> u32 {
    (0..8)
        .filter(|seq| free & (1 << seq) != 0)
        .filter_map(|seq| place_bit(asker, owner, location, seq))
        .fold(0, |mask, bit| mask | bit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_mask_sides() {
        assert_eq!(place_mask(PlayerId::ZERO, PlayerId::ZERO, Location::MZONE, 0b101), 0b101);
        assert_eq!(place_mask(PlayerId::ZERO, PlayerId::ONE, Location::SZONE, 0b1), 1 << 24);
        assert_eq!(place_mask(PlayerId::ONE, PlayerId::ONE, Location::SZONE, 0b10), 1 << 9);
    }
}
