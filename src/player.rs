use crate::ids::CardId;
use crate::zone::Location;

/// Monster zones per player: five main zones plus the two extra zones.
pub const MZONE_SLOTS: usize = 7;
/// Spell/trap zones: five main zones, the field zone and two pendulum slots.
pub const SZONE_SLOTS: usize = 8;
/// Sequence of the field zone inside the spell/trap row.
pub const FIELD_ZONE_SEQ: u32 = 5;

/// One side of the table.
///
/// Piles are stored bottom first: the last element of `list_main` is the top
/// of the deck and the last element of `list_grave` the most recent arrival.
#[derive(Debug, Clone)]
pub struct Player {
    pub lp: i32,
    pub list_main: Vec<CardId>,
    pub list_hand: Vec<CardId>,
    pub list_grave: Vec<CardId>,
    pub list_remove: Vec<CardId>,
    pub list_extra: Vec<CardId>,
    pub list_mzone: [Option<CardId>; MZONE_SLOTS],
    pub list_szone: [Option<CardId>; SZONE_SLOTS],
    /// Zones blocked by effects: bits 0..7 monster zones, 8..16 spell/trap.
    pub disabled_location: u32,
    /// Face-up pendulum monsters in the extra deck.
    pub extra_p_count: u32,
    /// Normal summons and sets used this turn.
    pub summon_count: u32,
    pub spsummon_count: u32,
}

impl Player {
    pub fn new(lp: i32) -> Self {
        Self {
            lp,
            list_main: Vec::new(),
            list_hand: Vec::new(),
            list_grave: Vec::new(),
            list_remove: Vec::new(),
            list_extra: Vec::new(),
            list_mzone: [None; MZONE_SLOTS],
            list_szone: [None; SZONE_SLOTS],
            disabled_location: 0,
            extra_p_count: 0,
            summon_count: 0,
            spsummon_count: 0,
        }
    }

    /// The ordered list backing a pile location.
    pub fn pile(&self, location: Location) -> Option<&Vec<CardId>> {
        match location {
            l if l == Location::DECK => Some(&self.list_main),
            l if l == Location::HAND => Some(&self.list_hand),
            l if l == Location::GRAVE => Some(&self.list_grave),
            l if l == Location::REMOVED => Some(&self.list_remove),
            l if l == Location::EXTRA => Some(&self.list_extra),
            _ => None,
        }
    }

    pub fn pile_mut(&mut self, location: Location) -> Option<&mut Vec<CardId>> {
        match location {
            l if l == Location::DECK => Some(&mut self.list_main),
            l if l == Location::HAND => Some(&mut self.list_hand),
            l if l == Location::GRAVE => Some(&mut self.list_grave),
            l if l == Location::REMOVED => Some(&mut self.list_remove),
            l if l == Location::EXTRA => Some(&mut self.list_extra),
            _ => None,
        }
    }

    /// Slot row of a field location.
    pub fn slots(&self, location: Location) -> Option<&[Option<CardId>]> {
        if location == Location::MZONE {
            Some(&self.list_mzone)
        } else if location == Location::SZONE {
            Some(&self.list_szone)
        } else {
            None
        }
    }

    pub fn slots_mut(&mut self, location: Location) -> Option<&mut [Option<CardId>]> {
        if location == Location::MZONE {
            Some(&mut self.list_mzone)
        } else if location == Location::SZONE {
            Some(&mut self.list_szone)
        } else {
            None
        }
    }

    pub fn field_card(&self, location: Location, sequence: u32) -> Option<CardId> {
        self.slots(location)
            .and_then(|row| row.get(sequence as usize).copied().flatten())
    }

    /// Cards currently occupying a field row.
    pub fn occupied(&self, location: Location) -> Vec<CardId> {
        self.slots(location)
            .map(|row| row.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_zone_disabled(&self, location: Location, sequence: u32) -> bool {
        let shift = if location == Location::SZONE { 8 } else { 0 };
        self.disabled_location & (1 << (shift + sequence)) != 0
    }

    pub fn deck_top(&self) -> Option<CardId> {
        self.list_main.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pile_lookup() {
        let mut p = Player::new(8000);
        p.pile_mut(Location::GRAVE).unwrap().push(CardId(3));
        assert_eq!(p.list_grave, vec![CardId(3)]);
        assert!(p.pile(Location::MZONE).is_none());
    }

    #[test]
    fn test_field_slots() {
        let mut p = Player::new(8000);
        p.list_mzone[2] = Some(CardId(7));
        assert_eq!(p.field_card(Location::MZONE, 2), Some(CardId(7)));
        assert_eq!(p.field_card(Location::MZONE, 9), None);
        assert_eq!(p.occupied(Location::MZONE), vec![CardId(7)]);
    }

    #[test]
    fn test_disabled_zone_bits() {
        let mut p = Player::new(8000);
        p.disabled_location = 1 << 9;
        assert!(p.is_zone_disabled(Location::SZONE, 1));
        assert!(!p.is_zone_disabled(Location::MZONE, 1));
    }
}
