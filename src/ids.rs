#[cfg(feature = "serialization")]
use serde::{Deserialize, Serialize};

/// Player identifier. Seats are 0 and 1; [`PlayerId::NONE`] marks "no player".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct PlayerId(pub u8);

/// Index of a card in the duel's card arena. Stable for the whole duel:
/// cards are relocated, never freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct CardId(pub u32);

/// Index of an effect in the duel's effect arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(Serialize, Deserialize))]
pub struct EffectId(pub u32);

impl PlayerId {
    pub const ZERO: PlayerId = PlayerId(0);
    pub const ONE: PlayerId = PlayerId(1);
    /// Sentinel used by reason/controller fields when no player applies.
    pub const NONE: PlayerId = PlayerId(2);

    /// Create a player ID from a specific index.
    pub fn from_index(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_none(self) -> bool {
        self.0 > 1
    }

    /// The other seat. `NONE` stays `NONE`.
    pub fn opponent(self) -> Self {
        match self.0 {
            0 => Self(1),
            1 => Self(0),
            _ => Self::NONE,
        }
    }

    /// Both seats, turn order independent.
    pub fn both() -> [PlayerId; 2] {
        [Self::ZERO, Self::ONE]
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::NONE
    }
}

impl CardId {
    /// Create a card ID from a specific arena index.
    pub fn from_raw(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EffectId {
    /// Create an effect ID from a specific arena index.
    pub fn from_raw(id: u32) -> Self {
        Self(id)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_opponent() {
        assert_eq!(PlayerId::ZERO.opponent(), PlayerId::ONE);
        assert_eq!(PlayerId::ONE.opponent(), PlayerId::ZERO);
        assert_eq!(PlayerId::NONE.opponent(), PlayerId::NONE);
    }

    #[test]
    fn test_player_none() {
        assert!(PlayerId::NONE.is_none());
        assert!(!PlayerId::from_index(1).is_none());
        assert_eq!(PlayerId::default(), PlayerId::NONE);
    }

    #[test]
    fn test_card_id_from_raw() {
        let c1 = CardId::from_raw(100);
        let c2 = CardId::from_raw(200);
        assert_ne!(c1, c2);
        assert_eq!(c1.index(), 100);
        assert_eq!(c2.0, 200);
    }
}
