use bitflags::bitflags;

bitflags! {
    /// Card frame/type bits as printed on the card template.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
    pub struct CardType: u32 {
        const MONSTER = 0x1;
        const SPELL = 0x2;
        const TRAP = 0x4;
        const NORMAL = 0x10;
        const EFFECT = 0x20;
        const FUSION = 0x40;
        const RITUAL = 0x80;
        const TRAPMONSTER = 0x100;
        const SPIRIT = 0x200;
        const UNION = 0x400;
        const GEMINI = 0x800;
        const TUNER = 0x1000;
        const SYNCHRO = 0x2000;
        const TOKEN = 0x4000;
        const QUICKPLAY = 0x10000;
        const CONTINUOUS = 0x20000;
        const EQUIP = 0x40000;
        const FIELD = 0x80000;
        const COUNTER = 0x100000;
        const FLIP = 0x200000;
        const TOON = 0x400000;
        const XYZ = 0x800000;
        const PENDULUM = 0x1000000;
        const SPSUMMON = 0x2000000;
        const LINK = 0x4000000;
    }
}

impl CardType {
    /// Monsters that live in the extra deck.
    pub fn is_extra_deck_monster(self) -> bool {
        self.intersects(CardType::FUSION | CardType::SYNCHRO | CardType::XYZ | CardType::LINK)
    }

    pub fn is_link_monster(self) -> bool {
        self.contains(CardType::LINK | CardType::MONSTER)
    }

    /// Field spells and field traps occupy the dedicated field zone.
    pub fn is_field_card(self) -> bool {
        self.contains(CardType::FIELD) && self.intersects(CardType::SPELL | CardType::TRAP)
    }
}

/// Summon type values stored in a card's summon info.
pub mod summon_type {
    pub const NORMAL: u32 = 0x10000000;
    pub const ADVANCE: u32 = 0x11000000;
    pub const GEMINI: u32 = 0x12000000;
    pub const FLIP: u32 = 0x20000000;
    pub const SPECIAL: u32 = 0x40000000;
    pub const FUSION: u32 = 0x43000000;
    pub const RITUAL: u32 = 0x45000000;
    pub const SYNCHRO: u32 = 0x46000000;
    pub const XYZ: u32 = 0x49000000;
    pub const PENDULUM: u32 = 0x4a000000;
    pub const LINK: u32 = 0x4c000000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extra_deck_monsters() {
        assert!((CardType::MONSTER | CardType::XYZ).is_extra_deck_monster());
        assert!(!(CardType::MONSTER | CardType::EFFECT).is_extra_deck_monster());
    }

    #[test]
    fn test_field_card() {
        assert!((CardType::SPELL | CardType::FIELD).is_field_card());
        assert!(!CardType::FIELD.is_field_card());
    }
}
