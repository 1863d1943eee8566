//! Bit-flag domains shared by cards, effects and the handlers.
//!
//! The bit layouts match what downstream clients expect on the wire; code
//! inside the crate should prefer the named predicates.

use bitflags::bitflags;

bitflags! {
    /// Battle position and face of a card.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
    pub struct Position: u32 {
        const FACEUP_ATTACK = 0x1;
        const FACEDOWN_ATTACK = 0x2;
        const FACEUP_DEFENSE = 0x4;
        const FACEDOWN_DEFENSE = 0x8;
        const FACEUP = Self::FACEUP_ATTACK.bits() | Self::FACEUP_DEFENSE.bits();
        const FACEDOWN = Self::FACEDOWN_ATTACK.bits() | Self::FACEDOWN_DEFENSE.bits();
        const ATTACK = Self::FACEUP_ATTACK.bits() | Self::FACEDOWN_ATTACK.bits();
        const DEFENSE = Self::FACEUP_DEFENSE.bits() | Self::FACEDOWN_DEFENSE.bits();
    }
}

impl Position {
    pub fn is_faceup(self) -> bool {
        self.intersects(Position::FACEUP)
    }

    pub fn is_facedown(self) -> bool {
        self.intersects(Position::FACEDOWN)
    }

    pub fn is_defense(self) -> bool {
        self.intersects(Position::DEFENSE)
    }

    /// Turn any face-down bits into their face-up counterparts.
    pub fn flipped_faceup(self) -> Position {
        let mut pos = self;
        if pos.contains(Position::FACEDOWN_ATTACK) {
            pos = (pos - Position::FACEDOWN_ATTACK) | Position::FACEUP_ATTACK;
        }
        if pos.contains(Position::FACEDOWN_DEFENSE) {
            pos = (pos - Position::FACEDOWN_DEFENSE) | Position::FACEUP_DEFENSE;
        }
        pos
    }
}

bitflags! {
    /// Why a card moved (or why an amount was applied).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
    pub struct Reason: u32 {
        const DESTROY = 0x1;
        const RELEASE = 0x2;
        const TEMPORARY = 0x4;
        const MATERIAL = 0x8;
        const SUMMON = 0x10;
        const BATTLE = 0x20;
        const EFFECT = 0x40;
        const COST = 0x80;
        const ADJUST = 0x100;
        const LOST_TARGET = 0x200;
        const RULE = 0x400;
        const SPSUMMON = 0x800;
        const DISSUMMON = 0x1000;
        const FLIP = 0x2000;
        const DISCARD = 0x4000;
        const RDAMAGE = 0x8000;
        const RRECOVER = 0x10000;
        const RETURN = 0x20000;
        const FUSION = 0x40000;
        const SYNCHRO = 0x80000;
        const RITUAL = 0x100000;
        const XYZ = 0x200000;
        const REPLACE = 0x1000000;
        const DRAW = 0x2000000;
        const REDIRECT = 0x4000000;
        const REVEAL = 0x8000000;
        const LINK = 0x10000000;
        const LOST_OVERLAY = 0x20000000;
    }
}

bitflags! {
    /// Transient card status bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
    pub struct Status: u32 {
        const DISABLED = 0x1;
        const TO_ENABLE = 0x2;
        const TO_DISABLE = 0x4;
        const PROC_COMPLETE = 0x8;
        const SET_TURN = 0x10;
        const NO_LEVEL = 0x20;
        const BATTLE_RESULT = 0x40;
        const SPSUMMON_STEP = 0x80;
        const FORM_CHANGED = 0x100;
        const SUMMONING = 0x200;
        const EFFECT_ENABLED = 0x400;
        const SUMMON_TURN = 0x800;
        const DESTROY_CONFIRMED = 0x1000;
        const LEAVE_CONFIRMED = 0x2000;
        const BATTLE_DESTROYED = 0x4000;
        const COPYING_EFFECT = 0x8000;
        const CHAINING = 0x10000;
        const SUMMON_DISABLED = 0x20000;
        const ACTIVATE_DISABLED = 0x40000;
        const EFFECT_REPLACED = 0x80000;
        const FUTURE_FUSION = 0x100000;
        const ATTACK_CANCELED = 0x200000;
        const INITIALIZING = 0x400000;
        const JUST_POS = 0x1000000;
        const CONTINUOUS_POS = 0x2000000;
        const FORBIDDEN = 0x4000000;
        const ACT_FROM_HAND = 0x8000000;
        const OPPO_BATTLE = 0x10000000;
        const FLIP_SUMMON_TURN = 0x20000000;
        const SPSUMMON_TURN = 0x40000000;
        const FLIP_SUMMON_DISABLED = 0x80000000;
    }
}

bitflags! {
    /// Reset events an effect can expire on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
    pub struct Reset: u32 {
        const SELF_TURN = 0x10000000;
        const OPPO_TURN = 0x20000000;
        const PHASE = 0x40000000;
        const CHAIN = 0x80000000;
        const EVENT = 0x1000;
        const CARD = 0x2000;
        const CODE = 0x4000;
        const COPY = 0x8000;
        const DISABLE = 0x10000;
        const TURN_SET = 0x20000;
        const TOGRAVE = 0x40000;
        const REMOVE = 0x80000;
        const TEMP_REMOVE = 0x100000;
        const TOHAND = 0x200000;
        const TODECK = 0x400000;
        const LEAVE = 0x800000;
        const TOFIELD = 0x1000000;
        const CONTROL = 0x2000000;
        const OVERLAY = 0x4000000;
        const MSCHANGE = 0x8000000;
    }
}

impl Reset {
    /// The standard "leaves its current state" mask used by engine-generated
    /// effects: any zone change, turning face-down or changing control.
    pub fn standard() -> Reset {
        Reset::EVENT
            | Reset::TURN_SET
            | Reset::TOGRAVE
            | Reset::REMOVE
            | Reset::TEMP_REMOVE
            | Reset::TOHAND
            | Reset::TODECK
            | Reset::LEAVE
            | Reset::TOFIELD
    }
}

bitflags! {
    /// Hint timings accumulated per player while handlers run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Timing: u32 {
        const DRAW_PHASE = 0x1;
        const STANDBY_PHASE = 0x2;
        const MAIN_END = 0x4;
        const BATTLE_START = 0x8;
        const BATTLE_END = 0x10;
        const END_PHASE = 0x20;
        const SUMMON = 0x40;
        const SPSUMMON = 0x80;
        const FLIPSUMMON = 0x100;
        const MSET = 0x200;
        const SSET = 0x400;
        const POS_CHANGE = 0x800;
        const ATTACK = 0x1000;
        const DAMAGE_STEP = 0x2000;
        const DAMAGE_CAL = 0x4000;
        const CHAIN_END = 0x8000;
        const DRAW = 0x10000;
        const DAMAGE = 0x20000;
        const RECOVER = 0x40000;
        const DESTROY = 0x80000;
        const REMOVE = 0x100000;
        const TOHAND = 0x200000;
        const TODECK = 0x400000;
        const TOGRAVE = 0x800000;
        const BATTLE_PHASE = 0x1000000;
        const EQUIP = 0x2000000;
    }
}

bitflags! {
    /// Rule-set switches for one duel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
    pub struct DuelFlags: u64 {
        const TEST_MODE = 0x01;
        const ATTACK_FIRST_TURN = 0x02;
        const USE_TRAPS_IN_NEW_CHAIN = 0x04;
        const SIX_STEP_BATLLE_STEP = 0x08;
        const PSEUDO_SHUFFLE = 0x10;
        const TRIGGER_WHEN_PRIVATE_KNOWLEDGE = 0x20;
        const SIMPLE_AI = 0x40;
        const RELAY = 0x80;
        const OBSOLETE_RULING = 0x100;
        const ONE_FACEUP_FIELD = 0x200;
        const PZONE = 0x400;
        const SEPARATE_PZONE = 0x800;
        const EMZONE = 0x1000;
        const FSX_MMZONE = 0x2000;
        const TRAP_MONSTERS_NOT_USE_ZONE = 0x4000;
        const RETURN_TO_EXTRA_DECK_TRIGGERS = 0x8000;
        const TRIGGER_ONLY_IN_LOCATION = 0x10000;
        const SPSUMMON_ONCE_OLD_NEGATE = 0x20000;
        const CANNOT_SUMMON_OATH_OLD = 0x40000;
        const NO_STANDBY_PHASE = 0x80000;
        const NO_MAIN_PHASE_2 = 0x100000;
        const THREE_COLUMNS_FIELD = 0x200000;
        const DRAW_UNTIL_5 = 0x400000;
        const NO_HAND_LIMIT = 0x800000;
        const UNLIMITED_SUMMONS = 0x1000000;
        const INVERTED_QUICK_PRIORITY = 0x2000000;
        const EQUIP_NOT_SENT_IF_MISSING_TARGET = 0x4000000;
        const ZERO_ATK_DESTROYED = 0x8000000;
        const STORE_ATTACK_REPLAYS = 0x10000000;
        const SINGLE_CHAIN_IN_DAMAGE_SUBSTEP = 0x20000000;
        const CAN_REPOS_IF_NON_SUMPLAYER = 0x40000000;
        const NORMAL_SUMMON_FACEUP_DEF = 0x800000000;
    }
}

bitflags! {
    /// Engine-wide switches turned on lazily by registered effects.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GlobalFlags: u32 {
        const DECK_REVERSE_CHECK = 0x1;
        const BRAINWASHING_CHECK = 0x2;
        const SCRAP_CHIMERA = 0x4;
        const DELAYED_QUICKEFFECT = 0x8;
        const DETACH_EVENT = 0x10;
        const MUST_BE_SMATERIAL = 0x20;
        const SPSUMMON_COUNT = 0x40;
        const XMAT_COUNT_LIMIT = 0x80;
        const SELF_TOGRAVE = 0x100;
        const SPSUMMON_ONCE = 0x200;
        const TUNE_MAGICIAN = 0x400;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_groups() {
        assert!(Position::FACEUP_DEFENSE.is_faceup());
        assert!(Position::FACEUP_DEFENSE.is_defense());
        assert!(Position::FACEDOWN_ATTACK.is_facedown());
        assert_eq!(Position::FACEUP.bits(), 0x5);
        assert_eq!(Position::FACEDOWN.bits(), 0xa);
    }

    #[test]
    fn test_flipped_faceup() {
        assert_eq!(
            Position::FACEDOWN_DEFENSE.flipped_faceup(),
            Position::FACEUP_DEFENSE
        );
        assert_eq!(
            (Position::FACEDOWN_ATTACK | Position::FACEUP_DEFENSE).flipped_faceup(),
            Position::FACEUP
        );
    }

    #[test]
    fn test_reason_wire_bits() {
        assert_eq!((Reason::DESTROY | Reason::EFFECT).bits(), 0x41);
        assert_eq!(Reason::RULE.bits(), 0x400);
    }
}
