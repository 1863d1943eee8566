//! Effect descriptors.
//!
//! An effect is data: a code saying what it modifies, a type saying how it is
//! applied (single, field, equip, continuous action, ...) and opaque script
//! references for its condition, cost, target, operation and value. The
//! engine never interprets a script reference itself; see [`crate::script`].

use bitflags::bitflags;

use crate::flags::Reset;
use crate::ids::{CardId, EffectId, PlayerId};
use crate::script::ScriptRef;
use crate::zone::Location;

bitflags! {
    /// How an effect is applied.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
    pub struct EffectType: u16 {
        const SINGLE = 0x1;
        const FIELD = 0x2;
        const EQUIP = 0x4;
        const ACTIONS = 0x8;
        const ACTIVATE = 0x10;
        const FLIP = 0x20;
        const IGNITION = 0x40;
        const TRIGGER_O = 0x80;
        const QUICK_O = 0x100;
        const TRIGGER_F = 0x200;
        const QUICK_F = 0x400;
        const CONTINUOUS = 0x800;
        const XMATERIAL = 0x1000;
        const GRANT = 0x2000;
        const TARGET = 0x4000;
    }
}

impl EffectType {
    pub fn is_trigger(self) -> bool {
        self.intersects(EffectType::TRIGGER_O | EffectType::TRIGGER_F)
    }

    /// Effects that are activated or solved (as opposed to modifying state).
    pub fn is_action(self) -> bool {
        self.intersects(
            EffectType::ACTIVATE
                | EffectType::FLIP
                | EffectType::IGNITION
                | EffectType::TRIGGER_O
                | EffectType::QUICK_O
                | EffectType::TRIGGER_F
                | EffectType::QUICK_F
                | EffectType::CONTINUOUS,
        )
    }
}

bitflags! {
    /// Behaviour switches on an effect.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
    pub struct EffectFlags: u64 {
        const INITIAL = 0x1;
        const FUNC_VALUE = 0x2;
        const COUNT_LIMIT = 0x4;
        const FIELD_ONLY = 0x8;
        const CARD_TARGET = 0x10;
        const IGNORE_RANGE = 0x20;
        const ABSOLUTE_TARGET = 0x40;
        const IGNORE_IMMUNE = 0x80;
        const SET_AVAILABLE = 0x100;
        const CANNOT_NEGATE = 0x200;
        const CANNOT_DISABLE = 0x400;
        const PLAYER_TARGET = 0x800;
        const BOTH_SIDE = 0x1000;
        const COPY_INHERIT = 0x2000;
        const DAMAGE_STEP = 0x4000;
        const DAMAGE_CAL = 0x8000;
        const DELAY = 0x10000;
        const SINGLE_RANGE = 0x20000;
        const UNCOPYABLE = 0x40000;
        const OATH = 0x80000;
        const SPSUM_PARAM = 0x100000;
        const REPEAT = 0x200000;
        const NO_TURN_RESET = 0x400000;
        const EVENT_PLAYER = 0x800000;
        const OWNER_RELATE = 0x1000000;
        const CANNOT_INACTIVATE = 0x2000000;
        const CLIENT_HINT = 0x4000000;
        const CONTINUOUS_TARGET = 0x8000000;
        const LIMIT_ZONE = 0x10000000;
        const IMMEDIATELY_APPLY = 0x80000000;
    }
}

/// The `value` slot of an effect: nothing, a constant, or a script callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectValue {
    #[default]
    None,
    Int(i64),
    Script(ScriptRef),
}

impl EffectValue {
    pub fn is_set(self) -> bool {
        !matches!(self, EffectValue::None)
    }
}

/// A registered effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
    pub id: EffectId,
    /// Card whose script created the effect.
    pub owner: Option<CardId>,
    /// Card the effect is attached to; `None` for duel-level effects.
    pub handler: Option<CardId>,
    /// Player the effect belongs to when it has no handler card.
    pub owner_player: PlayerId,
    pub effect_type: EffectType,
    pub flags: EffectFlags,
    pub code: u32,
    /// Locations of the handler in which the effect applies.
    pub range: Location,
    /// Target range on the handler's side and on the opponent's side.
    pub s_range: Location,
    pub o_range: Location,
    pub value: EffectValue,
    pub condition: Option<ScriptRef>,
    pub cost: Option<ScriptRef>,
    pub target: Option<ScriptRef>,
    pub operation: Option<ScriptRef>,
    pub description: u64,
    pub count_limit: u32,
    pub count_limit_max: u32,
    pub reset_flag: Reset,
    pub reset_count: u32,
    pub removed: bool,
}

impl Effect {
    pub fn builder(code: u32, effect_type: EffectType) -> EffectBuilder {
        EffectBuilder::new(code, effect_type)
    }

    pub fn is_flag(&self, flag: EffectFlags) -> bool {
        self.flags.intersects(flag)
    }

    /// Effects whose own purpose is to remove the card from play; replacement
    /// effects never cancel actions these cause.
    pub fn is_self_destroy_related(&self) -> bool {
        use crate::codes::effect;
        matches!(
            self.code,
            effect::UNIQUE_CHECK | effect::SELF_DESTROY | effect::SELF_TOGRAVE
        )
    }

    /// Consume one use of a count-limited effect.
    pub fn dec_count(&mut self) {
        if self.is_flag(EffectFlags::COUNT_LIMIT) && self.count_limit > 0 {
            self.count_limit -= 1;
        }
    }

    pub fn has_count_left(&self) -> bool {
        !self.is_flag(EffectFlags::COUNT_LIMIT) || self.count_limit > 0
    }

    /// Whether `reset` expires this effect.
    pub fn resets_on(&self, reset: Reset) -> bool {
        self.reset_flag.contains(Reset::EVENT) && self.reset_flag.intersects(reset - Reset::EVENT)
    }
}

/// Fluent constructor for [`Effect`]. Ids are assigned on registration.
#[derive(Debug, Clone)]
pub struct EffectBuilder {
    effect: Effect,
}

impl EffectBuilder {
    pub fn new(code: u32, effect_type: EffectType) -> Self {
        Self {
            effect: Effect {
                id: EffectId(u32::MAX),
                owner: None,
                handler: None,
                owner_player: PlayerId::NONE,
                effect_type,
                flags: EffectFlags::empty(),
                code,
                range: Location::empty(),
                s_range: Location::empty(),
                o_range: Location::empty(),
                value: EffectValue::None,
                condition: None,
                cost: None,
                target: None,
                operation: None,
                description: 0,
                count_limit: 0,
                count_limit_max: 0,
                reset_flag: Reset::empty(),
                reset_count: 0,
                removed: false,
            },
        }
    }

    /// Attach to a card; the card also becomes the owner unless one is set.
    pub fn handler(mut self, card: CardId) -> Self {
        self.effect.handler = Some(card);
        if self.effect.owner.is_none() {
            self.effect.owner = Some(card);
        }
        self
    }

    pub fn owner(mut self, card: CardId) -> Self {
        self.effect.owner = Some(card);
        self
    }

    pub fn owner_player(mut self, player: PlayerId) -> Self {
        self.effect.owner_player = player;
        self
    }

    pub fn flags(mut self, flags: EffectFlags) -> Self {
        self.effect.flags |= flags;
        self
    }

    pub fn range(mut self, range: Location) -> Self {
        self.effect.range = range;
        self
    }

    pub fn target_range(mut self, s_range: Location, o_range: Location) -> Self {
        self.effect.s_range = s_range;
        self.effect.o_range = o_range;
        self
    }

    /// Player effect reaching the handler's controller and/or the opponent.
    pub fn player_target(mut self, own: bool, opponent: bool) -> Self {
        self.effect.flags |= EffectFlags::PLAYER_TARGET;
        self.effect.s_range = if own { Location::DECK } else { Location::empty() };
        self.effect.o_range = if opponent { Location::DECK } else { Location::empty() };
        self
    }

    pub fn value(mut self, value: i64) -> Self {
        self.effect.value = EffectValue::Int(value);
        self
    }

    pub fn value_script(mut self, callback: ScriptRef) -> Self {
        self.effect.value = EffectValue::Script(callback);
        self
    }

    pub fn condition(mut self, callback: ScriptRef) -> Self {
        self.effect.condition = Some(callback);
        self
    }

    pub fn cost(mut self, callback: ScriptRef) -> Self {
        self.effect.cost = Some(callback);
        self
    }

    pub fn target(mut self, callback: ScriptRef) -> Self {
        self.effect.target = Some(callback);
        self
    }

    pub fn operation(mut self, callback: ScriptRef) -> Self {
        self.effect.operation = Some(callback);
        self
    }

    pub fn description(mut self, description: u64) -> Self {
        self.effect.description = description;
        self
    }

    pub fn count_limit(mut self, count: u32) -> Self {
        self.effect.flags |= EffectFlags::COUNT_LIMIT;
        self.effect.count_limit = count;
        self.effect.count_limit_max = count;
        self
    }

    pub fn reset(mut self, reset: Reset, count: u32) -> Self {
        self.effect.reset_flag = reset;
        self.effect.reset_count = count;
        self
    }

    pub fn build(self) -> Effect {
        self.effect
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::effect;

    #[test]
    fn test_count_limit() {
        let mut e = Effect::builder(effect::INDESTRUCTABLE_COUNT, EffectType::SINGLE)
            .count_limit(1)
            .build();
        assert!(e.has_count_left());
        e.dec_count();
        assert!(!e.has_count_left());
        e.dec_count();
        assert_eq!(e.count_limit, 0);
    }

    #[test]
    fn test_reset_matching() {
        let e = Effect::builder(effect::DISABLE, EffectType::SINGLE)
            .reset(Reset::standard(), 0)
            .build();
        assert!(e.resets_on(Reset::TOGRAVE));
        assert!(!e.resets_on(Reset::CONTROL));
        let permanent = Effect::builder(effect::DISABLE, EffectType::SINGLE).build();
        assert!(!permanent.resets_on(Reset::TOGRAVE));
    }

    #[test]
    fn test_self_destroy_related() {
        let e = Effect::builder(effect::SELF_DESTROY, EffectType::SINGLE).build();
        assert!(e.is_self_destroy_related());
        let e = Effect::builder(effect::DESTROY_REPLACE, EffectType::FIELD).build();
        assert!(!e.is_self_destroy_related());
    }

    #[test]
    fn test_handler_sets_owner() {
        let e = Effect::builder(effect::DISABLE, EffectType::SINGLE)
            .handler(CardId(4))
            .build();
        assert_eq!(e.owner, Some(CardId(4)));
        assert!(!EffectType::SINGLE.is_action());
        assert!((EffectType::FIELD | EffectType::TRIGGER_O).is_trigger());
    }
}
