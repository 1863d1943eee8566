//! Equipping a card to a monster.

use crate::actions::Actions;
use crate::codes::{effect as code, event};
use crate::effect::{Effect, EffectFlags, EffectType};
use crate::flags::{DuelFlags, Position, Reason, Reset, Timing};
use crate::group::CardSet;
use crate::ids::{CardId, PlayerId};
use crate::process::{Flow, unknown_step};
use crate::query::Ctx;
use crate::types::CardType;
use crate::zone::{Location, LocationReason};

/// Reset mask of the type change an equipped non-equip card receives.
fn equip_type_reset() -> Reset {
    Reset::EVENT
        | Reset::TURN_SET
        | Reset::TOGRAVE
        | Reset::REMOVE
        | Reset::TEMP_REMOVE
        | Reset::TOHAND
        | Reset::TODECK
        | Reset::TOFIELD
}

/// The type an equipped card takes on when it is not an equip card by print.
fn equip_type_change(data: CardType, current: CardType) -> (u32, CardType) {
    if current.contains(CardType::TRAP) {
        (code::ADD_TYPE, CardType::EQUIP)
    } else if data.contains(CardType::UNION) {
        (code::CHANGE_TYPE, CardType::EQUIP | CardType::SPELL | CardType::UNION)
    } else if data.contains(CardType::TOKEN) {
        (code::CHANGE_TYPE, CardType::EQUIP | CardType::SPELL | CardType::TOKEN)
    } else {
        (code::CHANGE_TYPE, CardType::EQUIP | CardType::SPELL)
    }
}

#[derive(Debug, Clone)]
pub struct Equip {
    pub equip_player: PlayerId,
    pub equip_card: CardId,
    pub target: CardId,
    pub faceup: bool,
    /// Part of a batch: events are raised by whoever completes the batch.
    pub is_step: bool,
}

impl Equip {
    pub fn new(equip_player: PlayerId, equip_card: CardId, target: CardId, faceup: bool, is_step: bool) -> Self {
        Self {
            equip_player,
            equip_card,
            target,
            faceup,
            is_step,
        }
    }

    /// Is the card sitting in a spell/trap zone as a non-monster?
    fn is_spell_on_field(ctx: &mut Ctx<'_>, card: CardId) -> bool {
        match ctx.state.card(card).current.location {
            l if l == Location::SZONE => !ctx.is_card_affected_by(card, code::ORICA_SZONE),
            l if l == Location::MZONE => ctx.is_card_affected_by(card, code::SANCT_MZONE),
            _ => false,
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let equip = self.equip_card;
        let target = self.target;
        match step {
            0 => {
                ctx.state.returns.set(0, 0);
                let reason_effect = ctx.state.core.reason_effect;
                if !ctx.is_affected_by_effect(equip, reason_effect) || equip == target {
                    return Flow::Done;
                }
                let mut to_grave = false;
                if !ctx.is_monster_on_field(target) || ctx.state.card(target).current.position.is_facedown() {
                    if ctx.state.is_flag(DuelFlags::EQUIP_NOT_SENT_IF_MISSING_TARGET) && ctx.is_monster_on_field(equip) {
                        return Flow::Done;
                    }
                    to_grave = true;
                }
                let in_spell_zone = Self::is_spell_on_field(ctx, equip);
                if !in_spell_zone && ctx.state.get_useable_count(Some(equip), self.equip_player, Location::SZONE, 0xff) <= 0 {
                    to_grave = true;
                }
                if to_grave {
                    if ctx.state.card(equip).current.location != Location::GRAVE {
                        ctx.send_to(
                            CardSet::from([equip]),
                            None,
                            Reason::RULE,
                            PlayerId::NONE,
                            PlayerId::NONE,
                            Location::GRAVE,
                            0,
                            Position::FACEUP,
                            false,
                        );
                    }
                    return Flow::Continue(3);
                }
                if ctx.state.card(equip).equiping_target.is_some() {
                    ctx.state.unequip(equip);
                    ctx.state.enable_field_effect(equip, false);
                    return Flow::Continue(1);
                }
                if in_spell_zone {
                    if self.faceup && ctx.state.card(equip).current.position.is_facedown() {
                        ctx.change_position_to(equip, None, self.equip_player, Position::FACEUP_ATTACK, false, false);
                    }
                    return Flow::Continue(1);
                }
                ctx.state.enable_field_effect(equip, false);
                ctx.state.card_mut(equip).current.reason_player = self.equip_player;
                let position = if self.faceup || ctx.state.card(equip).current.position.is_faceup() {
                    Position::FACEUP
                } else {
                    Position::FACEDOWN
                };
                ctx.move_to_field(
                    equip,
                    self.equip_player,
                    self.equip_player,
                    Location::SZONE,
                    position,
                    false,
                    0,
                    0xff,
                    false,
                    LocationReason::ToField,
                    false,
                );
                Flow::Continue(1)
            }
            1 => {
                ctx.state.equip_to(equip, target);
                let c = ctx.state.card(equip);
                if !c.data.card_type.contains(CardType::EQUIP) {
                    let (type_code, value) = equip_type_change(c.data.card_type, c.current.card_type);
                    let effect = Effect::builder(type_code, EffectType::SINGLE)
                        .handler(equip)
                        .owner(equip)
                        .flags(EffectFlags::CANNOT_DISABLE)
                        .value(i64::from(value.bits()))
                        .reset(equip_type_reset(), 0)
                        .build();
                    ctx.state.add_effect(effect);
                    ctx.state.refresh_card_type(equip);
                }
                if self.is_step {
                    ctx.state.core.equiping_cards.insert(equip);
                    ctx.state.returns.set(0, 1);
                    return Flow::Done;
                }
                if ctx.state.card(equip).current.position.is_faceup() {
                    ctx.state.enable_field_effect(equip, true);
                }
                let (reason_effect, reason_player) = (ctx.state.core.reason_effect, ctx.state.core.reason_player);
                ctx.state.raise_single_event(target, event::EQUIP, reason_effect, Reason::empty(), reason_player, PlayerId::NONE, 0);
                ctx.state.raise_event([equip], event::EQUIP, reason_effect, Reason::empty(), reason_player, PlayerId::NONE, 0);
                let timing = ctx.state.timing_player(ctx.state.card(target));
                ctx.state.core.hint_timing[timing.index() & 1] |= Timing::EQUIP;
                ctx.process_single_event();
                ctx.process_instant_event();
                Flow::Continue(2)
            }
            2 => {
                ctx.state.returns.set(0, 1);
                Flow::Done
            }
            3 => {
                ctx.state.returns.set(0, 0);
                Flow::Done
            }
            _ => unknown_step("Equip", step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equip_type_change() {
        let trap = CardType::TRAP | CardType::CONTINUOUS;
        assert_eq!(equip_type_change(trap, trap), (code::ADD_TYPE, CardType::EQUIP));
        let union = CardType::MONSTER | CardType::UNION;
        assert_eq!(
            equip_type_change(union, union),
            (code::CHANGE_TYPE, CardType::EQUIP | CardType::SPELL | CardType::UNION)
        );
        let plain = CardType::MONSTER | CardType::NORMAL;
        assert_eq!(equip_type_change(plain, plain), (code::CHANGE_TYPE, CardType::EQUIP | CardType::SPELL));
    }
}
