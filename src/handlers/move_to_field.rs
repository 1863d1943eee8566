//! Zone placement.
//!
//! Everything that puts a card onto the field funnels through
//! [`MoveToField`]: it resolves the requested zone mask to one slot (or asks
//! for it), settles the position, performs the move and raises the entry
//! events. `ret` distinguishes ordinary placement (0), a card returning from
//! a temporary banishment (1) and a trap monster going back to its old
//! spell/trap slot (2). The result is written to returns slot 0.

use crate::actions::Actions;
use crate::codes::{effect as code, event, hint};
use crate::decision::SelectRequest;
use crate::effect::{Effect, EffectFlags, EffectType};
use crate::flags::{DuelFlags, GlobalFlags, Position, Reason, Reset, Status};
use crate::handlers::draw::reveal_deck_top;
use crate::handlers::select::place_mask;
use crate::ids::{CardId, PlayerId};
use crate::player::FIELD_ZONE_SEQ;
use crate::process::{Flow, Process, unknown_step};
use crate::query::Ctx;
use crate::script::ScriptArg;
use crate::types::CardType;
use crate::zone::{Location, LocationReason};

/// Resolve a position mask to one concrete position.
pub fn pick_position(positions: Position) -> Position {
    [
        Position::FACEUP_ATTACK,
        Position::FACEDOWN_DEFENSE,
        Position::FACEUP_DEFENSE,
        Position::FACEDOWN_ATTACK,
    ]
    .into_iter()
    .find(|p| positions.contains(*p))
    .unwrap_or(Position::FACEUP_ATTACK)
}

fn location_reason_value(reason: LocationReason) -> i64 {
    match reason {
        LocationReason::ToField => 0x1,
        LocationReason::Control => 0x2,
    }
}

#[derive(Debug, Clone)]
pub struct MoveToField {
    pub target: CardId,
    pub enable: bool,
    pub ret: u8,
    pub pzone: bool,
    pub zone: u32,
    pub rule: bool,
    pub location_reason: LocationReason,
    pub confirm: bool,
    /// Row and slot chosen at step 1.
    placed: Option<(Location, u32)>,
}

impl MoveToField {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        target: CardId,
        enable: bool,
        ret: u8,
        pzone: bool,
        zone: u32,
        rule: bool,
        location_reason: LocationReason,
        confirm: bool,
    ) -> Self {
        Self {
            target,
            enable,
            ret,
            pzone,
            zone,
            rule,
            location_reason,
            confirm,
            placed: None,
        }
    }

    fn answer_place(ctx: &mut Ctx<'_>, player: PlayerId, location: Location, sequence: u32) {
        ctx.state.returns.set(0, i64::from(player.0));
        ctx.state.returns.set(1, i64::from(location.bits()));
        ctx.state.returns.set(2, i64::from(sequence));
    }

    fn is_field_spell_move(&self, ctx: &Ctx<'_>, location: Location) -> bool {
        location == Location::SZONE
            && self.zone == 1 << FIELD_ZONE_SEQ
            && ctx.state.card(self.target).data.card_type.is_field_card()
    }

    /// Row the card lands in instead of `location` under a zone override.
    fn override_row(&self, ctx: &mut Ctx<'_>, playerid: PlayerId, location: Location) -> Option<Location> {
        if self.pzone || self.is_field_spell_move(ctx, location) {
            return None;
        }
        if location == Location::MZONE && ctx.is_player_affected_by_effect(playerid, code::ORICA) {
            Some(Location::SZONE)
        } else if location == Location::SZONE && ctx.is_player_affected_by_effect(playerid, code::SANCT) {
            Some(Location::MZONE)
        } else {
            None
        }
    }

    /// Stamp the zone override effect on a card that landed in the other row.
    fn apply_override(ctx: &mut Ctx<'_>, card: CardId, playerid: PlayerId, requested: Location, landed: Location) {
        let (player_code, single_code, other_code) = if requested == Location::MZONE && landed == Location::SZONE {
            (code::ORICA, code::ORICA_SZONE, code::SANCT_MZONE)
        } else if requested == Location::SZONE && landed == Location::MZONE {
            (code::SANCT, code::SANCT_MZONE, code::ORICA_SZONE)
        } else {
            return;
        };
        if ctx.is_card_affected_by(card, single_code) {
            return;
        }
        let Some(source) = ctx.filter_player_effect(playerid, player_code).into_iter().next() else {
            return;
        };
        let mut effect = Effect::builder(single_code, EffectType::SINGLE)
            .handler(card)
            .flags(EffectFlags::CANNOT_DISABLE | EffectFlags::IGNORE_IMMUNE | EffectFlags::UNCOPYABLE)
            .reset((Reset::standard() | Reset::CONTROL) - Reset::TURN_SET, 0)
            .build();
        effect.owner = ctx.state.effect(source).owner;
        ctx.state.add_effect(effect);
        ctx.state.reset_card_code(card, other_code);
    }

    /// Spend count-limited "must use this monster zone" effects the placement
    /// satisfied.
    fn consume_zone_locks(&self, ctx: &mut Ctx<'_>, move_player: PlayerId) {
        let card = self.target;
        let mut locks = ctx.filter_player_effect(PlayerId::ZERO, code::MUST_USE_MZONE);
        locks.extend(ctx.filter_player_effect(PlayerId::ONE, code::MUST_USE_MZONE));
        locks.extend(ctx.filter_effect(card, code::MUST_USE_MZONE));
        let current = ctx.state.card(card).current;
        let args = [
            ScriptArg::Player(current.controller),
            ScriptArg::Player(move_player),
            ScriptArg::Int(location_reason_value(self.location_reason)),
        ];
        for e in locks {
            let effect = ctx.state.effect(e);
            if effect.is_flag(EffectFlags::COUNT_LIMIT) && effect.count_limit == 0 {
                continue;
            }
            if let Some(operation) = effect.operation {
                let mut check = vec![ScriptArg::Effect(e)];
                check.extend(args.iter().cloned());
                if !ctx.check_condition(operation, &check) {
                    continue;
                }
            }
            let mut value = if ctx.state.effect(e).is_flag(EffectFlags::PLAYER_TARGET) {
                ctx.effect_value(e, &args)
            } else {
                let mut with_card = vec![ScriptArg::Card(card)];
                with_card.extend(args.iter().cloned());
                ctx.effect_value(e, &with_card)
            } as u32;
            if ctx.state.effect_handler_player(e) != current.controller {
                value >>= 16;
            }
            if value & (1 << current.sequence) != 0 {
                ctx.state.effect_mut(e).dec_count();
            }
        }
    }

    /// Cards set to become monsters on placement ("trap monsters").
    fn apply_pre_monster(ctx: &mut Ctx<'_>, card: CardId) {
        let Some(pre) = ctx.filter_effect(card, code::PRE_MONSTER).into_iter().next() else {
            return;
        };
        let mut card_type = CardType::from_bits_truncate(ctx.effect_value(pre, &[]) as u32);
        if card_type.contains(CardType::TRAP) {
            card_type |= CardType::TRAPMONSTER | ctx.state.card(card).data.card_type;
        }
        ctx.state.reset_card_code(card, code::PRE_MONSTER);
        let change = Effect::builder(code::CHANGE_TYPE, EffectType::SINGLE)
            .handler(card)
            .flags(EffectFlags::CANNOT_DISABLE)
            .value(i64::from((CardType::MONSTER | card_type).bits()))
            .reset(Reset::standard() - Reset::TURN_SET, 0)
            .build();
        ctx.state.add_effect(change);
        ctx.state.refresh_card_type(card);
        if card_type.contains(CardType::TRAPMONSTER) && !ctx.state.is_flag(DuelFlags::TRAP_MONSTERS_NOT_USE_ZONE) {
            let previous = ctx.state.card(card).previous;
            let (range, lock_code) = if previous.location == Location::MZONE {
                (Location::SZONE, code::USE_EXTRA_MZONE)
            } else {
                (Location::MZONE, code::USE_EXTRA_SZONE)
            };
            let lock = Effect::builder(lock_code, EffectType::FIELD)
                .handler(card)
                .range(range)
                .flags(EffectFlags::CANNOT_DISABLE)
                .value(1 + (0x10000_i64 << previous.sequence))
                .reset(Reset::standard(), 0)
                .build();
            ctx.state.add_effect(lock);
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let card = self.target;
        let param = ctx.state.card(card).to_field_param;
        let (move_player, playerid, location) = (param.move_player, param.playerid, param.location);
        match step {
            0 => {
                ctx.state.returns.set(0, 0);
                if self.ret == 1 {
                    let c = ctx.state.card(card);
                    let same_source = match (c.current.reason_effect, ctx.state.core.reason_effect) {
                        (Some(own), Some(now)) => ctx.state.effect(own).owner == ctx.state.effect(now).owner,
                        _ => false,
                    };
                    if !c.current.reason.contains(Reason::TEMPORARY) || !same_source {
                        return Flow::Done;
                    }
                }
                let code = ctx.state.card(card).data.code;
                if self.is_field_spell_move(ctx, location) {
                    if let Some(old) = ctx.state.player(playerid).field_card(Location::SZONE, FIELD_ZONE_SEQ) {
                        let controller = ctx.state.card(old).current.controller;
                        if ctx.state.is_flag(DuelFlags::ONE_FACEUP_FIELD) {
                            ctx.destroy([old].into(), None, Reason::RULE, controller, PlayerId::NONE, Location::GRAVE, 0);
                        } else {
                            ctx.send_to(
                                [old].into(),
                                None,
                                Reason::RULE,
                                controller,
                                PlayerId::NONE,
                                Location::GRAVE,
                                0,
                                Position::empty(),
                                false,
                            );
                        }
                    }
                    Self::answer_place(ctx, playerid, Location::SZONE, FIELD_ZONE_SEQ);
                    return Flow::Continue(1);
                }
                let pendulum = ctx.state.card(card).data.card_type.contains(CardType::PENDULUM);
                if self.pzone
                    && location == Location::SZONE
                    && pendulum
                    && ctx.state.is_flag(DuelFlags::PZONE)
                    && !ctx.is_card_affected_by(card, code::ORICA_SZONE)
                {
                    let mut free = 0u32;
                    for slot in 0..2u32 {
                        let seq = ctx.state.pzone_sequence(slot);
                        if self.zone & (1 << slot) != 0 && ctx.state.is_location_useable(playerid, Location::SZONE, seq) {
                            free |= 1 << seq;
                        }
                    }
                    if free == 0 {
                        return Flow::Done;
                    }
                    ctx.state.hint(hint::SELECTMSG, move_player, u64::from(code));
                    ctx.select_place(move_player, playerid, Location::SZONE, free, 1);
                    return Flow::Continue(1);
                }
                let mut free = ctx.state.free_zones(Some(card), playerid, location, self.zone & 0xff);
                if location == Location::MZONE && self.zone & 0x60 != 0 && self.zone != 0xff && !self.rule {
                    for seq in [5u32, 6] {
                        if self.zone & (1 << seq) != 0 && ctx.state.is_location_useable(playerid, location, seq) {
                            free |= 1 << seq;
                        }
                    }
                }
                let alternate = self.override_row(ctx, playerid, location);
                let alt_free = alternate.map_or(0, |row| ctx.state.free_zones(Some(card), playerid, row, 0x1f));
                let count = free.count_ones() + alt_free.count_ones();
                if self.ret == 1 {
                    let c = ctx.state.card(card);
                    let unique_clash = !param.positions.intersects(Position::FACEDOWN)
                        && ctx.state.check_unique_onfield(card, playerid, location);
                    if count == 0 || c.get_status(Status::FORBIDDEN) || unique_clash {
                        let (re, rp) = (ctx.state.core.reason_effect, ctx.state.core.reason_player);
                        ctx.send_to(
                            [card].into(),
                            re,
                            Reason::RULE,
                            rp,
                            PlayerId::NONE,
                            Location::GRAVE,
                            0,
                            Position::empty(),
                            false,
                        );
                        return Flow::Continue(4);
                    }
                }
                if count == 0 {
                    return Flow::Done;
                }
                if !self.confirm && self.zone.count_ones() == 1 && free & self.zone != 0 {
                    Self::answer_place(ctx, playerid, location, self.zone.trailing_zeros());
                    return Flow::Continue(1);
                }
                if self.ret == 2 && !ctx.state.is_flag(DuelFlags::TRAP_MONSTERS_NOT_USE_ZONE) {
                    let previous = ctx.state.card(card).previous;
                    Self::answer_place(ctx, playerid, previous.location, previous.sequence);
                    return Flow::Continue(1);
                }
                let mut zones = place_mask(move_player, playerid, location, free);
                if let Some(row) = alternate {
                    zones |= place_mask(move_player, playerid, row, alt_free);
                }
                ctx.state.hint(hint::SELECTMSG, move_player, u64::from(code));
                ctx.push(Process::Request(SelectRequest::Place {
                    player: move_player,
                    zones,
                    count: 1,
                }));
                Flow::Continue(1)
            }
            1 => {
                let (_, answered, mut sequence) = ctx.selected_place();
                let landed = if answered.intersects(Location::MZONE | Location::SZONE) {
                    answered
                } else {
                    location
                };
                if self.is_field_spell_move(ctx, location) {
                    sequence = FIELD_ZONE_SEQ;
                }
                let current = ctx.state.card(card).current;
                if self.ret != 1 && landed != current.location {
                    let mut reset = Reset::EVENT;
                    if landed.is_onfield() {
                        reset |= Reset::TOFIELD;
                    }
                    if current.location.is_onfield() {
                        reset |= Reset::LEAVE;
                        if landed.is_onfield() && self.ret != 2 {
                            reset |= Reset::MSCHANGE;
                        }
                    }
                    ctx.state.reset_card(card, reset);
                }
                if self.ret == 1 {
                    ctx.state.card_mut(card).current.reason -= Reason::TEMPORARY;
                }
                Self::apply_override(ctx, card, playerid, location, landed);
                if (self.ret == 0 && landed != current.location) || self.ret == 1 {
                    ctx.state.card_mut(card).set_status(
                        Status::SUMMON_TURN
                            | Status::FLIP_SUMMON_TURN
                            | Status::SPSUMMON_TURN
                            | Status::SET_TURN
                            | Status::FORM_CHANGED,
                        false,
                    );
                }
                self.placed = Some((landed, sequence));
                let data_type = ctx.state.card(card).data.card_type;
                let position = if location != Location::MZONE {
                    pick_position(param.positions)
                } else if data_type.is_link_monster() {
                    Position::FACEUP_ATTACK
                } else if param.positions.bits().count_ones() == 1 {
                    param.positions
                } else {
                    ctx.select_position(move_player, card, param.positions);
                    return Flow::Continue(2);
                };
                ctx.state.returns.set(0, i64::from(position.bits()));
                Flow::Continue(2)
            }
            2 => {
                let Some((landed, sequence)) = self.placed else {
                    return Flow::Continue(4);
                };
                let position = pick_position(Position::from_bits_truncate(ctx.state.returns.get(0) as u32));
                let current = ctx.state.card(card).current;
                if current.location == Location::DECK && ctx.state.core.global_flag.contains(GlobalFlags::DECK_REVERSE_CHECK) {
                    let deck_len = ctx.state.player(current.controller).list_main.len() as u32;
                    if current.sequence > 0 && current.sequence + 1 == deck_len {
                        reveal_deck_top(ctx.state, current.controller, 1, 1);
                    }
                }
                {
                    let c = ctx.state.card_mut(card);
                    c.previous.controller = c.current.controller;
                    c.previous.location = c.current.location;
                    c.previous.sequence = c.current.sequence;
                    c.previous.position = c.current.position;
                    c.previous.pzone = c.current.pzone;
                }
                ctx.state.xyz_remove(card);
                ctx.state.move_card(playerid, card, landed, sequence, self.pzone);
                ctx.state.set_position(card, position);
                ctx.state.card_mut(card).set_status(Status::LEAVE_CONFIRMED, false);
                let reason = ctx.state.card(card).current.reason;
                ctx.state.move_message(card, reason);
                let is_monster = ctx.is_monster_on_field(card);
                if !is_monster {
                    let equips = ctx.state.card(card).equiping_cards.clone();
                    if !equips.is_empty() {
                        ctx.destroy(
                            equips.clone(),
                            None,
                            Reason::LOST_TARGET | Reason::RULE,
                            PlayerId::NONE,
                            PlayerId::NONE,
                            Location::GRAVE,
                            0,
                        );
                        for equip in equips {
                            ctx.state.unequip(equip);
                        }
                    }
                    let materials = ctx.state.card(card).xyz_materials.clone();
                    if !materials.is_empty() {
                        ctx.send_to(
                            materials.into_iter().collect(),
                            None,
                            Reason::LOST_TARGET | Reason::RULE,
                            PlayerId::NONE,
                            PlayerId::NONE,
                            Location::GRAVE,
                            0,
                            Position::FACEUP,
                            false,
                        );
                    }
                }
                let c = ctx.state.card(card);
                if c.previous.location.intersects(Location::SZONE | Location::MZONE) && c.equiping_target.is_some() {
                    ctx.state.unequip(card);
                }
                if is_monster {
                    self.consume_zone_locks(ctx, move_player);
                    Self::apply_pre_monster(ctx, card);
                }
                let c = ctx.state.card(card);
                if self.enable || (self.ret == 1 && c.current.position.is_faceup()) {
                    ctx.state.enable_field_effect(card, true);
                }
                let c = ctx.state.card(card);
                if self.ret == 1 && is_monster && !c.data.card_type.contains(CardType::MONSTER) {
                    ctx.send_to(
                        [card].into(),
                        None,
                        Reason::RULE,
                        PlayerId::NONE,
                        PlayerId::NONE,
                        Location::GRAVE,
                        0,
                        Position::empty(),
                        false,
                    );
                } else {
                    let current = c.current;
                    if c.previous.location == Location::GRAVE {
                        ctx.state.raise_single_event(
                            card,
                            event::LEAVE_GRAVE,
                            current.reason_effect,
                            current.reason,
                            move_player,
                            PlayerId::ZERO,
                            0,
                        );
                        ctx.state.raise_event(
                            [card],
                            event::LEAVE_GRAVE,
                            current.reason_effect,
                            current.reason,
                            move_player,
                            PlayerId::ZERO,
                            0,
                        );
                    }
                    ctx.state.raise_single_event(
                        card,
                        event::MOVE,
                        current.reason_effect,
                        current.reason,
                        current.reason_player,
                        PlayerId::ZERO,
                        0,
                    );
                    ctx.state.raise_event(
                        [card],
                        event::MOVE,
                        current.reason_effect,
                        current.reason,
                        current.reason_player,
                        PlayerId::ZERO,
                        0,
                    );
                    ctx.process_single_event();
                    ctx.process_instant_event();
                }
                Flow::Continue(3)
            }
            3 => {
                ctx.state.returns.set(0, 1);
                Flow::Done
            }
            4 => {
                ctx.state.returns.set(0, 0);
                Flow::Done
            }
            _ => unknown_step("MoveToField", step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_position_prefers_faceup_attack() {
        assert_eq!(pick_position(Position::FACEUP), Position::FACEUP_ATTACK);
        assert_eq!(pick_position(Position::DEFENSE), Position::FACEDOWN_DEFENSE);
        assert_eq!(pick_position(Position::FACEDOWN_ATTACK), Position::FACEDOWN_ATTACK);
        assert_eq!(pick_position(Position::empty()), Position::FACEUP_ATTACK);
    }
}
