//! Sending cards to the hand, deck, graveyard or banishment.
//!
//! Every departure from the field ends up here: destroy and release hand
//! their survivors over at the replacement step, effects call it directly.
//! The process checks capability, offers replacements, records last-known
//! information, applies redirects, moves cards one by one (with the optional
//! spell & trap zone detour for cards that allow it) and finally raises the
//! arrival events.

use crate::actions::Actions;
use crate::codes::{effect as code, event, hint, prompt};
use crate::decision::SelectRequest;
use crate::effect::{Effect, EffectFlags, EffectType};
use crate::events::GameEvent;
use crate::flags::{GlobalFlags, Position, Reason, Reset, Status, Timing};
use crate::group::{CardSet, GroupId};
use crate::handlers::chain::ExecuteOperation;
use crate::handlers::draw::reveal_deck_top;
use crate::handlers::replace::OperationReplace;
use crate::handlers::select::place_mask;
use crate::ids::{CardId, EffectId, PlayerId};
use crate::message::Message;
use crate::process::{Flow, Process, unknown_step};
use crate::query::Ctx;
use crate::zone::{LocInfo, Location};

/// Concrete position a card takes in `destination` for a requested one.
fn landing_position(requested: Position, destination: Location) -> Position {
    if destination == Location::EXTRA {
        return Position::FACEDOWN_DEFENSE;
    }
    if destination == Location::DECK {
        return if requested == Position::FACEUP_DEFENSE {
            requested
        } else {
            Position::FACEDOWN_DEFENSE
        };
    }
    if requested.contains(Position::FACEUP_ATTACK) || requested == Position::FACEUP {
        Position::FACEUP_ATTACK
    } else if requested.contains(Position::FACEDOWN_DEFENSE) || requested == Position::FACEDOWN {
        Position::FACEDOWN_DEFENSE
    } else if requested.is_empty() {
        Position::FACEUP_ATTACK
    } else {
        requested
    }
}

/// Copy the place (not the stats) of `current` into `previous`.
fn note_previous_place(ctx: &mut Ctx<'_>, card: CardId) {
    let c = ctx.state.card_mut(card);
    c.previous.controller = c.current.controller;
    c.previous.location = c.current.location;
    c.previous.sequence = c.current.sequence;
    c.previous.position = c.current.position;
    c.previous.pzone = c.current.pzone;
}

// ============================================================================
// SendToReplace
// ============================================================================

#[derive(Debug, Clone)]
pub struct SendToReplace {
    pub targets: GroupId,
    pub target: CardId,
}

impl SendToReplace {
    pub fn new(targets: GroupId, target: CardId) -> Self {
        Self { targets, target }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                let card = self.target;
                if !ctx.state.groups.contains(self.targets, card) {
                    return Flow::Done;
                }
                let c = ctx.state.card(card);
                if c.current.location == c.sendto_param.location && c.current.controller == c.sendto_param.playerid {
                    ctx.state.card_mut(card).restore_reason();
                    ctx.state.groups.remove(self.targets, card);
                    return Flow::Done;
                }
                if !c.current.reason.contains(Reason::RULE) {
                    ctx.state.returns.set(0, 0);
                    for e in ctx.filter_single_continuous_effect(card, code::SEND_REPLACE) {
                        ctx.push(Process::OperationReplace(OperationReplace::new(e, self.targets, Some(card), false)));
                    }
                }
                Flow::Done
            }
            _ => unknown_step("SendToReplace", step),
        }
    }
}

// ============================================================================
// SendTo
// ============================================================================

#[derive(Debug, Clone)]
pub struct SendTo {
    pub targets: GroupId,
    pub reason_effect: Option<EffectId>,
    pub reason: Reason,
    pub reason_player: PlayerId,
    /// Cards in move order.
    order: Vec<CardId>,
    index: usize,
    show_decktop: [bool; 2],
    leave_field: CardSet,
    leave_grave: CardSet,
    /// Xyz monsters that lost a material.
    detach: CardSet,
    /// Spell & trap zone detour effect of the current card.
    predirect: Option<EffectId>,
}

impl SendTo {
    pub fn new(targets: GroupId, reason_effect: Option<EffectId>, reason: Reason, reason_player: PlayerId) -> Self {
        Self {
            targets,
            reason_effect,
            reason,
            reason_player,
            order: Vec::new(),
            index: 0,
            show_decktop: [false; 2],
            leave_field: CardSet::new(),
            leave_grave: CardSet::new(),
            detach: CardSet::new(),
            predirect: None,
        }
    }

    fn drop_card(&self, ctx: &mut Ctx<'_>, card: CardId) {
        ctx.state.card_mut(card).restore_reason();
        ctx.state.groups.remove(self.targets, card);
    }

    fn is_disabled_arrival(ctx: &Ctx<'_>, card: CardId) -> bool {
        ctx.state
            .card(card)
            .get_status(Status::SUMMON_DISABLED | Status::ACTIVATE_DISABLED)
    }

    /// Bookkeeping shared by every card that actually moved.
    fn after_move(&mut self, ctx: &mut Ctx<'_>, card: CardId, old_location: Location, control_player: PlayerId) {
        ctx.state.card_mut(card).set_status(Status::LEAVE_CONFIRMED, false);
        if Self::is_disabled_arrival(ctx, card) {
            let c = ctx.state.card_mut(card);
            c.set_status(Status::SUMMON_DISABLED | Status::ACTIVATE_DISABLED, false);
            c.previous.location = Location::empty();
        } else if old_location.is_onfield() {
            ctx.state.reset_card(card, Reset::LEAVE);
            self.leave_field.insert(card);
        } else if old_location == Location::GRAVE {
            self.leave_grave.insert(card);
        }
        if ctx.state.card(card).previous.location == Location::OVERLAY {
            ctx.state.card_mut(card).previous.controller = control_player;
        }
    }

    fn detach_from_overlay(&mut self, ctx: &mut Ctx<'_>, card: CardId) {
        if let Some(target) = ctx.state.card(card).overlay_target {
            self.detach.insert(target);
            ctx.state.xyz_remove(card);
        }
    }

    fn current(&self) -> Option<CardId> {
        self.order.get(self.index).copied()
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                for card in ctx.state.groups.cards(self.targets) {
                    let c = ctx.state.card(card);
                    let current = c.current;
                    let param = c.sendto_param;
                    if current.reason.contains(Reason::RULE) {
                        continue;
                    }
                    let moving = c.get_status(Status::SUMMONING | Status::SPSUMMON_STEP);
                    let immune = !current.reason.intersects(Reason::COST | Reason::SUMMON | Reason::MATERIAL)
                        && !ctx.is_affected_by_effect(card, current.reason_effect);
                    let reason_player = ctx.state.core.reason_player;
                    if moving
                        || immune
                        || !ctx.is_capable_send_to(reason_player, card, param.location, param.position, current.reason)
                    {
                        self.drop_card(ctx, card);
                    }
                }
                if self.reason.contains(Reason::RULE) && ctx.state.groups.len(self.targets) > 0 {
                    return Flow::Continue(1);
                }
                ctx.operation_replace(code::SEND_REPLACE, 5, self.targets);
                Flow::Continue(1)
            }
            1 => {
                for card in ctx.state.groups.cards(self.targets) {
                    ctx.push(Process::SendToReplace(SendToReplace::new(self.targets, card)));
                }
                Flow::Continue(2)
            }
            2 => {
                let cards = ctx.state.groups.cards(self.targets);
                if cards.is_empty() {
                    ctx.state.returns.set(0, 0);
                    ctx.state.core.operated_set.clear();
                    return Flow::Done;
                }
                let mut leave_p = CardSet::new();
                for card in cards.iter().copied() {
                    let c = ctx.state.card(card);
                    if !c.current.location.is_onfield() {
                        continue;
                    }
                    if !Self::is_disabled_arrival(ctx, card) {
                        let current = c.current;
                        ctx.state.raise_single_event(
                            card,
                            event::LEAVE_FIELD_P,
                            current.reason_effect,
                            current.reason,
                            current.reason_player,
                            PlayerId::ZERO,
                            0,
                        );
                        leave_p.insert(card);
                    }
                    let c = ctx.state.card_mut(card);
                    c.snapshot_previous();
                    if c.current.position.is_facedown() {
                        c.previous.code = c.data.code;
                        c.previous.card_type = c.data.card_type;
                        c.previous.level = c.data.level;
                        c.previous.attack = c.data.attack;
                        c.previous.defense = c.data.defense;
                    }
                }
                if !leave_p.is_empty() {
                    ctx.state.raise_event(
                        leave_p,
                        event::LEAVE_FIELD_P,
                        self.reason_effect,
                        self.reason,
                        self.reason_player,
                        PlayerId::ZERO,
                        0,
                    );
                }
                ctx.process_single_event();
                ctx.process_instant_event();
                Flow::Continue(3)
            }
            3 => {
                let cards = ctx.state.groups.cards(self.targets);
                for card in cards.iter().copied() {
                    ctx.state.enable_field_effect(card, false);
                }
                for card in cards {
                    let c = ctx.state.card(card);
                    let reason = c.current.reason;
                    let onfield = c.current.location.is_onfield();
                    let mut dest = c.sendto_param.location;
                    let check_cb = dest == Location::GRAVE && ctx.is_card_affected_by(card, code::TO_GRAVE_REDIRECT_CB);
                    if onfield
                        && !Self::is_disabled_arrival(ctx, card)
                        && let Some((redirect, sequence)) = ctx.leave_field_redirect(card, reason)
                    {
                        let c = ctx.state.card_mut(card);
                        c.current.reason = (c.current.reason - Reason::TEMPORARY) | Reason::REDIRECT;
                        c.sendto_param.location = redirect;
                        c.sendto_param.sequence = sequence;
                        if redirect == Location::REMOVED {
                            c.sendto_param.position = c.sendto_param.position.flipped_faceup();
                        }
                        dest = redirect;
                    }
                    let reason = ctx.state.card(card).current.reason;
                    if let Some((redirect, sequence)) = ctx.destination_redirect(card, dest, reason)
                        && redirect != ctx.state.card(card).current.location
                    {
                        let c = ctx.state.card_mut(card);
                        c.current.reason |= Reason::REDIRECT;
                        c.sendto_param.location = redirect;
                        c.sendto_param.sequence = sequence;
                    }
                    ctx.state.card_mut(card).sendto_param.check_cb = check_cb;
                }
                Flow::Continue(4)
            }
            4 => {
                let cards = ctx.state.groups.cards(self.targets);
                self.order = ctx.state.sorted_for_operation(&cards);
                if ctx.state.core.global_flag.contains(GlobalFlags::DECK_REVERSE_CHECK) {
                    for p in PlayerId::both() {
                        let deck = &ctx.state.player(p).list_main;
                        // Cards leaving from the top of the deck uncover the one below.
                        let leaving = deck
                            .iter()
                            .rev()
                            .take_while(|c| cards.contains(c))
                            .count();
                        if leaving > 0 && leaving < deck.len() {
                            reveal_deck_top(ctx.state, p, leaving, leaving as u32);
                        }
                    }
                }
                self.index = 0;
                Flow::Continue(5)
            }
            5 => {
                let Some(card) = self.current() else {
                    return Flow::Continue(9);
                };
                self.predirect = None;
                if ctx.state.card(card).sendto_param.check_cb {
                    self.predirect = ctx.filter_effect(card, code::TO_GRAVE_REDIRECT_CB).into_iter().next();
                }
                if ctx.state.card(card).is_token {
                    let c = ctx.state.card(card);
                    let message = Message::Move {
                        code: c.data.code,
                        from: c.current.loc_info(),
                        to: LocInfo::default(),
                        reason: c.current.reason,
                    };
                    ctx.state.messages.push(message);
                    note_previous_place(ctx, card);
                    let fieldid = ctx.state.new_fieldid();
                    let c = ctx.state.card_mut(card);
                    c.current.reason -= Reason::TEMPORARY;
                    c.fieldid = fieldid;
                    ctx.state.reset_card(card, Reset::LEAVE);
                    ctx.state.remove_card(card);
                    self.leave_field.insert(card);
                    ctx.state.card_mut(card).set_status(Status::LEAVE_CONFIRMED, false);
                    self.index += 1;
                    return Flow::Continue(5);
                }
                let controller = ctx.state.card(card).current.controller;
                if self.predirect.is_some() && ctx.state.get_useable_count(Some(card), controller, Location::SZONE, 0xff) > 0 {
                    ctx.select_effect_yes_no(controller, card, prompt::CB_REDIRECT);
                } else {
                    ctx.state.returns.set(0, 0);
                }
                Flow::Continue(6)
            }
            6 => {
                if ctx.state.returns.get_bool(0) {
                    return Flow::Continue(7);
                }
                let Some(card) = self.current() else {
                    return Flow::Continue(9);
                };
                let c = ctx.state.card(card);
                let old_location = c.current.location;
                let param = c.sendto_param;
                let mut dest = param.location;
                if dest == Location::DECK && c.data.card_type.is_extra_deck_monster() {
                    dest = Location::EXTRA;
                }
                let control_player = ctx.state.timing_player(c);
                let timing = if dest == Location::GRAVE {
                    Timing::TOGRAVE
                } else if dest == Location::HAND {
                    Timing::TOHAND
                } else if dest.intersects(Location::DECK | Location::EXTRA) {
                    Timing::TODECK
                } else if dest == Location::REMOVED {
                    Timing::REMOVE
                } else {
                    Timing::empty()
                };
                ctx.state.core.hint_timing[control_player.index() & 1] |= timing;
                if dest.intersects(Location::HAND | Location::DECK | Location::EXTRA) {
                    ctx.state.card_mut(card).set_status(Status::PROC_COMPLETE, false);
                }
                let c = ctx.state.card(card);
                if c.current.controller != param.playerid || c.current.location != dest {
                    note_previous_place(ctx, card);
                    self.detach_from_overlay(ctx, card);
                    ctx.state.move_card(param.playerid, card, dest, param.sequence, false);
                    ctx.state.set_position(card, landing_position(param.position, dest));
                    let reason = ctx.state.card(card).current.reason;
                    ctx.state.move_message(card, reason);
                }
                let c = ctx.state.card(card);
                if (ctx.state.core.deck_reversed && c.current.location == Location::DECK)
                    || c.current.position == Position::FACEUP_DEFENSE
                {
                    self.show_decktop[control_player.index() & 1] = true;
                }
                self.after_move(ctx, card, old_location, control_player);
                self.index += 1;
                Flow::Continue(5)
            }
            // Spell & trap zone detour.
            7 => {
                let Some(card) = self.current() else {
                    return Flow::Continue(9);
                };
                let c = ctx.state.card(card);
                let controller = c.current.controller;
                let code = c.data.code;
                ctx.state.hint(hint::SELECTMSG, controller, u64::from(code));
                let szone = ctx.state.free_zones(Some(card), controller, Location::SZONE, 0x1f);
                let mut zones = place_mask(controller, controller, Location::SZONE, szone);
                if ctx.is_player_affected_by_effect(controller, code::SANCT) {
                    let mzone = ctx.state.free_zones(Some(card), controller, Location::MZONE, 0x1f);
                    zones |= place_mask(controller, controller, Location::MZONE, mzone);
                }
                ctx.push(Process::Request(SelectRequest::Place {
                    player: controller,
                    zones,
                    count: 1,
                }));
                Flow::Continue(8)
            }
            8 => {
                let Some(card) = self.current() else {
                    return Flow::Continue(9);
                };
                let (_, location, sequence) = ctx.selected_place();
                let location = if location == Location::MZONE {
                    Location::MZONE
                } else {
                    Location::SZONE
                };
                let c = ctx.state.card(card);
                let old_location = c.current.location;
                let controller = c.current.controller;
                let control_player = ctx.state.timing_player(c);
                note_previous_place(ctx, card);
                self.detach_from_overlay(ctx, card);
                ctx.state.move_card(controller, card, location, sequence, false);
                ctx.state.set_position(card, Position::FACEUP_ATTACK);
                if location == Location::MZONE {
                    let sanct = Effect::builder(code::SANCT_MZONE, EffectType::SINGLE)
                        .handler(card)
                        .flags(EffectFlags::CANNOT_DISABLE)
                        .reset(Reset::standard(), 0)
                        .build();
                    ctx.state.add_effect(sanct);
                }
                let reason = ctx.state.card(card).current.reason;
                ctx.state.move_message(card, reason);
                self.after_move(ctx, card, old_location, control_player);
                ctx.state.reset_card(card, Reset::MSCHANGE);
                if let Some(predirect) = self.predirect
                    && ctx.state.effect(predirect).operation.is_some()
                {
                    let event = GameEvent {
                        cards: ctx.state.groups.cards(self.targets).into_iter().collect(),
                        event_player: controller,
                        reason,
                        reason_effect: self.reason_effect,
                        reason_player: controller,
                        ..GameEvent::new(0)
                    };
                    ctx.push(Process::ExecuteOperation(ExecuteOperation::new(predirect, controller, event)));
                }
                self.index += 1;
                Flow::Continue(5)
            }
            9 => {
                for p in PlayerId::both() {
                    if self.show_decktop[p.index()] {
                        ctx.state.check_deck_top(p);
                    }
                }
                let cards = ctx.state.groups.cards(self.targets);
                for card in cards.iter().copied() {
                    let c = ctx.state.card(card);
                    let token = c.is_token;
                    let location = c.current.location;
                    let temporary = c.current.reason.contains(Reason::TEMPORARY);
                    let removed = location == Location::REMOVED || (token && c.sendto_param.location == Location::REMOVED);
                    if !token {
                        ctx.state.enable_field_effect(card, true);
                    }
                    if location == Location::HAND {
                        ctx.state.reset_card(card, Reset::TOHAND);
                    }
                    if location.intersects(Location::DECK | Location::EXTRA) {
                        ctx.state.reset_card(card, Reset::TODECK);
                    }
                    if location == Location::GRAVE {
                        ctx.state.reset_card(card, Reset::TOGRAVE);
                    }
                    if removed {
                        ctx.state.reset_card(card, if temporary { Reset::TEMP_REMOVE } else { Reset::REMOVE });
                    }
                }
                for (set, code) in [(&self.leave_field, event::LEAVE_FIELD), (&self.leave_grave, event::LEAVE_GRAVE)] {
                    for card in set.iter().copied() {
                        let current = ctx.state.card(card).current;
                        ctx.state.raise_single_event(
                            card,
                            code,
                            current.reason_effect,
                            current.reason,
                            current.reason_player,
                            PlayerId::ZERO,
                            0,
                        );
                    }
                }
                let detach_event = ctx.state.core.global_flag.contains(GlobalFlags::DETACH_EVENT);
                if detach_event {
                    for card in self.detach.iter().copied() {
                        if ctx.state.card(card).current.location.is_onfield() {
                            ctx.state.raise_single_event(
                                card,
                                event::DETACH_MATERIAL,
                                self.reason_effect,
                                self.reason,
                                self.reason_player,
                                PlayerId::ZERO,
                                0,
                            );
                        }
                    }
                }
                ctx.process_single_event();
                let mut batches = vec![
                    (std::mem::take(&mut self.leave_field), event::LEAVE_FIELD),
                    (std::mem::take(&mut self.leave_grave), event::LEAVE_GRAVE),
                ];
                if detach_event {
                    batches.push((std::mem::take(&mut self.detach), event::DETACH_MATERIAL));
                }
                for (set, code) in batches {
                    if !set.is_empty() {
                        ctx.state.raise_event(set, code, self.reason_effect, self.reason, self.reason_player, PlayerId::ZERO, 0);
                    }
                }
                ctx.process_instant_event();
                Flow::Continue(10)
            }
            10 => {
                let cards = ctx.state.groups.cards(self.targets);
                let mut to_hand = CardSet::new();
                let mut to_deck = CardSet::new();
                let mut to_grave = CardSet::new();
                let mut removed = CardSet::new();
                let mut discarded = CardSet::new();
                let mut released = CardSet::new();
                let mut destroyed = CardSet::new();
                let mut equipings = CardSet::new();
                let mut overlays = CardSet::new();
                for card in cards.iter().copied() {
                    ctx.state.unequip(card);
                    for equip in ctx.state.card(card).equiping_cards.clone() {
                        ctx.state.unequip(equip);
                        if ctx.state.card(equip).is_location(Location::SZONE | Location::MZONE) {
                            equipings.insert(equip);
                        }
                    }
                    let c = ctx.state.card(card);
                    let current = c.current;
                    let location = current.location;
                    if location == Location::HAND {
                        if c.owner != current.controller {
                            ctx.state.add_client_hint(card, prompt::NOT_OWNER_HAND, Reset::standard());
                        }
                        if !ctx.state.core.current_chain.is_empty() {
                            let reset = Reset::TOFIELD
                                | Reset::LEAVE
                                | Reset::TODECK
                                | Reset::TOHAND
                                | Reset::TEMP_REMOVE
                                | Reset::REMOVE
                                | Reset::TOGRAVE
                                | Reset::TURN_SET
                                | Reset::CHAIN;
                            ctx.state.add_client_hint(card, prompt::ADDED_BY_CHAIN, reset);
                        }
                    }
                    let c = ctx.state.card(card);
                    let mut single = Vec::new();
                    if location == Location::HAND {
                        to_hand.insert(card);
                        single.push(event::TO_HAND);
                    }
                    if location.intersects(Location::DECK | Location::EXTRA) {
                        to_deck.insert(card);
                        single.push(event::TO_DECK);
                    }
                    if location == Location::GRAVE && !current.reason.contains(Reason::RETURN) {
                        to_grave.insert(card);
                        single.push(event::TO_GRAVE);
                    }
                    if location == Location::REMOVED
                        || (c.is_token && c.sendto_param.location == Location::REMOVED)
                    {
                        removed.insert(card);
                        single.push(event::REMOVE);
                    }
                    if current.reason.contains(Reason::DISCARD) {
                        discarded.insert(card);
                        single.push(event::DISCARD);
                    }
                    if current.reason.contains(Reason::RELEASE) {
                        released.insert(card);
                        single.push(event::RELEASE);
                    }
                    if current.reason.contains(Reason::DESTROY) && !current.reason.contains(Reason::BATTLE) {
                        destroyed.insert(card);
                        single.push(event::DESTROYED);
                    }
                    overlays.extend(c.xyz_materials.iter().copied());
                    single.push(event::MOVE);
                    for code in single {
                        ctx.state.raise_single_event(
                            card,
                            code,
                            current.reason_effect,
                            current.reason,
                            current.reason_player,
                            PlayerId::ZERO,
                            0,
                        );
                    }
                }
                for (set, code) in [
                    (to_hand, event::TO_HAND),
                    (to_deck, event::TO_DECK),
                    (to_grave, event::TO_GRAVE),
                    (removed, event::REMOVE),
                    (discarded, event::DISCARD),
                    (released, event::RELEASE),
                    (destroyed, event::DESTROYED),
                ] {
                    if !set.is_empty() {
                        ctx.state.raise_event(set, code, self.reason_effect, self.reason, self.reason_player, PlayerId::ZERO, 0);
                    }
                }
                ctx.state.raise_event(
                    cards,
                    event::MOVE,
                    self.reason_effect,
                    self.reason,
                    self.reason_player,
                    PlayerId::ZERO,
                    0,
                );
                ctx.process_single_event();
                ctx.process_instant_event();
                let lost = Reason::RULE | Reason::LOST_TARGET;
                if !equipings.is_empty() {
                    ctx.destroy(equipings, None, lost, PlayerId::NONE, PlayerId::NONE, Location::GRAVE, 0);
                }
                if !overlays.is_empty() {
                    ctx.send_to(
                        overlays,
                        None,
                        lost,
                        PlayerId::NONE,
                        PlayerId::NONE,
                        Location::GRAVE,
                        0,
                        Position::FACEUP,
                        false,
                    );
                }
                Flow::Continue(11)
            }
            11 => {
                let operated = ctx.state.groups.cards(self.targets);
                ctx.state.returns.set(0, operated.len() as i64);
                ctx.state.core.operated_set = operated;
                Flow::Done
            }
            _ => unknown_step("SendTo", step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landing_positions() {
        assert_eq!(landing_position(Position::FACEUP, Location::GRAVE), Position::FACEUP_ATTACK);
        assert_eq!(landing_position(Position::FACEUP, Location::DECK), Position::FACEDOWN_DEFENSE);
        assert_eq!(
            landing_position(Position::FACEUP_DEFENSE, Location::DECK),
            Position::FACEUP_DEFENSE
        );
        assert_eq!(landing_position(Position::FACEDOWN, Location::REMOVED), Position::FACEDOWN_DEFENSE);
        assert_eq!(landing_position(Position::FACEUP, Location::EXTRA), Position::FACEDOWN_DEFENSE);
    }
}
