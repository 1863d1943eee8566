//! Battle position changes.
//!
//! The requested position of each card is staged in `position_param` by
//! [`crate::actions::Actions::change_position`]. Face-down flips of trap
//! monsters send them back to the spell/trap zone; when that zone is short
//! the controller picks which of them go to the graveyard instead.

use crate::actions::Actions;
use crate::codes::{effect as code, event, hint, prompt};
use crate::flags::{Position, Reason, Reset, Status, Timing};
use crate::group::{CardSet, GroupId};
use crate::ids::{CardId, EffectId, PlayerId};
use crate::message::Message;
use crate::process::{Flow, unknown_step};
use crate::query::Ctx;
use crate::script::ScriptArg;
use crate::types::CardType;
use crate::zone::{Location, LocationReason};

/// Summon type bits that survive a card being turned face-down.
const SUMMON_TYPE_KEEP_ON_SET: u32 = 0xdf00_ffff;

#[derive(Debug, Clone)]
pub struct ChangePos {
    pub targets: GroupId,
    pub reason_effect: Option<EffectId>,
    pub reason_player: PlayerId,
    pub enable: bool,
    oppo_selection: bool,
    to_grave: CardSet,
}

impl ChangePos {
    pub fn new(targets: GroupId, reason_effect: Option<EffectId>, reason_player: PlayerId, enable: bool) -> Self {
        Self {
            targets,
            reason_effect,
            reason_player,
            enable,
            oppo_selection: false,
            to_grave: CardSet::new(),
        }
    }

    fn can_change(&self, ctx: &mut Ctx<'_>, card: CardId) -> bool {
        let c = ctx.state.card(card);
        let npos = c.position_param;
        let opos = c.current.position;
        let is_token = c.is_token;
        if !c.current.location.intersects(Location::MZONE | Location::SZONE)
            || c.data.card_type.is_link_monster()
            || c.get_status(Status::SUMMONING | Status::SPSUMMON_STEP)
            || npos == opos
        {
            return false;
        }
        if self.reason_effect.is_some() && !ctx.is_affected_by_effect(card, self.reason_effect) {
            return false;
        }
        if !is_token && opos.is_faceup() && npos.is_facedown() && !ctx.is_capable_turn_set(card) {
            return false;
        }
        let Some(reason_effect) = self.reason_effect else {
            return true;
        };
        let locks = ctx.filter_effect(card, code::CANNOT_CHANGE_POS_E);
        if locks.is_empty() {
            return true;
        }
        let mut disallowed = Position::empty();
        for e in locks {
            let value = ctx.effect_value(e, &[ScriptArg::Effect(reason_effect)]) as u32;
            disallowed |= if value == 0 {
                Position::FACEUP | Position::FACEDOWN
            } else {
                Position::from_bits_truncate(value)
            };
        }
        !npos.intersects(disallowed)
    }

    /// Trap monsters of `player` being turned face-down.
    fn returning_traps(&self, ctx: &Ctx<'_>, player: PlayerId) -> Vec<CardId> {
        ctx.state
            .groups
            .cards(self.targets)
            .into_iter()
            .filter(|card| {
                let c = ctx.state.card(*card);
                c.current.position.is_faceup()
                    && c.position_param.is_facedown()
                    && c.current.card_type.contains(CardType::TRAPMONSTER)
                    && c.current.controller == player
            })
            .collect()
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                for card in ctx.state.groups.cards(self.targets) {
                    if !self.can_change(ctx, card) {
                        ctx.state.groups.remove(self.targets, card);
                    }
                }
                Flow::Continue(1)
            }
            1 => {
                let player = if self.oppo_selection {
                    self.reason_player.opponent()
                } else {
                    self.reason_player
                };
                let traps = self.returning_traps(ctx, player);
                if traps.is_empty() {
                    return Flow::Continue(3);
                }
                ctx.state.return_cards.list.clear();
                let free = ctx.state.get_useable_count(None, player, Location::SZONE, 0xff);
                if free <= 0 {
                    for card in traps {
                        self.to_grave.insert(card);
                        ctx.state.groups.remove(self.targets, card);
                    }
                    return Flow::Continue(3);
                }
                if traps.len() as i32 > free {
                    let excess = traps.len() as u32 - free as u32;
                    ctx.state.hint(hint::SELECTMSG, player, prompt::CONTROL_DENY);
                    ctx.select_card(player, prompt::CONTROL_DENY, false, excess, excess, traps);
                }
                Flow::Continue(2)
            }
            2 => {
                for card in std::mem::take(&mut ctx.state.return_cards.list) {
                    self.to_grave.insert(card);
                    ctx.state.groups.remove(self.targets, card);
                }
                Flow::Continue(3)
            }
            3 => {
                if !self.oppo_selection {
                    self.oppo_selection = true;
                    return Flow::Continue(1);
                }
                Flow::Continue(4)
            }
            4 => {
                let mut flips = CardSet::new();
                let mut sets = CardSet::new();
                let mut changed = CardSet::new();
                let mut equipings = CardSet::new();
                let cards = ctx.state.groups.cards(self.targets);
                for card in ctx.state.sorted_for_operation(&cards) {
                    let c = ctx.state.card(card);
                    let opos = c.current.position;
                    let mut npos = c.position_param;
                    if c.is_token && npos.is_facedown() {
                        npos = Position::FACEUP_DEFENSE;
                    }
                    let c = ctx.state.card_mut(card);
                    c.previous.position = opos;
                    c.current.position = npos;
                    let info = c.current;
                    let data_code = c.data.code;
                    if npos.is_defense() && !ctx.is_card_affected_by(card, code::DEFENSE_ATTACK) {
                        ctx.state.card_mut(card).set_status(Status::ATTACK_CANCELED, true);
                    }
                    ctx.state.card_mut(card).set_status(Status::JUST_POS, true);
                    ctx.state.messages.push(Message::PosChange {
                        code: data_code,
                        controller: info.controller,
                        location: info.location,
                        sequence: info.sequence as u8,
                        previous: opos,
                        current: npos,
                    });
                    ctx.state.core.hint_timing[info.controller.index() & 1] |= Timing::POS_CHANGE;
                    let is_monster = ctx.is_monster_on_field(card);
                    if opos.is_facedown() && npos.is_faceup() {
                        let fieldid = ctx.state.new_fieldid();
                        ctx.state.card_mut(card).fieldid = fieldid;
                        if ctx.state.check_unique_onfield(card, info.controller, info.location) {
                            ctx.state.card_mut(card).unique_fieldid = u32::MAX;
                        }
                        if is_monster {
                            ctx.state.raise_single_event(
                                card,
                                event::FLIP,
                                self.reason_effect,
                                Reason::empty(),
                                self.reason_player,
                                PlayerId::ZERO,
                                0,
                            );
                            flips.insert(card);
                        }
                        if self.enable {
                            ctx.state.enable_field_effect(card, true);
                        }
                    }
                    if is_monster {
                        ctx.state.raise_single_event(
                            card,
                            event::CHANGE_POS,
                            self.reason_effect,
                            Reason::empty(),
                            self.reason_player,
                            PlayerId::ZERO,
                            0,
                        );
                        changed.insert(card);
                    }
                    let mut trap_monster = false;
                    if opos.is_faceup() && npos.is_facedown() {
                        trap_monster = ctx.state.card(card).current.card_type.contains(CardType::TRAPMONSTER);
                        ctx.state.reset_card(card, Reset::EVENT | Reset::TURN_SET);
                        ctx.state.enable_field_effect(card, false);
                        let c = ctx.state.card_mut(card);
                        c.set_status(Status::SUMMON_DISABLED | Status::ACTIVATE_DISABLED, false);
                        c.set_status(Status::SET_TURN, true);
                        c.previous.location = Location::empty();
                        c.summon.summon_type &= SUMMON_TYPE_KEEP_ON_SET;
                    }
                    if npos.is_facedown() {
                        for equip in ctx.state.card(card).equiping_cards.clone() {
                            equipings.insert(equip);
                            ctx.state.unequip(equip);
                        }
                        ctx.state.unequip(card);
                    }
                    if trap_monster {
                        let controller = info.controller;
                        ctx.move_to_field(
                            card,
                            controller,
                            controller,
                            Location::SZONE,
                            Position::FACEDOWN,
                            false,
                            2,
                            0xff,
                            false,
                            LocationReason::ToField,
                            false,
                        );
                        ctx.state.raise_single_event(
                            card,
                            event::SSET,
                            self.reason_effect,
                            Reason::empty(),
                            self.reason_player,
                            PlayerId::ZERO,
                            0,
                        );
                        sets.insert(card);
                    }
                }
                ctx.process_single_event();
                for (set, code) in [(flips, event::FLIP), (sets, event::SSET), (changed, event::CHANGE_POS)] {
                    if !set.is_empty() {
                        ctx.state.raise_event(set, code, self.reason_effect, Reason::empty(), self.reason_player, PlayerId::ZERO, 0);
                    }
                }
                ctx.process_instant_event();
                if !equipings.is_empty() {
                    ctx.destroy(
                        equipings,
                        None,
                        Reason::LOST_TARGET | Reason::RULE,
                        PlayerId::NONE,
                        PlayerId::NONE,
                        Location::GRAVE,
                        0,
                    );
                }
                let to_grave = std::mem::take(&mut self.to_grave);
                if !to_grave.is_empty() {
                    ctx.send_to(
                        to_grave,
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
                Flow::Continue(5)
            }
            5 => {
                let operated = ctx.state.groups.cards(self.targets);
                ctx.state.returns.set(0, operated.len() as i64);
                ctx.state.core.operated_set = operated;
                Flow::Done
            }
            _ => unknown_step("ChangePos", step),
        }
    }
}
