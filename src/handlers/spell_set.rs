//! Setting spells and traps face-down, one at a time or as a batch.

use crate::actions::Actions;
use crate::codes::{effect as code, event, hint};
use crate::effect::{Effect, EffectType};
use crate::events::GameEvent;
use crate::flags::{Position, Reason, Reset, Status, Timing};
use crate::group::{CardSet, GroupId};
use crate::handlers::chain::ExecuteOperation;
use crate::ids::{CardId, EffectId, PlayerId};
use crate::message::{ConfirmedCard, Message};
use crate::player::FIELD_ZONE_SEQ;
use crate::process::{Flow, Process, unknown_step};
use crate::query::Ctx;
use crate::types::CardType;
use crate::zone::{Location, LocationReason};
use tracing::debug;

impl Ctx<'_> {
    /// Can `player` set `card` in `toplayer`'s spell & trap zone?
    pub fn is_spell_settable(&mut self, player: PlayerId, card: CardId, toplayer: PlayerId) -> bool {
        let c = self.state.card(card);
        let card_type = c.data.card_type;
        if c.current.location.intersects(Location::MZONE | Location::SZONE) {
            return false;
        }
        if !card_type.contains(CardType::FIELD) && self.state.get_useable_count(Some(card), toplayer, Location::SZONE, 0xff) <= 0 {
            return false;
        }
        if card_type.contains(CardType::MONSTER) && !self.is_card_affected_by(card, code::MONSTER_SSET) {
            return false;
        }
        if self.player_effect_blocks(player, code::CANNOT_SSET, card, Reason::empty()) {
            return false;
        }
        !self.is_card_affected_by(card, code::CANNOT_SSET)
    }

    fn run_sset_costs(&mut self, card: CardId, player: PlayerId) {
        for e in self.filter_effect(card, code::SSET_COST) {
            if self.state.effect(e).operation.is_some() {
                let mut ev = GameEvent::new(0);
                ev.cards.push(card);
                self.push(Process::ExecuteOperation(ExecuteOperation::new(e, player, ev)));
            }
        }
    }

    /// Bookkeeping once a card lands face-down: set-turn status, the spell
    /// type a monster takes on and the `Set` record.
    fn finish_spell_set(&mut self, card: CardId) {
        self.state.card_mut(card).set_status(Status::SET_TURN, true);
        if self.state.card(card).data.card_type.contains(CardType::MONSTER)
            && let Some(sset) = self.filter_effect(card, code::MONSTER_SSET).into_iter().next()
        {
            let value = self.effect_value(sset, &[]);
            let effect = Effect::builder(code::CHANGE_TYPE, EffectType::SINGLE)
                .handler(card)
                .owner(card)
                .value(value)
                .reset(Reset::EVENT | Reset::standard(), 0)
                .build();
            self.state.add_effect(effect);
            self.state.refresh_card_type(card);
        }
        let (code, info) = (self.state.card(card).data.code, self.state.loc_info(card));
        self.state.messages.push(Message::Set { code, info });
    }

    fn confirm_set(&mut self, toplayer: PlayerId, cards: &[CardId]) {
        let cards = cards
            .iter()
            .map(|&c| {
                let card = self.state.card(c);
                ConfirmedCard {
                    code: card.data.code,
                    controller: card.current.controller,
                    location: card.current.location,
                    sequence: card.current.sequence,
                }
            })
            .collect();
        self.state.messages.push(Message::ConfirmCards { player: toplayer, cards });
    }

    fn raise_sset(&mut self, cards: Vec<CardId>, reason_effect: Option<EffectId>, player: PlayerId) {
        self.state.raise_event(cards, event::SSET, reason_effect, Reason::empty(), player, player, 0);
        self.process_instant_event();
        if self.state.core.current_chain.is_empty() {
            self.adjust_all();
            self.state.core.hint_timing[player.index()] |= Timing::SSET;
        }
    }
}

/// Zone mask for a set card: the field zone for field spells, any other
/// spell & trap zone otherwise.
fn set_zone(card_type: CardType) -> u32 {
    if card_type.contains(CardType::FIELD) { 1 << FIELD_ZONE_SEQ } else { 0xff }
}

// ============================================================================
// SpellSet
// ============================================================================

#[derive(Debug, Clone)]
pub struct SpellSet {
    pub setplayer: PlayerId,
    pub target: CardId,
    pub toplayer: PlayerId,
    pub confirm: bool,
    reason_effect: Option<EffectId>,
}

impl SpellSet {
    pub fn new(setplayer: PlayerId, target: CardId, toplayer: PlayerId, confirm: bool) -> Self {
        Self {
            setplayer,
            target,
            toplayer,
            confirm,
            reason_effect: None,
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let target = self.target;
        match step {
            0 => {
                if !ctx.is_spell_settable(self.setplayer, target, self.toplayer) {
                    return Flow::Done;
                }
                self.reason_effect = ctx.state.core.reason_effect;
                ctx.run_sset_costs(target, self.setplayer);
                Flow::Continue(1)
            }
            1 => {
                ctx.state.enable_field_effect(target, false);
                let zone = set_zone(ctx.state.card(target).data.card_type);
                ctx.move_to_field(
                    target,
                    self.setplayer,
                    self.toplayer,
                    Location::SZONE,
                    Position::FACEDOWN,
                    false,
                    0,
                    zone,
                    false,
                    LocationReason::ToField,
                    false,
                );
                Flow::Continue(2)
            }
            2 => {
                if ctx.state.card(target).current.location != Location::SZONE {
                    return Flow::Done;
                }
                ctx.finish_spell_set(target);
                if self.confirm {
                    ctx.confirm_set(self.toplayer, &[target]);
                }
                debug!(card = target.0, player = self.setplayer.0, "spell set");
                ctx.raise_sset(vec![target], self.reason_effect, self.setplayer);
                Flow::Done
            }
            _ => unknown_step("SpellSet", step),
        }
    }
}

// ============================================================================
// SpellSetGroup
// ============================================================================

/// Set several spells and traps at once. The player picks a zone for each
/// card; the cards then land in the picked zones in an order hidden from
/// the opponent. The number of cards set ends up in returns slot 0.
#[derive(Debug, Clone)]
pub struct SpellSetGroup {
    pub setplayer: PlayerId,
    pub targets: GroupId,
    pub toplayer: PlayerId,
    pub confirm: bool,
    reason_effect: Option<EffectId>,
    pending: Vec<CardId>,
    /// Cards with the zone picked for them, in picking order.
    placed: Vec<(CardId, u32)>,
    used_zones: u32,
    next: usize,
}

impl SpellSetGroup {
    pub fn new(setplayer: PlayerId, targets: GroupId, toplayer: PlayerId, confirm: bool) -> Self {
        Self {
            setplayer,
            targets,
            toplayer,
            confirm,
            reason_effect: None,
            pending: Vec::new(),
            placed: Vec::new(),
            used_zones: 0,
            next: 0,
        }
    }

    fn set_cards(&self) -> Vec<CardId> {
        self.placed[..self.next].iter().map(|&(c, _)| c).collect()
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let (setplayer, toplayer) = (self.setplayer, self.toplayer);
        match step {
            0 => {
                ctx.state.core.operated_set.clear();
                let cards = ctx.state.groups.cards(self.targets);
                self.pending.clear();
                // Only as many cards as there are zones for them; the rest stay put.
                let (mut szone_taken, mut field_taken) = (0, false);
                for card in ctx.state.sorted_for_operation(&cards) {
                    if !ctx.is_spell_settable(setplayer, card, toplayer) {
                        continue;
                    }
                    if ctx.state.card(card).data.card_type.contains(CardType::FIELD) {
                        if field_taken {
                            continue;
                        }
                        field_taken = true;
                    } else {
                        let room = (ctx.state.free_zones(Some(card), toplayer, Location::SZONE, 0xff) & 0x1f).count_ones();
                        if szone_taken >= room {
                            continue;
                        }
                        szone_taken += 1;
                    }
                    self.pending.push(card);
                }
                if self.pending.is_empty() {
                    ctx.state.returns.set(0, 0);
                    return Flow::Done;
                }
                self.reason_effect = ctx.state.core.reason_effect;
                for card in self.pending.clone() {
                    ctx.run_sset_costs(card, setplayer);
                }
                self.placed.clear();
                self.used_zones = 0;
                self.next = 0;
                Flow::Continue(1)
            }
            1 => {
                let target = self.pending[0];
                let c = ctx.state.card(target);
                if c.data.card_type.contains(CardType::FIELD) {
                    ctx.state.returns.set(2, i64::from(FIELD_ZONE_SEQ));
                    return Flow::Continue(2);
                }
                let code = c.data.code;
                let free = ctx.state.free_zones(Some(target), toplayer, Location::SZONE, 0xff) & !self.used_zones & 0x1f;
                ctx.state.hint(hint::SELECTMSG, setplayer, u64::from(code));
                ctx.select_place(setplayer, toplayer, Location::SZONE, free, 1);
                Flow::Continue(2)
            }
            2 => {
                let target = self.pending.remove(0);
                let (_, _, seq) = ctx.selected_place();
                self.placed.push((target, seq));
                self.used_zones |= 1 << seq;
                if self.pending.is_empty() { Flow::Continue(3) } else { Flow::Continue(1) }
            }
            3 => {
                // Cards go in picking order into the lowest zones picked; the
                // shuffle afterwards moves each to its own pick.
                let (target, seq) = self.placed[self.next];
                let zone = if seq == FIELD_ZONE_SEQ {
                    1 << FIELD_ZONE_SEQ
                } else {
                    let mut picked: Vec<u32> = self.placed.iter().map(|&(_, s)| s).filter(|&s| s != FIELD_ZONE_SEQ).collect();
                    picked.sort_unstable();
                    let before = self.placed[..self.next].iter().filter(|&&(_, s)| s != FIELD_ZONE_SEQ).count();
                    1 << picked[before]
                };
                ctx.state.enable_field_effect(target, false);
                ctx.move_to_field(
                    target,
                    setplayer,
                    toplayer,
                    Location::SZONE,
                    Position::FACEDOWN,
                    false,
                    0,
                    zone,
                    false,
                    LocationReason::ToField,
                    false,
                );
                Flow::Continue(4)
            }
            4 => {
                let (target, _) = self.placed[self.next];
                if ctx.state.card(target).current.location == Location::SZONE {
                    ctx.finish_spell_set(target);
                    self.next += 1;
                } else {
                    self.placed.remove(self.next);
                }
                if self.next < self.placed.len() { Flow::Continue(3) } else { Flow::Continue(5) }
            }
            5 => {
                if self.confirm {
                    let cards = self.set_cards();
                    ctx.confirm_set(toplayer, &cards);
                }
                Flow::Continue(6)
            }
            6 => {
                let shuffled: Vec<(CardId, u32)> = self.placed.iter().copied().filter(|&(_, s)| s != FIELD_ZONE_SEQ).collect();
                if shuffled.len() > 1 {
                    let old = shuffled.iter().map(|&(c, _)| ctx.state.loc_info(c)).collect();
                    for &(card, _) in &shuffled {
                        let seq = ctx.state.card(card).current.sequence as usize;
                        if let Some(slot) = ctx.state.player_mut(toplayer).list_szone.get_mut(seq) {
                            *slot = None;
                        }
                    }
                    for &(card, seq) in &shuffled {
                        if let Some(slot) = ctx.state.player_mut(toplayer).list_szone.get_mut(seq as usize) {
                            *slot = Some(card);
                        }
                        ctx.state.card_mut(card).current.sequence = seq;
                    }
                    let new = shuffled.iter().map(|&(c, _)| ctx.state.loc_info(c)).collect();
                    ctx.state.messages.push(Message::ShuffleSetCard {
                        location: Location::SZONE,
                        old,
                        new,
                    });
                }
                Flow::Continue(7)
            }
            7 => {
                let cards = self.set_cards();
                ctx.state.core.operated_set = cards.iter().copied().collect::<CardSet>();
                debug!(count = cards.len(), player = setplayer.0, "spell set group");
                ctx.raise_sset(cards, self.reason_effect, setplayer);
                Flow::Continue(8)
            }
            8 => {
                ctx.state.returns.set(0, ctx.state.core.operated_set.len() as i64);
                Flow::Done
            }
            _ => unknown_step("SpellSetGroup", step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_zone() {
        assert_eq!(set_zone(CardType::SPELL | CardType::FIELD), 1 << 5);
        assert_eq!(set_zone(CardType::TRAP), 0xff);
    }
}
