//! Control changes.
//!
//! A card's rightful controller is the value of the latest `SET_CONTROL`
//! effect it carries (its owner when there is none). [`GetControl`] and
//! [`SwapControl`] move cards and record the new claim; [`ControlAdjust`]
//! returns cards whose claim expired, trading places pairwise and
//! destroying what no longer fits.

use crate::actions::Actions;
use crate::codes::{effect as code, event, hint, prompt};
use crate::decision::SelectRequest;
use crate::effect::{Effect, EffectFlags, EffectType, EffectValue};
use crate::flags::{DuelFlags, Reason, Reset, Status};
use crate::game_state::DuelState;
use crate::group::{CardSet, GroupId};
use crate::handlers::select::place_mask;
use crate::ids::{CardId, EffectId, PlayerId};
use crate::process::{Flow, Process, unknown_step};
use crate::query::Ctx;
use crate::types::CardType;
use crate::zone::{Location, LocationReason};

/// Reset bits every control claim carries besides its phase reset.
fn control_reset() -> Reset {
    Reset::EVENT | Reset::TOGRAVE | Reset::REMOVE | Reset::TOHAND | Reset::TODECK | Reset::OVERLAY | Reset::MSCHANGE
}

impl DuelState {
    /// The player the card should be controlled by.
    pub fn control_status(&self, card: CardId) -> PlayerId {
        let c = self.card(card);
        c.single_effects
            .iter()
            .rev()
            .map(|e| self.effect(*e))
            .find(|e| e.code == code::SET_CONTROL && !e.removed)
            .and_then(|e| match e.value {
                EffectValue::Int(p) => Some(PlayerId(p as u8)),
                _ => None,
            })
            .unwrap_or(c.owner)
    }

    /// Record that `player` now controls `card`. A non-zero `reset_count`
    /// makes the claim expire with the given phase.
    pub fn set_control(&mut self, card: CardId, player: PlayerId, reset_phase: u32, reset_count: u32) {
        if self.control_status(card) == player {
            self.card_mut(card).current.controller = player;
            return;
        }
        let owner = self
            .core
            .reason_effect
            .and_then(|e| self.effect(e).handler)
            .unwrap_or(card);
        let mut reset = control_reset();
        if reset_count != 0 {
            reset |= Reset::PHASE | Reset::from_bits_retain(reset_phase);
            if !reset.intersects(Reset::SELF_TURN | Reset::OPPO_TURN) {
                reset |= Reset::SELF_TURN | Reset::OPPO_TURN;
            }
        }
        let mut effect = Effect::builder(code::SET_CONTROL, EffectType::SINGLE)
            .handler(card)
            .flags(EffectFlags::CANNOT_DISABLE)
            .value(i64::from(player.0))
            .reset(reset, reset_count)
            .build();
        effect.owner = Some(owner);
        self.add_effect(effect);
        self.card_mut(card).current.controller = player;
    }

    /// Gather monsters whose rightful controller differs from the current
    /// one into the control adjust sets. Returns whether any were found.
    pub fn collect_control_adjust(&mut self) -> bool {
        let mut found = false;
        for player in PlayerId::both() {
            for card in self.player(player).occupied(Location::MZONE) {
                if self.control_status(card) != player {
                    self.core.control_adjust_set[player.index()].insert(card);
                    found = true;
                }
            }
        }
        found
    }
}

fn can_take_control(
    ctx: &mut Ctx<'_>,
    card: CardId,
    reason_effect: Option<EffectId>,
    player: PlayerId,
) -> bool {
    let c = ctx.state.card(card);
    if c.overlay_target.is_some() || c.current.controller == player || c.current.controller.is_none() {
        return false;
    }
    if !ctx.is_monster_on_field(card) || !ctx.is_capable_change_control(card) {
        return false;
    }
    if reason_effect.is_some() && !ctx.is_affected_by_effect(card, reason_effect) {
        return false;
    }
    true
}

// ============================================================================
// GetControl
// ============================================================================

#[derive(Debug, Clone)]
pub struct GetControl {
    pub reason_effect: Option<EffectId>,
    pub chose_player: PlayerId,
    pub targets: GroupId,
    pub playerid: PlayerId,
    pub reset_phase: u32,
    pub reset_count: u32,
    pub zone: u32,
    destroy_set: CardSet,
    order: Vec<CardId>,
    index: usize,
}

impl GetControl {
    pub fn new(
        reason_effect: Option<EffectId>,
        chose_player: PlayerId,
        targets: GroupId,
        playerid: PlayerId,
        reset_phase: u32,
        reset_count: u32,
        zone: u32,
    ) -> Self {
        Self {
            reason_effect,
            chose_player,
            targets,
            playerid,
            reset_phase,
            reset_count,
            zone,
            destroy_set: CardSet::new(),
            order: Vec::new(),
            index: 0,
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let playerid = self.playerid;
        match step {
            0 => {
                self.destroy_set.clear();
                let trap_zone_rule = !ctx.state.is_flag(DuelFlags::TRAP_MONSTERS_NOT_USE_ZONE);
                for card in ctx.state.groups.cards(self.targets) {
                    let mut change = can_take_control(ctx, card, self.reason_effect, playerid);
                    if change
                        && trap_zone_rule
                        && ctx.state.card(card).current.card_type.contains(CardType::TRAPMONSTER)
                        && ctx.state.get_useable_count(Some(card), playerid, Location::SZONE, 0xff) <= 0
                    {
                        change = false;
                    }
                    if !change {
                        ctx.state.groups.remove(self.targets, card);
                    }
                }
                let free = ctx.state.get_useable_count(None, playerid, Location::MZONE, self.zone);
                let cards = ctx.state.groups.cards(self.targets);
                if free <= 0 {
                    self.destroy_set = cards;
                    ctx.state.groups.set_cards(self.targets, CardSet::new());
                    return Flow::Continue(5);
                }
                if cards.len() as i32 > free {
                    let excess = cards.len() as u32 - free as u32;
                    ctx.state.hint(hint::SELECTMSG, playerid, prompt::CONTROL_DENY);
                    ctx.state.return_cards.list.clear();
                    ctx.select_card(playerid, prompt::CONTROL_DENY, false, excess, excess, cards.into_iter().collect());
                    return Flow::Continue(1);
                }
                Flow::Continue(2)
            }
            1 => {
                for card in std::mem::take(&mut ctx.state.return_cards.list) {
                    self.destroy_set.insert(card);
                    ctx.state.groups.remove(self.targets, card);
                }
                Flow::Continue(2)
            }
            2 => {
                let cards = ctx.state.groups.cards(self.targets);
                self.order = ctx.state.sorted_for_operation(&cards);
                self.index = 0;
                Flow::Continue(3)
            }
            3 => {
                let Some(&card) = self.order.get(self.index) else {
                    return Flow::Continue(5);
                };
                let move_player = if self.chose_player.is_none() {
                    playerid
                } else {
                    self.chose_player
                };
                let position = ctx.state.card(card).current.position;
                ctx.move_to_field(
                    card,
                    move_player,
                    playerid,
                    Location::MZONE,
                    position,
                    false,
                    0,
                    self.zone,
                    false,
                    LocationReason::Control,
                    false,
                );
                Flow::Continue(4)
            }
            4 => {
                let card = self.order[self.index];
                ctx.state.card_mut(card).set_status(Status::ATTACK_CANCELED, true);
                ctx.state.set_control(card, playerid, self.reset_phase, self.reset_count);
                ctx.state.reset_card(card, Reset::CONTROL | Reset::EVENT);
                self.index += 1;
                Flow::Continue(3)
            }
            5 => {
                let reason_player = if self.chose_player.is_none() {
                    PlayerId::NONE
                } else {
                    ctx.state.core.reason_player
                };
                for card in ctx.state.groups.cards(self.targets) {
                    if !ctx.state.card(card).is_location(Location::ONFIELD) {
                        ctx.state.groups.remove(self.targets, card);
                        continue;
                    }
                    for code in [event::CONTROL_CHANGED, event::MOVE] {
                        ctx.state
                            .raise_single_event(card, code, self.reason_effect, Reason::EFFECT, reason_player, playerid, 0);
                    }
                }
                let cards = ctx.state.groups.cards(self.targets);
                if !cards.is_empty() {
                    for code in [event::CONTROL_CHANGED, event::MOVE] {
                        ctx.state
                            .raise_event(cards.clone(), code, self.reason_effect, Reason::EFFECT, reason_player, playerid, 0);
                    }
                }
                ctx.process_single_event();
                ctx.process_instant_event();
                Flow::Continue(6)
            }
            6 => {
                let destroy_set = std::mem::take(&mut self.destroy_set);
                if !destroy_set.is_empty() {
                    ctx.destroy(destroy_set, None, Reason::RULE, PlayerId::NONE, PlayerId::NONE, Location::GRAVE, 0);
                }
                Flow::Continue(7)
            }
            7 => {
                let operated = ctx.state.groups.cards(self.targets);
                ctx.state.returns.set(0, operated.len() as i64);
                ctx.state.core.operated_set = operated;
                Flow::Done
            }
            _ => unknown_step("GetControl", step),
        }
    }
}

// ============================================================================
// SwapControl
// ============================================================================

#[derive(Debug, Clone)]
pub struct SwapControl {
    pub reason_effect: Option<EffectId>,
    pub reason_player: PlayerId,
    pub targets1: GroupId,
    pub targets2: GroupId,
    pub reset_phase: u32,
    pub reset_count: u32,
    pairs: Vec<(CardId, CardId)>,
    index: usize,
    first_place: (Location, u32),
}

impl SwapControl {
    pub fn new(
        reason_effect: Option<EffectId>,
        reason_player: PlayerId,
        targets1: GroupId,
        targets2: GroupId,
        reset_phase: u32,
        reset_count: u32,
    ) -> Self {
        Self {
            reason_effect,
            reason_player,
            targets1,
            targets2,
            reset_phase,
            reset_count,
            pairs: Vec::new(),
            index: 0,
            first_place: (Location::MZONE, 0),
        }
    }

    /// Whether every card of `group` can be handed over from `player`.
    fn side_swappable(&self, ctx: &mut Ctx<'_>, group: GroupId, player: PlayerId) -> bool {
        for card in ctx.state.groups.cards(group) {
            let c = ctx.state.card(card);
            if c.overlay_target.is_some() || c.current.controller != player {
                return false;
            }
            if !ctx.is_monster_on_field(card) || !ctx.is_capable_change_control(card) {
                return false;
            }
            if self.reason_effect.is_some() && !ctx.is_affected_by_effect(card, self.reason_effect) {
                return false;
            }
        }
        // Cards leaving an extra monster zone need a main zone on the other side.
        let free = ctx.state.get_useable_count(None, player, Location::MZONE, 0xff);
        let extra = ctx
            .state
            .groups
            .cards(group)
            .into_iter()
            .filter(|c| ctx.state.card(*c).current.sequence >= 5 && ctx.state.card(*c).current.location == Location::MZONE)
            .count() as i32;
        free - extra >= 0
    }

    /// Ask `chooser` where the card coming over lands: a free main zone or
    /// the slot `leaving` vacates.
    fn ask_place(&self, ctx: &mut Ctx<'_>, chooser: PlayerId, leaving: CardId, arriving: CardId) {
        let vacated = ctx.state.card(leaving).current;
        let mut zones = 0;
        let mut mzone = ctx.state.free_zones(None, chooser, Location::MZONE, 0x1f);
        if vacated.location == Location::MZONE && vacated.sequence < 5 {
            mzone |= 1 << vacated.sequence;
        }
        zones |= place_mask(chooser, chooser, Location::MZONE, mzone);
        if !ctx.filter_player_effect(chooser, code::ORICA).is_empty() {
            let mut szone = ctx.state.free_zones(None, chooser, Location::SZONE, 0x1f);
            if vacated.location == Location::SZONE && vacated.sequence < 5 {
                szone |= 1 << vacated.sequence;
            }
            zones |= place_mask(chooser, chooser, Location::SZONE, szone);
        }
        let code = ctx.state.card(arriving).data.code;
        ctx.state.hint(hint::SELECTMSG, chooser, u64::from(code));
        ctx.push(Process::Request(SelectRequest::Place {
            player: chooser,
            zones,
            count: 1,
        }));
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                let cards1 = ctx.state.groups.cards(self.targets1);
                let cards2 = ctx.state.groups.cards(self.targets2);
                if cards1.is_empty() || cards1.len() != cards2.len() {
                    return Flow::Continue(10);
                }
                let first1 = ctx.state.sorted_for_operation(&cards1);
                let first2 = ctx.state.sorted_for_operation(&cards2);
                let p1 = ctx.state.card(first1[0]).current.controller;
                let p2 = ctx.state.card(first2[0]).current.controller;
                if p1 == p2 || p1.is_none() || p2.is_none() {
                    return Flow::Continue(10);
                }
                if !self.side_swappable(ctx, self.targets1, p1) || !self.side_swappable(ctx, self.targets2, p2) {
                    return Flow::Continue(10);
                }
                self.pairs = first1.into_iter().zip(first2).collect();
                self.index = 0;
                Flow::Continue(1)
            }
            1 => {
                let Some(&(card1, card2)) = self.pairs.get(self.index) else {
                    return Flow::Continue(4);
                };
                let p1 = ctx.state.card(card1).current.controller;
                self.ask_place(ctx, p1, card1, card2);
                Flow::Continue(2)
            }
            2 => {
                let (_, location, sequence) = ctx.selected_place();
                self.first_place = (location, sequence);
                let (card1, card2) = self.pairs[self.index];
                let p2 = ctx.state.card(card2).current.controller;
                self.ask_place(ctx, p2, card2, card1);
                Flow::Continue(3)
            }
            3 => {
                let (card1, card2) = self.pairs[self.index];
                let (_, loc2, seq2) = ctx.selected_place();
                let (loc1, seq1) = self.first_place;
                let requested1 = ctx.state.card(card1).current.location;
                let requested2 = ctx.state.card(card2).current.location;
                let p1 = ctx.state.card(card1).current.controller;
                let p2 = ctx.state.card(card2).current.controller;
                ctx.state.swap_card(card1, card2);
                ctx.state.move_card(p1, card2, loc1, seq1, false);
                ctx.state.move_card(p2, card1, loc2, seq2, false);
                ctx.state.reset_card(card1, Reset::CONTROL | Reset::EVENT);
                ctx.state.reset_card(card2, Reset::CONTROL | Reset::EVENT);
                ctx.state.set_control(card1, p2, self.reset_phase, self.reset_count);
                ctx.state.set_control(card2, p1, self.reset_phase, self.reset_count);
                mark_zone_override(ctx, card2, requested2, loc1);
                mark_zone_override(ctx, card1, requested1, loc2);
                ctx.state.card_mut(card1).set_status(Status::ATTACK_CANCELED, true);
                ctx.state.card_mut(card2).set_status(Status::ATTACK_CANCELED, true);
                self.index += 1;
                Flow::Continue(1)
            }
            4 => {
                let mut all = ctx.state.groups.cards(self.targets1);
                all.extend(ctx.state.groups.cards(self.targets2));
                for card in ctx.state.sorted_for_operation(&all) {
                    let controller = ctx.state.card(card).current.controller;
                    for code in [event::CONTROL_CHANGED, event::MOVE] {
                        ctx.state.raise_single_event(
                            card,
                            code,
                            self.reason_effect,
                            Reason::EFFECT,
                            self.reason_player,
                            controller,
                            0,
                        );
                    }
                }
                for code in [event::CONTROL_CHANGED, event::MOVE] {
                    ctx.state.raise_event(
                        all.clone(),
                        code,
                        self.reason_effect,
                        Reason::EFFECT,
                        self.reason_player,
                        PlayerId::ZERO,
                        0,
                    );
                }
                ctx.process_single_event();
                ctx.process_instant_event();
                ctx.state.core.operated_set = all;
                ctx.state.returns.set(0, 1);
                Flow::Done
            }
            10 => {
                ctx.state.core.operated_set.clear();
                ctx.state.returns.set(0, 0);
                Flow::Done
            }
            _ => unknown_step("SwapControl", step),
        }
    }
}

/// Tag a card that crossed between zone kinds while changing hands.
fn mark_zone_override(ctx: &mut Ctx<'_>, card: CardId, from: Location, to: Location) {
    if from == to || to != Location::SZONE {
        return;
    }
    let controller = ctx.state.card(card).current.controller;
    let Some(source) = ctx.filter_player_effect(controller, code::ORICA).into_iter().next() else {
        return;
    };
    if ctx.is_card_affected_by(card, code::ORICA_SZONE) {
        return;
    }
    let mut effect = Effect::builder(code::ORICA_SZONE, EffectType::SINGLE)
        .handler(card)
        .flags(EffectFlags::CANNOT_DISABLE | EffectFlags::IGNORE_IMMUNE | EffectFlags::UNCOPYABLE)
        .reset((Reset::standard() | Reset::CONTROL) - Reset::TURN_SET, 0)
        .build();
    effect.owner = ctx.state.effect(source).owner;
    ctx.state.add_effect(effect);
    ctx.state.reset_card_code(card, code::SANCT_MZONE);
}

// ============================================================================
// ControlAdjust
// ============================================================================

/// Returns the cards gathered in `Core::control_adjust_set` to their
/// rightful controller.
#[derive(Debug, Clone)]
pub struct ControlAdjust {
    adjusting_player: PlayerId,
    destroy_set: CardSet,
    adjust_set: Vec<CardId>,
    moved: CardSet,
}

impl ControlAdjust {
    pub fn new() -> Self {
        Self {
            adjusting_player: PlayerId::ZERO,
            destroy_set: CardSet::new(),
            adjust_set: Vec::new(),
            moved: CardSet::new(),
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                self.destroy_set.clear();
                let b = [
                    ctx.state.get_useable_count(None, PlayerId::ZERO, Location::MZONE, 0xff).max(0) as usize,
                    ctx.state.get_useable_count(None, PlayerId::ONE, Location::MZONE, 0xff).max(0) as usize,
                ];
                let sizes = [
                    ctx.state.core.control_adjust_set[0].len(),
                    ctx.state.core.control_adjust_set[1].len(),
                ];
                // The side sending more cards over may overflow the other side.
                let (more, less) = match sizes[0].cmp(&sizes[1]) {
                    std::cmp::Ordering::Greater => (0, 1),
                    std::cmp::Ordering::Less => (1, 0),
                    std::cmp::Ordering::Equal => return Flow::Continue(2),
                };
                let surplus = sizes[more] - sizes[less];
                if surplus <= b[less] {
                    return Flow::Continue(2);
                }
                if sizes[less] == 0 && b[less] == 0 {
                    self.destroy_set = std::mem::take(&mut ctx.state.core.control_adjust_set[more]);
                    return Flow::Continue(4);
                }
                self.adjusting_player = PlayerId::from_index(more as u8);
                let count = (surplus - b[less]) as u32;
                let cards: Vec<CardId> = ctx.state.core.control_adjust_set[more].iter().copied().collect();
                let chooser = PlayerId::from_index(less as u8);
                ctx.state.hint(hint::SELECTMSG, ctx.state.turn_player, prompt::CONTROL_DENY);
                ctx.state.return_cards.list.clear();
                ctx.select_card(chooser, prompt::CONTROL_DENY, false, count, count, cards);
                Flow::Continue(1)
            }
            1 => {
                let side = self.adjusting_player.index();
                for card in std::mem::take(&mut ctx.state.return_cards.list) {
                    self.destroy_set.insert(card);
                    ctx.state.core.control_adjust_set[side].remove(&card);
                }
                Flow::Continue(2)
            }
            2 => {
                let set0 = ctx.state.core.control_adjust_set[0].clone();
                let set1 = ctx.state.core.control_adjust_set[1].clone();
                let list0 = ctx.state.sorted_for_operation(&set0);
                let list1 = ctx.state.sorted_for_operation(&set1);
                let paired = list0.len().min(list1.len());
                for (&card1, &card2) in list0.iter().zip(list1.iter()) {
                    let from1 = ctx.state.card(card1).current.location;
                    let from2 = ctx.state.card(card2).current.location;
                    ctx.state.swap_card(card1, card2);
                    ctx.state.reset_card(card1, Reset::CONTROL | Reset::EVENT);
                    ctx.state.reset_card(card2, Reset::CONTROL | Reset::EVENT);
                    mark_zone_override(ctx, card1, from1, from2);
                    mark_zone_override(ctx, card2, from2, from1);
                }
                self.adjust_set = list0[paired..].iter().chain(list1[paired..].iter()).copied().collect();
                self.moved = set0;
                self.moved.extend(set1);
                Flow::Continue(3)
            }
            3 => {
                if self.adjust_set.is_empty() {
                    return Flow::Continue(4);
                }
                let card = self.adjust_set.remove(0);
                ctx.state.reset_card(card, Reset::CONTROL | Reset::EVENT);
                let c = ctx.state.card(card);
                let to = c.current.controller.opponent();
                let position = c.current.position;
                ctx.move_to_field(
                    card,
                    to,
                    to,
                    Location::MZONE,
                    position,
                    false,
                    0,
                    0xff,
                    false,
                    LocationReason::Control,
                    false,
                );
                Flow::Continue(3)
            }
            4 => {
                ctx.state.core.control_adjust_set = [CardSet::new(), CardSet::new()];
                let moved: CardSet = std::mem::take(&mut self.moved)
                    .into_iter()
                    .filter(|c| ctx.state.card(*c).is_location(Location::ONFIELD))
                    .collect();
                for card in ctx.state.sorted_for_operation(&moved) {
                    let controller = ctx.state.card(card).current.controller;
                    for code in [event::CONTROL_CHANGED, event::MOVE] {
                        ctx.state
                            .raise_single_event(card, code, None, Reason::RULE, PlayerId::ZERO, controller, 0);
                    }
                }
                if !moved.is_empty() {
                    for code in [event::CONTROL_CHANGED, event::MOVE] {
                        ctx.state
                            .raise_event(moved.clone(), code, None, Reason::empty(), PlayerId::ZERO, PlayerId::ZERO, 0);
                    }
                }
                ctx.process_single_event();
                ctx.process_instant_event();
                Flow::Continue(5)
            }
            5 => {
                let destroy_set = std::mem::take(&mut self.destroy_set);
                if !destroy_set.is_empty() {
                    ctx.destroy(destroy_set, None, Reason::RULE, PlayerId::NONE, PlayerId::NONE, Location::GRAVE, 0);
                }
                Flow::Done
            }
            _ => unknown_step("ControlAdjust", step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardData;
    use crate::flags::Position;
    use crate::options::DuelOptions;

    fn monster(code: u32) -> CardData {
        CardData::new(code, CardType::MONSTER | CardType::NORMAL).with_level(4)
    }

    #[test]
    fn test_control_status_follows_latest_claim() {
        let mut state = DuelState::new(DuelOptions::default());
        let card = state.create_field_card(PlayerId::ZERO, monster(10), Location::MZONE, 0, Position::FACEUP_ATTACK);
        assert_eq!(state.control_status(card), PlayerId::ZERO);
        state.set_control(card, PlayerId::ONE, 0, 0);
        assert_eq!(state.control_status(card), PlayerId::ONE);
        assert_eq!(state.card(card).current.controller, PlayerId::ONE);
    }

    #[test]
    fn test_expired_claim_needs_adjust() {
        let mut state = DuelState::new(DuelOptions::default());
        let card = state.create_field_card(PlayerId::ZERO, monster(10), Location::MZONE, 0, Position::FACEUP_ATTACK);
        state.set_control(card, PlayerId::ONE, 0, 0);
        state.reset_card(card, Reset::EVENT | Reset::MSCHANGE);
        state.card_mut(card).current.controller = PlayerId::ZERO;
        assert_eq!(state.control_status(card), PlayerId::ZERO);
        assert!(!state.collect_control_adjust());
        state.set_control(card, PlayerId::ONE, 0, 0);
        assert!(state.collect_control_adjust());
        assert!(state.core.control_adjust_set[0].contains(&card));
    }
}
