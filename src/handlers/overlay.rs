//! Counters and Xyz materials.

use crate::actions::Actions;
use crate::codes::{effect as code, event, hint, prompt};
use crate::events::GameEvent;
use crate::flags::{GlobalFlags, Position, Reason, Reset};
use crate::game_state::DuelState;
use crate::group::{CardSet, GroupId};
use crate::ids::{CardId, EffectId, PlayerId};
use crate::message::Message;
use crate::process::{Flow, unknown_step};
use crate::query::Ctx;
use crate::zone::Location;

impl DuelState {
    /// Field cards on the chosen sides of `player`.
    pub fn side_cards(&self, player: PlayerId, own: bool, opponent: bool, location: Location) -> Vec<CardId> {
        let mut out = Vec::new();
        for (side, wanted) in [(player, own), (player.opponent(), opponent)] {
            if !wanted || side.is_none() {
                continue;
            }
            if location.contains(Location::MZONE) {
                out.extend(self.player(side).occupied(Location::MZONE));
            }
            if location.contains(Location::SZONE) {
                out.extend(self.player(side).occupied(Location::SZONE));
            }
        }
        out
    }

    /// Total counters of `counter_type` on the chosen sides.
    pub fn field_counter(&self, player: PlayerId, own: bool, opponent: bool, counter_type: u16) -> u32 {
        self.side_cards(player, own, opponent, Location::ONFIELD)
            .into_iter()
            .map(|c| u32::from(self.card(c).counter(counter_type)))
            .sum()
    }

    /// Materials attached to the monsters of `group`, or to every monster on
    /// the chosen sides.
    pub fn overlay_group(&self, player: PlayerId, own: bool, opponent: bool, group: Option<GroupId>) -> CardSet {
        let holders: Vec<CardId> = match group {
            Some(group) => self.groups.cards(group).into_iter().collect(),
            None => self.side_cards(player, own, opponent, Location::MZONE),
        };
        holders
            .into_iter()
            .flat_map(|c| self.card(c).xyz_materials.iter().copied())
            .collect()
    }
}

/// Build the "pay it normally or use a replacement" option list shared by
/// counter and material removal.
fn replacement_options(
    ctx: &mut Ctx<'_>,
    payable: bool,
    default_option: u64,
    effect_code: u32,
    event: &GameEvent,
) -> (Vec<u64>, Vec<Option<EffectId>>) {
    let mut options = Vec::new();
    let mut choices = Vec::new();
    if payable {
        options.push(default_option);
        choices.push(None);
    }
    let effects = ctx.state.continuous_effects.get(&effect_code).cloned().unwrap_or_default();
    for e in effects {
        let player = ctx.state.effect_handler_player(e);
        if ctx.is_activateable(e, player, event) {
            options.push(ctx.state.effect(e).description);
            choices.push(Some(e));
        }
    }
    (options, choices)
}

/// Ask which of `choices` to use: nothing to ask with one choice, a yes/no
/// on the replacement's card with exactly "pay or replace", a menu otherwise.
fn ask_choice(ctx: &mut Ctx<'_>, player: PlayerId, options: Vec<u64>, choices: &[Option<EffectId>], yes_no_prompt: u64) {
    match choices {
        [_] => ctx.state.returns.set(0, 0),
        [None, Some(e)] => match ctx.state.effect(*e).handler {
            Some(card) => ctx.select_effect_yes_no(player, card, yes_no_prompt),
            None => ctx.select_option(player, options),
        },
        _ => ctx.select_option(player, options),
    }
}

// ============================================================================
// RemoveCounter
// ============================================================================

#[derive(Debug, Clone)]
pub struct RemoveCounter {
    pub reason: Reason,
    /// A specific card, or `None` to let the player spread the removal
    /// over the chosen sides.
    pub card: Option<CardId>,
    pub player: PlayerId,
    pub own: bool,
    pub opponent: bool,
    pub counter_type: u16,
    pub count: u16,
    choices: Vec<Option<EffectId>>,
    request: Vec<CardId>,
}

impl RemoveCounter {
    pub fn new(reason: Reason, card: Option<CardId>, player: PlayerId, own: bool, opponent: bool, counter_type: u16, count: u16) -> Self {
        Self {
            reason,
            card,
            player,
            own,
            opponent,
            counter_type,
            count,
            choices: Vec::new(),
            request: Vec::new(),
        }
    }

    fn event(&self, ctx: &Ctx<'_>) -> GameEvent {
        GameEvent {
            event_player: self.player,
            value: i64::from(self.count),
            reason: self.reason,
            reason_effect: ctx.state.core.reason_effect,
            reason_player: self.player,
            ..GameEvent::new(0)
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let p = self.player;
        match step {
            0 => {
                let payable = match self.card {
                    Some(card) => ctx.state.card(card).counter(self.counter_type) >= self.count,
                    None => ctx.state.field_counter(p, self.own, self.opponent, self.counter_type) > 0,
                };
                let ev = self.event(ctx);
                let effect_code = code::RCOUNTER_REPLACE + u32::from(self.counter_type);
                let (options, choices) = replacement_options(ctx, payable, prompt::REMOVE_COUNTER, effect_code, &ev);
                ctx.state.returns.set(0, 0);
                if choices.is_empty() {
                    return Flow::Done;
                }
                ask_choice(ctx, p, options, &choices, prompt::COUNTER_REPLACE);
                self.choices = choices;
                Flow::Continue(1)
            }
            1 => {
                let index = ctx.state.returns.get(0).max(0) as usize;
                if let Some(e) = self.choices.get(index).copied().flatten() {
                    let ev = self.event(ctx);
                    ctx.solve_continuous(p, e, ev);
                    return Flow::Continue(4);
                }
                if let Some(card) = self.card {
                    let removed = ctx.state.card_mut(card).remove_counter(self.counter_type, self.count);
                    self.emit_removal(ctx.state, card, removed);
                    ctx.state.returns.set(0, i64::from(removed));
                    return Flow::Continue(4);
                }
                self.request = ctx
                    .state
                    .side_cards(p, self.own, self.opponent, Location::ONFIELD)
                    .into_iter()
                    .filter(|c| ctx.state.card(*c).counter(self.counter_type) > 0)
                    .collect();
                let cards = self
                    .request
                    .iter()
                    .map(|c| (*c, ctx.state.card(*c).counter(self.counter_type)))
                    .collect();
                ctx.select_counter(p, self.counter_type, self.count, cards);
                Flow::Continue(2)
            }
            2 => {
                let answer = &ctx.state.return_cards;
                let removals: Vec<(CardId, u16)> = answer
                    .list
                    .iter()
                    .copied()
                    .zip(answer.counts.iter().copied())
                    .filter(|(_, n)| *n > 0)
                    .collect();
                for (card, n) in removals {
                    let removed = ctx.state.card_mut(card).remove_counter(self.counter_type, n);
                    self.emit_removal(ctx.state, card, removed);
                }
                Flow::Continue(3)
            }
            3 => {
                let reason_effect = ctx.state.core.reason_effect;
                ctx.state.raise_event(
                    None,
                    event::REMOVE_COUNTER + u32::from(self.counter_type),
                    reason_effect,
                    self.reason,
                    p,
                    p,
                    i64::from(self.count),
                );
                ctx.process_instant_event();
                Flow::Continue(4)
            }
            4 => {
                ctx.state.returns.set(0, 1);
                Flow::Done
            }
            _ => unknown_step("RemoveCounter", step),
        }
    }

    fn emit_removal(&self, state: &mut DuelState, card: CardId, removed: u16) {
        if removed == 0 {
            return;
        }
        let current = state.card(card).current;
        state.messages.push(Message::RemoveCounter {
            counter_type: self.counter_type,
            controller: current.controller,
            location: current.location,
            sequence: current.sequence as u8,
            count: removed,
        });
    }
}

// ============================================================================
// RemoveOverlay
// ============================================================================

/// Detach materials. The number actually detached (including any handled
/// by a replacement effect) ends up in returns slot 0.
#[derive(Debug, Clone)]
pub struct RemoveOverlay {
    pub reason: Reason,
    pub group: Option<GroupId>,
    pub player: PlayerId,
    pub own: bool,
    pub opponent: bool,
    pub min: u32,
    pub max: u32,
    choices: Vec<Option<EffectId>>,
    used_replace: bool,
    replaced_amount: u32,
}

impl RemoveOverlay {
    pub fn new(reason: Reason, group: Option<GroupId>, player: PlayerId, own: bool, opponent: bool, min: u32, max: u32) -> Self {
        Self {
            reason,
            group,
            player,
            own,
            opponent,
            min,
            max,
            choices: Vec::new(),
            used_replace: false,
            replaced_amount: 0,
        }
    }

    fn event(&self, ctx: &Ctx<'_>, value: i64) -> GameEvent {
        GameEvent {
            event_player: self.player,
            value,
            reason: self.reason,
            reason_effect: ctx.state.core.reason_effect,
            reason_player: self.player,
            ..GameEvent::new(0)
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let p = self.player;
        match step {
            0 => {
                let available = ctx.state.overlay_group(p, self.own, self.opponent, self.group).len() as u32;
                let ev = self.event(ctx, i64::from(self.min));
                let (options, choices) =
                    replacement_options(ctx, available >= self.min, prompt::REMOVE_OVERLAY, code::OVERLAY_REMOVE_REPLACE, &ev);
                ctx.state.returns.set(0, 0);
                if choices.is_empty() {
                    return Flow::Done;
                }
                ask_choice(ctx, p, options, &choices, prompt::OVERLAY_REPLACE);
                self.choices = choices;
                Flow::Continue(1)
            }
            1 => {
                let index = ctx.state.returns.get(0).max(0) as usize;
                if let Some(e) = self.choices.get(index).copied().flatten() {
                    let ev = self.event(ctx, i64::from(self.min) + (i64::from(self.max) << 16));
                    ctx.solve_continuous(p, e, ev);
                    self.used_replace = true;
                }
                Flow::Continue(2)
            }
            2 => {
                let mut cancelable = false;
                if self.used_replace {
                    let replaced = ctx.state.returns.get(0).max(0) as u32;
                    if replaced >= self.max {
                        return Flow::Done;
                    }
                    self.max -= replaced;
                    if replaced >= self.min {
                        cancelable = true;
                        self.min = 0;
                    } else {
                        self.min -= replaced;
                    }
                    self.replaced_amount = replaced;
                }
                let cards: Vec<CardId> = ctx
                    .state
                    .overlay_group(p, self.own, self.opponent, self.group)
                    .into_iter()
                    .collect();
                ctx.state.hint(hint::SELECTMSG, p, prompt::DETACH);
                ctx.select_card(p, prompt::DETACH, cancelable, self.min, self.max, cards);
                Flow::Continue(3)
            }
            3 => {
                let chosen: CardSet = ctx.state.return_cards.list.iter().copied().collect();
                let reason_effect = ctx.state.core.reason_effect;
                ctx.send_to(
                    chosen,
                    reason_effect,
                    self.reason,
                    p,
                    PlayerId::NONE,
                    Location::GRAVE,
                    0,
                    Position::FACEUP,
                    false,
                );
                Flow::Continue(4)
            }
            4 => {
                let total = ctx.state.returns.get(0) + i64::from(self.replaced_amount);
                ctx.state.returns.set(0, total);
                Flow::Done
            }
            _ => unknown_step("RemoveOverlay", step),
        }
    }
}

// ============================================================================
// XyzOverlay
// ============================================================================

/// Attach cards under an Xyz monster. Materials that were themselves Xyz
/// monsters either bring their own materials along or, with
/// `send_materials_to_grave`, drop them to the graveyard first.
#[derive(Debug, Clone)]
pub struct XyzOverlay {
    pub target: CardId,
    pub materials: GroupId,
    pub send_materials_to_grave: bool,
}

impl XyzOverlay {
    pub fn new(target: CardId, materials: GroupId, send_materials_to_grave: bool) -> Self {
        Self {
            target,
            materials,
            send_materials_to_grave,
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let materials = ctx.state.groups.cards(self.materials);
        match step {
            0 => {
                for card in materials.iter().copied() {
                    if ctx.state.card(card).overlay_target.is_none() {
                        ctx.state.enable_field_effect(card, false);
                    }
                }
                if !self.send_materials_to_grave {
                    return Flow::Continue(1);
                }
                let to_grave: CardSet = materials
                    .iter()
                    .flat_map(|c| ctx.state.card(*c).xyz_materials.iter().copied())
                    .collect();
                ctx.send_to(
                    to_grave,
                    None,
                    Reason::RULE | Reason::LOST_TARGET,
                    PlayerId::NONE,
                    PlayerId::NONE,
                    Location::GRAVE,
                    0,
                    Position::FACEUP,
                    false,
                );
                Flow::Continue(1)
            }
            1 => {
                let target = self.target;
                let direct: CardSet = materials
                    .iter()
                    .copied()
                    .filter(|c| ctx.state.card(*c).overlay_target != Some(target))
                    .collect();
                let mut order = Vec::new();
                if !self.send_materials_to_grave {
                    let inherited: CardSet = materials
                        .iter()
                        .flat_map(|c| ctx.state.card(*c).xyz_materials.iter().copied())
                        .collect();
                    order.extend(ctx.state.sorted_for_operation(&inherited));
                }
                order.extend(ctx.state.sorted_for_operation(&direct));

                let reserved = if ctx.state.core.global_flag.contains(GlobalFlags::DECK_REVERSE_CHECK) {
                    PlayerId::both()
                        .into_iter()
                        .filter(|p| {
                            ctx.state
                                .player(*p)
                                .deck_top()
                                .is_some_and(|top| materials.contains(&top))
                        })
                        .map(|p| (p, ctx.state.messages.len(), ctx.state.player(p).list_main.len()))
                        .collect()
                } else {
                    Vec::new()
                };

                let mut des = CardSet::new();
                let mut from_grave = CardSet::new();
                let (reason_effect, reason_player) = (ctx.state.core.reason_effect, ctx.state.core.reason_player);
                for card in order {
                    let reason = ctx.state.card(card).current.reason;
                    if ctx.is_card_affected_by(card, code::IMMUNE_OVERLAY) && !reason.contains(Reason::RULE) {
                        continue;
                    }
                    ctx.state.card_mut(card).current.reason = Reason::XYZ | Reason::MATERIAL;
                    ctx.state.reset_card(card, Reset::LEAVE | Reset::OVERLAY);
                    ctx.state.unequip(card);
                    let equips: Vec<CardId> = ctx.state.card(card).equiping_cards.iter().copied().collect();
                    for equip in equips {
                        des.insert(equip);
                        ctx.state.unequip(equip);
                    }
                    ctx.state.card_mut(card).snapshot_previous();
                    let was_overlay = ctx.state.card(card).overlay_target.is_some();
                    ctx.state.remove_card(card);
                    if !was_overlay && ctx.state.card(card).previous.location == Location::GRAVE {
                        from_grave.insert(card);
                        ctx.state.raise_single_event(
                            card,
                            event::LEAVE_GRAVE,
                            reason_effect,
                            Reason::empty(),
                            reason_player,
                            PlayerId::ZERO,
                            0,
                        );
                    }
                    ctx.state.xyz_add(target, card);
                    ctx.state.move_message(card, Reason::XYZ | Reason::MATERIAL);
                }

                // Reserved slots come back to front so earlier indices stay valid.
                for (p, index, before) in reserved.into_iter().rev() {
                    let deck = &ctx.state.player(p).list_main;
                    let Some(top) = deck.last().copied() else {
                        continue;
                    };
                    let removed = (before - deck.len()) as u32;
                    let top = ctx.state.card(top);
                    if ctx.state.core.deck_reversed || top.current.position == Position::FACEUP_DEFENSE {
                        let message = Message::DeckTop {
                            player: p,
                            offset: removed,
                            code: top.data.code,
                            position: top.current.position,
                        };
                        ctx.state.messages.insert(index, message);
                    }
                }

                if !from_grave.is_empty() {
                    ctx.state.raise_event(
                        from_grave,
                        event::LEAVE_GRAVE,
                        reason_effect,
                        Reason::empty(),
                        reason_player,
                        PlayerId::ZERO,
                        0,
                    );
                    ctx.process_single_event();
                    ctx.process_instant_event();
                }
                if !des.is_empty() {
                    ctx.destroy(
                        des,
                        None,
                        Reason::LOST_TARGET | Reason::RULE,
                        PlayerId::NONE,
                        PlayerId::NONE,
                        Location::GRAVE,
                        0,
                    );
                }
                Flow::Continue(2)
            }
            2 => Flow::Done,
            _ => unknown_step("XyzOverlay", step),
        }
    }
}
