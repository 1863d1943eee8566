//! Special summons.
//!
//! Three entry points share the placement logic here. [`SpSummonRule`]
//! summons a card through one of its own `SPSUMMON_PROC` procedures, or
//! through a `SPSUMMON_PROC_G` field procedure that puts a whole group on
//! the field. Effect summons go through [`SpSummon`], which places each
//! card with a [`SpSummonStep`] and raises the success events once for the
//! batch. Rule summons open a negation window on the `SPSUMMON` event;
//! effect summons cannot be negated.

use crate::actions::Actions;
use crate::codes::{effect as code, event};
use crate::effect::EffectFlags;
use crate::flags::{Position, Reason, Reset, Status, Timing};
use crate::group::{CardSet, GroupId};
use crate::ids::{CardId, EffectId, PlayerId};
use crate::message::Message;
use crate::process::{Flow, Process, unknown_step};
use crate::query::Ctx;
use crate::script::ScriptArg;
use crate::types::{CardType, summon_type};
use crate::zone::{Location, LocationReason};
use tracing::debug;

/// Normalize a procedure or caller summon type into a special summon type.
pub fn special_summon_type(value: u32) -> u32 {
    (value & 0xf00ffff) | summon_type::SPECIAL
}

/// Material reason matching a summon type.
fn material_reason(sumtype: u32, fallback: Reason) -> Reason {
    match sumtype & 0xff000000 {
        t if t == summon_type::FUSION => Reason::FUSION,
        t if t == summon_type::RITUAL => Reason::RITUAL,
        t if t == summon_type::SYNCHRO => Reason::SYNCHRO,
        t if t == summon_type::XYZ => Reason::XYZ,
        t if t == summon_type::LINK => Reason::LINK,
        _ => fallback,
    }
}

impl Ctx<'_> {
    pub fn is_player_can_spsummon(&mut self, player: PlayerId, card: CardId) -> bool {
        !self.player_effect_blocks(player, code::CANNOT_SPECIAL_SUMMON, card, Reason::SPSUMMON)
    }

    /// A card under a revive limit must be summoned properly once before
    /// anything else may bring it back.
    fn revive_blocked(&mut self, card: CardId, nocheck: bool, nolimit: bool) -> bool {
        if nolimit || self.state.card(card).get_status(Status::PROC_COMPLETE) || !self.is_card_affected_by(card, code::REVIVE_LIMIT) {
            return false;
        }
        let location = self.state.card(card).current.location;
        location.intersects(Location::SZONE | Location::GRAVE | Location::REMOVED)
            || (!nocheck && location.intersects(Location::DECK | Location::HAND))
    }

    fn spsummon_condition_holds(
        &mut self,
        card: CardId,
        reason_effect: Option<EffectId>,
        player: PlayerId,
        sumtype: u32,
        positions: Position,
        to_player: PlayerId,
    ) -> bool {
        for e in self.filter_effect(card, code::SPSUMMON_CONDITION) {
            let args = [
                reason_effect.into(),
                ScriptArg::Player(player),
                ScriptArg::Int(i64::from(sumtype)),
                ScriptArg::Int(i64::from(positions.bits())),
                ScriptArg::Player(to_player),
            ];
            if self.effect_value(e, &args) == 0 {
                return false;
            }
        }
        true
    }

    /// Checks shared by every special summon of `card` by `player` onto
    /// `to_player`'s field.
    #[allow(clippy::too_many_arguments)]
    pub fn is_special_summonable_card(
        &mut self,
        card: CardId,
        player: PlayerId,
        to_player: PlayerId,
        sumtype: u32,
        positions: Position,
        reason_effect: Option<EffectId>,
        nocheck: bool,
    ) -> bool {
        let c = self.state.card(card);
        if c.current.location == Location::MZONE {
            return false;
        }
        if !nocheck && !c.data.card_type.contains(CardType::MONSTER) {
            return false;
        }
        // Face-down summons skip the unique check.
        if positions.intersects(Position::FACEUP) && self.state.check_unique_onfield(card, to_player, Location::MZONE) {
            return false;
        }
        if !self.is_player_can_spsummon(player, card) || self.is_card_affected_by(card, code::CANNOT_SPECIAL_SUMMON) {
            return false;
        }
        nocheck || self.spsummon_condition_holds(card, reason_effect, player, sumtype, positions, to_player)
    }

    /// Apply `FORCE_SPSUMMON_POSITION` effects reaching `player`.
    #[allow(clippy::too_many_arguments)]
    pub fn forced_spsummon_positions(
        &mut self,
        card: CardId,
        player: PlayerId,
        sumtype: u32,
        positions: Position,
        to_player: PlayerId,
        reason_effect: Option<EffectId>,
    ) -> Position {
        let mut positions = positions;
        for e in self.filter_player_effect(player, code::FORCE_SPSUMMON_POSITION) {
            if let Some(cond) = self.state.effect(e).target {
                let args = [
                    ScriptArg::Effect(e),
                    ScriptArg::Card(card),
                    ScriptArg::Player(player),
                    ScriptArg::Int(i64::from(sumtype)),
                    ScriptArg::Int(i64::from(positions.bits())),
                    ScriptArg::Player(to_player),
                    reason_effect.into(),
                ];
                if !self.check_condition(cond, &args) {
                    continue;
                }
            }
            positions &= Position::from_bits_truncate(self.effect_value(e, &[]) as u32);
        }
        positions
    }

    /// Summon type and zone mask a procedure summons `card` with.
    fn procedure_summon(&mut self, proc: EffectId, card: CardId) -> (u32, u32) {
        let values = self.effect_values(proc, &[ScriptArg::Card(card)]);
        let sumtype = special_summon_type(values.first().copied().unwrap_or(0) as u32);
        let zone = values.get(1).map_or(0xff, |&z| z as u32);
        (sumtype, zone)
    }

    /// Positions and receiving player of a special summon procedure.
    fn spsummon_placement(&self, proc: EffectId, player: PlayerId) -> (Position, PlayerId) {
        let e = self.state.effect(proc);
        if !e.is_flag(EffectFlags::SPSUM_PARAM) {
            return (Position::FACEUP, player);
        }
        let mut positions = Position::from_bits_truncate(e.s_range.bits());
        if positions.is_empty() {
            positions = Position::FACEUP_ATTACK;
        }
        let to_player = if e.o_range.is_empty() { player } else { player.opponent() };
        (positions, to_player)
    }

    fn procedure_matches(&mut self, proc: EffectId, card: CardId, summon_type: u32) -> bool {
        if summon_type == 0 {
            return true;
        }
        let (sumtype, _) = self.procedure_summon(proc, card);
        sumtype == special_summon_type(summon_type)
    }

    fn procedure_condition(&mut self, proc: EffectId, card: CardId) -> bool {
        let e = self.state.effect(proc);
        if e.removed || !e.has_count_left() {
            return false;
        }
        let condition = e.condition;
        match condition {
            Some(condition) => self.check_condition(condition, &[ScriptArg::Effect(proc), ScriptArg::Card(card)]),
            None => true,
        }
    }

    /// `SPSUMMON_PROC` procedures that can summon `card` right now.
    pub fn filter_spsummon_procedures(&mut self, card: CardId, player: PlayerId, summon_type: u32) -> Vec<EffectId> {
        let mut out = Vec::new();
        for proc in self.filter_effect(card, code::SPSUMMON_PROC) {
            if !self.procedure_matches(proc, card, summon_type) {
                continue;
            }
            let (sumtype, _) = self.procedure_summon(proc, card);
            let (positions, to_player) = self.spsummon_placement(proc, player);
            if !self.is_special_summonable_card(card, player, to_player, sumtype, positions, Some(proc), false) {
                continue;
            }
            if self.revive_blocked(card, false, false) {
                continue;
            }
            if self.procedure_condition(proc, card) {
                out.push(proc);
            }
        }
        out
    }

    /// `SPSUMMON_PROC_G` procedures hosted on `card` usable by `player`.
    fn filter_group_procedures(&mut self, card: Option<CardId>, player: PlayerId, summon_type: u32) -> Vec<(EffectId, CardId)> {
        let candidates = self.state.field_effects.get(&code::SPSUMMON_PROC_G).cloned().unwrap_or_default();
        let mut out = Vec::new();
        for proc in candidates {
            let Some(handler) = self.state.effect(proc).handler else {
                continue;
            };
            if card.is_some_and(|c| c != handler) {
                continue;
            }
            let both_sides = self.state.effect(proc).is_flag(EffectFlags::BOTH_SIDE);
            if !both_sides && self.state.effect_handler_player(proc) != player {
                continue;
            }
            if !self.is_effect_available(proc) || !self.procedure_matches(proc, handler, summon_type) {
                continue;
            }
            if self.procedure_condition(proc, handler) {
                out.push((proc, handler));
            }
        }
        out
    }

    fn raise_spsummon_materials(&mut self, card: CardId, event_code: u32, reason: Reason, reason_effect: Option<EffectId>, player: PlayerId) {
        let materials = self.state.card(card).material_cards.clone();
        if materials.is_empty() {
            return;
        }
        for &m in &materials {
            self.state.raise_single_event(m, event_code, reason_effect, reason, player, player, 0);
        }
        self.state.raise_event(materials, event_code, reason_effect, reason, player, player, 0);
    }

    /// Statuses of a monster whose special summon went through.
    fn finish_special_summon(&mut self, card: CardId, proc_complete: bool) {
        {
            let c = self.state.card_mut(card);
            c.set_status(Status::SUMMONING, false);
            c.set_status(Status::SPSUMMON_STEP, false);
            c.set_status(Status::SPSUMMON_TURN, true);
            if proc_complete {
                c.set_status(Status::PROC_COMPLETE, true);
            }
        }
        if self.state.card(card).current.position.is_faceup() {
            self.state.enable_field_effect(card, true);
        }
        if self.state.card(card).get_status(Status::DISABLED) {
            self.state.reset_card(card, Reset::DISABLE);
        }
    }

    fn send_negated_to_grave(&mut self, cards: CardSet, player: PlayerId) {
        if cards.is_empty() {
            return;
        }
        self.send_to(cards, None, Reason::RULE, player, player, Location::GRAVE, 0, Position::empty(), false);
    }
}

// ============================================================================
// SpSummonRule
// ============================================================================

/// Special summon of `target` by its own procedure, or of a group through a
/// field procedure the target hosts.
#[derive(Debug, Clone)]
pub struct SpSummonRule {
    pub sumplayer: PlayerId,
    pub target: CardId,
    pub summon_type: u32,
    procedure: Option<EffectId>,
    options: Vec<EffectId>,
    zone: u32,
    group: Option<GroupId>,
    pending: Vec<CardId>,
    placed: Vec<CardId>,
    next: usize,
    at_risk: CardSet,
}

impl SpSummonRule {
    pub fn new(sumplayer: PlayerId, target: CardId, summon_type: u32) -> Self {
        Self {
            sumplayer,
            target,
            summon_type,
            procedure: None,
            options: Vec::new(),
            zone: 0xff,
            group: None,
            pending: Vec::new(),
            placed: Vec::new(),
            next: 0,
            at_risk: CardSet::new(),
        }
    }

    /// Start at the group path with a procedure already chosen.
    pub fn with_group_procedure(sumplayer: PlayerId, target: CardId, summon_type: u32, procedure: EffectId) -> Self {
        Self {
            procedure: Some(procedure),
            ..Self::new(sumplayer, target, summon_type)
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let (player, target) = (self.sumplayer, self.target);
        match step {
            0 => {
                self.options = ctx.filter_spsummon_procedures(target, player, self.summon_type);
                let groups = ctx.filter_group_procedures(Some(target), player, self.summon_type);
                self.options.extend(groups.into_iter().map(|(e, _)| e));
                if self.options.is_empty() {
                    return Flow::Done;
                }
                if self.options.len() == 1 {
                    ctx.state.returns.set(0, 0);
                } else {
                    let descriptions = self.options.iter().map(|&e| ctx.state.effect(e).description).collect();
                    ctx.select_option(player, descriptions);
                }
                debug!(card = target.0, player = player.0, "special summon by procedure started");
                Flow::Continue(1)
            }
            1 => {
                let choice = ctx.state.returns.get(0) as usize;
                let Some(&proc) = self.options.get(choice) else {
                    return Flow::Done;
                };
                self.procedure = Some(proc);
                if ctx.state.effect(proc).code == code::SPSUMMON_PROC_G {
                    return Flow::Continue(20);
                }
                let Some(cb) = ctx.state.effect(proc).target else {
                    ctx.state.returns.set(0, 1);
                    return Flow::Continue(2);
                };
                let saved = (ctx.state.core.reason_effect, ctx.state.core.reason_player);
                ctx.state.core.reason_effect = Some(proc);
                ctx.state.core.reason_player = player;
                let ok = ctx.run_target(cb, &[ScriptArg::Effect(proc), ScriptArg::Card(target)]);
                (ctx.state.core.reason_effect, ctx.state.core.reason_player) = saved;
                ctx.state.returns.set_bool(0, ok);
                Flow::Continue(2)
            }
            2 => {
                if !ctx.state.returns.get_bool(0) {
                    debug!(card = target.0, "special summon procedure canceled");
                    return Flow::Done;
                }
                ctx.run_summon_costs(target, player, code::SPSUMMON_COST);
                Flow::Continue(3)
            }
            3 => {
                let Some(proc) = self.procedure else {
                    return Flow::Done;
                };
                ctx.state.card_mut(target).material_cards.clear();
                {
                    let c = ctx.state.card_mut(target);
                    c.current.reason_effect = Some(proc);
                    c.current.reason_player = player;
                }
                if let Some(operation) = ctx.state.effect(proc).operation {
                    ctx.run_effect_operation(proc, player, operation, &[ScriptArg::Effect(proc), ScriptArg::Card(target)]);
                }
                ctx.state.effect_mut(proc).dec_count();
                Flow::Continue(4)
            }
            4 => {
                let Some(proc) = self.procedure else {
                    return Flow::Done;
                };
                let (sumtype, zone) = ctx.procedure_summon(proc, target);
                self.zone = zone;
                let (positions, to_player) = ctx.spsummon_placement(proc, player);
                {
                    let c = ctx.state.card_mut(target);
                    c.summon.summon_type = sumtype;
                    c.summon.location = c.current.location;
                    c.summon.sequence = c.current.sequence;
                    c.summon.pzone = c.current.pzone;
                    c.summon.player = player;
                }
                let positions = ctx.forced_spsummon_positions(target, player, sumtype, positions, to_player, Some(proc));
                ctx.state.enable_field_effect(target, false);
                ctx.move_to_field(
                    target,
                    player,
                    to_player,
                    Location::MZONE,
                    positions,
                    false,
                    0,
                    zone,
                    true,
                    LocationReason::ToField,
                    false,
                );
                Flow::Continue(5)
            }
            5 => {
                if ctx.state.card(target).current.location != Location::MZONE {
                    debug!(card = target.0, "special summon found no zone");
                    return Flow::Done;
                }
                if ctx.state.card(target).summon.location == Location::DECK {
                    let owner = ctx.state.card(target).owner;
                    ctx.state.shuffle_deck(owner);
                }
                let controller = ctx.state.card(target).current.controller;
                ctx.state.set_control(target, controller, 0, 0);
                {
                    let c = ctx.state.card_mut(target);
                    c.current.reason = Reason::SPSUMMON;
                    c.current.reason_effect = self.procedure;
                    c.current.reason_player = player;
                }
                let (code, info) = (ctx.state.card(target).data.code, ctx.state.loc_info(target));
                ctx.state.messages.push(Message::SpSummoning { code, info });
                Flow::Continue(6)
            }
            6 => {
                let reason = material_reason(ctx.state.card(target).summon.summon_type, Reason::SPSUMMON);
                ctx.raise_spsummon_materials(target, event::BE_PRE_MATERIAL, reason, self.procedure, player);
                ctx.process_single_event();
                ctx.process_instant_event();
                Flow::Continue(7)
            }
            7 => {
                if !ctx.state.core.current_chain.is_empty() || ctx.is_card_affected_by(target, code::CANNOT_DISABLE_SPSUMMON) {
                    return Flow::Continue(10);
                }
                Flow::Continue(8)
            }
            8 => {
                let c = ctx.state.card_mut(target);
                c.set_status(Status::SUMMONING, true);
                c.set_status(Status::SUMMON_DISABLED, false);
                ctx.state.raise_event([target], event::SPSUMMON, self.procedure, Reason::empty(), player, player, 0);
                ctx.process_instant_event();
                Flow::Continue(9)
            }
            9 => {
                if !ctx.summon_negated(target) {
                    return Flow::Continue(10);
                }
                debug!(card = target.0, "special summon negated");
                if ctx.is_monster_on_field(target) {
                    ctx.send_negated_to_grave(CardSet::from([target]), player);
                }
                Flow::Done
            }
            10 => {
                ctx.finish_special_summon(target, true);
                Flow::Continue(11)
            }
            11 => {
                ctx.state.messages.push(Message::SpSummoned);
                let reason = material_reason(ctx.state.card(target).summon.summon_type, Reason::SPSUMMON);
                ctx.raise_spsummon_materials(target, event::BE_MATERIAL, reason, self.procedure, player);
                ctx.process_single_event();
                ctx.process_instant_event();
                Flow::Continue(12)
            }
            12 => {
                ctx.state.raise_single_event(target, event::SPSUMMON_SUCCESS, self.procedure, Reason::empty(), player, player, 0);
                ctx.process_single_event();
                ctx.state.raise_event([target], event::PRESPSUMMON_SUCCESS, self.procedure, Reason::empty(), player, player, 0);
                ctx.state.raise_event([target], event::SPSUMMON_SUCCESS, self.procedure, Reason::empty(), player, player, 0);
                ctx.process_instant_event();
                if ctx.state.core.current_chain.is_empty() {
                    ctx.adjust_all();
                    ctx.state.core.hint_timing[player.index()] |= Timing::SPSUMMON;
                }
                ctx.state.core.operated_set = CardSet::from([target]);
                debug!(card = target.0, "special summon by procedure complete");
                Flow::Done
            }
            // Group procedure path.
            20 => {
                let Some(proc) = self.procedure else {
                    return Flow::Done;
                };
                let group = ctx.state.groups.create(CardSet::new());
                self.group = Some(group);
                if let Some(operation) = ctx.state.effect(proc).operation {
                    let args = [ScriptArg::Effect(proc), ScriptArg::Card(target), ScriptArg::Group(group)];
                    ctx.run_effect_operation(proc, player, operation, &args);
                }
                ctx.state.effect_mut(proc).dec_count();
                Flow::Continue(21)
            }
            21 => {
                let (Some(proc), Some(group)) = (self.procedure, self.group) else {
                    return Flow::Done;
                };
                let cards = ctx.state.groups.cards(group);
                self.pending.clear();
                self.placed.clear();
                self.next = 0;
                for card in ctx.state.sorted_for_operation(&cards) {
                    let (sumtype, _) = ctx.procedure_summon(proc, card);
                    let (positions, to_player) = ctx.spsummon_placement(proc, player);
                    if ctx.is_special_summonable_card(card, player, to_player, sumtype, positions, Some(proc), false) {
                        self.pending.push(card);
                    }
                }
                if self.pending.is_empty() {
                    return Flow::Done;
                }
                for card in self.pending.clone() {
                    ctx.run_summon_costs(card, player, code::SPSUMMON_COST);
                }
                Flow::Continue(22)
            }
            22 => {
                let Some(proc) = self.procedure else {
                    return Flow::Done;
                };
                let card = self.pending[self.next];
                let (sumtype, zone) = ctx.procedure_summon(proc, card);
                let (positions, to_player) = ctx.spsummon_placement(proc, player);
                {
                    let c = ctx.state.card_mut(card);
                    c.stash_reason();
                    c.summon.summon_type = sumtype;
                    c.summon.location = c.current.location;
                    c.summon.sequence = c.current.sequence;
                    c.summon.pzone = c.current.pzone;
                    c.summon.player = player;
                }
                let positions = ctx.forced_spsummon_positions(card, player, sumtype, positions, to_player, Some(proc));
                ctx.state.enable_field_effect(card, false);
                ctx.move_to_field(card, player, to_player, Location::MZONE, positions, false, 0, zone, true, LocationReason::ToField, false);
                Flow::Continue(23)
            }
            23 => {
                let card = self.pending[self.next];
                if ctx.state.card(card).current.location == Location::MZONE {
                    let controller = ctx.state.card(card).current.controller;
                    ctx.state.set_control(card, controller, 0, 0);
                    {
                        let c = ctx.state.card_mut(card);
                        c.current.reason = Reason::SPSUMMON;
                        c.current.reason_effect = self.procedure;
                        c.current.reason_player = player;
                        c.set_status(Status::SPSUMMON_STEP, true);
                    }
                    let (code, info) = (ctx.state.card(card).data.code, ctx.state.loc_info(card));
                    ctx.state.messages.push(Message::SpSummoning { code, info });
                    self.placed.push(card);
                } else {
                    ctx.state.card_mut(card).restore_reason();
                }
                self.next += 1;
                if self.next < self.pending.len() { Flow::Continue(22) } else { Flow::Continue(24) }
            }
            24 => {
                if self.placed.is_empty() {
                    return Flow::Done;
                }
                if !ctx.state.core.current_chain.is_empty() {
                    return Flow::Continue(26);
                }
                self.at_risk.clear();
                for card in self.placed.clone() {
                    if ctx.is_card_affected_by(card, code::CANNOT_DISABLE_SPSUMMON) {
                        continue;
                    }
                    let c = ctx.state.card_mut(card);
                    c.set_status(Status::SUMMONING, true);
                    c.set_status(Status::SUMMON_DISABLED, false);
                    self.at_risk.insert(card);
                }
                ctx.state.raise_event(self.placed.clone(), event::SPSUMMON, self.procedure, Reason::empty(), player, player, 0);
                ctx.process_instant_event();
                Flow::Continue(25)
            }
            25 => {
                let negated: CardSet = self.at_risk.iter().copied().filter(|&c| ctx.summon_negated(c)).collect();
                if !negated.is_empty() {
                    debug!(count = negated.len(), "group special summon negated");
                    self.placed.retain(|c| !negated.contains(c));
                    let on_field: CardSet = negated.into_iter().filter(|&c| ctx.is_monster_on_field(c)).collect();
                    ctx.send_negated_to_grave(on_field, player);
                }
                if self.placed.is_empty() {
                    return Flow::Done;
                }
                Flow::Continue(26)
            }
            26 => {
                for card in self.placed.clone() {
                    ctx.finish_special_summon(card, true);
                }
                Flow::Continue(27)
            }
            27 => {
                ctx.state.messages.push(Message::SpSummoned);
                for card in self.placed.clone() {
                    ctx.state.raise_single_event(card, event::SPSUMMON_SUCCESS, self.procedure, Reason::empty(), player, player, 0);
                }
                ctx.process_single_event();
                let cards = self.placed.clone();
                ctx.state.raise_event(cards.clone(), event::PRESPSUMMON_SUCCESS, self.procedure, Reason::empty(), player, player, 0);
                ctx.state.raise_event(cards, event::SPSUMMON_SUCCESS, self.procedure, Reason::empty(), player, player, 0);
                ctx.process_instant_event();
                if ctx.state.core.current_chain.is_empty() {
                    ctx.adjust_all();
                    ctx.state.core.hint_timing[player.index()] |= Timing::SPSUMMON;
                }
                ctx.state.core.operated_set = self.placed.iter().copied().collect();
                debug!(count = self.placed.len(), "group special summon complete");
                Flow::Done
            }
            _ => unknown_step("SpSummonRule", step),
        }
    }
}

// ============================================================================
// SpSummonRuleGroup
// ============================================================================

/// Pick one of the field procedures able to summon a group and run it.
#[derive(Debug, Clone)]
pub struct SpSummonRuleGroup {
    pub sumplayer: PlayerId,
    pub summon_type: u32,
    options: Vec<(EffectId, CardId)>,
}

impl SpSummonRuleGroup {
    pub fn new(sumplayer: PlayerId, summon_type: u32) -> Self {
        Self {
            sumplayer,
            summon_type,
            options: Vec::new(),
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                self.options = ctx.filter_group_procedures(None, self.sumplayer, self.summon_type);
                if self.options.is_empty() {
                    return Flow::Done;
                }
                if self.options.len() == 1 {
                    ctx.state.returns.set(0, 0);
                } else {
                    let descriptions = self.options.iter().map(|&(e, _)| ctx.state.effect(e).description).collect();
                    ctx.select_option(self.sumplayer, descriptions);
                }
                Flow::Continue(1)
            }
            1 => {
                let choice = ctx.state.returns.get(0) as usize;
                if let Some(&(proc, handler)) = self.options.get(choice) {
                    let rule = SpSummonRule::with_group_procedure(self.sumplayer, handler, self.summon_type, proc);
                    ctx.push_at(20, Process::SpSummonRule(rule));
                }
                Flow::Done
            }
            _ => unknown_step("SpSummonRuleGroup", step),
        }
    }
}

// ============================================================================
// SpSummonStep
// ============================================================================

/// Place one card of an effect special summon. The summon parameters were
/// recorded on the card when the summon was requested. Returns slot 0 holds
/// 1 when the card landed.
#[derive(Debug, Clone)]
pub struct SpSummonStep {
    /// Batch the card belongs to; rejected cards leave it.
    pub targets: Option<GroupId>,
    pub target: CardId,
    pub zone: u32,
}

impl SpSummonStep {
    pub fn new(targets: Option<GroupId>, target: CardId, zone: u32) -> Self {
        Self { targets, target, zone }
    }

    fn to_player(ctx: &Ctx<'_>, target: CardId) -> PlayerId {
        let c = ctx.state.card(target);
        if c.spsummon_param.playerid.is_none() { c.summon.player } else { c.spsummon_param.playerid }
    }

    fn accept(&self, ctx: &mut Ctx<'_>) -> bool {
        let target = self.target;
        let c = ctx.state.card(target);
        let param = c.spsummon_param;
        let (sumplayer, sumtype, reason_effect) = (c.summon.player, c.summon.summon_type, c.current.reason_effect);
        let to_player = Self::to_player(ctx, target);
        if ctx.revive_blocked(target, param.nocheck, param.nolimit) {
            return false;
        }
        if !ctx.is_special_summonable_card(target, sumplayer, to_player, sumtype, param.positions, reason_effect, param.nocheck) {
            return false;
        }
        if ctx.state.get_useable_count(Some(target), to_player, Location::MZONE, self.zone) <= 0 {
            if ctx.state.card(target).current.location != Location::GRAVE {
                ctx.state.core.spsummon_tograve.insert(target);
            }
            return false;
        }
        true
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let target = self.target;
        match step {
            0 => {
                if !self.accept(ctx) {
                    return Flow::Continue(5);
                }
                let sumplayer = ctx.state.card(target).summon.player;
                ctx.run_summon_costs(target, sumplayer, code::SPSUMMON_COST);
                Flow::Continue(1)
            }
            1 => {
                if self.targets.is_none() {
                    ctx.state.core.special_summoning.insert(target);
                }
                let c = ctx.state.card(target);
                let (sumplayer, sumtype, positions, reason_effect) =
                    (c.summon.player, c.summon.summon_type, c.spsummon_param.positions, c.current.reason_effect);
                let to_player = Self::to_player(ctx, target);
                let positions = ctx.forced_spsummon_positions(target, sumplayer, sumtype, positions, to_player, reason_effect);
                ctx.state.enable_field_effect(target, false);
                ctx.move_to_field(
                    target,
                    sumplayer,
                    to_player,
                    Location::MZONE,
                    positions,
                    false,
                    0,
                    self.zone,
                    false,
                    LocationReason::ToField,
                    false,
                );
                Flow::Continue(2)
            }
            2 => {
                if ctx.state.card(target).current.location != Location::MZONE {
                    return Flow::Continue(5);
                }
                let (code, info) = (ctx.state.card(target).data.code, ctx.state.loc_info(target));
                ctx.state.messages.push(Message::SpSummoning { code, info });
                Flow::Continue(3)
            }
            3 => {
                ctx.state.returns.set(0, 1);
                let controller = ctx.state.card(target).current.controller;
                ctx.state.set_control(target, controller, 0, 0);
                ctx.state.card_mut(target).set_status(Status::SPSUMMON_STEP, true);
                Flow::Done
            }
            5 => {
                ctx.state.returns.set(0, 0);
                ctx.state.card_mut(target).restore_reason();
                if let Some(group) = self.targets {
                    ctx.state.groups.remove(group, target);
                }
                ctx.state.core.special_summoning.remove(&target);
                debug!(card = target.0, "special summon step rejected");
                Flow::Done
            }
            _ => unknown_step("SpSummonStep", step),
        }
    }
}

// ============================================================================
// SpSummon
// ============================================================================

/// Special summon a batch of cards by effect. The turn player's cards are
/// placed first. The number summoned ends up in returns slot 0 and the
/// summoned cards in the operated set.
#[derive(Debug, Clone)]
pub struct SpSummon {
    pub reason_effect: Option<EffectId>,
    pub reason_player: PlayerId,
    pub targets: GroupId,
    pub zone: u32,
}

impl SpSummon {
    pub fn new(reason_effect: Option<EffectId>, reason_player: PlayerId, targets: GroupId, zone: u32) -> Self {
        Self {
            reason_effect,
            reason_player,
            targets,
            zone,
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let (re, rp) = (self.reason_effect, self.reason_player);
        match step {
            0 => {
                let cards = ctx.state.groups.cards(self.targets);
                ctx.state.core.spsummon_tograve.clear();
                let turn = ctx.state.turn_player;
                for p in [turn, turn.opponent()] {
                    let mine: CardSet = cards.iter().copied().filter(|&c| ctx.state.card(c).summon.player == p).collect();
                    if mine.is_empty() {
                        continue;
                    }
                    for card in ctx.state.sorted_for_operation(&mine) {
                        ctx.push(Process::SpSummonStep(SpSummonStep::new(Some(self.targets), card, self.zone)));
                    }
                    ctx.state.core.hint_timing[p.index()] |= Timing::SPSUMMON;
                }
                Flow::Continue(1)
            }
            1 => {
                let tograve = std::mem::take(&mut ctx.state.core.spsummon_tograve);
                if !tograve.is_empty() {
                    debug!(count = tograve.len(), "special summon targets without a zone");
                    ctx.send_to(tograve, None, Reason::RULE, rp, PlayerId::NONE, Location::GRAVE, 0, Position::FACEUP, false);
                }
                Flow::Continue(2)
            }
            2 => {
                let cards = ctx.state.groups.cards(self.targets);
                if cards.is_empty() {
                    ctx.state.core.operated_set.clear();
                    ctx.state.returns.set(0, 0);
                    return Flow::Done;
                }
                for card in cards {
                    ctx.finish_special_summon(card, false);
                }
                Flow::Continue(3)
            }
            3 => {
                ctx.state.messages.push(Message::SpSummoned);
                let cards = ctx.state.groups.cards(self.targets);
                for &card in &cards {
                    let c = ctx.state.card(card);
                    let (faceup, sumtype, sumplayer) = (c.current.position.is_faceup(), c.summon.summon_type, c.summon.player);
                    if faceup {
                        ctx.state.raise_single_event(card, event::SPSUMMON_SUCCESS, re, Reason::empty(), rp, sumplayer, 0);
                    }
                    let reason = material_reason(sumtype, Reason::empty());
                    if !reason.is_empty() {
                        ctx.raise_spsummon_materials(card, event::BE_MATERIAL, reason, re, rp);
                    }
                    ctx.state.card_mut(card).set_status(Status::FUTURE_FUSION, false);
                }
                ctx.process_single_event();
                Flow::Continue(4)
            }
            4 => {
                let cards = ctx.state.groups.cards(self.targets);
                ctx.state.raise_event(cards.clone(), event::PRESPSUMMON_SUCCESS, re, Reason::empty(), rp, rp, 0);
                ctx.state.raise_event(cards, event::SPSUMMON_SUCCESS, re, Reason::empty(), rp, rp, 0);
                ctx.process_instant_event();
                if ctx.state.core.current_chain.is_empty() {
                    ctx.adjust_all();
                }
                Flow::Continue(5)
            }
            5 => {
                let cards = ctx.state.groups.cards(self.targets);
                ctx.state.returns.set(0, cards.len() as i64);
                debug!(count = cards.len(), "special summon complete");
                ctx.state.core.operated_set = cards;
                Flow::Done
            }
            _ => unknown_step("SpSummon", step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_summon_type() {
        assert_eq!(special_summon_type(summon_type::SYNCHRO), summon_type::SYNCHRO);
        assert_eq!(special_summon_type(0), summon_type::SPECIAL);
        assert_eq!(special_summon_type(0x1234), summon_type::SPECIAL | 0x1234);
    }

    #[test]
    fn test_material_reason() {
        assert_eq!(material_reason(summon_type::FUSION | 1, Reason::empty()), Reason::FUSION);
        assert_eq!(material_reason(summon_type::XYZ, Reason::SPSUMMON), Reason::XYZ);
        assert_eq!(material_reason(summon_type::LINK, Reason::SPSUMMON), Reason::LINK);
        assert_eq!(material_reason(summon_type::SPECIAL, Reason::SPSUMMON), Reason::SPSUMMON);
        assert_eq!(material_reason(summon_type::PENDULUM, Reason::empty()), Reason::empty());
    }
}
