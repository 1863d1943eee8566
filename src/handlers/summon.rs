//! Normal summons, flip summons and monster sets.
//!
//! A normal summon or set picks a procedure first: the built-in tribute
//! procedure or one of the card's `SUMMON_PROC`/`SET_PROC` effects. Then
//! it picks what pays for it: the player's per-turn summon count or an
//! extra-count effect. Tributes are chosen with [`SelectTribute`] and released
//! before the card moves. Summons and flip summons open a negation window
//! on the `SUMMON`/`FLIP_SUMMON` event; a card whose `SUMMONING` status is
//! gone when the window closes was negated and is sent to the grave.
//!
//! [`SelectTribute`]: crate::handlers::tribute::SelectTribute

use crate::actions::Actions;
use crate::codes::{effect as code, event, hint, prompt};
use crate::effect::{Effect, EffectFlags, EffectType};
use crate::events::GameEvent;
use crate::flags::{DuelFlags, Position, Reason, Reset, Status, Timing};
use crate::group::CardSet;
use crate::handlers::chain::ExecuteOperation;
use crate::ids::{CardId, EffectId, PlayerId};
use crate::message::Message;
use crate::process::{Flow, Process, unknown_step};
use crate::query::Ctx;
use crate::script::ScriptArg;
use crate::types::{CardType, summon_type};
use crate::zone::{Location, LocationReason};
use tracing::debug;

/// Zones an extra summon may use when its effect does not say.
const DEFAULT_EXTRA_ZONE: u32 = 0x1f001f;
/// Monster zones whose occupants may be tributed when nothing narrows it.
const DEFAULT_RELEASABLE: u32 = 0xff00ff;

/// Tribute range printed on a monster of `level`.
pub fn level_tributes(level: u32) -> (u32, u32) {
    match level {
        0..=4 => (0, 0),
        5 | 6 => (1, 1),
        _ => (2, 2),
    }
}

/// Move a zone mask to the other player's side.
fn swap_sides(zone: u32) -> u32 {
    (zone >> 16) | ((zone & 0xffff) << 16)
}

/// Which of the two hand-to-field procedures is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalKind {
    Summon,
    Set,
}

impl NormalKind {
    fn procedure_code(self) -> u32 {
        match self {
            NormalKind::Summon => code::SUMMON_PROC,
            NormalKind::Set => code::SET_PROC,
        }
    }

    fn limit_code(self) -> u32 {
        match self {
            NormalKind::Summon => code::LIMIT_SUMMON_PROC,
            NormalKind::Set => code::LIMIT_SET_PROC,
        }
    }

    fn extra_count_code(self) -> u32 {
        match self {
            NormalKind::Summon => code::EXTRA_SUMMON_COUNT,
            NormalKind::Set => code::EXTRA_SET_COUNT,
        }
    }

    fn decrease_code(self) -> u32 {
        match self {
            NormalKind::Summon => code::DECREASE_TRIBUTE,
            NormalKind::Set => code::DECREASE_TRIBUTE_SET,
        }
    }

    fn cannot_code(self) -> u32 {
        match self {
            NormalKind::Summon => code::CANNOT_SUMMON,
            NormalKind::Set => code::CANNOT_MSET,
        }
    }

    fn cost_code(self) -> u32 {
        match self {
            NormalKind::Summon => code::SUMMON_COST,
            NormalKind::Set => code::MSET_COST,
        }
    }
}

/// Parameters carried by an extra summon/set count effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraCount {
    pub min_tribute: u32,
    pub zone: u32,
    pub releasable: u32,
}

impl Default for ExtraCount {
    fn default() -> Self {
        Self {
            min_tribute: 0,
            zone: DEFAULT_EXTRA_ZONE,
            releasable: DEFAULT_RELEASABLE,
        }
    }
}

impl ExtraCount {
    /// Decode `[min_tribute, zone, releasable]`; a negative releasable value
    /// narrows the default mask.
    pub fn from_values(values: &[i64]) -> Self {
        let mut out = Self::default();
        if let Some(&min) = values.first() {
            out.min_tribute = (min & 0xff) as u32;
        }
        if let Some(&zone) = values.get(1) {
            out.zone = zone as u32;
        }
        if let Some(&releasable) = values.get(2) {
            out.releasable = if releasable < 0 {
                DEFAULT_RELEASABLE.wrapping_add_signed(releasable as i32)
            } else {
                releasable as u32
            };
        }
        out
    }
}

/// How the tribute question for a procedure-less summon is settled.
enum TributePlan {
    /// No tributes are possible or needed.
    None,
    /// Tributing is optional: ask first, then select up to `max`.
    Ask { max: u32 },
    /// A tribute selection was queued.
    Selecting,
}

impl Ctx<'_> {
    pub fn summon_count_limit(&mut self, player: PlayerId) -> u32 {
        if self.state.is_flag(DuelFlags::UNLIMITED_SUMMONS) {
            return u32::MAX;
        }
        let mut limit = 1;
        for e in self.filter_player_effect(player, code::SET_SUMMON_COUNT_LIMIT) {
            limit = limit.max(self.effect_value(e, &[ScriptArg::Player(player)]) as u32);
        }
        limit
    }

    fn has_summon_count(&mut self, player: PlayerId) -> bool {
        self.state.player(player).summon_count < self.summon_count_limit(player)
    }

    pub fn is_summonable_card(&mut self, card: CardId) -> bool {
        let t = self.state.card(card).data.card_type;
        if !t.contains(CardType::MONSTER) || t.contains(CardType::TOKEN) || t.contains(CardType::RITUAL) || t.is_extra_deck_monster() {
            return false;
        }
        !self.is_card_affected_by(card, code::UNSUMMONABLE_CARD)
    }

    fn is_player_can_normal(&mut self, kind: NormalKind, player: PlayerId, card: CardId) -> bool {
        !self.player_effect_blocks(player, kind.cannot_code(), card, Reason::empty())
    }

    /// Tribute range of `card` after decrease effects. Count-limited
    /// decreases only count while they have uses left.
    pub fn tribute_count(&mut self, kind: NormalKind, card: CardId) -> (u32, u32) {
        let (min, max) = level_tributes(self.state.card(card).current.level);
        if max == 0 {
            return (0, 0);
        }
        let (mut min_dec, mut max_dec, mut limited) = (0, 0, 0);
        for e in self.filter_effect(card, kind.decrease_code()) {
            let dec = self.effect_value(e, &[ScriptArg::Card(card)]) as u32;
            let effect = self.state.effect(e);
            if effect.is_flag(EffectFlags::COUNT_LIMIT) {
                if effect.has_count_left() {
                    limited += dec & 0xffff;
                }
            } else {
                min_dec = min_dec.max(dec & 0xffff);
                max_dec = max_dec.max(dec >> 16);
            }
        }
        let min = min.saturating_sub(min_dec + limited);
        let max = max.saturating_sub(max_dec).max(min);
        (min, max)
    }

    /// Could `card` be placed after tributing between `min` and `max`
    /// monsters?
    fn check_tribute(&mut self, card: CardId, player: PlayerId, min: u32, max: u32, zone: u32) -> bool {
        if max < min {
            return false;
        }
        let free = self.state.get_useable_count(Some(card), player, Location::MZONE, zone);
        if min == 0 && free > 0 {
            return true;
        }
        if max == 0 {
            return false;
        }
        self.summon_release_list(card, player) >= min.max(1)
    }

    fn extra_count(&mut self, effect: EffectId, card: CardId) -> ExtraCount {
        let values = self.effect_values(effect, &[ScriptArg::Card(card), ScriptArg::Int(0)]);
        ExtraCount::from_values(&values)
    }

    fn procedure_args(
        effect: EffectId,
        card: CardId,
        min_tribute: u32,
        zone: u32,
        releasable: u32,
        extra: Option<EffectId>,
    ) -> Vec<ScriptArg> {
        vec![
            ScriptArg::Effect(effect),
            ScriptArg::Card(card),
            ScriptArg::Int(i64::from(min_tribute)),
            ScriptArg::Int(i64::from(zone)),
            ScriptArg::Int(i64::from(releasable)),
            extra.into(),
        ]
    }

    /// Can `proc` summon `card` with these parameters?
    #[allow(clippy::too_many_arguments)]
    fn check_procedure(
        &mut self,
        proc: EffectId,
        card: CardId,
        min_tribute: u32,
        zone: u32,
        releasable: u32,
        extra: Option<EffectId>,
    ) -> bool {
        let e = self.state.effect(proc);
        if e.removed || !e.has_count_left() {
            return false;
        }
        let condition = e.condition;
        match condition {
            Some(condition) => {
                let args = Self::procedure_args(proc, card, min_tribute, zone, releasable, extra);
                self.check_condition(condition, &args)
            }
            None => true,
        }
    }

    /// Usable procedure effects of `card`. Limit procedures, when present,
    /// replace the rest and forbid the built-in procedure. The flag is set
    /// when the built-in procedure is usable; `None` means nothing is.
    #[allow(clippy::too_many_arguments)]
    fn filter_procedures(
        &mut self,
        kind: NormalKind,
        card: CardId,
        player: PlayerId,
        ignore_count: bool,
        min_tribute: u32,
        zone: u32,
    ) -> Option<(bool, Vec<EffectId>)> {
        let limits = self.filter_effect(card, kind.limit_code());
        let has_limits = !limits.is_empty();
        let candidates = if has_limits { limits } else { self.filter_effect(card, kind.procedure_code()) };
        let procs: Vec<EffectId> = candidates
            .into_iter()
            .filter(|&e| self.check_procedure(e, card, min_tribute, zone, DEFAULT_RELEASABLE, None))
            .collect();
        let mut normal = false;
        if !has_limits && self.is_player_can_normal(kind, player, card) {
            let counted = ignore_count
                || self.has_summon_count(player)
                || (!self.state.core.extra_summon[player.index()] && self.is_card_affected_by(card, kind.extra_count_code()));
            if counted {
                let (min, max) = self.tribute_count(kind, card);
                normal = self.check_tribute(card, player, min.max(min_tribute), max, zone);
            }
        }
        if !normal && procs.is_empty() {
            return None;
        }
        Some((normal, procs))
    }

    /// The ways the summon can be paid for: the player's count (`None`) and
    /// each extra-count effect that fits the chosen procedure.
    #[allow(clippy::too_many_arguments)]
    fn count_options(
        &mut self,
        kind: NormalKind,
        card: CardId,
        player: PlayerId,
        procedure: Option<EffectId>,
        ignore_count: bool,
        min_tribute: u32,
        zone: u32,
    ) -> Vec<Option<EffectId>> {
        let mut options = Vec::new();
        if ignore_count || self.has_summon_count(player) {
            options.push(None);
        }
        if ignore_count || self.state.core.extra_summon[player.index()] {
            return options;
        }
        for e in self.filter_effect(card, kind.extra_count_code()) {
            let extra = self.extra_count(e, card);
            let mut new_zone = extra.zone;
            if let Some(p) = procedure {
                let proc = self.state.effect(p);
                if proc.is_flag(EffectFlags::SPSUM_PARAM) && !proc.o_range.is_empty() {
                    new_zone = swap_sides(new_zone);
                }
            }
            new_zone &= zone;
            let usable = match procedure {
                Some(p) => {
                    let min = extra.min_tribute.max(min_tribute);
                    self.check_procedure(p, card, min, new_zone, extra.releasable, Some(e))
                }
                None => {
                    let (min, mut max) = self.tribute_count(kind, card);
                    if !self.is_player_can_normal(kind, player, card) {
                        max = 0;
                    }
                    let min = min.max(min_tribute);
                    max >= min && self.check_tribute(card, player, min.max(extra.min_tribute), max, new_zone)
                }
            };
            if usable {
                options.push(Some(e));
            }
        }
        options
    }

    /// Settle tributes for a procedure-less summon or set.
    fn plan_tributes(&mut self, kind: NormalKind, card: CardId, player: PlayerId, min_tribute: u32, zone: u32) -> TributePlan {
        let (min, max) = self.tribute_count(kind, card);
        let mut min = min.max(min_tribute);
        if max == 0 || !self.is_player_can_normal(kind, player, card) {
            self.state.return_cards.set(Vec::new());
            return TributePlan::None;
        }
        if self.summon_release_list(card, player) == 0 {
            self.state.return_cards.set(Vec::new());
            return TributePlan::None;
        }
        let ct = self.state.get_useable_count(Some(card), player, Location::MZONE, zone);
        let fcount = self.state.get_useable_count(Some(card), player, Location::MZONE, 0xff);
        if min == 0 && ct > 0 && fcount > 0 {
            self.select_yes_no(player, prompt::TRIBUTE_SUMMON);
            return TributePlan::Ask { max };
        }
        if fcount <= 0 {
            min = min.max(1);
        }
        let cancelable = self.state.core.summon_cancelable;
        self.select_tribute_cards(Some(card), player, cancelable, min, max, player, zone);
        TributePlan::Selecting
    }

    /// Queue the operations of every cost effect of `code` on `card`.
    pub(crate) fn run_summon_costs(&mut self, card: CardId, player: PlayerId, cost_code: u32) {
        for e in self.filter_effect(card, cost_code) {
            if self.state.effect(e).operation.is_some() {
                let mut ev = GameEvent::new(0);
                ev.cards.push(card);
                self.push(Process::ExecuteOperation(ExecuteOperation::new(e, player, ev)));
            }
        }
    }

    pub(crate) fn card_hint(&mut self, effect: EffectId) {
        let code = self.state.effect(effect).handler.map_or(0, |h| self.state.card(h).data.code);
        self.state.hint(hint::CARD, PlayerId::ZERO, u64::from(code));
    }

    /// Charge the summon to the player's count or to the extra-count effect.
    fn consume_summon_count(&mut self, player: PlayerId, card: CardId, ignore_count: bool, extra: Option<EffectId>) {
        if ignore_count {
            return;
        }
        match extra {
            None => self.state.player_mut(player).summon_count += 1,
            Some(e) => {
                self.state.core.extra_summon[player.index()] = true;
                self.card_hint(e);
                if self.state.effect(e).operation.is_some() {
                    let mut ev = GameEvent::new(0);
                    ev.cards.push(card);
                    self.push(Process::ExecuteOperation(ExecuteOperation::new(e, player, ev)));
                }
            }
        }
    }

    /// Use up decrease-tribute effects to cover tributes not paid with
    /// cards.
    fn consume_decrease_tribute(&mut self, kind: NormalKind, card: CardId, paid: u32) {
        let (base, _) = level_tributes(self.state.card(card).current.level);
        let mut missing = base as i64 - paid as i64;
        if missing <= 0 {
            return;
        }
        let effects = self.filter_effect(card, kind.decrease_code());
        let mut best: Option<(EffectId, i64)> = None;
        for &e in &effects {
            if self.state.effect(e).is_flag(EffectFlags::COUNT_LIMIT) {
                continue;
            }
            let dec = self.effect_value(e, &[ScriptArg::Card(card)]) & 0xffff;
            if best.is_none_or(|(_, b)| dec > b) {
                best = Some((e, dec));
            }
        }
        if let Some((e, dec)) = best {
            missing -= dec;
            self.card_hint(e);
        }
        // Targeted count-limited decreases are spent before untargeted ones.
        for targeted in [true, false] {
            for &e in &effects {
                if missing <= 0 {
                    return;
                }
                let effect = self.state.effect(e);
                if !effect.is_flag(EffectFlags::COUNT_LIMIT) || !effect.has_count_left() || effect.target.is_some() != targeted {
                    continue;
                }
                missing -= self.effect_value(e, &[ScriptArg::Card(card)]) & 0xffff;
                self.state.effect_mut(e).dec_count();
                self.card_hint(e);
            }
        }
    }

    /// Release the chosen tributes as materials of `card`.
    fn release_tributes(&mut self, card: CardId, player: PlayerId, tributes: CardSet) {
        {
            let c = self.state.card_mut(card);
            c.summon.location = Location::HAND;
            c.summon.pzone = false;
            c.summon.summon_type = summon_type::NORMAL;
        }
        if !tributes.is_empty() {
            for &t in &tributes {
                self.state.card_mut(t).current.reason_card = Some(card);
            }
            self.state.card_mut(card).material_cards = tributes.clone();
            self.release(tributes, None, Reason::SUMMON | Reason::MATERIAL, player);
            self.state.card_mut(card).summon.summon_type |= summon_type::ADVANCE;
            self.adjust_all();
        }
        let c = self.state.card_mut(card);
        c.summon.player = player;
        c.current.reason_effect = None;
        c.current.reason_player = player;
    }

    /// Run a procedure's target callback now; its verdict lands in returns
    /// slot 0.
    #[allow(clippy::too_many_arguments)]
    fn run_procedure_target(
        &mut self,
        proc: EffectId,
        player: PlayerId,
        card: CardId,
        min_tribute: u32,
        zone: u32,
        extra: Option<EffectId>,
    ) {
        let Some(target) = self.state.effect(proc).target else {
            self.state.returns.set(0, 1);
            return;
        };
        let releasable = extra.map_or(DEFAULT_RELEASABLE, |e| self.extra_count(e, card).releasable);
        let args = Self::procedure_args(proc, card, min_tribute, zone, releasable, extra);
        let saved = (self.state.core.reason_effect, self.state.core.reason_player);
        self.state.core.reason_effect = Some(proc);
        self.state.core.reason_player = player;
        let ok = self.run_target(target, &args);
        (self.state.core.reason_effect, self.state.core.reason_player) = saved;
        self.state.returns.set_bool(0, ok);
    }

    /// Apply a procedure: summon type from its value, then its operation.
    #[allow(clippy::too_many_arguments)]
    fn run_procedure_operation(
        &mut self,
        proc: EffectId,
        player: PlayerId,
        card: CardId,
        min_tribute: u32,
        zone: u32,
        extra: Option<EffectId>,
    ) {
        let value = self.effect_value(proc, &[ScriptArg::Card(card)]) as u32;
        {
            let c = self.state.card_mut(card);
            c.summon.location = Location::HAND;
            c.summon.pzone = false;
            c.summon.player = player;
            c.summon.summon_type = (value & 0xfffffff) | summon_type::NORMAL;
            c.current.reason_effect = Some(proc);
            c.current.reason_player = player;
        }
        if let Some(operation) = self.state.effect(proc).operation {
            let releasable = extra.map_or(DEFAULT_RELEASABLE, |e| self.extra_count(e, card).releasable);
            let args = Self::procedure_args(proc, card, min_tribute, zone, releasable, extra);
            self.run_effect_operation(proc, player, operation, &args);
        }
        self.state.effect_mut(proc).dec_count();
    }

    /// Positions and receiving player for a hand-to-field procedure.
    fn procedure_placement(&self, procedure: Option<EffectId>, player: PlayerId, positions: Position, mask: Position) -> (Position, PlayerId) {
        let Some(p) = procedure else {
            return (positions, player);
        };
        let proc = self.state.effect(p);
        if !proc.is_flag(EffectFlags::SPSUM_PARAM) {
            return (positions, player);
        }
        let positions = Position::from_bits_truncate(proc.s_range.bits()) & mask;
        let player = if proc.o_range.is_empty() { player } else { player.opponent() };
        (positions, player)
    }

    /// A summon is negated once its `SUMMONING` status has been taken away.
    pub(crate) fn summon_negated(&self, card: CardId) -> bool {
        let c = self.state.card(card);
        !c.get_status(Status::SUMMONING) || c.get_status(Status::SUMMON_DISABLED)
    }

    fn raise_material_events(&mut self, card: CardId, code: u32, reason_effect: Option<EffectId>, player: PlayerId) {
        let materials = self.state.card(card).material_cards.clone();
        if materials.is_empty() {
            return;
        }
        for &m in &materials {
            self.state.raise_single_event(m, code, reason_effect, Reason::SUMMON, player, player, 0);
        }
        self.state.raise_event(materials, code, reason_effect, Reason::SUMMON, player, player, 0);
    }
}

// ============================================================================
// SummonRule
// ============================================================================

/// Normal summon (or gemini re-summon) of `target` by `sumplayer`.
#[derive(Debug, Clone)]
pub struct SummonRule {
    pub sumplayer: PlayerId,
    pub target: CardId,
    pub procedure: Option<EffectId>,
    pub ignore_count: bool,
    pub min_tribute: u32,
    pub zone: u32,
    options: Vec<Option<EffectId>>,
    count_options: Vec<Option<EffectId>>,
    extra: Option<EffectId>,
    max_tributes: u32,
    tributes: CardSet,
    gemini: bool,
}

impl SummonRule {
    pub fn new(sumplayer: PlayerId, target: CardId, procedure: Option<EffectId>, ignore_count: bool, min_tribute: u32, zone: u32) -> Self {
        Self {
            sumplayer,
            target,
            procedure,
            ignore_count,
            min_tribute,
            zone,
            options: Vec::new(),
            count_options: Vec::new(),
            extra: None,
            max_tributes: 0,
            tributes: CardSet::new(),
            gemini: false,
        }
    }

    fn check_gemini(&self, ctx: &mut Ctx<'_>) -> bool {
        let (player, target) = (self.sumplayer, self.target);
        if ctx.state.card(target).current.position.is_facedown() {
            return false;
        }
        if !self.ignore_count
            && (ctx.state.core.extra_summon[player.index()] || !ctx.is_card_affected_by(target, code::EXTRA_SUMMON_COUNT))
            && !ctx.has_summon_count(player)
        {
            return false;
        }
        ctx.is_card_affected_by(target, code::GEMINI_SUMMONABLE)
            && !ctx.is_card_affected_by(target, code::GEMINI_STATUS)
            && ctx.is_player_can_normal(NormalKind::Summon, player, target)
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let (player, target) = (self.sumplayer, self.target);
        match step {
            0 => {
                if !ctx.is_summonable_card(target)
                    || ctx.state.check_unique_onfield(target, player, Location::MZONE)
                    || ctx.is_card_affected_by(target, code::CANNOT_SUMMON)
                {
                    return Flow::Done;
                }
                if ctx.is_monster_on_field(target) {
                    if !self.check_gemini(ctx) {
                        return Flow::Done;
                    }
                    self.gemini = true;
                } else {
                    if ctx.state.card(target).current.location != Location::HAND {
                        return Flow::Done;
                    }
                    let filtered =
                        ctx.filter_procedures(NormalKind::Summon, target, player, self.ignore_count, self.min_tribute, self.zone);
                    let Some((normal, procs)) = filtered else {
                        return Flow::Done;
                    };
                    if let Some(p) = self.procedure {
                        if !procs.contains(&p) {
                            return Flow::Done;
                        }
                        self.options = vec![Some(p)];
                        ctx.state.returns.set(0, 0);
                    } else {
                        self.options.clear();
                        let mut descriptions = Vec::new();
                        if normal {
                            self.options.push(None);
                            descriptions.push(1);
                        }
                        for p in procs {
                            self.options.push(Some(p));
                            descriptions.push(ctx.state.effect(p).description);
                        }
                        if self.options.len() == 1 {
                            ctx.state.returns.set(0, 0);
                        } else {
                            ctx.select_option(player, descriptions);
                        }
                    }
                }
                let core = &mut ctx.state.core;
                core.summon_cancelable = core.summon_depth == 0;
                core.summon_depth += 1;
                ctx.state.card_mut(target).material_cards.clear();
                debug!(card = target.0, player = player.0, gemini = self.gemini, "normal summon started");
                Flow::Continue(1)
            }
            1 => {
                if self.gemini {
                    self.extra = None;
                    if !self.ignore_count && !ctx.state.core.extra_summon[player.index()] && !ctx.has_summon_count(player) {
                        self.extra = ctx.filter_effect(target, code::EXTRA_SUMMON_COUNT).into_iter().next();
                    }
                    return Flow::Continue(5);
                }
                let choice = ctx.state.returns.get(0) as usize;
                self.procedure = self.options.get(choice).copied().flatten();
                self.count_options = ctx.count_options(
                    NormalKind::Summon,
                    target,
                    player,
                    self.procedure,
                    self.ignore_count,
                    self.min_tribute,
                    self.zone,
                );
                if self.count_options.len() > 1 {
                    let descriptions = self
                        .count_options
                        .iter()
                        .map(|o| o.map_or(1, |e| ctx.state.effect(e).description))
                        .collect();
                    ctx.select_option(player, descriptions);
                } else {
                    ctx.state.returns.set(0, 0);
                }
                Flow::Continue(2)
            }
            2 => {
                let choice = ctx.state.returns.get(0) as usize;
                self.extra = self.count_options.get(choice).copied().flatten();
                if let Some(e) = self.extra {
                    let extra = ctx.extra_count(e, target);
                    self.min_tribute = self.min_tribute.max(extra.min_tribute);
                    let mut zone = extra.zone;
                    if let Some(p) = self.procedure {
                        let proc = ctx.state.effect(p);
                        if proc.is_flag(EffectFlags::SPSUM_PARAM) && !proc.o_range.is_empty() {
                            zone = swap_sides(zone);
                        }
                    }
                    self.zone &= zone;
                }
                if self.procedure.is_some() {
                    return Flow::Continue(4);
                }
                match ctx.plan_tributes(NormalKind::Summon, target, player, self.min_tribute, self.zone) {
                    TributePlan::None | TributePlan::Selecting => Flow::Continue(5),
                    TributePlan::Ask { max } => {
                        self.max_tributes = max;
                        Flow::Continue(3)
                    }
                }
            }
            3 => {
                if ctx.state.returns.get_bool(0) {
                    ctx.state.return_cards.set(Vec::new());
                } else {
                    let cancelable = ctx.state.core.summon_cancelable;
                    ctx.select_tribute_cards(Some(target), player, cancelable, 1, self.max_tributes, player, self.zone);
                }
                Flow::Continue(5)
            }
            4 => {
                if let Some(p) = self.procedure {
                    ctx.run_procedure_target(p, player, target, self.min_tribute, self.zone, self.extra);
                }
                Flow::Continue(5)
            }
            5 => {
                let next = if self.gemini {
                    10
                } else if self.procedure.is_some() {
                    if !ctx.state.returns.get_bool(0) {
                        ctx.state.core.summon_depth -= 1;
                        return Flow::Done;
                    }
                    7
                } else {
                    if ctx.state.return_cards.canceled {
                        ctx.state.core.summon_depth -= 1;
                        return Flow::Done;
                    }
                    self.tributes = ctx.state.return_cards.list.iter().copied().collect();
                    6
                };
                ctx.run_summon_costs(target, player, NormalKind::Summon.cost_code());
                Flow::Continue(next)
            }
            6 => {
                let tributes = std::mem::take(&mut self.tributes);
                ctx.consume_decrease_tribute(NormalKind::Summon, target, tributes.len() as u32);
                ctx.release_tributes(target, player, tributes);
                Flow::Continue(8)
            }
            7 => {
                if let Some(p) = self.procedure {
                    ctx.run_procedure_operation(p, player, target, self.min_tribute, self.zone, self.extra);
                }
                Flow::Continue(8)
            }
            8 => {
                ctx.state.core.summon_depth -= 1;
                if ctx.state.core.summon_depth > 0 {
                    return Flow::Done;
                }
                ctx.consume_summon_count(player, target, self.ignore_count, self.extra);
                Flow::Continue(9)
            }
            9 => {
                let mut positions = Position::FACEUP_ATTACK;
                if ctx.state.is_flag(DuelFlags::NORMAL_SUMMON_FACEUP_DEF) || ctx.is_player_affected_by_effect(player, code::DEVINE_LIGHT) {
                    positions = Position::FACEUP;
                }
                let (mut positions, to_player) = ctx.procedure_placement(self.procedure, player, positions, Position::FACEUP);
                for e in ctx.filter_player_effect(player, code::FORCE_NORMAL_SUMMON_POSITION) {
                    if let Some(cond) = ctx.state.effect(e).target {
                        let sumtype = ctx.state.card(target).summon.summon_type;
                        let args = [
                            ScriptArg::Effect(e),
                            ScriptArg::Card(target),
                            ScriptArg::Player(player),
                            ScriptArg::Int(i64::from(sumtype)),
                            ScriptArg::Int(i64::from(positions.bits())),
                            ScriptArg::Player(to_player),
                        ];
                        if !ctx.check_condition(cond, &args) {
                            continue;
                        }
                    }
                    positions &= Position::from_bits_truncate(ctx.effect_value(e, &[]) as u32);
                }
                ctx.state.enable_field_effect(target, false);
                ctx.move_to_field(
                    target,
                    player,
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
                Flow::Continue(12)
            }
            10 => {
                ctx.state.core.summon_depth -= 1;
                if ctx.state.core.summon_depth > 0 {
                    return Flow::Done;
                }
                ctx.state.enable_field_effect(target, false);
                let c = ctx.state.card_mut(target);
                c.summon.location = Location::MZONE;
                c.summon.pzone = false;
                c.summon.sequence = c.current.sequence;
                c.summon.summon_type |= summon_type::NORMAL;
                c.current.reason_effect = None;
                c.current.reason_player = player;
                let status = Effect::builder(code::GEMINI_STATUS, EffectType::SINGLE)
                    .handler(target)
                    .owner(target)
                    .flags(EffectFlags::CANNOT_DISABLE | EffectFlags::CLIENT_HINT)
                    .description(64)
                    .reset(Reset::EVENT | Reset::standard(), 0)
                    .build();
                ctx.state.add_effect(status);
                Flow::Continue(11)
            }
            11 => {
                ctx.consume_summon_count(player, target, self.ignore_count, self.extra);
                Flow::Continue(12)
            }
            12 => {
                let controller = ctx.state.card(target).current.controller;
                ctx.state.set_control(target, controller, 0, 0);
                {
                    let c = ctx.state.card_mut(target);
                    c.current.reason = Reason::SUMMON;
                    c.summon.player = player;
                }
                let (code, info) = (ctx.state.card(target).data.code, ctx.state.loc_info(target));
                ctx.state.messages.push(Message::Summoning { code, info });
                ctx.raise_material_events(target, event::BE_PRE_MATERIAL, self.procedure, player);
                ctx.process_single_event();
                ctx.process_instant_event();
                Flow::Continue(13)
            }
            13 => {
                if !ctx.state.core.current_chain.is_empty() || ctx.is_card_affected_by(target, code::CANNOT_DISABLE_SUMMON) {
                    return Flow::Continue(16);
                }
                Flow::Continue(14)
            }
            14 => {
                let c = ctx.state.card_mut(target);
                c.set_status(Status::SUMMONING, true);
                c.set_status(Status::SUMMON_DISABLED, false);
                ctx.state.raise_event([target], event::SUMMON, self.procedure, Reason::empty(), player, player, 0);
                ctx.process_instant_event();
                Flow::Continue(15)
            }
            15 => {
                if !ctx.summon_negated(target) {
                    return Flow::Continue(16);
                }
                debug!(card = target.0, "normal summon negated");
                if ctx.is_monster_on_field(target) {
                    ctx.send_to(
                        CardSet::from([target]),
                        None,
                        Reason::RULE,
                        player,
                        player,
                        Location::GRAVE,
                        0,
                        Position::empty(),
                        false,
                    );
                }
                Flow::Done
            }
            16 => {
                {
                    let c = ctx.state.card_mut(target);
                    c.set_status(Status::SUMMONING, false);
                    c.set_status(Status::SUMMON_TURN, true);
                }
                ctx.state.enable_field_effect(target, true);
                if ctx.state.card(target).get_status(Status::DISABLED) {
                    ctx.state.reset_card(target, Reset::DISABLE);
                }
                Flow::Continue(17)
            }
            17 => {
                ctx.state.messages.push(Message::Summoned);
                ctx.raise_material_events(target, event::BE_MATERIAL, self.procedure, player);
                ctx.process_single_event();
                ctx.process_instant_event();
                Flow::Continue(18)
            }
            18 => {
                ctx.state.raise_single_event(target, event::SUMMON_SUCCESS, self.procedure, Reason::empty(), player, player, 0);
                ctx.process_single_event();
                ctx.state.raise_event([target], event::SUMMON_SUCCESS, self.procedure, Reason::empty(), player, player, 0);
                ctx.process_instant_event();
                if ctx.state.core.current_chain.is_empty() {
                    ctx.adjust_all();
                    ctx.state.core.hint_timing[player.index()] |= Timing::SUMMON;
                }
                debug!(card = target.0, "normal summon complete");
                Flow::Done
            }
            _ => unknown_step("SummonRule", step),
        }
    }
}

// ============================================================================
// FlipSummon
// ============================================================================

#[derive(Debug, Clone)]
pub struct FlipSummon {
    pub sumplayer: PlayerId,
    pub target: CardId,
}

impl FlipSummon {
    pub fn new(sumplayer: PlayerId, target: CardId) -> Self {
        Self { sumplayer, target }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let (player, target) = (self.sumplayer, self.target);
        match step {
            0 => {
                if !ctx.is_monster_on_field(target)
                    || !ctx.state.card(target).current.position.is_facedown()
                    || ctx.state.check_unique_onfield(target, player, Location::MZONE)
                {
                    return Flow::Done;
                }
                ctx.run_summon_costs(target, player, code::FLIPSUMMON_COST);
                Flow::Continue(1)
            }
            1 => {
                let fieldid = ctx.state.new_fieldid();
                {
                    let c = ctx.state.card_mut(target);
                    c.previous.position = c.current.position;
                    c.current.position = Position::FACEUP_ATTACK;
                    c.summon.player = player;
                    c.fieldid = fieldid;
                }
                let (code, info) = (ctx.state.card(target).data.code, ctx.state.loc_info(target));
                ctx.state.messages.push(Message::FlipSummoning { code, info });
                if ctx.is_card_affected_by(target, code::CANNOT_DISABLE_FLIP_SUMMON) {
                    return Flow::Continue(3);
                }
                let c = ctx.state.card_mut(target);
                c.set_status(Status::SUMMONING, true);
                c.set_status(Status::SUMMON_DISABLED, false);
                ctx.state.raise_event([target], event::FLIP_SUMMON, None, Reason::empty(), player, player, 0);
                ctx.process_instant_event();
                Flow::Continue(2)
            }
            2 => {
                if !ctx.summon_negated(target) {
                    return Flow::Continue(3);
                }
                debug!(card = target.0, "flip summon negated");
                if ctx.is_monster_on_field(target) {
                    ctx.send_to(
                        CardSet::from([target]),
                        None,
                        Reason::RULE,
                        player,
                        player,
                        Location::GRAVE,
                        0,
                        Position::empty(),
                        false,
                    );
                }
                Flow::Done
            }
            3 => {
                ctx.state.card_mut(target).set_status(Status::SUMMONING, false);
                ctx.state.enable_field_effect(target, true);
                if ctx.state.card(target).get_status(Status::DISABLED) {
                    ctx.state.reset_card(target, Reset::DISABLE);
                }
                ctx.state.card_mut(target).set_status(Status::FLIP_SUMMON_TURN, true);
                Flow::Continue(4)
            }
            4 => {
                ctx.state.messages.push(Message::FlipSummoned);
                for code in [event::FLIP, event::FLIP_SUMMON_SUCCESS, event::CHANGE_POS] {
                    ctx.state.raise_single_event(target, code, None, Reason::empty(), player, player, 0);
                }
                ctx.process_single_event();
                for code in [event::FLIP, event::FLIP_SUMMON_SUCCESS, event::CHANGE_POS] {
                    ctx.state.raise_event([target], code, None, Reason::empty(), player, player, 0);
                }
                ctx.process_instant_event();
                ctx.adjust_all();
                if ctx.state.core.current_chain.is_empty() {
                    ctx.state.core.hint_timing[player.index()] |= Timing::FLIPSUMMON;
                }
                Flow::Done
            }
            _ => unknown_step("FlipSummon", step),
        }
    }
}

// ============================================================================
// MonsterSet
// ============================================================================

/// Set a monster from the hand face-down.
#[derive(Debug, Clone)]
pub struct MonsterSet {
    pub setplayer: PlayerId,
    pub target: CardId,
    pub procedure: Option<EffectId>,
    pub ignore_count: bool,
    pub min_tribute: u32,
    pub zone: u32,
    options: Vec<Option<EffectId>>,
    count_options: Vec<Option<EffectId>>,
    extra: Option<EffectId>,
    max_tributes: u32,
    tributes: CardSet,
}

impl MonsterSet {
    pub fn new(setplayer: PlayerId, target: CardId, procedure: Option<EffectId>, ignore_count: bool, min_tribute: u32, zone: u32) -> Self {
        Self {
            setplayer,
            target,
            procedure,
            ignore_count,
            min_tribute,
            zone,
            options: Vec::new(),
            count_options: Vec::new(),
            extra: None,
            max_tributes: 0,
            tributes: CardSet::new(),
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let (player, target) = (self.setplayer, self.target);
        match step {
            0 => {
                let c = ctx.state.card(target);
                if c.current.location != Location::HAND || !c.data.card_type.contains(CardType::MONSTER) {
                    return Flow::Done;
                }
                if ctx.is_card_affected_by(target, code::UNSUMMONABLE_CARD) || ctx.is_card_affected_by(target, code::CANNOT_MSET) {
                    return Flow::Done;
                }
                let filtered = ctx.filter_procedures(NormalKind::Set, target, player, self.ignore_count, self.min_tribute, self.zone);
                let Some((normal, procs)) = filtered else {
                    return Flow::Done;
                };
                if let Some(p) = self.procedure {
                    if !procs.contains(&p) {
                        return Flow::Done;
                    }
                    self.options = vec![Some(p)];
                    ctx.state.returns.set(0, 0);
                } else {
                    self.options.clear();
                    let mut descriptions = Vec::new();
                    if normal {
                        self.options.push(None);
                        descriptions.push(1);
                    }
                    for p in procs {
                        self.options.push(Some(p));
                        descriptions.push(ctx.state.effect(p).description);
                    }
                    if self.options.len() == 1 {
                        ctx.state.returns.set(0, 0);
                    } else {
                        ctx.select_option(player, descriptions);
                    }
                }
                ctx.state.card_mut(target).material_cards.clear();
                debug!(card = target.0, player = player.0, "monster set started");
                Flow::Continue(1)
            }
            1 => {
                let choice = ctx.state.returns.get(0) as usize;
                self.procedure = self.options.get(choice).copied().flatten();
                self.count_options =
                    ctx.count_options(NormalKind::Set, target, player, self.procedure, self.ignore_count, self.min_tribute, self.zone);
                if self.count_options.len() > 1 {
                    let descriptions = self
                        .count_options
                        .iter()
                        .map(|o| o.map_or(1, |e| ctx.state.effect(e).description))
                        .collect();
                    ctx.select_option(player, descriptions);
                } else {
                    ctx.state.returns.set(0, 0);
                }
                Flow::Continue(2)
            }
            2 => {
                let choice = ctx.state.returns.get(0) as usize;
                self.extra = self.count_options.get(choice).copied().flatten();
                if let Some(e) = self.extra {
                    let extra = ctx.extra_count(e, target);
                    self.min_tribute = self.min_tribute.max(extra.min_tribute);
                    let mut zone = extra.zone;
                    if let Some(p) = self.procedure {
                        let proc = ctx.state.effect(p);
                        if proc.is_flag(EffectFlags::SPSUM_PARAM) && !proc.o_range.is_empty() {
                            zone = swap_sides(zone);
                        }
                    }
                    self.zone &= zone;
                }
                if self.procedure.is_some() {
                    return Flow::Continue(4);
                }
                match ctx.plan_tributes(NormalKind::Set, target, player, self.min_tribute, self.zone) {
                    TributePlan::None | TributePlan::Selecting => Flow::Continue(4),
                    TributePlan::Ask { max } => {
                        self.max_tributes = max;
                        Flow::Continue(3)
                    }
                }
            }
            3 => {
                if ctx.state.returns.get_bool(0) {
                    ctx.state.return_cards.set(Vec::new());
                } else {
                    let cancelable = ctx.state.core.summon_cancelable;
                    ctx.select_tribute_cards(Some(target), player, cancelable, 1, self.max_tributes, player, self.zone);
                }
                Flow::Continue(4)
            }
            4 => {
                let next = if self.procedure.is_some() {
                    6
                } else {
                    if ctx.state.return_cards.canceled {
                        return Flow::Done;
                    }
                    self.tributes = ctx.state.return_cards.list.iter().copied().collect();
                    5
                };
                ctx.run_summon_costs(target, player, NormalKind::Set.cost_code());
                Flow::Continue(next)
            }
            5 => {
                let tributes = std::mem::take(&mut self.tributes);
                ctx.consume_decrease_tribute(NormalKind::Set, target, tributes.len() as u32);
                ctx.release_tributes(target, player, tributes);
                Flow::Continue(8)
            }
            6 => {
                if let Some(p) = self.procedure {
                    ctx.run_procedure_target(p, player, target, self.min_tribute, self.zone, self.extra);
                }
                Flow::Continue(7)
            }
            7 => {
                if !ctx.state.returns.get_bool(0) {
                    return Flow::Done;
                }
                if let Some(p) = self.procedure {
                    ctx.run_procedure_operation(p, player, target, self.min_tribute, self.zone, self.extra);
                }
                Flow::Continue(8)
            }
            8 => {
                ctx.consume_summon_count(player, target, self.ignore_count, self.extra);
                Flow::Continue(9)
            }
            9 => {
                let (positions, to_player) =
                    ctx.procedure_placement(self.procedure, player, Position::FACEDOWN_DEFENSE, Position::FACEDOWN);
                ctx.state.enable_field_effect(target, false);
                ctx.move_to_field(
                    target,
                    player,
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
                Flow::Continue(10)
            }
            10 => {
                let controller = ctx.state.card(target).current.controller;
                ctx.state.set_control(target, controller, 0, 0);
                ctx.state.card_mut(target).set_status(Status::SUMMON_TURN, true);
                let (code, info) = (ctx.state.card(target).data.code, ctx.state.loc_info(target));
                ctx.state.messages.push(Message::Set { code, info });
                ctx.state.raise_event([target], event::MSET, self.procedure, Reason::empty(), player, player, 0);
                ctx.process_instant_event();
                if ctx.state.core.current_chain.is_empty() {
                    ctx.adjust_all();
                    ctx.state.core.hint_timing[player.index()] |= Timing::MSET;
                }
                Flow::Done
            }
            _ => unknown_step("MonsterSet", step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_tributes() {
        assert_eq!(level_tributes(1), (0, 0));
        assert_eq!(level_tributes(4), (0, 0));
        assert_eq!(level_tributes(5), (1, 1));
        assert_eq!(level_tributes(6), (1, 1));
        assert_eq!(level_tributes(7), (2, 2));
        assert_eq!(level_tributes(12), (2, 2));
    }

    #[test]
    fn test_extra_count_defaults() {
        assert_eq!(ExtraCount::from_values(&[]), ExtraCount::default());
        let narrowed = ExtraCount::from_values(&[1, 0x1f, -0x10]);
        assert_eq!(narrowed.min_tribute, 1);
        assert_eq!(narrowed.zone, 0x1f);
        assert_eq!(narrowed.releasable, DEFAULT_RELEASABLE - 0x10);
    }

    #[test]
    fn test_swap_sides() {
        assert_eq!(swap_sides(0x1f), 0x1f0000);
        assert_eq!(swap_sides(0x1f0000), 0x1f);
        assert_eq!(swap_sides(DEFAULT_EXTRA_ZONE), DEFAULT_EXTRA_ZONE);
    }
}
