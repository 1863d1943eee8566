//! Destruction.
//!
//! A destroy first weeds out cards that cannot be destroyed (rule-level
//! protection, immunity, "cannot be destroyed" effects with or without a
//! usage count) and swaps in substitutes. Replacement effects then get their
//! chance, the DESTROY events are raised and the survivors are handed to
//! [`SendTo`] at its replacement step.
//!
//! Entry steps: 0 for an ordinary destroy, 10 for destruction by battle.
//! A battle destroy shows protection hints immediately, defers replacement
//! operations until every card was offered, and destroys substitutes
//! together with the remaining cards.

use crate::actions::{Actions, PLAYER_SELFDES};
use crate::card::SendToParam;
use crate::codes::{effect as code, event, hint};
use crate::effect::EffectFlags;
use crate::flags::{Position, Reason, Status, Timing};
use crate::group::{CardSet, GroupId};
use crate::handlers::replace::OperationReplace;
use crate::handlers::send_to::SendTo;
use crate::ids::{CardId, EffectId, PlayerId};
use crate::process::{Flow, Frame, Process, unknown_step};
use crate::query::Ctx;
use crate::script::ScriptArg;
use crate::zone::Location;

/// Arguments every protection value callback receives.
fn reason_args(ctx: &Ctx<'_>, card: CardId) -> [ScriptArg; 3] {
    let current = ctx.state.card(card).current;
    [
        ScriptArg::from(current.reason_effect),
        ScriptArg::Int(i64::from(current.reason.bits())),
        ScriptArg::Player(current.reason_player),
    ]
}

/// Outcome of the protection ladder for one card.
enum Protection {
    None,
    /// Protected; the effects that did it (may be empty for rule-level
    /// protection).
    Protected(Vec<EffectId>),
    /// A substitute takes the destruction.
    Substituted(Vec<CardId>),
}

/// Cards whose destruction another card takes over.
fn substitutes(ctx: &mut Ctx<'_>, card: CardId) -> Vec<CardId> {
    let args = reason_args(ctx, card);
    let mut out = Vec::new();
    for e in ctx.filter_effect(card, code::DESTROY_SUBSTITUTE) {
        if ctx.check_value_condition(e, &args)
            && let Some(handler) = ctx.state.effect(e).handler
        {
            out.push(handler);
        }
    }
    out
}

/// Count-limited protection. Effects with a count limit spend it; effects
/// with a numeric value protect that many times per card.
fn count_protection(ctx: &mut Ctx<'_>, card: CardId) -> Vec<EffectId> {
    let args = reason_args(ctx, card);
    let mut used = Vec::new();
    for e in ctx.filter_effect(card, code::INDESTRUCTABLE_COUNT) {
        let effect = ctx.state.effect(e);
        if effect.is_flag(EffectFlags::COUNT_LIMIT) {
            if effect.count_limit == 0 {
                continue;
            }
            if ctx.check_value_condition(e, &args) {
                used.push(e);
            }
        } else {
            let limit = ctx.effect_value(e, &args);
            if limit == 0 {
                continue;
            }
            let times = ctx.state.card_mut(card).indestructable_effects.entry(e).or_insert(0);
            *times += 1;
            if i64::from(*times) <= limit {
                used.push(e);
            }
        }
    }
    used
}

fn protection(ctx: &mut Ctx<'_>, card: CardId, battle: bool) -> Protection {
    if !ctx.state.is_destructable(card) {
        return Protection::Protected(Vec::new());
    }
    let subs = substitutes(ctx, card);
    if !subs.is_empty() {
        return Protection::Substituted(subs);
    }
    let current = ctx.state.card(card).current;
    if !battle && !current.reason.intersects(Reason::RULE | Reason::COST) {
        if !ctx.is_affected_by_effect(card, current.reason_effect) {
            return Protection::Protected(Vec::new());
        }
        let args = [ScriptArg::from(current.reason_effect), ScriptArg::Player(current.reason_player)];
        for e in ctx.filter_effect(card, code::INDESTRUCTABLE_EFFECT) {
            if ctx.check_value_condition(e, &args) {
                return Protection::Protected(vec![e]);
            }
        }
    }
    let args = reason_args(ctx, card);
    for e in ctx.filter_effect(card, code::INDESTRUCTABLE) {
        if ctx.check_value_condition(e, &args) {
            return Protection::Protected(vec![e]);
        }
    }
    let used = count_protection(ctx, card);
    if !used.is_empty() {
        return Protection::Protected(used);
    }
    Protection::None
}

// ============================================================================
// DestroyReplace
// ============================================================================

/// Offer the card's own destroy replacement effects.
#[derive(Debug, Clone)]
pub struct DestroyReplace {
    pub targets: GroupId,
    pub target: CardId,
    pub battle: bool,
}

impl DestroyReplace {
    pub fn new(targets: GroupId, target: CardId, battle: bool) -> Self {
        Self { targets, target, battle }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                let card = self.target;
                if ctx.state.card(card).is_location(Location::GRAVE | Location::REMOVED) {
                    let c = ctx.state.card_mut(card);
                    c.restore_reason();
                    c.set_status(Status::DESTROY_CONFIRMED, false);
                    ctx.state.groups.remove(self.targets, card);
                    return Flow::Done;
                }
                if !ctx.state.groups.contains(self.targets, card) {
                    return Flow::Done;
                }
                ctx.state.returns.set(0, 0);
                let entry = if self.battle { 10 } else { 0 };
                for e in ctx.filter_single_continuous_effect(card, code::DESTROY_REPLACE) {
                    ctx.push_at(entry, Process::OperationReplace(OperationReplace::new(e, self.targets, Some(card), true)));
                }
                Flow::Done
            }
            _ => unknown_step("DestroyReplace", step),
        }
    }
}

// ============================================================================
// Destroy
// ============================================================================

#[derive(Debug, Clone)]
pub struct Destroy {
    pub targets: GroupId,
    pub reason_effect: Option<EffectId>,
    pub reason: Reason,
    pub reason_player: PlayerId,
}

impl Destroy {
    pub fn new(targets: GroupId, reason_effect: Option<EffectId>, reason: Reason, reason_player: PlayerId) -> Self {
        Self {
            targets,
            reason_effect,
            reason,
            reason_player,
        }
    }

    /// Take a card back out of the destruction with its old reason.
    fn release_card(&self, ctx: &mut Ctx<'_>, card: CardId) {
        let c = ctx.state.card_mut(card);
        c.restore_reason();
        c.set_status(Status::DESTROY_CONFIRMED, false);
        ctx.state.groups.remove(self.targets, card);
    }

    /// Destroy substitutes in place of the cards they saved.
    fn take_substitutes(&self, ctx: &mut Ctx<'_>, substitutes: CardSet) {
        for rep in substitutes {
            if ctx.state.groups.contains(self.targets, rep) {
                continue;
            }
            let c = ctx.state.card_mut(rep);
            c.stash_reason();
            c.current.reason = Reason::EFFECT | Reason::DESTROY | Reason::REPLACE;
            c.current.reason_effect = None;
            c.current.reason_player = c.current.controller;
            c.sendto_param = SendToParam::new(c.owner, Position::FACEUP, Location::GRAVE, 0);
            ctx.state.groups.add_member(self.targets, rep);
        }
    }

    fn show_protection(ctx: &mut Ctx<'_>, effect: EffectId) {
        let code = ctx.state.effect_owner_code(effect);
        ctx.state.hint(hint::CARD, PlayerId::ZERO, u64::from(code));
    }

    fn clear_canceled(ctx: &mut Ctx<'_>) {
        let canceled = std::mem::take(&mut ctx.state.core.destroy_canceled);
        for card in canceled {
            ctx.state.card_mut(card).set_status(Status::DESTROY_CONFIRMED, false);
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                let mut extra = CardSet::new();
                let mut used = Vec::new();
                for card in ctx.state.groups.cards(self.targets) {
                    match protection(ctx, card, false) {
                        Protection::None => {}
                        Protection::Protected(effects) => {
                            if self.reason_player != PLAYER_SELFDES {
                                used.extend(effects);
                            }
                            self.release_card(ctx, card);
                        }
                        Protection::Substituted(subs) => {
                            extra.extend(subs);
                            ctx.state.card_mut(card).restore_reason();
                            ctx.state.core.destroy_canceled.insert(card);
                            ctx.state.groups.remove(self.targets, card);
                        }
                    }
                }
                self.take_substitutes(ctx, extra);
                used.sort();
                used.dedup();
                for e in used {
                    ctx.state.effect_mut(e).dec_count();
                    Self::show_protection(ctx, e);
                }
                ctx.operation_replace(code::DESTROY_REPLACE, 5, self.targets);
                Flow::Continue(1)
            }
            1 => {
                for card in ctx.state.groups.cards(self.targets) {
                    ctx.push(Process::DestroyReplace(DestroyReplace::new(self.targets, card, false)));
                }
                Flow::Continue(2)
            }
            2 => {
                Self::clear_canceled(ctx);
                Flow::Continue(3)
            }
            3 => {
                let cards = ctx.state.groups.cards(self.targets);
                if cards.is_empty() {
                    ctx.state.returns.set(0, 0);
                    ctx.state.core.operated_set.clear();
                    return Flow::Done;
                }
                for card in ctx.state.sorted_for_operation(&cards) {
                    if ctx.state.card(card).is_location(Location::GRAVE | Location::REMOVED) {
                        ctx.state.card_mut(card).restore_reason();
                        ctx.state.groups.remove(self.targets, card);
                        continue;
                    }
                    ctx.state.card_mut(card).current.reason |= Reason::DESTROY;
                    let timing_player = ctx.state.timing_player(ctx.state.card(card));
                    ctx.state.core.hint_timing[timing_player.index() & 1] |= Timing::DESTROY;
                    let current = ctx.state.card(card).current;
                    ctx.state.raise_single_event(
                        card,
                        event::DESTROY,
                        current.reason_effect,
                        current.reason,
                        current.reason_player,
                        PlayerId::ZERO,
                        0,
                    );
                }
                ctx.process_single_event();
                let cards = ctx.state.groups.cards(self.targets);
                ctx.state.raise_event(
                    cards,
                    event::DESTROY,
                    self.reason_effect,
                    self.reason,
                    self.reason_player,
                    PlayerId::ZERO,
                    0,
                );
                ctx.process_instant_event();
                Flow::Continue(4)
            }
            4 => {
                let cards = ctx.state.groups.cards(self.targets);
                for card in cards.iter().copied() {
                    ctx.state.card_mut(card).set_status(Status::DESTROY_CONFIRMED, false);
                    let param = ctx.state.card(card).sendto_param;
                    let mut dest = if param.location.is_empty() {
                        Location::GRAVE
                    } else {
                        param.location
                    };
                    let rp = self.reason_player;
                    let capable = if dest == Location::HAND {
                        ctx.is_capable_send_to_hand(rp, card)
                    } else if dest == Location::DECK {
                        ctx.is_capable_send_to_deck(rp, card)
                    } else if dest == Location::REMOVED {
                        ctx.is_removeable(rp, card, param.position, self.reason)
                    } else {
                        true
                    };
                    if !capable {
                        dest = Location::GRAVE;
                    }
                    ctx.state.card_mut(card).sendto_param.location = dest;
                }
                let send_targets = ctx.state.groups.create_readonly(cards);
                ctx.operation_replace(code::SEND_REPLACE, 5, send_targets);
                ctx.push_at(
                    1,
                    Process::SendTo(SendTo::new(
                        send_targets,
                        self.reason_effect,
                        self.reason | Reason::DESTROY,
                        self.reason_player,
                    )),
                );
                Flow::Continue(5)
            }
            5 => {
                let operated: CardSet = ctx
                    .state
                    .groups
                    .cards(self.targets)
                    .into_iter()
                    .filter(|c| !ctx.state.card(*c).current.reason.contains(Reason::REPLACE))
                    .collect();
                ctx.state.returns.set(0, operated.len() as i64);
                ctx.state.core.operated_set = operated;
                Flow::Done
            }
            // Destruction by battle.
            10 => {
                for card in ctx.state.groups.cards(self.targets) {
                    match protection(ctx, card, true) {
                        Protection::None => {}
                        Protection::Protected(effects) => {
                            for e in effects {
                                ctx.state.effect_mut(e).dec_count();
                                Self::show_protection(ctx, e);
                            }
                            self.release_card(ctx, card);
                        }
                        Protection::Substituted(subs) => {
                            ctx.state.core.battle_destroy_rep.extend(subs);
                            ctx.state.card_mut(card).restore_reason();
                            ctx.state.core.destroy_canceled.insert(card);
                            ctx.state.groups.remove(self.targets, card);
                        }
                    }
                }
                if ctx.state.groups.len(self.targets) > 0 {
                    ctx.operation_replace(code::DESTROY_REPLACE, 12, self.targets);
                }
                Flow::Continue(11)
            }
            11 => {
                for card in ctx.state.groups.cards(self.targets) {
                    ctx.push(Process::DestroyReplace(DestroyReplace::new(self.targets, card, true)));
                }
                Flow::Continue(12)
            }
            12 => {
                Self::clear_canceled(ctx);
                if let Some(link) = ctx.state.core.desrep_chain.front() {
                    let effect = link.triggering_effect;
                    ctx.push_frame(Frame::at(
                        15,
                        Process::OperationReplace(OperationReplace::new(effect, self.targets, None, true)),
                    ));
                }
                Flow::Continue(13)
            }
            13 => {
                let substitutes = std::mem::take(&mut ctx.state.core.battle_destroy_rep);
                self.take_substitutes(ctx, substitutes);
                Flow::Continue(3)
            }
            _ => unknown_step("Destroy", step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardData;
    use crate::effect::{Effect, EffectType};
    use crate::game_state::DuelState;
    use crate::options::DuelOptions;
    use crate::script::NullScript;
    use crate::types::CardType;

    fn monster(state: &mut DuelState, seq: u32) -> CardId {
        state.create_field_card(
            PlayerId::ZERO,
            CardData::new(100 + seq, CardType::MONSTER | CardType::NORMAL),
            Location::MZONE,
            seq,
            Position::FACEUP_ATTACK,
        )
    }

    #[test]
    fn test_materials_cannot_be_destroyed() {
        let mut state = DuelState::new(DuelOptions::default());
        let x = monster(&mut state, 0);
        let m = state.create_card(PlayerId::ZERO, CardData::new(7, CardType::MONSTER), Location::GRAVE);
        state.xyz_add(x, m);
        let mut script = NullScript;
        let mut ctx = Ctx::new(&mut state, &mut script);
        assert!(matches!(protection(&mut ctx, m, false), Protection::Protected(ref e) if e.is_empty()));
        assert!(matches!(protection(&mut ctx, x, false), Protection::None));
    }

    #[test]
    fn test_numeric_count_protection_runs_out() {
        let mut state = DuelState::new(DuelOptions::default());
        let card = monster(&mut state, 1);
        let e = state.add_effect(
            Effect::builder(code::INDESTRUCTABLE_COUNT, EffectType::SINGLE)
                .handler(card)
                .value(1)
                .build(),
        );
        let mut script = NullScript;
        let mut ctx = Ctx::new(&mut state, &mut script);
        assert_eq!(count_protection(&mut ctx, card), vec![e]);
        assert!(count_protection(&mut ctx, card).is_empty());
    }

    #[test]
    fn test_substitute_checked_before_protection() {
        let mut state = DuelState::new(DuelOptions::default());
        let card = monster(&mut state, 0);
        let sub = monster(&mut state, 1);
        state.add_effect(Effect::builder(code::INDESTRUCTABLE, EffectType::SINGLE).handler(card).value(1).build());
        state.add_effect(
            Effect::builder(code::DESTROY_SUBSTITUTE, EffectType::FIELD)
                .handler(sub)
                .range(Location::MZONE)
                .target_range(Location::MZONE, Location::empty())
                .value(1)
                .build(),
        );
        let mut script = NullScript;
        let mut ctx = Ctx::new(&mut state, &mut script);
        match protection(&mut ctx, card, false) {
            Protection::Substituted(subs) => assert_eq!(subs, vec![sub]),
            _ => panic!("substitute not applied"),
        }
    }
}
