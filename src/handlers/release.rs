//! Tributing ("releasing") cards.
//!
//! Cards that cannot be released for the given reason drop out first; the
//! rest go through the replacement window and are then sent to the graveyard
//! with [`Reason::RELEASE`] added.

use crate::actions::Actions;
use crate::codes::{effect as code, hint};
use crate::flags::{Reason, Status};
use crate::group::GroupId;
use crate::handlers::replace::OperationReplace;
use crate::handlers::send_to::SendTo;
use crate::ids::{CardId, EffectId, PlayerId};
use crate::process::{Flow, Process, unknown_step};
use crate::query::Ctx;
use crate::zone::Location;

// ============================================================================
// ReleaseReplace
// ============================================================================

#[derive(Debug, Clone)]
pub struct ReleaseReplace {
    pub targets: GroupId,
    pub target: CardId,
}

impl ReleaseReplace {
    pub fn new(targets: GroupId, target: CardId) -> Self {
        Self { targets, target }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                let card = self.target;
                if !ctx.state.card(card).is_location(Location::ONFIELD | Location::HAND) {
                    ctx.state.card_mut(card).restore_reason();
                    ctx.state.groups.remove(self.targets, card);
                    return Flow::Done;
                }
                if !ctx.state.groups.contains(self.targets, card) {
                    return Flow::Done;
                }
                if !ctx.state.card(card).current.reason.contains(Reason::RULE) {
                    ctx.state.returns.set(0, 0);
                    for e in ctx.filter_single_continuous_effect(card, code::RELEASE_REPLACE) {
                        ctx.push(Process::OperationReplace(OperationReplace::new(e, self.targets, Some(card), false)));
                    }
                }
                Flow::Done
            }
            _ => unknown_step("ReleaseReplace", step),
        }
    }
}

// ============================================================================
// Release
// ============================================================================

#[derive(Debug, Clone)]
pub struct Release {
    pub targets: GroupId,
    pub reason_effect: Option<EffectId>,
    pub reason: Reason,
    pub reason_player: PlayerId,
}

impl Release {
    pub fn new(targets: GroupId, reason_effect: Option<EffectId>, reason: Reason, reason_player: PlayerId) -> Self {
        Self {
            targets,
            reason_effect,
            reason,
            reason_player,
        }
    }

    /// Whether the pending release of `card` may go ahead.
    fn can_release(&self, ctx: &mut Ctx<'_>, card: CardId) -> bool {
        let c = ctx.state.card(card);
        if c.get_status(Status::SUMMONING | Status::SPSUMMON_STEP) {
            return false;
        }
        let current = c.current;
        if current.reason.contains(Reason::SUMMON) {
            // A summon without a recorded summoned card tributes for itself.
            let summoned = current.reason_card.unwrap_or(card);
            return ctx.is_releasable_by_summon(self.reason_player, card, summoned);
        }
        if current.reason.intersects(Reason::RULE | Reason::SUMMON | Reason::COST) {
            return true;
        }
        ctx.is_affected_by_effect(card, current.reason_effect)
            && ctx.is_releasable_by_nonsummon(self.reason_player, card, current.reason)
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                for card in ctx.state.groups.cards(self.targets) {
                    if !self.can_release(ctx, card) {
                        ctx.state.card_mut(card).restore_reason();
                        ctx.state.groups.remove(self.targets, card);
                    }
                }
                if self.reason.contains(Reason::RULE) && ctx.state.groups.len(self.targets) > 0 {
                    return Flow::Continue(1);
                }
                ctx.operation_replace(code::RELEASE_REPLACE, 5, self.targets);
                Flow::Continue(1)
            }
            1 => {
                for card in ctx.state.groups.cards(self.targets) {
                    ctx.push(Process::ReleaseReplace(ReleaseReplace::new(self.targets, card)));
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
                for card in ctx.state.sorted_for_operation(&cards) {
                    if !ctx.state.card(card).is_location(Location::ONFIELD | Location::HAND) {
                        ctx.state.card_mut(card).restore_reason();
                        ctx.state.groups.remove(self.targets, card);
                        continue;
                    }
                    ctx.state.card_mut(card).current.reason |= Reason::RELEASE;
                }
                Flow::Continue(3)
            }
            3 => {
                let reserve = ctx.state.core.dec_count_reserve.clone();
                for e in reserve {
                    if let Some(handler) = ctx.state.effect(e).handler {
                        let code = ctx.state.card(handler).code();
                        ctx.state.hint(hint::CARD, PlayerId::ZERO, u64::from(code));
                    }
                }
                let cards = ctx.state.groups.cards(self.targets);
                let send_targets = ctx.state.groups.create_readonly(cards);
                ctx.operation_replace(code::SEND_REPLACE, 5, send_targets);
                ctx.push_at(
                    1,
                    Process::SendTo(SendTo::new(
                        send_targets,
                        self.reason_effect,
                        self.reason | Reason::RELEASE,
                        self.reason_player,
                    )),
                );
                Flow::Continue(4)
            }
            4 => {
                for e in std::mem::take(&mut ctx.state.core.dec_count_reserve) {
                    ctx.state.effect_mut(e).dec_count();
                }
                let operated = ctx.state.groups.cards(self.targets);
                ctx.state.returns.set(0, operated.len() as i64);
                ctx.state.core.operated_set = operated;
                Flow::Done
            }
            _ => unknown_step("Release", step),
        }
    }
}
