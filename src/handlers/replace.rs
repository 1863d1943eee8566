//! Replacement effects ("if this card would be destroyed, you can ... instead").
//!
//! A replacement is a continuous effect offered the pending action before it
//! commits. Its target callback decides whether it applies; if it does, the
//! affected cards drop out of the action's working group with their pending
//! reason rolled back, and its operation runs in their place.
//!
//! Entry steps: 0 for a single card, 5 for a whole group, 10 and 12 for the
//! battle variants (whose operations are deferred onto `core.desrep_chain`)
//! and 15 to run those deferred operations.

use crate::events::GameEvent;
use crate::game_state::ChainLink;
use crate::group::GroupId;
use crate::handlers::chain::{ExecuteOperation, ExecuteTarget};
use crate::ids::{CardId, EffectId};
use crate::process::{Flow, Process, unknown_step};
use crate::query::Ctx;
use crate::script::ScriptArg;

#[derive(Debug, Clone)]
pub struct OperationReplace {
    pub effect: EffectId,
    pub targets: GroupId,
    /// The card offered to a single-card replacement.
    pub target: Option<CardId>,
    pub is_destroy: bool,
    event: Option<GameEvent>,
}

impl OperationReplace {
    pub fn new(effect: EffectId, targets: GroupId, target: Option<CardId>, is_destroy: bool) -> Self {
        Self {
            effect,
            targets,
            target,
            is_destroy,
            event: None,
        }
    }

    /// Event describing the pending action as seen from `card`.
    fn event_for(&self, ctx: &Ctx<'_>, card: CardId) -> GameEvent {
        let current = ctx.state.card(card).current;
        GameEvent {
            cards: ctx.state.groups.cards(self.targets).into_iter().collect(),
            event_player: ctx.state.effect_handler_player(self.effect),
            reason: current.reason,
            reason_effect: current.reason_effect,
            reason_player: current.reason_player,
            ..GameEvent::new(0)
        }
    }

    /// Open the pseudo-chain link and ask the target callback. Returns false
    /// when the replacement cannot apply at all.
    fn offer(&mut self, ctx: &mut Ctx<'_>, event: GameEvent) -> bool {
        let player = ctx.state.effect_handler_player(self.effect);
        if !ctx.is_activateable(self.effect, player, &event) {
            return false;
        }
        ctx.state
            .core
            .continuous_chain
            .push_back(ChainLink::new(self.effect, player, event.clone()));
        ctx.push(Process::ExecuteTarget(ExecuteTarget::new(self.effect, player, event.clone())));
        self.event = Some(event);
        true
    }

    /// Pull `card` out of the action and undo its pending reason, unless the
    /// action is the card removing itself.
    fn cancel_card(&self, ctx: &mut Ctx<'_>, card: CardId, honour_self_destroy: bool) -> bool {
        if honour_self_destroy
            && let Some(reason_effect) = ctx.state.card(card).current.reason_effect
            && ctx.state.effect(reason_effect).is_self_destroy_related()
        {
            return false;
        }
        ctx.state.groups.remove(self.targets, card);
        ctx.state.card_mut(card).restore_reason();
        if self.is_destroy {
            ctx.state.core.destroy_canceled.insert(card);
        }
        true
    }

    /// Cards of the group the replacement's value accepts.
    fn accepted_cards(&self, ctx: &mut Ctx<'_>) -> Vec<CardId> {
        let cards = ctx.state.groups.cards(self.targets);
        let mut accepted = Vec::new();
        for card in cards {
            if ctx.effect_value(self.effect, &[ScriptArg::Card(card)]) != 0 {
                accepted.push(card);
            }
        }
        accepted
    }

    fn run_operation(&self, ctx: &mut Ctx<'_>) {
        if ctx.state.effect(self.effect).operation.is_none() {
            return;
        }
        let player = ctx.state.effect_handler_player(self.effect);
        let event = self.event.clone().unwrap_or_else(|| GameEvent::new(0));
        ctx.push(Process::ExecuteOperation(ExecuteOperation::new(self.effect, player, event)));
    }

    fn group_event(&self, ctx: &Ctx<'_>) -> Option<GameEvent> {
        let first = ctx.state.groups.cards(self.targets).into_iter().next()?;
        if !ctx.state.effect(self.effect).value.is_set() {
            return None;
        }
        Some(self.event_for(ctx, first))
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            // Single card.
            0 | 10 => {
                if ctx.state.returns.get_bool(0) {
                    return Flow::Done;
                }
                let Some(target) = self.target else {
                    return Flow::Done;
                };
                if ctx.state.effect(self.effect).target.is_none() {
                    return Flow::Done;
                }
                let event = self.event_for(ctx, target);
                if !self.offer(ctx, event) {
                    return Flow::Done;
                }
                Flow::Continue(step + 1)
            }
            1 => {
                if !ctx.state.returns.get_bool(0) {
                    return Flow::Continue(3);
                }
                if let Some(target) = self.target {
                    self.cancel_card(ctx, target, true);
                }
                ctx.state.effect_mut(self.effect).dec_count();
                Flow::Continue(2)
            }
            2 | 7 => {
                self.run_operation(ctx);
                Flow::Continue(step + 1)
            }
            3 | 8 => {
                ctx.state.core.continuous_chain.pop_back();
                Flow::Done
            }
            // Whole group.
            5 | 12 => {
                let Some(event) = self.group_event(ctx) else {
                    return Flow::Done;
                };
                if !self.offer(ctx, event) {
                    return Flow::Done;
                }
                Flow::Continue(step + 1)
            }
            6 => {
                if !ctx.state.returns.get_bool(0) {
                    return Flow::Continue(8);
                }
                for card in self.accepted_cards(ctx) {
                    self.cancel_card(ctx, card, true);
                }
                ctx.state.effect_mut(self.effect).dec_count();
                Flow::Continue(7)
            }
            // Battle variants park the link for later instead of operating.
            11 | 13 => {
                let link = ctx.state.core.continuous_chain.pop_back();
                if ctx.state.returns.get_bool(0) {
                    let cards = match (step, self.target) {
                        (11, Some(target)) => vec![target],
                        (11, None) => Vec::new(),
                        _ => self.accepted_cards(ctx),
                    };
                    for card in cards {
                        self.cancel_card(ctx, card, false);
                    }
                    ctx.state.effect_mut(self.effect).dec_count();
                    if let Some(link) = link {
                        ctx.state.core.desrep_chain.push_back(link);
                    }
                }
                Flow::Done
            }
            // Deferred battle replacement operations, one per pass.
            15 => {
                let Some(link) = ctx.state.core.desrep_chain.pop_front() else {
                    return Flow::Done;
                };
                let (effect, player, event) = (link.triggering_effect, link.triggering_player, link.event.clone());
                ctx.state.core.continuous_chain.push_back(link);
                if ctx.state.effect(effect).operation.is_some() {
                    ctx.push(Process::ExecuteOperation(ExecuteOperation::new(effect, player, event)));
                }
                Flow::Continue(16)
            }
            16 => {
                ctx.state.core.continuous_chain.pop_back();
                Flow::Continue(15)
            }
            _ => unknown_step("OperationReplace", step),
        }
    }
}
