//! Effect resolution: the minimal chain and continuous effect solving.
//!
//! Activated effects become [`ChainLink`]s on `core.current_chain` and
//! resolve last in, first out. Continuous reactions and replacements skip
//! the chain: they are pushed onto `core.continuous_chain` for the duration
//! of their own cost/target/operation calls and popped afterwards. Trigger
//! effects wait in `core.pending_triggers` until the running action is over,
//! then [`ChainTriggers`] chains them.

use tracing::debug;

use crate::actions::Actions;
use crate::codes::event;
use crate::events::GameEvent;
use crate::flags::{Reason, Status};
use crate::game_state::ChainLink;
use crate::ids::{EffectId, PlayerId};
use crate::message::Message;
use crate::process::{Flow, Process, unknown_step};
use crate::query::Ctx;
use crate::script::{ScriptArg, event_args};

impl Ctx<'_> {
    /// Solve a continuous effect outside the chain.
    pub fn solve_continuous(&mut self, player: PlayerId, effect: EffectId, event: GameEvent) {
        self.push(Process::SolveContinuous(SolveContinuous { effect, player, event }));
    }

    /// Record where the handler of a chain link stood when it was activated.
    fn set_triggering_state(&self, link: &mut ChainLink) {
        let Some(handler) = self.state.effect(link.triggering_effect).handler else {
            return;
        };
        let current = self.state.card(handler).current;
        link.triggering_controller = current.controller;
        link.triggering_location = current.location;
        link.triggering_sequence = current.sequence;
        link.triggering_position = current.position;
    }
}

/// Callback arguments of a resolving effect with the trailing "for real"
/// flag scripts use to tell a check from execution.
fn resolve_args(effect: EffectId, player: PlayerId, event: &GameEvent) -> Vec<ScriptArg> {
    let mut args = event_args(effect, player, event);
    args.push(ScriptArg::Int(1));
    args
}

// ============================================================================
// ExecuteCost / ExecuteTarget / ExecuteOperation
// ============================================================================

/// Pay the cost of an effect.
#[derive(Debug, Clone)]
pub struct ExecuteCost {
    pub effect: EffectId,
    pub player: PlayerId,
    pub event: GameEvent,
}

impl ExecuteCost {
    pub fn new(effect: EffectId, player: PlayerId, event: GameEvent) -> Self {
        Self { effect, player, event }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                ctx.state.returns.set(0, 1);
                let Some(cost) = ctx.state.effect(self.effect).cost else {
                    return Flow::Done;
                };
                let args = resolve_args(self.effect, self.player, &self.event);
                ctx.run_effect_operation(self.effect, self.player, cost, &args);
                Flow::Continue(1)
            }
            1 => Flow::Done,
            _ => unknown_step("ExecuteCost", step),
        }
    }
}

/// Run the target callback of an effect. Whether it applies ends up in
/// returns slot 0; an effect without a target always applies.
#[derive(Debug, Clone)]
pub struct ExecuteTarget {
    pub effect: EffectId,
    pub player: PlayerId,
    pub event: GameEvent,
}

impl ExecuteTarget {
    pub fn new(effect: EffectId, player: PlayerId, event: GameEvent) -> Self {
        Self { effect, player, event }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                let Some(target) = ctx.state.effect(self.effect).target else {
                    ctx.state.returns.set(0, 1);
                    return Flow::Done;
                };
                let args = resolve_args(self.effect, self.player, &self.event);
                let saved = (ctx.state.core.reason_effect, ctx.state.core.reason_player);
                ctx.state.core.reason_effect = Some(self.effect);
                ctx.state.core.reason_player = self.player;
                let applies = ctx.run_target(target, &args);
                (ctx.state.core.reason_effect, ctx.state.core.reason_player) = saved;
                ctx.state.returns.set_bool(0, applies);
                Flow::Done
            }
            _ => unknown_step("ExecuteTarget", step),
        }
    }
}

/// Run the operation of an effect, then apply any damage or recovery it
/// deferred.
#[derive(Debug, Clone)]
pub struct ExecuteOperation {
    pub effect: EffectId,
    pub player: PlayerId,
    pub event: GameEvent,
}

impl ExecuteOperation {
    pub fn new(effect: EffectId, player: PlayerId, event: GameEvent) -> Self {
        Self { effect, player, event }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                let Some(operation) = ctx.state.effect(self.effect).operation else {
                    return Flow::Done;
                };
                let args = event_args(self.effect, self.player, &self.event);
                ctx.run_effect_operation(self.effect, self.player, operation, &args);
                Flow::Continue(1)
            }
            1 => {
                ctx.flush_recover_damage();
                Flow::Continue(2)
            }
            2 => Flow::Done,
            _ => unknown_step("ExecuteOperation", step),
        }
    }
}

// ============================================================================
// SolveContinuous
// ============================================================================

/// Solve a continuous action effect immediately (event reactions and
/// replacement effects picked from an option menu).
#[derive(Debug, Clone)]
pub struct SolveContinuous {
    pub effect: EffectId,
    pub player: PlayerId,
    pub event: GameEvent,
}

impl SolveContinuous {
    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                let mut link = ChainLink::new(self.effect, self.player, self.event.clone());
                ctx.set_triggering_state(&mut link);
                ctx.state.core.continuous_chain.push_back(link);
                ctx.push(Process::ExecuteCost(ExecuteCost::new(self.effect, self.player, self.event.clone())));
                Flow::Continue(1)
            }
            1 => {
                ctx.push(Process::ExecuteTarget(ExecuteTarget::new(self.effect, self.player, self.event.clone())));
                Flow::Continue(2)
            }
            2 => {
                ctx.push(Process::ExecuteOperation(ExecuteOperation::new(
                    self.effect,
                    self.player,
                    self.event.clone(),
                )));
                ctx.state.effect_mut(self.effect).dec_count();
                Flow::Continue(3)
            }
            3 => {
                ctx.state.core.continuous_chain.pop_back();
                Flow::Done
            }
            _ => unknown_step("SolveContinuous", step),
        }
    }
}

/// The chain is built: clear the chaining marks and resolve it.
fn close_chain(ctx: &mut Ctx<'_>) {
    let handlers: Vec<_> = ctx
        .state
        .core
        .current_chain
        .iter()
        .filter_map(|link| ctx.state.effect(link.triggering_effect).handler)
        .collect();
    for card in handlers {
        ctx.state.card_mut(card).set_status(Status::CHAINING, false);
    }
    ctx.push(Process::SolveChain(SolveChain::new()));
}

// ============================================================================
// ActivateEffect
// ============================================================================

/// Activate an effect as a fresh chain and resolve it.
#[derive(Debug, Clone)]
pub struct ActivateEffect {
    pub effect: EffectId,
}

impl ActivateEffect {
    pub fn new(effect: EffectId) -> Self {
        Self { effect }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                let Some(handler) = ctx.state.effect(self.effect).handler else {
                    return Flow::Done;
                };
                let player = ctx.state.card(handler).current.controller;
                if !ctx.is_activateable(self.effect, player, &GameEvent::new(event::FREE_CHAIN)) {
                    return Flow::Done;
                }
                let event = GameEvent::new(ctx.state.effect(self.effect).code);
                let mut link = ChainLink::new(self.effect, player, event);
                link.chain_id = ctx.state.new_fieldid();
                ctx.set_triggering_state(&mut link);
                ctx.state.core.new_chains.push(link);
                ctx.state.card_mut(handler).set_status(Status::CHAINING, true);
                ctx.state.effect_mut(self.effect).dec_count();
                ctx.push(Process::AddChain(AddChain::new()));
                Flow::Continue(1)
            }
            1 => {
                close_chain(ctx);
                Flow::Done
            }
            _ => unknown_step("ActivateEffect", step),
        }
    }
}

// ============================================================================
// ChainTriggers
// ============================================================================

/// Build a chain from the trigger effects parked since the last one and
/// resolve it. The turn player's triggers go on the chain first.
#[derive(Debug, Clone, Default)]
pub struct ChainTriggers;

impl ChainTriggers {
    pub fn new() -> Self {
        Self
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                let mut pending = std::mem::take(&mut ctx.state.core.pending_triggers);
                let turn_player = ctx.state.turn_player;
                pending.sort_by_key(|t| t.player != turn_player);
                for trigger in pending {
                    // The board may have moved on since the event.
                    if !ctx.is_activateable(trigger.effect, trigger.player, &trigger.event) {
                        continue;
                    }
                    let mut link = ChainLink::new(trigger.effect, trigger.player, trigger.event);
                    link.chain_id = ctx.state.new_fieldid();
                    ctx.set_triggering_state(&mut link);
                    if let Some(handler) = ctx.state.effect(trigger.effect).handler {
                        ctx.state.card_mut(handler).set_status(Status::CHAINING, true);
                    }
                    ctx.state.effect_mut(trigger.effect).dec_count();
                    ctx.state.core.new_chains.push(link);
                }
                if ctx.state.core.new_chains.is_empty() {
                    return Flow::Done;
                }
                debug!(links = ctx.state.core.new_chains.len(), "trigger chain");
                ctx.push(Process::AddChain(AddChain::new()));
                Flow::Continue(1)
            }
            1 => {
                close_chain(ctx);
                Flow::Done
            }
            _ => unknown_step("ChainTriggers", step),
        }
    }
}

// ============================================================================
// AddChain
// ============================================================================

/// Move pending links onto the chain, announcing each and paying its cost
/// and target.
#[derive(Debug, Clone, Default)]
pub struct AddChain {
    added: Option<usize>,
}

impl AddChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                if ctx.state.core.new_chains.is_empty() {
                    return Flow::Done;
                }
                let mut link = ctx.state.core.new_chains.remove(0);
                link.chain_count = ctx.state.core.current_chain.len() as u32 + 1;
                let effect = ctx.state.effect(link.triggering_effect);
                let (handler, description) = (effect.handler, effect.description);
                if let Some(card) = handler {
                    let c = ctx.state.card(card);
                    let message = Message::Chaining {
                        code: c.code(),
                        info: c.current.loc_info(),
                        triggering_controller: link.triggering_controller,
                        triggering_location: link.triggering_location,
                        triggering_sequence: link.triggering_sequence,
                        description,
                        chain_count: link.chain_count,
                    };
                    ctx.state.messages.push(message);
                }
                let (effect, player, event) = (link.triggering_effect, link.triggering_player, link.event.clone());
                ctx.state.core.current_chain.push(link);
                self.added = Some(ctx.state.core.current_chain.len() - 1);
                ctx.push(Process::ExecuteCost(ExecuteCost::new(effect, player, event.clone())));
                ctx.push(Process::ExecuteTarget(ExecuteTarget::new(effect, player, event)));
                Flow::Continue(1)
            }
            1 => {
                let Some(link) = self.added.and_then(|i| ctx.state.core.current_chain.get(i)) else {
                    return Flow::Done;
                };
                let effect = link.triggering_effect;
                let player = link.triggering_player;
                let chain_count = i64::from(link.chain_count);
                let handler = ctx.state.effect(effect).handler;
                if let Some(card) = handler {
                    ctx.state
                        .raise_single_event(card, event::CHAINING, Some(effect), Reason::empty(), player, player, chain_count);
                    ctx.process_single_event();
                }
                ctx.state
                    .raise_event(handler, event::CHAINING, Some(effect), Reason::empty(), player, player, chain_count);
                ctx.process_instant_event();
                if ctx.state.core.new_chains.is_empty() {
                    Flow::Continue(2)
                } else {
                    Flow::Continue(0)
                }
            }
            2 => Flow::Done,
            _ => unknown_step("AddChain", step),
        }
    }
}

// ============================================================================
// SolveChain
// ============================================================================

/// Resolve the chain from its last link down.
#[derive(Debug, Clone, Default)]
pub struct SolveChain;

impl SolveChain {
    pub fn new() -> Self {
        Self
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                let Some(link) = ctx.state.core.current_chain.last() else {
                    return Flow::Done;
                };
                let (effect, player, chain_count) = (link.triggering_effect, link.triggering_player, link.chain_count);
                ctx.state.messages.push(Message::ChainSolving {
                    chain_count: chain_count as u8,
                });
                ctx.state.raise_event(
                    None,
                    event::CHAIN_SOLVING,
                    Some(effect),
                    Reason::empty(),
                    player,
                    player,
                    i64::from(chain_count),
                );
                ctx.process_instant_event();
                Flow::Continue(1)
            }
            1 => {
                if let Some(link) = ctx.state.core.current_chain.last()
                    && !link.disabled
                {
                    let (effect, player, event) = (link.triggering_effect, link.triggering_player, link.event.clone());
                    ctx.push(Process::ExecuteOperation(ExecuteOperation::new(effect, player, event)));
                }
                Flow::Continue(2)
            }
            2 => {
                let Some(link) = ctx.state.core.current_chain.pop() else {
                    return Flow::Done;
                };
                ctx.state.messages.push(Message::ChainSolved {
                    chain_count: link.chain_count as u8,
                });
                if let Some(card) = ctx.state.effect(link.triggering_effect).handler {
                    ctx.state.card_mut(card).set_status(Status::CHAINING, false);
                }
                ctx.state.raise_event(
                    None,
                    event::CHAIN_SOLVED,
                    Some(link.triggering_effect),
                    Reason::empty(),
                    link.triggering_player,
                    link.triggering_player,
                    i64::from(link.chain_count),
                );
                ctx.process_instant_event();
                if ctx.state.core.current_chain.is_empty() {
                    Flow::Continue(3)
                } else {
                    Flow::Continue(0)
                }
            }
            3 => {
                ctx.state.messages.push(Message::ChainEnd);
                ctx.state.flush_deck_shuffles();
                ctx.state.raise_event(
                    None,
                    event::CHAIN_END,
                    None,
                    Reason::empty(),
                    PlayerId::NONE,
                    PlayerId::NONE,
                    0,
                );
                ctx.process_instant_event();
                Flow::Continue(4)
            }
            4 => Flow::Done,
            _ => unknown_step("SolveChain", step),
        }
    }
}
