//! Life point changes: damage, recovery and life point costs.
//!
//! Damage and recovery run the same three-stage evaluation at step 0:
//! reversal effects first (the whole action turns into its opposite),
//! then reflection (the other player takes it), then magnitude changes.
//! The actual life point change happens at step 1, either immediately or,
//! for `is_step` actions, once the enclosing operation finishes.

use crate::codes::{LP_SENTINEL, LP_THRESHOLD, effect as code, event, prompt};
use crate::events::GameEvent;
use crate::flags::{Reason, Timing};
use crate::ids::{CardId, EffectId, PlayerId};
use crate::message::Message;
use crate::process::{Flow, Frame, Process, unknown_step};
use crate::query::Ctx;
use crate::script::ScriptArg;

/// Subtract `amount` from `lp`, returning the amount to report.
///
/// Life at or above the sentinel is pinned there; amounts above the
/// threshold wipe the player out and are reported as the sentinel.
pub fn lose_lp(lp: &mut i32, amount: u32) -> u32 {
    if *lp >= LP_SENTINEL {
        *lp = LP_SENTINEL;
        amount
    } else if amount > LP_THRESHOLD {
        *lp = 0;
        LP_SENTINEL as u32
    } else {
        *lp -= amount as i32;
        amount
    }
}

/// Add `amount` to `lp`, returning the amount to report.
pub fn gain_lp(lp: &mut i32, amount: u32) -> u32 {
    if *lp >= LP_SENTINEL {
        *lp = LP_SENTINEL;
        amount
    } else if amount > LP_THRESHOLD {
        *lp = LP_SENTINEL;
        LP_SENTINEL as u32
    } else {
        *lp += amount as i32;
        amount
    }
}

// ============================================================================
// Damage
// ============================================================================

#[derive(Debug, Clone)]
pub struct Damage {
    pub reason_effect: Option<EffectId>,
    pub reason: Reason,
    pub reason_player: PlayerId,
    /// Battling card for battle damage.
    pub reason_card: Option<CardId>,
    pub player: PlayerId,
    pub amount: u32,
    /// Defer the life point change until the running operation completes.
    pub is_step: bool,
    pub reflected: bool,
}

impl Damage {
    pub fn new(
        reason_effect: Option<EffectId>,
        reason: Reason,
        reason_player: PlayerId,
        reason_card: Option<CardId>,
        player: PlayerId,
        amount: u32,
        is_step: bool,
    ) -> Self {
        Self {
            reason_effect,
            reason,
            reason_player,
            reason_card,
            player,
            amount,
            is_step,
            reflected: false,
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                ctx.state.returns.set(0, i64::from(self.amount));
                if self.amount == 0 {
                    return Flow::Done;
                }
                if !self.reason.contains(Reason::RDAMAGE) {
                    let args = [
                        ScriptArg::from(self.reason_effect),
                        ScriptArg::Int(i64::from(self.reason.bits())),
                        ScriptArg::Player(self.reason_player),
                        ScriptArg::from(self.reason_card),
                    ];
                    for e in ctx.filter_player_effect(self.player, code::REVERSE_DAMAGE) {
                        if ctx.check_value_condition(e, &args) {
                            ctx.push(Process::Recover(Recover::new(
                                self.reason_effect,
                                (self.reason & Reason::RRECOVER) | Reason::RDAMAGE | Reason::EFFECT,
                                self.reason_player,
                                self.player,
                                self.amount,
                                self.is_step,
                            )));
                            return Flow::Continue(3);
                        }
                    }
                }
                for e in ctx.filter_player_effect(self.player, code::REFLECT_DAMAGE) {
                    let args = self.value_args(self.amount);
                    if ctx.check_value_condition(e, &args) {
                        self.player = self.player.opponent();
                        self.reflected = true;
                        break;
                    }
                }
                let mut val = self.amount;
                for e in ctx.filter_player_effect(self.player, code::CHANGE_DAMAGE) {
                    let args = self.value_args(val);
                    val = ctx.effect_value(e, &args).max(0) as u32;
                    ctx.state.returns.set(0, i64::from(val));
                    if val == 0 {
                        return Flow::Done;
                    }
                }
                self.amount = val;
                if self.is_step {
                    let frame = Frame::at(1, Process::Damage(self.clone()));
                    ctx.state.core.recover_damage_reserve.push(frame);
                    return Flow::Done;
                }
                Flow::Continue(1)
            }
            1 => {
                let next = if self.reflected || self.reason.contains(Reason::RRECOVER) {
                    3
                } else {
                    2
                };
                let p = self.player;
                ctx.state.core.hint_timing[p.index() & 1] |= Timing::DAMAGE;
                let reported = lose_lp(&mut ctx.state.player_mut(p).lp, self.amount);
                ctx.state.messages.push(Message::Damage {
                    player: p,
                    amount: reported,
                    reason: self.reason,
                });
                ctx.state.raise_event(
                    self.reason_card,
                    event::DAMAGE,
                    self.reason_effect,
                    self.reason,
                    self.reason_player,
                    p,
                    i64::from(reported),
                );
                if ctx.state.player(p).lp < 0 {
                    ctx.state.raise_event(
                        self.reason_card,
                        event::ZERO_LP,
                        self.reason_effect,
                        self.reason,
                        self.reason_player,
                        p,
                        i64::from(reported),
                    );
                    ctx.process_instant_event();
                }
                if self.reason == Reason::BATTLE
                    && let Some(card) = self.reason_card
                {
                    ctx.state.raise_single_event(
                        card,
                        event::BATTLE_DAMAGE,
                        None,
                        Reason::empty(),
                        self.reason_player,
                        p,
                        i64::from(reported),
                    );
                    ctx.state.raise_event(
                        Some(card),
                        event::BATTLE_DAMAGE,
                        None,
                        Reason::empty(),
                        self.reason_player,
                        p,
                        i64::from(reported),
                    );
                    ctx.process_single_event();
                }
                if ctx.state.player(p).lp < 0 && ctx.is_player_affected_by_effect(p, code::CANNOT_LOSE_LP) {
                    ctx.state.player_mut(p).lp = 0;
                }
                ctx.process_instant_event();
                Flow::Continue(next)
            }
            2 => {
                ctx.state.returns.set(0, i64::from(self.amount));
                Flow::Done
            }
            3 => {
                ctx.state.returns.set(0, 0);
                Flow::Done
            }
            _ => unknown_step("Damage", step),
        }
    }

    fn value_args(&self, amount: u32) -> [ScriptArg; 5] {
        [
            ScriptArg::from(self.reason_effect),
            ScriptArg::Int(i64::from(amount)),
            ScriptArg::Int(i64::from(self.reason.bits())),
            ScriptArg::Player(self.reason_player),
            ScriptArg::from(self.reason_card),
        ]
    }
}

// ============================================================================
// Recover
// ============================================================================

#[derive(Debug, Clone)]
pub struct Recover {
    pub reason_effect: Option<EffectId>,
    pub reason: Reason,
    pub reason_player: PlayerId,
    pub player: PlayerId,
    pub amount: u32,
    pub is_step: bool,
}

impl Recover {
    pub fn new(
        reason_effect: Option<EffectId>,
        reason: Reason,
        reason_player: PlayerId,
        player: PlayerId,
        amount: u32,
        is_step: bool,
    ) -> Self {
        Self {
            reason_effect,
            reason,
            reason_player,
            player,
            amount,
            is_step,
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                ctx.state.returns.set(0, i64::from(self.amount));
                if self.amount == 0 {
                    return Flow::Done;
                }
                if !self.reason.contains(Reason::RRECOVER) {
                    let args = [
                        ScriptArg::from(self.reason_effect),
                        ScriptArg::Int(i64::from(self.reason.bits())),
                        ScriptArg::Player(self.reason_player),
                    ];
                    for e in ctx.filter_player_effect(self.player, code::REVERSE_RECOVER) {
                        if ctx.check_value_condition(e, &args) {
                            ctx.push(Process::Damage(Damage::new(
                                self.reason_effect,
                                (self.reason & Reason::RDAMAGE) | Reason::RRECOVER | Reason::EFFECT,
                                self.reason_player,
                                None,
                                self.player,
                                self.amount,
                                self.is_step,
                            )));
                            return Flow::Continue(3);
                        }
                    }
                }
                let mut val = self.amount;
                for e in ctx.filter_player_effect(self.player, code::CHANGE_RECOVER) {
                    let args = [
                        ScriptArg::from(self.reason_effect),
                        ScriptArg::Int(i64::from(val)),
                        ScriptArg::Int(i64::from(self.reason.bits())),
                        ScriptArg::Player(self.reason_player),
                    ];
                    val = ctx.effect_value(e, &args).max(0) as u32;
                    ctx.state.returns.set(0, i64::from(val));
                    if val == 0 {
                        return Flow::Done;
                    }
                }
                self.amount = val;
                if self.is_step {
                    let frame = Frame::at(1, Process::Recover(self.clone()));
                    ctx.state.core.recover_damage_reserve.push(frame);
                    return Flow::Done;
                }
                Flow::Continue(1)
            }
            1 => {
                let next = if self.reason.contains(Reason::RDAMAGE) { 3 } else { 2 };
                let p = self.player;
                ctx.state.core.hint_timing[p.index() & 1] |= Timing::RECOVER;
                let reported = gain_lp(&mut ctx.state.player_mut(p).lp, self.amount);
                ctx.state.messages.push(Message::Recover {
                    player: p,
                    amount: reported,
                });
                ctx.state.raise_event(
                    None,
                    event::RECOVER,
                    self.reason_effect,
                    self.reason,
                    self.reason_player,
                    p,
                    i64::from(reported),
                );
                ctx.process_instant_event();
                Flow::Continue(next)
            }
            2 => {
                ctx.state.returns.set(0, i64::from(self.amount));
                Flow::Done
            }
            3 => {
                ctx.state.returns.set(0, 0);
                Flow::Done
            }
            _ => unknown_step("Recover", step),
        }
    }
}

// ============================================================================
// PayLpCost
// ============================================================================

/// Pay life points as a cost, or let a replacement effect pay instead.
#[derive(Debug, Clone)]
pub struct PayLpCost {
    pub player: PlayerId,
    pub cost: u32,
    /// Offered choices in option order; `None` is the plain payment.
    choices: Vec<Option<EffectId>>,
}

impl PayLpCost {
    pub fn new(player: PlayerId, cost: u32) -> Self {
        Self {
            player,
            cost,
            choices: Vec::new(),
        }
    }

    fn cost_event(&self, ctx: &Ctx<'_>) -> GameEvent {
        GameEvent {
            event_player: self.player,
            value: i64::from(self.cost),
            reason_effect: ctx.state.core.reason_effect,
            reason_player: self.player,
            ..GameEvent::new(0)
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let p = self.player;
        match step {
            0 => {
                let mut val = i64::from(self.cost);
                for e in ctx.filter_player_effect(p, code::LPCOST_CHANGE) {
                    let args = [
                        ScriptArg::from(ctx.state.core.reason_effect),
                        ScriptArg::Player(p),
                        ScriptArg::Int(val),
                    ];
                    val = ctx.effect_value(e, &args);
                }
                if val <= 0 {
                    return Flow::Done;
                }
                self.cost = val as u32;
                let ev = self.cost_event(ctx);
                let mut options = Vec::new();
                self.choices.clear();
                if val <= i64::from(ctx.state.player(p).lp) {
                    options.push(prompt::PAY_LP);
                    self.choices.push(None);
                }
                let replacements = ctx
                    .state
                    .continuous_effects
                    .get(&code::LPCOST_REPLACE)
                    .cloned()
                    .unwrap_or_default();
                for e in replacements {
                    let handler_player = ctx.state.effect_handler_player(e);
                    if ctx.is_activateable(e, handler_player, &ev) {
                        options.push(ctx.state.effect(e).description);
                        self.choices.push(Some(e));
                    }
                }
                match self.choices.as_slice() {
                    [] => return Flow::Done,
                    [_] => ctx.state.returns.set(0, 0),
                    [None, Some(e)] => match ctx.state.effect(*e).handler {
                        Some(card) => ctx.select_effect_yes_no(p, card, prompt::LPCOST_REPLACE),
                        None => ctx.select_option(p, options),
                    },
                    _ => ctx.select_option(p, options),
                }
                Flow::Continue(1)
            }
            1 => {
                let index = ctx.state.returns.get(0).max(0) as usize;
                match self.choices.get(index).copied().flatten() {
                    None => {
                        let reported = lose_lp(&mut ctx.state.player_mut(p).lp, self.cost);
                        ctx.state.messages.push(Message::PayLpCost {
                            player: p,
                            amount: reported,
                        });
                        let reason_effect = ctx.state.core.reason_effect;
                        ctx.state.raise_event(
                            None,
                            event::PAY_LPCOST,
                            reason_effect,
                            Reason::empty(),
                            p,
                            p,
                            i64::from(reported),
                        );
                        ctx.process_instant_event();
                    }
                    Some(e) => {
                        let ev = self.cost_event(ctx);
                        ctx.solve_continuous(p, e, ev);
                    }
                }
                Flow::Done
            }
            _ => unknown_step("PayLpCost", step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lose_lp_clamps() {
        let mut lp = 8000;
        assert_eq!(lose_lp(&mut lp, 3_000_000), LP_SENTINEL as u32);
        assert_eq!(lp, 0);

        let mut lp = 8000;
        assert_eq!(lose_lp(&mut lp, 9000), 9000);
        assert_eq!(lp, -1000);

        let mut lp = 9_999_999;
        assert_eq!(lose_lp(&mut lp, 100), 100);
        assert_eq!(lp, LP_SENTINEL);
    }

    #[test]
    fn test_gain_lp_clamps() {
        let mut lp = 100;
        assert_eq!(gain_lp(&mut lp, 2_000_001), LP_SENTINEL as u32);
        assert_eq!(lp, LP_SENTINEL);

        let mut lp = 100;
        assert_eq!(gain_lp(&mut lp, 500), 500);
        assert_eq!(lp, 600);
    }
}
