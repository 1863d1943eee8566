//! Coin tosses and dice rolls.
//!
//! Results come from the duel's seeded generator unless a continuous
//! `*_REPLACE` effect takes the toss over entirely, or a `*_CHOOSE` effect
//! picks the results itself. Either way the results end up in
//! `core.coin_results` / `core.dice_results` for scripts to read.

use crate::codes::{COIN_HEADS, COIN_TAILS, effect as code, event};
use crate::events::GameEvent;
use crate::flags::Reason;
use crate::ids::{EffectId, PlayerId};
use crate::message::Message;
use crate::process::{Flow, unknown_step};
use crate::query::Ctx;
use rand::Rng;
use tracing::debug;

/// Outcome of looking for an effect that takes over a toss.
enum Takeover {
    Replaced,
    Chosen,
    None,
}

impl Ctx<'_> {
    /// Offer the toss to `REPLACE` then `CHOOSE` effects, resolving the first
    /// that can activate.
    fn toss_takeover(&mut self, replace_code: u32, choose_code: u32, event: GameEvent) -> Takeover {
        for (effect_code, outcome) in [(replace_code, Takeover::Replaced), (choose_code, Takeover::Chosen)] {
            let candidates = self.state.continuous_effects.get(&effect_code).cloned().unwrap_or_default();
            for e in candidates {
                let handler_player = self.state.effect_handler_player(e);
                if self.is_activateable(e, handler_player, &event) {
                    debug!(effect = e.0, player = handler_player.0, "toss taken over");
                    self.solve_continuous(handler_player, e, event);
                    return outcome;
                }
            }
        }
        Takeover::None
    }
}

/// Value of the `TOSS_COIN` event: tails count, heads count and toss count
/// packed a byte apart.
fn coin_event_value(results: &[u8], count: u8) -> i64 {
    let heads = results.iter().filter(|&&r| r == COIN_HEADS).count() as i64;
    let tails = results.iter().filter(|&&r| r == COIN_TAILS).count() as i64;
    (tails << 16) | (heads << 8) | i64::from(count)
}

/// Dice counts of both players packed into one event value.
fn dice_event_value(count1: u8, count2: u8) -> i64 {
    i64::from(count1) | (i64::from(count2) << 16)
}

// ============================================================================
// TossCoin
// ============================================================================

#[derive(Debug, Clone)]
pub struct TossCoin {
    pub reason_effect: Option<EffectId>,
    pub reason_player: PlayerId,
    pub player: PlayerId,
    pub count: u8,
}

impl TossCoin {
    pub fn new(reason_effect: Option<EffectId>, reason_player: PlayerId, player: PlayerId, count: u8) -> Self {
        Self {
            reason_effect,
            reason_player,
            player,
            count,
        }
    }

    fn event(&self, code: u32, value: i64) -> GameEvent {
        let mut ev = GameEvent::new(code);
        ev.event_player = self.player;
        ev.value = value;
        ev.reason_effect = self.reason_effect;
        ev.reason_player = self.reason_player;
        ev
    }

    /// Report the results and open the negation window.
    fn announce(&self, ctx: &mut Ctx<'_>) {
        let results = ctx.state.core.coin_results.clone();
        debug!(player = self.player.0, ?results, "coin toss");
        ctx.state.messages.push(Message::TossCoin {
            player: self.player,
            results,
        });
        ctx.state.raise_event(
            None,
            event::TOSS_COIN_NEGATE,
            self.reason_effect,
            Reason::empty(),
            self.reason_player,
            self.player,
            i64::from(self.count),
        );
        ctx.process_instant_event();
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let count = usize::from(self.count);
        match step {
            0 => {
                ctx.state.core.coin_results = vec![0; count];
                let ev = self.event(0, i64::from(self.count));
                match ctx.toss_takeover(code::TOSS_COIN_REPLACE, code::TOSS_COIN_CHOOSE, ev) {
                    Takeover::Replaced => return Flow::Done,
                    Takeover::Chosen => return Flow::Continue(2),
                    Takeover::None => {}
                }
                let results: Vec<u8> = (0..count).map(|_| ctx.state.rng.random_range(0..=1)).collect();
                ctx.state.core.coin_results = results;
                self.announce(ctx);
                Flow::Continue(1)
            }
            1 => {
                let value = coin_event_value(&ctx.state.core.coin_results, self.count);
                ctx.state.raise_event(None, event::TOSS_COIN, self.reason_effect, Reason::empty(), self.reason_player, self.player, value);
                ctx.process_instant_event();
                Flow::Done
            }
            2 => {
                ctx.state.core.coin_results.resize(count, COIN_TAILS);
                self.announce(ctx);
                Flow::Continue(1)
            }
            _ => unknown_step("TossCoin", step),
        }
    }
}

// ============================================================================
// TossDice
// ============================================================================

/// Roll `count1` dice for `player` and `count2` for the opponent.
#[derive(Debug, Clone)]
pub struct TossDice {
    pub reason_effect: Option<EffectId>,
    pub reason_player: PlayerId,
    pub player: PlayerId,
    pub count1: u8,
    pub count2: u8,
}

impl TossDice {
    pub fn new(reason_effect: Option<EffectId>, reason_player: PlayerId, player: PlayerId, count1: u8, count2: u8) -> Self {
        Self {
            reason_effect,
            reason_player,
            player,
            count1,
            count2,
        }
    }

    fn total(&self) -> usize {
        usize::from(self.count1) + usize::from(self.count2)
    }

    fn announce(&self, ctx: &mut Ctx<'_>) {
        let results = ctx.state.core.dice_results.clone();
        debug!(player = self.player.0, ?results, "dice roll");
        let (own, other) = results.split_at(usize::from(self.count1).min(results.len()));
        ctx.state.messages.push(Message::TossDice {
            player: self.player,
            results: own.to_vec(),
        });
        if self.count2 > 0 {
            ctx.state.messages.push(Message::TossDice {
                player: self.player.opponent(),
                results: other.to_vec(),
            });
        }
        ctx.state.raise_event(
            None,
            event::TOSS_DICE_NEGATE,
            self.reason_effect,
            Reason::empty(),
            self.reason_player,
            self.player,
            dice_event_value(self.count1, self.count2),
        );
        ctx.process_instant_event();
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let value = dice_event_value(self.count1, self.count2);
        match step {
            0 => {
                ctx.state.core.dice_results = vec![0; self.total()];
                let mut ev = GameEvent::new(0);
                ev.event_player = self.player;
                ev.value = value;
                ev.reason_effect = self.reason_effect;
                ev.reason_player = self.reason_player;
                match ctx.toss_takeover(code::TOSS_DICE_REPLACE, code::TOSS_DICE_CHOOSE, ev) {
                    Takeover::Replaced => return Flow::Done,
                    Takeover::Chosen => return Flow::Continue(2),
                    Takeover::None => {}
                }
                let results: Vec<u8> = (0..self.total()).map(|_| ctx.state.rng.random_range(1..=6)).collect();
                ctx.state.core.dice_results = results;
                self.announce(ctx);
                Flow::Continue(1)
            }
            1 => {
                ctx.state.raise_event(None, event::TOSS_DICE, self.reason_effect, Reason::empty(), self.reason_player, self.player, value);
                ctx.process_instant_event();
                Flow::Done
            }
            2 => {
                let total = self.total();
                ctx.state.core.dice_results.resize(total, 1);
                self.announce(ctx);
                Flow::Continue(1)
            }
            _ => unknown_step("TossDice", step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coin_event_value() {
        let results = [COIN_HEADS, COIN_TAILS, COIN_HEADS];
        assert_eq!(coin_event_value(&results, 3), (1 << 16) | (2 << 8) | 3);
        assert_eq!(coin_event_value(&[], 0), 0);
    }

    #[test]
    fn test_dice_event_value() {
        assert_eq!(dice_event_value(2, 0), 2);
        assert_eq!(dice_event_value(1, 3), 1 | (3 << 16));
    }
}
