//! Game events and their two-phase dispatch.
//!
//! Handlers raise events while committing a step: a *single* event per
//! affected card, then one *batch* event for the whole set. Raising only
//! queues; [`Ctx::process_single_event`] and [`Ctx::process_instant_event`]
//! drain the queues, solve continuous reactions immediately (as pushed
//! frames) and park trigger effects in `Core::pending_triggers`.

use tracing::trace;

use crate::effect::EffectType;
use crate::flags::Reason;
use crate::game_state::{DuelState, PendingTrigger};
use crate::handlers::chain::SolveContinuous;
use crate::ids::{CardId, EffectId, PlayerId};
use crate::process::Process;
use crate::query::Ctx;

/// Payload of one raised event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct GameEvent {
    pub code: u32,
    pub cards: Vec<CardId>,
    /// The card a single event was raised on.
    pub trigger_card: Option<CardId>,
    pub event_player: PlayerId,
    pub value: i64,
    pub reason: Reason,
    pub reason_effect: Option<EffectId>,
    pub reason_player: PlayerId,
}

impl GameEvent {
    pub fn new(code: u32) -> Self {
        Self {
            code,
            cards: Vec::new(),
            trigger_card: None,
            event_player: PlayerId::NONE,
            value: 0,
            reason: Reason::empty(),
            reason_effect: None,
            reason_player: PlayerId::NONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum EventScope {
    Single,
    Batch,
}

/// An event as it was dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct EventRecord {
    pub scope: EventScope,
    pub event: GameEvent,
}

/// Raised but not yet dispatched events.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    pub single: Vec<GameEvent>,
    pub batch: Vec<GameEvent>,
}

impl DuelState {
    /// Queue a per-card event.
    #[allow(clippy::too_many_arguments)]
    pub fn raise_single_event(
        &mut self,
        card: CardId,
        code: u32,
        reason_effect: Option<EffectId>,
        reason: Reason,
        reason_player: PlayerId,
        event_player: PlayerId,
        value: i64,
    ) {
        self.events.single.push(GameEvent {
            code,
            cards: vec![card],
            trigger_card: Some(card),
            event_player,
            value,
            reason,
            reason_effect,
            reason_player,
        });
    }

    /// Queue an aggregate event over `cards` (possibly none, e.g. damage).
    #[allow(clippy::too_many_arguments)]
    pub fn raise_event(
        &mut self,
        cards: impl IntoIterator<Item = CardId>,
        code: u32,
        reason_effect: Option<EffectId>,
        reason: Reason,
        reason_player: PlayerId,
        event_player: PlayerId,
        value: i64,
    ) {
        self.events.batch.push(GameEvent {
            code,
            cards: cards.into_iter().collect(),
            trigger_card: None,
            event_player,
            value,
            reason,
            reason_effect,
            reason_player,
        });
    }

    /// Dispatched events with `code`, in dispatch order.
    pub fn logged_events(&self, code: u32) -> impl Iterator<Item = &EventRecord> {
        self.event_log.iter().filter(move |r| r.event.code == code)
    }
}

impl Ctx<'_> {
    /// Dispatch queued single events to the single effects of their card.
    pub fn process_single_event(&mut self) {
        let events = std::mem::take(&mut self.state.events.single);
        for event in events {
            trace!(code = event.code, card = ?event.trigger_card, "single event");
            self.state.event_log.push(EventRecord {
                scope: EventScope::Single,
                event: event.clone(),
            });
            let Some(card) = event.trigger_card else {
                continue;
            };
            let candidates: Vec<EffectId> = self
                .state
                .card(card)
                .single_effects
                .iter()
                .copied()
                .filter(|e| {
                    let effect = self.state.effect(*e);
                    effect.code == event.code
                        && (effect.effect_type.is_trigger() || effect.effect_type.contains(EffectType::CONTINUOUS))
                })
                .collect();
            for effect in candidates {
                self.dispatch(effect, &event);
            }
        }
    }

    /// Dispatch queued batch events to field continuous and trigger effects.
    pub fn process_instant_event(&mut self) {
        let events = std::mem::take(&mut self.state.events.batch);
        for event in events {
            trace!(code = event.code, cards = event.cards.len(), "batch event");
            self.state.event_log.push(EventRecord {
                scope: EventScope::Batch,
                event: event.clone(),
            });
            let mut candidates: Vec<EffectId> = self
                .state
                .continuous_effects
                .get(&event.code)
                .cloned()
                .unwrap_or_default();
            if let Some(triggers) = self.state.trigger_effects.get(&event.code) {
                candidates.extend(triggers.iter().copied());
            }
            for effect in candidates {
                self.dispatch(effect, &event);
            }
        }
    }

    fn dispatch(&mut self, effect: EffectId, event: &GameEvent) {
        let player = self.state.effect_handler_player(effect);
        if !self.is_activateable(effect, player, event) {
            return;
        }
        if self.state.effect(effect).effect_type.is_trigger() {
            trace!(effect = effect.0, code = event.code, "trigger pending");
            self.state.core.pending_triggers.push(PendingTrigger {
                effect,
                player,
                event: event.clone(),
            });
        } else {
            self.push(Process::SolveContinuous(SolveContinuous {
                effect,
                player,
                event: event.clone(),
            }));
        }
    }
}
