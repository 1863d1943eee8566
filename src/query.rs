//! Effect lookup and capability predicates.
//!
//! [`Ctx`] is what a handler step sees: mutable duel state, the script host
//! and the queue of frames the step pushes. Every question whose answer may
//! depend on a card script ("is this card affected", "can it be released",
//! "where does it go instead") lives here rather than on [`DuelState`].

use crate::card::Card;
use crate::codes::{effect as code, redirect};
use crate::effect::{EffectFlags, EffectType, EffectValue};
use crate::events::GameEvent;
use crate::flags::{Position, Reason, Status};
use crate::game_state::{DuelState, SEQ_DECKBOTTOM, SEQ_DECKSHUFFLE, SEQ_DECKTOP};
use crate::ids::{CardId, EffectId, PlayerId};
use crate::process::{Frame, Process};
use crate::script::{ScriptArg, ScriptHost, ScriptRef, event_args};
use crate::actions::Scope;
use crate::types::CardType;
use crate::zone::Location;

/// Handler-facing view of a duel during one step.
pub struct Ctx<'a> {
    pub state: &'a mut DuelState,
    pub script: &'a mut dyn ScriptHost,
    queue: Vec<Frame>,
}

impl<'a> Ctx<'a> {
    pub fn new(state: &'a mut DuelState, script: &'a mut dyn ScriptHost) -> Self {
        Self {
            state,
            script,
            queue: Vec::new(),
        }
    }

    /// Queue a child process; children run in push order after this step.
    pub fn push(&mut self, process: Process) {
        self.queue.push(Frame::new(process));
    }

    pub fn push_at(&mut self, step: u16, process: Process) {
        self.queue.push(Frame::at(step, process));
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.queue.push(frame);
    }

    pub fn into_queue(self) -> Vec<Frame> {
        self.queue
    }

    // ========================================================================
    // Script bridge
    // ========================================================================

    pub fn check_condition(&mut self, callback: ScriptRef, args: &[ScriptArg]) -> bool {
        self.script.check_condition(&*self.state, callback, args)
    }

    pub fn get_value(&mut self, callback: ScriptRef, args: &[ScriptArg]) -> i64 {
        self.script.get_value(&*self.state, callback, args)
    }

    /// Run an operation callback; whatever it queues runs after it returns.
    pub fn run_operation(&mut self, callback: ScriptRef, args: &[ScriptArg]) {
        let mut scope = Scope {
            state: &mut *self.state,
            queue: &mut self.queue,
        };
        self.script.run_operation(&mut scope, callback, args);
    }

    pub fn run_target(&mut self, callback: ScriptRef, args: &[ScriptArg]) -> bool {
        let mut scope = Scope {
            state: &mut *self.state,
            queue: &mut self.queue,
        };
        self.script.run_target(&mut scope, callback, args)
    }

    /// Run `callback` as the operation of `effect`: actions it starts are
    /// credited to the effect and `player`.
    pub fn run_effect_operation(&mut self, effect: EffectId, player: PlayerId, callback: ScriptRef, args: &[ScriptArg]) {
        let saved = (self.state.core.reason_effect, self.state.core.reason_player);
        self.state.core.reason_effect = Some(effect);
        self.state.core.reason_player = player;
        self.run_operation(callback, args);
        (self.state.core.reason_effect, self.state.core.reason_player) = saved;
    }

    // ========================================================================
    // Effect evaluation
    // ========================================================================

    /// Value of an effect; script values receive the effect first.
    pub fn effect_value(&mut self, effect: EffectId, args: &[ScriptArg]) -> i64 {
        let value = self.state.effect(effect).value;
        match value {
            EffectValue::None => 0,
            EffectValue::Int(v) => v,
            EffectValue::Script(callback) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(ScriptArg::Effect(effect));
                full.extend_from_slice(args);
                self.get_value(callback, &full)
            }
        }
    }

    pub fn effect_values(&mut self, effect: EffectId, args: &[ScriptArg]) -> Vec<i64> {
        let value = self.state.effect(effect).value;
        match value {
            EffectValue::None => Vec::new(),
            EffectValue::Int(v) => vec![v],
            EffectValue::Script(callback) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(ScriptArg::Effect(effect));
                full.extend_from_slice(args);
                self.script.get_values(&*self.state, callback, &full)
            }
        }
    }

    pub fn check_value_condition(&mut self, effect: EffectId, args: &[ScriptArg]) -> bool {
        self.effect_value(effect, args) != 0
    }

    /// Range and condition check of a non-activated effect.
    pub fn is_effect_available(&mut self, effect: EffectId) -> bool {
        if !self.state.is_effect_in_range(effect) {
            return false;
        }
        let e = self.state.effect(effect);
        if e.effect_type.is_action() {
            return true;
        }
        let condition = e.condition;
        match condition {
            Some(condition) => self.check_condition(condition, &[ScriptArg::Effect(effect)]),
            None => true,
        }
    }

    /// Whether `effect` could be activated by `player` in response to `event`.
    /// Cost and target callbacks are checked with a trailing flag of 0.
    pub fn is_activateable(&mut self, effect: EffectId, player: PlayerId, event: &GameEvent) -> bool {
        let e = self.state.effect(effect);
        if e.removed || !e.has_count_left() {
            return false;
        }
        let (condition, cost, target) = (e.condition, e.cost, e.target);
        if !self.state.is_effect_in_range(effect) {
            return false;
        }
        let args = event_args(effect, player, event);
        if let Some(condition) = condition
            && !self.check_condition(condition, &args)
        {
            return false;
        }
        let mut check_args = args;
        check_args.push(ScriptArg::Int(0));
        if let Some(cost) = cost
            && !self.check_condition(cost, &check_args)
        {
            return false;
        }
        if let Some(target) = target
            && !self.check_condition(target, &check_args)
        {
            return false;
        }
        true
    }

    // ========================================================================
    // Effect filters
    // ========================================================================

    /// Whether a field effect reaches `card`.
    fn is_target(&mut self, effect: EffectId, card: CardId) -> bool {
        let e = self.state.effect(effect);
        let c = self.state.card(card);
        if !e.is_flag(EffectFlags::IGNORE_RANGE) {
            let owner_side = self.state.effect_handler_player(effect) == c.current.controller;
            let range = if owner_side { e.s_range } else { e.o_range };
            if !range.intersects(c.current.location) {
                return false;
            }
            if c.current.location.is_onfield()
                && c.current.position.is_facedown()
                && !e.is_flag(EffectFlags::SET_AVAILABLE)
            {
                return false;
            }
        }
        let target = e.target;
        match target {
            Some(target) => self.check_condition(target, &[ScriptArg::Effect(effect), ScriptArg::Card(card)]),
            None => true,
        }
    }

    /// Effects with `code` currently applying to `card`: its own single
    /// effects, equip effects of cards equipped to it, and field effects
    /// whose target range includes it.
    pub fn filter_effect(&mut self, card: CardId, effect_code: u32) -> Vec<EffectId> {
        let mut out = Vec::new();
        let c = self.state.card(card);
        let singles: Vec<EffectId> = c
            .single_effects
            .iter()
            .copied()
            .filter(|e| self.state.effect(*e).code == effect_code)
            .collect();
        let equips: Vec<EffectId> = c
            .equiping_cards
            .iter()
            .flat_map(|eq| self.state.card(*eq).owned_effects.iter().copied())
            .filter(|e| {
                let effect = self.state.effect(*e);
                effect.code == effect_code && effect.effect_type.contains(EffectType::EQUIP)
            })
            .collect();
        for e in singles.into_iter().chain(equips) {
            if self.is_effect_available(e) {
                out.push(e);
            }
        }
        let fields = self.state.field_effects.get(&effect_code).cloned().unwrap_or_default();
        for e in fields {
            if self.state.effect(e).is_flag(EffectFlags::PLAYER_TARGET) {
                continue;
            }
            if self.is_effect_available(e) && self.is_target(e, card) {
                out.push(e);
            }
        }
        out
    }

    pub fn is_card_affected_by(&mut self, card: CardId, effect_code: u32) -> bool {
        !self.filter_effect(card, effect_code).is_empty()
    }

    /// Single continuous action effects with `code` on the card itself
    /// (replacement effects such as `DESTROY_REPLACE`).
    pub fn filter_single_continuous_effect(&mut self, card: CardId, effect_code: u32) -> Vec<EffectId> {
        let candidates: Vec<EffectId> = self
            .state
            .card(card)
            .single_effects
            .iter()
            .copied()
            .filter(|e| {
                let effect = self.state.effect(*e);
                effect.code == effect_code && effect.effect_type.contains(EffectType::CONTINUOUS)
            })
            .collect();
        candidates
            .into_iter()
            .filter(|e| self.state.is_effect_in_range(*e))
            .collect()
    }

    /// Player effects with `code` reaching `player`.
    pub fn filter_player_effect(&mut self, player: PlayerId, effect_code: u32) -> Vec<EffectId> {
        let fields = self.state.field_effects.get(&effect_code).cloned().unwrap_or_default();
        let mut out = Vec::new();
        for e in fields {
            let effect = self.state.effect(e);
            if !effect.is_flag(EffectFlags::PLAYER_TARGET) {
                continue;
            }
            let reaches = if self.state.effect_handler_player(e) == player {
                !effect.s_range.is_empty()
            } else {
                !effect.o_range.is_empty()
            };
            if reaches && self.is_effect_available(e) {
                out.push(e);
            }
        }
        out
    }

    pub fn is_player_affected_by_effect(&mut self, player: PlayerId, effect_code: u32) -> bool {
        !self.filter_player_effect(player, effect_code).is_empty()
    }

    /// Whether `effect` can touch `card` (immunity check).
    pub fn is_affected_by_effect(&mut self, card: CardId, effect: Option<EffectId>) -> bool {
        let Some(effect) = effect else {
            return true;
        };
        if self.state.effect(effect).is_flag(EffectFlags::IGNORE_IMMUNE) {
            return true;
        }
        for immune in self.filter_effect(card, code::IMMUNE_EFFECT) {
            if self.check_value_condition(immune, &[ScriptArg::Effect(effect)]) {
                return false;
            }
        }
        true
    }

    /// Player effects with `code` whose target callback accepts `card`.
    pub(crate) fn player_effect_blocks(&mut self, player: PlayerId, effect_code: u32, card: CardId, reason: Reason) -> bool {
        for e in self.filter_player_effect(player, effect_code) {
            let target = self.state.effect(e).target;
            let applies = match target {
                Some(target) => self.check_condition(
                    target,
                    &[
                        ScriptArg::Effect(e),
                        ScriptArg::Card(card),
                        ScriptArg::Player(player),
                        ScriptArg::Int(i64::from(reason.bits())),
                    ],
                ),
                None => true,
            };
            if applies {
                return true;
            }
        }
        false
    }

    // ========================================================================
    // Capability predicates
    // ========================================================================

    /// Is the card acting as a monster on the field? The base zone test and
    /// the zone-override effects are both consulted: a monster-zone card
    /// stops counting under `SANCT_MZONE`, a spell/trap-zone card starts
    /// counting under `ORICA_SZONE`.
    pub fn is_monster_on_field(&mut self, card: CardId) -> bool {
        let location = self.state.card(card).current.location;
        if location == Location::MZONE {
            !self.is_card_affected_by(card, code::SANCT_MZONE)
        } else if location == Location::SZONE {
            self.is_card_affected_by(card, code::ORICA_SZONE)
        } else {
            false
        }
    }

    pub fn is_releasable_by_summon(&mut self, player: PlayerId, card: CardId, summoned: CardId) -> bool {
        let c = self.state.card(card);
        if c.get_status(Status::SUMMONING) || c.overlay_target.is_some() {
            return false;
        }
        if c.current.location.intersects(Location::GRAVE | Location::REMOVED) {
            return false;
        }
        if self.player_effect_blocks(player, code::CANNOT_RELEASE, card, Reason::SUMMON) {
            return false;
        }
        for e in self.filter_effect(card, code::UNRELEASABLE_SUM) {
            if self.check_value_condition(e, &[ScriptArg::Card(summoned)]) {
                return false;
            }
        }
        true
    }

    pub fn is_releasable_by_nonsummon(&mut self, player: PlayerId, card: CardId, reason: Reason) -> bool {
        let c = self.state.card(card);
        if c.get_status(Status::SUMMONING) || c.overlay_target.is_some() {
            return false;
        }
        if c.current.location.intersects(Location::GRAVE | Location::REMOVED) {
            return false;
        }
        if c.current.location == Location::HAND && !c.data.card_type.contains(CardType::MONSTER) && reason.contains(Reason::COST) {
            return false;
        }
        if self.player_effect_blocks(player, code::CANNOT_RELEASE, card, reason) {
            return false;
        }
        if self.is_card_affected_by(card, code::UNRELEASABLE_NONSUM) {
            return false;
        }
        !(reason.contains(Reason::EFFECT) && self.is_card_affected_by(card, code::UNRELEASABLE_EFFECT))
    }

    pub fn is_capable_send_to_hand(&mut self, player: PlayerId, card: CardId) -> bool {
        let c = self.state.card(card);
        if c.current.location == Location::HAND || c.is_token {
            return false;
        }
        if self.is_card_affected_by(card, code::CANNOT_TO_HAND) {
            return false;
        }
        !self.player_effect_blocks(player, code::CANNOT_TO_HAND, card, Reason::empty())
    }

    pub fn is_capable_send_to_deck(&mut self, player: PlayerId, card: CardId) -> bool {
        let c = self.state.card(card);
        if c.current.location == Location::DECK || c.is_token {
            return false;
        }
        if self.is_card_affected_by(card, code::CANNOT_TO_DECK) {
            return false;
        }
        !self.player_effect_blocks(player, code::CANNOT_TO_DECK, card, Reason::empty())
    }

    pub fn is_capable_send_to_grave(&mut self, player: PlayerId, card: CardId) -> bool {
        let c = self.state.card(card);
        if c.current.location == Location::GRAVE || c.is_token {
            return false;
        }
        if self.is_card_affected_by(card, code::CANNOT_TO_GRAVE) {
            return false;
        }
        !self.player_effect_blocks(player, code::CANNOT_TO_GRAVE, card, Reason::empty())
    }

    pub fn is_removeable(&mut self, player: PlayerId, card: CardId, position: Position, reason: Reason) -> bool {
        let c = self.state.card(card);
        if c.current.location == Location::REMOVED || c.is_token {
            return false;
        }
        if position.is_facedown() && c.data.card_type.contains(CardType::TOKEN) {
            return false;
        }
        if self.is_card_affected_by(card, code::CANNOT_REMOVE) {
            return false;
        }
        !self.player_effect_blocks(player, code::CANNOT_REMOVE, card, reason)
    }

    /// Capability check for a pile destination.
    pub fn is_capable_send_to(&mut self, player: PlayerId, card: CardId, location: Location, position: Position, reason: Reason) -> bool {
        if location == Location::HAND {
            self.is_capable_send_to_hand(player, card)
        } else if location == Location::DECK || location == Location::EXTRA {
            self.is_capable_send_to_deck(player, card)
        } else if location == Location::GRAVE {
            self.is_capable_send_to_grave(player, card)
        } else if location == Location::REMOVED {
            self.is_removeable(player, card, position, reason)
        } else {
            true
        }
    }

    pub fn is_capable_change_control(&mut self, card: CardId) -> bool {
        !self.is_card_affected_by(card, code::CANNOT_CHANGE_CONTROL)
    }

    /// Control can move only between monster zones with room on the other
    /// side (unless the caller already checked room).
    pub fn is_control_can_be_changed(&mut self, card: CardId, ignore_mzone: bool) -> bool {
        let c = self.state.card(card);
        if c.current.location != Location::MZONE || c.overlay_target.is_some() {
            return false;
        }
        let to = c.current.controller.opponent();
        if !ignore_mzone && self.state.get_useable_count(None, to, Location::MZONE, 0x1f) <= 0 {
            return false;
        }
        self.is_capable_change_control(card)
    }

    pub fn is_capable_turn_set(&mut self, card: CardId) -> bool {
        let c = self.state.card(card);
        if c.data.card_type.intersects(CardType::LINK | CardType::TOKEN) {
            return false;
        }
        if c.current.position.is_facedown() {
            return true;
        }
        !self.is_card_affected_by(card, code::CANNOT_TURN_SET)
    }

    pub fn is_player_can_draw(&mut self, player: PlayerId) -> bool {
        !self.is_player_affected_by_effect(player, code::CANNOT_DRAW)
    }

    pub fn is_player_can_discard_deck(&mut self, player: PlayerId, count: usize) -> bool {
        self.state.player(player).list_main.len() >= count
            && !self.is_player_affected_by_effect(player, code::CANNOT_DISCARD_DECK)
    }

    /// Where a card leaving the field goes instead, with its deck sequence.
    pub fn leave_field_redirect(&mut self, card: CardId, reason: Reason) -> Option<(Location, u32)> {
        if self.state.card(card).is_token {
            return None;
        }
        let mut redirects = 0u32;
        for e in self.filter_effect(card, code::LEAVE_FIELD_REDIRECT) {
            let value = self.effect_value(e, &[ScriptArg::Card(card)]) as u32;
            let player = self.state.effect_handler_player(e);
            if value & Location::HAND.bits() != 0 && self.is_capable_send_to_hand(player, card) {
                redirects |= value;
            } else if value & Location::DECK.bits() != 0 && self.is_capable_send_to_deck(player, card) {
                redirects |= value;
            } else if value & Location::REMOVED.bits() != 0
                && self.is_removeable(player, card, Position::FACEUP, reason)
            {
                redirects |= value;
            }
        }
        redirect_target(redirects)
    }

    /// Where a card about to reach `destination` goes instead.
    pub fn destination_redirect(&mut self, card: CardId, destination: Location, reason: Reason) -> Option<(Location, u32)> {
        let effect_code = if destination == Location::HAND {
            code::TO_HAND_REDIRECT
        } else if destination == Location::DECK {
            code::TO_DECK_REDIRECT
        } else if destination == Location::GRAVE {
            code::TO_GRAVE_REDIRECT
        } else if destination == Location::REMOVED {
            code::REMOVE_REDIRECT
        } else {
            return None;
        };
        if self.state.card(card).is_token {
            return None;
        }
        let mut redirects = 0u32;
        for e in self.filter_effect(card, effect_code) {
            let value = self.effect_value(e, &[ScriptArg::Card(card)]) as u32;
            let player = self.state.effect_handler_player(e);
            let target = Location::from_bits_truncate(value & 0xff);
            if self.is_capable_send_to(player, card, target, Position::FACEUP, reason) {
                redirects |= value;
            }
        }
        redirect_target(redirects)
    }
}

/// Collapse a set of redirect values into one destination, banishment first.
fn redirect_target(redirects: u32) -> Option<(Location, u32)> {
    if redirects & Location::REMOVED.bits() != 0 {
        Some((Location::REMOVED, 0))
    } else if redirects & Location::DECK.bits() != 0 {
        let sequence = if redirects & redirect::DECK_BOTTOM == redirect::DECK_BOTTOM {
            SEQ_DECKBOTTOM
        } else if redirects & redirect::DECK_SHUFFLE == redirect::DECK_SHUFFLE {
            SEQ_DECKSHUFFLE
        } else {
            SEQ_DECKTOP
        };
        Some((Location::DECK, sequence))
    } else if redirects & Location::HAND.bits() != 0 {
        Some((Location::HAND, 0))
    } else if redirects & Location::GRAVE.bits() != 0 {
        Some((Location::GRAVE, 0))
    } else {
        None
    }
}

// ============================================================================
// State-only queries
// ============================================================================

impl DuelState {
    /// Range part of effect availability; no script is consulted.
    pub fn is_effect_in_range(&self, effect: EffectId) -> bool {
        let e = self.effect(effect);
        if e.removed {
            return false;
        }
        let Some(handler) = e.handler else {
            return true;
        };
        let card = self.card(handler);
        if card.get_status(Status::DISABLED) && !e.is_flag(EffectFlags::CANNOT_DISABLE) && !e.effect_type.contains(EffectType::SINGLE) {
            return false;
        }
        let location = card.current.location;
        let faceup_ok = !location.is_onfield() || card.current.position.is_faceup() || e.is_flag(EffectFlags::SET_AVAILABLE);
        if e.effect_type.contains(EffectType::SINGLE) {
            if e.is_flag(EffectFlags::SINGLE_RANGE) {
                return e.range.intersects(location) && faceup_ok;
            }
            return true;
        }
        if e.effect_type.contains(EffectType::EQUIP) {
            return location == Location::SZONE && card.current.position.is_faceup() && card.equiping_target.is_some();
        }
        if e.effect_type.contains(EffectType::FIELD) {
            if !e.range.intersects(location) || !faceup_ok {
                return false;
            }
            return !location.is_onfield() || card.field_effects_enabled;
        }
        e.range.is_empty() || e.range.intersects(location)
    }

    /// Cards can be destroyed unless they are materials or already gone.
    pub fn is_destructable(&self, card: CardId) -> bool {
        let c = self.card(card);
        c.overlay_target.is_none() && !c.current.location.intersects(Location::GRAVE | Location::REMOVED)
    }

    /// Whether a face-up card sharing `card`'s unique code is already on
    /// `player`'s field.
    pub fn check_unique_onfield(&self, card: CardId, player: PlayerId, location: Location) -> bool {
        let unique = self.card(card).unique_code;
        if unique == 0 || !location.is_onfield() || player.is_none() {
            return false;
        }
        let p = self.player(player);
        [Location::MZONE, Location::SZONE]
            .into_iter()
            .flat_map(|loc| p.occupied(loc))
            .any(|other| {
                let c = self.card(other);
                other != card && c.current.position.is_faceup() && (c.code() == unique || c.unique_code == unique)
            })
    }

    /// Hint timing bucket of a card: its controller, or its Xyz owner's.
    pub fn timing_player(&self, card: &Card) -> PlayerId {
        match card.overlay_target {
            Some(target) => self.card(target).current.controller,
            None => card.current.controller,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardData;
    use crate::effect::Effect;
    use crate::options::DuelOptions;
    use crate::script::NullScript;

    fn setup() -> (DuelState, CardId) {
        let mut state = DuelState::new(DuelOptions::default());
        let card = state.create_field_card(
            PlayerId::ZERO,
            CardData::new(100, CardType::MONSTER | CardType::EFFECT).with_level(4),
            Location::MZONE,
            2,
            Position::FACEUP_ATTACK,
        );
        (state, card)
    }

    #[test]
    fn test_field_effect_reaches_only_its_range() {
        let (mut state, card) = setup();
        let source = state.create_field_card(
            PlayerId::ONE,
            CardData::new(200, CardType::SPELL | CardType::CONTINUOUS),
            Location::SZONE,
            0,
            Position::FACEUP_ATTACK,
        );
        state.add_effect(
            Effect::builder(code::CANNOT_TO_HAND, EffectType::FIELD)
                .handler(source)
                .range(Location::SZONE)
                .target_range(Location::empty(), Location::MZONE)
                .build(),
        );
        let mut script = NullScript;
        let mut ctx = Ctx::new(&mut state, &mut script);
        assert!(!ctx.is_capable_send_to_hand(PlayerId::ZERO, card));
        assert!(ctx.is_capable_send_to_grave(PlayerId::ZERO, card));
    }

    #[test]
    fn test_facedown_source_is_inactive() {
        let (mut state, card) = setup();
        let source = state.create_field_card(
            PlayerId::ONE,
            CardData::new(200, CardType::SPELL | CardType::CONTINUOUS),
            Location::SZONE,
            0,
            Position::FACEDOWN_DEFENSE,
        );
        state.add_effect(
            Effect::builder(code::CANNOT_TO_HAND, EffectType::FIELD)
                .handler(source)
                .range(Location::SZONE)
                .target_range(Location::empty(), Location::MZONE)
                .build(),
        );
        let mut script = NullScript;
        let mut ctx = Ctx::new(&mut state, &mut script);
        assert!(ctx.is_capable_send_to_hand(PlayerId::ZERO, card));
    }

    #[test]
    fn test_immunity_blocks_effects() {
        let (mut state, card) = setup();
        state.add_effect(
            Effect::builder(code::IMMUNE_EFFECT, EffectType::SINGLE)
                .handler(card)
                .value(1)
                .build(),
        );
        let other = state.add_effect(Effect::builder(code::DISABLE, EffectType::FIELD).build());
        let mut script = NullScript;
        let mut ctx = Ctx::new(&mut state, &mut script);
        assert!(!ctx.is_affected_by_effect(card, Some(other)));
        assert!(ctx.is_affected_by_effect(card, None));
    }

    #[test]
    fn test_zone_override_monster_check() {
        let (mut state, card) = setup();
        let trap = state.create_field_card(
            PlayerId::ZERO,
            CardData::new(300, CardType::TRAP),
            Location::SZONE,
            1,
            Position::FACEUP_ATTACK,
        );
        state.add_effect(
            Effect::builder(code::ORICA_SZONE, EffectType::SINGLE)
                .handler(trap)
                .build(),
        );
        state.add_effect(
            Effect::builder(code::SANCT_MZONE, EffectType::SINGLE)
                .handler(card)
                .build(),
        );
        let mut script = NullScript;
        let mut ctx = Ctx::new(&mut state, &mut script);
        assert!(ctx.is_monster_on_field(trap));
        assert!(!ctx.is_monster_on_field(card));
    }

    #[test]
    fn test_leave_field_redirect_prefers_banish() {
        let (mut state, card) = setup();
        state.add_effect(
            Effect::builder(code::LEAVE_FIELD_REDIRECT, EffectType::SINGLE)
                .handler(card)
                .value(i64::from(Location::REMOVED.bits()))
                .build(),
        );
        state.add_effect(
            Effect::builder(code::LEAVE_FIELD_REDIRECT, EffectType::SINGLE)
                .handler(card)
                .value(i64::from(redirect::DECK_BOTTOM))
                .build(),
        );
        let mut script = NullScript;
        let mut ctx = Ctx::new(&mut state, &mut script);
        assert_eq!(
            ctx.leave_field_redirect(card, Reason::DESTROY),
            Some((Location::REMOVED, 0))
        );
    }

    #[test]
    fn test_redirect_deck_sequences() {
        assert_eq!(redirect_target(redirect::DECK_BOTTOM), Some((Location::DECK, SEQ_DECKBOTTOM)));
        assert_eq!(redirect_target(redirect::DECK_SHUFFLE), Some((Location::DECK, SEQ_DECKSHUFFLE)));
        assert_eq!(redirect_target(0), None);
    }
}
