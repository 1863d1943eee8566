//! The duel aggregate: card and effect arenas, both players' boards, the
//! shared scratch area handlers coordinate through, and the primitive board
//! operations (add, remove, move, swap, attach) every handler builds on.

use std::collections::{BTreeMap, VecDeque};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::card::{Card, CardData, OperationKey, card_operation_cmp};
use crate::codes::effect as code;
use crate::effect::{Effect, EffectFlags, EffectType, EffectValue};
use crate::events::{EventQueue, EventRecord, GameEvent};
use crate::flags::{DuelFlags, GlobalFlags, Position, Reason, Reset, Timing};
use crate::group::{CardSet, GroupArena};
use crate::ids::{CardId, EffectId, PlayerId};
use crate::message::{Message, MessageLog, card_hint};
use crate::options::DuelOptions;
use crate::player::{FIELD_ZONE_SEQ, Player};
use crate::process::Frame;
use crate::returns::{ReturnCards, Returns};
use crate::types::CardType;
use crate::zone::{LocInfo, Location};

/// Deck insertion sequences.
pub const SEQ_DECKTOP: u32 = 0;
pub const SEQ_DECKBOTTOM: u32 = 1;
pub const SEQ_DECKSHUFFLE: u32 = 2;

// ============================================================================
// Chain scratch
// ============================================================================

/// One link of a chain (or of the continuous pseudo-chain replacement
/// effects resolve through).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    pub chain_id: u32,
    pub chain_count: u32,
    pub triggering_effect: EffectId,
    pub triggering_player: PlayerId,
    pub triggering_controller: PlayerId,
    pub triggering_location: Location,
    pub triggering_sequence: u32,
    pub triggering_position: Position,
    pub event: GameEvent,
    pub target_cards: Vec<CardId>,
    pub target_player: PlayerId,
    pub target_param: i64,
    pub disabled: bool,
}

impl ChainLink {
    pub fn new(effect: EffectId, player: PlayerId, event: GameEvent) -> Self {
        Self {
            chain_id: 0,
            chain_count: 0,
            triggering_effect: effect,
            triggering_player: player,
            triggering_controller: PlayerId::NONE,
            triggering_location: Location::empty(),
            triggering_sequence: 0,
            triggering_position: Position::empty(),
            event,
            target_cards: Vec::new(),
            target_player: PlayerId::NONE,
            target_param: 0,
            disabled: false,
        }
    }
}

/// A trigger effect whose event happened and that waits for the chain
/// builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTrigger {
    pub effect: EffectId,
    pub player: PlayerId,
    pub event: GameEvent,
}

/// Cross-cutting scratch state. Everything here lives for the whole duel;
/// per-action intermediates belong in the process frames.
#[derive(Debug, Default)]
pub struct Core {
    /// Cards affected by the last completed action.
    pub operated_set: CardSet,
    pub overdraw: [bool; 2],
    pub hint_timing: [Timing; 2],
    pub deck_reversed: bool,
    pub shuffle_deck_check: [bool; 2],
    pub shuffle_hand_check: [bool; 2],
    pub global_flag: GlobalFlags,
    /// Effect and player credited with actions queued by the running operation.
    pub reason_effect: Option<EffectId>,
    pub reason_player: PlayerId,
    /// Damage/recover frames deferred until the enclosing step completes.
    pub recover_damage_reserve: Vec<Frame>,
    pub destroy_canceled: CardSet,
    pub battle_destroy_rep: CardSet,
    pub dec_count_reserve: Vec<EffectId>,
    pub current_chain: Vec<ChainLink>,
    pub new_chains: Vec<ChainLink>,
    pub continuous_chain: VecDeque<ChainLink>,
    pub desrep_chain: VecDeque<ChainLink>,
    pub pending_triggers: Vec<PendingTrigger>,
    pub coin_results: Vec<u8>,
    pub dice_results: Vec<u8>,
    pub special_summoning: CardSet,
    /// Special summon targets with no zone left, sent to the grave.
    pub spsummon_tograve: CardSet,
    pub equiping_cards: CardSet,
    pub control_adjust_set: [CardSet; 2],
    pub unique_destroy_set: CardSet,
    pub self_destroy_set: CardSet,
    pub self_tograve_set: CardSet,
    pub trap_monster_adjust_set: [CardSet; 2],
    pub release_cards: CardSet,
    pub release_cards_ex: CardSet,
    pub release_cards_ex_oneof: CardSet,
    pub summon_cancelable: bool,
    pub summon_depth: u32,
    /// An extra normal summon was used this turn.
    pub extra_summon: [bool; 2],
}

// ============================================================================
// DuelState
// ============================================================================

/// Complete state of one duel.
#[derive(Debug)]
pub struct DuelState {
    pub options: DuelOptions,
    pub players: [Player; 2],
    pub cards: Vec<Card>,
    pub effects: Vec<Effect>,
    /// Non-action field and player effects by code.
    pub field_effects: BTreeMap<u32, Vec<EffectId>>,
    /// Field continuous action effects (replacements, event reactions) by code.
    pub continuous_effects: BTreeMap<u32, Vec<EffectId>>,
    /// Field trigger effects by event code.
    pub trigger_effects: BTreeMap<u32, Vec<EffectId>>,
    pub groups: GroupArena,
    pub core: Core,
    pub turn_player: PlayerId,
    pub turn_id: u32,
    pub field_id: u32,
    pub messages: MessageLog,
    pub returns: Returns,
    pub return_cards: ReturnCards,
    pub events: EventQueue,
    pub event_log: Vec<EventRecord>,
    pub rng: StdRng,
}

impl DuelState {
    pub fn new(options: DuelOptions) -> Self {
        let lp = options.starting_lp;
        let seed = options.seed;
        Self {
            options,
            players: [Player::new(lp), Player::new(lp)],
            cards: Vec::new(),
            effects: Vec::new(),
            field_effects: BTreeMap::new(),
            continuous_effects: BTreeMap::new(),
            trigger_effects: BTreeMap::new(),
            groups: GroupArena::default(),
            core: Core {
                reason_player: PlayerId::NONE,
                ..Core::default()
            },
            turn_player: PlayerId::ZERO,
            turn_id: 1,
            field_id: 1,
            messages: MessageLog::default(),
            returns: Returns::default(),
            return_cards: ReturnCards::default(),
            events: EventQueue::default(),
            event_log: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn is_flag(&self, flag: DuelFlags) -> bool {
        self.options.flags.contains(flag)
    }

    /// Board of a seated player. [`PlayerId::NONE`] has none; callers check
    /// for it before reaching here.
    pub fn player(&self, player: PlayerId) -> &Player {
        debug_assert!(!player.is_none(), "{player:?} has no seat");
        &self.players[player.index() & 1]
    }

    pub fn player_mut(&mut self, player: PlayerId) -> &mut Player {
        debug_assert!(!player.is_none(), "{player:?} has no seat");
        &mut self.players[player.index() & 1]
    }

    pub fn card(&self, id: CardId) -> &Card {
        &self.cards[id.index()]
    }

    pub fn card_mut(&mut self, id: CardId) -> &mut Card {
        &mut self.cards[id.index()]
    }

    pub fn effect(&self, id: EffectId) -> &Effect {
        &self.effects[id.index()]
    }

    pub fn effect_mut(&mut self, id: EffectId) -> &mut Effect {
        &mut self.effects[id.index()]
    }

    pub fn new_fieldid(&mut self) -> u32 {
        let id = self.field_id;
        self.field_id += 1;
        id
    }

    // ------------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------------

    /// Create a card owned by `owner` and put it into `location`.
    pub fn create_card(&mut self, owner: PlayerId, data: CardData, location: Location) -> CardId {
        let id = CardId(self.cards.len() as u32);
        self.cards.push(Card::new(id, owner, data));
        let position = if location == Location::DECK || location == Location::EXTRA {
            Position::FACEDOWN_DEFENSE
        } else {
            Position::FACEUP_ATTACK
        };
        self.card_mut(id).current.position = position;
        self.add_card(owner, id, location, 0, false);
        id
    }

    /// Put a fresh card straight onto the field with its effects running.
    pub fn create_field_card(
        &mut self,
        owner: PlayerId,
        data: CardData,
        location: Location,
        sequence: u32,
        position: Position,
    ) -> CardId {
        let id = CardId(self.cards.len() as u32);
        self.cards.push(Card::new(id, owner, data));
        let fieldid = self.new_fieldid();
        let card = self.card_mut(id);
        card.current.position = position;
        card.fieldid = fieldid;
        card.field_effects_enabled = true;
        self.add_card(owner, id, location, sequence, false);
        id
    }

    // ------------------------------------------------------------------------
    // Effect registry
    // ------------------------------------------------------------------------

    pub fn add_effect(&mut self, mut effect: Effect) -> EffectId {
        let id = EffectId(self.effects.len() as u32);
        effect.id = id;
        let code = effect.code;
        let kind = effect.effect_type;
        let handler = effect.handler;
        let client_hint = effect.is_flag(EffectFlags::CLIENT_HINT);
        let description = effect.description;
        self.effects.push(effect);
        if let Some(card) = handler {
            self.card_mut(card).owned_effects.push(id);
            if kind.contains(EffectType::SINGLE) {
                self.card_mut(card).single_effects.push(id);
            }
        }
        if kind.contains(EffectType::FIELD) || (handler.is_none() && !kind.contains(EffectType::SINGLE)) {
            let index = if kind.is_trigger() {
                &mut self.trigger_effects
            } else if kind.contains(EffectType::CONTINUOUS) {
                &mut self.continuous_effects
            } else {
                &mut self.field_effects
            };
            index.entry(code).or_default().push(id);
        }
        if client_hint && let Some(card) = handler {
            let info = self.card(card).current.loc_info();
            self.messages.push(Message::CardHint {
                info,
                hint_type: card_hint::DESC_ADD,
                value: description,
            });
        }
        id
    }

    pub fn remove_effect(&mut self, id: EffectId) {
        let Some(effect) = self.effects.get_mut(id.index()) else {
            return;
        };
        if effect.removed {
            return;
        }
        effect.removed = true;
        let code = effect.code;
        let handler = effect.handler;
        let client_hint = effect.is_flag(EffectFlags::CLIENT_HINT);
        let description = effect.description;
        for index in [
            &mut self.field_effects,
            &mut self.continuous_effects,
            &mut self.trigger_effects,
        ] {
            if let Some(list) = index.get_mut(&code) {
                list.retain(|e| *e != id);
            }
        }
        if let Some(card) = handler {
            let card = self.card_mut(card);
            card.owned_effects.retain(|e| *e != id);
            card.single_effects.retain(|e| *e != id);
            if client_hint {
                let info = card.current.loc_info();
                self.messages.push(Message::CardHint {
                    info,
                    hint_type: card_hint::DESC_REMOVE,
                    value: description,
                });
            }
        }
    }

    /// Expire the effects a card carries that reset on `reset`.
    pub fn reset_card(&mut self, card: CardId, reset: Reset) {
        let expired: Vec<EffectId> = self
            .card(card)
            .owned_effects
            .iter()
            .copied()
            .filter(|e| self.effect(*e).resets_on(reset))
            .collect();
        for id in expired {
            self.remove_effect(id);
        }
        if reset.intersects(Reset::TOGRAVE | Reset::REMOVE | Reset::TOHAND | Reset::TODECK | Reset::LEAVE) {
            let c = self.card_mut(card);
            c.counters.clear();
            c.indestructable_effects.clear();
        }
        self.refresh_card_type(card);
    }

    /// Recompute a card's current type from its printed type and the live
    /// constant type-changing single effects it carries.
    pub fn refresh_card_type(&mut self, card: CardId) {
        let c = self.card(card);
        let mut card_type = c.data.card_type;
        let mut added = CardType::empty();
        let mut removed = CardType::empty();
        for e in c.single_effects.iter().map(|e| self.effect(*e)) {
            let EffectValue::Int(value) = e.value else {
                continue;
            };
            let bits = CardType::from_bits_truncate(value as u32);
            match e.code {
                code::CHANGE_TYPE => card_type = bits,
                code::ADD_TYPE => added |= bits,
                code::REMOVE_TYPE => removed |= bits,
                _ => {}
            }
        }
        self.card_mut(card).current.card_type = (card_type | added) - removed;
    }

    /// Remove single effects with `code` from a card.
    pub fn reset_card_code(&mut self, card: CardId, code: u32) {
        let matching: Vec<EffectId> = self
            .card(card)
            .single_effects
            .iter()
            .copied()
            .filter(|e| self.effect(*e).code == code)
            .collect();
        for id in matching {
            self.remove_effect(id);
        }
    }

    /// Attach a client-visible marker effect (e.g. "controlled by the
    /// opponent") that expires on `reset`.
    pub fn add_client_hint(&mut self, card: CardId, description: u64, reset: Reset) -> EffectId {
        self.add_effect(
            Effect::builder(0, EffectType::SINGLE)
                .handler(card)
                .flags(EffectFlags::CANNOT_DISABLE | EffectFlags::CLIENT_HINT)
                .description(description)
                .reset(reset, 1)
                .build(),
        )
    }

    /// The player an effect acts for: its handler's controller, or the owner
    /// player for duel-level effects.
    pub fn effect_handler_player(&self, id: EffectId) -> PlayerId {
        let effect = self.effect(id);
        match effect.handler {
            Some(card) => {
                let c = self.card(card);
                if c.current.controller.is_none() {
                    c.owner
                } else {
                    c.current.controller
                }
            }
            None => effect.owner_player,
        }
    }

    pub fn effect_owner_code(&self, id: EffectId) -> u32 {
        self.effect(id)
            .owner
            .map_or(0, |card| self.card(card).data.code)
    }

    // ------------------------------------------------------------------------
    // Board primitives
    // ------------------------------------------------------------------------

    /// Pendulum slot index in the spell/trap row.
    pub fn pzone_sequence(&self, sequence: u32) -> u32 {
        if self.is_flag(DuelFlags::SEPARATE_PZONE) {
            6 + sequence.min(1)
        } else if sequence == 0 {
            0
        } else {
            4
        }
    }

    /// Place a card that currently has no location.
    pub fn add_card(&mut self, player: PlayerId, card: CardId, location: Location, sequence: u32, pzone: bool) {
        let position = self.card(card).current.position;
        let slot = if location.is_onfield() {
            Some(sequence)
        } else {
            None
        };
        let p = self.player_mut(player);
        let mut seq = sequence;
        if let Some(slot) = slot {
            if let Some(row) = p.slots_mut(location)
                && let Some(cell) = row.get_mut(slot as usize)
            {
                *cell = Some(card);
            }
        } else if location == Location::DECK {
            if sequence == SEQ_DECKBOTTOM {
                p.list_main.insert(0, card);
            } else {
                p.list_main.push(card);
            }
            seq = 0;
        } else if location == Location::EXTRA {
            if position.is_facedown() {
                let at = p.list_extra.len() - p.extra_p_count as usize;
                p.list_extra.insert(at, card);
            } else {
                p.list_extra.push(card);
                p.extra_p_count += 1;
            }
        } else if let Some(pile) = p.pile_mut(location) {
            pile.push(card);
            seq = pile.len() as u32 - 1;
        }
        let c = self.card_mut(card);
        c.current.controller = player;
        c.current.location = location;
        c.current.sequence = seq;
        c.current.pzone = pzone;
        if !location.is_onfield() {
            self.reset_sequence(player, location);
        }
        if location == Location::DECK && sequence == SEQ_DECKSHUFFLE {
            self.core.shuffle_deck_check[player.index() & 1] = true;
        }
    }

    /// Take a card off the board (or out of its overlay stack).
    pub fn remove_card(&mut self, card: CardId) {
        let c = self.card(card);
        let player = c.current.controller;
        let location = c.current.location;
        let sequence = c.current.sequence;
        let faceup = c.current.position.is_faceup();
        if location == Location::OVERLAY {
            self.xyz_remove(card);
            return;
        }
        if !player.is_none() {
            let p = self.player_mut(player);
            if location.is_onfield() {
                if let Some(row) = p.slots_mut(location)
                    && let Some(cell) = row.get_mut(sequence as usize)
                    && *cell == Some(card)
                {
                    *cell = None;
                }
            } else if let Some(pile) = p.pile_mut(location) {
                pile.retain(|c| *c != card);
                if location == Location::EXTRA && faceup && p.extra_p_count > 0 {
                    p.extra_p_count -= 1;
                }
            }
            if !location.is_onfield() {
                self.reset_sequence(player, location);
            }
        }
        let c = self.card_mut(card);
        c.current.controller = PlayerId::NONE;
        c.current.location = Location::empty();
        c.current.sequence = 0;
        c.current.pzone = false;
    }

    /// Relocate a card; moving within the same row just changes its slot.
    pub fn move_card(&mut self, player: PlayerId, card: CardId, location: Location, sequence: u32, pzone: bool) {
        let c = self.card(card);
        if c.current.location == location && c.current.controller == player && location.is_onfield() {
            let old = c.current.sequence;
            if old == sequence {
                self.card_mut(card).current.pzone = pzone;
                return;
            }
            if let Some(row) = self.player_mut(player).slots_mut(location) {
                if let Some(cell) = row.get_mut(old as usize) {
                    *cell = None;
                }
                if let Some(cell) = row.get_mut(sequence as usize) {
                    *cell = Some(card);
                }
            }
            let c = self.card_mut(card);
            c.current.sequence = sequence;
            c.current.pzone = pzone;
            return;
        }
        self.remove_card(card);
        self.add_card(player, card, location, sequence, pzone);
    }

    /// Exchange the board places of two field cards.
    pub fn swap_card(&mut self, c1: CardId, c2: CardId) {
        let s1 = self.card(c1).current;
        let s2 = self.card(c2).current;
        if s1.location.is_onfield() && s2.location.is_onfield() {
            if let Some(row) = self.player_mut(s1.controller).slots_mut(s1.location)
                && let Some(cell) = row.get_mut(s1.sequence as usize)
            {
                *cell = Some(c2);
            }
            if let Some(row) = self.player_mut(s2.controller).slots_mut(s2.location)
                && let Some(cell) = row.get_mut(s2.sequence as usize)
            {
                *cell = Some(c1);
            }
        }
        for (card, to) in [(c1, s2), (c2, s1)] {
            let c = self.card_mut(card);
            c.current.controller = to.controller;
            c.current.location = to.location;
            c.current.sequence = to.sequence;
            c.current.pzone = to.pzone;
        }
        let m1 = self.card(c1).xyz_materials.clone();
        let m2 = self.card(c2).xyz_materials.clone();
        for m in m1 {
            self.card_mut(m).current.controller = s2.controller;
        }
        for m in m2 {
            self.card_mut(m).current.controller = s1.controller;
        }
    }

    /// Renumber pile sequences after an insertion or removal.
    pub fn reset_sequence(&mut self, player: PlayerId, location: Location) {
        let Some(list) = self.player(player).pile(location).cloned() else {
            return;
        };
        for (i, card) in list.into_iter().enumerate() {
            self.card_mut(card).current.sequence = i as u32;
        }
    }

    pub fn set_position(&mut self, card: CardId, position: Position) {
        self.card_mut(card).current.position = position;
    }

    /// Attach `material` under `target`.
    pub fn xyz_add(&mut self, target: CardId, material: CardId) {
        if self.card(material).current.location != Location::empty() {
            self.remove_card(material);
        }
        let controller = self.card(target).current.controller;
        let seq = self.card(target).xyz_materials.len() as u32;
        self.card_mut(target).xyz_materials.push(material);
        let m = self.card_mut(material);
        m.overlay_target = Some(target);
        m.current.controller = controller;
        m.current.location = Location::OVERLAY;
        m.current.sequence = seq;
        m.current.position = Position::FACEUP_ATTACK;
    }

    /// Detach an overlay material; its location becomes empty.
    pub fn xyz_remove(&mut self, material: CardId) {
        let Some(target) = self.card(material).overlay_target else {
            return;
        };
        self.card_mut(target).xyz_materials.retain(|m| *m != material);
        let rest = self.card(target).xyz_materials.clone();
        for (i, m) in rest.into_iter().enumerate() {
            self.card_mut(m).current.sequence = i as u32;
        }
        let m = self.card_mut(material);
        m.overlay_target = None;
        m.current.controller = PlayerId::NONE;
        m.current.location = Location::empty();
        m.current.sequence = 0;
    }

    pub fn equip_to(&mut self, equip_card: CardId, target: CardId) {
        self.unequip(equip_card);
        self.card_mut(equip_card).equiping_target = Some(target);
        self.card_mut(target).equiping_cards.insert(equip_card);
    }

    pub fn unequip(&mut self, equip_card: CardId) {
        if let Some(target) = self.card_mut(equip_card).equiping_target.take() {
            self.card_mut(target).equiping_cards.remove(&equip_card);
        }
    }

    /// Turn the field presence of a card's effects on or off.
    pub fn enable_field_effect(&mut self, card: CardId, enabled: bool) {
        self.card_mut(card).field_effects_enabled = enabled;
    }

    pub fn shuffle_hand(&mut self, player: PlayerId) {
        let mut hand = std::mem::take(&mut self.player_mut(player).list_hand);
        if hand.len() > 1 {
            hand.shuffle(&mut self.rng);
        }
        self.player_mut(player).list_hand = hand;
        self.reset_sequence(player, Location::HAND);
        let codes = self
            .player(player)
            .list_hand
            .iter()
            .map(|c| {
                let card = self.card(*c);
                if card.current.position.is_faceup() { card.code() } else { 0 }
            })
            .collect();
        self.messages.push(Message::ShuffleHand { player, codes });
        self.core.shuffle_hand_check[player.index() & 1] = false;
    }

    pub fn shuffle_deck(&mut self, player: PlayerId) {
        let mut deck = std::mem::take(&mut self.player_mut(player).list_main);
        deck.shuffle(&mut self.rng);
        self.player_mut(player).list_main = deck;
        self.reset_sequence(player, Location::DECK);
        self.core.shuffle_deck_check[player.index() & 1] = false;
    }

    /// Shuffle decks that received cards with [`SEQ_DECKSHUFFLE`].
    pub fn flush_deck_shuffles(&mut self) {
        for p in PlayerId::both() {
            if self.core.shuffle_deck_check[p.index()] {
                self.shuffle_deck(p);
            }
        }
    }

    /// Reveal the new top card of a reversed deck.
    pub fn check_deck_top(&mut self, player: PlayerId) {
        if !self.core.global_flag.contains(GlobalFlags::DECK_REVERSE_CHECK) {
            return;
        }
        let Some(top) = self.player(player).deck_top() else {
            return;
        };
        let card = self.card(top);
        if self.core.deck_reversed || card.current.position == Position::FACEUP_DEFENSE {
            let code = card.code();
            let position = card.current.position;
            self.messages.push(Message::DeckTop {
                player,
                offset: 0,
                code,
                position,
            });
        }
    }

    pub fn hint(&mut self, hint_type: u8, player: PlayerId, data: u64) {
        self.messages.push(Message::Hint {
            hint_type,
            player,
            data,
        });
    }

    pub fn move_message(&mut self, card: CardId, reason: Reason) {
        let c = self.card(card);
        let from = c.previous.loc_info();
        let to = c.current.loc_info();
        let code = c.code();
        self.messages.push(Message::Move {
            code,
            from,
            to,
            reason,
        });
    }

    pub fn loc_info(&self, card: CardId) -> LocInfo {
        self.card(card).current.loc_info()
    }

    // ------------------------------------------------------------------------
    // Zone capacity
    // ------------------------------------------------------------------------

    /// Whether a specific slot can take a card.
    pub fn is_location_useable(&self, player: PlayerId, location: Location, sequence: u32) -> bool {
        let p = self.player(player);
        if location == Location::MZONE {
            if sequence >= 7 {
                return false;
            }
            if sequence >= 5 {
                let mirror = 11 - sequence;
                if self.player(player.opponent()).field_card(Location::MZONE, mirror).is_some() {
                    return false;
                }
            }
        } else if location == Location::SZONE {
            if sequence >= 8 {
                return false;
            }
        } else {
            return true;
        }
        p.field_card(location, sequence).is_none() && !p.is_zone_disabled(location, sequence)
    }

    /// Sequence bits of slots in `zone` a card could enter for `player`.
    ///
    /// Main monster zones are 0..5. The extra monster zones (5, 6) open to
    /// cards coming out of the extra deck under the extra-zone rule, and only
    /// while the player holds neither of them.
    pub fn free_zones(&self, card: Option<CardId>, player: PlayerId, location: Location, zone: u32) -> u32 {
        let mut free = 0u32;
        if location == Location::MZONE {
            for seq in 0..5 {
                if zone & (1 << seq) != 0 && self.is_location_useable(player, location, seq) {
                    free |= 1 << seq;
                }
            }
            if self.is_flag(DuelFlags::EMZONE)
                && let Some(card) = card
                && self.card(card).current.location == Location::EXTRA
            {
                let p = self.player(player);
                let holds_extra = [5, 6].iter().any(|s| p.field_card(Location::MZONE, *s).is_some());
                let c = self.card(card);
                let needs_extra = c.current.card_type.is_link_monster()
                    || (c.current.card_type.contains(CardType::PENDULUM) && c.current.position.is_faceup());
                if needs_extra {
                    free = 0;
                }
                if !holds_extra {
                    for seq in 5..7 {
                        if zone & (1 << seq) != 0 && self.is_location_useable(player, location, seq) {
                            free |= 1 << seq;
                        }
                    }
                }
            }
        } else if location == Location::SZONE {
            for seq in 0..5 {
                if zone & (1 << seq) != 0 && self.is_location_useable(player, location, seq) {
                    free |= 1 << seq;
                }
            }
        }
        free
    }

    /// Number of slots a card could enter.
    pub fn get_useable_count(&self, card: Option<CardId>, player: PlayerId, location: Location, zone: u32) -> i32 {
        self.free_zones(card, player, location, zone).count_ones() as i32
    }

    pub fn field_zone_free(&self, player: PlayerId) -> bool {
        self.player(player).field_card(Location::SZONE, FIELD_ZONE_SEQ).is_none()
    }

    // ------------------------------------------------------------------------
    // Ordering
    // ------------------------------------------------------------------------

    pub fn operation_key(&self, card: CardId) -> OperationKey {
        let c = self.card(card);
        let (controller, overlay_sequence) = match c.overlay_target {
            Some(target) => {
                let t = self.card(target);
                (t.current.controller, Some(t.current.sequence))
            }
            None => (c.current.controller, None),
        };
        OperationKey {
            id: card,
            controller,
            location: c.current.location,
            sequence: c.current.sequence,
            overlay_sequence,
        }
    }

    /// Cards of `set` in canonical operation order.
    pub fn sorted_for_operation(&self, set: &CardSet) -> Vec<CardId> {
        let mut keys: Vec<OperationKey> = set.iter().map(|c| self.operation_key(*c)).collect();
        let turn_player = self.turn_player;
        keys.sort_by(|a, b| card_operation_cmp(a, b, turn_player));
        keys.into_iter().map(|k| k.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CardType;

    fn monster(code: u32) -> CardData {
        CardData::new(code, CardType::MONSTER | CardType::NORMAL).with_level(4)
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "has no seat")]
    fn test_player_none_has_no_board() {
        let state = DuelState::new(DuelOptions::default());
        let _ = state.player(PlayerId::NONE);
    }

    #[test]
    fn test_deck_top_is_last() {
        let mut state = DuelState::new(DuelOptions::default());
        let a = state.create_card(PlayerId::ZERO, monster(1), Location::DECK);
        let b = state.create_card(PlayerId::ZERO, monster(2), Location::DECK);
        assert_eq!(state.player(PlayerId::ZERO).deck_top(), Some(b));
        assert_eq!(state.card(a).current.sequence, 0);
        assert_eq!(state.card(b).current.sequence, 1);
    }

    #[test]
    fn test_move_between_piles_resequences() {
        let mut state = DuelState::new(DuelOptions::default());
        let a = state.create_card(PlayerId::ZERO, monster(1), Location::HAND);
        let b = state.create_card(PlayerId::ZERO, monster(2), Location::HAND);
        state.move_card(PlayerId::ZERO, a, Location::GRAVE, 0, false);
        assert_eq!(state.card(b).current.sequence, 0);
        assert_eq!(state.card(a).current.location, Location::GRAVE);
        assert_eq!(state.player(PlayerId::ZERO).list_grave, vec![a]);
    }

    #[test]
    fn test_move_within_row() {
        let mut state = DuelState::new(DuelOptions::default());
        let a = state.create_field_card(PlayerId::ZERO, monster(1), Location::MZONE, 0, Position::FACEUP_ATTACK);
        state.move_card(PlayerId::ZERO, a, Location::MZONE, 3, false);
        let p = state.player(PlayerId::ZERO);
        assert_eq!(p.field_card(Location::MZONE, 0), None);
        assert_eq!(p.field_card(Location::MZONE, 3), Some(a));
    }

    #[test]
    fn test_xyz_attach_and_detach() {
        let mut state = DuelState::new(DuelOptions::default());
        let x = state.create_field_card(PlayerId::ONE, monster(1), Location::MZONE, 1, Position::FACEUP_ATTACK);
        let m = state.create_card(PlayerId::ZERO, monster(2), Location::GRAVE);
        state.xyz_add(x, m);
        assert_eq!(state.card(m).current.location, Location::OVERLAY);
        assert_eq!(state.card(m).current.controller, PlayerId::ONE);
        assert!(state.player(PlayerId::ZERO).list_grave.is_empty());
        state.remove_card(m);
        assert!(state.card(x).xyz_materials.is_empty());
        assert_eq!(state.card(m).overlay_target, None);
    }

    #[test]
    fn test_swap_card_exchanges_slots() {
        let mut state = DuelState::new(DuelOptions::default());
        let a = state.create_field_card(PlayerId::ZERO, monster(1), Location::MZONE, 0, Position::FACEUP_ATTACK);
        let b = state.create_field_card(PlayerId::ONE, monster(2), Location::MZONE, 4, Position::FACEUP_ATTACK);
        state.swap_card(a, b);
        assert_eq!(state.card(a).current.controller, PlayerId::ONE);
        assert_eq!(state.card(a).current.sequence, 4);
        assert_eq!(state.player(PlayerId::ZERO).field_card(Location::MZONE, 0), Some(b));
    }

    #[test]
    fn test_useable_count_respects_zone_mask_and_disabled() {
        let mut state = DuelState::new(DuelOptions::default());
        state.create_field_card(PlayerId::ZERO, monster(1), Location::MZONE, 0, Position::FACEUP_ATTACK);
        state.player_mut(PlayerId::ZERO).disabled_location = 1 << 1;
        assert_eq!(state.get_useable_count(None, PlayerId::ZERO, Location::MZONE, 0xff), 3);
        assert_eq!(state.get_useable_count(None, PlayerId::ZERO, Location::MZONE, 0x3), 0);
        assert_eq!(state.free_zones(None, PlayerId::ZERO, Location::SZONE, 0xff), 0x1f);
    }

    #[test]
    fn test_extra_monster_zone_access() {
        let mut state = DuelState::new(DuelOptions::default().with_flags(DuelFlags::EMZONE));
        let link = state.create_card(
            PlayerId::ZERO,
            CardData::new(9, CardType::MONSTER | CardType::LINK),
            Location::EXTRA,
        );
        assert_eq!(state.free_zones(Some(link), PlayerId::ZERO, Location::MZONE, 0xff), 0x60);
        state.create_field_card(PlayerId::ONE, monster(3), Location::MZONE, 6, Position::FACEUP_ATTACK);
        assert_eq!(state.free_zones(Some(link), PlayerId::ZERO, Location::MZONE, 0xff), 0x40);
    }

    #[test]
    fn test_sorted_for_operation_ignores_insertion_order() {
        let mut state = DuelState::new(DuelOptions::default());
        let ids: Vec<CardId> = (0..3)
            .map(|i| state.create_field_card(PlayerId::ZERO, monster(i), Location::MZONE, 2 - i, Position::FACEUP_ATTACK))
            .collect();
        let set: CardSet = ids.iter().rev().copied().collect();
        assert_eq!(state.sorted_for_operation(&set), vec![ids[2], ids[1], ids[0]]);
    }

    #[test]
    fn test_effect_index_and_removal() {
        use crate::codes::effect;
        let mut state = DuelState::new(DuelOptions::default());
        let c = state.create_field_card(PlayerId::ZERO, monster(1), Location::MZONE, 0, Position::FACEUP_ATTACK);
        let e = state.add_effect(
            Effect::builder(effect::DESTROY_REPLACE, EffectType::FIELD | EffectType::CONTINUOUS)
                .handler(c)
                .build(),
        );
        assert_eq!(state.continuous_effects.get(&effect::DESTROY_REPLACE), Some(&vec![e]));
        state.remove_effect(e);
        assert!(state.continuous_effects[&effect::DESTROY_REPLACE].is_empty());
        assert!(state.card(c).owned_effects.is_empty());
    }
}
