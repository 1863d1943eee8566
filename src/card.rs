use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::flags::{Position, Reason, Status};
use crate::group::CardSet;
use crate::ids::{CardId, EffectId, PlayerId};
use crate::types::CardType;
use crate::zone::{LocInfo, Location};

/// Printed characteristics of a card, as loaded from the card database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct CardData {
    pub code: u32,
    pub alias: u32,
    #[cfg_attr(feature = "serialization", serde(default))]
    pub setcodes: Vec<u16>,
    pub card_type: CardType,
    #[cfg_attr(feature = "serialization", serde(default))]
    pub level: u32,
    #[cfg_attr(feature = "serialization", serde(default))]
    pub attribute: u32,
    #[cfg_attr(feature = "serialization", serde(default))]
    pub race: u64,
    #[cfg_attr(feature = "serialization", serde(default))]
    pub attack: i32,
    #[cfg_attr(feature = "serialization", serde(default))]
    pub defense: i32,
    #[cfg_attr(feature = "serialization", serde(default))]
    pub lscale: u32,
    #[cfg_attr(feature = "serialization", serde(default))]
    pub rscale: u32,
    #[cfg_attr(feature = "serialization", serde(default))]
    pub link_marker: u32,
}

impl CardData {
    pub fn new(code: u32, card_type: CardType) -> Self {
        Self {
            code,
            card_type,
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_stats(mut self, attack: i32, defense: i32) -> Self {
        self.attack = attack;
        self.defense = defense;
        self
    }
}

/// Where a card is and why it got there.
///
/// A card carries three copies: `current`, `previous` (snapshot taken right
/// before the last committed move, read by event payloads) and `temp`
/// (stash used to roll back a pending reason when an action is cancelled).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardState {
    pub code: u32,
    pub card_type: CardType,
    pub level: u32,
    pub attack: i32,
    pub defense: i32,
    pub controller: PlayerId,
    pub location: Location,
    pub sequence: u32,
    pub position: Position,
    pub pzone: bool,
    pub reason: Reason,
    pub reason_card: Option<CardId>,
    pub reason_effect: Option<EffectId>,
    pub reason_player: PlayerId,
}

impl Default for CardState {
    fn default() -> Self {
        Self {
            code: 0,
            card_type: CardType::empty(),
            level: 0,
            attack: 0,
            defense: 0,
            controller: PlayerId::NONE,
            location: Location::empty(),
            sequence: 0,
            position: Position::empty(),
            pzone: false,
            reason: Reason::empty(),
            reason_card: None,
            reason_effect: None,
            reason_player: PlayerId::NONE,
        }
    }
}

impl CardState {
    pub fn loc_info(&self) -> LocInfo {
        LocInfo::new(self.controller, self.location, self.sequence, self.position.bits())
    }
}

/// Destination requested for a card leaving its current place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendToParam {
    pub location: Location,
    pub playerid: PlayerId,
    pub position: Position,
    pub sequence: u32,
    /// Set while the "place it in the spell/trap zone instead" prompt applies.
    pub check_cb: bool,
}

impl Default for SendToParam {
    fn default() -> Self {
        Self {
            location: Location::empty(),
            playerid: PlayerId::NONE,
            position: Position::empty(),
            sequence: 0,
            check_cb: false,
        }
    }
}

impl SendToParam {
    pub fn new(playerid: PlayerId, position: Position, location: Location, sequence: u32) -> Self {
        Self {
            location,
            playerid,
            position,
            sequence,
            check_cb: false,
        }
    }
}

/// Pending placement for a card entering the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToFieldParam {
    pub move_player: PlayerId,
    pub playerid: PlayerId,
    pub location: Location,
    pub positions: Position,
    pub zone: u32,
    pub pzone: bool,
}

impl Default for ToFieldParam {
    fn default() -> Self {
        Self {
            move_player: PlayerId::NONE,
            playerid: PlayerId::NONE,
            location: Location::empty(),
            positions: Position::empty(),
            zone: 0,
            pzone: false,
        }
    }
}

/// How and from where a monster was summoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummonInfo {
    pub summon_type: u32,
    pub player: PlayerId,
    pub location: Location,
    pub sequence: u32,
    pub pzone: bool,
}

impl Default for SummonInfo {
    fn default() -> Self {
        Self {
            summon_type: 0,
            player: PlayerId::NONE,
            location: Location::empty(),
            sequence: 0,
            pzone: false,
        }
    }
}

/// Parameters of a pending special summon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpSummonParam {
    pub playerid: PlayerId,
    /// Skip summon condition checks.
    pub nocheck: bool,
    /// Ignore revive limits.
    pub nolimit: bool,
    pub positions: Position,
}

impl Default for SpSummonParam {
    fn default() -> Self {
        Self {
            playerid: PlayerId::NONE,
            nocheck: false,
            nolimit: false,
            positions: Position::empty(),
        }
    }
}

/// A card in the duel arena.
#[derive(Debug, Clone)]
pub struct Card {
    pub id: CardId,
    pub owner: PlayerId,
    pub data: CardData,
    pub current: CardState,
    pub previous: CardState,
    pub temp: CardState,
    pub status: Status,
    pub sendto_param: SendToParam,
    pub to_field_param: ToFieldParam,
    /// Position requested by a position change, plus its "no flip event" marker.
    pub position_param: Position,
    pub position_noflip: bool,
    pub summon: SummonInfo,
    pub spsummon_param: SpSummonParam,
    /// Extra tribute value while selected as release material.
    pub release_param: u32,
    pub equiping_target: Option<CardId>,
    pub equiping_cards: CardSet,
    pub overlay_target: Option<CardId>,
    pub xyz_materials: Vec<CardId>,
    pub material_cards: CardSet,
    pub counters: BTreeMap<u16, u16>,
    /// Effects this card is the handler of.
    pub owned_effects: Vec<EffectId>,
    /// Single effects applying to this card itself.
    pub single_effects: Vec<EffectId>,
    /// Usage counters for count-limited indestructibility.
    pub indestructable_effects: BTreeMap<EffectId, u32>,
    pub field_effects_enabled: bool,
    pub fieldid: u32,
    pub turn_id: u32,
    pub unique_code: u32,
    pub unique_fieldid: u32,
    pub is_token: bool,
}

impl Card {
    pub fn new(id: CardId, owner: PlayerId, data: CardData) -> Self {
        let current = CardState {
            code: data.code,
            card_type: data.card_type,
            level: data.level,
            attack: data.attack,
            defense: data.defense,
            ..CardState::default()
        };
        let is_token = data.card_type.contains(CardType::TOKEN);
        Self {
            id,
            owner,
            data,
            current,
            previous: CardState::default(),
            temp: CardState::default(),
            status: Status::empty(),
            sendto_param: SendToParam::default(),
            to_field_param: ToFieldParam::default(),
            position_param: Position::empty(),
            position_noflip: false,
            summon: SummonInfo::default(),
            spsummon_param: SpSummonParam::default(),
            release_param: 0,
            equiping_target: None,
            equiping_cards: CardSet::new(),
            overlay_target: None,
            xyz_materials: Vec::new(),
            material_cards: CardSet::new(),
            counters: BTreeMap::new(),
            owned_effects: Vec::new(),
            single_effects: Vec::new(),
            indestructable_effects: BTreeMap::new(),
            field_effects_enabled: false,
            fieldid: 0,
            turn_id: 0,
            unique_code: 0,
            unique_fieldid: 0,
            is_token,
        }
    }

    pub fn code(&self) -> u32 {
        self.current.code
    }

    pub fn get_status(&self, status: Status) -> bool {
        self.status.intersects(status)
    }

    pub fn set_status(&mut self, status: Status, enabled: bool) {
        self.status.set(status, enabled);
    }

    pub fn is_position(&self, position: Position) -> bool {
        self.current.position.intersects(position)
    }

    pub fn is_location(&self, location: Location) -> bool {
        self.current.location.intersects(location)
    }

    /// Stash the pending reason so a cancelled action can restore it.
    pub fn stash_reason(&mut self) {
        self.temp.reason = self.current.reason;
        self.temp.reason_card = self.current.reason_card;
        self.temp.reason_effect = self.current.reason_effect;
        self.temp.reason_player = self.current.reason_player;
    }

    /// Undo the reason written by an action that did not go through.
    pub fn restore_reason(&mut self) {
        self.current.reason = self.temp.reason;
        self.current.reason_card = self.temp.reason_card;
        self.current.reason_effect = self.temp.reason_effect;
        self.current.reason_player = self.temp.reason_player;
    }

    /// Copy `current` into `previous` ahead of a committed move.
    pub fn snapshot_previous(&mut self) {
        self.previous = self.current;
    }

    pub fn counter(&self, counter_type: u16) -> u16 {
        self.counters.get(&counter_type).copied().unwrap_or(0)
    }

    pub fn remove_counter(&mut self, counter_type: u16, count: u16) -> u16 {
        let Some(have) = self.counters.get_mut(&counter_type) else {
            return 0;
        };
        let removed = count.min(*have);
        *have -= removed;
        if *have == 0 {
            self.counters.remove(&counter_type);
        }
        removed
    }

    /// Clear per-turn status bits that do not survive a zone change.
    pub fn clear_turn_status(&mut self) {
        self.set_status(
            Status::SUMMON_TURN
                | Status::FLIP_SUMMON_TURN
                | Status::SPSUMMON_TURN
                | Status::SET_TURN
                | Status::FORM_CHANGED,
            false,
        );
    }
}

/// Ordering key for [`card_operation_cmp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationKey {
    pub id: CardId,
    /// Controller, or the overlay target's controller for materials.
    pub controller: PlayerId,
    pub location: Location,
    pub sequence: u32,
    /// Sequence of the card this one is attached to.
    pub overlay_sequence: Option<u32>,
}

/// Canonical order for cards acted on in one batch: turn player's side
/// first, then location, then board position. Piles are walked from the top.
/// Ties fall back to card id so the result never depends on input order.
pub fn card_operation_cmp(a: &OperationKey, b: &OperationKey, turn_player: PlayerId) -> Ordering {
    let cp1 = a.controller;
    let cp2 = b.controller;
    if cp1 != cp2 {
        if cp1.is_none() || cp2.is_none() || turn_player == PlayerId::ZERO {
            return cp1.cmp(&cp2);
        }
        return cp2.cmp(&cp1);
    }
    if a.location != b.location {
        return a.location.cmp(&b.location);
    }
    let by_position = if a.location.contains(Location::OVERLAY) {
        match (a.overlay_sequence, b.overlay_sequence) {
            (Some(s1), Some(s2)) if s1 != s2 => s1.cmp(&s2),
            _ => a.sequence.cmp(&b.sequence),
        }
    } else if a.location.is_pile() {
        b.sequence.cmp(&a.sequence)
    } else {
        a.sequence.cmp(&b.sequence)
    };
    by_position.then(a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: u32, controller: u8, location: Location, sequence: u32) -> OperationKey {
        OperationKey {
            id: CardId(id),
            controller: PlayerId(controller),
            location,
            sequence,
            overlay_sequence: None,
        }
    }

    #[test]
    fn test_turn_player_side_first() {
        let a = key(1, 0, Location::MZONE, 0);
        let b = key(2, 1, Location::MZONE, 0);
        assert_eq!(card_operation_cmp(&a, &b, PlayerId::ZERO), Ordering::Less);
        assert_eq!(card_operation_cmp(&a, &b, PlayerId::ONE), Ordering::Greater);
    }

    #[test]
    fn test_piles_walk_from_top() {
        let low = key(1, 0, Location::GRAVE, 0);
        let high = key(2, 0, Location::GRAVE, 4);
        assert_eq!(card_operation_cmp(&high, &low, PlayerId::ZERO), Ordering::Less);

        let m0 = key(3, 0, Location::MZONE, 0);
        let m4 = key(4, 0, Location::MZONE, 4);
        assert_eq!(card_operation_cmp(&m0, &m4, PlayerId::ZERO), Ordering::Less);
    }

    #[test]
    fn test_location_before_sequence() {
        let hand = key(1, 0, Location::HAND, 9);
        let field = key(2, 0, Location::MZONE, 0);
        assert_eq!(card_operation_cmp(&hand, &field, PlayerId::ZERO), Ordering::Less);
    }

    #[test]
    fn test_overlay_groups_by_target() {
        let mut a = key(1, 0, Location::OVERLAY, 0);
        let mut b = key(2, 0, Location::OVERLAY, 0);
        a.overlay_sequence = Some(3);
        b.overlay_sequence = Some(1);
        assert_eq!(card_operation_cmp(&a, &b, PlayerId::ZERO), Ordering::Greater);
    }

    #[test]
    fn test_remove_counter_saturates() {
        let mut card = Card::new(CardId(0), PlayerId::ZERO, CardData::new(1, CardType::MONSTER));
        card.counters.insert(0x1, 2);
        assert_eq!(card.remove_counter(0x1, 5), 2);
        assert_eq!(card.counter(0x1), 0);
        assert!(card.counters.is_empty());
    }
}
