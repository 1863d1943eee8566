//! Rule adjustments applied between actions.
//!
//! [`Ctx::adjust_all`] scans the board for states the rules forbid and
//! queues the processes that fix them: duplicate unique cards, cards that
//! destroy or bury themselves, monsters whose control claim expired and trap
//! monsters that stopped being monsters.

use tracing::debug;

use crate::actions::{Actions, PLAYER_SELFDES};
use crate::codes::{effect as code, hint, prompt};
use crate::flags::{DuelFlags, Position, Reason, Reset};
use crate::game_state::DuelState;
use crate::group::CardSet;
use crate::ids::{CardId, PlayerId};
use crate::process::{Flow, Process, unknown_step};
use crate::query::Ctx;
use crate::types::CardType;
use crate::zone::{Location, LocationReason};

impl DuelState {
    /// Face-up cards on `player`'s field that share `card`'s unique code,
    /// the card itself included.
    pub fn unique_targets(&self, card: CardId, player: PlayerId) -> CardSet {
        let unique = self.card(card).unique_code;
        if unique == 0 || player.is_none() {
            return CardSet::new();
        }
        let p = self.player(player);
        [Location::MZONE, Location::SZONE]
            .into_iter()
            .flat_map(|loc| p.occupied(loc))
            .filter(|other| {
                let c = self.card(*other);
                c.current.position.is_faceup() && (c.code() == unique || c.unique_code == unique)
            })
            .collect()
    }
}

impl Ctx<'_> {
    /// Queue every pending rule adjustment. Returns whether anything was
    /// queued.
    pub fn adjust_all(&mut self) -> bool {
        let mut queued = false;
        let mut field = Vec::new();
        for player in PlayerId::both() {
            for loc in [Location::MZONE, Location::SZONE] {
                field.extend(self.state.player(player).occupied(loc));
            }
        }

        for &card in &field {
            let c = self.state.card(card);
            if c.unique_code == 0 || !c.current.position.is_faceup() || self.state.core.unique_destroy_set.contains(&card) {
                continue;
            }
            let controller = c.current.controller;
            if self.state.unique_targets(card, controller).len() > 1 {
                self.state.core.unique_destroy_set.insert(card);
                self.push(Process::SelfDestroyUnique(SelfDestroyUnique::new(card, controller)));
                queued = true;
            }
        }

        for &card in &field {
            if !self.state.card(card).current.position.is_faceup() {
                continue;
            }
            if self.is_card_affected_by(card, code::SELF_DESTROY) {
                self.state.core.self_destroy_set.insert(card);
            }
            if self.is_card_affected_by(card, code::SELF_TOGRAVE) {
                self.state.core.self_tograve_set.insert(card);
            }
        }
        if !self.state.core.self_destroy_set.is_empty() {
            self.push(Process::SelfDestroy(SelfDestroy::new()));
            queued = true;
        }
        if !self.state.core.self_tograve_set.is_empty() {
            self.push(Process::SelfToGrave(SelfToGrave::new()));
            queued = true;
        }

        if self.adjust_control() {
            queued = true;
        }

        let mut trap_monsters = false;
        for &card in &field {
            let c = self.state.card(card);
            if c.current.location == Location::MZONE
                && c.data.card_type.contains(CardType::TRAP)
                && c.data.card_type.contains(CardType::TRAPMONSTER)
                && !c.current.card_type.contains(CardType::TRAPMONSTER)
            {
                let controller = c.current.controller;
                self.state.core.trap_monster_adjust_set[controller.index() & 1].insert(card);
                trap_monsters = true;
            }
        }
        if trap_monsters {
            self.push(Process::TrapMonsterAdjust(TrapMonsterAdjust::new()));
            queued = true;
        }
        if queued {
            debug!("rule adjustments queued");
        }
        queued
    }
}

// ============================================================================
// SelfDestroyUnique
// ============================================================================

#[derive(Debug, Clone)]
pub struct SelfDestroyUnique {
    pub unique_card: CardId,
    pub playerid: PlayerId,
}

impl SelfDestroyUnique {
    pub fn new(unique_card: CardId, playerid: PlayerId) -> Self {
        Self { unique_card, playerid }
    }

    /// Which copy survives: an established copy of the checking player,
    /// then of the opponent, then any copy of either.
    fn keep_candidates(&self, ctx: &Ctx<'_>, targets: &CardSet) -> (PlayerId, Vec<CardId>) {
        let established = |c: &CardId, p: PlayerId| {
            let card = ctx.state.card(*c);
            card.current.controller == p && card.unique_fieldid != u32::MAX
        };
        let any = |c: &CardId, p: PlayerId| ctx.state.card(*c).current.controller == p;
        let mut player = self.playerid;
        let attempts: [(bool, bool); 4] = [(false, true), (true, true), (true, false), (true, false)];
        for (swap, strict) in attempts {
            if swap {
                player = player.opponent();
            }
            let picked: Vec<CardId> = targets
                .iter()
                .filter(|c| if strict { established(c, player) } else { any(c, player) })
                .copied()
                .collect();
            if !picked.is_empty() {
                return (player, picked);
            }
        }
        (player, Vec::new())
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let card = self.unique_card;
        match step {
            0 => {
                let targets = ctx.state.unique_targets(card, self.playerid);
                if targets.len() <= 1 {
                    let fieldid = targets.iter().next().map_or(0, |c| ctx.state.card(*c).fieldid);
                    ctx.state.card_mut(card).unique_fieldid = fieldid;
                    ctx.state.core.unique_destroy_set.remove(&card);
                    return Flow::Done;
                }
                let (chooser, candidates) = self.keep_candidates(ctx, &targets);
                ctx.state.return_cards.list.clear();
                if candidates.len() == 1 {
                    ctx.state.return_cards.list = candidates;
                } else {
                    ctx.state.hint(hint::SELECTMSG, chooser, prompt::UNIQUE_KEEP);
                    ctx.select_card(chooser, prompt::UNIQUE_KEEP, false, 1, 1, candidates);
                }
                Flow::Continue(1)
            }
            1 => {
                let mut targets = ctx.state.unique_targets(card, self.playerid);
                if let Some(&keep) = ctx.state.return_cards.list.first() {
                    let fieldid = ctx.state.card(keep).fieldid;
                    ctx.state.card_mut(card).unique_fieldid = fieldid;
                    targets.remove(&keep);
                }
                let unique_effect = ctx
                    .state
                    .card(card)
                    .single_effects
                    .iter()
                    .copied()
                    .find(|e| ctx.state.effect(*e).code == code::UNIQUE_CHECK);
                let controller = ctx.state.card(card).current.controller;
                for other in targets.iter().copied() {
                    let c = ctx.state.card_mut(other);
                    c.temp.reason_effect = c.current.reason_effect;
                    c.temp.reason_player = c.current.reason_player;
                    c.current.reason_effect = unique_effect;
                    c.current.reason_player = controller;
                }
                if !targets.is_empty() {
                    ctx.destroy(targets, None, Reason::RULE, PLAYER_SELFDES, PlayerId::NONE, Location::GRAVE, 0);
                }
                Flow::Continue(2)
            }
            2 => {
                ctx.state.core.unique_destroy_set.remove(&card);
                Flow::Done
            }
            _ => unknown_step("SelfDestroyUnique", step),
        }
    }
}

// ============================================================================
// SelfDestroy / SelfToGrave
// ============================================================================

/// Destroys the cards in `Core::self_destroy_set` one at a time.
#[derive(Debug, Clone, Default)]
pub struct SelfDestroy;

impl SelfDestroy {
    pub fn new() -> Self {
        Self
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                let Some(card) = ctx.state.core.self_destroy_set.pop_first() else {
                    return Flow::Continue(1);
                };
                if let Some(effect) = ctx.filter_effect(card, code::SELF_DESTROY).into_iter().next() {
                    let player = ctx.state.effect_handler_player(effect);
                    let c = ctx.state.card_mut(card);
                    c.temp.reason_effect = c.current.reason_effect;
                    c.temp.reason_player = c.current.reason_player;
                    c.current.reason_effect = Some(effect);
                    c.current.reason_player = player;
                    ctx.destroy(
                        CardSet::from([card]),
                        None,
                        Reason::EFFECT,
                        PLAYER_SELFDES,
                        PlayerId::NONE,
                        Location::GRAVE,
                        0,
                    );
                }
                Flow::Continue(0)
            }
            1 => {
                ctx.state.returns.set(0, 0);
                ctx.state.core.operated_set.clear();
                Flow::Done
            }
            _ => unknown_step("SelfDestroy", step),
        }
    }
}

/// Sends the cards in `Core::self_tograve_set` to the graveyard one at a time.
#[derive(Debug, Clone, Default)]
pub struct SelfToGrave;

impl SelfToGrave {
    pub fn new() -> Self {
        Self
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                let Some(card) = ctx.state.core.self_tograve_set.pop_first() else {
                    return Flow::Continue(1);
                };
                if let Some(effect) = ctx.filter_effect(card, code::SELF_TOGRAVE).into_iter().next() {
                    let player = ctx.state.effect_handler_player(effect);
                    ctx.send_to(
                        CardSet::from([card]),
                        Some(effect),
                        Reason::EFFECT,
                        player,
                        PlayerId::NONE,
                        Location::GRAVE,
                        0,
                        Position::FACEUP,
                        false,
                    );
                }
                Flow::Continue(0)
            }
            1 => {
                ctx.state.returns.set(0, 0);
                ctx.state.core.operated_set.clear();
                Flow::Done
            }
            _ => unknown_step("SelfToGrave", step),
        }
    }
}

// ============================================================================
// TrapMonsterAdjust
// ============================================================================

/// Returns trap monsters that stopped being monsters to the spell/trap zone.
/// When zones are short each player picks which of theirs go to the
/// graveyard, turn player first.
#[derive(Debug, Clone, Default)]
pub struct TrapMonsterAdjust {
    oppo_selection: bool,
    to_grave: CardSet,
}

impl TrapMonsterAdjust {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_player(&self, ctx: &Ctx<'_>) -> PlayerId {
        if self.oppo_selection {
            ctx.state.turn_player.opponent()
        } else {
            ctx.state.turn_player
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                // Zone capacity only matters when trap monsters keep their
                // spell/trap zone reserved.
                if !ctx.state.is_flag(DuelFlags::TRAP_MONSTERS_NOT_USE_ZONE) {
                    return Flow::Continue(3);
                }
                Flow::Continue(1)
            }
            1 => {
                let player = self.check_player(ctx);
                let side = player.index() & 1;
                ctx.state.return_cards.list.clear();
                let free = ctx.state.get_useable_count(None, player, Location::SZONE, 0xff);
                let pending = ctx.state.core.trap_monster_adjust_set[side].len() as i32;
                if free <= 0 {
                    let all = std::mem::take(&mut ctx.state.core.trap_monster_adjust_set[side]);
                    self.to_grave.extend(all);
                } else if pending > free {
                    let excess = (pending - free) as u32;
                    let cards: Vec<CardId> = ctx.state.core.trap_monster_adjust_set[side].iter().copied().collect();
                    ctx.state.hint(hint::SELECTMSG, player, prompt::CONTROL_DENY);
                    ctx.select_card(player, prompt::CONTROL_DENY, false, excess, excess, cards);
                }
                Flow::Continue(2)
            }
            2 => {
                let side = self.check_player(ctx).index() & 1;
                for card in std::mem::take(&mut ctx.state.return_cards.list) {
                    self.to_grave.insert(card);
                    ctx.state.core.trap_monster_adjust_set[side].remove(&card);
                }
                Flow::Continue(3)
            }
            3 => {
                if !self.oppo_selection {
                    self.oppo_selection = true;
                    return Flow::Continue(0);
                }
                Flow::Continue(4)
            }
            4 => {
                let mut player = ctx.state.turn_player;
                for _ in 0..2 {
                    let side = player.index() & 1;
                    let set = std::mem::take(&mut ctx.state.core.trap_monster_adjust_set[side]);
                    for card in ctx.state.sorted_for_operation(&set) {
                        ctx.state.reset_card(card, Reset::EVENT | Reset::TURN_SET);
                        let position = ctx.state.card(card).current.position;
                        ctx.move_to_field(
                            card,
                            player,
                            player,
                            Location::SZONE,
                            position,
                            false,
                            2,
                            0xff,
                            false,
                            LocationReason::ToField,
                            false,
                        );
                    }
                    player = player.opponent();
                }
                let to_grave = std::mem::take(&mut self.to_grave);
                if !to_grave.is_empty() {
                    ctx.send_to(
                        to_grave,
                        None,
                        Reason::RULE,
                        PlayerId::NONE,
                        PlayerId::NONE,
                        Location::GRAVE,
                        0,
                        Position::FACEUP,
                        false,
                    );
                }
                Flow::Done
            }
            _ => unknown_step("TrapMonsterAdjust", step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardData;
    use crate::options::DuelOptions;

    #[test]
    fn test_unique_targets_only_faceup_copies() {
        let mut state = DuelState::new(DuelOptions::default());
        let data = CardData::new(77, CardType::MONSTER | CardType::EFFECT).with_level(4);
        let a = state.create_field_card(PlayerId::ZERO, data.clone(), Location::MZONE, 0, Position::FACEUP_ATTACK);
        let b = state.create_field_card(PlayerId::ZERO, data.clone(), Location::MZONE, 1, Position::FACEUP_ATTACK);
        let c = state.create_field_card(PlayerId::ZERO, data, Location::MZONE, 2, Position::FACEDOWN_DEFENSE);
        state.card_mut(a).unique_code = 77;
        let targets = state.unique_targets(a, PlayerId::ZERO);
        assert!(targets.contains(&a) && targets.contains(&b));
        assert!(!targets.contains(&c));
        assert!(state.unique_targets(a, PlayerId::ONE).is_empty());
    }
}
