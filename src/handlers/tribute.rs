//! Choosing cards to release.
//!
//! Candidates come in three pools, filled before the selection starts:
//! `core.release_cards` (the player's own releasable monsters),
//! `core.release_cards_ex` (opponent's monsters that must be used when any
//! opponent monster is released) and `core.release_cards_ex_oneof`
//! (opponent's monsters of which at most one may be used, consuming the
//! granting effect). The answer lands in `return_cards`.

use crate::codes::{effect as code, hint, prompt};
use crate::flags::Reason;
use crate::group::CardSet;
use crate::ids::{CardId, EffectId, PlayerId};
use crate::process::{Flow, unknown_step};
use crate::query::Ctx;
use crate::zone::Location;

impl Ctx<'_> {
    /// Cards acting as monsters on `player`'s field.
    pub fn field_monsters(&mut self, player: PlayerId) -> Vec<CardId> {
        let p = self.state.player(player);
        let cards: Vec<CardId> = p.occupied(Location::MZONE).into_iter().chain(p.occupied(Location::SZONE)).collect();
        cards.into_iter().filter(|c| self.is_monster_on_field(*c)).collect()
    }

    fn reset_release_pools(&mut self) {
        let core = &mut self.state.core;
        core.release_cards.clear();
        core.release_cards_ex.clear();
        core.release_cards_ex_oneof.clear();
    }

    /// Fill the release pools for tributing to summon `target`. Returns the
    /// total tribute value available.
    pub fn summon_release_list(&mut self, target: CardId, player: PlayerId) -> u32 {
        self.reset_release_pools();
        let mut worth = 0;
        for card in self.field_monsters(player) {
            if self.is_releasable_by_summon(player, card, target) {
                self.state.card_mut(card).release_param = 1;
                self.state.core.release_cards.insert(card);
                worth += 1;
            }
        }
        let mut oneof = false;
        for card in self.field_monsters(player.opponent()) {
            if !self.is_releasable_by_summon(player, card, target) {
                continue;
            }
            if self.is_card_affected_by(card, code::EXTRA_RELEASE) {
                self.state.card_mut(card).release_param = 1;
                self.state.core.release_cards_ex.insert(card);
                worth += 1;
            } else if self.usable_oneof_effect(card, code::EXTRA_RELEASE_SUM).is_some() {
                self.state.card_mut(card).release_param = 1;
                self.state.core.release_cards_ex_oneof.insert(card);
                oneof = true;
            }
        }
        worth + u32::from(oneof)
    }

    /// Fill the release pools for a release that is not a summon (costs,
    /// effects). Returns the number of usable cards.
    pub fn release_list(&mut self, player: PlayerId, reason: Reason) -> u32 {
        self.reset_release_pools();
        let mut count = 0;
        for card in self.field_monsters(player) {
            if self.is_releasable_by_nonsummon(player, card, reason) {
                self.state.core.release_cards.insert(card);
                count += 1;
            }
        }
        let mut oneof = false;
        for card in self.field_monsters(player.opponent()) {
            if !self.is_releasable_by_nonsummon(player, card, reason) {
                continue;
            }
            if self.is_card_affected_by(card, code::EXTRA_RELEASE) {
                self.state.core.release_cards_ex.insert(card);
                count += 1;
            } else if self.usable_oneof_effect(card, code::EXTRA_RELEASE_NONSUM).is_some() {
                self.state.core.release_cards_ex_oneof.insert(card);
                oneof = true;
            }
        }
        count + u32::from(oneof)
    }

    /// The effect letting `card` join the one-of pool, if it still has a use.
    fn usable_oneof_effect(&mut self, card: CardId, effect_code: u32) -> Option<EffectId> {
        self.filter_effect(card, effect_code)
            .into_iter()
            .find(|e| self.state.effect(*e).has_count_left())
    }

    /// Own monsters in `zone` of `toplayer` among the plain release pool.
    fn zone_releases(&mut self, toplayer: PlayerId, zone: u32) -> CardSet {
        let pool: Vec<CardId> = self.state.core.release_cards.iter().copied().collect();
        pool.into_iter()
            .filter(|card| {
                let c = self.state.card(*card);
                let in_zone = c.current.controller == toplayer && (zone >> c.current.sequence) & 1 != 0;
                in_zone && self.is_monster_on_field(*card)
            })
            .collect()
    }
}

fn release_worth(ctx: &Ctx<'_>, cards: &CardSet) -> u32 {
    cards.iter().map(|c| ctx.state.card(*c).release_param).sum()
}

// ============================================================================
// SelectRelease
// ============================================================================

/// Release selection for costs and effects.
#[derive(Debug, Clone)]
pub struct SelectRelease {
    pub player: PlayerId,
    pub cancelable: bool,
    pub min: u32,
    pub max: u32,
    /// Require that a monster zone ends up free for `to_check`.
    pub check_field: bool,
    pub to_check: Option<CardId>,
    pub toplayer: PlayerId,
    pub zone: u32,
    selected: CardSet,
    must_choose_one: Option<CardSet>,
    extra_release_nonsum: Option<EffectId>,
}

impl SelectRelease {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        player: PlayerId,
        cancelable: bool,
        min: u32,
        max: u32,
        check_field: bool,
        to_check: Option<CardId>,
        toplayer: PlayerId,
        zone: u32,
    ) -> Self {
        Self {
            player,
            cancelable,
            min,
            max,
            check_field,
            to_check,
            toplayer,
            zone,
            selected: CardSet::new(),
            must_choose_one: None,
            extra_release_nonsum: None,
        }
    }

    fn finish(&self, ctx: &mut Ctx<'_>) -> Flow {
        if let Some(e) = self.extra_release_nonsum {
            ctx.state.core.dec_count_reserve.push(e);
        }
        ctx.state.return_cards.set(self.selected.iter().copied().collect());
        Flow::Done
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        match step {
            0 => {
                if self.check_field {
                    let zone = self.zone & 0x1f;
                    let free = ctx.state.get_useable_count(self.to_check, self.toplayer, Location::MZONE, zone);
                    if free < self.min as i32 {
                        self.must_choose_one = Some(ctx.zone_releases(self.toplayer, zone));
                    }
                }
                self.selected.clear();
                ctx.state.return_cards.set(Vec::new());
                let core = &ctx.state.core;
                let (plain, ex, oneof) = (
                    core.release_cards.len() as u32,
                    core.release_cards_ex.len() as u32,
                    core.release_cards_ex_oneof.len() as u32,
                );
                let all_minimum = oneof <= 1 && plain + ex + oneof == self.min;
                let all_must = ex >= self.max || plain + oneof == 0;
                let only_self = ex + oneof == 0;
                if (!all_minimum && !all_must && !only_self) || self.must_choose_one.is_some() {
                    return Flow::Continue(2);
                }
                let mut cards: Vec<CardId> = Vec::new();
                if ex < self.max {
                    cards.extend(core.release_cards_ex_oneof.iter().copied());
                    cards.extend(core.release_cards.iter().copied());
                }
                cards.extend(core.release_cards_ex.iter().copied());
                let min = if all_must { ex } else { self.min };
                ctx.state.hint(hint::SELECTMSG, self.player, prompt::RELEASE);
                ctx.select_card(self.player, prompt::RELEASE, self.cancelable, min, self.max, cards);
                Flow::Continue(1)
            }
            1 => {
                if ctx.state.return_cards.canceled {
                    return Flow::Done;
                }
                if (ctx.state.return_cards.list.len() as u32) < self.min {
                    ctx.state.return_cards.cancel();
                    return Flow::Done;
                }
                let oneof = ctx.state.core.release_cards_ex_oneof.first().copied();
                if let Some(card) = oneof
                    && let Some(e) = ctx.usable_oneof_effect(card, code::EXTRA_RELEASE_NONSUM)
                {
                    ctx.state.core.dec_count_reserve.push(e);
                }
                Flow::Done
            }
            2 => {
                let core = &ctx.state.core;
                let mut finishable = self.selected.len() as u32 >= self.min;
                let mut to_select = 0;
                for card in &core.release_cards_ex {
                    if !self.selected.contains(card) {
                        finishable = false;
                        to_select += 1;
                    }
                }
                let must_chosen = match &self.must_choose_one {
                    None => true,
                    Some(must) => self.selected.iter().any(|c| must.contains(c)),
                };
                let mut room = self.max as i32 - self.selected.len() as i32 - to_select;
                if !must_chosen {
                    room -= 1;
                }
                let finishable = finishable && must_chosen;
                let mut pool: CardSet = core.release_cards_ex.clone();
                if room <= 0 {
                    if !must_chosen && let Some(must) = &self.must_choose_one {
                        if room == 0 {
                            pool.extend(must.iter().copied());
                        } else {
                            pool = must.clone();
                        }
                    }
                } else {
                    pool.extend(core.release_cards.iter().copied());
                    if self.extra_release_nonsum.is_none() {
                        pool.extend(core.release_cards_ex_oneof.iter().copied());
                    }
                }
                let pool: CardSet = pool.difference(&self.selected).copied().collect();
                let selectable = ctx.state.sorted_for_operation(&pool);
                let selected: Vec<CardId> = self.selected.iter().copied().collect();
                ctx.state.hint(hint::SELECTMSG, self.player, prompt::RELEASE);
                ctx.select_unselect_card(
                    self.player,
                    prompt::RELEASE,
                    finishable,
                    finishable || self.selected.is_empty(),
                    self.min,
                    self.max,
                    selectable,
                    selected,
                );
                Flow::Continue(3)
            }
            3 => {
                if ctx.state.return_cards.canceled {
                    if self.selected.is_empty() {
                        return Flow::Done;
                    }
                    if self.selected.len() as u32 >= self.min {
                        return self.finish(ctx);
                    }
                    return Flow::Continue(2);
                }
                let Some(card) = ctx.state.return_cards.list.first().copied() else {
                    return Flow::Continue(2);
                };
                let is_oneof = ctx.state.core.release_cards_ex_oneof.contains(&card);
                if self.selected.insert(card) {
                    if is_oneof {
                        self.extra_release_nonsum = ctx.usable_oneof_effect(card, code::EXTRA_RELEASE_NONSUM);
                    }
                } else {
                    self.selected.remove(&card);
                    if is_oneof {
                        self.extra_release_nonsum = None;
                    }
                }
                if self.selected.len() as u32 == self.max {
                    return self.finish(ctx);
                }
                Flow::Continue(2)
            }
            _ => unknown_step("SelectRelease", step),
        }
    }
}

// ============================================================================
// SelectTribute
// ============================================================================

/// Tribute selection for a summon. Each candidate is worth its
/// `release_param` tributes.
#[derive(Debug, Clone)]
pub struct SelectTribute {
    pub target: Option<CardId>,
    pub player: PlayerId,
    pub cancelable: bool,
    pub min: u32,
    pub max: u32,
    pub toplayer: PlayerId,
    pub zone: u32,
    selected: CardSet,
    must_choose_one: CardSet,
    extra_release_effect: Option<EffectId>,
}

impl SelectTribute {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        target: Option<CardId>,
        player: PlayerId,
        cancelable: bool,
        min: u32,
        max: u32,
        toplayer: PlayerId,
        zone: u32,
    ) -> Self {
        Self {
            target,
            player,
            cancelable,
            min,
            max,
            toplayer,
            zone,
            selected: CardSet::new(),
            must_choose_one: CardSet::new(),
            extra_release_effect: None,
        }
    }

    fn tribute_pool(ctx: &Ctx<'_>, cards: &CardSet) -> Vec<(CardId, u32)> {
        cards.iter().map(|c| (*c, ctx.state.card(*c).release_param)).collect()
    }

    /// Remaining (min, max) once the current selection is counted.
    fn remaining(&self, ctx: &Ctx<'_>) -> (u32, u32) {
        let count = self.selected.len() as u32;
        let worth = release_worth(ctx, &self.selected);
        (self.min.saturating_sub(worth), self.max.saturating_sub(count))
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let zone = self.zone & 0x1f;
        match step {
            0 => {
                self.selected.clear();
                let free = ctx.state.get_useable_count(self.target, self.toplayer, Location::MZONE, zone);
                if free > 0 {
                    let core = &ctx.state.core;
                    let pool = if core.release_cards_ex.is_empty() && core.release_cards_ex_oneof.is_empty() {
                        Some(Self::tribute_pool(ctx, &core.release_cards))
                    } else if core.release_cards_ex.len() as u32 >= self.max {
                        Some(Self::tribute_pool(ctx, &core.release_cards_ex))
                    } else {
                        None
                    };
                    if let Some(cards) = pool {
                        ctx.state.hint(hint::SELECTMSG, self.player, prompt::RELEASE);
                        ctx.select_tribute_p(self.player, self.cancelable, self.min, self.max, cards);
                        return Flow::Done;
                    }
                }
                Flow::Continue(1)
            }
            1 => {
                let free = ctx.state.get_useable_count(self.target, self.toplayer, Location::MZONE, zone);
                self.must_choose_one = if free <= 0 {
                    ctx.zone_releases(self.toplayer, zone)
                } else {
                    CardSet::new()
                };
                let plain_worth = release_worth(ctx, &ctx.state.core.release_cards);
                ctx.state.hint(hint::SELECTMSG, self.player, prompt::RELEASE);
                let core = &mut ctx.state.core;
                if core.release_cards_ex.is_empty() && core.release_cards_ex_oneof.is_empty() && self.min > plain_worth {
                    let cards = if plain_worth > 0 {
                        Self::tribute_pool(ctx, &ctx.state.core.release_cards)
                    } else {
                        Vec::new()
                    };
                    ctx.select_tribute_p(self.player, self.cancelable, self.min, self.max, cards);
                    return Flow::Done;
                }
                let overlap: CardSet = core.release_cards.union(&core.release_cards_ex).copied().collect();
                core.release_cards_ex_oneof.retain(|c| !overlap.contains(c));
                let force = !self.must_choose_one.is_empty();
                let ex_len = core.release_cards_ex.len() as u32;
                let mut selectable: Vec<CardId> = Vec::new();
                if force && self.max.checked_sub(ex_len) == Some(1) {
                    selectable.extend(self.must_choose_one.iter().copied());
                    selectable.extend(core.release_cards_ex.iter().copied());
                } else if force && self.max <= 1 {
                    selectable.extend(self.must_choose_one.iter().copied());
                } else {
                    selectable.extend(core.release_cards.iter().copied());
                    selectable.extend(core.release_cards_ex.iter().copied());
                    selectable.extend(core.release_cards_ex_oneof.iter().copied());
                }
                ctx.select_unselect_card(
                    self.player,
                    prompt::RELEASE,
                    false,
                    self.cancelable,
                    self.min,
                    self.max,
                    selectable,
                    Vec::new(),
                );
                Flow::Continue(3)
            }
            2 => {
                let (min, max) = self.remaining(ctx);
                let force = !self.must_choose_one.is_empty() && !self.must_choose_one.iter().any(|c| self.selected.contains(c));
                let core = &ctx.state.core;
                let unselected = |set: &CardSet| -> Vec<CardId> { set.difference(&self.selected).copied().collect() };
                let ex_left = unselected(&core.release_cards_ex);
                let exsize = ex_left.len() as u32;
                let mut selectable: Vec<CardId> = Vec::new();
                if force && max.checked_sub(exsize) == Some(1) {
                    selectable.extend(unselected(&self.must_choose_one));
                    selectable.extend(ex_left.iter().copied());
                } else if force && max <= 1 {
                    selectable.extend(self.must_choose_one.iter().copied());
                } else if exsize > 0 && exsize == max {
                    selectable.extend(ex_left.iter().copied());
                } else {
                    selectable.extend(unselected(&core.release_cards));
                    selectable.extend(ex_left.iter().copied());
                    if self.extra_release_effect.is_none() {
                        selectable.extend(unselected(&core.release_cards_ex_oneof));
                    }
                }
                let cancelable = self.selected.is_empty() && self.cancelable;
                let finishable = min == 0 && !force && exsize == 0;
                let selected: Vec<CardId> = self.selected.iter().copied().collect();
                ctx.state.hint(hint::SELECTMSG, self.player, prompt::RELEASE);
                ctx.select_unselect_card(
                    self.player,
                    prompt::RELEASE,
                    finishable,
                    cancelable,
                    self.min,
                    self.max,
                    selectable,
                    selected,
                );
                Flow::Continue(3)
            }
            3 => {
                let canceled = ctx.state.return_cards.canceled;
                if canceled && self.selected.is_empty() {
                    return Flow::Done;
                }
                if !canceled && let Some(card) = ctx.state.return_cards.list.first().copied() {
                    let is_oneof = ctx.state.core.release_cards_ex_oneof.contains(&card);
                    if self.selected.insert(card) {
                        if is_oneof {
                            self.extra_release_effect = ctx.usable_oneof_effect(card, code::EXTRA_RELEASE_SUM);
                        }
                    } else {
                        self.selected.remove(&card);
                        if is_oneof {
                            self.extra_release_effect = None;
                        }
                    }
                }
                let (min, max) = self.remaining(ctx);
                if (canceled && min == 0) || max == 0 {
                    ctx.state.return_cards.set(self.selected.iter().copied().collect());
                    if let Some(e) = self.extra_release_effect {
                        ctx.state.effect_mut(e).dec_count();
                    }
                    return Flow::Done;
                }
                Flow::Continue(2)
            }
            _ => unknown_step("SelectTribute", step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardData;
    use crate::flags::Position;
    use crate::game_state::DuelState;
    use crate::options::DuelOptions;
    use crate::script::NullScript;
    use crate::types::CardType;

    fn monster(state: &mut DuelState, owner: PlayerId, seq: u32) -> CardId {
        let data = CardData::new(1000 + seq, CardType::MONSTER | CardType::NORMAL).with_level(4);
        state.create_field_card(owner, data, Location::MZONE, seq, Position::FACEUP_ATTACK)
    }

    #[test]
    fn test_summon_release_list_own_monsters_only() {
        let mut state = DuelState::new(DuelOptions::default());
        let a = monster(&mut state, PlayerId::ZERO, 0);
        let b = monster(&mut state, PlayerId::ZERO, 1);
        let _theirs = monster(&mut state, PlayerId::ONE, 0);
        let target = state.create_card(
            PlayerId::ZERO,
            CardData::new(77, CardType::MONSTER | CardType::NORMAL).with_level(7),
            Location::HAND,
        );
        let mut script = NullScript;
        let mut ctx = Ctx::new(&mut state, &mut script);
        assert_eq!(ctx.summon_release_list(target, PlayerId::ZERO), 2);
        assert_eq!(ctx.state.core.release_cards, CardSet::from([a, b]));
        assert!(ctx.state.core.release_cards_ex.is_empty());
        assert_eq!(ctx.state.card(a).release_param, 1);
    }

    #[test]
    fn test_tribute_remaining_budget() {
        let mut state = DuelState::new(DuelOptions::default());
        let a = monster(&mut state, PlayerId::ZERO, 0);
        state.card_mut(a).release_param = 1;
        let mut tribute = SelectTribute::new(None, PlayerId::ZERO, true, 2, 2, PlayerId::ZERO, 0x1f);
        let mut script = NullScript;
        let ctx = Ctx::new(&mut state, &mut script);
        assert_eq!(tribute.remaining(&ctx), (2, 2));
        tribute.selected.insert(a);
        assert_eq!(tribute.remaining(&ctx), (1, 1));
    }
}
