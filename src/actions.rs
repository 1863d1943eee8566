//! Entry points for game actions.
//!
//! Each entry point prepares per-card parameters (pending reason, send-to
//! destination, position request, ...) and pushes the matching process.
//! They are available wherever frames can be queued: on [`crate::duel::Duel`]
//! from outside, on [`Ctx`] from inside a handler step and on [`Scope`] from
//! inside a script operation.

use crate::card::SendToParam;
use crate::flags::{Position, Reason, Status};
use crate::game_state::DuelState;
use crate::group::{CardSet, GroupId};
use crate::handlers::chain::ActivateEffect;
use crate::handlers::control::{ControlAdjust, GetControl, SwapControl};
use crate::handlers::destroy::Destroy;
use crate::handlers::draw::{DiscardDeck, Draw};
use crate::handlers::equip::Equip;
use crate::handlers::life::{Damage, PayLpCost, Recover};
use crate::handlers::move_to_field::MoveToField;
use crate::handlers::overlay::{RemoveCounter, RemoveOverlay, XyzOverlay};
use crate::handlers::position::ChangePos;
use crate::handlers::random::{TossCoin, TossDice};
use crate::handlers::release::Release;
use crate::handlers::replace::OperationReplace;
use crate::handlers::send_to::SendTo;
use crate::handlers::special_summon::{SpSummon, SpSummonRule, SpSummonRuleGroup, SpSummonStep};
use crate::handlers::spell_set::{SpellSet, SpellSetGroup};
use crate::handlers::summon::{FlipSummon, MonsterSet, SummonRule};
use crate::handlers::tribute::{SelectRelease, SelectTribute};
use crate::ids::{CardId, EffectId, PlayerId};
use crate::process::{Frame, Process};
use crate::query::Ctx;
use crate::types::summon_type;
use crate::zone::{Location, LocationReason, expand_alias};

/// Reason player marking a card that destroys itself; the card keeps its
/// previous reason effect and player.
pub const PLAYER_SELFDES: PlayerId = PlayerId(5);

/// What a script operation can touch: the duel state and the queue of the
/// step that invoked it.
pub struct Scope<'a> {
    pub state: &'a mut DuelState,
    pub queue: &'a mut Vec<Frame>,
}

/// Anything that can start game actions.
pub trait Actions {
    fn state(&mut self) -> &mut DuelState;

    fn push_frame(&mut self, frame: Frame);

    fn push_process(&mut self, process: Process) {
        self.push_frame(Frame::new(process));
    }

    #[allow(clippy::too_many_arguments)]
    fn destroy(
        &mut self,
        targets: CardSet,
        reason_effect: Option<EffectId>,
        reason: Reason,
        reason_player: PlayerId,
        playerid: PlayerId,
        destination: Location,
        sequence: u32,
    ) {
        let group = prepare_destroy(self.state(), targets, reason_effect, reason, reason_player, playerid, destination, sequence);
        self.push_process(Process::Destroy(Destroy::new(group, reason_effect, reason, reason_player)));
    }

    /// Destroy monsters that lost a battle. Substitutes and replacement
    /// operations are settled for every card before the survivors leave.
    fn destroy_by_battle(&mut self, targets: CardSet, reason_player: PlayerId) {
        let group = prepare_destroy(
            self.state(),
            targets,
            None,
            Reason::BATTLE,
            reason_player,
            PlayerId::NONE,
            Location::GRAVE,
            0,
        );
        self.push_frame(Frame::at(
            10,
            Process::Destroy(Destroy::new(group, None, Reason::BATTLE, reason_player)),
        ));
    }

    fn release(&mut self, targets: CardSet, reason_effect: Option<EffectId>, reason: Reason, reason_player: PlayerId) {
        let state = self.state();
        for card in targets.iter().copied() {
            let c = state.card_mut(card);
            c.stash_reason();
            c.current.reason = reason;
            c.current.reason_effect = reason_effect;
            c.current.reason_player = reason_player;
            c.sendto_param = SendToParam::new(c.owner, Position::FACEUP, Location::GRAVE, 0);
        }
        let group = state.groups.create_readonly(targets);
        self.push_process(Process::Release(Release::new(group, reason_effect, reason, reason_player)));
    }

    /// Send cards to a pile. Field destinations are ignored.
    #[allow(clippy::too_many_arguments)]
    fn send_to(
        &mut self,
        targets: CardSet,
        reason_effect: Option<EffectId>,
        reason: Reason,
        reason_player: PlayerId,
        playerid: PlayerId,
        destination: Location,
        sequence: u32,
        position: Position,
        ignore: bool,
    ) {
        if destination.is_onfield() {
            return;
        }
        let state = self.state();
        for card in targets.iter().copied() {
            let c = state.card_mut(card);
            c.stash_reason();
            c.current.reason = reason;
            c.current.reason_effect = reason_effect;
            c.current.reason_player = reason_player;
            let mut p = playerid;
            if p.is_none()
                && destination.contains(Location::HAND)
                && c.current.location.contains(Location::DECK)
                && c.current.controller == reason_player
            {
                p = reason_player;
            }
            if p.is_none() {
                p = c.owner;
            }
            if destination == Location::GRAVE && c.current.location == Location::REMOVED {
                c.current.reason |= Reason::RETURN;
            }
            let pos = if destination != Location::REMOVED && !ignore {
                Position::FACEUP
            } else if position.is_empty() {
                c.current.position
            } else {
                position
            };
            c.sendto_param = SendToParam::new(p, pos, destination, sequence);
        }
        let group = state.groups.create_readonly(targets);
        self.push_process(Process::SendTo(SendTo::new(group, reason_effect, reason, reason_player)));
    }

    /// Put a card onto the field. Alias locations (FZONE, PZONE, MMZONE,
    /// EMZONE, STZONE) are expanded into a real row plus a zone mask.
    #[allow(clippy::too_many_arguments)]
    fn move_to_field(
        &mut self,
        target: CardId,
        move_player: PlayerId,
        playerid: PlayerId,
        destination: Location,
        positions: Position,
        enable: bool,
        ret: u8,
        zone: u32,
        rule: bool,
        location_reason: LocationReason,
        confirm: bool,
    ) {
        let field = Location::ONFIELD | Location::FZONE | Location::PZONE | Location::MMZONE | Location::EMZONE | Location::STZONE;
        if !destination.intersects(field) || positions.is_empty() {
            return;
        }
        let state = self.state();
        let current = state.card(target).current;
        if destination.contains(Location::PZONE)
            && current.location == Location::SZONE
            && current.pzone
            && playerid == current.controller
        {
            return;
        }
        if destination == current.location && playerid == current.controller {
            return;
        }
        let to = expand_alias(destination, zone);
        let param = &mut state.card_mut(target).to_field_param;
        param.move_player = move_player;
        param.playerid = playerid;
        param.location = to.location;
        param.positions = positions;
        param.zone = to.zone;
        param.pzone = to.pzone;
        self.push_process(Process::MoveToField(MoveToField::new(target, enable, ret, to.pzone, to.zone, rule, location_reason, confirm)));
    }

    /// Change positions by current position: face-up attack cards go to
    /// `au`, face-down attack to `ad`, face-up defense to `du`, face-down
    /// defense to `dd`.
    #[allow(clippy::too_many_arguments)]
    fn change_position(
        &mut self,
        targets: CardSet,
        reason_effect: Option<EffectId>,
        reason_player: PlayerId,
        au: Position,
        ad: Position,
        du: Position,
        dd: Position,
        noflip: bool,
        enable: bool,
    ) {
        let state = self.state();
        for card in targets.iter().copied() {
            let c = state.card_mut(card);
            let pos = c.current.position;
            c.position_param = if pos == Position::FACEUP_ATTACK {
                au
            } else if pos == Position::FACEDOWN_DEFENSE {
                dd
            } else if pos == Position::FACEUP_DEFENSE {
                du
            } else {
                ad
            };
            c.position_noflip = noflip;
        }
        let group = state.groups.create_readonly(targets);
        self.push_process(Process::ChangePos(ChangePos::new(group, reason_effect, reason_player, enable)));
    }

    fn change_position_to(
        &mut self,
        target: CardId,
        reason_effect: Option<EffectId>,
        reason_player: PlayerId,
        position: Position,
        noflip: bool,
        enable: bool,
    ) {
        let state = self.state();
        let c = state.card_mut(target);
        c.position_param = position;
        c.position_noflip = noflip;
        let group = state.groups.create_readonly(CardSet::from([target]));
        self.push_process(Process::ChangePos(ChangePos::new(group, reason_effect, reason_player, enable)));
    }

    /// Special summon a batch of cards in one action. Position restrictions
    /// from player effects are applied when each card is placed.
    #[allow(clippy::too_many_arguments)]
    fn special_summon(
        &mut self,
        targets: CardSet,
        sumtype: u32,
        sumplayer: PlayerId,
        playerid: PlayerId,
        nocheck: bool,
        nolimit: bool,
        positions: Position,
        zone: u32,
    ) {
        let state = self.state();
        let (reason_effect, reason_player) = (state.core.reason_effect, state.core.reason_player);
        for card in targets.iter().copied() {
            prepare_special_summon(state, card, sumtype, sumplayer, playerid, nocheck, nolimit, positions);
        }
        let group = state.groups.create_readonly(targets);
        self.push_process(Process::SpSummon(SpSummon::new(reason_effect, reason_player, group, zone)));
    }

    /// Place one card as part of a summon completed later with
    /// [`Actions::special_summon_complete`].
    #[allow(clippy::too_many_arguments)]
    fn special_summon_step(
        &mut self,
        target: CardId,
        sumtype: u32,
        sumplayer: PlayerId,
        playerid: PlayerId,
        nocheck: bool,
        nolimit: bool,
        positions: Position,
        zone: u32,
    ) {
        let state = self.state();
        prepare_special_summon(state, target, sumtype, sumplayer, playerid, nocheck, nolimit, positions);
        self.push_process(Process::SpSummonStep(SpSummonStep::new(None, target, zone)));
    }

    fn special_summon_complete(&mut self, reason_effect: Option<EffectId>, reason_player: PlayerId) {
        let state = self.state();
        let cards = std::mem::take(&mut state.core.special_summoning);
        let group = state.groups.create_readonly(cards);
        self.push_frame(Frame::at(
            1,
            Process::SpSummon(SpSummon::new(reason_effect, reason_player, group, 0)),
        ));
    }

    fn special_summon_rule(&mut self, sumplayer: PlayerId, target: CardId, summon_type: u32) {
        self.push_process(Process::SpSummonRule(SpSummonRule::new(sumplayer, target, summon_type)));
    }

    fn special_summon_rule_group(&mut self, sumplayer: PlayerId, summon_type: u32) {
        self.push_process(Process::SpSummonRuleGroup(SpSummonRuleGroup::new(sumplayer, summon_type)));
    }

    fn summon(&mut self, sumplayer: PlayerId, target: CardId, proc: Option<EffectId>, ignore_count: bool, min_tribute: u32, zone: u32) {
        self.push_process(Process::SummonRule(SummonRule::new(sumplayer, target, proc, ignore_count, min_tribute, zone)));
    }

    fn mset(&mut self, setplayer: PlayerId, target: CardId, proc: Option<EffectId>, ignore_count: bool, min_tribute: u32, zone: u32) {
        self.push_process(Process::MonsterSet(MonsterSet::new(setplayer, target, proc, ignore_count, min_tribute, zone)));
    }

    fn flip_summon(&mut self, sumplayer: PlayerId, target: CardId) {
        self.push_process(Process::FlipSummon(FlipSummon::new(sumplayer, target)));
    }

    fn spell_set(&mut self, setplayer: PlayerId, target: CardId, toplayer: PlayerId, confirm: bool) {
        self.push_process(Process::SpellSet(SpellSet::new(setplayer, target, toplayer, confirm)));
    }

    fn spell_set_group(&mut self, setplayer: PlayerId, targets: CardSet, toplayer: PlayerId, confirm: bool) {
        let group = self.state().groups.create_readonly(targets);
        self.push_process(Process::SpellSetGroup(SpellSetGroup::new(setplayer, group, toplayer, confirm)));
    }

    fn draw(&mut self, reason_effect: Option<EffectId>, reason: Reason, reason_player: PlayerId, player: PlayerId, count: u32) {
        self.push_process(Process::Draw(Draw::new(reason_effect, reason, reason_player, player, count)));
    }

    fn discard_deck(&mut self, player: PlayerId, count: u32, reason: Reason) {
        self.push_process(Process::DiscardDeck(DiscardDeck::new(player, count, reason)));
    }

    /// Battle damage is credited to the battling card, anything else to the
    /// effect.
    #[allow(clippy::too_many_arguments)]
    fn damage(
        &mut self,
        reason_effect: Option<EffectId>,
        reason: Reason,
        reason_player: PlayerId,
        reason_card: Option<CardId>,
        player: PlayerId,
        amount: u32,
        is_step: bool,
    ) {
        let (reason_effect, reason_card) = if reason.contains(Reason::BATTLE) {
            (None, reason_card)
        } else {
            (reason_effect, None)
        };
        self.push_process(Process::Damage(Damage::new(
            reason_effect,
            reason,
            reason_player,
            reason_card,
            player,
            amount,
            is_step,
        )));
    }

    fn recover(&mut self, reason_effect: Option<EffectId>, reason: Reason, reason_player: PlayerId, player: PlayerId, amount: u32, is_step: bool) {
        self.push_process(Process::Recover(Recover::new(reason_effect, reason, reason_player, player, amount, is_step)));
    }

    /// Run the damage and recovery deferred by `is_step` actions.
    fn flush_recover_damage(&mut self) {
        let frames = std::mem::take(&mut self.state().core.recover_damage_reserve);
        for frame in frames {
            self.push_frame(frame);
        }
    }

    fn pay_lp_cost(&mut self, player: PlayerId, cost: u32) {
        self.push_process(Process::PayLpCost(PayLpCost::new(player, cost)));
    }

    fn equip(&mut self, equip_player: PlayerId, equip_card: CardId, target: CardId, faceup: bool, is_step: bool) {
        self.push_process(Process::Equip(Equip::new(equip_player, equip_card, target, faceup, is_step)));
    }

    #[allow(clippy::too_many_arguments)]
    fn get_control(
        &mut self,
        targets: CardSet,
        reason_effect: Option<EffectId>,
        chose_player: PlayerId,
        playerid: PlayerId,
        reset_phase: u32,
        reset_count: u32,
        zone: u32,
    ) {
        let group = self.state().groups.create_readonly(targets);
        self.push_process(Process::GetControl(GetControl::new(
            reason_effect,
            chose_player,
            group,
            playerid,
            reset_phase,
            reset_count,
            zone,
        )));
    }

    fn swap_control(
        &mut self,
        reason_effect: Option<EffectId>,
        reason_player: PlayerId,
        targets1: CardSet,
        targets2: CardSet,
        reset_phase: u32,
        reset_count: u32,
    ) {
        let state = self.state();
        let g1 = state.groups.create_readonly(targets1);
        let g2 = state.groups.create_readonly(targets2);
        self.push_process(Process::SwapControl(SwapControl::new(
            reason_effect,
            reason_player,
            g1,
            g2,
            reset_phase,
            reset_count,
        )));
    }

    /// Hand monsters whose control claim ran out back to their rightful
    /// controller. Returns whether any needed it.
    fn adjust_control(&mut self) -> bool {
        if !self.state().collect_control_adjust() {
            return false;
        }
        self.push_process(Process::ControlAdjust(ControlAdjust::new()));
        true
    }

    fn xyz_overlay(&mut self, target: CardId, materials: CardSet, send_materials_to_grave: bool) {
        let group = self.state().groups.create_readonly(materials);
        self.push_process(Process::XyzOverlay(XyzOverlay::new(target, group, send_materials_to_grave)));
    }

    /// Remove counters from `card`, or (with no card) from any card on the
    /// sides `own`/`opponent` of `player`.
    #[allow(clippy::too_many_arguments)]
    fn remove_counter(
        &mut self,
        reason: Reason,
        card: Option<CardId>,
        player: PlayerId,
        own: bool,
        opponent: bool,
        counter_type: u16,
        count: u16,
    ) {
        self.push_process(Process::RemoveCounter(RemoveCounter::new(
            reason,
            card,
            player,
            own,
            opponent,
            counter_type,
            count,
        )));
    }

    /// Detach between `min` and `max` overlay materials, either from the
    /// monsters of `group` or from every monster on the chosen sides.
    #[allow(clippy::too_many_arguments)]
    fn remove_overlay_card(
        &mut self,
        reason: Reason,
        group: Option<CardSet>,
        player: PlayerId,
        own: bool,
        opponent: bool,
        min: u32,
        max: u32,
    ) {
        let group = group.map(|cards| self.state().groups.create_readonly(cards));
        self.push_process(Process::RemoveOverlay(RemoveOverlay::new(reason, group, player, own, opponent, min, max)));
    }

    /// Offer every continuous replacement effect of `effect_code` a chance to
    /// take over the action on `targets`; the turn player's effects go first.
    fn operation_replace(&mut self, effect_code: u32, step: u16, targets: GroupId) {
        let state = self.state();
        let is_destroy = effect_code == crate::codes::effect::DESTROY_REPLACE;
        let turn_player = state.turn_player;
        let effects = state.continuous_effects.get(&effect_code).cloned().unwrap_or_default();
        let (own, other): (Vec<EffectId>, Vec<EffectId>) = effects
            .into_iter()
            .partition(|e| state.effect_handler_player(*e) == turn_player);
        for effect in own.into_iter().chain(other) {
            self.push_frame(Frame::at(
                step,
                Process::OperationReplace(OperationReplace::new(effect, targets, None, is_destroy)),
            ));
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn select_tribute_cards(
        &mut self,
        target: Option<CardId>,
        player: PlayerId,
        cancelable: bool,
        min: u32,
        max: u32,
        toplayer: PlayerId,
        zone: u32,
    ) {
        self.push_process(Process::SelectTribute(SelectTribute::new(target, player, cancelable, min, max, toplayer, zone)));
    }

    /// Pick cards to release from the pools filled by
    /// [`Ctx::release_list`]; with `check_field`, at least one released
    /// monster must free a zone for `to_check` when none is open.
    #[allow(clippy::too_many_arguments)]
    fn select_release_cards(
        &mut self,
        player: PlayerId,
        cancelable: bool,
        min: u32,
        max: u32,
        check_field: bool,
        to_check: Option<CardId>,
        toplayer: PlayerId,
        zone: u32,
    ) {
        self.push_process(Process::SelectRelease(SelectRelease::new(
            player,
            cancelable,
            min,
            max,
            check_field,
            to_check,
            toplayer,
            zone,
        )));
    }

    fn toss_coin(&mut self, reason_effect: Option<EffectId>, reason_player: PlayerId, player: PlayerId, count: u8) {
        self.push_process(Process::TossCoin(TossCoin::new(reason_effect, reason_player, player, count)));
    }

    fn toss_dice(&mut self, reason_effect: Option<EffectId>, reason_player: PlayerId, player: PlayerId, count1: u8, count2: u8) {
        self.push_process(Process::TossDice(TossDice::new(reason_effect, reason_player, player, count1, count2)));
    }

    fn activate_effect(&mut self, effect: EffectId) {
        self.push_process(Process::ActivateEffect(ActivateEffect::new(effect)));
    }
}

/// Record summon info and the pending reason of a card about to be special
/// summoned.
#[allow(clippy::too_many_arguments)]
fn prepare_special_summon(
    state: &mut DuelState,
    card: CardId,
    sumtype: u32,
    sumplayer: PlayerId,
    playerid: PlayerId,
    nocheck: bool,
    nolimit: bool,
    positions: Position,
) {
    let (reason_effect, reason_player) = (state.core.reason_effect, state.core.reason_player);
    let c = state.card_mut(card);
    c.stash_reason();
    c.summon.summon_type = (sumtype & 0xf00ffff) | summon_type::SPECIAL;
    c.summon.location = c.current.location;
    c.summon.sequence = c.current.sequence;
    c.summon.pzone = c.current.pzone;
    c.summon.player = sumplayer;
    c.current.reason = Reason::SPSUMMON;
    c.current.reason_effect = reason_effect;
    c.current.reason_player = reason_player;
    c.spsummon_param.playerid = playerid;
    c.spsummon_param.nocheck = nocheck;
    c.spsummon_param.nolimit = nolimit;
    c.spsummon_param.positions = positions;
}

impl Actions for Ctx<'_> {
    fn state(&mut self) -> &mut DuelState {
        self.state
    }

    fn push_frame(&mut self, frame: Frame) {
        Ctx::push_frame(self, frame);
    }
}

impl Actions for Scope<'_> {
    fn state(&mut self) -> &mut DuelState {
        self.state
    }

    fn push_frame(&mut self, frame: Frame) {
        self.queue.push(frame);
    }
}

/// Mark `targets` for destruction and freeze them into a group. Cards
/// already being destroyed are dropped unless a substitute just saved them.
#[allow(clippy::too_many_arguments)]
fn prepare_destroy(
    state: &mut DuelState,
    mut targets: CardSet,
    reason_effect: Option<EffectId>,
    reason: Reason,
    reason_player: PlayerId,
    playerid: PlayerId,
    destination: Location,
    sequence: u32,
) -> GroupId {
    let canceled = state.core.destroy_canceled.clone();
    targets.retain(|c| !state.card(*c).get_status(Status::DESTROY_CONFIRMED) || canceled.contains(c));
    let destination = if destination.intersects(Location::HAND | Location::DECK | Location::REMOVED) {
        destination
    } else {
        Location::GRAVE
    };
    for card in targets.iter().copied() {
        let c = state.card_mut(card);
        c.temp.reason = c.current.reason;
        c.current.reason = reason;
        if reason_player != PLAYER_SELFDES {
            c.temp.reason_effect = c.current.reason_effect;
            c.temp.reason_player = c.current.reason_player;
            if reason_effect.is_some() {
                c.current.reason_effect = reason_effect;
            }
            c.current.reason_player = reason_player;
        }
        let p = if playerid.is_none() || destination.intersects(Location::GRAVE | Location::REMOVED) {
            c.owner
        } else {
            playerid
        };
        c.set_status(Status::DESTROY_CONFIRMED, true);
        c.sendto_param = SendToParam::new(p, Position::FACEUP, destination, sequence);
    }
    state.groups.create_readonly(targets)
}
