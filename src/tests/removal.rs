use super::harness::{CallKind, DuelScript, ScriptedHost, monster};
use crate::actions::Actions;
use crate::codes::{effect as code, event};
use crate::decision::{Response, SelectRequest};
use crate::effect::{Effect, EffectType};
use crate::flags::{Position, Reason, Status};
use crate::group::CardSet;
use crate::ids::{CardId, PlayerId};
use crate::message::Message;
use crate::options::DuelOptions;
use crate::query::Ctx;
use crate::script::{NullScript, ScriptRef};
use crate::zone::Location;

const P0: PlayerId = PlayerId::ZERO;
const P1: PlayerId = PlayerId::ONE;

fn destroy(script: &mut DuelScript, cards: &[CardId]) {
    let targets: CardSet = cards.iter().copied().collect();
    script
        .duel
        .destroy(targets, None, Reason::EFFECT, P1, PlayerId::NONE, Location::GRAVE, 0);
    script.settle();
}

/// Board slots (controller, sequence) the cards in `Move` messages left.
fn moved_slots(script: &DuelScript) -> Vec<(u8, u32)> {
    script
        .messages()
        .iter()
        .filter_map(|m| match m {
            Message::Move { from, .. } => Some((from.controller, from.sequence)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_destroy_moves_in_canonical_order() {
    let slots = [(P0, 4), (P1, 1), (P0, 0), (P0, 2)];
    // The same board built in different orders, so every run hands out
    // different ids for the same slots.
    let builds: [[usize; 4]; 3] = [[0, 1, 2, 3], [2, 3, 0, 1], [3, 1, 0, 2]];
    let mut logs = Vec::new();
    for build in builds {
        let mut script = DuelScript::new();
        let cards: Vec<CardId> = build
            .iter()
            .map(|&i| script.monster_at(slots[i].0, slots[i].1))
            .collect();
        let mut targets = cards.clone();
        targets.reverse();

        destroy(&mut script, &targets);

        assert_eq!(script.state().returns.get(0), 4);
        assert_eq!(script.grave(P0).len(), 3);
        assert_eq!(script.grave(P1).len(), 1);
        logs.push(moved_slots(&script));
    }
    assert_eq!(logs[0], vec![(0, 0), (0, 2), (0, 4), (1, 1)]);
    assert!(logs.iter().all(|log| *log == logs[0]));
}

#[test]
fn test_destroy_order_follows_turn_player() {
    let mut script = DuelScript::new();
    let ours = script.monster_at(P0, 0);
    let theirs = script.monster_at(P1, 0);
    script.state_mut().turn_player = P1;

    destroy(&mut script, &[ours, theirs]);

    assert_eq!(script.moved_codes(), vec![script.code(theirs), script.code(ours)]);
}

#[test]
fn test_destroy_raises_destroy_then_destroyed() {
    let mut script = DuelScript::new();
    let card = script.monster_at(P0, 0);
    destroy(&mut script, &[card]);

    let events = script.batch_events();
    let destroy_at = events.iter().position(|c| *c == event::DESTROY);
    let destroyed_at = events.iter().position(|c| *c == event::DESTROYED);
    assert!(destroy_at.is_some());
    assert!(destroy_at < destroyed_at);
    let c = script.state().card(card);
    assert!(c.current.reason.contains(Reason::DESTROY | Reason::EFFECT));
    assert!(!c.get_status(Status::DESTROY_CONFIRMED));
}

#[test]
fn test_indestructible_card_stays() {
    let mut script = DuelScript::new();
    let card = script.monster_at(P0, 0);
    script.state_mut().add_effect(
        Effect::builder(code::INDESTRUCTABLE, EffectType::SINGLE)
            .handler(card)
            .value(1)
            .build(),
    );

    destroy(&mut script, &[card]);

    assert_eq!(script.location(card), Location::MZONE);
    assert_eq!(script.state().returns.get(0), 0);
    assert!(script.moved_codes().is_empty());
    assert!(!script.state().card(card).get_status(Status::DESTROY_CONFIRMED));
}

#[test]
fn test_substitute_beats_indestructible() {
    let mut script = DuelScript::new();
    let protected = script.monster_at(P0, 0);
    let substitute = script.monster_at(P0, 1);
    script.state_mut().add_effect(
        Effect::builder(code::INDESTRUCTABLE, EffectType::SINGLE)
            .handler(protected)
            .value(1)
            .build(),
    );
    script.state_mut().add_effect(
        Effect::builder(code::DESTROY_SUBSTITUTE, EffectType::FIELD)
            .handler(substitute)
            .range(Location::MZONE)
            .target_range(Location::MZONE, Location::empty())
            .value(1)
            .build(),
    );

    destroy(&mut script, &[protected]);

    assert_eq!(script.location(protected), Location::MZONE);
    assert_eq!(script.location(substitute), Location::GRAVE);
    assert_eq!(script.moved_codes(), vec![script.code(substitute)]);
    let sub = script.state().card(substitute);
    assert!(sub.current.reason.contains(Reason::REPLACE));
    // The substitute is not counted as operated.
    assert_eq!(script.state().returns.get(0), 0);
    assert!(!script.state().card(protected).get_status(Status::DESTROY_CONFIRMED));
}

#[test]
fn test_destroy_to_hand_destination() {
    let mut script = DuelScript::new();
    let card = script.monster_at(P1, 3);
    script
        .duel
        .destroy(CardSet::from([card]), None, Reason::EFFECT, P0, PlayerId::NONE, Location::HAND, 0);
    script.settle();
    assert_eq!(script.location(card), Location::HAND);
    assert_eq!(script.hand(P1), &[card]);
}

fn fill_release_pool(script: &mut DuelScript, player: PlayerId) -> u32 {
    let mut host = NullScript;
    let mut ctx = Ctx::new(&mut script.duel.state, &mut host);
    ctx.release_list(player, Reason::COST)
}

#[test]
fn test_canceled_release_selection_releases_nothing() {
    let mut script = DuelScript::new();
    let a = script.monster_at(P0, 0);
    let b = script.monster_at(P0, 1);
    assert_eq!(fill_release_pool(&mut script, P0), 2);

    script.duel.select_release_cards(P0, true, 2, 2, false, None, P0, 0xff);
    let request = script.run_to_request();
    assert!(matches!(
        request,
        SelectRequest::Cards {
            cancelable: true,
            min: 2,
            max: 2,
            ..
        }
    ));
    script.duel.respond(Response::Cancel).unwrap();
    script.settle();

    assert!(script.state().return_cards.canceled);
    assert!(script.state().return_cards.list.is_empty());
    assert_eq!(script.location(a), Location::MZONE);
    assert_eq!(script.location(b), Location::MZONE);
    assert!(script.grave(P0).is_empty());
    assert!(script.moved_codes().is_empty());
}

#[test]
fn test_release_selection_then_release() {
    let mut script = DuelScript::new();
    let a = script.monster_at(P0, 0);
    let b = script.monster_at(P0, 1);
    fill_release_pool(&mut script, P0);

    script.duel.select_release_cards(P0, true, 2, 2, false, None, P0, 0xff);
    script.answer(Response::Cards(vec![b, a]));
    script.settle();

    let chosen: CardSet = script.state().return_cards.list.iter().copied().collect();
    assert_eq!(chosen.len(), 2);
    script.duel.release(chosen, None, Reason::COST, P0);
    script.settle();

    assert_eq!(script.state().returns.get(0), 2);
    assert_eq!(script.location(a), Location::GRAVE);
    assert_eq!(script.location(b), Location::GRAVE);
    assert!(script.state().card(a).current.reason.contains(Reason::RELEASE | Reason::COST));
}

#[test]
fn test_release_selection_rejects_short_answer() {
    let mut script = DuelScript::new();
    let a = script.monster_at(P0, 0);
    script.monster_at(P0, 1);
    fill_release_pool(&mut script, P0);

    script.duel.select_release_cards(P0, false, 2, 2, false, None, P0, 0xff);
    script.run_to_request();
    assert!(script.duel.respond(Response::Cards(vec![a])).is_err());
    assert!(script.duel.respond(Response::Cancel).is_err());
    // Still waiting on the same request.
    assert!(script.duel.pending().is_some());
}

#[test]
fn test_send_to_deck_top_and_banish() {
    let mut script = DuelScript::new();
    let on_field = script.monster_at(P0, 2);
    let in_grave = script.card(P0, monster(77, 4), Location::GRAVE);

    script.duel.send_to(
        CardSet::from([in_grave]),
        None,
        Reason::EFFECT,
        P0,
        PlayerId::NONE,
        Location::REMOVED,
        0,
        Position::FACEUP,
        false,
    );
    script.settle();
    assert_eq!(script.location(in_grave), Location::REMOVED);

    script.duel.send_to(
        CardSet::from([on_field]),
        None,
        Reason::EFFECT,
        P0,
        PlayerId::NONE,
        Location::HAND,
        0,
        Position::FACEUP,
        false,
    );
    script.settle();
    assert_eq!(script.location(on_field), Location::HAND);
    assert!(matches!(
        script.messages().last(),
        Some(Message::Move { to, .. }) if u32::from(to.location) == Location::HAND.bits()
    ));
}

fn replacement_host() -> ScriptedHost {
    ScriptedHost::new().operation(ScriptRef(41), |scope, _| {
        scope.damage(None, Reason::EFFECT, P0, None, P0, 100, false);
    })
}

#[test]
fn test_battle_destroy() {
    let mut script = DuelScript::new();
    let loser = script.monster_at(P1, 0);

    script.duel.destroy_by_battle(CardSet::from([loser]), P0);
    script.settle();

    assert_eq!(script.location(loser), Location::GRAVE);
    let c = script.state().card(loser);
    assert!(c.current.reason.contains(Reason::BATTLE | Reason::DESTROY));
    assert_eq!(script.state().returns.get(0), 1);
    let events = script.batch_events();
    assert!(events.contains(&event::DESTROY));
    // Battle losses are not "destroyed" by an effect.
    assert!(!events.contains(&event::DESTROYED));
}

#[test]
fn test_battle_destroy_replacement_is_deferred() {
    let host = replacement_host();
    let log = host.log();
    let mut script = DuelScript::with_host(DuelOptions::default(), host);
    let saved = script.monster_at(P0, 0);
    let lost = script.monster_at(P0, 1);
    script.state_mut().add_effect(
        Effect::builder(code::DESTROY_REPLACE, EffectType::SINGLE | EffectType::CONTINUOUS)
            .handler(saved)
            .target(ScriptRef(40))
            .operation(ScriptRef(41))
            .build(),
    );

    script.duel.destroy_by_battle(CardSet::from([saved, lost]), P1);
    script.settle();

    assert_eq!(script.location(saved), Location::MZONE);
    assert_eq!(script.location(lost), Location::GRAVE);
    assert!(!script.state().card(saved).current.reason.contains(Reason::DESTROY));
    assert!(!script.state().card(saved).get_status(Status::DESTROY_CONFIRMED));
    assert_eq!(script.lp(P0), 7900);
    assert_eq!(script.moved_codes(), vec![script.code(lost)]);
    assert_eq!(script.state().returns.get(0), 1);
    assert!(script.state().core.desrep_chain.is_empty());
    assert!(script.state().core.continuous_chain.is_empty());
    let calls = log.borrow();
    let target_at = calls.iter().position(|c| *c == (CallKind::Target, ScriptRef(40)));
    let operation_at = calls.iter().position(|c| *c == (CallKind::Operation, ScriptRef(41)));
    assert!(target_at.is_some());
    assert!(target_at < operation_at);
}

#[test]
fn test_battle_destroy_replacement_that_cannot_apply() {
    let host = replacement_host().condition(ScriptRef(42), |_, _| false);
    let log = host.log();
    let mut script = DuelScript::with_host(DuelOptions::default(), host);
    let card = script.monster_at(P0, 0);
    script.state_mut().add_effect(
        Effect::builder(code::DESTROY_REPLACE, EffectType::SINGLE | EffectType::CONTINUOUS)
            .handler(card)
            .condition(ScriptRef(42))
            .target(ScriptRef(40))
            .operation(ScriptRef(41))
            .build(),
    );

    script.duel.destroy_by_battle(CardSet::from([card]), P1);
    script.settle();

    assert_eq!(script.location(card), Location::GRAVE);
    assert_eq!(script.lp(P0), 8000);
    let calls = log.borrow();
    assert!(!calls.contains(&(CallKind::Target, ScriptRef(40))));
    assert!(!calls.contains(&(CallKind::Operation, ScriptRef(41))));
}

#[test]
fn test_battle_substitute_is_destroyed_instead() {
    let mut script = DuelScript::new();
    let protected = script.monster_at(P0, 0);
    let substitute = script.monster_at(P0, 1);
    script.state_mut().add_effect(
        Effect::builder(code::DESTROY_SUBSTITUTE, EffectType::FIELD)
            .handler(substitute)
            .range(Location::MZONE)
            .target_range(Location::MZONE, Location::empty())
            .value(1)
            .build(),
    );

    script.duel.destroy_by_battle(CardSet::from([protected]), P1);
    script.settle();

    assert_eq!(script.location(protected), Location::MZONE);
    assert_eq!(script.location(substitute), Location::GRAVE);
    assert!(script.state().card(substitute).current.reason.contains(Reason::REPLACE));
    assert!(script.state().core.battle_destroy_rep.is_empty());
    assert_eq!(script.state().returns.get(0), 0);
}
