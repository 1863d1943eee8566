use super::harness::{CallKind, DuelScript, ScriptedHost};
use crate::actions::Actions;
use crate::codes::{COIN_HEADS, COIN_TAILS, effect as code, event};
use crate::effect::{Effect, EffectType};
use crate::flags::Reason;
use crate::group::CardSet;
use crate::ids::PlayerId;
use crate::message::Message;
use crate::options::DuelOptions;
use crate::script::ScriptRef;
use crate::zone::Location;

const P0: PlayerId = PlayerId::ZERO;
const P1: PlayerId = PlayerId::ONE;

fn coin_results(seed: u64) -> Vec<u8> {
    let mut script = DuelScript::with_options(DuelOptions::default().with_seed(seed));
    script.duel.toss_coin(None, PlayerId::NONE, P0, 8);
    script.settle();
    script.state().core.coin_results.clone()
}

#[test]
fn test_coin_tosses_follow_the_seed() {
    let first = coin_results(42);
    assert_eq!(first.len(), 8);
    assert!(first.iter().all(|&r| r == COIN_HEADS || r == COIN_TAILS));
    assert_eq!(first, coin_results(42));
}

#[test]
fn test_dice_stay_in_range() {
    let mut script = DuelScript::with_options(DuelOptions::default().with_seed(7));
    script.duel.toss_dice(None, PlayerId::NONE, P0, 3, 2);
    script.settle();

    let results = &script.state().core.dice_results;
    assert_eq!(results.len(), 5);
    assert!(results.iter().all(|r| (1..=6).contains(r)));
    let rolls: Vec<(PlayerId, usize)> = script
        .messages()
        .iter()
        .filter_map(|m| match m {
            Message::TossDice { player, results } => Some((*player, results.len())),
            _ => None,
        })
        .collect();
    assert_eq!(rolls, vec![(P0, 3), (P1, 2)]);
}

#[test]
fn test_coin_choose_effect_picks_results() {
    let host = ScriptedHost::new().operation(ScriptRef(1), |scope, _| {
        scope.state.core.coin_results = vec![COIN_HEADS];
    });
    let log = host.log();
    let mut script = DuelScript::with_host(DuelOptions::default(), host);
    let chooser = script.monster_at(P0, 0);
    script.state_mut().add_effect(
        Effect::builder(code::TOSS_COIN_CHOOSE, EffectType::FIELD | EffectType::CONTINUOUS)
            .handler(chooser)
            .range(Location::MZONE)
            .operation(ScriptRef(1))
            .build(),
    );

    script.duel.toss_coin(None, PlayerId::NONE, P0, 3);
    script.settle();

    // Unchosen results fall back to tails.
    assert_eq!(script.state().core.coin_results, vec![COIN_HEADS, COIN_TAILS, COIN_TAILS]);
    assert!(log.borrow().contains(&(CallKind::Operation, ScriptRef(1))));
    assert_eq!(
        script.messages(),
        &[Message::TossCoin {
            player: P0,
            results: vec![COIN_HEADS, COIN_TAILS, COIN_TAILS],
        }]
    );
}

#[test]
fn test_coin_choose_effect_out_of_range_is_ignored() {
    let host = ScriptedHost::new().operation(ScriptRef(1), |scope, _| {
        scope.state.core.coin_results = vec![COIN_HEADS; 3];
    });
    let log = host.log();
    let mut script = DuelScript::with_host(DuelOptions::default().with_seed(3), host);
    let chooser = script.card(P0, super::harness::monster(20, 4), Location::GRAVE);
    script.state_mut().add_effect(
        Effect::builder(code::TOSS_COIN_CHOOSE, EffectType::FIELD | EffectType::CONTINUOUS)
            .handler(chooser)
            .range(Location::MZONE)
            .operation(ScriptRef(1))
            .build(),
    );

    script.duel.toss_coin(None, PlayerId::NONE, P0, 3);
    script.settle();

    assert!(log.borrow().iter().all(|(kind, _)| *kind != CallKind::Operation));
    assert_eq!(script.state().core.coin_results.len(), 3);
}

fn ignition(script: &mut DuelScript, handler: crate::ids::CardId) -> crate::ids::EffectId {
    script.state_mut().add_effect(
        Effect::builder(0, EffectType::IGNITION)
            .handler(handler)
            .range(Location::MZONE)
            .condition(ScriptRef(10))
            .operation(ScriptRef(11))
            .count_limit(1)
            .build(),
    )
}

fn burn_host(allowed: bool) -> ScriptedHost {
    ScriptedHost::new()
        .condition(ScriptRef(10), move |_, _| allowed)
        .operation(ScriptRef(11), |scope, _| {
            scope.damage(None, Reason::EFFECT, P0, None, P1, 500, false);
        })
}

#[test]
fn test_activated_effect_resolves_as_a_chain() {
    let mut script = DuelScript::with_host(DuelOptions::default(), burn_host(true));
    let card = script.monster_at(P0, 0);
    let effect = ignition(&mut script, card);

    script.duel.activate_effect(effect);
    script.settle();

    assert_eq!(script.lp(P1), 7500);
    let kinds: Vec<&'static str> = script
        .messages()
        .iter()
        .filter_map(|m| match m {
            Message::Chaining { chain_count, .. } => {
                assert_eq!(*chain_count, 1);
                Some("chaining")
            }
            Message::ChainSolving { .. } => Some("solving"),
            Message::Damage { .. } => Some("damage"),
            Message::ChainSolved { .. } => Some("solved"),
            Message::ChainEnd => Some("end"),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec!["chaining", "solving", "damage", "solved", "end"]);
    assert!(script.state().core.current_chain.is_empty());
}

#[test]
fn test_count_limit_stops_a_second_activation() {
    let mut script = DuelScript::with_host(DuelOptions::default(), burn_host(true));
    let card = script.monster_at(P0, 0);
    let effect = ignition(&mut script, card);

    script.duel.activate_effect(effect);
    script.settle();
    script.duel.activate_effect(effect);
    script.settle();

    assert_eq!(script.lp(P1), 7500);
}

#[test]
fn test_failed_condition_blocks_activation() {
    let host = burn_host(false);
    let log = host.log();
    let mut script = DuelScript::with_host(DuelOptions::default(), host);
    let card = script.monster_at(P0, 0);
    let effect = ignition(&mut script, card);

    script.duel.activate_effect(effect);
    script.settle();

    assert_eq!(script.lp(P1), 8000);
    assert!(script.messages().is_empty());
    let calls = log.borrow();
    assert!(calls.contains(&(CallKind::Condition, ScriptRef(10))));
    assert!(!calls.contains(&(CallKind::Operation, ScriptRef(11))));
}

#[test]
fn test_operation_can_queue_a_draw() {
    let host = ScriptedHost::new().operation(ScriptRef(11), |scope, _| {
        let credited = scope.state.core.reason_effect;
        scope.draw(credited, Reason::EFFECT, P0, P0, 2);
    });
    let mut script = DuelScript::with_host(DuelOptions::default(), host);
    let deck = script.deck(P0, 3);
    let card = script.monster_at(P0, 0);
    let effect = script.state_mut().add_effect(
        Effect::builder(0, EffectType::IGNITION)
            .handler(card)
            .range(Location::MZONE)
            .operation(ScriptRef(11))
            .build(),
    );

    script.duel.activate_effect(effect);
    script.settle();

    assert_eq!(script.hand(P0).len(), 2);
    assert_eq!(script.location(deck[2]), Location::HAND);
    assert_eq!(script.location(deck[1]), Location::HAND);
    assert_eq!(script.location(deck[0]), Location::DECK);
    let draw = script.state().card(deck[2]);
    assert!(draw.current.reason.contains(Reason::EFFECT | Reason::DRAW));
    assert_eq!(draw.current.reason_effect, Some(effect));
}

fn destroy_one(script: &mut DuelScript, card: crate::ids::CardId) {
    script
        .duel
        .destroy(CardSet::from([card]), None, Reason::EFFECT, P1, PlayerId::NONE, Location::GRAVE, 0);
    script.settle();
}

#[test]
fn test_destroyed_trigger_resolves_after_the_destroy() {
    let host = ScriptedHost::new().operation(ScriptRef(30), |scope, _| {
        scope.damage(None, Reason::EFFECT, P0, None, P1, 500, false);
    });
    let log = host.log();
    let mut script = DuelScript::with_host(DuelOptions::default(), host);
    let card = script.monster_at(P0, 0);
    script.state_mut().add_effect(
        Effect::builder(event::DESTROYED, EffectType::SINGLE | EffectType::TRIGGER_O)
            .handler(card)
            .operation(ScriptRef(30))
            .build(),
    );

    destroy_one(&mut script, card);

    assert_eq!(script.location(card), Location::GRAVE);
    assert_eq!(script.lp(P1), 7500);
    assert!(log.borrow().contains(&(CallKind::Operation, ScriptRef(30))));
    assert!(script.state().core.pending_triggers.is_empty());
    assert!(script.state().core.current_chain.is_empty());
    let kinds: Vec<&'static str> = script
        .messages()
        .iter()
        .filter_map(|m| match m {
            Message::Move { .. } => Some("move"),
            Message::Chaining { .. } => Some("chaining"),
            Message::ChainSolving { .. } => Some("solving"),
            Message::Damage { .. } => Some("damage"),
            Message::ChainSolved { .. } => Some("solved"),
            Message::ChainEnd => Some("end"),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec!["move", "chaining", "solving", "damage", "solved", "end"]);
}

#[test]
fn test_turn_player_trigger_goes_on_the_chain_first() {
    let host = ScriptedHost::new()
        .operation(ScriptRef(30), |scope, _| {
            scope.damage(None, Reason::EFFECT, P0, None, P1, 500, false);
        })
        .operation(ScriptRef(31), |scope, _| {
            scope.damage(None, Reason::EFFECT, P1, None, P0, 300, false);
        });
    let mut script = DuelScript::with_host(DuelOptions::default(), host);
    let victim = script.monster_at(P0, 0);
    let ours = script.monster_at(P0, 1);
    let theirs = script.monster_at(P1, 0);
    // The opponent's trigger is registered first.
    for (handler, operation) in [(theirs, ScriptRef(31)), (ours, ScriptRef(30))] {
        script.state_mut().add_effect(
            Effect::builder(event::DESTROYED, EffectType::FIELD | EffectType::TRIGGER_O)
                .handler(handler)
                .range(Location::MZONE)
                .operation(operation)
                .build(),
        );
    }

    destroy_one(&mut script, victim);

    let chained: Vec<(u32, u32)> = script
        .messages()
        .iter()
        .filter_map(|m| match m {
            Message::Chaining { code, chain_count, .. } => Some((*code, *chain_count)),
            _ => None,
        })
        .collect();
    assert_eq!(chained, vec![(script.code(ours), 1), (script.code(theirs), 2)]);
    // Last in, first out.
    let damaged: Vec<PlayerId> = script
        .messages()
        .iter()
        .filter_map(|m| match m {
            Message::Damage { player, .. } => Some(*player),
            _ => None,
        })
        .collect();
    assert_eq!(damaged, vec![P0, P1]);
    assert_eq!(script.lp(P0), 7700);
    assert_eq!(script.lp(P1), 7500);
}

#[test]
fn test_trigger_rechecked_before_chaining() {
    let mut allowed = true;
    let host = ScriptedHost::new()
        .condition(ScriptRef(32), move |_, _| {
            // Passes when the event is dispatched, fails when the chain is built.
            let now = allowed;
            allowed = false;
            now
        })
        .operation(ScriptRef(30), |scope, _| {
            scope.damage(None, Reason::EFFECT, P0, None, P1, 500, false);
        });
    let log = host.log();
    let mut script = DuelScript::with_host(DuelOptions::default(), host);
    let card = script.monster_at(P0, 0);
    script.state_mut().add_effect(
        Effect::builder(event::DESTROYED, EffectType::SINGLE | EffectType::TRIGGER_O)
            .handler(card)
            .condition(ScriptRef(32))
            .operation(ScriptRef(30))
            .build(),
    );

    destroy_one(&mut script, card);

    assert_eq!(script.lp(P1), 8000);
    assert!(!log.borrow().contains(&(CallKind::Operation, ScriptRef(30))));
    assert!(script.state().core.pending_triggers.is_empty());
    assert!(!script.messages().iter().any(|m| matches!(m, Message::Chaining { .. })));
}
