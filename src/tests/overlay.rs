use super::harness::{CallKind, DuelScript, ScriptedHost, monster};
use crate::actions::Actions;
use crate::codes::{effect as code, event};
use crate::decision::{Response, SelectRequest};
use crate::effect::{Effect, EffectType};
use crate::flags::{Position, Reason};
use crate::group::CardSet;
use crate::ids::{CardId, PlayerId};
use crate::message::Message;
use crate::options::DuelOptions;
use crate::script::ScriptRef;
use crate::zone::Location;

const P0: PlayerId = PlayerId::ZERO;
const SPELL_COUNTER: u16 = 0x1;

fn with_counters(script: &mut DuelScript, sequence: u32, count: u16) -> CardId {
    let card = script.monster_at(P0, sequence);
    script.state_mut().card_mut(card).counters.insert(SPELL_COUNTER, count);
    card
}

fn removed_counters(script: &DuelScript) -> Vec<(u32, u16)> {
    script
        .messages()
        .iter()
        .filter_map(|m| match m {
            Message::RemoveCounter { sequence, count, .. } => Some((u32::from(*sequence), *count)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_remove_counter_from_a_card() {
    let mut script = DuelScript::new();
    let card = with_counters(&mut script, 2, 3);

    script
        .duel
        .remove_counter(Reason::COST, Some(card), P0, true, false, SPELL_COUNTER, 2);
    script.settle();

    assert_eq!(script.state().returns.get(0), 1);
    assert_eq!(script.state().card(card).counter(SPELL_COUNTER), 1);
    assert_eq!(removed_counters(&script), vec![(2, 2)]);
    // Nothing to choose between.
    assert!(script.requests.is_empty());
}

#[test]
fn test_remove_counter_spread_over_the_field() {
    let mut script = DuelScript::new();
    let a = with_counters(&mut script, 0, 1);
    let b = with_counters(&mut script, 3, 2);

    script.duel.remove_counter(Reason::COST, None, P0, true, false, SPELL_COUNTER, 2);
    script.settle();

    assert!(matches!(
        script.requests.as_slice(),
        [SelectRequest::Counter { count: 2, cards, .. }] if cards.len() == 2
    ));
    assert_eq!(script.state().card(a).counter(SPELL_COUNTER), 0);
    assert!(script.state().card(a).counters.is_empty());
    assert_eq!(script.state().card(b).counter(SPELL_COUNTER), 1);
    assert_eq!(removed_counters(&script), vec![(0, 1), (3, 1)]);
    assert!(
        script
            .batch_events()
            .contains(&(event::REMOVE_COUNTER + u32::from(SPELL_COUNTER)))
    );
    assert_eq!(script.state().returns.get(0), 1);
}

/// A field effect offering to stand in for removing spell counters.
fn counter_replacement(script: &mut DuelScript) -> CardId {
    let holder = script.monster_at(P0, 4);
    script.state_mut().add_effect(
        Effect::builder(
            code::RCOUNTER_REPLACE + u32::from(SPELL_COUNTER),
            EffectType::FIELD | EffectType::CONTINUOUS,
        )
        .handler(holder)
        .range(Location::MZONE)
        .operation(ScriptRef(50))
        .build(),
    );
    holder
}

#[test]
fn test_counter_replacement_accepted() {
    let host = ScriptedHost::new();
    let log = host.log();
    let mut script = DuelScript::with_host(DuelOptions::default(), host);
    let card = with_counters(&mut script, 0, 3);
    let holder = counter_replacement(&mut script);

    script
        .duel
        .remove_counter(Reason::COST, Some(card), P0, true, false, SPELL_COUNTER, 2);
    let request = script.run_to_request();
    assert!(matches!(
        request,
        SelectRequest::EffectYesNo { player, card, .. } if player == P0 && card == holder
    ));
    script.answer(Response::YesNo(true));
    script.settle();

    assert!(log.borrow().contains(&(CallKind::Operation, ScriptRef(50))));
    assert_eq!(script.state().card(card).counter(SPELL_COUNTER), 3);
    assert!(removed_counters(&script).is_empty());
    assert_eq!(script.state().returns.get(0), 1);
}

#[test]
fn test_counter_replacement_declined() {
    let host = ScriptedHost::new();
    let log = host.log();
    let mut script = DuelScript::with_host(DuelOptions::default(), host);
    let card = with_counters(&mut script, 0, 3);
    counter_replacement(&mut script);

    script
        .duel
        .remove_counter(Reason::COST, Some(card), P0, true, false, SPELL_COUNTER, 2);
    script.answer(Response::YesNo(false));
    script.settle();

    assert!(matches!(script.requests.as_slice(), [SelectRequest::EffectYesNo { .. }]));
    assert!(!log.borrow().contains(&(CallKind::Operation, ScriptRef(50))));
    assert_eq!(script.state().card(card).counter(SPELL_COUNTER), 1);
    assert_eq!(removed_counters(&script), vec![(0, 2)]);
}

/// An Xyz monster in zone 0 with `count` materials.
fn xyz_with_materials(script: &mut DuelScript, count: u32) -> (CardId, Vec<CardId>) {
    let x = script.monster_at(P0, 0);
    let materials = (0..count)
        .map(|i| {
            let m = script.card(P0, monster(900 + i, 4), Location::GRAVE);
            script.state_mut().xyz_add(x, m);
            m
        })
        .collect();
    (x, materials)
}

#[test]
fn test_detach_a_material() {
    let mut script = DuelScript::new();
    let (x, materials) = xyz_with_materials(&mut script, 2);

    script
        .duel
        .remove_overlay_card(Reason::COST, Some(CardSet::from([x])), P0, true, false, 1, 1);
    script.settle();

    assert!(matches!(
        script.requests.as_slice(),
        [SelectRequest::Cards { min: 1, max: 1, .. }]
    ));
    assert_eq!(script.state().returns.get(0), 1);
    assert_eq!(script.location(materials[0]), Location::GRAVE);
    assert_eq!(script.state().card(materials[0]).overlay_target, None);
    assert_eq!(script.state().card(x).xyz_materials, vec![materials[1]]);
    assert_eq!(script.location(materials[1]), Location::OVERLAY);
}

#[test]
fn test_detach_more_than_attached_does_nothing() {
    let mut script = DuelScript::new();
    let (x, materials) = xyz_with_materials(&mut script, 1);

    script
        .duel
        .remove_overlay_card(Reason::COST, Some(CardSet::from([x])), P0, true, false, 2, 2);
    script.settle();

    assert_eq!(script.state().returns.get(0), 0);
    assert!(script.requests.is_empty());
    assert!(script.moved_codes().is_empty());
    assert_eq!(script.location(materials[0]), Location::OVERLAY);
    assert_eq!(script.state().card(x).xyz_materials, materials);
}

#[test]
fn test_overlay_field_monsters() {
    let mut script = DuelScript::new();
    let x = script.monster_at(P0, 0);
    let a = script.monster_at(P0, 1);
    let b = script.monster_at(P0, 2);

    script.duel.xyz_overlay(x, CardSet::from([a, b]), false);
    script.settle();

    for m in [a, b] {
        let c = script.state().card(m);
        assert_eq!(c.current.location, Location::OVERLAY);
        assert_eq!(c.overlay_target, Some(x));
        assert!(c.current.reason.contains(Reason::XYZ | Reason::MATERIAL));
    }
    assert_eq!(script.state().card(x).xyz_materials, vec![a, b]);
    let left: Vec<CardId> = script.state().player(P0).occupied(Location::MZONE).into_iter().collect();
    assert_eq!(left, vec![x]);
    assert_eq!(script.moved_codes(), vec![script.code(a), script.code(b)]);
}

#[test]
fn test_overlay_an_xyz_drops_its_materials() {
    let mut script = DuelScript::new();
    let x = script.field(P0, monster(700, 4), Location::MZONE, 3, Position::FACEUP_ATTACK);
    let (inner, inner_materials) = xyz_with_materials(&mut script, 1);

    script.duel.xyz_overlay(x, CardSet::from([inner]), true);
    script.settle();

    assert_eq!(script.location(inner_materials[0]), Location::GRAVE);
    assert_eq!(script.state().card(inner).overlay_target, Some(x));
    assert!(script.state().card(inner).xyz_materials.is_empty());
    assert_eq!(script.state().card(x).xyz_materials, vec![inner]);
}
