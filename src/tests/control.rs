use super::harness::DuelScript;
use crate::actions::Actions;
use crate::flags::Reset;
use crate::group::CardSet;
use crate::ids::{CardId, PlayerId};
use crate::message::Message;
use crate::zone::Location;

const P0: PlayerId = PlayerId::ZERO;
const P1: PlayerId = PlayerId::ONE;

/// Phase bit of an "until the end phase" claim.
const END_PHASE: u32 = 0x200;

fn controller(script: &DuelScript, card: CardId) -> PlayerId {
    script.state().card(card).current.controller
}

fn take(script: &mut DuelScript, card: CardId, reset_count: u32) {
    script
        .duel
        .get_control(CardSet::from([card]), None, PlayerId::NONE, P0, END_PHASE, reset_count, 0xff);
    script.settle();
}

#[test]
fn test_take_control_until_the_end_phase() {
    let mut script = DuelScript::new();
    let card = script.monster_at(P1, 2);

    take(&mut script, card, 1);

    assert_eq!(script.state().returns.get(0), 1);
    assert_eq!(controller(&script, card), P0);
    assert_eq!(script.location(card), Location::MZONE);
    assert_eq!(script.state().control_status(card), P0);
    assert!(script.state().player(P1).occupied(Location::MZONE).is_empty());
    // Nothing to hand back while the claim holds.
    assert!(!script.duel.adjust_control());

    script.state_mut().reset_card(card, Reset::PHASE);
    assert_eq!(script.state().control_status(card), P1);
    assert!(script.duel.adjust_control());
    script.settle();

    assert_eq!(controller(&script, card), P1);
    assert_eq!(script.location(card), Location::MZONE);
    assert!(script.state().player(P0).occupied(Location::MZONE).is_empty());
    assert!(script.state().core.control_adjust_set.iter().all(|set| set.is_empty()));
    let moves = script
        .messages()
        .iter()
        .filter(|m| matches!(m, Message::Move { .. }))
        .count();
    assert_eq!(moves, 2);
}

#[test]
fn test_take_control_without_room_destroys() {
    let mut script = DuelScript::new();
    for seq in 0..5 {
        script.monster_at(P0, seq);
    }
    let card = script.monster_at(P1, 0);

    take(&mut script, card, 0);

    assert_eq!(script.state().returns.get(0), 0);
    assert_eq!(script.location(card), Location::GRAVE);
    assert_eq!(script.grave(P1), &[card]);
}

#[test]
fn test_cannot_take_own_monster() {
    let mut script = DuelScript::new();
    let card = script.monster_at(P0, 0);

    take(&mut script, card, 0);

    assert_eq!(script.state().returns.get(0), 0);
    assert!(script.moved_codes().is_empty());
}

#[test]
fn test_swap_control() {
    let mut script = DuelScript::new();
    let ours = script.monster_at(P0, 1);
    let theirs = script.monster_at(P1, 3);

    script
        .duel
        .swap_control(None, P0, CardSet::from([ours]), CardSet::from([theirs]), 0, 0);
    script.settle();

    assert_eq!(script.state().returns.get(0), 1);
    assert_eq!(controller(&script, ours), P1);
    assert_eq!(controller(&script, theirs), P0);
    assert_eq!(script.state().control_status(ours), P1);
    assert_eq!(script.state().core.operated_set, CardSet::from([ours, theirs]));
}

#[test]
fn test_swap_from_extra_zone_needs_a_main_zone() {
    let mut script = DuelScript::new();
    for seq in 0..5 {
        script.monster_at(P0, seq);
    }
    let linked = script.monster_at(P0, 5);
    let theirs = script.monster_at(P1, 0);

    script
        .duel
        .swap_control(None, P0, CardSet::from([linked]), CardSet::from([theirs]), 0, 0);
    script.settle();

    assert_eq!(script.state().returns.get(0), 0);
    assert!(script.state().core.operated_set.is_empty());
    assert_eq!(controller(&script, linked), P0);
    assert_eq!(controller(&script, theirs), P1);
    assert_eq!(script.state().card(linked).current.sequence, 5);
    assert!(script.requests.is_empty());
    assert!(script.messages().is_empty());
}
