use super::harness::{DuelScript, monster, spell};
use crate::actions::Actions;
use crate::card::CardData;
use crate::decision::SelectRequest;
use crate::flags::{Position, Status};
use crate::group::CardSet;
use crate::ids::PlayerId;
use crate::message::Message;
use crate::types::CardType;
use crate::zone::Location;

const P0: PlayerId = PlayerId::ZERO;
const P1: PlayerId = PlayerId::ONE;

fn summon_messages(script: &DuelScript) -> Vec<&'static str> {
    script
        .messages()
        .iter()
        .filter_map(|m| match m {
            Message::Summoning { .. } => Some("summoning"),
            Message::Summoned => Some("summoned"),
            Message::SpSummoning { .. } => Some("spsummoning"),
            Message::SpSummoned => Some("spsummoned"),
            Message::FlipSummoning { .. } => Some("flipsummoning"),
            Message::FlipSummoned => Some("flipsummoned"),
            _ => None,
        })
        .collect()
}

#[test]
fn test_normal_summon_from_hand() {
    let mut script = DuelScript::new();
    let card = script.card(P0, monster(500, 4), Location::HAND);

    script.duel.summon(P0, card, None, false, 0, 0x1f);
    script.settle();

    let c = script.state().card(card);
    assert_eq!(c.current.location, Location::MZONE);
    assert_eq!(c.current.position, Position::FACEUP_ATTACK);
    assert!(c.get_status(Status::SUMMON_TURN));
    assert!(!c.get_status(Status::SUMMONING));
    assert_eq!(script.state().player(P0).summon_count, 1);
    assert!(script.hand(P0).is_empty());
    assert_eq!(summon_messages(&script), vec!["summoning", "summoned"]);
    // Only a zone was asked for; no tributes for a level 4.
    assert!(script.requests.iter().all(|r| matches!(r, SelectRequest::Place { .. })));
}

#[test]
fn test_second_summon_needs_a_count() {
    let mut script = DuelScript::new();
    let first = script.card(P0, monster(500, 4), Location::HAND);
    let second = script.card(P0, monster(501, 4), Location::HAND);

    script.duel.summon(P0, first, None, false, 0, 0x1f);
    script.settle();
    script.duel.summon(P0, second, None, false, 0, 0x1f);
    script.settle();

    assert_eq!(script.location(first), Location::MZONE);
    assert_eq!(script.location(second), Location::HAND);

    script.duel.summon(P0, second, None, true, 0, 0x1f);
    script.settle();
    assert_eq!(script.location(second), Location::MZONE);
    assert_eq!(script.state().player(P0).summon_count, 1);
}

#[test]
fn test_tribute_summon_releases_a_monster() {
    let mut script = DuelScript::new();
    let fodder = script.monster_at(P0, 0);
    let big = script.card(P0, monster(600, 6), Location::HAND);

    script.duel.summon(P0, big, None, false, 0, 0x1f);
    script.settle();

    assert!(
        script
            .requests
            .iter()
            .any(|r| matches!(r, SelectRequest::Tribute { min: 1, max: 1, .. }))
    );
    assert_eq!(script.location(fodder), Location::GRAVE);
    assert_eq!(script.location(big), Location::MZONE);
    let c = script.state().card(big);
    assert_eq!(c.material_cards, CardSet::from([fodder]));
    assert_eq!(summon_messages(&script), vec!["summoning", "summoned"]);
}

#[test]
fn test_tribute_summon_without_fodder_fails() {
    let mut script = DuelScript::new();
    let big = script.card(P0, monster(700, 7), Location::HAND);

    script.duel.summon(P0, big, None, false, 0, 0x1f);
    script.settle();

    assert_eq!(script.location(big), Location::HAND);
    assert!(script.messages().is_empty());
    assert_eq!(script.state().player(P0).summon_count, 0);
}

#[test]
fn test_monster_set_then_flip_summon() {
    let mut script = DuelScript::new();
    let card = script.card(P0, monster(800, 3), Location::HAND);

    script.duel.mset(P0, card, None, false, 0, 0x1f);
    script.settle();
    assert_eq!(script.location(card), Location::MZONE);
    assert_eq!(script.state().card(card).current.position, Position::FACEDOWN_DEFENSE);
    assert!(script.messages().iter().any(|m| matches!(m, Message::Set { code: 800, .. })));

    script.duel.flip_summon(P0, card);
    script.settle();
    assert_eq!(script.state().card(card).current.position, Position::FACEUP_ATTACK);
    assert_eq!(summon_messages(&script), vec!["flipsummoning", "flipsummoned"]);
}

#[test]
fn test_special_summon_batch() {
    let mut script = DuelScript::new();
    let a = script.card(P0, monster(900, 8), Location::HAND);
    let b = script.card(P0, monster(901, 2), Location::HAND);

    script
        .duel
        .special_summon(CardSet::from([a, b]), 0, P0, P0, false, false, Position::FACEUP_ATTACK, 0xff);
    script.settle();

    assert_eq!(script.state().returns.get(0), 2);
    assert_eq!(script.location(a), Location::MZONE);
    assert_eq!(script.location(b), Location::MZONE);
    assert_ne!(
        script.state().card(a).current.sequence,
        script.state().card(b).current.sequence
    );
    assert_eq!(summon_messages(&script), vec!["spsummoning", "spsummoning", "spsummoned"]);
    assert_eq!(script.state().core.operated_set, CardSet::from([a, b]));
    // Special summons do not use the normal summon count.
    assert_eq!(script.state().player(P0).summon_count, 0);
}

#[test]
fn test_special_summon_without_room_sends_to_grave() {
    let mut script = DuelScript::new();
    for seq in 0..5 {
        script.monster_at(P0, seq);
    }
    let extra = script.card(P0, monster(950, 4), Location::HAND);

    script
        .duel
        .special_summon(CardSet::from([extra]), 0, P0, P0, false, false, Position::FACEUP_ATTACK, 0x1f);
    script.settle();

    assert_eq!(script.state().returns.get(0), 0);
    assert_eq!(script.location(extra), Location::GRAVE);
    assert!(summon_messages(&script).is_empty());
}

#[test]
fn test_change_position_to_defense() {
    let mut script = DuelScript::new();
    let card = script.monster_at(P1, 2);

    script
        .duel
        .change_position_to(card, None, P1, Position::FACEUP_DEFENSE, false, false);
    script.settle();

    assert_eq!(script.state().card(card).current.position, Position::FACEUP_DEFENSE);
    assert!(script.messages().iter().any(|m| matches!(
        m,
        Message::PosChange { previous, current, .. }
            if *previous == Position::FACEUP_ATTACK && *current == Position::FACEUP_DEFENSE
    )));
}

#[test]
fn test_spell_set_from_hand() {
    let mut script = DuelScript::new();
    let card = script.card(P0, spell(1200), Location::HAND);

    script.duel.spell_set(P0, card, P0, false);
    script.settle();

    let c = script.state().card(card);
    assert_eq!(c.current.location, Location::SZONE);
    assert!(c.current.position.is_facedown());
    assert!(script.messages().iter().any(|m| matches!(m, Message::Set { code: 1200, .. })));
}

#[test]
fn test_equip_spell_from_hand() {
    let mut script = DuelScript::new();
    let target = script.monster_at(P0, 0);
    let equip = script.card(
        P0,
        CardData::new(1300, CardType::SPELL | CardType::EQUIP),
        Location::HAND,
    );

    script.duel.equip(P0, equip, target, true, false);
    script.settle();

    assert_eq!(script.state().returns.get(0), 1);
    assert_eq!(script.location(equip), Location::SZONE);
    assert_eq!(script.state().card(equip).equiping_target, Some(target));
    assert!(script.state().card(target).equiping_cards.contains(&equip));
}

#[test]
fn test_equip_lost_target_goes_to_grave() {
    let mut script = DuelScript::new();
    let target = script.monster_at(P0, 0);
    let equip = script.card(
        P0,
        CardData::new(1301, CardType::SPELL | CardType::EQUIP),
        Location::HAND,
    );
    script.duel.equip(P0, equip, target, true, false);
    script.settle();

    script
        .duel
        .destroy(CardSet::from([target]), None, crate::flags::Reason::EFFECT, P1, PlayerId::NONE, Location::GRAVE, 0);
    script.settle();

    assert_eq!(script.location(target), Location::GRAVE);
    assert_eq!(script.location(equip), Location::GRAVE);
    assert_eq!(script.state().card(equip).equiping_target, None);
}

#[test]
fn test_spell_set_group_stops_at_free_zones() {
    let mut script = DuelScript::new();
    for seq in 0..3 {
        script.field(P0, spell(1400 + seq), Location::SZONE, seq, Position::FACEDOWN_DEFENSE);
    }
    let hand: Vec<_> = (0..4).map(|i| script.card(P0, spell(1500 + i), Location::HAND)).collect();

    script
        .duel
        .spell_set_group(P0, hand.iter().copied().collect(), P0, false);
    script.settle();

    assert_eq!(script.state().returns.get(0), 2);
    assert_eq!(script.state().core.operated_set.len(), 2);
    assert_eq!(script.hand(P0).len(), 2);
    let set = hand.iter().filter(|c| script.location(**c) == Location::SZONE).count();
    assert_eq!(set, 2);
    let places: Vec<u32> = script
        .requests
        .iter()
        .filter_map(|r| match r {
            SelectRequest::Place { zones, .. } => Some(*zones),
            _ => None,
        })
        .collect();
    assert_eq!(places.len(), 2);
    assert!(places.iter().all(|z| *z != 0));
}
