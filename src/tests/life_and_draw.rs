use super::harness::DuelScript;
use crate::actions::Actions;
use crate::codes::{LP_SENTINEL, event};
use crate::flags::Reason;
use crate::ids::PlayerId;
use crate::message::Message;
use crate::zone::Location;

const P0: PlayerId = PlayerId::ZERO;
const P1: PlayerId = PlayerId::ONE;

#[test]
fn test_draw_stops_when_deck_runs_out() {
    let mut script = DuelScript::new();
    let deck = script.deck(P0, 2);
    script.duel.draw(None, Reason::RULE, PlayerId::NONE, P0, 5);
    script.settle();

    assert_eq!(script.state().returns.get(0), 2);
    assert!(script.state().core.overdraw[0]);
    assert_eq!(script.hand(P0).len(), 2);
    assert!(script.state().player(P0).list_main.is_empty());
    for card in deck {
        assert_eq!(script.location(card), Location::HAND);
    }
    let draws: Vec<&Message> = script
        .messages()
        .iter()
        .filter(|m| matches!(m, Message::Draw { .. }))
        .collect();
    assert_eq!(draws.len(), 1);
    match draws[0] {
        Message::Draw { player, cards } => {
            assert_eq!(*player, P0);
            assert_eq!(cards.len(), 2);
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_draw_zero_does_nothing() {
    let mut script = DuelScript::new();
    script.deck(P0, 3);
    script.duel.draw(None, Reason::RULE, PlayerId::NONE, P0, 0);
    script.settle();

    assert_eq!(script.state().returns.get(0), 0);
    assert!(script.messages().is_empty());
    assert!(script.state().event_log.is_empty());
    assert_eq!(script.state().player(P0).list_main.len(), 3);
    assert!(!script.state().core.overdraw[0]);
}

#[test]
fn test_draw_takes_from_the_top() {
    let mut script = DuelScript::new();
    let deck = script.deck(P0, 3);
    script.duel.draw(None, Reason::RULE, PlayerId::NONE, P0, 1);
    script.settle();

    assert_eq!(script.hand(P0), &[deck[2]]);
    assert!(!script.state().core.overdraw[0]);
    assert_eq!(script.batch_events(), vec![event::DRAW, event::TO_HAND, event::MOVE]);
}

#[test]
fn test_discard_deck_mills_top_cards() {
    let mut script = DuelScript::new();
    let deck = script.deck(P1, 4);
    script.duel.discard_deck(P1, 2, Reason::EFFECT);
    script.settle();

    assert_eq!(script.state().returns.get(0), 2);
    assert_eq!(script.location(deck[3]), Location::GRAVE);
    assert_eq!(script.location(deck[2]), Location::GRAVE);
    assert_eq!(script.location(deck[1]), Location::DECK);
    // The top card goes first.
    assert_eq!(script.moved_codes(), vec![script.code(deck[3]), script.code(deck[2])]);
}

#[test]
fn test_huge_damage_clamps_to_zero() {
    let mut script = DuelScript::new();
    script
        .duel
        .damage(None, Reason::EFFECT, P0, None, P1, 3_000_000, false);
    script.settle();

    assert_eq!(script.lp(P1), 0);
    assert_eq!(
        script.messages(),
        &[Message::Damage {
            player: P1,
            amount: LP_SENTINEL as u32,
            reason: Reason::EFFECT,
        }]
    );
}

#[test]
fn test_damage_then_recover() {
    let mut script = DuelScript::new();
    script.duel.damage(None, Reason::EFFECT, P1, None, P0, 1200, false);
    script.settle();
    assert_eq!(script.lp(P0), 6800);
    assert_eq!(script.state().returns.get(0), 1200);

    script.duel.recover(None, Reason::EFFECT, P0, P0, 500, false);
    script.settle();
    assert_eq!(script.lp(P0), 7300);
    assert_eq!(
        script.messages().last(),
        Some(&Message::Recover {
            player: P0,
            amount: 500,
        })
    );
}

#[test]
fn test_zero_damage_is_silent() {
    let mut script = DuelScript::new();
    script.duel.damage(None, Reason::EFFECT, P1, None, P0, 0, false);
    script.settle();
    assert_eq!(script.lp(P0), 8000);
    assert!(script.messages().is_empty());
}

#[test]
fn test_pay_lp_cost() {
    let mut script = DuelScript::new();
    script.duel.pay_lp_cost(P0, 1000);
    script.settle();
    assert_eq!(script.lp(P0), 7000);
    assert_eq!(
        script.messages(),
        &[Message::PayLpCost {
            player: P0,
            amount: 1000,
        }]
    );
}

#[test]
fn test_cost_above_life_points_is_not_paid() {
    let mut script = DuelScript::new();
    script.duel.pay_lp_cost(P0, 9000);
    script.settle();
    assert_eq!(script.lp(P0), 8000);
    assert!(script.messages().is_empty());
}
