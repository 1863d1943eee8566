//! Drawing and milling from the top of the deck.

use crate::codes::{effect as code, event, prompt};
use crate::flags::{GlobalFlags, Position, Reason, Reset, Status, Timing};
use crate::game_state::DuelState;
use crate::group::CardSet;
use crate::ids::{CardId, EffectId, PlayerId};
use crate::message::{ConfirmedCard, DrawnCard, Message};
use crate::process::{Flow, unknown_step};
use crate::query::Ctx;
use crate::zone::Location;

/// Reveal the card `skip` below the current top of a reversed deck, reported
/// as sitting `offset` cards down.
pub(crate) fn reveal_deck_top(state: &mut DuelState, player: PlayerId, skip: usize, offset: u32) {
    if !state.core.global_flag.contains(GlobalFlags::DECK_REVERSE_CHECK) {
        return;
    }
    let deck = &state.player(player).list_main;
    if deck.len() <= skip {
        return;
    }
    let top = state.card(deck[deck.len() - 1 - skip]);
    if state.core.deck_reversed || top.current.position == Position::FACEUP_DEFENSE {
        let message = Message::DeckTop {
            player,
            offset,
            code: top.data.code,
            position: top.current.position,
        };
        state.messages.push(message);
    }
}

// ============================================================================
// Draw
// ============================================================================

/// Move up to `count` cards from the top of a deck to its owner's hand.
///
/// Running out of cards is not an error: the draw stops, the overdraw flag
/// is raised and the number actually drawn is returned.
#[derive(Debug, Clone)]
pub struct Draw {
    pub reason_effect: Option<EffectId>,
    pub reason: Reason,
    pub reason_player: PlayerId,
    pub player: PlayerId,
    pub count: u32,
    drawn: CardSet,
}

impl Draw {
    pub fn new(reason_effect: Option<EffectId>, reason: Reason, reason_player: PlayerId, player: PlayerId, count: u32) -> Self {
        Self {
            reason_effect,
            reason,
            reason_player,
            player,
            count,
            drawn: CardSet::new(),
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let p = self.player;
        match step {
            0 => {
                if (!self.reason.contains(Reason::RULE) && !ctx.is_player_can_draw(p)) || self.count == 0 {
                    ctx.state.returns.set(0, 0);
                    return Flow::Done;
                }
                ctx.state.core.overdraw[p.index() & 1] = false;
                let mut drawn = Vec::new();
                let mut public_count = 0;
                for _ in 0..self.count {
                    let Some(card) = ctx.state.player(p).deck_top() else {
                        ctx.state.core.overdraw[p.index() & 1] = true;
                        break;
                    };
                    ctx.state.enable_field_effect(card, false);
                    let c = ctx.state.card_mut(card);
                    c.snapshot_previous();
                    c.current.reason_effect = self.reason_effect;
                    c.current.reason_player = self.reason_player;
                    c.current.reason = self.reason | Reason::DRAW;
                    ctx.state.remove_card(card);
                    ctx.state.add_card(p, card, Location::HAND, 0, false);
                    ctx.state.enable_field_effect(card, true);
                    let public = ctx.is_card_affected_by(card, code::PUBLIC);
                    if public {
                        public_count += 1;
                    }
                    let position = if public { Position::FACEUP } else { Position::FACEDOWN };
                    ctx.state.set_position(card, position);
                    ctx.state.reset_card(card, Reset::TOHAND);
                    drawn.push(card);
                }
                ctx.state.core.hint_timing[p.index() & 1] |= Timing::DRAW | Timing::TOHAND;
                self.count = drawn.len() as u32;
                self.drawn = drawn.iter().copied().collect();
                if drawn.is_empty() {
                    return Flow::Continue(1);
                }
                reveal_deck_top(ctx.state, p, 0, self.count);
                let cards = drawn
                    .iter()
                    .map(|c| {
                        let card = ctx.state.card(*c);
                        DrawnCard {
                            code: card.data.code,
                            position: card.current.position,
                        }
                    })
                    .collect();
                ctx.state.messages.push(Message::Draw { player: p, cards });
                if ctx.state.core.deck_reversed && public_count < drawn.len() {
                    let cards = self
                        .drawn
                        .iter()
                        .map(|c| {
                            let card = ctx.state.card(*c);
                            ConfirmedCard {
                                code: card.data.code,
                                controller: card.current.controller,
                                location: card.current.location,
                                sequence: card.current.sequence,
                            }
                        })
                        .collect();
                    ctx.state.messages.push(Message::ConfirmCards {
                        player: p.opponent(),
                        cards,
                    });
                    ctx.state.shuffle_hand(p);
                }
                for card in self.drawn.iter().copied() {
                    if ctx.state.card(card).owner != ctx.state.card(card).current.controller {
                        ctx.state.add_client_hint(card, prompt::NOT_OWNER_HAND, Reset::standard());
                    }
                    for code in [event::DRAW, event::TO_HAND, event::MOVE] {
                        ctx.state
                            .raise_single_event(card, code, self.reason_effect, self.reason, self.reason_player, p, 0);
                    }
                }
                ctx.process_single_event();
                let value = i64::from(self.count);
                for code in [event::DRAW, event::TO_HAND, event::MOVE] {
                    ctx.state.raise_event(
                        self.drawn.iter().copied(),
                        code,
                        self.reason_effect,
                        self.reason,
                        self.reason_player,
                        p,
                        value,
                    );
                }
                ctx.process_instant_event();
                Flow::Continue(1)
            }
            1 => {
                ctx.state.core.operated_set = std::mem::take(&mut self.drawn);
                ctx.state.returns.set(0, i64::from(self.count));
                Flow::Done
            }
            _ => unknown_step("Draw", step),
        }
    }
}

// ============================================================================
// DiscardDeck
// ============================================================================

/// Send the top `count` cards of a deck to the graveyard (or wherever
/// destination redirects point them).
#[derive(Debug, Clone)]
pub struct DiscardDeck {
    pub player: PlayerId,
    pub count: u32,
    pub reason: Reason,
    discarded: CardSet,
}

impl DiscardDeck {
    pub fn new(player: PlayerId, count: u32, reason: Reason) -> Self {
        Self {
            player,
            count,
            reason,
            discarded: CardSet::new(),
        }
    }

    pub fn step(&mut self, ctx: &mut Ctx<'_>, step: u16) -> Flow {
        let p = self.player;
        match step {
            0 => {
                if ctx.is_player_affected_by_effect(p, code::CANNOT_DISCARD_DECK) {
                    ctx.state.core.operated_set.clear();
                    ctx.state.returns.set(0, 0);
                    return Flow::Done;
                }
                let top: Vec<CardId> = ctx
                    .state
                    .player(p)
                    .list_main
                    .iter()
                    .rev()
                    .take(self.count as usize)
                    .copied()
                    .collect();
                let (reason_effect, reason_player) = (ctx.state.core.reason_effect, ctx.state.core.reason_player);
                for card in top {
                    let c = ctx.state.card_mut(card);
                    c.sendto_param.location = Location::GRAVE;
                    c.sendto_param.sequence = 0;
                    c.current.reason_effect = reason_effect;
                    c.current.reason_player = reason_player;
                    c.current.reason = self.reason;
                    if let Some((location, sequence)) = ctx.destination_redirect(card, Location::GRAVE, self.reason) {
                        let c = ctx.state.card_mut(card);
                        c.sendto_param.location = location;
                        c.sendto_param.sequence = sequence;
                    }
                }
                reveal_deck_top(ctx.state, p, self.count as usize, self.count);
                Flow::Continue(1)
            }
            1 => {
                let mut by_dest: [(Location, u32, CardSet); 4] = [
                    (Location::HAND, event::TO_HAND, CardSet::new()),
                    (Location::DECK, event::TO_DECK, CardSet::new()),
                    (Location::GRAVE, event::TO_GRAVE, CardSet::new()),
                    (Location::REMOVED, event::REMOVE, CardSet::new()),
                ];
                self.discarded.clear();
                let chain_running = !ctx.state.core.current_chain.is_empty();
                for _ in 0..self.count {
                    let Some(card) = ctx.state.player(p).deck_top() else {
                        break;
                    };
                    let param = ctx.state.card(card).sendto_param;
                    let dest = param.location;
                    let reset = if dest == Location::HAND {
                        Reset::TOHAND
                    } else if dest == Location::DECK {
                        Reset::TODECK
                    } else if dest == Location::REMOVED {
                        if ctx.state.card(card).current.reason.contains(Reason::TEMPORARY) {
                            Reset::TEMP_REMOVE
                        } else {
                            Reset::REMOVE
                        }
                    } else {
                        Reset::TOGRAVE
                    };
                    ctx.state.reset_card(card, reset);
                    if dest == Location::HAND || dest == Location::DECK {
                        ctx.state.card_mut(card).set_status(Status::PROC_COMPLETE, false);
                    }
                    ctx.state.enable_field_effect(card, false);
                    ctx.state.card_mut(card).snapshot_previous();
                    let owner = ctx.state.card(card).owner;
                    ctx.state.remove_card(card);
                    ctx.state.add_card(owner, card, dest, param.sequence, false);
                    ctx.state.enable_field_effect(card, true);
                    ctx.state.set_position(card, Position::FACEUP);
                    let reason = ctx.state.card(card).current.reason;
                    ctx.state.move_message(card, reason);
                    if dest == Location::HAND {
                        if owner != ctx.state.card(card).current.controller {
                            ctx.state.add_client_hint(card, prompt::NOT_OWNER_HAND, Reset::standard());
                        }
                        if chain_running {
                            ctx.state
                                .add_client_hint(card, prompt::ADDED_BY_CHAIN, Reset::standard() | Reset::CHAIN);
                        }
                    }
                    let current = ctx.state.card(card).current;
                    if let Some((_, code, set)) = by_dest.iter_mut().find(|(l, _, _)| dest.intersects(*l)) {
                        set.insert(card);
                        ctx.state.raise_single_event(
                            card,
                            *code,
                            current.reason_effect,
                            current.reason,
                            current.reason_player,
                            PlayerId::ZERO,
                            0,
                        );
                    }
                    ctx.state.raise_single_event(
                        card,
                        event::MOVE,
                        current.reason_effect,
                        current.reason,
                        current.reason_player,
                        PlayerId::ZERO,
                        0,
                    );
                    self.discarded.insert(card);
                }
                let (reason_effect, reason_player) = (ctx.state.core.reason_effect, ctx.state.core.reason_player);
                for (_, code, set) in by_dest {
                    if !set.is_empty() {
                        ctx.state
                            .raise_event(set, code, reason_effect, self.reason, reason_player, PlayerId::ZERO, 0);
                    }
                }
                ctx.state.raise_event(
                    self.discarded.iter().copied(),
                    event::MOVE,
                    reason_effect,
                    self.reason,
                    reason_player,
                    PlayerId::ZERO,
                    0,
                );
                ctx.process_single_event();
                ctx.process_instant_event();
                Flow::Continue(2)
            }
            2 => {
                let discarded = std::mem::take(&mut self.discarded);
                ctx.state.returns.set(0, discarded.len() as i64);
                ctx.state.core.operated_set = discarded;
                Flow::Done
            }
            _ => unknown_step("DiscardDeck", step),
        }
    }
}
