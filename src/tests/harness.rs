//! Scenario test harness.
//!
//! [`ScriptedHost`] stands in for the card scripting layer: conditions,
//! values and operations are closures registered per [`ScriptRef`], and every
//! call is logged. [`DuelScript`] sets a duel up card by card, queues
//! actions and settles them, answering requests from a scripted queue or
//! with a default answer.
//!
//! # Example
//!
//! ```ignore
//! let mut script = DuelScript::new();
//! let deck = script.deck(PlayerId::ZERO, 3);
//! script.duel.draw(None, Reason::RULE, PlayerId::NONE, PlayerId::ZERO, 2);
//! script.settle();
//! assert_eq!(script.hand(PlayerId::ZERO).len(), 2);
//! ```

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::actions::Scope;
use crate::card::CardData;
use crate::decision::{Response, RunState, SelectRequest};
use crate::duel::Duel;
use crate::events::EventScope;
use crate::flags::Position;
use crate::game_state::DuelState;
use crate::ids::{CardId, PlayerId};
use crate::message::Message;
use crate::options::DuelOptions;
use crate::script::{ScriptArg, ScriptHost, ScriptRef};
use crate::types::CardType;
use crate::zone::Location;

type Condition = Box<dyn FnMut(&DuelState, &[ScriptArg]) -> bool>;
type Value = Box<dyn FnMut(&DuelState, &[ScriptArg]) -> Vec<i64>>;
type Operation = Box<dyn FnMut(&mut Scope<'_>, &[ScriptArg])>;

/// Which side of the bridge a logged call went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Condition,
    Value,
    Operation,
    Target,
}

/// Shared view of the calls a [`ScriptedHost`] received.
pub type CallLog = Rc<RefCell<Vec<(CallKind, ScriptRef)>>>;

/// Script host driven by closures. Unregistered callbacks behave like
/// [`crate::script::NullScript`].
#[derive(Default)]
pub struct ScriptedHost {
    conditions: HashMap<ScriptRef, Condition>,
    values: HashMap<ScriptRef, Value>,
    operations: HashMap<ScriptRef, Operation>,
    log: CallLog,
}

impl ScriptedHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> CallLog {
        Rc::clone(&self.log)
    }

    pub fn condition(mut self, callback: ScriptRef, f: impl FnMut(&DuelState, &[ScriptArg]) -> bool + 'static) -> Self {
        self.conditions.insert(callback, Box::new(f));
        self
    }

    pub fn value(mut self, callback: ScriptRef, value: i64) -> Self {
        self.values.insert(callback, Box::new(move |_, _| vec![value]));
        self
    }

    pub fn values(mut self, callback: ScriptRef, f: impl FnMut(&DuelState, &[ScriptArg]) -> Vec<i64> + 'static) -> Self {
        self.values.insert(callback, Box::new(f));
        self
    }

    pub fn operation(mut self, callback: ScriptRef, f: impl FnMut(&mut Scope<'_>, &[ScriptArg]) + 'static) -> Self {
        self.operations.insert(callback, Box::new(f));
        self
    }

    fn record(&self, kind: CallKind, callback: ScriptRef) {
        self.log.borrow_mut().push((kind, callback));
    }
}

impl ScriptHost for ScriptedHost {
    fn check_condition(&mut self, state: &DuelState, callback: ScriptRef, args: &[ScriptArg]) -> bool {
        self.record(CallKind::Condition, callback);
        match self.conditions.get_mut(&callback) {
            Some(f) => f(state, args),
            None => true,
        }
    }

    fn get_value(&mut self, state: &DuelState, callback: ScriptRef, args: &[ScriptArg]) -> i64 {
        self.get_values(state, callback, args).first().copied().unwrap_or(0)
    }

    fn get_values(&mut self, state: &DuelState, callback: ScriptRef, args: &[ScriptArg]) -> Vec<i64> {
        self.record(CallKind::Value, callback);
        match self.values.get_mut(&callback) {
            Some(f) => f(state, args),
            None => vec![0],
        }
    }

    fn run_operation(&mut self, scope: &mut Scope<'_>, callback: ScriptRef, args: &[ScriptArg]) {
        self.record(CallKind::Operation, callback);
        if let Some(f) = self.operations.get_mut(&callback) {
            f(scope, args);
        }
    }

    fn run_target(&mut self, scope: &mut Scope<'_>, callback: ScriptRef, args: &[ScriptArg]) -> bool {
        self.record(CallKind::Target, callback);
        if let Some(f) = self.operations.get_mut(&callback) {
            f(scope, args);
        }
        true
    }
}

/// A plain level-`level` monster.
pub fn monster(code: u32, level: u32) -> CardData {
    CardData::new(code, CardType::MONSTER | CardType::NORMAL)
        .with_level(level)
        .with_stats(1000, 1000)
}

pub fn spell(code: u32) -> CardData {
    CardData::new(code, CardType::SPELL)
}

/// Answer taken when the scripted queue is empty: the first option, the
/// minimum number of cards, the lowest zone or position bit.
pub fn default_answer(request: &SelectRequest) -> Response {
    match request {
        SelectRequest::Cards { min, cards, .. } => Response::Cards(cards.iter().copied().take(*min as usize).collect()),
        SelectRequest::UnselectCard {
            finishable, selectable, ..
        } => match selectable.first() {
            Some(&card) if !*finishable => Response::Cards(vec![card]),
            _ => Response::Cancel,
        },
        SelectRequest::YesNo { .. } | SelectRequest::EffectYesNo { .. } => Response::YesNo(true),
        SelectRequest::Option { .. } => Response::Option(0),
        SelectRequest::Place { player, zones, .. } => {
            let bit = zones.trailing_zeros();
            let owner = if bit >= 16 { player.opponent() } else { *player };
            let location = if bit % 16 >= 8 { Location::SZONE } else { Location::MZONE };
            Response::Place {
                player: owner,
                location,
                sequence: bit % 8,
            }
        }
        SelectRequest::Position { positions, .. } => {
            let lowest = positions.bits() & positions.bits().wrapping_neg();
            Response::Position(Position::from_bits_truncate(lowest))
        }
        SelectRequest::Counter { count, cards, .. } => {
            let mut left = *count;
            let counts = cards
                .iter()
                .map(|&(_, have)| {
                    let take = have.min(left);
                    left -= take;
                    take
                })
                .collect();
            Response::Counters(counts)
        }
        SelectRequest::Tribute { min, cards, .. } => {
            let mut worth = 0;
            let mut chosen = Vec::new();
            for &(card, value) in cards {
                if worth >= *min {
                    break;
                }
                worth += value;
                chosen.push(card);
            }
            Response::Cards(chosen)
        }
    }
}

/// A duel under test plus the answers it will be given.
pub struct DuelScript {
    pub duel: Duel,
    answers: VecDeque<Response>,
    /// Every request the duel raised, in order.
    pub requests: Vec<SelectRequest>,
    next_code: u32,
}

impl DuelScript {
    pub fn new() -> Self {
        Self::with_host(DuelOptions::default(), ScriptedHost::new())
    }

    pub fn with_options(options: DuelOptions) -> Self {
        Self::with_host(options, ScriptedHost::new())
    }

    pub fn with_host(options: DuelOptions, host: ScriptedHost) -> Self {
        Self {
            duel: Duel::new(options, Box::new(host)),
            answers: VecDeque::new(),
            requests: Vec::new(),
            next_code: 1000,
        }
    }

    pub fn state(&self) -> &DuelState {
        &self.duel.state
    }

    pub fn state_mut(&mut self) -> &mut DuelState {
        &mut self.duel.state
    }

    /// Add `count` anonymous level 4 monsters to a deck.
    pub fn deck(&mut self, player: PlayerId, count: u32) -> Vec<CardId> {
        (0..count)
            .map(|_| {
                let code = self.fresh_code();
                self.duel.state.create_card(player, monster(code, 4), Location::DECK)
            })
            .collect()
    }

    pub fn card(&mut self, player: PlayerId, data: CardData, location: Location) -> CardId {
        self.duel.state.create_card(player, data, location)
    }

    /// A face-up attack monster in `player`'s monster zone `sequence`.
    pub fn monster_at(&mut self, player: PlayerId, sequence: u32) -> CardId {
        let code = self.fresh_code();
        self.field(player, monster(code, 4), Location::MZONE, sequence, Position::FACEUP_ATTACK)
    }

    pub fn field(&mut self, player: PlayerId, data: CardData, location: Location, sequence: u32, position: Position) -> CardId {
        self.duel.state.create_field_card(player, data, location, sequence, position)
    }

    fn fresh_code(&mut self) -> u32 {
        self.next_code += 1;
        self.next_code
    }

    pub fn answer(&mut self, response: Response) -> &mut Self {
        self.answers.push_back(response);
        self
    }

    /// Run until idle, answering every request. Panics on a rejected answer.
    pub fn settle(&mut self) {
        loop {
            match self.duel.run() {
                RunState::Idle => return,
                RunState::NeedsInput(request) => {
                    let response = self.answers.pop_front().unwrap_or_else(|| default_answer(&request));
                    if let Err(err) = self.duel.respond(response.clone()) {
                        panic!("{} rejected {response:?}: {err}", request.kind());
                    }
                    self.requests.push(request);
                }
            }
        }
    }

    /// Run until the first request and return it without answering.
    pub fn run_to_request(&mut self) -> SelectRequest {
        match self.duel.run() {
            RunState::NeedsInput(request) => request,
            RunState::Idle => panic!("duel went idle without asking anything"),
        }
    }

    pub fn messages(&self) -> &[Message] {
        self.duel.state.messages.records()
    }

    /// Codes of the cards in `Move` messages, in emission order.
    pub fn moved_codes(&self) -> Vec<u32> {
        self.messages()
            .iter()
            .filter_map(|m| match m {
                Message::Move { code, .. } => Some(*code),
                _ => None,
            })
            .collect()
    }

    /// Codes of batch events dispatched so far.
    pub fn batch_events(&self) -> Vec<u32> {
        self.duel
            .state
            .event_log
            .iter()
            .filter(|r| r.scope == EventScope::Batch)
            .map(|r| r.event.code)
            .collect()
    }

    pub fn hand(&self, player: PlayerId) -> &[CardId] {
        &self.duel.state.player(player).list_hand
    }

    pub fn grave(&self, player: PlayerId) -> &[CardId] {
        &self.duel.state.player(player).list_grave
    }

    pub fn location(&self, card: CardId) -> Location {
        self.duel.state.card(card).current.location
    }

    pub fn code(&self, card: CardId) -> u32 {
        self.duel.state.card(card).data.code
    }

    pub fn lp(&self, player: PlayerId) -> i32 {
        self.duel.state.player(player).lp
    }
}
