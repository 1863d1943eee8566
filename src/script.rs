//! Bridge to the card scripting layer.
//!
//! Card behaviour lives in scripts the engine cannot see into. Effects hold
//! [`ScriptRef`] handles and the engine calls back through [`ScriptHost`]
//! with an ordered argument list whenever it needs a condition, a value or an
//! operation evaluated.

use crate::actions::Scope;
use crate::events::GameEvent;
use crate::game_state::DuelState;
use crate::group::GroupId;
use crate::ids::{CardId, EffectId, PlayerId};

/// Opaque handle to a script callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct ScriptRef(pub u32);

/// One typed argument of a callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptArg {
    Nil,
    Int(i64),
    Bool(bool),
    Player(PlayerId),
    Card(CardId),
    Effect(EffectId),
    Cards(Vec<CardId>),
    /// A group the callback may fill.
    Group(GroupId),
}

impl From<Option<EffectId>> for ScriptArg {
    fn from(effect: Option<EffectId>) -> Self {
        effect.map_or(ScriptArg::Nil, ScriptArg::Effect)
    }
}

impl From<Option<CardId>> for ScriptArg {
    fn from(card: Option<CardId>) -> Self {
        card.map_or(ScriptArg::Nil, ScriptArg::Card)
    }
}

/// The scripting collaborator.
///
/// `check_condition` and `get_value` see the duel read-only. Operations get
/// a [`Scope`] through which they can mutate state and queue further
/// actions; queued actions run after the operation returns.
pub trait ScriptHost {
    fn check_condition(&mut self, state: &DuelState, callback: ScriptRef, args: &[ScriptArg]) -> bool;

    fn get_value(&mut self, state: &DuelState, callback: ScriptRef, args: &[ScriptArg]) -> i64;

    /// Multi-value variant; a single value by default.
    fn get_values(&mut self, state: &DuelState, callback: ScriptRef, args: &[ScriptArg]) -> Vec<i64> {
        vec![self.get_value(state, callback, args)]
    }

    fn run_operation(&mut self, scope: &mut Scope<'_>, callback: ScriptRef, args: &[ScriptArg]);

    /// Target functions run like operations but report whether they apply.
    fn run_target(&mut self, scope: &mut Scope<'_>, callback: ScriptRef, args: &[ScriptArg]) -> bool {
        self.run_operation(scope, callback, args);
        true
    }
}

/// Host with no scripts: every condition holds, every value is zero and
/// operations do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullScript;

impl ScriptHost for NullScript {
    fn check_condition(&mut self, _state: &DuelState, _callback: ScriptRef, _args: &[ScriptArg]) -> bool {
        true
    }

    fn get_value(&mut self, _state: &DuelState, _callback: ScriptRef, _args: &[ScriptArg]) -> i64 {
        0
    }

    fn run_operation(&mut self, _scope: &mut Scope<'_>, _callback: ScriptRef, _args: &[ScriptArg]) {}
}

/// Standard argument list for event-driven callbacks:
/// effect, player, event cards, event player, event value, reason effect,
/// reason, reason player.
pub fn event_args(effect: EffectId, player: PlayerId, event: &GameEvent) -> Vec<ScriptArg> {
    vec![
        ScriptArg::Effect(effect),
        ScriptArg::Player(player),
        ScriptArg::Cards(event.cards.clone()),
        ScriptArg::Player(event.event_player),
        ScriptArg::Int(event.value),
        ScriptArg::from(event.reason_effect),
        ScriptArg::Int(i64::from(event.reason.bits())),
        ScriptArg::Player(event.reason_player),
    ]
}
