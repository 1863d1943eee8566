//! duelcore: the resumable action engine of a card duel.
//!
//! Game actions (destroying, releasing, summoning, moving cards between
//! zones, paying life points, tossing coins, ...) are step-structured
//! processes on an explicit stack. The engine suspends whenever a player has
//! to decide something and resumes when [`Duel::respond`] supplies the
//! answer. Card behaviour stays in scripts, reached through [`ScriptHost`].

pub mod actions;
pub mod card;
pub mod codes;
pub mod decision;
pub mod duel;
pub mod effect;
pub mod events;
pub mod flags;
pub mod game_state;
pub mod group;
pub mod handlers;
pub mod ids;
pub mod message;
pub mod options;
pub mod player;
pub mod process;
pub mod query;
pub mod returns;
pub mod script;
pub mod types;
pub mod zone;

#[cfg(test)]
mod tests;

pub use actions::{Actions, Scope};
pub use card::{Card, CardData, CardState};
pub use decision::{Response, ResponseError, RunState, SelectRequest};
pub use duel::Duel;
pub use effect::{Effect, EffectBuilder, EffectFlags, EffectType, EffectValue};
pub use events::{EventRecord, EventScope, GameEvent};
pub use flags::{DuelFlags, Position, Reason, Reset, Status, Timing};
pub use game_state::DuelState;
pub use group::{CardSet, GroupId};
pub use ids::{CardId, EffectId, PlayerId};
pub use message::{Message, MessageLog};
pub use options::DuelOptions;
#[cfg(feature = "serialization")]
pub use options::OptionsError;
pub use process::{Flow, Frame, Process};
pub use query::Ctx;
pub use returns::{ReturnCards, Returns};
pub use script::{NullScript, ScriptArg, ScriptHost, ScriptRef};
pub use types::CardType;
pub use zone::{LocInfo, Location};
