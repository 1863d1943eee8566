//! Step handlers, one file per family of actions.
//!
//! Each handler is a plain struct with a `step` method the scheduler calls
//! with the frame's current step. Query helpers a family needs live next to
//! it as `impl Ctx` blocks.

pub mod adjust;
pub mod chain;
pub mod control;
pub mod destroy;
pub mod draw;
pub mod equip;
pub mod life;
pub mod move_to_field;
pub mod overlay;
pub mod position;
pub mod random;
pub mod release;
pub mod replace;
pub mod select;
pub mod send_to;
pub mod special_summon;
pub mod spell_set;
pub mod summon;
pub mod tribute;
