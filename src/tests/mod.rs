//! Scenario tests: whole actions driven through a [`Duel`](crate::Duel)
//! with scripted answers and scripted card callbacks.

mod harness;

mod control;
mod life_and_draw;
mod overlay;
mod removal;
mod scripts;
mod summons;
