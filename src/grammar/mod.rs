//! The query grammar and the engine reducing mappings with it.
//!
//! Rules are grouped by the clause they build. Groups are applied in order
//! (measure, group-by, selection, query) at every rewriting step.

mod engine;
pub mod rules;

pub use engine::{select_best, GrammarEngine};
pub use rules::{Rule, RuleGroup, GRAMMAR};
