//! Grammar-as-data packrat parsing.
//!
//! A [`Grammar`] is a table of rules built from the combinators in [`grammar`], a [`Parser`]
//! interprets it against one input with memoization and longest-match failure reporting.

pub mod class;
pub mod failure;
pub mod grammar;
pub mod linemap;
pub mod parser;
pub mod span;
pub mod trace;
pub mod value;

pub use failure::{Expectation, ParseFailure};
pub use grammar::{Grammar, GrammarBuilder, GrammarError, RuleHandle, Term};
pub use linemap::{LineMap, Offset, Position};
pub use parser::{Parser, DEFAULT_MAX_DEPTH};
pub use span::Span;
pub use trace::{TraceEvent, TraceEventKind, TraceLog, Tracer};
pub use value::{Captures, Value};
