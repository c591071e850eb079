//! The cinder grammar table.
//!
//! Rules are grouped by what they produce, each module adds its rules to the shared builder and
//! references rules from the others by name.

use cinder_runtime::{
    grammar::{lit, not, opt, pick, r, separated, seq},
    Captures, Grammar, GrammarBuilder, GrammarError, Term, Value,
};

use crate::fragment::Fragment;

mod expression;
mod lexical;
mod pattern;
mod statement;

type Builder = GrammarBuilder<Fragment>;
type T = Term<Fragment>;
type Caps<'a> = Captures<'a, Fragment>;
type Out = Option<Value<Fragment>>;

pub(crate) fn build() -> Result<Grammar<Fragment>, GrammarError> {
    let mut b = Grammar::builder();
    lexical::rules(&mut b);
    expression::rules(&mut b);
    pattern::rules(&mut b);
    statement::rules(&mut b);
    b.build("Program")
}

fn node(fragment: impl Into<Fragment>) -> Out {
    Some(Value::node(fragment))
}

/// A word which isn't the prefix of a longer identifier.
fn kw(word: &str) -> T {
    seq([lit(word), not(r("IdentPart"))])
}

fn comma() -> T {
    seq([r("__"), lit(","), r("__")])
}

/// `open item, item, ... close` with an optional trailing comma, the value is the list of items.
fn list_of(item: &'static str, open: &str, close: &str) -> T {
    pick(
        2,
        seq([
            lit(open),
            r("__"),
            opt(separated(item, comma())),
            opt(seq([r("__"), lit(",")])),
            r("__"),
            lit(close),
        ]),
    )
}
