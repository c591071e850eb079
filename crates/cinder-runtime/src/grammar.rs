use std::{collections::HashMap, fmt::Display};

use cranelift_entity::{entity_impl, PrimaryMap};

use crate::{
    class::CharClass,
    value::{Captures, Value},
};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RuleHandle(u32);

entity_impl! { RuleHandle }

/// Builds the value of a matched term from its captures, `None` rejects the match.
pub type ActionFn<N> = fn(&mut Captures<N>) -> Option<Value<N>>;

pub enum Term<N> {
    Literal { text: Box<str>, ignore_case: bool },
    Class(CharClass),
    Any,
    /// Reference by name, only exists until the grammar is built
    Ref(&'static str),
    Rule(RuleHandle),
    Seq(Vec<Term<N>>),
    Choice(Vec<Term<N>>),
    ZeroOrMore(Box<Term<N>>),
    OneOrMore(Box<Term<N>>),
    Optional(Box<Term<N>>),
    Not(Box<Term<N>>),
    And(Box<Term<N>>),
    Label(&'static str, Box<Term<N>>),
    Action(Box<Term<N>>, ActionFn<N>),
    /// The value is the matched source text
    Text(Box<Term<N>>),
    /// The value is the n-th element of a sequence
    Pick(usize, Box<Term<N>>),
}

impl<N> Term<N> {
    fn resolve(&mut self, names: &HashMap<&'static str, RuleHandle>) -> Result<(), GrammarError> {
        match self {
            Term::Ref(name) => {
                let Some(&handle) = names.get(name) else {
                    return Err(GrammarError::UnknownRule(name.to_string()));
                };
                *self = Term::Rule(handle);
            }
            Term::Seq(terms) | Term::Choice(terms) => {
                for term in terms {
                    term.resolve(names)?;
                }
            }
            Term::ZeroOrMore(term)
            | Term::OneOrMore(term)
            | Term::Optional(term)
            | Term::Not(term)
            | Term::And(term)
            | Term::Label(_, term)
            | Term::Action(term, _)
            | Term::Text(term)
            | Term::Pick(_, term) => term.resolve(names)?,
            Term::Literal { .. } | Term::Class(_) | Term::Any | Term::Rule(_) => {}
        }
        Ok(())
    }

    pub fn display_into(&self, buf: &mut dyn std::fmt::Write, cx: &Grammar<N>) -> std::fmt::Result {
        let list = |buf: &mut dyn std::fmt::Write, terms: &[Term<N>], sep: &str| -> std::fmt::Result {
            for (i, term) in terms.iter().enumerate() {
                if i > 0 {
                    buf.write_str(sep)?;
                }
                let nested = matches!(term, Term::Seq(_) | Term::Choice(_));
                if nested {
                    buf.write_char('(')?;
                }
                term.display_into(buf, cx)?;
                if nested {
                    buf.write_char(')')?;
                }
            }
            Ok(())
        };
        let suffix = |buf: &mut dyn std::fmt::Write, term: &Term<N>, op: &str| -> std::fmt::Result {
            buf.write_char('(')?;
            term.display_into(buf, cx)?;
            write!(buf, "){op}")
        };

        match self {
            Term::Literal { text, ignore_case } => {
                write!(buf, "{text:?}")?;
                if *ignore_case {
                    buf.write_char('i')?;
                }
                Ok(())
            }
            Term::Class(class) => buf.write_str(class.description()),
            Term::Any => buf.write_char('.'),
            Term::Ref(name) => write!(buf, "{name}?"),
            Term::Rule(handle) => buf.write_str(cx.name(*handle)),
            Term::Seq(terms) => list(buf, terms, " "),
            Term::Choice(terms) => list(buf, terms, " / "),
            Term::ZeroOrMore(term) => suffix(buf, term, "*"),
            Term::OneOrMore(term) => suffix(buf, term, "+"),
            Term::Optional(term) => suffix(buf, term, "?"),
            Term::Not(term) => {
                buf.write_char('!')?;
                suffix(buf, term, "")
            }
            Term::And(term) => {
                buf.write_char('&')?;
                suffix(buf, term, "")
            }
            Term::Label(name, term) => {
                write!(buf, "{name}:")?;
                suffix(buf, term, "")
            }
            Term::Action(term, _) => {
                term.display_into(buf, cx)?;
                buf.write_str(" {…}")
            }
            Term::Text(term) => {
                buf.write_char('$')?;
                suffix(buf, term, "")
            }
            Term::Pick(index, term) => {
                write!(buf, "@{index}")?;
                suffix(buf, term, "")
            }
        }
    }
}

pub struct Rule<N> {
    pub name: &'static str,
    /// Human readable name reported instead of the failures at the start of the rule
    pub expect: Option<&'static str>,
    /// Failures inside the rule are never reported
    pub silent: bool,
    pub body: Term<N>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum GrammarError {
    UnknownRule(String),
    DuplicateRule(String),
    UnknownRoot(String),
}

impl Display for GrammarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrammarError::UnknownRule(name) => write!(f, "Reference to unknown rule '{name}'"),
            GrammarError::DuplicateRule(name) => write!(f, "Rule '{name}' is defined twice"),
            GrammarError::UnknownRoot(name) => write!(f, "Root rule '{name}' does not exist"),
        }
    }
}

impl std::error::Error for GrammarError {}

/// An immutable table of rules with resolved references.
pub struct Grammar<N> {
    rules: PrimaryMap<RuleHandle, Rule<N>>,
    names: HashMap<&'static str, RuleHandle>,
    root: RuleHandle,
}

impl<N> Grammar<N> {
    pub fn builder() -> GrammarBuilder<N> {
        GrammarBuilder { rules: Vec::new() }
    }

    pub fn root(&self) -> RuleHandle {
        self.root
    }

    pub fn get_rule(&self, handle: RuleHandle) -> &Rule<N> {
        &self.rules[handle]
    }

    pub fn name(&self, handle: RuleHandle) -> &'static str {
        self.rules[handle].name
    }

    pub fn find(&self, name: &str) -> Option<RuleHandle> {
        self.names.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> cranelift_entity::Iter<'_, RuleHandle, Rule<N>> {
        self.rules.iter()
    }

    pub fn display_into(&self, buf: &mut dyn std::fmt::Write) -> std::fmt::Result {
        for (_, rule) in self.iter() {
            write!(buf, "{}", rule.name)?;
            if rule.silent {
                buf.write_str(" _")?;
            }
            if let Some(expect) = rule.expect {
                write!(buf, " {expect:?}")?;
            }
            buf.write_str(" = ")?;
            rule.body.display_into(buf, self)?;
            buf.write_char('\n')?;
        }
        Ok(())
    }

    pub fn display(&self) -> GrammarDisplay<'_, N> {
        GrammarDisplay(self)
    }
}

pub struct GrammarDisplay<'a, N>(&'a Grammar<N>);
impl<N> Display for GrammarDisplay<'_, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.display_into(f)
    }
}

pub struct GrammarBuilder<N> {
    rules: Vec<Rule<N>>,
}

impl<N> GrammarBuilder<N> {
    pub fn rule(&mut self, name: &'static str, body: Term<N>) -> &mut Self {
        self.rules.push(Rule {
            name,
            expect: None,
            silent: false,
            body,
        });
        self
    }

    /// A rule whose failures at its start are reported as the single expectation `display`.
    pub fn named(&mut self, name: &'static str, display: &'static str, body: Term<N>) -> &mut Self {
        self.rules.push(Rule {
            name,
            expect: Some(display),
            silent: false,
            body,
        });
        self
    }

    /// A rule which never contributes expectations, such as whitespace.
    pub fn silent(&mut self, name: &'static str, body: Term<N>) -> &mut Self {
        self.rules.push(Rule {
            name,
            expect: None,
            silent: true,
            body,
        });
        self
    }

    pub fn build(self, root: &str) -> Result<Grammar<N>, GrammarError> {
        let mut names = HashMap::new();
        let mut rules = PrimaryMap::new();

        for rule in self.rules {
            let name = rule.name;
            let handle = rules.push(rule);
            if names.insert(name, handle).is_some() {
                return Err(GrammarError::DuplicateRule(name.to_string()));
            }
        }

        for (_, rule) in rules.iter_mut() {
            rule.body.resolve(&names)?;
        }

        let Some(&root) = names.get(root) else {
            return Err(GrammarError::UnknownRoot(root.to_string()));
        };

        log::trace!("Built grammar with {} rules", rules.len());

        Ok(Grammar { rules, names, root })
    }
}

pub fn lit<N>(text: &str) -> Term<N> {
    Term::Literal {
        text: text.into(),
        ignore_case: false,
    }
}

/// Case insensitive for ascii letters.
pub fn lit_i<N>(text: &str) -> Term<N> {
    Term::Literal {
        text: text.into(),
        ignore_case: true,
    }
}

pub fn class<N>(ranges: &[(char, char)]) -> Term<N> {
    Term::Class(CharClass::new(ranges, false))
}

pub fn not_class<N>(ranges: &[(char, char)]) -> Term<N> {
    Term::Class(CharClass::new(ranges, true))
}

pub fn any<N>() -> Term<N> {
    Term::Any
}

pub fn r<N>(name: &'static str) -> Term<N> {
    Term::Ref(name)
}

pub fn seq<N, const L: usize>(terms: [Term<N>; L]) -> Term<N> {
    Term::Seq(terms.into())
}

pub fn choice<N, const L: usize>(terms: [Term<N>; L]) -> Term<N> {
    Term::Choice(terms.into())
}

pub fn star<N>(term: Term<N>) -> Term<N> {
    Term::ZeroOrMore(Box::new(term))
}

pub fn plus<N>(term: Term<N>) -> Term<N> {
    Term::OneOrMore(Box::new(term))
}

pub fn opt<N>(term: Term<N>) -> Term<N> {
    Term::Optional(Box::new(term))
}

pub fn not<N>(term: Term<N>) -> Term<N> {
    Term::Not(Box::new(term))
}

pub fn and<N>(term: Term<N>) -> Term<N> {
    Term::And(Box::new(term))
}

pub fn label<N>(name: &'static str, term: Term<N>) -> Term<N> {
    Term::Label(name, Box::new(term))
}

pub fn action<N>(term: Term<N>, action: ActionFn<N>) -> Term<N> {
    Term::Action(Box::new(term), action)
}

pub fn text<N>(term: Term<N>) -> Term<N> {
    Term::Text(Box::new(term))
}

pub fn pick<N>(index: usize, term: Term<N>) -> Term<N> {
    Term::Pick(index, Box::new(term))
}

/// `item (sep item)*` producing a flat list of the items.
pub fn separated<N>(item: &'static str, sep: Term<N>) -> Term<N> {
    action(
        seq([
            label("head", r(item)),
            label("tail", star(pick(1, seq([sep, r(item)])))),
        ]),
        flatten_separated,
    )
}

fn flatten_separated<N>(c: &mut Captures<N>) -> Option<Value<N>> {
    let mut items = vec![c.take("head")];
    items.extend(c.take("tail").into_list()?);
    Some(Value::List(items))
}
