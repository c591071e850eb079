use std::collections::HashMap;

use crate::{
    class::CharClass,
    failure::{Expectation, FailureRecord, ParseFailure},
    grammar::{ActionFn, Grammar, RuleHandle, Term},
    linemap::{LineMap, Offset},
    span::Span,
    trace::{TraceEvent, TraceEventKind, Tracer},
    value::{Captures, Value},
};

#[derive(Clone)]
enum Memo<N> {
    Success { end: Offset, value: Value<N> },
    Failure,
}

type Match<N> = Option<(Offset, Value<N>)>;

/// Rules which may be active at once before the parse gives up. Fits a 2 MiB thread stack in
/// unoptimized builds.
pub const DEFAULT_MAX_DEPTH: u32 = 512;

/// One parse of one input. Owns the memo table and failure record, neither outlives the parse.
pub struct Parser<'a, N> {
    grammar: &'a Grammar<N>,
    src: &'a str,
    memo: HashMap<(RuleHandle, Offset), Memo<N>>,
    memoize: bool,
    /// capture frames of the enclosing actions
    labels: Vec<(&'static str, Value<N>)>,
    failure: FailureRecord,
    /// failures are not recorded while inside a lookahead
    silent: u32,
    /// start of the innermost named rule
    named_start: Option<Offset>,
    tracer: Option<&'a mut dyn Tracer>,
    lines: LineMap<'a>,
    depth: u32,
    max_depth: u32,
    /// where the rule nesting exceeded `max_depth`, every rule fails from then on
    overflow: Option<Offset>,
    hits: u32,
    misses: u32,
}

impl<'a, N: Clone> Parser<'a, N> {
    pub fn new(grammar: &'a Grammar<N>, src: &'a str) -> Parser<'a, N> {
        Self {
            grammar,
            src,
            memo: HashMap::new(),
            memoize: true,
            labels: Vec::new(),
            failure: FailureRecord::new(),
            silent: 0,
            named_start: None,
            tracer: None,
            lines: LineMap::new(src),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            overflow: None,
            hits: 0,
            misses: 0,
        }
    }

    pub fn memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    pub fn trace(mut self, tracer: &'a mut dyn Tracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Input nested deeper than `max_depth` rules fails with [`Expectation::LessNesting`].
    pub fn max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parses the whole input starting from the grammar's root rule.
    pub fn parse(self) -> Result<Value<N>, ParseFailure> {
        let root = self.grammar.root();
        self.parse_rule(root)
    }

    pub fn parse_rule(mut self, rule: RuleHandle) -> Result<Value<N>, ParseFailure> {
        let len = self.src.len() as Offset;
        let result = self.eval_rule(rule, 0);

        log::trace!(
            "Parsed {len} bytes, memo hits {} misses {} entries {}",
            self.hits,
            self.misses,
            self.memo.len()
        );

        if let Some(offset) = self.overflow {
            log::debug!("Nesting limit of {} rules reached at byte {offset}", self.max_depth);
            let mut failure = FailureRecord::new();
            failure.record(offset, Expectation::LessNesting);
            return Err(failure.into_failure(self.src));
        }

        match result {
            Some((end, value)) if end == len => Ok(value),
            Some((end, _)) => {
                self.failure.record(end, Expectation::End);
                Err(self.failure.into_failure(self.src))
            }
            None => Err(self.failure.into_failure(self.src)),
        }
    }

    fn fail(&mut self, offset: Offset, expectation: Expectation) {
        if self.silent > 0 || self.named_start == Some(offset) {
            return;
        }
        self.failure.record(offset, expectation);
    }

    fn emit(&mut self, kind: TraceEventKind, rule: RuleHandle, span: Span, cached: bool) {
        let Some(tracer) = self.tracer.as_mut() else {
            return;
        };
        let start = self.lines.position(span.start());
        tracer.trace(TraceEvent {
            kind,
            rule: self.grammar.name(rule),
            span,
            start,
            cached,
        });
    }

    fn eval_rule(&mut self, handle: RuleHandle, pos: Offset) -> Match<N> {
        if self.overflow.is_some() {
            return None;
        }
        if self.depth >= self.max_depth {
            self.overflow = Some(pos);
            return None;
        }

        self.emit(TraceEventKind::Enter, handle, Span::at(pos), false);

        if self.memoize {
            if let Some(memo) = self.memo.get(&(handle, pos)) {
                self.hits += 1;
                let result = match memo {
                    Memo::Success { end, value } => Some((*end, value.clone())),
                    Memo::Failure => None,
                };
                // the failures it caused were already recorded when the entry was created
                self.emit_result(handle, pos, &result, true);
                return result;
            }
            self.misses += 1;
        }

        self.depth += 1;
        let result = self.eval_body(handle, pos);
        self.depth -= 1;

        if self.memoize && self.overflow.is_none() {
            let memo = match &result {
                Some((end, value)) => Memo::Success {
                    end: *end,
                    value: value.clone(),
                },
                None => Memo::Failure,
            };
            self.memo.insert((handle, pos), memo);
        }

        self.emit_result(handle, pos, &result, false);
        result
    }

    #[inline(never)]
    fn eval_body(&mut self, handle: RuleHandle, pos: Offset) -> Match<N> {
        let grammar = self.grammar;
        let rule = grammar.get_rule(handle);

        let outer_named = self.named_start;
        if rule.expect.is_some() {
            self.named_start = Some(pos);
        }

        if rule.silent {
            self.silent += 1;
        }
        let base = self.labels.len();
        let result = self.eval(&rule.body, pos);
        self.labels.truncate(base);
        if rule.silent {
            self.silent -= 1;
        }

        self.named_start = outer_named;
        if let (None, Some(expect)) = (&result, rule.expect) {
            self.fail(pos, Expectation::Named(expect));
        }
        result
    }

    fn emit_result(&mut self, handle: RuleHandle, pos: Offset, result: &Match<N>, cached: bool) {
        match result {
            Some((end, _)) => self.emit(TraceEventKind::Match, handle, Span::new(pos, *end), cached),
            None => self.emit(TraceEventKind::Fail, handle, Span::at(pos), cached),
        }
    }

    /// Evaluates the term at `pos`, a failed term never consumes input.
    ///
    /// Only dispatches, every arm lives in its own function so the frames recursion stacks up
    /// stay small.
    fn eval(&mut self, term: &'a Term<N>, pos: Offset) -> Match<N> {
        match term {
            Term::Literal { text, ignore_case } => self.literal(text, *ignore_case, pos),
            Term::Class(class) => self.class(class, pos),
            Term::Any => self.any(pos),
            Term::Ref(name) => unreachable!("Unresolved reference to '{name}'"),
            Term::Rule(handle) => self.eval_rule(*handle, pos),
            Term::Seq(terms) => self.seq(terms, pos),
            Term::Choice(terms) => self.choice(terms, pos),
            Term::ZeroOrMore(term) => self.repeat(term, pos, false),
            Term::OneOrMore(term) => self.repeat(term, pos, true),
            Term::Optional(term) => self.optional(term, pos),
            Term::Not(term) => self.lookahead(term, pos, false),
            Term::And(term) => self.lookahead(term, pos, true),
            Term::Label(name, term) => self.label(*name, term, pos),
            Term::Action(term, action) => self.action(term, *action, pos),
            Term::Text(term) => self.text(term, pos),
            Term::Pick(index, term) => self.pick(*index, term, pos),
        }
    }

    #[inline(never)]
    fn literal(&mut self, text: &str, ignore_case: bool, pos: Offset) -> Match<N> {
        let rest = &self.src[pos as usize..];
        let matches = match ignore_case {
            true => rest
                .get(..text.len())
                .map_or(false, |prefix| prefix.eq_ignore_ascii_case(text)),
            false => rest.starts_with(text),
        };
        if matches {
            let end = pos + text.len() as Offset;
            return Some((end, Value::Text(rest[..text.len()].to_owned())));
        }
        self.fail(
            pos,
            Expectation::Literal {
                text: text.to_owned(),
                ignore_case,
            },
        );
        None
    }

    #[inline(never)]
    fn class(&mut self, class: &CharClass, pos: Offset) -> Match<N> {
        match self.src[pos as usize..].chars().next() {
            Some(c) if class.contains(c) => {
                Some((pos + c.len_utf8() as Offset, Value::Text(c.to_string())))
            }
            _ => {
                self.fail(pos, Expectation::Class(class.description().to_owned()));
                None
            }
        }
    }

    #[inline(never)]
    fn any(&mut self, pos: Offset) -> Match<N> {
        match self.src[pos as usize..].chars().next() {
            Some(c) => Some((pos + c.len_utf8() as Offset, Value::Text(c.to_string()))),
            None => {
                self.fail(pos, Expectation::Any);
                None
            }
        }
    }

    #[inline(never)]
    fn seq(&mut self, terms: &'a [Term<N>], pos: Offset) -> Match<N> {
        let base = self.labels.len();
        let mut values = Vec::with_capacity(terms.len());
        let mut end = pos;
        for term in terms {
            let Some((next, value)) = self.eval(term, end) else {
                self.labels.truncate(base);
                return None;
            };
            end = next;
            values.push(value);
        }
        Some((end, Value::List(values)))
    }

    #[inline(never)]
    fn choice(&mut self, terms: &'a [Term<N>], pos: Offset) -> Match<N> {
        for term in terms {
            if let Some(result) = self.eval(term, pos) {
                return Some(result);
            }
        }
        None
    }

    #[inline(never)]
    fn repeat(&mut self, term: &'a Term<N>, pos: Offset, at_least_one: bool) -> Match<N> {
        let mut values = Vec::new();
        let mut end = pos;
        while let Some((next, value)) = self.eval(term, end) {
            values.push(value);
            // an empty match would repeat forever
            if next == end {
                break;
            }
            end = next;
        }
        match at_least_one && values.is_empty() {
            true => None,
            false => Some((end, Value::List(values))),
        }
    }

    #[inline(never)]
    fn optional(&mut self, term: &'a Term<N>, pos: Offset) -> Match<N> {
        match self.eval(term, pos) {
            Some(result) => Some(result),
            None => Some((pos, Value::Absent)),
        }
    }

    #[inline(never)]
    fn lookahead(&mut self, term: &'a Term<N>, pos: Offset, positive: bool) -> Match<N> {
        let base = self.labels.len();
        self.silent += 1;
        let matched = self.eval(term, pos).is_some();
        self.silent -= 1;
        self.labels.truncate(base);
        match matched == positive {
            true => Some((pos, Value::Empty)),
            false => None,
        }
    }

    #[inline(never)]
    fn label(&mut self, name: &'static str, term: &'a Term<N>, pos: Offset) -> Match<N> {
        let (end, value) = self.eval(term, pos)?;
        self.labels.push((name, value));
        Some((end, Value::Empty))
    }

    #[inline(never)]
    fn action(&mut self, term: &'a Term<N>, action: ActionFn<N>, pos: Offset) -> Match<N> {
        let base = self.labels.len();
        let Some((end, value)) = self.eval(term, pos) else {
            self.labels.truncate(base);
            return None;
        };

        let mut captures =
            Captures::new(&mut self.labels[base..], value, Span::new(pos, end), self.src);
        let result = action(&mut captures);
        self.labels.truncate(base);

        // rejection carries no expectation of its own, named rules report it
        result.map(|value| (end, value))
    }

    #[inline(never)]
    fn text(&mut self, term: &'a Term<N>, pos: Offset) -> Match<N> {
        let (end, _) = self.eval(term, pos)?;
        let text = self.src[pos as usize..end as usize].to_owned();
        Some((end, Value::Text(text)))
    }

    #[inline(never)]
    fn pick(&mut self, index: usize, term: &'a Term<N>, pos: Offset) -> Match<N> {
        let (end, value) = self.eval(term, pos)?;
        let value = match value {
            Value::List(mut items) if index < items.len() => items.swap_remove(index),
            other => other,
        };
        Some((end, value))
    }
}

impl<N: Clone> Grammar<N> {
    pub fn parse(&self, src: &str) -> Result<Value<N>, ParseFailure> {
        Parser::new(self, src).parse()
    }
}
