use std::fmt::Display;

use crate::{linemap::Position, span::Span};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TraceEventKind {
    Enter,
    Match,
    Fail,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TraceEvent {
    pub kind: TraceEventKind,
    pub rule: &'static str,
    /// `start..start` for enter and fail events, the matched text for match events
    pub span: Span,
    pub start: Position,
    /// The outcome was replayed from the memo table
    pub cached: bool,
}

/// Observer of rule level parser events.
pub trait Tracer {
    fn trace(&mut self, event: TraceEvent);
}

impl<F: FnMut(TraceEvent)> Tracer for F {
    fn trace(&mut self, event: TraceEvent) {
        self(event)
    }
}

/// Tracer which keeps every event.
#[derive(Clone, Default, Debug)]
pub struct TraceLog {
    events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn new() -> TraceLog {
        Self::default()
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn into_raw(self) -> Vec<TraceEvent> {
        self.events
    }

    /// Pairs every enter event with the event that finished it, postorder to preorder.
    fn pair_events(&self) -> Vec<(usize, &TraceEvent)> {
        let mut stack = Vec::new();
        let mut pairs = Vec::new();
        for (i, event) in self.events.iter().enumerate() {
            match event.kind {
                TraceEventKind::Enter => {
                    stack.push(pairs.len());
                    pairs.push((stack.len() - 1, event));
                }
                TraceEventKind::Match | TraceEventKind::Fail => {
                    if let Some(open) = stack.pop() {
                        pairs[open].1 = &self.events[i];
                    }
                }
            }
        }
        pairs
    }

    /// Rules in the order they were entered, indented by nesting.
    pub fn display_into(&self, buf: &mut dyn std::fmt::Write, print_failed: bool) -> std::fmt::Result {
        for (indent, event) in self.pair_events() {
            if event.kind == TraceEventKind::Fail && !print_failed {
                continue;
            }

            for _ in 0..indent {
                write!(buf, "  ")?;
            }

            let TraceEvent {
                rule, span, start, ..
            } = event;
            let status = match event.kind {
                TraceEventKind::Enter => " unfinished",
                TraceEventKind::Fail => " failed",
                TraceEventKind::Match => "",
            };
            let cached = match event.cached {
                true => " (cached)",
                false => "",
            };
            write!(buf, "{rule} {span} @ {}:{}{status}{cached}\n", start.line, start.column)?;
        }

        Ok(())
    }

    pub fn display(&self, print_failed: bool) -> TraceDisplay<'_> {
        TraceDisplay(self, print_failed)
    }
}

impl Tracer for TraceLog {
    fn trace(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

#[derive(Clone, Copy)]
pub struct TraceDisplay<'a>(&'a TraceLog, bool);
impl Display for TraceDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.display_into(f, self.1)
    }
}
