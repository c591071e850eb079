use crate::span::Span;

/// The result of a successfully matched term.
#[derive(Clone, PartialEq, Debug)]
pub enum Value<N> {
    /// Terms which carry no value, lookaheads and labels which moved their value away
    Empty,
    /// An optional term which didn't match
    Absent,
    Text(String),
    List(Vec<Value<N>>),
    /// Boxed, values live on the stack at every level of parser recursion
    Node(Box<N>),
}

impl<N> Value<N> {
    pub fn node(node: impl Into<N>) -> Value<N> {
        Value::Node(Box::new(node.into()))
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, Value::Empty | Value::Absent)
    }

    pub fn into_node<T: TryFrom<N>>(self) -> Option<T> {
        match self {
            Value::Node(n) => T::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Absent values are an empty list.
    pub fn into_nodes<T: TryFrom<N>>(self) -> Option<Vec<T>> {
        match self {
            Value::List(items) => items.into_iter().map(Value::into_node).collect(),
            Value::Empty | Value::Absent => Some(Vec::new()),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<Vec<Value<N>>> {
        match self {
            Value::List(items) => Some(items),
            Value::Empty | Value::Absent => Some(Vec::new()),
            _ => None,
        }
    }
}

/// Labeled sub-matches handed to an action.
pub struct Captures<'a, N> {
    labels: &'a mut [(&'static str, Value<N>)],
    value: Value<N>,
    span: Span,
    src: &'a str,
}

impl<'a, N> Captures<'a, N> {
    pub(crate) fn new(
        labels: &'a mut [(&'static str, Value<N>)],
        value: Value<N>,
        span: Span,
        src: &'a str,
    ) -> Captures<'a, N> {
        Self {
            labels,
            value,
            span,
            src,
        }
    }

    /// Moves the value of the label out, the last capture wins if the label matched repeatedly.
    pub fn take(&mut self, name: &str) -> Value<N> {
        match self.labels.iter_mut().rev().find(|(label, _)| *label == name) {
            Some((_, value)) => std::mem::replace(value, Value::Empty),
            None => Value::Empty,
        }
    }

    pub fn node<T: TryFrom<N>>(&mut self, name: &str) -> Option<T> {
        self.take(name).into_node()
    }

    /// `Some(None)` if the label didn't match, `None` if it matched something else than a `T`.
    pub fn opt<T: TryFrom<N>>(&mut self, name: &str) -> Option<Option<T>> {
        match self.take(name) {
            Value::Empty | Value::Absent => Some(None),
            other => other.into_node().map(Some),
        }
    }

    pub fn nodes<T: TryFrom<N>>(&mut self, name: &str) -> Option<Vec<T>> {
        self.take(name).into_nodes()
    }

    pub fn text(&mut self, name: &str) -> Option<String> {
        self.take(name).into_text()
    }

    pub fn flag(&mut self, name: &str) -> bool {
        self.take(name).is_present()
    }

    /// Value of the term the action is attached to.
    pub fn value(&mut self) -> Value<N> {
        std::mem::replace(&mut self.value, Value::Empty)
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Source text matched by the term the action is attached to.
    pub fn matched(&self) -> &'a str {
        self.span.as_str(self.src)
    }
}
