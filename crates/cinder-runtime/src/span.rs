use std::fmt::Display;

use crate::linemap::Offset;

/// Byte range `start..end` into the parsed source.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Span {
    start: Offset,
    end: Offset,
}

impl Span {
    pub fn new(start: Offset, end: Offset) -> Span {
        debug_assert!(start <= end);
        Self { start, end }
    }
    pub fn at(pos: Offset) -> Span {
        Self {
            start: pos,
            end: pos,
        }
    }
    pub fn is_empty(self) -> bool {
        self.start >= self.end
    }
    pub fn len(self) -> u32 {
        self.end.saturating_sub(self.start)
    }
    #[track_caller]
    pub fn as_str(self, src: &str) -> &str {
        &src[self.start as usize..self.end as usize]
    }
    pub fn contains(self, pos: Offset) -> bool {
        self.start <= pos && pos < self.end
    }
    /// Smallest span covering both.
    pub fn join(self, other: Span) -> Span {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
    pub fn start(self) -> Offset {
        self.start
    }
    pub fn end(self) -> Offset {
        self.end
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[test]
fn test_span() {
    let a = Span::new(2, 5);
    assert_eq!(a.as_str("0123456"), "234");
    assert_eq!(a.len(), 3);
    assert!(a.contains(4));
    assert!(!a.contains(5));
    assert!(Span::at(3).is_empty());
    assert_eq!(a.join(Span::new(4, 9)), Span::new(2, 9));
    assert_eq!(a.to_string(), "2..5");
}
