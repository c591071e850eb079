use bstr::ByteSlice;

/// The type of a byte offset in a string
pub type Offset = u32;

/// Use this for human output text spans.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct Position {
    /// one-based line index
    pub line: u32,
    /// one-based column, counted in unicode code points
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Position {
        Self { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, col {}", self.line, self.column)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct LineInfo {
    /// byte offset of the start of the line
    start: Offset,
    /// byte offset of the end of the line, excluding the line break
    end: Offset,
    /// Does the line contain only ascii characters?
    is_ascii: bool,
}

/// Line table which is only built as far as it has been queried.
///
/// Lookups at or just after the previously returned line are answered without searching,
/// a parser asking about monotonically increasing offsets pays O(1) amortized per lookup.
pub struct LineMap<'a> {
    src: &'a str,
    lines: Vec<LineInfo>,
    /// start of the first line which hasn't been scanned yet
    scanned: Offset,
    done: bool,
    hint: usize,
}

impl<'a> LineMap<'a> {
    pub fn new(src: &'a str) -> LineMap<'a> {
        debug_assert!(src.len() <= Offset::MAX as usize);
        Self {
            src,
            lines: Vec::new(),
            scanned: 0,
            done: false,
            hint: 0,
        }
    }

    pub fn src(&self) -> &'a str {
        self.src
    }

    fn scan_line(&mut self) {
        let bytes = self.src.as_bytes();
        let start = self.scanned as usize;
        let rest = &bytes[start..];

        // we recognize \r\n  \n  \r as newlines
        let (end, next) = match rest.find_byteset(b"\r\n") {
            Some(i) => {
                let crlf = rest[i] == b'\r' && rest.get(i + 1) == Some(&b'\n');
                let len = if crlf { 2 } else { 1 };
                (start + i, start + i + len)
            }
            None => {
                self.done = true;
                (bytes.len(), bytes.len())
            }
        };

        self.lines.push(LineInfo {
            start: start as Offset,
            end: end as Offset,
            is_ascii: bytes[start..end].is_ascii(),
        });
        self.scanned = next as Offset;
    }

    fn scan_to(&mut self, offset: Offset) {
        while !self.done && self.scanned <= offset {
            self.scan_line();
        }
    }

    fn contains(&self, index: usize, offset: Offset) -> bool {
        let Some(line) = self.lines.get(index) else {
            return false;
        };
        let next_start = self.lines.get(index + 1).map(|next| next.start);
        line.start <= offset && next_start.map_or(true, |next| offset < next)
    }

    fn line_index(&mut self, offset: Offset) -> usize {
        self.scan_to(offset);

        let hint = self.hint;
        let index = if self.contains(hint, offset) {
            hint
        } else if self.contains(hint + 1, offset) {
            hint + 1
        } else {
            match self.lines.binary_search_by_key(&offset, |line| line.start) {
                Ok(a) => a,
                Err(a) => a - 1,
            }
        };

        self.hint = index;
        index
    }

    /// Returns the one-based line and column of the offset. Offset is clamped to the end of `src`
    pub fn position(&mut self, offset: Offset) -> Position {
        let offset = Offset::min(offset, self.src.len() as Offset);
        let index = self.line_index(offset);
        let line = self.lines[index];

        let column = if line.is_ascii || offset <= line.start {
            offset - line.start
        } else {
            let prefix = &self.src.as_bytes()[line.start as usize..offset as usize];
            // utf8 continuation bytes are 0b10xxxxxx, everything else starts a codepoint
            let count = prefix.iter().filter(|&&b| (b as i8) >= -0x40).count();
            count.try_into().unwrap_or(Offset::MAX)
        };

        Position {
            line: index as u32 + 1,
            column: column + 1,
        }
    }

    /// Text of the one-based `line` without its line break, empty if there is no such line.
    pub fn line_str(&mut self, line: u32) -> &'a str {
        if line == 0 {
            return "";
        }
        while !self.done && self.lines.len() < line as usize {
            self.scan_line();
        }
        match self.lines.get(line as usize - 1) {
            Some(info) => &self.src[info.start as usize..info.end as usize],
            None => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LineMap, Position};

    #[test]
    fn no_newline() {
        //          012
        let text = "Hi!";
        let mut map = LineMap::new(text);
        assert_eq!(map.position(2), Position::new(1, 3));
        assert_eq!(map.line_str(1), "Hi!");
    }

    #[test]
    fn newline() {
        //          012 3
        let text = "Hi!\n";
        let mut map = LineMap::new(text);
        assert_eq!(map.position(3), Position::new(1, 4));
        assert_eq!(map.position(4), Position::new(2, 1));
        assert_eq!(map.line_str(2), "");
    }

    #[test]
    fn crlf_newline() {
        //          012 3 4567
        let text = "Hi!\r\nabc";
        let mut map = LineMap::new(text);
        assert_eq!(map.position(5), Position::new(2, 1));
        assert_eq!(map.line_str(1), "Hi!");
        assert_eq!(map.line_str(2), "abc");
    }

    #[test]
    fn lone_carriage_return() {
        let text = "a\rb";
        let mut map = LineMap::new(text);
        assert_eq!(map.position(2), Position::new(2, 1));
    }

    #[test]
    fn unicode_columns() {
        // 'é' is two bytes, '𒀀' is four
        let text = "aé𒀀b\nx";
        let mut map = LineMap::new(text);
        assert_eq!(map.position(0), Position::new(1, 1));
        assert_eq!(map.position(1), Position::new(1, 2));
        assert_eq!(map.position(3), Position::new(1, 3));
        assert_eq!(map.position(7), Position::new(1, 4));
        assert_eq!(map.position(9), Position::new(2, 1));
    }

    #[test]
    fn empty_offset() {
        let mut map = LineMap::new("");
        assert_eq!(map.position(0), Position::new(1, 1));
        assert_eq!(map.line_str(1), "");
        assert_eq!(map.line_str(2), "");
    }

    #[test]
    fn offset_clamp() {
        let text = "a\nb\nc";
        let mut map = LineMap::new(text);
        assert_eq!(map.position(9000), Position::new(3, 2));
    }

    #[test]
    fn scans_lazily() {
        let text = "a\nb\nc\nd";
        let mut map = LineMap::new(text);
        map.position(0);
        assert_eq!(map.lines.len(), 1);
        map.position(2);
        assert_eq!(map.lines.len(), 2);
        assert_eq!(map.hint, 1);
    }

    #[test]
    fn backwards_lookup() {
        let text = "aa\nbb\ncc\ndd";
        let mut map = LineMap::new(text);
        assert_eq!(map.position(10), Position::new(4, 2));
        assert_eq!(map.position(1), Position::new(1, 2));
        assert_eq!(map.position(7), Position::new(3, 2));
    }
}
