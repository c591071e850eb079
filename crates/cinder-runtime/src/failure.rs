use std::fmt::{Display, Write};

use crate::linemap::{LineMap, Offset, Position};

/// Something the parser would have accepted at the failure offset.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Expectation {
    Literal { text: String, ignore_case: bool },
    Class(String),
    Any,
    End,
    Named(&'static str),
    /// the input nests deeper than the parser's rule depth limit
    LessNesting,
}

impl Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expectation::Literal { text, ignore_case } => {
                f.write_char('"')?;
                escape_into(f, text)?;
                f.write_char('"')?;
                if *ignore_case {
                    f.write_char('i')?;
                }
                Ok(())
            }
            Expectation::Class(description) => f.write_str(description),
            Expectation::Any => f.write_str("any character"),
            Expectation::End => f.write_str("end of input"),
            Expectation::Named(name) => f.write_str(name),
            Expectation::LessNesting => f.write_str("less nesting"),
        }
    }
}

fn escape_into(buf: &mut dyn Write, text: &str) -> std::fmt::Result {
    for c in text.chars() {
        match c {
            '"' => buf.write_str("\\\"")?,
            '\\' => buf.write_str("\\\\")?,
            '\n' => buf.write_str("\\n")?,
            '\r' => buf.write_str("\\r")?,
            '\t' => buf.write_str("\\t")?,
            '\0' => buf.write_str("\\0")?,
            c if c.is_control() => write!(buf, "\\x{:02X}", c as u32)?,
            c => buf.write_char(c)?,
        }
    }
    Ok(())
}

/// The furthest offset any term failed at and everything that was expected there.
#[derive(Clone, Debug, Default)]
pub struct FailureRecord {
    offset: Offset,
    expected: Vec<Expectation>,
}

impl FailureRecord {
    pub fn new() -> FailureRecord {
        Self::default()
    }

    pub fn record(&mut self, offset: Offset, expectation: Expectation) {
        if offset < self.offset {
            return;
        }
        if offset > self.offset {
            self.offset = offset;
            self.expected.clear();
        }
        if !self.expected.contains(&expectation) {
            self.expected.push(expectation);
        }
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    pub fn expected(&self) -> &[Expectation] {
        &self.expected
    }

    pub fn into_failure(self, src: &str) -> ParseFailure {
        let mut expected = self.expected;
        expected.sort_by_cached_key(|e| e.to_string());
        expected.dedup_by_key(|e| e.to_string());

        let found = src.get(self.offset as usize..).and_then(|s| s.chars().next());

        ParseFailure {
            offset: self.offset,
            expected,
            found,
        }
    }
}

/// A failed parse, describing the single furthest point the parser reached.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParseFailure {
    pub offset: Offset,
    /// sorted by their description
    pub expected: Vec<Expectation>,
    /// `None` at the end of input
    pub found: Option<char>,
}

impl ParseFailure {
    pub fn position(&self, src: &str) -> Position {
        LineMap::new(src).position(self.offset)
    }

    /// `Expected "(" or number but found "}".`
    pub fn message(&self) -> String {
        let mut buf = String::new();
        // writing into a String can't fail
        _ = self.message_into(&mut buf);
        buf
    }

    fn message_into(&self, buf: &mut dyn Write) -> std::fmt::Result {
        buf.write_str("Expected ")?;
        match self.expected.as_slice() {
            [] => buf.write_str("nothing")?,
            [a] => write!(buf, "{a}")?,
            [a, b] => write!(buf, "{a} or {b}")?,
            [init @ .., last] => {
                for e in init {
                    write!(buf, "{e}, ")?;
                }
                write!(buf, "or {last}")?;
            }
        }
        match self.found {
            Some(c) => {
                buf.write_str(" but found \"")?;
                escape_into(buf, c.encode_utf8(&mut [0; 4]))?;
                buf.write_str("\".")
            }
            None => buf.write_str(" but end of input found."),
        }
    }

    /// The message followed by the location, two lines of source and a caret under the failing column.
    pub fn render(&self, src: &str) -> String {
        let mut buf = String::new();
        _ = self.render_into(&mut buf, src);
        buf
    }

    pub fn render_into(&self, buf: &mut dyn Write, src: &str) -> std::fmt::Result {
        let mut lines = LineMap::new(src);
        let Position { line, column } = lines.position(self.offset);

        self.message_into(buf)?;
        writeln!(buf)?;
        writeln!(buf, "line {line}, col {column}")?;

        let width = line.to_string().len();
        if line > 1 {
            let prev = line - 1;
            writeln!(buf, "{prev:>width$} | {}", lines.line_str(prev))?;
        }
        writeln!(buf, "{line:>width$} | {}", lines.line_str(line))?;
        write!(buf, "{:width$} | ", "")?;
        for _ in 1..column {
            buf.write_char('-')?;
        }
        buf.write_char('^')
    }
}

impl Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.message_into(f)
    }
}

impl std::error::Error for ParseFailure {}

#[cfg(test)]
mod tests {
    use super::{Expectation, FailureRecord};

    fn lit(text: &str) -> Expectation {
        Expectation::Literal {
            text: text.into(),
            ignore_case: false,
        }
    }

    #[test]
    fn furthest_wins() {
        let mut record = FailureRecord::new();
        record.record(3, lit("a"));
        record.record(1, lit("b"));
        assert_eq!(record.offset(), 3);
        assert_eq!(record.expected(), &[lit("a")]);

        record.record(3, lit("c"));
        record.record(3, lit("a"));
        assert_eq!(record.expected(), &[lit("a"), lit("c")]);

        record.record(5, Expectation::End);
        assert_eq!(record.offset(), 5);
        assert_eq!(record.expected(), &[Expectation::End]);
    }

    #[test]
    fn message_joins() {
        let src = "let y = }";
        let mut record = FailureRecord::new();
        record.record(8, Expectation::Named("number"));
        record.record(8, lit("("));
        record.record(8, Expectation::Named("identifier"));
        let failure = record.into_failure(src);
        assert_eq!(
            failure.message(),
            r#"Expected "(", identifier, or number but found "}"."#
        );
    }

    #[test]
    fn message_two_and_end() {
        let mut record = FailureRecord::new();
        record.record(2, lit("]"));
        record.record(2, lit(","));
        let failure = record.into_failure("[1");
        assert_eq!(failure.found, None);
        assert_eq!(
            failure.message(),
            r#"Expected "," or "]" but end of input found."#
        );
    }

    #[test]
    fn escapes_found() {
        let mut record = FailureRecord::new();
        record.record(1, Expectation::Any);
        let failure = record.into_failure("a\nb");
        assert_eq!(
            failure.message(),
            r#"Expected any character but found "\n"."#
        );
    }

    #[test]
    fn render_excerpt() {
        let src = "let x = 1\nlet y = }\n";
        let mut record = FailureRecord::new();
        record.record(18, Expectation::Named("expression"));
        let rendered = record.into_failure(src).render(src);
        let expected = "\
Expected expression but found \"}\".
line 2, col 9
1 | let x = 1
2 | let y = }
  | --------^";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn render_first_line() {
        let src = "}";
        let mut record = FailureRecord::new();
        record.record(0, Expectation::End);
        let rendered = record.into_failure(src).render(src);
        assert_eq!(
            rendered,
            "Expected end of input but found \"}\".\nline 1, col 1\n1 | }\n  | ^"
        );
    }

    #[test]
    fn render_wide_gutter() {
        let src = "\n".repeat(9) + "x";
        let mut record = FailureRecord::new();
        record.record(10, Expectation::End);
        let rendered = record.into_failure(&src).render(&src);
        assert!(rendered.ends_with(" 9 | \n10 | x\n   | -^"), "{rendered}");
    }
}
