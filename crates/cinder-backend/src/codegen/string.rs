use cinder_parser::ast::StrPart;

use super::{GenCx, Result};

impl GenCx {
    /// A double quoted literal for single line text, a template literal for everything else.
    pub(super) fn string(&mut self, parts: &[StrPart]) -> Result<String> {
        match parts {
            [] => return Ok("\"\"".to_owned()),
            [StrPart::Text(text)] if !text.contains(['\n', '\r']) => return Ok(plain(text)),
            _ => {}
        }

        let mut buf = String::from("`");
        for part in parts {
            match part {
                StrPart::Text(text) => template_text(&mut buf, text),
                StrPart::Expr(expr) => {
                    let expr = self.expr(expr)?;
                    buf.push_str("${");
                    buf.push_str(&expr);
                    buf.push('}');
                }
            }
        }
        buf.push('`');
        Ok(buf)
    }
}

/// Source escapes carry over as written, except `\#` which only means something to cinder.
pub(super) fn plain(text: &str) -> String {
    let mut buf = String::with_capacity(text.len() + 2);
    buf.push('"');
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            // a line break would end the literal
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\\' => match chars.next() {
                Some('#') => buf.push('#'),
                Some(next) => {
                    buf.push('\\');
                    buf.push(next);
                }
                None => buf.push('\\'),
            },
            c => buf.push(c),
        }
    }
    buf.push('"');
    buf
}

fn template_text(buf: &mut String, text: &str) {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('#') => buf.push('#'),
                Some(next) => {
                    buf.push('\\');
                    buf.push(next);
                }
                None => buf.push('\\'),
            },
            '`' => buf.push_str("\\`"),
            '$' if chars.peek() == Some(&'{') => buf.push_str("\\$"),
            c => buf.push(c),
        }
    }
}

/// A single quoted string, whose backslashes are literal, as a double quoted literal.
pub(super) fn raw(text: &str) -> String {
    let mut buf = String::with_capacity(text.len() + 2);
    buf.push('"');
    for c in text.chars() {
        match c {
            '\\' => buf.push_str("\\\\"),
            '"' => buf.push_str("\\\""),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            c => buf.push(c),
        }
    }
    buf.push('"');
    buf
}
