use cranelift_bitset::ScalarBitSet;

/// A set of characters described by inclusive ranges, optionally negated.
///
/// Ascii members are stored in a bitset so that the common case doesn't touch `ranges`.
#[derive(Clone, Debug)]
pub struct CharClass {
    ascii: ScalarBitSet<u128>,
    /// only the parts of the ranges above ascii
    wide: Vec<(char, char)>,
    negated: bool,
    description: String,
}

impl CharClass {
    pub fn new(ranges: &[(char, char)], negated: bool) -> CharClass {
        let mut ascii = ScalarBitSet::new();
        let mut wide = Vec::new();

        for &(lo, hi) in ranges {
            let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
            for c in lo..=hi.min('\x7f') {
                ascii.insert(c as u8);
            }
            if hi > '\x7f' {
                wide.push((lo.max('\u{80}'), hi));
            }
        }

        CharClass {
            ascii,
            wide,
            negated,
            description: describe(ranges, negated),
        }
    }

    pub fn contains(&self, c: char) -> bool {
        let member = if c.is_ascii() {
            self.ascii.contains(c as u8)
        } else {
            self.wide.iter().any(|&(lo, hi)| lo <= c && c <= hi)
        };
        member != self.negated
    }

    /// Display form used in diagnostics, `[a-z_]` or `[^"\\]`.
    pub fn description(&self) -> &str {
        &self.description
    }
}

fn describe(ranges: &[(char, char)], negated: bool) -> String {
    let mut buf = String::from("[");
    if negated {
        buf.push('^');
    }
    for &(lo, hi) in ranges {
        push_class_char(&mut buf, lo);
        if lo != hi {
            buf.push('-');
            push_class_char(&mut buf, hi);
        }
    }
    buf.push(']');
    buf
}

fn push_class_char(buf: &mut String, c: char) {
    match c {
        '\\' | ']' | '^' | '-' => {
            buf.push('\\');
            buf.push(c);
        }
        '\n' => buf.push_str("\\n"),
        '\r' => buf.push_str("\\r"),
        '\t' => buf.push_str("\\t"),
        _ => buf.push(c),
    }
}
