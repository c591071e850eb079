use cinder_runtime::{
    grammar::{
        action, any, choice, class, label, lit, lit_i, not, not_class, opt, pick, plus, r, seq,
        star, text, Term,
    },
    Value,
};

use super::{kw, node, Builder, Caps, Out, T};
use crate::ast::{Expr, StrPart};

pub(crate) const KEYWORDS: &[&str] = &[
    "and",
    "async",
    "await",
    "break",
    "catch",
    "const",
    "continue",
    "default",
    "do",
    "else",
    "export",
    "false",
    "finally",
    "fn",
    "for",
    "guard",
    "if",
    "import",
    "in",
    "instanceof",
    "let",
    "loop",
    "new",
    "not",
    "null",
    "or",
    "return",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "undefined",
    "while",
    "yield",
];

pub(crate) fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

const DIGITS: &[(char, char)] = &[('0', '9')];
const DIGITS_SEP: &[(char, char)] = &[('0', '9'), ('_', '_')];
const HEX_DIGITS: &[(char, char)] = &[('0', '9'), ('a', 'f'), ('A', 'F')];
const HEX_DIGITS_SEP: &[(char, char)] = &[('0', '9'), ('a', 'f'), ('A', 'F'), ('_', '_')];

pub(super) fn rules(b: &mut Builder) {
    b.silent(
        "_",
        star(choice([class(&[(' ', ' '), ('\t', '\t')]), r("Comment")])),
    );
    b.silent(
        "__",
        star(choice([
            class(&[(' ', ' '), ('\t', '\t'), ('\n', '\n'), ('\r', '\r')]),
            r("Comment"),
        ])),
    );
    b.named(
        "Newline",
        "newline",
        choice([lit("\r\n"), lit("\n"), lit("\r")]),
    );
    b.rule("Comment", choice([r("LineComment"), r("BlockComment")]));
    b.rule(
        "LineComment",
        seq([lit("//"), star(not_class(&[('\n', '\n'), ('\r', '\r')]))]),
    );
    b.rule(
        "BlockComment",
        seq([lit("/*"), star(seq([not(lit("*/")), any()])), lit("*/")]),
    );

    b.rule(
        "IdentStart",
        class(&[('a', 'z'), ('A', 'Z'), ('_', '_'), ('$', '$')]),
    );
    b.rule(
        "IdentPart",
        class(&[('a', 'z'), ('A', 'Z'), ('0', '9'), ('_', '_'), ('$', '$')]),
    );
    b.rule(
        "Keyword",
        Term::Choice(KEYWORDS.iter().map(|word| kw(word)).collect()),
    );
    b.named("Identifier", "identifier", name(true));
    // member and property names may be keywords
    b.named("IdentifierName", "identifier", name(false));

    b.named(
        "Number",
        "number",
        action(
            seq([
                choice([
                    r("HexNumber"),
                    r("BinaryNumber"),
                    r("OctalNumber"),
                    r("DecimalNumber"),
                ]),
                not(r("IdentStart")),
            ]),
            number,
        ),
    );
    b.rule(
        "HexNumber",
        seq([lit_i("0x"), class(HEX_DIGITS), star(class(HEX_DIGITS_SEP))]),
    );
    b.rule(
        "BinaryNumber",
        seq([
            lit_i("0b"),
            class(&[('0', '1')]),
            star(class(&[('0', '1'), ('_', '_')])),
        ]),
    );
    b.rule(
        "OctalNumber",
        seq([
            lit_i("0o"),
            class(&[('0', '7')]),
            star(class(&[('0', '7'), ('_', '_')])),
        ]),
    );
    b.rule(
        "DecimalNumber",
        seq([
            class(DIGITS),
            star(class(DIGITS_SEP)),
            opt(seq([lit("."), class(DIGITS), star(class(DIGITS_SEP))])),
            opt(seq([
                class(&[('e', 'e'), ('E', 'E')]),
                opt(class(&[('+', '+'), ('-', '-')])),
                class(DIGITS),
                star(class(DIGITS_SEP)),
            ])),
        ]),
    );

    b.named(
        "String",
        "string",
        action(
            seq([
                lit("\""),
                label("parts", star(r("StringPart"))),
                lit("\""),
            ]),
            |c| node(Expr::Str(c.nodes("parts")?)),
        ),
    );
    b.rule(
        "StringPart",
        choice([r("Interpolation"), r("StringText")]),
    );
    b.rule(
        "Interpolation",
        action(
            seq([
                lit("#{"),
                r("__"),
                label("expr", r("Expression")),
                r("__"),
                lit("}"),
            ]),
            |c| node(StrPart::Expr(c.node("expr")?)),
        ),
    );
    b.rule(
        "StringText",
        action(plus(r("StringChar")), |c| {
            node(StrPart::Text(c.matched().to_owned()))
        }),
    );
    b.rule(
        "StringChar",
        choice([
            seq([lit("\\"), any()]),
            seq([not(choice([lit("\""), lit("#{")])), any()]),
        ]),
    );
    b.named(
        "RawString",
        "string",
        action(
            seq([
                lit("'"),
                text(star(not_class(&[('\'', '\'')]))),
                lit("'"),
            ]),
            |c| {
                let matched = c.matched();
                node(Expr::RawStr(matched[1..matched.len() - 1].to_owned()))
            },
        ),
    );
    // string literal used as a name, interpolation isn't allowed
    b.rule("PlainString", action(r("String"), plain_string));
}

fn name(exclude_keywords: bool) -> T {
    let name = text(seq([r("IdentStart"), star(r("IdentPart"))]));
    match exclude_keywords {
        true => pick(1, seq([not(r("Keyword")), name])),
        false => name,
    }
}

fn number(c: &mut Caps) -> Out {
    let text = c.matched();
    let (radix_prefixed, digits) = match text.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("0x") => (true, &text[2..]),
        Some(prefix) if prefix.eq_ignore_ascii_case("0b") => (true, &text[2..]),
        Some(prefix) if prefix.eq_ignore_ascii_case("0o") => (true, &text[2..]),
        _ => (false, text),
    };

    // a separator must sit between two digits
    let bytes = digits.as_bytes();
    for (i, &byte) in bytes.iter().enumerate() {
        if byte != b'_' {
            continue;
        }
        let is_digit = |b: &u8| match radix_prefixed {
            true => b.is_ascii_hexdigit(),
            false => b.is_ascii_digit(),
        };
        let before = i.checked_sub(1).and_then(|i| bytes.get(i));
        let after = bytes.get(i + 1);
        if !before.map_or(false, is_digit) || !after.map_or(false, is_digit) {
            return None;
        }
    }

    node(Expr::Number(text.to_owned()))
}

fn plain_string(c: &mut Caps) -> Out {
    let Expr::Str(parts) = c.value().into_node::<Expr>()? else {
        return None;
    };
    let text = match parts.as_slice() {
        [] => String::new(),
        [StrPart::Text(text)] => text.clone(),
        _ => return None,
    };
    Some(Value::Text(text))
}
