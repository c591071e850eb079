use cinder_runtime::{
    grammar::{action, choice, label, lit, not, opt, pick, r, seq},
    Value,
};

use super::{lexical::is_keyword, list_of, node, Builder, Caps, Out};
use crate::{
    ast::{ArrayItem, Param, Pattern, PatternProp},
    fragment::PatternElement,
};

pub(super) fn rules(b: &mut Builder) {
    b.named(
        "Pattern",
        "pattern",
        choice([
            r("ObjectPattern"),
            r("ArrayPattern"),
            action(r("Identifier"), |c| {
                node(Pattern::Ident(c.value().into_text()?))
            }),
        ]),
    );
    b.rule(
        "ObjectPattern",
        action(
            label("elements", list_of("ObjectPatternElement", "{", "}")),
            object_pattern,
        ),
    );
    b.rule(
        "ObjectPatternElement",
        choice([
            action(
                seq([lit("..."), r("_"), label("name", r("Identifier"))]),
                |c| node(PatternElement::Rest(Pattern::Ident(c.text("name")?))),
            ),
            action(
                seq([
                    label("key", r("IdentifierName")),
                    label(
                        "value",
                        opt(pick(3, seq([r("_"), lit(":"), r("__"), r("Pattern")]))),
                    ),
                    label("default", opt(r("Default"))),
                ]),
                |c| {
                    let key = c.text("key")?;
                    let value = c.opt::<Pattern>("value")?;
                    // a shorthand binds the key itself
                    if value.is_none() && is_keyword(&key) {
                        return None;
                    }
                    node(PatternElement::Prop(PatternProp {
                        key,
                        value,
                        default: c.opt("default")?,
                    }))
                },
            ),
        ]),
    );
    b.rule(
        "ArrayPattern",
        action(
            label("elements", list_of("ArrayPatternElement", "[", "]")),
            array_pattern,
        ),
    );
    b.rule(
        "ArrayPatternElement",
        choice([
            action(
                seq([lit("..."), r("_"), label("pattern", r("Pattern"))]),
                |c| node(PatternElement::Rest(c.node("pattern")?)),
            ),
            action(
                seq([
                    label("pattern", r("Pattern")),
                    label("default", opt(r("Default"))),
                ]),
                |c| {
                    node(PatternElement::Item(ArrayItem {
                        pattern: c.node("pattern")?,
                        default: c.opt("default")?,
                    }))
                },
            ),
        ]),
    );
    b.rule(
        "Default",
        pick(
            4,
            seq([
                r("_"),
                lit("="),
                not(lit("=")),
                r("__"),
                r("Expression"),
            ]),
        ),
    );

    b.rule(
        "ParamList",
        action(list_of("Param", "(", ")"), |c| {
            let params: Vec<Param> = c.value().into_nodes()?;
            let rest_count = params.iter().filter(|p| p.rest).count();
            if rest_count > 1 || (rest_count == 1 && !params.last()?.rest) {
                return None;
            }
            Some(Value::List(params.into_iter().map(Value::node).collect()))
        }),
    );
    b.rule(
        "Param",
        choice([
            action(
                seq([lit("..."), r("_"), label("pattern", r("Pattern"))]),
                |c| {
                    node(Param {
                        pattern: c.node("pattern")?,
                        default: None,
                        rest: true,
                    })
                },
            ),
            action(
                seq([
                    label("pattern", r("Pattern")),
                    label("default", opt(r("Default"))),
                ]),
                |c| {
                    node(Param {
                        pattern: c.node("pattern")?,
                        default: c.opt("default")?,
                        rest: false,
                    })
                },
            ),
        ]),
    );
}

/// Splits off the rest element, which has to come last.
fn split_rest(elements: Vec<PatternElement>) -> Option<(Vec<PatternElement>, Option<Pattern>)> {
    let mut elements = elements;
    let rest = match elements.last() {
        Some(PatternElement::Rest(_)) => match elements.pop() {
            Some(PatternElement::Rest(pattern)) => Some(pattern),
            _ => None,
        },
        _ => None,
    };
    if elements
        .iter()
        .any(|e| matches!(e, PatternElement::Rest(_)))
    {
        return None;
    }
    Some((elements, rest))
}

fn object_pattern(c: &mut Caps) -> Out {
    let (elements, rest) = split_rest(c.nodes("elements")?)?;
    let props = elements
        .into_iter()
        .map(|e| match e {
            PatternElement::Prop(prop) => Some(prop),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    let rest = match rest {
        Some(Pattern::Ident(name)) => Some(name),
        Some(_) => return None,
        None => None,
    };
    node(Pattern::Object { props, rest })
}

fn array_pattern(c: &mut Caps) -> Out {
    let (elements, rest) = split_rest(c.nodes("elements")?)?;
    let items = elements
        .into_iter()
        .map(|e| match e {
            PatternElement::Item(item) => Some(item),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    node(Pattern::Array {
        items,
        rest: rest.map(Box::new),
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{ArrayItem, DeclKind, Expr, Pattern, PatternProp, Stmt},
        parse,
    };

    fn pattern(src: &str) -> Pattern {
        let src = format!("let {src} = x");
        let program = parse(&src).unwrap();
        match program.body.as_slice() {
            [Stmt::Let {
                kind: DeclKind::Let,
                pattern,
                ..
            }] => pattern.clone(),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn object_patterns() {
        assert_eq!(
            pattern("{a, b: {c}, d = 1, ...rest}"),
            Pattern::Object {
                props: vec![
                    PatternProp {
                        key: "a".into(),
                        value: None,
                        default: None,
                    },
                    PatternProp {
                        key: "b".into(),
                        value: Some(Pattern::Object {
                            props: vec![PatternProp {
                                key: "c".into(),
                                value: None,
                                default: None,
                            }],
                            rest: None,
                        }),
                        default: None,
                    },
                    PatternProp {
                        key: "d".into(),
                        value: None,
                        default: Some(Expr::Number("1".into())),
                    },
                ],
                rest: Some("rest".into()),
            }
        );
        // keyword keys need a binding
        assert!(matches!(
            pattern("{default: d}"),
            Pattern::Object { .. }
        ));
        assert!(parse("let {default} = x").is_err());
    }

    #[test]
    fn array_patterns() {
        assert_eq!(
            pattern("[a, [b], c = 2, ...tail]"),
            Pattern::Array {
                items: vec![
                    ArrayItem {
                        pattern: Pattern::Ident("a".into()),
                        default: None,
                    },
                    ArrayItem {
                        pattern: Pattern::Array {
                            items: vec![ArrayItem {
                                pattern: Pattern::Ident("b".into()),
                                default: None,
                            }],
                            rest: None,
                        },
                        default: None,
                    },
                    ArrayItem {
                        pattern: Pattern::Ident("c".into()),
                        default: Some(Expr::Number("2".into())),
                    },
                ],
                rest: Some(Box::new(Pattern::Ident("tail".into()))),
            }
        );
    }

    #[test]
    fn rest_must_be_last() {
        assert!(parse("let [...a, b] = x").is_err());
        assert!(parse("let {...a, b} = x").is_err());
        assert!(parse("let {...a, ...b} = x").is_err());
    }
}
