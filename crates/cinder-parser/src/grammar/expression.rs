use cinder_runtime::{
    grammar::{action, choice, class, label, lit, not, opt, pick, r, seq, star, text},
    Value,
};

use super::{kw, list_of, node, Builder, Caps, Out, T};
use crate::{
    ast::{
        BinaryOp, Block, Element, Expr, Function, Param, Pattern, PipeStage, Property, PropertyKey,
        UnaryOp,
    },
    fragment::{Operand, Suffix},
};

pub(super) fn rules(b: &mut Builder) {
    b.named(
        "Expression",
        "expression",
        choice([r("Yield"), r("Pipeline")]),
    );
    b.rule(
        "Yield",
        action(
            seq([
                kw("yield"),
                label("delegate", opt(seq([r("_"), lit("*")]))),
                label("argument", opt(pick(1, seq([r("_"), r("Pipeline")])))),
            ]),
            |c| {
                let argument = c.opt::<Expr>("argument")?.map(Box::new);
                node(Expr::Yield {
                    argument,
                    delegate: c.flag("delegate"),
                })
            },
        ),
    );
    b.rule(
        "Pipeline",
        action(
            seq([
                label("head", r("Range")),
                label(
                    "stages",
                    star(pick(3, seq([r("__"), lit("|>"), r("__"), r("PipeStage")]))),
                ),
            ]),
            pipeline,
        ),
    );
    b.rule(
        "PipeStage",
        choice([
            r("BindStage"),
            action(r("Postfix"), |c| {
                node(PipeStage::Call(c.value().into_node()?))
            }),
        ]),
    );
    b.rule(
        "BindStage",
        action(
            seq([
                lit("("),
                r("_"),
                label("name", r("Identifier")),
                r("_"),
                lit(":"),
                r("__"),
                label("expr", r("Expression")),
                r("__"),
                lit(")"),
            ]),
            |c| {
                node(PipeStage::Bind {
                    name: c.text("name")?,
                    expr: c.node("expr")?,
                })
            },
        ),
    );
    b.rule(
        "Range",
        choice([
            action(
                seq([
                    label("start", r("Conditional")),
                    r("_"),
                    lit("->"),
                    r("__"),
                    label("end", r("Conditional")),
                    label(
                        "step",
                        opt(pick(3, seq([r("_"), kw("by"), r("_"), r("Conditional")]))),
                    ),
                ]),
                |c| {
                    node(Expr::Range {
                        start: Box::new(c.node("start")?),
                        end: Box::new(c.node("end")?),
                        step: c.opt::<Expr>("step")?.map(Box::new),
                    })
                },
            ),
            r("Conditional"),
        ]),
    );
    b.rule(
        "Conditional",
        choice([
            action(
                seq([
                    label("test", r("Coalesce")),
                    r("_"),
                    lit("?"),
                    not(class(&[('?', '?'), ('.', '.')])),
                    r("__"),
                    label("consequent", r("Conditional")),
                    r("__"),
                    lit(":"),
                    r("__"),
                    label("alternate", r("Conditional")),
                ]),
                |c| {
                    node(Expr::Conditional {
                        test: Box::new(c.node("test")?),
                        consequent: Box::new(c.node("consequent")?),
                        alternate: Box::new(c.node("alternate")?),
                    })
                },
            ),
            r("Coalesce"),
        ]),
    );

    binary_level(b, "Coalesce", "Or", seq([lit("??"), not(lit("="))]));
    binary_level(
        b,
        "Or",
        "And",
        choice([seq([lit("||"), not(lit("="))]), kw("or")]),
    );
    binary_level(
        b,
        "And",
        "Equality",
        choice([seq([lit("&&"), not(lit("="))]), kw("and")]),
    );
    binary_level(
        b,
        "Equality",
        "Relational",
        seq([choice([lit("=="), lit("!=")]), not(lit("="))]),
    );
    binary_level(
        b,
        "Relational",
        "Additive",
        choice([
            lit("<="),
            lit(">="),
            lit("<"),
            lit(">"),
            kw("instanceof"),
        ]),
    );
    binary_level(
        b,
        "Additive",
        "Multiplicative",
        choice([
            seq([lit("+"), not(lit("="))]),
            seq([lit("-"), not(class(&[('=', '='), ('>', '>')]))]),
        ]),
    );
    binary_level(
        b,
        "Multiplicative",
        "Exponent",
        choice([
            seq([lit("*"), not(class(&[('*', '*'), ('=', '=')]))]),
            seq([lit("/"), not(class(&[('/', '/'), ('*', '*'), ('=', '=')]))]),
            seq([lit("%"), not(lit("="))]),
        ]),
    );

    // right associative
    b.rule(
        "Exponent",
        choice([
            action(
                seq([
                    label("left", r("Unary")),
                    r("_"),
                    lit("**"),
                    not(lit("=")),
                    r("__"),
                    label("right", r("Exponent")),
                ]),
                |c| {
                    node(Expr::Binary {
                        op: BinaryOp::Pow,
                        left: Box::new(c.node("left")?),
                        right: Box::new(c.node("right")?),
                    })
                },
            ),
            r("Unary"),
        ]),
    );
    b.rule(
        "Unary",
        choice([
            action(
                seq([kw("await"), r("_"), label("expr", r("Unary"))]),
                |c| node(Expr::Await(Box::new(c.node("expr")?))),
            ),
            action(
                seq([
                    label(
                        "op",
                        text(choice([
                            lit("!"),
                            kw("not"),
                            kw("typeof"),
                            lit("-"),
                            lit("+"),
                        ])),
                    ),
                    r("_"),
                    label("expr", r("Unary")),
                ]),
                |c| {
                    let op = UnaryOp::from_token(&c.text("op")?)?;
                    node(Expr::Unary {
                        op,
                        expr: Box::new(c.node("expr")?),
                    })
                },
            ),
            r("Postfix"),
        ]),
    );

    b.rule(
        "Postfix",
        action(
            seq([
                label("head", r("Primary")),
                label("tail", star(r("Suffix"))),
            ]),
            fold_suffixes,
        ),
    );
    b.rule(
        "Suffix",
        choice([
            r("Call"),
            r("OptionalCall"),
            r("OptionalMember"),
            r("Member"),
            r("Index"),
        ]),
    );
    b.rule(
        "Call",
        action(label("args", list_of("Argument", "(", ")")), |c| {
            node(Suffix::Call {
                args: c.nodes("args")?,
                optional: false,
            })
        }),
    );
    b.rule(
        "OptionalCall",
        action(
            seq([lit("?."), label("args", list_of("Argument", "(", ")"))]),
            |c| {
                node(Suffix::Call {
                    args: c.nodes("args")?,
                    optional: true,
                })
            },
        ),
    );
    b.rule(
        "OptionalMember",
        action(
            seq([
                r("__"),
                lit("?."),
                label("property", r("IdentifierName")),
            ]),
            |c| {
                node(Suffix::Member {
                    property: c.text("property")?,
                    optional: true,
                })
            },
        ),
    );
    b.rule(
        "Member",
        action(
            seq([
                r("__"),
                lit("."),
                not(lit(".")),
                label("property", r("IdentifierName")),
            ]),
            |c| {
                node(Suffix::Member {
                    property: c.text("property")?,
                    optional: false,
                })
            },
        ),
    );
    b.rule(
        "Index",
        action(
            seq([
                r("_"),
                lit("["),
                r("__"),
                label("index", r("Expression")),
                r("__"),
                lit("]"),
            ]),
            |c| node(Suffix::Index(c.node("index")?)),
        ),
    );
    b.rule(
        "Argument",
        choice([
            action(
                seq([lit("..."), r("__"), label("expr", r("Expression"))]),
                |c| node(Element::Spread(c.node("expr")?)),
            ),
            action(r("Expression"), |c| {
                node(Element::Expr(c.value().into_node()?))
            }),
        ]),
    );

    b.rule(
        "Primary",
        choice([
            r("Arrow"),
            r("FunctionExpression"),
            r("DoExpression"),
            r("NewExpression"),
            r("Parenthesized"),
            r("Array"),
            r("Object"),
            r("Number"),
            r("String"),
            r("RawString"),
            r("Literal"),
            action(r("Identifier"), |c| {
                node(Expr::Ident(c.value().into_text()?))
            }),
        ]),
    );
    b.rule(
        "Literal",
        action(
            text(choice([
                kw("true"),
                kw("false"),
                kw("null"),
                kw("undefined"),
                kw("this"),
            ])),
            |c| {
                let expr = match c.matched() {
                    "true" => Expr::Bool(true),
                    "false" => Expr::Bool(false),
                    "null" => Expr::Null,
                    "undefined" => Expr::Undefined,
                    _ => Expr::This,
                };
                node(expr)
            },
        ),
    );
    b.rule(
        "Arrow",
        action(
            seq([
                label("async", opt(seq([kw("async"), r("_")]))),
                label("params", r("ArrowParams")),
                r("_"),
                lit("=>"),
                r("__"),
                label("body", r("ArrowBody")),
            ]),
            |c| {
                node(Expr::Function(Box::new(Function {
                    name: None,
                    params: c.nodes("params")?,
                    body: c.node("body")?,
                    is_async: c.flag("async"),
                    is_generator: false,
                    is_arrow: true,
                })))
            },
        ),
    );
    b.rule(
        "ArrowParams",
        choice([
            r("ParamList"),
            action(r("Identifier"), |c| {
                let param = Param {
                    pattern: Pattern::Ident(c.value().into_text()?),
                    default: None,
                    rest: false,
                };
                Some(Value::List(vec![Value::node(param)]))
            }),
        ]),
    );
    b.rule(
        "ArrowBody",
        choice([
            r("Block"),
            action(r("Expression"), |c| {
                node(Block {
                    body: Vec::new(),
                    tail: Some(Box::new(c.value().into_node()?)),
                })
            }),
        ]),
    );
    b.rule(
        "FunctionExpression",
        action(
            seq([
                label("async", opt(seq([kw("async"), r("_")]))),
                kw("fn"),
                label("generator", opt(seq([r("_"), lit("*")]))),
                r("_"),
                label("name", opt(r("Identifier"))),
                r("_"),
                label("params", r("ParamList")),
                r("_"),
                label("body", r("Block")),
            ]),
            |c| {
                node(Expr::Function(Box::new(Function {
                    name: c.take("name").into_text(),
                    params: c.nodes("params")?,
                    body: c.node("body")?,
                    is_async: c.flag("async"),
                    is_generator: c.flag("generator"),
                    is_arrow: false,
                })))
            },
        ),
    );
    b.rule(
        "DoExpression",
        action(
            seq([kw("do"), r("_"), label("body", r("Block"))]),
            |c| node(Expr::Do(c.node("body")?)),
        ),
    );
    b.rule(
        "NewExpression",
        action(
            seq([
                kw("new"),
                r("_"),
                label("callee", r("NewCallee")),
                label("args", opt(list_of("Argument", "(", ")"))),
            ]),
            |c| {
                node(Expr::New {
                    callee: Box::new(c.node("callee")?),
                    args: c.nodes("args")?,
                })
            },
        ),
    );
    b.rule(
        "NewCallee",
        action(
            seq([
                label("head", r("Primary")),
                label("tail", star(r("Member"))),
            ]),
            fold_suffixes,
        ),
    );
    b.rule(
        "Parenthesized",
        pick(
            2,
            seq([
                lit("("),
                r("__"),
                r("Expression"),
                r("__"),
                lit(")"),
            ]),
        ),
    );
    b.rule(
        "Array",
        action(label("items", list_of("Argument", "[", "]")), |c| {
            node(Expr::Array(c.nodes("items")?))
        }),
    );
    b.rule(
        "Object",
        action(label("props", list_of("Property", "{", "}")), |c| {
            node(Expr::Object(c.nodes("props")?))
        }),
    );
    b.rule(
        "Property",
        choice([
            action(
                seq([lit("..."), r("__"), label("expr", r("Expression"))]),
                |c| node(Property::Spread(c.node("expr")?)),
            ),
            action(
                seq([
                    label("key", r("PropertyKey")),
                    r("_"),
                    lit(":"),
                    r("__"),
                    label("value", r("Expression")),
                ]),
                |c| {
                    node(Property::KeyValue {
                        key: c.node("key")?,
                        value: c.node("value")?,
                    })
                },
            ),
            action(r("Identifier"), |c| {
                node(Property::Shorthand(c.value().into_text()?))
            }),
        ]),
    );
    b.rule(
        "PropertyKey",
        choice([
            action(r("IdentifierName"), |c| {
                node(PropertyKey::Ident(c.value().into_text()?))
            }),
            action(r("PlainString"), |c| {
                node(PropertyKey::Str(c.value().into_text()?))
            }),
            action(r("Number"), |c| match c.value().into_node()? {
                Expr::Number(n) => node(PropertyKey::Number(n)),
                _ => None,
            }),
            action(
                seq([
                    lit("["),
                    r("__"),
                    label("expr", r("Expression")),
                    r("__"),
                    lit("]"),
                ]),
                |c| node(PropertyKey::Computed(c.node("expr")?)),
            ),
        ]),
    );
}

/// `next (op next)*` folded to the left.
fn binary_level(b: &mut Builder, name: &'static str, next: &'static str, op: T) {
    b.rule(
        name,
        action(
            seq([
                label("head", r(next)),
                label(
                    "tail",
                    star(action(
                        seq([
                            r("_"),
                            label("op", text(op)),
                            r("__"),
                            label("right", r(next)),
                        ]),
                        operand,
                    )),
                ),
            ]),
            fold_binary,
        ),
    );
}

fn operand(c: &mut Caps) -> Out {
    let op = BinaryOp::from_token(&c.text("op")?)?;
    node(Operand {
        op,
        right: c.node("right")?,
    })
}

fn fold_binary(c: &mut Caps) -> Out {
    let head: Expr = c.node("head")?;
    let tail: Vec<Operand> = c.nodes("tail")?;
    let expr = tail.into_iter().fold(head, |left, Operand { op, right }| {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    });
    node(expr)
}

fn fold_suffixes(c: &mut Caps) -> Out {
    let head: Expr = c.node("head")?;
    let tail: Vec<Suffix> = c.nodes("tail")?;
    let expr = tail.into_iter().fold(head, |object, suffix| match suffix {
        Suffix::Call { args, optional } => Expr::Call {
            callee: Box::new(object),
            args,
            optional,
        },
        Suffix::Member { property, optional } => Expr::Member {
            object: Box::new(object),
            property,
            optional,
        },
        Suffix::Index(index) => Expr::Index {
            object: Box::new(object),
            index: Box::new(index),
        },
    });
    node(expr)
}

fn pipeline(c: &mut Caps) -> Out {
    let head: Expr = c.node("head")?;
    let stages: Vec<PipeStage> = c.nodes("stages")?;
    if stages.is_empty() {
        return node(head);
    }
    node(Expr::Pipeline {
        head: Box::new(head),
        stages,
    })
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{BinaryOp, Element, Expr, PipeStage, Property, PropertyKey, Stmt, StrPart, UnaryOp},
        parse,
    };

    fn expr(src: &str) -> Expr {
        let program = parse(src).unwrap();
        match program.body.as_slice() {
            [Stmt::Expr(e)] => e.clone(),
            other => panic!("{other:?}"),
        }
    }

    fn ident(name: &str) -> Box<Expr> {
        Box::new(Expr::ident(name))
    }

    fn num(n: &str) -> Box<Expr> {
        Box::new(Expr::Number(n.into()))
    }

    #[test]
    fn precedence() {
        assert_eq!(
            expr("a + b * c"),
            Expr::Binary {
                op: BinaryOp::Add,
                left: ident("a"),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: ident("b"),
                    right: ident("c"),
                }),
            }
        );
        // left associative
        assert_eq!(
            expr("a - b - c"),
            Expr::Binary {
                op: BinaryOp::Sub,
                left: Box::new(Expr::Binary {
                    op: BinaryOp::Sub,
                    left: ident("a"),
                    right: ident("b"),
                }),
                right: ident("c"),
            }
        );
    }

    #[test]
    fn exponent_is_right_associative() {
        assert_eq!(
            expr("2 ** 3 ** 2"),
            Expr::Binary {
                op: BinaryOp::Pow,
                left: num("2"),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Pow,
                    left: num("3"),
                    right: num("2"),
                }),
            }
        );
    }

    #[test]
    fn keyword_operators() {
        assert_eq!(
            expr("not a and b or c"),
            Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(Expr::Binary {
                    op: BinaryOp::And,
                    left: Box::new(Expr::Unary {
                        op: UnaryOp::Not,
                        expr: ident("a"),
                    }),
                    right: ident("b"),
                }),
                right: ident("c"),
            }
        );
        assert!(matches!(
            expr("a instanceof B"),
            Expr::Binary {
                op: BinaryOp::InstanceOf,
                ..
            }
        ));
    }

    #[test]
    fn operators_across_lines() {
        assert_eq!(expr("a +\n  b"), expr("a + b"));
        assert_eq!(parse("a\n+ b").map(|p| p.body.len()), Ok(2));
    }

    #[test]
    fn pipelines() {
        assert_eq!(
            expr("5 |> (x: x + 1)\n  |> print"),
            Expr::Pipeline {
                head: num("5"),
                stages: vec![
                    PipeStage::Bind {
                        name: "x".into(),
                        expr: Expr::Binary {
                            op: BinaryOp::Add,
                            left: ident("x"),
                            right: num("1"),
                        },
                    },
                    PipeStage::Call(Expr::ident("print")),
                ],
            }
        );
    }

    #[test]
    fn ranges() {
        assert_eq!(
            expr("0 -> n by 2"),
            Expr::Range {
                start: num("0"),
                end: ident("n"),
                step: Some(num("2")),
            }
        );
        assert!(matches!(expr("a - 1 -> b"), Expr::Range { step: None, .. }));
    }

    #[test]
    fn postfix_chains() {
        assert_eq!(
            expr("a.b?.c(1, ...d)[0]"),
            Expr::Index {
                object: Box::new(Expr::Call {
                    callee: Box::new(Expr::Member {
                        object: Box::new(Expr::Member {
                            object: ident("a"),
                            property: "b".into(),
                            optional: false,
                        }),
                        property: "c".into(),
                        optional: true,
                    }),
                    args: vec![
                        Element::Expr(Expr::Number("1".into())),
                        Element::Spread(Expr::ident("d")),
                    ],
                    optional: false,
                }),
                index: num("0"),
            }
        );
        assert!(matches!(expr("f?.(x)"), Expr::Call { optional: true, .. }));
        // member access continues on the next line
        assert!(matches!(expr("list\n  .map(f)"), Expr::Call { .. }));
        // keywords are valid member names
        assert!(matches!(expr("promise.catch"), Expr::Member { .. }));
    }

    #[test]
    fn conditional_and_coalesce() {
        assert!(matches!(
            expr("a ?? b ? c : d"),
            Expr::Conditional { .. }
        ));
        assert!(matches!(
            expr("a?.b ?? c"),
            Expr::Binary {
                op: BinaryOp::Coalesce,
                ..
            }
        ));
    }

    #[test]
    fn functions() {
        let Expr::Function(f) = expr("async (a, b = 1, ...rest) => a") else {
            panic!()
        };
        assert!(f.is_async && f.is_arrow);
        assert_eq!(f.params.len(), 3);
        assert!(f.params[2].rest);
        assert!(f.params[1].default.is_some());
        assert_eq!(f.body.tail.as_deref(), Some(&Expr::ident("a")));

        let Expr::Function(f) = expr("(fn* gen(x) { yield* x })") else {
            panic!()
        };
        assert!(f.is_generator && !f.is_arrow);
        assert_eq!(f.name.as_deref(), Some("gen"));
        assert!(matches!(
            f.body.tail.as_deref(),
            Some(Expr::Yield { delegate: true, .. })
        ));

        assert!(matches!(expr("x => x * 2"), Expr::Function(_)));
        // rest parameter must be last
        assert!(parse("(...a, b) => a").is_err());
    }

    #[test]
    fn literals() {
        assert_eq!(
            expr("\"a #{b} \\#{c}\""),
            Expr::Str(vec![
                StrPart::Text("a ".into()),
                StrPart::Expr(Expr::ident("b")),
                StrPart::Text(" \\#{c}".into()),
            ])
        );
        assert_eq!(expr("'raw \\n'"), Expr::RawStr("raw \\n".into()));
        assert_eq!(expr("[1, ...xs,]"), Expr::Array(vec![
            Element::Expr(Expr::Number("1".into())),
            Element::Spread(Expr::ident("xs")),
        ]));
        assert_eq!(expr("null"), Expr::Null);
        assert_eq!(expr("undefined"), Expr::Undefined);
        assert_eq!(expr("true"), Expr::Bool(true));
    }

    #[test]
    fn objects() {
        assert_eq!(
            expr("({a, \"b\": 1, [k]: 2, 3: 4, ...rest})"),
            Expr::Object(vec![
                Property::Shorthand("a".into()),
                Property::KeyValue {
                    key: PropertyKey::Str("b".into()),
                    value: Expr::Number("1".into()),
                },
                Property::KeyValue {
                    key: PropertyKey::Computed(Expr::ident("k")),
                    value: Expr::Number("2".into()),
                },
                Property::KeyValue {
                    key: PropertyKey::Number("3".into()),
                    value: Expr::Number("4".into()),
                },
                Property::Spread(Expr::ident("rest")),
            ])
        );
        // interpolated keys are rejected
        assert!(parse("({\"#{a}\": 1})").is_err());
    }

    #[test]
    fn new_and_do() {
        assert_eq!(
            expr("new a.B(1)"),
            Expr::New {
                callee: Box::new(Expr::Member {
                    object: ident("a"),
                    property: "B".into(),
                    optional: false,
                }),
                args: vec![Element::Expr(Expr::Number("1".into()))],
            }
        );
        let Expr::Do(block) = expr("do {\n  let x = 1\n  x + 1\n}") else {
            panic!()
        };
        assert_eq!(block.body.len(), 1);
        assert!(block.tail.is_some());
    }

    #[test]
    fn await_and_yield() {
        assert_eq!(
            expr("await f()"),
            Expr::Await(Box::new(Expr::Call {
                callee: ident("f"),
                args: vec![],
                optional: false,
            }))
        );
        assert_eq!(
            expr("yield"),
            Expr::Yield {
                argument: None,
                delegate: false,
            }
        );
    }
}
