use cinder_runtime::grammar::{
    action, choice, class, label, lit, not, opt, pick, r, separated, seq, star, text,
};

use super::{kw, list_of, node, Builder, Caps, Out, T};
use crate::{
    ast::{
        AssignOp, AssignTarget, Block, Branch, Catch, DeclKind, Expr, Function, Import, ImportSpec,
        Pattern, Program, Stmt,
    },
    fragment::ImportClause,
};

pub(super) fn rules(b: &mut Builder) {
    b.rule(
        "Program",
        action(
            seq([
                r("__"),
                label("body", opt(r("StatementList"))),
                r("__"),
                star(seq([lit(";"), r("__")])),
            ]),
            |c| {
                node(Program {
                    body: c.nodes("body")?,
                })
            },
        ),
    );
    b.rule("StatementList", separated("Statement", r("Separator")));
    b.rule(
        "Separator",
        seq([
            r("_"),
            choice([lit(";"), r("Newline")]),
            r("__"),
            star(seq([lit(";"), r("__")])),
        ]),
    );
    b.rule(
        "Block",
        action(
            seq([
                lit("{"),
                r("__"),
                label("body", opt(r("StatementList"))),
                r("__"),
                star(seq([lit(";"), r("__")])),
                lit("}"),
            ]),
            block,
        ),
    );

    b.named(
        "Statement",
        "statement",
        choice([
            r("Let"),
            r("FunctionDeclaration"),
            r("If"),
            r("While"),
            r("Loop"),
            r("For"),
            r("Return"),
            r("Break"),
            r("Continue"),
            r("Throw"),
            r("Try"),
            r("Guard"),
            r("Import"),
            r("Export"),
            r("Assign"),
            action(r("Expression"), |c| {
                node(Stmt::Expr(c.value().into_node()?))
            }),
        ]),
    );

    b.rule(
        "Let",
        action(
            seq([
                label("kind", text(choice([kw("let"), kw("const")]))),
                r("_"),
                label("pattern", r("Pattern")),
                label("init", opt(r("Default"))),
            ]),
            |c| {
                let kind = match c.text("kind")?.as_str() {
                    "const" => DeclKind::Const,
                    _ => DeclKind::Let,
                };
                node(Stmt::Let {
                    kind,
                    pattern: c.node("pattern")?,
                    init: c.opt("init")?,
                })
            },
        ),
    );
    b.rule(
        "FunctionDeclaration",
        action(
            seq([
                label("async", opt(seq([kw("async"), r("_")]))),
                kw("fn"),
                label("generator", opt(seq([r("_"), lit("*")]))),
                r("_"),
                label("name", r("Identifier")),
                r("_"),
                label("params", r("ParamList")),
                r("_"),
                label("body", r("Block")),
            ]),
            |c| {
                node(Stmt::Function(Function {
                    name: Some(c.text("name")?),
                    params: c.nodes("params")?,
                    body: c.node("body")?,
                    is_async: c.flag("async"),
                    is_generator: c.flag("generator"),
                    is_arrow: false,
                }))
            },
        ),
    );
    b.rule(
        "If",
        action(
            seq([
                kw("if"),
                r("_"),
                label("test", r("Expression")),
                r("_"),
                label("then", r("Block")),
                label("branches", star(r("ElseIf"))),
                label(
                    "otherwise",
                    opt(pick(3, seq([r("__"), kw("else"), r("_"), r("Block")]))),
                ),
            ]),
            |c| {
                let mut branches = vec![Branch {
                    test: c.node("test")?,
                    body: c.node("then")?,
                }];
                branches.extend(c.nodes::<Branch>("branches")?);
                node(Stmt::If {
                    branches,
                    otherwise: c.opt("otherwise")?,
                })
            },
        ),
    );
    b.rule(
        "ElseIf",
        action(
            seq([
                r("__"),
                kw("else"),
                r("_"),
                kw("if"),
                r("_"),
                label("test", r("Expression")),
                r("_"),
                label("body", r("Block")),
            ]),
            |c| {
                node(Branch {
                    test: c.node("test")?,
                    body: c.node("body")?,
                })
            },
        ),
    );
    b.rule(
        "While",
        action(
            seq([
                kw("while"),
                r("_"),
                label("test", r("Expression")),
                r("_"),
                label("body", r("Block")),
            ]),
            |c| {
                node(Stmt::While {
                    test: c.node("test")?,
                    body: c.node("body")?,
                })
            },
        ),
    );
    b.rule(
        "Loop",
        action(
            seq([kw("loop"), r("_"), label("body", r("Block"))]),
            |c| node(Stmt::Loop(c.node("body")?)),
        ),
    );
    b.rule(
        "For",
        action(
            seq([
                kw("for"),
                r("_"),
                label("pattern", r("Pattern")),
                r("_"),
                kw("in"),
                r("_"),
                label("iterable", r("Expression")),
                r("_"),
                label("body", r("Block")),
            ]),
            for_loop,
        ),
    );
    b.rule(
        "Return",
        action(
            seq([
                kw("return"),
                label("value", opt(pick(1, seq([r("_"), r("Expression")])))),
            ]),
            |c| node(Stmt::Return(c.opt("value")?)),
        ),
    );
    b.rule("Break", action(kw("break"), |_| node(Stmt::Break)));
    b.rule("Continue", action(kw("continue"), |_| node(Stmt::Continue)));
    b.rule(
        "Throw",
        action(
            seq([kw("throw"), r("_"), label("expr", r("Expression"))]),
            |c| node(Stmt::Throw(c.node("expr")?)),
        ),
    );
    b.rule(
        "Try",
        action(
            seq([
                kw("try"),
                r("_"),
                label("body", r("Block")),
                label("catch", opt(r("Catch"))),
                label(
                    "finally",
                    opt(pick(3, seq([r("__"), kw("finally"), r("_"), r("Block")]))),
                ),
            ]),
            |c| {
                let catch = c.opt::<Catch>("catch")?;
                let finally = c.opt::<Block>("finally")?;
                if catch.is_none() && finally.is_none() {
                    return None;
                }
                node(Stmt::Try {
                    body: c.node("body")?,
                    catch,
                    finally,
                })
            },
        ),
    );
    b.rule(
        "Catch",
        choice([
            action(
                seq([
                    r("__"),
                    kw("catch"),
                    r("_"),
                    label("param", r("Pattern")),
                    r("_"),
                    label("body", r("Block")),
                ]),
                |c| {
                    node(Catch {
                        param: Some(c.node("param")?),
                        body: c.node("body")?,
                    })
                },
            ),
            action(
                seq([r("__"), kw("catch"), r("_"), label("body", r("Block"))]),
                |c| {
                    node(Catch {
                        param: None,
                        body: c.node("body")?,
                    })
                },
            ),
        ]),
    );
    b.rule(
        "Guard",
        choice([
            action(
                seq([
                    kw("guard"),
                    r("_"),
                    label("pattern", r("Pattern")),
                    r("_"),
                    lit("="),
                    not(class(&[('=', '='), ('>', '>')])),
                    r("__"),
                    guard_body(),
                ]),
                guard,
            ),
            action(seq([kw("guard"), r("_"), guard_body()]), guard),
        ]),
    );

    b.rule(
        "Import",
        choice([
            action(
                seq([
                    kw("import"),
                    r("_"),
                    choice([
                        seq([
                            label("default", r("Identifier")),
                            label(
                                "clause",
                                opt(pick(3, seq([r("_"), lit(","), r("__"), r("ImportClause")]))),
                            ),
                        ]),
                        label("clause", r("ImportClause")),
                    ]),
                    r("_"),
                    kw("from"),
                    r("_"),
                    label("source", r("PlainString")),
                ]),
                import,
            ),
            action(
                seq([kw("import"), r("_"), label("source", r("PlainString"))]),
                import,
            ),
        ]),
    );
    b.rule(
        "ImportClause",
        choice([
            action(
                seq([
                    lit("*"),
                    r("_"),
                    kw("as"),
                    r("_"),
                    label("name", r("Identifier")),
                ]),
                |c| node(ImportClause::Namespace(c.text("name")?)),
            ),
            action(label("specs", list_of("ImportSpec", "{", "}")), |c| {
                node(ImportClause::Named(c.nodes("specs")?))
            }),
        ]),
    );
    b.rule(
        "ImportSpec",
        action(
            seq([
                label("name", r("IdentifierName")),
                label(
                    "alias",
                    opt(pick(3, seq([r("_"), kw("as"), r("_"), r("Identifier")]))),
                ),
            ]),
            |c| {
                node(ImportSpec {
                    name: c.text("name")?,
                    alias: c.take("alias").into_text(),
                })
            },
        ),
    );
    b.rule(
        "Export",
        choice([
            action(
                seq([
                    kw("export"),
                    r("_"),
                    kw("default"),
                    r("_"),
                    label("expr", r("Expression")),
                ]),
                |c| node(Stmt::ExportDefault(c.node("expr")?)),
            ),
            action(
                seq([
                    kw("export"),
                    r("_"),
                    label("decl", choice([r("Let"), r("FunctionDeclaration")])),
                ]),
                |c| node(Stmt::Export(Box::new(c.node("decl")?))),
            ),
        ]),
    );

    b.rule(
        "Assign",
        action(
            seq([
                label("target", r("AssignTarget")),
                r("_"),
                label("op", text(r("AssignOperator"))),
                r("__"),
                label("value", r("Expression")),
            ]),
            |c| {
                let target = c.node("target")?;
                let op = AssignOp::from_token(&c.text("op")?)?;
                // destructuring only works with plain assignment
                if matches!(target, AssignTarget::Pattern(_)) && op != AssignOp::Assign {
                    return None;
                }
                node(Stmt::Assign {
                    target,
                    op,
                    value: c.node("value")?,
                })
            },
        ),
    );
    b.rule(
        "AssignTarget",
        choice([
            action(r("ObjectPattern"), |c| {
                node(AssignTarget::Pattern(c.value().into_node()?))
            }),
            action(r("ArrayPattern"), |c| {
                node(AssignTarget::Pattern(c.value().into_node()?))
            }),
            action(r("Postfix"), |c| {
                let target = match c.value().into_node::<Expr>()? {
                    Expr::Ident(name) => AssignTarget::Ident(name),
                    Expr::Member {
                        object,
                        property,
                        optional: false,
                    } => AssignTarget::Member {
                        object: *object,
                        property,
                    },
                    Expr::Index { object, index } => AssignTarget::Index {
                        object: *object,
                        index: *index,
                    },
                    _ => return None,
                };
                node(target)
            }),
        ]),
    );
    b.rule(
        "AssignOperator",
        choice([
            lit("**="),
            lit("??="),
            lit("||="),
            lit("&&="),
            lit("+="),
            lit("-="),
            lit("*="),
            lit("/="),
            lit("%="),
            seq([lit("="), not(class(&[('=', '='), ('>', '>')]))]),
        ]),
    );
}

/// `expr else error { fallback }`, inlined so the guard action sees its labels.
fn guard_body() -> T {
    seq([
        label("expr", r("Expression")),
        r("_"),
        kw("else"),
        r("_"),
        label("error", r("Identifier")),
        r("_"),
        label("fallback", r("Block")),
    ])
}

fn block(c: &mut Caps) -> Out {
    let mut body: Vec<Stmt> = c.nodes("body")?;
    let tail = match body.last() {
        Some(Stmt::Expr(_)) => match body.pop() {
            Some(Stmt::Expr(expr)) => Some(Box::new(expr)),
            _ => None,
        },
        _ => None,
    };
    node(Block { body, tail })
}

fn for_loop(c: &mut Caps) -> Out {
    let pattern: Pattern = c.node("pattern")?;
    let iterable: Expr = c.node("iterable")?;
    let body: Block = c.node("body")?;

    let stmt = match (pattern, iterable) {
        (Pattern::Ident(binding), Expr::Range { start, end, step }) => Stmt::ForRange {
            binding,
            start: *start,
            end: *end,
            step: step.map(|s| *s),
            body,
        },
        (pattern, iterable) => Stmt::ForIn {
            pattern,
            iterable,
            body,
        },
    };
    node(stmt)
}

fn guard(c: &mut Caps) -> Out {
    node(Stmt::Guard {
        pattern: c.opt("pattern")?,
        expr: c.node("expr")?,
        error: c.text("error")?,
        fallback: c.node("fallback")?,
    })
}

fn import(c: &mut Caps) -> Out {
    let mut import = Import {
        default: c.take("default").into_text(),
        source: c.text("source")?,
        ..Default::default()
    };
    match c.opt::<ImportClause>("clause")? {
        Some(ImportClause::Namespace(name)) => import.namespace = Some(name),
        Some(ImportClause::Named(specs)) => import.named = specs,
        None => {}
    }
    node(Stmt::Import(import))
}
