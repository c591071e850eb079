//! The cinder language: its AST and the grammar table which produces it.

use std::sync::OnceLock;

use ast::Program;
use cinder_runtime::{Grammar, Parser, Tracer, DEFAULT_MAX_DEPTH};
use fragment::Fragment;

pub mod ast;
pub mod fragment;
mod grammar;

pub use cinder_runtime::ParseFailure;

/// The grammar table, built once and shared by every parse.
pub fn language() -> &'static Grammar<Fragment> {
    static LANGUAGE: OnceLock<Grammar<Fragment>> = OnceLock::new();
    LANGUAGE.get_or_init(|| match grammar::build() {
        Ok(grammar) => grammar,
        Err(e) => panic!("the cinder grammar is malformed: {e}"),
    })
}

pub struct ParseOptions<'a> {
    /// Disabling the memo table only changes performance, never the result.
    pub memoize: bool,
    pub tracer: Option<&'a mut dyn Tracer>,
    /// Deeper input fails with [`Expectation::LessNesting`](cinder_runtime::Expectation::LessNesting),
    /// one level of parentheses costs about sixteen rules.
    pub max_depth: u32,
}

impl Default for ParseOptions<'_> {
    fn default() -> Self {
        Self {
            memoize: true,
            tracer: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

pub fn parse(src: &str) -> Result<Program, ParseFailure> {
    parse_with(src, ParseOptions::default())
}

pub fn parse_with(src: &str, options: ParseOptions<'_>) -> Result<Program, ParseFailure> {
    let mut parser = Parser::new(language(), src)
        .memoize(options.memoize)
        .max_depth(options.max_depth);
    if let Some(tracer) = options.tracer {
        parser = parser.trace(tracer);
    }

    match parser.parse()?.into_node::<Program>() {
        Some(program) => Ok(program),
        None => unreachable!("the root rule always produces a program"),
    }
}

#[cfg(test)]
mod tests {
    use cinder_runtime::{Expectation, TraceEventKind, TraceLog};

    use crate::{
        ast::{Expr, Stmt},
        parse, parse_with, ParseOptions,
    };

    const PROGRAM: &str = r#"
import { readFile } from "node:fs/promises"

/* totals per customer */
async fn totals(path, { limit = 10, ...opts } = {}) {
  guard text = await readFile(path, "utf8") else err {
    return []
  }
  let rows = text.split("\n") |> (xs: xs.filter(x => x != ""))
  const [head, ...rest] = rows
  for i in 0 -> rest.length by 2 {
    log("row #{i}: #{rest[i]}")
  }
  rows.slice(0, limit)
}

export default totals
"#;

    #[test]
    fn parses_program() {
        let program = parse(PROGRAM).unwrap();
        assert_eq!(program.body.len(), 3);
        let Stmt::Function(f) = &program.body[1] else {
            panic!("{:?}", program.body[1])
        };
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.body.body.len(), 4);
        assert!(f.body.tail.is_some());
    }

    #[test]
    fn deterministic() {
        let first = parse(PROGRAM);
        for _ in 0..3 {
            assert_eq!(parse(PROGRAM), first);
        }
    }

    #[test]
    fn memo_transparency() {
        let sources = [
            PROGRAM,
            "a |> f |> (x: x ** 2 ** 3)",
            "let {a: [b, c = d ?? e]} = f?.g[h](...i)",
            "if a { b } else if c { d }\nx = do { 1 }",
        ];
        for src in sources {
            let memoized = parse(src);
            let naive = parse_with(
                src,
                ParseOptions {
                    memoize: false,
                    ..Default::default()
                },
            );
            assert_eq!(memoized, naive, "{src}");
        }
    }

    #[test]
    fn diagnostics() {
        let cases = [
            ("let x = }", 8, "Expected expression but found \"}\"."),
            (
                "if x {",
                6,
                "Expected \";\", \"}\", or statement but end of input found.",
            ),
            ("let = 1", 4, "Expected pattern but found \"=\"."),
        ];
        for (src, offset, message) in cases {
            let failure = parse(src).unwrap_err();
            assert_eq!(failure.offset, offset, "{src}");
            assert_eq!(failure.message(), message, "{src}");
        }
    }

    #[test]
    fn rendered_diagnostic() {
        let src = "let a = 1\nlet b =\n";
        let failure = parse(src).unwrap_err();
        assert_eq!(
            failure.render(src),
            "Expected expression but end of input found.\n\
             line 3, col 1\n\
             2 | let b =\n\
             3 | \n  \
               | ^"
        );
    }

    #[test]
    fn traced_parse() {
        let mut log = TraceLog::new();
        let result = parse_with(
            "x",
            ParseOptions {
                tracer: Some(&mut log),
                ..Default::default()
            },
        );
        assert!(result.is_ok());
        let events = log.events();
        assert_eq!(events[0].rule, "Program");
        assert_eq!(events[0].kind, TraceEventKind::Enter);
        assert!(events
            .iter()
            .any(|e| e.rule == "Identifier" && e.kind == TraceEventKind::Match));
    }

    /// Runs `f` on a thread with the default stack size of test threads.
    fn small_stack(f: impl FnOnce() + Send + 'static) {
        std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(f)
            .unwrap()
            .join()
            .unwrap();
    }

    #[test]
    fn nested_expressions() {
        small_stack(|| {
            let src = "let total = items.filter(x => (x.price * (1 + tax)) > 0).map(x => f(g(h(x))))";
            let program = parse(src).unwrap();
            assert_eq!(program.body.len(), 1);

            let src = format!("let x = {}1{}", "(".repeat(20), ")".repeat(20));
            let program = parse(&src).unwrap();
            let Stmt::Let { init: Some(init), .. } = &program.body[0] else {
                panic!("{:?}", program.body[0]);
            };
            assert!(matches!(init, Expr::Number(_)), "{init:?}");
        });
    }

    #[test]
    fn nesting_limit() {
        small_stack(|| {
            let src = format!("let x = {}1{}", "(".repeat(300), ")".repeat(300));
            let failure = parse(&src).unwrap_err();
            assert_eq!(failure.expected, vec![Expectation::LessNesting]);
            assert!(failure.message().starts_with("Expected less nesting but found"));
        });

        let options = ParseOptions {
            max_depth: 40,
            ..Default::default()
        };
        let failure = parse_with("x = (((y)))", options).unwrap_err();
        assert_eq!(failure.expected, vec![Expectation::LessNesting]);
    }

    #[test]
    fn spaced_index() {
        assert_eq!(parse("a [0]").unwrap(), parse("a[0]").unwrap());
        assert_eq!(parse("m [i] [j]").unwrap(), parse("m[i][j]").unwrap());
    }
}
