//! Compiles cinder source to JavaScript.
//!
//! [`compile`] runs the whole pipeline: parse, lower, materialize the runtime helpers the output
//! needs and format the result. Every call owns its own parser and generator state, so separate
//! files can be compiled from separate threads.

pub mod config;
pub mod error;
pub mod runtime;

use cinder_backend::Generated;

pub use cinder_backend::{generate, Helper, HelperSet, LoweringError};
pub use cinder_parser::{ast, parse, ParseFailure};
pub use config::{CompileConfig, TargetMode};
pub use error::CompileError;

/// Produces the statements bringing helpers into scope.
pub trait TopLevelTransform {
    fn materialize(&self, helpers: HelperSet, config: &CompileConfig)
        -> anyhow::Result<Vec<String>>;
}

impl<F> TopLevelTransform for F
where
    F: Fn(HelperSet, &CompileConfig) -> anyhow::Result<Vec<String>>,
{
    fn materialize(
        &self,
        helpers: HelperSet,
        config: &CompileConfig,
    ) -> anyhow::Result<Vec<String>> {
        self(helpers, config)
    }
}

/// Final pass over the joined output text.
pub trait Format {
    fn format(&self, text: &str) -> anyhow::Result<String>;
}

impl<F> Format for F
where
    F: Fn(&str) -> anyhow::Result<String>,
{
    fn format(&self, text: &str) -> anyhow::Result<String> {
        self(text)
    }
}

/// A [`Format`] which returns the text unchanged.
pub fn verbatim(text: &str) -> anyhow::Result<String> {
    Ok(text.to_owned())
}

#[derive(Clone, Debug)]
pub struct CompileOutput {
    /// Formatted output
    pub code: String,
    /// Helper materialization followed by the generated statements
    pub statements: Vec<String>,
    pub helpers: HelperSet,
}

pub fn compile(
    source: &str,
    transform: &dyn TopLevelTransform,
    format: &dyn Format,
    config: &CompileConfig,
) -> Result<CompileOutput, CompileError> {
    log::debug!("Parsing {} bytes", source.len());
    let program = match parse(source) {
        Ok(program) => program,
        Err(failure) => {
            log::warn!("Syntax error at byte {}: {}", failure.offset, failure.message());
            let rendered = failure.render(source);
            return Err(CompileError::Syntax { failure, rendered });
        }
    };

    log::debug!("Lowering {} statements", program.body.len());
    let Generated { statements, helpers } = match generate(&program) {
        Ok(generated) => generated,
        Err(error) => {
            log::warn!("Lowering failed: {error}");
            return Err(CompileError::Lowering {
                error,
                ast: program,
            });
        }
    };

    log::debug!("Materializing {helpers:?} for {:?}", config.target);
    let mut all = match transform.materialize(helpers, config) {
        Ok(materialized) => materialized,
        Err(error) => {
            log::warn!("Helper materialization failed: {error:#}");
            return Err(CompileError::Transform { error, statements });
        }
    };
    all.extend(statements);

    let mut text = String::new();
    for statement in &all {
        text.push_str(statement);
        text.push('\n');
    }

    log::debug!("Formatting {} bytes", text.len());
    let code = match format.format(&text) {
        Ok(code) => code,
        Err(error) => {
            log::warn!("Formatting failed: {error:#}");
            return Err(CompileError::Format { error, text });
        }
    };

    Ok(CompileOutput {
        code,
        statements: all,
        helpers,
    })
}

#[cfg(test)]
mod tests {
    use anyhow::bail;

    use crate::{
        compile, runtime, verbatim, CompileConfig, CompileError, CompileOutput, Helper,
        HelperSet, LoweringError, TargetMode,
    };

    const SOURCE: &str = r#"guard data = JSON.parse(text) else err {
  return null
}
let last = data.items[-1]
"#;

    fn config(target: TargetMode) -> CompileConfig {
        CompileConfig {
            target,
            ..Default::default()
        }
    }

    fn compiled(source: &str, config: &CompileConfig) -> CompileOutput {
        compile(source, &runtime::materialize, &verbatim, config).unwrap()
    }

    #[test]
    fn import_mode() {
        let output = compiled(SOURCE, &config(TargetMode::Import));
        assert_eq!(output.helpers, HelperSet::from_iter([Helper::Safe, Helper::Get]));
        assert_eq!(
            output.code,
            r#"import { _safe } from "cinder/runtime";
import { _get } from "cinder/runtime";
let _res1 = _safe(() => JSON.parse(text));
if (!_res1.ok) {
  const err = _res1.error;
  return null;
}
let data = _res1.value;
let last = _get(data.items, -1);
"#
        );
        assert_eq!(output.statements.len(), 4);
    }

    #[test]
    fn require_mode() {
        let config = CompileConfig {
            target: TargetMode::Require,
            runtime_module: "./rt.js".to_owned(),
        };
        let output = compiled("let r = 0 -> 3", &config);
        assert_eq!(
            output.code,
            "const { _range } = require(\"./rt.js\");\nlet r = _range(0, 3, 1);\n"
        );
    }

    #[test]
    fn inline_mode() {
        let output = compiled("xs[i] = 1", &config(TargetMode::Inline));
        assert_eq!(output.statements[0], runtime::source(Helper::Set));
        assert_eq!(output.statements[1], "_set(xs, i, 1);");
        assert!(output.code.starts_with("function _set(target, index, value) {\n"));
    }

    #[test]
    fn no_helpers() {
        let output = compiled("let a = 1", &config(TargetMode::Import));
        assert!(output.helpers.is_empty());
        assert_eq!(output.code, "let a = 1;\n");
    }

    #[test]
    fn custom_collaborators() {
        fn tagged(helpers: HelperSet, config: &CompileConfig) -> anyhow::Result<Vec<String>> {
            Ok(helpers
                .names()
                .map(|name| format!("// {name} from {}", config.runtime_module))
                .collect())
        }
        fn shout(text: &str) -> anyhow::Result<String> {
            Ok(text.to_uppercase())
        }

        let output =
            compile("let x = a[i]", &tagged, &shout, &CompileConfig::default()).unwrap();
        assert_eq!(output.code, "// _GET FROM CINDER/RUNTIME\nLET X = _GET(A, I);\n");
    }

    #[test]
    fn syntax_error() {
        let config = CompileConfig::default();
        match compile("let x = }", &runtime::materialize, &verbatim, &config) {
            Err(CompileError::Syntax { failure, rendered }) => {
                assert_eq!(failure.offset, 8);
                assert_eq!(
                    rendered,
                    "Expected expression but found \"}\".\nline 1, col 9\n1 | let x = }\n  | --------^"
                );
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn lowering_error() {
        let config = CompileConfig::default();
        match compile("const x", &runtime::materialize, &verbatim, &config) {
            Err(CompileError::Lowering { error, ast }) => {
                assert_eq!(error, LoweringError::MissingInitializer);
                assert_eq!(ast.body.len(), 1);
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn collaborator_errors() {
        fn refuse(_: HelperSet, _: &CompileConfig) -> anyhow::Result<Vec<String>> {
            bail!("no runtime available")
        }
        fn broken(_: &str) -> anyhow::Result<String> {
            bail!("formatter crashed")
        }

        let config = CompileConfig::default();
        match compile("let y = 0 -> 2", &refuse, &verbatim, &config) {
            Err(error @ CompileError::Transform { .. }) => {
                assert_eq!(
                    error.to_string(),
                    "helper materialization failed: no runtime available"
                );
                if let CompileError::Transform { statements, .. } = error {
                    assert_eq!(statements, ["let y = _range(0, 2, 1);"]);
                }
            }
            other => panic!("{other:?}"),
        }

        match compile("let y = 1", &runtime::materialize, &broken, &config) {
            Err(CompileError::Format { error, text }) => {
                assert_eq!(error.to_string(), "formatter crashed");
                assert_eq!(text, "let y = 1;\n");
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn concurrent_isolation() {
        let sources = [
            "let a = x |> f |> (v: v + 1)",
            "for i in 10 -> 0 by 2 { log(xs[i]) }",
            "guard v = await load() else e { throw e }",
            "let s = \"#{a |> g} and #{b |> h}\"",
        ];
        let config = CompileConfig::default();
        let sequential = sources
            .iter()
            .map(|src| compiled(src, &config).code)
            .collect::<Vec<_>>();

        std::thread::scope(|scope| {
            let handles = (0..16)
                .map(|i| {
                    let config = &config;
                    scope.spawn(move || {
                        let index = i % sources.len();
                        (index, compiled(sources[index], config).code)
                    })
                })
                .collect::<Vec<_>>();
            for handle in handles {
                let (index, code) = match handle.join() {
                    Ok(result) => result,
                    Err(_) => panic!("compile thread panicked"),
                };
                assert_eq!(code, sequential[index]);
            }
        });
    }
}
