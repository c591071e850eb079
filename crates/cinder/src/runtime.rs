//! The runtime helpers generated code calls, and the default ways of bringing them into scope.

use cinder_backend::{Helper, HelperSet};

use crate::config::{CompileConfig, TargetMode};

/// Source of a helper as a standalone function declaration.
pub fn source(helper: Helper) -> &'static str {
    match helper {
        Helper::Safe => {
            "function _safe(fn) {
  try {
    return { ok: true, value: fn() };
  } catch (error) {
    return { ok: false, error };
  }
}"
        }
        Helper::SafeAsync => {
            "async function _safe_async(fn) {
  try {
    return { ok: true, value: await fn() };
  } catch (error) {
    return { ok: false, error };
  }
}"
        }
        Helper::Range => {
            "function _range(start, end, step) {
  step = Math.abs(step);
  if (step === 0) {
    throw new RangeError(\"range step must not be zero\");
  }
  const out = [];
  if (start <= end) {
    for (let i = start; i < end; i += step) out.push(i);
  } else {
    for (let i = start; i > end; i -= step) out.push(i);
  }
  return out;
}"
        }
        Helper::Get => {
            "function _get(target, index) {
  if (typeof index === \"number\" && index < 0) {
    index += target.length;
  }
  return target[index];
}"
        }
        Helper::Set => {
            "function _set(target, index, value) {
  if (typeof index === \"number\" && index < 0) {
    index += target.length;
  }
  target[index] = value;
  return value;
}"
        }
    }
}

/// One statement per helper, in the shape `config.target` asks for.
pub fn materialize(helpers: HelperSet, config: &CompileConfig) -> anyhow::Result<Vec<String>> {
    let module = serde_json::to_string(&config.runtime_module)?;
    let statements = helpers
        .iter()
        .map(|helper| match config.target {
            TargetMode::Import => format!("import {{ {helper} }} from {module};"),
            TargetMode::Inline => source(helper).to_owned(),
            TargetMode::Require => format!("const {{ {helper} }} = require({module});"),
        })
        .collect();
    Ok(statements)
}

#[cfg(test)]
mod tests {
    use cinder_backend::{Helper, HelperSet};

    use super::{materialize, source};
    use crate::config::{CompileConfig, TargetMode};

    fn run(helpers: &[Helper], target: TargetMode) -> Vec<String> {
        let config = CompileConfig {
            target,
            ..Default::default()
        };
        materialize(helpers.iter().copied().collect(), &config).unwrap()
    }

    #[test]
    fn modes() {
        assert_eq!(
            run(&[Helper::Set, Helper::Range], TargetMode::Import),
            [
                "import { _range } from \"cinder/runtime\";",
                "import { _set } from \"cinder/runtime\";"
            ]
        );
        assert_eq!(
            run(&[Helper::Safe], TargetMode::Require),
            ["const { _safe } = require(\"cinder/runtime\");"]
        );
        assert_eq!(
            run(&[Helper::Get], TargetMode::Inline),
            [source(Helper::Get)]
        );
        assert!(run(&[], TargetMode::Import).is_empty());
    }

    #[test]
    fn module_is_quoted() {
        let config = CompileConfig {
            target: TargetMode::Import,
            runtime_module: "it's \"here\"".to_owned(),
        };
        let statements = materialize(HelperSet::from_iter([Helper::Safe]), &config);
        assert_eq!(
            statements.ok(),
            Some(vec![r#"import { _safe } from "it's \"here\"";"#.to_owned()])
        );
    }

    #[test]
    fn sources_declare_their_helper() {
        for helper in Helper::ALL {
            let declaration = format!("function {}(", helper.name());
            assert!(source(helper).contains(&declaration), "{helper}");
        }
        assert!(source(Helper::Safe).contains("{ ok: false, error }"));
    }
}
