use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::Value;

/// How the runtime helpers a program uses end up in scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetMode {
    /// `import { _safe } from "module";`
    #[default]
    Import,
    /// The helper's source is pasted at the top of the output
    Inline,
    /// `const { _safe } = require("module");`
    Require,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileConfig {
    pub target: TargetMode,
    /// Module the helpers are imported or required from
    pub runtime_module: String,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            target: TargetMode::default(),
            runtime_module: "cinder/runtime".to_owned(),
        }
    }
}

impl CompileConfig {
    pub fn from_json(mut value: Value) -> anyhow::Result<Self> {
        let Value::Object(fields) = &mut value else {
            bail!("json::Value is not an object!");
        };

        let defaults = Self::default();
        let target = read_field(fields, "target")?.unwrap_or(defaults.target);
        let runtime_module =
            read_field(fields, "runtimeModule")?.unwrap_or(defaults.runtime_module);

        Ok(Self {
            target,
            runtime_module,
        })
    }
}

/// A missing field is `None`, a field of the wrong type is an error.
fn read_field<T: for<'de> Deserialize<'de>>(
    fields: &mut serde_json::Map<String, Value>,
    name: &str,
) -> anyhow::Result<Option<T>> {
    let Some(field) = fields.remove(name) else {
        return Ok(None);
    };

    let typename = std::any::type_name::<T>();
    serde_json::from_value::<T>(field.clone())
        .map(Some)
        .with_context(|| format!("Expected type {typename} for config.{name}, got {field}"))
}
