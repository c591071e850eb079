use cinder_parser::ast::{Param, Pattern};

use super::{GenCx, Result};

impl GenCx {
    /// Binding patterns map one to one onto JavaScript destructuring.
    pub(super) fn pattern(&mut self, pattern: &Pattern) -> Result<String> {
        match pattern {
            Pattern::Ident(name) => Ok(name.clone()),
            Pattern::Object { props, rest } => {
                let mut parts = Vec::with_capacity(props.len() + 1);
                for prop in props {
                    let mut part = prop.key.clone();
                    if let Some(value) = &prop.value {
                        part.push_str(": ");
                        part.push_str(&self.pattern(value)?);
                    }
                    if let Some(default) = &prop.default {
                        part.push_str(" = ");
                        part.push_str(&self.expr(default)?);
                    }
                    parts.push(part);
                }
                if let Some(rest) = rest {
                    parts.push(format!("...{rest}"));
                }
                match parts.is_empty() {
                    true => Ok("{}".to_owned()),
                    false => Ok(format!("{{ {} }}", parts.join(", "))),
                }
            }
            Pattern::Array { items, rest } => {
                let mut parts = Vec::with_capacity(items.len() + 1);
                for item in items {
                    let mut part = self.pattern(&item.pattern)?;
                    if let Some(default) = &item.default {
                        part.push_str(" = ");
                        part.push_str(&self.expr(default)?);
                    }
                    parts.push(part);
                }
                if let Some(rest) = rest {
                    parts.push(format!("...{}", self.pattern(rest)?));
                }
                Ok(format!("[{}]", parts.join(", ")))
            }
        }
    }

    pub(super) fn params(&mut self, params: &[Param]) -> Result<String> {
        let mut parts = Vec::with_capacity(params.len());
        for param in params {
            let mut part = self.pattern(&param.pattern)?;
            if param.rest {
                part.insert_str(0, "...");
            }
            if let Some(default) = &param.default {
                part.push_str(" = ");
                part.push_str(&self.expr(default)?);
            }
            parts.push(part);
        }
        Ok(parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use crate::codegen::tests::lower;

    #[test]
    fn declarations() {
        assert_eq!(
            lower("const {a, b: {c}, d = 1, ...rest} = x"),
            "const { a, b: { c }, d = 1, ...rest } = x;"
        );
        assert_eq!(
            lower("let [first, [second], third = f(), ...tail] = xs"),
            "let [first, [second], third = f(), ...tail] = xs;"
        );
        assert_eq!(lower("let {} = x"), "let {} = x;");
    }

    #[test]
    fn parameters() {
        assert_eq!(
            lower("fn f(a, {b, c: [d]} = {}, ...e) {}"),
            "function f(a, { b, c: [d] } = {}, ...e) {}"
        );
    }

    #[test]
    fn assignment_patterns() {
        assert_eq!(lower("[a, b] = [b, a]"), "[a, b] = [b, a];");
        assert_eq!(lower("{a, b} = obj"), "({ a, b } = obj);");
    }
}
