use cinder_parser::ast::{
    BinaryOp, Element, Expr, Function, PipeStage, Property, PropertyKey, StrPart, UnaryOp,
};

use super::{string, GenCx, Rebind, Result, Tail};
use crate::{error::LoweringError, helper::Helper};

impl GenCx {
    /// Compound expressions come out parenthesized, so the result can be used as an operand as is.
    pub(super) fn expr(&mut self, expr: &Expr) -> Result<String> {
        let text = match expr {
            Expr::Number(text) => number(text),
            Expr::Str(parts) => self.string(parts)?,
            Expr::RawStr(text) => string::raw(text),
            Expr::Bool(true) => "true".to_owned(),
            Expr::Bool(false) => "false".to_owned(),
            Expr::Null => "null".to_owned(),
            Expr::Undefined => "undefined".to_owned(),
            Expr::This => "this".to_owned(),
            Expr::Ident(name) => self.ident(name).to_owned(),
            Expr::Array(items) => format!("[{}]", self.elements(items)?),
            Expr::Object(props) => self.object(props)?,
            Expr::Function(function) => self.function(function)?,
            Expr::Do(block) => self.do_block(block)?,
            Expr::Unary { op, expr } => {
                let operand = self.prefix_operand(expr)?;
                match op {
                    UnaryOp::Not => format!("!{operand}"),
                    UnaryOp::Neg => format!("-{operand}"),
                    UnaryOp::Plus => format!("+{operand}"),
                    UnaryOp::TypeOf => format!("typeof {operand}"),
                }
            }
            Expr::Binary { op, left, right } => {
                // `-a ** b` is a syntax error
                let left = match op {
                    BinaryOp::Pow => self.prefix_operand(left)?,
                    _ => self.operand(left)?,
                };
                let right = self.operand(right)?;
                format!("({left} {} {right})", binary_op(*op))
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let test = self.operand(test)?;
                let consequent = self.operand(consequent)?;
                let alternate = self.operand(alternate)?;
                format!("({test} ? {consequent} : {alternate})")
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => {
                let callee = self.postfix_operand(callee)?;
                let args = self.elements(args)?;
                match optional {
                    true => format!("{callee}?.({args})"),
                    false => format!("{callee}({args})"),
                }
            }
            Expr::New { callee, args } => {
                let callee = match is_path(callee) {
                    true => self.expr(callee)?,
                    false => format!("({})", self.expr(callee)?),
                };
                format!("new {callee}({})", self.elements(args)?)
            }
            Expr::Member {
                object,
                property,
                optional,
            } => {
                let object = self.postfix_operand(object)?;
                match optional {
                    true => format!("{object}?.{property}"),
                    false => format!("{object}.{property}"),
                }
            }
            Expr::Index { object, index } => match is_static_index(index) {
                true => format!(
                    "{}[{}]",
                    self.postfix_operand(object)?,
                    self.expr(index)?
                ),
                false => {
                    let get = self.helper(Helper::Get);
                    format!("{get}({}, {})", self.expr(object)?, self.expr(index)?)
                }
            },
            Expr::Pipeline { head, stages } => self.pipeline(head, stages)?,
            Expr::Range { start, end, step } => {
                let range = self.helper(Helper::Range);
                let start = self.expr(start)?;
                let end = self.expr(end)?;
                let step = match step {
                    Some(step) => self.expr(step)?,
                    None => "1".to_owned(),
                };
                format!("{range}({start}, {end}, {step})")
            }
            Expr::Await(expr) => format!("await {}", self.prefix_operand(expr)?),
            Expr::Yield { argument, delegate } => {
                let keyword = match delegate {
                    true => "yield*",
                    false => "yield",
                };
                match argument {
                    Some(argument) => format!("{keyword} {}", self.expr(argument)?),
                    None => keyword.to_owned(),
                }
            }
        };
        Ok(text)
    }

    /// A name as it should be read, the reference variable while its pipeline stage is emitted.
    pub(super) fn ident<'a>(&'a self, name: &'a str) -> &'a str {
        match &self.rebind {
            Some(Rebind {
                name: bound,
                reference,
            }) if bound == name => reference.as_str(),
            _ => name,
        }
    }

    /// Operand of a binary or conditional operator.
    fn operand(&mut self, expr: &Expr) -> Result<String> {
        let text = self.expr(expr)?;
        match expr {
            Expr::Function(_) | Expr::Yield { .. } => Ok(format!("({text})")),
            _ => Ok(text),
        }
    }

    /// Operand of a prefix operator.
    fn prefix_operand(&mut self, expr: &Expr) -> Result<String> {
        let text = self.expr(expr)?;
        match expr {
            Expr::Function(_) | Expr::Yield { .. } | Expr::Unary { .. } | Expr::Await(_) => {
                Ok(format!("({text})"))
            }
            _ => Ok(text),
        }
    }

    /// Callee or object of a call, member access or index.
    pub(super) fn postfix_operand(&mut self, expr: &Expr) -> Result<String> {
        let text = self.expr(expr)?;
        match expr {
            Expr::Function(_)
            | Expr::Yield { .. }
            | Expr::Unary { .. }
            | Expr::Await(_)
            | Expr::Number(_) => Ok(format!("({text})")),
            _ => Ok(text),
        }
    }

    fn elements(&mut self, elements: &[Element]) -> Result<String> {
        let mut parts = Vec::with_capacity(elements.len());
        for element in elements {
            let part = match element {
                Element::Expr(expr) => self.expr(expr)?,
                Element::Spread(expr) => format!("...{}", self.expr(expr)?),
            };
            parts.push(part);
        }
        Ok(parts.join(", "))
    }

    fn object(&mut self, props: &[Property]) -> Result<String> {
        if props.is_empty() {
            return Ok("{}".to_owned());
        }

        let mut parts = Vec::with_capacity(props.len());
        for prop in props {
            let part = match prop {
                Property::KeyValue { key, value } => {
                    let key = match key {
                        PropertyKey::Ident(name) => name.clone(),
                        PropertyKey::Str(text) => string::plain(text),
                        PropertyKey::Number(text) => number(text),
                        PropertyKey::Computed(expr) => format!("[{}]", self.expr(expr)?),
                    };
                    format!("{key}: {}", self.expr(value)?)
                }
                Property::Shorthand(name) => match self.ident(name) {
                    read if read == name => name.clone(),
                    read => format!("{name}: {read}"),
                },
                Property::Spread(expr) => format!("...{}", self.expr(expr)?),
            };
            parts.push(part);
        }
        Ok(format!("{{ {} }}", parts.join(", ")))
    }

    /// `(_ref = head, _ref = stage, ..., _ref)` with `_ref` hoisted into the enclosing function.
    fn pipeline(&mut self, head: &Expr, stages: &[PipeStage]) -> Result<String> {
        if stages.is_empty() {
            return Err(LoweringError::EmptyPipeline);
        }

        let reference = format!("_ref{}", self.fresh_id());
        self.hoist(reference.clone());

        let head = self.expr(head)?;
        let mut parts = vec![format!("{reference} = {head}")];
        for stage in stages {
            let value = match stage {
                PipeStage::Bind { name, expr } => {
                    let outer = self.rebind.replace(Rebind {
                        name: name.clone(),
                        reference: reference.clone(),
                    });
                    let value = self.expr(expr);
                    self.rebind = outer;
                    value?
                }
                PipeStage::Call(callee) => {
                    format!("{}({reference})", self.postfix_operand(callee)?)
                }
            };
            parts.push(format!("{reference} = {value}"));
        }
        parts.push(reference);

        Ok(format!("({})", parts.join(", ")))
    }

    pub(super) fn function(&mut self, function: &Function) -> Result<String> {
        let params = self.params(&function.params)?;
        let mut buf = String::new();
        if function.is_async {
            buf.push_str("async ");
        }

        if !function.is_arrow {
            buf.push_str("function");
            if function.is_generator {
                buf.push('*');
            }
            if let Some(name) = &function.name {
                buf.push(' ');
                buf.push_str(name);
            }
            buf.push_str(&format!("({params})"));
            self.scope_body(&mut buf, &function.body, Tail::Return)?;
            return Ok(buf);
        }

        buf.push_str(&format!("({params}) =>"));
        let Some(tail) = function.body.tail.as_deref().filter(|_| function.body.body.is_empty())
        else {
            self.scope_body(&mut buf, &function.body, Tail::Return)?;
            return Ok(buf);
        };

        self.push_scope();
        self.level += 1;
        let tail = self.expr(tail);
        self.level -= 1;
        let hoisted = self.pop_scope();
        let tail = tail?;

        if hoisted.is_empty() {
            match tail.starts_with('{') {
                true => buf.push_str(&format!(" ({tail})")),
                false => buf.push_str(&format!(" {tail}")),
            }
            return Ok(buf);
        }

        // the declarations need a block body
        buf.push_str(" {\n");
        self.level += 1;
        for name in hoisted {
            self.line(&mut buf, &format!("let {name};"));
        }
        self.line(&mut buf, &format!("return {tail};"));
        self.level -= 1;
        self.indent(&mut buf);
        buf.push('}');
        Ok(buf)
    }
}

pub(super) fn binary_op(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::Pow => "**",
        BinaryOp::Eq => "===",
        BinaryOp::NotEq => "!==",
        BinaryOp::Lt => "<",
        BinaryOp::LtEq => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::GtEq => ">=",
        BinaryOp::InstanceOf => "instanceof",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::Coalesce => "??",
    }
}

/// Numeric literal without digit separators.
fn number(text: &str) -> String {
    text.chars().filter(|&c| c != '_').collect()
}

/// Indices which can't be negative, so plain bracket access behaves the same as `_get`.
pub(super) fn is_static_index(index: &Expr) -> bool {
    match index {
        Expr::Str(parts) => parts.iter().all(|p| matches!(p, StrPart::Text(_))),
        Expr::RawStr(_) => true,
        Expr::Number(text) => {
            let prefixed = ["0x", "0X", "0b", "0B", "0o", "0O"]
                .iter()
                .any(|p| text.starts_with(p));
            prefixed || text.chars().all(|c| c.is_ascii_digit() || c == '_')
        }
        _ => false,
    }
}

/// `a`, `this` or `a.b.c`, which can follow `new` without parentheses.
fn is_path(expr: &Expr) -> bool {
    match expr {
        Expr::Ident(_) | Expr::This => true,
        Expr::Member {
            object,
            optional: false,
            ..
        } => is_path(object),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::codegen::tests::lower;

    fn expr(src: &str) -> String {
        let out = lower(&format!("let it = {src}"));
        // skips the hoisted declarations
        let Some(expr) = out
            .find("let it = ")
            .and_then(|start| out[start + "let it = ".len()..].strip_suffix(';'))
        else {
            panic!("{out}")
        };
        expr.to_owned()
    }

    #[test]
    fn operators() {
        assert_eq!(expr("a == b and not c"), "((a === b) && !c)");
        assert_eq!(expr("a != b or c ?? d"), "(((a !== b) || c) ?? d)");
        assert_eq!(expr("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(expr("-x ** 2"), "((-x) ** 2)");
        assert_eq!(expr("2 ** 3 ** 2"), "(2 ** (3 ** 2))");
        assert_eq!(expr("- -x"), "-(-x)");
        assert_eq!(expr("typeof a == \"string\""), "(typeof a === \"string\")");
        assert_eq!(expr("a ? b : c"), "(a ? b : c)");
        assert_eq!(expr("a instanceof B"), "(a instanceof B)");
    }

    #[test]
    fn postfix() {
        assert_eq!(expr("a.b?.c(1, ...d)?.(e)"), "a.b?.c(1, ...d)?.(e)");
        assert_eq!(expr("xs[0] + m[\"k\"] + m['k']"), "((xs[0] + m[\"k\"]) + m[\"k\"])");
        assert_eq!(expr("xs[-1]"), "_get(xs, -1)");
        assert_eq!(expr("xs[i + 1].name"), "_get(xs, (i + 1)).name");
        assert_eq!(expr("new a.B(1)"), "new a.B(1)");
        assert_eq!(expr("new (f())()"), "new (f())()");
        assert_eq!(expr("1.5.toFixed(1)"), "(1.5).toFixed(1)");
    }

    #[test]
    fn literals() {
        assert_eq!(expr("1_000_000"), "1000000");
        assert_eq!(expr("0xFF_FF"), "0xFFFF");
        assert_eq!(expr("[1, ...xs]"), "[1, ...xs]");
        assert_eq!(expr("{}"), "{}");
        assert_eq!(
            expr("{a, \"b c\": 1, [k]: 2, 3: x, ...rest}"),
            "{ a, \"b c\": 1, [k]: 2, 3: x, ...rest }"
        );
        assert_eq!(expr("null ?? undefined ?? this"), "((null ?? undefined) ?? this)");
    }

    #[test]
    fn pipelines() {
        let out = lower("let it = 5 |> (x: x + 1) |> (y: y * 2)");
        assert_eq!(
            out,
            "let _ref1;\nlet it = (_ref1 = 5, _ref1 = (_ref1 + 1), _ref1 = (_ref1 * 2), _ref1);"
        );
        assert_eq!(
            expr("xs |> sort |> (v: {v, n: v.length})"),
            "(_ref1 = xs, _ref1 = sort(_ref1), _ref1 = { v: _ref1, n: _ref1.length }, _ref1)"
        );
        // one binding is replaced at a time, the outer one is back after the inner stage
        assert_eq!(
            expr("a |> (x: (x |> (y: y + x)) + x)"),
            "(_ref1 = a, _ref1 = ((_ref2 = _ref1, _ref2 = (_ref2 + x), _ref2) + _ref1), _ref1)"
        );
        assert_eq!(expr("a |> (x => x * 2)"), "(_ref1 = a, _ref1 = ((x) => (x * 2))(_ref1), _ref1)");
    }

    #[test]
    fn ranges() {
        assert_eq!(expr("0 -> 5"), "_range(0, 5, 1)");
        assert_eq!(expr("n -> 0 by 2"), "_range(n, 0, 2)");
    }

    #[test]
    fn functions() {
        assert_eq!(expr("x => x + 1"), "(x) => (x + 1)");
        assert_eq!(expr("async (a, b = 1, ...r) => await a"), "async (a, b = 1, ...r) => await a");
        assert_eq!(expr("() => { {} }"), "() => ({})");
        assert_eq!(expr("fn() {}"), "function() {}");
        assert_eq!(
            expr("fn* gen(n) { yield* n }"),
            "function* gen(n) {\n  return yield* n;\n}"
        );
        assert_eq!(
            expr("x => x |> f"),
            "(x) => {\n  let _ref1;\n  return (_ref1 = x, _ref1 = f(_ref1), _ref1);\n}"
        );
    }
}
