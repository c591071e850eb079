use cinder_parser::ast::{AssignOp, AssignTarget, Block, DeclKind, Expr, Import, Pattern, Stmt};

use super::{
    expr::{binary_op, is_static_index},
    expr_awaits, statement_expr, string, GenCx, Result, Tail,
};
use crate::{error::LoweringError, helper::Helper};

impl GenCx {
    /// Writes the statement as complete lines at the current level.
    pub(super) fn stmt(&mut self, buf: &mut String, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Let {
                kind,
                pattern,
                init,
            } => {
                let needs_init = *kind == DeclKind::Const || !matches!(pattern, Pattern::Ident(_));
                let pattern = self.pattern(pattern)?;
                let line = match init {
                    Some(init) => format!("{} {pattern} = {};", kind.as_str(), self.expr(init)?),
                    None if needs_init => return Err(LoweringError::MissingInitializer),
                    None => format!("{} {pattern};", kind.as_str()),
                };
                self.line(buf, &line);
            }
            Stmt::Assign { target, op, value } => {
                let line = self.assign(target, *op, value)?;
                self.line(buf, &line);
            }
            Stmt::Expr(expr) => {
                let expr = self.expr(expr)?;
                self.line(buf, &statement_expr(&expr));
            }
            Stmt::If {
                branches,
                otherwise,
            } => {
                self.indent(buf);
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        buf.push_str(" else ");
                    }
                    let test = self.condition(&branch.test)?;
                    buf.push_str(&format!("if ({test})"));
                    self.body(buf, &branch.body, Tail::Discard)?;
                }
                if let Some(otherwise) = otherwise {
                    buf.push_str(" else");
                    self.body(buf, otherwise, Tail::Discard)?;
                }
                buf.push('\n');
            }
            Stmt::While { test, body } => {
                let test = self.condition(test)?;
                self.indent(buf);
                buf.push_str(&format!("while ({test})"));
                self.body(buf, body, Tail::Discard)?;
                buf.push('\n');
            }
            Stmt::Loop(body) => {
                self.indent(buf);
                buf.push_str("while (true)");
                self.body(buf, body, Tail::Discard)?;
                buf.push('\n');
            }
            Stmt::ForIn {
                pattern,
                iterable,
                body,
            } => {
                let pattern = self.pattern(pattern)?;
                let iterable = self.expr(iterable)?;
                self.indent(buf);
                buf.push_str(&format!("for (const {pattern} of {iterable})"));
                self.body(buf, body, Tail::Discard)?;
                buf.push('\n');
            }
            Stmt::ForRange {
                binding,
                start,
                end,
                step,
                body,
            } => {
                let id = self.fresh_id();
                let (start_var, end_var, step_var) =
                    (format!("_start{id}"), format!("_end{id}"), format!("_step{id}"));
                let start = self.expr(start)?;
                let end = self.expr(end)?;
                let step = match step {
                    Some(step) => self.expr(step)?,
                    None => "1".to_owned(),
                };
                // the direction is only known at run time
                self.indent(buf);
                buf.push_str(&format!(
                    "for (let {start_var} = {start}, {end_var} = {end}, {step_var} = Math.abs({step}), \
                     {binding} = {start_var}; \
                     {start_var} <= {end_var} ? {binding} < {end_var} : {binding} > {end_var}; \
                     {binding} += {start_var} <= {end_var} ? {step_var} : -{step_var})"
                ));
                self.body(buf, body, Tail::Discard)?;
                buf.push('\n');
            }
            Stmt::Return(None) => self.line(buf, "return;"),
            Stmt::Return(Some(expr)) => {
                let expr = self.expr(expr)?;
                self.line(buf, &format!("return {expr};"));
            }
            Stmt::Break => self.line(buf, "break;"),
            Stmt::Continue => self.line(buf, "continue;"),
            Stmt::Throw(expr) => {
                let expr = self.expr(expr)?;
                self.line(buf, &format!("throw {expr};"));
            }
            Stmt::Try {
                body,
                catch,
                finally,
            } => {
                self.indent(buf);
                buf.push_str("try");
                self.body(buf, body, Tail::Discard)?;
                if let Some(catch) = catch {
                    match &catch.param {
                        Some(param) => {
                            let param = self.pattern(param)?;
                            buf.push_str(&format!(" catch ({param})"));
                        }
                        None => buf.push_str(" catch"),
                    }
                    self.body(buf, &catch.body, Tail::Discard)?;
                }
                if let Some(finally) = finally {
                    buf.push_str(" finally");
                    self.body(buf, finally, Tail::Discard)?;
                }
                buf.push('\n');
            }
            Stmt::Guard {
                pattern,
                expr,
                error,
                fallback,
            } => self.guard(buf, pattern.as_ref(), expr, error, fallback)?,
            Stmt::Function(function) => {
                if function.name.is_none() {
                    return Err(LoweringError::AnonymousDeclaration);
                }
                let text = self.function(function)?;
                self.line(buf, &text);
            }
            Stmt::Import(import) => {
                let line = import_line(import);
                self.line(buf, &line);
            }
            Stmt::Export(decl) => {
                if !matches!(**decl, Stmt::Let { .. } | Stmt::Function(_)) {
                    return Err(LoweringError::InvalidExport);
                }
                let start = buf.len() + 2 * self.level;
                self.stmt(buf, decl)?;
                buf.insert_str(start, "export ");
            }
            Stmt::ExportDefault(expr) => {
                let expr = self.expr(expr)?;
                self.line(buf, &format!("export default {expr};"));
            }
        }
        Ok(())
    }

    fn assign(&mut self, target: &AssignTarget, op: AssignOp, value: &Expr) -> Result<String> {
        let value_text = self.expr(value)?;
        let line = match target {
            AssignTarget::Ident(name) => {
                format!("{} {} {value_text};", self.ident(name), op.as_str())
            }
            AssignTarget::Member { object, property } => {
                let object = self.postfix_operand(object)?;
                format!("{object}.{property} {} {value_text};", op.as_str())
            }
            AssignTarget::Index { object, index } if is_static_index(index) => {
                let object = self.postfix_operand(object)?;
                let index = self.expr(index)?;
                format!("{object}[{index}] {} {value_text};", op.as_str())
            }
            AssignTarget::Index { object, index } => {
                let set = self.helper(Helper::Set);
                let object = self.expr(object)?;
                let index = self.expr(index)?;
                let value = match op.binary() {
                    None => value_text,
                    // object and index are evaluated twice
                    Some(binary) => {
                        let get = self.helper(Helper::Get);
                        format!("({get}({object}, {index}) {} {value_text})", binary_op(binary))
                    }
                };
                format!("{set}({object}, {index}, {value});")
            }
            AssignTarget::Pattern(pattern) => {
                if op != AssignOp::Assign {
                    return Err(LoweringError::CompoundDestructuring);
                }
                let pattern_text = self.pattern(pattern)?;
                match pattern {
                    Pattern::Object { .. } => format!("({pattern_text} = {value_text});"),
                    _ => format!("{pattern_text} = {value_text};"),
                }
            }
        };
        Ok(line)
    }

    /// The test of an `if` or `while` without the parentheses binary and conditional
    /// expressions are emitted with.
    fn condition(&mut self, test: &Expr) -> Result<String> {
        let text = self.expr(test)?;
        match test {
            Expr::Binary { .. } | Expr::Conditional { .. } => {
                Ok(text[1..text.len() - 1].to_owned())
            }
            _ => Ok(text),
        }
    }

    /// Runs `expr` through `_safe`, or `_safe_async` when it awaits. The fallback sees the
    /// thrown value as `error`.
    fn guard(
        &mut self,
        buf: &mut String,
        pattern: Option<&Pattern>,
        expr: &Expr,
        error: &str,
        fallback: &Block,
    ) -> Result<()> {
        let result = format!("_res{}", self.fresh_id());
        let call = match expr {
            Expr::Await(inner) => {
                let safe = self.helper(Helper::SafeAsync);
                let inner = self.expr(inner)?;
                format!("await {safe}(async () => {})", arrow_body(&inner))
            }
            expr if expr_awaits(expr) => {
                let safe = self.helper(Helper::SafeAsync);
                let expr = self.expr(expr)?;
                format!("await {safe}(async () => {})", arrow_body(&expr))
            }
            expr => {
                let safe = self.helper(Helper::Safe);
                let expr = self.expr(expr)?;
                format!("{safe}(() => {})", arrow_body(&expr))
            }
        };
        self.line(buf, &format!("let {result} = {call};"));

        self.indent(buf);
        buf.push_str(&format!("if (!{result}.ok) {{\n"));
        self.level += 1;
        self.line(buf, &format!("const {error} = {result}.error;"));
        self.statements(buf, fallback, Tail::Discard)?;
        self.level -= 1;
        self.line(buf, "}");

        if let Some(pattern) = pattern {
            let pattern = self.pattern(pattern)?;
            self.line(buf, &format!("let {pattern} = {result}.value;"));
        }
        Ok(())
    }
}

fn arrow_body(expr: &str) -> String {
    match expr.starts_with('{') {
        true => format!("({expr})"),
        false => expr.to_owned(),
    }
}

fn import_line(import: &Import) -> String {
    let source = string::plain(&import.source);

    let mut clauses = Vec::new();
    if let Some(default) = &import.default {
        clauses.push(default.clone());
    }
    if let Some(namespace) = &import.namespace {
        clauses.push(format!("* as {namespace}"));
    }
    if !import.named.is_empty() {
        let specs = import
            .named
            .iter()
            .map(|spec| match &spec.alias {
                Some(alias) => format!("{} as {alias}", spec.name),
                None => spec.name.clone(),
            })
            .collect::<Vec<_>>();
        clauses.push(format!("{{ {} }}", specs.join(", ")));
    }

    match clauses.is_empty() {
        true => format!("import {source};"),
        false => format!("import {} from {source};", clauses.join(", ")),
    }
}

#[cfg(test)]
mod tests {
    use cinder_parser::ast::{DeclKind, Pattern, Program, Stmt};

    use crate::{codegen::generate, codegen::tests::lower, error::LoweringError};

    #[test]
    fn declarations_and_assignment() {
        assert_eq!(lower("let x\nconst y = 1"), "let x;\nconst y = 1;");
        assert_eq!(lower("x += 1\no.p ??= 2"), "x += 1;\no.p ??= 2;");
        assert_eq!(lower("xs[0] = 1"), "xs[0] = 1;");
        assert_eq!(lower("xs[i] = 1"), "_set(xs, i, 1);");
        assert_eq!(lower("xs[i] *= 2"), "_set(xs, i, (_get(xs, i) * 2));");
        assert_eq!(lower("{a} = f()"), "({ a } = f());");
    }

    #[test]
    fn control_flow() {
        assert_eq!(
            lower("if a == 1 { f() } else if b { g() } else { h() }"),
            "if (a === 1) {\n  f();\n} else if (b) {\n  g();\n} else {\n  h();\n}"
        );
        assert_eq!(
            lower("while i < 3 {\n  i += 1\n  if i == 2 { continue }\n}"),
            "while (i < 3) {\n  i += 1;\n  if (i === 2) {\n    continue;\n  }\n}"
        );
        assert_eq!(lower("loop { break }"), "while (true) {\n  break;\n}");
        assert_eq!(
            lower("for [k, v] in Object.entries(o) { log(k, v) }"),
            "for (const [k, v] of Object.entries(o)) {\n  log(k, v);\n}"
        );
    }

    #[test]
    fn counted_loops() {
        assert_eq!(
            lower("for i in 0 -> 5 { log(i) }"),
            "for (let _start1 = 0, _end1 = 5, _step1 = Math.abs(1), i = _start1; \
             _start1 <= _end1 ? i < _end1 : i > _end1; \
             i += _start1 <= _end1 ? _step1 : -_step1) {\n  log(i);\n}"
        );
        assert_eq!(
            lower("for i in n -> 0 by 2 {}"),
            "for (let _start1 = n, _end1 = 0, _step1 = Math.abs(2), i = _start1; \
             _start1 <= _end1 ? i < _end1 : i > _end1; \
             i += _start1 <= _end1 ? _step1 : -_step1) {}"
        );
    }

    #[test]
    fn exceptions() {
        assert_eq!(
            lower("try { a() } catch e { b(e) } finally { c() }"),
            "try {\n  a();\n} catch (e) {\n  b(e);\n} finally {\n  c();\n}"
        );
        assert_eq!(lower("try { a() } catch { }"), "try {\n  a();\n} catch {}");
        assert_eq!(lower("throw new Error(\"no\")"), "throw new Error(\"no\");");
    }

    #[test]
    fn guards() {
        assert_eq!(
            lower("guard {data} = JSON.parse(text) else err {\n  log(err)\n  return\n}"),
            "let _res1 = _safe(() => JSON.parse(text));\n\
             if (!_res1.ok) {\n  \
               const err = _res1.error;\n  \
               log(err);\n  \
               return;\n\
             }\n\
             let { data } = _res1.value;"
        );
        assert_eq!(
            lower("guard await save(x) else e { return e }"),
            "let _res1 = await _safe_async(async () => save(x));\n\
             if (!_res1.ok) {\n  \
               const e = _res1.error;\n  \
               return e;\n\
             }"
        );
        assert_eq!(
            lower("guard x = (await g()).data else e { return }"),
            "let _res1 = await _safe_async(async () => (await g()).data);\n\
             if (!_res1.ok) {\n  \
               const e = _res1.error;\n  \
               return;\n\
             }\n\
             let x = _res1.value;"
        );
        assert_eq!(
            lower("guard x = await g() + 1 else e { return }"),
            "let _res1 = await _safe_async(async () => (await g() + 1));\n\
             if (!_res1.ok) {\n  \
               const e = _res1.error;\n  \
               return;\n\
             }\n\
             let x = _res1.value;"
        );
        // an await inside a nested function does not make the guard async
        assert_eq!(
            lower("guard f = run(async () => await g()) else e { return }"),
            "let _res1 = _safe(() => run(async () => await g()));\n\
             if (!_res1.ok) {\n  \
               const e = _res1.error;\n  \
               return;\n\
             }\n\
             let f = _res1.value;"
        );
    }

    #[test]
    fn functions_and_modules() {
        assert_eq!(
            lower("async fn* walk(dir) { yield dir }"),
            "async function* walk(dir) {\n  return yield dir;\n}"
        );
        assert_eq!(
            lower("import a, { b as c, d } from \"m\""),
            "import a, { b as c, d } from \"m\";"
        );
        assert_eq!(lower("import * as m from \"x\""), "import * as m from \"x\";");
        assert_eq!(
            lower("import a, * as m from \"x\""),
            "import a, * as m from \"x\";"
        );
        assert_eq!(lower("import \"y\""), "import \"y\";");
        assert_eq!(lower("export const a = 1"), "export const a = 1;");
        assert_eq!(
            lower("export fn g(a) { a }"),
            "export function g(a) {\n  return a;\n}"
        );
        assert_eq!(lower("export default {a: 1}"), "export default { a: 1 };");
        assert_eq!(lower("{ a: 1 }.a"), "({ a: 1 }.a);");
    }

    #[test]
    fn missing_initializer() {
        let program = Program {
            body: vec![Stmt::Let {
                kind: DeclKind::Const,
                pattern: Pattern::Ident("a".into()),
                init: None,
            }],
        };
        assert_eq!(generate(&program), Err(LoweringError::MissingInitializer));
    }

    #[test]
    fn conditions() {
        assert_eq!(lower("if a < b { c() }"), "if (a < b) {\n  c();\n}");
        assert_eq!(lower("while (a)(b) { c() }"), "while (a(b)) {\n  c();\n}");
        assert_eq!(
            lower("if (-\"(\")(\")\") { c() }"),
            "if ((-\"(\")(\")\")) {\n  c();\n}"
        );
        assert_eq!(
            lower("if (a ? b : c) == d { e() }"),
            "if ((a ? b : c) === d) {\n  e();\n}"
        );
        assert_eq!(lower("while f(x) { }"), "while (f(x)) {}");
    }
}
