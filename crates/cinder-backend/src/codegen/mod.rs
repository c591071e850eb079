//! Lowering of the cinder AST to JavaScript source.
//!
//! Everything mutable during one lowering lives in [`GenCx`], a fresh context is created for each
//! call of [`generate`] so concurrent compilations never observe each other.

mod expr;
mod pattern;
mod stmt;
mod string;

use cinder_parser::ast::{Block, Expr, Program, Stmt};

use crate::{
    error::LoweringError,
    helper::{Helper, HelperSet},
};

pub type Result<T> = std::result::Result<T, LoweringError>;

/// Output of one lowering.
#[derive(Clone, PartialEq, Debug)]
pub struct Generated {
    /// One entry per top level statement, hoisted declarations first
    pub statements: Vec<String>,
    pub helpers: HelperSet,
}

impl Generated {
    pub fn join(&self) -> String {
        let mut buf = String::new();
        for statement in &self.statements {
            buf.push_str(statement);
            buf.push('\n');
        }
        buf
    }
}

pub fn generate(program: &Program) -> Result<Generated> {
    let mut cx = GenCx::new();
    cx.push_scope();

    let mut statements = Vec::with_capacity(program.body.len());
    for stmt in &program.body {
        let mut buf = String::new();
        cx.stmt(&mut buf, stmt)?;
        let len = buf.trim_end().len();
        buf.truncate(len);
        statements.push(buf);
    }

    let hoisted = cx.pop_scope();
    let statements = hoisted
        .iter()
        .map(|name| format!("let {name};"))
        .chain(statements)
        .collect::<Vec<_>>();

    log::trace!(
        "Lowered {} statements, {} hoisted, helpers {:?}",
        program.body.len(),
        hoisted.len(),
        cx.helpers
    );

    Ok(Generated {
        statements,
        helpers: cx.helpers,
    })
}

/// The pipeline binding currently being replaced by its reference variable.
struct Rebind {
    name: String,
    reference: String,
}

/// What happens to the trailing expression of a block.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Tail {
    Return,
    Discard,
}

struct GenCx {
    helpers: HelperSet,
    /// One list per function being emitted, holding names declared at its top
    hoisted: Vec<Vec<String>>,
    rebind: Option<Rebind>,
    counter: u32,
    /// Indentation of the statement being emitted
    level: usize,
}

impl GenCx {
    fn new() -> GenCx {
        GenCx {
            helpers: HelperSet::new(),
            hoisted: Vec::new(),
            rebind: None,
            counter: 0,
            level: 0,
        }
    }

    fn helper(&mut self, helper: Helper) -> &'static str {
        self.helpers.insert(helper);
        helper.name()
    }

    fn fresh_id(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }

    fn push_scope(&mut self) {
        self.hoisted.push(Vec::new());
    }

    fn pop_scope(&mut self) -> Vec<String> {
        self.hoisted.pop().unwrap_or_default()
    }

    fn hoist(&mut self, name: String) {
        if let Some(scope) = self.hoisted.last_mut() {
            scope.push(name);
        }
    }

    fn indent(&self, buf: &mut String) {
        for _ in 0..self.level {
            buf.push_str("  ");
        }
    }

    fn line(&self, buf: &mut String, text: &str) {
        self.indent(buf);
        buf.push_str(text);
        buf.push('\n');
    }

    /// ` {`, the block's statements one level deeper and the closing brace, without a newline.
    fn body(&mut self, buf: &mut String, block: &Block, tail: Tail) -> Result<()> {
        if block.body.is_empty() && block.tail.is_none() {
            buf.push_str(" {}");
            return Ok(());
        }
        buf.push_str(" {\n");
        self.level += 1;
        self.statements(buf, block, tail)?;
        self.level -= 1;
        self.indent(buf);
        buf.push('}');
        Ok(())
    }

    /// Like [`GenCx::body`] but with its own hoisting scope, used for function bodies.
    fn scope_body(&mut self, buf: &mut String, block: &Block, tail: Tail) -> Result<()> {
        self.push_scope();
        self.level += 1;
        let mut inner = String::new();
        let result = self.statements(&mut inner, block, tail);
        let hoisted = self.pop_scope();
        result?;

        if inner.is_empty() && hoisted.is_empty() {
            self.level -= 1;
            buf.push_str(" {}");
            return Ok(());
        }
        buf.push_str(" {\n");
        for name in hoisted {
            self.line(buf, &format!("let {name};"));
        }
        buf.push_str(&inner);
        self.level -= 1;
        self.indent(buf);
        buf.push('}');
        Ok(())
    }

    fn statements(&mut self, buf: &mut String, block: &Block, tail: Tail) -> Result<()> {
        for stmt in &block.body {
            self.stmt(buf, stmt)?;
        }
        if let Some(expr) = &block.tail {
            let expr = self.expr(expr)?;
            match tail {
                Tail::Return => self.line(buf, &format!("return {expr};")),
                Tail::Discard => self.line(buf, &statement_expr(&expr)),
            }
        }
        Ok(())
    }

    /// `(() => { ... })()`, awaited when the block awaits.
    fn do_block(&mut self, block: &Block) -> Result<String> {
        let is_async = block_awaits(block);
        let mut buf = String::new();
        if is_async {
            buf.push_str("(await (async () =>");
        } else {
            buf.push_str("(() =>");
        }
        self.scope_body(&mut buf, block, Tail::Return)?;
        match is_async {
            true => buf.push_str(")())"),
            false => buf.push_str(")()"),
        }
        Ok(buf)
    }
}

/// An expression statement, parenthesized where JavaScript would read a block or declaration.
fn statement_expr(expr: &str) -> String {
    let ambiguous = ["{", "function", "async function", "class", "let ["]
        .iter()
        .any(|prefix| expr.starts_with(prefix));
    match ambiguous {
        true => format!("({expr});"),
        false => format!("{expr};"),
    }
}

/// Whether the block contains an `await` which isn't inside a nested function.
fn block_awaits(block: &Block) -> bool {
    block.body.iter().any(stmt_awaits) || block.tail.as_deref().is_some_and(expr_awaits)
}

fn stmt_awaits(stmt: &Stmt) -> bool {
    use cinder_parser::ast::AssignTarget;

    let opt = |e: &Option<Expr>| e.as_ref().is_some_and(expr_awaits);
    match stmt {
        Stmt::Let { init, .. } => opt(init),
        Stmt::Assign { target, value, .. } => {
            let target = match target {
                AssignTarget::Member { object, .. } => expr_awaits(object),
                AssignTarget::Index { object, index } => expr_awaits(object) || expr_awaits(index),
                AssignTarget::Ident(_) | AssignTarget::Pattern(_) => false,
            };
            target || expr_awaits(value)
        }
        Stmt::Expr(e) | Stmt::Throw(e) | Stmt::ExportDefault(e) => expr_awaits(e),
        Stmt::If {
            branches,
            otherwise,
        } => {
            branches
                .iter()
                .any(|b| expr_awaits(&b.test) || block_awaits(&b.body))
                || otherwise.as_ref().is_some_and(block_awaits)
        }
        Stmt::While { test, body } => expr_awaits(test) || block_awaits(body),
        Stmt::Loop(body) => block_awaits(body),
        Stmt::ForIn { iterable, body, .. } => expr_awaits(iterable) || block_awaits(body),
        Stmt::ForRange {
            start,
            end,
            step,
            body,
            ..
        } => expr_awaits(start) || expr_awaits(end) || opt(step) || block_awaits(body),
        Stmt::Return(e) => opt(e),
        Stmt::Try {
            body,
            catch,
            finally,
        } => {
            block_awaits(body)
                || catch.as_ref().is_some_and(|c| block_awaits(&c.body))
                || finally.as_ref().is_some_and(block_awaits)
        }
        Stmt::Guard { expr, fallback, .. } => expr_awaits(expr) || block_awaits(fallback),
        Stmt::Export(stmt) => stmt_awaits(stmt),
        Stmt::Break | Stmt::Continue | Stmt::Function(_) | Stmt::Import(_) => false,
    }
}

fn expr_awaits(expr: &Expr) -> bool {
    use cinder_parser::ast::{Element, PipeStage, Property, PropertyKey, StrPart};

    let elements = |elements: &[Element]| {
        elements.iter().any(|e| match e {
            Element::Expr(e) | Element::Spread(e) => expr_awaits(e),
        })
    };
    match expr {
        Expr::Await(_) => true,
        Expr::Number(_)
        | Expr::RawStr(_)
        | Expr::Bool(_)
        | Expr::Null
        | Expr::Undefined
        | Expr::This
        | Expr::Ident(_)
        | Expr::Function(_) => false,
        Expr::Str(parts) => parts.iter().any(|p| match p {
            StrPart::Text(_) => false,
            StrPart::Expr(e) => expr_awaits(e),
        }),
        Expr::Array(items) => elements(items),
        Expr::Object(props) => props.iter().any(|p| match p {
            Property::KeyValue { key, value } => {
                matches!(key, PropertyKey::Computed(k) if expr_awaits(k)) || expr_awaits(value)
            }
            Property::Shorthand(_) => false,
            Property::Spread(e) => expr_awaits(e),
        }),
        Expr::Do(block) => block_awaits(block),
        Expr::Unary { expr, .. } => expr_awaits(expr),
        Expr::Binary { left, right, .. } => expr_awaits(left) || expr_awaits(right),
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => expr_awaits(test) || expr_awaits(consequent) || expr_awaits(alternate),
        Expr::Call { callee, args, .. } | Expr::New { callee, args } => {
            expr_awaits(callee) || elements(args)
        }
        Expr::Member { object, .. } => expr_awaits(object),
        Expr::Index { object, index } => expr_awaits(object) || expr_awaits(index),
        Expr::Pipeline { head, stages } => {
            expr_awaits(head)
                || stages.iter().any(|s| match s {
                    PipeStage::Bind { expr, .. } | PipeStage::Call(expr) => expr_awaits(expr),
                })
        }
        Expr::Range { start, end, step } => {
            expr_awaits(start) || expr_awaits(end) || step.as_deref().is_some_and(expr_awaits)
        }
        Expr::Yield { argument, .. } => argument.as_deref().is_some_and(expr_awaits),
    }
}
