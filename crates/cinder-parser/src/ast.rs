//! Syntax tree of a cinder program.
//!
//! Pure data. Every node owns its children, names and literal texts are copied out of the source.

#[derive(Clone, PartialEq, Debug, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

/// Statements in braces. A final expression statement becomes the `tail`.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Block {
    pub body: Vec<Stmt>,
    pub tail: Option<Box<Expr>>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DeclKind {
    Let,
    Const,
}

impl DeclKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclKind::Let => "let",
            DeclKind::Const => "const",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    InstanceOf,
    And,
    Or,
    Coalesce,
}

impl BinaryOp {
    /// Accepts both the symbolic and the keyword spelling.
    pub fn from_token(op: &str) -> Option<BinaryOp> {
        let op = match op {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "**" => BinaryOp::Pow,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::NotEq,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::LtEq,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::GtEq,
            "instanceof" => BinaryOp::InstanceOf,
            "&&" | "and" => BinaryOp::And,
            "||" | "or" => BinaryOp::Or,
            "??" => BinaryOp::Coalesce,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
}

impl UnaryOp {
    pub fn from_token(op: &str) -> Option<UnaryOp> {
        let op = match op {
            "!" | "not" => UnaryOp::Not,
            "-" => UnaryOp::Neg,
            "+" => UnaryOp::Plus,
            "typeof" => UnaryOp::TypeOf,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Coalesce,
    Or,
    And,
}

impl AssignOp {
    pub fn from_token(op: &str) -> Option<AssignOp> {
        let op = match op {
            "=" => AssignOp::Assign,
            "+=" => AssignOp::Add,
            "-=" => AssignOp::Sub,
            "*=" => AssignOp::Mul,
            "/=" => AssignOp::Div,
            "%=" => AssignOp::Rem,
            "**=" => AssignOp::Pow,
            "??=" => AssignOp::Coalesce,
            "||=" => AssignOp::Or,
            "&&=" => AssignOp::And,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
            AssignOp::Pow => "**=",
            AssignOp::Coalesce => "??=",
            AssignOp::Or => "||=",
            AssignOp::And => "&&=",
        }
    }

    /// The operator a compound assignment applies, `None` for plain `=`.
    pub fn binary(self) -> Option<BinaryOp> {
        let op = match self {
            AssignOp::Assign => return None,
            AssignOp::Add => BinaryOp::Add,
            AssignOp::Sub => BinaryOp::Sub,
            AssignOp::Mul => BinaryOp::Mul,
            AssignOp::Div => BinaryOp::Div,
            AssignOp::Rem => BinaryOp::Rem,
            AssignOp::Pow => BinaryOp::Pow,
            AssignOp::Coalesce => BinaryOp::Coalesce,
            AssignOp::Or => BinaryOp::Or,
            AssignOp::And => BinaryOp::And,
        };
        Some(op)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum Expr {
    /// Source text of the literal, including separators
    Number(String),
    Str(Vec<StrPart>),
    /// Contents of a single quoted string, backslashes are not escapes
    RawStr(String),
    Bool(bool),
    Null,
    Undefined,
    This,
    Ident(String),
    Array(Vec<Element>),
    Object(Vec<Property>),
    Function(Box<Function>),
    Do(Block),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Element>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Element>,
    },
    Member {
        object: Box<Expr>,
        property: String,
        optional: bool,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Pipeline {
        head: Box<Expr>,
        stages: Vec<PipeStage>,
    },
    Range {
        start: Box<Expr>,
        end: Box<Expr>,
        step: Option<Box<Expr>>,
    },
    Await(Box<Expr>),
    Yield {
        argument: Option<Box<Expr>>,
        delegate: bool,
    },
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Expr {
        Expr::Ident(name.into())
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum StrPart {
    /// Source text between interpolations, escapes are kept as written
    Text(String),
    Expr(Expr),
}

#[derive(Clone, PartialEq, Debug)]
pub enum Element {
    Expr(Expr),
    Spread(Expr),
}

#[derive(Clone, PartialEq, Debug)]
pub enum Property {
    KeyValue { key: PropertyKey, value: Expr },
    Shorthand(String),
    Spread(Expr),
}

#[derive(Clone, PartialEq, Debug)]
pub enum PropertyKey {
    Ident(String),
    /// Contents of a string literal without interpolation
    Str(String),
    Number(String),
    Computed(Expr),
}

#[derive(Clone, PartialEq, Debug)]
pub enum PipeStage {
    /// `(name: expr)`, evaluates `expr` with `name` bound to the running value
    Bind { name: String, expr: Expr },
    /// A callable applied to the running value
    Call(Expr),
}

#[derive(Clone, PartialEq, Debug)]
pub struct Function {
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub body: Block,
    pub is_async: bool,
    pub is_generator: bool,
    pub is_arrow: bool,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Param {
    pub pattern: Pattern,
    pub default: Option<Expr>,
    pub rest: bool,
}

#[derive(Clone, PartialEq, Debug)]
pub enum Pattern {
    Ident(String),
    Object {
        props: Vec<PatternProp>,
        rest: Option<String>,
    },
    Array {
        items: Vec<ArrayItem>,
        rest: Option<Box<Pattern>>,
    },
}

/// `key`, `key = default`, `key: pattern` or `key: pattern = default`.
#[derive(Clone, PartialEq, Debug)]
pub struct PatternProp {
    pub key: String,
    pub value: Option<Pattern>,
    pub default: Option<Expr>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ArrayItem {
    pub pattern: Pattern,
    pub default: Option<Expr>,
}

#[derive(Clone, PartialEq, Debug)]
pub enum AssignTarget {
    Ident(String),
    Member { object: Expr, property: String },
    Index { object: Expr, index: Expr },
    Pattern(Pattern),
}

#[derive(Clone, PartialEq, Debug)]
pub struct Branch {
    pub test: Expr,
    pub body: Block,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Catch {
    pub param: Option<Pattern>,
    pub body: Block,
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct Import {
    pub default: Option<String>,
    pub namespace: Option<String>,
    pub named: Vec<ImportSpec>,
    pub source: String,
}

/// `name` or `name as alias`.
#[derive(Clone, PartialEq, Debug)]
pub struct ImportSpec {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Clone, PartialEq, Debug)]
pub enum Stmt {
    Let {
        kind: DeclKind,
        pattern: Pattern,
        init: Option<Expr>,
    },
    Assign {
        target: AssignTarget,
        op: AssignOp,
        value: Expr,
    },
    Expr(Expr),
    If {
        branches: Vec<Branch>,
        otherwise: Option<Block>,
    },
    While {
        test: Expr,
        body: Block,
    },
    Loop(Block),
    ForIn {
        pattern: Pattern,
        iterable: Expr,
        body: Block,
    },
    /// `for i in a -> b by s`, counts in either direction
    ForRange {
        binding: String,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Block,
    },
    Return(Option<Expr>),
    Break,
    Continue,
    Throw(Expr),
    Try {
        body: Block,
        catch: Option<Catch>,
        finally: Option<Block>,
    },
    /// `guard pattern = expr else error { fallback }`
    Guard {
        pattern: Option<Pattern>,
        expr: Expr,
        error: String,
        fallback: Block,
    },
    Function(Function),
    Import(Import),
    Export(Box<Stmt>),
    ExportDefault(Expr),
}
