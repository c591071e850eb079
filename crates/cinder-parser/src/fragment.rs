use crate::ast::*;

/// A postfix operation waiting to be applied to the expression before it.
#[derive(Clone, PartialEq, Debug)]
pub enum Suffix {
    Call { args: Vec<Element>, optional: bool },
    Member { property: String, optional: bool },
    Index(Expr),
}

/// The right hand side of a binary operator, folded into the left operand.
#[derive(Clone, PartialEq, Debug)]
pub struct Operand {
    pub op: BinaryOp,
    pub right: Expr,
}

/// An element of a destructuring pattern before the rest element is checked to be last.
#[derive(Clone, PartialEq, Debug)]
pub enum PatternElement {
    Prop(PatternProp),
    Item(ArrayItem),
    Rest(Pattern),
}

/// Parts of an import clause.
#[derive(Clone, PartialEq, Debug)]
pub enum ImportClause {
    Namespace(String),
    Named(Vec<ImportSpec>),
}

macro_rules! fragments {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        /// Value payload of the cinder grammar, every node kind an action can produce.
        #[derive(Clone, PartialEq, Debug)]
        pub enum Fragment {
            $($variant($ty),)*
        }

        $(
            impl From<$ty> for Fragment {
                fn from(value: $ty) -> Fragment {
                    Fragment::$variant(value)
                }
            }

            impl TryFrom<Fragment> for $ty {
                type Error = Fragment;
                fn try_from(value: Fragment) -> Result<$ty, Fragment> {
                    match value {
                        Fragment::$variant(a) => Ok(a),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

fragments! {
    Program(Program),
    Block(Block),
    Stmt(Stmt),
    Expr(Expr),
    StrPart(StrPart),
    Element(Element),
    Property(Property),
    PropertyKey(PropertyKey),
    PipeStage(PipeStage),
    Function(Function),
    Param(Param),
    Pattern(Pattern),
    PatternElement(PatternElement),
    AssignTarget(AssignTarget),
    Branch(Branch),
    Catch(Catch),
    Import(Import),
    ImportSpec(ImportSpec),
    ImportClause(ImportClause),
    Suffix(Suffix),
    Operand(Operand),
}
