use std::fmt::Display;

/// A tree the parser can't produce, found while lowering.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LoweringError {
    EmptyPipeline,
    /// A function statement needs a name
    AnonymousDeclaration,
    /// Only declarations can be exported by name
    InvalidExport,
    /// Destructuring only works with plain `=`
    CompoundDestructuring,
    /// `const` and destructuring declarations need an initializer
    MissingInitializer,
}

impl Display for LoweringError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            LoweringError::EmptyPipeline => "pipeline without stages",
            LoweringError::AnonymousDeclaration => "function declaration without a name",
            LoweringError::InvalidExport => "export of something other than a declaration",
            LoweringError::CompoundDestructuring => "compound assignment to a destructuring pattern",
            LoweringError::MissingInitializer => "declaration without a required initializer",
        };
        f.write_str(message)
    }
}

impl std::error::Error for LoweringError {}
