//! Turns a cinder [`Program`](cinder_parser::ast::Program) into JavaScript statements.

pub mod codegen;
pub mod error;
pub mod helper;

pub use codegen::{generate, Generated};
pub use error::LoweringError;
pub use helper::{Helper, HelperSet};
