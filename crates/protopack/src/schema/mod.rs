//! Parsed-schema AST: the input to compilation.

mod types;

pub use types::{EnumAst, FieldAst, FieldOptions, MapAst, MessageAst, Schema};
