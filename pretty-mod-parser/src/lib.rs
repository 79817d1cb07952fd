//! Static Python declaration parser
//!
//! Source text is parsed with tree-sitter and never executed:
//! - Top-level functions, classes and UPPER_CASE constants
//! - Literal `__all__` export lists
//! - Definitions inside module-level `if`/`try`/`with` blocks
//! - Import and assignment bindings used for signature lookup

pub mod error;
pub mod module;
mod params;
mod syntax;

#[cfg(test)]
mod surface_tests;

pub use error::{ErrorKind, ParseError};
pub use module::{
    parse_module, AssignedValue, Binding, CallExpr, ClassDecl, FunctionDecl, ImportRef,
    ParsedModule,
};

use pretty_mod_core::ApiSurface;

/// List the public declarations of a module's source text
pub fn parse_declarations(source: &str, filename: &str) -> Result<ApiSurface, ParseError> {
    parse_module(source, filename).map(|module| module.surface)
}
