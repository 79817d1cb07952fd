//! Import-path syntax errors

use thiserror::Error;

/// Errors produced while parsing an import-path string
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    /// Nothing to parse
    #[error("empty import path; expected something like 'json' or 'json:loads'")]
    Empty,

    /// More than one attribute separator
    #[error(
        "invalid import path '{input}': found {count} ':' separators but at most one is allowed; \
         use 'module.path:attribute' (e.g. 'json:loads')"
    )]
    TooManyColons {
        /// The raw input
        input: String,
        /// Number of attribute separators found
        count: usize,
    },

    /// The distribution marker appeared more than once
    #[error(
        "invalid import path '{input}': '::' may appear only once; \
         use 'distribution::module' (e.g. 'pillow::PIL')"
    )]
    RepeatedDistributionMarker {
        /// The raw input
        input: String,
    },

    /// Both the package and the submodule carry a version
    #[error(
        "invalid import path '{input}': more than one version marker; \
         attach a single '@version' (e.g. 'requests@2.31.0')"
    )]
    MultipleVersions {
        /// The raw input
        input: String,
    },

    /// A version marker was attached to the attribute part
    #[error(
        "invalid import path '{input}': a version cannot be attached to the attribute '{attribute}'; \
         put it on the package instead (e.g. 'requests@2.31.0:get')"
    )]
    VersionOnAttribute {
        /// The raw input
        input: String,
        /// The attribute carrying the version
        attribute: String,
    },

    /// A dotted path contained an empty segment
    #[error("invalid import path '{input}': empty segment in '{segment}'")]
    EmptySegment {
        /// The raw input
        input: String,
        /// The offending portion
        segment: String,
    },

    /// A character that cannot appear in a module or attribute name
    #[error("invalid import path '{input}': unexpected character '{character}'")]
    InvalidCharacter {
        /// The raw input
        input: String,
        /// The offending character
        character: char,
    },

    /// An attribute was given where only a module is accepted
    #[error(
        "invalid module path '{input}': it names an attribute; \
         use 'pretty-mod sig {input}' for exploring specific objects"
    )]
    AttributeNotAllowed {
        /// The raw input
        input: String,
    },
}
