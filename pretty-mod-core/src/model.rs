//! Records produced by exploration, signature resolution and acquisition

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

/// Public declarations of a single module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSurface {
    /// Top-level functions
    pub functions: BTreeSet<String>,

    /// Top-level classes
    pub classes: BTreeSet<String>,

    /// Top-level constants
    pub constants: BTreeSet<String>,

    /// Names from a literal `__all__`, if declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exported: Option<BTreeSet<String>>,
}

impl ApiSurface {
    /// Create an empty surface
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether nothing at all was found
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
            && self.classes.is_empty()
            && self.constants.is_empty()
            && self.exported.as_ref().map_or(true, BTreeSet::is_empty)
    }

    /// Whether `name` is in the export list
    pub fn is_exported(&self, name: &str) -> bool {
        self.exported.as_ref().map_or(false, |names| names.contains(name))
    }

    /// Whether `name` is a declared function, class or constant
    pub fn declares(&self, name: &str) -> bool {
        self.functions.contains(name) || self.classes.contains(name) || self.constants.contains(name)
    }
}

/// How a module's surface was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    /// Parsed from source text
    Static,
    /// Imported in an interpreter
    Dynamic,
}

/// One module in an explored tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleNode {
    /// Full dotted name
    pub name: String,

    /// Source file or package directory, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filesystem_path: Option<PathBuf>,

    /// Declarations of this module
    pub api: ApiSurface,

    /// Children keyed by their last name segment
    pub submodules: BTreeMap<String, ModuleNode>,

    /// Distance from the root (root is 0)
    pub depth: usize,

    /// Strategy that produced `api`
    pub mode: DiscoveryMode,
}

impl ModuleNode {
    /// Create a leaf node
    pub fn new(
        name: impl Into<String>,
        filesystem_path: Option<PathBuf>,
        api: ApiSurface,
        depth: usize,
        mode: DiscoveryMode,
    ) -> Self {
        Self {
            name: name.into(),
            filesystem_path,
            api,
            submodules: BTreeMap::new(),
            depth,
            mode,
        }
    }

    /// Last segment of the dotted name
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Find a descendant by a dotted path relative to this node
    pub fn find(&self, relative: &str) -> Option<&ModuleNode> {
        relative
            .split('.')
            .try_fold(self, |node, segment| node.submodules.get(segment))
    }

    /// Number of nodes in this subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self.submodules.values().map(ModuleNode::node_count).sum::<usize>()
    }

    /// Deepest `depth` value in this subtree
    pub fn deepest(&self) -> usize {
        self.submodules
            .values()
            .map(ModuleNode::deepest)
            .max()
            .unwrap_or(self.depth)
    }

    /// A copy of this tree with everything deeper than `max_depth` removed
    pub fn truncated(&self, max_depth: usize) -> ModuleNode {
        let mut node = self.clone();
        node.prune(max_depth);
        node
    }

    fn prune(&mut self, max_depth: usize) {
        if self.depth >= max_depth {
            self.submodules.clear();
            return;
        }
        for child in self.submodules.values_mut() {
            child.prune(max_depth);
        }
    }
}

/// Parameter kind, mirroring Python's calling convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamKind {
    /// May be passed positionally
    Positional,
    /// Must be passed by keyword
    KeywordOnly,
    /// `*args`
    VarPositional,
    /// `**kwargs`
    VarKeyword,
}

/// A single parameter in a signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name without stars
    pub name: String,

    /// Calling convention
    pub kind: ParamKind,

    /// Default value as written in source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// Annotation as written in source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

impl ParameterInfo {
    /// Create a parameter without default or annotation
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            annotation: None,
        }
    }

    /// Set the default value
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the annotation
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }
}

impl fmt::Display for ParameterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ParamKind::VarPositional => write!(f, "*")?,
            ParamKind::VarKeyword => write!(f, "**")?,
            _ => {}
        }
        write!(f, "{}", self.name)?;
        if let Some(annotation) = &self.annotation {
            write!(f, ": {}", annotation)?;
        }
        if let Some(default) = &self.default {
            if self.annotation.is_some() {
                write!(f, " = {}", default)?;
            } else {
                write!(f, "={}", default)?;
            }
        }
        Ok(())
    }
}

/// Resolved signature of a callable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    /// `module:Qualified.name` of the callable whose signature this is
    pub qualified_name: String,

    /// Parameters in declaration order
    pub parameters: Vec<ParameterInfo>,

    /// Return annotation as written in source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_annotation: Option<String>,

    /// Indirection hops taken to reach the signature, in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resolution_path: Vec<String>,
}

impl SignatureRecord {
    /// Render as `(a, b=2, *args, **kwargs) -> None`
    pub fn render(&self) -> String {
        let mut rendered = format!("({})", self.rendered_parameters().join(", "));
        if let Some(ret) = &self.return_annotation {
            rendered.push_str(" -> ");
            rendered.push_str(ret);
        }
        rendered
    }

    /// One entry per parameter, with a bare `*` ahead of the first
    /// keyword-only parameter when nothing variadic introduces it
    pub fn rendered_parameters(&self) -> Vec<String> {
        let mut parts = Vec::with_capacity(self.parameters.len() + 1);
        let mut star_written = self
            .parameters
            .iter()
            .any(|p| p.kind == ParamKind::VarPositional);
        for param in &self.parameters {
            if param.kind == ParamKind::KeywordOnly && !star_written {
                parts.push("*".to_string());
                star_written = true;
            }
            parts.push(param.to_string());
        }
        parts
    }
}

/// Terminal "no signature" outcome; not an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unavailable {
    /// The requested symbol
    pub symbol: String,

    /// Human-readable reason
    pub reason: String,
}

impl Unavailable {
    /// Create a new outcome
    pub fn new(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (signature not available: {})", self.symbol, self.reason)
    }
}

/// Where an acquired package came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcquisitionSource {
    /// Already importable from the local search path
    AlreadyPresent,
    /// Downloaded now or earlier into the package cache
    Downloaded,
}

/// A package made available on the local filesystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquiredPackage {
    /// Requested name
    pub name: String,

    /// Version picked from the registry; unknown for local packages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_version: Option<String>,

    /// Package directory or module file
    pub local_path: PathBuf,

    /// Directory that must be on the search path to import the package
    pub import_root: PathBuf,

    /// Where it came from
    pub source: AcquisitionSource,
}
