//! Indirection rules for signature resolution
//!
//! When a name is not itself a function, one of these rules says where its
//! signature really comes from. Rules are tried in [`IndirectionRule::ORDER`];
//! the first that applies decides the next hop.

use crate::introspect::ObjectFacts;
use pretty_mod_core::{ParamKind, ParameterInfo};
use pretty_mod_parser::{CallExpr, ClassDecl, FunctionDecl};
use std::fmt;

/// What the caller wants the signature of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Want {
    /// Calling the object itself
    Value,
    /// Calling an instance of the object (its `__call__`)
    Call,
}

/// A name to look up: `attribute` (dotted) inside `module`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Target {
    pub module: String,
    pub attribute: String,
    pub want: Want,
    /// Leading positional parameters already bound (`partial`, `self`)
    pub drop_positional: usize,
}

impl Target {
    pub fn new(module: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            attribute: attribute.into(),
            want: Want::Value,
            drop_positional: 0,
        }
    }

    /// Same lookup state, different name
    pub fn retarget(&self, module: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            attribute: attribute.into(),
            want: self.want,
            drop_positional: self.drop_positional,
        }
    }

    fn wanting(mut self, want: Want) -> Self {
        self.want = want;
        self
    }

    fn dropping(mut self, count: usize) -> Self {
        self.drop_positional += count;
        self
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.attribute)?;
        if self.want == Want::Call {
            write!(f, "()")?;
        }
        Ok(())
    }
}

/// What a target name turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Function(FunctionDecl),
    Class(ClassDecl),
    /// `name = Callee(...)`
    Instance(CallExpr),
    /// `instance.attribute` where `instance = class_name(...)`
    InstanceAttribute { class_name: String, attribute: String },
    /// `name = partial(target, ...)` and friends
    Wrapper { target: String, bound: usize },
    Lambda(Vec<ParameterInfo>),
    /// `name = other.name`
    Alias(String),
    /// A name imported from another module
    Reexport { module: String, attribute: String },
    /// The name is a module
    Submodule(String),
    /// A literal or some other non-callable value
    Data,
    /// Bound to an expression no rule can see through
    Opaque,
    /// Found by importing the module in an interpreter
    Live(ObjectFacts),
    /// Not bound in the module's source
    Missing { is_package: bool },
    /// The module could not be found or imported
    Unimportable,
}

/// The outcome of applying a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Continue with another target
    Follow(Target),
    /// The signature is known
    Signature {
        parameters: Vec<ParameterInfo>,
        return_annotation: Option<String>,
        /// Attribute path of the callable that provided it
        via: String,
    },
}

/// Questions rules need answered about other modules
pub trait SymbolTable {
    /// Whether `name`, looked up in `module`, is a class
    fn class_in(&self, module: &str, name: &str) -> bool;

    /// The submodule of `package` whose source binds `name`
    fn submodule_defining(&self, package: &str, name: &str) -> Option<String>;
}

/// Named indirection patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndirectionRule {
    /// `from .impl import name` in the target module
    FollowReexport,
    /// `name = other` assignments
    FollowAlias,
    /// `partial(f, ...)`, `lru_cache(f)`, `name.__wrapped__ = f`
    UnwrapWrappedTarget,
    /// A class's `__init__`, `__new__`, dataclass fields, or base class
    ClassConstructor,
    /// An instance's class `__call__`
    InstanceCall,
    /// A package name bound lazily but defined in one of its submodules
    ExportedFromSubmodule,
}

/// Bases that contribute no constructor parameters
const NO_CONSTRUCTOR_BASES: &[&str] = &["object", "ABC", "Generic", "Protocol", "NamedTuple", "TypedDict"];

impl IndirectionRule {
    pub const ORDER: [IndirectionRule; 6] = [
        IndirectionRule::FollowReexport,
        IndirectionRule::FollowAlias,
        IndirectionRule::UnwrapWrappedTarget,
        IndirectionRule::ClassConstructor,
        IndirectionRule::InstanceCall,
        IndirectionRule::ExportedFromSubmodule,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IndirectionRule::FollowReexport => "follow-reexport",
            IndirectionRule::FollowAlias => "follow-alias",
            IndirectionRule::UnwrapWrappedTarget => "unwrap-wrapped-target",
            IndirectionRule::ClassConstructor => "class-constructor",
            IndirectionRule::InstanceCall => "instance-call",
            IndirectionRule::ExportedFromSubmodule => "exported-from-submodule",
        }
    }

    /// The next step for `symbol`, found at `target`, if this rule applies
    pub fn apply(&self, symbol: &Symbol, target: &Target, table: &dyn SymbolTable) -> Option<Step> {
        match (self, symbol) {
            (IndirectionRule::FollowReexport, Symbol::Reexport { module, attribute }) => {
                Some(Step::Follow(target.retarget(module.as_str(), attribute.as_str())))
            }
            (IndirectionRule::FollowAlias, Symbol::Alias(name)) => {
                Some(Step::Follow(target.retarget(target.module.as_str(), name.as_str())))
            }
            (IndirectionRule::UnwrapWrappedTarget, Symbol::Wrapper { target: wrapped, bound }) => Some(Step::Follow(
                target
                    .retarget(target.module.as_str(), wrapped.as_str())
                    .dropping(*bound),
            )),
            (IndirectionRule::ClassConstructor, Symbol::Class(class)) if target.want == Want::Value => {
                constructor(class, target, table)
            }
            (IndirectionRule::InstanceCall, symbol) => instance_call(symbol, target, table),
            (IndirectionRule::ExportedFromSubmodule, Symbol::Missing { is_package: true }) => {
                let name = target.attribute.split('.').next().unwrap_or(&target.attribute);
                let submodule = table.submodule_defining(&target.module, name)?;
                Some(Step::Follow(target.retarget(submodule, target.attribute.as_str())))
            }
            _ => None,
        }
    }
}

impl fmt::Display for IndirectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Recognize calls that return their first argument wrapped
///
/// Returns the wrapped name and how many positional arguments the wrapper
/// binds.
pub fn wrapped_target(call: &CallExpr) -> Option<(String, usize)> {
    let base = call.callee.rsplit('.').next().unwrap_or(&call.callee);
    match (base, call.curried) {
        ("partial", false) => {
            let target = call.args.first()?;
            Some((target.clone(), call.args.len() - 1))
        }
        ("update_wrapper", false) => Some((call.args.get(1)?.clone(), 0)),
        ("lru_cache" | "cache", _) => Some((call.args.first()?.clone(), 0)),
        _ => None,
    }
    .filter(|(target, _)| is_dotted_name(target))
}

fn is_dotted_name(text: &str) -> bool {
    !text.is_empty() && text.split('.').all(crate::loader::is_identifier)
}

fn constructor(class: &ClassDecl, target: &Target, table: &dyn SymbolTable) -> Option<Step> {
    let signature = |method: &FunctionDecl| Step::Signature {
        parameters: drop_positional(&method.parameters, 1),
        return_annotation: method.return_annotation.clone(),
        via: format!("{}.{}", target.attribute, method.name),
    };

    if let Some(init) = class.method("__init__") {
        return Some(signature(init));
    }
    if let Some(new) = class.method("__new__") {
        return Some(signature(new));
    }
    if class.is_dataclass() {
        return Some(Step::Signature {
            parameters: class.fields.clone(),
            return_annotation: Some("None".to_string()),
            via: target.attribute.clone(),
        });
    }

    let bases: Vec<&str> = class.bases.iter().map(|base| base_name(base)).collect();
    // protocols cannot be instantiated; their call shape is the interesting part
    if bases.iter().any(|base| short_name(base) == "Protocol") {
        if let Some(call) = class.method("__call__") {
            return Some(signature(call));
        }
    }
    if let Some(base) = bases
        .iter()
        .find(|base| !is_no_constructor_base(base) && table.class_in(&target.module, base))
    {
        return Some(Step::Follow(target.retarget(target.module.as_str(), *base)));
    }
    if bases.iter().all(|base| is_no_constructor_base(base)) {
        return Some(Step::Signature {
            parameters: Vec::new(),
            return_annotation: None,
            via: target.attribute.clone(),
        });
    }
    None
}

fn instance_call(symbol: &Symbol, target: &Target, table: &dyn SymbolTable) -> Option<Step> {
    match symbol {
        Symbol::Instance(call) if !call.curried && target.want == Want::Value => Some(Step::Follow(
            target
                .retarget(target.module.as_str(), call.callee.as_str())
                .wanting(Want::Call),
        )),
        Symbol::InstanceAttribute { class_name, attribute } => Some(Step::Follow(
            target
                .retarget(target.module.as_str(), format!("{}.{}", class_name, attribute))
                .dropping(1),
        )),
        Symbol::Class(class) if target.want == Want::Call => {
            if let Some(call) = class.method("__call__") {
                return Some(Step::Signature {
                    parameters: drop_positional(&call.parameters, 1),
                    return_annotation: call.return_annotation.clone(),
                    via: format!("{}.__call__", target.attribute),
                });
            }
            class
                .bases
                .iter()
                .map(|base| base_name(base))
                .find(|base| !is_no_constructor_base(base) && table.class_in(&target.module, base))
                .map(|base| Step::Follow(target.retarget(target.module.as_str(), base)))
        }
        Symbol::Live(facts) if target.want == Want::Call && facts.is_class => Some(Step::Follow(
            target
                .retarget(target.module.as_str(), format!("{}.__call__", target.attribute))
                .wanting(Want::Value)
                .dropping(1),
        )),
        _ => None,
    }
}

/// `Base[T]` and `Base(metaclass=...)` reduce to `Base`
fn base_name(base: &str) -> &str {
    base.split(['[', '(']).next().unwrap_or(base).trim()
}

fn short_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

fn is_no_constructor_base(base: &str) -> bool {
    base.contains('=') || NO_CONSTRUCTOR_BASES.contains(&short_name(base))
}

/// Remove the first `count` positional parameters
pub fn drop_positional(parameters: &[ParameterInfo], count: usize) -> Vec<ParameterInfo> {
    let mut remaining = count;
    parameters
        .iter()
        .filter(|param| {
            if remaining > 0 && param.kind == ParamKind::Positional {
                remaining -= 1;
                false
            } else {
                true
            }
        })
        .cloned()
        .collect()
}
