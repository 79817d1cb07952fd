//! Signature resolution
//!
//! A target is looked up in its module's source and classified as a
//! [`Symbol`]. Functions give their signature directly; everything else goes
//! through the ordered [`IndirectionRule`]s until a signature turns up or no
//! rule applies. Every hop is recorded in the resulting record.

use crate::environment::{ModuleEnvironment, SearchScope};
use crate::introspect::ObjectFacts;
use crate::loader::ModuleLocation;
use crate::rules::{drop_positional, wrapped_target, IndirectionRule, Step, Symbol, SymbolTable, Target, Want};
use crate::stdlib::is_builtin_module;
use crate::{ModuleError, Result};
use pretty_mod_core::{ImportSpecifier, ParameterInfo, SignatureRecord, Unavailable};
use pretty_mod_package::ErrorKind as PackageKind;
use pretty_mod_parser::{AssignedValue, Binding, ParsedModule};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::debug;

/// A signature, or the reason there is none
pub type Resolution = std::result::Result<SignatureRecord, Unavailable>;

const MAX_HOPS: usize = 16;
const NO_PATTERN: &str = "signature not available for this pattern";
const NOT_CALLABLE: &str = "not callable";

/// Resolves the signature of a callable named by an import path
pub struct SignatureResolver {
    env: Arc<ModuleEnvironment>,
}

impl SignatureResolver {
    pub fn new(env: Arc<ModuleEnvironment>) -> Self {
        Self { env }
    }

    /// Parse `raw` and resolve it
    pub fn resolve_str(&self, raw: &str) -> Result<Resolution> {
        let spec = ImportSpecifier::parse(raw)?;
        self.resolve(&spec)
    }

    /// Resolve the signature of the callable named by `spec`
    ///
    /// The outer error is reserved for failures the user has to fix (bad
    /// syntax, network trouble, unusable archives). A missing package or
    /// name is an [`Unavailable`] outcome.
    pub fn resolve(&self, spec: &ImportSpecifier) -> Result<Resolution> {
        let symbol = spec.to_string();
        let scope = match self.env.scope_for(spec) {
            Ok(scope) => scope,
            Err(ModuleError::Package(e)) if e.kind() == PackageKind::NotFound => {
                debug!("acquisition for {} failed: {}", symbol, e);
                return Ok(Err(Unavailable::new(
                    symbol,
                    format!("could not import {}: {}", spec.module_path(), e),
                )));
            }
            Err(e) => return Err(e),
        };

        let session = Session {
            env: &self.env,
            scope,
        };
        let outcome = session
            .initial_target(spec)
            .and_then(|target| session.follow(target));
        Ok(outcome.map_err(|reason| Unavailable::new(symbol, reason)))
    }
}

/// Lookups for one request
struct Session<'a> {
    env: &'a ModuleEnvironment,
    scope: SearchScope,
}

type Outcome<T> = std::result::Result<T, String>;

impl Session<'_> {
    fn locate(&self, module: &str) -> Option<ModuleLocation> {
        match self.scope.locate(module) {
            Ok(location) => location,
            Err(e) => {
                debug!("cannot locate {}: {}", module, e);
                None
            }
        }
    }

    /// Split a request into module and attribute
    ///
    /// In the dotted form the longest locatable prefix is the module.
    fn initial_target(&self, spec: &ImportSpecifier) -> Outcome<Target> {
        let module = spec.module_path();
        if let Some(attribute) = &spec.attribute {
            return Ok(Target::new(module, attribute.as_str()));
        }

        let segments: Vec<&str> = module.split('.').collect();
        for end in (1..=segments.len()).rev() {
            let prefix = segments[..end].join(".");
            if self.locate(&prefix).is_some() {
                if end == segments.len() {
                    return Err(NOT_CALLABLE.to_string());
                }
                return Ok(Target::new(prefix, segments[end..].join(".")));
            }
        }

        match segments.split_first() {
            Some((top, rest)) if !rest.is_empty() => Ok(Target::new(*top, rest.join("."))),
            _ if is_builtin_module(&module) => Err(NOT_CALLABLE.to_string()),
            _ => Err(format!("could not import {}", module)),
        }
    }

    fn follow(&self, mut target: Target) -> Outcome<SignatureRecord> {
        let mut path = Vec::new();
        let mut visited = FxHashSet::default();

        for _ in 0..MAX_HOPS {
            if !visited.insert(target.clone()) {
                return Err(format!("{} (circular reference at {})", NO_PATTERN, target));
            }

            let symbol = self.lookup(&target);
            debug!("{} resolved to {:?}", target, symbol);
            if let Some(outcome) = self.direct(&symbol, &target, &path) {
                return outcome;
            }

            let step = IndirectionRule::ORDER
                .iter()
                .find_map(|rule| rule.apply(&symbol, &target, self).map(|step| (*rule, step)));
            match step {
                Some((rule, Step::Follow(next))) => {
                    path.push(format!("{}: {} -> {}", rule, target, next));
                    target = next;
                }
                Some((rule, Step::Signature { parameters, return_annotation, via })) => {
                    let qualified_name = format!("{}:{}", target.module, via);
                    path.push(format!("{}: {} -> {}", rule, target, qualified_name));
                    return Ok(SignatureRecord {
                        qualified_name,
                        parameters: drop_positional(&parameters, target.drop_positional),
                        return_annotation,
                        resolution_path: path,
                    });
                }
                None => return self.fallback(&symbol, &target, path),
            }
        }
        Err(format!("{} (more than {} indirections)", NO_PATTERN, MAX_HOPS))
    }

    /// Symbols whose signature is known without any rule
    fn direct(&self, symbol: &Symbol, target: &Target, path: &[String]) -> Option<Outcome<SignatureRecord>> {
        let record = |parameters: &[ParameterInfo], return_annotation: Option<String>| {
            Ok(SignatureRecord {
                qualified_name: format!("{}:{}", target.module, target.attribute),
                parameters: drop_positional(parameters, target.drop_positional),
                return_annotation,
                resolution_path: path.to_vec(),
            })
        };

        match symbol {
            Symbol::Function(decl) if target.want == Want::Value => {
                Some(record(&decl.parameters, decl.return_annotation.clone()))
            }
            Symbol::Lambda(parameters) if target.want == Want::Value => Some(record(parameters, None)),
            Symbol::Live(facts) => live_outcome(facts, target).map(|signature| {
                signature.and_then(|(parameters, return_annotation)| record(&parameters, return_annotation))
            }),
            Symbol::Data | Symbol::Submodule(_) => Some(Err(NOT_CALLABLE.to_string())),
            Symbol::Unimportable => Some(Err(format!("could not import {}", target.module))),
            _ => None,
        }
    }

    /// Last resort when no rule applies: ask the interpreter
    fn fallback(&self, symbol: &Symbol, target: &Target, mut path: Vec<String>) -> Outcome<SignatureRecord> {
        let asks_interpreter = matches!(symbol, Symbol::Missing { .. } | Symbol::Class(_) | Symbol::Opaque);
        if asks_interpreter {
            if let Some(facts) = self.live(target) {
                if let Some(outcome) = live_outcome(&facts, target) {
                    return outcome.map(|(parameters, return_annotation)| {
                        path.push(format!("live: {}", target));
                        SignatureRecord {
                            qualified_name: format!("{}:{}", target.module, target.attribute),
                            parameters: drop_positional(&parameters, target.drop_positional),
                            return_annotation,
                            resolution_path: path,
                        }
                    });
                }
            }
        }

        match symbol {
            Symbol::Missing { .. } => Err(format!(
                "could not import '{}' from '{}'",
                target.attribute, target.module
            )),
            _ => Err(NO_PATTERN.to_string()),
        }
    }

    fn live(&self, target: &Target) -> Option<ObjectFacts> {
        if !self.env.dynamic_enabled() {
            return None;
        }
        match self
            .env
            .introspector()
            .object_facts(&target.module, &target.attribute, &self.scope.extra_paths)
        {
            Ok(facts) => Some(facts),
            Err(e) => {
                debug!("live lookup of {} failed: {}", target, e);
                None
            }
        }
    }

    fn lookup(&self, target: &Target) -> Symbol {
        let Some(location) = self.locate(&target.module) else {
            return self.live(target).map(Symbol::Live).unwrap_or(Symbol::Unimportable);
        };

        let (name, rest) = match target.attribute.split_once('.') {
            Some((name, rest)) => (name, Some(rest)),
            None => (target.attribute.as_str(), None),
        };

        let Some(file) = location.source_file() else {
            if location.package_dir.is_some() && location.file.is_none() {
                return self.unbound(&location, target, name, rest, None);
            }
            return self.live(target).map(Symbol::Live).unwrap_or(Symbol::Unimportable);
        };

        let parsed = match self.env.cache().load(file) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("cannot read {}: {}", target.module, e);
                return Symbol::Unimportable;
            }
        };

        if let (Some(wrapped), None) = (parsed.wrapped.get(name), rest) {
            return Symbol::Wrapper {
                target: wrapped.clone(),
                bound: 0,
            };
        }

        match parsed.binding(name) {
            Some(binding) => classify(binding, &location, target, rest),
            None => self.unbound(&location, target, name, rest, Some(parsed.as_ref())),
        }
    }

    /// A name the module's source does not bind
    fn unbound(
        &self,
        location: &ModuleLocation,
        target: &Target,
        name: &str,
        rest: Option<&str>,
        parsed: Option<&ParsedModule>,
    ) -> Symbol {
        if let Some(parsed) = parsed {
            for star in &parsed.star_imports {
                let Some(source) = star.resolve(&target.module, location.is_package()) else {
                    continue;
                };
                if self.binds(&source, name) {
                    return Symbol::Reexport {
                        module: source,
                        attribute: target.attribute.clone(),
                    };
                }
            }
        }

        if location.is_package() {
            let submodule = format!("{}.{}", target.module, name);
            if self.locate(&submodule).is_some() {
                return match rest {
                    None => Symbol::Submodule(submodule),
                    Some(rest) => Symbol::Reexport {
                        module: submodule,
                        attribute: rest.to_string(),
                    },
                };
            }
        }

        Symbol::Missing {
            is_package: location.is_package(),
        }
    }

    /// Whether `module`'s source binds `name`
    fn binds(&self, module: &str, name: &str) -> bool {
        self.locate(module)
            .and_then(|location| location.source_file().map(|file| file.to_path_buf()))
            .and_then(|file| self.env.cache().load(&file).ok())
            .map_or(false, |parsed| parsed.binding(name).is_some())
    }
}

impl SymbolTable for Session<'_> {
    fn class_in(&self, module: &str, name: &str) -> bool {
        let mut target = Target::new(module, name);
        for _ in 0..MAX_HOPS {
            target = match self.lookup(&target) {
                Symbol::Class(_) => return true,
                Symbol::Live(facts) => return facts.is_class,
                Symbol::Reexport { module, attribute } => Target::new(module, attribute),
                Symbol::Alias(alias) => Target::new(target.module.as_str(), alias),
                _ => return false,
            };
        }
        false
    }

    fn submodule_defining(&self, package: &str, name: &str) -> Option<String> {
        let location = self.locate(package)?;
        location
            .submodules()
            .into_iter()
            .map(|submodule| format!("{}.{}", package, submodule))
            .find(|submodule| self.binds(submodule, name))
    }
}

/// Classify a bound name, with `rest` the attribute path below it
fn classify(binding: &Binding, location: &ModuleLocation, target: &Target, rest: Option<&str>) -> Symbol {
    match binding {
        Binding::Function(decl) => match rest {
            None => Symbol::Function(decl.clone()),
            Some(_) => Symbol::Opaque,
        },
        Binding::Class(class) => match rest {
            None => Symbol::Class(class.clone()),
            Some(member) => match class.method(member) {
                Some(method) if method.has_decorator("classmethod") => {
                    let mut bound = method.clone();
                    bound.parameters = drop_positional(&method.parameters, 1);
                    Symbol::Function(bound)
                }
                Some(method) => Symbol::Function(method.clone()),
                None => Symbol::Opaque,
            },
        },
        Binding::Import { source, name } => {
            let Some(module) = source.resolve(&target.module, location.is_package()) else {
                return Symbol::Unimportable;
            };
            match (name, rest) {
                (None, None) => Symbol::Submodule(module),
                (None, Some(rest)) => Symbol::Reexport {
                    module,
                    attribute: rest.to_string(),
                },
                (Some(name), rest) => Symbol::Reexport {
                    module,
                    attribute: join(name, rest),
                },
            }
        }
        Binding::Value(value) => match value {
            AssignedValue::Alias(alias) => Symbol::Alias(join(alias, rest)),
            AssignedValue::Call(call) => match (wrapped_target(call), rest) {
                (Some((wrapped, bound)), None) => Symbol::Wrapper { target: wrapped, bound },
                (None, None) => Symbol::Instance(call.clone()),
                (None, Some(attribute)) if !call.curried => Symbol::InstanceAttribute {
                    class_name: call.callee.clone(),
                    attribute: attribute.to_string(),
                },
                _ => Symbol::Opaque,
            },
            AssignedValue::Lambda(parameters) => match rest {
                None => Symbol::Lambda(parameters.clone()),
                Some(_) => Symbol::Opaque,
            },
            AssignedValue::Literal(_) => Symbol::Data,
            AssignedValue::Other(_) => Symbol::Opaque,
        },
    }
}

fn join(name: &str, rest: Option<&str>) -> String {
    match rest {
        Some(rest) => format!("{}.{}", name, rest),
        None => name.to_string(),
    }
}

/// The signature a live object gives directly, if it settles the lookup
fn live_outcome(facts: &ObjectFacts, target: &Target) -> Option<Outcome<(Vec<ParameterInfo>, Option<String>)>> {
    if !facts.found {
        return Some(Err(format!(
            "could not import '{}' from '{}'",
            target.attribute, target.module
        )));
    }
    if !facts.callable {
        return Some(Err(NOT_CALLABLE.to_string()));
    }
    if target.want == Want::Call {
        return None;
    }
    Some(match &facts.signature {
        Some(signature) => Ok((
            signature.parameters.iter().cloned().map(ParameterInfo::from).collect(),
            signature.return_annotation.clone(),
        )),
        None => Err(NO_PATTERN.to_string()),
    })
}
