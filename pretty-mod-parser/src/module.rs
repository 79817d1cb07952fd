//! Module-level declarations and name bindings

use crate::error::ParseError;
use crate::params::extract_parameters;
use crate::syntax::{
    child_by_kind, collapse_whitespace, dotted_name, expression_text, node_text, parse_tree,
    string_literal, string_sequence,
};
use pretty_mod_core::{ApiSurface, ParameterInfo};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;
use tree_sitter::Node;

/// A `def` or `async def`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub parameters: Vec<ParameterInfo>,
    pub return_annotation: Option<String>,
    /// Decorator expressions without the leading `@`
    pub decorators: Vec<String>,
    pub is_async: bool,
    pub line: usize,
}

impl FunctionDecl {
    /// Whether a decorator named `name` (or `something.name`) is applied
    pub fn has_decorator(&self, name: &str) -> bool {
        has_decorator(&self.decorators, name)
    }
}

/// A `class` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: String,
    pub bases: Vec<String>,
    pub decorators: Vec<String>,
    pub methods: BTreeMap<String, FunctionDecl>,
    /// Annotated class-level assignments, in declaration order
    pub fields: Vec<ParameterInfo>,
    pub line: usize,
}

impl ClassDecl {
    pub fn method(&self, name: &str) -> Option<&FunctionDecl> {
        self.methods.get(name)
    }

    /// Decorated with `@dataclass` or `@dataclasses.dataclass(...)`
    pub fn is_dataclass(&self) -> bool {
        has_decorator(&self.decorators, "dataclass")
    }
}

/// Module named by an import statement, possibly relative
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportRef {
    /// Dotted module text after the leading dots (may be empty)
    pub module: String,
    /// Number of leading dots
    pub level: usize,
}

impl ImportRef {
    pub fn absolute(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            level: 0,
        }
    }

    /// Absolute module name as seen from `importer`
    pub fn resolve(&self, importer: &str, importer_is_package: bool) -> Option<String> {
        if self.level == 0 {
            return Some(self.module.clone());
        }
        let mut base: Vec<&str> = importer.split('.').collect();
        if !importer_is_package {
            base.pop();
        }
        for _ in 1..self.level {
            base.pop()?;
        }
        if !self.module.is_empty() {
            base.extend(self.module.split('.'));
        }
        if base.is_empty() {
            return None;
        }
        Some(base.join("."))
    }
}

/// A call expression on the right of an assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallExpr {
    /// Dotted name being called; for `factory(...)(target)` the factory
    pub callee: String,
    /// `factory(...)(target)` form
    pub curried: bool,
    /// Positional argument texts of the outermost call
    pub args: Vec<String>,
}

/// Right-hand side of a simple assignment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignedValue {
    /// Another name, possibly dotted (`get = _client.get`)
    Alias(String),
    Call(CallExpr),
    Lambda(Vec<ParameterInfo>),
    /// Literals, containers and operators over them
    Literal(String),
    Other(String),
}

/// What a top-level name is bound to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Function(FunctionDecl),
    Class(ClassDecl),
    /// `import m` (name is `None`) or `from m import name`
    Import {
        source: ImportRef,
        name: Option<String>,
    },
    Value(AssignedValue),
}

/// Everything the static parser knows about one module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedModule {
    pub surface: ApiSurface,
    /// Last binding of each top-level name
    pub bindings: FxHashMap<String, Binding>,
    /// `from m import *` sources in order
    pub star_imports: Vec<ImportRef>,
    /// `name.__wrapped__ = target` statements
    pub wrapped: FxHashMap<String, String>,
}

impl ParsedModule {
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }
}

/// Parse a module's source and collect its top-level declarations
pub fn parse_module(source: &str, filename: &str) -> Result<ParsedModule, ParseError> {
    let tree = parse_tree(source, filename)?;
    let mut collector = Collector::new(source.as_bytes());
    collector.visit_block(tree.root_node());
    let module = collector.finish();
    trace!(
        "Parsed {}: {} functions, {} classes, {} constants",
        filename,
        module.surface.functions.len(),
        module.surface.classes.len(),
        module.surface.constants.len()
    );
    Ok(module)
}

struct Collector<'s> {
    source: &'s [u8],
    functions: BTreeSet<String>,
    classes: BTreeSet<String>,
    constants: BTreeSet<String>,
    exported: Option<BTreeSet<String>>,
    bindings: FxHashMap<String, Binding>,
    star_imports: Vec<ImportRef>,
    wrapped: FxHashMap<String, String>,
}

impl<'s> Collector<'s> {
    fn new(source: &'s [u8]) -> Self {
        Self {
            source,
            functions: BTreeSet::new(),
            classes: BTreeSet::new(),
            constants: BTreeSet::new(),
            exported: None,
            bindings: FxHashMap::default(),
            star_imports: Vec::new(),
            wrapped: FxHashMap::default(),
        }
    }

    fn visit_block(&mut self, block: Node) {
        let mut cursor = block.walk();
        for statement in block.named_children(&mut cursor) {
            self.visit_statement(statement);
        }
    }

    fn visit_statement(&mut self, node: Node) {
        match node.kind() {
            "function_definition" => self.add_function(node, Vec::new()),
            "class_definition" => self.add_class(node, Vec::new()),
            "decorated_definition" => {
                let decorators = decorators_of(node, self.source);
                if let Some(definition) = node.child_by_field_name("definition") {
                    match definition.kind() {
                        "function_definition" => self.add_function(definition, decorators),
                        "class_definition" => self.add_class(definition, decorators),
                        _ => {}
                    }
                }
            }
            "expression_statement" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    match child.kind() {
                        "assignment" => self.visit_assignment(child),
                        "augmented_assignment" => self.visit_augmented_assignment(child),
                        "call" => self.visit_export_call(child),
                        _ => {}
                    }
                }
            }
            "import_statement" => self.visit_import(node),
            "import_from_statement" => self.visit_import_from(node),
            "if_statement" => {
                if self.is_main_guard(node) {
                    return;
                }
                if let Some(consequence) = node.child_by_field_name("consequence") {
                    self.visit_block(consequence);
                }
                let mut cursor = node.walk();
                for clause in node.named_children(&mut cursor) {
                    match clause.kind() {
                        "elif_clause" => {
                            if let Some(block) = clause.child_by_field_name("consequence") {
                                self.visit_block(block);
                            }
                        }
                        "else_clause" => {
                            if let Some(block) = clause.child_by_field_name("body") {
                                self.visit_block(block);
                            }
                        }
                        _ => {}
                    }
                }
            }
            "try_statement" => {
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_block(body);
                }
                let mut cursor = node.walk();
                for clause in node.named_children(&mut cursor) {
                    let block = match clause.kind() {
                        "except_clause" | "except_group_clause" | "finally_clause" => {
                            child_by_kind(clause, "block")
                        }
                        "else_clause" => clause.child_by_field_name("body"),
                        _ => None,
                    };
                    if let Some(block) = block {
                        self.visit_block(block);
                    }
                }
            }
            "with_statement" => {
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_block(body);
                }
            }
            _ => {}
        }
    }

    fn add_function(&mut self, node: Node, decorators: Vec<String>) {
        if let Some(decl) = function_decl(node, self.source, decorators) {
            self.functions.insert(decl.name.clone());
            self.bindings.insert(decl.name.clone(), Binding::Function(decl));
        }
    }

    fn add_class(&mut self, node: Node, decorators: Vec<String>) {
        if let Some(decl) = class_decl(node, self.source, decorators) {
            self.classes.insert(decl.name.clone());
            self.bindings.insert(decl.name.clone(), Binding::Class(decl));
        }
    }

    fn visit_assignment(&mut self, node: Node) {
        // `a = b = value` nests assignments on the right
        let mut targets = Vec::new();
        let mut current = node;
        let value = loop {
            if let Some(left) = current.child_by_field_name("left") {
                targets.push(left);
            }
            match current.child_by_field_name("right") {
                Some(right) if right.kind() == "assignment" => current = right,
                other => break other,
            }
        };

        for target in targets {
            match target.kind() {
                "identifier" => self.bind_name(node_text(target, self.source), value),
                "attribute" => self.record_wrapped(target, value),
                _ => {}
            }
        }
    }

    fn bind_name(&mut self, name: &str, value: Option<Node>) {
        // a bare annotation binds nothing
        let Some(value) = value else {
            return;
        };
        if name == "__all__" {
            self.exported = string_sequence(value, self.source).map(|names| names.into_iter().collect());
            return;
        }
        if is_constant_name(name) {
            self.constants.insert(name.to_string());
        }
        self.bindings
            .insert(name.to_string(), Binding::Value(classify_value(value, self.source)));
    }

    fn record_wrapped(&mut self, target: Node, value: Option<Node>) {
        let attribute = target
            .child_by_field_name("attribute")
            .map(|n| node_text(n, self.source));
        if attribute != Some("__wrapped__") {
            return;
        }
        let object = target
            .child_by_field_name("object")
            .filter(|n| n.kind() == "identifier")
            .map(|n| node_text(n, self.source).to_string());
        let wrapped = value.and_then(|v| dotted_name(v, self.source));
        if let (Some(object), Some(wrapped)) = (object, wrapped) {
            self.wrapped.insert(object, wrapped);
        }
    }

    fn visit_augmented_assignment(&mut self, node: Node) {
        let is_all = node
            .child_by_field_name("left")
            .map_or(false, |left| node_text(left, self.source) == "__all__");
        if !is_all {
            return;
        }
        let extra = node
            .child_by_field_name("right")
            .and_then(|right| string_sequence(right, self.source));
        self.extend_exports(extra);
    }

    /// `__all__.extend([...])` and `__all__.append("x")`
    fn visit_export_call(&mut self, node: Node) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        let extra = match dotted_name(function, self.source).as_deref() {
            Some("__all__.extend") => first_argument(node)
                .and_then(|arg| string_sequence(arg, self.source)),
            Some("__all__.append") => first_argument(node)
                .and_then(|arg| string_literal(arg, self.source))
                .map(|name| vec![name]),
            _ => return,
        };
        self.extend_exports(extra);
    }

    /// Extend a literal export list; a non-literal extension makes it unknown
    fn extend_exports(&mut self, extra: Option<Vec<String>>) {
        match (self.exported.as_mut(), extra) {
            (Some(exported), Some(extra)) => exported.extend(extra),
            (Some(_), None) => self.exported = None,
            (None, _) => {}
        }
    }

    fn visit_import(&mut self, node: Node) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                // `import a.b.c` binds `a`
                "dotted_name" => {
                    let module = node_text(child, self.source);
                    let top = module.split('.').next().unwrap_or(module);
                    self.bindings.insert(
                        top.to_string(),
                        Binding::Import {
                            source: ImportRef::absolute(top),
                            name: None,
                        },
                    );
                }
                "aliased_import" => {
                    let module = child.child_by_field_name("name");
                    let alias = child.child_by_field_name("alias");
                    if let (Some(module), Some(alias)) = (module, alias) {
                        self.bindings.insert(
                            node_text(alias, self.source).to_string(),
                            Binding::Import {
                                source: ImportRef::absolute(node_text(module, self.source)),
                                name: None,
                            },
                        );
                    }
                }
                _ => {}
            }
        }
    }

    fn visit_import_from(&mut self, node: Node) {
        let Some(module_node) = node.child_by_field_name("module_name") else {
            return;
        };
        let source = match module_node.kind() {
            "relative_import" => {
                let level = child_by_kind(module_node, "import_prefix")
                    .map(|prefix| node_text(prefix, self.source).matches('.').count())
                    .unwrap_or(1);
                let module = child_by_kind(module_node, "dotted_name")
                    .map(|n| node_text(n, self.source).to_string())
                    .unwrap_or_default();
                ImportRef { module, level }
            }
            _ => ImportRef::absolute(node_text(module_node, self.source)),
        };

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child == module_node {
                continue;
            }
            match child.kind() {
                "dotted_name" => {
                    let name = node_text(child, self.source).to_string();
                    self.bindings.insert(
                        name.clone(),
                        Binding::Import {
                            source: source.clone(),
                            name: Some(name),
                        },
                    );
                }
                "aliased_import" => {
                    let name = child.child_by_field_name("name");
                    let alias = child.child_by_field_name("alias");
                    if let (Some(name), Some(alias)) = (name, alias) {
                        self.bindings.insert(
                            node_text(alias, self.source).to_string(),
                            Binding::Import {
                                source: source.clone(),
                                name: Some(node_text(name, self.source).to_string()),
                            },
                        );
                    }
                }
                "wildcard_import" => self.star_imports.push(source.clone()),
                _ => {}
            }
        }
    }

    fn is_main_guard(&self, node: Node) -> bool {
        node.child_by_field_name("condition").map_or(false, |condition| {
            let text = node_text(condition, self.source);
            text.contains("__name__") && text.contains("__main__")
        })
    }

    fn finish(self) -> ParsedModule {
        let exported = self.exported;
        let public = |names: BTreeSet<String>| -> BTreeSet<String> {
            names
                .into_iter()
                .filter(|name| {
                    !name.starts_with('_')
                        || exported.as_ref().map_or(false, |all| all.contains(name))
                })
                .collect()
        };

        let surface = ApiSurface {
            functions: public(self.functions),
            classes: public(self.classes),
            constants: public(self.constants),
            exported: exported.clone(),
        };

        ParsedModule {
            surface,
            bindings: self.bindings,
            star_imports: self.star_imports,
            wrapped: self.wrapped,
        }
    }
}

fn function_decl(node: Node, source: &[u8], decorators: Vec<String>) -> Option<FunctionDecl> {
    let name = node.child_by_field_name("name")?;
    Some(FunctionDecl {
        name: node_text(name, source).to_string(),
        parameters: node
            .child_by_field_name("parameters")
            .map(|params| extract_parameters(params, source))
            .unwrap_or_default(),
        return_annotation: node
            .child_by_field_name("return_type")
            .map(|n| expression_text(n, source)),
        decorators,
        is_async: child_by_kind(node, "async").is_some(),
        line: node.start_position().row + 1,
    })
}

fn class_decl(node: Node, source: &[u8], decorators: Vec<String>) -> Option<ClassDecl> {
    let name = node.child_by_field_name("name")?;
    let mut decl = ClassDecl {
        name: node_text(name, source).to_string(),
        bases: Vec::new(),
        decorators,
        methods: BTreeMap::new(),
        fields: Vec::new(),
        line: node.start_position().row + 1,
    };

    if let Some(superclasses) = node.child_by_field_name("superclasses") {
        let mut cursor = superclasses.walk();
        for base in superclasses.named_children(&mut cursor) {
            match base.kind() {
                "keyword_argument" | "comment" => {}
                _ => decl.bases.push(
                    dotted_name(base, source).unwrap_or_else(|| expression_text(base, source)),
                ),
            }
        }
    }

    let Some(body) = node.child_by_field_name("body") else {
        return Some(decl);
    };
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        let method = match member.kind() {
            "function_definition" => function_decl(member, source, Vec::new()),
            "decorated_definition" => member
                .child_by_field_name("definition")
                .filter(|def| def.kind() == "function_definition")
                .and_then(|def| function_decl(def, source, decorators_of(member, source))),
            "expression_statement" => {
                if let Some(field) = member.named_child(0).and_then(|a| class_field(a, source)) {
                    decl.fields.push(field);
                }
                None
            }
            _ => None,
        };
        if let Some(method) = method {
            // keep the implementation over `@overload` stubs
            let is_overload = method.has_decorator("overload");
            if !(is_overload && decl.methods.contains_key(&method.name)) {
                decl.methods.insert(method.name.clone(), method);
            }
        }
    }

    Some(decl)
}

/// `name: T` or `name: T = default` inside a class body
fn class_field(node: Node, source: &[u8]) -> Option<ParameterInfo> {
    if node.kind() != "assignment" {
        return None;
    }
    let left = node.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    let annotation = expression_text(node.child_by_field_name("type")?, source);
    if annotation.starts_with("ClassVar") || annotation.starts_with("typing.ClassVar") {
        return None;
    }
    let mut field = ParameterInfo::new(
        node_text(left, source),
        pretty_mod_core::ParamKind::Positional,
    )
    .with_annotation(annotation);
    field.default = node
        .child_by_field_name("right")
        .map(|n| expression_text(n, source));
    Some(field)
}

fn decorators_of(node: Node, source: &[u8]) -> Vec<String> {
    let mut cursor = node.walk();
    let decorators = node
        .named_children(&mut cursor)
        .filter(|child| child.kind() == "decorator")
        .map(|decorator| {
            collapse_whitespace(node_text(decorator, source).trim_start_matches('@'))
        })
        .collect();
    decorators
}

fn has_decorator(decorators: &[String], name: &str) -> bool {
    decorators.iter().any(|decorator| {
        let base = decorator.split('(').next().unwrap_or(decorator).trim();
        base == name || base.rsplit('.').next() == Some(name)
    })
}

fn first_argument(call: Node) -> Option<Node> {
    call.child_by_field_name("arguments")?.named_child(0)
}

fn classify_value(node: Node, source: &[u8]) -> AssignedValue {
    match node.kind() {
        "identifier" | "attribute" => match dotted_name(node, source) {
            Some(name) => AssignedValue::Alias(name),
            None => AssignedValue::Other(expression_text(node, source)),
        },
        "call" => call_expr(node, source)
            .map(AssignedValue::Call)
            .unwrap_or_else(|| AssignedValue::Other(expression_text(node, source))),
        "lambda" => AssignedValue::Lambda(
            node.child_by_field_name("parameters")
                .map(|params| extract_parameters(params, source))
                .unwrap_or_default(),
        ),
        "parenthesized_expression" => match node.named_child(0) {
            Some(inner) => classify_value(inner, source),
            None => AssignedValue::Other(expression_text(node, source)),
        },
        "string" | "concatenated_string" | "integer" | "float" | "true" | "false" | "none"
        | "ellipsis" | "list" | "tuple" | "dictionary" | "set" | "unary_operator"
        | "binary_operator" | "boolean_operator" | "comparison_operator"
        | "list_comprehension" | "dictionary_comprehension" | "set_comprehension" => {
            AssignedValue::Literal(expression_text(node, source))
        }
        _ => AssignedValue::Other(expression_text(node, source)),
    }
}

fn call_expr(node: Node, source: &[u8]) -> Option<CallExpr> {
    let function = node.child_by_field_name("function")?;
    let (callee, curried) = match function.kind() {
        "call" => (dotted_name(function.child_by_field_name("function")?, source)?, true),
        _ => (dotted_name(function, source)?, false),
    };
    let mut args = Vec::new();
    if let Some(arguments) = node.child_by_field_name("arguments") {
        let mut cursor = arguments.walk();
        for arg in arguments.named_children(&mut cursor) {
            match arg.kind() {
                "keyword_argument" | "comment" | "list_splat" | "dictionary_splat" => {}
                _ => args.push(expression_text(arg, source)),
            }
        }
    }
    Some(CallExpr {
        callee,
        curried,
        args,
    })
}

/// UPPER_CASE names, optionally with digits and underscores
fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_uppercase()) && !name.chars().any(|c| c.is_lowercase())
}
