use crate::module::{AssignedValue, Binding, ImportRef};
use crate::{parse_declarations, parse_module, ErrorKind};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_one_of_each() {
    let surface = parse_declarations(
        "def helper():\n    pass\n\nclass Widget:\n    pass\n\nLIMIT = 10\n",
        "m.py",
    )
    .unwrap();
    assert_eq!(surface.functions, set(&["helper"]));
    assert_eq!(surface.classes, set(&["Widget"]));
    assert_eq!(surface.constants, set(&["LIMIT"]));
    assert_eq!(surface.exported, None);
}

#[test]
fn test_export_list_does_not_filter_categories() {
    let source = "def f(): pass\nclass C: pass\nX = 1\n__all__ = [\"f\"]\n";
    let surface = parse_declarations(source, "m.py").unwrap();
    assert_eq!(surface.functions, set(&["f"]));
    assert_eq!(surface.classes, set(&["C"]));
    assert_eq!(surface.constants, set(&["X"]));
    assert_eq!(surface.exported, Some(set(&["f"])));
}

#[test]
fn test_private_names_hidden_unless_exported() {
    let source = "\
def _internal(): pass
def _shared(): pass
class _Hidden: pass
_LIMIT = 3
__all__ = ('_shared', 'missing')
";
    let surface = parse_declarations(source, "m.py").unwrap();
    assert_eq!(surface.functions, set(&["_shared"]));
    assert!(surface.classes.is_empty());
    assert!(surface.constants.is_empty());
    // unresolvable names stay in the export list only
    assert_eq!(surface.exported, Some(set(&["_shared", "missing"])));
    assert!(!surface.declares("missing"));
}

#[test]
fn test_non_literal_export_list_is_unset() {
    let source = "from .core import __all__ as _core_all\n__all__ = _core_all + ['extra']\n";
    let surface = parse_declarations(source, "m.py").unwrap();
    assert_eq!(surface.exported, None);
}

#[test]
fn test_export_list_extensions() {
    let source = "\
__all__ = ['a']
__all__ += ['b']
__all__.extend(['c'])
__all__.append('d')
";
    let surface = parse_declarations(source, "m.py").unwrap();
    assert_eq!(surface.exported, Some(set(&["a", "b", "c", "d"])));

    let dynamic = parse_declarations("__all__ = ['a']\n__all__ += other.__all__\n", "m.py").unwrap();
    assert_eq!(dynamic.exported, None);
}

#[test]
fn test_conditional_definitions_union() {
    let source = "\
import sys
from typing import TYPE_CHECKING

if TYPE_CHECKING:
    from .types import Thing

if sys.version_info >= (3, 11):
    def modern(): pass
elif sys.platform == 'win32':
    def windows(): pass
else:
    class Legacy: pass

try:
    from ._speedups import fast
except ImportError:
    def fast(): pass
finally:
    READY = True

if __name__ == '__main__':
    def main(): pass
";
    let surface = parse_declarations(source, "m.py").unwrap();
    assert_eq!(surface.functions, set(&["fast", "modern", "windows"]));
    assert_eq!(surface.classes, set(&["Legacy"]));
    assert_eq!(surface.constants, set(&["READY"]));
}

#[test]
fn test_nested_definitions_ignored() {
    let source = "\
def outer():
    def inner(): pass
    CONST = 1

class Box:
    def method(self): pass
    SIZE = 2
";
    let surface = parse_declarations(source, "m.py").unwrap();
    assert_eq!(surface.functions, set(&["outer"]));
    assert_eq!(surface.classes, set(&["Box"]));
    assert!(surface.constants.is_empty());
}

#[test]
fn test_decorated_and_async_definitions() {
    let source = "\
@decorator
def wrapped(): pass

@dataclass(frozen=True)
class Point:
    x: int
    y: int = 0

async def fetch(url: str) -> bytes: ...
";
    let module = parse_module(source, "m.py").unwrap();
    assert_eq!(module.surface.functions, set(&["fetch", "wrapped"]));
    assert_eq!(module.surface.classes, set(&["Point"]));

    let Some(Binding::Class(point)) = module.binding("Point") else {
        panic!("Point should be a class binding");
    };
    assert!(point.is_dataclass());
    assert_eq!(point.fields.len(), 2);
    assert_eq!(point.fields[1].default.as_deref(), Some("0"));

    let Some(Binding::Function(fetch)) = module.binding("fetch") else {
        panic!("fetch should be a function binding");
    };
    assert!(fetch.is_async);
    assert_eq!(fetch.return_annotation.as_deref(), Some("bytes"));
}

#[test]
fn test_chained_and_annotated_constants() {
    let surface = parse_declarations("A = B = 1\nC: int = 2\nD: int\nlower = 3\n", "m.py").unwrap();
    assert_eq!(surface.constants, set(&["A", "B", "C"]));
}

#[test]
fn test_import_bindings() {
    let source = "\
import os.path
import numpy as np
from .flows import flow
from ..core import Engine as _Engine
from typing import *
";
    let module = parse_module(source, "m.py").unwrap();
    assert_eq!(
        module.binding("os"),
        Some(&Binding::Import {
            source: ImportRef::absolute("os"),
            name: None,
        })
    );
    assert_eq!(
        module.binding("np"),
        Some(&Binding::Import {
            source: ImportRef::absolute("numpy"),
            name: None,
        })
    );
    assert_eq!(
        module.binding("flow"),
        Some(&Binding::Import {
            source: ImportRef {
                module: "flows".to_string(),
                level: 1,
            },
            name: Some("flow".to_string()),
        })
    );
    assert!(matches!(
        module.binding("_Engine"),
        Some(Binding::Import { source, name: Some(name) }) if source.level == 2 && name == "Engine"
    ));
    assert_eq!(module.star_imports, vec![ImportRef::absolute("typing")]);
}

#[test]
fn test_assignment_classification() {
    let source = "\
flow = FlowDecorator()
cached = functools.lru_cache(maxsize=None)(compute)
bound = partial(compute, 1)
alias = compute
square = lambda x, power=2: x ** power
NAMES = ['a', 'b']
compute.__wrapped__ = original
";
    let module = parse_module(source, "m.py").unwrap();

    let Some(Binding::Value(AssignedValue::Call(call))) = module.binding("flow") else {
        panic!("flow should be a call");
    };
    assert_eq!(call.callee, "FlowDecorator");
    assert!(call.args.is_empty());

    let Some(Binding::Value(AssignedValue::Call(call))) = module.binding("cached") else {
        panic!("cached should be a call");
    };
    assert_eq!(call.callee, "functools.lru_cache");
    assert!(call.curried);
    assert_eq!(call.args, vec!["compute"]);

    let Some(Binding::Value(AssignedValue::Call(call))) = module.binding("bound") else {
        panic!("bound should be a call");
    };
    assert_eq!(call.args, vec!["compute", "1"]);

    assert_eq!(
        module.binding("alias"),
        Some(&Binding::Value(AssignedValue::Alias("compute".to_string())))
    );
    assert!(matches!(
        module.binding("square"),
        Some(Binding::Value(AssignedValue::Lambda(params))) if params.len() == 2
    ));
    assert!(matches!(
        module.binding("NAMES"),
        Some(Binding::Value(AssignedValue::Literal(_)))
    ));
    assert_eq!(module.wrapped.get("compute").map(String::as_str), Some("original"));
}

#[test]
fn test_overload_stubs_yield_to_implementation() {
    let source = "\
class Client:
    @overload
    def get(self, key: str) -> str: ...
    @overload
    def get(self, key: int) -> int: ...
    def get(self, key, default=None):
        return default
";
    let module = parse_module(source, "m.py").unwrap();
    let Some(Binding::Class(client)) = module.binding("Client") else {
        panic!("Client should be a class binding");
    };
    let get = client.method("get").unwrap();
    assert!(get.decorators.is_empty());
    assert_eq!(get.parameters.len(), 3);
}

#[test]
fn test_syntax_error_reports_position() {
    let err = parse_declarations("def ok():\n    pass\nclass (:\n", "broken.py").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSyntax);
    let (line, column) = err.location().unwrap();
    assert_eq!(line, 3);
    assert!(column >= 1);
}

#[test]
fn test_unusual_but_valid_constructs() {
    let source = "\
match command:
    case 'go':
        pass
if (n := 10) > 5:
    pass
handler = lambda: None
print(*[1, 2], sep='')
def after(): pass
";
    let surface = parse_declarations(source, "m.py").unwrap();
    assert_eq!(surface.functions, set(&["after"]));
    assert!(surface.constants.is_empty());
}
