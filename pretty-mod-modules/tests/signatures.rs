//! Signature resolution over fixture packages

mod common;

use common::Fixture;
use pretty_assertions::assert_eq;
use pretty_mod_core::{ParamKind, SignatureRecord};
use pretty_mod_modules::{ErrorKind, SignatureResolver};
use std::sync::Arc;

fn resolver(fixture: &Fixture) -> SignatureResolver {
    SignatureResolver::new(Arc::new(fixture.environment()))
}

fn resolved(fixture: &Fixture, path: &str) -> SignatureRecord {
    match resolver(fixture).resolve_str(path).unwrap() {
        Ok(record) => record,
        Err(unavailable) => panic!("{} unavailable: {}", path, unavailable.reason),
    }
}

fn unavailable_reason(fixture: &Fixture, path: &str) -> String {
    match resolver(fixture).resolve_str(path).unwrap() {
        Ok(record) => panic!("{} unexpectedly resolved to {}", path, record.render()),
        Err(unavailable) => unavailable.reason,
    }
}

#[test]
fn test_plain_function() {
    let fixture = Fixture::new().file(
        "tools.py",
        "def g(a, b=2, *args, **kwargs) -> None:\n    pass\n\nLIMIT = 10\n",
    );
    let record = resolved(&fixture, "tools:g");

    assert_eq!(record.qualified_name, "tools:g");
    let kinds: Vec<_> = record.parameters.iter().map(|p| p.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ParamKind::Positional,
            ParamKind::Positional,
            ParamKind::VarPositional,
            ParamKind::VarKeyword,
        ]
    );
    assert_eq!(record.parameters[1].default.as_deref(), Some("2"));
    assert_eq!(record.return_annotation.as_deref(), Some("None"));
    assert_eq!(record.render(), "(a, b=2, *args, **kwargs) -> None");
    assert!(record.resolution_path.is_empty());

    // the dotted form finds the same function
    assert_eq!(resolved(&fixture, "tools.g"), record);
}

#[test]
fn test_unknown_and_non_callable() {
    let fixture = Fixture::new().file("tools.py", "LIMIT = 10\n");
    assert!(unavailable_reason(&fixture, "tools:nope").contains("could not import"));
    assert!(unavailable_reason(&fixture, "not_a_real_module_xyz:thing").contains("could not import"));
    assert_eq!(unavailable_reason(&fixture, "tools:LIMIT"), "not callable");
    assert_eq!(unavailable_reason(&fixture, "tools"), "not callable");
}

#[test]
fn test_malformed_path_is_fatal() {
    let fixture = Fixture::new();
    let err = resolver(&fixture).resolve_str("a:b:c").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

#[test]
fn test_reexport_chain() {
    let fixture = Fixture::new()
        .file("pkg/__init__.py", "from .api import connect\n")
        .file("pkg/api.py", "from pkg._impl.net import connect as connect\n")
        .file(
            "pkg/_impl/net.py",
            "def connect(host: str, port: int = 443, *, timeout: float = 5.0) -> 'Conn':\n    pass\n",
        )
        .file("pkg/_impl/__init__.py", "");
    let record = resolved(&fixture, "pkg:connect");

    assert_eq!(record.qualified_name, "pkg._impl.net:connect");
    assert_eq!(record.render(), "(host: str, port: int = 443, *, timeout: float = 5.0) -> 'Conn'");
    assert_eq!(record.resolution_path.len(), 2);
    assert!(record.resolution_path[0].starts_with("follow-reexport: pkg:connect -> pkg.api:connect"));
}

#[test]
fn test_class_constructor() {
    let fixture = Fixture::new().file(
        "models.py",
        "\
from dataclasses import dataclass

class Base:
    def __init__(self, name, *, debug=False):
        pass

class Child(Base):
    pass

@dataclass
class Point:
    x: int
    y: int = 0

class Empty:
    pass
",
    );

    let child = resolved(&fixture, "models:Child");
    assert_eq!(child.render(), "(name, *, debug=False)");
    assert_eq!(child.qualified_name, "models:Base.__init__");
    assert_eq!(child.resolution_path.len(), 2);

    let point = resolved(&fixture, "models:Point");
    assert_eq!(point.render(), "(x: int, y: int = 0) -> None");

    assert_eq!(resolved(&fixture, "models:Empty").render(), "()");
}

#[test]
fn test_decorator_instance() {
    let fixture = Fixture::new()
        .file("flowlib/__init__.py", "from flowlib.flows import flow\n")
        .file(
            "flowlib/flows.py",
            "\
class FlowDecorator:
    def __call__(self, fn=None, *, name: str = None, retries: int = 0):
        pass

flow = FlowDecorator()
",
        );

    let record = resolved(&fixture, "flowlib:flow");
    assert_eq!(record.qualified_name, "flowlib.flows:FlowDecorator.__call__");
    assert_eq!(record.render(), "(fn=None, *, name: str = None, retries: int = 0)");
    let rules: Vec<_> = record
        .resolution_path
        .iter()
        .map(|hop| hop.split(':').next().unwrap().to_string())
        .collect();
    assert_eq!(rules, vec!["follow-reexport", "instance-call", "instance-call"]);
}

#[test]
fn test_partial_and_alias() {
    let fixture = Fixture::new().file(
        "mathx.py",
        "\
import functools

def power(base, exp, *, mod=None):
    pass

square = functools.partial(power, 2)
pow2 = square
",
    );

    let record = resolved(&fixture, "mathx:pow2");
    assert_eq!(record.render(), "(exp, *, mod=None)");
    assert_eq!(record.qualified_name, "mathx:power");
    assert!(record.resolution_path[0].starts_with("follow-alias"));
    assert!(record.resolution_path[1].starts_with("unwrap-wrapped-target"));
}

#[test]
fn test_lazily_exported_name() {
    let fixture = Fixture::new()
        .file(
            "lazy/__init__.py",
            "__all__ = ['serve']\n\ndef __getattr__(name):\n    pass\n",
        )
        .file("lazy/server.py", "def serve(app, port=8000):\n    pass\n");

    let record = resolved(&fixture, "lazy:serve");
    assert_eq!(record.qualified_name, "lazy.server:serve");
    assert_eq!(record.render(), "(app, port=8000)");
    assert!(record.resolution_path[0].starts_with("exported-from-submodule"));
}

#[test]
fn test_method_and_cycle() {
    let fixture = Fixture::new()
        .file(
            "svc.py",
            "\
class Client:
    def get(self, url, **params):
        pass

    @classmethod
    def create(cls, token):
        pass
",
        )
        .file("loop_a.py", "from loop_b import thing\n")
        .file("loop_b.py", "from loop_a import thing\n");

    assert_eq!(resolved(&fixture, "svc:Client.get").render(), "(self, url, **params)");
    assert_eq!(resolved(&fixture, "svc:Client.create").render(), "(token)");
    assert!(unavailable_reason(&fixture, "loop_a:thing").contains("circular"));
}
