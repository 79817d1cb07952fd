//! Module tree exploration over fixture packages

mod common;

use common::Fixture;
use pretty_assertions::assert_eq;
use pretty_mod_core::{DiscoveryMode, ModuleNode, Warning};
use pretty_mod_modules::{ErrorKind, ModuleTreeExplorer};
use std::collections::BTreeSet;
use std::sync::Arc;

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn shop() -> Fixture {
    Fixture::new()
        .file(
            "shop/__init__.py",
            "__all__ = [\"f\"]\n\ndef f():\n    pass\n\nclass C:\n    pass\n\nX = 1\n",
        )
        .file("shop/cart.py", "def add(item, qty=1):\n    pass\n\nMAX_ITEMS = 50\n")
        .file("shop/billing/__init__.py", "class Invoice:\n    pass\n")
        .file("shop/billing/tax.py", "def rate(region):\n    pass\n")
        .file("shop/billing/tax_tables/__init__.py", "")
}

#[test]
fn test_root_surface() {
    let fixture = shop();
    let explorer = ModuleTreeExplorer::new(Arc::new(fixture.environment()));
    let tree = explorer.explore_str("shop", 0).unwrap();

    assert_eq!(tree.name, "shop");
    assert_eq!(tree.depth, 0);
    assert_eq!(tree.mode, DiscoveryMode::Static);
    assert_eq!(tree.api.functions, names(&["f"]));
    assert_eq!(tree.api.classes, names(&["C"]));
    assert_eq!(tree.api.constants, names(&["X"]));
    assert_eq!(tree.api.exported, Some(names(&["f"])));
    assert!(tree.submodules.is_empty());
    assert_eq!(tree.filesystem_path.as_deref(), Some(fixture.root().join("shop").as_path()));
}

#[test]
fn test_depth_limits_and_prefixes() {
    let fixture = shop();
    let explorer = ModuleTreeExplorer::new(Arc::new(fixture.environment()));

    let depth1 = explorer.explore_str("shop", 1).unwrap();
    let children: Vec<_> = depth1.submodules.keys().cloned().collect();
    assert_eq!(children, vec!["billing", "cart"]);
    assert!(depth1.submodules["billing"].submodules.is_empty());
    assert_eq!(depth1.submodules["cart"].api.constants, names(&["MAX_ITEMS"]));

    let depth2 = explorer.explore_str("shop", 2).unwrap();
    let tax = depth2.find("billing.tax").unwrap();
    assert_eq!(tax.depth, 2);
    assert_eq!(tax.name, "shop.billing.tax");
    assert!(depth2.find("billing.tax_tables").is_some());

    // a shallower tree is the deeper one cut off
    assert_eq!(depth2.truncated(1), depth1);
    assert_eq!(depth2.deepest(), 2);
}

#[test]
fn test_depth_is_relative_to_requested_module() {
    let fixture = shop();
    let explorer = ModuleTreeExplorer::new(Arc::new(fixture.environment()));
    let tree: ModuleNode = explorer.explore_str("shop.billing", 1).unwrap();
    assert_eq!(tree.depth, 0);
    assert_eq!(tree.api.classes, names(&["Invoice"]));
    assert_eq!(tree.submodules.keys().cloned().collect::<Vec<_>>(), vec!["tax", "tax_tables"]);
}

#[test]
fn test_broken_submodules_are_skipped_with_warning() {
    let fixture = shop().file("shop/legacy.py", "def old(:\n    pass\n");
    let explorer = ModuleTreeExplorer::new(Arc::new(fixture.environment()));
    let tree = explorer.explore_str("shop", 1).unwrap();

    assert!(!tree.submodules.contains_key("legacy"));
    assert!(tree.submodules.contains_key("cart"));
    let warnings = fixture.warnings.take();
    assert!(warnings.iter().any(|w| matches!(
        w,
        Warning::SubmoduleSkipped { module, .. } if module == "shop.legacy"
    )));
}

#[test]
fn test_stub_only_module() {
    let fixture = Fixture::new()
        .file("fastmath/__init__.pyi", "def dot(a: list[float], b: list[float]) -> float: ...\nPI: float\n")
        .file("fastmath/_core.cpython-311-x86_64-linux-gnu.so", "");
    let explorer = ModuleTreeExplorer::new(Arc::new(fixture.environment()));
    let tree = explorer.explore_str("fastmath", 1).unwrap();

    assert_eq!(tree.api.functions, names(&["dot"]));
    // the extension needs an interpreter, which this environment lacks
    assert!(tree.submodules.is_empty());
    assert_eq!(fixture.warnings.take().len(), 1);
}

#[test]
fn test_unknown_module_and_attribute_requests() {
    let fixture = shop();
    let explorer = ModuleTreeExplorer::new(Arc::new(fixture.environment()));

    let missing = explorer.explore_str("not_a_real_module_xyz", 1).unwrap_err();
    assert_eq!(missing.kind(), ErrorKind::ModuleNotFound);

    let attribute = explorer.explore_str("shop:f", 1).unwrap_err();
    assert_eq!(attribute.kind(), ErrorKind::Syntax);
    assert!(attribute.to_string().contains("shop:f"));
}

#[test]
fn test_star_reexports_reach_package_surface() {
    let fixture = Fixture::new()
        .file("starpkg/__init__.py", "from .core import *\n")
        .file("starpkg/core.py", "def f():\n    pass\n\nK = 1\n\ndef _private():\n    pass\n");
    let explorer = ModuleTreeExplorer::new(Arc::new(fixture.environment()));
    let tree = explorer.explore_str("starpkg", 0).unwrap();

    assert_eq!(tree.mode, DiscoveryMode::Static);
    assert_eq!(tree.api.functions, names(&["f"]));
    assert_eq!(tree.api.constants, names(&["K"]));
    assert!(fixture.warnings.take().is_empty());
}
