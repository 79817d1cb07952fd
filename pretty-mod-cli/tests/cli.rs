//! End-to-end runs of the `pretty-mod` binary against fixture packages

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let cache = dir.path().join("cache");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&cache).unwrap();

        let config = format!(
            "[package]\noffline = true\ncache_dir = {:?}\n\n[modules]\nsearch_paths = [{:?}]\nuse_interpreter_path = false\ndynamic_fallback = false\n",
            cache.display().to_string(),
            src.display().to_string(),
        );
        fs::write(dir.path().join("config.toml"), config).unwrap();
        Self { dir }
    }

    fn file(self, relative: &str, content: &str) -> Self {
        let path = self.dir.path().join("src").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    fn config(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_pretty-mod"))
            .arg("--config")
            .arg(self.config().join("config.toml"))
            .args(args)
            .env("NO_COLOR", "1")
            .env_remove("PRETTY_MOD_ASCII")
            .env_remove("PRETTY_MOD_LOG")
            .env_remove("PRETTY_MOD_OFFLINE")
            .env_remove("PRETTY_MOD_CACHE_DIR")
            .output()
            .unwrap()
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn shop() -> Workspace {
    Workspace::new()
        .file(
            "shop/__init__.py",
            "__all__ = [\"f\"]\n\ndef f():\n    pass\n\nclass C:\n    pass\n\nX = 1\n",
        )
        .file("shop/cart.py", "def add(item, qty=1) -> bool:\n    pass\n")
}

#[test]
fn test_tree_pretty() {
    let output = shop().run(&["tree", "shop", "--depth", "1"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "📦 shop\n├── 📜 __all__: f\n├── ⚡ functions: f\n├── 🔷 classes: C\n├── 📌 constants: X\n└── 📦 cart\n    └── ⚡ functions: add\n"
    );
}

#[test]
fn test_tree_json() {
    let output = shop().run(&["tree", "shop", "--depth", "0", "--format", "json"]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["module"], "shop");
    assert_eq!(value["tree"]["api"]["classes"][0], "C");
    assert!(value["tree"]["submodules"].as_object().unwrap().is_empty());
}

#[test]
fn test_sig_pretty_and_unavailable() {
    let workspace = shop();

    let output = workspace.run(&["sig", "shop.cart:add"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "📎 shop.cart:add\n├── Parameters:\n├── item\n├── qty=1\n└── Returns:\n    └── bool\n"
    );

    let output = workspace.run(&["sig", "shop:X"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "📎 shop:X (signature not available: not callable)\n");
}

#[test]
fn test_exit_codes() {
    let workspace = shop();

    let malformed = workspace.run(&["sig", "a:b:c"]);
    assert_eq!(malformed.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&malformed.stderr).contains("Error:"));

    let attribute = workspace.run(&["tree", "shop:f"]);
    assert_eq!(attribute.status.code(), Some(2));

    let missing = workspace.run(&["tree", "not_a_real_module_xyz"]);
    assert_eq!(missing.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&missing.stderr).contains("not_a_real_module_xyz"));
}
