//! Dynamic introspection in a Python subprocess
//!
//! Used when a module's surface cannot be read statically (compiled or
//! builtin modules, unreadable star imports), to read the interpreter's
//! `sys.path`, and to ask for the live signature of objects the static
//! rules cannot see through. Every request runs under a deadline; an
//! interpreter that hangs on import is killed.

use crate::{ModuleError, Result};
use pretty_mod_core::{ParamKind, ParameterInfo};
use serde::Deserialize;
use serde_json::json;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

const SCRIPT: &str = include_str!("introspect.py");

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Surface of an imported module
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LiveSurface {
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub constants: Vec<String>,
    #[serde(default)]
    pub exported: Option<Vec<String>>,
    #[serde(default)]
    pub submodules: Vec<String>,
    #[serde(default)]
    pub file: Option<String>,
}

/// One parameter as reported by `inspect.signature`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LiveParameter {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub annotation: Option<String>,
}

impl From<LiveParameter> for ParameterInfo {
    fn from(param: LiveParameter) -> Self {
        ParameterInfo {
            name: param.name,
            kind: param.kind,
            default: param.default,
            annotation: param.annotation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LiveSignature {
    pub parameters: Vec<LiveParameter>,
    #[serde(default)]
    pub return_annotation: Option<String>,
}

/// What the interpreter knows about `module:attribute`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ObjectFacts {
    pub found: bool,
    pub callable: bool,
    pub is_class: bool,
    #[serde(default)]
    pub signature: Option<LiveSignature>,
}

/// Access to a live Python environment
pub trait Introspector: Send + Sync {
    /// The interpreter's module search path
    fn sys_path(&self) -> Result<Vec<PathBuf>>;

    /// Import `module` and categorize its attributes
    fn module_surface(&self, module: &str, extra_paths: &[PathBuf]) -> Result<LiveSurface>;

    /// Import `module` and inspect the dotted `attribute`
    fn object_facts(&self, module: &str, attribute: &str, extra_paths: &[PathBuf]) -> Result<ObjectFacts>;
}

/// Introspection is disabled; nothing can be imported
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInterpreter;

impl Introspector for NoInterpreter {
    fn sys_path(&self) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    fn module_surface(&self, module: &str, _extra_paths: &[PathBuf]) -> Result<LiveSurface> {
        Err(ModuleError::ModuleNotFound {
            module: module.to_string(),
        })
    }

    fn object_facts(&self, module: &str, _attribute: &str, _extra_paths: &[PathBuf]) -> Result<ObjectFacts> {
        Err(ModuleError::Introspection {
            module: module.to_string(),
            message: "dynamic introspection is disabled".to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    ok: bool,
    #[serde(default)]
    result: serde_json::Value,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Runs an external interpreter for every request
#[derive(Debug, Clone)]
pub struct PythonInterpreter {
    program: String,
    timeout: Duration,
}

impl PythonInterpreter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bound each request; the interpreter is killed when it runs longer
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the script and collect `(stdout, stderr)`, killing the process at the deadline
    fn execute(&self, module: &str, request: &serde_json::Value) -> Result<(Vec<u8>, Vec<u8>)> {
        let failure = |message: String| ModuleError::Introspection {
            module: module.to_string(),
            message,
        };

        let mut child = Command::new(&self.program)
            .arg("-c")
            .arg(SCRIPT)
            .arg(request.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| failure(format!("could not run {}: {}", self.program, e)))?;

        // drained on threads so a chatty import cannot fill the pipes and stall
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) if Instant::now() >= deadline => {
                    warn!("importing '{}' took longer than {:?}; stopping {}", module, self.timeout, self.program);
                    if let Err(e) = child.kill() {
                        debug!("could not kill {}: {}", self.program, e);
                    }
                    // reap; output threads are left to finish on their own
                    let _ = child.wait();
                    return Err(failure(format!(
                        "{} did not answer within {:?}",
                        self.program, self.timeout
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(failure(format!("could not wait for {}: {}", self.program, e))),
            }
        }

        Ok((collect(stdout), collect(stderr)))
    }

    fn run<T: serde::de::DeserializeOwned>(
        &self,
        module: &str,
        request: serde_json::Value,
    ) -> Result<T> {
        debug!("introspecting '{}' with {}", module, self.program);
        let (stdout, stderr) = self.execute(module, &request)?;

        let stdout = String::from_utf8_lossy(&stdout);
        trace!("interpreter replied: {}", stdout);
        let response: Response =
            serde_json::from_str(stdout.trim()).map_err(|_| ModuleError::Introspection {
                module: module.to_string(),
                message: last_line(&String::from_utf8_lossy(&stderr))
                    .unwrap_or("interpreter produced no result")
                    .to_string(),
            })?;

        if !response.ok {
            let error_type = response.error_type.unwrap_or_default();
            let message = response.message.unwrap_or_default();
            return Err(match error_type.as_str() {
                "ModuleNotFoundError" | "ImportError" => ModuleError::ModuleNotFound {
                    module: module.to_string(),
                },
                _ => ModuleError::Introspection {
                    module: module.to_string(),
                    message: format!("{}: {}", error_type, message),
                },
            });
        }

        serde_json::from_value(response.result).map_err(|e| ModuleError::Introspection {
            module: module.to_string(),
            message: format!("unexpected reply: {}", e),
        })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buffer = Vec::new();
            // a read error keeps whatever arrived before it
            let _ = pipe.read_to_end(&mut buffer);
            buffer
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|line| !line.is_empty())
}

fn path_strings(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

impl Introspector for PythonInterpreter {
    fn sys_path(&self) -> Result<Vec<PathBuf>> {
        let paths: Vec<String> = self.run("sys", json!({ "command": "sys-path" }))?;
        Ok(paths.into_iter().map(PathBuf::from).collect())
    }

    fn module_surface(&self, module: &str, extra_paths: &[PathBuf]) -> Result<LiveSurface> {
        self.run(
            module,
            json!({
                "command": "surface",
                "module": module,
                "paths": path_strings(extra_paths),
            }),
        )
    }

    fn object_facts(&self, module: &str, attribute: &str, extra_paths: &[PathBuf]) -> Result<ObjectFacts> {
        self.run(
            module,
            json!({
                "command": "facts",
                "module": module,
                "attribute": attribute,
                "paths": path_strings(extra_paths),
            }),
        )
    }
}
