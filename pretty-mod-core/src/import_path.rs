//! Import-path parsing
//!
//! Grammar: `[package][@version][::submodule][:attribute]`, or the plain
//! dotted form `package.sub.module[:attribute]`. A version may also be given
//! as a PEP 508 style suffix (`requests>=2.0`), and `[extras]` are dropped.

use crate::error::SyntaxError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Characters that start an inline version constraint (`pkg>=1.0`)
const CONSTRAINT_START: &[char] = &['<', '>', '=', '!', '~'];

/// A parsed request for a module, submodule or attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImportSpecifier {
    /// Top-level package; with `::` this is the distribution to acquire
    pub package: String,

    /// Raw version constraint (`2.31.0`, `>=1.0,<2`)
    pub version_constraint: Option<String>,

    /// Module segments below the package (or the whole module with `::`)
    pub submodule_path: Vec<String>,

    /// Dotted attribute after the single `:`
    pub attribute: Option<String>,

    /// Set by the `package::submodule` form
    pub distribution_override: bool,
}

impl ImportSpecifier {
    /// Parse an import-path string
    pub fn parse(raw: &str) -> Result<Self, SyntaxError> {
        let input = raw.trim();
        if input.is_empty() {
            return Err(SyntaxError::Empty);
        }
        if let Some(character) = input.chars().find(|c| c.is_whitespace() || c.is_control()) {
            return Err(SyntaxError::InvalidCharacter {
                input: input.to_string(),
                character,
            });
        }

        let (distribution, rest) = match input.split_once("::") {
            Some((dist, rest)) => {
                if rest.contains("::") {
                    return Err(SyntaxError::RepeatedDistributionMarker {
                        input: input.to_string(),
                    });
                }
                (Some(dist), rest)
            }
            None => (None, input),
        };

        let count = rest.matches(':').count()
            + distribution.map_or(0, |dist| dist.matches(':').count());
        if count > 1 {
            return Err(SyntaxError::TooManyColons {
                input: input.to_string(),
                count,
            });
        }
        if distribution.map_or(false, |dist| dist.contains(':')) {
            return Err(SyntaxError::InvalidCharacter {
                input: input.to_string(),
                character: ':',
            });
        }

        let (module_part, attribute) = match rest.split_once(':') {
            Some((module, attr)) => (module, Some(attr)),
            None => (rest, None),
        };

        if let Some(attr) = attribute {
            if attr.contains('@') || attr.contains(CONSTRAINT_START) {
                return Err(SyntaxError::VersionOnAttribute {
                    input: input.to_string(),
                    attribute: attr.to_string(),
                });
            }
            validate_dotted(input, attr, false)?;
        }

        let (module_name, module_version) = split_version(input, module_part)?;

        let (package, submodule_path, dist_version) = match distribution {
            Some(dist) => {
                let (dist_name, dist_version) = split_version(input, dist)?;
                validate_distribution(input, dist_name)?;
                validate_dotted(input, module_name, false)?;
                let submodules = module_name.split('.').map(str::to_string).collect();
                (dist_name.to_string(), submodules, dist_version)
            }
            None => {
                validate_dotted(input, module_name, true)?;
                let mut segments = module_name.split('.').map(str::to_string);
                let package = segments.next().unwrap_or_default();
                (package, segments.collect(), None)
            }
        };

        let version_constraint = match (dist_version, module_version) {
            (Some(_), Some(_)) => {
                return Err(SyntaxError::MultipleVersions {
                    input: input.to_string(),
                })
            }
            (dist, module) => dist.or(module),
        };

        Ok(Self {
            package,
            version_constraint,
            submodule_path,
            attribute: attribute.map(str::to_string),
            distribution_override: distribution.is_some(),
        })
    }

    /// Dotted name of the module to explore or import
    pub fn module_path(&self) -> String {
        if self.distribution_override {
            return self.submodule_path.join(".");
        }
        let mut path = self.package.replace('-', "_");
        for segment in &self.submodule_path {
            path.push('.');
            path.push_str(segment);
        }
        path
    }

    /// Name to acquire from the registry
    pub fn distribution(&self) -> &str {
        &self.package
    }

    /// First segment of [`module_path`](Self::module_path)
    pub fn top_level_module(&self) -> String {
        let module = self.module_path();
        match module.split_once('.') {
            Some((top, _)) => top.to_string(),
            None => module,
        }
    }

    /// Attribute segments, empty when no attribute was given
    pub fn attribute_path(&self) -> Vec<&str> {
        self.attribute
            .as_deref()
            .map(|attr| attr.split('.').collect())
            .unwrap_or_default()
    }

    /// Whether a `:` attribute was given
    pub fn has_attribute(&self) -> bool {
        self.attribute.is_some()
    }
}

impl FromStr for ImportSpecifier {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ImportSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version = |f: &mut fmt::Formatter<'_>| -> fmt::Result {
            match &self.version_constraint {
                Some(v) if v.starts_with(CONSTRAINT_START) => write!(f, "{}", v),
                Some(v) => write!(f, "@{}", v),
                None => Ok(()),
            }
        };

        if self.distribution_override {
            write!(f, "{}", self.package)?;
            version(f)?;
            write!(f, "::{}", self.submodule_path.join("."))?;
        } else {
            write!(f, "{}", self.package)?;
            for segment in &self.submodule_path {
                write!(f, ".{}", segment)?;
            }
            version(f)?;
        }
        if let Some(attr) = &self.attribute {
            write!(f, ":{}", attr)?;
        }
        Ok(())
    }
}

/// Split `name@version`, `name>=1.0` or `name[extra]` into name and constraint
fn split_version<'a>(input: &str, token: &'a str) -> Result<(&'a str, Option<String>), SyntaxError> {
    if let Some((name, version)) = token.split_once('@') {
        if version.contains('@') {
            return Err(SyntaxError::MultipleVersions {
                input: input.to_string(),
            });
        }
        let constraint = match version {
            "" | "latest" | "*" => None,
            v => Some(v.to_string()),
        };
        return Ok((name, constraint));
    }

    let name_end = token
        .find(|c: char| CONSTRAINT_START.contains(&c) || c == '[')
        .unwrap_or(token.len());
    let (name, mut tail) = token.split_at(name_end);

    if let Some(extras) = tail.strip_prefix('[') {
        match extras.find(']') {
            Some(end) => tail = &extras[end + 1..],
            None => {
                return Err(SyntaxError::InvalidCharacter {
                    input: input.to_string(),
                    character: '[',
                })
            }
        }
    }

    if tail.is_empty() {
        return Ok((name, None));
    }
    if !tail.starts_with(CONSTRAINT_START) {
        let character = tail.chars().next().unwrap_or('[');
        return Err(SyntaxError::InvalidCharacter {
            input: input.to_string(),
            character,
        });
    }
    Ok((name, Some(tail.to_string())))
}

fn validate_dotted(input: &str, text: &str, dash_in_first: bool) -> Result<(), SyntaxError> {
    let empty = || SyntaxError::EmptySegment {
        input: input.to_string(),
        segment: text.to_string(),
    };
    if text.is_empty() {
        return Err(empty());
    }
    for (index, segment) in text.split('.').enumerate() {
        if segment.is_empty() {
            return Err(empty());
        }
        let allow_dash = dash_in_first && index == 0;
        if let Some(character) = segment
            .chars()
            .find(|&c| !(c.is_alphanumeric() || c == '_' || (allow_dash && c == '-')))
        {
            return Err(SyntaxError::InvalidCharacter {
                input: input.to_string(),
                character,
            });
        }
    }
    Ok(())
}

fn validate_distribution(input: &str, name: &str) -> Result<(), SyntaxError> {
    if name.is_empty() {
        return Err(SyntaxError::EmptySegment {
            input: input.to_string(),
            segment: name.to_string(),
        });
    }
    if let Some(character) = name
        .chars()
        .find(|&c| !(c.is_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(SyntaxError::InvalidCharacter {
            input: input.to_string(),
            character,
        });
    }
    Ok(())
}
