//! Version and version constraint handling

use crate::{PackageError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Re-export pep440_rs types used by the wrappers
pub use pep440_rs::{
    Operator, Version as Pep440Version, VersionSpecifiers as Pep440Specifiers,
};

/// Wrapper around pep440_rs::Version that keeps the registry's spelling,
/// since release keys and cache directories use the text as published
#[derive(Debug, Clone)]
pub struct Version {
    inner: Pep440Version,
    raw: String,
}

impl Version {
    /// Parse a version string
    pub fn parse(s: &str) -> Result<Self> {
        let raw = s.trim();
        Pep440Version::from_str(raw)
            .map(|inner| Version {
                inner,
                raw: raw.to_string(),
            })
            .map_err(|_e| PackageError::InvalidVersion {
                version: s.to_string(),
            })
    }

    /// The text this version was parsed from
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn pep440(&self) -> &Pep440Version {
        &self.inner
    }

    /// Release segments (`[1, 2, 3]` for `1.2.3rc1`)
    pub fn release(&self) -> &[u64] {
        self.inner.release()
    }

    /// Check if this is a pre-release or development release
    pub fn is_prerelease(&self) -> bool {
        self.inner.any_prerelease()
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl Serialize for Version {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Version::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Wrapper around pep440_rs::VersionSpecifiers; `None` matches any version
#[derive(Debug, Clone)]
pub struct VersionConstraint {
    specifiers: Option<Pep440Specifiers>,
    raw: String,
}

impl VersionConstraint {
    /// Parse `1.2.3`, `==1.2.*`, `>=1.0,<2`, `~=1.4`; `""`, `*` and `latest` match anything
    pub fn parse(s: &str) -> Result<Self> {
        let raw = s.trim();
        if matches!(raw, "" | "*" | "latest") {
            return Ok(Self::any());
        }

        // A bare version is an exact pin
        let text = if raw.starts_with(|c: char| c.is_ascii_digit()) {
            format!("=={}", raw)
        } else {
            raw.to_string()
        };
        let specifiers =
            Pep440Specifiers::from_str(&text).map_err(|e| PackageError::InvalidConstraint {
                constraint: raw.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            specifiers: Some(specifiers),
            raw: raw.to_string(),
        })
    }

    /// Create a constraint that matches any version
    pub fn any() -> Self {
        Self {
            specifiers: None,
            raw: String::new(),
        }
    }

    pub fn is_any(&self) -> bool {
        self.specifiers.is_none()
    }

    /// The pinned version when this is a single `==` or `===` specifier
    pub fn exact(&self) -> Option<&Pep440Version> {
        match self.specifiers.as_deref() {
            Some([specifier])
                if matches!(specifier.operator(), Operator::Equal | Operator::ExactEqual) =>
            {
                Some(specifier.version())
            }
            _ => None,
        }
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.specifiers
            .as_ref()
            .map_or(true, |specifiers| specifiers.contains(&version.inner))
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.raw.is_empty() {
            write!(f, "*")
        } else {
            write!(f, "{}", self.raw)
        }
    }
}

/// Highest matching stable version, or the highest matching prerelease
/// when nothing stable matches
pub fn select_best<'a>(candidates: &'a [Version], constraint: &VersionConstraint) -> Option<&'a Version> {
    let matching: Vec<&Version> = candidates.iter().filter(|v| constraint.matches(v)).collect();
    matching
        .iter()
        .filter(|v| !v.is_prerelease())
        .max()
        .or_else(|| matching.iter().max())
        .copied()
}
