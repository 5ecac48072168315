//! Versions, version specifiers, and requirements.
//!
//! A specifier is a comma-separated list of `<op><version>` clauses that must
//! all hold. Supported operators are `==`, `!=`, `>=`, `<=`, `>`, `<` and the
//! compatible-release operator `~=`. An empty specifier matches every version.
//!
//! ```
//! use o3de_manifest::version::{Requirement, Version};
//!
//! let req: Requirement = "o3de>=1.0, <2.0".parse().unwrap();
//! assert_eq!(req.name, "o3de");
//! assert!(req.specifier.matches(&Version::parse("1.5.2").unwrap()));
//! assert!(!req.specifier.matches(&Version::parse("2.0.0").unwrap()));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::ManifestError;

/// A semantic version. Missing minor/patch components default to zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(semver::Version);

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    /// Parse `1`, `1.2`, `1.2.3`, `1.2.3-pre+build`, tolerating a leading `v`.
    ///
    /// # Errors
    /// Returns `ManifestError::InvalidVersion` if the text is not a version.
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let (version, _) = parse_with_len(text)?;
        Ok(version)
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    pub fn as_semver(&self) -> &semver::Version {
        &self.0
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Version {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse a version and report how many release components were written.
fn parse_with_len(text: &str) -> Result<(Version, usize), ManifestError> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let invalid = |message: String| ManifestError::InvalidVersion {
        input: text.to_owned(),
        message,
    };

    let core_end = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(core_end);
    let release_len = core.split('.').count();
    if core.is_empty() || release_len > 3 {
        return Err(invalid("expected MAJOR[.MINOR[.PATCH]]".to_owned()));
    }

    let mut padded = core.to_owned();
    for _ in release_len..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);

    semver::Version::parse(&padded)
        .map(|v| (Version(v), release_len))
        .map_err(|e| invalid(e.to_string()))
}

/// Comparison operator of a specifier clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Ge,
    Le,
    Gt,
    Lt,
    Compatible,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Compatible => "~=",
        }
    }
}

/// One `<op><version>` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub op: Op,
    pub version: Version,
    /// Number of release components written (`~=1.2` has 2).
    release_len: usize,
}

impl Clause {
    /// Whether `candidate` satisfies this clause.
    pub fn matches(&self, candidate: &Version) -> bool {
        match self.op {
            Op::Eq => candidate == &self.version,
            Op::Ne => candidate != &self.version,
            Op::Ge => candidate >= &self.version,
            Op::Le => candidate <= &self.version,
            Op::Gt => candidate > &self.version,
            Op::Lt => candidate < &self.version,
            Op::Compatible => candidate >= &self.version && candidate < &self.compatible_ceiling(),
        }
    }

    /// Exclusive upper bound of `~=X.Y[.Z]`: drop the last written component
    /// and bump the one before it.
    fn compatible_ceiling(&self) -> Version {
        let v = &self.version;
        match self.release_len {
            0..=2 => Version::new(v.major().saturating_add(1), 0, 0),
            _ => Version::new(v.major(), v.minor().saturating_add(1), 0),
        }
    }
}

/// Prints only the release components that were written, so `~=1.2` keeps
/// its `<2.0.0` ceiling when reparsed.
impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.version.as_semver();
        f.write_str(self.op.as_str())?;
        match self.release_len {
            0 | 1 => write!(f, "{}", v.major)?,
            2 => write!(f, "{}.{}", v.major, v.minor)?,
            _ => write!(f, "{}.{}.{}", v.major, v.minor, v.patch)?,
        }
        if !v.pre.is_empty() {
            write!(f, "-{}", v.pre)?;
        }
        if !v.build.is_empty() {
            write!(f, "+{}", v.build)?;
        }
        Ok(())
    }
}

impl FromStr for Clause {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (op, rest) = [
            ("==", Op::Eq),
            ("!=", Op::Ne),
            (">=", Op::Ge),
            ("<=", Op::Le),
            ("~=", Op::Compatible),
            (">", Op::Gt),
            ("<", Op::Lt),
        ]
        .iter()
        .find_map(|(prefix, op)| s.strip_prefix(prefix).map(|rest| (*op, rest)))
        .ok_or_else(|| ManifestError::InvalidSpecifier {
            input: s.to_owned(),
            message: "expected one of ==, !=, >=, <=, >, <, ~= before the version".to_owned(),
        })?;

        let (version, release_len) = parse_with_len(rest)?;
        if op == Op::Compatible && release_len < 2 {
            return Err(ManifestError::InvalidSpecifier {
                input: s.to_owned(),
                message: "~= requires at least MAJOR.MINOR".to_owned(),
            });
        }
        Ok(Self {
            op,
            version,
            release_len,
        })
    }
}

/// A conjunction of clauses. Empty means "any version".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Specifier {
    pub clauses: Vec<Clause>,
}

impl Specifier {
    /// The specifier that matches everything.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_any(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether `candidate` satisfies every clause.
    pub fn matches(&self, candidate: &Version) -> bool {
        self.clauses.iter().all(|c| c.matches(candidate))
    }

    /// Combine two specifiers into one that requires both.
    pub fn intersect(&self, other: &Specifier) -> Specifier {
        let mut clauses = self.clauses.clone();
        for clause in &other.clauses {
            if !clauses.contains(clause) {
                clauses.push(clause.clone());
            }
        }
        Specifier { clauses }
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.clauses.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(", "))
    }
}

impl FromStr for Specifier {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clauses = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Clause>, _>>()?;
        Ok(Self { clauses })
    }
}

/// A named object together with the versions it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub specifier: Specifier,
}

impl Requirement {
    /// A requirement on `name` with no version restriction.
    pub fn any(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            specifier: Specifier::any(),
        }
    }

    /// Whether `name`/`version` satisfies this requirement.
    pub fn matches(&self, name: &str, version: &Version) -> bool {
        self.name == name && self.specifier.matches(version)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.specifier.is_any() {
            f.write_str(&self.name)
        } else {
            let clauses: Vec<String> = self.specifier.clauses.iter().map(ToString::to_string).collect();
            write!(f, "{}{}", self.name, clauses.join(","))
        }
    }
}

impl FromStr for Requirement {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find(['=', '!', '<', '>', '~']).unwrap_or(s.len());
        let (name, spec) = s.split_at(split);
        let name = name.trim();
        if name.is_empty() {
            return Err(ManifestError::InvalidSpecifier {
                input: s.to_owned(),
                message: "requirement has no name".to_owned(),
            });
        }
        if name.chars().any(char::is_whitespace) {
            return Err(ManifestError::InvalidSpecifier {
                input: s.to_owned(),
                message: format!("`{name}` is not a valid name"),
            });
        }
        Ok(Self {
            name: name.to_owned(),
            specifier: spec.parse()?,
        })
    }
}
