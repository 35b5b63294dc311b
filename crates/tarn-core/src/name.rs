//! Normalized package and extra names.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use tarn_util::errors::TarnError;

/// A canonical package name: lower case, with runs of `-`, `_` and `.`
/// collapsed to a single `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageName(String);

impl PackageName {
    /// Validate and canonicalize a distribution name.
    pub fn new(name: &str) -> Result<Self, TarnError> {
        let name = name.trim();
        if !is_valid_name(name) {
            return Err(TarnError::Requirement {
                input: name.to_string(),
                message: "package names must start and end with a letter or digit".to_string(),
            });
        }
        Ok(Self(canonicalize(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PackageName {
    type Err = TarnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A canonical extra name, normalized the same way as [`PackageName`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtraName(String);

impl ExtraName {
    pub fn new(name: &str) -> Result<Self, TarnError> {
        let name = name.trim();
        if !is_valid_name(name) {
            return Err(TarnError::Requirement {
                input: name.to_string(),
                message: "invalid extra name".to_string(),
            });
        }
        Ok(Self(canonicalize(name)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExtraName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ExtraName {
    type Err = TarnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Format a resolver identifier: `name`, or `name[a,b]` when extras are
/// requested. Extras come out sorted because the set is ordered.
pub fn format_name(name: &PackageName, extras: &BTreeSet<ExtraName>) -> String {
    if extras.is_empty() {
        return name.to_string();
    }
    let extras: Vec<&str> = extras.iter().map(ExtraName::as_str).collect();
    format!("{name}[{}]", extras.join(","))
}

/// Split an identifier produced by [`format_name`] back into its bare name
/// and extras. Returns `None` for strings that are not identifiers.
pub fn parse_identifier(identifier: &str) -> Option<(PackageName, BTreeSet<ExtraName>)> {
    match identifier.split_once('[') {
        None => PackageName::new(identifier).ok().map(|n| (n, BTreeSet::new())),
        Some((name, rest)) => {
            let inner = rest.strip_suffix(']')?;
            let name = PackageName::new(name).ok()?;
            let extras = inner
                .split(',')
                .filter(|e| !e.trim().is_empty())
                .map(ExtraName::new)
                .collect::<Result<BTreeSet<_>, _>>()
                .ok()?;
            Some((name, extras))
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

fn canonicalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for ch in name.chars() {
        if matches!(ch, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
            }
            in_separator = true;
        } else {
            out.push(ch.to_ascii_lowercase());
            in_separator = false;
        }
    }
    out
}
