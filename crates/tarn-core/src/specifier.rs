//! Version specifiers (`>=1.0,<2`, `~=1.4.2`, `==1.*`, `===foo`).

use std::fmt;
use std::ops::BitAnd;
use std::str::FromStr;

use tarn_util::errors::TarnError;

use crate::version::{StandardVersion, Version};

/// Comparison operator of a single specifier clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Compatible,
    Arbitrary,
}

impl Operator {
    /// Longest operators first so `===` is not read as `==`.
    const TOKENS: [(&'static str, Operator); 8] = [
        ("===", Operator::Arbitrary),
        ("~=", Operator::Compatible),
        ("==", Operator::Equal),
        ("!=", Operator::NotEqual),
        ("<=", Operator::LessThanEqual),
        (">=", Operator::GreaterThanEqual),
        ("<", Operator::LessThan),
        (">", Operator::GreaterThan),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::LessThanEqual => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanEqual => ">=",
            Operator::Compatible => "~=",
            Operator::Arbitrary => "===",
        }
    }

    /// Split a leading operator off `input`.
    pub fn split_prefix(input: &str) -> Option<(Operator, &str)> {
        Self::TOKENS
            .iter()
            .find_map(|(tok, op)| input.strip_prefix(tok).map(|rest| (*op, rest)))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One clause such as `>=1.0` or `==2.*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionSpecifier {
    operator: Operator,
    version: Version,
    wildcard: bool,
    /// The version text as written; only `===` compares against it.
    raw: String,
}

impl VersionSpecifier {
    /// Build a clause from an operator and a version string.
    pub fn new(operator: Operator, version: &str) -> Result<Self, TarnError> {
        let text = version.trim();
        let invalid = |message: &str| TarnError::Specifier {
            input: format!("{operator}{text}"),
            message: message.to_string(),
        };
        if text.is_empty() {
            return Err(invalid("missing version"));
        }
        if operator == Operator::Arbitrary {
            return Ok(Self {
                operator,
                version: Version::parse(text),
                wildcard: false,
                raw: text.to_string(),
            });
        }

        let (version_text, wildcard) = match text.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (text, false),
        };
        if wildcard && !matches!(operator, Operator::Equal | Operator::NotEqual) {
            return Err(invalid("wildcards are only allowed with == and !="));
        }
        let parsed = StandardVersion::parse(version_text)
            .ok_or_else(|| invalid("not a valid PEP 440 version"))?;
        if wildcard && parsed.has_local() {
            return Err(invalid("wildcards cannot be combined with a local version"));
        }
        if parsed.has_local() && !matches!(operator, Operator::Equal | Operator::NotEqual) {
            return Err(invalid("local versions are only allowed with == and !="));
        }
        if operator == Operator::Compatible && parsed.release.len() < 2 {
            return Err(invalid("~= needs at least two release segments"));
        }

        Ok(Self {
            operator,
            version: Version::Standard(parsed),
            wildcard,
            raw: version_text.to_string(),
        })
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Whether the clause itself names a pre-release, which opts the
    /// requirement into pre-releases.
    pub fn allows_prereleases(&self) -> bool {
        matches!(
            self.operator,
            Operator::Equal
                | Operator::GreaterThanEqual
                | Operator::LessThanEqual
                | Operator::Compatible
                | Operator::Arbitrary
        ) && self.version.is_prerelease()
    }

    /// Membership test with the pre-release gate applied.
    pub fn contains(&self, version: &Version, prereleases: Option<bool>) -> bool {
        let allow = prereleases.unwrap_or_else(|| self.allows_prereleases());
        if version.is_prerelease() && !allow {
            return false;
        }
        self.matches(version)
    }

    /// Membership test without the pre-release gate.
    pub fn matches(&self, candidate: &Version) -> bool {
        if self.operator == Operator::Arbitrary {
            return candidate.to_string().eq_ignore_ascii_case(&self.raw);
        }
        let (Version::Standard(cand), Version::Standard(spec)) = (candidate, &self.version) else {
            // Legacy versions only ever satisfy `===`.
            return self.operator == Operator::NotEqual;
        };
        match self.operator {
            Operator::Equal if self.wildcard => prefix_match(cand, spec),
            Operator::NotEqual if self.wildcard => !prefix_match(cand, spec),
            Operator::Equal => equal(cand, spec),
            Operator::NotEqual => !equal(cand, spec),
            Operator::LessThanEqual => cand.without_local() <= *spec,
            Operator::GreaterThanEqual => cand.without_local() >= *spec,
            Operator::LessThan => less_than(cand, spec),
            Operator::GreaterThan => greater_than(cand, spec),
            Operator::Compatible => {
                let mut prefix = spec.base_version();
                prefix.release.pop();
                cand.without_local() >= *spec && prefix_match(cand, &prefix)
            }
            Operator::Arbitrary => false,
        }
    }
}

fn equal(cand: &StandardVersion, spec: &StandardVersion) -> bool {
    if spec.has_local() {
        cand == spec
    } else {
        cand.without_local() == *spec
    }
}

fn prefix_match(cand: &StandardVersion, prefix: &StandardVersion) -> bool {
    cand.epoch == prefix.epoch
        && prefix
            .release
            .iter()
            .enumerate()
            .all(|(i, n)| cand.release.get(i).copied().unwrap_or(0) == *n)
}

fn less_than(cand: &StandardVersion, spec: &StandardVersion) -> bool {
    if cand >= spec {
        return false;
    }
    // `<2.0` must not admit `2.0a1`.
    !(!spec.is_prerelease() && cand.is_prerelease() && cand.base_version() == spec.base_version())
}

fn greater_than(cand: &StandardVersion, spec: &StandardVersion) -> bool {
    if cand <= spec {
        return false;
    }
    let same_base = cand.base_version() == spec.base_version();
    // `>1.7` must admit neither `1.7.post1` nor `1.7+local`.
    if !spec.is_postrelease() && cand.is_postrelease() && same_base {
        return false;
    }
    !(cand.has_local() && same_base)
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::Arbitrary => write!(f, "==={}", self.raw),
            op if self.wildcard => write!(f, "{op}{}.*", self.version),
            op => write!(f, "{op}{}", self.version),
        }
    }
}

impl FromStr for VersionSpecifier {
    type Err = TarnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (operator, rest) = Operator::split_prefix(s).ok_or_else(|| TarnError::Specifier {
            input: s.to_string(),
            message: "expected an operator such as >=, ==, ~=".to_string(),
        })?;
        Self::new(operator, rest)
    }
}

/// A conjunction of specifier clauses. Empty matches every final release.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VersionSpecifiers(Vec<VersionSpecifier>);

impl VersionSpecifiers {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VersionSpecifier> {
        self.0.iter()
    }

    pub fn allows_prereleases(&self) -> bool {
        self.0.iter().any(VersionSpecifier::allows_prereleases)
    }

    /// `true` when a clause pins one exact version (`===`, or `==` without a
    /// wildcard).
    pub fn is_pinned(&self) -> bool {
        self.0.iter().any(|s| match s.operator {
            Operator::Arbitrary => true,
            Operator::Equal => !s.wildcard,
            _ => false,
        })
    }

    /// Membership test.
    ///
    /// `prereleases = None` admits pre-releases only if some clause names
    /// one; `Some(true)` always admits them, `Some(false)` never does.
    pub fn contains(&self, version: &Version, prereleases: Option<bool>) -> bool {
        let allow = prereleases.unwrap_or_else(|| self.allows_prereleases());
        if version.is_prerelease() && !allow {
            return false;
        }
        self.0.iter().all(|s| s.matches(version))
    }

    /// Keep the items whose version matches, in their original order.
    ///
    /// When pre-releases are not explicitly requested, pre-releases are only
    /// returned if nothing else matches.
    pub fn filter<T, F>(&self, items: impl IntoIterator<Item = T>, version_of: F, prereleases: Option<bool>) -> Vec<T>
    where
        F: Fn(&T) -> &Version,
    {
        let allow = prereleases.unwrap_or_else(|| self.allows_prereleases());
        let mut finals = Vec::new();
        let mut pres = Vec::new();
        for item in items {
            let version = version_of(&item);
            if !self.0.iter().all(|s| s.matches(version)) {
                continue;
            }
            if version.is_prerelease() && !allow {
                pres.push(item);
            } else {
                finals.push(item);
            }
        }
        if finals.is_empty() && prereleases.is_none() {
            return pres;
        }
        finals
    }

    /// Both sets of clauses must hold.
    pub fn intersection(&self, other: &VersionSpecifiers) -> VersionSpecifiers {
        let mut clauses = self.0.clone();
        for clause in &other.0 {
            if !clauses.contains(clause) {
                clauses.push(clause.clone());
            }
        }
        VersionSpecifiers(clauses)
    }
}

impl BitAnd<&VersionSpecifiers> for &VersionSpecifiers {
    type Output = VersionSpecifiers;

    fn bitand(self, rhs: &VersionSpecifiers) -> VersionSpecifiers {
        self.intersection(rhs)
    }
}

impl FromIterator<VersionSpecifier> for VersionSpecifiers {
    fn from_iter<I: IntoIterator<Item = VersionSpecifier>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for VersionSpecifiers {
    type Err = TarnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(VersionSpecifier::from_str)
            .collect()
    }
}

impl fmt::Display for VersionSpecifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(","))
    }
}
