//! Install requirements: a PEP 508 requirement plus installer options.
//!
//! Accepted forms:
//! - `name`, `name>=1.0,<2`, `name (>=1.0)`
//! - `name[extra1,extra2]>=1.0`
//! - `name @ https://host/name-1.0.tar.gz`, `name @ git+https://host/repo`
//! - any of the above followed by `; <marker>`
//! - a leading `-e` / `--editable` and trailing `--hash=alg:hex` options

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use tarn_util::errors::TarnError;

use crate::hashes::Hashes;
use crate::link::Link;
use crate::marker::{MarkerEnvironment, MarkerTree};
use crate::name::{ExtraName, PackageName};
use crate::specifier::VersionSpecifiers;

/// A requirement as handed to the resolver.
/// Equality ignores how the name was spelled.
#[derive(Debug, Clone, Eq)]
pub struct InstallRequirement {
    pub name: PackageName,
    /// The name as written, when parsed from text. Used for display only.
    pub written_name: Option<String>,
    pub extras: BTreeSet<ExtraName>,
    pub specifier: VersionSpecifiers,
    pub link: Option<Link>,
    pub marker: Option<MarkerTree>,
    /// Digests from `--hash` options.
    pub hash_options: Hashes,
    pub editable: bool,
    /// Named directly by the user rather than pulled in as a dependency.
    pub user_supplied: bool,
    /// Came from a constraints file: limits versions without requesting install.
    pub constraint: bool,
}

impl InstallRequirement {
    pub fn new(name: PackageName) -> Self {
        Self {
            name,
            written_name: None,
            extras: BTreeSet::new(),
            specifier: VersionSpecifiers::empty(),
            link: None,
            marker: None,
            hash_options: Hashes::empty(),
            editable: false,
            user_supplied: false,
            constraint: false,
        }
    }

    /// Parse a requirement line.
    pub fn parse(input: &str) -> Result<Self, TarnError> {
        let err = |message: &str| TarnError::Requirement {
            input: input.trim().to_string(),
            message: message.to_string(),
        };

        let mut text = input.trim();
        let mut editable = false;
        for prefix in ["-e ", "--editable ", "--editable="] {
            if let Some(rest) = text.strip_prefix(prefix) {
                editable = true;
                text = rest.trim_start();
                break;
            }
        }

        let (text, options) = split_options(text);
        let hash_options = parse_options(options).map_err(|m| err(&m))?;
        let (body, marker_text) = split_marker(text);

        let body = body.trim();
        let name_len = body
            .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .unwrap_or(body.len());
        if name_len == 0 {
            return Err(err("expected a package name"));
        }
        let written_name = &body[..name_len];
        let name = PackageName::new(written_name).map_err(|_| err("invalid package name"))?;
        let mut rest = body[name_len..].trim_start();

        let mut extras = BTreeSet::new();
        if let Some(after) = rest.strip_prefix('[') {
            let (inner, tail) = after.split_once(']').ok_or_else(|| err("unclosed `[`"))?;
            for extra in inner.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                extras.insert(ExtraName::new(extra).map_err(|_| err("invalid extra name"))?);
            }
            rest = tail.trim_start();
        }

        let (specifier, link) = if let Some(url) = rest.strip_prefix('@') {
            let url = url.trim();
            if url.is_empty() {
                return Err(err("expected a URL after `@`"));
            }
            (VersionSpecifiers::empty(), Some(Link::parse(url)?))
        } else {
            let spec_text = rest
                .strip_prefix('(')
                .and_then(|s| s.strip_suffix(')'))
                .unwrap_or(rest);
            (spec_text.parse::<VersionSpecifiers>()?, None)
        };

        let marker = marker_text
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(MarkerTree::from_str)
            .transpose()?;

        if editable && link.is_none() {
            return Err(err("editable requirements need a URL or path (`name @ path`)"));
        }

        Ok(Self {
            name,
            written_name: Some(written_name.to_string()),
            extras,
            specifier,
            link,
            marker,
            hash_options,
            editable,
            user_supplied: false,
            constraint: false,
        })
    }

    /// A requirement on exactly `link`, keeping the identity and flags of
    /// `template`.
    pub fn from_link(link: Link, template: &InstallRequirement) -> Self {
        Self {
            specifier: VersionSpecifiers::empty(),
            link: Some(link),
            ..template.clone()
        }
    }

    pub fn with_user_supplied(mut self, user_supplied: bool) -> Self {
        self.user_supplied = user_supplied;
        self
    }

    pub fn as_constraint(mut self) -> Self {
        self.constraint = true;
        self
    }

    pub fn is_direct(&self) -> bool {
        self.link.is_some()
    }

    /// Allowed digests. The link's own fragment digest counts only when
    /// `trust_internet` is set, since it came from wherever the link did.
    pub fn hashes(&self, trust_internet: bool) -> Hashes {
        let mut hashes = self.hash_options.clone();
        if trust_internet {
            if let Some((algorithm, digest)) = self.link.as_ref().and_then(Link::hash) {
                hashes.insert(algorithm, digest);
            }
        }
        hashes
    }

    /// Whether the marker holds in `env`. With extras, holding for any one
    /// of them is enough.
    pub fn match_markers(&self, env: &MarkerEnvironment, extras: &[ExtraName]) -> bool {
        let Some(marker) = &self.marker else {
            return true;
        };
        if extras.is_empty() {
            return marker.evaluate(env, &[]);
        }
        extras
            .iter()
            .any(|extra| marker.evaluate(env, std::slice::from_ref(extra)))
    }
}

/// Split trailing `--option` tokens off a requirement line.
fn split_options(text: &str) -> (&str, &str) {
    let bytes = text.as_bytes();
    for i in 1..bytes.len() {
        if bytes[i - 1].is_ascii_whitespace() && text[i..].starts_with("--") {
            return (text[..i].trim_end(), &text[i..]);
        }
    }
    (text, "")
}

fn parse_options(options: &str) -> Result<Hashes, String> {
    let mut hashes = Hashes::empty();
    let mut tokens = options.split_whitespace();
    while let Some(token) = tokens.next() {
        let value = if let Some(v) = token.strip_prefix("--hash=") {
            v
        } else if token == "--hash" {
            tokens.next().ok_or("`--hash` needs a value")?
        } else {
            return Err(format!("unsupported option `{token}`"));
        };
        let parsed = Hashes::parse_option(value).map_err(|e| e.to_string())?;
        hashes.extend(&parsed);
    }
    Ok(hashes)
}

/// Split `body ; marker`. In URL form the `;` must follow whitespace, since
/// URLs may contain semicolons.
fn split_marker(text: &str) -> (&str, Option<&str>) {
    let url_form = text.contains('@');
    for (i, c) in text.char_indices() {
        if c == ';' && (!url_form || text[..i].ends_with(char::is_whitespace)) {
            return (&text[..i], Some(&text[i + 1..]));
        }
    }
    (text, None)
}

impl FromStr for InstallRequirement {
    type Err = TarnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for InstallRequirement {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.extras == other.extras
            && self.specifier == other.specifier
            && self.link == other.link
            && self.marker == other.marker
            && self.hash_options == other.hash_options
            && self.editable == other.editable
            && self.user_supplied == other.user_supplied
            && self.constraint == other.constraint
    }
}

impl fmt::Display for InstallRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.written_name {
            Some(written) => f.write_str(written)?,
            None => write!(f, "{}", self.name)?,
        }
        if !self.extras.is_empty() {
            let extras: Vec<&str> = self.extras.iter().map(ExtraName::as_str).collect();
            write!(f, "[{}]", extras.join(","))?;
        }
        match &self.link {
            Some(link) => {
                write!(f, " @ {link}")?;
                if let Some(marker) = &self.marker {
                    write!(f, " ; {marker}")?;
                }
            }
            None => {
                write!(f, "{}", self.specifier)?;
                if let Some(marker) = &self.marker {
                    write!(f, "; {marker}")?;
                }
            }
        }
        Ok(())
    }
}
