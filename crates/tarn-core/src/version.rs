//! Version parsing and ordering.
//!
//! Versions follow PEP 440 ordering:
//! - An optional epoch (`1!`) dominates everything else
//! - Release segments compare numerically, trailing zeros are insignificant
//! - `dev`-only releases < pre-releases (`a` < `b` < `rc`) < final < `post`
//! - A local label (`+ubuntu.1`) sorts after the same public version
//!
//! Strings that are not valid PEP 440 become [`LegacyVersion`]s. They sort
//! before every standard version and compare segment by segment.

use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A package version: either PEP 440 compliant or a legacy string.
///
/// The derived order relies on variant order: every legacy version sorts
/// before every standard one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Version {
    Legacy(LegacyVersion),
    Standard(StandardVersion),
}

impl Version {
    pub fn parse(version: &str) -> Self {
        match StandardVersion::parse(version) {
            Some(v) => Version::Standard(v),
            None => Version::Legacy(LegacyVersion::parse(version)),
        }
    }

    /// `true` for `a`/`b`/`rc` and `dev` releases.
    pub fn is_prerelease(&self) -> bool {
        match self {
            Version::Standard(v) => v.is_prerelease(),
            Version::Legacy(_) => false,
        }
    }

    pub fn is_postrelease(&self) -> bool {
        match self {
            Version::Standard(v) => v.post.is_some(),
            Version::Legacy(_) => false,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Version::Legacy(_))
    }

    pub fn as_standard(&self) -> Option<&StandardVersion> {
        match self {
            Version::Standard(v) => Some(v),
            Version::Legacy(_) => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Standard(v) => v.fmt(f),
            Version::Legacy(v) => v.fmt(f),
        }
    }
}

impl FromStr for Version {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Version::parse(s))
    }
}

/// Pre-release phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PreKind {
    Alpha,
    Beta,
    Rc,
}

impl PreKind {
    fn as_str(self) -> &'static str {
        match self {
            PreKind::Alpha => "a",
            PreKind::Beta => "b",
            PreKind::Rc => "rc",
        }
    }
}

/// One dot-separated piece of a local version label. Numbers sort after
/// text, which is what the variant order encodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LocalSegment {
    Text(String),
    Number(u64),
}

impl fmt::Display for LocalSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalSegment::Text(s) => f.write_str(s),
            LocalSegment::Number(n) => write!(f, "{n}"),
        }
    }
}

/// A PEP 440 version.
#[derive(Debug, Clone)]
pub struct StandardVersion {
    pub epoch: u64,
    pub release: Vec<u64>,
    pub pre: Option<(PreKind, u64)>,
    pub post: Option<u64>,
    pub dev: Option<u64>,
    /// Empty when there is no local label.
    pub local: Vec<LocalSegment>,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    DevOnly,
    Pre(PreKind, u64),
    Final,
}

impl StandardVersion {
    /// Parse a PEP 440 version, accepting the usual alternate spellings
    /// (`alpha`, `-1` for post releases, a leading `v`, and so on).
    pub fn parse(input: &str) -> Option<Self> {
        let lower = input.trim().to_ascii_lowercase();
        let text = lower.strip_prefix('v').unwrap_or(&lower);
        let mut cur = Cursor::new(text);

        let mut epoch = 0;
        let start = cur.pos;
        if let Some(n) = cur.number() {
            if cur.eat(b'!') {
                epoch = n;
            } else {
                cur.pos = start;
            }
        }

        let mut release = vec![cur.number()?];
        loop {
            let save = cur.pos;
            if cur.eat(b'.') {
                if let Some(n) = cur.number() {
                    release.push(n);
                    continue;
                }
            }
            cur.pos = save;
            break;
        }

        let pre = cur.tagged(&[
            ("preview", PreKind::Rc),
            ("alpha", PreKind::Alpha),
            ("beta", PreKind::Beta),
            ("pre", PreKind::Rc),
            ("rc", PreKind::Rc),
            ("a", PreKind::Alpha),
            ("b", PreKind::Beta),
            ("c", PreKind::Rc),
        ]);

        let post = cur
            .implicit_post()
            .or_else(|| cur.tagged(&[("post", ()), ("rev", ()), ("r", ())]).map(|(_, n)| n));

        let dev = cur.tagged(&[("dev", ())]).map(|(_, n)| n);

        let mut local = Vec::new();
        if cur.eat(b'+') {
            loop {
                let piece = cur.alphanumeric()?;
                local.push(match piece.parse::<u64>() {
                    Ok(n) => LocalSegment::Number(n),
                    Err(_) => LocalSegment::Text(piece.to_string()),
                });
                if !cur.separator() {
                    break;
                }
            }
        }

        if !cur.at_end() {
            return None;
        }

        Some(Self {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    pub fn is_postrelease(&self) -> bool {
        self.post.is_some()
    }

    pub fn has_local(&self) -> bool {
        !self.local.is_empty()
    }

    /// Epoch and release only.
    pub fn base_version(&self) -> StandardVersion {
        StandardVersion {
            epoch: self.epoch,
            release: self.release.clone(),
            pre: None,
            post: None,
            dev: None,
            local: Vec::new(),
        }
    }

    /// The public part of the version (local label dropped).
    pub fn without_local(&self) -> StandardVersion {
        StandardVersion {
            local: Vec::new(),
            ..self.clone()
        }
    }

    fn pre_key(&self) -> PreKey {
        match self.pre {
            Some((kind, n)) => PreKey::Pre(kind, n),
            None if self.post.is_none() && self.dev.is_some() => PreKey::DevOnly,
            None => PreKey::Final,
        }
    }

    fn dev_key(&self) -> (bool, u64) {
        (self.dev.is_none(), self.dev.unwrap_or(0))
    }

    fn trimmed_release(&self) -> &[u64] {
        let end = self
            .release
            .iter()
            .rposition(|&n| n != 0)
            .map_or(0, |i| i + 1);
        &self.release[..end]
    }
}

impl PartialEq for StandardVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for StandardVersion {}

impl Hash for StandardVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch.hash(state);
        self.trimmed_release().hash(state);
        self.pre.hash(state);
        self.post.hash(state);
        self.dev.hash(state);
        self.local.hash(state);
    }
}

impl Ord for StandardVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_release(&self.release, &other.release))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl PartialOrd for StandardVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for StandardVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(u64::to_string).collect();
        f.write_str(&release.join("."))?;
        if let Some((kind, n)) = self.pre {
            write!(f, "{}{n}", kind.as_str())?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{n}")?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{n}")?;
        }
        if !self.local.is_empty() {
            let local: Vec<String> = self.local.iter().map(ToString::to_string).collect();
            write!(f, "+{}", local.join("."))?;
        }
        Ok(())
    }
}

/// Compare release tuples, padding the shorter one with zeros.
pub(crate) fn compare_release(a: &[u64], b: &[u64]) -> Ordering {
    let max_len = a.len().max(b.len());
    for i in 0..max_len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    Ordering::Equal
}

struct Cursor<'a> {
    s: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            s: s.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos == self.s.len()
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.s.get(self.pos) == Some(&b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn separator(&mut self) -> bool {
        self.eat(b'.') || self.eat(b'-') || self.eat(b'_')
    }

    fn number(&mut self) -> Option<u64> {
        let start = self.pos;
        while self.s.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        let digits = std::str::from_utf8(&self.s[start..self.pos]).ok()?;
        match digits.parse() {
            Ok(n) => Some(n),
            Err(_) => {
                self.pos = start;
                None
            }
        }
    }

    fn alphanumeric(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while self.s.get(self.pos).is_some_and(u8::is_ascii_alphanumeric) {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        std::str::from_utf8(&self.s[start..self.pos]).ok()
    }

    fn keyword(&mut self, word: &str) -> bool {
        if self.s[self.pos..].starts_with(word.as_bytes()) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    /// `[sep] keyword [sep] [number]`, where a missing number means 0.
    fn tagged<T: Copy>(&mut self, words: &[(&str, T)]) -> Option<(T, u64)> {
        let start = self.pos;
        self.separator();
        let Some(tag) = words.iter().find_map(|(w, t)| self.keyword(w).then_some(*t)) else {
            self.pos = start;
            return None;
        };
        let before_number = self.pos;
        self.separator();
        let n = match self.number() {
            Some(n) => n,
            None => {
                self.pos = before_number;
                0
            }
        };
        Some((tag, n))
    }

    /// The `1.0-1` spelling of `1.0.post1`.
    fn implicit_post(&mut self) -> Option<u64> {
        let start = self.pos;
        if self.eat(b'-') {
            if let Some(n) = self.number() {
                return Some(n);
            }
        }
        self.pos = start;
        None
    }
}

/// A version string that is not PEP 440 compliant.
#[derive(Debug, Clone)]
pub struct LegacyVersion {
    original: String,
    segments: Vec<LegacySegment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LegacySegment {
    Numeric(u64),
    Text(String),
}

impl LegacyVersion {
    pub fn parse(version: &str) -> Self {
        Self {
            original: version.trim().to_string(),
            segments: parse_segments(version.trim()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    fn trimmed_segments(&self) -> &[LegacySegment] {
        let end = self
            .segments
            .iter()
            .rposition(|s| *s != LegacySegment::Numeric(0))
            .map_or(0, |i| i + 1);
        &self.segments[..end]
    }
}

impl fmt::Display for LegacyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl PartialEq for LegacyVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LegacyVersion {}

impl Hash for LegacyVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.trimmed_segments().hash(state);
    }
}

impl Ord for LegacyVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.segments.len().max(other.segments.len());
        for i in 0..max_len {
            let ord = compare_segments(self.segments.get(i), other.segments.get(i));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for LegacyVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_segments(a: Option<&LegacySegment>, b: Option<&LegacySegment>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(s), None) => compare_segment_to_empty(s),
        (None, Some(s)) => compare_segment_to_empty(s).reverse(),
        (Some(a), Some(b)) => compare_two_segments(a, b),
    }
}

fn compare_segment_to_empty(seg: &LegacySegment) -> Ordering {
    match seg {
        LegacySegment::Numeric(0) => Ordering::Equal,
        LegacySegment::Numeric(_) => Ordering::Greater,
        LegacySegment::Text(_) => Ordering::Less,
    }
}

fn compare_two_segments(a: &LegacySegment, b: &LegacySegment) -> Ordering {
    match (a, b) {
        (LegacySegment::Numeric(a), LegacySegment::Numeric(b)) => a.cmp(b),
        (LegacySegment::Numeric(_), LegacySegment::Text(_)) => Ordering::Greater,
        (LegacySegment::Text(_), LegacySegment::Numeric(_)) => Ordering::Less,
        (LegacySegment::Text(a), LegacySegment::Text(b)) => a.cmp(b),
    }
}

fn parse_segments(version: &str) -> Vec<LegacySegment> {
    let mut segments = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, segments: &mut Vec<LegacySegment>| {
        if current.is_empty() {
            return;
        }
        segments.push(match current.parse::<u64>() {
            Ok(n) => LegacySegment::Numeric(n),
            Err(_) => LegacySegment::Text(current.to_lowercase()),
        });
        current.clear();
    };

    for ch in version.chars() {
        if !ch.is_ascii_alphanumeric() {
            flush(&mut current, &mut segments);
            continue;
        }
        let switches_kind = current
            .chars()
            .last()
            .is_some_and(|last| last.is_ascii_digit() != ch.is_ascii_digit());
        if switches_kind {
            flush(&mut current, &mut segments);
        }
        current.push(ch);
    }
    flush(&mut current, &mut segments);

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s)
    }

    #[test]
    fn basic_ordering() {
        assert!(v("1.0") < v("2.0"));
        assert!(v("1.0.0") < v("1.0.1"));
        assert!(v("1.0.1") < v("1.1.0"));
        assert!(v("1.9") < v("1.10"));
    }

    #[test]
    fn pep440_ordering_chain() {
        let chain = [
            "1.0.dev456",
            "1.0a1",
            "1.0a2.dev456",
            "1.0a12.dev456",
            "1.0a12",
            "1.0b1.dev456",
            "1.0b2",
            "1.0b2.post345.dev456",
            "1.0b2.post345",
            "1.0rc1.dev456",
            "1.0rc1",
            "1.0",
            "1.0+abc.5",
            "1.0+abc.7",
            "1.0+5",
            "1.0.post456.dev34",
            "1.0.post456",
            "1.1.dev1",
        ];
        for pair in chain.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn epoch_dominates() {
        assert!(v("1!0.1") > v("2.0"));
    }

    #[test]
    fn trailing_zeros_equal() {
        assert_eq!(v("1.0"), v("1.0.0"));
        let mut set = std::collections::HashSet::new();
        set.insert(v("1.0"));
        assert!(set.contains(&v("1.0.0")));
    }

    #[test]
    fn normalized_display() {
        assert_eq!(v("1.0-alpha1").to_string(), "1.0a1");
        assert_eq!(v("1.0RC2").to_string(), "1.0rc2");
        assert_eq!(v("v1.0").to_string(), "1.0");
        assert_eq!(v("1.0-1").to_string(), "1.0.post1");
        assert_eq!(v("1.0.post").to_string(), "1.0.post0");
        assert_eq!(v("1.0-dev2").to_string(), "1.0.dev2");
        assert_eq!(v("1!2.0+Local_7").to_string(), "1!2.0+local.7");
    }

    #[test]
    fn prerelease_flags() {
        assert!(v("1.0a1").is_prerelease());
        assert!(v("1.0.dev0").is_prerelease());
        assert!(!v("1.0").is_prerelease());
        assert!(!v("1.0.post1").is_prerelease());
        assert!(v("1.0.post1").is_postrelease());
    }

    #[test]
    fn legacy_versions_sort_first() {
        let legacy = v("french toast");
        assert!(legacy.is_legacy());
        assert!(legacy < v("0.0.1.dev0"));
        assert_eq!(legacy.to_string(), "french toast");
        assert!(v("2004d") < v("2013b"));
    }

    #[test]
    fn legacy_equality_is_case_insensitive() {
        assert_eq!(v("1.0-FOO"), v("1.0-foo"));
        assert!(!v("1.0-FOO").is_prerelease());
    }

    #[test]
    fn base_and_public_parts() {
        let Version::Standard(sv) = v("1!2.3rc1.post2+abc") else {
            panic!("expected a standard version");
        };
        assert_eq!(sv.base_version().to_string(), "1!2.3");
        assert_eq!(sv.without_local().to_string(), "1!2.3rc1.post2");
    }
}
