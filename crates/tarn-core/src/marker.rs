//! Environment markers (`python_version >= "3.8" and sys_platform == "linux"`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tarn_util::errors::TarnError;

use crate::name::ExtraName;
use crate::specifier::{Operator, VersionSpecifier};
use crate::version::Version;

/// The target environment markers are evaluated against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MarkerEnvironment {
    #[serde(default = "default_python_version")]
    pub python_version: String,
    #[serde(default = "default_python_full_version")]
    pub python_full_version: String,
    #[serde(default = "default_implementation_name")]
    pub implementation_name: String,
    #[serde(default = "default_python_full_version")]
    pub implementation_version: String,
    #[serde(default = "default_os_name")]
    pub os_name: String,
    #[serde(default = "default_sys_platform")]
    pub sys_platform: String,
    #[serde(default = "default_platform_system")]
    pub platform_system: String,
    #[serde(default = "default_platform_machine")]
    pub platform_machine: String,
    #[serde(default)]
    pub platform_release: String,
    #[serde(default)]
    pub platform_version: String,
    #[serde(default = "default_platform_python_implementation")]
    pub platform_python_implementation: String,
}

impl Default for MarkerEnvironment {
    fn default() -> Self {
        Self {
            python_version: default_python_version(),
            python_full_version: default_python_full_version(),
            implementation_name: default_implementation_name(),
            implementation_version: default_python_full_version(),
            os_name: default_os_name(),
            sys_platform: default_sys_platform(),
            platform_system: default_platform_system(),
            platform_machine: default_platform_machine(),
            platform_release: String::new(),
            platform_version: String::new(),
            platform_python_implementation: default_platform_python_implementation(),
        }
    }
}

fn default_python_version() -> String {
    "3.12".to_string()
}

fn default_python_full_version() -> String {
    "3.12.0".to_string()
}

fn default_implementation_name() -> String {
    "cpython".to_string()
}

fn default_os_name() -> String {
    "posix".to_string()
}

fn default_sys_platform() -> String {
    "linux".to_string()
}

fn default_platform_system() -> String {
    "Linux".to_string()
}

fn default_platform_machine() -> String {
    "x86_64".to_string()
}

fn default_platform_python_implementation() -> String {
    "CPython".to_string()
}

impl MarkerEnvironment {
    /// The interpreter version used for `Requires-Python` checks.
    pub fn python_full_version(&self) -> Version {
        Version::parse(&self.python_full_version)
    }

    fn get(&self, variable: MarkerVariable) -> &str {
        match variable {
            MarkerVariable::PythonVersion => &self.python_version,
            MarkerVariable::PythonFullVersion => &self.python_full_version,
            MarkerVariable::ImplementationName => &self.implementation_name,
            MarkerVariable::ImplementationVersion => &self.implementation_version,
            MarkerVariable::OsName => &self.os_name,
            MarkerVariable::SysPlatform => &self.sys_platform,
            MarkerVariable::PlatformSystem => &self.platform_system,
            MarkerVariable::PlatformMachine => &self.platform_machine,
            MarkerVariable::PlatformRelease => &self.platform_release,
            MarkerVariable::PlatformVersion => &self.platform_version,
            MarkerVariable::PlatformPythonImplementation => &self.platform_python_implementation,
            MarkerVariable::Extra => "",
        }
    }
}

/// A variable that may appear in a marker expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerVariable {
    PythonVersion,
    PythonFullVersion,
    ImplementationName,
    ImplementationVersion,
    OsName,
    SysPlatform,
    PlatformSystem,
    PlatformMachine,
    PlatformRelease,
    PlatformVersion,
    PlatformPythonImplementation,
    Extra,
}

impl MarkerVariable {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "python_version" => Self::PythonVersion,
            "python_full_version" => Self::PythonFullVersion,
            "implementation_name" => Self::ImplementationName,
            "implementation_version" => Self::ImplementationVersion,
            "os_name" | "os.name" => Self::OsName,
            "sys_platform" | "sys.platform" => Self::SysPlatform,
            "platform_system" => Self::PlatformSystem,
            "platform_machine" | "platform.machine" => Self::PlatformMachine,
            "platform_release" => Self::PlatformRelease,
            "platform_version" | "platform.version" => Self::PlatformVersion,
            "platform_python_implementation"
            | "platform.python_implementation"
            | "python_implementation" => Self::PlatformPythonImplementation,
            "extra" => Self::Extra,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::PythonVersion => "python_version",
            Self::PythonFullVersion => "python_full_version",
            Self::ImplementationName => "implementation_name",
            Self::ImplementationVersion => "implementation_version",
            Self::OsName => "os_name",
            Self::SysPlatform => "sys_platform",
            Self::PlatformSystem => "platform_system",
            Self::PlatformMachine => "platform_machine",
            Self::PlatformRelease => "platform_release",
            Self::PlatformVersion => "platform_version",
            Self::PlatformPythonImplementation => "platform_python_implementation",
            Self::Extra => "extra",
        }
    }

    fn is_version(self) -> bool {
        matches!(
            self,
            Self::PythonVersion | Self::PythonFullVersion | Self::ImplementationVersion
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkerValue {
    Variable(MarkerVariable),
    Literal(String),
}

impl fmt::Display for MarkerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerValue::Variable(v) => f.write_str(v.as_str()),
            MarkerValue::Literal(s) if s.contains('"') => write!(f, "'{s}'"),
            MarkerValue::Literal(s) => write!(f, "\"{s}\""),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerOperator {
    Compare(Operator),
    In,
    NotIn,
}

impl fmt::Display for MarkerOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerOperator::Compare(op) => op.fmt(f),
            MarkerOperator::In => f.write_str("in"),
            MarkerOperator::NotIn => f.write_str("not in"),
        }
    }
}

/// A parsed marker expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkerTree {
    Expression {
        lhs: MarkerValue,
        op: MarkerOperator,
        rhs: MarkerValue,
    },
    And(Vec<MarkerTree>),
    Or(Vec<MarkerTree>),
}

impl MarkerTree {
    /// Evaluate against `env`. `extra == "x"` holds iff `x` is in `extras`.
    pub fn evaluate(&self, env: &MarkerEnvironment, extras: &[ExtraName]) -> bool {
        match self {
            MarkerTree::And(items) => items.iter().all(|m| m.evaluate(env, extras)),
            MarkerTree::Or(items) => items.iter().any(|m| m.evaluate(env, extras)),
            MarkerTree::Expression { lhs, op, rhs } => evaluate_expression(lhs, *op, rhs, env, extras),
        }
    }

    /// Whether the expression refers to `extra` anywhere.
    pub fn mentions_extra(&self) -> bool {
        match self {
            MarkerTree::And(items) | MarkerTree::Or(items) => items.iter().any(MarkerTree::mentions_extra),
            MarkerTree::Expression { lhs, rhs, .. } => [lhs, rhs]
                .iter()
                .any(|v| **v == MarkerValue::Variable(MarkerVariable::Extra)),
        }
    }
}

fn evaluate_expression(
    lhs: &MarkerValue,
    op: MarkerOperator,
    rhs: &MarkerValue,
    env: &MarkerEnvironment,
    extras: &[ExtraName],
) -> bool {
    let extra = MarkerValue::Variable(MarkerVariable::Extra);
    if *lhs == extra || *rhs == extra {
        let other = if *lhs == extra { rhs } else { lhs };
        let MarkerValue::Literal(wanted) = other else {
            return false;
        };
        let Ok(wanted) = ExtraName::new(wanted) else {
            return false;
        };
        let present = extras.contains(&wanted);
        return match op {
            MarkerOperator::Compare(Operator::Equal) => present,
            MarkerOperator::Compare(Operator::NotEqual) => !present,
            _ => false,
        };
    }

    let resolve = |value: &MarkerValue| -> String {
        match value {
            MarkerValue::Variable(v) => env.get(*v).to_string(),
            MarkerValue::Literal(s) => s.clone(),
        }
    };
    let left = resolve(lhs);
    let right = resolve(rhs);

    match op {
        MarkerOperator::In => right.contains(&left),
        MarkerOperator::NotIn => !right.contains(&left),
        MarkerOperator::Compare(op) => {
            let versioned = [lhs, rhs]
                .iter()
                .any(|v| matches!(v, MarkerValue::Variable(var) if var.is_version()));
            if versioned {
                if let Ok(spec) = VersionSpecifier::new(op, &right) {
                    return spec.contains(&Version::parse(&left), Some(true));
                }
            }
            match op {
                Operator::Equal | Operator::Arbitrary => left == right,
                Operator::NotEqual => left != right,
                Operator::LessThan => left < right,
                Operator::LessThanEqual => left <= right,
                Operator::GreaterThan => left > right,
                Operator::GreaterThanEqual => left >= right,
                Operator::Compatible => false,
            }
        }
    }
}

impl fmt::Display for MarkerTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerTree::Expression { lhs, op, rhs } => write!(f, "{lhs} {op} {rhs}"),
            MarkerTree::And(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|m| match m {
                        MarkerTree::Or(_) => format!("({m})"),
                        _ => m.to_string(),
                    })
                    .collect();
                f.write_str(&parts.join(" and "))
            }
            MarkerTree::Or(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                f.write_str(&parts.join(" or "))
            }
        }
    }
}

impl FromStr for MarkerTree {
    type Err = TarnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = tokenize(s)?;
        let mut parser = Parser {
            input: s,
            tokens,
            pos: 0,
        };
        let tree = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(tree)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Str(String),
    Word(String),
    Op(Operator),
}

fn tokenize(input: &str) -> Result<Vec<Token>, TarnError> {
    let err = |message: &str| TarnError::Marker {
        input: input.to_string(),
        message: message.to_string(),
    };
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(i, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '"' | '\'' => {
                chars.next();
                let rest = &input[i + 1..];
                let end = rest.find(ch).ok_or_else(|| err("unterminated string"))?;
                tokens.push(Token::Str(rest[..end].to_string()));
                for _ in 0..rest[..end].chars().count() + 1 {
                    chars.next();
                }
            }
            '=' | '!' | '<' | '>' | '~' => {
                let (op, rest) =
                    Operator::split_prefix(&input[i..]).ok_or_else(|| err("unknown operator"))?;
                let len = input.len() - i - rest.len();
                tokens.push(Token::Op(op));
                for _ in 0..len {
                    chars.next();
                }
            }
            c if c.is_ascii_alphanumeric() || c == '_' || c == '.' => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }
            _ => return Err(err("unexpected character")),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> TarnError {
        TarnError::Marker {
            input: self.input.to_string(),
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn peek_word(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w == word)
    }

    fn parse_or(&mut self) -> Result<MarkerTree, TarnError> {
        let mut items = vec![self.parse_and()?];
        while self.peek_word("or") {
            self.pos += 1;
            items.push(self.parse_and()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            MarkerTree::Or(items)
        })
    }

    fn parse_and(&mut self) -> Result<MarkerTree, TarnError> {
        let mut items = vec![self.parse_atom()?];
        while self.peek_word("and") {
            self.pos += 1;
            items.push(self.parse_atom()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            MarkerTree::And(items)
        })
    }

    fn parse_atom(&mut self) -> Result<MarkerTree, TarnError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_or()?;
            if self.next() != Some(Token::RParen) {
                return Err(self.error("expected `)`"));
            }
            return Ok(inner);
        }
        let lhs = self.parse_value()?;
        let op = self.parse_operator()?;
        let rhs = self.parse_value()?;
        if matches!(lhs, MarkerValue::Literal(_)) && matches!(rhs, MarkerValue::Literal(_)) {
            return Err(self.error("comparing two literals"));
        }
        Ok(MarkerTree::Expression { lhs, op, rhs })
    }

    fn parse_value(&mut self) -> Result<MarkerValue, TarnError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(MarkerValue::Literal(s)),
            Some(Token::Word(w)) => MarkerVariable::from_name(&w)
                .map(MarkerValue::Variable)
                .ok_or_else(|| self.error(&format!("unknown marker variable `{w}`"))),
            _ => Err(self.error("expected a marker variable or a quoted string")),
        }
    }

    fn parse_operator(&mut self) -> Result<MarkerOperator, TarnError> {
        match self.next() {
            Some(Token::Op(op)) => Ok(MarkerOperator::Compare(op)),
            Some(Token::Word(w)) if w == "in" => Ok(MarkerOperator::In),
            Some(Token::Word(w)) if w == "not" => {
                if self.next() == Some(Token::Word("in".to_string())) {
                    Ok(MarkerOperator::NotIn)
                } else {
                    Err(self.error("expected `in` after `not`"))
                }
            }
            _ => Err(self.error("expected a comparison operator")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(s: &str) -> MarkerTree {
        s.parse().unwrap()
    }

    #[test]
    fn version_comparison() {
        let env = MarkerEnvironment::default();
        assert!(marker("python_version >= \"3.8\"").evaluate(&env, &[]));
        assert!(!marker("python_version < '3.8'").evaluate(&env, &[]));
        assert!(marker("python_full_version == '3.12.*'").evaluate(&env, &[]));
    }

    #[test]
    fn string_comparison_and_boolean_ops() {
        let env = MarkerEnvironment::default();
        assert!(marker("sys_platform == 'linux' and os_name == 'posix'").evaluate(&env, &[]));
        assert!(marker("sys_platform == 'win32' or platform_machine == 'x86_64'").evaluate(&env, &[]));
        assert!(!marker("sys_platform == 'win32' and (os_name == 'posix' or os_name == 'nt')")
            .evaluate(&env, &[]));
        assert!(marker("'linux' in sys_platform").evaluate(&env, &[]));
        assert!(marker("sys_platform not in 'win32 cygwin'").evaluate(&env, &[]));
    }

    #[test]
    fn extras_are_matched_by_normalized_name() {
        let env = MarkerEnvironment::default();
        let m = marker("extra == 'Socks_Proxy'");
        assert!(!m.evaluate(&env, &[]));
        assert!(m.evaluate(&env, &[ExtraName::new("socks-proxy").unwrap()]));
        assert!(m.mentions_extra());
        assert!(!marker("os_name == 'posix'").mentions_extra());
    }

    #[test]
    fn display_round_trips() {
        let m = marker("python_version < \"3.8\" and (sys_platform == \"win32\" or os_name == \"nt\")");
        assert_eq!(
            m.to_string(),
            "python_version < \"3.8\" and (sys_platform == \"win32\" or os_name == \"nt\")"
        );
        assert_eq!(marker(&m.to_string()), m);
    }

    #[test]
    fn invalid_markers() {
        assert!("python_version >".parse::<MarkerTree>().is_err());
        assert!("'a' == 'b'".parse::<MarkerTree>().is_err());
        assert!("bogus == '1'".parse::<MarkerTree>().is_err());
        assert!("(os_name == 'nt'".parse::<MarkerTree>().is_err());
    }
}
