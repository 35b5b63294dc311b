//! Requirements and constraints files (`-r requirements.txt`, `-c constraints.txt`).

use std::path::{Path, PathBuf};

use tarn_util::errors::TarnError;
use tracing::warn;

use crate::requirement::InstallRequirement;

/// Nested `-r`/`-c` includes deeper than this are assumed to be a cycle.
const MAX_INCLUDE_DEPTH: usize = 16;

/// Everything read from a requirements file and the files it includes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementsFile {
    pub requirements: Vec<InstallRequirement>,
    pub constraints: Vec<InstallRequirement>,
}

impl RequirementsFile {
    /// Parse a requirements file. Its entries are user-supplied.
    pub fn parse(path: &Path) -> Result<Self, TarnError> {
        let mut file = Self::default();
        file.read_into(path, false, 0)?;
        Ok(file)
    }

    /// Parse a constraints file. Includes inside it are constraints too.
    pub fn parse_constraints(path: &Path) -> Result<Self, TarnError> {
        let mut file = Self::default();
        file.read_into(path, true, 0)?;
        Ok(file)
    }

    /// Parse file content, resolving includes relative to `base_dir`.
    pub fn parse_str(content: &str, base_dir: &Path) -> Result<Self, TarnError> {
        let mut file = Self::default();
        file.parse_into(content, base_dir, false, 0)?;
        Ok(file)
    }

    pub fn extend(&mut self, other: RequirementsFile) {
        self.requirements.extend(other.requirements);
        self.constraints.extend(other.constraints);
    }

    fn read_into(&mut self, path: &Path, constraint: bool, depth: usize) -> Result<(), TarnError> {
        if depth > MAX_INCLUDE_DEPTH {
            return Err(TarnError::Generic {
                message: format!("Requirements files nested too deeply at {}", path.display()),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| TarnError::Generic {
            message: format!("Failed to read requirements file {}: {e}", path.display()),
        })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.parse_into(&content, &base_dir, constraint, depth)
    }

    fn parse_into(
        &mut self,
        content: &str,
        base_dir: &Path,
        constraint: bool,
        depth: usize,
    ) -> Result<(), TarnError> {
        for line in logical_lines(content) {
            if let Some(target) = include_target(&line, &["-r", "--requirement"]) {
                self.read_into(&resolve(base_dir, target), constraint, depth + 1)?;
            } else if let Some(target) = include_target(&line, &["-c", "--constraint"]) {
                self.read_into(&resolve(base_dir, target), true, depth + 1)?;
            } else if line.starts_with('-') && !is_editable(&line) {
                warn!("ignoring unsupported option line `{line}`");
            } else {
                let req = InstallRequirement::parse(&line)?;
                if constraint {
                    self.constraints.push(req.as_constraint());
                } else {
                    self.requirements.push(req.with_user_supplied(true));
                }
            }
        }
        Ok(())
    }
}

fn is_editable(line: &str) -> bool {
    line.starts_with("-e ") || line.starts_with("--editable")
}

/// Join `\` continuations and drop comments and blank lines.
fn logical_lines(content: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for raw in content.lines() {
        let raw = strip_comment(raw);
        if let Some(head) = raw.strip_suffix('\\') {
            current.push_str(head);
            current.push(' ');
            continue;
        }
        current.push_str(raw);
        let line = current.trim().to_string();
        if !line.is_empty() {
            lines.push(line);
        }
        current.clear();
    }
    let tail = current.trim();
    if !tail.is_empty() {
        lines.push(tail.to_string());
    }
    lines
}

/// A `#` starts a comment at the beginning of a line or after whitespace.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'#' && (i == 0 || bytes[i - 1].is_ascii_whitespace()) {
            return line[..i].trim_end();
        }
    }
    line.trim_end()
}

fn include_target<'a>(line: &'a str, flags: &[&str]) -> Option<&'a str> {
    flags.iter().find_map(|flag| {
        let rest = line.strip_prefix(flag)?;
        let rest = rest.strip_prefix('=').unwrap_or(rest);
        if rest.is_empty() || !(rest.starts_with(char::is_whitespace) || line[flag.len()..].starts_with('=')) {
            return None;
        }
        Some(rest.trim())
    })
}

fn resolve(base_dir: &Path, target: &str) -> PathBuf {
    let path = Path::new(target);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
