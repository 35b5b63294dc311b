//! Package metadata as read from a built artifact or an installed package.

use std::collections::BTreeSet;

use tarn_util::errors::TarnError;
use tracing::warn;

use crate::marker::MarkerEnvironment;
use crate::name::{ExtraName, PackageName};
use crate::requirement::InstallRequirement;
use crate::specifier::VersionSpecifiers;
use crate::version::Version;

/// Core metadata fields the resolver needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub name: PackageName,
    pub version: Version,
    /// `Requires-Dist` entries, kept raw until they are read.
    pub requires_dist: Vec<String>,
    pub requires_python: Option<VersionSpecifiers>,
    pub provides_extras: BTreeSet<ExtraName>,
}

impl PackageMetadata {
    pub fn new(name: PackageName, version: Version) -> Self {
        Self {
            name,
            version,
            requires_dist: Vec::new(),
            requires_python: None,
            provides_extras: BTreeSet::new(),
        }
    }

    /// Dependencies that apply when `extras` are requested in `env`.
    ///
    /// An entry that fails to parse yields `None` instead of aborting the
    /// whole list; entries whose marker is false are skipped.
    pub fn iter_dependencies<'a>(
        &'a self,
        extras: &'a [ExtraName],
        env: &'a MarkerEnvironment,
    ) -> impl Iterator<Item = Option<InstallRequirement>> + 'a {
        self.requires_dist
            .iter()
            .filter_map(move |raw| self.dependency(raw, extras, env))
    }

    /// One `Requires-Dist` entry: `None` when its marker is false,
    /// `Some(None)` when it does not parse.
    pub fn dependency(
        &self,
        raw: &str,
        extras: &[ExtraName],
        env: &MarkerEnvironment,
    ) -> Option<Option<InstallRequirement>> {
        match InstallRequirement::parse(raw) {
            Ok(req) => req.match_markers(env, extras).then_some(Some(req)),
            Err(e) => {
                warn!(
                    "{} {} has an invalid requirement `{raw}`: {e}",
                    self.name, self.version
                );
                Some(None)
            }
        }
    }

    /// Every `Requires-Dist` entry, failing on the first malformed one.
    pub fn requirements(&self) -> Result<Vec<InstallRequirement>, TarnError> {
        self.requires_dist
            .iter()
            .map(|raw| {
                InstallRequirement::parse(raw).map_err(|e| TarnError::Metadata {
                    package: format!("{} {}", self.name, self.version),
                    message: e.to_string(),
                })
            })
            .collect()
    }

    /// Whether the package declares support for `python`.
    pub fn supports_python(&self, python: &Version) -> bool {
        self.requires_python
            .as_ref()
            .map_or(true, |spec| spec.contains(python, Some(true)))
    }
}
