//! Version selection against an index.

use tracing::{debug, trace};

use crate::constraint::{parse_version, Constraint};
use crate::entry::IndexFile;
use crate::error::IndexError;

/// Pick the highest version satisfying the constraint.
///
/// Versions that do not parse are ignored. The returned slice is the
/// original text of the winning version, not its normalized form.
pub fn select_highest<'a, I>(versions: I, constraint: &Constraint) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions
        .into_iter()
        .filter_map(|raw| parse_version(raw).ok().map(|version| (version, raw)))
        .filter(|(version, _)| constraint.matches(version))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, raw)| raw)
}

impl IndexFile {
    /// Find the highest selectable version of `name` satisfying `constraint`.
    ///
    /// # Errors
    ///
    /// * `ChartNotFound` if the index has no entries for `name`
    /// * `InvalidConstraint` if `constraint` does not parse
    /// * `ConstraintUnsatisfied` if no selectable entry satisfies it
    pub fn find_version(&self, name: &str, constraint: &str) -> Result<String, IndexError> {
        if !self.has(name) {
            return Err(IndexError::ChartNotFound {
                name: name.to_string(),
            });
        }
        let constraint = Constraint::parse(constraint)?;
        self.find_matching(name, &constraint)
    }

    /// Same as `find_version` with an already parsed constraint.
    pub fn find_matching(&self, name: &str, constraint: &Constraint) -> Result<String, IndexError> {
        let versions = self.get(name).ok_or_else(|| IndexError::ChartNotFound {
            name: name.to_string(),
        })?;

        trace!(
            "selecting {} from {} indexed versions with {:?}",
            name,
            versions.len(),
            constraint.as_str()
        );

        let selectable = versions
            .iter()
            .filter(|v| v.is_selectable())
            .map(|v| v.version.as_str());

        match select_highest(selectable, constraint) {
            Some(version) => Ok(version.to_string()),
            None => {
                debug!("no version of {} satisfies {:?}", name, constraint.as_str());
                Err(IndexError::ConstraintUnsatisfied {
                    name: name.to_string(),
                    constraint: constraint.as_str().to_string(),
                })
            }
        }
    }
}
