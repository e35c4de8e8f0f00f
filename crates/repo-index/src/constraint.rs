//! Version constraints as written in chart dependency declarations.
//!
//! A constraint is one or more `||`-separated alternatives. Each alternative
//! is either a hyphen range (`1.2 - 1.4.5`) or a list of comparators separated
//! by commas or whitespace. Unlike cargo requirements, a bare version means
//! exactly that version rather than a caret range.

use std::fmt;
use std::str::FromStr;

use semver::{Version, VersionReq};

use crate::error::IndexError;

/// Parse a version leniently: a leading `v` is accepted and missing minor or
/// patch components are filled with zero (`v1.2` -> `1.2.0`).
pub fn parse_version(text: &str) -> Result<Version, semver::Error> {
    let text = text.trim();
    let text = text.strip_prefix(|c: char| c == 'v' || c == 'V').unwrap_or(text);

    match Version::parse(text) {
        Ok(version) => Ok(version),
        Err(err) => {
            let split = text.find(|c: char| c == '-' || c == '+').unwrap_or(text.len());
            let (core, rest) = text.split_at(split);
            let parts = core.split('.').count();
            let numeric = core
                .split('.')
                .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
            if parts < 3 && numeric {
                Version::parse(&format!("{core}{}{rest}", ".0".repeat(3 - parts)))
            } else {
                Err(err)
            }
        }
    }
}

/// A parsed version constraint.
#[derive(Debug, Clone)]
pub struct Constraint {
    raw: String,
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone)]
struct Alternative {
    req: VersionReq,
    excluded: Vec<Version>,
}

impl Alternative {
    fn matches(&self, version: &Version) -> bool {
        self.req.matches(version) && !self.excluded.contains(version)
    }
}

impl Constraint {
    /// Parse an exact version or a range expression.
    pub fn parse(raw: &str) -> Result<Self, IndexError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IndexError::invalid_constraint(raw, "empty constraint"));
        }

        let alternatives = trimmed
            .split("||")
            .map(|alt| parse_alternative(raw, alt))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            alternatives,
        })
    }

    /// The constraint exactly as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns true if any alternative accepts the version.
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|alt| alt.matches(version))
    }

    /// Like `matches`, for an unparsed version. Unparseable versions never match.
    pub fn matches_str(&self, version: &str) -> bool {
        parse_version(version).is_ok_and(|v| self.matches(&v))
    }

    /// The version, if the constraint is a plain version literal.
    pub fn exact_version(&self) -> Option<Version> {
        let trimmed = self.raw.trim();
        if trimmed.starts_with(is_operator_char) || trimmed.contains(char::is_whitespace) {
            return None;
        }
        if is_wildcard(trimmed) {
            return None;
        }
        parse_version(trimmed).ok()
    }
}

impl FromStr for Constraint {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Constraint::parse(s)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_alternative(raw: &str, text: &str) -> Result<Alternative, IndexError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(IndexError::invalid_constraint(raw, "empty alternative"));
    }

    if let Some((low, high)) = text.split_once(" - ") {
        let range = format!(
            ">={}, <={}",
            strip_v(low.trim()),
            strip_v(high.trim())
        );
        let req = VersionReq::parse(&range).map_err(|e| IndexError::invalid_constraint(raw, e))?;
        return Ok(Alternative {
            req,
            excluded: Vec::new(),
        });
    }

    let mut comparators = Vec::new();
    let mut excluded = Vec::new();
    let mut pending_op: Option<&str> = None;

    for token in text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        // ">= 1.2" splits into an operator token followed by its version
        if token.chars().all(is_operator_char) {
            if pending_op.is_some() {
                return Err(IndexError::invalid_constraint(raw, "repeated operator"));
            }
            pending_op = Some(token);
            continue;
        }

        let token = match pending_op.take() {
            Some(op) => format!("{op}{token}"),
            None => token.to_string(),
        };

        if let Some(version) = token.strip_prefix("!=") {
            let version =
                parse_version(version).map_err(|e| IndexError::invalid_constraint(raw, e))?;
            excluded.push(version);
            continue;
        }

        comparators.push(normalize_comparator(raw, &token)?);
    }

    if pending_op.is_some() {
        return Err(IndexError::invalid_constraint(
            raw,
            "operator without a version",
        ));
    }

    let req = if comparators.is_empty() {
        VersionReq::STAR
    } else {
        VersionReq::parse(&comparators.join(", "))
            .map_err(|e| IndexError::invalid_constraint(raw, e))?
    };

    Ok(Alternative { req, excluded })
}

fn normalize_comparator(raw: &str, token: &str) -> Result<String, IndexError> {
    let op_len = token
        .find(|c: char| !is_operator_char(c))
        .unwrap_or(token.len());
    let (op, version) = token.split_at(op_len);
    if version.is_empty() {
        return Err(IndexError::invalid_constraint(
            raw,
            "operator without a version",
        ));
    }

    let version = strip_v(version);
    if op.is_empty() && !is_wildcard(version) {
        Ok(format!("={version}"))
    } else {
        Ok(format!("{op}{version}"))
    }
}

fn strip_v(text: &str) -> &str {
    text.strip_prefix(|c: char| c == 'v' || c == 'V').unwrap_or(text)
}

fn is_operator_char(c: char) -> bool {
    matches!(c, '<' | '>' | '=' | '~' | '^' | '!')
}

fn is_wildcard(version: &str) -> bool {
    version
        .split('.')
        .any(|part| matches!(part, "*" | "x" | "X"))
}
