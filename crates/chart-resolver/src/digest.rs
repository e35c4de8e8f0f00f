//! Lock digest: binds declared requirements to their resolution.
//!
//! The hashed material is the compact JSON array
//! `[[requirements...],[resolved...]]` where every entry is
//! `{"name":..,"version":..,"repository":..}` (`version` omitted when empty).
//! The declared constraint is part of it, so editing a constraint makes the
//! lock stale even when it would resolve to the same version.
//!
//! `<`, `>` and `&` are written as `\u003c`, `\u003e` and `\u0026`, which
//! keeps digests identical to the ones already recorded in `Chart.lock` files.

use std::borrow::Cow;
use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;
use sha2::{Digest, Sha256};

use crate::dependency::{Dependency, ResolvedDependency};
use crate::error::ResolveError;

/// Algorithm prefix of every lock digest.
pub const DIGEST_PREFIX: &str = "sha256:";

#[derive(Serialize)]
struct DigestEntry<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "is_empty")]
    version: &'a str,
    repository: Cow<'a, str>,
}

impl<'a> DigestEntry<'a> {
    fn new(name: &'a str, version: &'a str, repository: &'a str) -> Self {
        Self {
            name: name.trim(),
            version: version.trim(),
            repository: normalize_repository(repository),
        }
    }
}

fn is_empty(s: &&str) -> bool {
    s.is_empty()
}

/// Compute the digest of `requirements` resolved as `resolved`.
///
/// Entries correspond by position, so the digest is order sensitive.
pub fn lock_digest(
    requirements: &[Dependency],
    resolved: &[ResolvedDependency],
) -> Result<String, ResolveError> {
    if requirements.len() != resolved.len() {
        return Err(ResolveError::DigestInputMismatch {
            requirements: requirements.len(),
            resolved: resolved.len(),
        });
    }

    let declared: Vec<DigestEntry> = requirements
        .iter()
        .map(|d| DigestEntry::new(&d.name, &d.version, &d.repository))
        .collect();
    let locked: Vec<DigestEntry> = resolved
        .iter()
        .map(|d| DigestEntry::new(&d.name, &d.version, &d.repository))
        .collect();

    let mut buf = Vec::with_capacity(128 * (requirements.len() + 1));
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, HtmlSafeFormatter);
    (&declared, &locked).serialize(&mut serializer)?;

    Ok(format!("{DIGEST_PREFIX}{}", hex::encode(Sha256::digest(&buf))))
}

/// Lower-case the scheme and host of a `scheme://host/...` repository.
///
/// Paths keep their case, and `file://` locators are left alone entirely.
fn normalize_repository(repository: &str) -> Cow<'_, str> {
    let repository = repository.trim();
    let Some(scheme_end) = repository.find("://") else {
        return Cow::Borrowed(repository);
    };

    let scheme = &repository[..scheme_end];
    if scheme.eq_ignore_ascii_case("file") {
        return Cow::Borrowed(repository);
    }

    let authority_start = scheme_end + 3;
    let authority_end = repository[authority_start..]
        .find('/')
        .map_or(repository.len(), |i| authority_start + i);
    // userinfo keeps its case
    let host_start = repository[authority_start..authority_end]
        .rfind('@')
        .map_or(authority_start, |i| authority_start + i + 1);

    let host = &repository[host_start..authority_end];
    if !scheme.bytes().any(|b| b.is_ascii_uppercase()) && !host.bytes().any(|b| b.is_ascii_uppercase()) {
        return Cow::Borrowed(repository);
    }

    Cow::Owned(format!(
        "{}://{}{}{}",
        scheme.to_ascii_lowercase(),
        &repository[authority_start..host_start],
        host.to_ascii_lowercase(),
        &repository[authority_end..]
    ))
}

/// Compact JSON with HTML-sensitive characters escaped.
struct HtmlSafeFormatter;

impl Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (i, c) in fragment.char_indices() {
            let escaped = match c {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(fragment[start..i].as_bytes())?;
            writer.write_all(escaped.as_bytes())?;
            start = i + c.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED: &str =
        "sha256:fb239e836325c5fa14b29d1540a13b7d3ba13151b67fe719f820e0ef6d66aaaf";

    fn digest_for(chart_version: &str, lock_version: &str) -> String {
        let req = [Dependency::new(
            "alpine",
            "http://localhost:8879/charts",
            chart_version,
        )];
        let lock = [ResolvedDependency::new(
            "alpine",
            "http://localhost:8879/charts",
            lock_version,
        )];
        lock_digest(&req, &lock).unwrap()
    }

    #[test]
    fn test_expected_digest() {
        assert_eq!(digest_for("0.1.0", "0.1.0"), EXPECTED);
    }

    #[test]
    fn test_declared_constraint_is_hashed() {
        // ranged version but same resolved lock version
        assert_ne!(digest_for("^0.1.0", "0.1.0"), EXPECTED);
        // ranged version resolved as higher version
        assert_ne!(digest_for("^0.1.0", "0.1.2"), EXPECTED);
        // different version
        assert_ne!(digest_for("0.1.2", "0.1.2"), EXPECTED);
        // different version with a range
        assert_ne!(digest_for("^0.1.2", "0.1.2"), EXPECTED);

        assert_ne!(digest_for("^0.1.0", "0.1.0"), digest_for("~0.1.0", "0.1.0"));
    }

    #[test]
    fn test_range_operators_are_escaped() {
        let req = [Dependency::new("alpine", "http://example.com", ">=0.1.0")];
        let lock = [ResolvedDependency::new("alpine", "http://example.com", "0.2.0")];
        assert_eq!(
            lock_digest(&req, &lock).unwrap(),
            "sha256:75d33f8c63c908df517366d25fb1b8ea917e92e0f6fda3757e6f3f27e265e943"
        );
    }

    #[test]
    fn test_whitespace_and_host_case_ignored() {
        let req = [Dependency::new(
            " alpine ",
            "HTTP://LocalHost:8879/charts ",
            " 0.1.0",
        )];
        let lock = [ResolvedDependency::new(
            "alpine",
            "http://localhost:8879/charts",
            "0.1.0 ",
        )];
        assert_eq!(lock_digest(&req, &lock).unwrap(), EXPECTED);
    }

    #[test]
    fn test_path_case_is_significant() {
        let req = [Dependency::new("alpine", "http://localhost:8879/Charts", "0.1.0")];
        let lock = [ResolvedDependency::new(
            "alpine",
            "http://localhost:8879/Charts",
            "0.1.0",
        )];
        assert_ne!(lock_digest(&req, &lock).unwrap(), EXPECTED);
    }

    #[test]
    fn test_normalize_repository() {
        assert_eq!(normalize_repository("HTTPS://Charts.Example.COM/Stable"), "https://charts.example.com/Stable");
        assert_eq!(normalize_repository("https://User:Pw@Example.com"), "https://User:Pw@example.com");
        assert_eq!(normalize_repository("file://Base"), "file://Base");
        assert_eq!(normalize_repository("@Stable"), "@Stable");
        assert_eq!(normalize_repository(""), "");
    }

    #[test]
    fn test_order_sensitive() {
        let a = Dependency::new("alpine", "http://example.com", "0.1.0");
        let b = Dependency::new("redis", "http://example.com", "1.0.0");
        let ra = ResolvedDependency::new("alpine", "http://example.com", "0.1.0");
        let rb = ResolvedDependency::new("redis", "http://example.com", "1.0.0");

        let forward = lock_digest(&[a.clone(), b.clone()], &[ra.clone(), rb.clone()]).unwrap();
        let reversed = lock_digest(&[b, a], &[rb, ra]).unwrap();
        assert_ne!(forward, reversed);
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(digest_for(">=0.1.0", "0.2.0"), digest_for(">=0.1.0", "0.2.0"));
    }

    #[test]
    fn test_length_mismatch() {
        let req = [Dependency::new("alpine", "http://example.com", "0.1.0")];
        let err = lock_digest(&req, &[]).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::DigestInputMismatch {
                requirements: 1,
                resolved: 0
            }
        ));
    }

    #[test]
    fn test_empty_version_omitted() {
        let req = [Dependency::new("localdependency", "", "")];
        let lock = [ResolvedDependency::new("localdependency", "", "")];
        assert_eq!(
            lock_digest(&req, &lock).unwrap(),
            "sha256:617fb2ac15bf9983636b7a3455128d55972762618c94ff8c9ca2c97c335ce3f6"
        );
    }
}
