//! Dotted numeric versions as published in release tags.

use std::cmp::Ordering;
use std::fmt;

/// A dot-separated numeric version. Trailing zero components are not
/// significant, so `2`, `2.0` and `2.0.0` are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion {
    components: Vec<u64>,
}

impl ReleaseVersion {
    /// Parse leniently: each component contributes its leading digits, and a
    /// component without any counts as zero. Components too large for `u64`
    /// saturate. Never fails.
    pub fn parse(version: &str) -> Self {
        let mut components: Vec<u64> = normalize_tag(version.trim())
            .split('.')
            .map(|part| {
                let digits_end = part
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(part.len());
                let digits = &part[..digits_end];
                if digits.is_empty() {
                    0
                } else {
                    digits.parse().unwrap_or(u64::MAX)
                }
            })
            .collect();

        while components.last() == Some(&0) {
            components.pop();
        }
        Self { components }
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

impl Ord for ReleaseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Both sides have trailing zeros trimmed, so lexicographic order on the
        // component lists is component-wise order with missing parts as zero.
        self.components.cmp(&other.components)
    }
}

impl PartialOrd for ReleaseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("0");
        }
        let parts: Vec<String> = self.components.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

/// Drop a single leading non-digit character, as in `v1.2`.
pub fn normalize_tag(tag: &str) -> &str {
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) if !first.is_ascii_digit() => chars.as_str(),
        _ => tag,
    }
}

/// Whether `version` can be embedded in a file name without escaping the
/// directory it is joined onto.
pub fn is_file_safe(version: &str) -> bool {
    !version.is_empty()
        && !version.contains("..")
        && !version
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':') || c.is_control())
}

/// Whether `latest` is strictly newer than `current`.
pub fn is_newer(latest: &str, current: &str) -> bool {
    ReleaseVersion::parse(latest) > ReleaseVersion::parse(current)
}
