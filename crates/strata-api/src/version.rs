//! Two-part API version identifiers and the compatibility rule between them.

use std::cmp::Ordering;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors raised while parsing a [`Version`] from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionParseError {
    /// The text does not have the `v<major>.<minor>` shape.
    #[error("could not parse '{text}' as version")]
    Malformed {
        /// Text that was rejected.
        text: String,
    },
    /// A numeric segment does not fit in 64 bits.
    #[error("parsing {segment} '{digits}': {source}")]
    Segment {
        /// Which segment failed (`major` or `minor`).
        segment: &'static str,
        /// Digits that failed to convert.
        digits: String,
        /// Underlying integer error.
        #[source]
        source: ParseIntError,
    },
}

/// A `major.minor` API version.
///
/// Ordering is lexicographic on `(major, minor)`. The textual form is always
/// `"<major>.<minor>"`, so a version parsed from `"v1"` displays as `"1.0"`.
///
/// # Example
///
/// ```
/// use strata_api::Version;
///
/// let version: Version = "v1.2".parse().unwrap();
/// assert_eq!(version, Version::new(1, 2));
/// assert_eq!(version.to_string(), "1.2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    major: u64,
    minor: u64,
}

impl Version {
    /// Creates a version from its two segments.
    #[must_use]
    pub const fn new(major: u64, minor: u64) -> Self {
        Self { major, minor }
    }

    /// Parses `v?<digits>(.<digits>?)?`; an absent or empty minor is zero.
    ///
    /// # Errors
    ///
    /// Returns [`VersionParseError::Malformed`] when the text does not match
    /// the grammar and [`VersionParseError::Segment`] when a segment
    /// overflows.
    pub fn parse(text: &str) -> Result<Self, VersionParseError> {
        let malformed = || VersionParseError::Malformed {
            text: text.to_owned(),
        };
        let body = text.strip_prefix('v').unwrap_or(text);
        let (major, minor) = match body.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (body, ""),
        };
        if major.is_empty() || !all_digits(major) || !all_digits(minor) {
            return Err(malformed());
        }

        let major = parse_segment("major", major)?;
        let minor = if minor.is_empty() {
            0
        } else {
            parse_segment("minor", minor)?
        };
        Ok(Self::new(major, minor))
    }

    /// Returns the major segment.
    #[must_use]
    pub const fn major(&self) -> u64 {
        self.major
    }

    /// Returns the minor segment.
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.minor
    }

    /// Returns `true` when an implementation of `self` can serve a consumer
    /// that requires `required`.
    ///
    /// Major version zero carries no compatibility promise, so it demands an
    /// exact match. Otherwise the majors must agree and `self` must be at
    /// least as recent in its minor.
    ///
    /// ```
    /// use strata_api::Version;
    ///
    /// assert!(Version::new(1, 5).is_superset_of(&Version::new(1, 3)));
    /// assert!(!Version::new(0, 1).is_superset_of(&Version::new(0, 2)));
    /// ```
    #[must_use]
    pub fn is_superset_of(&self, required: &Self) -> bool {
        if self.major == 0 {
            return self == required;
        }
        self.major == required.major && self.minor >= required.minor
    }

    /// Three-way comparison returning `-1`, `0`, or `1`.
    #[must_use]
    pub fn compare(&self, other: &Self) -> i8 {
        match self.cmp(other) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }
}

fn all_digits(segment: &str) -> bool {
    segment.bytes().all(|byte| byte.is_ascii_digit())
}

fn parse_segment(segment: &'static str, digits: &str) -> Result<u64, VersionParseError> {
    digits
        .parse::<u64>()
        .map_err(|source| VersionParseError::Segment {
            segment,
            digits: digits.to_owned(),
            source,
        })
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(|error| {
            serde::de::Error::custom(format!("invalid api version '{text}': {error}"))
        })
    }
}
