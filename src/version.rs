// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Version schemes and their total orders
//!
//! Builds are dot-separated numeric segments compared segment by segment
//! (`1.10` sorts after `1.9`), never as strings. Distribution-qualified
//! versions compare the distribution name first.

use crate::error::VersionParseError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Anything the grid can show and order as a version
pub trait VersionScheme:
    Clone
    + Ord
    + fmt::Display
    + fmt::Debug
    + FromStr<Err = VersionParseError>
    + Serialize
    + de::DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> VersionScheme for T where
    T: Clone
        + Ord
        + fmt::Display
        + fmt::Debug
        + FromStr<Err = VersionParseError>
        + Serialize
        + de::DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Order two optional values, present before absent
#[must_use]
pub fn compare_optional<T: Ord>(a: Option<&T>, b: Option<&T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Newest first, absent values still last
#[must_use]
pub fn compare_optional_desc<T: Ord>(a: Option<&T>, b: Option<&T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        _ => compare_optional(a, b),
    }
}

fn parse_build(text: &str, input: &str) -> Result<Vec<u32>, VersionParseError> {
    if text.is_empty() {
        return Err(VersionParseError::Empty);
    }
    text.split('.')
        .map(|segment| {
            segment
                .parse::<u32>()
                .map_err(|_| VersionParseError::InvalidSegment {
                    segment: segment.to_string(),
                    input: input.to_string(),
                })
        })
        .collect()
}

fn write_build(f: &mut fmt::Formatter<'_>, build: &[u32]) -> fmt::Result {
    for (i, segment) in build.iter().enumerate() {
        if i > 0 {
            f.write_str(".")?;
        }
        write!(f, "{segment}")?;
    }
    Ok(())
}

fn split_distribution(input: &str) -> Result<(&str, &str), VersionParseError> {
    match input.rsplit_once('-') {
        Some((distribution, rest)) if !distribution.is_empty() => Ok((distribution, rest)),
        _ => Err(VersionParseError::MissingDistribution(input.to_string())),
    }
}

/// Developer build, e.g. `1.2.3`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeveloperVersion {
    /// Numeric build segments
    pub build: Vec<u32>,
}

impl DeveloperVersion {
    /// Build from segments
    #[must_use]
    pub fn new(build: Vec<u32>) -> Self {
        Self { build }
    }
}

impl fmt::Display for DeveloperVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_build(f, &self.build)
    }
}

impl FromStr for DeveloperVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(Self::new(parse_build(s, s)?))
    }
}

/// Developer build qualified by its distribution, e.g. `ak-1.2.3`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeveloperDistributionVersion {
    /// Distribution that produced the build
    pub distribution: String,
    /// The build itself
    pub version: DeveloperVersion,
}

impl fmt::Display for DeveloperDistributionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.distribution, self.version)
    }
}

impl FromStr for DeveloperDistributionVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionParseError::Empty);
        }
        let (distribution, build) = split_distribution(s)?;
        Ok(Self {
            distribution: distribution.to_string(),
            version: DeveloperVersion::new(parse_build(build, s)?),
        })
    }
}

/// Client build layered on a developer build, e.g. `1.2.3_4`
///
/// A missing `_N` suffix means client build 0, which also displays without suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientVersion {
    /// Developer build the client build was made from
    pub developer_build: Vec<u32>,
    /// Client build counter
    pub client_build: u32,
}

impl fmt::Display for ClientVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_build(f, &self.developer_build)?;
        if self.client_build != 0 {
            write!(f, "_{}", self.client_build)?;
        }
        Ok(())
    }
}

impl FromStr for ClientVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (build, client) = match s.split_once('_') {
            Some((build, client)) => {
                let client_build =
                    client
                        .parse::<u32>()
                        .map_err(|_| VersionParseError::InvalidSegment {
                            segment: client.to_string(),
                            input: s.to_string(),
                        })?;
                (build, client_build)
            }
            None => (s, 0),
        };
        Ok(Self {
            developer_build: parse_build(build, s)?,
            client_build: client,
        })
    }
}

/// Client build qualified by its distribution, e.g. `ak-1.2.3_4`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientDistributionVersion {
    /// Distribution that produced the build
    pub distribution: String,
    /// The client build
    pub version: ClientVersion,
}

impl fmt::Display for ClientDistributionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.distribution, self.version)
    }
}

impl FromStr for ClientDistributionVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionParseError::Empty);
        }
        let (distribution, version) = split_distribution(s)?;
        Ok(Self {
            distribution: distribution.to_string(),
            version: version.parse()?,
        })
    }
}

macro_rules! serde_as_string {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serializer.collect_str(self)
                }
            }

            impl<'de> Deserialize<'de> for $ty {
                fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    let text = String::deserialize(deserializer)?;
                    text.parse().map_err(de::Error::custom)
                }
            }
        )*
    };
}

serde_as_string!(
    DeveloperVersion,
    DeveloperDistributionVersion,
    ClientVersion,
    ClientDistributionVersion,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn client(s: &str) -> ClientDistributionVersion {
        s.parse().expect("valid version")
    }

    #[test]
    fn builds_compare_numerically() {
        let a: DeveloperVersion = "1.9".parse().expect("parse");
        let b: DeveloperVersion = "1.10".parse().expect("parse");
        assert!(a < b);
        let prefix: DeveloperVersion = "1.2".parse().expect("parse");
        let longer: DeveloperVersion = "1.2.0".parse().expect("parse");
        assert!(prefix < longer);
    }

    #[test]
    fn client_distribution_orders_distribution_then_build_then_client() {
        assert!(client("ak-1.2.3_4") < client("ak-1.2.3_10"));
        assert!(client("ak-1.2.3_10") < client("ak-1.2.4"));
        assert!(client("ak-9.9.9") < client("bk-1.0.0"));
    }

    #[test]
    fn distribution_may_contain_dashes() {
        let v = client("test-dist-1.2_3");
        assert_eq!(v.distribution, "test-dist");
        assert_eq!(v.version.developer_build, vec![1, 2]);
        assert_eq!(v.version.client_build, 3);
        assert_eq!(v.to_string(), "test-dist-1.2_3");
    }

    #[test]
    fn missing_client_suffix_is_build_zero() {
        let v: ClientVersion = "1.2.0".parse().expect("parse");
        assert_eq!(v.client_build, 0);
        assert_eq!(v.to_string(), "1.2.0");
    }

    #[test]
    fn rejects_malformed_text() {
        assert_eq!("".parse::<DeveloperVersion>(), Err(VersionParseError::Empty));
        assert!(matches!(
            "1.x".parse::<DeveloperVersion>(),
            Err(VersionParseError::InvalidSegment { .. })
        ));
        assert!(matches!(
            "1.2.3".parse::<DeveloperDistributionVersion>(),
            Err(VersionParseError::MissingDistribution(_))
        ));
        assert!("bad-url".parse::<ClientDistributionVersion>().is_err());
    }

    #[test]
    fn absent_sorts_last_in_both_directions() {
        let a = client("ak-1.0.0");
        let b = client("ak-2.0.0");
        assert_eq!(compare_optional(Some(&a), None), Ordering::Less);
        assert_eq!(compare_optional_desc(Some(&a), None), Ordering::Less);
        assert_eq!(compare_optional_desc(None, Some(&a)), Ordering::Greater);
        assert_eq!(compare_optional_desc(Some(&a), Some(&b)), Ordering::Greater);
        assert_eq!(compare_optional::<ClientDistributionVersion>(None, None), Ordering::Equal);
    }

    #[test]
    fn serializes_as_display_string() {
        let v = client("ak-1.2.3_4");
        let json = serde_json::to_string(&v).expect("serialize");
        assert_eq!(json, "\"ak-1.2.3_4\"");
        let back: ClientDistributionVersion = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, v);
    }
}
