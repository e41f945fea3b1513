use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("empty version string")]
    Empty,
    #[error("invalid component {component:?} in version {input:?}")]
    InvalidComponent { input: String, component: String },
    #[error("too many components in version {0:?}")]
    TooManyComponents(String),
}

/// Firmware release identifier `major.minor.patch`.
///
/// Field order matters: the derived `Ord` is lexicographic on (major, minor, patch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version { major, minor, patch }
    }

    /// Parse `"12"`, `"12.1"` or `"12.1.3"`; missing components default to 0.
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        if text.is_empty() {
            return Err(VersionError::Empty);
        }
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() > 3 {
            return Err(VersionError::TooManyComponents(text.to_string()));
        }
        let mut nums = [0u32; 3];
        for (slot, part) in nums.iter_mut().zip(&parts) {
            *slot = parse_component(text, part)?;
        }
        Ok(Version::new(nums[0], nums[1], nums[2]))
    }

    /// True when the version is still the "never populated" placeholder.
    pub fn is_unset(&self) -> bool {
        *self == Version::default()
    }

    pub fn in_range(&self, range: &VersionRange) -> bool {
        let above_left = match self.cmp(&range.left.version) {
            Ordering::Greater => true,
            Ordering::Equal => range.left.inclusive,
            Ordering::Less => false,
        };
        let below_right = match self.cmp(&range.right.version) {
            Ordering::Less => true,
            Ordering::Equal => range.right.inclusive,
            Ordering::Greater => false,
        };
        above_left && below_right
    }
}

fn parse_component(input: &str, part: &str) -> Result<u32, VersionError> {
    let invalid = || VersionError::InvalidComponent {
        input: input.to_string(),
        component: part.to_string(),
    };
    // u32::from_str accepts a leading '+', which is not a version digit.
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    part.parse().map_err(|_| invalid())
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeLimit {
    pub version: Version,
    pub inclusive: bool,
}

impl RangeLimit {
    pub fn inclusive(version: Version) -> Self {
        RangeLimit { version, inclusive: true }
    }
}

/// Interval of versions. An inverted range is not rejected; it simply contains nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    pub left: RangeLimit,
    pub right: RangeLimit,
}

impl VersionRange {
    pub fn new(left: RangeLimit, right: RangeLimit) -> Self {
        VersionRange { left, right }
    }

    /// `[min, max]`, the shape used for a device's supported releases.
    pub fn closed(min: Version, max: Version) -> Self {
        VersionRange::new(RangeLimit::inclusive(min), RangeLimit::inclusive(max))
    }

    pub fn contains(&self, version: &Version) -> bool {
        version.in_range(self)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.left.inclusive { '[' } else { '(' };
        let close = if self.right.inclusive { ']' } else { ')' };
        write!(f, "{}{},{}{}", open, self.left.version, self.right.version, close)
    }
}
