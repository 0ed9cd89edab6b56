//! Lenient version parsing for framework requirement strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A `major.minor.patch` release number.
///
/// Missing components default to zero, so `1.2` equals `1.2.0`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl Version {
    /// Create a version from its components.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse a requirement such as `>=1.2.0`, `^1.5`, `~=0.9.1` or `v2`.
    ///
    /// Only the first clause of a compound requirement is considered.
    pub fn parse(input: &str) -> Result<Self, String> {
        let clause = input.split([',', ' ', ';']).find(|part| !part.is_empty());
        let Some(clause) = clause else {
            return Err(format!("empty version requirement: {input:?}"));
        };
        let trimmed = strip_requirement_operator(clause);

        let mut parts = [0u64; 3];
        let mut seen = 0usize;
        for (index, component) in trimmed.split('.').take(3).enumerate() {
            let digits: String = component.chars().take_while(char::is_ascii_digit).collect();
            if digits.is_empty() {
                if index == 0 {
                    return Err(format!("unparseable version requirement: {input:?}"));
                }
                break;
            }
            parts[index] = digits
                .parse()
                .map_err(|err| format!("version component {digits:?}: {err}"))?;
            seen += 1;
            if digits.len() != component.len() {
                break;
            }
        }
        if seen == 0 {
            return Err(format!("unparseable version requirement: {input:?}"));
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Strip comparison operators and a leading `v` from a requirement clause.
pub fn strip_requirement_operator(requirement: &str) -> &str {
    requirement
        .trim()
        .trim_start_matches(['>', '<', '=', '~', '^', '!'])
        .trim_start_matches(['v', 'V'])
        .trim()
}
