//! Core value types shared across the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target deployment profile.
///
/// The dynamic-load profile keeps class resolution at startup but avoids
/// classpath scanning; the ahead-of-time profile assumes every reference is
/// bound at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Profile {
    #[serde(rename = "jit", alias = "dynamic")]
    Dynamic,
    #[serde(rename = "native", alias = "aot")]
    AheadOfTime,
}

impl Profile {
    pub const ALL: [Profile; 2] = [Profile::Dynamic, Profile::AheadOfTime];

    /// Stable slug used in configuration files and generated properties.
    pub fn slug(self) -> &'static str {
        match self {
            Profile::Dynamic => "jit",
            Profile::AheadOfTime => "native",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jit" | "dynamic" => Ok(Profile::Dynamic),
            "native" | "aot" => Ok(Profile::AheadOfTime),
            other => Err(format!(
                "unknown runtime '{}' (expected 'jit' or 'native')",
                other
            )),
        }
    }
}

/// Subset of profiles a module applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSet {
    pub dynamic: bool,
    pub ahead_of_time: bool,
}

impl ProfileSet {
    pub const BOTH: ProfileSet = ProfileSet {
        dynamic: true,
        ahead_of_time: true,
    };
    pub const DYNAMIC_ONLY: ProfileSet = ProfileSet {
        dynamic: true,
        ahead_of_time: false,
    };
    pub const AHEAD_OF_TIME_ONLY: ProfileSet = ProfileSet {
        dynamic: false,
        ahead_of_time: true,
    };

    pub fn contains(&self, profile: Profile) -> bool {
        match profile {
            Profile::Dynamic => self.dynamic,
            Profile::AheadOfTime => self.ahead_of_time,
        }
    }

    pub fn profiles(&self) -> Vec<Profile> {
        Profile::ALL
            .into_iter()
            .filter(|p| self.contains(*p))
            .collect()
    }
}

impl Default for ProfileSet {
    fn default() -> Self {
        ProfileSet::BOTH
    }
}

/// Last segment of a dotted qualified name.
pub fn simple_name_of(qualified: &str) -> &str {
    match qualified.rfind('.') {
        Some(idx) => &qualified[idx + 1..],
        None => qualified,
    }
}
