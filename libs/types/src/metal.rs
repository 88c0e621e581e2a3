//! Supported precious metals
//!
//! Metals are identified by their ISO 4217 precious-metal codes. Parsing
//! also accepts the common English name, case-insensitively.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;

/// A custodied precious metal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metal {
    /// Gold
    XAU,
    /// Silver
    XAG,
    /// Platinum
    XPT,
    /// Palladium
    XPD,
}

impl Metal {
    pub const ALL: [Metal; 4] = [Metal::XAU, Metal::XAG, Metal::XPT, Metal::XPD];

    /// ISO 4217 code
    pub fn symbol(&self) -> &'static str {
        match self {
            Metal::XAU => "XAU",
            Metal::XAG => "XAG",
            Metal::XPT => "XPT",
            Metal::XPD => "XPD",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metal::XAU => "gold",
            Metal::XAG => "silver",
            Metal::XPT => "platinum",
            Metal::XPD => "palladium",
        }
    }
}

impl fmt::Display for Metal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Metal {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Metal::ALL
            .into_iter()
            .find(|m| {
                m.symbol().eq_ignore_ascii_case(needle) || m.name().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| ValidationError::UnknownMetal {
                symbol: needle.to_string(),
            })
    }
}

impl TryFrom<String> for Metal {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Metal> for String {
    fn from(metal: Metal) -> Self {
        metal.symbol().to_string()
    }
}
