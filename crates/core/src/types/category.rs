//! Product categories.
//!
//! Each category lives in its own table in the hosted backend. The order of
//! [`Category::ALL`] is the probe order used when a review has to be matched
//! back to the table its product lives in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned for an unknown category name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown product category: {0}")]
pub struct CategoryError(pub String);

/// A product category, one per catalog table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Soaps,
    HerbalTeas,
    Lotions,
    Oils,
    BeardCare,
    Shampoos,
    RollOns,
    Elixirs,
}

impl Category {
    /// Every category in probe order.
    pub const ALL: [Self; 8] = [
        Self::Soaps,
        Self::HerbalTeas,
        Self::Lotions,
        Self::Oils,
        Self::BeardCare,
        Self::Shampoos,
        Self::RollOns,
        Self::Elixirs,
    ];

    /// Name of the table holding this category. Also the wire name.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Soaps => "soaps",
            Self::HerbalTeas => "herbal_teas",
            Self::Lotions => "lotions",
            Self::Oils => "oils",
            Self::BeardCare => "beard_care",
            Self::Shampoos => "shampoos",
            Self::RollOns => "roll_ons",
            Self::Elixirs => "elixirs",
        }
    }

    /// Display name for storefront copy and emails.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Soaps => "Soaps",
            Self::HerbalTeas => "Herbal Teas",
            Self::Lotions => "Lotions",
            Self::Oils => "Oils",
            Self::BeardCare => "Beard Care",
            Self::Shampoos => "Shampoos",
            Self::RollOns => "Roll-Ons",
            Self::Elixirs => "Elixirs",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    /// Accepts table names as well as the URL slugs used by the storefront
    /// (`teas`, `beard-care`, `roll-ons`, singular forms).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "soaps" | "soap" => Ok(Self::Soaps),
            "herbal_teas" | "herbal_tea" | "teas" | "tea" => Ok(Self::HerbalTeas),
            "lotions" | "lotion" => Ok(Self::Lotions),
            "oils" | "oil" => Ok(Self::Oils),
            "beard_care" | "beard" => Ok(Self::BeardCare),
            "shampoos" | "shampoo" => Ok(Self::Shampoos),
            "roll_ons" | "roll_on" | "rollons" => Ok(Self::RollOns),
            "elixirs" | "elixir" => Ok(Self::Elixirs),
            _ => Err(CategoryError(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_order_is_fixed() {
        let names: Vec<_> = Category::ALL.iter().map(|c| c.table_name()).collect();
        assert_eq!(
            names,
            [
                "soaps",
                "herbal_teas",
                "lotions",
                "oils",
                "beard_care",
                "shampoos",
                "roll_ons",
                "elixirs"
            ]
        );
    }

    #[test]
    fn test_parse_slugs() {
        assert_eq!("beard-care".parse::<Category>().unwrap(), Category::BeardCare);
        assert_eq!("Roll-Ons".parse::<Category>().unwrap(), Category::RollOns);
        assert_eq!("teas".parse::<Category>().unwrap(), Category::HerbalTeas);
        assert!("candles".parse::<Category>().is_err());
    }

    #[test]
    fn test_serde_matches_table_name() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.table_name()));
        }
    }
}
