//! Service category taxonomy.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Primary service category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Healthcare,
    Shelter,
    Food,
    Education,
    Emergency,
    Social,
    Employment,
    Legal,
    Transportation,
    Utilities,
    Recreation,
    Other,
}

impl ServiceCategory {
    pub fn all() -> &'static [ServiceCategory] {
        &[
            ServiceCategory::Healthcare,
            ServiceCategory::Shelter,
            ServiceCategory::Food,
            ServiceCategory::Education,
            ServiceCategory::Emergency,
            ServiceCategory::Social,
            ServiceCategory::Employment,
            ServiceCategory::Legal,
            ServiceCategory::Transportation,
            ServiceCategory::Utilities,
            ServiceCategory::Recreation,
            ServiceCategory::Other,
        ]
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServiceCategory::Healthcare => "healthcare",
            ServiceCategory::Shelter => "shelter",
            ServiceCategory::Food => "food",
            ServiceCategory::Education => "education",
            ServiceCategory::Emergency => "emergency",
            ServiceCategory::Social => "social",
            ServiceCategory::Employment => "employment",
            ServiceCategory::Legal => "legal",
            ServiceCategory::Transportation => "transportation",
            ServiceCategory::Utilities => "utilities",
            ServiceCategory::Recreation => "recreation",
            ServiceCategory::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ServiceCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "healthcare" => Ok(ServiceCategory::Healthcare),
            "shelter" => Ok(ServiceCategory::Shelter),
            "food" => Ok(ServiceCategory::Food),
            "education" => Ok(ServiceCategory::Education),
            "emergency" => Ok(ServiceCategory::Emergency),
            "social" => Ok(ServiceCategory::Social),
            "employment" => Ok(ServiceCategory::Employment),
            "legal" => Ok(ServiceCategory::Legal),
            "transportation" => Ok(ServiceCategory::Transportation),
            "utilities" => Ok(ServiceCategory::Utilities),
            "recreation" => Ok(ServiceCategory::Recreation),
            "other" => Ok(ServiceCategory::Other),
            _ => Err(anyhow::anyhow!("Invalid service category: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_string_roundtrip_for_all_categories() {
        for category in ServiceCategory::all() {
            let parsed = ServiceCategory::from_str(&category.to_string()).unwrap();
            assert_eq!(parsed, *category);
        }
        assert!(ServiceCategory::from_str("circus").is_err());
    }
}
